//! Scenario runner - plans a floor plan and plays it back frame by frame.
//!
//! Every run ticks the engine on a fixed-step [`SimClock`] with a
//! [`RecordingRig`], so results are reproducible bit for bit.

use crate::context::SimClock;
use crate::error::SimError;
use crate::exporter::{PlanSummary, SimExport, SimFrame};
use crate::rig::RecordingRig;
use crate::scenarios::{ScenarioId, ScenarioInput};

use nalgebra::Vector3;
use serde::Serialize;
use std::cell::Cell;
use std::collections::HashSet;
use std::rc::Rc;
use tracing::{debug, info, warn};
use walkthrough_core::{
    plan, PlanOptions, PlaybackState, RoomGraph, TickOutcome, WalkPlan, Walkthrough,
    WalkthroughOptions,
};
use walkthrough_env::RoomId;

/// Slack for floating-point comparisons in the checks.
const CHECK_EPSILON: f64 = 1e-9;

/// Results from running a scenario.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioResult {
    /// Scenario name, or the graph file name
    pub scenario: String,

    /// Whether every check passed
    pub passed: bool,

    /// Individual checks in evaluation order
    pub checks: Vec<CheckResult>,

    /// First failed check, if any
    pub failure_reason: Option<String>,

    /// Metrics collected during the run
    pub metrics: RunMetrics,
}

/// A single pass/fail assertion.
#[derive(Debug, Clone, Serialize)]
pub struct CheckResult {
    pub name: &'static str,
    pub passed: bool,
    pub detail: String,
}

impl CheckResult {
    fn new(name: &'static str, passed: bool, detail: impl Into<String>) -> Self {
        Self {
            name,
            passed,
            detail: detail.into(),
        }
    }
}

/// Metrics collected during playback.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunMetrics {
    /// Frames ticked
    pub frames: u64,

    /// Virtual time at the end of the run (s)
    pub sim_time: f64,

    /// Time spent holding at rooms (s)
    pub dwell_time: f64,

    /// Room events fired, across all laps
    pub rooms_entered: usize,

    /// Times the walkthrough wrapped to the start
    pub wraps: u32,

    /// Largest heading change between two frames (degrees)
    pub max_yaw_step_deg: f64,

    /// Arc length of the curve
    pub path_length: f64,

    /// Poses committed to the rig
    pub rig_updates: u64,
}

/// Runs walkthrough scenarios.
#[derive(Debug, Clone)]
pub struct ScenarioRunner {
    /// Tick rate in Hz
    fps: u32,

    /// Budget before a run counts as stuck
    max_duration_secs: f64,

    /// Laps to play; more than one turns on looping
    loop_count: u32,

    /// Explicit base speed, overrides scenario defaults
    speed: Option<f64>,

    plan_options: PlanOptions,
    walk_options: WalkthroughOptions,

    /// Export every n-th frame (room entries and the last frame always)
    sample_every: u64,
}

impl Default for ScenarioRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl ScenarioRunner {
    /// Creates a runner at 60 fps with a 10-minute budget.
    pub fn new() -> Self {
        Self {
            fps: 60,
            max_duration_secs: 600.0,
            loop_count: 1,
            speed: None,
            plan_options: PlanOptions::default(),
            walk_options: WalkthroughOptions::default(),
            sample_every: 6,
        }
    }

    /// Sets the tick rate.
    pub fn with_fps(mut self, fps: u32) -> Self {
        self.fps = fps.max(1);
        self
    }

    /// Sets the maximum simulated duration.
    pub fn with_duration(mut self, secs: f64) -> Self {
        self.max_duration_secs = if secs.is_finite() { secs.max(0.0) } else { 0.0 };
        self
    }

    /// Sets the number of laps.
    pub fn with_loop_count(mut self, laps: u32) -> Self {
        self.loop_count = laps.max(1);
        self
    }

    /// Sets the base speed for every scenario.
    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = Some(speed);
        self
    }

    pub fn with_plan_options(mut self, options: PlanOptions) -> Self {
        self.plan_options = options;
        self
    }

    pub fn with_walk_options(mut self, options: WalkthroughOptions) -> Self {
        self.walk_options = options;
        self
    }

    /// Sets the export sampling stride in frames.
    pub fn with_sample_every(mut self, frames: u64) -> Self {
        self.sample_every = frames.max(1);
        self
    }

    pub fn fps(&self) -> u32 {
        self.fps
    }

    /// Runs a built-in scenario.
    pub fn run(&self, scenario: ScenarioId) -> Result<ScenarioResult, SimError> {
        self.run_scenario(scenario, None)
    }

    /// Runs a built-in scenario and records sampled frames.
    pub fn run_with_export(
        &self,
        scenario: ScenarioId,
    ) -> Result<(ScenarioResult, SimExport), SimError> {
        let mut export = SimExport::new(scenario.name(), self.fps);
        let result = self.run_scenario(scenario, Some(&mut export))?;
        export.finalize(result.passed, result.failure_reason.clone());
        Ok((result, export))
    }

    /// Runs an arbitrary graph, e.g. one loaded from a file.
    pub fn run_graph(
        &self,
        name: &str,
        graph: &RoomGraph,
        export: Option<&mut SimExport>,
    ) -> Result<ScenarioResult, SimError> {
        info!("Starting graph run: {} ({} rooms)", name, graph.len());
        let speed = self.speed;
        self.play(name, Some(graph), None, speed, None, export)
    }

    /// Runs a bare path with no rooms.
    pub fn run_path(
        &self,
        name: &str,
        points: &[Vector3<f64>],
        export: Option<&mut SimExport>,
    ) -> Result<ScenarioResult, SimError> {
        info!("Starting path run: {} ({} points)", name, points.len());
        self.play(name, None, Some(points), self.speed, None, export)
    }

    fn run_scenario(
        &self,
        scenario: ScenarioId,
        export: Option<&mut SimExport>,
    ) -> Result<ScenarioResult, SimError> {
        info!("Starting scenario: {} - {}", scenario.name(), scenario.description());
        let speed = self.speed.or(scenario.default_speed());
        let expected = Some(scenario.expected_detached());
        match scenario.build()? {
            ScenarioInput::Graph(graph) => {
                self.play(scenario.name(), Some(&graph), None, speed, expected, export)
            }
            ScenarioInput::Path(points) => {
                self.play(scenario.name(), None, Some(points.as_slice()), speed, expected, export)
            }
        }
    }

    fn plan_for(&self, graph: &RoomGraph) -> WalkPlan {
        let mut options = self.plan_options.clone();
        if options.entry_glide.is_none() {
            options.entry_glide = self.walk_options.entry_glide_dist;
        }
        plan(graph, &options)
    }

    fn play(
        &self,
        name: &str,
        graph: Option<&RoomGraph>,
        path: Option<&[Vector3<f64>]>,
        speed: Option<f64>,
        expected_detached: Option<usize>,
        mut export: Option<&mut SimExport>,
    ) -> Result<ScenarioResult, SimError> {
        let plan = graph.map(|g| self.plan_for(g)).unwrap_or_default();
        let points = match path {
            Some(points) => points.to_vec(),
            None => plan.points(),
        };

        let mut options = self.walk_options.clone();
        if let Some(speed) = speed {
            options.speed = speed;
        }
        options.looping = self.loop_count > 1;
        let laps = if options.looping { self.loop_count } else { 1 };

        let rig = start_rig(&points)?;
        let mut walk = if path.is_some() {
            Walkthrough::new(rig, &points, options)
        } else {
            Walkthrough::from_plan(rig, &plan, options)
        };

        let callbacks = Rc::new(Cell::new(0usize));
        let counter = Rc::clone(&callbacks);
        walk.on_room_enter(move |_| counter.set(counter.get() + 1));

        if let Some(export) = export.as_deref_mut() {
            export.plan = Some(PlanSummary::new(&plan, walk.length()));
        }

        let mut clock = SimClock::new(self.fps);
        let max_frames = (self.max_duration_secs * clock.fps() as f64).ceil() as u64;
        let mut metrics = RunMetrics {
            path_length: walk.length(),
            ..Default::default()
        };
        let mut entered: Vec<RoomId> = Vec::new();
        let mut overshoot: Option<f64> = None;
        let mut clamp_misses: Vec<RoomId> = Vec::new();

        walk.start();
        let mut completed = walk.state() == PlaybackState::Idle;
        if completed {
            debug!("{}: nothing to play", name);
        }

        while !completed && clock.ticks() < max_frames {
            let dt = clock.advance();
            let yaw_before = walk.yaw();
            let outcome = walk.tick(dt);
            metrics.frames += 1;

            if let (Some(a), Some(b)) = (yaw_before, walk.yaw()) {
                let step = wrap_angle(b - a).abs().to_degrees();
                metrics.max_yaw_step_deg = metrics.max_yaw_step_deg.max(step);
            }
            if walk.position() > walk.length() + CHECK_EPSILON {
                overshoot.get_or_insert(walk.position());
            }

            let mut entered_room = None;
            match &outcome {
                TickOutcome::Entered(room) => {
                    let exact = walk
                        .events()
                        .iter()
                        .any(|e| &e.room == room && e.s == walk.position());
                    if !exact {
                        clamp_misses.push(room.clone());
                    }
                    log_entry(graph, room, clock.now());
                    entered.push(room.clone());
                    entered_room = Some(room.clone());
                }
                TickOutcome::Dwelling => metrics.dwell_time += dt,
                TickOutcome::Wrapped => {
                    metrics.wraps += 1;
                    debug!("{}: lap {} done at t={:.2}s", name, metrics.wraps, clock.now());
                    completed = metrics.wraps >= laps;
                }
                TickOutcome::Finished => completed = true,
                TickOutcome::Idle | TickOutcome::Paused | TickOutcome::Moved => {}
            }

            if let Some(export) = export.as_deref_mut() {
                if clock.ticks() % self.sample_every == 0 || entered_room.is_some() || completed {
                    export.add_frame(SimFrame::capture(
                        clock.now(),
                        &walk,
                        entered_room,
                    ));
                }
            }

            if clock.ticks() % (clock.fps() as u64 * 10) == 0 {
                debug!(
                    "  t={:.1}s | s={:.2}/{:.2} | rooms={}",
                    clock.now(),
                    walk.position(),
                    walk.length(),
                    entered.len()
                );
            }
        }

        metrics.sim_time = clock.now();
        metrics.rooms_entered = entered.len();
        metrics.rig_updates = walk.rig().update_count();

        let mut checks = Vec::new();
        if let Some(graph) = graph {
            checks.push(check_order(graph, &plan));
            checks.push(check_route(graph, &plan));
        }
        checks.push(CheckResult::new(
            "no_overshoot",
            overshoot.is_none(),
            match overshoot {
                Some(s) => format!("position {:.6} beyond length {:.6}", s, walk.length()),
                None => "position stayed within the path".to_string(),
            },
        ));
        checks.push(CheckResult::new(
            "event_clamp",
            clamp_misses.is_empty(),
            if clamp_misses.is_empty() {
                "every entry landed exactly on its event".to_string()
            } else {
                format!("{} entries off their event: {:?}", clamp_misses.len(), clamp_misses)
            },
        ));

        checks.push(check_entered(
            &plan,
            walk.events().len(),
            &entered,
            laps as usize,
        ));
        checks.push(CheckResult::new(
            "callback_count",
            callbacks.get() == entered.len(),
            format!("{} callbacks for {} entries", callbacks.get(), entered.len()),
        ));

        let rate = walk.options().max_yaw_rate;
        let frame_dt = clock.dt().min(walk.options().max_frame_dt);
        let yaw_limit = rate * frame_dt + 1e-6;
        checks.push(CheckResult::new(
            "yaw_rate",
            metrics.max_yaw_step_deg <= yaw_limit,
            format!(
                "max step {:.3} deg, limit {:.3} deg",
                metrics.max_yaw_step_deg, yaw_limit
            ),
        ));

        checks.push(CheckResult::new(
            "completed",
            completed,
            if completed {
                format!("done after {:.2}s", metrics.sim_time)
            } else {
                format!("still {:?} after {:.0}s budget", walk.state(), self.max_duration_secs)
            },
        ));

        if let Some(expected) = expected_detached {
            checks.push(CheckResult::new(
                "detached",
                plan.detached.len() == expected,
                format!("{} detached, {} expected", plan.detached.len(), expected),
            ));
        }

        let failure_reason = checks
            .iter()
            .find(|c| !c.passed)
            .map(|c| format!("{}: {}", c.name, c.detail));
        let passed = failure_reason.is_none();
        if let Some(reason) = &failure_reason {
            warn!("{} failed {}", name, reason);
        }

        info!(
            "{} complete: {} rooms in {:.1}s over {:.1} units, {} frames",
            name, metrics.rooms_entered, metrics.sim_time, metrics.path_length, metrics.frames
        );

        Ok(ScenarioResult {
            scenario: name.to_string(),
            passed,
            checks,
            failure_reason,
            metrics,
        })
    }
}

/// Start pose: on the first point, looking at the second.
fn start_rig(points: &[Vector3<f64>]) -> Result<RecordingRig, SimError> {
    let Some(&first) = points.first() else {
        return Ok(RecordingRig::default());
    };
    let target = points
        .iter()
        .skip(1)
        .find(|p| (*p - first).norm_squared() > 1e-12)
        .copied()
        .unwrap_or(first + Vector3::x());
    RecordingRig::new(first, target)
}

fn log_entry(graph: Option<&RoomGraph>, room: &RoomId, now: f64) {
    let node = graph.and_then(|g| g.get(room));
    let title = node.map(|n| n.title()).unwrap_or(room.as_str());
    match node.and_then(|n| n.privacy_level.as_deref()) {
        Some(privacy) => info!(
            "  t={:.2}s entered {} ({})",
            now,
            title,
            privacy.replace('_', " ")
        ),
        None => info!("  t={:.2}s entered {}", now, title),
    }
}

/// Every lap enters the route's rooms once each, in first-visit order.
fn check_entered(plan: &WalkPlan, events: usize, entered: &[RoomId], laps: usize) -> CheckResult {
    let mut seen = HashSet::new();
    let first_visits: Vec<&RoomId> = plan.route.iter().filter(|r| seen.insert(*r)).collect();
    let expected_entries = events * laps;
    let in_order = entered
        .chunks(first_visits.len().max(1))
        .all(|lap| lap.iter().eq(first_visits.iter().copied()));
    let detail = match entered
        .iter()
        .zip(first_visits.iter().cycle())
        .position(|(got, want)| got != *want)
    {
        Some(i) if !in_order => format!(
            "entry {} was {}, expected {}",
            i,
            entered[i],
            first_visits[i % first_visits.len()]
        ),
        _ => format!(
            "{} entered, {} expected over {} lap(s), {} rooms on the route",
            entered.len(),
            expected_entries,
            laps,
            first_visits.len()
        ),
    };
    CheckResult::new(
        "rooms_entered",
        events == plan.centers.len() && entered.len() == expected_entries && in_order,
        detail,
    )
}

fn check_order(graph: &RoomGraph, plan: &WalkPlan) -> CheckResult {
    let unique: HashSet<&RoomId> = plan.order.iter().collect();
    let passed = plan.order.len() == graph.len() && unique.len() == graph.len();
    CheckResult::new(
        "order_complete",
        passed,
        format!(
            "{} rooms ordered ({} unique) of {}",
            plan.order.len(),
            unique.len(),
            graph.len()
        ),
    )
}

fn check_route(graph: &RoomGraph, plan: &WalkPlan) -> CheckResult {
    let bad = plan
        .route
        .windows(2)
        .find(|w| w[0] != w[1] && !graph.has_edge(&w[0], &w[1]));
    CheckResult::new(
        "edge_faithful",
        bad.is_none(),
        match bad {
            Some(w) => format!("step {} -> {} has no edge", w[0], w[1]),
            None => format!("{} steps, all along edges", plan.route.len()),
        },
    )
}

fn wrap_angle(a: f64) -> f64 {
    a.sin().atan2(a.cos())
}

#[cfg(test)]
mod tests {
    use super::*;
    use walkthrough_core::RoomNode;

    fn fast() -> ScenarioRunner {
        ScenarioRunner::new().with_fps(30)
    }

    #[test]
    fn test_all_scenarios_pass() {
        let runner = fast();
        for id in ScenarioId::all() {
            let result = runner.run(id).unwrap();
            assert!(
                result.passed,
                "{} failed: {:?}",
                id,
                result.failure_reason
            );
        }
    }

    #[test]
    fn test_line_enters_three_rooms() {
        let result = fast().run(ScenarioId::Line).unwrap();
        assert_eq!(result.metrics.rooms_entered, 3);
        assert!(result.metrics.dwell_time > 2.0);
        assert!(result.metrics.rig_updates >= result.metrics.frames);
    }

    #[test]
    fn test_straight_path_timing() {
        let result = fast().run(ScenarioId::Straight).unwrap();
        assert_eq!(result.metrics.rooms_entered, 0);
        assert!((result.metrics.path_length - 10.0).abs() < 1e-6);
        // 10 units at speed 2, plus the ease-in.
        assert!(result.metrics.sim_time >= 5.0);
        assert!(result.metrics.sim_time < 6.0);
    }

    #[test]
    fn test_loop_count_multiplies_entries() {
        let result = fast().with_loop_count(2).run(ScenarioId::Line).unwrap();
        assert!(result.passed, "{:?}", result.failure_reason);
        assert_eq!(result.metrics.wraps, 2);
        assert_eq!(result.metrics.rooms_entered, 6);
    }

    #[test]
    fn test_budget_exhaustion_fails() {
        let result = fast()
            .with_duration(1.0)
            .run(ScenarioId::Townhouse)
            .unwrap();
        assert!(!result.passed);
        assert!(result
            .failure_reason
            .unwrap()
            .starts_with("rooms_entered"));
        assert_eq!(result.metrics.frames, 30);
    }

    #[test]
    fn test_split_wings_reports_detached() {
        let result = fast().run(ScenarioId::SplitWings).unwrap();
        let detached = result.checks.iter().find(|c| c.name == "detached").unwrap();
        assert!(detached.passed);
        assert_eq!(result.metrics.rooms_entered, 3);
    }

    #[test]
    fn test_graph_run_without_expectations() {
        let graph = RoomGraph::builder()
            .room(RoomNode::new("a").at(0.0, 0.0))
            .room(RoomNode::new("b").at(0.0, 4.0))
            .edge("a", "b")
            .build();
        let result = fast().run_graph("pair", &graph, None).unwrap();
        assert!(result.passed, "{:?}", result.failure_reason);
        assert!(result.checks.iter().all(|c| c.name != "detached"));
    }

    #[test]
    fn test_entries_out_of_route_order_fail() {
        let graph = RoomGraph::builder()
            .room(RoomNode::new("a").at(0.0, 0.0))
            .room(RoomNode::new("b").at(4.0, 0.0))
            .room(RoomNode::new("c").at(8.0, 0.0))
            .edge("a", "b")
            .edge("b", "c")
            .build();
        let options = PlanOptions {
            entry_id: Some(RoomId::new("a")),
            ..Default::default()
        };
        let plan = walkthrough_core::plan(&graph, &options);
        let ids = |v: &[&str]| v.iter().map(|s| RoomId::new(*s)).collect::<Vec<_>>();

        assert!(check_entered(&plan, 3, &ids(&["a", "b", "c"]), 1).passed);
        assert!(check_entered(&plan, 3, &ids(&["a", "b", "c", "a", "b", "c"]), 2).passed);

        // Same rooms, wrong order.
        let shuffled = check_entered(&plan, 3, &ids(&["b", "c", "a"]), 1);
        assert!(!shuffled.passed);
        assert!(shuffled.detail.contains("entry 0"), "{}", shuffled.detail);
        assert!(!check_entered(&plan, 3, &ids(&["a", "b", "c", "a", "c", "b"]), 2).passed);
        assert!(!check_entered(&plan, 3, &ids(&["a", "b"]), 1).passed);
    }

    #[test]
    fn test_empty_graph_is_trivially_complete() {
        let result = fast().run_graph("empty", &RoomGraph::default(), None).unwrap();
        assert!(result.passed);
        assert_eq!(result.metrics.frames, 0);
    }

    #[test]
    fn test_export_samples_entries() {
        let (result, export) = fast().run_with_export(ScenarioId::Line).unwrap();
        assert!(export.passed);
        let entries: Vec<_> = export.frames.iter().filter_map(|f| f.entered.clone()).collect();
        assert_eq!(entries.len(), result.metrics.rooms_entered);
        assert_eq!(export.plan.as_ref().unwrap().order.len(), 3);
        assert_eq!(export.frames.last().unwrap().state, PlaybackState::Finished);
    }
}
