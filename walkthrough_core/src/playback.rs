//! Playback engine - drives a camera rig along the planned curve.
//!
//! The engine owns no timer. The host calls [`Walkthrough::tick`] once
//! per frame with the elapsed time; every state change happens inside
//! that call.
//!
//! ```text
//!   Idle ──start──► Running ◄──► Dwelling
//!                      │
//!                      └──end of path──► Finished   (or Running again when looping)
//! ```
//!
//! Speed each frame is `speed * slowdown * boost * ramp`:
//! - slowdown eases from `slow_factor` to 1 within `slow_radius` of the
//!   next unfired room event
//! - boost decays from `resume_boost` to 1 after a dwell
//! - ramp eases from 0 to 1 over `ramp_up_sec` after start or wrap

use crate::arc_length::ArcLengthTable;
use crate::curve::CatmullRomCurve;
use crate::planner::WalkPlan;
use crate::waypoints::WaypointKind;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::debug;
use walkthrough_env::{CameraRig, RoomId};

/// Tolerance of the event crossing test, in arc-length units.
const EVENT_EPSILON: f64 = 1e-4;

/// Floor for the look-at distance when synthesizing the target.
const MIN_TARGET_DISTANCE: f64 = 0.2;

/// Playback configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalkthroughOptions {
    /// Base travel speed (units/s)
    pub speed: f64,

    /// Look-ahead distance for aiming while moving
    pub look_ahead: f64,

    /// Wrap to the start instead of finishing
    #[serde(rename = "loop")]
    pub looping: bool,

    /// Default hold at each first arrival (s)
    pub dwell_sec: f64,

    /// Distance before an event where slowing starts
    pub slow_radius: f64,

    /// Speed multiplier right at an event
    pub slow_factor: f64,

    /// Speed multiplier right after a dwell
    pub resume_boost: f64,

    /// Duration of the post-dwell boost (ms)
    pub post_boost_ms: f64,

    /// Turn-rate limit (degrees/s)
    pub max_yaw_rate: f64,

    /// Ease-in duration after start or wrap (s)
    pub ramp_up_sec: f64,

    /// Dwell overrides per room (s)
    pub per_room_dwell: HashMap<RoomId, f64>,

    /// Glide distance handed to the planner by hosts that plan and play
    /// in one step
    pub entry_glide_dist: Option<f64>,

    /// Rooms that get an event, entry first
    pub room_order: Vec<RoomId>,

    /// Exact 3D center per room, used to place events
    pub room_centers: BTreeMap<RoomId, Vector3<f64>>,

    /// Look-ahead used for the pose at an event clamp
    pub dwell_look_ahead: f64,

    /// Lower bound on any look-ahead
    pub min_look_ahead: f64,

    /// Per-frame blend of the look-at target toward its new position
    pub target_blend: f64,

    /// Upper bound on a frame's dt (s)
    pub max_frame_dt: f64,

    /// Lower bound on the post-dwell boost window (ms)
    pub min_boost_window_ms: f64,
}

impl Default for WalkthroughOptions {
    fn default() -> Self {
        Self {
            speed: 1.6,
            look_ahead: 1.2,
            looping: false,
            dwell_sec: 1.0,
            slow_radius: 2.0,
            slow_factor: 0.25,
            resume_boost: 1.25,
            post_boost_ms: 600.0,
            max_yaw_rate: 140.0,
            ramp_up_sec: 0.9,
            per_room_dwell: HashMap::new(),
            entry_glide_dist: None,
            room_order: Vec::new(),
            room_centers: BTreeMap::new(),
            dwell_look_ahead: 0.6,
            min_look_ahead: 0.3,
            target_blend: 0.35,
            max_frame_dt: 0.05,
            min_boost_window_ms: 120.0,
        }
    }
}

impl WalkthroughOptions {
    /// Copy with every non-finite or negative tunable replaced by its
    /// default.
    pub fn sanitized(mut self) -> Self {
        let d = Self::default();
        let fix = |v: f64, default: f64| if v.is_finite() && v >= 0.0 { v } else { default };

        self.speed = fix(self.speed, d.speed);
        self.look_ahead = fix(self.look_ahead, d.look_ahead);
        self.dwell_sec = fix(self.dwell_sec, d.dwell_sec);
        self.slow_radius = fix(self.slow_radius, d.slow_radius);
        self.slow_factor = fix(self.slow_factor, d.slow_factor);
        self.resume_boost = fix(self.resume_boost, d.resume_boost);
        self.post_boost_ms = fix(self.post_boost_ms, d.post_boost_ms);
        self.max_yaw_rate = fix(self.max_yaw_rate, d.max_yaw_rate);
        self.ramp_up_sec = fix(self.ramp_up_sec, d.ramp_up_sec);
        self.dwell_look_ahead = fix(self.dwell_look_ahead, d.dwell_look_ahead);
        self.min_look_ahead = fix(self.min_look_ahead, d.min_look_ahead);
        self.target_blend = fix(self.target_blend, d.target_blend).min(1.0);
        self.max_frame_dt = fix(self.max_frame_dt, d.max_frame_dt);
        self.min_boost_window_ms = fix(self.min_boost_window_ms, d.min_boost_window_ms);
        self.entry_glide_dist = self.entry_glide_dist.filter(|g| g.is_finite());
        self.per_room_dwell.retain(|_, v| v.is_finite());
        self
    }

    /// Hold duration at a room (s).
    pub fn dwell_for(&self, room: &RoomId) -> f64 {
        self.per_room_dwell
            .get(room)
            .copied()
            .unwrap_or(self.dwell_sec)
            .max(0.0)
    }
}

/// Coarse playback state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackState {
    Idle,
    Running,
    Dwelling,
    Finished,
}

/// First arrival at a room, placed on the arc-length axis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoomEvent {
    pub s: f64,
    pub room: RoomId,
    pub fired: bool,
}

/// What a single [`Walkthrough::tick`] did.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// Not started or stopped
    Idle,
    /// Paused; nothing moved
    Paused,
    /// Travelled along the path
    Moved,
    /// Holding at a room
    Dwelling,
    /// Clamped onto a room's first arrival; the dwell starts now
    Entered(RoomId),
    /// Reached the end and wrapped to the start
    Wrapped,
    /// Reached the end; no further motion
    Finished,
}

type RoomEnterFn = Box<dyn FnMut(&RoomId)>;

/// A walkthrough bound to a camera rig.
pub struct Walkthrough<R: CameraRig> {
    rig: R,
    options: WalkthroughOptions,
    curve: CatmullRomCurve,
    table: ArcLengthTable,
    events: Vec<RoomEvent>,
    on_room_enter: Option<RoomEnterFn>,

    state: PlaybackState,
    paused: bool,
    /// Arc-length position
    s: f64,
    /// Seconds since start or the last wrap, drives the ramp
    age: f64,
    /// Remaining hold (s)
    hold: f64,
    boost_remaining_ms: f64,
    boost_window_ms: f64,
    last_yaw: Option<f64>,
}

impl<R: CameraRig> Walkthrough<R> {
    /// Builds the curve, the arc-length table and the room events.
    ///
    /// Events come from `options.room_order`; rooms without an entry in
    /// `options.room_centers` get no event.
    pub fn new(rig: R, points: &[Vector3<f64>], options: WalkthroughOptions) -> Self {
        Self::with_arrivals(rig, points, options, &HashMap::new())
    }

    /// Walkthrough over a plan, with events at the plan's first arrivals.
    pub fn from_plan(rig: R, plan: &WalkPlan, mut options: WalkthroughOptions) -> Self {
        options.room_order = plan.order.clone();
        options.room_centers = plan.centers.clone();
        let arrivals: HashMap<RoomId, usize> = plan
            .waypoints
            .iter()
            .enumerate()
            .filter(|(_, w)| w.kind == WaypointKind::FirstArrival)
            .filter_map(|(k, w)| Some((w.room.clone()?, k)))
            .collect();
        Self::with_arrivals(rig, &plan.points(), options, &arrivals)
    }

    /// `arrivals` maps a room to the control point of its first arrival;
    /// other rooms fall back to the curve sample nearest their center.
    fn with_arrivals(
        rig: R,
        points: &[Vector3<f64>],
        options: WalkthroughOptions,
        arrivals: &HashMap<RoomId, usize>,
    ) -> Self {
        let options = options.sanitized();
        let curve = CatmullRomCurve::new(points.to_vec());
        let table = ArcLengthTable::build(&curve);
        let events = place_events(&table, &options, arrivals, points.len());
        debug!(
            "Walkthrough over {} points, length {:.2}, {} room events",
            points.len(),
            table.total_length(),
            events.len()
        );

        let boost_window_ms = options.post_boost_ms;
        Self {
            rig,
            options,
            curve,
            table,
            events,
            on_room_enter: None,
            state: PlaybackState::Idle,
            paused: false,
            s: 0.0,
            age: 0.0,
            hold: 0.0,
            boost_remaining_ms: 0.0,
            boost_window_ms,
            last_yaw: None,
        }
    }

    /// Sets the callback fired on each first arrival, right before the
    /// dwell starts.
    pub fn on_room_enter<F>(&mut self, callback: F)
    where
        F: FnMut(&RoomId) + 'static,
    {
        self.on_room_enter = Some(Box::new(callback));
    }

    /// Starts or restarts travel from the current position.
    ///
    /// No-op on a path without length. From `Finished`, or from a stop at
    /// the end of the path, the walkthrough rewinds to the start.
    pub fn start(&mut self) {
        if self.curve.points().len() < 2 || !(self.table.total_length() > 0.0) {
            debug!("Nothing to play, path has no length");
            return;
        }
        if self.state == PlaybackState::Finished || self.s >= self.table.total_length() {
            self.rewind();
            self.hold = 0.0;
            self.boost_remaining_ms = 0.0;
        }
        self.paused = false;
        self.age = 0.0;
        self.state = if self.hold > 0.0 {
            PlaybackState::Dwelling
        } else {
            PlaybackState::Running
        };
        debug!("Walkthrough started at s={:.3}", self.s);
    }

    /// Cancels playback. The camera stays where it is.
    pub fn stop(&mut self) {
        if self.state != PlaybackState::Idle {
            debug!("Walkthrough stopped at s={:.3}", self.s);
        }
        self.state = PlaybackState::Idle;
        self.paused = false;
    }

    /// Flips the pause flag; unpausing a walkthrough that is not active
    /// starts it.
    pub fn toggle_pause(&mut self) {
        self.paused = !self.paused;
        if !self.paused && !self.is_active() {
            self.start();
        }
    }

    /// True while travelling or dwelling and not paused.
    pub fn is_running(&self) -> bool {
        self.is_active() && !self.paused
    }

    fn is_active(&self) -> bool {
        matches!(self.state, PlaybackState::Running | PlaybackState::Dwelling)
    }

    /// Sets the base speed; negative or non-finite values become 0.
    pub fn set_speed(&mut self, speed: f64) {
        self.options.speed = if speed.is_finite() { speed.max(0.0) } else { 0.0 };
    }

    /// Advances the walkthrough by one frame.
    pub fn tick(&mut self, dt: f64) -> TickOutcome {
        match self.state {
            PlaybackState::Idle => return TickOutcome::Idle,
            PlaybackState::Finished => return TickOutcome::Finished,
            _ => {}
        }
        if self.paused {
            return TickOutcome::Paused;
        }

        let dt = if dt.is_finite() {
            dt.clamp(0.0, self.options.max_frame_dt)
        } else {
            0.0
        };
        self.age += dt;

        if self.state == PlaybackState::Dwelling {
            self.hold -= dt;
            self.update_pose(dt, 0.0);
            if self.hold <= 0.0 {
                self.hold = 0.0;
                self.state = PlaybackState::Running;
            }
            return TickOutcome::Dwelling;
        }

        let speed = self.shaped_speed(dt);
        let len = self.table.total_length();
        let s_prev = self.s;
        let s_next = s_prev + speed * dt;
        let reach = s_next.min(len);

        let crossed = self.events.iter().position(|e| {
            !e.fired && (s_prev - EVENT_EPSILON) < e.s && e.s <= reach + EVENT_EPSILON
        });
        if let Some(k) = crossed {
            return self.enter_room(k, dt);
        }

        if s_next >= len {
            if !self.options.looping {
                self.s = len;
                self.update_pose(dt, 0.0);
                self.state = PlaybackState::Finished;
                debug!("Walkthrough finished");
                return TickOutcome::Finished;
            }
            self.rewind();
            self.age = 0.0;
            self.update_pose(dt, self.options.look_ahead);
            debug!("Walkthrough wrapped to the start");
            return TickOutcome::Wrapped;
        }

        self.s = s_next;
        self.update_pose(dt, self.options.look_ahead);
        TickOutcome::Moved
    }

    fn shaped_speed(&mut self, dt: f64) -> f64 {
        let o = &self.options;
        let mut speed = o.speed;

        if let Some(next) = self.events.iter().find(|e| !e.fired) {
            let dist = (next.s - self.s).max(0.0);
            if dist <= o.slow_radius {
                let u = (dist / o.slow_radius.max(1e-6)).clamp(0.0, 1.0);
                speed *= lerp(o.slow_factor, 1.0, smoothstep(u));
            }
        }

        if self.boost_remaining_ms > 0.0 {
            self.boost_remaining_ms = (self.boost_remaining_ms - dt * 1000.0).max(0.0);
            let k = self.boost_remaining_ms / self.boost_window_ms.max(1.0);
            speed *= lerp(1.0, o.resume_boost, k);
        }

        if o.ramp_up_sec > 0.0 {
            speed *= smoothstep((self.age / o.ramp_up_sec).clamp(0.0, 1.0));
        }

        speed
    }

    fn enter_room(&mut self, k: usize, dt: f64) -> TickOutcome {
        self.s = self.events[k].s;
        self.update_pose(dt, self.options.dwell_look_ahead);

        let room = self.events[k].room.clone();
        if let Some(callback) = self.on_room_enter.as_mut() {
            callback(&room);
        }

        self.hold = self.options.dwell_for(&room);
        self.boost_window_ms = self.options.post_boost_ms.max(self.options.min_boost_window_ms);
        self.boost_remaining_ms = self.boost_window_ms;
        self.events[k].fired = true;
        if self.hold > 0.0 {
            self.state = PlaybackState::Dwelling;
        }
        debug!("Entered {} at s={:.3}, dwell {:.2}s", room, self.s, self.hold);
        TickOutcome::Entered(room)
    }

    fn rewind(&mut self) {
        self.s = 0.0;
        for e in &mut self.events {
            e.fired = false;
        }
    }

    /// Writes position and a turn-rate-limited look-at target to the rig.
    fn update_pose(&mut self, dt: f64, advance: f64) {
        let len = self.table.total_length();
        let ahead = advance.max(self.options.min_look_ahead);
        let p = self.curve.point_at(self.table.t_at_distance(self.s));
        let q = self
            .curve
            .point_at(self.table.t_at_distance((self.s + ahead).clamp(0.0, len)));

        self.rig.set_position(p);

        let (dx, dz) = (q.x - p.x, q.z - p.z);
        let last = self.last_yaw;
        let desired = if dx * dx + dz * dz > 1e-12 {
            dx.atan2(dz)
        } else {
            // Vertical or zero look-ahead: hold the heading.
            last.unwrap_or(0.0)
        };
        let last = last.unwrap_or(desired);

        let max_step = self.options.max_yaw_rate.to_radians() * dt;
        let delta = wrap_angle(desired - last).clamp(-max_step, max_step);
        let yaw = last + delta;
        self.last_yaw = Some(yaw);

        let dist = (q - p).norm().max(MIN_TARGET_DISTANCE);
        let soft = Vector3::new(p.x + yaw.sin() * dist, q.y, p.z + yaw.cos() * dist);
        let target = self.rig.target().lerp(&soft, self.options.target_blend);
        self.rig.set_target(target);
        self.rig.update();
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Current arc-length position.
    pub fn position(&self) -> f64 {
        self.s
    }

    /// Total path length.
    pub fn length(&self) -> f64 {
        self.table.total_length()
    }

    /// Heading after the last pose update (radians, 0 = +z).
    pub fn yaw(&self) -> Option<f64> {
        self.last_yaw
    }

    /// Room events in ascending arc-length order.
    pub fn events(&self) -> &[RoomEvent] {
        &self.events
    }

    pub fn fired_count(&self) -> usize {
        self.events.iter().filter(|e| e.fired).count()
    }

    pub fn options(&self) -> &WalkthroughOptions {
        &self.options
    }

    /// Point on the path at arc length `s`.
    pub fn point_at_distance(&self, s: f64) -> Vector3<f64> {
        self.curve.point_at(self.table.t_at_distance(s))
    }

    pub fn rig(&self) -> &R {
        &self.rig
    }

    pub fn rig_mut(&mut self) -> &mut R {
        &mut self.rig
    }

    pub fn into_rig(self) -> R {
        self.rig
    }
}

/// Places one event per room of `room_order` that has a known center.
///
/// A room with a known first-arrival control point `k` sits at the arc
/// length of `t = k / (n - 1)`. Nearest-sample lookup would land on a
/// later backtrack through the same center.
fn place_events(
    table: &ArcLengthTable,
    options: &WalkthroughOptions,
    arrivals: &HashMap<RoomId, usize>,
    point_count: usize,
) -> Vec<RoomEvent> {
    let mut seen = HashSet::new();
    let mut events: Vec<RoomEvent> = options
        .room_order
        .iter()
        .filter(|id| seen.insert((*id).clone()))
        .filter_map(|id| {
            let center = options.room_centers.get(id)?;
            let s = match arrivals.get(id) {
                Some(&k) if point_count >= 2 && k < point_count => {
                    table.distance_at_t(k as f64 / (point_count - 1) as f64)
                }
                _ => table.distance_at_closest_point(center),
            };
            Some(RoomEvent {
                s,
                room: id.clone(),
                fired: false,
            })
        })
        .collect();
    // Ties go to the earlier arrival; stable, so rooms without one keep
    // their visiting order.
    events.sort_by(|a, b| {
        a.s.partial_cmp(&b.s)
            .unwrap_or(Ordering::Equal)
            .then_with(|| match (arrivals.get(&a.room), arrivals.get(&b.room)) {
                (Some(x), Some(y)) => x.cmp(y),
                _ => Ordering::Equal,
            })
    });
    events
}

/// Cubic ease on [0, 1], clamped outside.
pub fn smoothstep(t: f64) -> f64 {
    if t <= 0.0 {
        0.0
    } else if t >= 1.0 {
        1.0
    } else {
        t * t * (3.0 - 2.0 * t)
    }
}

pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

/// Wraps an angle to [-PI, PI].
fn wrap_angle(a: f64) -> f64 {
    a.sin().atan2(a.cos())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::cell::RefCell;
    use std::rc::Rc;
    use walkthrough_env::FreeCameraRig;

    const DT: f64 = 1.0 / 60.0;

    fn straight(len: f64) -> Vec<Vector3<f64>> {
        vec![Vector3::new(0.0, 1.6, 0.0), Vector3::new(len, 1.6, 0.0)]
    }

    fn with_room(room: &str, at: Vector3<f64>) -> WalkthroughOptions {
        let mut o = WalkthroughOptions::default();
        o.room_order = vec![RoomId::new(room)];
        o.room_centers.insert(RoomId::new(room), at);
        o
    }

    fn run_until<R: CameraRig>(
        w: &mut Walkthrough<R>,
        max_frames: usize,
        mut stop: impl FnMut(&TickOutcome) -> bool,
    ) -> Option<TickOutcome> {
        for _ in 0..max_frames {
            let out = w.tick(DT);
            assert!(w.position() <= w.length());
            if stop(&out) {
                return Some(out);
            }
        }
        None
    }

    #[test]
    fn test_bare_path_finishes_without_events() {
        let mut options = WalkthroughOptions::default();
        options.speed = 2.0;
        let mut w = Walkthrough::new(FreeCameraRig::default(), &straight(10.0), options);
        let entered = Rc::new(RefCell::new(0));
        let counter = entered.clone();
        w.on_room_enter(move |_| *counter.borrow_mut() += 1);

        w.start();
        assert_eq!(w.state(), PlaybackState::Running);
        let out = run_until(&mut w, 60 * 20, |o| *o == TickOutcome::Finished);

        assert_eq!(out, Some(TickOutcome::Finished));
        assert_eq!(*entered.borrow(), 0);
        assert_relative_eq!(w.position(), w.length());
        assert_relative_eq!(w.rig().position(), Vector3::new(10.0, 1.6, 0.0), epsilon = 1e-9);
        assert_eq!(w.tick(DT), TickOutcome::Finished);
    }

    #[test]
    fn test_start_on_empty_path_is_noop() {
        let mut w = Walkthrough::new(FreeCameraRig::default(), &[], WalkthroughOptions::default());
        w.start();
        assert_eq!(w.state(), PlaybackState::Idle);
        assert_eq!(w.tick(DT), TickOutcome::Idle);

        let p = Vector3::new(1.0, 1.6, 1.0);
        let mut w = Walkthrough::new(FreeCameraRig::default(), &[p, p], WalkthroughOptions::default());
        w.start();
        assert!(!w.is_running());
    }

    #[test]
    fn test_event_clamps_exactly_and_dwells() {
        let options = with_room("den", Vector3::new(5.0, 1.6, 0.0));
        let mut w = Walkthrough::new(FreeCameraRig::default(), &straight(10.0), options);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = seen.clone();
        w.on_room_enter(move |id| log.borrow_mut().push(id.clone()));

        w.start();
        let out = run_until(&mut w, 60 * 20, |o| matches!(o, TickOutcome::Entered(_)));

        assert_eq!(out, Some(TickOutcome::Entered(RoomId::new("den"))));
        assert_eq!(w.position(), w.events()[0].s);
        assert_eq!(w.state(), PlaybackState::Dwelling);
        assert_eq!(*seen.borrow(), vec![RoomId::new("den")]);

        // Default dwell is one second.
        let held = w.position();
        let mut dwell_frames = 0;
        while w.tick(DT) == TickOutcome::Dwelling {
            dwell_frames += 1;
            assert_eq!(w.position(), held);
        }
        assert!((59..=61).contains(&dwell_frames), "dwell frames {}", dwell_frames);

        run_until(&mut w, 60 * 20, |o| *o == TickOutcome::Finished);
        assert_eq!(seen.borrow().len(), 1);
    }

    #[test]
    fn test_per_room_dwell_and_zero_dwell() {
        let mut options = with_room("hall", Vector3::new(3.0, 1.6, 0.0));
        options.per_room_dwell.insert(RoomId::new("hall"), 0.0);
        let mut w = Walkthrough::new(FreeCameraRig::default(), &straight(6.0), options);
        w.start();
        run_until(&mut w, 60 * 20, |o| matches!(o, TickOutcome::Entered(_)));
        assert_eq!(w.state(), PlaybackState::Running);
        assert_ne!(w.tick(DT), TickOutcome::Dwelling);
    }

    #[test]
    fn test_event_at_path_end_fires_before_finish() {
        let options = with_room("end", Vector3::new(4.0, 1.6, 0.0));
        let mut w = Walkthrough::new(FreeCameraRig::default(), &straight(4.0), options);
        w.start();
        let mut outcomes = Vec::new();
        run_until(&mut w, 60 * 20, |o| {
            outcomes.push(o.clone());
            *o == TickOutcome::Finished
        });
        let entered = outcomes
            .iter()
            .position(|o| matches!(o, TickOutcome::Entered(_)))
            .unwrap();
        assert!(entered < outcomes.len() - 1);
        assert_eq!(w.fired_count(), 1);
    }

    #[test]
    fn test_loop_resets_events_and_position() {
        let mut options = with_room("mid", Vector3::new(2.0, 1.6, 0.0));
        options.looping = true;
        options.dwell_sec = 0.1;
        let mut w = Walkthrough::new(FreeCameraRig::default(), &straight(4.0), options);
        let count = Rc::new(RefCell::new(0));
        let c = count.clone();
        w.on_room_enter(move |_| *c.borrow_mut() += 1);

        w.start();
        let out = run_until(&mut w, 60 * 30, |o| *o == TickOutcome::Wrapped);
        assert_eq!(out, Some(TickOutcome::Wrapped));
        assert_eq!(*count.borrow(), 1);
        assert_eq!(w.position(), 0.0);
        assert!(w.events().iter().all(|e| !e.fired));
        assert_eq!(w.state(), PlaybackState::Running);

        // Fires again on the next pass.
        run_until(&mut w, 60 * 30, |o| matches!(o, TickOutcome::Entered(_)));
        assert_eq!(*count.borrow(), 2);
    }

    #[test]
    fn test_yaw_rate_is_limited() {
        let points = vec![
            Vector3::new(0.0, 1.6, 0.0),
            Vector3::new(6.0, 1.6, 0.0),
            Vector3::new(6.0, 1.6, -6.0),
            Vector3::new(0.0, 1.6, -6.0),
        ];
        let mut w = Walkthrough::new(FreeCameraRig::default(), &points, WalkthroughOptions::default());
        w.start();
        let max_step = 140f64.to_radians() * DT + 1e-12;

        let mut last = None;
        let mut turned = 0.0;
        for _ in 0..60 * 30 {
            if w.tick(DT) == TickOutcome::Finished {
                break;
            }
            let yaw = w.yaw().unwrap();
            if let Some(prev) = last {
                let step = wrap_angle(yaw - prev).abs();
                assert!(step <= max_step, "yaw step {} > {}", step, max_step);
                turned += step;
            }
            last = Some(yaw);
        }
        assert_eq!(w.state(), PlaybackState::Finished);
        // Two right-angle turns.
        assert!(turned > 2.5);
    }

    #[test]
    fn test_pause_and_resume() {
        let mut w = Walkthrough::new(FreeCameraRig::default(), &straight(10.0), WalkthroughOptions::default());
        w.start();
        for _ in 0..30 {
            w.tick(DT);
        }
        let s = w.position();
        assert!(s > 0.0);

        w.toggle_pause();
        assert!(!w.is_running());
        assert_eq!(w.tick(DT), TickOutcome::Paused);
        assert_eq!(w.position(), s);

        w.toggle_pause();
        assert!(w.is_running());
        assert_eq!(w.tick(DT), TickOutcome::Moved);
    }

    #[test]
    fn test_toggle_pause_starts_idle_walkthrough() {
        let mut w = Walkthrough::new(FreeCameraRig::default(), &straight(10.0), WalkthroughOptions::default());
        w.toggle_pause();
        assert!(!w.is_running());
        w.toggle_pause();
        assert!(w.is_running());
    }

    #[test]
    fn test_stop_is_idempotent_and_keeps_position() {
        let mut w = Walkthrough::new(FreeCameraRig::default(), &straight(10.0), WalkthroughOptions::default());
        w.start();
        for _ in 0..60 {
            w.tick(DT);
        }
        let s = w.position();
        w.stop();
        w.stop();
        assert_eq!(w.state(), PlaybackState::Idle);
        assert_eq!(w.tick(DT), TickOutcome::Idle);
        assert_eq!(w.position(), s);
    }

    #[test]
    fn test_start_after_finish_rewinds() {
        let options = with_room("r", Vector3::new(1.0, 1.6, 0.0));
        let mut w = Walkthrough::new(FreeCameraRig::default(), &straight(2.0), options);
        w.start();
        run_until(&mut w, 60 * 20, |o| *o == TickOutcome::Finished);
        assert_eq!(w.fired_count(), 1);

        w.start();
        assert_eq!(w.position(), 0.0);
        assert_eq!(w.fired_count(), 0);
        assert_eq!(w.state(), PlaybackState::Running);
    }

    #[test]
    fn test_plan_events_fire_in_route_order() {
        use crate::graph::{RoomGraph, RoomNode};
        use crate::planner::{plan, PlanOptions};

        // Hub with three spokes; the route backtracks through the hub
        // and ends on the entry.
        let graph = RoomGraph::builder()
            .room(RoomNode::new("hall").at(0.0, 0.0))
            .room(RoomNode::new("east").at(4.0, 0.0))
            .room(RoomNode::new("north").at(0.0, 4.0))
            .room(RoomNode::new("west").at(-4.0, 0.0))
            .edge("hall", "east")
            .edge("hall", "north")
            .edge("hall", "west")
            .build();
        let options = PlanOptions {
            entry_id: Some(RoomId::new("hall")),
            ..Default::default()
        };
        let p = plan(&graph, &options);
        assert!(p.route.iter().filter(|r| r.as_str() == "hall").count() > 1);

        let mut first_visits: Vec<RoomId> = Vec::new();
        for room in &p.route {
            if !first_visits.contains(room) {
                first_visits.push(room.clone());
            }
        }

        let walk_options = WalkthroughOptions {
            speed: 20.0,
            dwell_sec: 0.0,
            ramp_up_sec: 0.0,
            ..Default::default()
        };
        let mut w = Walkthrough::from_plan(FreeCameraRig::default(), &p, walk_options);
        // The entry fires right after the glide, not on the way back.
        assert_eq!(w.events()[0].room, RoomId::new("hall"));
        assert!(w.events()[0].s < 0.5 * w.length());

        w.start();
        let mut entered = Vec::new();
        for _ in 0..10_000 {
            match w.tick(0.05) {
                TickOutcome::Entered(room) => entered.push(room),
                TickOutcome::Finished => break,
                _ => {}
            }
        }
        assert_eq!(entered, first_visits);
        assert_eq!(entered[0], RoomId::new("hall"));
    }

    #[test]
    fn test_start_after_stop_at_end_rewinds() {
        let mut options = with_room("r", Vector3::new(1.0, 1.6, 0.0));
        options.dwell_sec = 0.0;
        let mut w = Walkthrough::new(FreeCameraRig::default(), &straight(2.0), options);
        w.start();
        run_until(&mut w, 60 * 20, |o| *o == TickOutcome::Finished);
        w.stop();
        assert_eq!(w.state(), PlaybackState::Idle);
        assert_relative_eq!(w.position(), w.length());

        w.start();
        assert_eq!(w.position(), 0.0);
        assert_eq!(w.fired_count(), 0);
        assert_eq!(w.tick(DT), TickOutcome::Moved);
        assert!(w.position() > 0.0 && w.position() < 0.5);
    }

    #[test]
    fn test_set_speed_clamps() {
        let mut w = Walkthrough::new(FreeCameraRig::default(), &straight(10.0), WalkthroughOptions::default());
        w.set_speed(-3.0);
        assert_eq!(w.options().speed, 0.0);
        w.set_speed(f64::NAN);
        assert_eq!(w.options().speed, 0.0);
        w.set_speed(2.5);
        assert_eq!(w.options().speed, 2.5);

        w.set_speed(0.0);
        w.start();
        for _ in 0..120 {
            w.tick(DT);
        }
        assert_eq!(w.position(), 0.0);
    }

    #[test]
    fn test_frame_dt_is_capped() {
        let mut options = WalkthroughOptions::default();
        options.ramp_up_sec = 0.0;
        let mut w = Walkthrough::new(FreeCameraRig::default(), &straight(10.0), options);
        w.start();
        w.tick(10.0);
        assert_relative_eq!(w.position(), 1.6 * 0.05, epsilon = 1e-12);
    }

    #[test]
    fn test_events_sorted_and_deduplicated() {
        let mut options = WalkthroughOptions::default();
        options.room_order = vec![
            RoomId::new("far"),
            RoomId::new("near"),
            RoomId::new("far"),
            RoomId::new("ghost"),
        ];
        options.room_centers.insert(RoomId::new("far"), Vector3::new(8.0, 1.6, 0.0));
        options.room_centers.insert(RoomId::new("near"), Vector3::new(2.0, 1.6, 0.0));
        let w = Walkthrough::new(FreeCameraRig::default(), &straight(10.0), options);

        let rooms: Vec<&str> = w.events().iter().map(|e| e.room.as_str()).collect();
        assert_eq!(rooms, vec!["near", "far"]);
    }

    #[test]
    fn test_options_from_json() {
        let options: WalkthroughOptions = serde_json::from_str(
            r#"{"speed": 3, "loop": true, "per_room_dwell": {"k": 2.5, "7": 0}}"#,
        )
        .unwrap();
        assert_eq!(options.speed, 3.0);
        assert!(options.looping);
        assert_eq!(options.dwell_for(&RoomId::new("k")), 2.5);
        assert_eq!(options.dwell_for(&RoomId::new("7")), 0.0);
        assert_eq!(options.dwell_for(&RoomId::new("other")), 1.0);
    }

    #[test]
    fn test_sanitized_replaces_bad_values() {
        let mut options = WalkthroughOptions::default();
        options.speed = f64::NAN;
        options.slow_radius = -1.0;
        options.target_blend = 4.0;
        let o = options.sanitized();
        assert_eq!(o.speed, 1.6);
        assert_eq!(o.slow_radius, 2.0);
        assert_eq!(o.target_blend, 1.0);
    }

    #[test]
    fn test_smoothstep() {
        assert_eq!(smoothstep(-1.0), 0.0);
        assert_eq!(smoothstep(0.5), 0.5);
        assert_eq!(smoothstep(2.0), 1.0);
        assert_eq!(lerp(0.25, 1.0, 0.0), 0.25);
    }
}
