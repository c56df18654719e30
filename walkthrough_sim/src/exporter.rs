//! JSON exporter for recorded walkthroughs.
//!
//! Writes sampled camera frames plus a summary of the plan, for offline
//! plotting or replay in a viewer.

use crate::error::SimError;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use walkthrough_core::{PlaybackState, WalkPlan, Walkthrough};
use walkthrough_env::{CameraRig, RoomId};

/// A single sampled frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimFrame {
    /// Simulation time in seconds
    pub time_sec: f64,

    /// Arc-length position on the path
    pub arc_length: f64,

    pub state: PlaybackState,

    /// Eye position
    pub position: Point,

    /// Look-at target
    pub target: Point,

    /// Room whose first arrival happened this frame
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub entered: Option<RoomId>,
}

impl SimFrame {
    /// Snapshots the walkthrough after a tick.
    pub fn capture<R: CameraRig>(
        time_sec: f64,
        walk: &Walkthrough<R>,
        entered: Option<RoomId>,
    ) -> Self {
        Self {
            time_sec,
            arc_length: walk.position(),
            state: walk.state(),
            position: Point::from(walk.rig().position()),
            target: Point::from(walk.rig().target()),
            entered,
        }
    }
}

/// A 3D point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl From<Vector3<f64>> for Point {
    fn from(v: Vector3<f64>) -> Self {
        Self {
            x: v.x,
            y: v.y,
            z: v.z,
        }
    }
}

/// What the planner produced for the run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanSummary {
    pub entry: Option<RoomId>,
    pub order: Vec<RoomId>,
    pub route: Vec<RoomId>,
    pub detached: Vec<Vec<RoomId>>,
    pub waypoints: Vec<Point>,
    pub path_length: f64,
}

impl PlanSummary {
    pub fn new(plan: &WalkPlan, path_length: f64) -> Self {
        Self {
            entry: plan.entry.clone(),
            order: plan.order.clone(),
            route: plan.route.clone(),
            detached: plan.detached.clone(),
            waypoints: plan.waypoints.iter().map(|w| Point::from(w.position)).collect(),
            path_length,
        }
    }
}

/// Complete simulation export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimExport {
    /// Scenario name
    pub scenario: String,

    /// Tick rate used
    pub fps: u32,

    /// Duration in seconds
    pub duration_sec: f64,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub plan: Option<PlanSummary>,

    /// Sampled frames
    pub frames: Vec<SimFrame>,

    /// Final results
    pub passed: bool,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub failure_reason: Option<String>,
}

impl SimExport {
    /// Creates a new export container.
    pub fn new(scenario: &str, fps: u32) -> Self {
        Self {
            scenario: scenario.to_string(),
            fps,
            duration_sec: 0.0,
            plan: None,
            frames: Vec::new(),
            passed: false,
            failure_reason: None,
        }
    }

    /// Adds a frame.
    pub fn add_frame(&mut self, frame: SimFrame) {
        self.duration_sec = frame.time_sec;
        self.frames.push(frame);
    }

    /// Finalizes the export.
    pub fn finalize(&mut self, passed: bool, failure_reason: Option<String>) {
        self.passed = passed;
        self.failure_reason = failure_reason;
    }

    /// Writes to a JSON file.
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> Result<(), SimError> {
        let json = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}
