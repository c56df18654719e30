//! Walkthrough Simulator - Deterministic Playback Harness
//!
//! Plans built-in (or user-supplied) floor plans and plays them back on
//! a fixed-step virtual clock, recording every camera pose. Runs are
//! checked for the walkthrough guarantees: every room discovered once,
//! the route only follows edges, each room event fires exactly on its
//! arc-length position, and the camera never runs past the path.
//!
//! # Architecture
//!
//! ```text
//! ScenarioId ─► RoomGraph ─► plan() ─► Walkthrough<RecordingRig>
//!                                          ▲        │
//!                             SimClock ────┘        ├─► RunMetrics / checks
//!                                                   └─► SimExport (JSON)
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use walkthrough_sim::{ScenarioId, ScenarioRunner};
//!
//! let result = ScenarioRunner::new().with_fps(30).run(ScenarioId::Townhouse)?;
//! assert!(result.passed);
//! # Ok::<(), walkthrough_sim::SimError>(())
//! ```

mod context;
mod error;
mod exporter;
mod options;
mod rig;
mod runner;
pub mod scenarios;

pub use context::SimClock;
pub use error::SimError;
pub use exporter::{PlanSummary, Point, SimExport, SimFrame};
pub use options::SimOptions;
pub use rig::{RecordedPose, RecordingRig};
pub use runner::{CheckResult, RunMetrics, ScenarioResult, ScenarioRunner};
pub use scenarios::{ScenarioId, ScenarioInput};
