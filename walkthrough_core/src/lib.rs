//! Walkthrough Core - Edge-Faithful Camera Tours of Room Graphs
//!
//! Plans a first-person camera path through every room of a floor plan
//! and plays it back frame by frame. The camera only ever moves between
//! rooms that share an edge; branches are covered by walking back out.
//!
//! ```text
//! RoomGraph ─► entry ─► discovery ─► route ─► waypoints      (plan)
//!                                                 │
//!                      CatmullRomCurve ◄──────────┘
//!                             │
//!                      ArcLengthTable ─► Walkthrough::tick ─► CameraRig
//! ```
//!
//! # Example
//!
//! ```no_run
//! use walkthrough_core::{plan, PlanOptions, RoomGraph, Walkthrough, WalkthroughOptions};
//! use walkthrough_env::FreeCameraRig;
//!
//! let graph = RoomGraph::from_json_str(r#"{"nodes": [{"id": "foyer"}], "edges": []}"#)?;
//! let plan = plan(&graph, &PlanOptions::default());
//! let mut walk = Walkthrough::from_plan(FreeCameraRig::default(), &plan, WalkthroughOptions::default());
//! walk.start();
//! while walk.is_running() {
//!     walk.tick(1.0 / 60.0);
//! }
//! # Ok::<(), walkthrough_core::GraphError>(())
//! ```

pub mod arc_length;
pub mod curve;
pub mod discovery;
pub mod entry;
pub mod graph;
pub mod planner;
pub mod playback;
pub mod route;
pub mod waypoints;

// Re-export key types for convenience
pub use arc_length::ArcLengthTable;
pub use curve::CatmullRomCurve;
pub use discovery::{discover, Discovery, SpanningForest};
pub use entry::{is_entry_name, select_entry, EntryChoice, EntryReason};
pub use graph::{GraphError, RoomGraph, RoomGraphBuilder, RoomNode};
pub use planner::{plan, PlanOptions, WalkPlan};
pub use playback::{PlaybackState, RoomEvent, TickOutcome, Walkthrough, WalkthroughOptions};
pub use route::{build_route, is_edge_faithful};
pub use waypoints::{Waypoint, WaypointKind};
