//! Walkthrough Environment Abstraction Layer
//!
//! This crate holds the seam between the walkthrough engine and the host
//! application that owns the real camera:
//! - **Identity**: `RoomId`, the id type shared by planner, engine and host
//! - **Output**: `CameraRig`, the only object the engine writes to
//!
//! The engine owns no timer and no renderer; the host calls
//! `Walkthrough::tick(dt)` from its own loop and the engine writes one
//! pose into the rig per call.
//!
//! # Example
//!
//! ```ignore
//! use walkthrough_env::{CameraRig, FreeCameraRig};
//!
//! let mut rig = FreeCameraRig::default();
//! let mut walk = Walkthrough::new(&mut rig, &plan.points(), options);
//! walk.start();
//! loop {
//!     walk.tick(frame_dt);
//! }
//! ```

mod error;
mod free_rig;
mod rig;
mod types;

pub use error::EnvError;
pub use free_rig::FreeCameraRig;
pub use rig::CameraRig;
pub use types::RoomId;
