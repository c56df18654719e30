//! Production implementation of CameraRig for hosts without their own controls.

use crate::{CameraRig, EnvError};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// A free-flying first-person camera.
///
/// Stores an eye position and a look-at target; `update()` refreshes the
/// cached yaw/pitch angles a renderer would read to build its view
/// matrix. Yaw is measured around +Y from +Z toward +X, matching the
/// engine's heading convention.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FreeCameraRig {
    position: Vector3<f64>,
    target: Vector3<f64>,

    /// Heading in radians, refreshed on `update()`
    yaw: f64,

    /// Elevation in radians, refreshed on `update()`
    pitch: f64,

    /// Number of `update()` calls since creation
    updates: u64,
}

impl FreeCameraRig {
    /// Creates a rig at `position` looking at `target`.
    pub fn new(position: Vector3<f64>, target: Vector3<f64>) -> Self {
        let mut rig = Self {
            position,
            target,
            yaw: 0.0,
            pitch: 0.0,
            updates: 0,
        };
        rig.refresh_angles();
        rig
    }

    /// Creates a rig, rejecting non-finite coordinates.
    pub fn try_new(position: Vector3<f64>, target: Vector3<f64>) -> Result<Self, EnvError> {
        check_finite("position", &position)?;
        check_finite("target", &target)?;
        Ok(Self::new(position, target))
    }

    /// Moves the eye, rejecting non-finite coordinates.
    pub fn try_set_position(&mut self, position: Vector3<f64>) -> Result<(), EnvError> {
        check_finite("position", &position)?;
        self.position = position;
        Ok(())
    }

    /// Replaces the target, rejecting non-finite coordinates.
    pub fn try_set_target(&mut self, target: Vector3<f64>) -> Result<(), EnvError> {
        check_finite("target", &target)?;
        self.target = target;
        Ok(())
    }

    /// Heading in radians as of the last `update()`.
    pub fn yaw(&self) -> f64 {
        self.yaw
    }

    /// Elevation in radians as of the last `update()`.
    pub fn pitch(&self) -> f64 {
        self.pitch
    }

    /// Number of `update()` calls so far.
    pub fn update_count(&self) -> u64 {
        self.updates
    }

    fn refresh_angles(&mut self) {
        let d = self.target - self.position;
        let planar = (d.x * d.x + d.z * d.z).sqrt();
        // A zero-length view vector keeps the previous angles.
        if planar > 1e-9 {
            self.yaw = d.x.atan2(d.z);
        }
        if planar > 1e-9 || d.y.abs() > 1e-9 {
            self.pitch = d.y.atan2(planar);
        }
    }
}

fn check_finite(what: &str, v: &Vector3<f64>) -> Result<(), EnvError> {
    if v.iter().all(|c| c.is_finite()) {
        Ok(())
    } else {
        Err(EnvError::invalid_pose(format!("{} {:?}", what, v)))
    }
}

impl Default for FreeCameraRig {
    fn default() -> Self {
        Self::new(Vector3::zeros(), Vector3::new(0.0, 0.0, 1.0))
    }
}

impl CameraRig for FreeCameraRig {
    fn position(&self) -> Vector3<f64> {
        self.position
    }

    fn set_position(&mut self, position: Vector3<f64>) {
        self.position = position;
    }

    fn target(&self) -> Vector3<f64> {
        self.target
    }

    fn set_target(&mut self, target: Vector3<f64>) {
        self.target = target;
    }

    fn update(&mut self) {
        self.refresh_angles();
        self.updates += 1;
    }
}
