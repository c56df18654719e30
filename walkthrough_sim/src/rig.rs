//! Camera rig that records every pose the engine writes.

use crate::error::SimError;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use walkthrough_env::{CameraRig, FreeCameraRig};

/// One pose as committed by `update()`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RecordedPose {
    pub position: Vector3<f64>,
    pub target: Vector3<f64>,
    /// Heading of the view vector (radians)
    pub yaw: f64,
}

/// `CameraRig` for simulation: a free camera plus a pose log.
#[derive(Debug, Clone)]
pub struct RecordingRig {
    inner: FreeCameraRig,
    poses: Vec<RecordedPose>,
}

impl RecordingRig {
    /// Creates a rig at a host-supplied start pose.
    pub fn new(position: Vector3<f64>, target: Vector3<f64>) -> Result<Self, SimError> {
        Ok(Self {
            inner: FreeCameraRig::try_new(position, target)?,
            poses: Vec::new(),
        })
    }

    /// Every committed pose, oldest first.
    pub fn poses(&self) -> &[RecordedPose] {
        &self.poses
    }

    pub fn last(&self) -> Option<&RecordedPose> {
        self.poses.last()
    }

    pub fn update_count(&self) -> u64 {
        self.inner.update_count()
    }

    /// Total distance travelled by the eye.
    pub fn travelled(&self) -> f64 {
        self.poses
            .windows(2)
            .map(|w| (w[1].position - w[0].position).norm())
            .sum()
    }
}

impl Default for RecordingRig {
    fn default() -> Self {
        Self {
            inner: FreeCameraRig::default(),
            poses: Vec::new(),
        }
    }
}

impl CameraRig for RecordingRig {
    fn position(&self) -> Vector3<f64> {
        self.inner.position()
    }

    fn set_position(&mut self, position: Vector3<f64>) {
        self.inner.set_position(position);
    }

    fn target(&self) -> Vector3<f64> {
        self.inner.target()
    }

    fn set_target(&mut self, target: Vector3<f64>) {
        self.inner.set_target(target);
    }

    fn update(&mut self) {
        self.inner.update();
        self.poses.push(RecordedPose {
            position: self.inner.position(),
            target: self.inner.target(),
            yaw: self.inner.yaw(),
        });
    }
}
