//! Camera rig trait the playback engine drives.

use nalgebra::Vector3;

/// The writable camera the walkthrough engine steers.
///
/// This trait abstracts the host's camera + orbit-controls pair so that
/// the engine never needs to know about a renderer. The engine writes a
/// position and a look-at target once per frame and then calls
/// [`CameraRig::update`] exactly once.
///
/// # Implementations
///
/// - **Production**: `FreeCameraRig` - stores the pose and derives yaw/pitch
/// - **Simulation**: `RecordingRig` (walkthrough_sim) - records every pose
///
/// The host is responsible for not mutating the rig from another source
/// while a walkthrough is running.
pub trait CameraRig {
    /// Current eye position.
    fn position(&self) -> Vector3<f64>;

    /// Moves the eye.
    fn set_position(&mut self, position: Vector3<f64>);

    /// Current look-at target.
    ///
    /// The engine reads this back to blend smoothly toward a new target.
    fn target(&self) -> Vector3<f64>;

    /// Replaces the look-at target.
    fn set_target(&mut self, target: Vector3<f64>);

    /// Hook invoked after each pose write (controls.update() in most hosts).
    fn update(&mut self);
}

impl<R: CameraRig + ?Sized> CameraRig for &mut R {
    fn position(&self) -> Vector3<f64> {
        (**self).position()
    }

    fn set_position(&mut self, position: Vector3<f64>) {
        (**self).set_position(position)
    }

    fn target(&self) -> Vector3<f64> {
        (**self).target()
    }

    fn set_target(&mut self, target: Vector3<f64>) {
        (**self).set_target(target)
    }

    fn update(&mut self) {
        (**self).update()
    }
}

impl<R: CameraRig + ?Sized> CameraRig for Box<R> {
    fn position(&self) -> Vector3<f64> {
        (**self).position()
    }

    fn set_position(&mut self, position: Vector3<f64>) {
        (**self).set_position(position)
    }

    fn target(&self) -> Vector3<f64> {
        (**self).target()
    }

    fn set_target(&mut self, target: Vector3<f64>) {
        (**self).set_target(target)
    }

    fn update(&mut self) {
        (**self).update()
    }
}
