//! # Camera State Management
//!
//! Camera position and orientation, fly controls, and the reframing used after
//! every mesh rebuild.
//!
//! ## Core Components
//! - `Camera`: Represents the camera's position and orientation in 3D space
//! - `CameraController`: Handles player input and updates camera state
//! - `Projection`: Manages the camera's projection matrix

use camera::{Camera, CameraController};
use cgmath::{Deg, Point3, Vector3};

pub mod camera;

/// Movement requested by the input layer for one frame.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct FlyActions {
    /// Movement actions - true if key is pressed or held
    pub move_forward: bool,
    pub move_backward: bool,
    pub move_left: bool,
    pub move_right: bool,
    pub move_up: bool,
    pub move_down: bool,

    /// View rotation - Some while the look button is held and the mouse moved
    pub rotate_view: Option<(f64, f64)>,
}

/// Owns the camera and its fly controller.
pub struct CameraState {
    /// The current camera position and orientation
    pub camera: Camera,
    /// Handles player input and camera movement
    pub camera_controller: CameraController,
}

impl CameraState {
    /// Creates a camera at the origin looking along +X.
    ///
    /// # Arguments
    /// * `speed` - Fly speed in units per second
    /// * `sensitivity` - Mouse look multiplier
    pub fn new(speed: f32, sensitivity: f32) -> Self {
        Self {
            camera: Camera::new(Point3::new(0.0, 0.0, 0.0), Deg(0.0), Deg(0.0)),
            camera_controller: CameraController::new(speed, sensitivity),
        }
    }

    /// Processes player input actions and updates the camera controller state.
    pub fn intake_actions(&mut self, actions: &FlyActions) {
        self.camera_controller.intake_actions(actions);
    }

    /// Applies pending controller movement.
    ///
    /// # Returns
    /// `true` if the camera moved or turned
    pub fn update(&mut self, dt: web_time::Duration) -> bool {
        if !self.camera_controller.has_updates() {
            return false;
        }
        self.camera
            .get_controller_updates_and_reset_controller(&mut self.camera_controller, dt);
        true
    }

    /// Frames a bounding sphere: the camera sits `2 * radius` along +X from
    /// `center` and looks back at it with +Y up.
    pub fn frame_bounds(&mut self, center: Point3<f32>, radius: f32) {
        let eye = center + Vector3::new(radius * 2.0, 0.0, 0.0);
        self.camera.look_at(eye, center);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_bounds_places_camera_on_x_axis() {
        let mut state = CameraState::new(1.0, 1.0);
        state.frame_bounds(Point3::new(4.0, 5.0, 6.0), 10.0);

        assert_eq!(state.camera.position, Point3::new(24.0, 5.0, 6.0));
        let view = state.camera.get_view_vec();
        assert!((view.x + 1.0).abs() < 1e-5);
        assert!(view.y.abs() < 1e-5);
    }

    #[test]
    fn test_update_without_input_is_noop() {
        let mut state = CameraState::new(1.0, 1.0);
        assert!(!state.update(web_time::Duration::from_millis(16)));
    }
}
