//! # Camera Implementation
//!
//! This module contains the core camera implementation including:
//! - Camera representation and transformations
//! - Projection matrix handling
//! - Fly controller for input processing
//!
//! ## Key Components
//! - `Camera`: Represents the camera's position and orientation in 3D space
//! - `Projection`: Manages perspective projection settings
//! - `CameraController`: Turns fly actions into camera movement

use cgmath::*;
use std::f32::consts::FRAC_PI_2;
use web_time::Duration;

use super::FlyActions;

/// Transformation matrix to convert from OpenGL's coordinate system to WGPU's.
///
/// WGPU's normalized device coordinates range from 0 to 1 in Z while OpenGL's
/// range from -1 to 1. This matrix:
/// 1. Scales the Z coordinate from [-1, 1] to [-0.5, 0.5]
/// 2. Translates the Z coordinate from [-0.5, 0.5] to [0, 1]
#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: cgmath::Matrix4<f32> = cgmath::Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,  // Scale Z from [-1,1] to [-0.5,0.5]
    0.0, 0.0, 0.5, 1.0,  // Translate Z from [-0.5,0.5] to [0,1]
);

/// Safe limit for pitch to prevent gimbal lock
const SAFE_FRAC_PI_2: f32 = FRAC_PI_2 - 0.0001;

/// A yaw/pitch camera in 3D space with a fixed +Y up vector.
///
/// Yaw is measured from +X towards +Z, pitch from the horizontal plane.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    /// The camera's position in world space
    pub position: Point3<f32>,
    /// Horizontal rotation (around Y axis) in radians
    pub yaw: Rad<f32>,
    /// Vertical rotation in radians
    pub pitch: Rad<f32>,
}

impl Camera {
    /// Creates a new camera with the specified position and orientation.
    ///
    /// # Arguments
    /// * `position` - Initial position of the camera in world space
    /// * `yaw` - Initial yaw (horizontal rotation around Y axis)
    /// * `pitch` - Initial pitch (vertical rotation)
    pub fn new<V: Into<Point3<f32>>, Y: Into<Rad<f32>>, P: Into<Rad<f32>>>(
        position: V,
        yaw: Y,
        pitch: P,
    ) -> Self {
        Self {
            position: position.into(),
            yaw: yaw.into(),
            pitch: pitch.into(),
        }
    }

    /// Places the camera at `eye` and turns it towards `target`.
    ///
    /// Up is always +Y. If `eye == target` only the position changes.
    pub fn look_at(&mut self, eye: Point3<f32>, target: Point3<f32>) {
        self.position = eye;

        let direction = target - eye;
        let length = direction.magnitude();
        if length <= f32::EPSILON {
            return;
        }

        self.yaw = Rad(direction.z.atan2(direction.x));
        self.pitch = Rad((direction.y / length).clamp(-1.0, 1.0).asin())
            .clamp_to_safe_pitch();
    }

    /// Gets the camera's normalized forward direction.
    pub fn get_view_vec(&self) -> Vector3<f32> {
        let (yaw_sin, yaw_cos) = self.yaw.0.sin_cos();
        let (pitch_sin, pitch_cos) = self.pitch.0.sin_cos();
        Vector3::new(pitch_cos * yaw_cos, pitch_sin, pitch_cos * yaw_sin).normalize()
    }

    /// Calculates the view matrix for this camera.
    ///
    /// # Returns
    /// A 4x4 matrix transforming world coordinates to view space
    pub fn calc_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_to_rh(self.position, self.get_view_vec(), Vector3::unit_y())
    }

    /// Applies and clears the controller's pending movement.
    ///
    /// # Arguments
    /// * `controller` - The camera controller containing input state
    /// * `dt` - Time elapsed since the last update
    pub fn get_controller_updates_and_reset_controller(
        &mut self,
        controller: &mut CameraController,
        dt: Duration,
    ) {
        let dt = dt.as_secs_f32();

        // Move forward/backward and left/right
        let (yaw_sin, yaw_cos) = self.yaw.0.sin_cos();
        let forward = Vector3::new(yaw_cos, 0.0, yaw_sin);
        let right = Vector3::new(-yaw_sin, 0.0, yaw_cos);
        self.position += forward * (controller.amount_forward - controller.amount_backward) * dt;
        self.position += right * (controller.amount_right - controller.amount_left) * dt;

        // Move up/down
        self.position.y += (controller.amount_up - controller.amount_down) * dt;

        // Rotate
        self.yaw += Rad(controller.rotate_horizontal) * controller.sensitivity * dt;
        self.pitch += Rad(-controller.rotate_vertical) * controller.sensitivity * dt;
        self.pitch = self.pitch.clamp_to_safe_pitch();

        controller.reset();
    }
}

trait SafePitch {
    fn clamp_to_safe_pitch(self) -> Self;
}

impl SafePitch for Rad<f32> {
    fn clamp_to_safe_pitch(self) -> Self {
        Rad(self.0.clamp(-SAFE_FRAC_PI_2, SAFE_FRAC_PI_2))
    }
}

/// Represents a camera's projection matrix and related parameters.
///
/// This handles the perspective projection used to render the 3D scene.
/// It manages the aspect ratio, field of view, and near/far clipping planes.
#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    /// Aspect ratio (width / height)
    aspect: f32,
    /// Vertical field of view in radians
    fovy: Rad<f32>,
    /// Near clipping plane distance
    znear: f32,
    /// Far clipping plane distance
    zfar: f32,
}

impl Projection {
    /// Creates a new projection with the given parameters.
    ///
    /// # Arguments
    /// * `width` - Viewport width in pixels
    /// * `height` - Viewport height in pixels
    /// * `fovy` - Vertical field of view (can be any type convertible to `Rad<f32>`)
    /// * `znear` - Near clipping plane distance
    /// * `zfar` - Far clipping plane distance
    pub fn new<F: Into<Rad<f32>>>(width: u32, height: u32, fovy: F, znear: f32, zfar: f32) -> Self {
        Self {
            aspect: Self::aspect_of(width, height),
            fovy: fovy.into(),
            znear,
            zfar,
        }
    }

    /// Updates the projection's aspect ratio for viewport resizing.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.aspect = Self::aspect_of(width, height);
    }

    /// A minimized window reports a zero height; keep the last sane aspect in that case.
    fn aspect_of(width: u32, height: u32) -> f32 {
        if width == 0 || height == 0 {
            1.0
        } else {
            width as f32 / height as f32
        }
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    /// Calculates the projection matrix.
    ///
    /// Combines the perspective projection with the OpenGL to WGPU coordinate system transform.
    pub fn calc_matrix(&self) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * perspective(self.fovy, self.aspect, self.znear, self.zfar)
    }
}

/// Handles camera movement and rotation based on user input.
///
/// This struct tracks the current state of movement keys and mouse input,
/// and applies them to the camera when updated.
#[derive(Debug)]
pub struct CameraController {
    // Movement amounts in units per second
    amount_left: f32,
    amount_right: f32,
    amount_forward: f32,
    amount_backward: f32,
    amount_up: f32,
    amount_down: f32,

    // Rotation amounts from mouse deltas
    rotate_horizontal: f32,
    rotate_vertical: f32,

    // Configuration
    speed: f32,
    sensitivity: f32,
}

impl CameraController {
    /// Creates a new camera controller with the given speed and sensitivity.
    ///
    /// # Arguments
    /// * `speed` - Base movement speed in units per second
    /// * `sensitivity` - Mouse look sensitivity multiplier
    pub fn new(speed: f32, sensitivity: f32) -> Self {
        Self {
            amount_left: 0.0,
            amount_right: 0.0,
            amount_forward: 0.0,
            amount_backward: 0.0,
            amount_up: 0.0,
            amount_down: 0.0,
            rotate_horizontal: 0.0,
            rotate_vertical: 0.0,
            speed,
            sensitivity,
        }
    }

    /// Processes fly actions and updates controller state accordingly.
    pub fn intake_actions(&mut self, actions: &FlyActions) {
        if actions.move_forward {
            self.amount_forward = self.speed;
        }
        if actions.move_backward {
            self.amount_backward = self.speed;
        }
        if actions.move_left {
            self.amount_left = self.speed;
        }
        if actions.move_right {
            self.amount_right = self.speed;
        }
        if actions.move_up {
            self.amount_up = self.speed;
        }
        if actions.move_down {
            self.amount_down = self.speed;
        }
        if let Some((delta_x, delta_y)) = actions.rotate_view {
            if delta_x.abs() > 0.5 {
                self.rotate_horizontal = delta_x as f32;
            }
            if delta_y.abs() > 0.5 {
                self.rotate_vertical = delta_y as f32;
            }
        }
    }

    /// Checks if there are any pending updates that would affect the camera.
    pub fn has_updates(&self) -> bool {
        self.amount_forward > 0.0
            || self.amount_backward > 0.0
            || self.amount_left > 0.0
            || self.amount_right > 0.0
            || self.amount_up > 0.0
            || self.amount_down > 0.0
            || self.rotate_horizontal != 0.0
            || self.rotate_vertical != 0.0
    }

    fn reset(&mut self) {
        self.rotate_horizontal = 0.0;
        self.rotate_vertical = 0.0;
        self.amount_up = 0.0;
        self.amount_down = 0.0;
        self.amount_left = 0.0;
        self.amount_right = 0.0;
        self.amount_forward = 0.0;
        self.amount_backward = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_matrix_close(a: Matrix4<f32>, b: Matrix4<f32>) {
        let a: [[f32; 4]; 4] = a.into();
        let b: [[f32; 4]; 4] = b.into();
        for (column_a, column_b) in a.iter().zip(b.iter()) {
            for (x, y) in column_a.iter().zip(column_b.iter()) {
                assert!((x - y).abs() < 1e-4, "{a:?} != {b:?}");
            }
        }
    }

    #[test]
    fn test_look_at_matches_look_at_rh() {
        let eye = Point3::new(30.0, 8.0, 12.0);
        let target = Point3::new(10.0, 8.0, 12.0);
        let mut camera = Camera::new(Point3::origin(), Deg(0.0), Deg(0.0));

        camera.look_at(eye, target);

        assert_eq!(camera.position, eye);
        assert_matrix_close(
            camera.calc_matrix(),
            Matrix4::look_at_rh(eye, target, Vector3::unit_y()),
        );
    }

    #[test]
    fn test_look_at_same_point_keeps_orientation() {
        let mut camera = Camera::new(Point3::origin(), Deg(30.0), Deg(10.0));
        let before = (camera.yaw, camera.pitch);
        camera.look_at(Point3::new(1.0, 1.0, 1.0), Point3::new(1.0, 1.0, 1.0));
        assert_eq!((camera.yaw, camera.pitch), before);
    }

    #[test]
    fn test_controller_moves_forward() {
        let mut camera = Camera::new(Point3::origin(), Deg(0.0), Deg(0.0));
        let mut controller = CameraController::new(2.0, 1.0);
        controller.intake_actions(&FlyActions {
            move_forward: true,
            ..FlyActions::default()
        });
        assert!(controller.has_updates());

        camera.get_controller_updates_and_reset_controller(&mut controller, Duration::from_secs(1));

        assert!((camera.position.x - 2.0).abs() < 1e-5);
        assert!(!controller.has_updates());
    }

    #[test]
    fn test_projection_survives_zero_height() {
        let projection = Projection::new(800, 0, Deg(45.0), 1.0, 1000.0);
        assert_eq!(projection.aspect(), 1.0);
    }
}
