use std::sync::Arc;

use glam::{Mat4, Vec3};
use parking_lot::RwLock;

use crate::input::{InputState, KeyBindings};
use crate::shader::Shader;

/// Camera shared between the application (owner) and the renderer (observer).
pub type SharedCamera = Arc<RwLock<Camera>>;

/// Returns the unit forward vector for the given yaw/pitch in radians.
pub fn forward_from_yaw_pitch(yaw: f32, pitch: f32) -> Vec3 {
    let cp = pitch.cos();
    let sp = pitch.sin();
    let cy = yaw.cos();
    let sy = yaw.sin();
    Vec3::new(cy * cp, sp, -sy * cp)
}

/// Perspective camera looking along the direction given by yaw and pitch.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    /// Vertical field of view in degrees.
    pub fov_y: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 2.0, 6.0),
            yaw: std::f32::consts::FRAC_PI_2,
            pitch: 0.0,
            fov_y: 45.0,
            aspect: 16.0 / 9.0,
            near: 0.1,
            far: 100.0,
        }
    }
}

impl Camera {
    pub fn new(position: Vec3, yaw: f32, pitch: f32) -> Self {
        Self {
            position,
            yaw,
            pitch,
            ..Self::default()
        }
    }

    pub fn into_shared(self) -> SharedCamera {
        Arc::new(RwLock::new(self))
    }

    pub fn forward(&self) -> Vec3 {
        forward_from_yaw_pitch(self.yaw, self.pitch)
    }

    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.position + self.forward(), Vec3::Y)
    }

    pub fn projection(&self) -> Mat4 {
        Mat4::perspective_rh_gl(
            self.fov_y.to_radians(),
            self.aspect.max(0.01),
            self.near,
            self.far,
        )
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection() * self.view()
    }

    pub fn set_viewport(&mut self, width: u32, height: u32) {
        self.aspect = width.max(1) as f32 / height.max(1) as f32;
    }

    /// Writes the view, projection and eye position uniforms.
    pub fn bind(&self, shader: &dyn Shader) {
        shader.set_mat4("view", self.view());
        shader.set_mat4("projection", self.projection());
        shader.set_vec3("viewPos", self.position);
    }
}

/// Free-fly movement driven by held keys (WASD plus Q/E for height by
/// default) and mouse look.
#[derive(Debug, Clone)]
pub struct CameraController {
    base_speed: f32,
    sensitivity: f32,
    bindings: KeyBindings,
}

impl CameraController {
    pub fn new(base_speed: f32) -> Self {
        Self {
            base_speed,
            sensitivity: 0.0025,
            bindings: KeyBindings::default(),
        }
    }

    pub fn with_bindings(mut self, bindings: KeyBindings) -> Self {
        self.bindings = bindings;
        self
    }

    pub fn update(&self, camera: &mut Camera, input: &InputState, dt: f32) {
        let look = input.mouse_delta();
        if look != glam::Vec2::ZERO {
            camera.yaw -= look.x * self.sensitivity;
            camera.pitch -= look.y * self.sensitivity;
            let max_pitch = std::f32::consts::FRAC_PI_2 - 0.01;
            camera.pitch = camera.pitch.clamp(-max_pitch, max_pitch);
        }

        let forward = camera.forward();
        let mut flat_forward = Vec3::new(forward.x, 0.0, forward.z);
        if flat_forward.length_squared() > 0.0 {
            flat_forward = flat_forward.normalize();
        }
        let mut right = flat_forward.cross(Vec3::Y);
        if right.length_squared() > 0.0 {
            right = right.normalize();
        }

        let keys = &self.bindings;
        let mut movement = Vec3::ZERO;
        if input.is_key_down(keys.forward) {
            movement += flat_forward;
        }
        if input.is_key_down(keys.back) {
            movement -= flat_forward;
        }
        if input.is_key_down(keys.right) {
            movement += right;
        }
        if input.is_key_down(keys.left) {
            movement -= right;
        }
        if input.is_key_down(keys.up) {
            movement += Vec3::Y;
        }
        if input.is_key_down(keys.down) {
            movement -= Vec3::Y;
        }

        if movement.length_squared() > 0.0 {
            let mut speed = self.base_speed;
            if input.is_key_down(keys.boost) {
                speed *= 5.0;
            }
            camera.position += movement.normalize() * speed * dt;
        }
    }
}
