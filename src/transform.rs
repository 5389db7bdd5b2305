use glam::{Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Position, Euler rotation (degrees) and scale of a single entity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Vec3,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    /// Adds `degrees` to the current rotation.
    pub fn rotate(&mut self, degrees: Vec3) {
        self.rotation += degrees;
    }

    pub fn set_rotation(&mut self, degrees: Vec3) {
        self.rotation = degrees;
    }

    pub fn orientation(&self) -> Quat {
        Quat::from_rotation_z(self.rotation.z.to_radians())
            * Quat::from_rotation_y(self.rotation.y.to_radians())
            * Quat::from_rotation_x(self.rotation.x.to_radians())
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.orientation(), self.position)
    }
}
