use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Linear RGBA colour with components in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

impl Color {
    pub const WHITE: Self = Self::rgb(1.0, 1.0, 1.0);

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub const fn gray(value: f32) -> Self {
        Self::rgb(value, value, value)
    }

    /// Builds a colour from components on the 0-255 scale used by scene files.
    pub fn from_rgb8(r: f32, g: f32, b: f32) -> Self {
        Self::rgb(r / 255.0, g / 255.0, b / 255.0)
    }

    pub fn to_vec3(self) -> Vec3 {
        Vec3::new(self.r, self.g, self.b)
    }
}
