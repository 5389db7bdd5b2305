use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use glam::{Mat4, Vec3};
use log::debug;
use parking_lot::RwLock;

/// Named-uniform sink implemented by a compiled shader program.
///
/// Every setter overwrites the previous value stored under `name`; there is no
/// notion of a failed write. Setters take `&self` because the handle is shared
/// between the renderer and any other subsystem holding a [`SharedShader`].
pub trait Shader {
    fn set_vec3(&self, name: &str, value: Vec3);
    fn set_float(&self, name: &str, value: f32);
    fn set_bool(&self, name: &str, value: bool);
    fn set_mat4(&self, name: &str, value: Mat4);
}

/// Reference-counted shader handle. The program is torn down when the last
/// clone is dropped.
pub type SharedShader = Arc<dyn Shader + Send + Sync>;

/// Value last written to a uniform slot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Vec3(Vec3),
    Float(f32),
    Bool(bool),
    Mat4(Mat4),
}

impl fmt::Display for UniformValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Vec3(v) => write!(f, "({:.2}, {:.2}, {:.2})", v.x, v.y, v.z),
            Self::Float(value) => write!(f, "{value:.4}"),
            Self::Bool(value) => write!(f, "{value}"),
            Self::Mat4(_) => f.write_str("mat4"),
        }
    }
}

/// Headless shader that records uniform writes instead of uploading them.
#[derive(Debug)]
pub struct UniformStore {
    label: String,
    values: RwLock<HashMap<String, UniformValue>>,
    writes: RwLock<u64>,
}

impl UniformStore {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            values: RwLock::new(HashMap::new()),
            writes: RwLock::new(0),
        }
    }

    /// Creates the store already wrapped in a shared handle.
    pub fn shared(label: impl Into<String>) -> Arc<Self> {
        Arc::new(Self::new(label))
    }

    pub fn get(&self, name: &str) -> Option<UniformValue> {
        self.values.read().get(name).copied()
    }

    pub fn vec3(&self, name: &str) -> Option<Vec3> {
        match self.get(name)? {
            UniformValue::Vec3(value) => Some(value),
            _ => None,
        }
    }

    pub fn float(&self, name: &str) -> Option<f32> {
        match self.get(name)? {
            UniformValue::Float(value) => Some(value),
            _ => None,
        }
    }

    pub fn bool(&self, name: &str) -> Option<bool> {
        match self.get(name)? {
            UniformValue::Bool(value) => Some(value),
            _ => None,
        }
    }

    pub fn mat4(&self, name: &str) -> Option<Mat4> {
        match self.get(name)? {
            UniformValue::Mat4(value) => Some(value),
            _ => None,
        }
    }

    /// Number of distinct uniform names written so far.
    pub fn len(&self) -> usize {
        self.values.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.read().is_empty()
    }

    /// Uniform names in lexical order.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.values.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Total number of setter calls, including overwrites.
    pub fn write_count(&self) -> u64 {
        *self.writes.read()
    }

    fn store(&self, name: &str, value: UniformValue) {
        self.values.write().insert(name.to_string(), value);
        *self.writes.write() += 1;
    }
}

impl Shader for UniformStore {
    fn set_vec3(&self, name: &str, value: Vec3) {
        self.store(name, UniformValue::Vec3(value));
    }

    fn set_float(&self, name: &str, value: f32) {
        self.store(name, UniformValue::Float(value));
    }

    fn set_bool(&self, name: &str, value: bool) {
        self.store(name, UniformValue::Bool(value));
    }

    fn set_mat4(&self, name: &str, value: Mat4) {
        self.store(name, UniformValue::Mat4(value));
    }
}

impl Drop for UniformStore {
    fn drop(&mut self) {
        debug!(
            "releasing shader '{}' ({} uniforms)",
            self.label,
            self.values.get_mut().len()
        );
    }
}
