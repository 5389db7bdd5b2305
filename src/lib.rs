//! Frame loop and render-dispatch core of the Prism renderer.
//!
//! The crate covers what happens once per frame: the scene's entities are
//! updated with an explicit [`FrameContext`], the [`Renderer`] binds the
//! active camera and writes every light's uniform block into a shared
//! [`Shader`], and the frame time is folded into rolling statistics.
//! Window creation, GPU upload and on-screen profiler widgets are left to
//! the embedding application behind the [`AppWindow`], [`Shader`] and
//! [`FrameObserver`] traits so the core stays testable headless.

pub mod app;
pub mod camera;
pub mod color;
pub mod config;
pub mod frame;
pub mod input;
pub mod light;
pub mod renderer;
pub mod scene;
pub mod shader;
pub mod timing;
pub mod transform;

pub use app::{AppWindow, Application, FrameObserver, HeadlessWindow, LogProfiler};
pub use camera::{Camera, CameraController, SharedCamera};
pub use color::Color;
pub use config::{ConfigError, KeyConfig, RuntimeConfig};
pub use frame::FrameContext;
pub use input::{
    InputSource, InputState, KeyBindings, KeyCode, NamedKey, NullInput, ScriptedInput,
};
pub use light::{
    Attenuation, DirectionalLight, Light, LightBase, LightKind, LightMotion, LightSlot, Orbit,
    PointLight, SpotLight, UniformLayout,
};
pub use renderer::Renderer;
pub use scene::{Drawable, RenderContext, Scene, SceneEntity, SceneNode, SceneObject};
pub use shader::{Shader, SharedShader, UniformStore, UniformValue};
pub use timing::{
    Clock, FrameStats, FrameStatsSnapshot, ManualClock, SharedClock, SystemClock, FRAME_WINDOW,
};
pub use transform::Transform;
