use std::sync::{Arc, Weak};

use log::{debug, warn};
use parking_lot::RwLock;

use crate::camera::{Camera, SharedCamera};
use crate::light::UniformLayout;
use crate::scene::Scene;
use crate::shader::SharedShader;
use crate::timing::{Clock, FrameStats, FrameStatsSnapshot, SharedClock};

/// Issues the per-frame draw pass and measures frame times.
///
/// The renderer shares ownership of the active shader but only observes the
/// active camera: it keeps a weak reference and skips the pass when the
/// camera has been dropped.
///
/// Per frame, call [`Renderer::render`] first and
/// [`Renderer::update_frame_time`] after it.
pub struct Renderer {
    shader: SharedShader,
    camera: Option<Weak<RwLock<Camera>>>,
    clock: SharedClock,
    last_frame: f64,
    stats: FrameStats,
    layout: UniformLayout,
    frames_rendered: u64,
    warned_missing_camera: bool,
}

impl Renderer {
    pub fn new(shader: SharedShader, clock: SharedClock) -> Self {
        let last_frame = clock.now();
        Self {
            shader,
            camera: None,
            clock,
            last_frame,
            stats: FrameStats::new(),
            layout: UniformLayout::default(),
            frames_rendered: 0,
            warned_missing_camera: false,
        }
    }

    /// Replaces the statistics engine, e.g. to change its history capacity.
    pub fn with_stats(mut self, stats: FrameStats) -> Self {
        self.stats = stats;
        self
    }

    pub fn with_layout(mut self, layout: UniformLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Points the renderer at `camera` without taking ownership of it.
    pub fn set_camera(&mut self, camera: &SharedCamera) {
        self.camera = Some(Arc::downgrade(camera));
        self.warned_missing_camera = false;
    }

    pub fn clear_camera(&mut self) {
        self.camera = None;
    }

    /// Returns the active camera if its owner still holds it.
    pub fn camera(&self) -> Option<SharedCamera> {
        self.camera.as_ref().and_then(Weak::upgrade)
    }

    pub fn shader(&self) -> SharedShader {
        Arc::clone(&self.shader)
    }

    /// Binds the active camera and shader, then writes every entity's uniforms.
    ///
    /// Does nothing (and logs once) when no live camera is set.
    pub fn render(&mut self, scene: &Scene) {
        let Some(camera) = self.camera() else {
            if !self.warned_missing_camera {
                warn!("no active camera; skipping render pass");
                self.warned_missing_camera = true;
            }
            return;
        };
        let camera = camera.read();
        self.render_with_camera(scene, &camera);
    }

    /// Render pass against an explicitly borrowed camera.
    pub fn render_with_camera(&mut self, scene: &Scene, camera: &Camera) {
        let shader = &*self.shader;
        camera.bind(shader);
        scene.render(shader, camera, self.layout);
        self.frames_rendered += 1;
    }

    /// Samples the clock and records the time since the previous call.
    pub fn update_frame_time(&mut self) {
        let now = self.clock.now();
        let delta = (now - self.last_frame) as f32;
        self.last_frame = now;
        self.stats.record(delta);
        if self.stats.total_recorded() == 1 {
            debug!("first frame took {delta:.4}s");
        }
    }

    pub fn stats(&self) -> &FrameStats {
        &self.stats
    }

    pub fn snapshot(&self) -> FrameStatsSnapshot {
        self.stats.snapshot()
    }

    pub fn delta_time(&self) -> f32 {
        self.stats.delta_time()
    }

    pub fn raw_fps(&self) -> f32 {
        self.stats.raw_fps()
    }

    pub fn smoothed_fps(&self) -> f32 {
        self.stats.smoothed_fps()
    }

    pub fn min_frame_time(&self) -> f32 {
        self.stats.min_frame_time()
    }

    pub fn max_frame_time(&self) -> f32 {
        self.stats.max_frame_time()
    }

    pub fn frame_time_variance(&self) -> f32 {
        self.stats.frame_time_variance()
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::light::SpotLight;
    use crate::scene::SceneObject;
    use crate::shader::UniformStore;
    use crate::timing::ManualClock;

    fn renderer() -> (Renderer, Arc<UniformStore>, Arc<ManualClock>) {
        let store = UniformStore::shared("renderer");
        let clock = ManualClock::shared();
        let renderer = Renderer::new(store.clone(), clock.clone());
        (renderer, store, clock)
    }

    fn spot_scene() -> Scene {
        let mut scene = Scene::new();
        scene.add(SceneObject::light("torch", SpotLight::new()));
        scene
    }

    #[test]
    fn five_frame_scenario() {
        let (mut renderer, _store, clock) = renderer();
        for dt in [0.016, 0.017, 0.015, 0.020, 0.016] {
            clock.advance(dt);
            renderer.update_frame_time();
        }
        assert!((renderer.min_frame_time() - 0.015).abs() < 1e-6);
        assert!((renderer.max_frame_time() - 0.020).abs() < 1e-6);
        assert!((renderer.raw_fps() - 62.5).abs() < 1e-2);
        assert_eq!(renderer.stats().sample_count(), 5);
    }

    #[test]
    fn render_binds_camera_then_scene() {
        let (mut renderer, store, _clock) = renderer();
        let camera = Camera::default().into_shared();
        renderer.set_camera(&camera);
        renderer.render(&spot_scene());
        assert_eq!(store.vec3("viewPos"), Some(camera.read().position));
        assert_eq!(store.bool("useSpotLight"), Some(true));
        assert_eq!(renderer.frames_rendered(), 1);
    }

    #[test]
    fn renderer_does_not_keep_camera_alive() {
        let (mut renderer, store, _clock) = renderer();
        let camera = Camera::default().into_shared();
        renderer.set_camera(&camera);
        assert_eq!(Arc::strong_count(&camera), 1);
        drop(camera);

        renderer.render(&spot_scene());
        assert!(renderer.camera().is_none());
        assert!(store.is_empty());
        assert_eq!(renderer.frames_rendered(), 0);
    }

    #[test]
    fn render_without_camera_is_skipped() {
        let (mut renderer, store, _clock) = renderer();
        renderer.render(&spot_scene());
        renderer.render(&spot_scene());
        assert!(store.is_empty());
    }

    #[test]
    fn cleared_camera_stops_rendering() {
        let (mut renderer, _store, _clock) = renderer();
        let camera = Camera::default().into_shared();
        renderer.set_camera(&camera);
        renderer.render(&spot_scene());
        renderer.clear_camera();
        renderer.render(&spot_scene());
        assert!(renderer.camera().is_none());
        assert_eq!(renderer.frames_rendered(), 1);
        assert_eq!(Arc::strong_count(&camera), 1);
    }

    #[test]
    fn shader_handle_is_shared() {
        let (renderer, store, _clock) = renderer();
        let handle = renderer.shader();
        assert_eq!(Arc::strong_count(&store), 3);
        drop(handle);
        assert_eq!(Arc::strong_count(&store), 2);
    }

    #[test]
    fn indexed_layout_reaches_scene() {
        let (renderer, store, _clock) = renderer();
        let mut renderer = renderer.with_layout(UniformLayout::Indexed);
        renderer.render_with_camera(&spot_scene(), &Camera::default());
        assert_eq!(store.float("numSpotLights"), Some(1.0));
        assert!(store.float("spotLights[0].cutOff").is_some());
    }

    #[test]
    fn stalled_clock_reports_zero_fps() {
        let (mut renderer, _store, _clock) = renderer();
        renderer.update_frame_time();
        assert_eq!(renderer.delta_time(), 0.0);
        assert_eq!(renderer.raw_fps(), 0.0);
        assert_eq!(renderer.smoothed_fps(), 0.0);
    }
}
