use std::sync::Arc;

use log::{debug, info, warn};

use crate::camera::{Camera, CameraController, SharedCamera};
use crate::config::RuntimeConfig;
use crate::frame::FrameContext;
use crate::input::{InputSource, InputState, KeyBindings, KeyCode, NamedKey, NullInput};
use crate::renderer::Renderer;
use crate::scene::Scene;
use crate::shader::SharedShader;
use crate::timing::{Clock, FrameStats, FrameStatsSnapshot, ManualClock, SharedClock};

/// Presentation surface driven by the frame loop.
pub trait AppWindow {
    /// Checked once at the top of every iteration.
    fn should_close(&self) -> bool;
    /// Pumps platform events. Blocks for vsync on real surfaces.
    fn poll_events(&mut self);
    fn present(&mut self);
}

/// Receives the renderer's statistics after every presented frame.
pub trait FrameObserver {
    fn observe(&mut self, frame: u64, stats: &FrameStatsSnapshot);
}

impl<F> FrameObserver for F
where
    F: FnMut(u64, &FrameStatsSnapshot),
{
    fn observe(&mut self, frame: u64, stats: &FrameStatsSnapshot) {
        self(frame, stats)
    }
}

/// Window stand-in that closes after a fixed number of frames and advances a
/// [`ManualClock`] by a fixed step each time events are pumped.
#[derive(Debug)]
pub struct HeadlessWindow {
    clock: Arc<ManualClock>,
    step: f64,
    frame_limit: u64,
    presented: u64,
}

impl HeadlessWindow {
    pub fn new(clock: Arc<ManualClock>, step: f32, frame_limit: u64) -> Self {
        Self {
            clock,
            step: step as f64,
            frame_limit,
            presented: 0,
        }
    }

    pub fn presented(&self) -> u64 {
        self.presented
    }
}

impl AppWindow for HeadlessWindow {
    fn should_close(&self) -> bool {
        self.presented >= self.frame_limit
    }

    fn poll_events(&mut self) {
        self.clock.advance(self.step);
    }

    fn present(&mut self) {
        self.presented += 1;
    }
}

/// Logs frame statistics every `interval` frames and remembers the latest
/// snapshot.
#[derive(Debug, Default)]
pub struct LogProfiler {
    interval: u64,
    last: Option<FrameStatsSnapshot>,
}

impl LogProfiler {
    pub fn new(interval: u64) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    pub fn last(&self) -> Option<&FrameStatsSnapshot> {
        self.last.as_ref()
    }
}

impl FrameObserver for LogProfiler {
    fn observe(&mut self, frame: u64, stats: &FrameStatsSnapshot) {
        self.last = Some(*stats);
        if self.interval > 0 && (frame + 1) % self.interval == 0 {
            info!(
                "frame {}: {:.1} fps (smoothed {:.1}), dt {:.2}ms, min {:.2}ms, max {:.2}ms, variance {:.6}",
                frame + 1,
                stats.raw_fps,
                stats.smoothed_fps,
                stats.delta_time * 1000.0,
                stats.min_frame_time * 1000.0,
                stats.max_frame_time * 1000.0,
                stats.frame_time_variance
            );
        }
    }
}

/// Owns the scene, renderer, camera and platform collaborators and drives one
/// iteration per frame.
pub struct Application {
    scene: Scene,
    renderer: Renderer,
    camera: SharedCamera,
    controller: CameraController,
    input_state: InputState,
    input: Box<dyn InputSource>,
    window: Box<dyn AppWindow>,
    observer: Box<dyn FrameObserver>,
    clock: SharedClock,
    started_at: f64,
    last_frame: f64,
    delta_time: f32,
    frame: u64,
    exit_requested: bool,
}

impl Application {
    /// Builds the application around `scene`. The camera comes from the scene
    /// description when it has one.
    pub fn new(
        scene: Scene,
        shader: SharedShader,
        clock: SharedClock,
        window: Box<dyn AppWindow>,
        config: &RuntimeConfig,
    ) -> Self {
        let camera = scene
            .initial_camera()
            .cloned()
            .unwrap_or_else(Camera::default)
            .into_shared();
        let mut renderer = Renderer::new(shader, Arc::clone(&clock))
            .with_stats(FrameStats::with_history_capacity(config.history_capacity))
            .with_layout(config.uniform_layout);
        renderer.set_camera(&camera);

        let bindings = config.keys.bindings().unwrap_or_else(|err| {
            warn!("{err}; using default key bindings");
            KeyBindings::default()
        });

        let now = clock.now();
        Self {
            scene,
            renderer,
            camera,
            controller: CameraController::new(config.camera_speed).with_bindings(bindings),
            input_state: InputState::new(),
            input: Box::new(NullInput),
            window,
            observer: Box::new(LogProfiler::new(config.report_interval)),
            clock,
            started_at: now,
            last_frame: now,
            delta_time: 0.0,
            frame: 0,
            exit_requested: false,
        }
    }

    pub fn with_input(mut self, input: impl InputSource + 'static) -> Self {
        self.input = Box::new(input);
        self
    }

    pub fn with_observer(mut self, observer: impl FrameObserver + 'static) -> Self {
        self.observer = Box::new(observer);
        self
    }

    /// Runs until the window asks to close or an exit is requested. Returns
    /// the number of frames run by this call.
    pub fn run(&mut self) -> u64 {
        let first = self.frame;
        info!("entering frame loop with {} scene object(s)", self.scene.len());
        while !self.window.should_close() && !self.exit_requested {
            self.step();
        }
        let frames = self.frame - first;
        info!("frame loop exited after {frames} frame(s)");
        frames
    }

    /// Runs exactly one iteration of the frame loop.
    pub fn step(&mut self) {
        self.window.poll_events();

        let now = self.clock.now();
        self.delta_time = (now - self.last_frame) as f32;
        self.last_frame = now;
        let ctx = FrameContext::new(self.delta_time, now - self.started_at, self.frame);

        self.input_state.begin_frame();
        self.input.poll(&mut self.input_state);
        if self.input_state.is_key_down(KeyCode::Named(NamedKey::Escape)) {
            debug!("escape pressed; leaving after this frame");
            self.exit_requested = true;
        }
        self.controller
            .update(&mut self.camera.write(), &self.input_state, ctx.delta_time);

        self.scene.apply_pending();
        self.scene.update(&ctx);
        self.renderer.render(&self.scene);
        self.renderer.update_frame_time();

        self.window.present();
        self.observer.observe(self.frame, &self.renderer.snapshot());
        self.frame += 1;
    }

    pub fn request_exit(&mut self) {
        self.exit_requested = true;
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    pub fn camera(&self) -> SharedCamera {
        Arc::clone(&self.camera)
    }

    /// Seconds between the last two iterations, as passed to entity updates.
    pub fn delta_time(&self) -> f32 {
        self.delta_time
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use glam::Vec3;

    use super::*;
    use crate::input::ScriptedInput;
    use crate::light::{LightMotion, Orbit, SpotLight};
    use crate::scene::SceneObject;
    use crate::shader::UniformStore;

    fn headless(frames: u64, step: f32, scene: Scene) -> (Application, Arc<UniformStore>) {
        let store = UniformStore::shared("app");
        let clock = ManualClock::shared();
        let window = HeadlessWindow::new(Arc::clone(&clock), step, frames);
        let config = RuntimeConfig {
            report_interval: 0,
            ..RuntimeConfig::default()
        };
        let app = Application::new(scene, store.clone(), clock, Box::new(window), &config);
        (app, store)
    }

    fn orbiting_scene() -> Scene {
        let mut spot = SpotLight::new();
        spot.base.motion = LightMotion::Orbit(Orbit::default());
        let mut scene = Scene::new();
        scene.add(SceneObject::light("torch", spot));
        scene
    }

    #[test]
    fn run_stops_when_window_closes() {
        let (mut app, store) = headless(5, 0.02, orbiting_scene());
        assert_eq!(app.run(), 5);
        assert_eq!(app.frame(), 5);
        assert_eq!(app.renderer().frames_rendered(), 5);
        assert_eq!(app.renderer().stats().sample_count(), 5);
        assert!((app.renderer().min_frame_time() - 0.02).abs() < 1e-6);
        assert!((app.delta_time() - 0.02).abs() < 1e-6);
        assert_eq!(store.bool("useSpotLight"), Some(true));
    }

    #[test]
    fn delta_time_reaches_entity_updates() {
        let (mut app, store) = headless(4, 0.5, orbiting_scene());
        app.run();
        // four half-second steps at pi/4 rad/s
        let angle = std::f32::consts::FRAC_PI_4 * 2.0;
        let expected = Vec3::new(2.0 * angle.cos(), 0.0, 2.0 * angle.sin());
        let position = app.scene().lights().next().unwrap().position();
        assert!((position - expected).length() < 1e-4);
        assert_eq!(store.vec3("spotLight.position"), Some(position));
    }

    #[test]
    fn stalled_frame_passes_full_delta_to_updates() {
        let step = 0.1;
        let store = UniformStore::shared("app");
        let clock = ManualClock::shared();
        let window = HeadlessWindow::new(Arc::clone(&clock), step, 10);
        let config = RuntimeConfig {
            report_interval: 0,
            ..RuntimeConfig::default()
        };
        let mut app = Application::new(
            orbiting_scene(),
            store.clone(),
            clock.clone(),
            Box::new(window),
            &config,
        );

        app.step();
        clock.advance(5.0);
        app.step();

        let stall = 5.0 + step;
        assert!((app.delta_time() - stall).abs() < 1e-4);
        assert!((app.renderer().max_frame_time() - stall).abs() < 1e-4);
        assert!((app.renderer().min_frame_time() - step).abs() < 1e-5);

        let orbit = Orbit::default();
        let light = app.scene().lights().next().expect("torch light");
        let LightMotion::Orbit(current) = &light.base().motion else {
            panic!("torch should orbit");
        };
        assert!((current.angle - orbit.speed * (step + stall)).abs() < 1e-4);
    }

    #[test]
    fn observer_sees_every_frame() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let (app, _store) = headless(3, 0.01, Scene::new());
        let mut app = app.with_observer(move |frame: u64, stats: &FrameStatsSnapshot| {
            sink.borrow_mut().push((frame, stats.samples));
        });
        app.run();
        assert_eq!(*seen.borrow(), vec![(0, 1), (1, 2), (2, 3)]);
    }

    #[test]
    fn escape_key_ends_the_loop() {
        let (app, _store) = headless(100, 0.01, Scene::new());
        let mut app =
            app.with_input(ScriptedInput::new().push(2, KeyCode::Named(NamedKey::Escape), true));
        assert_eq!(app.run(), 3);
    }

    #[test]
    fn input_moves_the_camera() {
        let (app, store) = headless(2, 0.5, Scene::new());
        let mut app = app.with_input(ScriptedInput::new().push(0, KeyCode::Character('E'), true));
        let start = app.camera().read().position;
        app.run();
        let end = app.camera().read().position;
        assert!((end - start - Vec3::new(0.0, 3.0, 0.0)).length() < 1e-4);
        assert_eq!(store.vec3("viewPos"), Some(end));
    }

    #[test]
    fn queued_objects_render_next_frame() {
        let (mut app, store) = headless(2, 0.01, Scene::new());
        app.step();
        assert_eq!(store.bool("useSpotLight"), Some(false));
        app.scene_mut().queue(SceneObject::light("late", SpotLight::new()));
        app.step();
        assert_eq!(store.bool("useSpotLight"), Some(true));
    }

    #[test]
    fn log_profiler_keeps_latest_snapshot() {
        let mut profiler = LogProfiler::new(2);
        let mut stats = FrameStats::new();
        stats.record(0.02);
        profiler.observe(0, &stats.snapshot());
        stats.record(0.04);
        profiler.observe(1, &stats.snapshot());
        let last = profiler.last().unwrap();
        assert_eq!(last.samples, 2);
        assert_eq!(last.max_frame_time, 0.04);
    }
}
