use std::env;
use std::fs;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use log::info;

use prism_runtime::{
    Application, HeadlessWindow, Light, ManualClock, RuntimeConfig, Scene, SceneObject,
    UniformLayout, UniformStore,
};

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("Error: {err:?}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = CliOptions::parse()?;
    let mut config = match &options.config {
        Some(path) => RuntimeConfig::load(path)
            .with_context(|| format!("failed to load config {path}"))?,
        None => RuntimeConfig::default(),
    };
    options.apply(&mut config);
    config.validate().context("invalid runtime settings")?;

    let xml = fs::read_to_string(&options.path)
        .with_context(|| format!("unable to read scene {}", options.path))?;
    let scene = Scene::from_xml(&xml).context("failed to parse scene XML")?;

    println!(
        "Loaded scene with {} objects ({} lights)",
        scene.len(),
        scene.lights().count()
    );
    for object in scene.objects() {
        println!(" - {} ({})", object.name, describe(object));
    }

    let shader = UniformStore::shared("scene");
    let clock = ManualClock::shared();
    let window = HeadlessWindow::new(Arc::clone(&clock), config.fixed_step, config.frames);
    let mut app = Application::new(scene, shader.clone(), clock, Box::new(window), &config);

    info!(
        "running {} frame(s) at {:.4}s per frame",
        config.frames, config.fixed_step
    );
    let frames = app.run();
    println!("Ran {frames} frame(s)");

    let renderer = app.renderer();
    println!(
        "Frame stats: raw {:.1} fps, smoothed {:.1} fps, min {:.2}ms, max {:.2}ms, variance {:.6}",
        renderer.raw_fps(),
        renderer.smoothed_fps(),
        renderer.min_frame_time() * 1000.0,
        renderer.max_frame_time() * 1000.0,
        renderer.frame_time_variance()
    );

    print_final_state(app.scene());
    println!("Final uniforms:");
    for name in shader.names() {
        if let Some(value) = shader.get(&name) {
            println!(" - {name} = {value}");
        }
    }
    Ok(())
}

fn describe(object: &SceneObject) -> String {
    match object.as_light() {
        Some(light) => format!("{:?} light", light.kind()).to_lowercase(),
        None => object.kind_name().to_string(),
    }
}

fn print_final_state(scene: &Scene) {
    println!("Final light states:");
    for object in scene.objects() {
        let Some(light) = object.as_light() else {
            continue;
        };
        let position = light.position();
        let detail = match light {
            Light::Spot(spot) => format!(
                " cutoff=({:.1}, {:.1})",
                spot.cut_off(),
                spot.outer_cut_off()
            ),
            _ => String::new(),
        };
        println!(
            " - {} pos=({:.2}, {:.2}, {:.2}){detail}",
            object.name, position.x, position.y, position.z
        );
    }
}

struct CliOptions {
    path: String,
    config: Option<String>,
    frames: Option<u64>,
    step: Option<f32>,
    layout: Option<UniformLayout>,
}

impl CliOptions {
    const USAGE: &'static str = "Usage: prism-runtime <scene.xml> [--config <file.toml>] [--frames N] [--step SECONDS] [--indexed]";

    fn parse() -> Result<Self> {
        Self::parse_from(env::args().skip(1))
    }

    fn parse_from(args: impl IntoIterator<Item = String>) -> Result<Self> {
        let mut args = args.into_iter();
        let Some(path) = args.next() else {
            return Err(anyhow!(Self::USAGE));
        };
        let mut options = Self {
            path,
            config: None,
            frames: None,
            step: None,
            layout: None,
        };
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" => options.config = Some(required_value(&mut args, "--config")?),
                "--frames" => {
                    let value = required_value(&mut args, "--frames")?;
                    options.frames = Some(
                        value
                            .parse()
                            .with_context(|| format!("--frames expects an integer, got {value}"))?,
                    );
                }
                "--step" => {
                    let value = required_value(&mut args, "--step")?;
                    options.step = Some(
                        value
                            .parse()
                            .with_context(|| format!("--step expects seconds, got {value}"))?,
                    );
                }
                "--indexed" => options.layout = Some(UniformLayout::Indexed),
                other => {
                    return Err(anyhow!("Unknown argument: {other}. {}", Self::USAGE));
                }
            }
        }
        Ok(options)
    }

    fn apply(&self, config: &mut RuntimeConfig) {
        if let Some(frames) = self.frames {
            config.frames = frames;
        }
        if let Some(step) = self.step {
            config.fixed_step = step;
        }
        if let Some(layout) = self.layout {
            config.uniform_layout = layout;
        }
    }
}

fn required_value(args: &mut impl Iterator<Item = String>, flag: &str) -> Result<String> {
    args.next().ok_or_else(|| anyhow!("{flag} expects a value"))
}
