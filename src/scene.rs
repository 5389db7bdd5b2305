use std::fmt;

use anyhow::{anyhow, bail, Context, Result};
use glam::Vec3;
use log::debug;
use roxmltree::{Document, Node};

use crate::camera::Camera;
use crate::color::Color;
use crate::frame::FrameContext;
use crate::light::{Light, LightKind, LightMotion, LightSlot, Orbit, UniformLayout};
use crate::shader::Shader;
use crate::transform::Transform;

/// Everything an entity may touch while writing its uniforms.
#[derive(Clone, Copy)]
pub struct RenderContext<'a> {
    pub shader: &'a dyn Shader,
    pub camera: &'a Camera,
    pub layout: UniformLayout,
}

/// Open extension point for entities that are neither lights nor drawables.
pub trait SceneNode {
    fn update(&mut self, _ctx: &FrameContext) {}
    fn render(&self, ctx: &RenderContext<'_>);
}

/// Generic renderable: a transform, a flat colour and an optional spin.
#[derive(Debug, Clone, PartialEq)]
pub struct Drawable {
    pub transform: Transform,
    pub color: Color,
    /// Degrees per second added to the rotation each update.
    pub spin: Vec3,
}

impl Default for Drawable {
    fn default() -> Self {
        Self {
            transform: Transform::default(),
            color: Color::WHITE,
            spin: Vec3::ZERO,
        }
    }
}

impl Drawable {
    pub fn update(&mut self, ctx: &FrameContext) {
        if self.spin != Vec3::ZERO {
            self.transform.rotate(self.spin * ctx.delta_time);
        }
    }

    pub fn render(&self, shader: &dyn Shader) {
        shader.set_mat4("model", self.transform.matrix());
        shader.set_vec3("objectColor", self.color.to_vec3());
    }
}

pub enum SceneEntity {
    Light(Light),
    Drawable(Drawable),
    Custom(Box<dyn SceneNode>),
}

impl fmt::Debug for SceneEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Light(light) => f.debug_tuple("Light").field(light).finish(),
            Self::Drawable(drawable) => f.debug_tuple("Drawable").field(drawable).finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Named entity owned by a [`Scene`].
#[derive(Debug)]
pub struct SceneObject {
    pub name: String,
    pub entity: SceneEntity,
}

impl SceneObject {
    pub fn light(name: impl Into<String>, light: impl Into<Light>) -> Self {
        Self {
            name: name.into(),
            entity: SceneEntity::Light(light.into()),
        }
    }

    pub fn drawable(name: impl Into<String>, drawable: Drawable) -> Self {
        Self {
            name: name.into(),
            entity: SceneEntity::Drawable(drawable),
        }
    }

    pub fn custom(name: impl Into<String>, node: impl SceneNode + 'static) -> Self {
        Self {
            name: name.into(),
            entity: SceneEntity::Custom(Box::new(node)),
        }
    }

    pub fn as_light(&self) -> Option<&Light> {
        match &self.entity {
            SceneEntity::Light(light) => Some(light),
            _ => None,
        }
    }

    pub fn as_light_mut(&mut self) -> Option<&mut Light> {
        match &mut self.entity {
            SceneEntity::Light(light) => Some(light),
            _ => None,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match &self.entity {
            SceneEntity::Light(_) => "light",
            SceneEntity::Drawable(_) => "mesh",
            SceneEntity::Custom(_) => "custom",
        }
    }

    fn update(&mut self, ctx: &FrameContext) {
        match &mut self.entity {
            SceneEntity::Light(light) => light.update(ctx),
            SceneEntity::Drawable(drawable) => drawable.update(ctx),
            SceneEntity::Custom(node) => node.update(ctx),
        }
    }
}

/// Ordered collection of entities. Insertion order is traversal order.
///
/// Traversals borrow the scene, so entities cannot be added or removed while
/// one is running; use [`Scene::queue`] and [`Scene::apply_pending`] to defer
/// additions to the frame boundary.
#[derive(Debug, Default)]
pub struct Scene {
    objects: Vec<SceneObject>,
    pending: Vec<SceneObject>,
    initial_camera: Option<Camera>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, object: SceneObject) {
        self.objects.push(object);
    }

    /// Defers `object` until the next [`Scene::apply_pending`].
    pub fn queue(&mut self, object: SceneObject) {
        self.pending.push(object);
    }

    /// Appends queued objects in the order they were queued. Returns how many
    /// were added.
    pub fn apply_pending(&mut self) -> usize {
        let added = self.pending.len();
        if added > 0 {
            debug!("adding {added} queued scene object(s)");
            self.objects.append(&mut self.pending);
        }
        added
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn objects(&self) -> &[SceneObject] {
        &self.objects
    }

    pub fn lights(&self) -> impl Iterator<Item = &Light> {
        self.objects.iter().filter_map(SceneObject::as_light)
    }

    pub fn find(&self, name: &str) -> Option<&SceneObject> {
        self.objects.iter().find(|object| object.name == name)
    }

    pub fn find_mut(&mut self, name: &str) -> Option<&mut SceneObject> {
        self.objects.iter_mut().find(|object| object.name == name)
    }

    /// Camera described by the scene file, if any.
    pub fn initial_camera(&self) -> Option<&Camera> {
        self.initial_camera.as_ref()
    }

    pub fn set_initial_camera(&mut self, camera: Camera) {
        self.initial_camera = Some(camera);
    }

    /// Runs every entity's update hook once, in insertion order.
    pub fn update(&mut self, ctx: &FrameContext) {
        for object in &mut self.objects {
            object.update(ctx);
        }
    }

    /// Runs every entity's render hook once, in insertion order.
    ///
    /// Every light kind's enable flag is cleared first, so a kind with no
    /// light in this scene reads as disabled. Lights of the same kind receive
    /// consecutive slot indices. With [`UniformLayout::Indexed`] the per-kind
    /// counts are written after the traversal.
    pub fn render(&self, shader: &dyn Shader, camera: &Camera, layout: UniformLayout) {
        let ctx = RenderContext {
            shader,
            camera,
            layout,
        };
        for kind in LightKind::ALL {
            shader.set_bool(kind.enable_flag(), false);
        }
        let mut counts = [0usize; 3];

        for object in &self.objects {
            match &object.entity {
                SceneEntity::Light(light) => {
                    let count = &mut counts[light.kind().index()];
                    let slot = LightSlot {
                        layout,
                        index: *count,
                    };
                    light.render(shader, camera, slot);
                    *count += 1;
                }
                SceneEntity::Drawable(drawable) => drawable.render(shader),
                SceneEntity::Custom(node) => node.render(&ctx),
            }
        }

        if layout == UniformLayout::Indexed {
            for kind in LightKind::ALL {
                shader.set_float(kind.count_uniform(), counts[kind.index()] as f32);
            }
        }
    }

    /// Parses the XML scene description.
    ///
    /// Each `<object>` needs a `<name>`; `<type>` is `mesh` (default),
    /// `light` or `camera`. Colours are `0-255` triples.
    pub fn from_xml(xml: &str) -> Result<Self> {
        let document = Document::parse(xml).context("invalid scene XML")?;
        let mut scene = Scene::new();

        for node in document.descendants().filter(|n| n.has_tag_name("object")) {
            let name = required_text(&node, "name")?;
            let object_type = optional_text(&node, "type").unwrap_or_else(|| "mesh".to_string());
            let transform = parse_transform(&node)
                .with_context(|| format!("object '{name}' has an invalid transform"))?;

            match object_type.as_str() {
                "mesh" => {
                    let drawable = Drawable {
                        transform,
                        color: parse_color(optional_text(&node, "color"), Color::WHITE)?,
                        spin: parse_vec3(optional_text(&node, "spin"), Vec3::ZERO)?,
                    };
                    scene.add(SceneObject::drawable(name, drawable));
                }
                "light" => {
                    let light = parse_light(&node, transform)
                        .with_context(|| format!("light '{name}' is invalid"))?;
                    scene.add(SceneObject::light(name, light));
                }
                "camera" => {
                    let camera = Camera {
                        position: transform.position,
                        yaw: transform.rotation.y.to_radians(),
                        pitch: transform.rotation.x.to_radians(),
                        fov_y: parse_f32(optional_text(&node, "fov"), Camera::default().fov_y)?,
                        ..Camera::default()
                    };
                    scene.set_initial_camera(camera);
                }
                other => bail!("object '{name}' has unknown type '{other}'"),
            }
        }

        Ok(scene)
    }
}

fn parse_transform(node: &Node<'_, '_>) -> Result<Transform> {
    let defaults = Transform::default();
    Ok(Transform {
        position: parse_vec3(optional_text(node, "position"), defaults.position)?,
        rotation: parse_vec3(optional_text(node, "rotation"), defaults.rotation)?,
        scale: parse_vec3(optional_text(node, "scale"), defaults.scale)?,
    })
}

fn parse_light(node: &Node<'_, '_>, transform: Transform) -> Result<Light> {
    let kind = match optional_text(node, "light") {
        Some(name) => {
            LightKind::from_name(&name).ok_or_else(|| anyhow!("unknown light kind '{name}'"))?
        }
        None => LightKind::Point,
    };
    let mut light = Light::of_kind(kind);

    let base = light.base_mut();
    base.transform = transform;
    base.ambient = parse_color(optional_text(node, "ambient"), base.ambient)?;
    let diffuse = optional_text(node, "diffuse").or_else(|| optional_text(node, "color"));
    base.diffuse = parse_color(diffuse, base.diffuse)?;
    base.specular = parse_color(optional_text(node, "specular"), base.specular)?;
    if let Some(orbit) = optional_text(node, "orbit") {
        let values = parse_floats(&orbit, 2, "orbit")?;
        base.motion = LightMotion::Orbit(Orbit::new(values[0], values[1]));
    }

    let direction = optional_text(node, "direction")
        .map(|text| parse_vec3(Some(text), Vec3::ZERO))
        .transpose()?;
    let attenuation = optional_text(node, "attenuation")
        .map(|text| parse_floats(&text, 3, "attenuation"))
        .transpose()?;

    match &mut light {
        Light::Directional(directional) => {
            if let Some(direction) = direction {
                directional.set_direction(direction);
            }
        }
        Light::Point(point) => {
            if let Some(values) = attenuation {
                point.set_attenuation(values[0], values[1], values[2]);
            }
        }
        Light::Spot(spot) => {
            if let Some(direction) = direction {
                spot.set_direction(direction);
            }
            if let Some(values) = attenuation {
                spot.set_attenuation(values[0], values[1], values[2]);
            }
            if let Some(cutoff) = optional_text(node, "cutoff") {
                let values = parse_floats(&cutoff, 2, "cutoff")?;
                spot.set_cut_off_angles(values[0], values[1]);
            }
        }
    }

    Ok(light)
}

fn required_text(node: &Node<'_, '_>, tag: &str) -> Result<String> {
    optional_text(node, tag).ok_or_else(|| anyhow!("<{tag}> tag is missing"))
}

fn optional_text(node: &Node<'_, '_>, tag: &str) -> Option<String> {
    node.children()
        .find(|child| child.has_tag_name(tag))
        .and_then(|child| child.text())
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(|text| text.to_string())
}

fn parse_floats(value: &str, count: usize, what: &str) -> Result<Vec<f32>> {
    let numbers = value
        .split_whitespace()
        .map(|component| {
            component
                .parse::<f32>()
                .map_err(|err| anyhow!("{what} component '{component}' is not a number: {err}"))
        })
        .collect::<Result<Vec<_>>>()?;
    if numbers.len() < count {
        bail!("{what} is missing components (expected {count}, got {})", numbers.len());
    }
    Ok(numbers)
}

fn parse_vec3(value: Option<String>, default: Vec3) -> Result<Vec3> {
    let Some(value) = value else {
        return Ok(default);
    };
    let numbers = parse_floats(&value, 3, "vector")?;
    Ok(Vec3::new(numbers[0], numbers[1], numbers[2]))
}

fn parse_color(value: Option<String>, default: Color) -> Result<Color> {
    let Some(value) = value else {
        return Ok(default);
    };
    let numbers = parse_floats(&value, 3, "color")?;
    Ok(Color::from_rgb8(numbers[0], numbers[1], numbers[2]))
}

fn parse_f32(value: Option<String>, default: f32) -> Result<f32> {
    match value {
        Some(value) => value
            .parse::<f32>()
            .map_err(|err| anyhow!("failed to parse float: {err}")),
        None => Ok(default),
    }
}
