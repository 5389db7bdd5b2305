//! Light variants and the uniform blocks they write each frame.
//!
//! Every light shares a [`LightBase`] (colour triple, transform and motion
//! policy). The concrete variant decides which uniform block it writes:
//! the base block first, then the variant's own fields, then its enable flag.
//! With [`UniformLayout::SingleSlot`] two lights of the same kind write the
//! same keys and the last one rendered wins.

use std::f32::consts::FRAC_PI_4;

use glam::Vec3;
use log::{trace, warn};
use serde::{Deserialize, Serialize};

use crate::camera::Camera;
use crate::color::Color;
use crate::frame::FrameContext;
use crate::shader::Shader;
use crate::transform::Transform;

/// Tag identifying the concrete light variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LightKind {
    Directional,
    Point,
    Spot,
}

impl LightKind {
    pub const ALL: [LightKind; 3] = [Self::Directional, Self::Point, Self::Spot];

    /// Numeric tag written to `<block>.type`.
    pub fn index(self) -> usize {
        match self {
            Self::Directional => 0,
            Self::Point => 1,
            Self::Spot => 2,
        }
    }

    pub fn uniform_prefix(self) -> &'static str {
        match self {
            Self::Directional => "dirLight",
            Self::Point => "pointLight",
            Self::Spot => "spotLight",
        }
    }

    pub fn array_name(self) -> &'static str {
        match self {
            Self::Directional => "dirLights",
            Self::Point => "pointLights",
            Self::Spot => "spotLights",
        }
    }

    pub fn count_uniform(self) -> &'static str {
        match self {
            Self::Directional => "numDirLights",
            Self::Point => "numPointLights",
            Self::Spot => "numSpotLights",
        }
    }

    pub fn enable_flag(self) -> &'static str {
        match self {
            Self::Directional => "useDirLight",
            Self::Point => "usePointLight",
            Self::Spot => "useSpotLight",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "directional" | "dir" | "sun" => Some(Self::Directional),
            "point" => Some(Self::Point),
            "spot" | "spotlight" => Some(Self::Spot),
            _ => None,
        }
    }
}

/// How light uniforms are keyed in the shader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UniformLayout {
    /// One block per kind (`spotLight.cutOff`); the last light of a kind wins.
    #[default]
    SingleSlot,
    /// Array blocks (`spotLights[1].cutOff`) plus a `numSpotLights` count.
    Indexed,
}

/// Where a light writes its uniforms during one render pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LightSlot {
    pub layout: UniformLayout,
    /// Position of this light among lights of the same kind in traversal order.
    pub index: usize,
}

impl Default for LightSlot {
    fn default() -> Self {
        Self {
            layout: UniformLayout::SingleSlot,
            index: 0,
        }
    }
}

impl LightSlot {
    pub fn indexed(index: usize) -> Self {
        Self {
            layout: UniformLayout::Indexed,
            index,
        }
    }

    /// Block name for `kind`, e.g. `spotLight` or `spotLights[2]`.
    pub fn block(self, kind: LightKind) -> String {
        match self.layout {
            UniformLayout::SingleSlot => kind.uniform_prefix().to_string(),
            UniformLayout::Indexed => format!("{}[{}]", kind.array_name(), self.index),
        }
    }
}

/// Constant, linear and quadratic falloff terms.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Attenuation {
    pub constant: f32,
    pub linear: f32,
    pub quadratic: f32,
}

impl Default for Attenuation {
    fn default() -> Self {
        Self {
            constant: 1.0,
            linear: 0.09,
            quadratic: 0.032,
        }
    }
}

impl Attenuation {
    /// Negative terms are clamped to zero.
    pub fn new(constant: f32, linear: f32, quadratic: f32) -> Self {
        Self {
            constant: constant.max(0.0),
            linear: linear.max(0.0),
            quadratic: quadratic.max(0.0),
        }
    }

    fn write(&self, shader: &dyn Shader, block: &str) {
        shader.set_float(&format!("{block}.constant"), self.constant);
        shader.set_float(&format!("{block}.linear"), self.linear);
        shader.set_float(&format!("{block}.quadratic"), self.quadratic);
    }
}

/// Circular path around the world Y axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Orbit {
    pub radius: f32,
    /// Radians per second.
    pub speed: f32,
    /// Current angle in radians.
    pub angle: f32,
}

impl Default for Orbit {
    fn default() -> Self {
        Self {
            radius: 2.0,
            speed: FRAC_PI_4,
            angle: 0.0,
        }
    }
}

impl Orbit {
    pub fn new(radius: f32, speed: f32) -> Self {
        Self {
            radius,
            speed,
            angle: 0.0,
        }
    }
}

/// Per-light movement applied during `update`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum LightMotion {
    #[default]
    Static,
    Orbit(Orbit),
}

/// State shared by every light variant.
#[derive(Debug, Clone, PartialEq)]
pub struct LightBase {
    pub ambient: Color,
    pub diffuse: Color,
    pub specular: Color,
    pub transform: Transform,
    pub motion: LightMotion,
}

impl Default for LightBase {
    fn default() -> Self {
        Self {
            ambient: Color::gray(0.1),
            diffuse: Color::gray(0.8),
            specular: Color::WHITE,
            transform: Transform::default(),
            motion: LightMotion::Static,
        }
    }
}

impl LightBase {
    /// Advances the motion policy. Returns the new facing direction when the
    /// policy produced one.
    fn update(&mut self, ctx: &FrameContext) -> Option<Vec3> {
        match &mut self.motion {
            LightMotion::Static => None,
            LightMotion::Orbit(orbit) => {
                orbit.angle += orbit.speed * ctx.delta_time;
                let position = &mut self.transform.position;
                position.x = orbit.radius * orbit.angle.cos();
                position.z = orbit.radius * orbit.angle.sin();
                self.transform
                    .set_rotation(Vec3::new(0.0, orbit.angle.to_degrees(), 0.0));
                Some(-self.transform.position)
            }
        }
    }

    fn write_colors(&self, shader: &dyn Shader, block: &str) {
        shader.set_vec3(&format!("{block}.ambient"), self.ambient.to_vec3());
        shader.set_vec3(&format!("{block}.diffuse"), self.diffuse.to_vec3());
        shader.set_vec3(&format!("{block}.specular"), self.specular.to_vec3());
    }

    fn render(&self, shader: &dyn Shader, kind: LightKind, block: &str) {
        self.write_colors(shader, block);
        shader.set_float(&format!("{block}.type"), kind.index() as f32);
    }
}

fn normalized_or(direction: Vec3, fallback: Vec3) -> Vec3 {
    match direction.try_normalize() {
        Some(unit) => unit,
        None => {
            warn!("ignoring zero-length light direction");
            fallback
        }
    }
}

/// Parallel rays with no falloff.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectionalLight {
    pub base: LightBase,
    direction: Vec3,
}

impl Default for DirectionalLight {
    fn default() -> Self {
        Self {
            base: LightBase::default(),
            direction: Vec3::new(-0.2, -1.0, -0.3).normalize(),
        }
    }
}

impl DirectionalLight {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn direction(&self) -> Vec3 {
        self.direction
    }

    pub fn set_direction(&mut self, direction: Vec3) {
        self.direction = normalized_or(direction, self.direction);
    }

    fn render(&self, shader: &dyn Shader, block: &str) {
        self.base.render(shader, LightKind::Directional, block);
        shader.set_vec3(&format!("{block}.direction"), self.direction);
        shader.set_bool(LightKind::Directional.enable_flag(), true);
    }
}

/// Omnidirectional light with distance falloff.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PointLight {
    pub base: LightBase,
    attenuation: Attenuation,
}

impl PointLight {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attenuation(&self) -> Attenuation {
        self.attenuation
    }

    pub fn set_attenuation(&mut self, constant: f32, linear: f32, quadratic: f32) {
        self.attenuation = Attenuation::new(constant, linear, quadratic);
    }

    fn render(&self, shader: &dyn Shader, block: &str) {
        self.base.render(shader, LightKind::Point, block);
        shader.set_vec3(&format!("{block}.position"), self.base.transform.position);
        self.attenuation.write(shader, block);
        shader.set_bool(LightKind::Point.enable_flag(), true);
    }
}

/// Cone light with a soft edge between the inner and outer cut-off angles.
#[derive(Debug, Clone, PartialEq)]
pub struct SpotLight {
    pub base: LightBase,
    cut_off: f32,
    outer_cut_off: f32,
    attenuation: Attenuation,
    direction: Vec3,
}

impl Default for SpotLight {
    fn default() -> Self {
        Self {
            base: LightBase::default(),
            cut_off: 12.5,
            outer_cut_off: 17.5,
            attenuation: Attenuation::default(),
            direction: Vec3::NEG_Z,
        }
    }
}

/// `min(max(x, lo), hi)`; tolerates `lo > hi`.
fn clamp_unordered(x: f32, lo: f32, hi: f32) -> f32 {
    x.max(lo).min(hi)
}

impl SpotLight {
    pub const MAX_CUT_OFF: f32 = 90.0;

    pub fn new() -> Self {
        Self::default()
    }

    /// Inner cut-off in degrees.
    pub fn cut_off(&self) -> f32 {
        self.cut_off
    }

    /// Outer cut-off in degrees.
    pub fn outer_cut_off(&self) -> f32 {
        self.outer_cut_off
    }

    pub fn attenuation(&self) -> Attenuation {
        self.attenuation
    }

    pub fn direction(&self) -> Vec3 {
        self.direction
    }

    /// Sets the cone angles in degrees.
    ///
    /// The inner angle is clamped to `[0, outer]` and the outer angle to
    /// `[inner, 90]`, both against the raw arguments, so swapped inputs come
    /// out ordered: `(30, 10)` stores `(10, 30)`. Inputs that leave the pair
    /// outside `[0, 90]` or unordered after those two clamps are then pulled
    /// into range and the inner angle is capped at the outer one:
    /// `(100, 120)` stores `(90, 90)` and `(10, -5)` stores `(0, 10)`.
    pub fn set_cut_off_angles(&mut self, inner: f32, outer: f32) {
        let cut_off = clamp_unordered(inner, 0.0, outer);
        let outer_cut_off = clamp_unordered(outer, inner, Self::MAX_CUT_OFF);

        let outer_cut_off = outer_cut_off.clamp(0.0, Self::MAX_CUT_OFF);
        self.cut_off = cut_off.clamp(0.0, Self::MAX_CUT_OFF).min(outer_cut_off);
        self.outer_cut_off = outer_cut_off;
    }

    pub fn set_attenuation(&mut self, constant: f32, linear: f32, quadratic: f32) {
        self.attenuation = Attenuation::new(constant, linear, quadratic);
    }

    /// Stores the normalized direction. A zero vector keeps the old one.
    pub fn set_direction(&mut self, direction: Vec3) {
        self.direction = normalized_or(direction, self.direction);
    }

    fn render(&self, shader: &dyn Shader, block: &str) {
        self.base.render(shader, LightKind::Spot, block);

        shader.set_vec3(&format!("{block}.position"), self.base.transform.position);
        shader.set_vec3(&format!("{block}.direction"), self.direction);
        shader.set_float(&format!("{block}.cutOff"), self.cut_off.to_radians().cos());
        shader.set_float(
            &format!("{block}.outerCutOff"),
            self.outer_cut_off.to_radians().cos(),
        );
        self.attenuation.write(shader, block);
        self.base.write_colors(shader, block);

        shader.set_bool(LightKind::Spot.enable_flag(), true);
    }
}

/// Closed set of light variants dispatched by the scene.
#[derive(Debug, Clone, PartialEq)]
pub enum Light {
    Directional(DirectionalLight),
    Point(PointLight),
    Spot(SpotLight),
}

impl From<DirectionalLight> for Light {
    fn from(light: DirectionalLight) -> Self {
        Self::Directional(light)
    }
}

impl From<PointLight> for Light {
    fn from(light: PointLight) -> Self {
        Self::Point(light)
    }
}

impl From<SpotLight> for Light {
    fn from(light: SpotLight) -> Self {
        Self::Spot(light)
    }
}

impl Light {
    /// Default light of the given kind.
    pub fn of_kind(kind: LightKind) -> Self {
        match kind {
            LightKind::Directional => DirectionalLight::default().into(),
            LightKind::Point => PointLight::default().into(),
            LightKind::Spot => SpotLight::default().into(),
        }
    }

    pub fn kind(&self) -> LightKind {
        match self {
            Self::Directional(_) => LightKind::Directional,
            Self::Point(_) => LightKind::Point,
            Self::Spot(_) => LightKind::Spot,
        }
    }

    pub fn base(&self) -> &LightBase {
        match self {
            Self::Directional(light) => &light.base,
            Self::Point(light) => &light.base,
            Self::Spot(light) => &light.base,
        }
    }

    pub fn base_mut(&mut self) -> &mut LightBase {
        match self {
            Self::Directional(light) => &mut light.base,
            Self::Point(light) => &mut light.base,
            Self::Spot(light) => &mut light.base,
        }
    }

    /// Turns this light into `kind`, keeping the shared state and taking the
    /// new variant's defaults for everything else. Directions carry over
    /// between the directional and spot variants.
    pub fn set_kind(&mut self, kind: LightKind) {
        if self.kind() == kind {
            return;
        }
        let direction = match self {
            Self::Directional(light) => Some(light.direction),
            Self::Spot(light) => Some(light.direction),
            Self::Point(_) => None,
        };
        let mut next = Self::of_kind(kind);
        *next.base_mut() = self.base().clone();
        if let Some(direction) = direction {
            match &mut next {
                Self::Directional(light) => light.direction = direction,
                Self::Spot(light) => light.direction = direction,
                Self::Point(_) => {}
            }
        }
        *self = next;
    }

    pub fn position(&self) -> Vec3 {
        self.base().transform.position
    }

    /// Runs the motion policy. An orbit sitting on the origin leaves the
    /// direction untouched.
    pub fn update(&mut self, ctx: &FrameContext) {
        let Some(facing) = self.base_mut().update(ctx).and_then(Vec3::try_normalize) else {
            return;
        };
        match self {
            Self::Directional(light) => light.set_direction(facing),
            Self::Spot(light) => light.set_direction(facing),
            Self::Point(_) => {}
        }
    }

    /// Writes this light's uniform block. `_camera` is part of the dispatch
    /// signature for variants that need view-space data.
    pub fn render(&self, shader: &dyn Shader, _camera: &Camera, slot: LightSlot) {
        let kind = self.kind();
        let block = slot.block(kind);
        match self {
            Self::Directional(light) => light.render(shader, &block),
            Self::Point(light) => light.render(shader, &block),
            Self::Spot(light) => light.render(shader, &block),
        }
        trace!("rendered {kind:?} light into {block}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shader::UniformStore;

    fn render(light: &Light, slot: LightSlot) -> UniformStore {
        let store = UniformStore::new("light");
        light.render(&store, &Camera::default(), slot);
        store
    }

    #[test]
    fn swapped_cut_off_angles_are_reordered() {
        let mut spot = SpotLight::new();
        spot.set_cut_off_angles(30.0, 10.0);
        assert_eq!((spot.cut_off(), spot.outer_cut_off()), (10.0, 30.0));
    }

    #[test]
    fn cut_off_angles_stay_ordered_and_in_range() {
        let cases = [
            ((12.5, 17.5), (12.5, 17.5)),
            ((-5.0, 20.0), (0.0, 20.0)),
            ((100.0, 120.0), (90.0, 90.0)),
            ((10.0, -5.0), (0.0, 10.0)),
            ((45.0, 200.0), (45.0, 90.0)),
            ((-10.0, -20.0), (0.0, 0.0)),
        ];
        for ((inner, outer), expected) in cases {
            let mut spot = SpotLight::new();
            spot.set_cut_off_angles(inner, outer);
            let stored = (spot.cut_off(), spot.outer_cut_off());
            assert_eq!(stored, expected, "inputs ({inner}, {outer})");
            assert!(stored.0 <= stored.1);
            assert!((0.0..=90.0).contains(&stored.0));
            assert!((0.0..=90.0).contains(&stored.1));
        }
    }

    #[test]
    fn set_direction_normalizes() {
        let mut spot = SpotLight::new();
        let inputs = [
            Vec3::new(3.0, 4.0, 0.0),
            Vec3::new(-0.001, 0.0, 0.002),
            Vec3::ONE * 50.0,
        ];
        for input in inputs {
            spot.set_direction(input);
            assert!((spot.direction().length() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn zero_direction_keeps_previous_value() {
        let mut spot = SpotLight::new();
        spot.set_direction(Vec3::X * 2.0);
        spot.set_direction(Vec3::ZERO);
        assert_eq!(spot.direction(), Vec3::X);
    }

    #[test]
    fn negative_attenuation_is_clamped() {
        let mut point = PointLight::new();
        point.set_attenuation(-1.0, 0.5, -0.1);
        assert_eq!(point.attenuation(), Attenuation::new(0.0, 0.5, 0.0));
    }

    #[test]
    fn spot_render_writes_cosines_and_flag() {
        let mut spot = SpotLight::new();
        spot.set_cut_off_angles(60.0, 90.0);
        spot.set_attenuation(1.0, 0.5, 0.25);
        let store = render(&spot.into(), LightSlot::default());
        assert!((store.float("spotLight.cutOff").unwrap() - 0.5).abs() < 1e-5);
        assert!(store.float("spotLight.outerCutOff").unwrap().abs() < 1e-5);
        assert_eq!(store.float("spotLight.linear"), Some(0.5));
        assert_eq!(store.float("spotLight.quadratic"), Some(0.25));
        assert_eq!(store.float("spotLight.type"), Some(2.0));
        assert_eq!(store.vec3("spotLight.direction"), Some(Vec3::NEG_Z));
        assert_eq!(store.bool("useSpotLight"), Some(true));
        assert_eq!(store.vec3("spotLight.specular"), Some(Vec3::ONE));
    }

    #[test]
    fn each_variant_writes_its_own_block() {
        let directional = render(&Light::of_kind(LightKind::Directional), LightSlot::default());
        assert!(directional.vec3("dirLight.direction").is_some());
        assert_eq!(directional.bool("useDirLight"), Some(true));
        assert_eq!(directional.float("dirLight.type"), Some(0.0));

        let point = render(&Light::of_kind(LightKind::Point), LightSlot::default());
        assert_eq!(point.vec3("pointLight.position"), Some(Vec3::ZERO));
        assert_eq!(point.float("pointLight.constant"), Some(1.0));
        assert_eq!(point.bool("usePointLight"), Some(true));
        assert!(point.get("spotLight.cutOff").is_none());
    }

    #[test]
    fn indexed_slot_prefixes_block() {
        let store = render(&Light::of_kind(LightKind::Spot), LightSlot::indexed(3));
        assert!(store.float("spotLights[3].cutOff").is_some());
        assert!(store.get("spotLight.cutOff").is_none());
        assert_eq!(store.bool("useSpotLight"), Some(true));
    }

    #[test]
    fn static_lights_do_not_move() {
        let mut light = Light::of_kind(LightKind::Spot);
        let before = light.clone();
        light.update(&FrameContext::with_delta(1.0));
        assert_eq!(light, before);
    }

    #[test]
    fn orbit_follows_circle_and_faces_origin() {
        let mut spot = SpotLight::new();
        spot.base.transform.position.y = 1.5;
        spot.base.motion = LightMotion::Orbit(Orbit::new(2.0, FRAC_PI_4));
        let mut light = Light::from(spot);

        // two seconds at pi/4 rad/s is a quarter turn
        light.update(&FrameContext::with_delta(1.0));
        light.update(&FrameContext::with_delta(1.0));

        let position = light.position();
        assert!((position - Vec3::new(0.0, 1.5, 2.0)).length() < 1e-4);
        assert!((light.base().transform.rotation.y - 90.0).abs() < 1e-3);
        let Light::Spot(spot) = &light else {
            panic!("expected spot light");
        };
        let expected = (-position).normalize();
        assert!((spot.direction() - expected).length() < 1e-5);
    }

    #[test]
    fn orbit_through_origin_keeps_direction() {
        let mut directional = DirectionalLight::new();
        directional.base.motion = LightMotion::Orbit(Orbit::new(0.0, FRAC_PI_4));
        let before = directional.direction();
        let mut light = Light::from(directional);

        for _ in 0..3 {
            light.update(&FrameContext::with_delta(0.5));
        }

        assert_eq!(light.position(), Vec3::ZERO);
        let Light::Directional(directional) = &light else {
            panic!("expected directional light");
        };
        assert_eq!(directional.direction(), before);
    }

    #[test]
    fn orbit_angle_is_per_light() {
        let mut a = Light::of_kind(LightKind::Point);
        a.base_mut().motion = LightMotion::Orbit(Orbit::default());
        let mut b = a.clone();
        a.update(&FrameContext::with_delta(1.0));
        assert_ne!(a.position(), b.position());
        b.update(&FrameContext::with_delta(1.0));
        assert_eq!(a.position(), b.position());
    }

    #[test]
    fn set_kind_keeps_shared_state() {
        let mut light = Light::of_kind(LightKind::Directional);
        light.base_mut().diffuse = Color::rgb(1.0, 0.0, 0.0);
        if let Light::Directional(directional) = &mut light {
            directional.set_direction(Vec3::X);
        }
        light.set_kind(LightKind::Spot);
        assert_eq!(light.kind(), LightKind::Spot);
        assert_eq!(light.base().diffuse, Color::rgb(1.0, 0.0, 0.0));
        let Light::Spot(spot) = &light else {
            panic!("expected spot light");
        };
        assert_eq!(spot.direction(), Vec3::X);
        assert_eq!(spot.cut_off(), 12.5);
    }

    #[test]
    fn light_kind_parses_scene_names() {
        assert_eq!(LightKind::from_name("Spot"), Some(LightKind::Spot));
        assert_eq!(LightKind::from_name("directional"), Some(LightKind::Directional));
        assert_eq!(LightKind::from_name("area"), None);
    }
}
