//! Visible light input from culling.

use glam::{Mat4, Vec3, Vec4};

/// Type of light source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LightType {
    /// Infinitely distant light with parallel rays.
    Directional,
    /// Omnidirectional light at a point.
    Point,
    /// Cone light.
    Spot,
}

/// Stable identity of an authored light.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LightId(pub u64);

/// How a mixed light was baked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MixedLightingMode {
    /// Realtime only or not mixed.
    #[default]
    None,
    /// Baked indirect lighting.
    BakedIndirect,
    /// Baked shadows stored as occlusion masks.
    Shadowmask,
    /// Baked direct lighting subtracted for dynamic shadows.
    Subtractive,
}

/// Lightmap bake metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LightBakeInfo {
    pub mixed_mode: MixedLightingMode,
    /// Occlusion mask channel, or -1 when the light has none.
    pub occlusion_mask_channel: i32,
}

impl Default for LightBakeInfo {
    fn default() -> Self {
        Self {
            mixed_mode: MixedLightingMode::None,
            occlusion_mask_channel: -1,
        }
    }
}

/// Authoring data behind a visible light.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightSource {
    pub id: LightId,
    /// Authored intensity, used to rank directional lights.
    pub intensity: f32,
    pub bake: LightBakeInfo,
    pub rendering_layer_mask: u32,
}

impl LightSource {
    /// Source with default bake info and the first rendering layer.
    pub fn new(id: u64, intensity: f32) -> Self {
        Self {
            id: LightId(id),
            intensity,
            bake: LightBakeInfo::default(),
            rendering_layer_mask: 1,
        }
    }
}

/// A light that survived culling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisibleLight {
    pub light_type: LightType,
    /// Linear color premultiplied by intensity.
    pub final_color: Vec3,
    /// World transform; column 2 is the forward axis, column 3 the position.
    pub local_to_world: Mat4,
    pub range: f32,
    /// Outer cone angle in degrees.
    pub spot_angle: f32,
    /// Inner cone angle in degrees, if authored.
    pub inner_spot_angle: Option<f32>,
    /// Backing authored light. Synthetic lights (particles) have none and
    /// are placed after every real light.
    pub source: Option<LightSource>,
}

impl VisibleLight {
    /// Directional light shining along `direction`.
    pub fn directional(direction: Vec3, color: Vec3, source: Option<LightSource>) -> Self {
        let forward = direction.normalize_or_zero();
        let up = if forward.y.abs() > 0.99 { Vec3::X } else { Vec3::Y };
        let right = up.cross(forward).normalize_or_zero();
        let up = forward.cross(right);
        Self {
            light_type: LightType::Directional,
            final_color: color,
            local_to_world: Mat4::from_cols(
                right.extend(0.0),
                up.extend(0.0),
                forward.extend(0.0),
                Vec4::W,
            ),
            range: 0.0,
            spot_angle: 0.0,
            inner_spot_angle: None,
            source,
        }
    }

    /// Point light at `position`.
    pub fn point(position: Vec3, range: f32, color: Vec3, source: Option<LightSource>) -> Self {
        Self {
            light_type: LightType::Point,
            final_color: color,
            local_to_world: Mat4::from_translation(position),
            range,
            spot_angle: 0.0,
            inner_spot_angle: None,
            source,
        }
    }

    /// Spot light at `position` pointing along `direction`.
    pub fn spot(
        position: Vec3,
        direction: Vec3,
        range: f32,
        spot_angle: f32,
        color: Vec3,
        source: Option<LightSource>,
    ) -> Self {
        let mut light = Self::directional(direction, color, source);
        light.light_type = LightType::Spot;
        light.local_to_world.w_axis = position.extend(1.0);
        light.range = range;
        light.spot_angle = spot_angle;
        light
    }

    /// World position.
    pub fn position(&self) -> Vec3 {
        self.local_to_world.w_axis.truncate()
    }

    /// World forward axis.
    pub fn forward(&self) -> Vec3 {
        self.local_to_world.z_axis.truncate()
    }

    /// Authored intensity, zero for synthetic lights.
    pub fn intensity(&self) -> f32 {
        self.source.map_or(0.0, |source| source.intensity)
    }

    /// Returns true for directional lights.
    pub fn is_directional(&self) -> bool {
        self.light_type == LightType::Directional
    }
}
