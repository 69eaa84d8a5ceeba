//! Shader-ready light records.

use bytemuck::{Pod, Zeroable};
use glam::{Vec3, Vec4};
use static_assertions::const_assert_eq;

use super::{LightType, MixedLightingMode, VisibleLight};

/// Fraction of the range at which point/spot attenuation starts fading.
const FADE_START: f32 = 0.8;

/// Default inner cone ratio when no inner angle is authored.
const DEFAULT_INNER_RATIO: f32 = (64.0 - 18.0) / 64.0;

/// One packed light, as read by shaders.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct LightRecord {
    /// Directional: xyz = direction towards the light, w = 0.
    /// Point/spot: xyz = position, w = 1.
    pub position: Vec4,
    /// xyz = color, w = 1 when the light uses subtractive mixed lighting.
    pub color: Vec4,
    /// x = 1/range², y = fade factor, z = spot scale, w = spot offset.
    pub attenuation: Vec4,
    /// xyz = direction the spot points away from.
    pub spot_direction: Vec4,
    /// x = occlusion channel, y = 1 when the light has no occlusion channel.
    pub occlusion_probe_channels: Vec4,
    pub layer_mask: u32,
    pub _padding: [u32; 3],
}

const_assert_eq!(std::mem::size_of::<LightRecord>(), 96);

impl LightRecord {
    /// Pack a visible light.
    pub fn from_visible(light: &VisibleLight) -> Self {
        let position = match light.light_type {
            LightType::Directional => (-light.forward()).extend(0.0),
            LightType::Point | LightType::Spot => light.position().extend(1.0),
        };

        let subtractive = light
            .source
            .is_some_and(|source| source.bake.mixed_mode == MixedLightingMode::Subtractive);
        let color = light.final_color.extend(if subtractive { 1.0 } else { 0.0 });

        let channel = light
            .source
            .map_or(-1, |source| source.bake.occlusion_mask_channel);
        let occlusion_probe_channels = Vec4::new(
            channel.max(0) as f32,
            if channel == -1 { 1.0 } else { 0.0 },
            0.0,
            0.0,
        );

        let layer_mask = light.source.map_or(u32::MAX, |source| source.rendering_layer_mask);

        Self {
            position,
            color,
            attenuation: attenuation(light),
            spot_direction: spot_direction(light),
            occlusion_probe_channels,
            layer_mask,
            _padding: [0; 3],
        }
    }
}

fn attenuation(light: &VisibleLight) -> Vec4 {
    // Directional lights never attenuate and never pass the spot test.
    let mut result = Vec4::new(0.0, 1.0, 0.0, 1.0);
    if light.light_type == LightType::Directional {
        return result;
    }

    let range_sqr = light.range * light.range;
    let fade_start_sqr = FADE_START * FADE_START * range_sqr;
    let fade_range_sqr = fade_start_sqr - range_sqr;
    result.x = 1.0 / range_sqr.max(1e-4);
    result.y = if fade_range_sqr != 0.0 {
        -range_sqr / fade_range_sqr
    } else {
        0.0
    };

    if light.light_type == LightType::Spot {
        let half_outer = (light.spot_angle * 0.5).to_radians();
        let cos_outer = half_outer.cos();
        let cos_inner = match light.inner_spot_angle {
            Some(inner) => (inner * 0.5).to_radians().cos(),
            None => (half_outer.tan() * DEFAULT_INNER_RATIO).atan().cos(),
        };
        let inv_angle_range = 1.0 / (cos_inner - cos_outer).max(0.001);
        result.z = inv_angle_range;
        result.w = -cos_outer * inv_angle_range;
    }

    result
}

fn spot_direction(light: &VisibleLight) -> Vec4 {
    match light.light_type {
        LightType::Spot => (-light.forward()).extend(0.0),
        _ => Vec3::Z.extend(0.0),
    }
}
