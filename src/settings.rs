//! Pipeline configuration and platform capabilities.
//!
//! All process-wide state the frame core reads lives in a [`PipelineContext`]
//! built once at pipeline startup and passed by reference into the
//! orchestrator and the light preparer. There are no ambient statics.
//!
//! | Type | Lifetime | Source |
//! |------|----------|--------|
//! | [`PipelineSettings`] | pipeline asset | authored, serializable |
//! | [`PlatformCapabilities`] | process | device queries at startup |
//! | `hdr_output_active` | per frame | display negotiation |

use serde::{Deserialize, Serialize};

// ============================================================================
// Modes
// ============================================================================

/// Lighting path used to shade opaque geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RenderingMode {
    /// Per-object light lists, one shading pass.
    #[default]
    Forward,
    /// Clustered forward: Z-bin and tile light masks replace per-object lists.
    ForwardPlus,
    /// G-buffer fill followed by a full-screen lighting resolve.
    Deferred,
}

impl RenderingMode {
    /// Returns true for `Forward` and `ForwardPlus`.
    pub fn is_forward(self) -> bool {
        matches!(self, Self::Forward | Self::ForwardPlus)
    }
}

/// Depth priming request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DepthPrimingMode {
    /// Never prime.
    #[default]
    Disabled,
    /// Prime when the platform profile recommends it.
    Auto,
    /// Prime whenever the platform can copy depth.
    Forced,
}

/// Where the camera depth texture gets filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CopyDepthMode {
    /// Copy once opaques and the skybox are done.
    #[default]
    AfterOpaques,
    /// Copy after transparents, unless a pass needs depth earlier.
    AfterTransparents,
    /// Always render a depth prepass instead of copying.
    ForcePrepass,
}

/// Main light shading mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MainLightMode {
    /// No main light slot.
    Disabled,
    /// Main light evaluated per pixel.
    #[default]
    PerPixel,
}

/// Additional lights shading mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AdditionalLightsMode {
    /// Additional lights are not packed.
    Disabled,
    /// Additional lights evaluated per vertex.
    PerVertex,
    /// Additional lights evaluated per pixel.
    #[default]
    PerPixel,
}

/// Filter used when the camera renders at a reduced resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum UpscalingFilter {
    /// Bilinear or point depending on the scale factor.
    #[default]
    Auto,
    /// Bilinear filtering.
    Linear,
    /// Nearest neighbour filtering.
    Point,
    /// Temporal upscaler. Always runs the upscale path, even at scale 1.0.
    Temporal,
}

impl UpscalingFilter {
    /// Returns true if this filter needs the upscale path at native resolution.
    pub fn forces_upscale(self) -> bool {
        matches!(self, Self::Temporal)
    }
}

/// How the view depth range maps onto Z-bins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ZBinRemap {
    /// `log2(depth)` spacing, denser near the camera.
    #[default]
    Logarithmic,
    /// Uniform spacing between near and far.
    Linear,
}

// ============================================================================
// Settings
// ============================================================================

/// Clustered lighting configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusteringSettings {
    /// Depth remap used for Z-bins.
    pub z_bin_remap: ZBinRemap,
    /// Smallest screen tile edge in pixels. Doubled until the tile table fits.
    pub min_tile_size: u32,
}

impl Default for ClusteringSettings {
    fn default() -> Self {
        Self {
            z_bin_remap: ZBinRemap::Logarithmic,
            min_tile_size: 8,
        }
    }
}

/// Authored pipeline configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    /// Requested lighting path.
    pub rendering_mode: RenderingMode,
    /// Depth priming request.
    pub depth_priming: DepthPrimingMode,
    /// Where the depth texture is produced.
    pub copy_depth_mode: CopyDepthMode,
    /// Main light mode.
    pub main_light_mode: MainLightMode,
    /// Whether the main light casts shadows.
    pub main_light_shadows: bool,
    /// Additional lights mode.
    pub additional_lights_mode: AdditionalLightsMode,
    /// Per-object additional light limit (clamped to the platform maximum).
    pub max_per_object_lights: u32,
    /// Resolution multiplier applied to game cameras.
    pub render_scale: f32,
    /// Upscaling filter.
    pub upscaling_filter: UpscalingFilter,
    /// Render in high dynamic range.
    pub hdr: bool,
    /// MSAA sample count (1, 2, 4 or 8).
    pub msaa_samples: u32,
    /// Produce the camera depth texture for every camera.
    pub requires_depth_texture: bool,
    /// Produce the opaque color copy for every camera.
    pub requires_opaque_texture: bool,
    /// Evaluate per-light rendering layer masks.
    pub light_layers: bool,
    /// Soft shadow filtering.
    pub soft_shadows: bool,
    /// Forward+ configuration.
    pub clustering: ClusteringSettings,
    /// Frames a released transient texture may stay unused before it is destroyed.
    pub transient_stale_frames: u64,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            rendering_mode: RenderingMode::Forward,
            depth_priming: DepthPrimingMode::Disabled,
            copy_depth_mode: CopyDepthMode::AfterOpaques,
            main_light_mode: MainLightMode::PerPixel,
            main_light_shadows: true,
            additional_lights_mode: AdditionalLightsMode::PerPixel,
            max_per_object_lights: 4,
            render_scale: 1.0,
            upscaling_filter: UpscalingFilter::Auto,
            hdr: true,
            msaa_samples: 1,
            requires_depth_texture: false,
            requires_opaque_texture: false,
            light_layers: false,
            soft_shadows: true,
            clustering: ClusteringSettings::default(),
            transient_stale_frames: 10,
        }
    }
}

// ============================================================================
// Platform capabilities
// ============================================================================

/// Coarse platform class used for budgets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PlatformTier {
    /// Desktop and console GPUs.
    #[default]
    Desktop,
    /// Mobile GPUs with modern shader support.
    Mobile,
    /// Mobile GPUs with a reduced shader model.
    MobileLowEnd,
}

/// Device capabilities, resolved once at startup.
///
/// Display-dependent flags (`hdr_output_active`) may be refreshed per frame
/// via [`PipelineContext::set_hdr_output_active`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformCapabilities {
    /// Platform class.
    pub tier: PlatformTier,
    /// Texture-to-texture copies are supported.
    pub texture_copy: bool,
    /// Depth formats can be rendered to and sampled.
    pub depth_target: bool,
    /// Multisampled textures can be sampled in shaders (MSAA depth resolve).
    pub multisampled_textures: bool,
    /// MSAA targets must be resolved with an explicit blit.
    pub explicit_msaa_resolve: bool,
    /// Structured (storage) buffers are available to fragment shaders.
    pub structured_buffers: bool,
    /// The clustered lighting subsystem runs on this hardware.
    pub clustering: bool,
    /// The G-buffer depth attachment can be read in place.
    pub gbuffer_depth_fetch: bool,
    /// The platform profile recommends depth priming.
    pub depth_priming_recommended: bool,
    /// The GPU performs hidden surface removal, making front-to-back sorting moot.
    pub hidden_surface_removal: bool,
    /// The display currently accepts HDR output.
    pub hdr_output_active: bool,
}

impl Default for PlatformCapabilities {
    fn default() -> Self {
        Self::desktop()
    }
}

impl PlatformCapabilities {
    /// Typical desktop GPU.
    pub fn desktop() -> Self {
        Self {
            tier: PlatformTier::Desktop,
            texture_copy: true,
            depth_target: true,
            multisampled_textures: true,
            explicit_msaa_resolve: false,
            structured_buffers: true,
            clustering: true,
            gbuffer_depth_fetch: false,
            depth_priming_recommended: true,
            hidden_surface_removal: false,
            hdr_output_active: false,
        }
    }

    /// Typical tile-based mobile GPU.
    pub fn mobile() -> Self {
        Self {
            tier: PlatformTier::Mobile,
            texture_copy: true,
            depth_target: true,
            multisampled_textures: false,
            explicit_msaa_resolve: true,
            structured_buffers: false,
            clustering: true,
            gbuffer_depth_fetch: true,
            depth_priming_recommended: false,
            hidden_surface_removal: true,
            hdr_output_active: false,
        }
    }

    /// Maximum number of additional lights the packed light data can hold.
    pub fn max_visible_additional_lights(&self) -> usize {
        match self.tier {
            PlatformTier::Desktop => 256,
            PlatformTier::Mobile => 32,
            PlatformTier::MobileLowEnd => 16,
        }
    }

    /// Upper bound for per-object additional lights.
    pub fn max_per_object_lights(&self) -> usize {
        match self.tier {
            PlatformTier::MobileLowEnd => 4,
            _ => 8,
        }
    }

    /// Returns true if depth can be copied for a target with `msaa_samples`.
    pub fn can_copy_depth(&self, msaa_samples: u32) -> bool {
        let msaa = msaa_samples > 1;
        let supports_depth_copy = !msaa && (self.depth_target || self.texture_copy);
        let msaa_depth_resolve = msaa && self.multisampled_textures;
        supports_depth_copy || msaa_depth_resolve
    }
}

// ============================================================================
// Context
// ============================================================================

/// Explicit pipeline context replacing process-wide globals.
#[derive(Debug, Clone)]
pub struct PipelineContext {
    settings: PipelineSettings,
    capabilities: PlatformCapabilities,
    frame_index: u64,
}

impl PipelineContext {
    /// Create a context at pipeline startup.
    pub fn new(settings: PipelineSettings, capabilities: PlatformCapabilities) -> Self {
        log::debug!(
            "Pipeline context: {:?} on {:?} (light budget {})",
            settings.rendering_mode,
            capabilities.tier,
            capabilities.max_visible_additional_lights()
        );
        Self {
            settings,
            capabilities,
            frame_index: 0,
        }
    }

    /// Authored settings.
    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Mutable settings, for runtime tweaks between frames.
    pub fn settings_mut(&mut self) -> &mut PipelineSettings {
        &mut self.settings
    }

    /// Device capabilities.
    pub fn capabilities(&self) -> &PlatformCapabilities {
        &self.capabilities
    }

    /// Refresh the display-dependent HDR flag.
    pub fn set_hdr_output_active(&mut self, active: bool) {
        self.capabilities.hdr_output_active = active;
    }

    /// Monotonic frame counter.
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// Advance to the next frame.
    pub(crate) fn advance_frame(&mut self) {
        self.frame_index += 1;
    }

    /// Additional light budget shared by packing and clustering.
    pub fn light_budget(&self) -> usize {
        self.capabilities.max_visible_additional_lights()
    }

    /// Effective per-object light limit.
    pub fn per_object_light_limit(&self) -> usize {
        (self.settings.max_per_object_lights as usize).min(self.capabilities.max_per_object_lights())
    }
}

impl Default for PipelineContext {
    fn default() -> Self {
        Self::new(PipelineSettings::default(), PlatformCapabilities::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_light_budgets() {
        let mut caps = PlatformCapabilities::desktop();
        assert_eq!(caps.max_visible_additional_lights(), 256);
        caps.tier = PlatformTier::Mobile;
        assert_eq!(caps.max_visible_additional_lights(), 32);
        caps.tier = PlatformTier::MobileLowEnd;
        assert_eq!(caps.max_visible_additional_lights(), 16);
        assert_eq!(caps.max_per_object_lights(), 4);
    }

    #[test]
    fn test_can_copy_depth() {
        let mut caps = PlatformCapabilities::desktop();
        assert!(caps.can_copy_depth(1));
        assert!(caps.can_copy_depth(4));

        caps.multisampled_textures = false;
        assert!(!caps.can_copy_depth(4));

        caps.depth_target = false;
        caps.texture_copy = false;
        assert!(!caps.can_copy_depth(1));
    }

    #[test]
    fn test_per_object_limit_clamped() {
        let mut settings = PipelineSettings::default();
        settings.max_per_object_lights = 16;
        let ctx = PipelineContext::new(settings, PlatformCapabilities::desktop());
        assert_eq!(ctx.per_object_light_limit(), 8);
    }

    #[test]
    fn test_frame_index_advances() {
        let mut ctx = PipelineContext::default();
        assert_eq!(ctx.frame_index(), 0);
        ctx.advance_frame();
        ctx.advance_frame();
        assert_eq!(ctx.frame_index(), 2);
    }
}
