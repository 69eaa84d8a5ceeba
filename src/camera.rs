//! Per-camera frame configuration.
//!
//! [`CameraSource`] is what upstream scene code hands over: transforms,
//! target, and per-camera authoring flags. [`CameraFrameConfig::initialize`]
//! combines it with the [`PipelineContext`] into the configuration the
//! orchestrator decides on. It is rebuilt every frame and never persisted.

use glam::{Mat4, Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::error::{FrameError, FrameResult};
use crate::settings::{PipelineContext, RenderingMode, UpscalingFilter};
use crate::types::{TextureDimension, TextureFormat, ViewportRect};

/// What a camera is used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CameraKind {
    /// In-game camera.
    #[default]
    Game,
    /// Editor scene view.
    SceneView,
    /// Asset preview thumbnail.
    Preview,
    /// Reflection probe capture.
    Reflection,
}

/// Position of a camera in a stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CameraRenderType {
    /// Owns the stack's color and depth targets.
    #[default]
    Base,
    /// Renders on top of the stack's targets.
    Overlay,
}

/// Resolution scaling applied to the camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ImageScalingMode {
    /// Native resolution.
    #[default]
    None,
    /// Rendered smaller and scaled up to the target.
    Upscale,
    /// Rendered larger and scaled down to the target.
    Downscale,
}

impl ImageScalingMode {
    /// Scaling mode for a render scale.
    ///
    /// Preview and reflection cameras always render at native resolution,
    /// so upscaling never applies to them.
    pub fn from_render_scale(render_scale: f32, kind: CameraKind, filter: UpscalingFilter) -> Self {
        let native_only = matches!(kind, CameraKind::Preview | CameraKind::Reflection);
        if render_scale > 1.0 {
            Self::Downscale
        } else if render_scale < 1.0 && !native_only {
            Self::Upscale
        } else if filter.forces_upscale() && !native_only {
            Self::Upscale
        } else {
            Self::None
        }
    }
}

/// Antialiasing applied by the camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AntialiasingMode {
    #[default]
    None,
    Fxaa,
    Smaa,
    /// Temporal antialiasing. Needs motion vectors.
    Temporal,
}

/// Per-camera opaque sorting request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum OpaqueSortMode {
    /// Front to back unless the GPU does hidden surface removal.
    #[default]
    Default,
    /// Never sort by distance.
    NoDistanceSort,
}

/// Resolved opaque sort order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpaqueSortFlags {
    FrontToBack,
    NoDistanceSort,
}

/// Output target of a camera.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraTarget {
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    pub dimension: TextureDimension,
    /// MSAA samples of an offscreen target texture. Ignored for the swapchain.
    pub sample_count: u32,
    /// The camera renders into a texture rather than the swapchain.
    pub offscreen: bool,
}

impl Default for CameraTarget {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            format: TextureFormat::Bgra8UnormSrgb,
            dimension: TextureDimension::D2,
            sample_count: 1,
            offscreen: false,
        }
    }
}

/// Camera state provided by scene code each frame.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraSource {
    pub name: String,
    pub kind: CameraKind,
    pub render_type: CameraRenderType,
    pub world_to_view: Mat4,
    pub projection: Mat4,
    /// Sub-pixel projection jitter, in pixels.
    pub jitter: Option<Vec2>,
    pub near: f32,
    pub far: f32,
    pub target: CameraTarget,
    pub viewport: ViewportRect,
    pub clear_depth: bool,
    pub post_processing: bool,
    pub antialiasing: AntialiasingMode,
    pub opaque_sort: OpaqueSortMode,
    pub allow_hdr: bool,
    pub allow_msaa: bool,
    /// Overrides the pipeline's depth texture setting.
    pub requires_depth_texture: Option<bool>,
    /// Overrides the pipeline's opaque texture setting.
    pub requires_opaque_texture: Option<bool>,
    /// A frame capture tool is recording this camera.
    pub frame_capture: bool,
}

impl CameraSource {
    /// Perspective game camera looking down -Z from `eye`.
    pub fn perspective(name: impl Into<String>, eye: Vec3, target: CameraTarget) -> Self {
        let aspect = target.width.max(1) as f32 / target.height.max(1) as f32;
        let near = 0.1;
        let far = 100.0;
        Self {
            name: name.into(),
            kind: CameraKind::Game,
            render_type: CameraRenderType::Base,
            world_to_view: Mat4::look_at_rh(eye, eye - Vec3::Z, Vec3::Y),
            projection: Mat4::perspective_rh(60f32.to_radians(), aspect, near, far),
            jitter: None,
            near,
            far,
            target,
            viewport: ViewportRect::FULL,
            clear_depth: true,
            post_processing: false,
            antialiasing: AntialiasingMode::None,
            opaque_sort: OpaqueSortMode::Default,
            allow_hdr: true,
            allow_msaa: true,
            requires_depth_texture: None,
            requires_opaque_texture: None,
            frame_capture: false,
        }
    }

    /// Same camera as an overlay.
    pub fn into_overlay(mut self) -> Self {
        self.render_type = CameraRenderType::Overlay;
        self.clear_depth = false;
        self
    }
}

/// Where a camera sits in its stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StackPosition {
    /// First camera of the stack.
    pub first: bool,
    /// Last camera of the stack; resolves to the final target.
    pub last: bool,
}

impl StackPosition {
    /// A stack of one camera.
    pub const SINGLE: Self = Self {
        first: true,
        last: true,
    };
}

/// Resolved per-camera configuration for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraFrameConfig {
    pub name: String,
    pub kind: CameraKind,
    pub render_type: CameraRenderType,
    pub world_to_view: Mat4,
    pub projection: Mat4,
    pub jitter: Option<Vec2>,
    pub near: f32,
    pub far: f32,
    pub viewport: ViewportRect,
    /// Target size covered by the viewport, before scaling.
    pub target_width: u32,
    pub target_height: u32,
    pub target_format: TextureFormat,
    pub target_dimension: TextureDimension,
    pub offscreen: bool,
    pub render_scale: f32,
    pub scaling_mode: ImageScalingMode,
    pub upscaling_filter: UpscalingFilter,
    pub sample_count: u32,
    pub hdr: bool,
    /// Format of intermediate color targets.
    pub color_format: TextureFormat,
    pub requested_mode: RenderingMode,
    /// Mode actually used after fallbacks. Equals `requested_mode` until
    /// the orchestrator resolves it.
    pub rendering_mode: RenderingMode,
    pub antialiasing: AntialiasingMode,
    pub opaque_sort: OpaqueSortFlags,
    pub post_processing: bool,
    pub requires_depth_texture: bool,
    pub requires_opaque_texture: bool,
    pub clear_depth: bool,
    pub stack: StackPosition,
    pub frame_capture: bool,
}

impl CameraFrameConfig {
    /// Build the configuration for `source` at `stack` in the current frame.
    ///
    /// Rejects cameras with an empty target or an invalid clip range.
    pub fn initialize(
        source: &CameraSource,
        stack: StackPosition,
        context: &PipelineContext,
    ) -> FrameResult<Self> {
        let settings = context.settings();
        let caps = context.capabilities();

        if source.target.width == 0 || source.target.height == 0 {
            return Err(FrameError::InvalidParameter(format!(
                "camera '{}' has an empty target",
                source.name
            )));
        }
        if !(source.near > 0.0 && source.near < source.far) {
            return Err(FrameError::InvalidParameter(format!(
                "camera '{}' has an invalid clip range {}..{}",
                source.name, source.near, source.far
            )));
        }

        let (target_width, target_height) = source
            .viewport
            .pixel_size(source.target.width, source.target.height);

        let render_scale = match source.kind {
            CameraKind::Game => settings.render_scale,
            _ => 1.0,
        };
        let scaling_mode =
            ImageScalingMode::from_render_scale(render_scale, source.kind, settings.upscaling_filter);

        let sample_count = if source.target.offscreen {
            source.target.sample_count.max(1)
        } else if source.allow_msaa && source.kind != CameraKind::Preview {
            settings.msaa_samples.max(1)
        } else {
            1
        };

        let hdr = settings.hdr && source.allow_hdr;
        let color_format = if hdr {
            TextureFormat::Rg11b10Float
        } else if source.target.format.is_srgb() {
            TextureFormat::Rgba8UnormSrgb
        } else {
            TextureFormat::Rgba8Unorm
        };

        let opaque_sort = match source.opaque_sort {
            OpaqueSortMode::NoDistanceSort => OpaqueSortFlags::NoDistanceSort,
            OpaqueSortMode::Default if caps.hidden_surface_removal => OpaqueSortFlags::NoDistanceSort,
            OpaqueSortMode::Default => OpaqueSortFlags::FrontToBack,
        };

        let preview = source.kind == CameraKind::Preview;
        let requires_depth_texture =
            !preview && source.requires_depth_texture.unwrap_or(settings.requires_depth_texture);
        let requires_opaque_texture =
            !preview && source.requires_opaque_texture.unwrap_or(settings.requires_opaque_texture);

        Ok(Self {
            name: source.name.clone(),
            kind: source.kind,
            render_type: source.render_type,
            world_to_view: source.world_to_view,
            projection: source.projection,
            jitter: source.jitter,
            near: source.near,
            far: source.far,
            viewport: source.viewport,
            target_width,
            target_height,
            target_format: source.target.format,
            target_dimension: source.target.dimension,
            offscreen: source.target.offscreen,
            render_scale,
            scaling_mode,
            upscaling_filter: settings.upscaling_filter,
            sample_count,
            hdr,
            color_format,
            requested_mode: settings.rendering_mode,
            rendering_mode: settings.rendering_mode,
            antialiasing: source.antialiasing,
            opaque_sort,
            post_processing: source.post_processing,
            requires_depth_texture,
            requires_opaque_texture,
            clear_depth: source.clear_depth || source.render_type == CameraRenderType::Base,
            stack,
            frame_capture: source.frame_capture,
        })
    }

    /// Size of intermediate targets after render scale.
    pub fn scaled_size(&self) -> (u32, u32) {
        let width = (self.target_width as f32 * self.render_scale).round() as u32;
        let height = (self.target_height as f32 * self.render_scale).round() as u32;
        (width.max(1), height.max(1))
    }

    /// Returns true for scene view and preview cameras.
    pub fn is_scene_or_preview(&self) -> bool {
        matches!(self.kind, CameraKind::SceneView | CameraKind::Preview)
    }

    /// Returns true for overlay cameras.
    pub fn is_overlay(&self) -> bool {
        self.render_type == CameraRenderType::Overlay
    }

    /// Returns true if this camera writes the final target of its stack.
    pub fn resolves_final_target(&self) -> bool {
        self.stack.last
    }

    /// Returns true if linear output needs an sRGB encode in a shader
    /// because the target does not encode on write.
    pub fn requires_color_space_conversion(&self) -> bool {
        !self.hdr && !self.target_format.is_srgb() && !self.target_format.is_hdr()
    }
}
