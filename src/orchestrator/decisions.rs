//! Per-camera decisions taken before any pass is recorded.
//!
//! All of these are pure functions of the camera, the requirements and the
//! pipeline context. Capability gaps and unsupported modes downgrade
//! silently; nothing here fails.

use crate::camera::{CameraFrameConfig, CameraKind, ImageScalingMode};
use crate::graph::RenderPassEvent;
use crate::requirements::FrameRequirements;
use crate::settings::{CopyDepthMode, DepthPrimingMode, PipelineContext, RenderingMode};
use crate::types::TextureDimension;

/// Debug views that only the forward path can draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DebugViews {
    pub wireframe: bool,
    /// Any full-screen debug visualization.
    pub debug_display: bool,
}

impl DebugViews {
    /// Returns true if any debug view is active.
    pub fn any(self) -> bool {
        self.wireframe || self.debug_display
    }
}

/// Rendering mode actually used for `camera` this frame.
pub fn resolve_rendering_mode(
    requested: RenderingMode,
    camera: &CameraFrameConfig,
    context: &PipelineContext,
    debug: DebugViews,
) -> RenderingMode {
    let clustering = context.capabilities().clustering;
    match requested {
        RenderingMode::Deferred if debug.any() || !clustering || camera.is_overlay() => {
            log::debug!(
                "Camera '{}': deferred unavailable (debug: {}, clustering: {}, overlay: {}), using forward",
                camera.name,
                debug.any(),
                clustering,
                camera.is_overlay()
            );
            RenderingMode::Forward
        }
        RenderingMode::ForwardPlus if !clustering => {
            log::warn!("Camera '{}': clustering unsupported, Forward+ falls back to forward", camera.name);
            RenderingMode::Forward
        }
        mode => mode,
    }
}

/// Returns true if `camera` must render into an intermediate color target.
///
/// `color_copy` is true when an opaque color copy is needed this frame.
pub fn requires_intermediate_target(camera: &CameraFrameConfig, context: &PipelineContext, color_copy: bool) -> bool {
    if camera.stack.first && !camera.resolves_final_target() {
        return true;
    }
    if camera.rendering_mode == RenderingMode::Deferred {
        return true;
    }

    let caps = context.capabilities();
    let explicit_resolve = camera.sample_count > 1 && caps.explicit_msaa_resolve;
    let offscreen_blit = camera.post_processing || color_copy || explicit_resolve;

    if camera.offscreen {
        let compatible_format = camera.color_format == camera.target_format;
        return offscreen_blit || !compatible_format;
    }

    offscreen_blit
        || !camera.viewport.is_full()
        || camera.is_scene_or_preview()
        || camera.scaling_mode != ImageScalingMode::None
        || camera.hdr
        || caps.hdr_output_active
        || camera.target_dimension != TextureDimension::D2
        || camera.frame_capture
        || camera.requires_color_space_conversion()
}

/// Returns true if a depth priming prepass runs for `camera`.
pub fn depth_priming_enabled(camera: &CameraFrameConfig, context: &PipelineContext) -> bool {
    let caps = context.capabilities();
    if !caps.can_copy_depth(camera.sample_count) {
        return false;
    }
    let requested = match context.settings().depth_priming {
        DepthPrimingMode::Disabled => false,
        DepthPrimingMode::Auto => caps.depth_priming_recommended,
        DepthPrimingMode::Forced => true,
    };
    requested
        && camera.rendering_mode.is_forward()
        && (camera.stack.first || camera.clear_depth)
        && camera.kind != CameraKind::Reflection
}

/// Event at which main opaque shading starts for `mode`.
///
/// Depth needed at or before it can only come from a prepass.
pub fn main_rendering_event(mode: RenderingMode) -> RenderPassEvent {
    match mode {
        RenderingMode::Deferred => RenderPassEvent::BEFORE_RENDERING_GBUFFER,
        _ => RenderPassEvent::BEFORE_RENDERING_OPAQUES,
    }
}

/// Event at which the depth attachment is copied into the depth texture.
///
/// Moves ahead of the earliest depth reader when that reader comes before
/// the configured point, but never ahead of `main_event`. A copy at
/// `main_event` is enqueued after the main pass.
pub fn copy_depth_event(
    mode: CopyDepthMode,
    requirements: &FrameRequirements,
    main_event: RenderPassEvent,
) -> RenderPassEvent {
    let configured = match mode {
        CopyDepthMode::AfterTransparents
            if requirements
                .depth_event
                .map_or(true, |event| event >= RenderPassEvent::AFTER_RENDERING_TRANSPARENTS) =>
        {
            RenderPassEvent::AFTER_RENDERING_TRANSPARENTS
        }
        _ => RenderPassEvent::AFTER_RENDERING_SKYBOX,
    };
    ahead_of_reader(configured, main_event, requirements.depth_event)
}

/// Event of the depth copy that follows the G-buffer fill.
pub fn gbuffer_copy_depth_event(requirements: &FrameRequirements) -> RenderPassEvent {
    ahead_of_reader(
        RenderPassEvent::AFTER_RENDERING_GBUFFER,
        RenderPassEvent::BEFORE_RENDERING_GBUFFER,
        requirements.depth_event,
    )
}

// User passes sort before built-ins at equal events, so the copy must sit
// strictly below the reader's event.
fn ahead_of_reader(
    configured: RenderPassEvent,
    floor: RenderPassEvent,
    reader: Option<RenderPassEvent>,
) -> RenderPassEvent {
    match reader {
        Some(event) if event <= configured => event.offset(-1).max(floor),
        _ => configured,
    }
}
