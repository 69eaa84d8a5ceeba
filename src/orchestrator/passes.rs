//! Built-in passes inserted by the orchestrator.
//!
//! Each pass records a small, fixed command sequence against the targets
//! the orchestrator allocated for the frame. They go through the same
//! [`RenderPass`] trait as externally authored passes.

use crate::backend::{DrawQueue, RenderTarget};
use crate::error::FrameResult;
use crate::graph::{PassExecuteContext, RenderPass, RenderPassEvent};
use crate::resources::TargetSlot;

/// Renders shadow casters into the main light's shadow map.
#[derive(Debug, Default)]
pub struct MainLightShadowPass;

impl RenderPass for MainLightShadowPass {
    fn name(&self) -> &str {
        "MainLightShadow"
    }

    fn event(&self) -> RenderPassEvent {
        RenderPassEvent::BEFORE_RENDERING_SHADOWS
    }

    fn reads_light_data(&self) -> bool {
        true
    }

    fn execute(&self, ctx: &mut PassExecuteContext<'_>) -> FrameResult<()> {
        ctx.begin_pass(self.name(), self.event(), None, None);
        ctx.draw(DrawQueue::ShadowCasters);
        ctx.end_pass();
        Ok(())
    }
}

/// Where a depth prepass writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrepassTarget {
    /// Sampled depth (and normals) textures, read by later passes.
    DepthTexture,
    /// The camera depth attachment, so opaques can test against it.
    CameraDepth,
}

/// Depth-only or depth-normals prepass.
#[derive(Debug)]
pub struct DepthPrepass {
    pub normals: bool,
    pub target: PrepassTarget,
}

impl RenderPass for DepthPrepass {
    fn name(&self) -> &str {
        if self.normals {
            "DepthNormalsPrepass"
        } else {
            "DepthPrepass"
        }
    }

    fn event(&self) -> RenderPassEvent {
        RenderPassEvent::BEFORE_RENDERING_PRE_PASSES
    }

    fn execute(&self, ctx: &mut PassExecuteContext<'_>) -> FrameResult<()> {
        let depth = match self.target {
            PrepassTarget::DepthTexture => RenderTarget::Texture(ctx.texture(TargetSlot::DepthTexture)?),
            PrepassTarget::CameraDepth => ctx.depth_target(),
        };
        let color = if self.normals {
            Some(RenderTarget::Texture(ctx.texture(TargetSlot::NormalsTexture)?))
        } else {
            None
        };

        ctx.begin_pass(self.name(), self.event(), color, Some(depth));
        ctx.draw(if self.normals {
            DrawQueue::DepthNormals
        } else {
            DrawQueue::DepthOnly
        });
        ctx.end_pass();
        Ok(())
    }
}

/// Copies the camera depth attachment into the sampled depth texture.
#[derive(Debug)]
pub struct CopyDepthPass {
    pub name: &'static str,
    pub event: RenderPassEvent,
}

impl RenderPass for CopyDepthPass {
    fn name(&self) -> &str {
        self.name
    }

    fn event(&self) -> RenderPassEvent {
        self.event
    }

    fn execute(&self, ctx: &mut PassExecuteContext<'_>) -> FrameResult<()> {
        let dst = ctx.texture(TargetSlot::DepthTexture)?;
        let src = ctx.depth_target();
        ctx.copy(src, dst);
        Ok(())
    }
}

/// Fills the G-buffer targets.
#[derive(Debug, Default)]
pub struct GBufferPass;

impl RenderPass for GBufferPass {
    fn name(&self) -> &str {
        "GBuffer"
    }

    fn event(&self) -> RenderPassEvent {
        RenderPassEvent::BEFORE_RENDERING_GBUFFER
    }

    fn execute(&self, ctx: &mut PassExecuteContext<'_>) -> FrameResult<()> {
        let mut colors = Vec::with_capacity(3);
        for slot in [
            TargetSlot::GBufferAlbedo,
            TargetSlot::GBufferNormal,
            TargetSlot::GBufferMaterial,
        ] {
            colors.push(RenderTarget::Texture(ctx.texture(slot)?));
        }
        let depth = ctx.depth_target();
        ctx.begin_multi_target_pass(self.name(), self.event(), colors, Some(depth));
        ctx.draw(DrawQueue::GBuffer);
        ctx.end_pass();
        Ok(())
    }
}

/// Full-screen deferred lighting resolve.
#[derive(Debug, Default)]
pub struct DeferredLightsPass;

impl RenderPass for DeferredLightsPass {
    fn name(&self) -> &str {
        "DeferredLights"
    }

    fn event(&self) -> RenderPassEvent {
        RenderPassEvent::BEFORE_RENDERING_DEFERRED_LIGHTS
    }

    fn reads_light_data(&self) -> bool {
        true
    }

    fn execute(&self, ctx: &mut PassExecuteContext<'_>) -> FrameResult<()> {
        let color = ctx.color_target();
        ctx.begin_pass(self.name(), self.event(), Some(color), None);
        ctx.draw(DrawQueue::DeferredLights);
        ctx.end_pass();
        Ok(())
    }
}

/// Forward-shaded opaque geometry.
///
/// In deferred mode only materials that cannot go through the G-buffer
/// are drawn here.
#[derive(Debug)]
pub struct OpaquePass {
    pub forward_only: bool,
}

impl RenderPass for OpaquePass {
    fn name(&self) -> &str {
        if self.forward_only {
            "ForwardOnlyOpaque"
        } else {
            "DrawOpaqueObjects"
        }
    }

    fn event(&self) -> RenderPassEvent {
        RenderPassEvent::BEFORE_RENDERING_OPAQUES
    }

    fn reads_light_data(&self) -> bool {
        true
    }

    fn execute(&self, ctx: &mut PassExecuteContext<'_>) -> FrameResult<()> {
        let color = ctx.color_target();
        let depth = ctx.depth_target();
        ctx.begin_pass(self.name(), self.event(), Some(color), Some(depth));
        ctx.draw(if self.forward_only {
            DrawQueue::ForwardOnlyOpaque
        } else {
            DrawQueue::Opaque
        });
        ctx.end_pass();
        Ok(())
    }
}

/// Sky background.
#[derive(Debug, Default)]
pub struct SkyboxPass;

impl RenderPass for SkyboxPass {
    fn name(&self) -> &str {
        "DrawSkybox"
    }

    fn event(&self) -> RenderPassEvent {
        RenderPassEvent::BEFORE_RENDERING_SKYBOX
    }

    fn execute(&self, ctx: &mut PassExecuteContext<'_>) -> FrameResult<()> {
        let color = ctx.color_target();
        let depth = ctx.depth_target();
        ctx.begin_pass(self.name(), self.event(), Some(color), Some(depth));
        ctx.draw(DrawQueue::Skybox);
        ctx.end_pass();
        Ok(())
    }
}

/// Copies the color target after opaques and sky.
#[derive(Debug, Default)]
pub struct CopyColorPass;

impl RenderPass for CopyColorPass {
    fn name(&self) -> &str {
        "CopyColor"
    }

    fn event(&self) -> RenderPassEvent {
        RenderPassEvent::AFTER_RENDERING_SKYBOX
    }

    fn execute(&self, ctx: &mut PassExecuteContext<'_>) -> FrameResult<()> {
        let dst = ctx.texture(TargetSlot::OpaqueColor)?;
        let src = ctx.color_target();
        ctx.copy(src, dst);
        Ok(())
    }
}

/// Blended geometry.
#[derive(Debug, Default)]
pub struct TransparentPass;

impl RenderPass for TransparentPass {
    fn name(&self) -> &str {
        "DrawTransparentObjects"
    }

    fn event(&self) -> RenderPassEvent {
        RenderPassEvent::BEFORE_RENDERING_TRANSPARENTS
    }

    fn reads_light_data(&self) -> bool {
        true
    }

    fn execute(&self, ctx: &mut PassExecuteContext<'_>) -> FrameResult<()> {
        let color = ctx.color_target();
        let depth = ctx.depth_target();
        ctx.begin_pass(self.name(), self.event(), Some(color), Some(depth));
        ctx.draw(DrawQueue::Transparent);
        ctx.end_pass();
        Ok(())
    }
}

/// Per-object and camera motion vectors.
#[derive(Debug, Default)]
pub struct MotionVectorPass;

impl RenderPass for MotionVectorPass {
    fn name(&self) -> &str {
        "MotionVectors"
    }

    fn event(&self) -> RenderPassEvent {
        RenderPassEvent::BEFORE_RENDERING_POST_PROCESSING
    }

    fn execute(&self, ctx: &mut PassExecuteContext<'_>) -> FrameResult<()> {
        let motion = ctx.texture(TargetSlot::MotionVectors)?;
        let depth = ctx.depth_target();
        ctx.begin_pass(
            self.name(),
            self.event(),
            Some(RenderTarget::Texture(motion)),
            Some(depth),
        );
        ctx.draw(DrawQueue::MotionVectors);
        ctx.end_pass();
        Ok(())
    }
}

/// Post-processing chain. Reads the back buffer, writes the front buffer,
/// then swaps so the result becomes the new back buffer.
#[derive(Debug, Default)]
pub struct PostProcessPass;

impl RenderPass for PostProcessPass {
    fn name(&self) -> &str {
        "PostProcessing"
    }

    fn event(&self) -> RenderPassEvent {
        RenderPassEvent::BEFORE_RENDERING_POST_PROCESSING
    }

    fn execute(&self, ctx: &mut PassExecuteContext<'_>) -> FrameResult<()> {
        let dst = RenderTarget::Texture(ctx.front_buffer()?);
        ctx.begin_pass(self.name(), self.event(), Some(dst), None);
        ctx.draw(DrawQueue::PostProcess);
        ctx.end_pass();
        ctx.swap_color_buffers();
        Ok(())
    }
}

/// Resolves the intermediate color target to the stack's final target.
#[derive(Debug, Default)]
pub struct FinalCompositePass;

impl RenderPass for FinalCompositePass {
    fn name(&self) -> &str {
        "FinalComposite"
    }

    fn event(&self) -> RenderPassEvent {
        RenderPassEvent::AFTER_RENDERING.offset(1)
    }

    fn execute(&self, ctx: &mut PassExecuteContext<'_>) -> FrameResult<()> {
        let src = ctx.color_target();
        ctx.blit(src, RenderTarget::Backbuffer);
        Ok(())
    }
}

/// Screen-space overlay UI, drawn on the final target after composite.
#[derive(Debug, Default)]
pub struct OverlayUiPass;

impl RenderPass for OverlayUiPass {
    fn name(&self) -> &str {
        "OverlayUI"
    }

    fn event(&self) -> RenderPassEvent {
        RenderPassEvent::AFTER_RENDERING.offset(2)
    }

    fn execute(&self, ctx: &mut PassExecuteContext<'_>) -> FrameResult<()> {
        ctx.begin_pass(self.name(), self.event(), Some(RenderTarget::Backbuffer), None);
        ctx.draw(DrawQueue::Overlay);
        ctx.end_pass();
        Ok(())
    }
}
