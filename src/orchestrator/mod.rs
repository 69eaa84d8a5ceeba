//! Per-camera frame orchestration.
//!
//! [`FrameOrchestrator`] drives one camera at a time through two steps:
//!
//! ```text
//! setup(camera, lights)                       execute()
//! ─────────────────────                       ─────────
//! resolve rendering mode                      for pass in sorted chain:
//! pre-setup light data (starts clustering)        join clustering before the
//! analyze user pass requirements                  first pass reading lights
//! intermediate target + depth priming             record pass
//! (re)allocate targets, bind globals          join clustering if still pending
//! insert built-in passes, stable sort
//! ```
//!
//! Cameras of a stack are processed sequentially; overlays inherit the
//! base camera's targets. [`FrameOrchestrator::end_frame`] purges the
//! transient pool once all cameras are done.

mod decisions;
mod passes;

pub use decisions::{
    copy_depth_event, depth_priming_enabled, gbuffer_copy_depth_event, main_rendering_event,
    requires_intermediate_target, resolve_rendering_mode, DebugViews,
};
pub use passes::{
    CopyColorPass, CopyDepthPass, DeferredLightsPass, DepthPrepass, FinalCompositePass, GBufferPass,
    MainLightShadowPass, MotionVectorPass, OpaquePass, OverlayUiPass, PostProcessPass, PrepassTarget,
    SkyboxPass, TransparentPass,
};

use crate::backend::Backend;
use crate::camera::{AntialiasingMode, CameraFrameConfig, CameraRenderType, CameraSource, StackPosition};
use crate::error::{FrameError, FrameResult};
use crate::globals::{GlobalTexture, ShaderGlobals, ShaderKeywords};
use crate::graph::{CompiledQueue, PassExecuteContext, PassHandle, PassQueue, RenderPass, RenderPassEvent};
use crate::lighting::{LightDataPreparer, LightingInputs};
use crate::requirements::{AnalyzeOptions, FrameRequirements, RequirementAnalyzer};
use crate::resources::{FrameResourceSet, ResourceAllocator, TargetSlot};
use crate::settings::{CopyDepthMode, PipelineContext, RenderingMode};
use crate::types::{TextureDescriptor, TextureFormat, TextureUsage};

/// Decisions taken for one camera, in a form tests and tools can inspect.
#[derive(Debug, Clone, PartialEq)]
pub struct FramePlan {
    pub camera: String,
    pub requested_mode: RenderingMode,
    /// Mode used for pass sequencing after fallbacks.
    pub rendering_mode: RenderingMode,
    /// The intermediate color target rule fired (or was inherited).
    pub intermediate_target: bool,
    /// Color and depth targets are allocated by this camera.
    pub create_color_texture: bool,
    pub create_depth_texture: bool,
    pub depth_priming: bool,
    pub requirements: FrameRequirements,
    pub prepass: bool,
    /// Event of the depth copy after opaques, if one runs.
    pub copy_depth_event: Option<RenderPassEvent>,
    /// Pass names in execution order.
    pub passes: Vec<String>,
}

impl FramePlan {
    /// Execution index of the first pass named `name`.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.passes.iter().position(|pass| pass == name)
    }

    /// Returns true if a pass named `name` runs.
    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }
}

/// A camera between `setup` and `execute`.
struct ActiveCamera {
    config: CameraFrameConfig,
    queue: PassQueue,
    compiled: CompiledQueue,
    intermediate: bool,
}

/// Top-level per-frame driver.
pub struct FrameOrchestrator<B: Backend> {
    backend: B,
    context: PipelineContext,
    allocator: ResourceAllocator,
    globals: ShaderGlobals,
    lights: LightDataPreparer,
    user_passes: PassQueue,
    debug: DebugViews,
    /// Intermediate decision of the stack's base camera.
    stack_intermediate: bool,
    active: Option<ActiveCamera>,
    last_plan: Option<FramePlan>,
    shut_down: bool,
}

impl<B: Backend> FrameOrchestrator<B> {
    /// Create an orchestrator rendering through `backend`.
    ///
    /// The light packing strategy and cluster tables are fixed here from
    /// the context's capabilities.
    pub fn new(backend: B, context: PipelineContext) -> Self {
        let lights = LightDataPreparer::new(&context);
        log::info!(
            "FrameOrchestrator: backend '{}', light budget {}, {:?} packing, clustering {}",
            backend.name(),
            lights.budget(),
            lights.packing_kind(),
            if lights.clustering().is_some() { "on" } else { "off" }
        );
        Self {
            backend,
            context,
            allocator: ResourceAllocator::new(),
            globals: ShaderGlobals::new(),
            lights,
            user_passes: PassQueue::new(),
            debug: DebugViews::default(),
            stack_intermediate: false,
            active: None,
            last_plan: None,
            shut_down: false,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn context(&self) -> &PipelineContext {
        &self.context
    }

    /// Mutable context, for per-frame display flags and settings changes.
    pub fn context_mut(&mut self) -> &mut PipelineContext {
        &mut self.context
    }

    /// GPU-global bindings.
    pub fn globals(&self) -> &ShaderGlobals {
        &self.globals
    }

    /// Targets currently bound.
    pub fn resources(&self) -> FrameResourceSet {
        self.allocator.frame_resources()
    }

    pub fn allocator(&self) -> &ResourceAllocator {
        &self.allocator
    }

    pub fn lights(&self) -> &LightDataPreparer {
        &self.lights
    }

    /// Plan of the most recent `setup`.
    pub fn last_plan(&self) -> Option<&FramePlan> {
        self.last_plan.as_ref()
    }

    /// Set the active debug views. Deferred falls back to forward while any is on.
    pub fn set_debug_views(&mut self, debug: DebugViews) {
        self.debug = debug;
    }

    /// Register a pass for the next camera rendered.
    pub fn enqueue_pass(&mut self, pass: Box<dyn RenderPass>) -> PassHandle {
        self.user_passes.enqueue(pass)
    }

    /// Decide everything for `camera` and build its pass chain.
    ///
    /// Passes registered with [`enqueue_pass`](Self::enqueue_pass) are
    /// consumed by this camera.
    pub fn setup(&mut self, mut camera: CameraFrameConfig, inputs: &LightingInputs) -> FrameResult<FramePlan> {
        if let Some(stale) = self.active.take() {
            log::warn!("Camera '{}' was set up but never executed", stale.config.name);
        }
        self.globals.begin_light_data();

        let mode = resolve_rendering_mode(camera.requested_mode, &camera, &self.context, self.debug);
        camera.rendering_mode = mode;
        let deferred = mode == RenderingMode::Deferred;
        if deferred && camera.sample_count > 1 {
            log::debug!("Camera '{}': MSAA disabled for deferred", camera.name);
            camera.sample_count = 1;
        }

        // Light data first so clustering overlaps the rest of setup.
        self.lights.pre_setup(&self.context, &camera, inputs)?;

        let main_event = main_rendering_event(mode);
        let mut requirements = RequirementAnalyzer::analyze(
            self.user_passes.iter(),
            AnalyzeOptions {
                main_rendering_event: main_event,
                temporal_antialiasing: camera.antialiasing == AntialiasingMode::Temporal,
            },
        );
        requirements.depth |= camera.requires_depth_texture;
        requirements.color_copy |= camera.requires_opaque_texture;

        let overlay = camera.is_overlay();
        let intermediate_required = if overlay {
            self.stack_intermediate
        } else {
            requires_intermediate_target(&camera, &self.context, requirements.color_copy)
        };
        let depth_priming = !overlay && depth_priming_enabled(&camera, &self.context);
        let intermediate = intermediate_required || depth_priming;
        if camera.stack.first {
            self.stack_intermediate = intermediate;
        }
        let create_color_texture = !overlay && intermediate;
        let create_depth_texture = create_color_texture;

        let caps = self.context.capabilities();
        let settings = self.context.settings();
        let copy_mode = settings.copy_depth_mode;
        let gbuffer_copy = deferred && !caps.gbuffer_depth_fetch;
        let prepass = depth_priming
            || requirements.prepass
            || (requirements.depth
                && (!caps.can_copy_depth(camera.sample_count) || copy_mode == CopyDepthMode::ForcePrepass));
        let copy_depth = (requirements.depth && !prepass && !gbuffer_copy)
            .then(|| copy_depth_event(copy_mode, &requirements, main_event));
        let shadows = settings.main_light_shadows && self.lights.prepared_main_light().is_some();

        self.allocate_targets(
            &camera,
            &requirements,
            create_color_texture,
            requirements.depth || depth_priming || gbuffer_copy,
        )?;
        self.globals.set_keyword(ShaderKeywords::DEPTH_PRIMING, depth_priming);
        self.globals.set_keyword(ShaderKeywords::DEFERRED, deferred);

        let mut queue = PassQueue::new();
        queue.append(&mut self.user_passes);
        if shadows {
            queue.enqueue(Box::new(MainLightShadowPass));
        }
        if prepass {
            queue.enqueue(Box::new(DepthPrepass {
                normals: requirements.normals,
                target: if depth_priming {
                    PrepassTarget::CameraDepth
                } else {
                    PrepassTarget::DepthTexture
                },
            }));
        }
        if depth_priming {
            queue.enqueue(Box::new(CopyDepthPass {
                name: "CopyPrimedDepth",
                event: RenderPassEvent::AFTER_RENDERING_PRE_PASSES,
            }));
        }
        if deferred {
            queue.enqueue(Box::new(GBufferPass));
            if gbuffer_copy {
                queue.enqueue(Box::new(CopyDepthPass {
                    name: "GBufferCopyDepth",
                    event: gbuffer_copy_depth_event(&requirements),
                }));
            }
            queue.enqueue(Box::new(DeferredLightsPass));
        }
        queue.enqueue(Box::new(OpaquePass { forward_only: deferred }));
        queue.enqueue(Box::new(SkyboxPass));
        if let Some(event) = copy_depth {
            queue.enqueue(Box::new(CopyDepthPass {
                name: "CopyDepth",
                event,
            }));
        }
        if requirements.color_copy {
            queue.enqueue(Box::new(CopyColorPass));
        }
        queue.enqueue(Box::new(TransparentPass));
        if requirements.motion {
            queue.enqueue(Box::new(MotionVectorPass));
        }
        if camera.post_processing && intermediate {
            queue.enqueue(Box::new(PostProcessPass));
        }
        if camera.resolves_final_target() {
            if intermediate {
                queue.enqueue(Box::new(FinalCompositePass));
            }
            queue.enqueue(Box::new(OverlayUiPass));
        }

        let compiled = queue.compile();
        let passes: Vec<String> = compiled
            .pass_order()
            .iter()
            .filter_map(|&handle| queue.get(handle))
            .map(|pass| pass.name().to_string())
            .collect();

        let plan = FramePlan {
            camera: camera.name.clone(),
            requested_mode: camera.requested_mode,
            rendering_mode: mode,
            intermediate_target: intermediate_required,
            create_color_texture,
            create_depth_texture,
            depth_priming,
            requirements,
            prepass,
            copy_depth_event: copy_depth,
            passes,
        };
        log::debug!(
            "Camera '{}': {:?} (requested {:?}), intermediate {}, priming {}, {} passes",
            plan.camera,
            plan.rendering_mode,
            plan.requested_mode,
            intermediate,
            depth_priming,
            plan.passes.len()
        );

        self.active = Some(ActiveCamera {
            config: camera,
            queue,
            compiled,
            intermediate,
        });
        self.last_plan = Some(plan.clone());
        Ok(plan)
    }

    /// Record the pass chain built by the last `setup`.
    pub fn execute(&mut self) -> FrameResult<()> {
        let Some(active) = self.active.take() else {
            return Err(FrameError::InvalidParameter(
                "execute called without a camera set up".to_string(),
            ));
        };
        let frame = self.context.frame_index();

        for &handle in active.compiled.pass_order() {
            let Some(pass) = active.queue.get(handle) else {
                continue;
            };
            if pass.reads_light_data() && !self.globals.light_data_ready() {
                self.lights.setup(&self.context, &mut self.globals)?;
            }
            log::trace!("Executing pass '{}' at {:?}", pass.name(), pass.event());
            let mut ctx = PassExecuteContext::new(
                &mut self.backend,
                &mut self.allocator,
                &mut self.globals,
                &active.config,
                frame,
                active.intermediate,
            );
            pass.execute(&mut ctx)?;
        }

        // No pass read light data; the job still has to be joined.
        if self.lights.has_prepared() {
            self.lights.setup(&self.context, &mut self.globals)?;
        }
        Ok(())
    }

    /// Render a single camera that resolves to the final target.
    pub fn render_camera(&mut self, source: &CameraSource, inputs: &LightingInputs) -> FrameResult<FramePlan> {
        let camera = CameraFrameConfig::initialize(source, StackPosition::SINGLE, &self.context)?;
        let plan = self.setup(camera, inputs)?;
        self.execute()?;
        Ok(plan)
    }

    /// Render a base camera followed by its overlays.
    ///
    /// Only the last camera resolves to the final target. Passes enqueued
    /// before the call go to the base camera.
    pub fn render_stack(
        &mut self,
        base: &CameraSource,
        overlays: &[CameraSource],
        inputs: &LightingInputs,
    ) -> FrameResult<Vec<FramePlan>> {
        if base.render_type != CameraRenderType::Base {
            return Err(FrameError::InvalidParameter(format!(
                "stack base '{}' is an overlay camera",
                base.name
            )));
        }
        if let Some(camera) = overlays.iter().find(|c| c.render_type != CameraRenderType::Overlay) {
            return Err(FrameError::InvalidParameter(format!(
                "camera '{}' in the overlay list is not an overlay",
                camera.name
            )));
        }

        let count = overlays.len() + 1;
        let mut plans = Vec::with_capacity(count);
        for (index, source) in std::iter::once(base).chain(overlays).enumerate() {
            let stack = StackPosition {
                first: index == 0,
                last: index + 1 == count,
            };
            let camera = CameraFrameConfig::initialize(source, stack, &self.context)?;
            plans.push(self.setup(camera, inputs)?);
            self.execute()?;
        }
        Ok(plans)
    }

    /// Finish the frame: purge stale pooled targets and advance the frame counter.
    pub fn end_frame(&mut self) {
        if !self.user_passes.is_empty() {
            log::warn!("{} enqueued passes were never rendered", self.user_passes.len());
            self.user_passes.clear();
        }
        let frame = self.context.frame_index();
        let stale = self.context.settings().transient_stale_frames;
        let purged = self.allocator.purge(&mut self.backend, frame, stale);
        if purged > 0 {
            log::debug!("Frame {}: purged {} transient textures", frame, purged);
        }
        self.stack_intermediate = false;
        self.context.advance_frame();
    }

    /// Join pending clustering work and destroy every target.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.active = None;
        self.lights.shutdown();
        self.allocator.destroy_all(&mut self.backend);
        self.shut_down = true;
        log::info!("FrameOrchestrator shut down");
    }

    fn allocate_targets(
        &mut self,
        camera: &CameraFrameConfig,
        requirements: &FrameRequirements,
        create_targets: bool,
        depth_texture: bool,
    ) -> FrameResult<()> {
        let frame = self.context.frame_index();
        let (width, height) = camera.scaled_size();
        let deferred = camera.rendering_mode == RenderingMode::Deferred;
        let sampled = TextureUsage::RENDER_ATTACHMENT | TextureUsage::TEXTURE_BINDING;

        // Overlays draw into whatever the base camera left bound.
        if !camera.is_overlay() {
            if create_targets {
                let color = TextureDescriptor::new_2d(width, height, camera.color_format, sampled | TextureUsage::COPY_SRC)
                    .with_sample_count(camera.sample_count);
                self.allocator.configure_color(&color, frame);
                self.allocator.back_color_buffer(&mut self.backend)?;

                let depth = TextureDescriptor::new_2d(
                    width,
                    height,
                    TextureFormat::Depth32Float,
                    sampled | TextureUsage::COPY_SRC,
                )
                .with_label("camera_depth")
                .with_sample_count(camera.sample_count);
                self.allocator
                    .reallocate_if_needed(&mut self.backend, TargetSlot::CameraDepth, &depth, frame)?;
            } else {
                self.allocator.release_color(frame);
                self.allocator.release(TargetSlot::CameraDepth, frame);
            }
        }

        let aux = [
            (
                TargetSlot::DepthTexture,
                depth_texture,
                TextureFormat::Depth32Float,
                sampled | TextureUsage::COPY_DST,
                "camera_depth_texture",
            ),
            (
                TargetSlot::NormalsTexture,
                requirements.normals,
                TextureFormat::Rgba16Float,
                sampled,
                "camera_normals",
            ),
            (
                TargetSlot::OpaqueColor,
                requirements.color_copy,
                camera.color_format,
                sampled | TextureUsage::COPY_DST,
                "camera_opaque",
            ),
            (
                TargetSlot::MotionVectors,
                requirements.motion,
                TextureFormat::Rg16Float,
                sampled,
                "motion_vectors",
            ),
            (TargetSlot::GBufferAlbedo, deferred, TextureFormat::Rgba8UnormSrgb, sampled, "gbuffer_albedo"),
            (TargetSlot::GBufferNormal, deferred, TextureFormat::Rgb10a2Unorm, sampled, "gbuffer_normal"),
            (TargetSlot::GBufferMaterial, deferred, TextureFormat::Rgba8Unorm, sampled, "gbuffer_material"),
        ];
        for (slot, needed, format, usage, label) in aux {
            if needed {
                let descriptor = TextureDescriptor::new_2d(width, height, format, usage).with_label(label);
                self.allocator
                    .reallocate_if_needed(&mut self.backend, slot, &descriptor, frame)?;
            } else {
                self.allocator.release(slot, frame);
            }
        }

        let resources = self.allocator.frame_resources();
        for (name, handle) in [
            (GlobalTexture::CameraColor, resources.color_back),
            (GlobalTexture::CameraDepth, resources.depth_texture),
            (GlobalTexture::CameraNormals, resources.normals_texture),
            (GlobalTexture::CameraOpaque, resources.opaque_color),
            (GlobalTexture::MotionVectors, resources.motion_vectors),
        ] {
            match handle {
                Some(handle) => self.globals.set_texture(name, handle),
                None => self.globals.clear_texture(name),
            }
        }
        Ok(())
    }
}

impl<B: Backend> Drop for FrameOrchestrator<B> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl<B: Backend> std::fmt::Debug for FrameOrchestrator<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameOrchestrator")
            .field("backend", &self.backend.name())
            .field("frame", &self.context.frame_index())
            .field("last_plan", &self.last_plan)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DummyBackend;
    use crate::settings::{PipelineSettings, PlatformCapabilities};
    use glam::Vec3;

    fn orchestrator(settings: PipelineSettings) -> FrameOrchestrator<DummyBackend> {
        let context = PipelineContext::new(settings, PlatformCapabilities::desktop());
        FrameOrchestrator::new(DummyBackend::new(), context)
    }

    fn ldr() -> PipelineSettings {
        PipelineSettings {
            hdr: false,
            main_light_shadows: false,
            ..Default::default()
        }
    }

    fn camera() -> CameraSource {
        CameraSource::perspective("main", Vec3::ZERO, Default::default())
    }

    #[test]
    fn test_direct_forward_chain() {
        let mut orch = orchestrator(ldr());
        let plan = orch.render_camera(&camera(), &LightingInputs::default()).unwrap();
        assert!(!plan.create_color_texture);
        assert_eq!(
            plan.passes,
            vec!["DrawOpaqueObjects", "DrawSkybox", "DrawTransparentObjects", "OverlayUI"]
        );
        assert_eq!(orch.backend().allocation_count(), 0);
        assert!(orch.globals().light_data_ready());
    }

    #[test]
    fn test_execute_without_setup_fails() {
        let mut orch = orchestrator(ldr());
        assert!(orch.execute().is_err());
    }

    #[test]
    fn test_repeat_frames_reuse_targets() {
        let mut orch = orchestrator(PipelineSettings::default());
        let mut source = camera();
        source.post_processing = true;

        orch.render_camera(&source, &LightingInputs::default()).unwrap();
        orch.end_frame();
        let allocations = orch.backend().allocation_count();
        orch.render_camera(&source, &LightingInputs::default()).unwrap();
        orch.end_frame();
        assert_eq!(orch.backend().allocation_count(), allocations);
    }

    #[test]
    fn test_shutdown_destroys_targets() {
        let mut orch = orchestrator(PipelineSettings::default());
        orch.render_camera(&camera(), &LightingInputs::default()).unwrap();
        assert!(orch.backend().live_texture_count() > 0);
        orch.shutdown();
        assert_eq!(orch.backend().live_texture_count(), 0);
    }
}
