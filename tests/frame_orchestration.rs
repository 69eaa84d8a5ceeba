//! Frame orchestration tests against the dummy backend.
//!
//! # Test Categories
//!
//! - **Camera decisions**: scaling mode, intermediate targets, depth priming
//! - **Requirements**: aggregated pass needs and prepass insertion
//! - **Sequencing**: built-in pass order, stable ordering, deferred path
//! - **Resources**: color buffer swaps, reuse and purge
//! - **Light data ordering**: clustering join before the first light read

mod common;

use rstest::rstest;

use common::{camera, crowded_scene, inputs, orchestrator, plain_settings, probe_log, records, ProbePass};
use redlilium_frame::camera::AntialiasingMode;
use redlilium_frame::settings::{
    CopyDepthMode, DepthPrimingMode, PlatformCapabilities, UpscalingFilter, ZBinRemap,
};
use redlilium_frame::types::{TextureDescriptor, TextureFormat, TextureUsage, ViewportRect};
use redlilium_frame::backend::RenderTarget;
use redlilium_frame::{
    AnalyzeOptions, Backend, BackendCommand, CameraFrameConfig, CameraKind, DummyBackend, FrameOrchestrator, GlobalTexture,
    ImageScalingMode, LightingInputs, PassInput, PipelineContext, PipelineSettings, RenderPass, RenderPassEvent,
    RenderingMode, RequirementAnalyzer, ResourceAllocator, ShaderKeywords, StackPosition,
};

// ============================================================================
// Camera decisions
// ============================================================================

#[rstest]
#[case::downscale(1.5, CameraKind::Game, UpscalingFilter::Auto, ImageScalingMode::Downscale)]
#[case::downscale_preview(1.5, CameraKind::Preview, UpscalingFilter::Auto, ImageScalingMode::Downscale)]
#[case::upscale(0.5, CameraKind::Game, UpscalingFilter::Linear, ImageScalingMode::Upscale)]
#[case::upscale_scene_view(0.75, CameraKind::SceneView, UpscalingFilter::Auto, ImageScalingMode::Upscale)]
#[case::reflection_stays_native(0.5, CameraKind::Reflection, UpscalingFilter::Auto, ImageScalingMode::None)]
#[case::native(1.0, CameraKind::Game, UpscalingFilter::Auto, ImageScalingMode::None)]
#[case::forced_by_filter(1.0, CameraKind::Game, UpscalingFilter::Temporal, ImageScalingMode::Upscale)]
#[case::preview_ignores_filter(1.0, CameraKind::Preview, UpscalingFilter::Temporal, ImageScalingMode::None)]
fn test_scaling_mode(
    #[case] scale: f32,
    #[case] kind: CameraKind,
    #[case] filter: UpscalingFilter,
    #[case] expected: ImageScalingMode,
) {
    assert_eq!(ImageScalingMode::from_render_scale(scale, kind, filter), expected);
}

#[test]
fn test_forced_priming_without_depth_copy_is_disabled() {
    let settings = PipelineSettings {
        depth_priming: DepthPrimingMode::Forced,
        ..plain_settings()
    };
    let mut caps = PlatformCapabilities::desktop();
    caps.texture_copy = false;
    caps.depth_target = false;
    let mut orch = orchestrator(settings, caps);

    let plan = orch.render_camera(&camera("main"), &LightingInputs::default()).unwrap();
    assert!(!plan.depth_priming);
    assert!(!orch.globals().keywords().contains(ShaderKeywords::DEPTH_PRIMING));
}

#[test]
fn test_forced_priming_sequence() {
    let settings = PipelineSettings {
        depth_priming: DepthPrimingMode::Forced,
        ..plain_settings()
    };
    let mut orch = orchestrator(settings, PlatformCapabilities::desktop());

    let plan = orch.render_camera(&camera("main"), &LightingInputs::default()).unwrap();
    assert!(plan.depth_priming);
    assert!(plan.create_color_texture && plan.create_depth_texture);
    assert_eq!(
        plan.passes,
        vec![
            "DepthPrepass",
            "CopyPrimedDepth",
            "DrawOpaqueObjects",
            "DrawSkybox",
            "DrawTransparentObjects",
            "FinalComposite",
            "OverlayUI",
        ]
    );
    assert!(orch.globals().keywords().contains(ShaderKeywords::DEPTH_PRIMING));
    assert!(orch.globals().texture(GlobalTexture::CameraDepth).is_some());
}

#[test]
fn test_offscreen_camera_rule() {
    let mut orch = orchestrator(plain_settings(), PlatformCapabilities::desktop());
    let mut source = camera("capture");
    source.target.format = TextureFormat::Rgba8UnormSrgb;
    source.target.offscreen = true;
    source.viewport = ViewportRect::new(0.0, 0.0, 0.5, 0.5);

    let plan = orch.render_camera(&source, &LightingInputs::default()).unwrap();
    assert!(!plan.intermediate_target);

    source.target.offscreen = false;
    let plan = orch.render_camera(&source, &LightingInputs::default()).unwrap();
    assert!(plan.intermediate_target);
}

// ============================================================================
// Requirements
// ============================================================================

#[rstest]
#[case::taa_only(true, PassInput::empty(), true)]
#[case::motion_pass(false, PassInput::MOTION, true)]
#[case::motion_and_normals(false, PassInput::MOTION | PassInput::NORMAL, true)]
#[case::normals_only(false, PassInput::NORMAL, false)]
fn test_motion_implies_depth(#[case] taa: bool, #[case] input: PassInput, #[case] motion: bool) {
    let log = probe_log();
    let pass = ProbePass::new("needs", RenderPassEvent::AFTER_RENDERING_TRANSPARENTS, &log).with_input(input);
    let options = AnalyzeOptions {
        temporal_antialiasing: taa,
        ..Default::default()
    };
    let requirements = RequirementAnalyzer::analyze([&pass as &dyn RenderPass], options);
    assert_eq!(requirements.motion, motion);
    assert!(requirements.depth);
}

#[test]
fn test_normals_only_request_renders() {
    let mut orch = orchestrator(plain_settings(), PlatformCapabilities::desktop());
    let log = probe_log();
    orch.enqueue_pass(Box::new(
        ProbePass::new("NormalsReader", RenderPassEvent::AFTER_RENDERING_OPAQUES, &log)
            .with_input(PassInput::NORMAL),
    ));

    let plan = orch.render_camera(&camera("main"), &LightingInputs::default()).unwrap();
    assert!(plan.prepass);
    assert!(plan.position("DepthNormalsPrepass") < plan.position("NormalsReader"));
    assert!(!plan.contains("CopyDepth"));
    let resources = orch.resources();
    assert!(resources.depth_texture.is_some());
    assert!(resources.normals_texture.is_some());
    assert_eq!(records(&log).len(), 1);
}

#[test]
fn test_temporal_aa_adds_motion_vectors() {
    let mut orch = orchestrator(plain_settings(), PlatformCapabilities::desktop());
    let mut source = camera("main");
    source.antialiasing = AntialiasingMode::Temporal;

    let plan = orch.render_camera(&source, &LightingInputs::default()).unwrap();
    assert!(plan.requirements.motion && plan.requirements.depth);
    assert!(plan.contains("MotionVectors"));
    assert!(orch.globals().texture(GlobalTexture::MotionVectors).is_some());
}

#[rstest]
#[case::after_opaques(
    CopyDepthMode::AfterOpaques,
    RenderPassEvent::AFTER_RENDERING_TRANSPARENTS,
    RenderPassEvent::AFTER_RENDERING_SKYBOX
)]
#[case::after_transparents(
    CopyDepthMode::AfterTransparents,
    RenderPassEvent::AFTER_RENDERING_TRANSPARENTS,
    RenderPassEvent::AFTER_RENDERING_TRANSPARENTS.offset(-1)
)]
#[case::reader_on_copy_event(
    CopyDepthMode::AfterOpaques,
    RenderPassEvent::AFTER_RENDERING_SKYBOX,
    RenderPassEvent::AFTER_RENDERING_SKYBOX.offset(-1)
)]
#[case::reader_after_opaques(
    CopyDepthMode::AfterOpaques,
    RenderPassEvent::AFTER_RENDERING_OPAQUES,
    RenderPassEvent::AFTER_RENDERING_OPAQUES.offset(-1)
)]
#[case::reader_right_after_opaque_pass(
    CopyDepthMode::AfterOpaques,
    RenderPassEvent::BEFORE_RENDERING_OPAQUES.offset(1),
    RenderPassEvent::BEFORE_RENDERING_OPAQUES
)]
fn test_copy_depth_precedes_reader(
    #[case] mode: CopyDepthMode,
    #[case] reader: RenderPassEvent,
    #[case] expected: RenderPassEvent,
) {
    let settings = PipelineSettings {
        copy_depth_mode: mode,
        ..plain_settings()
    };
    let mut orch = orchestrator(settings, PlatformCapabilities::desktop());
    let log = probe_log();
    orch.enqueue_pass(Box::new(
        ProbePass::new("DepthReader", reader, &log).with_input(PassInput::DEPTH),
    ));

    let plan = orch.render_camera(&camera("main"), &LightingInputs::default()).unwrap();
    assert!(!plan.prepass);
    assert_eq!(plan.copy_depth_event, Some(expected));
    assert!(plan.position("DrawOpaqueObjects") < plan.position("CopyDepth"));
    assert!(plan.position("CopyDepth") < plan.position("DepthReader"));
    assert_eq!(records(&log).len(), 1);
}

#[test]
fn test_early_depth_need_inserts_prepass() {
    let mut orch = orchestrator(plain_settings(), PlatformCapabilities::desktop());
    let log = probe_log();
    orch.enqueue_pass(Box::new(
        ProbePass::new("EarlyDepth", RenderPassEvent::BEFORE_RENDERING_OPAQUES, &log)
            .with_input(PassInput::DEPTH | PassInput::NORMAL),
    ));

    let plan = orch.render_camera(&camera("main"), &LightingInputs::default()).unwrap();
    assert!(plan.prepass);
    assert!(plan.contains("DepthNormalsPrepass"));
    assert!(!plan.contains("CopyDepth"));
    assert!(orch.globals().texture(GlobalTexture::CameraNormals).is_some());
}

// ============================================================================
// Sequencing
// ============================================================================

#[test]
fn test_equal_events_keep_registration_order() {
    let mut orch = orchestrator(plain_settings(), PlatformCapabilities::desktop());
    let log = probe_log();
    for name in ["First", "Second", "Third"] {
        orch.enqueue_pass(Box::new(ProbePass::new(
            name,
            RenderPassEvent::BEFORE_RENDERING_OPAQUES,
            &log,
        )));
    }

    let plan = orch.render_camera(&camera("main"), &LightingInputs::default()).unwrap();
    assert_eq!(&plan.passes[..4], &["First", "Second", "Third", "DrawOpaqueObjects"]);
    let executed: Vec<String> = records(&log).into_iter().map(|r| r.name).collect();
    assert_eq!(executed, vec!["First", "Second", "Third"]);
}

#[test]
fn test_deferred_sequence() {
    let settings = PipelineSettings {
        rendering_mode: RenderingMode::Deferred,
        ..plain_settings()
    };
    let mut orch = orchestrator(settings, PlatformCapabilities::desktop());

    let plan = orch.render_camera(&camera("main"), &LightingInputs::default()).unwrap();
    assert_eq!(plan.rendering_mode, RenderingMode::Deferred);
    assert!(plan.intermediate_target);
    assert_eq!(
        plan.passes,
        vec![
            "GBuffer",
            "GBufferCopyDepth",
            "DeferredLights",
            "ForwardOnlyOpaque",
            "DrawSkybox",
            "DrawTransparentObjects",
            "FinalComposite",
            "OverlayUI",
        ]
    );
    assert!(orch.globals().keywords().contains(ShaderKeywords::DEFERRED));
    assert!(orch.resources().gbuffer.iter().all(Option::is_some));
}

#[test]
fn test_deferred_depth_reader_after_gbuffer() {
    let settings = PipelineSettings {
        rendering_mode: RenderingMode::Deferred,
        ..plain_settings()
    };
    let mut orch = orchestrator(settings, PlatformCapabilities::desktop());
    let log = probe_log();
    orch.enqueue_pass(Box::new(
        ProbePass::new("DepthAfterGBuffer", RenderPassEvent::AFTER_RENDERING_GBUFFER, &log)
            .with_input(PassInput::DEPTH),
    ));

    let plan = orch.render_camera(&camera("main"), &LightingInputs::default()).unwrap();
    assert_eq!(plan.rendering_mode, RenderingMode::Deferred);
    assert!(!plan.prepass);
    assert!(!plan.contains("DepthPrepass"));
    assert!(!plan.contains("CopyDepth"));
    assert_eq!(
        &plan.passes[..4],
        &["GBuffer", "GBufferCopyDepth", "DepthAfterGBuffer", "DeferredLights"]
    );
}

#[test]
fn test_deferred_depth_reader_with_depth_fetch() {
    let settings = PipelineSettings {
        rendering_mode: RenderingMode::Deferred,
        ..plain_settings()
    };
    let mut caps = PlatformCapabilities::desktop();
    caps.gbuffer_depth_fetch = true;
    let mut orch = orchestrator(settings, caps);
    let log = probe_log();
    orch.enqueue_pass(Box::new(
        ProbePass::new("DepthAfterGBuffer", RenderPassEvent::AFTER_RENDERING_GBUFFER, &log)
            .with_input(PassInput::DEPTH),
    ));

    let plan = orch.render_camera(&camera("main"), &LightingInputs::default()).unwrap();
    assert!(!plan.prepass);
    assert!(plan.position("GBuffer") < plan.position("CopyDepth"));
    assert!(plan.position("CopyDepth") < plan.position("DepthAfterGBuffer"));
}

#[test]
fn test_gbuffer_pass_binds_gbuffer_targets() {
    let settings = PipelineSettings {
        rendering_mode: RenderingMode::Deferred,
        ..plain_settings()
    };
    let mut orch = orchestrator(settings, PlatformCapabilities::desktop());
    orch.render_camera(&camera("main"), &LightingInputs::default()).unwrap();

    let gbuffer = orch.resources().gbuffer;
    let expected: Vec<RenderTarget> = gbuffer.iter().flatten().map(|&h| RenderTarget::Texture(h)).collect();
    assert_eq!(expected.len(), 3);

    let colors = orch
        .backend()
        .commands()
        .iter()
        .find_map(|command| match command {
            BackendCommand::BeginPass { name, colors, depth, .. } if name == "GBuffer" => {
                assert!(depth.is_some());
                Some(colors.clone())
            }
            _ => None,
        })
        .expect("G-buffer pass recorded");
    assert_eq!(colors, expected);

    let formats: Vec<TextureFormat> = gbuffer
        .iter()
        .flatten()
        .filter_map(|&handle| orch.backend().texture_descriptor(handle))
        .map(|desc| desc.format)
        .collect();
    assert_eq!(
        formats,
        vec![TextureFormat::Rgba8UnormSrgb, TextureFormat::Rgb10a2Unorm, TextureFormat::Rgba8Unorm]
    );
}

#[test]
fn test_deferred_skips_depth_copy_with_depth_fetch() {
    let settings = PipelineSettings {
        rendering_mode: RenderingMode::Deferred,
        ..plain_settings()
    };
    let mut caps = PlatformCapabilities::desktop();
    caps.gbuffer_depth_fetch = true;
    let mut orch = orchestrator(settings, caps);

    let plan = orch.render_camera(&camera("main"), &LightingInputs::default()).unwrap();
    assert!(plan.contains("GBuffer"));
    assert!(!plan.contains("GBufferCopyDepth"));
}

#[test]
fn test_deferred_without_clustering_falls_back() {
    let settings = PipelineSettings {
        rendering_mode: RenderingMode::Deferred,
        ..plain_settings()
    };
    let mut caps = PlatformCapabilities::desktop();
    caps.clustering = false;
    let mut orch = orchestrator(settings, caps);

    let plan = orch.render_camera(&camera("main"), &LightingInputs::default()).unwrap();
    assert_eq!(plan.requested_mode, RenderingMode::Deferred);
    assert_eq!(plan.rendering_mode, RenderingMode::Forward);
    assert!(!plan.contains("GBuffer"));
    assert!(plan.contains("DrawOpaqueObjects"));
    assert!(!orch.globals().keywords().contains(ShaderKeywords::DEFERRED));
}

#[test]
fn test_camera_stack() {
    let mut orch = orchestrator(plain_settings(), PlatformCapabilities::desktop());
    let base = camera("base");
    let overlay = camera("hud").into_overlay();

    let plans = orch.render_stack(&base, &[overlay], &LightingInputs::default()).unwrap();
    assert_eq!(plans.len(), 2);

    let (base_plan, overlay_plan) = (&plans[0], &plans[1]);
    assert!(base_plan.intermediate_target && base_plan.create_color_texture);
    assert!(!base_plan.contains("FinalComposite"));
    assert!(!base_plan.contains("OverlayUI"));

    assert!(overlay_plan.intermediate_target);
    assert!(!overlay_plan.create_color_texture);
    assert!(overlay_plan.contains("FinalComposite"));
    assert!(overlay_plan.contains("OverlayUI"));
}

#[test]
fn test_stack_rejects_base_in_overlay_list() {
    let mut orch = orchestrator(plain_settings(), PlatformCapabilities::desktop());
    let result = orch.render_stack(&camera("base"), &[camera("not-overlay")], &LightingInputs::default());
    assert!(result.is_err());
}

// ============================================================================
// Resources
// ============================================================================

#[test]
fn test_double_swap_allocates_nothing() {
    let mut backend = DummyBackend::new();
    let mut allocator = ResourceAllocator::new();
    let desc = TextureDescriptor::new_2d(
        320,
        240,
        TextureFormat::Rgba16Float,
        TextureUsage::RENDER_ATTACHMENT | TextureUsage::TEXTURE_BINDING,
    );
    allocator.configure_color(&desc, 0);
    let back = allocator.back_color_buffer(&mut backend).unwrap();
    let front = allocator.front_color_buffer(&mut backend).unwrap();
    let allocations = backend.allocation_count();

    allocator.swap_color_buffers();
    assert_eq!(allocator.color_buffers().peek_back(), Some(front));
    allocator.swap_color_buffers();

    assert_eq!(allocator.color_buffers().peek_back(), Some(back));
    assert_eq!(allocator.color_buffers().peek_front(), Some(front));
    assert_eq!(backend.allocation_count(), allocations);
}

#[test]
fn test_post_processing_swaps_and_rebinds() {
    let mut orch = orchestrator(PipelineSettings::default(), PlatformCapabilities::desktop());
    let mut source = camera("main");
    source.post_processing = true;

    orch.render_camera(&source, &LightingInputs::default()).unwrap();
    let resources = orch.resources();
    assert_eq!(orch.globals().texture(GlobalTexture::CameraColor), resources.color_back);
    assert!(resources.color_front.is_some());
    orch.end_frame();

    let allocations = orch.backend().allocation_count();
    for _ in 0..3 {
        orch.render_camera(&source, &LightingInputs::default()).unwrap();
        orch.end_frame();
    }
    assert_eq!(orch.backend().allocation_count(), allocations);
}

#[test]
fn test_resolution_change_purges_stale_targets() {
    let mut orch = orchestrator(PipelineSettings::default(), PlatformCapabilities::desktop());
    let mut source = camera("main");
    orch.render_camera(&source, &LightingInputs::default()).unwrap();
    orch.end_frame();
    assert_eq!(orch.backend().destroy_count(), 0);

    source.target.width = 1280;
    source.target.height = 720;
    orch.render_camera(&source, &LightingInputs::default()).unwrap();
    orch.end_frame();
    assert!(orch.allocator().pooled_count() > 0);

    let stale = orch.context().settings().transient_stale_frames;
    for _ in 0..=stale {
        orch.render_camera(&source, &LightingInputs::default()).unwrap();
        orch.end_frame();
    }
    assert_eq!(orch.allocator().pooled_count(), 0);
    assert!(orch.backend().destroy_count() > 0);
}

#[test]
fn test_backend_allocation_failure_surfaces() {
    let context = PipelineContext::new(PipelineSettings::default(), PlatformCapabilities::desktop());
    let mut orch = FrameOrchestrator::new(DummyBackend::with_allocation_limit(0), context);
    let result = orch.render_camera(&camera("main"), &LightingInputs::default());
    assert!(result.is_err());
    assert_eq!(orch.backend().name(), "Dummy");
}

// ============================================================================
// Light data ordering
// ============================================================================

#[test]
fn test_clustering_joined_before_first_light_read() {
    let settings = PipelineSettings {
        rendering_mode: RenderingMode::ForwardPlus,
        ..plain_settings()
    };
    let mut orch = orchestrator(settings, PlatformCapabilities::desktop());
    let log = probe_log();
    orch.enqueue_pass(Box::new(ProbePass::new(
        "BeforeLights",
        RenderPassEvent::BEFORE_RENDERING_SHADOWS,
        &log,
    )));
    orch.enqueue_pass(Box::new(
        ProbePass::new("LightReader", RenderPassEvent::AFTER_RENDERING_PRE_PASSES, &log).reading_lights(),
    ));

    let lights = inputs(crowded_scene(40));
    let camera_config = CameraFrameConfig::initialize(&camera("main"), StackPosition::SINGLE, orch.context()).unwrap();

    let plan = orch.setup(camera_config, &lights).unwrap();
    assert_eq!(plan.rendering_mode, RenderingMode::ForwardPlus);
    assert!(orch.lights().is_pending());
    assert!(!orch.globals().light_data_ready());

    orch.execute().unwrap();
    assert!(!orch.lights().is_pending());

    let seen = records(&log);
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0].name, "BeforeLights");
    assert!(!seen[0].light_data_ready);
    assert_eq!(seen[1].name, "LightReader");
    assert!(seen[1].light_data_ready);
    assert!(seen[1].clusters_bound);
    assert!(orch.globals().keywords().contains(ShaderKeywords::FORWARD_PLUS));
}

#[test]
fn test_shutdown_joins_pending_clustering() {
    let settings = PipelineSettings {
        rendering_mode: RenderingMode::ForwardPlus,
        ..plain_settings()
    };
    let mut orch = orchestrator(settings, PlatformCapabilities::desktop());
    let camera_config = CameraFrameConfig::initialize(&camera("main"), StackPosition::SINGLE, orch.context()).unwrap();
    orch.setup(camera_config, &inputs(crowded_scene(8))).unwrap();
    orch.shutdown();
    assert!(!orch.lights().is_pending());
    assert_eq!(orch.backend().live_texture_count(), 0);
}

#[test]
fn test_forward_plus_without_clustering_falls_back() {
    let settings = PipelineSettings {
        rendering_mode: RenderingMode::ForwardPlus,
        ..plain_settings()
    };
    let mut caps = PlatformCapabilities::desktop();
    caps.clustering = false;
    let mut orch = orchestrator(settings, caps);

    let plan = orch.render_camera(&camera("main"), &inputs(crowded_scene(20))).unwrap();
    assert_eq!(plan.rendering_mode, RenderingMode::Forward);
    assert!(orch.globals().clusters().is_none());
    assert!(!orch.globals().keywords().contains(ShaderKeywords::FORWARD_PLUS));
}

// ============================================================================
// Configuration
// ============================================================================

#[test]
fn test_settings_from_toml() {
    let settings: PipelineSettings = toml::from_str(
        r#"
        rendering_mode = "ForwardPlus"
        depth_priming = "Forced"
        render_scale = 0.75

        [clustering]
        z_bin_remap = "Linear"
        "#,
    )
    .unwrap();
    assert_eq!(settings.rendering_mode, RenderingMode::ForwardPlus);
    assert_eq!(settings.depth_priming, DepthPrimingMode::Forced);
    assert_eq!(settings.render_scale, 0.75);
    assert_eq!(settings.clustering.z_bin_remap, ZBinRemap::Linear);
    assert_eq!(settings.clustering.min_tile_size, 8);
    assert_eq!(settings.transient_stale_frames, 10);
}
