//! Aggregation of auxiliary buffer needs across a camera's passes.
//!
//! The analyzer is a pure function of the registered passes: it never
//! allocates or binds anything. The orchestrator turns its output into
//! prepass insertion and target allocation decisions.

use crate::graph::{PassInput, RenderPass, RenderPassEvent};

/// Inputs to [`RequirementAnalyzer::analyze`] that do not come from passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalyzeOptions {
    /// Event at which main opaque shading starts. Depth needed at or
    /// before it can only come from a prepass.
    pub main_rendering_event: RenderPassEvent,
    /// Temporal antialiasing is enabled on the camera.
    pub temporal_antialiasing: bool,
}

impl Default for AnalyzeOptions {
    fn default() -> Self {
        Self {
            main_rendering_event: RenderPassEvent::BEFORE_RENDERING_OPAQUES,
            temporal_antialiasing: false,
        }
    }
}

/// Aggregated needs of a pass list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameRequirements {
    pub depth: bool,
    pub normals: bool,
    pub color_copy: bool,
    pub motion: bool,
    /// A depth or depth-normals prepass must run.
    pub prepass: bool,
    /// Earliest event per need, when needed.
    pub depth_event: Option<RenderPassEvent>,
    pub normals_event: Option<RenderPassEvent>,
    pub color_event: Option<RenderPassEvent>,
    pub motion_event: Option<RenderPassEvent>,
}

/// Scans registered passes for declared input needs.
#[derive(Debug, Default, Clone, Copy)]
pub struct RequirementAnalyzer;

impl RequirementAnalyzer {
    /// Aggregate the needs of `passes`.
    pub fn analyze<'a>(
        passes: impl IntoIterator<Item = &'a dyn RenderPass>,
        options: AnalyzeOptions,
    ) -> FrameRequirements {
        let mut result = FrameRequirements::default();

        for pass in passes {
            let input = pass.input();
            let event = pass.event();

            if input.contains(PassInput::DEPTH) {
                result.depth = true;
                earliest(&mut result.depth_event, event);
            }
            // The depth-normals prepass writes both textures.
            if input.contains(PassInput::NORMAL) {
                result.normals = true;
                result.depth = true;
                earliest(&mut result.normals_event, event);
                earliest(&mut result.depth_event, event);
            }
            if input.contains(PassInput::COLOR) || pass.requires_unflipped_color() {
                result.color_copy = true;
                earliest(&mut result.color_event, event);
            }
            if input.contains(PassInput::MOTION) {
                result.motion = true;
                earliest(&mut result.motion_event, event);
            }
        }

        if options.temporal_antialiasing && !result.motion {
            result.motion = true;
            earliest(
                &mut result.motion_event,
                RenderPassEvent::BEFORE_RENDERING_POST_PROCESSING,
            );
        }
        if result.motion {
            result.depth = true;
            if let Some(event) = result.motion_event {
                earliest(&mut result.depth_event, event);
            }
        }

        let early_depth = result
            .depth_event
            .is_some_and(|event| event <= options.main_rendering_event);
        result.prepass = result.normals || early_depth;

        result
    }
}

fn earliest(slot: &mut Option<RenderPassEvent>, event: RenderPassEvent) {
    *slot = Some(slot.map_or(event, |current| current.min(event)));
}
