//! # RedLilium Frame
//!
//! Per-frame orchestration core for the RedLilium renderer.
//!
//! ## Overview
//!
//! For every camera this crate decides which passes run, in what order and
//! against which transient targets, and prepares the light data those
//! passes read:
//!
//! - [`FrameOrchestrator`] - rendering mode fallback, intermediate target and
//!   depth priming decisions, built-in pass insertion, stable sequencing
//! - [`RequirementAnalyzer`] - aggregates auxiliary buffer needs of passes
//! - [`LightDataPreparer`] - main light selection, additional light packing,
//!   per-object light indices
//! - [`ClusteringEngine`] - Forward+ Z-bin and tile tables, filled on a
//!   background job
//! - [`ResourceAllocator`] - descriptor-keyed transient targets and the
//!   double-buffered camera color pair
//!
//! GPU work goes through the [`Backend`] trait; [`DummyBackend`] counts
//! allocations and logs commands for tests.
//!
//! ## Example
//!
//! ```ignore
//! use redlilium_frame::{CameraSource, DummyBackend, FrameOrchestrator, LightingInputs, PipelineContext};
//!
//! let mut frame = FrameOrchestrator::new(DummyBackend::new(), PipelineContext::default());
//! let camera = CameraSource::perspective("main", glam::Vec3::ZERO, Default::default());
//! frame.render_camera(&camera, &LightingInputs::default())?;
//! frame.end_frame();
//! ```

pub mod backend;
pub mod camera;
pub mod error;
pub mod globals;
pub mod graph;
pub mod lighting;
pub mod orchestrator;
pub mod requirements;
pub mod resources;
pub mod settings;
pub mod types;

// Re-export main types for convenience
pub use backend::{Backend, BackendCommand, DrawQueue, DummyBackend, RenderTarget, TextureHandle};
pub use camera::{CameraFrameConfig, CameraKind, CameraRenderType, CameraSource, ImageScalingMode, StackPosition};
pub use error::{FrameError, FrameResult};
pub use globals::{GlobalTexture, ShaderGlobals, ShaderKeywords};
pub use graph::{PassExecuteContext, PassInput, PassQueue, RenderPass, RenderPassEvent};
pub use lighting::{ClusteringEngine, LightDataPreparer, LightRecord, LightingInputs, VisibleLight};
pub use orchestrator::{DebugViews, FrameOrchestrator, FramePlan};
pub use requirements::{AnalyzeOptions, FrameRequirements, RequirementAnalyzer};
pub use resources::{FrameResourceSet, ResourceAllocator, TargetSlot};
pub use settings::{PipelineContext, PipelineSettings, PlatformCapabilities, RenderingMode};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_dummy_backend() {
        let backend = DummyBackend::new();
        assert_eq!(backend.name(), "Dummy");
    }
}
