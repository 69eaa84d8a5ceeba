//! GPU backend abstraction layer.
//!
//! The frame core never talks to a graphics API directly. It allocates
//! transient textures and records pass commands through the [`Backend`]
//! trait, so the same orchestration logic drives a real device or the
//! [`DummyBackend`] used in tests.
//!
//! # Architecture
//!
//! Each backend implements the [`Backend`] trait, which provides:
//! - Texture creation and destruction for frame targets
//! - Sequential command submission from the render thread

pub mod dummy;

pub use dummy::DummyBackend;

use crate::error::FrameResult;
use crate::graph::RenderPassEvent;
use crate::types::TextureDescriptor;

/// Handle to a backend texture.
///
/// `TextureHandle` is `Copy` and cheap to pass around. It is only valid
/// within the backend that created it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureHandle(u64);

impl TextureHandle {
    /// Create a handle from a raw backend id.
    pub fn from_raw(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw backend id.
    pub fn raw(self) -> u64 {
        self.0
    }
}

/// Where a pass renders or reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderTarget {
    /// A texture owned by the frame core.
    Texture(TextureHandle),
    /// The final output of the camera stack (swapchain image or camera target texture).
    Backbuffer,
}

/// Which renderer list a draw command covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DrawQueue {
    /// Shadow casters from the light's point of view.
    ShadowCasters,
    /// Depth-only opaque geometry.
    DepthOnly,
    /// Depth plus view-space normals.
    DepthNormals,
    /// Multi-target geometry buffer fill.
    GBuffer,
    /// Full-screen deferred lighting resolve.
    DeferredLights,
    /// Opaque geometry with forward shading.
    Opaque,
    /// Opaque materials that cannot be shaded through the G-buffer.
    ForwardOnlyOpaque,
    /// Sky background.
    Skybox,
    /// Per-object and camera motion vectors.
    MotionVectors,
    /// Blended geometry, back to front.
    Transparent,
    /// Full-screen post-processing chain.
    PostProcess,
    /// Screen-space overlay UI.
    Overlay,
    /// Anything recorded by an externally authored pass.
    Custom,
}

/// A command recorded by a pass.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCommand {
    /// Start a pass writing the given attachments.
    BeginPass {
        name: String,
        event: RenderPassEvent,
        /// Color attachments in binding order; empty for depth-only passes.
        colors: Vec<RenderTarget>,
        depth: Option<RenderTarget>,
    },
    /// Draw a renderer list into the current pass.
    Draw { queue: DrawQueue },
    /// Copy one texture into another of identical size.
    CopyTexture {
        src: TextureHandle,
        dst: TextureHandle,
    },
    /// Full-screen blit with format conversion and scaling.
    Blit { src: RenderTarget, dst: RenderTarget },
    /// Finish the current pass.
    EndPass,
}

/// Trait implemented by GPU backends.
pub trait Backend {
    /// Backend name for logging.
    fn name(&self) -> &'static str;

    /// Create a texture resource.
    fn create_texture(&mut self, descriptor: &TextureDescriptor) -> FrameResult<TextureHandle>;

    /// Destroy a texture resource. Unknown handles are ignored.
    fn destroy_texture(&mut self, texture: TextureHandle);

    /// Submit a command on the render thread.
    fn submit(&mut self, command: BackendCommand);
}
