//! Transient frame targets.
//!
//! - [`TransientPool`] - released textures waiting for reuse or purge
//! - [`ColorBufferPair`] - double-buffered camera color target
//! - [`ResourceAllocator`] - descriptor-keyed (re)allocation of every target
//! - [`FrameResourceSet`] - snapshot of the handles a pass can read

mod allocator;
mod color_buffer;
mod frame_resources;
mod transient_pool;

pub use allocator::ResourceAllocator;
pub use color_buffer::ColorBufferPair;
pub use frame_resources::FrameResourceSet;
pub use transient_pool::TransientPool;

/// Named frame target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetSlot {
    /// Back buffer of the camera color pair.
    CameraColor,
    /// Front buffer of the camera color pair.
    CameraColorFront,
    /// Depth attachment of the intermediate target.
    CameraDepth,
    /// Sampled depth texture.
    DepthTexture,
    /// View-space normals.
    NormalsTexture,
    /// Opaque color copy.
    OpaqueColor,
    /// Motion vectors.
    MotionVectors,
    /// G-buffer albedo.
    GBufferAlbedo,
    /// G-buffer normals.
    GBufferNormal,
    /// G-buffer material parameters.
    GBufferMaterial,
}

impl TargetSlot {
    /// Returns true for the two color pair slots.
    pub fn is_color_pair(self) -> bool {
        matches!(self, Self::CameraColor | Self::CameraColorFront)
    }
}
