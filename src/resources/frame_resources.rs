//! Per-camera view of the allocated frame targets.

use crate::backend::TextureHandle;
use crate::error::{FrameError, FrameResult};

use super::TargetSlot;

/// Handles of the targets allocated for the current camera.
///
/// Exactly one of `color_back`/`color_front` is the active write target
/// (the back buffer). The front buffer, once allocated, stays readable until
/// the pair is released.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameResourceSet {
    /// Active color write target.
    pub color_back: Option<TextureHandle>,
    /// Previous color write target.
    pub color_front: Option<TextureHandle>,
    /// Depth attachment of the intermediate target.
    pub camera_depth: Option<TextureHandle>,
    /// Sampled depth texture.
    pub depth_texture: Option<TextureHandle>,
    /// View-space normals.
    pub normals_texture: Option<TextureHandle>,
    /// Copy of the color target taken after opaques.
    pub opaque_color: Option<TextureHandle>,
    /// Per-pixel motion vectors.
    pub motion_vectors: Option<TextureHandle>,
    /// G-buffer attachments (albedo, normals, material).
    pub gbuffer: [Option<TextureHandle>; 3],
}

impl FrameResourceSet {
    /// Handle bound to `slot`, if allocated.
    pub fn peek(&self, slot: TargetSlot) -> Option<TextureHandle> {
        match slot {
            TargetSlot::CameraColor => self.color_back,
            TargetSlot::CameraColorFront => self.color_front,
            TargetSlot::CameraDepth => self.camera_depth,
            TargetSlot::DepthTexture => self.depth_texture,
            TargetSlot::NormalsTexture => self.normals_texture,
            TargetSlot::OpaqueColor => self.opaque_color,
            TargetSlot::MotionVectors => self.motion_vectors,
            TargetSlot::GBufferAlbedo => self.gbuffer[0],
            TargetSlot::GBufferNormal => self.gbuffer[1],
            TargetSlot::GBufferMaterial => self.gbuffer[2],
        }
    }

    /// Handle bound to `slot`.
    pub fn get(&self, slot: TargetSlot) -> FrameResult<TextureHandle> {
        self.peek(slot).ok_or(FrameError::UnknownResource(slot))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_missing_slot() {
        let set = FrameResourceSet {
            depth_texture: Some(TextureHandle::from_raw(3)),
            ..Default::default()
        };
        assert_eq!(set.get(TargetSlot::DepthTexture), Ok(TextureHandle::from_raw(3)));
        assert_eq!(
            set.get(TargetSlot::NormalsTexture),
            Err(FrameError::UnknownResource(TargetSlot::NormalsTexture))
        );
    }
}
