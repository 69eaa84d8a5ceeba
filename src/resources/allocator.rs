//! Camera target allocation.

use std::collections::HashMap;

use crate::backend::{Backend, TextureHandle};
use crate::error::{FrameError, FrameResult};
use crate::types::TextureDescriptor;

use super::{ColorBufferPair, FrameResourceSet, TargetSlot, TransientPool};

#[derive(Debug)]
struct Allocation {
    handle: TextureHandle,
    descriptor: TextureDescriptor,
}

/// Owner of every transient target the frame core renders into.
///
/// Targets survive across frames and are only reallocated when their
/// descriptor changes. Textures that fall out of use go to the
/// [`TransientPool`] instead of being destroyed, so a camera that
/// alternates between two resolutions does not thrash the backend.
///
/// All mutation happens on the render thread.
#[derive(Debug, Default)]
pub struct ResourceAllocator {
    pool: TransientPool,
    slots: HashMap<TargetSlot, Allocation>,
    color: ColorBufferPair,
}

impl ResourceAllocator {
    /// Create an empty allocator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make sure `slot` holds a texture matching `descriptor`.
    ///
    /// Keeps the current texture when the descriptors match (labels are
    /// ignored). Otherwise the old texture goes back to the pool and a
    /// matching one is taken from it, or created.
    pub fn reallocate_if_needed<B: Backend + ?Sized>(
        &mut self,
        backend: &mut B,
        slot: TargetSlot,
        descriptor: &TextureDescriptor,
        frame: u64,
    ) -> FrameResult<TextureHandle> {
        if slot.is_color_pair() {
            return Err(FrameError::InvalidParameter(format!(
                "{slot:?} is managed by the color buffer pair"
            )));
        }

        if let Some(current) = self.slots.get(&slot) {
            if current.descriptor.matches_allocation(descriptor) {
                return Ok(current.handle);
            }
        }

        self.release(slot, frame);
        let handle = self.pool.acquire(backend, descriptor)?;
        log::trace!(
            "ResourceAllocator: {:?} -> {:?} ({}x{} {:?})",
            slot,
            handle,
            descriptor.width(),
            descriptor.height(),
            descriptor.format
        );
        self.slots.insert(
            slot,
            Allocation {
                handle,
                descriptor: descriptor.clone(),
            },
        );
        Ok(handle)
    }

    /// Return the texture in `slot` to the pool.
    pub fn release(&mut self, slot: TargetSlot, frame: u64) {
        if let Some(allocation) = self.slots.remove(&slot) {
            self.pool.release(allocation.handle, allocation.descriptor, frame);
        }
    }

    /// Texture currently bound to `slot`, without allocating.
    pub fn get(&self, slot: TargetSlot) -> Option<TextureHandle> {
        match slot {
            TargetSlot::CameraColor => self.color.peek_back(),
            TargetSlot::CameraColorFront => self.color.peek_front(),
            _ => self.slots.get(&slot).map(|allocation| allocation.handle),
        }
    }

    /// Descriptor of the texture in `slot`.
    pub fn descriptor(&self, slot: TargetSlot) -> Option<&TextureDescriptor> {
        match slot {
            TargetSlot::CameraColor | TargetSlot::CameraColorFront => self.color.descriptor(),
            _ => self.slots.get(&slot).map(|allocation| &allocation.descriptor),
        }
    }

    /// Configure the camera color pair.
    pub fn configure_color(&mut self, descriptor: &TextureDescriptor, frame: u64) -> bool {
        self.color.configure(&mut self.pool, descriptor, frame)
    }

    /// Back color buffer, allocating it if needed.
    pub fn back_color_buffer<B: Backend + ?Sized>(&mut self, backend: &mut B) -> FrameResult<TextureHandle> {
        self.color.back_buffer(backend, &mut self.pool)
    }

    /// Front color buffer, allocating it if needed.
    pub fn front_color_buffer<B: Backend + ?Sized>(&mut self, backend: &mut B) -> FrameResult<TextureHandle> {
        self.color.front_buffer(backend, &mut self.pool)
    }

    /// Exchange front and back color buffers.
    pub fn swap_color_buffers(&mut self) {
        self.color.swap();
    }

    /// The camera color pair.
    pub fn color_buffers(&self) -> &ColorBufferPair {
        &self.color
    }

    /// Return the color pair to the pool.
    pub fn release_color(&mut self, frame: u64) {
        self.color.release(&mut self.pool, frame);
    }

    /// Snapshot of all bound targets.
    pub fn frame_resources(&self) -> FrameResourceSet {
        FrameResourceSet {
            color_back: self.color.peek_back(),
            color_front: self.color.peek_front(),
            camera_depth: self.get(TargetSlot::CameraDepth),
            depth_texture: self.get(TargetSlot::DepthTexture),
            normals_texture: self.get(TargetSlot::NormalsTexture),
            opaque_color: self.get(TargetSlot::OpaqueColor),
            motion_vectors: self.get(TargetSlot::MotionVectors),
            gbuffer: [
                self.get(TargetSlot::GBufferAlbedo),
                self.get(TargetSlot::GBufferNormal),
                self.get(TargetSlot::GBufferMaterial),
            ],
        }
    }

    /// Idle textures in the pool.
    pub fn pooled_count(&self) -> usize {
        self.pool.len()
    }

    /// Destroy pooled textures unused for `stale_frames` frames.
    pub fn purge<B: Backend + ?Sized>(&mut self, backend: &mut B, frame: u64, stale_frames: u64) -> usize {
        self.pool.purge(backend, frame, stale_frames)
    }

    /// Destroy every texture, bound or pooled.
    pub fn destroy_all<B: Backend + ?Sized>(&mut self, backend: &mut B) {
        for (_, allocation) in self.slots.drain() {
            backend.destroy_texture(allocation.handle);
        }
        self.color.destroy(backend);
        self.pool.clear(backend);
    }
}
