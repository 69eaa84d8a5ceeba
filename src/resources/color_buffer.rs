//! Front/back camera color buffers.

use crate::backend::{Backend, TextureHandle};
use crate::error::FrameResult;
use crate::types::TextureDescriptor;

use super::TransientPool;

const LABELS: [&str; 2] = ["camera_color_a", "camera_color_b"];

/// Double-buffered camera color target.
///
/// The back buffer is the write target for the upcoming passes. The front
/// buffer holds the previous write target and stays readable until the
/// pair is released. [`swap`](Self::swap) only exchanges the labels, so
/// swapping never allocates.
///
/// The front buffer is allocated on first request; a chain that never
/// swaps only ever owns one texture.
#[derive(Debug, Default)]
pub struct ColorBufferPair {
    descriptor: Option<TextureDescriptor>,
    buffers: [Option<TextureHandle>; 2],
    back: usize,
}

impl ColorBufferPair {
    /// Create an unconfigured pair.
    pub fn new() -> Self {
        Self::default()
    }

    /// Descriptor of the pair, if configured.
    pub fn descriptor(&self) -> Option<&TextureDescriptor> {
        self.descriptor.as_ref()
    }

    /// Set the descriptor for both buffers.
    ///
    /// Existing textures are kept when the new descriptor matches the old
    /// allocation, and returned to `pool` otherwise. Returns true if the
    /// buffers were dropped.
    pub fn configure(&mut self, pool: &mut TransientPool, descriptor: &TextureDescriptor, frame: u64) -> bool {
        if let Some(current) = &self.descriptor {
            if current.matches_allocation(descriptor) {
                return false;
            }
        }
        let changed = self.buffers.iter().any(Option::is_some);
        self.release(pool, frame);
        self.descriptor = Some(descriptor.clone());
        changed
    }

    /// Back buffer, allocating it if needed.
    pub fn back_buffer<B: Backend + ?Sized>(
        &mut self,
        backend: &mut B,
        pool: &mut TransientPool,
    ) -> FrameResult<TextureHandle> {
        self.ensure(self.back, backend, pool)
    }

    /// Front buffer, allocating it if needed.
    pub fn front_buffer<B: Backend + ?Sized>(
        &mut self,
        backend: &mut B,
        pool: &mut TransientPool,
    ) -> FrameResult<TextureHandle> {
        self.ensure(self.back ^ 1, backend, pool)
    }

    /// Back buffer without allocating.
    pub fn peek_back(&self) -> Option<TextureHandle> {
        self.buffers[self.back]
    }

    /// Front buffer without allocating.
    pub fn peek_front(&self) -> Option<TextureHandle> {
        self.buffers[self.back ^ 1]
    }

    /// Exchange the front and back labels.
    pub fn swap(&mut self) {
        self.back ^= 1;
        log::trace!("ColorBufferPair: back buffer is now {}", LABELS[self.back]);
    }

    /// Return both buffers to the pool and reset the assignment.
    pub fn release(&mut self, pool: &mut TransientPool, frame: u64) {
        for (index, buffer) in self.buffers.iter_mut().enumerate() {
            if let (Some(handle), Some(descriptor)) = (buffer.take(), &self.descriptor) {
                pool.release(handle, descriptor.clone().with_label(LABELS[index]), frame);
            }
        }
        self.back = 0;
    }

    /// Destroy both buffers and forget the descriptor.
    pub fn destroy<B: Backend + ?Sized>(&mut self, backend: &mut B) {
        for handle in self.buffers.iter_mut().filter_map(Option::take) {
            backend.destroy_texture(handle);
        }
        self.descriptor = None;
        self.back = 0;
    }

    fn ensure<B: Backend + ?Sized>(
        &mut self,
        index: usize,
        backend: &mut B,
        pool: &mut TransientPool,
    ) -> FrameResult<TextureHandle> {
        if let Some(handle) = self.buffers[index] {
            return Ok(handle);
        }
        let Some(descriptor) = &self.descriptor else {
            return Err(crate::error::FrameError::InvalidParameter(
                "camera color buffers used before configuration".to_string(),
            ));
        };
        let descriptor = descriptor.clone().with_label(LABELS[index]);
        let handle = pool.acquire(backend, &descriptor)?;
        self.buffers[index] = Some(handle);
        Ok(handle)
    }
}
