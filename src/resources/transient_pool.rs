//! Pool of released transient textures.

use crate::backend::{Backend, TextureHandle};
use crate::error::FrameResult;
use crate::types::TextureDescriptor;

#[derive(Debug)]
struct PooledTexture {
    handle: TextureHandle,
    descriptor: TextureDescriptor,
    last_used: u64,
}

/// Textures released by the allocator, kept alive for reuse.
///
/// A released texture is handed back to the next request with a matching
/// descriptor. Entries that nobody claims for `stale_frames` frames are
/// destroyed by [`purge`](Self::purge), which runs once per frame after all
/// cameras have rendered.
#[derive(Debug, Default)]
pub struct TransientPool {
    free: Vec<PooledTexture>,
}

impl TransientPool {
    /// Create an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of idle textures.
    pub fn len(&self) -> usize {
        self.free.len()
    }

    /// Returns true if no texture is idle.
    pub fn is_empty(&self) -> bool {
        self.free.is_empty()
    }

    /// Take a texture matching `descriptor`, creating one if none is idle.
    pub fn acquire<B: Backend + ?Sized>(
        &mut self,
        backend: &mut B,
        descriptor: &TextureDescriptor,
    ) -> FrameResult<TextureHandle> {
        if let Some(index) = self
            .free
            .iter()
            .position(|entry| entry.descriptor.matches_allocation(descriptor))
        {
            let entry = self.free.swap_remove(index);
            log::trace!(
                "TransientPool: reusing {:?} for {:?}",
                entry.handle,
                descriptor.label
            );
            return Ok(entry.handle);
        }

        backend.create_texture(descriptor)
    }

    /// Return a texture to the pool.
    pub fn release(&mut self, handle: TextureHandle, descriptor: TextureDescriptor, frame: u64) {
        self.free.push(PooledTexture {
            handle,
            descriptor,
            last_used: frame,
        });
    }

    /// Destroy textures idle for at least `stale_frames` frames.
    ///
    /// Returns the number of destroyed textures.
    pub fn purge<B: Backend + ?Sized>(&mut self, backend: &mut B, frame: u64, stale_frames: u64) -> usize {
        let before = self.free.len();
        self.free.retain(|entry| {
            let stale = frame.saturating_sub(entry.last_used) >= stale_frames;
            if stale {
                backend.destroy_texture(entry.handle);
            }
            !stale
        });
        let purged = before - self.free.len();
        if purged > 0 {
            log::debug!("TransientPool: purged {} stale textures at frame {}", purged, frame);
        }
        purged
    }

    /// Destroy every idle texture.
    pub fn clear<B: Backend + ?Sized>(&mut self, backend: &mut B) {
        for entry in self.free.drain(..) {
            backend.destroy_texture(entry.handle);
        }
    }
}
