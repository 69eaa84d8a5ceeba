//! Dummy GPU backend for testing and development.
//!
//! This backend doesn't perform actual GPU operations but keeps a log of
//! everything it was asked to do, so orchestration can be verified without
//! GPU hardware.

use std::collections::HashMap;

use crate::error::{FrameError, FrameResult};
use crate::types::TextureDescriptor;

use super::{Backend, BackendCommand, TextureHandle};

/// Dummy GPU backend.
#[derive(Debug, Default)]
pub struct DummyBackend {
    next_id: u64,
    live: HashMap<TextureHandle, TextureDescriptor>,
    allocation_count: usize,
    destroy_count: usize,
    allocation_limit: Option<usize>,
    commands: Vec<BackendCommand>,
}

impl DummyBackend {
    /// Create a new dummy backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a backend that refuses to allocate more than `limit` live textures.
    pub fn with_allocation_limit(limit: usize) -> Self {
        Self {
            allocation_limit: Some(limit),
            ..Self::default()
        }
    }

    /// Total number of textures ever created.
    pub fn allocation_count(&self) -> usize {
        self.allocation_count
    }

    /// Total number of textures destroyed.
    pub fn destroy_count(&self) -> usize {
        self.destroy_count
    }

    /// Number of textures currently alive.
    pub fn live_texture_count(&self) -> usize {
        self.live.len()
    }

    /// Descriptor of a live texture.
    pub fn texture_descriptor(&self, texture: TextureHandle) -> Option<&TextureDescriptor> {
        self.live.get(&texture)
    }

    /// All commands recorded since the last [`clear_commands`](Self::clear_commands).
    pub fn commands(&self) -> &[BackendCommand] {
        &self.commands
    }

    /// Names of the passes recorded, in submission order.
    pub fn pass_names(&self) -> Vec<&str> {
        self.commands
            .iter()
            .filter_map(|command| match command {
                BackendCommand::BeginPass { name, .. } => Some(name.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Forget all recorded commands.
    pub fn clear_commands(&mut self) {
        self.commands.clear();
    }
}

impl Backend for DummyBackend {
    fn name(&self) -> &'static str {
        "Dummy"
    }

    fn create_texture(&mut self, descriptor: &TextureDescriptor) -> FrameResult<TextureHandle> {
        if descriptor.size.is_empty() {
            return Err(FrameError::InvalidParameter(format!(
                "texture {:?} has an empty extent",
                descriptor.label
            )));
        }
        if let Some(limit) = self.allocation_limit {
            if self.live.len() >= limit {
                return Err(FrameError::ResourceCreationFailed(format!(
                    "dummy allocation limit of {limit} textures reached"
                )));
            }
        }

        self.next_id += 1;
        let handle = TextureHandle::from_raw(self.next_id);
        log::trace!(
            "DummyBackend: creating texture {:?} ({}x{}, {:?}, {} samples) -> {:?}",
            descriptor.label,
            descriptor.size.width,
            descriptor.size.height,
            descriptor.format,
            descriptor.sample_count,
            handle
        );
        self.live.insert(handle, descriptor.clone());
        self.allocation_count += 1;
        Ok(handle)
    }

    fn destroy_texture(&mut self, texture: TextureHandle) {
        if self.live.remove(&texture).is_some() {
            log::trace!("DummyBackend: destroying texture {:?}", texture);
            self.destroy_count += 1;
        }
    }

    fn submit(&mut self, command: BackendCommand) {
        log::trace!("DummyBackend: {:?}", command);
        self.commands.push(command);
    }
}
