//! Common types and descriptors for frame resources.
//!
//! This module contains format enums, usage flags, and descriptor structs
//! used by the allocator and the orchestrator.

mod common;
mod texture;

pub use common::{Extent3d, ViewportRect};
pub use texture::{TextureDescriptor, TextureDimension, TextureFormat, TextureUsage};
