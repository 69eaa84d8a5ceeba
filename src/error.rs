//! Frame orchestration error types.
//!
//! Capability gaps, light budget overflow and rendering-mode fallback are
//! resolved by data-driven downgrades and never surface here. Errors are
//! reserved for backend failures and malformed upstream input.

use thiserror::Error;

use crate::resources::TargetSlot;

/// Errors that can occur while orchestrating a frame.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    /// The backend failed to create a resource.
    #[error("resource creation failed: {0}")]
    ResourceCreationFailed(String),
    /// An invalid parameter was provided by an upstream collaborator.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    /// A pass asked for a frame resource that was never allocated this frame.
    #[error("frame resource {0:?} is not allocated")]
    UnknownResource(TargetSlot),
    /// The background clustering job panicked before it could be joined.
    #[error("light clustering job panicked")]
    ClusteringJobPanicked,
    /// Backend-specific failure.
    #[error("backend error: {0}")]
    Backend(String),
}

/// Convenience alias used throughout the crate.
pub type FrameResult<T> = Result<T, FrameError>;
