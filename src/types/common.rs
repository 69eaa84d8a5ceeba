//! Common types shared across the frame core.

use serde::{Deserialize, Serialize};

// ============================================================================
// Extent3d
// ============================================================================

/// 3D extent for textures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Extent3d {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Depth in pixels or array layers (1 for 2D textures).
    pub depth: u32,
}

impl Extent3d {
    /// Create a new 2D extent.
    pub fn new_2d(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            depth: 1,
        }
    }

    /// Returns true if either dimension is zero.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0 || self.depth == 0
    }
}

// ============================================================================
// Viewport
// ============================================================================

/// Camera viewport in normalized target coordinates.
///
/// `(0, 0, 1, 1)` covers the whole target. Any other rectangle means the
/// camera renders into a sub-region, which needs an intermediate target so
/// the final composite can place it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportRect {
    /// Left edge, in `[0, 1]`.
    pub x: f32,
    /// Bottom edge, in `[0, 1]`.
    pub y: f32,
    /// Width, in `[0, 1]`.
    pub width: f32,
    /// Height, in `[0, 1]`.
    pub height: f32,
}

impl Default for ViewportRect {
    fn default() -> Self {
        Self::FULL
    }
}

impl ViewportRect {
    /// Viewport covering the whole target.
    pub const FULL: Self = Self {
        x: 0.0,
        y: 0.0,
        width: 1.0,
        height: 1.0,
    };

    /// Create a new normalized viewport.
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Returns true if this viewport covers the whole target.
    pub fn is_full(&self) -> bool {
        *self == Self::FULL
    }

    /// Resolve to a pixel size on a target of the given dimensions.
    pub fn pixel_size(&self, target_width: u32, target_height: u32) -> (u32, u32) {
        let width = (target_width as f32 * self.width).round() as u32;
        let height = (target_height as f32 * self.height).round() as u32;
        (width.max(1), height.max(1))
    }
}
