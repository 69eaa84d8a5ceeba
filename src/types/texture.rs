//! Texture types and descriptors for transient frame targets.

use super::Extent3d;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Texture format enumeration.
///
/// Only the formats a frame target can take are listed; asset textures are
/// owned by other collaborators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[non_exhaustive]
pub enum TextureFormat {
    /// 8-bit RGBA channels, unsigned normalized.
    #[default]
    Rgba8Unorm,
    /// 8-bit RGBA channels, sRGB.
    Rgba8UnormSrgb,
    /// 8-bit BGRA channels, unsigned normalized.
    Bgra8Unorm,
    /// 8-bit BGRA channels, sRGB.
    Bgra8UnormSrgb,
    /// 10-bit RGB with 2-bit alpha.
    Rgb10a2Unorm,
    /// Packed 11/11/10 float, the usual HDR scene color format.
    Rg11b10Float,
    /// 16-bit RGBA channels, float.
    Rgba16Float,
    /// 16-bit RG channels, float (motion vectors).
    Rg16Float,
    /// 32-bit RGBA channels, float.
    Rgba32Float,
    /// 32-bit red channel, float (depth copies on platforms without depth sampling).
    R32Float,

    /// 24-bit depth with 8-bit stencil.
    Depth24PlusStencil8,
    /// 32-bit depth, float.
    Depth32Float,
    /// 32-bit depth float with 8-bit stencil.
    Depth32FloatStencil8,
}

impl TextureFormat {
    /// Returns true if this is a depth or stencil format.
    pub fn is_depth_stencil(&self) -> bool {
        matches!(
            self,
            Self::Depth24PlusStencil8 | Self::Depth32Float | Self::Depth32FloatStencil8
        )
    }

    /// Returns true if this format has a stencil component.
    pub fn has_stencil(&self) -> bool {
        matches!(self, Self::Depth24PlusStencil8 | Self::Depth32FloatStencil8)
    }

    /// Returns true if the hardware performs sRGB encoding on write.
    pub fn is_srgb(&self) -> bool {
        matches!(self, Self::Rgba8UnormSrgb | Self::Bgra8UnormSrgb)
    }

    /// Returns true if the format can hold values above 1.0.
    pub fn is_hdr(&self) -> bool {
        matches!(
            self,
            Self::Rg11b10Float | Self::Rgba16Float | Self::Rgba32Float | Self::R32Float
        )
    }
}

/// Dimensionality of a texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TextureDimension {
    /// Plain 2D texture.
    #[default]
    D2,
    /// 2D texture array (stereo or layered targets).
    D2Array,
    /// Cube map.
    Cube,
    /// Volume texture.
    D3,
}

bitflags! {
    /// Usage flags for textures.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TextureUsage: u32 {
        /// Texture can be copied from.
        const COPY_SRC = 1 << 0;
        /// Texture can be copied to.
        const COPY_DST = 1 << 1;
        /// Texture can be sampled in a shader.
        const TEXTURE_BINDING = 1 << 2;
        /// Texture can be used as a storage texture.
        const STORAGE_BINDING = 1 << 3;
        /// Texture can be used as a render attachment.
        const RENDER_ATTACHMENT = 1 << 4;
    }
}

impl Default for TextureUsage {
    fn default() -> Self {
        Self::empty()
    }
}

/// Descriptor for creating a texture.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TextureDescriptor {
    /// Debug label for the texture.
    pub label: Option<String>,
    /// Size of the texture.
    pub size: Extent3d,
    /// Mip level count.
    pub mip_level_count: u32,
    /// Sample count for multisampling.
    pub sample_count: u32,
    /// Texture dimensionality.
    pub dimension: TextureDimension,
    /// Texture format.
    pub format: TextureFormat,
    /// Usage flags.
    pub usage: TextureUsage,
}

impl TextureDescriptor {
    /// Create a new 2D texture descriptor.
    pub fn new_2d(width: u32, height: u32, format: TextureFormat, usage: TextureUsage) -> Self {
        Self {
            label: None,
            size: Extent3d::new_2d(width, height),
            mip_level_count: 1,
            sample_count: 1,
            dimension: TextureDimension::D2,
            format,
            usage,
        }
    }

    /// Set the debug label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Set the sample count for multisampling.
    pub fn with_sample_count(mut self, count: u32) -> Self {
        self.sample_count = count;
        self
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.size.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.size.height
    }

    /// Returns true if an allocation made for `self` can serve `other`.
    ///
    /// Labels are debug-only and do not force a reallocation.
    pub fn matches_allocation(&self, other: &TextureDescriptor) -> bool {
        self.size == other.size
            && self.mip_level_count == other.mip_level_count
            && self.sample_count == other.sample_count
            && self.dimension == other.dimension
            && self.format == other.format
            && self.usage == other.usage
    }
}

impl Default for TextureDescriptor {
    fn default() -> Self {
        Self {
            label: None,
            size: Extent3d::default(),
            mip_level_count: 1,
            sample_count: 1,
            dimension: TextureDimension::D2,
            format: TextureFormat::default(),
            usage: TextureUsage::empty(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_depth_formats() {
        assert!(TextureFormat::Depth32Float.is_depth_stencil());
        assert!(!TextureFormat::Depth32Float.has_stencil());
        assert!(TextureFormat::Depth24PlusStencil8.has_stencil());
        assert!(!TextureFormat::Rgba16Float.is_depth_stencil());
    }

    #[test]
    fn test_matches_allocation_ignores_label() {
        let a = TextureDescriptor::new_2d(
            1920,
            1080,
            TextureFormat::Rg11b10Float,
            TextureUsage::RENDER_ATTACHMENT,
        )
        .with_label("camera_color_a");
        let b = a.clone().with_label("camera_color_b");
        assert!(a.matches_allocation(&b));

        let resized = TextureDescriptor {
            size: Extent3d::new_2d(1280, 720),
            ..a.clone()
        };
        assert!(!a.matches_allocation(&resized));

        let msaa = a.clone().with_sample_count(4);
        assert!(!a.matches_allocation(&msaa));
    }
}
