//! GPU-global bindings shared by every pass.
//!
//! The frame core never binds resources per pass. It writes named global
//! textures, light data and feature keywords here, and every shader variant
//! reads whatever it declared. On a real device this maps to a global bind
//! group; in tests it is inspected directly.

use std::collections::HashMap;

use bitflags::bitflags;
use glam::Vec4;

use crate::backend::TextureHandle;
use crate::lighting::{ClusterParams, LightRecord};

bitflags! {
    /// Shader variant toggles.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ShaderKeywords: u32 {
        const MAIN_LIGHT = 1 << 0;
        const MAIN_LIGHT_SHADOWS = 1 << 1;
        const ADDITIONAL_LIGHTS = 1 << 2;
        const ADDITIONAL_LIGHTS_VERTEX = 1 << 3;
        const FORWARD_PLUS = 1 << 4;
        const LIGHT_LAYERS = 1 << 5;
        const SOFT_SHADOWS = 1 << 6;
        const DEPTH_PRIMING = 1 << 7;
        const DEFERRED = 1 << 8;
    }
}

/// Named global texture binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GlobalTexture {
    /// Current color write target.
    CameraColor,
    /// Sampled depth texture.
    CameraDepth,
    /// View-space normals.
    CameraNormals,
    /// Opaque color copy.
    CameraOpaque,
    /// Motion vectors.
    MotionVectors,
}

/// Main light slot.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MainLightData {
    /// Direction towards the light (`w = 0`).
    pub position: Vec4,
    /// Color, alpha carries the subtractive lighting flag.
    pub color: Vec4,
    /// Baked occlusion channel selector.
    pub occlusion_probe_channels: Vec4,
    /// Rendering layer mask.
    pub layer_mask: u32,
}

/// Additional lights as fixed-size parallel vector arrays.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AdditionalLightArrays {
    /// Number of valid entries.
    pub count: usize,
    pub positions: Vec<Vec4>,
    pub colors: Vec<Vec4>,
    pub attenuations: Vec<Vec4>,
    pub spot_directions: Vec<Vec4>,
    pub occlusion_probe_channels: Vec<Vec4>,
    pub layer_masks: Vec<u32>,
    /// Per-object indices, `per_object_stride` entries per object, padded with -1.
    pub per_object_indices: Vec<i32>,
    /// Slots per object in `per_object_indices`.
    pub per_object_stride: usize,
}

/// Additional lights as a structured record buffer.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StructuredLightBuffer {
    /// Number of valid records.
    pub count: usize,
    /// Packed records, uploaded as raw bytes.
    pub records: Vec<LightRecord>,
    /// Flat per-object light index list.
    pub light_indices: Vec<i32>,
    /// Per-object `(offset, count)` into `light_indices`.
    pub object_ranges: Vec<(u32, u32)>,
}

impl StructuredLightBuffer {
    /// Record data as uploaded to the GPU.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.records)
    }
}

/// Additional light binding, in the representation chosen at startup.
#[derive(Debug, Clone, PartialEq)]
pub enum AdditionalLightBinding {
    Arrays(AdditionalLightArrays),
    Buffer(StructuredLightBuffer),
}

impl AdditionalLightBinding {
    /// Number of packed additional lights.
    pub fn count(&self) -> usize {
        match self {
            Self::Arrays(arrays) => arrays.count,
            Self::Buffer(buffer) => buffer.count,
        }
    }

    /// Light indices visible to one object, in order, excluding -1 padding.
    pub fn object_lights(&self, object: usize) -> Vec<i32> {
        match self {
            Self::Arrays(arrays) => {
                let start = object * arrays.per_object_stride;
                arrays
                    .per_object_indices
                    .get(start..start + arrays.per_object_stride)
                    .unwrap_or(&[])
                    .iter()
                    .copied()
                    .filter(|&index| index >= 0)
                    .collect()
            }
            Self::Buffer(buffer) => match buffer.object_ranges.get(object) {
                Some(&(offset, count)) => buffer
                    .light_indices
                    .get(offset as usize..(offset + count) as usize)
                    .unwrap_or(&[])
                    .iter()
                    .copied()
                    .filter(|&index| index >= 0)
                    .collect(),
                None => Vec::new(),
            },
        }
    }
}

/// Forward+ lookup tables.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ClusterBinding {
    pub z_bins: Vec<u32>,
    pub tiles: Vec<u32>,
    pub params: ClusterParams,
    /// Directional additional lights, packed first and absent from the tables.
    pub directional_light_count: u32,
}

/// Everything bound globally for the current camera.
#[derive(Debug, Default)]
pub struct ShaderGlobals {
    textures: HashMap<GlobalTexture, TextureHandle>,
    main_light: MainLightData,
    main_light_index: Option<usize>,
    additional_lights: Option<AdditionalLightBinding>,
    clusters: Option<ClusterBinding>,
    keywords: ShaderKeywords,
    light_data_ready: bool,
    light_uploads: u64,
}

impl ShaderGlobals {
    /// Create empty globals.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a global texture.
    pub fn set_texture(&mut self, name: GlobalTexture, texture: TextureHandle) {
        self.textures.insert(name, texture);
    }

    /// Unbind a global texture.
    pub fn clear_texture(&mut self, name: GlobalTexture) {
        self.textures.remove(&name);
    }

    /// Texture bound under `name`.
    pub fn texture(&self, name: GlobalTexture) -> Option<TextureHandle> {
        self.textures.get(&name).copied()
    }

    /// Active keywords.
    pub fn keywords(&self) -> ShaderKeywords {
        self.keywords
    }

    /// Enable or disable a keyword.
    pub fn set_keyword(&mut self, keyword: ShaderKeywords, enabled: bool) {
        self.keywords.set(keyword, enabled);
    }

    /// Main light slot.
    pub fn main_light(&self) -> &MainLightData {
        &self.main_light
    }

    /// Index of the main light in the visible light list.
    pub fn main_light_index(&self) -> Option<usize> {
        self.main_light_index
    }

    /// Additional light data.
    pub fn additional_lights(&self) -> Option<&AdditionalLightBinding> {
        self.additional_lights.as_ref()
    }

    /// Forward+ tables.
    pub fn clusters(&self) -> Option<&ClusterBinding> {
        self.clusters.as_ref()
    }

    /// Returns true once light data for the current camera is uploaded.
    pub fn light_data_ready(&self) -> bool {
        self.light_data_ready
    }

    /// Number of light data uploads since creation.
    pub fn light_uploads(&self) -> u64 {
        self.light_uploads
    }

    pub(crate) fn set_main_light(&mut self, index: Option<usize>, data: MainLightData) {
        self.main_light_index = index;
        self.main_light = data;
    }

    pub(crate) fn set_additional_lights(&mut self, binding: Option<AdditionalLightBinding>) {
        self.additional_lights = binding;
    }

    pub(crate) fn set_clusters(&mut self, clusters: Option<ClusterBinding>) {
        self.clusters = clusters;
    }

    /// Invalidate light data before a new camera is prepared.
    pub(crate) fn begin_light_data(&mut self) {
        self.light_data_ready = false;
    }

    /// Mark light data for the current camera as uploaded.
    pub(crate) fn finish_light_data(&mut self) {
        self.light_data_ready = true;
        self.light_uploads += 1;
    }
}
