//! Additional light packing strategies.
//!
//! Two representations exist and a platform uses exactly one for its whole
//! lifetime:
//!
//! | Strategy | Light data | Per-object indices |
//! |----------|-----------|--------------------|
//! | [`ArrayPacking`] | fixed-size parallel `vec4` arrays | fixed slots per object, -1 padded |
//! | [`StructuredBufferPacking`] | [`LightRecord`] buffer | flat list + `(offset, count)` per object |
//!
//! Both resolve to the same light for every index and the same light set
//! for every object.

use glam::Vec4;

use crate::globals::{AdditionalLightArrays, AdditionalLightBinding, StructuredLightBuffer};
use crate::settings::PlatformCapabilities;

use super::LightRecord;

/// Representation produced by a strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PackingKind {
    Arrays,
    StructuredBuffer,
}

/// Converts packed records into a global binding.
pub trait LightPackingStrategy: Send + std::fmt::Debug {
    /// Representation this strategy produces.
    fn kind(&self) -> PackingKind;

    /// Build the binding for `records` and remapped per-object indices.
    fn pack(&self, records: &[LightRecord], per_object: &[Vec<i32>]) -> AdditionalLightBinding;
}

/// Choose the strategy for a platform.
pub fn select_packing_strategy(
    capabilities: &PlatformCapabilities,
    per_object_limit: usize,
) -> Box<dyn LightPackingStrategy> {
    if capabilities.structured_buffers {
        log::debug!("Additional lights packed into a structured buffer");
        Box::new(StructuredBufferPacking)
    } else {
        let capacity = capabilities.max_visible_additional_lights();
        log::debug!(
            "Additional lights packed into {} vec4 arrays, {} per object",
            capacity,
            per_object_limit
        );
        Box::new(ArrayPacking::new(capacity, per_object_limit))
    }
}

/// Fixed-size vector arrays.
#[derive(Debug, Clone, Copy)]
pub struct ArrayPacking {
    capacity: usize,
    per_object_stride: usize,
}

impl ArrayPacking {
    /// Arrays holding `capacity` lights and `per_object_stride` lights per object.
    pub fn new(capacity: usize, per_object_stride: usize) -> Self {
        Self {
            capacity,
            per_object_stride,
        }
    }
}

impl LightPackingStrategy for ArrayPacking {
    fn kind(&self) -> PackingKind {
        PackingKind::Arrays
    }

    fn pack(&self, records: &[LightRecord], per_object: &[Vec<i32>]) -> AdditionalLightBinding {
        let count = records.len().min(self.capacity);
        let column = |field: fn(&LightRecord) -> Vec4| -> Vec<Vec4> {
            let mut values: Vec<Vec4> = records[..count].iter().map(field).collect();
            values.resize(self.capacity, Vec4::ZERO);
            values
        };

        let mut layer_masks: Vec<u32> = records[..count].iter().map(|r| r.layer_mask).collect();
        layer_masks.resize(self.capacity, 0);

        let mut per_object_indices = Vec::with_capacity(per_object.len() * self.per_object_stride);
        for lights in per_object {
            let start = per_object_indices.len();
            per_object_indices.extend(lights.iter().take(self.per_object_stride));
            per_object_indices.resize(start + self.per_object_stride, -1);
        }

        AdditionalLightBinding::Arrays(AdditionalLightArrays {
            count,
            positions: column(|r| r.position),
            colors: column(|r| r.color),
            attenuations: column(|r| r.attenuation),
            spot_directions: column(|r| r.spot_direction),
            occlusion_probe_channels: column(|r| r.occlusion_probe_channels),
            layer_masks,
            per_object_indices,
            per_object_stride: self.per_object_stride,
        })
    }
}

/// Structured record buffer with a separate index buffer.
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuredBufferPacking;

impl LightPackingStrategy for StructuredBufferPacking {
    fn kind(&self) -> PackingKind {
        PackingKind::StructuredBuffer
    }

    fn pack(&self, records: &[LightRecord], per_object: &[Vec<i32>]) -> AdditionalLightBinding {
        let mut light_indices = Vec::new();
        let mut object_ranges = Vec::with_capacity(per_object.len());
        for lights in per_object {
            object_ranges.push((light_indices.len() as u32, lights.len() as u32));
            light_indices.extend_from_slice(lights);
        }

        AdditionalLightBinding::Buffer(StructuredLightBuffer {
            count: records.len(),
            records: records.to_vec(),
            light_indices,
            object_ranges,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lighting::VisibleLight;
    use glam::Vec3;

    fn records(count: usize) -> Vec<LightRecord> {
        (0..count)
            .map(|i| {
                LightRecord::from_visible(&VisibleLight::point(
                    Vec3::new(i as f32, 0.0, 0.0),
                    2.0 + i as f32,
                    Vec3::ONE,
                    None,
                ))
            })
            .collect()
    }

    #[test]
    fn test_strategy_chosen_by_capability() {
        let mut caps = PlatformCapabilities::desktop();
        assert_eq!(select_packing_strategy(&caps, 8).kind(), PackingKind::StructuredBuffer);
        caps.structured_buffers = false;
        assert_eq!(select_packing_strategy(&caps, 8).kind(), PackingKind::Arrays);
    }

    #[test]
    fn test_arrays_are_fixed_size() {
        let binding = ArrayPacking::new(16, 4).pack(&records(3), &[vec![0, 2]]);
        let AdditionalLightBinding::Arrays(arrays) = binding else {
            panic!("expected arrays");
        };
        assert_eq!(arrays.count, 3);
        assert_eq!(arrays.positions.len(), 16);
        assert_eq!(arrays.positions[3], Vec4::ZERO);
        assert_eq!(arrays.per_object_indices, vec![0, 2, -1, -1]);
    }

    #[test]
    fn test_both_strategies_agree() {
        let records = records(5);
        let per_object = vec![vec![0, 4, -1], vec![], vec![3, 1]];

        let arrays = ArrayPacking::new(8, 4).pack(&records, &per_object);
        let buffer = StructuredBufferPacking.pack(&records, &per_object);

        assert_eq!(arrays.count(), buffer.count());
        for object in 0..per_object.len() {
            assert_eq!(arrays.object_lights(object), buffer.object_lights(object));
        }

        let (AdditionalLightBinding::Arrays(arrays), AdditionalLightBinding::Buffer(buffer)) =
            (arrays, buffer)
        else {
            panic!("unexpected binding kinds");
        };
        for (index, record) in buffer.records.iter().enumerate() {
            assert_eq!(arrays.positions[index], record.position);
            assert_eq!(arrays.colors[index], record.color);
            assert_eq!(arrays.attenuations[index], record.attenuation);
            assert_eq!(arrays.spot_directions[index], record.spot_direction);
            assert_eq!(arrays.layer_masks[index], record.layer_mask);
        }
        assert_eq!(buffer.as_bytes().len(), 5 * std::mem::size_of::<LightRecord>());
    }
}
