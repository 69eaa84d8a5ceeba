//! Per-object light index remapping.

/// Lights touching each visible object, as indices into the visible light
/// list, produced by culling.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PerObjectLightMap {
    pub objects: Vec<Vec<usize>>,
}

impl PerObjectLightMap {
    /// Create from per-object visible light lists.
    pub fn new(objects: Vec<Vec<usize>>) -> Self {
        Self { objects }
    }

    /// Number of objects.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Returns true if there are no objects.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

/// Map from visible light index to packed additional light index.
///
/// The main light and every light past the budget map to -1; lights after
/// the main light shift down by one.
pub fn light_index_map(visible_count: usize, main_index: Option<usize>, budget: usize) -> Vec<i32> {
    let mut next = 0usize;
    (0..visible_count)
        .map(|index| {
            if Some(index) == main_index || next >= budget {
                -1
            } else {
                next += 1;
                (next - 1) as i32
            }
        })
        .collect()
}

/// Remap every object's light list through `index_map`.
///
/// Each object keeps at most `per_object_limit` entries. References to
/// dropped lights become -1 and stay in place.
pub fn remap_object_lights(
    map: &PerObjectLightMap,
    index_map: &[i32],
    per_object_limit: usize,
) -> Vec<Vec<i32>> {
    map.objects
        .iter()
        .map(|lights| {
            lights
                .iter()
                .take(per_object_limit)
                .map(|&visible| index_map.get(visible).copied().unwrap_or(-1))
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_map_skips_main() {
        assert_eq!(light_index_map(5, Some(1), 10), vec![0, -1, 1, 2, 3]);
        assert_eq!(light_index_map(3, None, 10), vec![0, 1, 2]);
    }

    #[test]
    fn test_index_map_clamps_to_budget() {
        assert_eq!(light_index_map(6, Some(0), 3), vec![-1, 0, 1, 2, -1, -1]);
    }

    #[test]
    fn test_remap_marks_dropped_lights() {
        let index_map = light_index_map(6, Some(0), 3);
        let map = PerObjectLightMap::new(vec![vec![1, 4, 2], vec![0], vec![]]);
        let remapped = remap_object_lights(&map, &index_map, 8);
        assert_eq!(remapped, vec![vec![0, -1, 1], vec![-1], vec![]]);
    }

    #[test]
    fn test_remap_respects_per_object_limit() {
        let index_map = light_index_map(6, None, 16);
        let map = PerObjectLightMap::new(vec![vec![0, 1, 2, 3, 4, 5]]);
        let remapped = remap_object_lights(&map, &index_map, 4);
        assert_eq!(remapped, vec![vec![0, 1, 2, 3]]);
    }
}
