//! Main light selection.

use crate::settings::MainLightMode;

use super::{LightId, VisibleLight};

/// Pick the light that gets the main light slot.
///
/// Returns `None` (the GPU side stores -1) when there are no visible lights
/// or main lights are disabled. Lights are scanned in culling order and the
/// scan stops at the first light without a source, since culling places
/// synthetic lights last. The `sun` wins as soon as it is met as a
/// directional light; otherwise the brightest directional light is used,
/// with ties going to the earliest one.
pub fn select_main_light(
    lights: &[VisibleLight],
    sun: Option<LightId>,
    mode: MainLightMode,
) -> Option<usize> {
    if lights.is_empty() || mode != MainLightMode::PerPixel {
        return None;
    }

    let mut brightest: Option<usize> = None;
    let mut brightest_intensity = 0.0f32;

    for (index, light) in lights.iter().enumerate() {
        let Some(source) = light.source else {
            break;
        };
        if !light.is_directional() {
            continue;
        }
        if sun == Some(source.id) {
            return Some(index);
        }
        if source.intensity > brightest_intensity {
            brightest_intensity = source.intensity;
            brightest = Some(index);
        }
    }

    brightest
}
