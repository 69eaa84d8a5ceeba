//! Light data preparation.
//!
//! Culling hands over a list of [`VisibleLight`]s in culling order. From it
//! the [`LightDataPreparer`]:
//!
//! 1. picks the main light ([`select_main_light`])
//! 2. packs the remaining lights into [`LightRecord`]s under the platform
//!    budget, using the [`LightPackingStrategy`] fixed at startup
//! 3. remaps per-object light lists to packed indices
//! 4. in Forward+, fills Z-bin and tile tables on a background job
//!    ([`ClusteringEngine`]) that is joined before any pass reads light data

mod clustering;
mod light;
mod main_light;
mod packing;
mod per_object;
mod preparer;
mod record;

pub use clustering::{
    populate, ClusterCapacity, ClusterJobInput, ClusterLight, ClusterParams, ClusterTables, ClusteringEngine,
    ClusteringJob, MAX_TILE_WORDS, MAX_TILE_WORDS_SMALL, MAX_ZBIN_WORDS,
};
pub use light::{LightBakeInfo, LightId, LightSource, LightType, MixedLightingMode, VisibleLight};
pub use main_light::select_main_light;
pub use packing::{select_packing_strategy, ArrayPacking, LightPackingStrategy, PackingKind, StructuredBufferPacking};
pub use per_object::{light_index_map, remap_object_lights, PerObjectLightMap};
pub use preparer::{LightDataPreparer, LightingInputs};
pub use record::LightRecord;
