//! Per-camera light data preparation.

use crate::camera::CameraFrameConfig;
use crate::error::{FrameError, FrameResult};
use crate::globals::{ClusterBinding, MainLightData, ShaderGlobals, ShaderKeywords};
use crate::settings::{AdditionalLightsMode, MainLightMode, PipelineContext, RenderingMode};

use super::{
    light_index_map, remap_object_lights, select_main_light, select_packing_strategy, ClusterJobInput,
    ClusterLight, ClusteringEngine, LightId, LightPackingStrategy, LightRecord, PackingKind,
    PerObjectLightMap, VisibleLight,
};

/// Culling output for one camera.
#[derive(Debug, Clone, Default)]
pub struct LightingInputs {
    /// Visible lights in culling order.
    pub visible_lights: Vec<VisibleLight>,
    /// Designated sun light.
    pub sun: Option<LightId>,
    /// Lights touching each visible object.
    pub per_object: PerObjectLightMap,
}

/// Light data computed in [`LightDataPreparer::pre_setup`], uploaded in
/// [`LightDataPreparer::setup`].
#[derive(Debug)]
struct PreparedLights {
    main_index: Option<usize>,
    main: MainLightData,
    records: Vec<LightRecord>,
    per_object: Vec<Vec<i32>>,
    directional_count: u32,
    clustered: bool,
    additional_mode: AdditionalLightsMode,
}

/// Selects the main light, packs additional lights and drives clustering.
///
/// Work is split in two steps around pass recording:
///
/// 1. [`pre_setup`](Self::pre_setup) right after culling: packs records and,
///    in Forward+, schedules the clustering job.
/// 2. [`setup`](Self::setup) before the first pass reading light data:
///    joins the job and writes everything into [`ShaderGlobals`].
#[derive(Debug)]
pub struct LightDataPreparer {
    budget: usize,
    per_object_limit: usize,
    strategy: Box<dyn LightPackingStrategy>,
    clustering: Option<ClusteringEngine>,
    prepared: Option<PreparedLights>,
}

impl LightDataPreparer {
    /// Create a preparer for the platform in `context`.
    ///
    /// The packing strategy and the clustering tables are fixed here.
    pub fn new(context: &PipelineContext) -> Self {
        let budget = context.light_budget();
        let per_object_limit = context.per_object_light_limit();
        let clustering = context
            .capabilities()
            .clustering
            .then(|| ClusteringEngine::new(budget));
        Self {
            budget,
            per_object_limit,
            strategy: select_packing_strategy(context.capabilities(), per_object_limit),
            clustering,
            prepared: None,
        }
    }

    /// Additional light budget.
    pub fn budget(&self) -> usize {
        self.budget
    }

    /// Packing representation chosen at construction.
    pub fn packing_kind(&self) -> PackingKind {
        self.strategy.kind()
    }

    /// Clustering engine, when the platform supports it.
    pub fn clustering(&self) -> Option<&ClusteringEngine> {
        self.clustering.as_ref()
    }

    /// Returns true if a clustering job is running.
    pub fn is_pending(&self) -> bool {
        self.clustering
            .as_ref()
            .is_some_and(ClusteringEngine::is_pending)
    }

    /// Returns true if light data was prepared and not yet uploaded.
    pub fn has_prepared(&self) -> bool {
        self.prepared.is_some()
    }

    /// Main light chosen by the last [`pre_setup`](Self::pre_setup), until uploaded.
    pub fn prepared_main_light(&self) -> Option<usize> {
        self.prepared.as_ref().and_then(|prepared| prepared.main_index)
    }

    /// Main light index for `lights`.
    pub fn select_main_light(
        &self,
        lights: &[VisibleLight],
        sun: Option<LightId>,
        mode: MainLightMode,
    ) -> Option<usize> {
        select_main_light(lights, sun, mode)
    }

    /// Visible light indices that become additional lights, in order.
    ///
    /// Skips the main light and stops at the budget; the rest are dropped.
    pub fn additional_light_indices(&self, lights: &[VisibleLight], main_index: Option<usize>) -> Vec<usize> {
        (0..lights.len())
            .filter(|&index| Some(index) != main_index)
            .take(self.budget)
            .collect()
    }

    /// Pack the additional lights.
    pub fn pack_additional_lights(&self, lights: &[VisibleLight], main_index: Option<usize>) -> Vec<LightRecord> {
        self.additional_light_indices(lights, main_index)
            .into_iter()
            .map(|index| LightRecord::from_visible(&lights[index]))
            .collect()
    }

    /// Prepare light data for `camera` and start clustering.
    pub fn pre_setup(
        &mut self,
        context: &PipelineContext,
        camera: &CameraFrameConfig,
        inputs: &LightingInputs,
    ) -> FrameResult<()> {
        let settings = context.settings();
        let lights = &inputs.visible_lights;

        let main_index = self.select_main_light(lights, inputs.sun, settings.main_light_mode);
        let main = match main_index {
            Some(index) => {
                let record = LightRecord::from_visible(&lights[index]);
                MainLightData {
                    position: record.position,
                    color: record.color,
                    occlusion_probe_channels: record.occlusion_probe_channels,
                    layer_mask: record.layer_mask,
                }
            }
            None => MainLightData::default(),
        };

        let forward_plus = camera.rendering_mode == RenderingMode::ForwardPlus;
        let clustered = forward_plus && self.clustering.is_some();
        let additional_mode = if forward_plus && settings.additional_lights_mode == AdditionalLightsMode::PerVertex {
            AdditionalLightsMode::PerPixel
        } else {
            settings.additional_lights_mode
        };

        let mut indices = match additional_mode {
            AdditionalLightsMode::Disabled => Vec::new(),
            _ => self.additional_light_indices(lights, main_index),
        };
        let candidates = lights.len() - usize::from(main_index.is_some());
        if additional_mode != AdditionalLightsMode::Disabled && indices.len() < candidates {
            log::warn!(
                "{} additional lights exceed the budget of {}, {} dropped",
                candidates,
                self.budget,
                candidates - indices.len()
            );
        }

        // Forward+ packs directional lights first; they light every cluster
        // and are left out of the tables.
        let mut directional_count = 0;
        if clustered {
            indices.sort_by_key(|&index| !lights[index].is_directional());
            directional_count = indices
                .iter()
                .take_while(|&&index| lights[index].is_directional())
                .count() as u32;
        }

        let records: Vec<LightRecord> = indices
            .iter()
            .map(|&index| LightRecord::from_visible(&lights[index]))
            .collect();

        let per_object = if clustered || additional_mode == AdditionalLightsMode::Disabled {
            Vec::new()
        } else {
            let index_map = light_index_map(lights.len(), main_index, self.budget);
            remap_object_lights(&inputs.per_object, &index_map, self.per_object_limit)
        };

        if clustered {
            let (width, height) = camera.scaled_size();
            let job = ClusterJobInput {
                lights: indices[directional_count as usize..]
                    .iter()
                    .map(|&index| ClusterLight::from(&lights[index]))
                    .collect(),
                world_to_view: camera.world_to_view,
                projection: camera.projection,
                near: camera.near,
                far: camera.far,
                viewport_width: width,
                viewport_height: height,
                remap: settings.clustering.z_bin_remap,
                min_tile_size: settings.clustering.min_tile_size,
            };
            if let Some(engine) = self.clustering.as_mut() {
                engine.schedule(job)?;
            }
        }

        log::debug!(
            "Camera '{}': main light {:?}, {} additional lights{}",
            camera.name,
            main_index,
            records.len(),
            if clustered { " (clustered)" } else { "" }
        );

        self.prepared = Some(PreparedLights {
            main_index,
            main,
            records,
            per_object,
            directional_count,
            clustered,
            additional_mode,
        });
        Ok(())
    }

    /// Join clustering and upload prepared light data into `globals`.
    pub fn setup(&mut self, context: &PipelineContext, globals: &mut ShaderGlobals) -> FrameResult<()> {
        let Some(prepared) = self.prepared.take() else {
            return Err(FrameError::InvalidParameter(
                "light data uploaded before it was prepared".to_string(),
            ));
        };
        let settings = context.settings();

        let clusters = match (&mut self.clustering, prepared.clustered) {
            (Some(engine), true) => {
                let tables = engine.join()?;
                Some(ClusterBinding {
                    z_bins: tables.z_bins().to_vec(),
                    tiles: tables.tiles().to_vec(),
                    params: *tables.params(),
                    directional_light_count: prepared.directional_count,
                })
            }
            _ => None,
        };

        let additional = match prepared.additional_mode {
            AdditionalLightsMode::Disabled => None,
            _ => Some(self.strategy.pack(&prepared.records, &prepared.per_object)),
        };
        let count = prepared.records.len();
        let has_main = prepared.main_index.is_some();
        let shadows = has_main && settings.main_light_shadows;

        globals.set_main_light(prepared.main_index, prepared.main);
        globals.set_additional_lights(additional);
        globals.set_clusters(clusters);

        globals.set_keyword(ShaderKeywords::MAIN_LIGHT, has_main);
        globals.set_keyword(ShaderKeywords::MAIN_LIGHT_SHADOWS, shadows);
        globals.set_keyword(
            ShaderKeywords::ADDITIONAL_LIGHTS,
            prepared.additional_mode == AdditionalLightsMode::PerPixel && (count > 0 || prepared.clustered),
        );
        globals.set_keyword(
            ShaderKeywords::ADDITIONAL_LIGHTS_VERTEX,
            prepared.additional_mode == AdditionalLightsMode::PerVertex && count > 0,
        );
        globals.set_keyword(ShaderKeywords::FORWARD_PLUS, prepared.clustered);
        globals.set_keyword(ShaderKeywords::LIGHT_LAYERS, settings.light_layers);
        globals.set_keyword(ShaderKeywords::SOFT_SHADOWS, shadows && settings.soft_shadows);
        globals.finish_light_data();

        log::trace!("Light data uploaded ({} records)", count);
        Ok(())
    }

    /// Join any pending job and release the cluster tables.
    pub fn shutdown(&mut self) {
        self.prepared = None;
        if let Some(engine) = self.clustering.as_mut() {
            engine.shutdown();
        }
    }
}
