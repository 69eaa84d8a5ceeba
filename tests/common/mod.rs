//! Shared fixtures for frame orchestration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use glam::Vec3;
use redlilium_frame::lighting::{LightSource, PerObjectLightMap};
use redlilium_frame::settings::PlatformCapabilities;
use redlilium_frame::{
    CameraSource, DummyBackend, FrameOrchestrator, FrameResult, LightingInputs, PassExecuteContext, PassInput,
    PipelineContext, PipelineSettings, RenderPass, RenderPassEvent, VisibleLight,
};

/// Install a test logger once.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Settings with nothing forcing an intermediate target.
pub fn plain_settings() -> PipelineSettings {
    PipelineSettings {
        hdr: false,
        main_light_shadows: false,
        ..Default::default()
    }
}

pub fn orchestrator(settings: PipelineSettings, caps: PlatformCapabilities) -> FrameOrchestrator<DummyBackend> {
    init_logging();
    FrameOrchestrator::new(DummyBackend::new(), PipelineContext::new(settings, caps))
}

pub fn camera(name: &str) -> CameraSource {
    CameraSource::perspective(name, Vec3::new(0.0, 1.0, 5.0), Default::default())
}

// ============================================================================
// Lights
// ============================================================================

pub fn directional(id: u64, intensity: f32) -> VisibleLight {
    VisibleLight::directional(Vec3::new(0.3, -1.0, 0.2), Vec3::ONE, Some(LightSource::new(id, intensity)))
}

pub fn point(id: u64, position: Vec3, range: f32) -> VisibleLight {
    VisibleLight::point(position, range, Vec3::ONE, Some(LightSource::new(id, 1.0)))
}

/// `count` lights in front of the camera; index 12 is a directional light
/// of intensity 5.0, every other directional light is at most 4.9.
pub fn crowded_scene(count: usize) -> Vec<VisibleLight> {
    (0..count)
        .map(|index| {
            let id = index as u64 + 1;
            if index == 12 {
                directional(id, 5.0)
            } else if index % 10 == 3 {
                directional(id, 4.9 - (index as f32) * 0.001)
            } else {
                let x = (index % 20) as f32 - 10.0;
                let z = -2.0 - (index / 20) as f32;
                point(id, Vec3::new(x, 0.0, z), 1.5)
            }
        })
        .collect()
}

pub fn inputs(lights: Vec<VisibleLight>) -> LightingInputs {
    let objects = vec![(0..lights.len().min(6)).collect()];
    LightingInputs {
        visible_lights: lights,
        sun: None,
        per_object: PerObjectLightMap::new(objects),
    }
}

// ============================================================================
// Probe passes
// ============================================================================

/// What a probe saw when it executed.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeRecord {
    pub name: String,
    pub light_data_ready: bool,
    pub clusters_bound: bool,
}

pub type ProbeLog = Arc<Mutex<Vec<ProbeRecord>>>;

/// A pass that records the light data state it observes.
pub struct ProbePass {
    pub name: String,
    pub event: RenderPassEvent,
    pub input: PassInput,
    pub reads_lights: bool,
    pub log: ProbeLog,
}

impl ProbePass {
    pub fn new(name: &str, event: RenderPassEvent, log: &ProbeLog) -> Self {
        Self {
            name: name.to_string(),
            event,
            input: PassInput::empty(),
            reads_lights: false,
            log: Arc::clone(log),
        }
    }

    pub fn reading_lights(mut self) -> Self {
        self.reads_lights = true;
        self
    }

    pub fn with_input(mut self, input: PassInput) -> Self {
        self.input = input;
        self
    }
}

impl RenderPass for ProbePass {
    fn name(&self) -> &str {
        &self.name
    }

    fn event(&self) -> RenderPassEvent {
        self.event
    }

    fn input(&self) -> PassInput {
        self.input
    }

    fn reads_light_data(&self) -> bool {
        self.reads_lights
    }

    fn execute(&self, ctx: &mut PassExecuteContext<'_>) -> FrameResult<()> {
        let record = ProbeRecord {
            name: self.name.clone(),
            light_data_ready: ctx.globals().light_data_ready(),
            clusters_bound: ctx.globals().clusters().is_some(),
        };
        if let Ok(mut log) = self.log.lock() {
            log.push(record);
        }
        Ok(())
    }
}

pub fn probe_log() -> ProbeLog {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn records(log: &ProbeLog) -> Vec<ProbeRecord> {
    log.lock().map(|log| log.clone()).unwrap_or_default()
}
