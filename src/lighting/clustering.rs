//! Forward+ light clustering.
//!
//! The view volume is indexed twice:
//!
//! - **Z-bins** slice the camera depth range (after a logarithmic or linear
//!   remap). Each bin is one header word followed by `words_per_tile` mask
//!   words. The header packs the lowest and highest light index present
//!   (`min | max << 16`, `0x0000FFFF` when empty).
//! - **Tiles** cut the viewport into square screen tiles, each holding
//!   `words_per_tile` mask words.
//!
//! A shader finds the lights affecting a pixel by AND-ing the masks of its
//! Z-bin and its tile.
//!
//! # Jobs
//!
//! Tables are filled on a background thread scheduled right after culling.
//! The tables are moved into the job and only come back through
//! [`ClusteringEngine::join`], so nothing can read them while the job runs.
//! Inside the job, Z-bins and tiles are filled in parallel on a scoped
//! thread since they write disjoint tables.

use std::thread::JoinHandle;

use glam::{Mat4, Vec2, Vec3, Vec4, Vec4Swizzles};

use crate::error::{FrameError, FrameResult};
use crate::settings::ZBinRemap;

use super::{LightType, VisibleLight};

/// Word capacity of the Z-bin table.
pub const MAX_ZBIN_WORDS: usize = 4096;

/// Word capacity of the tile table for light budgets up to 32.
pub const MAX_TILE_WORDS_SMALL: usize = 4096;

/// Word capacity of the tile table for larger light budgets.
pub const MAX_TILE_WORDS: usize = 16384;

const EMPTY_HEADER: u32 = 0x0000_FFFF;

/// Largest cone half-angle used for bounds, in degrees.
const MAX_HALF_ANGLE: f32 = 89.0;

// ============================================================================
// Capacity and parameters
// ============================================================================

/// Table sizes derived once from the light budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClusterCapacity {
    pub words_per_tile: usize,
    pub z_bin_words: usize,
    pub tile_words: usize,
}

impl ClusterCapacity {
    /// Capacity for a platform light budget.
    pub fn for_budget(budget: usize) -> Self {
        let words_per_tile = budget.div_ceil(32).max(1);
        Self {
            words_per_tile,
            z_bin_words: MAX_ZBIN_WORDS,
            tile_words: if budget <= 32 {
                MAX_TILE_WORDS_SMALL
            } else {
                MAX_TILE_WORDS
            },
        }
    }

    /// Most lights the masks can index.
    pub fn max_lights(&self) -> usize {
        self.words_per_tile * 32
    }

    /// Words per Z-bin, header included.
    pub fn z_bin_stride(&self) -> usize {
        1 + self.words_per_tile
    }

    /// Number of Z-bins.
    pub fn z_bin_count(&self) -> usize {
        self.z_bin_words / self.z_bin_stride()
    }
}

/// Shader-side parameters for reading the tables.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ClusterParams {
    pub words_per_tile: u32,
    pub z_bin_count: u32,
    /// `bin = floor(remap(depth) * scale + offset)`.
    pub z_bin_scale: f32,
    pub z_bin_offset: f32,
    pub remap: ZBinRemap,
    pub tile_size: u32,
    pub tile_count_x: u32,
    pub tile_count_y: u32,
    /// Lights present in the tables.
    pub light_count: u32,
}

impl ClusterParams {
    /// Z-bin holding view depth `depth`.
    pub fn z_bin(&self, depth: f32) -> usize {
        let value = match self.remap {
            ZBinRemap::Logarithmic => depth.max(f32::MIN_POSITIVE).log2(),
            ZBinRemap::Linear => depth,
        };
        let bin = (value * self.z_bin_scale + self.z_bin_offset).floor();
        (bin.max(0.0) as usize).min(self.z_bin_count.saturating_sub(1) as usize)
    }
}

// ============================================================================
// Tables
// ============================================================================

/// Persistent Z-bin and tile tables.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterTables {
    capacity: ClusterCapacity,
    z_bins: Vec<u32>,
    tiles: Vec<u32>,
    params: ClusterParams,
}

impl ClusterTables {
    /// Allocate tables of fixed capacity.
    pub fn new(capacity: ClusterCapacity) -> Self {
        Self {
            capacity,
            z_bins: vec![0; capacity.z_bin_words],
            tiles: vec![0; capacity.tile_words],
            params: ClusterParams::default(),
        }
    }

    pub fn capacity(&self) -> ClusterCapacity {
        self.capacity
    }

    pub fn params(&self) -> &ClusterParams {
        &self.params
    }

    /// Raw Z-bin words.
    pub fn z_bins(&self) -> &[u32] {
        &self.z_bins
    }

    /// Raw tile words.
    pub fn tiles(&self) -> &[u32] {
        &self.tiles
    }

    /// `(min, max)` light index in a Z-bin, or `None` if it is empty.
    pub fn z_bin_range(&self, bin: usize) -> Option<(u32, u32)> {
        let header = *self.z_bins.get(bin * self.capacity.z_bin_stride())?;
        (header != EMPTY_HEADER).then_some((header & 0xFFFF, header >> 16))
    }

    /// Returns true if `light` overlaps Z-bin `bin`.
    pub fn z_bin_contains(&self, bin: usize, light: usize) -> bool {
        let word = bin * self.capacity.z_bin_stride() + 1 + light / 32;
        self.z_bins
            .get(word)
            .is_some_and(|mask| mask & (1 << (light % 32)) != 0)
    }

    /// Returns true if `light` overlaps tile `(x, y)`, counted from the bottom left.
    pub fn tile_contains(&self, x: usize, y: usize, light: usize) -> bool {
        let tile = y * self.params.tile_count_x as usize + x;
        let word = tile * self.capacity.words_per_tile + light / 32;
        self.tiles
            .get(word)
            .is_some_and(|mask| mask & (1 << (light % 32)) != 0)
    }
}

// ============================================================================
// Job input
// ============================================================================

/// A punctual light as seen by clustering.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusterLight {
    pub light_type: LightType,
    pub position: Vec3,
    pub forward: Vec3,
    pub range: f32,
    /// Outer cone angle in degrees.
    pub spot_angle: f32,
}

impl From<&VisibleLight> for ClusterLight {
    fn from(light: &VisibleLight) -> Self {
        Self {
            light_type: light.light_type,
            position: light.position(),
            forward: light.forward(),
            range: light.range,
            spot_angle: light.spot_angle,
        }
    }
}

/// Everything a clustering job needs, owned so it can cross threads.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterJobInput {
    /// Punctual additional lights in packed order.
    pub lights: Vec<ClusterLight>,
    pub world_to_view: Mat4,
    pub projection: Mat4,
    pub near: f32,
    pub far: f32,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub remap: ZBinRemap,
    pub min_tile_size: u32,
}

impl ClusterJobInput {
    fn validate(&self) -> FrameResult<()> {
        if !(self.near > 0.0 && self.near < self.far) {
            return Err(FrameError::InvalidParameter(format!(
                "clustering needs 0 < near < far, got {}..{}",
                self.near, self.far
            )));
        }
        if self.viewport_width == 0 || self.viewport_height == 0 {
            return Err(FrameError::InvalidParameter(
                "clustering viewport is empty".to_string(),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// Population
// ============================================================================

#[derive(Debug, Clone, Copy)]
struct LightBounds {
    first_bin: usize,
    last_bin: usize,
    /// Inclusive tile rectangle.
    tiles: [usize; 4],
}

/// Fill `tables` from `input` on the calling thread.
pub fn populate(tables: &mut ClusterTables, input: &ClusterJobInput) {
    let capacity = tables.capacity;
    let params = compute_params(capacity, input);
    tables.params = params;

    let bounds: Vec<Option<LightBounds>> = input
        .lights
        .iter()
        .take(params.light_count as usize)
        .map(|light| light_bounds(light, input, &params))
        .collect();

    let ClusterTables { z_bins, tiles, .. } = tables;
    std::thread::scope(|scope| {
        scope.spawn(|| fill_z_bins(z_bins, &bounds, capacity, &params));
        fill_tiles(tiles, &bounds, capacity, &params);
    });
}

fn compute_params(capacity: ClusterCapacity, input: &ClusterJobInput) -> ClusterParams {
    let words = capacity.words_per_tile;
    let bin_count = capacity.z_bin_count();

    let (scale, offset) = match input.remap {
        ZBinRemap::Logarithmic => {
            let (near, far) = (input.near.log2(), input.far.log2());
            let scale = bin_count as f32 / (far - near);
            (scale, -near * scale)
        }
        ZBinRemap::Linear => {
            let scale = bin_count as f32 / (input.far - input.near);
            (scale, -input.near * scale)
        }
    };

    let mut tile_size = input.min_tile_size.max(1);
    let (tile_count_x, tile_count_y) = loop {
        let x = input.viewport_width.div_ceil(tile_size);
        let y = input.viewport_height.div_ceil(tile_size);
        if (x as usize) * (y as usize) * words <= capacity.tile_words {
            break (x, y);
        }
        tile_size *= 2;
    };

    let light_count = input.lights.len().min(capacity.max_lights());
    if light_count < input.lights.len() {
        log::warn!(
            "Clustering: {} lights exceed table capacity, {} dropped",
            input.lights.len(),
            input.lights.len() - light_count
        );
    }

    ClusterParams {
        words_per_tile: words as u32,
        z_bin_count: bin_count as u32,
        z_bin_scale: scale,
        z_bin_offset: offset,
        remap: input.remap,
        tile_size,
        tile_count_x,
        tile_count_y,
        light_count: light_count as u32,
    }
}

/// View-space AABB of a light.
fn view_aabb(light: &ClusterLight, world_to_view: &Mat4) -> (Vec3, Vec3) {
    let center = world_to_view.transform_point3(light.position);
    let radius = Vec3::splat(light.range);
    let (sphere_min, sphere_max) = (center - radius, center + radius);
    if light.light_type != LightType::Spot {
        return (sphere_min, sphere_max);
    }

    let direction = world_to_view.transform_vector3(light.forward).normalize_or_zero();
    let half_angle = (light.spot_angle * 0.5).clamp(0.0, MAX_HALF_ANGLE).to_radians();
    let base = center + direction * light.range;
    let base_radius = light.range * half_angle.tan();
    let spread = (Vec3::ONE - direction * direction).max(Vec3::ZERO);
    let extent = Vec3::new(spread.x.sqrt(), spread.y.sqrt(), spread.z.sqrt()) * base_radius;
    let cone_min = center.min(base - extent);
    let cone_max = center.max(base + extent);
    (cone_min.max(sphere_min), cone_max.min(sphere_max))
}

fn light_bounds(light: &ClusterLight, input: &ClusterJobInput, params: &ClusterParams) -> Option<LightBounds> {
    let (min, max) = view_aabb(light, &input.world_to_view);

    // View space looks down -Z.
    let nearest = -max.z;
    let farthest = -min.z;
    if farthest < input.near || nearest > input.far {
        return None;
    }
    let first_bin = params.z_bin(nearest.max(input.near));
    let last_bin = params.z_bin(farthest.min(input.far));

    let mut ndc_min = Vec2::splat(f32::MAX);
    let mut ndc_max = Vec2::splat(f32::MIN);
    for corner in 0..8 {
        let point = Vec3::new(
            if corner & 1 == 0 { min.x } else { max.x },
            if corner & 2 == 0 { min.y } else { max.y },
            if corner & 4 == 0 { min.z } else { max.z },
        );
        let clamped_z = point.z.min(-input.near);
        let clip: Vec4 = input.projection * Vec4::new(point.x, point.y, clamped_z, 1.0);
        if clip.w <= 0.0 {
            continue;
        }
        let ndc = clip.xy() / clip.w;
        ndc_min = ndc_min.min(ndc);
        ndc_max = ndc_max.max(ndc);
    }
    if ndc_min.x > 1.0 || ndc_min.y > 1.0 || ndc_max.x < -1.0 || ndc_max.y < -1.0 {
        return None;
    }
    let ndc_min = ndc_min.max(Vec2::NEG_ONE);
    let ndc_max = ndc_max.min(Vec2::ONE);

    let to_tile = |ndc: f32, pixels: u32, count: u32| -> usize {
        let pixel = (ndc * 0.5 + 0.5) * pixels as f32;
        ((pixel / params.tile_size as f32).floor().max(0.0) as usize).min(count as usize - 1)
    };
    let tiles = [
        to_tile(ndc_min.x, input.viewport_width, params.tile_count_x),
        to_tile(ndc_min.y, input.viewport_height, params.tile_count_y),
        to_tile(ndc_max.x, input.viewport_width, params.tile_count_x),
        to_tile(ndc_max.y, input.viewport_height, params.tile_count_y),
    ];

    Some(LightBounds {
        first_bin,
        last_bin,
        tiles,
    })
}

fn fill_z_bins(
    z_bins: &mut [u32],
    bounds: &[Option<LightBounds>],
    capacity: ClusterCapacity,
    params: &ClusterParams,
) {
    let stride = capacity.z_bin_stride();
    z_bins.fill(0);
    for bin in 0..params.z_bin_count as usize {
        z_bins[bin * stride] = EMPTY_HEADER;
    }

    for (light, bounds) in bounds.iter().enumerate() {
        let Some(bounds) = bounds else { continue };
        let light_index = light as u32;
        for bin in bounds.first_bin..=bounds.last_bin {
            let base = bin * stride;
            let header = z_bins[base];
            let (lo, hi) = if header == EMPTY_HEADER {
                (light_index, light_index)
            } else {
                ((header & 0xFFFF).min(light_index), (header >> 16).max(light_index))
            };
            z_bins[base] = lo | (hi << 16);
            z_bins[base + 1 + light / 32] |= 1 << (light % 32);
        }
    }
}

fn fill_tiles(
    tiles: &mut [u32],
    bounds: &[Option<LightBounds>],
    capacity: ClusterCapacity,
    params: &ClusterParams,
) {
    let words = capacity.words_per_tile;
    tiles.fill(0);

    for (light, bounds) in bounds.iter().enumerate() {
        let Some(bounds) = bounds else { continue };
        let [x0, y0, x1, y1] = bounds.tiles;
        for y in y0..=y1 {
            for x in x0..=x1 {
                let tile = y * params.tile_count_x as usize + x;
                tiles[tile * words + light / 32] |= 1 << (light % 32);
            }
        }
    }
}

// ============================================================================
// Engine
// ============================================================================

/// Handle to a running clustering job.
#[derive(Debug)]
pub struct ClusteringJob {
    handle: JoinHandle<ClusterTables>,
}

impl ClusteringJob {
    /// Start filling `tables` on a background thread.
    pub fn spawn(mut tables: ClusterTables, input: ClusterJobInput) -> FrameResult<Self> {
        let handle = std::thread::Builder::new()
            .name("light-clustering".into())
            .spawn(move || {
                populate(&mut tables, &input);
                tables
            })
            .map_err(|e| FrameError::Backend(format!("failed to start clustering job: {e}")))?;
        Ok(Self { handle })
    }

    /// Returns true if the job has finished.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Block until the job finishes and take the tables back.
    pub fn join(self) -> FrameResult<ClusterTables> {
        self.handle.join().map_err(|_| FrameError::ClusteringJobPanicked)
    }
}

/// Owner of the persistent cluster tables and the job filling them.
#[derive(Debug)]
pub struct ClusteringEngine {
    capacity: ClusterCapacity,
    tables: Option<ClusterTables>,
    job: Option<ClusteringJob>,
}

impl ClusteringEngine {
    /// Allocate tables sized for `budget` lights.
    pub fn new(budget: usize) -> Self {
        let capacity = ClusterCapacity::for_budget(budget);
        log::debug!(
            "ClusteringEngine: {} words per tile, {} Z-bins, {} tile words",
            capacity.words_per_tile,
            capacity.z_bin_count(),
            capacity.tile_words
        );
        Self {
            capacity,
            tables: Some(ClusterTables::new(capacity)),
            job: None,
        }
    }

    pub fn capacity(&self) -> ClusterCapacity {
        self.capacity
    }

    /// Returns true while a job owns the tables.
    pub fn is_pending(&self) -> bool {
        self.job.is_some()
    }

    /// Start a job for this frame's lights.
    ///
    /// A job still running from an earlier schedule is joined first.
    pub fn schedule(&mut self, input: ClusterJobInput) -> FrameResult<()> {
        input.validate()?;
        self.wait()?;
        let tables = self
            .tables
            .take()
            .unwrap_or_else(|| ClusterTables::new(self.capacity));
        log::trace!("ClusteringEngine: scheduling {} lights", input.lights.len());
        self.job = Some(ClusteringJob::spawn(tables, input)?);
        Ok(())
    }

    /// Block until the pending job, if any, finishes, then return the tables.
    pub fn join(&mut self) -> FrameResult<&ClusterTables> {
        self.wait()?;
        match &self.tables {
            Some(tables) => Ok(tables),
            None => Err(FrameError::InvalidParameter(
                "clustering engine shut down".to_string(),
            )),
        }
    }

    /// Tables, if no job is running.
    pub fn tables(&self) -> Option<&ClusterTables> {
        if self.job.is_some() {
            return None;
        }
        self.tables.as_ref()
    }

    /// Join any pending job and release the tables.
    pub fn shutdown(&mut self) {
        if let Err(err) = self.wait() {
            log::warn!("ClusteringEngine: {err} during shutdown");
        }
        self.tables = None;
    }

    fn wait(&mut self) -> FrameResult<()> {
        if let Some(job) = self.job.take() {
            self.tables = Some(job.join()?);
        }
        Ok(())
    }
}

impl Drop for ClusteringEngine {
    fn drop(&mut self) {
        if self.job.is_some() {
            self.shutdown();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(lights: Vec<ClusterLight>) -> ClusterJobInput {
        ClusterJobInput {
            lights,
            world_to_view: Mat4::IDENTITY,
            projection: Mat4::perspective_rh(90f32.to_radians(), 1.0, 0.1, 100.0),
            near: 0.1,
            far: 100.0,
            viewport_width: 256,
            viewport_height: 256,
            remap: ZBinRemap::Logarithmic,
            min_tile_size: 8,
        }
    }

    fn point(position: Vec3, range: f32) -> ClusterLight {
        ClusterLight {
            light_type: LightType::Point,
            position,
            forward: Vec3::NEG_Z,
            range,
            spot_angle: 0.0,
        }
    }

    #[test]
    fn test_capacity_for_budget() {
        let desktop = ClusterCapacity::for_budget(256);
        assert_eq!(desktop.words_per_tile, 8);
        assert_eq!(desktop.tile_words, MAX_TILE_WORDS);
        assert_eq!(desktop.z_bin_count(), MAX_ZBIN_WORDS / 9);

        let mobile = ClusterCapacity::for_budget(32);
        assert_eq!(mobile.words_per_tile, 1);
        assert_eq!(mobile.tile_words, MAX_TILE_WORDS_SMALL);
        assert_eq!(mobile.max_lights(), 32);
    }

    #[test]
    fn test_tile_size_doubles_until_fit() {
        let capacity = ClusterCapacity::for_budget(256);
        let mut job = input(Vec::new());
        job.viewport_width = 1920;
        job.viewport_height = 1080;
        let params = compute_params(capacity, &job);
        assert_eq!(params.tile_size, 32);
        assert!((params.tile_count_x * params.tile_count_y * 8) as usize <= MAX_TILE_WORDS);
    }

    #[test]
    fn test_point_light_bins_and_tiles() {
        let mut tables = ClusterTables::new(ClusterCapacity::for_budget(256));
        populate(&mut tables, &input(vec![point(Vec3::new(0.0, 0.0, -10.0), 1.0)]));

        let params = *tables.params();
        let near_bin = params.z_bin(9.0);
        let far_bin = params.z_bin(11.0);
        assert!(tables.z_bin_contains(near_bin, 0));
        assert!(tables.z_bin_contains(far_bin, 0));
        assert!(!tables.z_bin_contains(params.z_bin(50.0), 0));
        assert_eq!(tables.z_bin_range(near_bin), Some((0, 0)));
        assert_eq!(tables.z_bin_range(params.z_bin(50.0)), None);

        let center = (128 / params.tile_size) as usize;
        assert!(tables.tile_contains(center, center, 0));
        assert!(!tables.tile_contains(0, 0, 0));
    }

    #[test]
    fn test_light_behind_camera_excluded() {
        let mut tables = ClusterTables::new(ClusterCapacity::for_budget(32));
        populate(&mut tables, &input(vec![point(Vec3::new(0.0, 0.0, 10.0), 1.0)]));
        assert!(tables.tiles().iter().all(|&word| word == 0));
        let bins = tables.params().z_bin_count as usize;
        assert!((0..bins).all(|bin| tables.z_bin_range(bin).is_none()));
    }

    #[test]
    fn test_header_tracks_min_and_max() {
        let mut tables = ClusterTables::new(ClusterCapacity::for_budget(256));
        let lights = vec![
            point(Vec3::new(0.0, 0.0, -10.0), 1.0),
            point(Vec3::new(50.0, 0.0, -80.0), 1.0),
            point(Vec3::new(0.0, 1.0, -10.0), 1.0),
        ];
        populate(&mut tables, &input(lights));
        let bin = tables.params().z_bin(10.0);
        assert_eq!(tables.z_bin_range(bin), Some((0, 2)));
        assert!(!tables.z_bin_contains(bin, 1));
    }

    #[test]
    fn test_spot_cone_narrower_than_sphere() {
        let mut tables = ClusterTables::new(ClusterCapacity::for_budget(32));
        let spot = ClusterLight {
            light_type: LightType::Spot,
            position: Vec3::new(0.0, 0.0, -5.0),
            forward: Vec3::NEG_Z,
            range: 4.0,
            spot_angle: 20.0,
        };
        populate(&mut tables, &input(vec![spot]));
        let params = *tables.params();
        // The cone points away from the camera, so nothing in front of its apex is lit.
        assert!(!tables.z_bin_contains(params.z_bin(2.0), 0));
        assert!(tables.z_bin_contains(params.z_bin(7.0), 0));
    }

    #[test]
    fn test_lights_beyond_capacity_dropped() {
        let mut tables = ClusterTables::new(ClusterCapacity::for_budget(32));
        let lights = (0..40).map(|_| point(Vec3::new(0.0, 0.0, -10.0), 1.0)).collect();
        populate(&mut tables, &input(lights));
        assert_eq!(tables.params().light_count, 32);
    }

    #[test]
    fn test_engine_join_returns_tables() {
        let mut engine = ClusteringEngine::new(32);
        engine
            .schedule(input(vec![point(Vec3::new(0.0, 0.0, -10.0), 1.0)]))
            .unwrap();
        assert!(engine.is_pending());
        assert!(engine.tables().is_none());

        let tables = engine.join().unwrap();
        assert_eq!(tables.params().light_count, 1);
        assert!(!engine.is_pending());
        assert!(engine.tables().is_some());
    }

    #[test]
    fn test_engine_rejects_invalid_range() {
        let mut engine = ClusteringEngine::new(32);
        let mut job = input(Vec::new());
        job.near = 10.0;
        job.far = 1.0;
        assert!(matches!(engine.schedule(job), Err(FrameError::InvalidParameter(_))));
        assert!(!engine.is_pending());
    }

    #[test]
    fn test_engine_shutdown_joins() {
        let mut engine = ClusteringEngine::new(256);
        engine.schedule(input(vec![point(Vec3::ZERO, 1.0)])).unwrap();
        engine.shutdown();
        assert!(!engine.is_pending());
        assert!(engine.tables().is_none());
    }

    #[test]
    fn test_engine_join_after_shutdown() {
        let mut engine = ClusteringEngine::new(32);
        engine.shutdown();
        assert!(matches!(engine.join(), Err(FrameError::InvalidParameter(_))));
    }
}
