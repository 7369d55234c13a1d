//! Volumetric Wind Velocity Field
//!
//! A 3D grid of velocity vectors advanced once per host tick:
//! semi-Lagrangian advection, exponential-style decay, and noise-driven
//! ambient forcing, with radius-bounded impulse injection and trilinear
//! sampling at arbitrary world positions.
//!
//! Based on:
//! - Stam, J. (1999). "Stable Fluids." SIGGRAPH '99. (semi-Lagrangian
//!   backtrace with resampling, which is unconditionally stable on a
//!   velocity grid)
//!
//! # Scheme
//!
//! Each `update(dt)` performs, in order:
//!
//! ```text
//! advect:  v'(x)  = v(x - v(x)·dt)        (backtrace + trilinear resample)
//! decay:   v''(x) = v'(x) · max(0, 1 - k·dt)
//! forcing: v(x)   = v''(x) + (bias + noise(x)·strength) · scale · dt
//! ```
//!
//! The advection pass reads only the previous grid and writes into a
//! scratch buffer that is swapped in at the end of the pass, so no cell
//! ever sees a value written earlier in the same pass.
//!
//! # Geometry
//!
//! Cell `(i, j, k)` sits at world position
//! `field_origin + Vec3(i, j, k) * cell_size` (lattice nodes). Advection,
//! injection, and sampling all use this one convention, so sampling at a
//! node returns exactly the stored cell value and an impulse injected at a
//! node lands with full strength in that cell.

use crate::core_types::noise::NoiseField;
use crate::core_types::vec3::Vec3;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Configuration for the wind field
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindFieldConfig {
    /// Grid dimensions (number of cells in each direction)
    pub size_x: usize,
    pub size_y: usize,
    pub size_z: usize,

    /// Cell size in world units
    pub cell_size: f32,

    /// Noise generator frequency (smaller = smoother gusts)
    pub noise_frequency: f32,

    /// Noise generator seed
    pub noise_seed: u32,

    /// Overall multiplier applied to the combined forcing vector
    pub wind_scale: f32,

    /// Constant directional component of the forcing (prevailing wind)
    pub wind_bias: Vec3,

    /// Multiplier on the noise vector before it is added to the bias
    pub turbulence_strength: f32,

    /// Scale from grid coordinates to noise-space coordinates
    pub noise_scale: f32,

    /// Velocity decay rate per second
    pub decay_rate: f32,

    /// Number of warm-up steps run at initialization so the field is not
    /// flat on first use
    pub warmup_steps: u32,

    /// Fixed time step used for warm-up
    pub warmup_dt: f32,
}

impl Default for WindFieldConfig {
    fn default() -> Self {
        Self {
            size_x: 16,
            size_y: 16,
            size_z: 8,
            cell_size: 50.0,
            noise_frequency: 0.05,
            noise_seed: 1337,
            wind_scale: 1.0,
            wind_bias: Vec3::zeros(),
            turbulence_strength: 2.0,
            noise_scale: 1.0,
            decay_rate: 1.0, // Reference value; higher = wind dies faster
            warmup_steps: 10,
            warmup_dt: 0.016, // One 60 Hz frame per warm-up step
        }
    }
}

/// Errors raised by wind field configuration
#[derive(Debug, Clone, PartialEq)]
pub enum FieldError {
    /// Grid dimensions must all be positive
    InvalidDimensions(usize, usize, usize),
    /// Cell size must be positive and finite
    InvalidCellSize(f32),
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldError::InvalidDimensions(x, y, z) => {
                write!(f, "Invalid grid dimensions: {x}x{y}x{z}")
            }
            FieldError::InvalidCellSize(s) => write!(f, "Invalid cell size: {s}"),
        }
    }
}

impl std::error::Error for FieldError {}

/// 3D wind velocity field
///
/// The field has two states: *Uninitialized* (no grid allocated; mutating
/// operations are logged no-ops and sampling returns the zero vector) and
/// *Ready* (grid allocated; fully operational). [`WindField::initialize`]
/// is the only transition into *Ready*; [`WindField::reset`] re-zeroes a
/// *Ready* field but never leaves it.
///
/// The simulation is single-writer: one owner drives `update`/`inject_at`
/// once per tick. Concurrent readers are safe only while no writer is
/// active; cross-context readers should consume a
/// [`snapshot`](WindField::snapshot) instead of the live grid.
#[derive(Clone)]
pub struct WindField {
    /// Velocity vectors at each grid node, row-major with X fastest:
    /// index = x + y*size_x + z*size_x*size_y. Empty while uninitialized.
    velocity: Vec<Vec3>,

    /// Scratch buffer for the advection pass, swapped in at the end
    scratch: Vec<Vec3>,

    /// Ambient turbulence source
    noise: NoiseField,

    /// World position of grid node (0,0,0); may be moved between ticks
    field_origin: Vec3,

    /// Configuration
    config: WindFieldConfig,
}

// Helper for explicit usize -> f32 conversions used throughout grid code
#[inline]
fn usize_to_f32(v: usize) -> f32 {
    v as f32
}

/// Linear interpolation between two velocity vectors
#[inline]
fn lerp(a: Vec3, b: Vec3, t: f32) -> Vec3 {
    a + (b - a) * t
}

/// Trilinear interpolation of a flat velocity grid at a fractional grid
/// position, shared by the live field and exported snapshots.
///
/// Each corner coordinate is clamped to the grid (clamp-to-edge) and then
/// validity-checked; a corner that still falls outside contributes the
/// zero vector. Degenerate grids (empty, or any dimension <= 1) return
/// zero without interpolating.
#[must_use]
pub(crate) fn sample_trilinear(
    cells: &[Vec3],
    size_x: usize,
    size_y: usize,
    size_z: usize,
    grid_pos: Vec3,
) -> Vec3 {
    if cells.is_empty() || size_x <= 1 || size_y <= 1 || size_z <= 1 {
        return Vec3::zeros();
    }

    let x0 = grid_pos.x.floor() as i32;
    let y0 = grid_pos.y.floor() as i32;
    let z0 = grid_pos.z.floor() as i32;

    // Fractional distance within the cell
    let sx = grid_pos.x - grid_pos.x.floor();
    let sy = grid_pos.y - grid_pos.y.floor();
    let sz = grid_pos.z - grid_pos.z.floor();

    let max_x = (size_x - 1) as i32;
    let max_y = (size_y - 1) as i32;
    let max_z = (size_z - 1) as i32;

    // Clamp indices (clamp-to-edge boundary policy)
    let x0 = x0.clamp(0, max_x);
    let y0 = y0.clamp(0, max_y);
    let z0 = z0.clamp(0, max_z);
    let x1 = (x0 + 1).clamp(0, max_x);
    let y1 = (y0 + 1).clamp(0, max_y);
    let z1 = (z0 + 1).clamp(0, max_z);

    let corner = |x: i32, y: i32, z: i32| -> Vec3 {
        let in_bounds = x >= 0
            && (x as usize) < size_x
            && y >= 0
            && (y as usize) < size_y
            && z >= 0
            && (z as usize) < size_z;
        if in_bounds {
            cells[x as usize + (y as usize) * size_x + (z as usize) * size_x * size_y]
        } else {
            Vec3::zeros()
        }
    };

    let c000 = corner(x0, y0, z0);
    let c100 = corner(x1, y0, z0);
    let c010 = corner(x0, y1, z0);
    let c110 = corner(x1, y1, z0);
    let c001 = corner(x0, y0, z1);
    let c101 = corner(x1, y0, z1);
    let c011 = corner(x0, y1, z1);
    let c111 = corner(x1, y1, z1);

    // Interpolate along X, then Y, then Z
    let c00 = lerp(c000, c100, sx);
    let c10 = lerp(c010, c110, sx);
    let c01 = lerp(c001, c101, sx);
    let c11 = lerp(c011, c111, sx);

    let c0 = lerp(c00, c10, sy);
    let c1 = lerp(c01, c11, sy);

    lerp(c0, c1, sz)
}

impl WindField {
    /// Create an uninitialized field with the given configuration.
    ///
    /// No grid is allocated until [`WindField::initialize`] succeeds.
    #[must_use]
    pub fn new(config: WindFieldConfig) -> Self {
        let noise = NoiseField::new(config.noise_seed, config.noise_frequency);
        WindField {
            velocity: Vec::new(),
            scratch: Vec::new(),
            noise,
            field_origin: Vec3::zeros(),
            config,
        }
    }

    /// Allocate and zero the grid, configure the noise source, and run the
    /// configured warm-up steps.
    ///
    /// Idempotent: calling this on an already-Ready field is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error (and leaves the field Uninitialized) if any grid
    /// dimension is zero or the cell size is not positive and finite.
    pub fn initialize(&mut self) -> Result<(), FieldError> {
        if self.is_ready() {
            debug!("Wind field already initialized, ignoring");
            return Ok(());
        }

        let WindFieldConfig {
            size_x,
            size_y,
            size_z,
            cell_size,
            ..
        } = self.config;

        if size_x == 0 || size_y == 0 || size_z == 0 {
            warn!("Rejecting wind field initialization: dimensions {size_x}x{size_y}x{size_z}");
            return Err(FieldError::InvalidDimensions(size_x, size_y, size_z));
        }
        if !(cell_size.is_finite() && cell_size > 0.0) {
            warn!("Rejecting wind field initialization: cell size {cell_size}");
            return Err(FieldError::InvalidCellSize(cell_size));
        }

        let total_cells = size_x * size_y * size_z;
        self.velocity = vec![Vec3::zeros(); total_cells];
        self.scratch = vec![Vec3::zeros(); total_cells];
        self.noise = NoiseField::new(self.config.noise_seed, self.config.noise_frequency);

        debug!(
            "Wind field initialized: {size_x}x{size_y}x{size_z} grid, cell_size={cell_size:.2}"
        );

        self.warm_up();
        Ok(())
    }

    /// True once the grid has been allocated.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        !self.velocity.is_empty()
    }

    /// Re-zero the grid and re-run warm-up. Ready stays Ready.
    pub fn reset(&mut self) {
        if !self.is_ready() {
            warn!("reset called on an uninitialized wind field, ignoring");
            return;
        }
        self.velocity.fill(Vec3::zeros());
        self.scratch.fill(Vec3::zeros());
        self.warm_up();
    }

    /// Grid configuration
    #[must_use]
    pub fn config(&self) -> &WindFieldConfig {
        &self.config
    }

    /// Grid dimensions as (`size_x`, `size_y`, `size_z`)
    #[must_use]
    pub fn dimensions(&self) -> (usize, usize, usize) {
        (self.config.size_x, self.config.size_y, self.config.size_z)
    }

    /// World position of grid node (0,0,0)
    #[must_use]
    pub fn origin(&self) -> Vec3 {
        self.field_origin
    }

    /// Move the field origin (e.g. to follow a moving injector).
    ///
    /// Only call between ticks; cell contents are not remapped.
    pub fn set_origin(&mut self, origin: Vec3) {
        self.field_origin = origin;
    }

    /// Flat array index from grid coordinates. Callers must pre-validate
    /// ranges except where explicitly guarded (sampler).
    #[inline]
    fn index(&self, x: usize, y: usize, z: usize) -> usize {
        x + y * self.config.size_x + z * self.config.size_x * self.config.size_y
    }

    /// True iff each coordinate lies in `[0, size)`.
    #[inline]
    #[must_use]
    pub fn is_valid_index(&self, x: i32, y: i32, z: i32) -> bool {
        x >= 0
            && (x as usize) < self.config.size_x
            && y >= 0
            && (y as usize) < self.config.size_y
            && z >= 0
            && (z as usize) < self.config.size_z
    }

    /// Velocity stored at a grid node, or zero when out of range.
    #[must_use]
    pub fn velocity_at_grid(&self, x: usize, y: usize, z: usize) -> Vec3 {
        if self.is_ready()
            && x < self.config.size_x
            && y < self.config.size_y
            && z < self.config.size_z
        {
            self.velocity[self.index(x, y, z)]
        } else {
            Vec3::zeros()
        }
    }

    /// Overwrite the velocity at a grid node. Out-of-range writes are
    /// ignored.
    pub fn set_velocity_at_grid(&mut self, x: usize, y: usize, z: usize, velocity: Vec3) {
        if self.is_ready()
            && x < self.config.size_x
            && y < self.config.size_y
            && z < self.config.size_z
        {
            let idx = self.index(x, y, z);
            self.velocity[idx] = velocity;
        }
    }

    /// Trilinear interpolation of the grid at a fractional grid position.
    ///
    /// Total over all real-valued inputs: out-of-range corners resolve to
    /// the zero vector and degenerate grids return zero.
    #[must_use]
    pub fn sample_velocity_at_grid(&self, grid_pos: Vec3) -> Vec3 {
        sample_trilinear(
            &self.velocity,
            self.config.size_x,
            self.config.size_y,
            self.config.size_z,
            grid_pos,
        )
    }

    /// Sample the wind at a world position.
    ///
    /// Positions are measured relative to the field origin. Returns the
    /// zero vector (with a logged warning) while uninitialized.
    #[must_use]
    pub fn sample_at(&self, world_pos: Vec3) -> Vec3 {
        if !self.is_ready() {
            warn!("sample_at called on an uninitialized wind field");
            return Vec3::zeros();
        }
        let grid_pos = (world_pos - self.field_origin) / self.config.cell_size;
        self.sample_velocity_at_grid(grid_pos)
    }

    /// Advance the simulation by one tick: advection, decay, then ambient
    /// forcing. No-op (with a logged warning) while uninitialized.
    pub fn update(&mut self, dt: f32) {
        if !self.is_ready() {
            warn!("update called before the wind grid was allocated");
            return;
        }
        self.step(dt);
    }

    /// Add a radius-bounded impulse around a world position.
    ///
    /// Every cell whose node lies within `radius` of `world_pos` receives
    /// `velocity * (1 - dist/radius)` added to its current value, so
    /// repeated injections accumulate. Positions are measured relative to
    /// the field origin. `radius <= 0` is a logged no-op.
    pub fn inject_at(&mut self, world_pos: Vec3, velocity: Vec3, radius: f32) {
        if !self.is_ready() {
            warn!("inject_at called before the wind grid was allocated");
            return;
        }
        if radius <= 0.0 {
            warn!("inject_at called with non-positive radius {radius}, ignoring");
            return;
        }

        let cell_size = self.config.cell_size;
        let grid_pos = (world_pos - self.field_origin) / cell_size;
        let radius_cells = radius / cell_size;

        let max_x = (self.config.size_x - 1) as i32;
        let max_y = (self.config.size_y - 1) as i32;
        let max_z = (self.config.size_z - 1) as i32;

        // Bounding box of candidate cells, clamped to the grid
        let min_ix = ((grid_pos.x - radius_cells).floor() as i32).clamp(0, max_x);
        let max_ix = ((grid_pos.x + radius_cells).ceil() as i32).clamp(0, max_x);
        let min_iy = ((grid_pos.y - radius_cells).floor() as i32).clamp(0, max_y);
        let max_iy = ((grid_pos.y + radius_cells).ceil() as i32).clamp(0, max_y);
        let min_iz = ((grid_pos.z - radius_cells).floor() as i32).clamp(0, max_z);
        let max_iz = ((grid_pos.z + radius_cells).ceil() as i32).clamp(0, max_z);

        for iz in min_iz..=max_iz {
            for iy in min_iy..=max_iy {
                for ix in min_ix..=max_ix {
                    let node_world = self.field_origin
                        + Vec3::new(
                            usize_to_f32(ix as usize),
                            usize_to_f32(iy as usize),
                            usize_to_f32(iz as usize),
                        ) * cell_size;
                    let dist = (node_world - world_pos).norm();

                    if dist <= radius && self.is_valid_index(ix, iy, iz) {
                        // Strength 1 at the center, 0 at the boundary
                        let strength = 1.0 - dist / radius;
                        let idx = self.index(ix as usize, iy as usize, iz as usize);
                        self.velocity[idx] += velocity * strength;
                    }
                }
            }
        }
    }

    /// Immutable export of the grid for downstream consumers.
    #[must_use]
    pub fn snapshot(&self) -> super::snapshot::WindFieldSnapshot {
        super::snapshot::WindFieldSnapshot {
            size_x: self.config.size_x,
            size_y: self.config.size_y,
            size_z: self.config.size_z,
            cell_size: self.config.cell_size,
            origin: self.field_origin,
            cells: self.velocity.clone(),
        }
    }

    // ====== Private Methods ======

    /// One simulation step, without the Ready guard. Used by `update` and
    /// by warm-up, which runs right after allocation.
    fn step(&mut self, dt: f32) {
        self.advect(dt);
        self.decay_velocity(dt);
        self.apply_turbulence(dt);
    }

    fn warm_up(&mut self) {
        let steps = self.config.warmup_steps;
        let dt = self.config.warmup_dt;
        for _ in 0..steps {
            self.step(dt);
        }
    }

    /// Semi-Lagrangian advection: for every node, backtrace along the
    /// current velocity and resample the old grid. Writes go to the
    /// scratch buffer, which is swapped in at the end of the pass.
    fn advect(&mut self, dt: f32) {
        let size_x = self.config.size_x;
        let size_y = self.config.size_y;
        let size_z = self.config.size_z;
        let cell_size = self.config.cell_size;
        let origin = self.field_origin;
        let layer = size_x * size_y;

        let velocity = &self.velocity;
        // Each Z layer is independent, so parallelize over layers
        self.scratch
            .par_chunks_mut(layer)
            .enumerate()
            .for_each(|(iz, out_layer)| {
                for iy in 0..size_y {
                    for ix in 0..size_x {
                        let idx_layer = iy * size_x + ix;
                        let current = velocity[iz * layer + idx_layer];

                        let node_world = origin
                            + Vec3::new(
                                usize_to_f32(ix),
                                usize_to_f32(iy),
                                usize_to_f32(iz),
                            ) * cell_size;

                        // Where the wind at this node came from
                        let prev_world = node_world - current * dt;
                        let grid_pos = (prev_world - origin) / cell_size;

                        out_layer[idx_layer] =
                            sample_trilinear(velocity, size_x, size_y, size_z, grid_pos);
                    }
                }
            });

        std::mem::swap(&mut self.velocity, &mut self.scratch);
    }

    /// Attenuate every cell toward zero. The clamp keeps a large `dt`
    /// from flipping the velocity sign.
    fn decay_velocity(&mut self, dt: f32) {
        let factor = (1.0 - self.config.decay_rate * dt).max(0.0);
        for vel in &mut self.velocity {
            *vel *= factor;
        }
    }

    /// Add noise-driven ambient forcing on top of the advected and decayed
    /// field: `vel += (bias + noise*strength) * scale * dt`.
    fn apply_turbulence(&mut self, dt: f32) {
        let size_x = self.config.size_x;
        let size_y = self.config.size_y;
        let noise_scale = self.config.noise_scale;
        let wind_bias = self.config.wind_bias;
        let turbulence_strength = self.config.turbulence_strength;
        let wind_scale = self.config.wind_scale;
        let layer = size_x * size_y;

        let noise = &self.noise;
        self.velocity
            .par_chunks_mut(layer)
            .enumerate()
            .for_each(|(iz, layer_cells)| {
                let nz = usize_to_f32(iz) * noise_scale;
                for iy in 0..size_y {
                    for ix in 0..size_x {
                        let gust = noise.sample_vec3(
                            usize_to_f32(ix) * noise_scale,
                            usize_to_f32(iy) * noise_scale,
                            nz,
                        );
                        let forcing = (wind_bias + gust * turbulence_strength) * wind_scale;
                        layer_cells[iy * size_x + ix] += forcing * dt;
                    }
                }
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Config with warm-up and forcing disabled, so tests control every
    /// cell exactly.
    fn quiet_config(size: usize, cell_size: f32) -> WindFieldConfig {
        WindFieldConfig {
            size_x: size,
            size_y: size,
            size_z: size,
            cell_size,
            turbulence_strength: 0.0,
            wind_bias: Vec3::zeros(),
            decay_rate: 0.0,
            warmup_steps: 0,
            ..Default::default()
        }
    }

    fn ready_field(size: usize, cell_size: f32) -> WindField {
        let mut field = WindField::new(quiet_config(size, cell_size));
        field.initialize().expect("valid config");
        field
    }

    #[test]
    fn test_initialize_allocates_grid() {
        let field = ready_field(4, 10.0);
        assert!(field.is_ready());
        assert_eq!(field.velocity.len(), 4 * 4 * 4);
    }

    #[test]
    fn test_initialize_rejects_bad_config() {
        let mut field = WindField::new(WindFieldConfig {
            size_x: 0,
            ..quiet_config(4, 10.0)
        });
        assert_eq!(
            field.initialize(),
            Err(FieldError::InvalidDimensions(0, 4, 4))
        );
        assert!(!field.is_ready());

        let mut field = WindField::new(WindFieldConfig {
            cell_size: -1.0,
            ..quiet_config(4, 10.0)
        });
        assert!(matches!(
            field.initialize(),
            Err(FieldError::InvalidCellSize(_))
        ));
        assert!(!field.is_ready());
    }

    #[test]
    fn test_initialize_is_idempotent() {
        let mut field = ready_field(4, 10.0);
        field.set_velocity_at_grid(1, 2, 3, Vec3::new(5.0, 0.0, 0.0));
        field.initialize().expect("second call is a no-op");
        assert_eq!(
            field.velocity_at_grid(1, 2, 3),
            Vec3::new(5.0, 0.0, 0.0),
            "Re-initialization must not disturb a ready grid"
        );
    }

    #[test]
    fn test_index_round_trip() {
        let field = ready_field(4, 10.0);
        let mut seen = std::collections::HashSet::new();
        for z in 0..4 {
            for y in 0..4 {
                for x in 0..4 {
                    let idx = field.index(x, y, z);
                    assert!(seen.insert(idx), "index must be injective");
                    // Recover coordinates from the flat index
                    assert_eq!(idx % 4, x);
                    assert_eq!((idx / 4) % 4, y);
                    assert_eq!(idx / 16, z);
                }
            }
        }
    }

    #[test]
    fn test_sample_identity_at_nodes() {
        let mut field = ready_field(4, 10.0);
        field.set_velocity_at_grid(2, 1, 3, Vec3::new(1.0, -2.0, 3.0));

        let sampled = field.sample_velocity_at_grid(Vec3::new(2.0, 1.0, 3.0));
        assert_relative_eq!(sampled.x, 1.0, epsilon = 1e-6);
        assert_relative_eq!(sampled.y, -2.0, epsilon = 1e-6);
        assert_relative_eq!(sampled.z, 3.0, epsilon = 1e-6);
    }

    #[test]
    fn test_sample_interpolates_between_nodes() {
        let mut field = ready_field(4, 10.0);
        field.set_velocity_at_grid(0, 0, 0, Vec3::new(0.0, 0.0, 0.0));
        field.set_velocity_at_grid(1, 0, 0, Vec3::new(10.0, 0.0, 0.0));

        let mid = field.sample_velocity_at_grid(Vec3::new(0.5, 0.0, 0.0));
        assert_relative_eq!(mid.x, 5.0, epsilon = 1e-5);
    }

    #[test]
    fn test_sample_degenerate_grid_returns_zero() {
        // A 1-cell-thick grid cannot interpolate and must degrade to zero
        let mut field = WindField::new(WindFieldConfig {
            size_z: 1,
            ..quiet_config(4, 10.0)
        });
        field.initialize().expect("valid config");
        assert_eq!(
            field.sample_velocity_at_grid(Vec3::new(1.0, 1.0, 0.0)),
            Vec3::zeros()
        );
    }

    #[test]
    fn test_sample_total_over_wild_inputs() {
        let field = ready_field(4, 10.0);
        for pos in [
            Vec3::new(-1e9, 2.0, 2.0),
            Vec3::new(2.0, 1e9, 2.0),
            Vec3::new(f32::INFINITY, 0.0, 0.0),
            Vec3::new(-50.0, -50.0, -50.0),
        ] {
            // Must not panic; far-outside positions clamp to the edge
            let _ = field.sample_velocity_at_grid(pos);
        }
    }

    #[test]
    fn test_sample_world_respects_origin() {
        let mut field = ready_field(4, 10.0);
        field.set_origin(Vec3::new(100.0, 0.0, 0.0));
        field.set_velocity_at_grid(1, 0, 0, Vec3::new(0.0, 7.0, 0.0));

        let sampled = field.sample_at(Vec3::new(110.0, 0.0, 0.0));
        assert_relative_eq!(sampled.y, 7.0, epsilon = 1e-5);
    }

    #[test]
    fn test_decay_attenuates_monotonically() {
        let mut field = WindField::new(WindFieldConfig {
            decay_rate: 1.0,
            ..quiet_config(4, 10.0)
        });
        field.initialize().expect("valid config");
        field.set_velocity_at_grid(1, 1, 1, Vec3::new(8.0, 0.0, 0.0));

        field.decay_velocity(0.5);
        assert_relative_eq!(field.velocity_at_grid(1, 1, 1).x, 4.0, epsilon = 1e-5);
    }

    #[test]
    fn test_decay_clamps_at_zero_for_large_dt() {
        let mut field = WindField::new(WindFieldConfig {
            decay_rate: 1.0,
            ..quiet_config(4, 10.0)
        });
        field.initialize().expect("valid config");
        field.set_velocity_at_grid(1, 1, 1, Vec3::new(8.0, -3.0, 2.0));

        // 1 - decay_rate*dt = -1 without the clamp
        field.decay_velocity(2.0);
        let vel = field.velocity_at_grid(1, 1, 1);
        assert_eq!(vel, Vec3::zeros(), "Large dt must zero, never flip: {vel}");
    }

    #[test]
    fn test_inject_center_full_strength() {
        let mut field = ready_field(4, 10.0);
        field.inject_at(Vec3::zeros(), Vec3::new(0.0, 0.0, 10.0), 15.0);

        let center = field.velocity_at_grid(0, 0, 0);
        assert_relative_eq!(center.z, 10.0, epsilon = 1e-5);
    }

    #[test]
    fn test_inject_falloff_and_cutoff() {
        let mut field = ready_field(4, 10.0);
        field.inject_at(Vec3::zeros(), Vec3::new(0.0, 0.0, 10.0), 15.0);

        // Node (1,0,0) is 10 units out: strength 1 - 10/15
        let near = field.velocity_at_grid(1, 0, 0);
        assert_relative_eq!(near.z, 10.0 * (1.0 - 10.0 / 15.0), epsilon = 1e-4);

        // Node (3,3,3) is ~52 units out, well past the radius
        assert_eq!(field.velocity_at_grid(3, 3, 3), Vec3::zeros());
    }

    #[test]
    fn test_inject_strength_vanishes_at_radius() {
        let mut field = ready_field(4, 10.0);
        // Node (2,0,0) sits exactly at the 20-unit radius boundary
        field.inject_at(Vec3::zeros(), Vec3::new(0.0, 0.0, 10.0), 20.0);
        let boundary = field.velocity_at_grid(2, 0, 0);
        assert_relative_eq!(boundary.z, 0.0, epsilon = 1e-4);
    }

    #[test]
    fn test_inject_accumulates() {
        let mut field = ready_field(4, 10.0);
        field.inject_at(Vec3::zeros(), Vec3::new(0.0, 0.0, 10.0), 15.0);
        field.inject_at(Vec3::zeros(), Vec3::new(0.0, 0.0, 10.0), 15.0);

        assert_relative_eq!(field.velocity_at_grid(0, 0, 0).z, 20.0, epsilon = 1e-4);
    }

    #[test]
    fn test_inject_rejects_non_positive_radius() {
        let mut field = ready_field(4, 10.0);
        field.inject_at(Vec3::zeros(), Vec3::new(0.0, 0.0, 10.0), 0.0);
        field.inject_at(Vec3::zeros(), Vec3::new(0.0, 0.0, 10.0), -5.0);
        assert_eq!(field.velocity_at_grid(0, 0, 0), Vec3::zeros());
    }

    #[test]
    fn test_update_is_additive_over_prior_velocity() {
        // Uniform field + pure-bias forcing: advection resamples the same
        // constant, so the prior velocity must survive and the bias adds on
        let mut field = WindField::new(WindFieldConfig {
            wind_bias: Vec3::new(0.0, 1.0, 0.0),
            ..quiet_config(4, 10.0)
        });
        field.initialize().expect("valid config");
        for z in 0..4 {
            for y in 0..4 {
                for x in 0..4 {
                    field.set_velocity_at_grid(x, y, z, Vec3::new(2.0, 0.0, 0.0));
                }
            }
        }

        field.update(0.5);
        let vel = field.velocity_at_grid(1, 1, 1);
        assert_relative_eq!(vel.x, 2.0, epsilon = 1e-3);
        assert_relative_eq!(vel.y, 0.5, epsilon = 1e-3);
    }

    #[test]
    fn test_advect_transports_upwind_value() {
        // Node (2,0,0) moving in +X with dt*v = one cell should pick up the
        // value one cell upwind after the backtrace
        let mut field = ready_field(4, 10.0);
        for x in 0..4 {
            field.set_velocity_at_grid(x, 0, 0, Vec3::new(10.0 * usize_to_f32(x), 0.0, 0.0));
        }

        field.advect(1.0);

        // Node (2,0,0) had v=(20,0,0); backtrace lands at grid x = 0
        let vel = field.velocity_at_grid(2, 0, 0);
        assert_relative_eq!(vel.x, 0.0, epsilon = 1e-4);
    }

    #[test]
    fn test_update_before_initialize_is_noop() {
        let mut field = WindField::new(quiet_config(4, 10.0));
        field.update(0.016);
        field.inject_at(Vec3::zeros(), Vec3::new(1.0, 0.0, 0.0), 5.0);
        assert!(!field.is_ready());
        assert_eq!(field.sample_at(Vec3::zeros()), Vec3::zeros());
    }

    #[test]
    fn test_reset_rezeros_and_stays_ready() {
        let mut field = ready_field(4, 10.0);
        field.inject_at(Vec3::zeros(), Vec3::new(0.0, 0.0, 10.0), 15.0);
        field.reset();
        assert!(field.is_ready());
        assert_eq!(field.velocity_at_grid(0, 0, 0), Vec3::zeros());
    }

    #[test]
    fn test_warmup_leaves_field_non_flat() {
        let mut field = WindField::new(WindFieldConfig {
            size_x: 8,
            size_y: 8,
            size_z: 8,
            cell_size: 10.0,
            ..Default::default()
        });
        field.initialize().expect("valid config");

        let any_nonzero = (0..8).any(|z| {
            (0..8).any(|y| (0..8).any(|x| field.velocity_at_grid(x, y, z).norm() > 1e-6))
        });
        assert!(any_nonzero, "Warm-up should leave the field non-flat");
    }
}
