//! Coherent noise source for ambient turbulence
//!
//! Wraps a seeded `OpenSimplex` generator and exposes three decorrelated
//! channels so the X/Y/Z components of the synthesized turbulence do not
//! move in lockstep. Channels are separated by large fixed coordinate
//! offsets rather than separate generators, which keeps a single seed
//! controlling the whole field.

use crate::core_types::vec3::Vec3;
use noise::{NoiseFn, OpenSimplex};

/// Coordinate offset separating the Y channel from the X channel.
const CHANNEL_OFFSET_Y: f64 = 1000.0;

/// Coordinate offset separating the Z channel from the X channel.
const CHANNEL_OFFSET_Z: f64 = 2000.0;

/// Seeded 3D coherent-noise source.
///
/// Deterministic: the same seed and sample position always produce the
/// same value. Output of each channel is in `[-1, 1]`.
#[derive(Clone)]
pub struct NoiseField {
    simplex: OpenSimplex,
    frequency: f64,
}

impl NoiseField {
    /// Create a generator with the given seed and sampling frequency.
    #[must_use]
    pub fn new(seed: u32, frequency: f32) -> Self {
        Self {
            simplex: OpenSimplex::new(seed),
            frequency: f64::from(frequency),
        }
    }

    /// Sample a single noise channel at a 3D position.
    ///
    /// Returns a value in `[-1, 1]`.
    #[must_use]
    pub fn sample(&self, x: f32, y: f32, z: f32) -> f32 {
        let f = self.frequency;
        let v = self
            .simplex
            .get([f64::from(x) * f, f64::from(y) * f, f64::from(z) * f]);
        v as f32
    }

    /// Sample all three channels at a position and pack them into a vector.
    ///
    /// Each component is an independent channel of the same generator,
    /// offset far enough that the components are uncorrelated over any
    /// realistic grid extent.
    #[must_use]
    pub fn sample_vec3(&self, x: f32, y: f32, z: f32) -> Vec3 {
        let f = self.frequency;
        let fx = f64::from(x) * f;
        let fy = f64::from(y) * f;
        let fz = f64::from(z) * f;

        let nx = self.simplex.get([fx, fy, fz]);
        let ny = self
            .simplex
            .get([fx + CHANNEL_OFFSET_Y * f, fy + CHANNEL_OFFSET_Y * f, fz]);
        let nz = self.simplex.get([
            fx + CHANNEL_OFFSET_Z * f,
            fy + CHANNEL_OFFSET_Z * f,
            fz + CHANNEL_OFFSET_Z * f,
        ]);

        Vec3::new(nx as f32, ny as f32, nz as f32)
    }
}
