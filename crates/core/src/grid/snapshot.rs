//! Read-only grid exports for downstream consumers
//!
//! A renderer or particle host must never hold a live reference into the
//! mutating grid. [`WindFieldSnapshot`] is a detached copy of one frame;
//! [`SnapshotPair`] is the double-buffered variant for consumers on a
//! separate execution context: the writer publishes once per tick, the
//! flip is the only point where the read slot changes, and readers see a
//! stable previous-frame snapshot for the whole tick.

use crate::core_types::vec3::Vec3;
use serde::{Deserialize, Serialize};

use super::wind_field::{sample_trilinear, WindField};

/// Immutable copy of a wind grid: all cell velocities plus the geometry
/// needed to interpret them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindFieldSnapshot {
    /// Grid dimensions
    pub size_x: usize,
    pub size_y: usize,
    pub size_z: usize,

    /// World units per cell
    pub cell_size: f32,

    /// World position of grid node (0,0,0) at capture time
    pub origin: Vec3,

    /// Cell velocities, row-major with X fastest
    pub cells: Vec<Vec3>,
}

impl WindFieldSnapshot {
    /// Cell velocities as a flat slice (row-major, X fastest).
    #[must_use]
    pub fn cells(&self) -> &[Vec3] {
        &self.cells
    }

    /// Sample the captured frame at a world position, with the same
    /// clamp-to-edge trilinear interpolation as the live field.
    #[must_use]
    pub fn sample_at(&self, world_pos: Vec3) -> Vec3 {
        let grid_pos = (world_pos - self.origin) / self.cell_size;
        sample_trilinear(&self.cells, self.size_x, self.size_y, self.size_z, grid_pos)
    }
}

/// Two snapshot slots with a single read/write flip per publish.
///
/// The tick owner calls [`SnapshotPair::publish`] after its write pass;
/// readers call [`SnapshotPair::latest`] and get the frame published
/// before the one currently being computed.
#[derive(Debug, Clone)]
pub struct SnapshotPair {
    slots: [WindFieldSnapshot; 2],
    read: usize,
}

impl SnapshotPair {
    /// Create a pair seeded with the field's current state in both slots.
    #[must_use]
    pub fn new(field: &WindField) -> Self {
        let snapshot = field.snapshot();
        SnapshotPair {
            slots: [snapshot.clone(), snapshot],
            read: 0,
        }
    }

    /// Capture the field into the write slot and flip it to readable.
    pub fn publish(&mut self, field: &WindField) {
        let write = 1 - self.read;
        self.slots[write] = field.snapshot();
        self.read = write;
    }

    /// The most recently published frame.
    #[must_use]
    pub fn latest(&self) -> &WindFieldSnapshot {
        &self.slots[self.read]
    }
}
