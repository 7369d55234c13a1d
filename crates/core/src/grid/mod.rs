//! Grid-based simulation modules

pub mod snapshot;
pub mod wind_field;

// Re-export main types
pub use snapshot::*;
pub use wind_field::*;
