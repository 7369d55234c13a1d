//! Core types and utilities

pub mod noise;
pub mod vec3;

// `self::` disambiguates the noise module from the noise crate
pub use self::noise::NoiseField;
pub use self::vec3::Vec3;
