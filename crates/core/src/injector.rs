//! Periodic wind impulse driver
//!
//! A host-side helper that feeds a recurring impulse into a
//! [`WindField`]: a fan, a thruster, a moving gust source. The host calls
//! [`WindInjector::tick`] once per frame from whatever scheduler it owns;
//! the injector accumulates elapsed time and fires
//! [`WindField::inject_at`] each time its interval elapses.

use crate::core_types::vec3::Vec3;
use crate::grid::wind_field::WindField;
use serde::{Deserialize, Serialize};

/// Recurring radius-bounded impulse source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindInjector {
    /// World position of the impulse center; move it to follow an emitter
    pub position: Vec3,

    /// Velocity added (scaled by falloff) at each injection
    pub velocity: Vec3,

    /// Impulse radius in world units
    pub radius: f32,

    /// Disabled injectors tick without injecting
    pub enabled: bool,

    /// Seconds between injections. Non-positive means every tick.
    pub injection_interval: f32,

    time_since_last: f32,
}

impl Default for WindInjector {
    fn default() -> Self {
        Self {
            position: Vec3::zeros(),
            velocity: Vec3::new(0.0, 0.0, 10.0),
            radius: 25.0,
            enabled: true,
            injection_interval: 0.2,
            time_since_last: 0.0,
        }
    }
}

impl WindInjector {
    /// Advance the injector clock by `dt` and inject when the interval
    /// has elapsed.
    pub fn tick(&mut self, field: &mut WindField, dt: f32) {
        if !self.enabled {
            return;
        }

        if self.injection_interval <= 0.0 {
            field.inject_at(self.position, self.velocity, self.radius);
            return;
        }

        self.time_since_last += dt;
        if self.time_since_last >= self.injection_interval {
            self.time_since_last = 0.0;
            field.inject_at(self.position, self.velocity, self.radius);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::wind_field::WindFieldConfig;
    use approx::assert_relative_eq;

    fn still_field() -> WindField {
        let mut field = WindField::new(WindFieldConfig {
            size_x: 4,
            size_y: 4,
            size_z: 4,
            cell_size: 10.0,
            turbulence_strength: 0.0,
            decay_rate: 0.0,
            warmup_steps: 0,
            ..Default::default()
        });
        field.initialize().expect("valid config");
        field
    }

    #[test]
    fn test_injector_honors_interval() {
        let mut field = still_field();
        let mut injector = WindInjector {
            velocity: Vec3::new(0.0, 0.0, 10.0),
            radius: 15.0,
            injection_interval: 0.2,
            ..Default::default()
        };

        // Three ticks of 0.1s: the interval elapses once, at the second
        injector.tick(&mut field, 0.1);
        assert_eq!(field.velocity_at_grid(0, 0, 0), Vec3::zeros());

        injector.tick(&mut field, 0.1);
        assert_relative_eq!(field.velocity_at_grid(0, 0, 0).z, 10.0, epsilon = 1e-4);

        injector.tick(&mut field, 0.1);
        assert_relative_eq!(field.velocity_at_grid(0, 0, 0).z, 10.0, epsilon = 1e-4);
    }

    #[test]
    fn test_disabled_injector_is_inert() {
        let mut field = still_field();
        let mut injector = WindInjector {
            enabled: false,
            injection_interval: 0.0,
            ..Default::default()
        };

        injector.tick(&mut field, 1.0);
        assert_eq!(field.velocity_at_grid(0, 0, 0), Vec3::zeros());
    }

    #[test]
    fn test_zero_interval_injects_every_tick() {
        let mut field = still_field();
        let mut injector = WindInjector {
            velocity: Vec3::new(0.0, 0.0, 10.0),
            radius: 15.0,
            injection_interval: 0.0,
            ..Default::default()
        };

        injector.tick(&mut field, 0.01);
        injector.tick(&mut field, 0.01);
        assert_relative_eq!(field.velocity_at_grid(0, 0, 0).z, 20.0, epsilon = 1e-4);
    }
}
