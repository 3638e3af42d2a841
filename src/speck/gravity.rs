//! Oscillating gravity for sloshing demos.

use bevy::prelude::*;

/// Sideways gravity wave.
///
/// While present as a resource, the plugin rewrites the horizontal gravity
/// component every frame so the container contents slosh back and forth.
#[derive(Resource, Clone, Copy, Debug, PartialEq, Reflect)]
#[reflect(Resource)]
pub struct GravityWave {
    pub amplitude: f32,
    /// Angular frequency in radians per second.
    pub frequency: f32,
}

impl Default for GravityWave {
    fn default() -> Self {
        Self {
            amplitude: 4.0,
            frequency: 1.0,
        }
    }
}

impl GravityWave {
    pub fn new(amplitude: f32, frequency: f32) -> Self {
        Self {
            amplitude,
            frequency,
        }
    }

    /// Gravity at elapsed time `t`, keeping the vertical component of `current`.
    ///
    /// The x component swings between `-amplitude / 4` and `3 * amplitude / 4`.
    pub fn sample(&self, t: f32, current: Vec3) -> Vec3 {
        let x = ((t * self.frequency).sin() + 0.5) / 2.0 * self.amplitude;
        Vec3::new(x, current.y, 0.0)
    }
}
