//! Bevy plugin for the speck simulation.

use bevy::log::{error, warn};
use bevy::prelude::*;

use super::gravity::GravityWave;
use super::params::SpeckParams;
use super::simulation::SpeckSimulation;

/// Largest step the plugin feeds the simulation, in seconds.
pub const MAX_FRAME_STEP: f32 = 1.0 / 30.0;

/// Gravity applied to every speck, in world units per second squared.
#[derive(Resource, Clone, Copy, Debug, PartialEq, Deref, DerefMut, Reflect)]
#[reflect(Resource)]
pub struct SpeckGravity(pub Vec3);

impl Default for SpeckGravity {
    fn default() -> Self {
        Self(Vec3::new(0.0, -9.81, 0.0))
    }
}

/// Plugin that steps a [`SpeckSimulation`] once per frame.
///
/// # Example
///
/// ```rust,no_run
/// use bevy::prelude::*;
/// use specks::prelude::*;
///
/// App::new()
///     .add_plugins(MinimalPlugins)
///     .add_plugins(SpeckPlugin::new(4096).with_params(SpeckParams::liquid()))
///     .insert_resource(GravityWave::new(4.0, 0.5))
///     .run();
/// ```
///
/// `SpeckParams` stays editable as a resource after startup, except for the
/// fields that shape the partition grid.
pub struct SpeckPlugin {
    count: usize,
    params: SpeckParams,
}

impl SpeckPlugin {
    /// Plugin simulating `count` specks with default parameters.
    pub fn new(count: usize) -> Self {
        Self {
            count,
            params: SpeckParams::default(),
        }
    }

    pub fn with_params(mut self, params: SpeckParams) -> Self {
        self.params = params;
        self
    }
}

impl Plugin for SpeckPlugin {
    fn build(&self, app: &mut App) {
        app.register_type::<SpeckParams>()
            .register_type::<SpeckGravity>()
            .register_type::<GravityWave>();

        app.insert_resource(self.params.clone())
            .init_resource::<SpeckGravity>();

        match SpeckSimulation::new(self.count, self.params.clone()) {
            Ok(simulation) => {
                app.insert_resource(simulation);
            }
            Err(err) => error!("Failed to initialize speck simulation: {err}"),
        }

        app.add_systems(
            Update,
            (
                sync_params,
                apply_gravity_wave.run_if(resource_exists::<GravityWave>),
                run_simulation,
            )
                .chain()
                .run_if(resource_exists::<SpeckSimulation>),
        );
    }
}

/// Push edits of the `SpeckParams` resource into the simulation.
fn sync_params(params: Res<SpeckParams>, mut simulation: ResMut<SpeckSimulation>) {
    if !params.is_changed() || params.is_added() {
        return;
    }
    if let Err(err) = simulation.set_params(params.clone()) {
        warn!("Ignoring speck parameter update: {err}");
    }
}

fn apply_gravity_wave(time: Res<Time>, wave: Res<GravityWave>, mut gravity: ResMut<SpeckGravity>) {
    gravity.0 = wave.sample(time.elapsed_secs(), gravity.0);
}

fn run_simulation(
    time: Res<Time>,
    gravity: Res<SpeckGravity>,
    mut simulation: ResMut<SpeckSimulation>,
) {
    let dt = simulation
        .params()
        .fixed_timestep
        .unwrap_or(time.delta_secs())
        .min(MAX_FRAME_STEP);

    if dt > 0.0 {
        simulation.step(dt, gravity.0);
    }
}
