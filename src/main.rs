//! Specks - headless sloshing demo
//!
//! Runs a box of liquid specks under a sideways gravity wave and logs a
//! summary once per simulated second.
//!
//! ```text
//! specks [params.ron] [speck-count]
//! ```

use std::time::Duration;

use bevy::app::ScheduleRunnerPlugin;
use bevy::log::LogPlugin;
use bevy::prelude::*;
use specks::prelude::*;

const DEFAULT_SPECK_COUNT: usize = 8_000;
const TICKS_PER_REPORT: u64 = 60;

fn main() {
    let mut args = std::env::args().skip(1);

    let params = match args.next() {
        Some(path) => match SpeckParams::load_ron(&path) {
            Ok(params) => params,
            Err(err) => {
                eprintln!("failed to load {path}: {err}");
                std::process::exit(1);
            }
        },
        None => SpeckParams::liquid().with_fixed_timestep(1.0 / 60.0),
    };

    let count = match args.next().map(|arg| arg.parse::<usize>()) {
        Some(Ok(count)) => count,
        Some(Err(err)) => {
            eprintln!("invalid speck count: {err}");
            std::process::exit(1);
        }
        None => DEFAULT_SPECK_COUNT,
    };

    App::new()
        .add_plugins(MinimalPlugins.set(ScheduleRunnerPlugin::run_loop(
            Duration::from_secs_f64(1.0 / 60.0),
        )))
        .add_plugins(LogPlugin::default())
        .add_plugins(SpeckPlugin::new(count).with_params(params))
        .insert_resource(GravityWave::new(4.0, 0.5))
        .add_systems(
            Update,
            report_stats.run_if(resource_exists::<SpeckSimulation>),
        )
        .run();
}

/// Log occupancy and speed figures every `TICKS_PER_REPORT` ticks.
fn report_stats(simulation: Res<SpeckSimulation>, gravity: Res<SpeckGravity>) {
    let tick = simulation.tick();
    if tick == 0 || tick % TICKS_PER_REPORT != 0 {
        return;
    }

    let stats = simulation.stats();

    info!(
        "tick {}: {} occupied cells (max {} specks), speed mean {:.3} max {:.3}, gravity {:?}",
        stats.tick,
        stats.occupied_cells,
        stats.max_occupancy,
        stats.mean_speed,
        stats.max_speed,
        gravity.0
    );
}
