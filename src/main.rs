use std::process::ExitCode;

use spinbubble::prelude::*;

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match launch() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn launch() -> Result<(), SimulationError> {
    let config = match std::env::args().nth(1) {
        Some(path) => {
            log::info!("loading configuration from {}", path);
            SimConfig::load(path)?
        }
        None => SimConfig::default(),
    };

    let extent = config.mesh.extent;
    let mut mesh = PeriodicSquare::new(config.mesh.resolution, extent, config.tags);
    let lattice = extract(&mut mesh, &config.tags, &extent)?;

    let controller = Controller::from_lattice(
        lattice,
        config.parameters,
        config.seeding,
        config.projection,
    );
    spinbubble::run(config, controller)
}
