//! File-to-file entry points.

use log::info;

use crate::{
    barnes_hut::BarnesHut,
    body::Body,
    config::{Config, Mode},
    distributed::Cluster,
    io,
    simulation::{Observer, Outcome, Simulation, StepTimings},
    Error,
};

/// What happened during a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Report {
    pub outcome: Outcome,
    /// Timings of the process that wrote the output.
    pub timings: StepTimings,
}

/// Run the simulation described by `config` in the mode it asks for.
pub fn run(config: &Config, observer: &mut impl Observer) -> Result<Report, Error> {
    match config.mode {
        Mode::Sequential => simulate_sequential(config, observer),
        Mode::Distributed { .. } => simulate_distributed(config, observer),
    }
}

/// Read the input, simulate every body in this thread and write the output.
///
/// If `observer` stops the simulation no output is written.
pub fn simulate_sequential(
    config: &Config,
    observer: &mut impl Observer,
) -> Result<Report, Error> {
    config.validate()?;
    let bodies = read(config)?;

    let mut simulation = Simulation::new(bodies, solver(config));
    let outcome = simulation.simulate(config.delta, config.steps, observer);

    finish(config, outcome, simulation.bodies(), *simulation.timings())
}

/// Read the input, simulate on `config.mode.workers()` workers and write the output.
///
/// If `observer` stops the simulation no output is written.
pub fn simulate_distributed(
    config: &Config,
    observer: &mut impl Observer,
) -> Result<Report, Error> {
    config.validate()?;
    let bodies = read(config)?;

    let run = Cluster::new(config.mode.workers(), solver(config)).simulate(
        bodies,
        config.delta,
        config.steps,
        observer,
    )?;

    finish(config, run.outcome, &run.bodies, run.timings)
}

fn solver(config: &Config) -> BarnesHut {
    BarnesHut::new(config.theta).execution(config.execution)
}

fn read(config: &Config) -> Result<Vec<Body>, Error> {
    let bodies = io::read_bodies(&config.input)?;
    info!("read {} bodies from {:?}", bodies.len(), config.input);
    Ok(bodies)
}

fn finish(
    config: &Config,
    outcome: Outcome,
    bodies: &[Body],
    timings: StepTimings,
) -> Result<Report, Error> {
    match outcome {
        Outcome::Completed => {
            io::write_bodies(&config.output, bodies)?;
            info!("wrote {} bodies to {:?}", bodies.len(), config.output);
        }
        Outcome::Terminated { step } => {
            info!("terminated before step {step}, no output written");
        }
    }

    Ok(Report { outcome, timings })
}
