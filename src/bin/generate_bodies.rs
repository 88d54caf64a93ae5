use std::path::PathBuf;

use barnes_hut_2d::{
    creator::{BodyCreator, CentralBodyCreator, DistrBodyCreator},
    io::write_bodies,
    quadtree::DOMAIN_SIDE,
};
use clap::{Parser, ValueEnum};
use color_eyre::eyre::{ensure, Result};
use rand::{rngs::StdRng, SeedableRng};
use rand_distr::Uniform;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Distribution {
    /// Bodies spread evenly over the domain
    Uniform,
    /// One heavy body in the center, orbited by the others
    Central,
}

/// Write a random body list for the `barnes-hut` simulator.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Number of bodies
    #[arg(short, long = "bodies")]
    n: usize,

    #[arg(short, long = "out")]
    output: PathBuf,

    #[arg(short, long, value_enum, default_value_t = Distribution::Uniform)]
    distribution: Distribution,

    /// Seed of the random number generator
    #[arg(short, long, default_value_t = 0)]
    seed: u64,

    /// Largest initial speed of a uniformly distributed body
    #[arg(long, default_value_t = 0.)]
    max_speed: f64,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();
    ensure!(args.max_speed >= 0., "max speed has to be non-negative");

    let rng = StdRng::seed_from_u64(args.seed);
    let bodies = match args.distribution {
        Distribution::Uniform => DistrBodyCreator::rng(
            Uniform::new(0.1, 10.),
            Uniform::new(0., DOMAIN_SIDE),
            Uniform::new_inclusive(-args.max_speed, args.max_speed),
            rng,
        )
        .create_bodies(args.n),
        Distribution::Central => CentralBodyCreator::rng(
            1e4,
            Uniform::new(0.1, 1.),
            Uniform::new(0.2, DOMAIN_SIDE / 2. - 0.1),
            rng,
        )
        .create_bodies(args.n),
    };

    write_bodies(&args.output, &bodies)?;
    Ok(())
}
