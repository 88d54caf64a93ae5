use std::{path::PathBuf, time::Instant};

use barnes_hut_2d::{run, Config, Execution, Mode, Outcome, Unobserved};
use clap::Parser;
use color_eyre::eyre::Result;

/// Simulate gravitating bodies with the Barnes-Hut approximation.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Initial body list
    #[arg(short, long = "in")]
    input: PathBuf,

    /// Where the final body list is written
    #[arg(short, long = "out")]
    output: PathBuf,

    #[arg(short, long, default_value_t = 1)]
    steps: usize,

    /// Acceptance threshold, 0 computes every interaction exactly
    #[arg(short, long, default_value_t = 0.5)]
    theta: f64,

    /// Time step
    #[arg(short, long, default_value_t = 0.005)]
    delta: f64,

    /// Simulate in a single worker
    #[arg(short = 'S', long)]
    sequential: bool,

    /// Number of workers in distributed mode
    #[arg(short = 'n', long, default_value_t = 4)]
    workers: usize,

    /// Compute the forces of each worker on the rayon thread pool
    #[arg(long)]
    rayon: bool,

    /// Log the time spent in each phase of a step
    #[arg(long)]
    timings: bool,

    /// Increase the log level, can be repeated
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Silence all log output
    #[arg(short, long)]
    quiet: bool,
}

impl Args {
    fn config(&self) -> Config {
        let mode = if self.sequential {
            Mode::Sequential
        } else {
            Mode::Distributed {
                workers: self.workers,
            }
        };
        let execution = if self.rayon {
            Execution::RayonIter
        } else {
            Execution::SingleThreaded
        };

        Config::new(&self.input, &self.output)
            .steps(self.steps)
            .theta(self.theta)
            .delta(self.delta)
            .mode(mode)
            .execution(execution)
    }
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();

    // `--timings` needs at least the info level
    let verbosity = usize::from(args.verbose) + if args.timings { 2 } else { 1 };
    stderrlog::new()
        .module(module_path!())
        .module("barnes_hut_2d")
        .quiet(args.quiet)
        .verbosity(verbosity)
        .timestamp(stderrlog::Timestamp::Millisecond)
        .init()?;

    let start = Instant::now();
    let report = run(&args.config(), &mut Unobserved)?;

    if report.outcome == Outcome::Completed {
        println!("{:.6}", start.elapsed().as_secs_f64());
    }
    if args.timings {
        report.timings.log();
    }

    Ok(())
}
