//! Run configuration shared by the sequential and the distributed entry points.

use std::path::PathBuf;

use crate::{Error, Execution};

/// How the bodies are split over workers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    /// One process simulates every body.
    Sequential,
    /// `workers` isolated workers each own a static range of bodies.
    Distributed { workers: usize },
}

impl Mode {
    /// Number of workers taking part in a run.
    #[must_use]
    pub fn workers(&self) -> usize {
        match self {
            Mode::Sequential => 1,
            Mode::Distributed { workers } => *workers,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    /// Initial body list.
    pub input: PathBuf,
    /// Where the final body list is written.
    pub output: PathBuf,
    pub steps: usize,
    /// Multipole acceptance threshold, 0 evaluates every pair exactly.
    pub theta: f64,
    /// Time step.
    pub delta: f64,
    pub mode: Mode,
    /// How each worker evaluates its forces.
    pub execution: Execution,
}

impl Config {
    #[must_use]
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            steps: 1,
            theta: 0.5,
            delta: 0.005,
            mode: Mode::Sequential,
            execution: Execution::SingleThreaded,
        }
    }

    #[must_use]
    pub fn steps(mut self, steps: usize) -> Self {
        self.steps = steps;
        self
    }

    #[must_use]
    pub fn theta(mut self, theta: f64) -> Self {
        self.theta = theta;
        self
    }

    #[must_use]
    pub fn delta(mut self, delta: f64) -> Self {
        self.delta = delta;
        self
    }

    #[must_use]
    pub fn mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    #[must_use]
    pub fn execution(mut self, execution: Execution) -> Self {
        self.execution = execution;
        self
    }

    pub fn validate(&self) -> Result<(), Error> {
        if !(self.theta >= 0.) {
            return Err(Error::InvalidConfig(format!(
                "theta has to be non-negative, got {}",
                self.theta
            )));
        }
        if !(self.delta.is_finite() && self.delta > 0.) {
            return Err(Error::InvalidConfig(format!(
                "delta has to be positive, got {}",
                self.delta
            )));
        }
        if self.mode.workers() == 0 {
            return Err(Error::InvalidConfig(
                "at least one worker is required".to_owned(),
            ));
        }
        Ok(())
    }
}
