//! Simulation on several isolated workers.
//!
//! Every worker holds a full copy of the body array but only advances a static,
//! contiguous range of it. After each step the ranges are exchanged so all copies
//! agree again.

mod channel;

use std::{
    ops::Range,
    panic::{self, AssertUnwindSafe},
    thread,
};

use log::{debug, info, trace};

pub use channel::{ChannelCommunicator, Communicator, Message, ROOT};

use crate::{
    barnes_hut::BarnesHut,
    body::Body,
    gravity::{ForceLaw, Gravity},
    quadtree::QuadTree,
    simulation::{update_positions_velocities, Observer, Outcome, StepTimer, StepTimings, Unobserved},
    Error,
};

/// Splits `len` bodies into `workers` contiguous ranges of nearly equal size.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Partition {
    len: usize,
    workers: usize,
}

impl Partition {
    pub fn new(len: usize, workers: usize) -> Result<Self, Error> {
        if workers == 0 {
            return Err(Error::InvalidConfig(
                "at least one worker is required".to_owned(),
            ));
        }
        Ok(Self { len, workers })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[must_use]
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// The bodies owned by `rank`, `len * rank / workers .. len * (rank + 1) / workers`.
    #[must_use]
    pub fn range(&self, rank: usize) -> Range<usize> {
        self.len * rank / self.workers..self.len * (rank + 1) / self.workers
    }

    pub fn ranges(&self) -> impl Iterator<Item = Range<usize>> + '_ {
        (0..self.workers).map(|rank| self.range(rank))
    }
}

/// Result of a run, as seen by [`ROOT`].
#[derive(Clone, Debug, PartialEq)]
pub struct ClusterRun {
    pub outcome: Outcome,
    pub bodies: Vec<Body>,
    pub timings: StepTimings,
}

/// A group of workers simulating one body array together.
#[derive(Clone, Copy, Debug)]
pub struct Cluster<L = Gravity> {
    workers: usize,
    solver: BarnesHut<L>,
}

impl<L: ForceLaw> Cluster<L> {
    #[must_use]
    pub fn new(workers: usize, solver: BarnesHut<L>) -> Self {
        Self { workers, solver }
    }

    #[must_use]
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Simulate `num_steps` steps of size `delta` on a cluster of threads.
    ///
    /// `bodies` are handed to [`ROOT`], which runs on the calling thread and is the
    /// only worker calling `observer`. The returned bodies are the root's copy.
    ///
    /// A worker that panics disconnects from its peers, which then stop as well.
    /// The panic is reported as [`Error::WorkerPanicked`].
    pub fn simulate(
        &self,
        bodies: Vec<Body>,
        delta: f64,
        num_steps: usize,
        observer: &mut impl Observer,
    ) -> Result<ClusterRun, Error> {
        if self.workers == 0 {
            return Err(Error::InvalidConfig(
                "at least one worker is required".to_owned(),
            ));
        }
        info!(
            "simulating {} bodies on {} workers",
            bodies.len(),
            self.workers
        );

        let mut communicators = ChannelCommunicator::cluster(self.workers).into_iter();
        let Some(root) = communicators.next() else {
            unreachable!("a cluster has at least one worker");
        };

        thread::scope(|s| {
            let handles: Vec<_> = communicators
                .map(|comm| {
                    s.spawn(move || {
                        self.run_worker(comm, Vec::new(), delta, num_steps, &mut Unobserved)
                    })
                })
                .collect();

            let mut run = panic::catch_unwind(AssertUnwindSafe(|| {
                self.run_worker(root, bodies, delta, num_steps, observer)
            }))
            .unwrap_or(Err(Error::WorkerPanicked { rank: ROOT }));

            for (rank, handle) in (1..).zip(handles) {
                let result = handle
                    .join()
                    .map_or(Err(Error::WorkerPanicked { rank }), |result| {
                        result.map(drop)
                    });
                run = merge_results(run, result);
            }

            run
        })
    }

    /// The step loop of a single worker.
    ///
    /// Only the bodies of [`ROOT`] are used, the others receive theirs by broadcast.
    pub fn run_worker(
        &self,
        comm: impl Communicator,
        mut bodies: Vec<Body>,
        delta: f64,
        num_steps: usize,
        observer: &mut impl Observer,
    ) -> Result<ClusterRun, Error> {
        let rank = comm.rank();
        comm.broadcast_bodies(&mut bodies)?;
        let mut watched = observer.is_active();
        comm.broadcast_flag(&mut watched)?;

        let partition = Partition::new(bodies.len(), comm.size())?;
        let own = partition.range(rank);
        debug!("worker {rank} owns bodies {own:?}");

        let mut timings = StepTimings::default();
        for step in 0..num_steps {
            let mut timer = StepTimer::start();

            let tree = QuadTree::new(&mut bodies);
            timings.build_tree += timer.lap();

            if rank == ROOT {
                trace!("step {step}\n{tree}");
            }

            if watched {
                let mut stop = false;
                if rank == ROOT {
                    stop = observer.observe(step, &bodies, &tree).is_break();
                }
                comm.broadcast_flag(&mut stop)?;
                timer.lap();

                if stop {
                    debug!("worker {rank} stopped before step {step}");
                    return Ok(ClusterRun {
                        outcome: Outcome::Terminated { step },
                        bodies,
                        timings,
                    });
                }
            }

            self.solver.compute_forces(&mut bodies[own.clone()], &tree);
            timings.compute_forces += timer.lap();

            update_positions_velocities(&mut bodies[own.clone()], delta);
            timings.update_position_velocity += timer.lap();

            comm.exchange(&mut bodies, &partition)?;

            timings.total += timer.total();
            timings.steps += 1;
        }

        Ok(ClusterRun {
            outcome: Outcome::Completed,
            bodies,
            timings,
        })
    }
}

/// Combine the result of the root with the result of another worker.
///
/// A panic wins over any other error.
fn merge_results(
    run: Result<ClusterRun, Error>,
    other: Result<(), Error>,
) -> Result<ClusterRun, Error> {
    match (run, other) {
        (Ok(run), Ok(())) => Ok(run),
        (Err(err @ Error::WorkerPanicked { .. }), _)
        | (_, Err(err @ Error::WorkerPanicked { .. })) => Err(err),
        (Err(err), _) | (Ok(_), Err(err)) => Err(err),
    }
}
