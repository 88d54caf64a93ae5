//! Two-dimensional Barnes-Hut N-body simulation.
//!
//! Bodies live in a fixed square domain. Every step a [`QuadTree`] is rebuilt from
//! scratch, forces are evaluated with the Barnes-Hut approximation and the bodies
//! are advanced with a second-order Taylor step. The work can either run in a
//! single [`Simulation`] or be split across several workers, each owning a static
//! range of body indices (see [`distributed`]).

pub mod barnes_hut;
pub mod body;
pub mod config;
#[cfg(feature = "randomization")]
pub mod creator;
pub mod distributed;
pub mod driver;
pub mod error;
pub mod gravity;
pub mod io;
pub mod quadtree;
pub mod simulation;

/// The vector type used for positions, velocities and forces.
pub type Vec2 = nalgebra::Vector2<f64>;

pub use barnes_hut::{compute_forces, BarnesHut};
pub use body::Body;
pub use config::{Config, Mode};
pub use distributed::{Cluster, Partition};
pub use driver::{run, simulate_distributed, simulate_sequential, Report};
pub use error::Error;
pub use gravity::{ForceLaw, Gravity};
pub use quadtree::{Domain, Node, QuadTree, Quadrant};
pub use simulation::{Observer, Outcome, Simulation, StepTimings, Unobserved};

/// How forces are evaluated within a single step.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Execution {
    #[default]
    SingleThreaded,
    /// Bodies are split across the rayon thread pool, all threads share one tree.
    #[cfg(feature = "rayon")]
    RayonIter,
}
