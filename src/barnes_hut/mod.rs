#[cfg(feature = "rayon")]
use rayon::prelude::*;

use crate::{
    body::Body,
    gravity::{ForceLaw, Gravity},
    quadtree::{Content, Node, PointMass, QuadTree},
    Execution, Vec2,
};

/// The Barnes-Hut force evaluator.
///
/// A subtree is replaced by a point mass at its center of mass as soon as
/// `side_length / distance < theta`. With `theta = 0` every interaction is evaluated
/// exactly.
#[derive(Clone, Copy, Debug)]
pub struct BarnesHut<L = Gravity> {
    theta: f64,
    law: L,
    execution: Execution,
}

impl BarnesHut {
    #[must_use]
    pub fn new(theta: f64) -> Self {
        Self::with_law(theta, Gravity::default())
    }
}

impl<L: ForceLaw> BarnesHut<L> {
    #[must_use]
    pub fn with_law(theta: f64, law: L) -> Self {
        Self {
            theta,
            law,
            execution: Execution::SingleThreaded,
        }
    }

    #[must_use]
    pub fn execution(mut self, execution: Execution) -> Self {
        self.execution = execution;
        self
    }

    /// Use Rayon to calculate the forces with multiple threads.
    ///
    /// All threads calculate the forces from the shared tree, splitting the bodies.
    #[cfg(feature = "rayon")]
    #[must_use]
    pub fn rayon_iter(self) -> Self {
        self.execution(Execution::RayonIter)
    }

    #[must_use]
    pub fn theta(&self) -> f64 {
        self.theta
    }

    #[must_use]
    pub fn law(&self) -> &L {
        &self.law
    }

    /// Overwrite the force of every body in `bodies` that is not lost.
    ///
    /// `bodies` may be any part of the body array the tree was built from, the tree
    /// itself is only read. Lost bodies keep whatever force they had.
    pub fn compute_forces(&self, bodies: &mut [Body], tree: &QuadTree) {
        match self.execution {
            Execution::SingleThreaded => {
                bodies
                    .iter_mut()
                    .filter(|body| !body.is_lost())
                    .for_each(|body| body.force = self.force_on(body, tree));
            }
            #[cfg(feature = "rayon")]
            Execution::RayonIter => {
                bodies
                    .par_iter_mut()
                    .filter(|body| !body.is_lost())
                    .for_each(|body| body.force = self.force_on(body, tree));
            }
        }
    }

    /// Total force exerted by the bodies in `tree` on `body`.
    #[must_use]
    pub fn force_on(&self, body: &Body, tree: &QuadTree) -> Vec2 {
        let mut force = Vec2::zeros();
        self.accumulate(tree.root(), body, &mut force);
        force
    }

    fn accumulate(&self, node: &Node, body: &Body, force: &mut Vec2) {
        match &node.content {
            Content::Empty => {}
            Content::Internal(children) => {
                let displacement = node.center_of_mass() - body.position;
                let distance = displacement.norm();
                if distance == 0. {
                    return;
                }

                if node.side_length() / distance < self.theta {
                    // node is far enough away
                    *force += self
                        .law
                        .force(body.mass, node.total_mass(), displacement, distance);
                } else {
                    // near field forces, go deeper into tree
                    for child in children.iter() {
                        self.accumulate(child, body, force);
                    }
                }
            }
            Content::Body(index) => {
                let source = PointMass::new(node.total_mass(), node.center_of_mass());
                self.accumulate_pair(body, *index, &source, force);
            }
            Content::Coincident(members) => {
                for (index, source) in members {
                    self.accumulate_pair(body, *index, source, force);
                }
            }
        }
    }

    fn accumulate_pair(&self, body: &Body, index: usize, source: &PointMass, force: &mut Vec2) {
        // lost bodies never make it into the tree, only self-interaction has to be excluded
        if index == body.index {
            return;
        }

        let displacement = source.position - body.position;
        let distance = displacement.norm();
        if distance == 0. {
            return;
        }

        *force += self.law.force(body.mass, source.mass, displacement, distance);
    }
}

/// Compute Newtonian forces for `bodies` from `tree` with the default [`Gravity`].
pub fn compute_forces(bodies: &mut [Body], tree: &QuadTree, theta: f64) {
    BarnesHut::new(theta).compute_forces(bodies, tree);
}
