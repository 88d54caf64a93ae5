use std::{
    ops::ControlFlow,
    time::{Duration, Instant},
};

use log::{debug, info, trace};

use crate::{
    barnes_hut::BarnesHut,
    body::Body,
    gravity::{ForceLaw, Gravity},
    quadtree::QuadTree,
};

/// Called once per step, after the tree has been rebuilt and before forces are computed.
///
/// Returning [`ControlFlow::Break`] ends the simulation without finishing the step.
pub trait Observer {
    fn observe(&mut self, step: usize, bodies: &[Body], tree: &QuadTree) -> ControlFlow<()>;

    /// Whether [`Observer::observe`] has to be called at all.
    fn is_active(&self) -> bool {
        true
    }
}

impl<F> Observer for F
where
    F: FnMut(usize, &[Body], &QuadTree) -> ControlFlow<()>,
{
    fn observe(&mut self, step: usize, bodies: &[Body], tree: &QuadTree) -> ControlFlow<()> {
        self(step, bodies, tree)
    }
}

/// An [`Observer`] that never looks at the simulation.
#[derive(Clone, Copy, Debug, Default)]
pub struct Unobserved;

impl Observer for Unobserved {
    fn observe(&mut self, _: usize, _: &[Body], _: &QuadTree) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }

    fn is_active(&self) -> bool {
        false
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// All steps were simulated.
    Completed,
    /// The observer stopped the simulation before `step` was simulated.
    Terminated { step: usize },
}

/// Wall time spent in the phases of a step, summed over all steps.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StepTimings {
    pub steps: usize,
    pub total: Duration,
    pub build_tree: Duration,
    pub compute_forces: Duration,
    pub update_position_velocity: Duration,
}

impl StepTimings {
    fn average(&self, duration: Duration) -> Duration {
        if self.steps == 0 {
            Duration::ZERO
        } else {
            duration / self.steps as u32
        }
    }

    #[must_use]
    pub fn avg_step(&self) -> Duration {
        self.average(self.total)
    }

    #[must_use]
    pub fn avg_build_tree(&self) -> Duration {
        self.average(self.build_tree)
    }

    #[must_use]
    pub fn avg_compute_forces(&self) -> Duration {
        self.average(self.compute_forces)
    }

    #[must_use]
    pub fn avg_update_position_velocity(&self) -> Duration {
        self.average(self.update_position_velocity)
    }

    pub fn log(&self) {
        info!("total_time:{}", self.total.as_millis());
        info!("avg_step_time:{}", self.avg_step().as_millis());
        info!("build_tree_time:{}", self.avg_build_tree().as_millis());
        info!("compute_forces_time:{}", self.avg_compute_forces().as_millis());
        info!(
            "update_position_velocity_time:{}",
            self.avg_update_position_velocity().as_millis()
        );
    }
}

/// Times the phases of one step.
pub(crate) struct StepTimer {
    start: Instant,
    phase: Instant,
}

impl StepTimer {
    pub(crate) fn start() -> Self {
        let now = Instant::now();
        Self {
            start: now,
            phase: now,
        }
    }

    /// Time since the previous lap.
    pub(crate) fn lap(&mut self) -> Duration {
        let now = Instant::now();
        let elapsed = now - self.phase;
        self.phase = now;
        elapsed
    }

    pub(crate) fn total(&self) -> Duration {
        self.start.elapsed()
    }
}

/// Advance every body that is not lost by `delta`.
pub fn update_positions_velocities(bodies: &mut [Body], delta: f64) {
    bodies
        .iter_mut()
        .filter(|body| !body.is_lost())
        .for_each(|body| body.update_position_velocity(delta));
}

/// A single-process simulation.
#[derive(Clone, Debug)]
pub struct Simulation<L = Gravity> {
    bodies: Vec<Body>,
    solver: BarnesHut<L>,
    timings: StepTimings,
}

impl<L: ForceLaw> Simulation<L> {
    #[must_use]
    pub fn new(bodies: Vec<Body>, solver: BarnesHut<L>) -> Self {
        Self {
            bodies,
            solver,
            timings: StepTimings::default(),
        }
    }

    #[must_use]
    pub fn bodies(&self) -> &[Body] {
        &self.bodies
    }

    #[must_use]
    pub fn into_bodies(self) -> Vec<Body> {
        self.bodies
    }

    #[must_use]
    pub fn timings(&self) -> &StepTimings {
        &self.timings
    }

    /// Number of steps simulated so far, which is also the number of the next step.
    #[must_use]
    pub fn steps(&self) -> usize {
        self.timings.steps
    }

    /// Simulate one step without an observer.
    pub fn step(&mut self, delta: f64) {
        // `Unobserved` never breaks
        let _ = self.observed_step(self.steps(), delta, &mut Unobserved);
    }

    /// Simulate `num_steps` more steps of size `delta`.
    ///
    /// Steps are numbered across calls, so after two steps the observer first sees step 2.
    pub fn simulate(
        &mut self,
        delta: f64,
        num_steps: usize,
        observer: &mut impl Observer,
    ) -> Outcome {
        for _ in 0..num_steps {
            let step = self.steps();
            if self.observed_step(step, delta, observer).is_break() {
                debug!("simulation stopped by observer before step {step}");
                return Outcome::Terminated { step };
            }
        }

        Outcome::Completed
    }

    fn observed_step(
        &mut self,
        step: usize,
        delta: f64,
        observer: &mut impl Observer,
    ) -> ControlFlow<()> {
        let mut timer = StepTimer::start();

        let tree = QuadTree::new(&mut self.bodies);
        self.timings.build_tree += timer.lap();
        trace!("step {step}\n{tree}");

        if observer.is_active() {
            observer.observe(step, &self.bodies, &tree)?;
            timer.lap();
        }

        self.solver.compute_forces(&mut self.bodies, &tree);
        self.timings.compute_forces += timer.lap();

        update_positions_velocities(&mut self.bodies, delta);
        self.timings.update_position_velocity += timer.lap();

        self.timings.total += timer.total();
        self.timings.steps += 1;

        ControlFlow::Continue(())
    }
}

#[cfg(test)]
mod tests {
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    use super::*;
    use crate::{body::total_mass, gravity::G, Vec2};

    #[test]
    fn two_bodies_attract_along_x() {
        let bodies = vec![
            Body::at_rest(0, Vec2::new(1., 1.), 1.),
            Body::at_rest(1, Vec2::new(3., 1.), 1.),
        ];
        let mut simulation = Simulation::new(bodies, BarnesHut::new(0.5));

        let delta = 0.005;
        simulation.step(delta);

        let [b0, b1] = simulation.bodies() else {
            panic!("expected two bodies");
        };
        let magnitude = G * 1. * 1. / (2. * 2.);
        assert_relative_eq!(b0.force.x, magnitude);
        assert_relative_eq!(b1.force.x, -magnitude);
        assert_abs_diff_eq!(b0.force.y, 0.);
        assert_abs_diff_eq!(b1.force.y, 0.);

        assert!(b0.velocity.x > 0.);
        assert!(b1.velocity.x < 0.);
        assert_relative_eq!(b0.velocity.x, magnitude * delta);
        assert_relative_eq!(b0.position.x, 1. + 0.5 * magnitude * delta * delta);
        assert_abs_diff_eq!(b0.position.y, 1.);
        assert_abs_diff_eq!(b1.velocity.y, 0.);
    }

    #[test]
    fn mass_is_conserved() {
        let bodies: Vec<_> = (0..30)
            .map(|i| {
                let phi = i as f64 * 0.2;
                Body::at_rest(
                    i,
                    Vec2::new(2. + phi.cos(), 2. + phi.sin()),
                    1. + i as f64 * 0.1,
                )
            })
            .collect();
        let before = total_mass(&bodies);
        let mut simulation = Simulation::new(bodies, BarnesHut::new(0.5));

        for _ in 0..10 {
            simulation.step(0.01);
            assert_relative_eq!(total_mass(simulation.bodies()), before);
        }
    }

    #[test]
    fn escaped_body_stays_lost() {
        let bodies = vec![
            Body::at_rest(0, Vec2::new(2., 2.), 1.),
            Body::new(1, Vec2::new(3.9, 2.), Vec2::new(1., 0.), 1.),
            Body::at_rest(2, Vec2::new(1., 1.), 1.),
        ];
        let mut simulation = Simulation::new(bodies, BarnesHut::new(0.5));

        // 3.9 + 0.2 leaves the domain during the first step
        simulation.step(0.2);
        assert!(!simulation.bodies()[1].is_lost());
        let escaped = simulation.bodies()[1];

        simulation.step(0.2);
        let lost = simulation.bodies()[1];
        assert!(lost.is_lost());
        assert_eq!(lost.position, escaped.position);
        assert_eq!(lost.velocity, escaped.velocity);

        simulation.step(0.2);
        assert_eq!(simulation.bodies()[1].position, escaped.position);

        let mut seen = Vec::new();
        simulation.simulate(0.2, 3, &mut |_: usize, _: &[Body], tree: &QuadTree| {
            seen.push(tree.len());
            ControlFlow::Continue(())
        });
        assert_eq!(seen, vec![2, 2, 2]);
    }

    #[test]
    fn observer_can_stop() {
        let bodies = vec![
            Body::at_rest(0, Vec2::new(1., 1.), 1.),
            Body::at_rest(1, Vec2::new(3., 1.), 1.),
        ];
        let mut simulation = Simulation::new(bodies.clone(), BarnesHut::new(0.5));

        let mut observer = |step: usize, _: &[Body], _: &QuadTree| {
            if step == 2 {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        };
        let outcome = simulation.simulate(0.01, 10, &mut observer);

        assert_eq!(outcome, Outcome::Terminated { step: 2 });
        assert_eq!(simulation.timings().steps, 2);

        let mut reference = Simulation::new(bodies, BarnesHut::new(0.5));
        assert_eq!(reference.simulate(0.01, 2, &mut Unobserved), Outcome::Completed);
        assert_eq!(simulation.bodies(), reference.bodies());
    }

    #[test]
    fn steps_are_numbered_across_calls() {
        let bodies = vec![
            Body::at_rest(0, Vec2::new(1., 1.), 1.),
            Body::at_rest(1, Vec2::new(3., 1.), 1.),
        ];
        let mut simulation = Simulation::new(bodies, BarnesHut::new(0.5));
        simulation.step(0.01);
        simulation.step(0.01);

        let mut seen = Vec::new();
        let mut observer = |step: usize, _: &[Body], _: &QuadTree| {
            seen.push(step);
            if step == 4 {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        };
        assert_eq!(simulation.simulate(0.01, 2, &mut observer), Outcome::Completed);
        assert_eq!(
            simulation.simulate(0.01, 2, &mut observer),
            Outcome::Terminated { step: 4 }
        );

        assert_eq!(seen, vec![2, 3, 4]);
        assert_eq!(simulation.steps(), 4);
    }

    #[test]
    fn timings_average_over_steps() {
        let timings = StepTimings {
            steps: 4,
            total: Duration::from_millis(40),
            build_tree: Duration::from_millis(8),
            compute_forces: Duration::from_millis(20),
            update_position_velocity: Duration::from_millis(4),
        };

        assert_eq!(timings.avg_step(), Duration::from_millis(10));
        assert_eq!(timings.avg_build_tree(), Duration::from_millis(2));
        assert_eq!(timings.avg_compute_forces(), Duration::from_millis(5));
        assert_eq!(timings.avg_update_position_velocity(), Duration::from_millis(1));
        assert_eq!(StepTimings::default().avg_step(), Duration::ZERO);
    }
}
