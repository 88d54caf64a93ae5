//! Random initial conditions.

use std::f64::consts::PI;

use rand::{rngs::ThreadRng, Rng};
use rand_distr::{Distribution, Uniform};

use crate::{body::Body, gravity::G, quadtree::Domain, Vec2};

pub trait BodyCreator {
    fn create_body(&mut self, index: usize) -> Body;

    fn create_bodies(&mut self, n: usize) -> Vec<Body> {
        (0..n).map(|index| self.create_body(index)).collect()
    }
}

/// Samples every component of every body independently.
pub struct DistrBodyCreator<R, MD, PD, VD>
where
    R: Rng,
    MD: Distribution<f64>,
    PD: Distribution<f64>,
    VD: Distribution<f64>,
{
    rng: R,
    mass_distr: MD,
    position_distr: PD,
    velocity_distr: VD,
}

impl<MD, PD, VD> DistrBodyCreator<ThreadRng, MD, PD, VD>
where
    MD: Distribution<f64>,
    PD: Distribution<f64>,
    VD: Distribution<f64>,
{
    pub fn new(mass_distr: MD, position_distr: PD, velocity_distr: VD) -> Self {
        Self::rng(mass_distr, position_distr, velocity_distr, rand::thread_rng())
    }
}

impl<R, MD, PD, VD> DistrBodyCreator<R, MD, PD, VD>
where
    R: Rng,
    MD: Distribution<f64>,
    PD: Distribution<f64>,
    VD: Distribution<f64>,
{
    pub fn rng(mass_distr: MD, position_distr: PD, velocity_distr: VD, rng: R) -> Self {
        Self {
            rng,
            mass_distr,
            position_distr,
            velocity_distr,
        }
    }
}

impl<R, MD, PD, VD> BodyCreator for DistrBodyCreator<R, MD, PD, VD>
where
    R: Rng,
    MD: Distribution<f64>,
    PD: Distribution<f64>,
    VD: Distribution<f64>,
{
    fn create_body(&mut self, index: usize) -> Body {
        let rng = &mut self.rng;

        let mass = self.mass_distr.sample(rng);
        let position = Vec2::new(
            self.position_distr.sample(rng),
            self.position_distr.sample(rng),
        );
        let velocity = Vec2::new(
            self.velocity_distr.sample(rng),
            self.velocity_distr.sample(rng),
        );

        Body::new(index, position, velocity, mass)
    }
}

/// A heavy body in the center of the domain, orbited by lighter ones.
///
/// The first body created is the central one, every other body starts on a circular
/// orbit around it.
#[derive(Clone)]
pub struct CentralBodyCreator<R, MD, RD>
where
    R: Rng,
    MD: Distribution<f64>,
    RD: Distribution<f64>,
{
    rng: R,
    central_mass: f64,
    mass_distr: MD,
    radial_distr: RD,
    center: Vec2,
    first_body: bool,
}

impl<MD, RD> CentralBodyCreator<ThreadRng, MD, RD>
where
    MD: Distribution<f64>,
    RD: Distribution<f64>,
{
    pub fn new(central_mass: f64, mass_distr: MD, radial_distr: RD) -> Self {
        Self::rng(central_mass, mass_distr, radial_distr, rand::thread_rng())
    }
}

impl<R, MD, RD> CentralBodyCreator<R, MD, RD>
where
    R: Rng,
    MD: Distribution<f64>,
    RD: Distribution<f64>,
{
    pub fn rng(central_mass: f64, mass_distr: MD, radial_distr: RD, rng: R) -> Self {
        let domain = Domain::default();
        Self {
            rng,
            central_mass,
            mass_distr,
            radial_distr,
            center: domain.origin() + Vec2::from_element(domain.side_length() / 2.),
            first_body: true,
        }
    }
}

impl<R, MD, RD> BodyCreator for CentralBodyCreator<R, MD, RD>
where
    R: Rng,
    MD: Distribution<f64>,
    RD: Distribution<f64>,
{
    fn create_body(&mut self, index: usize) -> Body {
        if self.first_body {
            self.first_body = false;
            return Body::at_rest(index, self.center, self.central_mass);
        }

        let rng = &mut self.rng;

        let r = self.radial_distr.sample(rng);
        let phi = Uniform::new(0., 2. * PI).sample(rng);
        let position = self.center + Vec2::new(phi.cos(), phi.sin()) * r;
        let velocity = Vec2::new(-phi.sin(), phi.cos()) * (G * self.central_mass / r).sqrt();

        Body::new(index, position, velocity, self.mass_distr.sample(rng))
    }
}
