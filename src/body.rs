use crate::Vec2;

/// Mass assigned to a body once it has left the simulation domain.
pub const LOST_MASS: f64 = -1.;

/// A point mass.
///
/// Bodies are never removed from a simulation. A body that escapes the domain is
/// marked lost by overwriting its mass with [`LOST_MASS`], so the index of every
/// body stays the same for the whole run.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Body {
    pub index: usize,
    pub position: Vec2,
    pub velocity: Vec2,
    pub force: Vec2,
    pub mass: f64,
}

impl Body {
    #[must_use]
    pub fn new(index: usize, position: Vec2, velocity: Vec2, mass: f64) -> Self {
        Self {
            index,
            position,
            velocity,
            force: Vec2::zeros(),
            mass,
        }
    }

    /// A body at rest.
    #[must_use]
    pub fn at_rest(index: usize, position: Vec2, mass: f64) -> Self {
        Self::new(index, position, Vec2::zeros(), mass)
    }

    #[must_use]
    pub fn is_lost(&self) -> bool {
        self.mass == LOST_MASS
    }

    pub fn mark_lost(&mut self) {
        self.mass = LOST_MASS;
    }

    /// Advance the body by `dt` with the force accumulated for this step.
    ///
    /// x_(i + 1) = x_i + v_i dt + a_i dt^2 / 2
    /// v_(i + 1) = v_i + a_i dt
    pub fn update_position_velocity(&mut self, dt: f64) {
        debug_assert!(!self.is_lost(), "lost bodies must not be integrated");

        let acceleration = self.force / self.mass;
        self.position += self.velocity * dt + acceleration * (0.5 * dt * dt);
        self.velocity += acceleration * dt;
    }
}

/// Sum of the masses of all bodies that are still inside the domain.
#[must_use]
pub fn total_mass(bodies: &[Body]) -> f64 {
    bodies
        .iter()
        .filter(|body| !body.is_lost())
        .map(|body| body.mass)
        .sum()
}
