use crate::Vec2;

/// Gravitational constant in simulation units.
pub const G: f64 = 0.0001;

/// Interactions closer than this are evaluated as if they were this far apart.
pub const SOFTENING: f64 = 0.03;

/// A pairwise force between two point masses.
pub trait ForceLaw: Send + Sync {
    /// Force on a body of `target_mass` exerted by `source_mass`.
    ///
    /// `displacement` points from the target to the source and `distance` is its
    /// length, which is never zero.
    fn force(&self, target_mass: f64, source_mass: f64, displacement: Vec2, distance: f64) -> Vec2;
}

/// Newtonian gravity with the distance clamped to a softening length.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Gravity {
    g: f64,
    softening: f64,
}

impl Gravity {
    #[must_use]
    pub fn new(g: f64, softening: f64) -> Self {
        Self { g, softening }
    }

    #[must_use]
    pub fn g(&self) -> f64 {
        self.g
    }

    #[must_use]
    pub fn softening(&self) -> f64 {
        self.softening
    }
}

impl Default for Gravity {
    fn default() -> Self {
        Self::new(G, SOFTENING)
    }
}

impl ForceLaw for Gravity {
    fn force(&self, target_mass: f64, source_mass: f64, displacement: Vec2, distance: f64) -> Vec2 {
        let d = distance.max(self.softening);
        let magnitude = self.g * target_mass * source_mass / (d * d);
        displacement * (magnitude / distance)
    }
}
