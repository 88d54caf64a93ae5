use std::fmt;

use log::debug;

use crate::{body::Body, Vec2};

/// Side length of the default simulation domain.
pub const DOMAIN_SIDE: f64 = 4.;

/// Deepest level a node is subdivided to.
///
/// Bodies that still share a leaf at this depth are kept together in a single
/// coincident leaf instead of subdividing forever. At the default domain size
/// this only happens for bodies closer than about 1e-9.
pub const MAX_DEPTH: usize = 32;

/// The square region bodies are simulated in. Bounds are inclusive.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Domain {
    origin: Vec2,
    side_length: f64,
}

impl Domain {
    #[must_use]
    pub fn new(origin: Vec2, side_length: f64) -> Self {
        Self {
            origin,
            side_length,
        }
    }

    #[must_use]
    pub fn origin(&self) -> Vec2 {
        self.origin
    }

    #[must_use]
    pub fn side_length(&self) -> f64 {
        self.side_length
    }

    #[must_use]
    pub fn contains(&self, position: &Vec2) -> bool {
        in_region(position, &self.origin, self.side_length)
    }
}

impl Default for Domain {
    fn default() -> Self {
        Self::new(Vec2::zeros(), DOMAIN_SIDE)
    }
}

fn in_region(position: &Vec2, origin: &Vec2, side_length: f64) -> bool {
    position.x >= origin.x
        && position.x <= origin.x + side_length
        && position.y >= origin.y
        && position.y <= origin.y + side_length
}

/// The four children of an internal node, in routing order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Quadrant {
    NorthWest,
    NorthEast,
    SouthWest,
    SouthEast,
}

impl Quadrant {
    pub const ALL: [Self; 4] = [
        Self::NorthWest,
        Self::NorthEast,
        Self::SouthWest,
        Self::SouthEast,
    ];

    fn index(self) -> usize {
        match self {
            Self::NorthWest => 0,
            Self::NorthEast => 1,
            Self::SouthWest => 2,
            Self::SouthEast => 3,
        }
    }

    fn origin(self, parent_origin: Vec2, half: f64) -> Vec2 {
        match self {
            Self::NorthWest => parent_origin + Vec2::new(0., half),
            Self::NorthEast => parent_origin + Vec2::new(half, half),
            Self::SouthWest => parent_origin,
            Self::SouthEast => parent_origin + Vec2::new(half, 0.),
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::NorthWest => "NW",
            Self::NorthEast => "NE",
            Self::SouthWest => "SW",
            Self::SouthEast => "SE",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointMass {
    pub mass: f64,
    pub position: Vec2,
}

impl PointMass {
    #[must_use]
    pub fn new(mass: f64, position: Vec2) -> Self {
        Self { mass, position }
    }
}

#[derive(Clone, Debug)]
pub(crate) enum Content {
    Empty,
    /// Index of the only body in this leaf. Its mass and position are the node's aggregates.
    Body(usize),
    Internal(Box<[Node; 4]>),
    /// Leaf at [`MAX_DEPTH`] holding every body routed to it.
    Coincident(Vec<(usize, PointMass)>),
}

/// A square region of the tree.
#[derive(Clone, Debug)]
pub struct Node {
    origin: Vec2,
    side_length: f64,
    total_mass: f64,
    center_of_mass: Vec2,
    n_bodies: usize,
    pub(crate) content: Content,
}

impl Node {
    fn new(origin: Vec2, side_length: f64) -> Self {
        Self {
            origin,
            side_length,
            total_mass: 0.,
            center_of_mass: Vec2::zeros(),
            n_bodies: 0,
            content: Content::Empty,
        }
    }

    /// Bottom-left corner of the region.
    #[must_use]
    pub fn origin(&self) -> Vec2 {
        self.origin
    }

    #[must_use]
    pub fn side_length(&self) -> f64 {
        self.side_length
    }

    #[must_use]
    pub fn total_mass(&self) -> f64 {
        self.total_mass
    }

    #[must_use]
    pub fn center_of_mass(&self) -> Vec2 {
        self.center_of_mass
    }

    #[must_use]
    pub fn n_bodies(&self) -> usize {
        self.n_bodies
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.n_bodies == 0
    }

    #[must_use]
    pub fn is_internal(&self) -> bool {
        matches!(self.content, Content::Internal(_))
    }

    /// Index of the body held directly by a single-body leaf.
    #[must_use]
    pub fn body(&self) -> Option<usize> {
        match self.content {
            Content::Body(index) => Some(index),
            _ => None,
        }
    }

    #[must_use]
    pub fn child(&self, quadrant: Quadrant) -> Option<&Node> {
        match &self.content {
            Content::Internal(children) => Some(&children[quadrant.index()]),
            _ => None,
        }
    }

    fn locate(&self, position: &Vec2) -> Quadrant {
        let half = self.side_length / 2.;
        Quadrant::ALL
            .into_iter()
            .find(|q| in_region(position, &q.origin(self.origin, half), half))
            .unwrap_or_else(|| {
                // positions on the far edge of the parent can miss every child by rounding
                let mid = self.origin + Vec2::new(half, half);
                match (position.x > mid.x, position.y > mid.y) {
                    (false, true) => Quadrant::NorthWest,
                    (true, true) => Quadrant::NorthEast,
                    (false, false) => Quadrant::SouthWest,
                    (true, false) => Quadrant::SouthEast,
                }
            })
    }

    fn subdivide(&mut self) {
        let half = self.side_length / 2.;
        let children = Quadrant::ALL.map(|q| Node::new(q.origin(self.origin, half), half));
        self.content = Content::Internal(Box::new(children));
    }

    fn insert(&mut self, index: usize, body: PointMass, depth: usize) {
        if let Content::Empty = self.content {
            self.content = Content::Body(index);
            self.total_mass = body.mass;
            self.center_of_mass = body.position;
            self.n_bodies = 1;
            return;
        }

        // Self is an occupied leaf, move the previous body one level down
        if let Content::Body(previous) = self.content {
            let previous_body = PointMass::new(self.total_mass, self.center_of_mass);
            if depth >= MAX_DEPTH {
                debug!("bodies {previous} and {index} share a leaf at maximum depth");
                self.content = Content::Coincident(vec![(previous, previous_body)]);
            } else {
                self.subdivide();
                self.insert_to_child(previous, previous_body, depth);
            }
        }

        if let Content::Coincident(members) = &mut self.content {
            members.push((index, body));
        } else {
            self.insert_to_child(index, body, depth);
        }

        let mass = self.total_mass + body.mass;
        self.center_of_mass = (self.center_of_mass * self.total_mass + body.position * body.mass) / mass;
        self.total_mass = mass;
        self.n_bodies += 1;
    }

    fn insert_to_child(&mut self, index: usize, body: PointMass, depth: usize) {
        let quadrant = self.locate(&body.position);
        match &mut self.content {
            Content::Internal(children) => children[quadrant.index()].insert(index, body, depth + 1),
            _ => unreachable!("only internal nodes have children"),
        }
    }

    fn write_indented(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        let indent = "  ".repeat(depth);
        writeln!(
            f,
            "{indent}QuadTreeNode at region ({}, {}), side_length: {}, total_mass: {}, \
             center_of_mass: ({}, {}), n_bodies: {}, is_internal: {}",
            self.origin.x,
            self.origin.y,
            self.side_length,
            self.total_mass,
            self.center_of_mass.x,
            self.center_of_mass.y,
            self.n_bodies,
            self.is_internal(),
        )?;

        if let Content::Internal(children) = &self.content {
            for (quadrant, child) in Quadrant::ALL.iter().zip(children.iter()) {
                writeln!(f, "{indent} {}:", quadrant.label())?;
                child.write_indented(f, depth + 1)?;
            }
        }

        Ok(())
    }
}

/// A quadtree over a fixed [`Domain`], rebuilt from scratch every step.
#[derive(Clone, Debug)]
pub struct QuadTree {
    root: Node,
    domain: Domain,
}

impl QuadTree {
    #[must_use]
    pub fn empty(domain: Domain) -> Self {
        Self {
            root: Node::new(domain.origin, domain.side_length),
            domain,
        }
    }

    /// Build a tree over the default domain.
    ///
    /// Bodies outside the domain are marked lost, bodies that are already lost are skipped.
    pub fn new(bodies: &mut [Body]) -> Self {
        Self::with_domain(bodies, Domain::default())
    }

    pub fn with_domain(bodies: &mut [Body], domain: Domain) -> Self {
        let mut tree = Self::empty(domain);
        for body in bodies.iter_mut().filter(|body| !body.is_lost()) {
            tree.insert(body);
        }
        tree
    }

    /// Insert a body, marking it lost if it has left the domain.
    ///
    /// Returns whether the body was inserted.
    pub fn insert(&mut self, body: &mut Body) -> bool {
        if body.is_lost() {
            return false;
        }

        if !self.domain.contains(&body.position) {
            debug!("body {} is lost (out of bounds)", body.index);
            body.mark_lost();
            return false;
        }

        self.root
            .insert(body.index, PointMass::new(body.mass, body.position), 0);
        true
    }

    #[must_use]
    pub fn root(&self) -> &Node {
        &self.root
    }

    #[must_use]
    pub fn domain(&self) -> &Domain {
        &self.domain
    }

    /// Number of bodies in the tree.
    #[must_use]
    pub fn len(&self) -> usize {
        self.root.n_bodies
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }
}

impl fmt::Display for QuadTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.root.write_indented(f, 0)
    }
}
