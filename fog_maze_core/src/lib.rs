use std::fmt;

use serde::{Deserialize, Serialize};

pub mod agent;
pub mod config;
pub mod error;
pub mod explore;
pub mod game;
pub mod map;
pub mod memory;
pub mod pathfinding;
pub mod rules;
pub mod world;

/// Unique identifier for actors placed on a world map.
pub type ActorId = usize;

/// Represents a 2D coordinate.
///
/// `y` grows downward, so "north" is `y - 1`. Coordinates are signed so that
/// neighbours of edge cells can be expressed and rejected by bounds checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Coordinate {
    pub x: i32,
    pub y: i32,
}

impl Coordinate {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Returns the coordinate reached by applying `vector`.
    pub fn offset(self, vector: Vector) -> Coordinate {
        Coordinate::new(self.x + vector.dx, self.y + vector.dy)
    }

    /// Returns the vector leading from `self` to `other`.
    pub fn vector_to(self, other: Coordinate) -> Vector {
        Vector::new(other.x - self.x, other.y - self.y)
    }

    /// Returns the 8 neighbours in preference order: the four axis-aligned
    /// steps (up, down, left, right) followed by the four diagonals.
    pub fn neighbours(self) -> impl Iterator<Item = Coordinate> {
        Vector::STEPS.into_iter().map(move |v| self.offset(v))
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// A movement delta between two coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Vector {
    pub dx: i32,
    pub dy: i32,
}

impl Vector {
    pub const ZERO: Vector = Vector::new(0, 0);
    pub const NORTH: Vector = Vector::new(0, -1);
    pub const SOUTH: Vector = Vector::new(0, 1);
    pub const WEST: Vector = Vector::new(-1, 0);
    pub const EAST: Vector = Vector::new(1, 0);

    /// Single-cell steps, axis-aligned first.
    pub const STEPS: [Vector; 8] = [
        Vector::NORTH,
        Vector::SOUTH,
        Vector::WEST,
        Vector::EAST,
        Vector::new(-1, -1),
        Vector::new(1, -1),
        Vector::new(-1, 1),
        Vector::new(1, 1),
    ];

    pub const fn new(dx: i32, dy: i32) -> Self {
        Self { dx, dy }
    }

    pub fn is_zero(self) -> bool {
        self.dx == 0 && self.dy == 0
    }

    /// Largest per-axis magnitude.
    pub fn max_axis(self) -> u32 {
        self.dx.unsigned_abs().max(self.dy.unsigned_abs())
    }
}

impl fmt::Display for Vector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}, {}>", self.dx, self.dy)
    }
}

/// Chebyshev distance, `max(|dx|, |dy|)`: the number of 8-directional unit
/// steps between two cells on an open grid.
pub fn chebyshev(a: Coordinate, b: Coordinate) -> u32 {
    a.vector_to(b).max_axis()
}

/// Squared Euclidean distance.
pub fn distance_squared(a: Coordinate, b: Coordinate) -> i64 {
    let dx = i64::from(a.x) - i64::from(b.x);
    let dy = i64::from(a.y) - i64::from(b.y);
    dx * dx + dy * dy
}
