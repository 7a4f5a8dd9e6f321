use std::collections::HashSet;

use crate::{Coordinate, Vector, error::MoveError, world::WorldMap};

/// A predicate every proposed move must pass before it is applied.
pub trait MovementRule {
    fn check(&self, vector: Vector, from: Coordinate) -> Result<(), MoveError>;
}

impl<F> MovementRule for F
where
    F: Fn(Vector, Coordinate) -> Result<(), MoveError>,
{
    fn check(&self, vector: Vector, from: Coordinate) -> Result<(), MoveError> {
        self(vector, from)
    }
}

/// Rejects vectors longer than `limit` cells along either axis.
#[derive(Debug, Clone, Copy)]
pub struct MaxStep {
    pub limit: u32,
}

impl Default for MaxStep {
    fn default() -> Self {
        MaxStep { limit: 1 }
    }
}

impl MovementRule for MaxStep {
    fn check(&self, vector: Vector, _from: Coordinate) -> Result<(), MoveError> {
        if vector.max_axis() > self.limit {
            return Err(MoveError::InvalidVector(vector));
        }
        Ok(())
    }
}

/// Rejects moves whose target lies outside the world.
#[derive(Debug, Clone)]
pub struct StayOnMap {
    domain: HashSet<Coordinate>,
}

impl StayOnMap {
    pub fn for_world(world: &WorldMap) -> Self {
        StayOnMap {
            domain: world.coordinates().collect(),
        }
    }
}

impl MovementRule for StayOnMap {
    fn check(&self, vector: Vector, from: Coordinate) -> Result<(), MoveError> {
        let target = from.offset(vector);
        if !self.domain.contains(&target) {
            return Err(MoveError::PositionNotFound(target));
        }
        Ok(())
    }
}

/// The standard rule set: single-cell steps that stay on the map.
pub fn default_rules(world: &WorldMap) -> Vec<Box<dyn MovementRule>> {
    vec![
        Box::new(MaxStep::default()),
        Box::new(StayOnMap::for_world(world)),
    ]
}
