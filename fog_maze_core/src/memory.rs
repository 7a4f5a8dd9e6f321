use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::{
    Coordinate, distance_squared,
    error::GameError,
    map::Grid,
    world::{NodeKind, Surroundings, bounds_of},
};

/// What an agent knows about a single cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Knowledge {
    Unobserved,
    Open,
    Closed,
}

/// A map pathfinders can search.
pub trait PathableMap {
    /// Whether a path may pass through `coordinate`. Safe to call with
    /// coordinates outside the map, which are never open.
    fn is_open(&self, coordinate: Coordinate) -> bool;

    /// Width and height of the searchable rectangle anchored at the origin.
    fn size(&self) -> (usize, usize);
}

/// An agent's private, fog-of-war view of the world.
///
/// Covers the bounding rectangle of the world's coordinates. Cells in the
/// rectangle that are not part of the world start out `Closed`; the rest
/// start `Unobserved` and only ever move to `Open` or `Closed`.
#[derive(Debug, Clone)]
pub struct Memory {
    cells: Grid<Knowledge>,
    /// Unobserved cells on the edge of the world.
    frontier: HashSet<Coordinate>,
    exit: Option<Coordinate>,
}

impl Memory {
    /// Creates an empty memory over the given world domain.
    pub fn new(domain: impl IntoIterator<Item = Coordinate>) -> Self {
        let domain: HashSet<Coordinate> = domain.into_iter().collect();
        let (width, height) = bounds_of(domain.iter().copied());
        let cells = Grid::from_generator(width, height, |c| {
            if domain.contains(&c) {
                Knowledge::Unobserved
            } else {
                Knowledge::Closed
            }
        });
        let frontier = domain
            .iter()
            .filter(|c| c.neighbours().any(|n| !domain.contains(&n)))
            .copied()
            .collect();

        Memory {
            cells,
            frontier,
            exit: None,
        }
    }

    /// Records every node of an observation. Merging the same observation
    /// again changes nothing.
    pub fn merge(&mut self, observation: &Surroundings) {
        for (coordinate, node) in observation.iter() {
            let knowledge = match node.kind() {
                NodeKind::Open => Knowledge::Open,
                NodeKind::Exit => {
                    self.exit = Some(coordinate);
                    Knowledge::Open
                }
                NodeKind::Wall => Knowledge::Closed,
            };
            if self.cells.set(coordinate, knowledge).is_ok() {
                self.frontier.remove(&coordinate);
            }
        }
    }

    /// Records a cell as blocked without having seen it, e.g. after walking
    /// into it.
    pub fn mark_closed(&mut self, coordinate: Coordinate) {
        if self.cells.set(coordinate, Knowledge::Closed).is_ok() {
            self.frontier.remove(&coordinate);
        }
    }

    /// Knowledge about a cell. Anything outside the map is `Closed`.
    pub fn knowledge(&self, coordinate: Coordinate) -> Knowledge {
        self.cells
            .get(coordinate)
            .copied()
            .unwrap_or(Knowledge::Closed)
    }

    pub fn is_unobserved(&self, coordinate: Coordinate) -> bool {
        self.knowledge(coordinate) == Knowledge::Unobserved
    }

    /// The exit, once it has been seen.
    pub fn exit(&self) -> Option<Coordinate> {
        self.exit
    }

    pub fn frontier_empty(&self) -> bool {
        self.frontier.is_empty()
    }

    pub fn frontier(&self) -> impl Iterator<Item = Coordinate> + '_ {
        self.frontier.iter().copied()
    }

    pub fn unobserved_count(&self) -> usize {
        self.cells
            .iter()
            .filter(|k| **k == Knowledge::Unobserved)
            .count()
    }

    /// The unobserved cell nearest to `from` by Euclidean distance.
    pub fn closest_unobserved(&self, from: Coordinate) -> Result<Coordinate, GameError> {
        self.closest_unobserved_excluding(from, &HashSet::new())
    }

    /// Like [`Memory::closest_unobserved`], skipping the `excluded` cells.
    /// Ties go to the first cell in row-major order.
    pub fn closest_unobserved_excluding(
        &self,
        from: Coordinate,
        excluded: &HashSet<Coordinate>,
    ) -> Result<Coordinate, GameError> {
        self.cells
            .enumerate()
            .filter(|(c, k)| **k == Knowledge::Unobserved && !excluded.contains(c))
            .min_by_key(|(c, _)| distance_squared(*c, from))
            .map(|(c, _)| c)
            .ok_or(GameError::MapFullyExplored)
    }
}

impl PathableMap for Memory {
    /// Optimistic: unobserved cells count as open.
    fn is_open(&self, coordinate: Coordinate) -> bool {
        self.knowledge(coordinate) != Knowledge::Closed
    }

    fn size(&self) -> (usize, usize) {
        (self.cells.width(), self.cells.height())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::{Node, load_world_from_str};

    fn square(width: i32, height: i32) -> Vec<Coordinate> {
        (0..height)
            .flat_map(|y| (0..width).map(move |x| Coordinate::new(x, y)))
            .collect()
    }

    #[test]
    fn starts_unobserved_and_optimistic() {
        let memory = Memory::new(square(3, 3));
        assert_eq!(memory.size(), (3, 3));
        assert!(memory.is_unobserved(Coordinate::new(1, 1)));
        assert!(memory.is_open(Coordinate::new(1, 1)));
        assert!(!memory.is_open(Coordinate::new(-1, 0)));
        assert!(!memory.is_open(Coordinate::new(3, 0)));
        assert!(!memory.is_unobserved(Coordinate::new(3, 0)));
        assert_eq!(memory.exit(), None);
    }

    #[test]
    fn marking_closed_blocks_an_unseen_cell() {
        let mut memory = Memory::new(square(3, 3));
        let corner = Coordinate::new(2, 2);
        assert!(memory.is_open(corner));
        memory.mark_closed(corner);
        assert_eq!(memory.knowledge(corner), Knowledge::Closed);
        assert!(!memory.is_open(corner));
        assert!(!memory.frontier().any(|c| c == corner));
        assert_eq!(memory.unobserved_count(), 8);

        // outside the map is already closed
        memory.mark_closed(Coordinate::new(9, 9));
        assert_eq!(memory.unobserved_count(), 8);
    }

    #[test]
    fn frontier_is_the_world_edge() {
        let memory = Memory::new(square(3, 3));
        let mut frontier: Vec<_> = memory.frontier().collect();
        frontier.sort();
        assert_eq!(frontier.len(), 8);
        assert!(!frontier.contains(&Coordinate::new(1, 1)));
    }

    #[test]
    fn holes_in_the_domain_are_closed() {
        let mut domain = square(3, 3);
        domain.retain(|c| *c != Coordinate::new(1, 1));
        let memory = Memory::new(domain);
        assert_eq!(memory.knowledge(Coordinate::new(1, 1)), Knowledge::Closed);
        // Every remaining cell touches the hole or the outside.
        assert_eq!(memory.frontier().count(), 8);
    }

    #[test]
    fn merge_records_walls_and_exit() {
        let loaded = load_world_from_str(".e.\nXXX\n.s.", 5).unwrap();
        let mut memory = Memory::new(loaded.world.coordinates());
        let seen = loaded.world.visibility_around(loaded.actor, 2).unwrap();
        memory.merge(&seen);

        assert_eq!(memory.knowledge(Coordinate::new(1, 1)), Knowledge::Closed);
        assert_eq!(memory.knowledge(Coordinate::new(1, 2)), Knowledge::Open);
        assert_eq!(memory.exit(), Some(Coordinate::new(1, 0)));
        assert!(!memory.is_open(Coordinate::new(0, 1)));
        assert!(memory.frontier().all(|c| memory.is_unobserved(c)));
    }

    #[test]
    fn closest_unobserved_skips_known_and_excluded_cells() {
        let mut memory = Memory::new(square(5, 1));
        let seen: Surroundings = [
            (Coordinate::new(0, 0), Node::open()),
            (Coordinate::new(1, 0), Node::Wall),
        ]
        .into_iter()
        .collect();
        memory.merge(&seen);

        let from = Coordinate::new(0, 0);
        assert_eq!(memory.closest_unobserved(from), Ok(Coordinate::new(2, 0)));
        let excluded = HashSet::from([Coordinate::new(2, 0), Coordinate::new(3, 0)]);
        assert_eq!(
            memory.closest_unobserved_excluding(from, &excluded),
            Ok(Coordinate::new(4, 0))
        );
        let excluded = HashSet::from([Coordinate::new(2, 0), Coordinate::new(3, 0), Coordinate::new(4, 0)]);
        assert_eq!(
            memory.closest_unobserved_excluding(from, &excluded),
            Err(GameError::MapFullyExplored)
        );
    }

    #[test]
    fn fully_explored_map_reports_it() {
        let loaded = load_world_from_str("s.e", 5).unwrap();
        let mut memory = Memory::new(loaded.world.coordinates());
        memory.merge(&loaded.world.visibility_around(loaded.actor, 3).unwrap());
        assert_eq!(memory.unobserved_count(), 0);
        assert!(memory.frontier_empty());
        assert_eq!(
            memory.closest_unobserved(Coordinate::new(0, 0)),
            Err(GameError::MapFullyExplored)
        );
    }
}
