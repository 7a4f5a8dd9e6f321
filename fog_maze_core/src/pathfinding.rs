use std::{
    cmp::Ordering,
    collections::{BinaryHeap, VecDeque},
    fmt,
    str::FromStr,
};

use serde::{Deserialize, Serialize};

use crate::{Coordinate, chebyshev, error::PathError, map::Grid, memory::PathableMap};

/// Computes the next step from `src` toward `dst` over a map's open cells.
///
/// Only a single step is returned: the map may change between turns as new
/// cells are observed, so callers recompute every turn.
pub trait Pathfinder: fmt::Debug {
    /// Returns `Ok(None)` when `dst` cannot be reached under the map's current
    /// knowledge, and `Ok(Some(src))` when `src == dst`.
    fn next_step(
        &self,
        map: &dyn PathableMap,
        src: Coordinate,
        dst: Coordinate,
    ) -> Result<Option<Coordinate>, PathError>;
}

/// Selects a pathfinder implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathfinderKind {
    Bfs,
    #[default]
    AStar,
}

impl PathfinderKind {
    pub fn build(self) -> Box<dyn Pathfinder> {
        match self {
            PathfinderKind::Bfs => Box::new(Bfs),
            PathfinderKind::AStar => Box::new(AStar),
        }
    }
}

impl FromStr for PathfinderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "bfs" => Ok(PathfinderKind::Bfs),
            "a_star" | "astar" => Ok(PathfinderKind::AStar),
            other => Err(format!("unknown pathfinder '{other}', expected 'bfs' or 'a-star'")),
        }
    }
}

type Distances = Grid<Option<u32>>;

fn distance(distances: &Distances, coordinate: Coordinate) -> Option<u32> {
    distances.get(coordinate).copied().flatten()
}

/// Walks back from `dst` along strictly decreasing distances and returns the
/// cell one step away from the source.
///
/// Axis-aligned predecessors are preferred over diagonal ones, which keeps
/// the resulting paths straight.
fn first_step(map: &dyn PathableMap, distances: &Distances, dst: Coordinate) -> Result<Coordinate, PathError> {
    let mut back = dst;
    loop {
        let d = distance(distances, back).ok_or(PathError::MissingDistance(back))?;
        if d <= 1 {
            return Ok(back);
        }
        back = back
            .neighbours()
            .find(|n| map.is_open(*n) && distance(distances, *n) == Some(d - 1))
            .ok_or(PathError::BrokenTrace(back))?;
    }
}

fn seeded_distances(map: &dyn PathableMap, src: Coordinate) -> Option<Distances> {
    let (width, height) = map.size();
    let mut distances = Grid::filled(width, height, None);
    distances.set(src, Some(0)).ok()?;
    Some(distances)
}

/// Breadth-first search over 8-connected open cells.
#[derive(Debug, Clone, Copy, Default)]
pub struct Bfs;

impl Pathfinder for Bfs {
    fn next_step(
        &self,
        map: &dyn PathableMap,
        src: Coordinate,
        dst: Coordinate,
    ) -> Result<Option<Coordinate>, PathError> {
        if src == dst {
            return Ok(Some(src));
        }
        if !map.is_open(dst) {
            return Ok(None);
        }
        let Some(mut distances) = seeded_distances(map, src) else {
            return Ok(None);
        };

        let mut queue = VecDeque::from([src]);
        'search: while let Some(current) = queue.pop_front() {
            let d = distance(&distances, current).ok_or(PathError::MissingDistance(current))?;
            for neighbour in current.neighbours() {
                if !map.is_open(neighbour) || distance(&distances, neighbour).is_some() {
                    continue;
                }
                if let Some(slot) = distances.get_mut(neighbour) {
                    *slot = Some(d + 1);
                }
                if neighbour == dst {
                    break 'search;
                }
                queue.push_back(neighbour);
            }
        }

        if distance(&distances, dst).is_none() {
            return Ok(None);
        }
        first_step(map, &distances, dst).map(Some)
    }
}

/// A* search over 8-connected open cells with the Chebyshev heuristic.
#[derive(Debug, Clone, Copy, Default)]
pub struct AStar;

#[derive(Clone, Eq, PartialEq)]
struct PrioritizedItem {
    priority: u32,
    sequence: u64,
    coordinate: Coordinate,
}

impl Ord for PrioritizedItem {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for min-heap behavior, oldest entry first on ties
        other
            .priority
            .cmp(&self.priority)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

impl PartialOrd for PrioritizedItem {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Pathfinder for AStar {
    fn next_step(
        &self,
        map: &dyn PathableMap,
        src: Coordinate,
        dst: Coordinate,
    ) -> Result<Option<Coordinate>, PathError> {
        if src == dst {
            return Ok(Some(src));
        }
        if !map.is_open(dst) {
            return Ok(None);
        }
        let Some(mut cost_so_far) = seeded_distances(map, src) else {
            return Ok(None);
        };

        let mut sequence = 0;
        let mut frontier = BinaryHeap::from([PrioritizedItem {
            priority: chebyshev(src, dst),
            sequence,
            coordinate: src,
        }]);
        let mut goal_reached = false;

        while let Some(PrioritizedItem {
            priority,
            coordinate: current,
            ..
        }) = frontier.pop()
        {
            if current == dst {
                goal_reached = true;
                break;
            }
            let g = distance(&cost_so_far, current).ok_or(PathError::MissingDistance(current))?;
            if priority > g + chebyshev(current, dst) {
                // stale entry, a cheaper one was already expanded
                continue;
            }

            for neighbour in current.neighbours() {
                if !map.is_open(neighbour) {
                    continue;
                }
                let new_cost = g + 1;
                if distance(&cost_so_far, neighbour).is_some_and(|known| known <= new_cost) {
                    continue;
                }
                if let Some(slot) = cost_so_far.get_mut(neighbour) {
                    *slot = Some(new_cost);
                    sequence += 1;
                    frontier.push(PrioritizedItem {
                        priority: new_cost + chebyshev(neighbour, dst),
                        sequence,
                        coordinate: neighbour,
                    });
                }
            }
        }

        if !goal_reached {
            return Ok(None);
        }
        first_step(map, &cost_so_far, dst).map(Some)
    }
}
