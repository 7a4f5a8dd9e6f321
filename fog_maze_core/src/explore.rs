//! Waypoint selection for agents that have not seen the exit yet.

use std::{collections::HashSet, f64::consts::PI, str::FromStr};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Coordinate, error::GameError, memory::Memory};

/// Archimedean spiral centred on a start cell, sampled at roughly equal arc
/// lengths of `spacing` cells.
///
/// Points are floored rather than rounded to keep the walk tight around the
/// start without leaving gaps.
#[derive(Debug, Clone)]
pub struct Spiral {
    spacing: f64,
    radius_step: f64,
    start: Coordinate,
    index: u32,
}

impl Spiral {
    pub fn new(start: Coordinate, spacing: f64) -> Self {
        let spacing = if spacing > 0.0 { spacing } else { 1.0 };
        Spiral {
            spacing,
            radius_step: spacing / 2.0 / PI,
            start,
            index: 1,
        }
    }
}

impl Iterator for Spiral {
    type Item = Coordinate;

    fn next(&mut self) -> Option<Coordinate> {
        let t = (2.0 * self.spacing * f64::from(self.index) / self.radius_step).sqrt();
        self.index = self.index.saturating_add(1);
        let rt = self.radius_step * t;
        let x = rt * t.cos() + f64::from(self.start.x);
        let y = rt * t.sin() + f64::from(self.start.y);
        Some(Coordinate::new(x.floor() as i32, y.floor() as i32))
    }
}

/// How an explorer picks its next waypoint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WaypointStrategy {
    /// Follow a spiral out of the start, falling back to the nearest
    /// unobserved cell.
    Spiral { spacing: f64 },
    /// Always head for the unobserved cell nearest to the agent.
    NearestUnobserved,
}

impl Default for WaypointStrategy {
    fn default() -> Self {
        WaypointStrategy::Spiral { spacing: 1.0 }
    }
}

impl FromStr for WaypointStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "spiral" => Ok(WaypointStrategy::default()),
            "nearest" | "nearest-unobserved" | "nearest_unobserved" => {
                Ok(WaypointStrategy::NearestUnobserved)
            }
            other => Err(format!("unknown strategy '{other}', expected 'spiral' or 'nearest'")),
        }
    }
}

/// Produces waypoint candidates and remembers the ones found unreachable.
///
/// Memory only ever closes cells, so a cell that cannot be reached now can
/// never be reached later; rejected cells stay rejected for the whole run.
#[derive(Debug, Clone)]
pub struct WaypointPicker {
    spiral: Option<Spiral>,
    rejected: HashSet<Coordinate>,
}

impl WaypointPicker {
    pub fn new(strategy: WaypointStrategy, start: Coordinate) -> Self {
        let spiral = match strategy {
            WaypointStrategy::Spiral { spacing } => Some(Spiral::new(start, spacing)),
            WaypointStrategy::NearestUnobserved => None,
        };
        WaypointPicker {
            spiral,
            rejected: HashSet::new(),
        }
    }

    /// Picks an unobserved, not yet rejected cell.
    ///
    /// Fails with [`GameError::MapFullyExplored`] once no such cell remains.
    pub fn next_candidate(&mut self, memory: &Memory, current: Coordinate) -> Result<Coordinate, GameError> {
        let Some(spiral) = self.spiral.as_mut() else {
            return memory.closest_unobserved_excluding(current, &self.rejected);
        };
        let Some(point) = spiral.next() else {
            return memory.closest_unobserved_excluding(current, &self.rejected);
        };

        if memory.is_unobserved(point) && !self.rejected.contains(&point) {
            return Ok(point);
        }
        if memory.frontier_empty() {
            // only interior cells are left, spiral proximity no longer helps
            return memory.closest_unobserved_excluding(current, &self.rejected);
        }
        memory.closest_unobserved_excluding(point, &self.rejected)
    }

    pub fn reject(&mut self, candidate: Coordinate) {
        debug!(%candidate, "waypoint unreachable");
        self.rejected.insert(candidate);
    }

    pub fn is_rejected(&self, candidate: Coordinate) -> bool {
        self.rejected.contains(&candidate)
    }
}
