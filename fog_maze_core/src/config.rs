use serde::{Deserialize, Serialize};

use crate::{explore::WaypointStrategy, pathfinding::PathfinderKind};

/// Tunables for a single run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Life units the actor starts with; one is spent per turn.
    pub life: u32,
    /// Euclidean radius of what the agent sees each turn.
    pub visibility_radius: u32,
    pub pathfinder: PathfinderKind,
    pub strategy: WaypointStrategy,
    /// Hard stop, counted as a loss. `None` runs until life runs out.
    pub max_turns: Option<u32>,
}

impl Default for GameConfig {
    fn default() -> Self {
        GameConfig {
            life: 10,
            visibility_radius: 2,
            pathfinder: PathfinderKind::default(),
            strategy: WaypointStrategy::default(),
            max_turns: None,
        }
    }
}
