use crate::{ActorId, Coordinate, Vector};

/// A rejected move. The game loop hands these back to the agent as feedback
/// and keeps running.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MoveError {
    #[error("hit a wall at {0}")]
    HitWall(Coordinate),
    #[error("vector {0} is not allowed; each axis must move by at most one cell")]
    InvalidVector(Vector),
    #[error("coordinate {0} is not on the map")]
    PositionNotFound(Coordinate),
}

/// Pathfinding bookkeeping went wrong. Never expected in correct operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    #[error("dequeued coordinate {0} has no recorded distance")]
    MissingDistance(Coordinate),
    #[error("traceback from {0} found no predecessor")]
    BrokenTrace(Coordinate),
}

/// Errors that end a run.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    #[error("actor {0} is not on the map")]
    ActorNotOnMap(ActorId),
    #[error("map is fully explored")]
    MapFullyExplored,
    #[error("exit at {0} is unreachable")]
    ExitUnreachable(Coordinate),
    #[error("pathfinding failed: {0}")]
    Pathfinding(#[from] PathError),
}

/// Failure of a single attempted move: either feedback for the agent or a
/// run-ending condition.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TurnError {
    #[error(transparent)]
    Rejected(#[from] MoveError),
    #[error(transparent)]
    Fatal(#[from] GameError),
}

/// Errors raised while loading or generating a world.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MapError {
    #[error("map is empty")]
    Empty,
    #[error("inconsistent width at row {row}: expected {expected}, found {found}")]
    InconsistentWidth {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("no start position ('s') found in map")]
    MissingStart,
    #[error("multiple start positions ('s') found; second at {0}")]
    DuplicateStart(Coordinate),
    #[error("no exit ('e') found in map")]
    MissingExit,
    #[error("multiple exits ('e') found; second at {0}")]
    DuplicateExit(Coordinate),
    #[error("{0} lies outside the generated map")]
    OutsideMap(Coordinate),
    #[error("start position {0} is inside a wall")]
    StartInWall(Coordinate),
}
