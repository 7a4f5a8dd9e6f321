use rand::{Rng, SeedableRng, rngs::StdRng};
use tracing::debug;

use crate::{
    ActorId, Coordinate, Vector,
    error::{GameError, MoveError},
    explore::{WaypointPicker, WaypointStrategy},
    memory::Memory,
    pathfinding::{Pathfinder, PathfinderKind},
    world::Surroundings,
};

/// What the game loop hands an agent each turn.
#[derive(Debug, Clone)]
pub struct Observation {
    pub turn: u32,
    /// Life left after paying for this turn.
    pub life: u32,
    pub surroundings: Surroundings,
}

/// Trait defining the behavior of an agent.
/// Agents decide which move to make based on what they currently see.
pub trait Agent {
    /// Returns the id of the actor this agent controls.
    fn id(&self) -> ActorId;

    /// Determines the move the agent wants to make.
    /// `&mut self` allows the agent to maintain internal state (memory, waypoints).
    /// An `Err` ends the run.
    fn choose_move(&mut self, observation: &Observation) -> Result<Vector, GameError>;

    /// Called when the previous move was rejected.
    fn receive_feedback(&mut self, feedback: MoveError);

    fn last_feedback(&self) -> Option<&MoveError>;

    /// The agent's map knowledge, if it keeps any.
    fn memory(&self) -> Option<&Memory> {
        None
    }
}

/// Proposes the same vector every turn.
#[derive(Debug)]
pub struct StraightMover {
    id: ActorId,
    vector: Vector,
    feedback: Option<MoveError>,
}

impl StraightMover {
    pub fn new(id: ActorId, vector: Vector) -> Self {
        Self {
            id,
            vector,
            feedback: None,
        }
    }

    pub fn north(id: ActorId) -> Self {
        Self::new(id, Vector::NORTH)
    }
}

impl Agent for StraightMover {
    fn id(&self) -> ActorId {
        self.id
    }

    fn choose_move(&mut self, _observation: &Observation) -> Result<Vector, GameError> {
        Ok(self.vector)
    }

    fn receive_feedback(&mut self, feedback: MoveError) {
        self.feedback = Some(feedback);
    }

    fn last_feedback(&self) -> Option<&MoveError> {
        self.feedback.as_ref()
    }
}

/// Keeps heading in one direction and turns clockwise whenever a move is
/// rejected.
#[derive(Debug)]
pub struct TurningWalker {
    id: ActorId,
    heading: usize,
    feedback: Option<MoveError>,
}

impl TurningWalker {
    const HEADINGS: [Vector; 8] = [
        Vector::new(1, -1),
        Vector::EAST,
        Vector::new(1, 1),
        Vector::SOUTH,
        Vector::new(-1, 1),
        Vector::WEST,
        Vector::new(-1, -1),
        Vector::NORTH,
    ];

    pub fn new(id: ActorId) -> Self {
        Self {
            id,
            heading: 0,
            feedback: None,
        }
    }
}

impl Agent for TurningWalker {
    fn id(&self) -> ActorId {
        self.id
    }

    fn choose_move(&mut self, _observation: &Observation) -> Result<Vector, GameError> {
        Ok(Self::HEADINGS[self.heading])
    }

    fn receive_feedback(&mut self, feedback: MoveError) {
        self.heading = (self.heading + 1) % Self::HEADINGS.len();
        self.feedback = Some(feedback);
    }

    fn last_feedback(&self) -> Option<&MoveError> {
        self.feedback.as_ref()
    }
}

/// A simple agent that tries to move randomly.
#[derive(Debug)]
pub struct RandomWalker {
    id: ActorId,
    rng: StdRng,
    feedback: Option<MoveError>,
}

impl RandomWalker {
    pub fn new(id: ActorId, seed: u64) -> Self {
        Self {
            id,
            rng: StdRng::seed_from_u64(seed),
            feedback: None,
        }
    }
}

impl Agent for RandomWalker {
    fn id(&self) -> ActorId {
        self.id
    }

    fn choose_move(&mut self, _observation: &Observation) -> Result<Vector, GameError> {
        let dx = self.rng.random_range(-1..=1);
        let dy = self.rng.random_range(-1..=1);
        Ok(Vector::new(dx, dy))
    }

    fn receive_feedback(&mut self, feedback: MoveError) {
        self.feedback = Some(feedback);
    }

    fn last_feedback(&self) -> Option<&MoveError> {
        self.feedback.as_ref()
    }
}

/// Which target an [`Explorer`] is currently steering for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExplorerMode {
    SeekWaypoint,
    SeekExit,
}

/// Explores under fog of war until it sees the exit, then walks to it.
///
/// Every turn it merges what it sees into its [`Memory`] and asks its
/// pathfinder for a single step; nothing is planned further ahead than that.
#[derive(Debug)]
pub struct Explorer {
    id: ActorId,
    memory: Memory,
    pathfinder: Box<dyn Pathfinder>,
    picker: WaypointPicker,
    destination: Option<Coordinate>,
    mode: ExplorerMode,
    feedback: Option<MoveError>,
}

impl Explorer {
    /// Creates an explorer for the actor `id` standing at `start` in a world
    /// made of `domain`.
    pub fn new(
        id: ActorId,
        domain: impl IntoIterator<Item = Coordinate>,
        start: Coordinate,
        pathfinder: PathfinderKind,
        strategy: WaypointStrategy,
    ) -> Self {
        Self {
            id,
            memory: Memory::new(domain),
            pathfinder: pathfinder.build(),
            picker: WaypointPicker::new(strategy, start),
            destination: None,
            mode: ExplorerMode::SeekWaypoint,
            feedback: None,
        }
    }

    pub fn mode(&self) -> ExplorerMode {
        self.mode
    }

    /// Current waypoint, while exploring.
    pub fn destination(&self) -> Option<Coordinate> {
        self.destination
    }

    fn step_toward_exit(&mut self, current: Coordinate, exit: Coordinate) -> Result<Coordinate, GameError> {
        if self.mode != ExplorerMode::SeekExit {
            debug!(actor = self.id, %exit, "exit spotted");
            self.mode = ExplorerMode::SeekExit;
            self.destination = None;
        }
        self.pathfinder
            .next_step(&self.memory, current, exit)?
            .ok_or(GameError::ExitUnreachable(exit))
    }

    fn step_toward_waypoint(&mut self, current: Coordinate) -> Result<Coordinate, GameError> {
        if self.destination == Some(current) {
            self.destination = None;
        }
        let mut candidate = match self.destination {
            Some(destination) => destination,
            None => self.picker.next_candidate(&self.memory, current)?,
        };
        loop {
            if let Some(next) = self.pathfinder.next_step(&self.memory, current, candidate)? {
                if self.destination != Some(candidate) {
                    debug!(actor = self.id, waypoint = %candidate, "new waypoint");
                }
                self.destination = Some(candidate);
                return Ok(next);
            }
            self.picker.reject(candidate);
            self.destination = None;
            candidate = self.picker.next_candidate(&self.memory, current)?;
        }
    }
}

impl Agent for Explorer {
    fn id(&self) -> ActorId {
        self.id
    }

    fn choose_move(&mut self, observation: &Observation) -> Result<Vector, GameError> {
        self.memory.merge(&observation.surroundings);
        let current = observation.surroundings.position_of(self.id)?;

        let next = match self.memory.exit() {
            Some(exit) => self.step_toward_exit(current, exit)?,
            None => self.step_toward_waypoint(current)?,
        };
        Ok(current.vector_to(next))
    }

    fn receive_feedback(&mut self, feedback: MoveError) {
        debug!(actor = self.id, %feedback, "move rejected");
        // a wall can be bumped into before it is ever seen
        if let MoveError::HitWall(wall) = feedback {
            self.memory.mark_closed(wall);
        }
        self.feedback = Some(feedback);
    }

    fn last_feedback(&self) -> Option<&MoveError> {
        self.feedback.as_ref()
    }

    fn memory(&self) -> Option<&Memory> {
        Some(&self.memory)
    }
}
