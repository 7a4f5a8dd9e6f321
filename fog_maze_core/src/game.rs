use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    ActorId, Coordinate, Vector,
    agent::{Agent, Observation},
    config::GameConfig,
    error::{GameError, MoveError, TurnError},
    rules::{MovementRule, default_rules},
    world::{NodeKind, WorldMap},
};

/// Where a run stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameState {
    Running,
    Won,
    Lost,
    /// Ended by a fatal error rather than by running out of life.
    Errored,
}

impl GameState {
    pub fn is_over(self) -> bool {
        self != GameState::Running
    }
}

/// Summary of a run, enough to tell why movement stalled.
#[derive(Debug, Clone, PartialEq)]
pub struct GameOutcome {
    pub state: GameState,
    pub turns: u32,
    pub life: u32,
    pub position: Option<Coordinate>,
    pub last_feedback: Option<MoveError>,
    pub error: Option<GameError>,
}

/// One cell of the static map in a [`GameRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedNode {
    pub coordinate: Coordinate,
    pub kind: NodeKind,
}

/// End-of-run export for external visualisation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRecord {
    pub visibility_radius: u32,
    pub state: GameState,
    pub map: Vec<RecordedNode>,
    /// Actor position at the start and after every turn.
    pub turns: Vec<Coordinate>,
}

/// Turn scheduler for one actor driven by one agent.
pub struct Game {
    world: WorldMap,
    actor: ActorId,
    agent: Box<dyn Agent>,
    rules: Vec<Box<dyn MovementRule>>,
    config: GameConfig,
    turn: u32,
    state: GameState,
    last_feedback: Option<MoveError>,
    error: Option<GameError>,
    trail: Vec<Coordinate>,
}

impl Game {
    /// Creates a game with the default movement rules.
    pub fn new(world: WorldMap, actor: ActorId, agent: Box<dyn Agent>, config: GameConfig) -> Self {
        let rules = default_rules(&world);
        let trail = world.position_of(actor).into_iter().collect();
        Game {
            world,
            actor,
            agent,
            rules,
            config,
            turn: 0,
            state: GameState::Running,
            last_feedback: None,
            error: None,
            trail,
        }
    }

    /// Replaces the movement rules.
    pub fn with_rules(mut self, rules: Vec<Box<dyn MovementRule>>) -> Self {
        self.rules = rules;
        self
    }

    pub fn add_rule(&mut self, rule: Box<dyn MovementRule>) {
        self.rules.push(rule);
    }

    pub fn world(&self) -> &WorldMap {
        &self.world
    }

    pub fn agent(&self) -> &dyn Agent {
        self.agent.as_ref()
    }

    pub fn actor(&self) -> ActorId {
        self.actor
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn state(&self) -> GameState {
        self.state
    }

    pub fn turn(&self) -> u32 {
        self.turn
    }

    pub fn trail(&self) -> &[Coordinate] {
        &self.trail
    }

    pub fn error(&self) -> Option<&GameError> {
        self.error.as_ref()
    }

    /// Plays one turn, unless the game is already over.
    pub fn tick(&mut self) -> GameState {
        if self.state.is_over() {
            return self.state;
        }

        let result = match self.settled() {
            Ok(None) => self.play_turn().and_then(|()| self.settled()),
            settled => settled,
        };
        match result {
            Ok(Some(state)) => self.finish(state),
            Ok(None) => {
                if self.config.max_turns.is_some_and(|max| self.turn >= max) {
                    self.finish(GameState::Lost);
                }
            }
            Err(error) => {
                warn!(actor = self.actor, %error, "run aborted");
                self.error = Some(error);
                self.finish(GameState::Errored);
            }
        }
        self.state
    }

    /// Ticks until the game is over.
    pub fn run(&mut self) -> GameOutcome {
        while !self.tick().is_over() {}
        self.outcome()
    }

    pub fn outcome(&self) -> GameOutcome {
        GameOutcome {
            state: self.state,
            turns: self.turn,
            life: self.world.actor(self.actor).map_or(0, |actor| actor.life()),
            position: self.world.position_of(self.actor).ok(),
            last_feedback: self.last_feedback.clone(),
            error: self.error.clone(),
        }
    }

    pub fn record(&self) -> GameRecord {
        GameRecord {
            visibility_radius: self.config.visibility_radius,
            state: self.state,
            map: self
                .world
                .nodes()
                .map(|(coordinate, node)| RecordedNode {
                    coordinate,
                    kind: node.kind(),
                })
                .collect(),
            turns: self.trail.clone(),
        }
    }

    /// `Won` if the actor stands on the exit, `Lost` if it is dead.
    fn settled(&self) -> Result<Option<GameState>, GameError> {
        let position = self.world.position_of(self.actor)?;
        let actor = self
            .world
            .actor(self.actor)
            .ok_or(GameError::ActorNotOnMap(self.actor))?;
        if self.world.node_at(position).map(|node| node.kind()) == Ok(NodeKind::Exit) {
            return Ok(Some(GameState::Won));
        }
        if !actor.alive() {
            return Ok(Some(GameState::Lost));
        }
        Ok(None)
    }

    fn play_turn(&mut self) -> Result<(), GameError> {
        let life = self
            .world
            .actor_mut(self.actor)
            .ok_or(GameError::ActorNotOnMap(self.actor))?
            .consume_life();
        let surroundings = self
            .world
            .visibility_around(self.actor, self.config.visibility_radius)?;
        let from = surroundings.position_of(self.actor)?;
        let observation = Observation {
            turn: self.turn,
            life,
            surroundings,
        };

        let vector = self.agent.choose_move(&observation)?;
        let applied = match self.validate(vector, from) {
            Ok(()) => self.world.move_actor(self.actor, vector),
            Err(rejection) => Err(rejection.into()),
        };
        match applied {
            Ok(position) => self.trail.push(position),
            Err(TurnError::Rejected(feedback)) => {
                warn!(actor = self.actor, turn = self.turn, %vector, %feedback, "move rejected");
                self.agent.receive_feedback(feedback.clone());
                self.last_feedback = Some(feedback);
                self.trail.push(from);
            }
            Err(TurnError::Fatal(error)) => return Err(error),
        }
        self.turn += 1;
        Ok(())
    }

    fn validate(&self, vector: Vector, from: Coordinate) -> Result<(), MoveError> {
        self.rules.iter().try_for_each(|rule| rule.check(vector, from))
    }

    fn finish(&mut self, state: GameState) {
        self.state = state;
        info!(
            actor = self.actor,
            ?state,
            turns = self.turn,
            "game over"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        agent::StraightMover,
        world::{LoadedWorld, load_world_from_str},
    };

    fn game_with(loaded: LoadedWorld, agent: Box<dyn Agent>, config: GameConfig) -> Game {
        Game::new(loaded.world, loaded.actor, agent, config)
    }

    #[test]
    fn each_turn_costs_one_life_and_counts() {
        let loaded = load_world_from_str(".e.\n...\n...\n.s.", 10).unwrap();
        let actor = loaded.actor;
        let mut game = game_with(loaded, Box::new(StraightMover::north(actor)), GameConfig::default());
        assert_eq!(game.turn(), 0);
        assert_eq!(game.tick(), GameState::Running);
        assert_eq!(game.turn(), 1);
        assert_eq!(game.outcome().life, 9);
        assert_eq!(game.trail(), &[Coordinate::new(1, 3), Coordinate::new(1, 2)]);
    }

    #[test]
    fn starting_on_the_exit_wins_immediately() {
        // The actor is placed on the exit by hand.
        let loaded = load_world_from_str("se", 5).unwrap();
        let mut world = loaded.world;
        let actor = world.place_actor(loaded.exit, 5).unwrap();
        let mut game = Game::new(world, actor, Box::new(StraightMover::north(actor)), GameConfig::default());
        assert_eq!(game.tick(), GameState::Won);
        assert_eq!(game.turn(), 0);
    }

    #[test]
    fn teleporting_is_rejected_as_feedback() {
        let loaded = load_world_from_str(".e.\n...\n.s.", 4).unwrap();
        let actor = loaded.actor;
        let start = loaded.start;
        let agent = StraightMover::new(actor, Vector::new(0, -50));
        let mut game = game_with(loaded, Box::new(agent), GameConfig::default());
        let outcome = game.run();
        assert_eq!(outcome.state, GameState::Lost);
        assert_eq!(outcome.turns, 4);
        assert_eq!(outcome.position, Some(start));
        assert_eq!(
            outcome.last_feedback,
            Some(MoveError::InvalidVector(Vector::new(0, -50)))
        );
        assert_eq!(
            game.agent().last_feedback(),
            Some(&MoveError::InvalidVector(Vector::new(0, -50)))
        );
    }

    #[test]
    fn stepping_off_the_map_is_feedback() {
        let loaded = load_world_from_str(".e.\n...\n.s.", 2).unwrap();
        let actor = loaded.actor;
        let mut game = game_with(loaded, Box::new(StraightMover::new(actor, Vector::SOUTH)), GameConfig::default());
        let outcome = game.run();
        assert_eq!(outcome.state, GameState::Lost);
        assert_eq!(
            outcome.last_feedback,
            Some(MoveError::PositionNotFound(Coordinate::new(1, 3)))
        );
    }

    #[test]
    fn custom_rules_replace_defaults() {
        let loaded = load_world_from_str(".e.\n...\n.s.", 10).unwrap();
        let actor = loaded.actor;
        let frozen = |vector: Vector, _from: Coordinate| Err(MoveError::InvalidVector(vector));
        let mut game = game_with(loaded, Box::new(StraightMover::north(actor)), GameConfig::default())
            .with_rules(vec![Box::new(frozen)]);
        let outcome = game.run();
        assert_eq!(outcome.state, GameState::Lost);
        assert_eq!(outcome.turns, 10);
    }

    #[test]
    fn added_rules_run_after_the_defaults() {
        let loaded = load_world_from_str(".e.\n...\n.s.", 3).unwrap();
        let actor = loaded.actor;
        let config = GameConfig {
            life: 3,
            ..GameConfig::default()
        };
        let mut game = game_with(loaded, Box::new(StraightMover::north(actor)), config);
        game.add_rule(Box::new(|vector: Vector, _from: Coordinate| {
            if vector == Vector::NORTH {
                Err(MoveError::InvalidVector(vector))
            } else {
                Ok(())
            }
        }));
        assert_eq!(game.config().life, 3);
        let outcome = game.run();
        assert_eq!(outcome.state, GameState::Lost);
        assert_eq!(outcome.last_feedback, Some(MoveError::InvalidVector(Vector::NORTH)));
        assert_eq!(game.error(), None);
    }

    #[test]
    fn max_turns_caps_the_run() {
        let loaded = load_world_from_str(".e.\nXXX\n.s.", 100).unwrap();
        let actor = loaded.actor;
        let config = GameConfig {
            max_turns: Some(3),
            ..GameConfig::default()
        };
        let mut game = game_with(loaded, Box::new(StraightMover::north(actor)), config);
        let outcome = game.run();
        assert_eq!(outcome.state, GameState::Lost);
        assert_eq!(outcome.turns, 3);
        assert_eq!(outcome.life, 97);
    }

    #[test]
    fn agent_errors_end_the_run() {
        let loaded = load_world_from_str(".e.\n...\n.s.", 10).unwrap();
        // Game wired to an actor that does not exist.
        let mut game = Game::new(loaded.world, 99, Box::new(StraightMover::north(99)), GameConfig::default());
        let outcome = game.run();
        assert_eq!(outcome.state, GameState::Errored);
        assert_eq!(outcome.error, Some(GameError::ActorNotOnMap(99)));
        assert_eq!(game.error(), Some(&GameError::ActorNotOnMap(99)));
    }

    #[test]
    fn record_lists_map_and_trail() {
        let loaded = load_world_from_str(".e.\n...\n.s.", 10).unwrap();
        let actor = loaded.actor;
        let mut game = game_with(loaded, Box::new(StraightMover::north(actor)), GameConfig::default());
        game.run();
        let record = game.record();
        assert_eq!(record.state, GameState::Won);
        assert_eq!(record.map.len(), 9);
        assert_eq!(
            record.turns,
            vec![Coordinate::new(1, 2), Coordinate::new(1, 1), Coordinate::new(1, 0)]
        );
        assert_eq!(record.visibility_radius, 2);
    }
}
