use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    ActorId, Coordinate, Vector, distance_squared,
    error::{GameError, MapError, MoveError, TurnError},
};

/// Represents the static type of a cell, without occupants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Open,
    Exit,
    Wall,
}

/// A cell of the world map.
///
/// Open and exit nodes hold an ordered list of the actors standing on them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Node {
    Open { occupants: Vec<ActorId> },
    Exit { occupants: Vec<ActorId> },
    Wall,
}

impl Node {
    pub fn open() -> Self {
        Node::Open {
            occupants: Vec::new(),
        }
    }

    pub fn exit() -> Self {
        Node::Exit {
            occupants: Vec::new(),
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Open { .. } => NodeKind::Open,
            Node::Exit { .. } => NodeKind::Exit,
            Node::Wall => NodeKind::Wall,
        }
    }

    /// Actors standing on this node. Walls never have any.
    pub fn occupants(&self) -> &[ActorId] {
        match self {
            Node::Open { occupants } | Node::Exit { occupants } => occupants,
            Node::Wall => &[],
        }
    }

    fn occupants_mut(&mut self) -> Option<&mut Vec<ActorId>> {
        match self {
            Node::Open { occupants } | Node::Exit { occupants } => Some(occupants),
            Node::Wall => None,
        }
    }
}

/// A mobile entity with a life counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: ActorId,
    life: u32,
}

impl Actor {
    pub fn new(id: ActorId, life: u32) -> Self {
        Self { id, life }
    }

    pub fn life(&self) -> u32 {
        self.life
    }

    pub fn alive(&self) -> bool {
        self.life > 0
    }

    /// Spends one unit of life. Returns the remaining life.
    pub fn consume_life(&mut self) -> u32 {
        self.life = self.life.saturating_sub(1);
        self.life
    }
}

/// Read-only sub-map around an actor. This is everything an agent gets to
/// see of the world on a given turn.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Surroundings {
    nodes: BTreeMap<Coordinate, Node>,
}

impl Surroundings {
    pub fn node_at(&self, coordinate: Coordinate) -> Result<&Node, MoveError> {
        self.nodes
            .get(&coordinate)
            .ok_or(MoveError::PositionNotFound(coordinate))
    }

    /// Finds the actor among the visible nodes.
    pub fn position_of(&self, actor: ActorId) -> Result<Coordinate, GameError> {
        find_actor(&self.nodes, actor)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Coordinate, &Node)> {
        self.nodes.iter().map(|(c, n)| (*c, n))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl FromIterator<(Coordinate, Node)> for Surroundings {
    fn from_iter<I: IntoIterator<Item = (Coordinate, Node)>>(iter: I) -> Self {
        Surroundings {
            nodes: iter.into_iter().collect(),
        }
    }
}

fn find_actor(nodes: &BTreeMap<Coordinate, Node>, actor: ActorId) -> Result<Coordinate, GameError> {
    nodes
        .iter()
        .find(|(_, node)| node.occupants().contains(&actor))
        .map(|(coordinate, _)| *coordinate)
        .ok_or(GameError::ActorNotOnMap(actor))
}

/// The full-knowledge world: every node keyed by coordinate, plus the actors.
#[derive(Debug, Clone, Default)]
pub struct WorldMap {
    nodes: BTreeMap<Coordinate, Node>,
    actors: BTreeMap<ActorId, Actor>,
    exit: Option<Coordinate>,
    next_actor_id: ActorId,
}

impl WorldMap {
    /// Builds a world from its nodes. The first exit node found becomes the
    /// map's exit.
    pub fn from_nodes(nodes: impl IntoIterator<Item = (Coordinate, Node)>) -> Self {
        let nodes: BTreeMap<Coordinate, Node> = nodes.into_iter().collect();
        let exit = nodes
            .iter()
            .find(|(_, node)| node.kind() == NodeKind::Exit)
            .map(|(coordinate, _)| *coordinate);
        WorldMap {
            nodes,
            actors: BTreeMap::new(),
            exit,
            next_actor_id: 0,
        }
    }

    /// Places a new actor on an open node.
    pub fn place_actor(&mut self, position: Coordinate, life: u32) -> Result<ActorId, MoveError> {
        let id = self.next_actor_id;
        let occupants = self
            .nodes
            .get_mut(&position)
            .ok_or(MoveError::PositionNotFound(position))?
            .occupants_mut()
            .ok_or(MoveError::HitWall(position))?;
        occupants.push(id);
        self.actors.insert(id, Actor::new(id, life));
        self.next_actor_id += 1;
        Ok(id)
    }

    pub fn node_at(&self, coordinate: Coordinate) -> Result<&Node, MoveError> {
        self.nodes
            .get(&coordinate)
            .ok_or(MoveError::PositionNotFound(coordinate))
    }

    /// Scans the map for the node holding `actor`.
    pub fn position_of(&self, actor: ActorId) -> Result<Coordinate, GameError> {
        find_actor(&self.nodes, actor)
    }

    /// Moves `actor` by `vector`, returning its new position.
    ///
    /// Removing the actor from its old node and adding it to the target node
    /// happens only after the target has been validated, so a failed move
    /// leaves the map untouched.
    pub fn move_actor(&mut self, actor: ActorId, vector: Vector) -> Result<Coordinate, TurnError> {
        let from = self.position_of(actor)?;
        if vector.is_zero() {
            return Ok(from);
        }
        let target = from.offset(vector);
        match self.node_at(target)? {
            Node::Wall => return Err(MoveError::HitWall(target).into()),
            Node::Open { .. } | Node::Exit { .. } => {}
        }

        if let Some(occupants) = self.nodes.get_mut(&from).and_then(Node::occupants_mut) {
            occupants.retain(|id| *id != actor);
        }
        if let Some(occupants) = self.nodes.get_mut(&target).and_then(Node::occupants_mut) {
            occupants.push(actor);
        }
        debug!(actor, %from, %target, "actor moved");
        Ok(target)
    }

    /// Returns every node within Euclidean distance `radius` of the actor.
    /// The scan never leaves the map, so any radius is at most the whole map.
    pub fn visibility_around(&self, actor: ActorId, radius: u32) -> Result<Surroundings, GameError> {
        let center = self.position_of(actor)?;
        let (width, height) = self.bounds();
        let r = i64::from(radius);
        let window = |middle: i32, size: usize| {
            let low = (i64::from(middle) - r).max(0);
            let high = (i64::from(middle) + r).min(size as i64 - 1);
            low as i32..=high as i32
        };
        let limit = u64::from(radius) * u64::from(radius);

        let mut visible = BTreeMap::new();
        for y in window(center.y, height) {
            for x in window(center.x, width) {
                let coordinate = Coordinate::new(x, y);
                if distance_squared(center, coordinate).unsigned_abs() > limit {
                    continue;
                }
                if let Some(node) = self.nodes.get(&coordinate) {
                    visible.insert(coordinate, node.clone());
                }
            }
        }
        Ok(Surroundings { nodes: visible })
    }

    pub fn actor(&self, id: ActorId) -> Option<&Actor> {
        self.actors.get(&id)
    }

    pub fn actor_mut(&mut self, id: ActorId) -> Option<&mut Actor> {
        self.actors.get_mut(&id)
    }

    pub fn exit(&self) -> Option<Coordinate> {
        self.exit
    }

    pub fn coordinates(&self) -> impl Iterator<Item = Coordinate> + '_ {
        self.nodes.keys().copied()
    }

    pub fn nodes(&self) -> impl Iterator<Item = (Coordinate, &Node)> {
        self.nodes.iter().map(|(c, n)| (*c, n))
    }

    pub fn contains(&self, coordinate: Coordinate) -> bool {
        self.nodes.contains_key(&coordinate)
    }

    /// Width and height of the rectangle `(0, 0)..=(max x, max y)` covering
    /// the map.
    pub fn bounds(&self) -> (usize, usize) {
        bounds_of(self.coordinates())
    }
}

/// Width and height of the rectangle anchored at the origin covering every
/// coordinate. Negative coordinates do not extend it.
pub fn bounds_of(coordinates: impl IntoIterator<Item = Coordinate>) -> (usize, usize) {
    let mut width = 0;
    let mut height = 0;
    for c in coordinates {
        width = width.max(c.x + 1);
        height = height.max(c.y + 1);
    }
    (width.max(0) as usize, height.max(0) as usize)
}

/// A freshly built world with its starting actor.
#[derive(Debug, Clone)]
pub struct LoadedWorld {
    pub world: WorldMap,
    pub actor: ActorId,
    pub start: Coordinate,
    pub exit: Coordinate,
}

fn is_padding(c: char) -> bool {
    c.is_whitespace() || c == '"' || c == '\''
}

/// Loads a world from its text form.
///
/// Rows are newline separated. `s` marks the start (an open cell holding the
/// starting actor), `e` the exit and `X` a wall; any other character is an
/// open cell. Whitespace and quote characters are padding. Blank lines are
/// ignored.
pub fn load_world_from_str(map_string: &str, life: u32) -> Result<LoadedWorld, MapError> {
    let rows: Vec<Vec<char>> = map_string
        .lines()
        .map(|line| line.chars().filter(|c| !is_padding(*c)).collect::<Vec<_>>())
        .filter(|row| !row.is_empty())
        .collect();
    let width = rows.first().map(Vec::len).ok_or(MapError::Empty)?;

    let mut nodes = BTreeMap::new();
    let mut start = None;
    let mut exit = None;

    for (y, row) in rows.iter().enumerate() {
        if row.len() != width {
            return Err(MapError::InconsistentWidth {
                row: y,
                expected: width,
                found: row.len(),
            });
        }
        for (x, symbol) in row.iter().enumerate() {
            let coordinate = Coordinate::new(x as i32, y as i32);
            let node = match symbol {
                's' => {
                    if start.replace(coordinate).is_some() {
                        return Err(MapError::DuplicateStart(coordinate));
                    }
                    Node::open()
                }
                'e' => {
                    if exit.replace(coordinate).is_some() {
                        return Err(MapError::DuplicateExit(coordinate));
                    }
                    Node::exit()
                }
                'X' => Node::Wall,
                _ => Node::open(),
            };
            nodes.insert(coordinate, node);
        }
    }

    let start = start.ok_or(MapError::MissingStart)?;
    let exit = exit.ok_or(MapError::MissingExit)?;
    let mut world = WorldMap::from_nodes(nodes);
    let actor = world
        .place_actor(start, life)
        .map_err(|_| MapError::StartInWall(start))?;
    debug!(%start, %exit, "loaded world");

    Ok(LoadedWorld {
        world,
        actor,
        start,
        exit,
    })
}

/// A rectangular block of walls.
///
/// Covers `top_left` through `top_left + (width, height)`, both ends
/// inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pool {
    pub top_left: Coordinate,
    pub width: i32,
    pub height: i32,
}

impl Pool {
    pub fn contains(&self, c: Coordinate) -> bool {
        (self.top_left.x..=self.top_left.x + self.width).contains(&c.x)
            && (self.top_left.y..=self.top_left.y + self.height).contains(&c.y)
    }
}

/// Generates an open world spanning `(0, 0)..=(width, height)` with wall
/// pools, an exit and a starting actor.
///
/// The exit takes precedence over any pool covering it; pool cells outside
/// the map are dropped.
pub fn generate_world(
    width: i32,
    height: i32,
    pools: &[Pool],
    exit: Coordinate,
    start: Coordinate,
    life: u32,
) -> Result<LoadedWorld, MapError> {
    let in_map = |c: Coordinate| (0..=width).contains(&c.x) && (0..=height).contains(&c.y);
    if !in_map(exit) {
        return Err(MapError::OutsideMap(exit));
    }
    if !in_map(start) {
        return Err(MapError::OutsideMap(start));
    }

    let mut nodes = BTreeMap::new();
    for y in 0..=height {
        for x in 0..=width {
            let coordinate = Coordinate::new(x, y);
            let node = if coordinate == exit {
                Node::exit()
            } else if pools.iter().any(|pool| pool.contains(coordinate)) {
                Node::Wall
            } else {
                Node::open()
            };
            nodes.insert(coordinate, node);
        }
    }

    let mut world = WorldMap::from_nodes(nodes);
    let actor = world
        .place_actor(start, life)
        .map_err(|_| MapError::StartInWall(start))?;
    Ok(LoadedWorld {
        world,
        actor,
        start,
        exit,
    })
}
