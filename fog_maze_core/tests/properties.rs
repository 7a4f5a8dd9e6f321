use std::collections::HashSet;

use fog_maze_core::{
    Coordinate, Vector, chebyshev,
    agent::StraightMover,
    config::GameConfig,
    game::{Game, GameState},
    memory::{Knowledge, Memory, PathableMap},
    pathfinding::{AStar, Bfs, Pathfinder},
    world::{Node, Surroundings, generate_world},
};
use proptest::prelude::*;

const SIDE: usize = 8;

/// A fully revealed square map.
#[derive(Debug, Clone)]
struct Revealed {
    open: Vec<bool>,
}

impl PathableMap for Revealed {
    fn is_open(&self, coordinate: Coordinate) -> bool {
        let in_bounds = (0..SIDE as i32).contains(&coordinate.x) && (0..SIDE as i32).contains(&coordinate.y);
        in_bounds && self.open[coordinate.y as usize * SIDE + coordinate.x as usize]
    }

    fn size(&self) -> (usize, usize) {
        (SIDE, SIDE)
    }
}

fn cell(index: usize) -> Coordinate {
    Coordinate::new((index % SIDE) as i32, (index / SIDE) as i32)
}

/// Number of steps the pathfinder takes to walk from `src` to `dst`, or
/// `None` if it reports the target unreachable.
fn walk(pathfinder: &dyn Pathfinder, map: &Revealed, src: Coordinate, dst: Coordinate) -> Option<usize> {
    let mut current = src;
    let mut steps = 0;
    while current != dst {
        let next = pathfinder.next_step(map, current, dst).unwrap()?;
        assert_eq!(chebyshev(current, next), 1, "{current} -> {next}");
        assert!(map.is_open(next));
        current = next;
        steps += 1;
        assert!(steps <= SIDE * SIDE, "walk from {src} to {dst} does not end");
    }
    Some(steps)
}

fn revealed_map() -> impl Strategy<Value = (Revealed, usize, usize)> {
    (
        prop::collection::vec(prop::bool::weighted(0.7), SIDE * SIDE),
        0..SIDE * SIDE,
        0..SIDE * SIDE,
    )
        .prop_map(|(mut open, src, dst)| {
            open[src] = true;
            open[dst] = true;
            (Revealed { open }, src, dst)
        })
}

fn domain() -> Vec<Coordinate> {
    (0..SIDE * SIDE).map(cell).collect()
}

fn observation(cells: &[(usize, bool)]) -> Surroundings {
    cells
        .iter()
        .map(|&(index, open)| (cell(index), if open { Node::open() } else { Node::Wall }))
        .collect()
}

proptest! {
    #[test]
    fn bfs_and_a_star_agree((map, src, dst) in revealed_map()) {
        let (src, dst) = (cell(src), cell(dst));
        let by_bfs = walk(&Bfs, &map, src, dst);
        let by_a_star = walk(&AStar, &map, src, dst);
        prop_assert_eq!(by_bfs, by_a_star);
    }

    #[test]
    fn path_length_is_never_below_chebyshev((map, src, dst) in revealed_map()) {
        let (src, dst) = (cell(src), cell(dst));
        if let Some(steps) = walk(&AStar, &map, src, dst) {
            prop_assert!(steps >= chebyshev(src, dst) as usize);
        }
    }

    #[test]
    fn merging_twice_changes_nothing(cells in prop::collection::vec((0..SIDE * SIDE, any::<bool>()), 0..40)) {
        // later duplicates would contradict earlier ones
        let mut seen = HashSet::new();
        let cells: Vec<_> = cells.into_iter().filter(|(index, _)| seen.insert(*index)).collect();
        let surroundings = observation(&cells);

        let mut once = Memory::new(domain());
        once.merge(&surroundings);
        let mut twice = once.clone();
        twice.merge(&surroundings);

        for coordinate in domain() {
            prop_assert_eq!(once.knowledge(coordinate), twice.knowledge(coordinate));
        }
        let mut a: Vec<_> = once.frontier().collect();
        let mut b: Vec<_> = twice.frontier().collect();
        a.sort();
        b.sort();
        prop_assert_eq!(a, b);
    }

    #[test]
    fn frontier_only_holds_unobserved_cells(
        batches in prop::collection::vec(prop::collection::vec((0..SIDE * SIDE, any::<bool>()), 1..10), 1..6)
    ) {
        let mut memory = Memory::new(domain());
        let mut known: Vec<(Coordinate, Knowledge)> = Vec::new();
        for batch in batches {
            let mut seen = HashSet::new();
            let fresh: Vec<_> = batch
                .into_iter()
                .filter(|(index, _)| memory.is_unobserved(cell(*index)) && seen.insert(*index))
                .collect();
            memory.merge(&observation(&fresh));
            prop_assert!(memory.frontier().all(|c| memory.is_unobserved(c)));

            // knowledge never reverts
            for (coordinate, knowledge) in &known {
                prop_assert_eq!(memory.knowledge(*coordinate), *knowledge);
            }
            known = domain()
                .into_iter()
                .filter(|c| !memory.is_unobserved(*c))
                .map(|c| (c, memory.knowledge(c)))
                .collect();
        }
    }

    #[test]
    fn straight_line_takes_chebyshev_turns(
        start_x in 0..15i32,
        start_y in 0..15i32,
        direction in 0..8usize,
        length in 1..8i32,
    ) {
        let vector = Vector::STEPS[direction];
        let exit = Coordinate::new(start_x + vector.dx * length, start_y + vector.dy * length);
        prop_assume!((0..15).contains(&exit.x) && (0..15).contains(&exit.y));
        let start = Coordinate::new(start_x, start_y);

        let loaded = generate_world(14, 14, &[], exit, start, 20).unwrap();
        let actor = loaded.actor;
        let mut game = Game::new(
            loaded.world,
            actor,
            Box::new(StraightMover::new(actor, vector)),
            GameConfig { life: 20, ..GameConfig::default() },
        );
        let outcome = game.run();
        prop_assert_eq!(outcome.state, GameState::Won);
        prop_assert_eq!(outcome.turns, chebyshev(start, exit));
    }
}
