use anyhow::{Context, Result, anyhow};
use clap::{Parser, ValueEnum};
use fog_maze_core::{
    Coordinate,
    agent::{Agent, Explorer, RandomWalker, StraightMover, TurningWalker},
    config::GameConfig,
    explore::WaypointStrategy,
    game::{Game, GameOutcome, GameState},
    pathfinding::PathfinderKind,
    world::{NodeKind, load_world_from_str},
};
use ratatui::{
    crossterm::{
        self,
        event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode},
        execute,
        terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
    },
    prelude::*,
    widgets::*,
};
use std::{
    fs::File,
    io::{self, Stdout},
    path::{Path, PathBuf},
    sync::Mutex,
    time::{Duration, Instant},
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(version, about = "Watch an agent find the exit of a maze it cannot see", long_about = None)]
struct Args {
    /// Map file to load
    #[arg(short, long, value_name = "MAP_FILE")]
    map: Option<PathBuf>,

    /// TOML file with game settings; flags below override it
    #[arg(short, long, value_name = "CONFIG_FILE")]
    config: Option<PathBuf>,

    /// Which agent drives the actor
    #[arg(short, long, value_enum, default_value_t = AgentKind::Explorer)]
    agent: AgentKind,

    /// Pathfinder used by the explorer (bfs or a_star)
    #[arg(long)]
    pathfinder: Option<PathfinderKind>,

    /// Waypoint strategy used by the explorer (spiral or nearest)
    #[arg(long)]
    strategy: Option<WaypointStrategy>,

    /// Visibility radius
    #[arg(short, long)]
    radius: Option<u32>,

    /// Starting life
    #[arg(short, long)]
    life: Option<u32>,

    /// Stop after this many turns
    #[arg(long)]
    max_turns: Option<u32>,

    /// Seed for the random agent
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Run without the terminal UI and print the outcome
    #[arg(long)]
    headless: bool,

    /// Write a JSON record of the run to this file
    #[arg(long, value_name = "RECORD_FILE")]
    record: Option<PathBuf>,

    /// Write logs to this file
    #[arg(long, value_name = "LOG_FILE")]
    log: Option<PathBuf>,

    /// Milliseconds between turns in the terminal UI
    #[arg(long, default_value_t = 250)]
    tick_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum AgentKind {
    /// Explores the fog and walks to the exit once seen
    Explorer,
    /// Walks north forever
    Straight,
    /// Walks diagonally, turning clockwise at every obstacle
    Turning,
    /// Picks a random step every turn
    Random,
}

struct App {
    /// The running game.
    game: Game,
    /// Flag to control the main loop.
    should_quit: bool,
    /// Turns only advance while unpaused.
    paused: bool,
}

impl App {
    fn new(game: Game) -> Self {
        App {
            game,
            should_quit: false,
            paused: false,
        }
    }

    /// Handles one step of the simulation.
    fn tick(&mut self) {
        if self.paused || self.game.state().is_over() {
            return;
        }
        self.game.tick();
    }

    /// Sets the quit flag.
    fn quit(&mut self) {
        self.should_quit = true;
    }

    fn toggle_pause(&mut self) {
        self.paused = !self.paused;
    }
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();
    init_tracing(&args)?;

    let config = load_config(&args)?;
    // If no map file is provided, use the default map
    let map_file = args
        .map
        .clone()
        .unwrap_or(PathBuf::from("maps/maze01.txt"));
    let mut game = build_game(&map_file, args.agent, args.seed, config)?;
    info!(map = %map_file.display(), agent = ?args.agent, ?config, "starting run");

    if args.headless {
        let outcome = game.run();
        print_outcome(&outcome);
    } else {
        // Set up the terminal
        let mut terminal = setup_terminal()?;
        let mut app = App::new(game);
        let result = run_app(&mut terminal, &mut app, Duration::from_millis(args.tick_ms));
        // Restore the terminal state even when the loop failed
        restore_terminal(&mut terminal)?;
        result?;
        game = app.game;
        print_outcome(&game.outcome());
    }

    if let Some(path) = &args.record {
        write_record(&game, path)?;
    }
    Ok(())
}

/// Installs the log subscriber. The terminal UI owns stdout, so without a
/// log file only headless runs log (to stderr).
fn init_tracing(args: &Args) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let installed = match (&args.log, args.headless) {
        (Some(path), _) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
        }
        (None, true) => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .try_init(),
        (None, false) => return Ok(()),
    };
    installed.map_err(|error| anyhow!("Failed to install log subscriber: {error}"))
}

/// Reads the optional TOML config, then applies flag overrides.
fn load_config(args: &Args) -> Result<GameConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            toml::from_str(&text)
                .with_context(|| format!("Invalid config file {}", path.display()))?
        }
        None => GameConfig::default(),
    };
    if let Some(pathfinder) = args.pathfinder {
        config.pathfinder = pathfinder;
    }
    if let Some(strategy) = args.strategy {
        config.strategy = strategy;
    }
    if let Some(radius) = args.radius {
        config.visibility_radius = radius;
    }
    if let Some(life) = args.life {
        config.life = life;
    }
    if args.max_turns.is_some() {
        config.max_turns = args.max_turns;
    }
    Ok(config)
}

fn build_game(map_file: &Path, kind: AgentKind, seed: u64, config: GameConfig) -> Result<Game> {
    // Get map from file
    let file_string = std::fs::read_to_string(map_file)
        .with_context(|| format!("Failed to read map file {}", map_file.display()))?;
    let loaded = load_world_from_str(&file_string, config.life)
        .with_context(|| format!("Failed to load map {}", map_file.display()))?;

    let actor = loaded.actor;
    let agent: Box<dyn Agent> = match kind {
        AgentKind::Explorer => Box::new(Explorer::new(
            actor,
            loaded.world.coordinates(),
            loaded.start,
            config.pathfinder,
            config.strategy,
        )),
        AgentKind::Straight => Box::new(StraightMover::north(actor)),
        AgentKind::Turning => Box::new(TurningWalker::new(actor)),
        AgentKind::Random => Box::new(RandomWalker::new(actor, seed)),
    };
    Ok(Game::new(loaded.world, actor, agent, config))
}

fn print_outcome(outcome: &GameOutcome) {
    let verdict = match outcome.state {
        GameState::Won => "Exit reached",
        GameState::Lost => "Out of life",
        GameState::Errored => "Run aborted",
        GameState::Running => "Stopped",
    };
    println!(
        "{verdict} after {} turns with {} life left",
        outcome.turns, outcome.life
    );
    if let Some(position) = outcome.position {
        println!("Final position: {position}");
    }
    if let Some(feedback) = &outcome.last_feedback {
        println!("Last rejected move: {feedback}");
    }
    if let Some(error) = &outcome.error {
        println!("Error: {error}");
    }
}

fn write_record(game: &Game, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(&game.record())?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write record {}", path.display()))?;
    info!(record = %path.display(), "record written");
    Ok(())
}

/// Configures the terminal for TUI interaction.
fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    let mut stdout = io::stdout();
    enable_raw_mode()?;
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend).map_err(Into::into)
}

/// Restores the terminal to its original state.
fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    Ok(())
}

/// Runs the main loop of the TUI application.
fn run_app(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    app: &mut App,
    tick_rate: Duration,
) -> Result<()> {
    let mut last_tick = Instant::now();

    loop {
        terminal.draw(|f| ui(f, app))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_secs(0));

        if crossterm::event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                match key.code {
                    KeyCode::Char('q') | KeyCode::Esc => app.quit(),
                    KeyCode::Char(' ') => app.toggle_pause(),
                    _ => {}
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            app.tick();
            last_tick = Instant::now();
        }

        if app.should_quit {
            break;
        }
    }
    Ok(())
}

/// Renders the user interface.
fn ui(frame: &mut Frame, app: &App) {
    let main_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(70), // Area for the map
            Constraint::Percentage(20), // Area for the run status
            Constraint::Percentage(10), // Area for help
        ])
        .split(frame.area());

    render_map(frame, main_layout[0], &app.game);
    render_status(frame, main_layout[1], app);

    let help_text = Paragraph::new("Press 'q' or 'Esc' to quit, space to pause.")
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::TOP));
    frame.render_widget(help_text, main_layout[2]);
}

/// Renders turn, life and feedback of the running game.
fn render_status(frame: &mut Frame, area: Rect, app: &App) {
    let game = &app.game;
    let outcome = game.outcome();

    let state_style = match outcome.state {
        GameState::Running => Style::default(),
        GameState::Won => Style::default().fg(Color::Green).bold(),
        GameState::Lost | GameState::Errored => Style::default().fg(Color::Red).bold(),
    };
    let mut state_line = vec![
        Span::raw(format!("Turn: {}  Life: {}  State: ", outcome.turns, outcome.life)),
        Span::styled(format!("{:?}", outcome.state), state_style),
    ];
    if app.paused {
        state_line.push(Span::styled("  (paused)", Style::default().fg(Color::Yellow)));
    }

    let mut items = vec![ListItem::from(Line::from(state_line))];
    if let Some(position) = outcome.position {
        items.push(ListItem::new(format!("Position: {position}")));
    }
    if let Some(memory) = game.agent().memory() {
        items.push(ListItem::new(format!(
            "Unobserved cells: {}",
            memory.unobserved_count()
        )));
    }
    let feedback = outcome
        .last_feedback
        .map_or_else(|| "none".to_string(), |feedback| feedback.to_string());
    items.push(ListItem::new(format!("Last rejected move: {feedback}")));
    if let Some(error) = outcome.error {
        items.push(ListItem::from(Span::styled(
            format!("Error: {error}"),
            Style::default().fg(Color::Red),
        )));
    }

    let status_widget =
        List::new(items).block(Block::default().borders(Borders::ALL).title("Status"));
    frame.render_widget(status_widget, area);
}

/// Renders the world onto the frame, greying out what the agent has not seen.
fn render_map(frame: &mut Frame, area: Rect, game: &Game) {
    let world = game.world();
    let memory = game.agent().memory();
    let actor_position = world.position_of(game.actor()).ok();
    let (width, height) = world.bounds();

    let mut lines = Vec::with_capacity(height);
    for y in 0..height as i32 {
        let mut spans = Vec::with_capacity(width);
        for x in 0..width as i32 {
            let coordinate = Coordinate::new(x, y);
            if actor_position == Some(coordinate) {
                spans.push(Span::styled("@", Style::default().fg(Color::Red).bold()));
                continue;
            }
            let fogged = memory.is_some_and(|memory| memory.is_unobserved(coordinate));
            spans.push(tile_span(world.node_at(coordinate).ok().map(|n| n.kind()), fogged));
        }
        lines.push(Line::from(spans));
    }

    let title = match memory.and_then(|memory| memory.exit()) {
        Some(exit) => format!("Fog Maze (exit known at {exit})"),
        None => "Fog Maze".to_string(),
    };
    let map_paragraph = Paragraph::new(lines)
        .block(Block::default().title(title).borders(Borders::ALL))
        .alignment(Alignment::Center);

    frame.render_widget(map_paragraph, area);
}

/// Character and style for one map cell. Cells outside the world render blank.
fn tile_span(kind: Option<NodeKind>, fogged: bool) -> Span<'static> {
    let (tile_char, tile_style) = match kind {
        None => (" ", Style::default()),
        Some(NodeKind::Wall) => ("#", Style::default().fg(Color::Gray)),
        Some(NodeKind::Exit) => ("e", Style::default().fg(Color::Green).bold()),
        Some(NodeKind::Open) => (".", Style::default()),
    };
    if fogged {
        return Span::styled(tile_char, tile_style.fg(Color::DarkGray).dim());
    }
    Span::styled(tile_char, tile_style)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_defaults() {
        let args = Args::parse_from([
            "fog_maze",
            "--pathfinder",
            "bfs",
            "--strategy",
            "nearest",
            "--radius",
            "4",
            "--max-turns",
            "30",
        ]);
        let config = load_config(&args).unwrap();
        assert_eq!(config.pathfinder, PathfinderKind::Bfs);
        assert_eq!(config.strategy, WaypointStrategy::NearestUnobserved);
        assert_eq!(config.visibility_radius, 4);
        assert_eq!(config.max_turns, Some(30));
        assert_eq!(config.life, 10);
    }

    #[test]
    fn toml_config_fills_missing_fields() {
        let config: GameConfig = toml::from_str(
            r#"
            life = 40
            pathfinder = "bfs"

            [strategy]
            kind = "spiral"
            spacing = 2.5
            "#,
        )
        .unwrap();
        assert_eq!(config.life, 40);
        assert_eq!(config.pathfinder, PathfinderKind::Bfs);
        assert_eq!(config.strategy, WaypointStrategy::Spiral { spacing: 2.5 });
        assert_eq!(config.visibility_radius, 2);
    }

    #[test]
    fn straight_agent_runs_headless() {
        let loaded = load_world_from_str(".e.\n...\n.s.", 10).unwrap();
        let actor = loaded.actor;
        let mut game = Game::new(
            loaded.world,
            actor,
            Box::new(StraightMover::north(actor)),
            GameConfig::default(),
        );
        let outcome = game.run();
        assert_eq!(outcome.state, GameState::Won);
        let json = serde_json::to_value(game.record()).unwrap();
        assert_eq!(json["state"], "won");
        assert_eq!(json["turns"].as_array().map(Vec::len), Some(3));
    }

    #[test]
    fn fog_dims_tiles() {
        let clear = tile_span(Some(NodeKind::Wall), false);
        let fogged = tile_span(Some(NodeKind::Wall), true);
        assert_eq!(clear.content, "#");
        assert_eq!(fogged.style.fg, Some(Color::DarkGray));
    }
}
