use anyhow::{Context, Result};
use clap::Parser;
use ratatui::{
    crossterm::{
        event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
        execute,
        terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
    },
    prelude::*,
    widgets::*,
};
use rogue_core::{Frontend, Game, GameConfig, GameState, GameView, Intent, Position, Rgb};
use std::{
    fs::File,
    io::{self, Stdout},
    path::{Path, PathBuf},
    sync::Mutex,
};
use tracing_subscriber::EnvFilter;

const COLOR_DARK_WALL: Color = Color::Rgb(0, 0, 100);
const COLOR_LIGHT_WALL: Color = Color::Rgb(130, 110, 50);
const COLOR_DARK_GROUND: Color = Color::Rgb(50, 50, 150);
const COLOR_LIGHT_GROUND: Color = Color::Rgb(200, 180, 50);

/// Number of log lines shown under the map.
const VISIBLE_MESSAGES: usize = 6;

#[derive(Parser, Debug)]
#[command(version, about = "A turn-based dungeon crawler in the terminal", long_about = None)]
struct Args {
    /// TOML file with game settings; command-line flags override it
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Seed for dungeon generation (random if omitted)
    #[arg(short, long)]
    seed: Option<u64>,

    #[arg(long)]
    width: Option<usize>,

    #[arg(long)]
    height: Option<usize>,

    #[arg(long)]
    max_rooms: Option<usize>,

    #[arg(long)]
    max_room_monsters: Option<usize>,

    #[arg(long)]
    fov_radius: Option<usize>,

    /// Do not light the walls at the edge of the field of view
    #[arg(long)]
    no_light_walls: bool,

    /// Write logs to this file (filter with RUST_LOG)
    #[arg(long, value_name = "FILE")]
    log_file: Option<PathBuf>,
}

/// Layout of the terminal screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DisplayMode {
    /// Map with a border, status and message panels.
    Framed,
    /// Map only.
    Fullscreen,
}

/// The display and input side of the game, backed by a crossterm terminal.
struct TerminalFrontend {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    mode: DisplayMode,
}

impl Frontend for TerminalFrontend {
    type Error = anyhow::Error;

    fn wait_for_intent(&mut self) -> Result<Intent> {
        loop {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => return Ok(intent_for(key)),
                // Redraw without spending a turn.
                Event::Resize(..) => return Ok(Intent::NoAction),
                _ => {}
            }
        }
    }

    fn toggle_display_mode(&mut self) -> Result<()> {
        self.mode = match self.mode {
            DisplayMode::Framed => DisplayMode::Fullscreen,
            DisplayMode::Fullscreen => DisplayMode::Framed,
        };
        tracing::debug!(mode = ?self.mode, "display mode toggled");
        Ok(())
    }

    fn render(&mut self, view: &GameView<'_>) -> Result<()> {
        let map = map_lines(view)?;
        let mode = self.mode;
        self.terminal.draw(|frame| ui(frame, view, map, mode))?;
        Ok(())
    }
}

/// Maps a key press to a player intent.
fn intent_for(key: KeyEvent) -> Intent {
    match key.code {
        KeyCode::Enter if key.modifiers.contains(KeyModifiers::ALT) => Intent::ToggleDisplayMode,
        KeyCode::Char('f') => Intent::ToggleDisplayMode,
        KeyCode::Esc | KeyCode::Char('q') => Intent::Exit,
        KeyCode::Up | KeyCode::Char('k') => Intent::MoveUp,
        KeyCode::Down | KeyCode::Char('j') => Intent::MoveDown,
        KeyCode::Left | KeyCode::Char('h') => Intent::MoveLeft,
        KeyCode::Right | KeyCode::Char('l') => Intent::MoveRight,
        _ => Intent::NoAction,
    }
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();
    init_logging(args.log_file.as_deref())?;

    let config = build_config(&args)?;
    let seed = args.seed.unwrap_or_else(rand::random);
    tracing::info!(seed, ?config, "starting game");
    let mut game = Game::from_seed(config, seed)?;

    // Set up the terminal
    let mut frontend = TerminalFrontend {
        terminal: setup_terminal()?,
        mode: DisplayMode::Framed,
    };

    // Run the main loop, restoring the terminal even if it failed
    let outcome = game.run(&mut frontend);
    restore_terminal(&mut frontend.terminal)?;

    match outcome? {
        GameState::Dead => println!("You died. (seed {seed})"),
        GameState::Playing => println!("You left the dungeon. (seed {seed})"),
    }
    Ok(())
}

/// Starts from the config file (or the defaults) and applies command-line overrides.
fn build_config(args: &Args) -> Result<GameConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            toml::from_str(&text)
                .with_context(|| format!("Failed to parse config file {}", path.display()))?
        }
        None => GameConfig::default(),
    };

    if let Some(width) = args.width {
        config.width = width;
    }
    if let Some(height) = args.height {
        config.height = height;
    }
    if let Some(max_rooms) = args.max_rooms {
        config.max_rooms = max_rooms;
    }
    if let Some(max_room_monsters) = args.max_room_monsters {
        config.max_room_monsters = max_room_monsters;
    }
    if let Some(fov_radius) = args.fov_radius {
        config.fov_radius = fov_radius;
    }
    if args.no_light_walls {
        config.fov_light_walls = false;
    }
    config.validate()?;
    Ok(config)
}

/// Installs a file logger. The terminal is owned by the UI, so without a
/// log file nothing is logged at all.
fn init_logging(path: Option<&Path>) -> Result<()> {
    let Some(path) = path else {
        return Ok(());
    };
    let file = File::create(path)
        .with_context(|| format!("Failed to create log file {}", path.display()))?;
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("rogue_core=info,rogue_tui=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

/// Configures the terminal for TUI interaction.
fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    let mut stdout = io::stdout();
    enable_raw_mode()?; // Put terminal in raw mode
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend).map_err(Into::into) // Map io::Error to anyhow::Error
}

/// Restores the terminal to its original state.
fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

fn to_color(Rgb(r, g, b): Rgb) -> Color {
    Color::Rgb(r, g, b)
}

/// Background for a tile, or `None` while it is still unexplored.
fn tile_background(visible: bool, explored: bool, wall: bool) -> Option<Color> {
    match (visible, explored, wall) {
        (true, _, true) => Some(COLOR_LIGHT_WALL),
        (true, _, false) => Some(COLOR_LIGHT_GROUND),
        (false, true, true) => Some(COLOR_DARK_WALL),
        (false, true, false) => Some(COLOR_DARK_GROUND),
        (false, false, _) => None,
    }
}

/// Builds the map picture: lit or remembered terrain, then every entity in
/// view, the player last.
fn map_lines(view: &GameView<'_>) -> Result<Vec<Line<'static>>> {
    let tiles = view.tiles();
    let fov = view.fov();
    let width = tiles.width();
    let mut cells = vec![(' ', Style::default()); width * tiles.height()];

    for (pos, tile) in tiles.enumerate() {
        let visible = fov.is_visible(pos)?;
        if let Some(bg) = tile_background(visible, tile.explored, tile.blocks_sight) {
            cells[pos.y * width + pos.x].1 = Style::default().bg(bg);
        }
    }

    for entity in view.entities_in_draw_order() {
        let Position { x, y } = entity.position;
        if !fov.is_visible(entity.position)? {
            continue;
        }
        let cell = &mut cells[y * width + x];
        let mut style = cell.1.fg(to_color(entity.color));
        if view.is_player(entity.id()) {
            style = style.bold();
        }
        *cell = (entity.glyph, style);
    }

    Ok(cells
        .chunks(width.max(1))
        .map(|row| {
            Line::from(
                row.iter()
                    .map(|(glyph, style)| Span::styled(glyph.to_string(), *style))
                    .collect::<Vec<_>>(),
            )
        })
        .collect())
}

/// Renders the user interface.
fn ui(frame: &mut Frame, view: &GameView<'_>, map: Vec<Line<'static>>, mode: DisplayMode) {
    if mode == DisplayMode::Fullscreen {
        frame.render_widget(Paragraph::new(map), frame.area());
        return;
    }

    let main_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(3),                              // Area for the map
            Constraint::Length(VISIBLE_MESSAGES as u16 + 2), // Area for status and messages
            Constraint::Length(2),                           // Area for help
        ])
        .split(frame.area());

    // Render the map
    let map_paragraph =
        Paragraph::new(map).block(Block::default().title("Dungeon").borders(Borders::ALL));
    frame.render_widget(map_paragraph, main_layout[0]);

    let bottom = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(24), Constraint::Min(10)])
        .split(main_layout[1]);
    render_status(frame, bottom[0], view);
    render_messages(frame, bottom[1], view);

    // Render status/help text
    let help_text = Paragraph::new(
        "Arrows or hjkl to move/attack, 'f' to toggle layout, 'q' or 'Esc' to quit.",
    )
    .alignment(Alignment::Center)
    .block(Block::default().borders(Borders::TOP));
    frame.render_widget(help_text, main_layout[2]);
}

/// Renders the player's hit points and the game state.
fn render_status(frame: &mut Frame, area: Rect, view: &GameView<'_>) {
    let (hp, max_hp) = view.player_hp();
    let hp_style = if hp * 3 <= max_hp {
        Style::default().fg(Color::Red).bold()
    } else {
        Style::default()
    };
    let mut lines = vec![Line::from(Span::styled(format!("HP: {hp}/{max_hp}"), hp_style))];
    if view.state() == GameState::Dead {
        lines.push(Line::from(Span::styled(
            "You are dead.",
            Style::default().fg(Color::Red),
        )));
    }
    let status =
        Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Status"));
    frame.render_widget(status, area);
}

/// Renders the most recent combat messages, newest last.
fn render_messages(frame: &mut Frame, area: Rect, view: &GameView<'_>) {
    let log = view.messages();
    let items: Vec<ListItem> = log
        .iter()
        .skip(log.len().saturating_sub(VISIBLE_MESSAGES))
        .map(|event| ListItem::new(event.to_string()))
        .collect();
    let list = List::new(items).block(Block::default().borders(Borders::ALL).title("Messages"));
    frame.render_widget(list, area);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn arrow_and_vi_keys_move() {
        assert_eq!(intent_for(press(KeyCode::Up)), Intent::MoveUp);
        assert_eq!(intent_for(press(KeyCode::Char('j'))), Intent::MoveDown);
        assert_eq!(intent_for(press(KeyCode::Char('h'))), Intent::MoveLeft);
        assert_eq!(intent_for(press(KeyCode::Right)), Intent::MoveRight);
    }

    #[test]
    fn alt_enter_toggles_display_mode() {
        let alt_enter = KeyEvent::new(KeyCode::Enter, KeyModifiers::ALT);
        assert_eq!(intent_for(alt_enter), Intent::ToggleDisplayMode);
        assert_eq!(intent_for(press(KeyCode::Enter)), Intent::NoAction);
        assert_eq!(intent_for(press(KeyCode::Esc)), Intent::Exit);
        assert_eq!(intent_for(press(KeyCode::Char('x'))), Intent::NoAction);
    }

    #[test]
    fn unexplored_tiles_stay_dark() {
        assert_eq!(tile_background(false, false, true), None);
        assert_eq!(tile_background(false, true, true), Some(COLOR_DARK_WALL));
        assert_eq!(tile_background(true, true, false), Some(COLOR_LIGHT_GROUND));
    }

    #[test]
    fn flags_override_the_config() {
        let args = Args::parse_from(["rogue_tui", "--width", "60", "--no-light-walls"]);
        let config = build_config(&args).unwrap();
        assert_eq!(config.width, 60);
        assert!(!config.fov_light_walls);
        assert_eq!(config.height, GameConfig::default().height);

        let bad = Args::parse_from(["rogue_tui", "--width", "5"]);
        assert!(build_config(&bad).is_err());
    }

    #[test]
    fn map_shows_the_player_in_view() {
        let mut game = Game::from_seed(GameConfig::default(), 42).unwrap();
        game.refresh_visibility().unwrap();
        let view = game.view();
        let lines = map_lines(&view).unwrap();
        assert_eq!(lines.len(), 45);

        let Position { x, y } = game.entities().player().position;
        assert_eq!(lines[y].spans[x].content, "@");
    }

    #[test]
    fn framed_layout_shows_status_and_help() {
        let mut game = Game::from_seed(GameConfig::default(), 42).unwrap();
        game.refresh_visibility().unwrap();
        let view = game.view();
        let map = map_lines(&view).unwrap();

        let mut terminal = Terminal::new(ratatui::backend::TestBackend::new(100, 60)).unwrap();
        terminal
            .draw(|frame| ui(frame, &view, map, DisplayMode::Framed))
            .unwrap();
        let screen: String = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect();
        assert!(screen.contains("HP: 30/30"));
        assert!(screen.contains("'q' or 'Esc' to quit."));
    }
}
