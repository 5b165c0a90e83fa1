use std::{io, path::{Path, PathBuf}, time::{Duration, Instant}};

use anyhow::Context as _;
use chrono::Utc;
use clap::Parser;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::prelude::*;

use focusclock::{
    app::App,
    config::{default_data_dir, Config, FileConfigStore, THEMES},
    logging::init_logging,
    notify::DesktopNotifier,
    persistence::Persistence,
    runtime::{Interval, TICK_INTERVAL},
    storage::FileStore,
    ui::{get_theme, Screen, TerminalRenderer},
};

// Input polling granularity; both 1 Hz ticks are scheduled on top of it.
const POLL_RATE: Duration = Duration::from_millis(50);
const EXPORT_FILE: &str = "stats_export.csv";

type FocusApp = App<FileStore, DesktopNotifier>;
type Renderer = TerminalRenderer<CrosstermBackend<io::Stdout>>;

#[derive(Parser, Clone)]
#[command(author, version, about = "🕐 focusclock - an analog terminal focus clock")]
struct Args {
    /// directory for state, statistics, config and logs
    #[arg(short, long)]
    data_dir: Option<PathBuf>,
    /// colour theme
    #[arg(short = 't', long, value_parser = clap::builder::PossibleValuesParser::new(THEMES.iter().copied()))]
    theme: Option<String>,
    /// do not play the completion tone
    #[arg(long)]
    no_sound: bool,
    /// grant permission for desktop notifications and remember it
    #[arg(long, conflicts_with = "no_notify")]
    allow_notifications: bool,
    /// do not raise desktop notifications this run
    #[arg(long)]
    no_notify: bool,
    /// record a session that finished while the app was closed
    #[arg(long)]
    finalize_expired: bool,
    /// tracing filter, e.g. "focusclock=debug"
    #[arg(long)]
    log_level: Option<String>,
}

/// Config file plus CLI overrides. Problems are returned rather than logged
/// because logging is configured from the result.
fn load_config(args: &Args, store: &FileConfigStore) -> (Config, Vec<String>) {
    let mut problems = Vec::new();
    let mut config = store.load().unwrap_or_else(|e| {
        problems.push(format!("could not load config {}, using defaults: {e}", store.path().display()));
        Config::default()
    });
    if args.allow_notifications && !config.notifications_enabled {
        config.notifications_enabled = true;
        if let Err(e) = store.save(&config) {
            problems.push(format!("could not save notification permission: {e}"));
        }
    } else if !store.exists() {
        if let Err(e) = store.save(&config) {
            problems.push(format!("could not write default config: {e}"));
        }
    }

    // CLI overrides
    if let Some(t) = &args.theme { config.theme = t.clone(); }
    if let Some(l) = &args.log_level { config.log_level = l.clone(); }
    if args.no_sound { config.sound_enabled = false; }
    if args.no_notify { config.notifications_enabled = false; }
    if args.finalize_expired { config.finalize_expired_sessions = true; }
    (config, problems)
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let data_dir = args.data_dir.clone().unwrap_or_else(default_data_dir);
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("creating data directory {}", data_dir.display()))?;

    let config_store = FileConfigStore::in_dir(&data_dir);
    let (config, problems) = load_config(&args, &config_store);
    init_logging(&data_dir, &config.log_level)?;
    for problem in &problems {
        tracing::warn!("{problem}");
    }
    tracing::info!(data_dir = %data_dir.display(), theme = %config.theme, "starting focusclock");

    let notifier = DesktopNotifier::new(config.sound_enabled, config.notifications_enabled);
    let persistence = Persistence::new(FileStore::new(&data_dir));
    let mut app = App::load(persistence, notifier, config.finalize_expired_sessions, Utc::now());

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let terminal = Terminal::new(CrosstermBackend::new(stdout))?;
    let mut renderer = TerminalRenderer::new(terminal, get_theme(&config.theme), true);

    let res = run(&mut renderer, &mut app, &data_dir);
    app.save_all(Utc::now());

    disable_raw_mode()?;
    let terminal = renderer.terminal_mut();
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    if let Err(e) = &res {
        tracing::error!(error = %e, "focusclock exited with an error");
    }
    res
}

fn run(renderer: &mut Renderer, app: &mut FocusApp, data_dir: &Path) -> anyhow::Result<()> {
    let mut clock_tick = Interval::new(TICK_INTERVAL);
    let mut timer_tick = Interval::new(TICK_INTERVAL);
    clock_tick.arm(Instant::now());
    app.render(Utc::now(), renderer);

    loop {
        // the timer tick follows the state machine: armed while running only
        if app.is_running() {
            timer_tick.arm(Instant::now());
        } else {
            timer_tick.disarm();
        }

        let timeout = [clock_tick.time_until_due(Instant::now()), timer_tick.time_until_due(Instant::now())]
            .into_iter()
            .flatten()
            .min()
            .unwrap_or(POLL_RATE)
            .min(POLL_RATE);

        if event::poll(timeout)? {
            match event::read()? {
                Event::Key(key) => {
                    if handle_key(key, app, renderer, data_dir) {
                        return Ok(());
                    }
                    app.render(Utc::now(), renderer);
                }
                Event::Mouse(mouse) => {
                    if mouse.kind == MouseEventKind::Down(MouseButton::Left)
                        && renderer.clock_contains(mouse.column, mouse.row)
                    {
                        app.click(Utc::now());
                        app.render(Utc::now(), renderer);
                    }
                }
                Event::Resize(_, _) => app.render(Utc::now(), renderer),
                _ => {}
            }
        }

        let now = Instant::now();
        if timer_tick.fire(now) {
            app.on_timer_tick(Utc::now(), renderer);
        }
        if clock_tick.fire(now) {
            app.on_clock_tick(Utc::now(), renderer);
        }
    }
}

/// Returns true when the app should quit.
fn handle_key(key: KeyEvent, app: &mut FocusApp, renderer: &mut Renderer, data_dir: &Path) -> bool {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return true;
    }

    if let Some(prompt) = app.goal_prompt_mut() {
        match key.code {
            KeyCode::Char(c) if c.is_ascii_digit() => prompt.push_digit(c),
            KeyCode::Backspace => prompt.backspace(),
            KeyCode::Up | KeyCode::Char('+') | KeyCode::Char('k') => prompt.increment(),
            KeyCode::Down | KeyCode::Char('-') | KeyCode::Char('j') => prompt.decrement(),
            KeyCode::Enter => {
                let action = prompt.confirm();
                app.resolve_goal(action, Utc::now());
            }
            KeyCode::Esc => {
                let action = prompt.skip();
                app.resolve_goal(action, Utc::now());
            }
            _ => {}
        }
        return false;
    }

    let screen = renderer.screen();
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc if screen == Screen::Clock => return true,
        KeyCode::Char('q') | KeyCode::Esc => {
            renderer.set_notice(None);
            renderer.set_screen(Screen::Clock);
        }
        KeyCode::Char(' ') if screen == Screen::Clock => {
            app.click(Utc::now());
        }
        KeyCode::Char('s') => {
            renderer.set_notice(None);
            renderer.set_screen(if screen == Screen::Clock { Screen::Stats } else { Screen::Clock });
        }
        KeyCode::Tab => renderer.set_screen(screen.next_stats()),
        KeyCode::Char('h') | KeyCode::Char('?') => {
            renderer.set_screen(if screen == Screen::Help { Screen::Clock } else { Screen::Help });
        }
        KeyCode::Char('e') if screen.is_stats() => {
            let path = data_dir.join(EXPORT_FILE);
            let notice = match app.export_csv(&path) {
                Ok(()) => format!("💾 Exported to {}", path.display()),
                Err(e) => {
                    tracing::warn!(error = %e, "CSV export failed");
                    format!("Export failed: {e}")
                }
            };
            renderer.set_notice(Some(notice));
        }
        _ => {}
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use focusclock::config::CONFIG_FILE;
    use tempfile::tempdir;

    fn args(flags: &[&str]) -> Args {
        Args::parse_from(std::iter::once("focusclock").chain(flags.iter().copied()))
    }

    #[test]
    fn first_run_writes_defaults_without_notification_permission() {
        let dir = tempdir().unwrap();
        let store = FileConfigStore::in_dir(dir.path());
        let (config, problems) = load_config(&args(&[]), &store);
        assert!(problems.is_empty());
        assert!(store.exists());
        assert!(!config.notifications_enabled);
    }

    #[test]
    fn notification_grant_is_remembered() {
        let dir = tempdir().unwrap();
        let store = FileConfigStore::in_dir(dir.path());
        let (config, _) = load_config(&args(&["--allow-notifications"]), &store);
        assert!(config.notifications_enabled);

        let (config, _) = load_config(&args(&[]), &store);
        assert!(config.notifications_enabled);
        let (config, _) = load_config(&args(&["--no-notify"]), &store);
        assert!(!config.notifications_enabled);
    }

    #[test]
    fn config_problems_are_returned_for_logging_later() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "{theme").unwrap();
        let store = FileConfigStore::in_dir(dir.path());
        let (config, problems) = load_config(&args(&["--theme", "nord"]), &store);
        assert_eq!(problems.len(), 1);
        assert!(problems[0].contains("could not load config"));
        assert_eq!(config.theme, "nord");

        let blocked = dir.path().join("not-a-dir");
        std::fs::write(&blocked, "").unwrap();
        let (_, problems) = load_config(&args(&[]), &FileConfigStore::in_dir(&blocked));
        assert!(problems.iter().any(|p| p.contains("could not write default config")));
    }
}
