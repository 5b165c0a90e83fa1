//! Terminal implementation of the render port.

use std::io;

use crossterm::{execute, terminal::SetTitle};
use ratatui::symbols::Marker;
use ratatui::widgets::canvas::{Canvas, Circle, Context, Line as CanvasLine};
use ratatui::{prelude::*, widgets::*};

use crate::clock::hand_tip;
use crate::stats::local_date;
use crate::view::{APP_TITLE, Overlay, RenderPort, ViewModel, format_remaining};

const FACE_RADIUS: f64 = 1.0;
const PULSE_SCALE: f64 = 1.08;
const SWEEP_STEP_DEG: f64 = 2.0;

#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum Screen {
    Clock,
    Stats,
    History,
    Help,
}

impl Screen {
    /// Tab order through the statistics screens.
    pub fn next_stats(self) -> Self {
        match self {
            Self::Stats => Self::History,
            Self::History => Self::Stats,
            other => other,
        }
    }

    pub fn is_stats(self) -> bool {
        matches!(self, Self::Stats | Self::History)
    }
}

#[derive(Clone, Copy, Debug)]
pub struct Theme {
    /// Elapsed part of the sweep.
    pub revealed_color: Color,
    /// The face outside the sweep.
    pub base_color: Color,
    pub hand_color: Color,
    pub second_hand_color: Color,
    pub border_color: Color,
    pub accent_color: Color,
}

pub fn get_theme(name: &str) -> Theme {
    match name {
        "nord" => Theme {
            revealed_color: Color::Rgb(136, 192, 208),
            base_color: Color::Rgb(59, 66, 82),
            hand_color: Color::Rgb(236, 239, 244),
            second_hand_color: Color::Rgb(191, 97, 106),
            border_color: Color::Rgb(100, 200, 255),
            accent_color: Color::Rgb(180, 142, 173),
        },
        "dracula" => Theme {
            revealed_color: Color::Rgb(189, 147, 249),
            base_color: Color::Rgb(68, 71, 90),
            hand_color: Color::Rgb(248, 248, 242),
            second_hand_color: Color::Rgb(255, 85, 85),
            border_color: Color::Rgb(200, 100, 255),
            accent_color: Color::Rgb(255, 121, 198),
        },
        "gruvbox" => Theme {
            revealed_color: Color::Rgb(254, 128, 25),
            base_color: Color::Rgb(80, 73, 69),
            hand_color: Color::Rgb(235, 219, 178),
            second_hand_color: Color::Rgb(251, 73, 52),
            border_color: Color::Rgb(255, 200, 100),
            accent_color: Color::Rgb(250, 189, 47),
        },
        "solarized" => Theme {
            revealed_color: Color::Rgb(42, 161, 152),
            base_color: Color::Rgb(7, 54, 66),
            hand_color: Color::Rgb(238, 232, 213),
            second_hand_color: Color::Rgb(220, 50, 47),
            border_color: Color::Rgb(100, 200, 255),
            accent_color: Color::Rgb(181, 137, 0),
        },
        _ => Theme {
            revealed_color: Color::Rgb(100, 181, 246),
            base_color: Color::Rgb(50, 50, 60),
            hand_color: Color::White,
            second_hand_color: Color::Rgb(255, 0, 100),
            border_color: Color::Rgb(0, 200, 255),
            accent_color: Color::Rgb(255, 100, 0),
        },
    }
}

pub struct TerminalRenderer<B: Backend> {
    terminal: Terminal<B>,
    screen: Screen,
    theme: Theme,
    set_window_title: bool,
    last_title: String,
    clock_area: Rect,
    notice: Option<String>,
}

impl<B: Backend> TerminalRenderer<B> {
    pub fn new(terminal: Terminal<B>, theme: Theme, set_window_title: bool) -> Self {
        Self {
            terminal,
            screen: Screen::Clock,
            theme,
            set_window_title,
            last_title: String::new(),
            clock_area: Rect::default(),
            notice: None,
        }
    }

    pub fn terminal_mut(&mut self) -> &mut Terminal<B> {
        &mut self.terminal
    }

    pub fn screen(&self) -> Screen {
        self.screen
    }

    pub fn set_screen(&mut self, screen: Screen) {
        self.screen = screen;
    }

    /// One-line message shown at the bottom of the stats screens.
    pub fn set_notice(&mut self, notice: Option<String>) {
        self.notice = notice;
    }

    /// Whether a terminal cell lies on the clock face drawn last frame.
    pub fn clock_contains(&self, column: u16, row: u16) -> bool {
        let a = self.clock_area;
        self.screen == Screen::Clock
            && column >= a.x
            && column < a.x + a.width
            && row >= a.y
            && row < a.y + a.height
    }
}

impl<B: Backend> RenderPort for TerminalRenderer<B> {
    fn render(&mut self, view: &ViewModel) {
        let screen = self.screen;
        let theme = self.theme;
        let notice = self.notice.clone();
        let mut clock_area = self.clock_area;

        let drawn = self.terminal.draw(|f| match screen {
            Screen::Clock => clock_area = render_clock(f, view, &theme),
            Screen::Stats => render_stats(f, view, &theme, notice.as_deref()),
            Screen::History => render_history(f, view, &theme, notice.as_deref()),
            Screen::Help => render_help(f, &theme),
        });
        if let Err(e) = drawn {
            tracing::warn!(error = %e, "terminal draw failed");
        }
        self.clock_area = clock_area;

        if self.set_window_title && view.title != self.last_title {
            if let Err(e) = execute!(io::stdout(), SetTitle(&view.title)) {
                tracing::debug!(error = %e, "could not set window title");
            }
            self.last_title = view.title.clone();
        }
    }
}

// ============================================================================
// Clock
// ============================================================================

/// Largest area inside `r` that looks square on a terminal (cells are about
/// twice as tall as they are wide).
fn square_area(r: Rect) -> Rect {
    let height = r.height.min(r.width / 2);
    let width = height * 2;
    Rect {
        x: r.x + (r.width - width) / 2,
        y: r.y + (r.height - height) / 2,
        width,
        height,
    }
}

fn draw_sweep(ctx: &mut Context, from: f64, to: f64, radius: f64, color: Color) {
    let mut angle = from;
    while angle < to {
        let (x2, y2) = hand_tip(angle, radius);
        ctx.draw(&CanvasLine { x1: 0.0, y1: 0.0, x2, y2, color });
        angle += SWEEP_STEP_DEG;
    }
}

fn draw_hand(ctx: &mut Context, angle: f64, length: f64, color: Color) {
    let (x2, y2) = hand_tip(angle, length);
    ctx.draw(&CanvasLine { x1: 0.0, y1: 0.0, x2, y2, color });
}

fn clock_face(view: &ViewModel, theme: &Theme) -> impl Widget {
    let radius = if view.pulse { FACE_RADIUS * PULSE_SCALE } else { FACE_RADIUS };
    let theme = *theme;
    let overlay: Option<Overlay> = view.overlay;
    let hands = view.hands;

    Canvas::default()
        .marker(Marker::Braille)
        .x_bounds([-1.2, 1.2])
        .y_bounds([-1.2, 1.2])
        .paint(move |ctx| {
            if let Some(o) = overlay {
                draw_sweep(ctx, o.start_angle + o.sweep_angle, o.start_angle + 360.0, radius, theme.base_color);
                ctx.layer();
                draw_sweep(ctx, o.start_angle, o.start_angle + o.sweep_angle, radius, theme.revealed_color);
                ctx.layer();
            }

            ctx.draw(&Circle { x: 0.0, y: 0.0, radius, color: theme.border_color });
            for hour in 0..12 {
                let angle = f64::from(hour) * 30.0;
                let (x1, y1) = hand_tip(angle, radius * 0.88);
                let (x2, y2) = hand_tip(angle, radius);
                ctx.draw(&CanvasLine { x1, y1, x2, y2, color: theme.border_color });
            }
            ctx.layer();

            draw_hand(ctx, hands.hour, radius * 0.5, theme.hand_color);
            draw_hand(ctx, hands.minute, radius * 0.75, theme.hand_color);
            draw_hand(ctx, hands.second, radius * 0.85, theme.second_hand_color);
        })
}

fn render_clock(f: &mut Frame, view: &ViewModel, theme: &Theme) -> Rect {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(8),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(2),
        ])
        .split(f.size());

    let header = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(theme.border_color))
        .title(Span::styled(
            format!(" 🕐 {} ", APP_TITLE),
            Style::default().fg(theme.accent_color).add_modifier(Modifier::BOLD),
        ));
    f.render_widget(header, chunks[0]);

    let face = square_area(chunks[1]);
    f.render_widget(clock_face(view, theme), face);

    let time_color = if view.running { theme.revealed_color } else { Color::Gray };
    f.render_widget(
        Paragraph::new(format_remaining(view.remaining_seconds))
            .style(Style::default().fg(time_color).add_modifier(Modifier::BOLD))
            .alignment(Alignment::Center),
        chunks[2],
    );

    f.render_widget(
        Paragraph::new(view.status.as_str())
            .style(Style::default().fg(if view.running { Color::Green } else { Color::Gray }))
            .alignment(Alignment::Center),
        chunks[3],
    );

    let controls = Line::from(vec![
        span_key("Click/Space", theme), Span::raw(" Start/Stop  •  "),
        span_key("S", theme), Span::raw(" Stats  •  "),
        span_key("?", theme), Span::raw(" Help  •  "),
        span_key("Q", theme), Span::raw(" Quit"),
    ]);
    f.render_widget(
        Paragraph::new(controls).alignment(Alignment::Center).style(Style::default().fg(Color::DarkGray)),
        chunks[4],
    );

    if let Some(input) = &view.goal_prompt {
        render_goal_prompt(f, input, theme);
    }

    face
}

fn render_goal_prompt(f: &mut Frame, input: &str, theme: &Theme) {
    let area = centered_rect(50, 40, f.size());
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled("🎯 TODAY'S GOAL", Style::default().fg(theme.accent_color).add_modifier(Modifier::BOLD))),
        Line::from(""),
        Line::from("How many focus sessions today? (1-12)"),
        Line::from(""),
        Line::from(vec![
            Span::styled(input, Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)),
            Span::styled("█", Style::default().fg(Color::Green)),
        ]),
        Line::from(""),
        Line::from(Span::styled(
            "↑↓ adjust  •  Enter confirm  •  Esc skip",
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )),
    ];

    f.render_widget(Clear, area);
    f.render_widget(
        Paragraph::new(lines).alignment(Alignment::Center).block(
            Block::default()
                .title(" Daily Goal ")
                .title_alignment(Alignment::Center)
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(Style::default().fg(theme.border_color)),
        ),
        area,
    );
}

fn span_key<'a>(text: &'a str, theme: &Theme) -> Span<'a> {
    Span::styled(text, Style::default().fg(theme.accent_color).add_modifier(Modifier::BOLD))
}

// ============================================================================
// Statistics
// ============================================================================

fn stat_line(label: &str, value: String) -> Line<'static> {
    Line::from(vec![
        Span::raw(format!("     {}: ", label)),
        Span::styled(value, Style::default().fg(Color::White).add_modifier(Modifier::BOLD)),
    ])
}

fn screen_block<'a>(title: &'a str, theme: &Theme) -> Block<'a> {
    Block::default()
        .title(title)
        .title_alignment(Alignment::Center)
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(theme.border_color))
}

fn notice_line(notice: Option<&str>) -> Line<'static> {
    match notice {
        Some(n) => Line::from(Span::styled(format!("  {n}"), Style::default().fg(Color::Green).add_modifier(Modifier::ITALIC))),
        None => Line::from(""),
    }
}

/// Draws a bordered screen whose last inner row is reserved for the notice,
/// so the body clips before the notice does.
fn render_screen(f: &mut Frame, area: Rect, title: &str, lines: Vec<Line>, notice: Option<&str>, theme: &Theme) {
    let block = screen_block(title, theme);
    let inner = block.inner(area);
    f.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(inner);
    f.render_widget(Paragraph::new(lines), chunks[0]);
    f.render_widget(Paragraph::new(notice_line(notice)), chunks[1]);
}

fn render_stats(f: &mut Frame, view: &ViewModel, theme: &Theme, notice: Option<&str>) {
    let area = centered_rect(70, 90, f.size());
    let goal = if view.today_goal > 0 { view.today_goal.to_string() } else { "not set".into() };

    let mut lines = vec![
        Line::from(""),
        Line::from(Span::styled("📊 STATISTICS", Style::default().fg(theme.accent_color).add_modifier(Modifier::BOLD))),
        Line::from(Span::styled("  Tab: history  •  E: export CSV  •  Esc: back", Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC))),
        Line::from(""),
        Line::from(Span::styled("  📅 Today:", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))),
        stat_line("Sessions completed", view.today_completed.to_string()),
        stat_line("Daily goal", goal),
        stat_line("Streak", format!("{} day(s)", view.streak)),
        Line::from(""),
        Line::from(Span::styled("  📈 All Time:", Style::default().fg(Color::Green).add_modifier(Modifier::BOLD))),
        stat_line("Total sessions", view.total_sessions.to_string()),
        stat_line("Focus time", format!("{} hours", view.total_sessions)),
        Line::from(""),
        Line::from(Span::styled(
            format!("  🗓  This week (from {}):", view.week.week_start.format("%b %d")),
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )),
    ];

    let max = view.week.days.iter().map(|(_, d)| d.sessions).max().unwrap_or(1).max(1);
    for (date, day) in &view.week.days {
        let width = (f64::from(day.sessions) / f64::from(max) * 30.0) as usize;
        lines.push(Line::from(vec![
            Span::styled(format!("     {} ", date.format("%a")), Style::default().fg(Color::Gray)),
            Span::styled("█".repeat(width), Style::default().fg(theme.revealed_color)),
            Span::raw(format!(" {}", day.sessions)),
        ]));
    }
    lines.push(stat_line("Week total", format!("{} sessions, {} min", view.week.totals.sessions, view.week.totals.total_minutes)));
    lines.push(Line::from(""));

    lines.push(Line::from(Span::styled("  ⏰ Best focus times:", Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD))));
    if view.best_focus_times.is_empty() {
        lines.push(Line::from(Span::styled("     No sessions yet!", Style::default().fg(Color::DarkGray))));
    }
    for slot in &view.best_focus_times {
        lines.push(stat_line(&slot.to_string(), format!("{} session(s)", slot.count)));
    }

    render_screen(f, area, " Statistics ", lines, notice, theme);
}

fn render_history(f: &mut Frame, view: &ViewModel, theme: &Theme, notice: Option<&str>) {
    let area = centered_rect(75, 85, f.size());

    let mut lines = vec![
        Line::from(""),
        Line::from(Span::styled("📜 RECENT SESSIONS", Style::default().fg(theme.accent_color).add_modifier(Modifier::BOLD))),
        Line::from(Span::styled("  Tab: statistics  •  E: export CSV  •  Esc: back", Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC))),
        Line::from(""),
    ];

    if view.recent_sessions.is_empty() {
        lines.push(Line::from(Span::styled("  No sessions yet!", Style::default().fg(Color::DarkGray))));
    }
    for s in &view.recent_sessions {
        let start = s.start_time.with_timezone(&chrono::Local);
        let end = s.end_time.with_timezone(&chrono::Local);
        let (status, color) = if s.completed { ("✓", Color::Green) } else { ("⏸", Color::Yellow) };
        lines.push(Line::from(vec![
            Span::raw("  🎯 "),
            Span::styled(local_date(s.end_time).format("%Y-%m-%d").to_string(), Style::default().fg(Color::Gray)),
            Span::raw(" • "),
            Span::styled(format!("{}–{}", start.format("%H:%M"), end.format("%H:%M")), Style::default().fg(Color::White)),
            Span::raw(" • "),
            Span::styled(format!("{}m", s.duration_minutes), Style::default().fg(Color::Cyan)),
            Span::raw(" "),
            Span::styled(status, Style::default().fg(color)),
        ]));
    }

    render_screen(f, area, " Session History ", lines, notice, theme);
}

fn render_help(f: &mut Frame, theme: &Theme) {
    let area = centered_rect(70, 80, f.size());

    let help_text = vec![
        Line::from(""),
        Line::from(Span::styled("⌨️  KEYBOARD SHORTCUTS", Style::default().fg(theme.accent_color).add_modifier(Modifier::BOLD))),
        Line::from(""),
        Line::from("  Clock:"),
        help_line("Click / Space", "Start or stop a one-hour focus session"),
        Line::from(""),
        Line::from("  Navigation:"),
        help_line("S", "Open statistics"),
        help_line("Tab", "Switch statistics / history"),
        help_line("E", "Export statistics to CSV"),
        help_line("?", "Toggle help"),
        Line::from(""),
        Line::from("  Daily goal prompt:"),
        help_line("↑↓ / digits", "Choose a goal (1-12)"),
        help_line("Enter", "Confirm"),
        help_line("Esc", "Skip for today"),
        Line::from(""),
        Line::from("  General:"),
        help_line("Q / Esc", "Exit / Go back"),
        help_line("Ctrl+C", "Force quit"),
        Line::from(""),
        Line::from(Span::styled(
            "💡 A running session survives quitting; it resumes on the next launch.",
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )),
    ];

    f.render_widget(Paragraph::new(help_text).block(screen_block(" Help ", theme)), area);
}

fn help_line<'a>(key: &'a str, desc: &'a str) -> Line<'a> {
    Line::from(vec![
        Span::raw("    "),
        Span::styled(key, Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
        Span::raw(format!("  {}", desc)),
    ])
}

fn centered_rect(w: u16, h: u16, r: Rect) -> Rect {
    let v = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - h) / 2),
            Constraint::Percentage(h),
            Constraint::Percentage((100 - h) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - w) / 2),
            Constraint::Percentage(w),
            Constraint::Percentage((100 - w) / 2),
        ])
        .split(v[1])[1]
}
