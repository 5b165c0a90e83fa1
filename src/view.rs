//! View-model handed to the render port each tick.

use chrono::{DateTime, Local, Utc};

use crate::clock::{HandAngles, hand_angles, minute_angle};
use crate::stats::{FocusSlot, SessionRecord, SessionStats, WeeklyStats};
use crate::timer::FocusTimer;

pub const APP_TITLE: &str = "Focus Clock";
const RECENT_SESSIONS: usize = 15;

/// Conic sweep over the clock face, in degrees clockwise from 12.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Overlay {
    pub start_angle: f64,
    pub sweep_angle: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewModel {
    pub hands: HandAngles,
    pub running: bool,
    pub remaining_seconds: u64,
    pub overlay: Option<Overlay>,
    pub status: String,
    pub title: String,
    pub today_completed: u32,
    pub today_goal: u32,
    pub streak: u32,
    pub pulse: bool,
    /// Current text of the goal prompt while it is open.
    pub goal_prompt: Option<String>,
    pub total_sessions: u32,
    pub week: WeeklyStats,
    pub best_focus_times: Vec<FocusSlot>,
    /// Newest first.
    pub recent_sessions: Vec<SessionRecord>,
}

pub trait RenderPort {
    fn render(&mut self, view: &ViewModel);
}

pub fn format_remaining(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

pub fn window_title(running: bool, remaining_seconds: u64) -> String {
    if running {
        format!("{} remaining · {}", format_remaining(remaining_seconds), APP_TITLE)
    } else {
        APP_TITLE.to_string()
    }
}

pub fn status_line(running: bool, completed: u32, goal: u32, streak: u32) -> String {
    let lead = if running { "Focusing" } else { "Click the clock to focus" };
    let today = if goal > 0 {
        format!("{completed}/{goal} today")
    } else {
        format!("{completed} today")
    };
    let days = if streak == 1 { "day" } else { "days" };
    format!("{lead}  •  {today}  •  🔥 {streak} {days}")
}

impl ViewModel {
    pub fn build(
        timer: &FocusTimer,
        stats: &SessionStats,
        now: DateTime<Utc>,
        pulse: bool,
        goal_prompt: Option<String>,
    ) -> Self {
        let local = now.with_timezone(&Local);
        let today = local.date_naive();
        let state = timer.state();

        let overlay = state.start_time.filter(|_| state.active).map(|start| Overlay {
            start_angle: minute_angle(&start.with_timezone(&Local)),
            sweep_angle: 360.0 * timer.progress(now),
        });

        let today_completed = stats.day(today).completed_sessions;
        let today_goal = stats.daily_goal(today);
        let streak = stats.streak_as_of(today);

        Self {
            hands: hand_angles(&local),
            running: state.active,
            remaining_seconds: state.remaining_seconds,
            overlay,
            status: status_line(state.active, today_completed, today_goal, streak),
            title: window_title(state.active, state.remaining_seconds),
            today_completed,
            today_goal,
            streak,
            pulse,
            goal_prompt,
            total_sessions: stats.total_sessions,
            week: stats.weekly_stats(today),
            best_focus_times: stats.best_focus_times(),
            recent_sessions: stats.session_history.iter().rev().take(RECENT_SESSIONS).cloned().collect(),
        }
    }
}
