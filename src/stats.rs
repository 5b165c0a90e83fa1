//! Session history, daily aggregates, streaks and goals.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

use chrono::{DateTime, Datelike, Duration, Local, NaiveDate, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::timer::FOCUS_DURATION_MINUTES;

pub const DAILY_FMT: &str = "%Y-%m-%d";
pub const MIN_DAILY_GOAL: u32 = 1;
pub const MAX_DAILY_GOAL: u32 = 12;
const TOP_FOCUS_SLOTS: usize = 3;

pub fn date_key(date: NaiveDate) -> String {
    date.format(DAILY_FMT).to_string()
}

pub fn local_date(at: DateTime<Utc>) -> NaiveDate {
    at.with_timezone(&Local).date_naive()
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SessionRecord {
    /// Creation time in epoch milliseconds.
    pub id: i64,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub start_time: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub end_time: DateTime<Utc>,
    pub duration_minutes: u32,
    pub completed: bool,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DailyStats {
    pub sessions: u32,
    pub total_minutes: u32,
    pub completed_sessions: u32,
}

impl DailyStats {
    fn add(&mut self, other: &DailyStats) {
        self.sessions += other.sessions;
        self.total_minutes += other.total_minutes;
        self.completed_sessions += other.completed_sessions;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeeklyStats {
    /// The Sunday the week starts on.
    pub week_start: NaiveDate,
    /// Sunday through Saturday.
    pub days: Vec<(NaiveDate, DailyStats)>,
    pub totals: DailyStats,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FocusSlot {
    pub hour: u32,
    pub count: u32,
}

impl fmt::Display for FocusSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:00-{}:00", self.hour, self.hour + 1)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct SessionStats {
    pub total_sessions: u32,
    pub current_streak: u32,
    pub today_sessions: u32,
    pub last_session_date: Option<String>,
    pub session_history: Vec<SessionRecord>,
    pub daily_stats: BTreeMap<String, DailyStats>,
    pub daily_goals: BTreeMap<String, u32>,
}

impl SessionStats {
    pub fn record_completed_session(&mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> &SessionRecord {
        let today = local_date(end);
        let today_key = date_key(today);
        let yesterday_key = date_key(today - Duration::days(1));

        self.session_history.push(SessionRecord {
            id: end.timestamp_millis(),
            start_time: start,
            end_time: end,
            duration_minutes: FOCUS_DURATION_MINUTES,
            completed: true,
        });
        self.total_sessions += 1;

        let day = self.daily_stats.entry(today_key.clone()).or_default();
        day.sessions += 1;
        day.total_minutes += FOCUS_DURATION_MINUTES;
        day.completed_sessions += 1;

        match self.last_session_date.as_deref() {
            Some(last) if last == yesterday_key => self.current_streak += 1,
            Some(last) if last == today_key => {}
            _ => self.current_streak = 1,
        }

        if self.last_session_date.as_deref() != Some(today_key.as_str()) {
            self.today_sessions = 0;
        }
        self.today_sessions += 1;
        self.last_session_date = Some(today_key);

        tracing::debug!(
            total = self.total_sessions,
            streak = self.current_streak,
            today = self.today_sessions,
            "session recorded"
        );

        // just pushed
        &self.session_history[self.session_history.len() - 1]
    }

    /// Reset the per-day counter when the last session was not today.
    pub fn roll_over(&mut self, today: NaiveDate) {
        if self.last_session_date.as_deref() != Some(date_key(today).as_str()) {
            self.today_sessions = 0;
        }
    }

    /// The streak as it should be shown on `today`: a streak whose last
    /// session is older than yesterday has lapsed.
    pub fn streak_as_of(&self, today: NaiveDate) -> u32 {
        let still_alive = [today, today - Duration::days(1)]
            .iter()
            .any(|d| self.last_session_date.as_deref() == Some(date_key(*d).as_str()));
        if still_alive { self.current_streak } else { 0 }
    }

    pub fn day(&self, date: NaiveDate) -> DailyStats {
        self.daily_stats.get(&date_key(date)).copied().unwrap_or_default()
    }

    pub fn weekly_stats(&self, reference: NaiveDate) -> WeeklyStats {
        let week_start = reference - Duration::days(i64::from(reference.weekday().num_days_from_sunday()));
        let mut totals = DailyStats::default();
        let days = (0..7)
            .map(|offset| {
                let date = week_start + Duration::days(offset);
                let day = self.day(date);
                totals.add(&day);
                (date, day)
            })
            .collect();

        WeeklyStats { week_start, days, totals }
    }

    /// Top start hours by number of sessions, earliest hour first on ties.
    pub fn best_focus_times(&self) -> Vec<FocusSlot> {
        let mut counts = [0u32; 24];
        for record in &self.session_history {
            let hour = record.start_time.with_timezone(&Local).hour() as usize;
            counts[hour] += 1;
        }

        let mut slots: Vec<FocusSlot> = counts
            .iter()
            .enumerate()
            .filter(|(_, count)| **count > 0)
            .map(|(hour, count)| FocusSlot { hour: hour as u32, count: *count })
            .collect();
        slots.sort_by(|a, b| b.count.cmp(&a.count).then(a.hour.cmp(&b.hour)));
        slots.truncate(TOP_FOCUS_SLOTS);
        slots
    }

    /// Returns the goal actually stored after clamping to 1..=12.
    pub fn set_daily_goal(&mut self, date: NaiveDate, goal: u32) -> u32 {
        let goal = goal.clamp(MIN_DAILY_GOAL, MAX_DAILY_GOAL);
        self.daily_goals.insert(date_key(date), goal);
        goal
    }

    /// 0 means no goal was set.
    pub fn daily_goal(&self, date: NaiveDate) -> u32 {
        self.daily_goals.get(&date_key(date)).copied().unwrap_or(0)
    }

    pub fn export_csv(&self, path: &Path, today: NaiveDate) -> Result<()> {
        let mut csv = format!(
            "Date,Total Sessions,Sessions Today,Current Streak,Daily Goal\n{},{},{},{},{}\n\n",
            date_key(today),
            self.total_sessions,
            self.day(today).sessions,
            self.streak_as_of(today),
            self.daily_goal(today)
        );

        csv.push_str("Daily Stats\nDate,Sessions,Minutes,Completed,Goal\n");
        for (date, day) in &self.daily_stats {
            let goal = self.daily_goals.get(date).copied().unwrap_or(0);
            csv.push_str(&format!(
                "{},{},{},{},{}\n",
                date, day.sessions, day.total_minutes, day.completed_sessions, goal
            ));
        }

        csv.push_str("\nSession History\nStart,End,Duration (min),Completed\n");
        for s in self.session_history.iter().rev() {
            csv.push_str(&format!(
                "{},{},{},{}\n",
                s.start_time.with_timezone(&Local).to_rfc3339(),
                s.end_time.with_timezone(&Local).to_rfc3339(),
                s.duration_minutes,
                if s.completed { "Yes" } else { "No" }
            ));
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, csv)?;
        Ok(())
    }
}
