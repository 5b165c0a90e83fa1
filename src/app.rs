//! The application context: one instance per run, driven by the tick loop.

use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};

use crate::error::Result;
use crate::goal::{GoalAction, GoalPrompt};
use crate::notify::Notifier;
use crate::persistence::Persistence;
use crate::stats::{SessionStats, date_key, local_date};
use crate::storage::KeyValueStore;
use crate::timer::{FocusTimer, Restored, TickOutcome};
use crate::view::{RenderPort, ViewModel};

/// Clock ticks the completion pulse stays visible for.
const PULSE_TICKS: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickOutcome {
    /// The day's goal prompt opened instead.
    GoalPrompted,
    Started,
    Stopped,
}

pub struct App<S: KeyValueStore, N: Notifier> {
    timer: FocusTimer,
    stats: SessionStats,
    persistence: Persistence<S>,
    notifier: N,
    goal_prompt: Option<GoalPrompt>,
    goal_prompt_date: Option<String>,
    pulse_ticks: u8,
    today: NaiveDate,
}

impl<S: KeyValueStore, N: Notifier> App<S, N> {
    /// Restore everything from storage and reconcile the countdown with `now`.
    pub fn load(persistence: Persistence<S>, notifier: N, finalize_expired: bool, now: DateTime<Utc>) -> Self {
        let today = local_date(now);
        let mut stats = persistence.load_stats();
        stats.roll_over(today);
        let goal_prompt_date = persistence.goal_prompt_date();

        let (timer, restored) = FocusTimer::restore(persistence.load_timer(), now);
        let mut app = Self {
            timer,
            stats,
            persistence,
            notifier,
            goal_prompt: None,
            goal_prompt_date,
            pulse_ticks: 0,
            today,
        };

        match restored {
            Restored::Idle => {}
            Restored::Resumed { remaining_seconds } => {
                tracing::info!(remaining_seconds, "resuming focus session");
            }
            Restored::Expired(countdown) => {
                if finalize_expired {
                    tracing::info!(end = %countdown.end, "recording session that finished while closed");
                    app.stats.record_completed_session(countdown.start, countdown.end);
                    app.stats.roll_over(today);
                    app.persist_stats();
                } else {
                    tracing::info!(end = %countdown.end, "focus session expired while closed, not recorded");
                }
                app.persist_timer(now);
            }
        }
        app
    }

    pub fn timer(&self) -> &FocusTimer {
        &self.timer
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn persistence(&self) -> &Persistence<S> {
        &self.persistence
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    pub fn is_running(&self) -> bool {
        self.timer.is_running()
    }

    pub fn goal_prompt(&self) -> Option<&GoalPrompt> {
        self.goal_prompt.as_ref()
    }

    pub fn goal_prompt_mut(&mut self) -> Option<&mut GoalPrompt> {
        self.goal_prompt.as_mut()
    }

    fn goal_handled_today(&self) -> bool {
        self.goal_prompt_date.as_deref() == Some(date_key(self.today).as_str())
    }

    /// The clock was clicked (or Space pressed).
    pub fn click(&mut self, now: DateTime<Utc>) -> ClickOutcome {
        self.today = local_date(now);
        if self.goal_prompt.is_some() {
            return ClickOutcome::GoalPrompted;
        }
        if !self.goal_handled_today() {
            tracing::debug!("first interaction today, asking for a goal");
            self.goal_prompt = Some(GoalPrompt::new());
            return ClickOutcome::GoalPrompted;
        }

        let running = self.timer.toggle(now);
        self.persist_timer(now);
        if running { ClickOutcome::Started } else { ClickOutcome::Stopped }
    }

    /// Confirm or skip the open goal prompt. Both mark today as handled.
    pub fn resolve_goal(&mut self, action: GoalAction, now: DateTime<Utc>) {
        if self.goal_prompt.take().is_none() {
            return;
        }
        self.today = local_date(now);
        let today_key = date_key(self.today);

        if let GoalAction::Confirm(goal) = action {
            let stored = self.stats.set_daily_goal(self.today, goal);
            tracing::info!(goal = stored, date = %today_key, "daily goal set");
            self.persist_stats();
        }

        if let Err(e) = self.persistence.set_goal_prompt_date(&today_key) {
            tracing::warn!(error = %e, "could not persist goal prompt date");
        }
        self.goal_prompt_date = Some(today_key);
    }

    /// The always-on 1 Hz clock tick.
    pub fn on_clock_tick<R: RenderPort>(&mut self, now: DateTime<Utc>, port: &mut R) {
        let today = local_date(now);
        if today != self.today {
            tracing::debug!(date = %date_key(today), "day changed");
            self.today = today;
            self.stats.roll_over(today);
        }
        self.pulse_ticks = self.pulse_ticks.saturating_sub(1);
        self.render(now, port);
    }

    /// The 1 Hz countdown tick, armed only while running. Recompute, redraw,
    /// then run completion side effects.
    pub fn on_timer_tick<R: RenderPort>(&mut self, now: DateTime<Utc>, port: &mut R) -> TickOutcome {
        let outcome = self.timer.tick(now);
        if outcome == TickOutcome::Idle {
            return outcome;
        }
        self.render(now, port);
        self.persist_timer(now);

        if let TickOutcome::Completed(countdown) = outcome {
            self.stats.record_completed_session(countdown.start, countdown.end);
            self.persist_stats();
            let streak = self.stats.streak_as_of(local_date(now));
            self.notifier.session_complete(self.stats.total_sessions, streak);
            self.pulse_ticks = PULSE_TICKS;
            self.render(now, port);
        }
        outcome
    }

    pub fn view(&self, now: DateTime<Utc>) -> ViewModel {
        ViewModel::build(
            &self.timer,
            &self.stats,
            now,
            self.pulse_ticks > 0,
            self.goal_prompt.as_ref().map(|p| p.input().to_string()),
        )
    }

    pub fn render<R: RenderPort>(&self, now: DateTime<Utc>, port: &mut R) {
        port.render(&self.view(now));
    }

    pub fn export_csv(&self, path: &Path) -> Result<()> {
        self.stats.export_csv(path, self.today)
    }

    /// Flush everything; called on quit.
    pub fn save_all(&mut self, now: DateTime<Utc>) {
        self.persist_timer(now);
        self.persist_stats();
    }

    fn persist_timer(&mut self, now: DateTime<Utc>) {
        if let Err(e) = self.persistence.save_timer(self.timer.state(), now) {
            tracing::warn!(error = %e, "could not persist timer state");
        }
    }

    fn persist_stats(&mut self) {
        if let Err(e) = self.persistence.save_stats(&self.stats) {
            tracing::warn!(error = %e, "could not persist session stats");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use crate::timer::TimerState;
    use chrono::{Duration, Local, TimeZone};

    #[derive(Default)]
    struct CountingNotifier {
        calls: Vec<(u32, u32)>,
    }

    impl Notifier for CountingNotifier {
        fn session_complete(&mut self, total_sessions: u32, streak: u32) {
            self.calls.push((total_sessions, streak));
        }
    }

    #[derive(Default)]
    struct Frames(Vec<ViewModel>);

    impl RenderPort for Frames {
        fn render(&mut self, view: &ViewModel) {
            self.0.push(view.clone());
        }
    }

    fn noon() -> DateTime<Utc> {
        Local.with_ymd_and_hms(2024, 3, 12, 12, 0, 0).single().unwrap().with_timezone(&Utc)
    }

    fn fresh_app(now: DateTime<Utc>) -> App<MemoryStore, CountingNotifier> {
        let mut store = MemoryStore::new();
        store
            .set("goal_prompt_date", &format!("\"{}\"", date_key(local_date(now))))
            .unwrap();
        App::load(Persistence::new(store), CountingNotifier::default(), false, now)
    }

    #[test]
    fn first_click_of_the_day_prompts_for_goal() {
        let mut app = App::load(Persistence::new(MemoryStore::new()), CountingNotifier::default(), false, noon());
        assert_eq!(app.click(noon()), ClickOutcome::GoalPrompted);
        assert!(!app.is_running());
        assert_eq!(app.click(noon()), ClickOutcome::GoalPrompted);

        app.resolve_goal(GoalAction::Confirm(6), noon());
        assert_eq!(app.stats().daily_goal(local_date(noon())), 6);
        assert_eq!(app.click(noon()), ClickOutcome::Started);
        assert!(app.is_running());
    }

    #[test]
    fn skipping_the_goal_marks_the_day_handled() {
        let mut app = App::load(Persistence::new(MemoryStore::new()), CountingNotifier::default(), false, noon());
        app.click(noon());
        app.resolve_goal(GoalAction::Skip, noon());

        assert_eq!(app.stats().daily_goal(local_date(noon())), 0);
        assert_eq!(
            app.persistence().goal_prompt_date(),
            Some(date_key(local_date(noon())))
        );
        assert_eq!(app.click(noon()), ClickOutcome::Started);
    }

    #[test]
    fn prompt_returns_the_next_day() {
        let mut app = fresh_app(noon());
        assert_eq!(app.click(noon()), ClickOutcome::Started);
        assert_eq!(app.click(noon()), ClickOutcome::Stopped);
        assert_eq!(app.click(noon() + Duration::days(1)), ClickOutcome::GoalPrompted);
    }

    #[test]
    fn click_persists_the_running_state() {
        let mut app = fresh_app(noon());
        app.click(noon());
        let saved = app.persistence().load_timer();
        assert!(saved.active);
        assert_eq!(saved.end_time, Some(noon() + Duration::hours(1)));

        app.click(noon() + Duration::seconds(5));
        assert_eq!(app.persistence().load_timer(), TimerState::default());
    }

    #[test]
    fn completion_records_once_and_notifies() {
        let mut app = fresh_app(noon());
        let mut frames = Frames::default();
        app.click(noon());

        let outcome = app.on_timer_tick(noon() + Duration::seconds(1800), &mut frames);
        assert_eq!(outcome, TickOutcome::Running { remaining_seconds: 1800 });

        let outcome = app.on_timer_tick(noon() + Duration::seconds(3600), &mut frames);
        assert!(matches!(outcome, TickOutcome::Completed(_)));
        assert_eq!(
            app.on_timer_tick(noon() + Duration::seconds(3601), &mut frames),
            TickOutcome::Idle
        );

        assert_eq!(app.stats().total_sessions, 1);
        assert_eq!(app.stats().day(local_date(noon())).sessions, 1);
        assert_eq!(app.notifier().calls, vec![(1, 1)]);
        assert_eq!(app.persistence().load_stats().total_sessions, 1);
        assert!(!app.is_running());
    }

    #[test]
    fn completion_redraw_happens_before_and_after_side_effects() {
        let mut app = fresh_app(noon());
        let mut frames = Frames::default();
        app.click(noon());
        app.on_timer_tick(noon() + Duration::seconds(3600), &mut frames);

        assert_eq!(frames.0.len(), 2);
        assert_eq!(frames.0[0].today_completed, 0);
        assert!(!frames.0[0].pulse);
        assert_eq!(frames.0[1].today_completed, 1);
        assert!(frames.0[1].pulse);
    }

    #[test]
    fn pulse_fades_on_clock_ticks() {
        let mut app = fresh_app(noon());
        let mut frames = Frames::default();
        app.click(noon());
        let end = noon() + Duration::seconds(3600);
        app.on_timer_tick(end, &mut frames);

        app.on_clock_tick(end + Duration::seconds(1), &mut frames);
        assert!(frames.0.last().unwrap().pulse);
        app.on_clock_tick(end + Duration::seconds(2), &mut frames);
        assert!(!frames.0.last().unwrap().pulse);
    }

    #[test]
    fn idle_timer_tick_draws_nothing() {
        let mut app = fresh_app(noon());
        let mut frames = Frames::default();
        assert_eq!(app.on_timer_tick(noon(), &mut frames), TickOutcome::Idle);
        assert!(frames.0.is_empty());
    }
}
