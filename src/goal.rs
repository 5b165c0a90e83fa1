//! The once-a-day "how many sessions today?" prompt.

use crate::stats::{MAX_DAILY_GOAL, MIN_DAILY_GOAL};

pub const DEFAULT_GOAL_INPUT: u32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoalAction {
    Confirm(u32),
    Skip,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoalPrompt {
    input: String,
}

impl Default for GoalPrompt {
    fn default() -> Self {
        Self {
            input: DEFAULT_GOAL_INPUT.to_string(),
        }
    }
}

impl GoalPrompt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    /// The value a confirm would store, clamped to the allowed range.
    pub fn value(&self) -> u32 {
        self.input
            .parse::<u32>()
            .unwrap_or(DEFAULT_GOAL_INPUT)
            .clamp(MIN_DAILY_GOAL, MAX_DAILY_GOAL)
    }

    pub fn push_digit(&mut self, c: char) {
        if !c.is_ascii_digit() || self.input.len() >= 2 {
            return;
        }
        self.input.push(c);
    }

    pub fn backspace(&mut self) {
        self.input.pop();
    }

    pub fn increment(&mut self) {
        self.input = (self.value() + 1).min(MAX_DAILY_GOAL).to_string();
    }

    pub fn decrement(&mut self) {
        self.input = self.value().saturating_sub(1).max(MIN_DAILY_GOAL).to_string();
    }

    pub fn confirm(&self) -> GoalAction {
        GoalAction::Confirm(self.value())
    }

    pub fn skip(&self) -> GoalAction {
        GoalAction::Skip
    }
}
