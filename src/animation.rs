//! Animation Scheduler - bounded auto-iteration on a fixed cadence
//!
//! Cooperative, not threaded: the host calls [`Scheduler::poll`] from its
//! frame or timer callback. At most one step is pending at a time, and
//! [`Scheduler::stop`] drops it synchronously.

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use crate::lsystem::System;

/// Cadence and budget of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnimationSettings {
    /// Delay before each step, in milliseconds
    pub delay_ms: u64,
    /// Steps per run, counted from the iteration the run started at
    pub max_steps: u32,
}

impl Default for AnimationSettings {
    fn default() -> Self {
        Self {
            delay_ms: 500,
            max_steps: 5,
        }
    }
}

impl AnimationSettings {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

/// Why a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// `max_steps` steps were taken
    BudgetExhausted,
    /// The sentence outgrew the animation ceiling
    TooLong,
    /// The manual-iteration guard refused the step
    Refused,
    /// Toggled off
    Cancelled,
}

/// Result of one poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// No run is active
    Idle,
    /// A step is armed but not due yet
    Waiting,
    /// One generate() happened; the next one is armed
    Stepped,
    /// The run ended during this poll
    Finished(StopReason),
}

/// The active run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimationRun {
    pub start_iteration: u32,
    /// Deadline of the pending step
    pub due: Instant,
}

/// Single-flight auto-iteration loop
#[derive(Debug, Default)]
pub struct Scheduler {
    run: Option<AnimationRun>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.run.is_some()
    }

    pub fn run(&self) -> Option<&AnimationRun> {
        self.run.as_ref()
    }

    /// Start a run from the current iteration, or stop the active one.
    ///
    /// Returns `Some(reason)` when the toggle (or an immediate abort check)
    /// left the scheduler inactive.
    pub fn toggle(
        &mut self,
        system: &System,
        settings: &AnimationSettings,
        animation_ceiling: usize,
        now: Instant,
    ) -> Option<StopReason> {
        if self.is_active() {
            self.stop();
            return Some(StopReason::Cancelled);
        }
        let run = AnimationRun {
            start_iteration: system.iteration(),
            due: now + settings.delay(),
        };
        tracing::info!(start_iteration = run.start_iteration, max_steps = settings.max_steps, "Animation started");
        self.run = Some(run);
        self.check_abort(system, settings, animation_ceiling)
    }

    /// Cancel the pending step. No step fires after this returns.
    pub fn stop(&mut self) {
        if let Some(run) = self.run.take() {
            tracing::debug!(start_iteration = run.start_iteration, "Animation stopped");
        }
    }

    /// Fire the pending step if it is due.
    ///
    /// The step is a guarded generate() against `manual_ceiling`; abort
    /// conditions are re-checked before arming the next step.
    pub fn poll(
        &mut self,
        system: &mut System,
        settings: &AnimationSettings,
        manual_ceiling: usize,
        animation_ceiling: usize,
        now: Instant,
    ) -> Tick {
        let Some(run) = self.run.as_mut() else {
            return Tick::Idle;
        };
        if now < run.due {
            return Tick::Waiting;
        }

        if system.try_generate(manual_ceiling).is_err() {
            self.stop();
            return Tick::Finished(StopReason::Refused);
        }
        run.due = now + settings.delay();

        match self.check_abort(system, settings, animation_ceiling) {
            Some(reason) => Tick::Finished(reason),
            None => Tick::Stepped,
        }
    }

    /// Time until the pending step, for hosts that sleep between polls
    pub fn time_until_due(&self, now: Instant) -> Option<Duration> {
        self.run.map(|run| run.due.saturating_duration_since(now))
    }

    fn check_abort(
        &mut self,
        system: &System,
        settings: &AnimationSettings,
        animation_ceiling: usize,
    ) -> Option<StopReason> {
        let run = self.run?;
        let reason = if system.iteration().saturating_sub(run.start_iteration) >= settings.max_steps {
            StopReason::BudgetExhausted
        } else if system.sentence_len() > animation_ceiling {
            StopReason::TooLong
        } else {
            return None;
        };
        tracing::info!(?reason, iteration = system.iteration(), "Animation finished");
        self.stop();
        Some(reason)
    }
}
