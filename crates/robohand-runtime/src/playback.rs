//! Timed replay of recorded command batches.

use std::fmt;
use std::time::Duration;

use tracing::{debug, info};

use crate::error::ControlError;
use crate::scheduler::{Clock, Timed};
use crate::signal::Signal;

/// Sequencer state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    /// Nothing loaded.
    Idle,
    /// Commands loaded, timer stopped.
    Armed,
    /// Timer active, cursor advancing.
    Running,
}

/// Replays batch texts one per interval through a caller-supplied apply
/// path.
///
/// The cursor only moves forward. Reaching the end stops the timer, emits
/// `finished` and clears the list. [`PlaybackSequencer::stop`] performs the
/// same cleanup but emits `cancelled` instead.
pub struct PlaybackSequencer<C: Clock> {
    clock: C,
    interval: Duration,
    commands: Vec<String>,
    cursor: usize,
    next_tick: Option<Duration>,
    apply: Box<dyn FnMut(&str)>,
    step: Signal<usize>,
    finished: Signal<()>,
    cancelled: Signal<()>,
}

impl<C: Clock> fmt::Debug for PlaybackSequencer<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlaybackSequencer")
            .field("interval", &self.interval)
            .field("commands", &self.commands)
            .field("cursor", &self.cursor)
            .field("next_tick", &self.next_tick)
            .finish_non_exhaustive()
    }
}

impl<C: Clock> PlaybackSequencer<C> {
    /// Sequencer ticking every `interval`, applying each batch with `apply`.
    pub fn new(clock: C, interval: Duration, apply: impl FnMut(&str) + 'static) -> Self {
        Self {
            clock,
            interval,
            commands: Vec::new(),
            cursor: 0,
            next_tick: None,
            apply: Box::new(apply),
            step: Signal::new(),
            finished: Signal::new(),
            cancelled: Signal::new(),
        }
    }

    /// Stop the timer, rewind and replace the list (empty clears it).
    pub fn reset(&mut self, commands: Vec<String>) {
        self.next_tick = None;
        self.cursor = 0;
        self.commands = commands;
    }

    /// Start ticking at the configured interval.
    ///
    /// Starting while already running keeps the current schedule.
    pub fn start(&mut self) -> Result<(), ControlError> {
        if self.commands.is_empty() {
            return Err(ControlError::EmptyPlayback);
        }
        if self.next_tick.is_none() {
            info!(
                commands = self.commands.len(),
                interval_ms = self.interval.as_millis() as u64,
                "playback started"
            );
            self.next_tick = Some(self.clock.now().saturating_add(self.interval));
        }
        Ok(())
    }

    /// Cancel a run. The list is cleared; `finished` is not emitted.
    pub fn stop(&mut self) {
        let was_running = self.next_tick.is_some();
        self.reset(Vec::new());
        if was_running {
            info!("playback cancelled");
            self.cancelled.emit(&());
        }
    }

    #[must_use]
    pub fn state(&self) -> PlaybackState {
        if self.next_tick.is_some() {
            PlaybackState::Running
        } else if self.commands.is_empty() {
            PlaybackState::Idle
        } else {
            PlaybackState::Armed
        }
    }

    /// Index of the next batch to apply.
    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    #[must_use]
    pub fn commands(&self) -> &[String] {
        &self.commands
    }

    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Register a handler receiving the index of each applied batch.
    pub fn on_step(&mut self, handler: impl FnMut(&usize) + 'static) {
        self.step.subscribe(handler);
    }

    /// Register a handler for natural completion.
    pub fn on_finished(&mut self, handler: impl FnMut(&()) + 'static) {
        self.finished.subscribe(handler);
    }

    /// Register a handler for external cancellation.
    pub fn on_cancelled(&mut self, handler: impl FnMut(&()) + 'static) {
        self.cancelled.subscribe(handler);
    }

    fn tick(&mut self, scheduled: Duration) {
        let index = self.cursor;
        let Some(text) = self.commands.get(index).cloned() else {
            self.reset(Vec::new());
            return;
        };
        debug!(index, raw = %text, "playback step");
        self.step.emit(&index);
        (self.apply)(&text);
        self.cursor += 1;

        if self.cursor >= self.commands.len() {
            self.reset(Vec::new());
            info!("playback finished");
            self.finished.emit(&());
        } else {
            self.next_tick = Some(scheduled.saturating_add(self.interval));
        }
    }
}

impl<C: Clock> Timed for PlaybackSequencer<C> {
    fn next_deadline(&self) -> Option<Duration> {
        self.next_tick
    }

    /// Applies at most one batch per call.
    fn poll(&mut self) {
        match self.next_tick {
            Some(scheduled) if scheduled <= self.clock.now() => self.tick(scheduled),
            _ => {}
        }
    }
}
