//! Operator session: the control panel plus playback on one clock.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use robohand_runtime::scheduler::earliest;
use robohand_runtime::{
    Clock, ControlPanel, PlaybackSequencer, PlaybackState, RobohandConfig, SharedDriver, Timed,
};

use crate::style;

/// Playback applies each batch to the panel, so replayed state takes the
/// same debounced path as operator input.
pub struct Session<C: Clock> {
    pub panel: Rc<RefCell<ControlPanel<C>>>,
    pub playback: PlaybackSequencer<C>,
}

impl<C: Clock + Clone + 'static> Session<C> {
    pub fn new(clock: C, driver: SharedDriver, config: &RobohandConfig) -> Self {
        let panel = Rc::new(RefCell::new(ControlPanel::new(
            clock.clone(),
            driver,
            config.console.panel_settings(),
        )));
        let target = Rc::clone(&panel);
        let mut playback =
            PlaybackSequencer::new(clock, config.console.playback_interval, move |text: &str| {
                target.borrow_mut().apply_commands(text);
            });
        playback.on_finished(|_| println!("{}", style::success("playback finished")));
        playback.on_cancelled(|_| println!("{}", style::warning("playback cancelled")));
        Self { panel, playback }
    }

    /// Load `commands` and start replaying them.
    pub fn play(&mut self, commands: Vec<String>) -> anyhow::Result<()> {
        let count = commands.len();
        self.playback.reset(commands);
        self.playback.start()?;
        println!(
            "{}",
            style::accent(format!(
                "playing {} batch(es) every {} ms",
                count,
                self.playback.interval().as_millis()
            ))
        );
        Ok(())
    }

    /// No playback running and no debounced value pending.
    pub fn is_settled(&self) -> bool {
        self.playback.state() != PlaybackState::Running
            && self.panel.borrow().next_deadline().is_none()
    }
}

impl<C: Clock> Timed for Session<C> {
    fn next_deadline(&self) -> Option<Duration> {
        earliest(
            self.playback.next_deadline(),
            self.panel.borrow().next_deadline(),
        )
    }

    fn poll(&mut self) {
        self.playback.poll();
        self.panel.borrow_mut().poll();
    }
}
