//! Operator control panel: debounced drive controls, indicators and the
//! LED, wired to one actuator driver.

#![allow(missing_docs)]

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use indexmap::IndexMap;
use robohand_protocol::{decode, CommandBatch, Parameter, ParameterId};
use tracing::{info, warn};

use crate::debounce::Debouncer;
use crate::driver::{ActuatorDriver, SharedDriver};
use crate::error::ControlError;
use crate::mirror::{MirroredPair, Side};
use crate::scheduler::{earliest, Clock, Timed};
use crate::signal::Signal;

/// Operator-facing drive names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DriveName {
    /// Base rotation dial.
    Rotate,
    /// Vertical raise slider.
    Raise,
    /// Horizontal extend slider.
    Extend,
    /// Mirrored claw pair.
    Claw,
}

impl DriveName {
    /// Every drive, in panel order.
    pub const ALL: [DriveName; 4] = [Self::Rotate, Self::Raise, Self::Extend, Self::Claw];

    /// Wire parameter driven by this control.
    #[must_use]
    pub const fn parameter(self) -> ParameterId {
        match self {
            Self::Rotate => ParameterId::Rotation,
            Self::Raise => ParameterId::RaiseArrow,
            Self::Extend => ParameterId::ExtendArrow,
            Self::Claw => ParameterId::Claw,
        }
    }

    /// Control for a wire parameter; the LED has none.
    #[must_use]
    pub fn from_parameter(parameter: ParameterId) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|drive| drive.parameter() == parameter)
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Rotate => "Rotate",
            Self::Raise => "Raise",
            Self::Extend => "Extend",
            Self::Claw => "Claw",
        }
    }
}

impl fmt::Display for DriveName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for DriveName {
    type Err = ControlError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let wanted = text.trim();
        Self::ALL
            .into_iter()
            .find(|drive| drive.label().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ControlError::UnknownParameter(wanted.into()))
    }
}

/// Timing and range settings for a panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanelSettings {
    pub debounce: Duration,
    pub claw_debounce: Duration,
    pub servo_min: i32,
    pub servo_max: i32,
}

impl Default for PanelSettings {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(100),
            claw_debounce: Duration::from_millis(1500),
            servo_min: -90,
            servo_max: 90,
        }
    }
}

/// All drive controls of the console.
///
/// Raw moves update the indicators and the `display` signal at once; the
/// driver only sees debounced values.
pub struct ControlPanel<C: Clock> {
    settings: PanelSettings,
    driver: SharedDriver,
    rotation: Debouncer<C>,
    raise: Debouncer<C>,
    extend: Debouncer<C>,
    claw: MirroredPair<C>,
    led: [i32; 3],
    indicators: IndexMap<DriveName, i32>,
    display: Signal<(DriveName, i32)>,
}

impl<C: Clock> fmt::Debug for ControlPanel<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControlPanel")
            .field("settings", &self.settings)
            .field("led", &self.led)
            .field("indicators", &self.indicators)
            .finish_non_exhaustive()
    }
}

impl<C: Clock + Clone> ControlPanel<C> {
    pub fn new(clock: C, driver: SharedDriver, settings: PanelSettings) -> Self {
        let mut rotation = Debouncer::new(clock.clone(), settings.debounce);
        let mut raise = Debouncer::new(clock.clone(), settings.debounce);
        let mut extend = Debouncer::new(clock.clone(), settings.debounce);
        let mut claw = MirroredPair::new(
            clock,
            settings.servo_min,
            settings.servo_max,
            settings.claw_debounce,
        );
        connect(&driver, DriveName::Rotate, |h| rotation.add_debounced_handler(h));
        connect(&driver, DriveName::Raise, |h| raise.add_debounced_handler(h));
        connect(&driver, DriveName::Extend, |h| extend.add_debounced_handler(h));
        connect(&driver, DriveName::Claw, |h| claw.add_debounced_handler(h));

        let claw_start = claw.authoritative();
        let indicators = DriveName::ALL
            .into_iter()
            .map(|drive| (drive, if drive == DriveName::Claw { claw_start } else { 0 }))
            .collect();
        Self {
            settings,
            driver,
            rotation,
            raise,
            extend,
            claw,
            led: [0; 3],
            indicators,
            display: Signal::new(),
        }
    }
}

impl<C: Clock> ControlPanel<C> {
    /// Operator moved a control. Claw moves act on the primary side of the
    /// mirrored pair.
    pub fn set_drive(&mut self, drive: DriveName, value: i32) {
        let shown = match drive {
            DriveName::Rotate => {
                self.rotation.handle(value);
                value
            }
            DriveName::Raise => {
                self.raise.handle(value);
                value
            }
            DriveName::Extend => {
                self.extend.handle(value);
                value
            }
            DriveName::Claw => {
                self.claw.set_value(value);
                self.claw.authoritative()
            }
        };
        self.show(drive, shown);
    }

    /// Operator moved one side of the claw pair.
    pub fn move_claw(&mut self, side: Side, value: i32) {
        self.claw.handle_change(side, value);
        self.show(DriveName::Claw, self.claw.authoritative());
    }

    /// Set the LED colour immediately.
    pub fn set_led(&mut self, red: i32, green: i32, blue: i32) {
        self.led = [red, green, blue];
        if let Err(err) = self.driver.borrow_mut().set_led_rgb(red, green, blue) {
            warn!(error = %err, "led update failed");
        }
    }

    /// Set every control named in `text` as if the operator moved it.
    /// Returns how many commands were applied.
    pub fn apply_commands(&mut self, text: &str) -> usize {
        info!(raw = %text, "set state from commands");
        let mut applied = 0;
        for decoded in decode(text) {
            let command = match decoded {
                Ok(command) => command,
                Err(err) => {
                    warn!(error = %err, raw = %text, "command skipped");
                    continue;
                }
            };
            let id = match &command.parameter {
                Parameter::Known(id) => *id,
                Parameter::Unknown(token) => {
                    warn!(parameter = %token, "no control component, skipped");
                    continue;
                }
            };
            if !command.has_valid_arity() {
                warn!(parameter = %id, args = ?command.args, "wrong argument count, skipped");
                continue;
            }
            match DriveName::from_parameter(id) {
                Some(drive) => self.set_drive(drive, command.args[0]),
                None => self.set_led(command.args[0], command.args[1], command.args[2]),
            }
            applied += 1;
        }
        applied
    }

    /// Current indicator values as a batch, in panel order.
    #[must_use]
    pub fn state_as_commands(&self) -> CommandBatch {
        let mut batch = CommandBatch::new();
        for (drive, value) in &self.indicators {
            batch.push(drive.parameter(), [*value]);
        }
        batch
    }

    /// Immediate (non-debounced) value of a control.
    #[must_use]
    pub fn indicator(&self, drive: DriveName) -> i32 {
        self.indicators.get(&drive).copied().unwrap_or_default()
    }

    #[must_use]
    pub fn indicators(&self) -> &IndexMap<DriveName, i32> {
        &self.indicators
    }

    #[must_use]
    pub fn led(&self) -> [i32; 3] {
        self.led
    }

    #[must_use]
    pub fn claw(&self) -> &MirroredPair<C> {
        &self.claw
    }

    #[must_use]
    pub fn settings(&self) -> &PanelSettings {
        &self.settings
    }

    /// Register a handler for immediate indicator updates.
    pub fn on_display(&mut self, handler: impl FnMut(&(DriveName, i32)) + 'static) {
        self.display.subscribe(handler);
    }

    fn show(&mut self, drive: DriveName, value: i32) {
        self.indicators.insert(drive, value);
        self.display.emit(&(drive, value));
    }
}

impl<C: Clock> Timed for ControlPanel<C> {
    fn next_deadline(&self) -> Option<Duration> {
        [
            self.rotation.next_deadline(),
            self.raise.next_deadline(),
            self.extend.next_deadline(),
            self.claw.next_deadline(),
        ]
        .into_iter()
        .fold(None, earliest)
    }

    fn poll(&mut self) {
        self.rotation.poll();
        self.raise.poll();
        self.extend.poll();
        self.claw.poll();
    }
}

type SettledHandler = Box<dyn FnMut(&i32)>;

fn connect(driver: &SharedDriver, drive: DriveName, register: impl FnOnce(SettledHandler)) {
    let driver = driver.clone();
    let parameter = drive.parameter();
    register(Box::new(move |value: &i32| {
        let mut driver = driver.borrow_mut();
        if let Err(err) = driver.control_angle(parameter, *value) {
            warn!(drive = %drive, value = *value, error = %err, "drive update failed");
        }
    }));
}
