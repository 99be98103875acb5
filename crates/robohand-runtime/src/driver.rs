//! Actuator driver capability and the built-in drivers.

#![allow(missing_docs)]

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::{Arc, Mutex};

use robohand_protocol::ParameterId;
use smol_str::SmolStr;
use tracing::info;

use crate::error::ControlError;

mod pwm;
mod registry;
pub use pwm::{map_range, PwmChannels, PwmConfig, PwmServoDriver};
pub use registry::{DriverRegistry, DriverSpec};

/// Operations the hand exposes: four servo angles and one RGB LED.
///
/// Values arrive unclamped; each driver decides how to handle angles
/// outside its physical range.
pub trait ActuatorDriver {
    fn control_claw(&mut self, angle: i32) -> Result<(), ControlError>;

    fn control_extend_arrow(&mut self, angle: i32) -> Result<(), ControlError>;

    fn control_raise_arrow(&mut self, angle: i32) -> Result<(), ControlError>;

    fn control_rotation(&mut self, angle: i32) -> Result<(), ControlError>;

    fn set_led_rgb(&mut self, red: i32, green: i32, blue: i32) -> Result<(), ControlError>;

    /// Route a single-angle update by parameter. `Led` is not an angle channel.
    fn control_angle(&mut self, parameter: ParameterId, angle: i32) -> Result<(), ControlError> {
        match parameter {
            ParameterId::Claw => self.control_claw(angle),
            ParameterId::ExtendArrow => self.control_extend_arrow(angle),
            ParameterId::RaiseArrow => self.control_raise_arrow(angle),
            ParameterId::Rotation => self.control_rotation(angle),
            ParameterId::Led => Err(ControlError::ArityMismatch {
                parameter: ParameterId::Led.as_str().into(),
                expected: ParameterId::Led.arity(),
                got: 1,
            }),
        }
    }
}

impl<D: ActuatorDriver + ?Sized> ActuatorDriver for Box<D> {
    fn control_claw(&mut self, angle: i32) -> Result<(), ControlError> {
        (**self).control_claw(angle)
    }

    fn control_extend_arrow(&mut self, angle: i32) -> Result<(), ControlError> {
        (**self).control_extend_arrow(angle)
    }

    fn control_raise_arrow(&mut self, angle: i32) -> Result<(), ControlError> {
        (**self).control_raise_arrow(angle)
    }

    fn control_rotation(&mut self, angle: i32) -> Result<(), ControlError> {
        (**self).control_rotation(angle)
    }

    fn set_led_rgb(&mut self, red: i32, green: i32, blue: i32) -> Result<(), ControlError> {
        (**self).set_led_rgb(red, green, blue)
    }
}

/// Single-threaded shared handle used by console components.
impl<D: ActuatorDriver + ?Sized> ActuatorDriver for Rc<RefCell<D>> {
    fn control_claw(&mut self, angle: i32) -> Result<(), ControlError> {
        self.borrow_mut().control_claw(angle)
    }

    fn control_extend_arrow(&mut self, angle: i32) -> Result<(), ControlError> {
        self.borrow_mut().control_extend_arrow(angle)
    }

    fn control_raise_arrow(&mut self, angle: i32) -> Result<(), ControlError> {
        self.borrow_mut().control_raise_arrow(angle)
    }

    fn control_rotation(&mut self, angle: i32) -> Result<(), ControlError> {
        self.borrow_mut().control_rotation(angle)
    }

    fn set_led_rgb(&mut self, red: i32, green: i32, blue: i32) -> Result<(), ControlError> {
        self.borrow_mut().set_led_rgb(red, green, blue)
    }
}

/// Shared driver handle for the console event loop.
pub type SharedDriver = Rc<RefCell<dyn ActuatorDriver>>;

/// Wrap a driver for sharing between console components.
pub fn shared<D: ActuatorDriver + 'static>(driver: D) -> SharedDriver {
    Rc::new(RefCell::new(driver))
}

/// Driver that only logs what it would do.
#[derive(Debug, Default)]
pub struct LoggedDriver;

impl ActuatorDriver for LoggedDriver {
    fn control_claw(&mut self, angle: i32) -> Result<(), ControlError> {
        info!(angle, "set claw angle");
        Ok(())
    }

    fn control_extend_arrow(&mut self, angle: i32) -> Result<(), ControlError> {
        info!(angle, "extend tower");
        Ok(())
    }

    fn control_raise_arrow(&mut self, angle: i32) -> Result<(), ControlError> {
        info!(angle, "raise tower");
        Ok(())
    }

    fn control_rotation(&mut self, angle: i32) -> Result<(), ControlError> {
        info!(angle, "rotate base");
        Ok(())
    }

    fn set_led_rgb(&mut self, red: i32, green: i32, blue: i32) -> Result<(), ControlError> {
        info!(red, green, blue, "set led rgb");
        Ok(())
    }
}

/// One recorded driver invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorCall {
    Claw(i32),
    ExtendArrow(i32),
    RaiseArrow(i32),
    Rotation(i32),
    Led(i32, i32, i32),
}

impl ActuatorCall {
    #[must_use]
    pub fn parameter(self) -> ParameterId {
        match self {
            Self::Claw(_) => ParameterId::Claw,
            Self::ExtendArrow(_) => ParameterId::ExtendArrow,
            Self::RaiseArrow(_) => ParameterId::RaiseArrow,
            Self::Rotation(_) => ParameterId::Rotation,
            Self::Led(..) => ParameterId::Led,
        }
    }
}

impl fmt::Display for ActuatorCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Claw(angle) => write!(f, "control_claw({angle})"),
            Self::ExtendArrow(angle) => write!(f, "control_extend_arrow({angle})"),
            Self::RaiseArrow(angle) => write!(f, "control_raise_arrow({angle})"),
            Self::Rotation(angle) => write!(f, "control_rotation({angle})"),
            Self::Led(r, g, b) => write!(f, "set_led_rgb({r}, {g}, {b})"),
        }
    }
}

/// Driver that records every call; cloning shares the log.
///
/// Parameters listed with [`RecordingDriver::fail_on`] return a driver error
/// instead of recording.
#[derive(Debug, Clone, Default)]
pub struct RecordingDriver {
    calls: Arc<Mutex<Vec<ActuatorCall>>>,
    failing: Vec<ParameterId>,
}

impl RecordingDriver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn fail_on(mut self, parameter: ParameterId) -> Self {
        self.failing.push(parameter);
        self
    }

    #[must_use]
    pub fn calls(&self) -> Vec<ActuatorCall> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    pub fn clear(&self) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.clear();
        }
    }

    fn record(&mut self, call: ActuatorCall) -> Result<(), ControlError> {
        if self.failing.contains(&call.parameter()) {
            return Err(ControlError::Driver(SmolStr::new(format!(
                "{call} rejected"
            ))));
        }
        self.calls
            .lock()
            .map_err(|_| ControlError::Driver("recording lock poisoned".into()))?
            .push(call);
        Ok(())
    }
}

impl ActuatorDriver for RecordingDriver {
    fn control_claw(&mut self, angle: i32) -> Result<(), ControlError> {
        self.record(ActuatorCall::Claw(angle))
    }

    fn control_extend_arrow(&mut self, angle: i32) -> Result<(), ControlError> {
        self.record(ActuatorCall::ExtendArrow(angle))
    }

    fn control_raise_arrow(&mut self, angle: i32) -> Result<(), ControlError> {
        self.record(ActuatorCall::RaiseArrow(angle))
    }

    fn control_rotation(&mut self, angle: i32) -> Result<(), ControlError> {
        self.record(ActuatorCall::Rotation(angle))
    }

    fn set_led_rgb(&mut self, red: i32, green: i32, blue: i32) -> Result<(), ControlError> {
        self.record(ActuatorCall::Led(red, green, blue))
    }
}
