//! Parameter to actuator operation dispatch.
//!
//! Every failure is isolated to its own command: the rest of the batch is
//! still applied.

use std::sync::OnceLock;

use robohand_protocol::{decode, Command, Parameter, ParameterId};
use smol_str::SmolStr;
use tracing::{debug, warn};

use crate::driver::ActuatorDriver;
use crate::error::ControlError;

type DispatchOp = fn(&mut dyn ActuatorDriver, &[i32]) -> Result<(), ControlError>;

#[derive(Clone, Copy)]
struct DispatchEntry {
    arity: usize,
    op: DispatchOp,
}

/// Static mapping from parameter to actuator operation.
pub struct DispatchTable {
    entries: [(ParameterId, DispatchEntry); ParameterId::ALL.len()],
}

impl std::fmt::Debug for DispatchTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|(id, entry)| (id.as_str(), entry.arity)))
            .finish()
    }
}

/// Outcome of dispatching one batch text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Commands that reached the driver successfully.
    pub applied: usize,
    /// Per-command failures in arrival order.
    pub failures: Vec<ControlError>,
}

impl DispatchReport {
    /// Whether every command was applied.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

impl DispatchTable {
    /// Build the table for the fixed parameter set.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: ParameterId::ALL.map(|id| (id, entry_for(id))),
        }
    }

    /// Shared table, built on first use.
    pub fn standard() -> &'static Self {
        static TABLE: OnceLock<DispatchTable> = OnceLock::new();
        TABLE.get_or_init(Self::new)
    }

    /// Expected argument count for a parameter.
    #[must_use]
    pub fn arity(&self, parameter: ParameterId) -> usize {
        self.lookup(parameter).arity
    }

    /// Apply one decoded command.
    pub fn dispatch(
        &self,
        driver: &mut dyn ActuatorDriver,
        command: &Command,
    ) -> Result<(), ControlError> {
        let id = match &command.parameter {
            Parameter::Known(id) => *id,
            Parameter::Unknown(token) => {
                return Err(ControlError::UnknownParameter(token.clone()));
            }
        };
        let entry = self.lookup(id);
        if command.args.len() != entry.arity {
            return Err(ControlError::ArityMismatch {
                parameter: SmolStr::new(id.as_str()),
                expected: entry.arity,
                got: command.args.len(),
            });
        }
        (entry.op)(driver, &command.args)
    }

    /// Decode `text` and apply every well-formed command in order, logging
    /// and skipping the rest.
    pub fn dispatch_text(&self, driver: &mut dyn ActuatorDriver, text: &str) -> DispatchReport {
        let mut report = DispatchReport::default();
        for decoded in decode(text) {
            let result = decoded
                .map_err(ControlError::from)
                .and_then(|command| {
                    debug!(parameter = %command.parameter, args = ?command.args, "dispatch");
                    self.dispatch(driver, &command)
                });
            match result {
                Ok(()) => report.applied += 1,
                Err(err) => {
                    match &err {
                        ControlError::UnknownParameter(token) => {
                            warn!(parameter = %token, raw = %text, "unknown parameter, skipped");
                        }
                        other => warn!(error = %other, raw = %text, "command skipped"),
                    }
                    report.failures.push(err);
                }
            }
        }
        report
    }

    fn lookup(&self, parameter: ParameterId) -> DispatchEntry {
        self.entries
            .iter()
            .find_map(|(id, entry)| (*id == parameter).then_some(*entry))
            .unwrap_or_else(|| entry_for(parameter))
    }
}

impl Default for DispatchTable {
    fn default() -> Self {
        Self::new()
    }
}

fn entry_for(parameter: ParameterId) -> DispatchEntry {
    let op: DispatchOp = match parameter {
        ParameterId::Claw => claw,
        ParameterId::ExtendArrow => extend_arrow,
        ParameterId::RaiseArrow => raise_arrow,
        ParameterId::Rotation => rotation,
        ParameterId::Led => led,
    };
    DispatchEntry {
        arity: parameter.arity(),
        op,
    }
}

fn claw(driver: &mut dyn ActuatorDriver, args: &[i32]) -> Result<(), ControlError> {
    driver.control_claw(args[0])
}

fn extend_arrow(driver: &mut dyn ActuatorDriver, args: &[i32]) -> Result<(), ControlError> {
    driver.control_extend_arrow(args[0])
}

fn raise_arrow(driver: &mut dyn ActuatorDriver, args: &[i32]) -> Result<(), ControlError> {
    driver.control_raise_arrow(args[0])
}

fn rotation(driver: &mut dyn ActuatorDriver, args: &[i32]) -> Result<(), ControlError> {
    driver.control_rotation(args[0])
}

fn led(driver: &mut dyn ActuatorDriver, args: &[i32]) -> Result<(), ControlError> {
    driver.set_led_rgb(args[0], args[1], args[2])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{ActuatorCall, RecordingDriver};

    #[test]
    fn bad_segment_does_not_drop_the_rest_of_the_batch() {
        let mut driver = RecordingDriver::new();
        let report = DispatchTable::standard().dispatch_text(&mut driver, "bad|x;rotation|10;");
        assert_eq!(driver.calls(), vec![ActuatorCall::Rotation(10)]);
        assert_eq!(report.applied, 1);
        assert!(matches!(report.failures[..], [ControlError::Parse(_)]));
    }

    #[test]
    fn unknown_parameter_is_skipped() {
        let mut driver = RecordingDriver::new();
        let report = DispatchTable::new().dispatch_text(&mut driver, "wrist|4;claw|2;");
        assert_eq!(driver.calls(), vec![ActuatorCall::Claw(2)]);
        assert_eq!(
            report.failures,
            vec![ControlError::UnknownParameter("wrist".into())]
        );
    }

    #[test]
    fn arity_mismatch_is_reported_per_command() {
        let mut driver = RecordingDriver::new();
        let report =
            DispatchTable::new().dispatch_text(&mut driver, "led|1|2;rotation|1|2;claw|3;");
        assert_eq!(driver.calls(), vec![ActuatorCall::Claw(3)]);
        assert_eq!(
            report.failures,
            vec![
                ControlError::ArityMismatch {
                    parameter: "led".into(),
                    expected: 3,
                    got: 2
                },
                ControlError::ArityMismatch {
                    parameter: "rotation".into(),
                    expected: 1,
                    got: 2
                },
            ]
        );
    }

    #[test]
    fn driver_failure_does_not_abort_the_batch() {
        let mut driver = RecordingDriver::new().fail_on(ParameterId::Claw);
        let report =
            DispatchTable::new().dispatch_text(&mut driver, "claw|-10;led|255|0|0;");
        assert_eq!(driver.calls(), vec![ActuatorCall::Led(255, 0, 0)]);
        assert!(matches!(report.failures[..], [ControlError::Driver(_)]));
    }

    #[test]
    fn out_of_range_values_reach_the_driver() {
        let mut driver = RecordingDriver::new();
        let report = DispatchTable::new().dispatch_text(&mut driver, "rotation|9999;");
        assert!(report.is_clean());
        assert_eq!(driver.calls(), vec![ActuatorCall::Rotation(9999)]);
    }

    #[test]
    fn table_arity_follows_parameter_set() {
        let table = DispatchTable::new();
        assert_eq!(table.arity(ParameterId::Led), 3);
        assert_eq!(table.arity(ParameterId::Rotation), 1);
    }
}
