//! Linux sysfs PWM driver for hobby servos and an RGB LED.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use smol_str::SmolStr;
use tracing::debug;

use crate::driver::ActuatorDriver;
use crate::error::ControlError;

const DEFAULT_SYSFS_BASE: &str = "/sys/class/pwm";
const DEFAULT_PERIOD_NS: u64 = 20_000_000;
const DEFAULT_MIN_PULSE_NS: u64 = 500_000;
const DEFAULT_MAX_PULSE_NS: u64 = 2_500_000;
const LED_MAX: i32 = 255;

/// Linearly map `x` from `[in_min, in_max]` onto `[out_min, out_max]`,
/// rounding toward negative infinity. A degenerate input range maps to
/// `out_min`.
#[must_use]
pub fn map_range(x: i64, in_min: i64, in_max: i64, out_min: i64, out_max: i64) -> i64 {
    let span = in_max - in_min;
    if span == 0 {
        return out_min;
    }
    let scaled = (x - in_min) * (out_max - out_min);
    let quotient = if span > 0 {
        scaled.div_euclid(span)
    } else {
        (-scaled).div_euclid(-span)
    };
    quotient + out_min
}

/// Output channel numbers on the PWM chip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PwmChannels {
    pub rotation: u32,
    pub claw: u32,
    pub extend_arrow: u32,
    pub raise_arrow: u32,
    pub led_red: u32,
    pub led_green: u32,
    pub led_blue: u32,
}

impl Default for PwmChannels {
    fn default() -> Self {
        Self {
            rotation: 0,
            claw: 1,
            extend_arrow: 2,
            raise_arrow: 3,
            led_red: 15,
            led_green: 14,
            led_blue: 13,
        }
    }
}

impl PwmChannels {
    fn all(&self) -> [u32; 7] {
        [
            self.rotation,
            self.claw,
            self.extend_arrow,
            self.raise_arrow,
            self.led_red,
            self.led_green,
            self.led_blue,
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PwmConfig {
    pub sysfs_base: PathBuf,
    pub chip: u32,
    pub period_ns: u64,
    pub min_pulse_ns: u64,
    pub max_pulse_ns: u64,
    pub servo_min: i32,
    pub servo_max: i32,
    pub channels: PwmChannels,
}

impl PwmConfig {
    pub fn from_params(value: &toml::Value) -> Result<Self, ControlError> {
        let params: PwmToml = value
            .clone()
            .try_into()
            .map_err(|err| invalid_pwm(format!("driver.params: {err}")))?;
        let defaults = PwmChannels::default();
        let channels = params.channels.unwrap_or_default();
        let config = Self {
            sysfs_base: params
                .sysfs_base
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_SYSFS_BASE)),
            chip: params.chip.unwrap_or(0),
            period_ns: params.period_ns.unwrap_or(DEFAULT_PERIOD_NS),
            min_pulse_ns: params.min_pulse_ns.unwrap_or(DEFAULT_MIN_PULSE_NS),
            max_pulse_ns: params.max_pulse_ns.unwrap_or(DEFAULT_MAX_PULSE_NS),
            servo_min: params.servo_min.unwrap_or(-90),
            servo_max: params.servo_max.unwrap_or(90),
            channels: PwmChannels {
                rotation: channels.rotation.unwrap_or(defaults.rotation),
                claw: channels.claw.unwrap_or(defaults.claw),
                extend_arrow: channels.extend_arrow.unwrap_or(defaults.extend_arrow),
                raise_arrow: channels.raise_arrow.unwrap_or(defaults.raise_arrow),
                led_red: channels.led_red.unwrap_or(defaults.led_red),
                led_green: channels.led_green.unwrap_or(defaults.led_green),
                led_blue: channels.led_blue.unwrap_or(defaults.led_blue),
            },
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ControlError> {
        if self.period_ns == 0 {
            return Err(invalid_pwm("driver.params.period_ns must be > 0"));
        }
        if self.min_pulse_ns >= self.max_pulse_ns || self.max_pulse_ns > self.period_ns {
            return Err(invalid_pwm(
                "driver.params pulse range must satisfy min_pulse_ns < max_pulse_ns <= period_ns",
            ));
        }
        if self.servo_min >= self.servo_max {
            return Err(invalid_pwm("driver.params.servo_min must be < servo_max"));
        }
        let mut seen = self.channels.all().to_vec();
        seen.sort_unstable();
        seen.dedup();
        if seen.len() != self.channels.all().len() {
            return Err(invalid_pwm("driver.params.channels must be distinct"));
        }
        Ok(())
    }

    /// Pulse width for a servo angle, clamped to the servo range.
    #[must_use]
    pub fn pulse_for_angle(&self, angle: i32) -> u64 {
        let angle = angle.clamp(self.servo_min, self.servo_max);
        let pulse = map_range(
            i64::from(angle),
            i64::from(self.servo_min),
            i64::from(self.servo_max),
            self.min_pulse_ns as i64,
            self.max_pulse_ns as i64,
        );
        pulse.max(0) as u64
    }

    /// Duty cycle for an LED level, clamped to `0..=255`.
    #[must_use]
    pub fn duty_for_level(&self, level: i32) -> u64 {
        let level = level.clamp(0, LED_MAX);
        let duty = map_range(
            i64::from(level),
            0,
            i64::from(LED_MAX),
            0,
            self.period_ns as i64,
        );
        duty.max(0) as u64
    }
}

#[derive(Debug, Deserialize)]
struct PwmToml {
    sysfs_base: Option<String>,
    chip: Option<u32>,
    period_ns: Option<u64>,
    min_pulse_ns: Option<u64>,
    max_pulse_ns: Option<u64>,
    servo_min: Option<i32>,
    servo_max: Option<i32>,
    channels: Option<PwmChannelsToml>,
}

#[derive(Debug, Default, Deserialize)]
struct PwmChannelsToml {
    rotation: Option<u32>,
    claw: Option<u32>,
    extend_arrow: Option<u32>,
    raise_arrow: Option<u32>,
    led_red: Option<u32>,
    led_green: Option<u32>,
    led_blue: Option<u32>,
}

/// Servo and LED driver writing pulse widths through sysfs PWM.
pub struct PwmServoDriver {
    backend: Box<dyn PwmBackend>,
    config: PwmConfig,
}

impl std::fmt::Debug for PwmServoDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PwmServoDriver")
            .field("config", &self.config)
            .finish()
    }
}

impl PwmServoDriver {
    pub fn from_params(params: &toml::Value) -> Result<Self, ControlError> {
        let config = PwmConfig::from_params(params)?;
        let backend = SysfsPwm::new(config.sysfs_base.join(format!("pwmchip{}", config.chip)));
        Self::with_backend(Box::new(backend), config)
    }

    pub fn validate_params(params: &toml::Value) -> Result<(), ControlError> {
        let _ = PwmConfig::from_params(params)?;
        Ok(())
    }

    fn with_backend(
        mut backend: Box<dyn PwmBackend>,
        config: PwmConfig,
    ) -> Result<Self, ControlError> {
        for channel in config.channels.all() {
            backend.configure(channel, config.period_ns)?;
        }
        Ok(Self { backend, config })
    }

    #[must_use]
    pub fn config(&self) -> &PwmConfig {
        &self.config
    }

    fn set_servo(&mut self, channel: u32, angle: i32) -> Result<(), ControlError> {
        let pulse = self.config.pulse_for_angle(angle);
        debug!(channel, angle, pulse_ns = pulse, "servo pulse");
        self.backend.set_duty(channel, pulse)
    }
}

impl ActuatorDriver for PwmServoDriver {
    fn control_claw(&mut self, angle: i32) -> Result<(), ControlError> {
        self.set_servo(self.config.channels.claw, angle)
    }

    fn control_extend_arrow(&mut self, angle: i32) -> Result<(), ControlError> {
        self.set_servo(self.config.channels.extend_arrow, angle)
    }

    fn control_raise_arrow(&mut self, angle: i32) -> Result<(), ControlError> {
        self.set_servo(self.config.channels.raise_arrow, angle)
    }

    fn control_rotation(&mut self, angle: i32) -> Result<(), ControlError> {
        self.set_servo(self.config.channels.rotation, angle)
    }

    fn set_led_rgb(&mut self, red: i32, green: i32, blue: i32) -> Result<(), ControlError> {
        let channels = self.config.channels;
        for (channel, level) in [
            (channels.led_red, red),
            (channels.led_green, green),
            (channels.led_blue, blue),
        ] {
            let duty = self.config.duty_for_level(level);
            self.backend.set_duty(channel, duty)?;
        }
        Ok(())
    }
}

fn invalid_pwm(msg: impl Into<String>) -> ControlError {
    ControlError::InvalidConfig(SmolStr::new(msg.into()))
}

trait PwmBackend: Send {
    fn configure(&mut self, channel: u32, period_ns: u64) -> Result<(), ControlError>;
    fn set_duty(&mut self, channel: u32, duty_ns: u64) -> Result<(), ControlError>;
}

#[derive(Debug)]
struct SysfsPwm {
    chip: PathBuf,
}

impl SysfsPwm {
    fn new(chip: PathBuf) -> Self {
        Self { chip }
    }

    fn channel_path(&self, channel: u32, leaf: &str) -> PathBuf {
        self.chip.join(format!("pwm{channel}")).join(leaf)
    }

    fn ensure_exported(&self, channel: u32) -> Result<(), ControlError> {
        if self.chip.join(format!("pwm{channel}")).exists() {
            return Ok(());
        }
        let export_path = self.chip.join("export");
        fs::write(&export_path, channel.to_string()).map_err(|err| {
            ControlError::Driver(SmolStr::new(format!(
                "pwm export {channel} failed: {err}"
            )))
        })
    }

    fn write_path(&self, path: &Path, value: &str) -> Result<(), ControlError> {
        let mut file = fs::OpenOptions::new()
            .write(true)
            .open(path)
            .map_err(|err| {
                ControlError::Driver(SmolStr::new(format!("pwm write {path:?} failed: {err}")))
            })?;
        file.write_all(value.as_bytes()).map_err(|err| {
            ControlError::Driver(SmolStr::new(format!("pwm write {path:?} failed: {err}")))
        })
    }
}

impl PwmBackend for SysfsPwm {
    fn configure(&mut self, channel: u32, period_ns: u64) -> Result<(), ControlError> {
        self.ensure_exported(channel)?;
        self.write_path(&self.channel_path(channel, "period"), &period_ns.to_string())?;
        self.write_path(&self.channel_path(channel, "duty_cycle"), "0")?;
        self.write_path(&self.channel_path(channel, "enable"), "1")
    }

    fn set_duty(&mut self, channel: u32, duty_ns: u64) -> Result<(), ControlError> {
        self.write_path(&self.channel_path(channel, "duty_cycle"), &duty_ns.to_string())
    }
}
