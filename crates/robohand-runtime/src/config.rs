//! `robohand.toml` loading.
//!
//! Every section is optional; missing keys fall back to defaults.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use smol_str::SmolStr;

use crate::control::{ClientConfig, Framing, ServerConfig};
use crate::driver::DriverRegistry;
use crate::error::ControlError;
use crate::panel::PanelSettings;

pub const DEFAULT_CONFIG_FILE: &str = "robohand.toml";
pub const CONNECT_HOST_ENV: &str = "ROBOHAND_CONNECT_HOST";
/// Older name for [`CONNECT_HOST_ENV`], read when the new one is unset.
pub const LEGACY_CONNECT_HOST_ENV: &str = "SERVER_IP_CONNECT";
/// Largest servo angle magnitude accepted in `[console]`.
pub const SERVO_ANGLE_LIMIT: i32 = 10_000;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Debug, Clone)]
pub struct RobohandConfig {
    pub server: ServerConfig,
    pub client: ClientConfig,
    pub console: ConsoleConfig,
    pub driver: DriverConfig,
    pub log_level: SmolStr,
    pub source: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleConfig {
    pub debounce: Duration,
    pub claw_debounce: Duration,
    pub playback_interval: Duration,
    pub servo_min: i32,
    pub servo_max: i32,
    pub presets: Option<PathBuf>,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(100),
            claw_debounce: Duration::from_millis(1500),
            playback_interval: Duration::from_millis(1000),
            servo_min: -90,
            servo_max: 90,
            presets: None,
        }
    }
}

impl ConsoleConfig {
    #[must_use]
    pub fn panel_settings(&self) -> PanelSettings {
        PanelSettings {
            debounce: self.debounce,
            claw_debounce: self.claw_debounce,
            servo_min: self.servo_min,
            servo_max: self.servo_max,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DriverConfig {
    pub kind: SmolStr,
    pub params: toml::Value,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            kind: SmolStr::new("logged"),
            params: toml::Value::Table(toml::map::Map::new()),
        }
    }
}

impl Default for RobohandConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            client: ClientConfig::default(),
            console: ConsoleConfig::default(),
            driver: DriverConfig::default(),
            log_level: SmolStr::new("info"),
            source: None,
        }
    }
}

impl RobohandConfig {
    /// Load a config file that must exist.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ControlError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|err| {
            ControlError::InvalidConfig(format!("{}: {err}", path.display()).into())
        })?;
        let mut config = Self::from_toml_str(&text)?;
        if let Some(presets) = config.console.presets.take() {
            config.console.presets = Some(resolve_relative(path, presets));
        }
        config.source = Some(path.to_path_buf());
        Ok(config)
    }

    /// Load `path` if given (it must exist), else `./robohand.toml` if
    /// present, else defaults. Environment overrides are applied last.
    pub fn discover(path: Option<&Path>) -> Result<Self, ControlError> {
        let mut config = match path {
            Some(path) => Self::load(path)?,
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                if default.is_file() {
                    Self::load(default)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ControlError> {
        let raw: RobohandToml = toml::from_str(text).map_err(|err| {
            ControlError::InvalidConfig(format!("{DEFAULT_CONFIG_FILE}: {err}").into())
        })?;
        raw.into_config()
    }

    /// Apply environment overrides through `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|host| !host.trim().is_empty());
        let host = non_empty(CONNECT_HOST_ENV).or_else(|| non_empty(LEGACY_CONNECT_HOST_ENV));
        if let Some(host) = host {
            self.client.host = SmolStr::new(host.trim());
        }
    }
}

fn resolve_relative(config_path: &Path, target: PathBuf) -> PathBuf {
    if target.is_absolute() {
        return target;
    }
    match config_path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.join(target),
        _ => target,
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RobohandToml {
    server: Option<ServerSection>,
    client: Option<ClientSection>,
    console: Option<ConsoleSection>,
    driver: Option<DriverSection>,
    log: Option<LogSection>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ServerSection {
    bind: Option<String>,
    port: Option<u16>,
    read_chunk: Option<usize>,
    framing: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ClientSection {
    host: Option<String>,
    port: Option<u16>,
    connect_timeout_ms: Option<u64>,
    write_timeout_ms: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConsoleSection {
    debounce_ms: Option<u64>,
    claw_debounce_ms: Option<u64>,
    playback_interval_ms: Option<u64>,
    servo_min: Option<i32>,
    servo_max: Option<i32>,
    presets: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DriverSection {
    kind: Option<String>,
    params: Option<toml::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct LogSection {
    level: Option<String>,
}

impl RobohandToml {
    fn into_config(self) -> Result<RobohandConfig, ControlError> {
        let defaults = RobohandConfig::default();
        Ok(RobohandConfig {
            server: self
                .server
                .map(|section| section.into_config(&defaults.server))
                .transpose()?
                .unwrap_or(defaults.server),
            client: self
                .client
                .map(|section| section.into_config(&defaults.client))
                .transpose()?
                .unwrap_or(defaults.client),
            console: self
                .console
                .map(|section| section.into_config(&defaults.console))
                .transpose()?
                .unwrap_or(defaults.console),
            driver: self
                .driver
                .map(DriverSection::into_config)
                .transpose()?
                .unwrap_or(defaults.driver),
            log_level: self
                .log
                .and_then(|section| section.level)
                .map(|level| parse_log_level(&level))
                .transpose()?
                .unwrap_or(defaults.log_level),
            source: None,
        })
    }
}

impl ServerSection {
    fn into_config(self, defaults: &ServerConfig) -> Result<ServerConfig, ControlError> {
        let read_chunk = self.read_chunk.unwrap_or(defaults.read_chunk);
        if read_chunk == 0 {
            return Err(invalid("server.read_chunk must be > 0"));
        }
        let bind = self
            .bind
            .map(|bind| bind.trim().to_string())
            .unwrap_or_else(|| defaults.bind.to_string());
        if bind.is_empty() {
            return Err(invalid("server.bind must not be empty"));
        }
        Ok(ServerConfig {
            bind: bind.into(),
            port: self.port.unwrap_or(defaults.port),
            read_chunk,
            framing: self
                .framing
                .as_deref()
                .map(str::parse::<Framing>)
                .transpose()?
                .unwrap_or(defaults.framing),
        })
    }
}

impl ClientSection {
    fn into_config(self, defaults: &ClientConfig) -> Result<ClientConfig, ControlError> {
        let port = self.port.unwrap_or(defaults.port);
        if port == 0 {
            return Err(invalid("client.port must be > 0"));
        }
        let config = ClientConfig {
            host: self
                .host
                .map(|host| SmolStr::new(host.trim()))
                .unwrap_or_else(|| defaults.host.clone()),
            port,
            connect_timeout: self
                .connect_timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.connect_timeout),
            write_timeout: self
                .write_timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.write_timeout),
        };
        config.check_timeouts("client")?;
        Ok(config)
    }
}

impl ConsoleSection {
    fn into_config(self, defaults: &ConsoleConfig) -> Result<ConsoleConfig, ControlError> {
        let playback_interval = self
            .playback_interval_ms
            .map(Duration::from_millis)
            .unwrap_or(defaults.playback_interval);
        if playback_interval.is_zero() {
            return Err(invalid("console.playback_interval_ms must be > 0"));
        }
        let servo_min = self.servo_min.unwrap_or(defaults.servo_min);
        let servo_max = self.servo_max.unwrap_or(defaults.servo_max);
        if servo_min >= servo_max {
            return Err(invalid("console.servo_min must be < console.servo_max"));
        }
        for (key, value) in [("console.servo_min", servo_min), ("console.servo_max", servo_max)] {
            if !(-SERVO_ANGLE_LIMIT..=SERVO_ANGLE_LIMIT).contains(&value) {
                return Err(ControlError::InvalidConfig(
                    format!("{key} must be within +/-{SERVO_ANGLE_LIMIT}").into(),
                ));
            }
        }
        Ok(ConsoleConfig {
            debounce: self
                .debounce_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.debounce),
            claw_debounce: self
                .claw_debounce_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.claw_debounce),
            playback_interval,
            servo_min,
            servo_max,
            presets: self.presets.map(PathBuf::from),
        })
    }
}

impl DriverSection {
    fn into_config(self) -> Result<DriverConfig, ControlError> {
        let defaults = DriverConfig::default();
        let kind = self
            .kind
            .map(|kind| SmolStr::new(kind.trim()))
            .unwrap_or(defaults.kind);
        let params = self.params.unwrap_or(defaults.params);
        if !params.is_table() {
            return Err(invalid("driver.params must be a table"));
        }
        DriverRegistry::default_registry().validate(&kind, &params)?;
        Ok(DriverConfig { kind, params })
    }
}

fn parse_log_level(text: &str) -> Result<SmolStr, ControlError> {
    let level = text.trim().to_ascii_lowercase();
    if LOG_LEVELS.contains(&level.as_str()) {
        Ok(level.into())
    } else {
        Err(ControlError::InvalidConfig(
            format!("invalid log.level '{text}'").into(),
        ))
    }
}

fn invalid(msg: &str) -> ControlError {
    ControlError::InvalidConfig(SmolStr::new(msg))
}
