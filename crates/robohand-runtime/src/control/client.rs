//! Lazily connecting control client.

use std::io::{ErrorKind, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use robohand_protocol::{encode, encode_command, CommandBatch, ParameterId};
use serde::Deserialize;
use smol_str::SmolStr;
use tracing::{debug, info, warn};

use crate::driver::ActuatorDriver;
use crate::error::ControlError;

/// Where and how patiently the client connects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub host: SmolStr,
    pub port: u16,
    pub connect_timeout: Duration,
    pub write_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: SmolStr::new("127.0.0.1"),
            port: 61234,
            connect_timeout: Duration::from_millis(2000),
            write_timeout: Duration::from_millis(2000),
        }
    }
}

impl ClientConfig {
    /// Reject zero timeouts; `section` prefixes the key in the error.
    pub(crate) fn check_timeouts(&self, section: &str) -> Result<(), ControlError> {
        for (key, timeout) in [
            ("connect_timeout_ms", self.connect_timeout),
            ("write_timeout_ms", self.write_timeout),
        ] {
            if timeout.is_zero() {
                return Err(ControlError::InvalidConfig(
                    format!("{section}.{key} must be > 0").into(),
                ));
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn address(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

#[derive(Debug, Deserialize)]
struct ClientToml {
    host: Option<String>,
    port: Option<u16>,
    connect_timeout_ms: Option<u64>,
    write_timeout_ms: Option<u64>,
}

/// Remote actuator: forwards every operation to a control server.
///
/// The connection is opened on first use and cached. Any connect or write
/// failure drops that command and clears the cache, so the next send
/// reconnects. Nothing is queued or retried.
#[derive(Debug)]
pub struct ControlClient {
    config: ClientConfig,
    stream: Option<TcpStream>,
    dropped: u64,
}

impl ControlClient {
    #[must_use]
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            stream: None,
            dropped: 0,
        }
    }

    /// Build from a `[driver.params]` table (`host`, `port`,
    /// `connect_timeout_ms`, `write_timeout_ms`).
    pub fn from_params(value: &toml::Value) -> Result<Self, ControlError> {
        let params: ClientToml = value
            .clone()
            .try_into()
            .map_err(|err| ControlError::InvalidConfig(format!("driver.params: {err}").into()))?;
        let defaults = ClientConfig::default();
        let port = params.port.unwrap_or(defaults.port);
        if port == 0 {
            return Err(ControlError::InvalidConfig(
                "driver.params.port must be > 0".into(),
            ));
        }
        let config = ClientConfig {
            host: params.host.map(SmolStr::from).unwrap_or(defaults.host),
            port,
            connect_timeout: params
                .connect_timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.connect_timeout),
            write_timeout: params
                .write_timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.write_timeout),
        };
        config.check_timeouts("driver.params")?;
        Ok(Self::new(config))
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Whether a connection is currently cached.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// Commands dropped because of connect or write failures.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Encode and send one command.
    pub fn send(&mut self, parameter: ParameterId, args: &[i32]) -> Result<(), ControlError> {
        self.send_text(&encode_command(parameter, args))
    }

    /// Encode and send a batch as one message.
    pub fn send_batch(&mut self, batch: &CommandBatch) -> Result<(), ControlError> {
        if batch.is_empty() {
            return Ok(());
        }
        self.send_text(&encode(batch))
    }

    /// Send already encoded batch text.
    pub fn send_text(&mut self, text: &str) -> Result<(), ControlError> {
        if let Err(err) = self.ensure_connected() {
            self.dropped += 1;
            warn!(error = %err, raw = %text, "command dropped, server unreachable");
            return Err(err);
        }
        let Some(stream) = self.stream.as_mut() else {
            return Err(ControlError::Send("no connection".into()));
        };
        match stream.write_all(text.as_bytes()).and_then(|()| stream.flush()) {
            Ok(()) => {
                debug!(raw = %text, "sent");
                Ok(())
            }
            Err(err) => {
                self.stream = None;
                self.dropped += 1;
                let err = ControlError::Send(format!("{}: {err}", self.config.address()).into());
                warn!(error = %err, raw = %text, "command dropped, connection reset");
                Err(err)
            }
        }
    }

    /// Drop the cached connection.
    pub fn disconnect(&mut self) {
        if self.stream.take().is_some() {
            debug!(address = %self.config.address(), "connection closed");
        }
    }

    fn ensure_connected(&mut self) -> Result<(), ControlError> {
        if self.stream.is_some() {
            return Ok(());
        }
        let address = self.config.address();
        let candidates: Vec<SocketAddr> = address
            .to_socket_addrs()
            .map_err(|err| ControlError::Connect {
                address: SmolStr::new(&address),
                reason: err.to_string().into(),
            })?
            .collect();
        let mut last_error = ControlError::Connect {
            address: SmolStr::new(&address),
            reason: "address did not resolve".into(),
        };
        for candidate in candidates {
            match TcpStream::connect_timeout(&candidate, self.config.connect_timeout) {
                Ok(stream) => {
                    let _ = stream.set_nodelay(true);
                    let _ = stream.set_write_timeout(Some(self.config.write_timeout));
                    info!(%address, "connected to control server");
                    self.stream = Some(stream);
                    return Ok(());
                }
                Err(err) if err.kind() == ErrorKind::TimedOut => {
                    last_error = ControlError::ConnectTimeout(SmolStr::new(&address));
                }
                Err(err) => {
                    last_error = ControlError::Connect {
                        address: SmolStr::new(&address),
                        reason: err.to_string().into(),
                    };
                }
            }
        }
        Err(last_error)
    }

    fn forward(&mut self, parameter: ParameterId, args: &[i32]) -> Result<(), ControlError> {
        info!(parameter = %parameter, ?args, "[send]");
        // Failures are already logged and counted; the operator session
        // carries on.
        let _ = self.send(parameter, args);
        Ok(())
    }
}

impl ActuatorDriver for ControlClient {
    fn control_claw(&mut self, angle: i32) -> Result<(), ControlError> {
        self.forward(ParameterId::Claw, &[angle])
    }

    fn control_extend_arrow(&mut self, angle: i32) -> Result<(), ControlError> {
        self.forward(ParameterId::ExtendArrow, &[angle])
    }

    fn control_raise_arrow(&mut self, angle: i32) -> Result<(), ControlError> {
        self.forward(ParameterId::RaiseArrow, &[angle])
    }

    fn control_rotation(&mut self, angle: i32) -> Result<(), ControlError> {
        self.forward(ParameterId::Rotation, &[angle])
    }

    fn set_led_rgb(&mut self, red: i32, green: i32, blue: i32) -> Result<(), ControlError> {
        self.forward(ParameterId::Led, &[red, green, blue])
    }
}
