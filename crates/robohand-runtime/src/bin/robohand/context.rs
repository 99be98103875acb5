//! Configuration, logging and driver setup shared by the subcommands.

use std::time::Duration;

use anyhow::{bail, Context as _};
use robohand_runtime::driver::{shared, DriverRegistry};
use robohand_runtime::{
    ActuatorDriver, ControlClient, RecordingDriver, RobohandConfig, SharedDriver,
};
use smol_str::SmolStr;
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;

/// Load the config file (if any) and apply command line overrides.
pub fn load_config(cli: &Cli) -> anyhow::Result<RobohandConfig> {
    let mut config = RobohandConfig::discover(cli.config.as_deref())
        .context("loading configuration")?;
    if let Some(bind) = cli.bind.as_deref() {
        config.server.bind = bind.into();
    }
    if let Some(port) = cli.port {
        if port == 0 {
            bail!("invalid config '--port must be > 0'");
        }
        config.server.port = port;
        config.client.port = port;
    }
    if let Some(host) = cli.host.as_deref() {
        config.client.host = host.into();
    }
    if let Some(driver) = cli.driver.as_deref() {
        DriverRegistry::default_registry().validate(driver, &config.driver.params)?;
        config.driver.kind = driver.into();
    }
    if let Some(interval) = cli.interval_ms {
        if interval == 0 {
            bail!("invalid config '--interval-ms must be > 0'");
        }
        config.console.playback_interval = Duration::from_millis(interval);
    }
    Ok(config)
}

/// Log to stderr; `RUST_LOG` wins over the configured level.
pub fn init_logging(level: &str, verbose: bool) {
    let level = if verbose { "debug" } else { level };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Actuator driver built from `[driver]`.
pub struct LocalDriver {
    pub name: SmolStr,
    pub driver: Box<dyn ActuatorDriver + Send>,
    /// Set for the `recording` driver so calls can be printed afterwards.
    pub recorder: Option<RecordingDriver>,
}

impl LocalDriver {
    pub fn open(config: &RobohandConfig) -> anyhow::Result<Self> {
        let registry = DriverRegistry::default_registry();
        if registry.canonical_name(&config.driver.kind).as_deref() == Some("recording") {
            let recorder = RecordingDriver::new();
            return Ok(Self {
                name: "recording".into(),
                driver: Box::new(recorder.clone()),
                recorder: Some(recorder),
            });
        }
        let spec = registry.build(&config.driver.kind, &config.driver.params)?;
        Ok(Self {
            name: spec.name,
            driver: spec.driver,
            recorder: None,
        })
    }

    /// Print recorded calls, one per line.
    pub fn report(recorder: Option<&RecordingDriver>) {
        let Some(recorder) = recorder else {
            return;
        };
        for call in recorder.calls() {
            println!("{call}");
        }
    }
}

/// Driver for console-side components: the local driver, or a client
/// forwarding to the configured server.
pub fn console_driver(
    config: &RobohandConfig,
    remote: bool,
) -> anyhow::Result<(SharedDriver, Option<RecordingDriver>)> {
    if remote {
        tracing::info!(address = %config.client.address(), "forwarding to control server");
        return Ok((shared(ControlClient::new(config.client.clone())), None));
    }
    let local = LocalDriver::open(config)?;
    tracing::info!(driver = %local.name, "driving local actuators");
    Ok((shared(local.driver), local.recorder))
}
