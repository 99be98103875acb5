mod common;

use std::fs;
use std::time::Duration;

use common::temp_dir;
use robohand_runtime::config::CONNECT_HOST_ENV;
use robohand_runtime::driver::{DriverRegistry, PwmConfig};
use robohand_runtime::{ControlError, Framing, PresetStore, RobohandConfig};

#[test]
fn config_file_drives_every_section() {
    let dir = temp_dir("config");
    let path = dir.join("robohand.toml");
    fs::write(
        &path,
        r#"
[server]
bind = "127.0.0.1"
port = 7000
framing = "delimited"

[client]
host = "hand.local"
connect_timeout_ms = 250

[console]
claw_debounce_ms = 900
playback_interval_ms = 500
presets = "presets.json"

[driver]
kind = "sim"

[log]
level = "debug"
"#,
    )
    .unwrap();

    let mut config = RobohandConfig::load(&path).unwrap();
    config.apply_env(|key| (key == CONNECT_HOST_ENV).then(|| "10.0.0.7".to_string()));

    assert_eq!(config.server.address(), "127.0.0.1:7000");
    assert_eq!(config.server.framing, Framing::Delimited);
    assert_eq!(config.client.address(), "10.0.0.7:61234");
    assert_eq!(config.client.connect_timeout, Duration::from_millis(250));
    assert_eq!(config.console.claw_debounce, Duration::from_millis(900));
    assert_eq!(config.console.debounce, Duration::from_millis(100));
    assert_eq!(config.console.presets.as_deref(), Some(dir.join("presets.json").as_path()));
    assert_eq!(
        DriverRegistry::default_registry().canonical_name(&config.driver.kind).as_deref(),
        Some("logged")
    );
    assert_eq!(config.log_level, "debug");
    let _ = fs::remove_dir_all(dir);
}

#[test]
fn unknown_keys_are_rejected() {
    let err = RobohandConfig::from_toml_str("[server]\nport = 1\nframe = 'x'\n").unwrap_err();
    assert!(matches!(err, ControlError::InvalidConfig(_)));
}

#[test]
fn preset_store_lives_next_to_the_config() {
    let dir = temp_dir("presets");
    let path = dir.join("robohand.toml");
    fs::write(&path, "[console]\npresets = \"saved/presets.json\"\n").unwrap();
    let config = RobohandConfig::load(&path).unwrap();

    let mut store = PresetStore::load(config.console.presets.clone()).unwrap();
    store.add("rotation|10;raise_arrow|0;extend_arrow|0;claw|0;").unwrap();
    store.add("claw|-30;").unwrap();

    let written = fs::read_to_string(dir.join("saved").join("presets.json")).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&written).unwrap();
    assert_eq!(parsed["commands"][1], "claw|-30;");

    let reopened = PresetStore::load(config.console.presets).unwrap();
    assert_eq!(reopened.commands(), store.commands());
    let _ = fs::remove_dir_all(dir);
}

#[test]
fn servo_output_clamps_out_of_range_angles() {
    let config = PwmConfig::from_params(&toml::Value::Table(toml::map::Map::new())).unwrap();
    assert_eq!(config.pulse_for_angle(9999), config.pulse_for_angle(90));
    assert_eq!(config.pulse_for_angle(-9999), config.min_pulse_ns);
    assert_eq!(config.duty_for_level(300), config.period_ns);
}
