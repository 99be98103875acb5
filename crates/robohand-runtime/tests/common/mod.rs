#![allow(dead_code)]

use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use robohand_runtime::control::ServerConfig;
use robohand_runtime::{ActuatorCall, ControlServer, Framing, RecordingDriver, ServerHandle};

pub fn loopback_config(port: u16, framing: Framing) -> ServerConfig {
    ServerConfig {
        bind: "127.0.0.1".into(),
        port,
        framing,
        ..ServerConfig::default()
    }
}

pub fn spawn_server(port: u16, framing: Framing) -> (ServerHandle, RecordingDriver) {
    let recorder = RecordingDriver::new();
    let server = ControlServer::bind(&loopback_config(port, framing)).expect("bind test server");
    let handle = server.spawn(recorder.clone()).expect("spawn test server");
    (handle, recorder)
}

/// Poll the recorder until it holds `count` calls or two seconds pass.
pub fn wait_for_calls(recorder: &RecordingDriver, count: usize) -> Vec<ActuatorCall> {
    let deadline = Instant::now() + Duration::from_secs(2);
    loop {
        let calls = recorder.calls();
        if calls.len() >= count || Instant::now() >= deadline {
            return calls;
        }
        thread::sleep(Duration::from_millis(5));
    }
}

pub fn temp_dir(name: &str) -> PathBuf {
    let stamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock before epoch")
        .as_nanos();
    let dir = std::env::temp_dir().join(format!("robohand-{name}-{stamp}"));
    std::fs::create_dir_all(&dir).expect("create temp dir");
    dir
}
