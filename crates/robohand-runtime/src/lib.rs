//! `robohand-runtime` - control server, client and operator-side scheduling
//! for a remotely driven robotic hand.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]

/// Runtime configuration (`robohand.toml`).
pub mod config;
/// Control server, client and wire framing.
pub mod control;
/// Trailing-edge debouncing of value streams.
pub mod debounce;
/// Parameter to actuator operation dispatch.
pub mod dispatch;
/// Actuator driver capability and backends.
pub mod driver;
/// Control errors.
pub mod error;
/// Mirrored slider pair coordination.
pub mod mirror;
/// Operator control panel.
pub mod panel;
/// Timed replay of recorded command batches.
pub mod playback;
/// Stored command presets.
pub mod presets;
/// Clocks, timed components and the console event loop.
pub mod scheduler;
/// Observer registration.
pub mod signal;

pub use config::RobohandConfig;
pub use control::{ControlClient, ControlServer, Framing, ServerHandle};
pub use debounce::Debouncer;
pub use dispatch::{DispatchReport, DispatchTable};
pub use driver::{ActuatorCall, ActuatorDriver, LoggedDriver, RecordingDriver, SharedDriver};
pub use error::ControlError;
pub use mirror::{MirroredPair, Side};
pub use panel::{ControlPanel, DriveName, PanelSettings};
pub use playback::{PlaybackSequencer, PlaybackState};
pub use presets::PresetStore;
pub use scheduler::{Clock, EventLoop, ManualClock, StdClock, Timed};
pub use signal::Signal;
