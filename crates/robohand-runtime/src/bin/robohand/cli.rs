//! CLI definitions for robohand.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use robohand_runtime::Framing;

#[derive(Debug, Parser)]
#[command(
    name = "robohand",
    version,
    about = "Remote control for a servo-driven robotic hand",
    infer_subcommands = true,
    after_help = "Examples:\n  robohand serve --driver pwm          # on the hand\n  robohand console --remote --host hand.local\n  robohand send 'rotation|30;led|255|0|0;' --host hand.local\n  robohand play --remote"
)]
pub struct Cli {
    /// Configuration file (defaults to ./robohand.toml when present).
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,
    /// Show debug logging.
    #[arg(long, short, global = true)]
    pub verbose: bool,
    /// Server bind address override.
    #[arg(long, global = true)]
    pub bind: Option<String>,
    /// Control port override (server and client).
    #[arg(long, global = true)]
    pub port: Option<u16>,
    /// Remote host override for client connections.
    #[arg(long, global = true)]
    pub host: Option<String>,
    /// Local driver override (logged, recording, pwm-sysfs, remote).
    #[arg(long, global = true)]
    pub driver: Option<String>,
    /// Playback interval override in milliseconds.
    #[arg(long, global = true)]
    pub interval_ms: Option<u64>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Accept control connections and drive the local actuators.
    Serve {
        /// Read framing (chunk or delimited).
        #[arg(long)]
        framing: Option<Framing>,
    },
    /// Send command batches to a control server.
    #[command(after_help = "Examples:\n  robohand send 'claw|-20;'\n  robohand send 'rotation|10;' 'rotation|20;'")]
    Send {
        /// Batch texts, sent in order.
        #[arg(required = true)]
        batches: Vec<String>,
    },
    /// Replay stored presets (or given batches) at the playback interval.
    Play {
        /// Batch text to play instead of the preset store (repeatable).
        #[arg(long = "command")]
        commands: Vec<String>,
        /// Forward to the configured control server instead of the local driver.
        #[arg(long)]
        remote: bool,
    },
    /// Headless operator console reading control events from stdin.
    Console {
        /// Forward to the configured control server instead of the local driver.
        #[arg(long)]
        remote: bool,
    },
    /// Manage the preset store.
    Presets {
        #[command(subcommand)]
        action: PresetsAction,
    },
    /// Generate shell completions.
    Completions {
        #[arg(value_enum)]
        shell: Shell,
        /// Write the script into this directory instead of stdout.
        #[arg(long)]
        dir: Option<PathBuf>,
    },
}

#[derive(Debug, Subcommand)]
pub enum PresetsAction {
    /// Print stored presets with their indices.
    List,
    /// Append a batch text.
    Add {
        /// Batch text, e.g. 'rotation|10;claw|-20;'.
        text: String,
    },
    /// Remove presets by index.
    Remove {
        #[arg(required = true)]
        indices: Vec<usize>,
    },
}
