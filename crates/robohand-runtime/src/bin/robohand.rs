//! CLI entrypoint for the robohand control tools.

#[path = "robohand/cli.rs"]
mod cli;
#[path = "robohand/completions.rs"]
mod completions;
#[path = "robohand/console.rs"]
mod console;
#[path = "robohand/context.rs"]
mod context;
#[path = "robohand/play.rs"]
mod play;
#[path = "robohand/presets.rs"]
mod presets;
#[path = "robohand/send.rs"]
mod send;
#[path = "robohand/serve.rs"]
mod serve;
#[path = "robohand/session.rs"]
mod session;
#[path = "robohand/style.rs"]
mod style;

use clap::Parser;

use cli::{Cli, Command};

fn main() {
    if let Err(err) = run() {
        let message = format_error_with_tip(&err);
        eprintln!("{}", style::error(format!("Error: {message}")));
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    if let Command::Completions { shell, dir } = &cli.command {
        return completions::run_completions(*shell, dir.as_deref());
    }
    let config = context::load_config(&cli)?;
    context::init_logging(&config.log_level, cli.verbose);
    match cli.command {
        Command::Serve { framing } => serve::run_serve(&config, framing),
        Command::Send { batches } => send::run_send(&config, &batches),
        Command::Play { commands, remote } => play::run_play(&config, commands, remote),
        Command::Console { remote } => console::run_console(&config, remote),
        Command::Presets { action } => presets::run_presets(&config, action),
        Command::Completions { .. } => Ok(()),
    }
}

fn format_error_with_tip(err: &anyhow::Error) -> String {
    let message = format!("{err:#}");
    let tip = if message.starts_with("bind ") {
        Some("Tip: another server may own the port; pick one with `--port` or stop it first.")
    } else if message.contains("unsupported driver.kind") {
        Some("Tip: known drivers are logged, recording, pwm-sysfs and remote.")
    } else if message.contains("invalid config") {
        Some("Tip: check robohand.toml or pass `--config <file>`.")
    } else {
        None
    };
    match tip {
        Some(tip) => format!("{message}\n{tip}"),
        None => message,
    }
}
