//! `robohand completions`: shell completion scripts.

use std::path::Path;

use anyhow::Context as _;
use clap::CommandFactory;
use clap_complete::{generate, generate_to, Shell};

use crate::cli::Cli;
use crate::style;

pub fn run_completions(shell: Shell, dir: Option<&Path>) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    let Some(dir) = dir else {
        generate(shell, &mut cmd, name, &mut std::io::stdout());
        return Ok(());
    };
    std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    let path = generate_to(shell, &mut cmd, name, dir)
        .with_context(|| format!("writing {shell} completions to {}", dir.display()))?;
    println!("{}", style::success(format!("wrote {}", path.display())));
    Ok(())
}
