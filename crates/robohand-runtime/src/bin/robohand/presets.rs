//! `robohand presets`: list and edit the preset store.

use anyhow::Context as _;
use robohand_protocol::decode_batch;
use robohand_runtime::{PresetStore, RobohandConfig};

use crate::cli::PresetsAction;
use crate::style;

pub fn run_presets(config: &RobohandConfig, action: PresetsAction) -> anyhow::Result<()> {
    let Some(path) = config.console.presets.clone() else {
        anyhow::bail!("invalid config 'console.presets is not set'");
    };
    let mut store = PresetStore::load(Some(path))?;
    match action {
        PresetsAction::List => {
            if store.is_empty() {
                println!("{}", style::warning("no presets stored"));
            }
            for (index, text) in store.commands().iter().enumerate() {
                println!("{}", style::preset_line(index, text));
            }
        }
        PresetsAction::Add { text } => {
            decode_batch(&text).with_context(|| format!("invalid batch '{text}'"))?;
            store.add(text)?;
            println!("{}", style::success(format!("{} preset(s) stored", store.len())));
        }
        PresetsAction::Remove { indices } => {
            store.remove(&indices)?;
            println!("{}", style::success(format!("{} preset(s) stored", store.len())));
        }
    }
    Ok(())
}
