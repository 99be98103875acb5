//! `robohand play`: replay batches on the playback interval.

use anyhow::bail;
use robohand_runtime::{EventLoop, PresetStore, RobohandConfig, StdClock};

use crate::context::{console_driver, LocalDriver};
use crate::session::Session;
use crate::style;

pub fn run_play(
    config: &RobohandConfig,
    commands: Vec<String>,
    remote: bool,
) -> anyhow::Result<()> {
    let commands = if commands.is_empty() {
        PresetStore::load(config.console.presets.clone())?
            .commands()
            .to_vec()
    } else {
        commands
    };
    if commands.is_empty() {
        bail!("nothing to play: the preset store is empty and no --command was given");
    }
    let (driver, recorder) = console_driver(config, remote)?;
    let (events, sender) = EventLoop::<StdClock, ()>::channel(StdClock::new());
    drop(sender);

    let mut session = Session::new(events.clock().clone(), driver, config);
    let listing = commands.clone();
    session.playback.on_step(move |index| {
        let text = listing.get(*index).map_or("", String::as_str);
        println!("{}", style::preset_line(*index, text));
    });
    session.play(commands)?;
    events.run_until(&mut session, |_, ()| {}, Session::is_settled);
    LocalDriver::report(recorder.as_ref());
    Ok(())
}
