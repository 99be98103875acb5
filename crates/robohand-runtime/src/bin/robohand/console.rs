//! `robohand console`: headless operator console driven by stdin lines.

use std::io::BufRead;
use std::sync::mpsc::Sender;
use std::thread;
use std::time::Duration;

use anyhow::Context as _;
use robohand_runtime::{
    Clock, DriveName, EventLoop, PresetStore, RobohandConfig, Side, StdClock, Timed,
};

use crate::context::{console_driver, LocalDriver};
use crate::session::Session;
use crate::style;

const HELP: &str = "commands:
  rotate|raise|extend <angle>    move a drive control
  claw-left|claw-right <angle>   move one side of the claw pair
  led <r> <g> <b>                set the LED
  apply <batch>                  set controls from batch text
  save                           store the current state as a preset
  presets                        list stored presets
  remove <index>...              delete presets
  play                           replay stored presets
  stop                           cancel playback
  state                          print the current state
  quit";

/// One parsed console line.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ConsoleCommand {
    Drive(DriveName, i32),
    Claw(Side, i32),
    Led(i32, i32, i32),
    Apply(String),
    Save,
    Presets,
    Remove(Vec<usize>),
    Play,
    Stop,
    State,
    Help,
    Quit,
}

fn parse_line(line: &str) -> Result<Option<ConsoleCommand>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (word, rest) = line
        .split_once(char::is_whitespace)
        .map_or((line, ""), |(word, rest)| (word, rest.trim()));
    let ints = |text: &str| -> Result<Vec<i32>, String> {
        text.split_whitespace()
            .map(|arg| arg.parse::<i32>().map_err(|_| format!("not an integer: '{arg}'")))
            .collect()
    };
    let exactly = |count: usize| -> Result<Vec<i32>, String> {
        let values = ints(rest)?;
        if values.len() == count {
            Ok(values)
        } else {
            Err(format!("'{word}' takes {count} value(s), got {}", values.len()))
        }
    };
    let command = match word.to_ascii_lowercase().as_str() {
        "rotate" | "raise" | "extend" => {
            let drive = word.parse::<DriveName>().map_err(|err| err.to_string())?;
            ConsoleCommand::Drive(drive, exactly(1)?[0])
        }
        "claw" | "claw-right" => ConsoleCommand::Claw(Side::Right, exactly(1)?[0]),
        "claw-left" => ConsoleCommand::Claw(Side::Left, exactly(1)?[0]),
        "led" => {
            let rgb = exactly(3)?;
            ConsoleCommand::Led(rgb[0], rgb[1], rgb[2])
        }
        "apply" if !rest.is_empty() => ConsoleCommand::Apply(rest.to_string()),
        "apply" => return Err("'apply' needs batch text".to_string()),
        "save" => ConsoleCommand::Save,
        "presets" | "list" => ConsoleCommand::Presets,
        "remove" => {
            let indices = rest
                .split_whitespace()
                .map(|arg| arg.parse::<usize>().map_err(|_| format!("not an index: '{arg}'")))
                .collect::<Result<Vec<_>, _>>()?;
            if indices.is_empty() {
                return Err("'remove' needs at least one index".to_string());
            }
            ConsoleCommand::Remove(indices)
        }
        "play" => ConsoleCommand::Play,
        "stop" => ConsoleCommand::Stop,
        "state" => ConsoleCommand::State,
        "help" | "?" => ConsoleCommand::Help,
        "quit" | "exit" => ConsoleCommand::Quit,
        other => return Err(format!("unknown command '{other}' (try 'help')")),
    };
    Ok(Some(command))
}

struct Console<C: Clock> {
    session: Session<C>,
    presets: PresetStore,
    quit: bool,
}

impl<C: Clock + Clone + 'static> Console<C> {
    fn handle_line(&mut self, line: &str) {
        match parse_line(line) {
            Ok(Some(command)) => {
                if let Err(err) = self.execute(command) {
                    eprintln!("{}", style::error(format!("{err:#}")));
                }
            }
            Ok(None) => {}
            Err(message) => eprintln!("{}", style::error(message)),
        }
    }

    fn execute(&mut self, command: ConsoleCommand) -> anyhow::Result<()> {
        let mut panel = self.session.panel.borrow_mut();
        match command {
            ConsoleCommand::Drive(drive, value) => panel.set_drive(drive, value),
            ConsoleCommand::Claw(side, value) => panel.move_claw(side, value),
            ConsoleCommand::Led(red, green, blue) => panel.set_led(red, green, blue),
            ConsoleCommand::Apply(text) => {
                let applied = panel.apply_commands(&text);
                println!("{}", style::accent(format!("{applied} command(s) applied")));
            }
            ConsoleCommand::Save => {
                let text = panel.state_as_commands().to_string();
                self.presets.add(text.clone())?;
                println!("{}", style::success(format!("saved {text}")));
            }
            ConsoleCommand::Presets => {
                for (index, text) in self.presets.commands().iter().enumerate() {
                    println!("{}", style::preset_line(index, text));
                }
            }
            ConsoleCommand::Remove(indices) => self.presets.remove(&indices)?,
            ConsoleCommand::Play => {
                drop(panel);
                return self.session.play(self.presets.commands().to_vec());
            }
            ConsoleCommand::Stop => {
                drop(panel);
                self.session.playback.stop();
            }
            ConsoleCommand::State => {
                println!("{}", panel.state_as_commands());
                let [red, green, blue] = panel.led();
                println!("led|{red}|{green}|{blue}");
            }
            ConsoleCommand::Help => println!("{HELP}"),
            ConsoleCommand::Quit => self.quit = true,
        }
        Ok(())
    }
}

impl<C: Clock> Timed for Console<C> {
    fn next_deadline(&self) -> Option<Duration> {
        self.session.next_deadline()
    }

    fn poll(&mut self) {
        self.session.poll();
    }
}

pub fn run_console(config: &RobohandConfig, remote: bool) -> anyhow::Result<()> {
    let presets = PresetStore::load(config.console.presets.clone())?;
    let (driver, recorder) = console_driver(config, remote)?;
    let (events, sender) = EventLoop::<StdClock, String>::channel(StdClock::new());
    spawn_stdin_reader(sender).context("starting stdin reader")?;

    let mut console = Console {
        session: Session::new(events.clock().clone(), driver, config),
        presets,
        quit: false,
    };
    console.session.panel.borrow_mut().on_display(|(drive, value)| {
        println!("{}", style::drive_value(drive, *value));
    });
    println!("{}", style::success("robohand console ready, type 'help'"));
    events.run_until(
        &mut console,
        |console, line| console.handle_line(&line),
        |console| console.quit,
    );
    // Flush values still waiting out their debounce.
    console.session.playback.stop();
    while let Some(deadline) = console.next_deadline() {
        events.clock().sleep_until(deadline);
        console.poll();
    }
    LocalDriver::report(recorder.as_ref());
    Ok(())
}

fn spawn_stdin_reader(sender: Sender<String>) -> std::io::Result<()> {
    thread::Builder::new()
        .name("robohand-stdin".into())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if sender.send(line).is_err() {
                    break;
                }
            }
        })
        .map(|_| ())
}
