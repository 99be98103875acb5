use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use expect_test::expect;
use robohand_runtime::driver::shared;
use robohand_runtime::scheduler::earliest;
use robohand_runtime::{
    ActuatorCall, ControlPanel, Debouncer, DriveName, ManualClock, MirroredPair, PanelSettings,
    PlaybackSequencer, PlaybackState, RecordingDriver, Side, Timed,
};

struct Rig {
    clock: ManualClock,
    recorder: RecordingDriver,
    panel: Rc<RefCell<ControlPanel<ManualClock>>>,
    playback: PlaybackSequencer<ManualClock>,
}

impl Rig {
    fn new(interval_ms: u64) -> Self {
        let clock = ManualClock::new();
        let recorder = RecordingDriver::new();
        let panel = Rc::new(RefCell::new(ControlPanel::new(
            clock.clone(),
            shared(recorder.clone()),
            PanelSettings::default(),
        )));
        let target = Rc::clone(&panel);
        let playback = PlaybackSequencer::new(
            clock.clone(),
            Duration::from_millis(interval_ms),
            move |text: &str| {
                target.borrow_mut().apply_commands(text);
            },
        );
        Self {
            clock,
            recorder,
            panel,
            playback,
        }
    }

    /// Jump from deadline to deadline until nothing is armed, noting the
    /// time of every driver call.
    fn run_to_completion(&mut self) -> Vec<String> {
        let mut log = Vec::new();
        while let Some(deadline) = self.next_deadline() {
            self.clock.set_time(deadline);
            let before = self.recorder.calls().len();
            self.poll();
            for call in &self.recorder.calls()[before..] {
                log.push(format!("{} ms {call}", deadline.as_millis()));
            }
        }
        log
    }
}

impl Timed for Rig {
    fn next_deadline(&self) -> Option<Duration> {
        earliest(
            self.playback.next_deadline(),
            self.panel.borrow().next_deadline(),
        )
    }

    fn poll(&mut self) {
        self.playback.poll();
        self.panel.borrow_mut().poll();
    }
}

#[test]
fn playback_flows_through_the_debounced_panel() {
    let mut rig = Rig::new(1000);
    rig.playback.reset(vec![
        "rotation|10;".to_string(),
        "rotation|20;claw|30;".to_string(),
        "rotation|30;led|0|255|0;".to_string(),
    ]);
    rig.playback.start().unwrap();

    let log = rig.run_to_completion();
    expect![[r#"
        1100 ms control_rotation(10)
        2100 ms control_rotation(20)
        3000 ms set_led_rgb(0, 255, 0)
        3100 ms control_rotation(30)
        3500 ms control_claw(30)
    "#]]
    .assert_eq(&(log.join("\n") + "\n"));
    assert_eq!(rig.playback.state(), PlaybackState::Idle);
}

#[test]
fn replay_is_deterministic_at_any_interval() {
    for interval in [250, 1000, 2000] {
        let commands = vec!["raise_arrow|-5;".to_string(), "raise_arrow|5;".to_string()];
        let mut first = Rig::new(interval);
        first.playback.reset(commands.clone());
        first.playback.start().unwrap();
        let mut second = Rig::new(interval);
        second.playback.reset(commands);
        second.playback.start().unwrap();

        let log = first.run_to_completion();
        assert_eq!(log, second.run_to_completion());
        assert_eq!(
            first.recorder.calls(),
            vec![ActuatorCall::RaiseArrow(-5), ActuatorCall::RaiseArrow(5)]
        );
    }
}

#[test]
fn slider_burst_reaches_the_driver_once() {
    let mut rig = Rig::new(1000);
    {
        let mut panel = rig.panel.borrow_mut();
        for value in -30..=45 {
            panel.set_drive(DriveName::Extend, value);
            rig.clock.advance_ms(20);
            panel.poll();
        }
    }
    assert!(rig.recorder.calls().is_empty());
    assert_eq!(rig.panel.borrow().indicator(DriveName::Extend), 45);
    rig.run_to_completion();
    assert_eq!(rig.recorder.calls(), vec![ActuatorCall::ExtendArrow(45)]);
}

#[test]
fn debouncer_emits_each_settled_value() {
    let clock = ManualClock::new();
    let mut debouncer = Debouncer::new(clock.clone(), Duration::from_millis(100));
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    debouncer.add_debounced_handler(move |value| sink.borrow_mut().push(*value));

    for value in [1, 2, 3] {
        debouncer.handle(value);
        clock.advance_ms(99);
        debouncer.poll();
    }
    clock.advance_ms(1);
    debouncer.poll();
    debouncer.handle(4);
    clock.advance_ms(150);
    debouncer.poll();
    debouncer.poll();
    assert_eq!(*seen.borrow(), [3, 4]);
}

#[test]
fn mirrored_pair_stays_symmetric() {
    let clock = ManualClock::new();
    let mut pair = MirroredPair::new(clock.clone(), -90, 90, Duration::from_millis(1500));
    let forwarded = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&forwarded);
    pair.add_debounced_handler(move |value| sink.borrow_mut().push(*value));

    for (side, value) in [
        (Side::Left, 10),
        (Side::Right, -45),
        (Side::Left, 90),
        (Side::Right, 200),
    ] {
        pair.handle_change(side, value);
        assert_eq!(pair.value(Side::Left) + pair.value(Side::Right), 0);
    }
    assert_eq!(pair.value(Side::Right), 90);

    clock.advance_ms(1500);
    pair.poll();
    assert_eq!(*forwarded.borrow(), [90]);
}

#[test]
fn panel_state_round_trips_through_apply() {
    let mut rig = Rig::new(1000);
    rig.panel
        .borrow_mut()
        .apply_commands("rotation|-60;raise_arrow|12;extend_arrow|-3;claw|15;");
    let saved = rig.panel.borrow().state_as_commands().to_string();
    expect!["rotation|-60;raise_arrow|12;extend_arrow|-3;claw|15;"].assert_eq(&saved);

    let mut other = Rig::new(1000);
    other.panel.borrow_mut().apply_commands(&saved);
    assert_eq!(other.panel.borrow().state_as_commands().to_string(), saved);
    assert_eq!(other.panel.borrow().claw().value(Side::Left), -15);
}
