//! Two opposite-facing controls kept symmetric around their range midpoint.

use std::time::Duration;

use tracing::trace;

use crate::debounce::Debouncer;
use crate::scheduler::{Clock, Timed};
use crate::signal::Signal;

/// One side of a mirrored pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    /// Left control.
    Left,
    /// Right control.
    Right,
}

impl Side {
    /// The opposite side.
    #[must_use]
    pub fn other(self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }
}

/// Mirrored slider pair feeding one physical channel.
///
/// Either side may change; the opposite side is set silently to
/// `max + min - value` and the primary side's value is forwarded to the
/// debouncer. `displayed` fires immediately on every change, `side_set`
/// reports each silent set so a UI can move the widget.
#[derive(Debug)]
pub struct MirroredPair<C: Clock> {
    min: i32,
    max: i32,
    left: i32,
    right: i32,
    primary: Side,
    echo: Option<(Side, i32)>,
    debounce: Debouncer<C>,
    displayed: Signal<i32>,
    side_set: Signal<(Side, i32)>,
}

impl<C: Clock> MirroredPair<C> {
    /// Pair over `[min, max]` with the right side as primary, both sides at
    /// the midpoint.
    pub fn new(clock: C, min: i32, max: i32, quiet: Duration) -> Self {
        let (min, max) = if min <= max { (min, max) } else { (max, min) };
        let mid = i64::from(min) + (i64::from(max) - i64::from(min)) / 2;
        let mid = i32::try_from(mid).unwrap_or(min);
        Self {
            min,
            max,
            left: reflect(min, max, mid),
            right: mid,
            primary: Side::Right,
            echo: None,
            debounce: Debouncer::new(clock, quiet),
            displayed: Signal::new(),
            side_set: Signal::new(),
        }
    }

    /// Choose which side's value drives the channel.
    #[must_use]
    pub fn with_primary(mut self, primary: Side) -> Self {
        self.primary = primary;
        self
    }

    /// Mirror image of `value` in the pair's range.
    #[must_use]
    pub fn mirror(&self, value: i32) -> i32 {
        reflect(self.min, self.max, value)
    }

    /// Operator moved `side` to `value`.
    ///
    /// A change that only echoes a silent set made by this pair is
    /// swallowed, so a UI that reports programmatic moves as edits cannot
    /// feed back into the pair.
    pub fn handle_change(&mut self, side: Side, value: i32) {
        if self.echo.take() == Some((side, value)) {
            trace!(?side, value, "mirror echo suppressed");
            return;
        }
        let value = value.clamp(self.min, self.max);
        self.store(side, value);
        let mirrored = self.mirror(value);
        self.set_silently(side.other(), mirrored);
        self.echo = Some((side.other(), mirrored));

        let authoritative = self.value(self.primary);
        self.debounce.handle(authoritative);
        self.displayed.emit(&authoritative);
    }

    /// Move the primary side as if the operator had.
    pub fn set_value(&mut self, value: i32) {
        self.echo = None;
        self.handle_change(self.primary, value);
    }

    /// Set `side` and its mirror without forwarding anything downstream.
    pub fn set_silently(&mut self, side: Side, value: i32) {
        self.echo = None;
        let value = value.clamp(self.min, self.max);
        self.store(side, value);
        self.store(side.other(), self.mirror(value));
        self.side_set.emit(&(side, value));
    }

    /// Current value of one side.
    #[must_use]
    pub fn value(&self, side: Side) -> i32 {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }

    /// Value of the primary side.
    #[must_use]
    pub fn authoritative(&self) -> i32 {
        self.value(self.primary)
    }

    #[must_use]
    pub fn range(&self) -> (i32, i32) {
        (self.min, self.max)
    }

    /// Register a handler for settled channel values.
    pub fn add_debounced_handler(&mut self, handler: impl FnMut(&i32) + 'static) {
        self.debounce.add_debounced_handler(handler);
    }

    /// Register a handler for immediate, non-debounced values.
    pub fn on_display(&mut self, handler: impl FnMut(&i32) + 'static) {
        self.displayed.subscribe(handler);
    }

    /// Register a handler for silent sets of either side.
    pub fn on_side_set(&mut self, handler: impl FnMut(&(Side, i32)) + 'static) {
        self.side_set.subscribe(handler);
    }

    fn store(&mut self, side: Side, value: i32) {
        match side {
            Side::Left => self.left = value,
            Side::Right => self.right = value,
        }
    }
}

/// `max + min - value`, clamped into `[min, max]`.
fn reflect(min: i32, max: i32, value: i32) -> i32 {
    let mirrored = i64::from(max) + i64::from(min) - i64::from(value);
    i32::try_from(mirrored.clamp(i64::from(min), i64::from(max))).unwrap_or(value)
}

impl<C: Clock> Timed for MirroredPair<C> {
    fn next_deadline(&self) -> Option<Duration> {
        self.debounce.next_deadline()
    }

    fn poll(&mut self) {
        self.debounce.poll();
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::scheduler::ManualClock;

    fn pair(clock: &ManualClock) -> MirroredPair<ManualClock> {
        MirroredPair::new(clock.clone(), -90, 90, Duration::from_millis(1500))
    }

    #[test]
    fn starts_symmetric_at_midpoint() {
        let pair = pair(&ManualClock::new());
        assert_eq!(pair.value(Side::Left), 0);
        assert_eq!(pair.value(Side::Right), 0);
    }

    #[test]
    fn either_side_mirrors_the_other() {
        let mut pair = pair(&ManualClock::new());
        for (side, value) in [(Side::Left, 30), (Side::Right, -75), (Side::Left, 90)] {
            pair.handle_change(side, value);
            assert_eq!(pair.value(side), value);
            assert_eq!(pair.value(side.other()), 90 + -90 - value);
        }
    }

    #[test]
    fn primary_side_value_is_forwarded_and_displayed() {
        let clock = ManualClock::new();
        let mut pair = pair(&clock);
        let shown = Rc::new(RefCell::new(Vec::new()));
        let settled = Rc::new(RefCell::new(Vec::new()));
        let sink = shown.clone();
        pair.on_display(move |value| sink.borrow_mut().push(*value));
        let sink = settled.clone();
        pair.add_debounced_handler(move |value| sink.borrow_mut().push(*value));

        pair.handle_change(Side::Left, 20);
        pair.handle_change(Side::Right, 45);
        assert_eq!(*shown.borrow(), [-20, 45]);
        assert!(settled.borrow().is_empty());

        clock.advance_ms(1500);
        pair.poll();
        assert_eq!(*settled.borrow(), [45]);
    }

    #[test]
    fn echoed_silent_set_does_not_feed_back() {
        let clock = ManualClock::new();
        let mut pair = pair(&clock);
        let echoes = Rc::new(RefCell::new(Vec::new()));
        let sink = echoes.clone();
        pair.on_side_set(move |set| sink.borrow_mut().push(*set));
        let shown = Rc::new(RefCell::new(0));
        let count = shown.clone();
        pair.on_display(move |_| *count.borrow_mut() += 1);

        pair.handle_change(Side::Right, 10);
        let echoed: Vec<(Side, i32)> = echoes.borrow_mut().drain(..).collect();
        assert_eq!(echoed, [(Side::Left, -10)]);
        for (side, value) in echoed {
            pair.handle_change(side, value);
        }
        assert_eq!(*shown.borrow(), 1);
        assert!(echoes.borrow().is_empty());
        assert_eq!(pair.value(Side::Right), 10);
    }

    #[test]
    fn out_of_range_input_is_clamped_to_the_pair_range() {
        let mut pair = pair(&ManualClock::new());
        pair.handle_change(Side::Right, 500);
        assert_eq!(pair.value(Side::Right), 90);
        assert_eq!(pair.value(Side::Left), -90);
    }

    #[test]
    fn later_silent_set_clears_a_pending_echo() {
        let clock = ManualClock::new();
        let mut pair = pair(&clock);
        let settled = Rc::new(RefCell::new(Vec::new()));
        let sink = settled.clone();
        pair.add_debounced_handler(move |value| sink.borrow_mut().push(*value));

        pair.handle_change(Side::Right, 10);
        pair.set_silently(Side::Right, 50);
        pair.handle_change(Side::Left, -10);
        assert_eq!(pair.value(Side::Left), -10);
        assert_eq!(pair.value(Side::Right), 10);

        clock.advance_ms(1500);
        pair.poll();
        assert_eq!(*settled.borrow(), [10]);
    }

    #[test]
    fn extreme_ranges_do_not_overflow() {
        let mut pair = MirroredPair::new(
            ManualClock::new(),
            i32::MIN,
            i32::MAX,
            Duration::from_millis(10),
        );
        assert_eq!(pair.value(Side::Right), -1);
        assert_eq!(pair.value(Side::Left), 0);
        pair.handle_change(Side::Right, i32::MIN);
        assert_eq!(pair.value(Side::Left), i32::MAX);
        pair.handle_change(Side::Left, i32::MIN);
        assert_eq!(pair.value(Side::Right), i32::MAX);
    }

    #[test]
    fn asymmetric_range_mirrors_around_its_midpoint() {
        let mut pair = MirroredPair::new(ManualClock::new(), 0, 180, Duration::from_millis(10))
            .with_primary(Side::Left);
        pair.handle_change(Side::Right, 30);
        assert_eq!(pair.value(Side::Left), 150);
        assert_eq!(pair.authoritative(), 150);
    }
}
