//! Trailing-edge debouncer for one value channel.

use std::time::Duration;

use tracing::trace;

use crate::scheduler::{Clock, Timed};
use crate::signal::Signal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Pending {
    value: i32,
    deadline: Duration,
}

/// Coalesces a burst of values into one emission after a quiet period.
///
/// Each [`Debouncer::handle`] replaces the pending value and restarts the
/// quiet period. Holds at most one pending value.
#[derive(Debug)]
pub struct Debouncer<C: Clock> {
    clock: C,
    quiet: Duration,
    pending: Option<Pending>,
    emitted: Signal<i32>,
}

impl<C: Clock> Debouncer<C> {
    /// Debouncer with the given quiet period.
    pub fn new(clock: C, quiet: Duration) -> Self {
        Self {
            clock,
            quiet,
            pending: None,
            emitted: Signal::new(),
        }
    }

    /// Record `value` as pending and restart the quiet period.
    pub fn handle(&mut self, value: i32) {
        let deadline = self.clock.now().saturating_add(self.quiet);
        trace!(value, ?deadline, "debounce rearmed");
        self.pending = Some(Pending { value, deadline });
    }

    /// Register a handler for settled values.
    pub fn add_debounced_handler(&mut self, handler: impl FnMut(&i32) + 'static) {
        self.emitted.subscribe(handler);
    }

    /// Value waiting for the quiet period to elapse.
    #[must_use]
    pub fn pending_value(&self) -> Option<i32> {
        self.pending.map(|pending| pending.value)
    }

    #[must_use]
    pub fn quiet_period(&self) -> Duration {
        self.quiet
    }

    #[must_use]
    pub fn handler_count(&self) -> usize {
        self.emitted.handler_count()
    }
}

impl<C: Clock> Timed for Debouncer<C> {
    fn next_deadline(&self) -> Option<Duration> {
        self.pending.map(|pending| pending.deadline)
    }

    fn poll(&mut self) {
        let Some(pending) = self.pending else {
            return;
        };
        if pending.deadline > self.clock.now() {
            return;
        }
        self.pending = None;
        self.emitted.emit(&pending.value);
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::scheduler::ManualClock;

    fn recorded(debouncer: &mut Debouncer<ManualClock>) -> Rc<RefCell<Vec<i32>>> {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        debouncer.add_debounced_handler(move |value| sink.borrow_mut().push(*value));
        seen
    }

    #[test]
    fn burst_inside_quiet_period_emits_last_value_once() {
        let clock = ManualClock::new();
        let mut debouncer = Debouncer::new(clock.clone(), Duration::from_millis(100));
        let seen = recorded(&mut debouncer);

        for value in [1, 2, 3, 4, 5] {
            debouncer.handle(value);
            clock.advance_ms(60);
            debouncer.poll();
        }
        assert!(seen.borrow().is_empty());

        clock.advance_ms(40);
        debouncer.poll();
        debouncer.poll();
        assert_eq!(*seen.borrow(), [5]);
        assert_eq!(debouncer.pending_value(), None);
    }

    #[test]
    fn spaced_values_each_emit() {
        let clock = ManualClock::new();
        let mut debouncer = Debouncer::new(clock.clone(), Duration::from_millis(100));
        let seen = recorded(&mut debouncer);

        for value in [10, 20, 30] {
            debouncer.handle(value);
            clock.advance_ms(150);
            debouncer.poll();
        }
        assert_eq!(*seen.borrow(), [10, 20, 30]);
    }

    #[test]
    fn new_value_restarts_the_deadline() {
        let clock = ManualClock::new();
        let mut debouncer = Debouncer::new(clock.clone(), Duration::from_millis(100));
        debouncer.handle(1);
        assert_eq!(debouncer.next_deadline(), Some(Duration::from_millis(100)));
        clock.advance_ms(90);
        debouncer.handle(2);
        assert_eq!(debouncer.next_deadline(), Some(Duration::from_millis(190)));
        assert_eq!(debouncer.pending_value(), Some(2));
    }
}
