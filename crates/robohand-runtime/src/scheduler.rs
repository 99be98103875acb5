//! Console scheduling utilities and clocks.

#![allow(missing_docs)]

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::Duration;

/// Clock interface for console timers.
pub trait Clock: Send + Sync + 'static {
    /// Return the current time as an offset from the clock's origin.
    fn now(&self) -> Duration;

    /// Sleep until the given deadline.
    fn sleep_until(&self, deadline: Duration);
}

/// Monotonic clock based on `std::time::Instant`.
#[derive(Debug, Clone)]
pub struct StdClock {
    start: std::time::Instant,
}

impl StdClock {
    #[must_use]
    pub fn new() -> Self {
        Self {
            start: std::time::Instant::now(),
        }
    }
}

impl Default for StdClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for StdClock {
    fn now(&self) -> Duration {
        self.start.elapsed()
    }

    fn sleep_until(&self, deadline: Duration) {
        let delta = deadline.saturating_sub(self.now());
        if !delta.is_zero() {
            thread::sleep(delta);
        }
    }
}

/// Deterministic clock for tests and simulations. Sleepers block until
/// another handle advances the time past their deadline.
#[derive(Debug, Clone)]
pub struct ManualClock {
    inner: Arc<(Mutex<Duration>, Condvar)>,
}

impl ManualClock {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new((Mutex::new(Duration::ZERO), Condvar::new())),
        }
    }

    /// Return the current manual time.
    #[must_use]
    pub fn current_time(&self) -> Duration {
        let (lock, _) = &*self.inner;
        *lock.lock().expect("manual clock lock poisoned")
    }

    /// Advance time by the given delta.
    pub fn advance(&self, delta: Duration) -> Duration {
        let (lock, cvar) = &*self.inner;
        let mut now = lock.lock().expect("manual clock lock poisoned");
        *now = now.saturating_add(delta);
        cvar.notify_all();
        *now
    }

    /// Advance time by whole milliseconds.
    pub fn advance_ms(&self, millis: u64) -> Duration {
        self.advance(Duration::from_millis(millis))
    }

    /// Set the current time explicitly.
    pub fn set_time(&self, time: Duration) {
        let (lock, cvar) = &*self.inner;
        *lock.lock().expect("manual clock lock poisoned") = time;
        cvar.notify_all();
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.current_time()
    }

    fn sleep_until(&self, deadline: Duration) {
        let (lock, cvar) = &*self.inner;
        let mut now = lock.lock().expect("manual clock lock poisoned");
        while *now < deadline {
            now = cvar.wait(now).expect("manual clock wait poisoned");
        }
    }
}

/// Component with timer-driven work.
///
/// `poll` fires whatever is due at the component clock's current time and
/// must be cheap to call when nothing is due.
pub trait Timed {
    /// Earliest pending deadline, if any timer is armed.
    fn next_deadline(&self) -> Option<Duration>;

    /// Fire due timers.
    fn poll(&mut self);
}

impl<T: Timed + ?Sized> Timed for Box<T> {
    fn next_deadline(&self) -> Option<Duration> {
        (**self).next_deadline()
    }

    fn poll(&mut self) {
        (**self).poll();
    }
}

/// Earliest of two optional deadlines.
#[must_use]
pub fn earliest(a: Option<Duration>, b: Option<Duration>) -> Option<Duration> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, None) => a,
        (None, b) => b,
    }
}

/// Outcome of one event loop turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Turn {
    /// Events were handled or timers fired.
    Progress,
    /// Nothing was pending.
    Idle,
    /// Every sender is gone and no timer is armed.
    Closed,
}

/// Single-threaded loop that interleaves inbound events with component
/// timers. Handlers run to completion on the loop thread.
pub struct EventLoop<C: Clock, E> {
    clock: C,
    events: Receiver<E>,
}

impl<C: Clock, E> std::fmt::Debug for EventLoop<C, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventLoop").finish_non_exhaustive()
    }
}

impl<C: Clock, E> EventLoop<C, E> {
    /// Create the loop and the sender feeding it. The loop closes once every
    /// clone of the sender is dropped.
    #[must_use]
    pub fn channel(clock: C) -> (Self, Sender<E>) {
        let (sender, events) = mpsc::channel();
        (Self { clock, events }, sender)
    }

    #[must_use]
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Handle queued events and fire due timers without blocking.
    pub fn pump<T, F>(&self, target: &mut T, on_event: &mut F) -> Turn
    where
        T: Timed + ?Sized,
        F: FnMut(&mut T, E),
    {
        let mut turn = Turn::Idle;
        loop {
            match self.events.try_recv() {
                Ok(event) => {
                    on_event(target, event);
                    turn = Turn::Progress;
                }
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            }
        }
        if target
            .next_deadline()
            .is_some_and(|deadline| deadline <= self.clock.now())
        {
            target.poll();
            turn = Turn::Progress;
        }
        turn
    }

    /// Wait for the next event or the earliest deadline, then handle
    /// whatever became ready.
    pub fn turn<T, F>(&self, target: &mut T, on_event: &mut F) -> Turn
    where
        T: Timed + ?Sized,
        F: FnMut(&mut T, E),
    {
        if self.pump(target, on_event) == Turn::Progress {
            return Turn::Progress;
        }
        let received = match target.next_deadline() {
            Some(deadline) => {
                let wait = deadline.saturating_sub(self.clock.now());
                match self.events.recv_timeout(wait) {
                    Ok(event) => Some(event),
                    Err(RecvTimeoutError::Timeout) => None,
                    Err(RecvTimeoutError::Disconnected) => {
                        self.clock.sleep_until(deadline);
                        None
                    }
                }
            }
            None => match self.events.recv() {
                Ok(event) => Some(event),
                Err(_) => return Turn::Closed,
            },
        };
        if let Some(event) = received {
            on_event(target, event);
        }
        self.pump(target, on_event);
        Turn::Progress
    }

    /// Run turns until `done` holds or no further progress is possible.
    pub fn run_until<T, F, P>(&self, target: &mut T, mut on_event: F, mut done: P)
    where
        T: Timed + ?Sized,
        F: FnMut(&mut T, E),
        P: FnMut(&T) -> bool,
    {
        while !done(target) {
            if self.turn(target, &mut on_event) == Turn::Closed {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Alarm {
        deadline: Option<Duration>,
        fired: u32,
    }

    impl Timed for Alarm {
        fn next_deadline(&self) -> Option<Duration> {
            self.deadline
        }

        fn poll(&mut self) {
            self.deadline = None;
            self.fired += 1;
        }
    }

    #[test]
    fn manual_clock_advances_explicitly() {
        let clock = ManualClock::new();
        assert_eq!(clock.now(), Duration::ZERO);
        clock.advance_ms(250);
        assert_eq!(clock.now(), Duration::from_millis(250));
        clock.set_time(Duration::from_secs(2));
        assert_eq!(clock.current_time(), Duration::from_secs(2));
    }

    #[test]
    fn manual_clock_sleep_returns_once_time_passes() {
        let clock = ManualClock::new();
        let sleeper = clock.clone();
        let handle = thread::spawn(move || {
            sleeper.sleep_until(Duration::from_millis(10));
            sleeper.now()
        });
        thread::sleep(Duration::from_millis(5));
        clock.advance_ms(4);
        clock.advance_ms(6);
        assert_eq!(handle.join().unwrap(), Duration::from_millis(10));
    }

    #[test]
    fn earliest_prefers_the_smaller_deadline() {
        let a = Some(Duration::from_millis(5));
        let b = Some(Duration::from_millis(3));
        assert_eq!(earliest(a, b), b);
        assert_eq!(earliest(a, None), a);
        assert_eq!(earliest(None, None), None);
    }

    #[test]
    fn pump_handles_events_before_timers() {
        let clock = ManualClock::new();
        let (event_loop, sender) = EventLoop::channel(clock.clone());
        let mut alarm = Alarm::default();
        sender.send(Duration::from_millis(20)).unwrap();
        let mut arm = |alarm: &mut Alarm, at: Duration| alarm.deadline = Some(at);

        assert_eq!(event_loop.pump(&mut alarm, &mut arm), Turn::Progress);
        assert_eq!(alarm.fired, 0);
        assert_eq!(event_loop.pump(&mut alarm, &mut arm), Turn::Idle);

        clock.advance_ms(20);
        assert_eq!(event_loop.pump(&mut alarm, &mut arm), Turn::Progress);
        assert_eq!(alarm.fired, 1);
    }

    #[test]
    fn run_until_stops_when_senders_are_gone() {
        let (event_loop, sender) = EventLoop::channel(StdClock::new());
        let producer = thread::spawn(move || {
            for value in 1..=3u32 {
                sender.send(value).unwrap();
            }
        });
        producer.join().unwrap();
        let mut alarm = Alarm::default();
        let mut seen = Vec::new();
        event_loop.run_until(&mut alarm, |_, value| seen.push(value), |_| false);
        assert_eq!(seen, vec![1, 2, 3]);
    }

    #[test]
    fn run_until_fires_timers_on_the_loop_thread() {
        let (event_loop, _sender) = EventLoop::<_, ()>::channel(StdClock::new());
        let mut alarm = Alarm {
            deadline: Some(event_loop.clock().now() + Duration::from_millis(5)),
            fired: 0,
        };
        event_loop.run_until(&mut alarm, |_, ()| {}, |alarm| alarm.fired == 1);
        assert_eq!(alarm.fired, 1);
    }
}
