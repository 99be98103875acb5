//! Observer registration for single-threaded components.

use std::fmt;

/// Ordered list of handlers invoked with each emitted value.
///
/// Handlers run in subscription order on the emitting thread.
pub struct Signal<T> {
    handlers: Vec<Box<dyn FnMut(&T)>>,
}

impl<T> Signal<T> {
    /// Signal with no handlers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    /// Register a handler.
    pub fn subscribe(&mut self, handler: impl FnMut(&T) + 'static) {
        self.handlers.push(Box::new(handler));
    }

    /// Invoke every handler with `value`.
    pub fn emit(&mut self, value: &T) {
        for handler in &mut self.handlers {
            handler(value);
        }
    }

    /// Number of registered handlers.
    #[must_use]
    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }
}

impl<T> Default for Signal<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("handlers", &self.handlers.len())
            .finish()
    }
}
