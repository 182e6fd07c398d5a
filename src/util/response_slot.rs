//! A resettable one-shot slot handing a value from one thread to another.

use std::sync::{Condvar, Mutex};

/// A slot that a producer fulfills with a single value and a consumer takes
/// from, blocking until the value is available.
///
/// Unlike a one-shot channel, the slot can be reset and reused for a new
/// exchange once the previous value was taken.
pub(crate) struct ResponseSlot<T> {
    value: Mutex<Option<T>>,
    condvar: Condvar,
}

impl<T> ResponseSlot<T> {
    /// Creates an empty slot.
    pub(crate) fn new() -> Self {
        Self {
            value: Mutex::new(None),
            condvar: Condvar::new(),
        }
    }

    /// Discards any value left over from a previous exchange.
    pub(crate) fn reset(&self) {
        *self.value.lock().unwrap() = None;
    }

    /// Fulfills the slot and wakes the waiting consumer, if any.
    ///
    /// A value already in the slot is overwritten.
    pub(crate) fn fulfill(&self, value: T) {
        *self.value.lock().unwrap() = Some(value);
        self.condvar.notify_all();
    }

    /// Blocks until the slot is fulfilled and takes the value.
    pub(crate) fn take_blocking(&self) -> T {
        let mut value = self.value.lock().unwrap();
        loop {
            match value.take() {
                Some(value) => return value,
                None => value = self.condvar.wait(value).unwrap(),
            }
        }
    }

    /// Takes the value if the slot is fulfilled.
    pub(crate) fn try_take(&self) -> Option<T> {
        self.value.lock().unwrap().take()
    }
}
