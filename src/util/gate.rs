//! A one-shot gate releasing all waiters at once.

use std::sync::{Condvar, Mutex};

/// A one-shot gate on which any number of threads can block until it is
/// opened.
///
/// Once opened, the gate stays open: later waiters return immediately.
/// Opening an already open gate has no effect.
pub(crate) struct Gate {
    opened: Mutex<bool>,
    condvar: Condvar,
}

impl Gate {
    /// Creates a closed gate.
    pub(crate) fn new() -> Self {
        Self {
            opened: Mutex::new(false),
            condvar: Condvar::new(),
        }
    }

    /// Opens the gate, releasing all present and future waiters.
    pub(crate) fn open(&self) {
        *self.opened.lock().unwrap() = true;
        self.condvar.notify_all();
    }

    /// Blocks until the gate is opened.
    pub(crate) fn wait(&self) {
        let mut opened = self.opened.lock().unwrap();
        while !*opened {
            opened = self.condvar.wait(opened).unwrap();
        }
    }
}
