//! Double-buffered, latest-wins input.

use std::cell::UnsafeCell;
use std::fmt;
use std::ops::Deref;
use std::sync::{Arc, Condvar, Mutex};

use crate::ports::{InputPort, PortWriter};

/// Cell bookkeeping, protected by the state mutex.
struct State {
    /// Index of the cell holding the freshest value.
    front: usize,
    /// Cell currently being written, if any.
    writing: Option<usize>,
    /// Number of live read handles per cell.
    readers: [usize; 2],
    /// Whether a value (or a default) was ever received.
    has_value: bool,
}

/// The shared data of a `SampledInput`.
struct Inner<T> {
    cells: [UnsafeCell<Option<T>>; 2],
    state: Mutex<State>,
    /// Signaled when a cell's reader count drops to zero.
    cell_freed: Condvar,
    /// Serializes writers so cell selection stays race-free.
    write_lock: Mutex<()>,
    callback: Option<Box<dyn Fn(&T) + Send + Sync>>,
}

// Safety: all access to `cells` is arbitrated through `state`: a cell is
// written only while no read handle targets it and `writing` designates it,
// which keeps new read handles away until the write completes; read handles
// only take shared references.
unsafe impl<T: Send> Send for Inner<T> {}
unsafe impl<T: Send + Sync> Sync for Inner<T> {}

impl<T> Inner<T> {
    fn write(&self, value: T) {
        let _write_guard = self.write_lock.lock().unwrap();

        // Pick the cell no reader currently holds, preferring the spare one.
        // When both cells are held, wait for a read handle to be released.
        let target = {
            let mut state = self.state.lock().unwrap();
            let target = loop {
                let spare = 1 - state.front;
                if state.readers[spare] == 0 {
                    break spare;
                }
                if state.readers[state.front] == 0 {
                    break state.front;
                }
                state = self.cell_freed.wait(state).unwrap();
            };
            state.writing = Some(target);
            target
        };

        // Safety: `target` has no readers, `writing` redirects new readers
        // away from it and `write_lock` excludes other writers.
        unsafe { *self.cells[target].get() = Some(value) };

        let mut state = self.state.lock().unwrap();
        state.writing = None;
        state.front = target;
        state.has_value = true;
        drop(state);

        if let Some(callback) = &self.callback {
            // Safety: `write_lock` is still held, so the freshly written cell
            // cannot be selected for another write; concurrent readers only
            // take shared references.
            let value = unsafe { &*self.cells[target].get() };
            callback(value.as_ref().unwrap());
        }
    }
}

/// An input port retaining the freshest received value.
///
/// The input keeps two value cells so a writer always has a cell that no
/// reader is holding: readers pull the latest value with [`get`](Self::get)
/// without ever blocking a writer beyond brief critical sections, and writes
/// overwrite older unread values. There is no first-in-first-out guarantee,
/// only latest-visible semantics.
///
/// An optional callback is invoked, on the writer's thread, after each
/// received value.
pub struct SampledInput<T> {
    inner: Arc<Inner<T>>,
}

impl<T: Send + Sync + 'static> SampledInput<T> {
    /// Creates an input port with no initial value.
    pub fn new() -> Self {
        Self::with_parts(None, None)
    }

    /// Creates an input port holding a default value.
    pub fn with_default(default: T) -> Self {
        Self::with_parts(Some(default), None)
    }

    /// Creates an input port with no initial value, invoking the provided
    /// callback after each received value.
    pub fn with_callback<F>(callback: F) -> Self
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        Self::with_parts(None, Some(Box::new(callback)))
    }

    /// Creates an input port holding a default value, invoking the provided
    /// callback after each received value.
    pub fn with_default_and_callback<F>(default: T, callback: F) -> Self
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        Self::with_parts(Some(default), Some(Box::new(callback)))
    }

    fn with_parts(default: Option<T>, callback: Option<Box<dyn Fn(&T) + Send + Sync>>) -> Self {
        let has_value = default.is_some();

        Self {
            inner: Arc::new(Inner {
                cells: [UnsafeCell::new(default), UnsafeCell::new(None)],
                state: Mutex::new(State {
                    front: 0,
                    writing: None,
                    readers: [0, 0],
                    has_value,
                }),
                cell_freed: Condvar::new(),
                write_lock: Mutex::new(()),
                callback,
            }),
        }
    }

    /// Returns a handle to the freshest received value, or `None` if no
    /// value was ever received.
    ///
    /// The value is pinned for the lifetime of the handle: a writer that
    /// needs the cell waits until the handle is dropped. Handles should
    /// therefore be short-lived.
    pub fn get(&self) -> Option<Sample<'_, T>> {
        let inner = &*self.inner;
        let mut state = inner.state.lock().unwrap();
        if !state.has_value {
            return None;
        }

        // Read the freshest cell, or the spare one if a writer has taken the
        // freshest cell in the meantime.
        let cell = if state.writing == Some(state.front) {
            1 - state.front
        } else {
            state.front
        };
        state.readers[cell] += 1;
        drop(state);

        Some(Sample { inner, cell })
    }
}

impl<T: Send + Sync + 'static> InputPort<T> for SampledInput<T> {
    type Writer = SampledInputWriter<T>;

    fn writer(&self) -> Self::Writer {
        SampledInputWriter {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Send + Sync + 'static> Default for SampledInput<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for SampledInput<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> fmt::Debug for SampledInput<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("SampledInput").finish_non_exhaustive()
    }
}

/// A writer handle of a `SampledInput`.
pub struct SampledInputWriter<T> {
    inner: Arc<Inner<T>>,
}

impl<T: Send + Sync + 'static> PortWriter<T> for SampledInputWriter<T> {
    fn write(&self, value: T) {
        self.inner.write(value);
    }
}

impl<T> fmt::Debug for SampledInputWriter<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("SampledInputWriter").finish_non_exhaustive()
    }
}

/// A scoped handle to the freshest value of a [`SampledInput`].
pub struct Sample<'a, T> {
    inner: &'a Inner<T>,
    cell: usize,
}

impl<T> Deref for Sample<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // Safety: the reader count of `cell` is non-zero so no writer can
        // select it, and the cell held a value when the handle was created.
        unsafe { (*self.inner.cells[self.cell].get()).as_ref().unwrap() }
    }
}

impl<T> Drop for Sample<'_, T> {
    fn drop(&mut self) {
        let mut state = self.inner.state.lock().unwrap();
        state.readers[self.cell] -= 1;
        if state.readers[self.cell] == 0 {
            drop(state);
            self.inner.cell_freed.notify_all();
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Sample<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(&**self, f)
    }
}
