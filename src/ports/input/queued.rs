//! Bounded, buffered input delivering values to a callback on worker
//! threads.

use std::fmt;
use std::ops::Deref;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};

use crate::engine::Engine;
use crate::ports::{InputPort, PortWriter};

/// The ring buffer and its positions, protected by a single mutex.
struct Ring<T> {
    buffer: Box<[Option<T>]>,
    front: usize,
    back: usize,
    full: bool,
}

impl<T> Ring<T> {
    fn is_empty(&self) -> bool {
        !self.full && self.front == self.back
    }
}

/// The shared data of a `CallbackInput`.
struct Inner<T> {
    ring: Mutex<Ring<T>>,
    /// Signaled when the front slot is released.
    slot_freed: Condvar,
    /// Held from dequeue to release so only one consumer drains at a time.
    consume_lock: Mutex<()>,
    callback: Box<dyn Fn(&T) + Send + Sync>,
    engine: Engine,
}

impl<T> Inner<T> {
    /// Commits a value to the ring, waiting for a free slot if the ring is
    /// full.
    fn commit(&self, value: T) {
        let mut ring = self.ring.lock().unwrap();
        while ring.full {
            ring = self.slot_freed.wait(ring).unwrap();
        }

        let back = ring.back;
        ring.buffer[back] = Some(value);
        ring.back = (back + 1) % ring.buffer.len();
        ring.full = ring.back == ring.front;
    }

    /// Dequeues the front value, or returns `None` if the ring is empty.
    fn pop(&self) -> Option<Dequeued<'_, T>> {
        let consume_guard = self.consume_lock.lock().unwrap();

        let mut ring = self.ring.lock().unwrap();
        if ring.is_empty() {
            return None;
        }
        let front = ring.front;
        let value = ring.buffer[front].take().unwrap();
        drop(ring);

        Some(Dequeued {
            inner: self,
            value,
            _consume_guard: consume_guard,
        })
    }

    /// Releases the front slot. Called when a `Dequeued` handle is dropped.
    fn release_front(&self) {
        let mut ring = self.ring.lock().unwrap();
        ring.front = (ring.front + 1) % ring.buffer.len();
        ring.full = false;
        drop(ring);

        self.slot_freed.notify_one();
    }
}

/// An input port buffering values and delivering them to a callback on a
/// worker thread.
///
/// Received values are committed to a ring of fixed capacity; each
/// committed value is consumed exactly once, in first-in-first-out order, by
/// a deferred invocation of the callback on the engine's worker pool. When
/// the ring is full the producing `write` blocks until the consumer releases
/// a slot, providing back-pressure.
pub struct CallbackInput<T> {
    inner: Arc<Inner<T>>,
}

impl<T: Send + 'static> CallbackInput<T> {
    /// Capacity used by [`new`](Self::new).
    pub const DEFAULT_QUEUE_SIZE: usize = 10;

    /// Creates an input port with the default capacity, invoking the
    /// provided callback with each received value.
    pub fn new<F>(engine: &Engine, callback: F) -> Self
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        Self::with_capacity(engine, callback, Self::DEFAULT_QUEUE_SIZE)
    }

    /// Creates an input port with the specified capacity.
    ///
    /// # Panics
    ///
    /// This will panic if the specified capacity is zero.
    pub fn with_capacity<F>(engine: &Engine, callback: F, queue_size: usize) -> Self
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        assert!(queue_size >= 1, "the queue capacity should be at least one");

        let buffer: Box<[Option<T>]> = (0..queue_size).map(|_| None).collect();

        Self {
            inner: Arc::new(Inner {
                ring: Mutex::new(Ring {
                    buffer,
                    front: 0,
                    back: 0,
                    full: false,
                }),
                slot_freed: Condvar::new(),
                consume_lock: Mutex::new(()),
                callback: Box::new(callback),
                engine: engine.clone(),
            }),
        }
    }

    /// Dequeues the oldest buffered value, or returns `None` if the buffer
    /// is empty.
    ///
    /// The buffered slot is released when the returned handle is dropped;
    /// until then no other consumer can dequeue.
    pub fn get(&self) -> Option<Dequeued<'_, T>> {
        self.inner.pop()
    }
}

impl<T: Send + 'static> InputPort<T> for CallbackInput<T> {
    type Writer = CallbackInputWriter<T>;

    fn writer(&self) -> Self::Writer {
        CallbackInputWriter {
            inner: self.inner.clone(),
        }
    }
}

impl<T> Clone for CallbackInput<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> fmt::Debug for CallbackInput<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("CallbackInput").finish_non_exhaustive()
    }
}

/// A writer handle of a `CallbackInput`.
pub struct CallbackInputWriter<T> {
    inner: Arc<Inner<T>>,
}

impl<T: Send + 'static> PortWriter<T> for CallbackInputWriter<T> {
    /// Commits the value to the ring, blocking while the ring is full, and
    /// schedules its consumption on the worker pool.
    fn write(&self, value: T) {
        self.inner.commit(value);

        let inner = self.inner.clone();
        self.inner.engine.push_callback(move || {
            if let Some(value) = inner.pop() {
                (inner.callback)(&value);
            }
        });
    }
}

impl<T> fmt::Debug for CallbackInputWriter<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("CallbackInputWriter").finish_non_exhaustive()
    }
}

/// A scoped handle to the oldest buffered value of a [`CallbackInput`].
///
/// Dropping the handle releases the slot, unblocking one producer waiting
/// for capacity.
pub struct Dequeued<'a, T> {
    inner: &'a Inner<T>,
    value: T,
    _consume_guard: MutexGuard<'a, ()>,
}

impl<T> Deref for Dequeued<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T> Drop for Dequeued<'_, T> {
    fn drop(&mut self) {
        self.inner.release_front();
    }
}

impl<T: fmt::Debug> fmt::Debug for Dequeued<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(&**self, f)
    }
}
