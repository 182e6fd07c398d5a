//! Single-writer, multiple-readers cell holding the engine time, based on a
//! fully safe seqlock implementation.

use std::cell::Cell;
use std::hint;
use std::marker::PhantomData;
use std::sync::atomic::{fence, AtomicI64, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use super::TimePoint;

/// The shared storage of a `TimeCell`.
///
/// Each field is stored in its own atomic so a racing load can never produce
/// an invalid `TimePoint`, merely an inconsistent one, which the sequence
/// check then discards.
struct Inner {
    sequence: AtomicUsize,
    time: AtomicU64,
    timestamp: AtomicI64,
    rate: AtomicU64,
}

impl Inner {
    fn load(&self) -> TimePoint {
        TimePoint {
            time: f64::from_bits(self.time.load(Ordering::Relaxed)),
            timestamp: self.timestamp.load(Ordering::Relaxed),
            rate: f64::from_bits(self.rate.load(Ordering::Relaxed)),
        }
    }

    fn store(&self, value: TimePoint) {
        self.time.store(value.time.to_bits(), Ordering::Relaxed);
        self.timestamp.store(value.timestamp, Ordering::Relaxed);
        self.rate.store(value.rate.to_bits(), Ordering::Relaxed);
    }
}

/// The writing side of the cell.
///
/// `TimeCell` is restricted to a single writer, which is the `TimeCell`
/// object itself. This makes it possible to increment the sequence count with
/// simple loads and stores instead of more expensive read-modify-write atomic
/// operations. Thread-safe reader handles are obtained with the `reader`
/// method.
pub(crate) struct TimeCell {
    inner: Arc<Inner>,
    _non_sync_phantom: PhantomData<Cell<()>>,
}

impl TimeCell {
    /// Creates a cell holding the provided initial time.
    pub(crate) fn new(initial: TimePoint) -> Self {
        let inner = Inner {
            sequence: AtomicUsize::new(0),
            time: AtomicU64::new(initial.time.to_bits()),
            timestamp: AtomicI64::new(initial.timestamp),
            rate: AtomicU64::new(initial.rate.to_bits()),
        };

        Self {
            inner: Arc::new(inner),
            _non_sync_phantom: PhantomData,
        }
    }

    /// Publishes a new time.
    pub(crate) fn write(&self, value: TimePoint) {
        // Increment the sequence count to an odd number.
        //
        // Note: this thread is the only one that can change the sequence
        // count so even a plain load will always return the last sequence
        // count.
        let seq = self.inner.sequence.load(Ordering::Relaxed);
        self.inner
            .sequence
            .store(seq.wrapping_add(1), Ordering::Relaxed);

        // Ordering: this Release fence synchronizes with the Acquire fence in
        // `TimeCellReader::read` and ensures that the above increment to an
        // odd sequence count is visible to a reader that observes a partially
        // updated value.
        fence(Ordering::Release);
        self.inner.store(value);

        // Increment the sequence count to an even number.
        //
        // Ordering: this Release store synchronizes with the Acquire load of
        // the sequence count at the beginning of `TimeCellReader::read` and
        // ensures that if the loaded sequence count is indeed even, then the
        // value was fully written (though it may have been later
        // overwritten).
        self.inner
            .sequence
            .store(seq.wrapping_add(2), Ordering::Release);
    }

    /// Returns a reader handle.
    pub(crate) fn reader(&self) -> TimeCellReader {
        TimeCellReader {
            inner: self.inner.clone(),
        }
    }
}

/// A handle to a `TimeCell` that enables synchronized reads from multiple
/// threads.
#[derive(Clone)]
pub(crate) struct TimeCellReader {
    inner: Arc<Inner>,
}

impl TimeCellReader {
    /// Reads the last fully published time.
    ///
    /// Writes are wait-free and brief, so a read that races with a write
    /// simply retries.
    pub(crate) fn read(&self) -> TimePoint {
        loop {
            // Ordering: this Acquire load synchronizes with the Release store
            // of an even sequence count at the end of `TimeCell::write` and
            // ensures that if the sequence count is indeed even, then the
            // value stored before the sequence count was set was fully
            // written.
            let seq = self.inner.sequence.load(Ordering::Acquire);
            if seq & 1 != 0 {
                hint::spin_loop();
                continue;
            }

            let value = self.inner.load();

            // Ordering: this Acquire fence synchronizes with the Release
            // fence in `TimeCell::write` and ensures that the below read of
            // the sequence count sees the increment to an odd sequence count
            // that precedes a concurrent store, if any.
            fence(Ordering::Acquire);

            if self.inner.sequence.load(Ordering::Relaxed) == seq {
                return value;
            }

            hint::spin_loop();
        }
    }
}
