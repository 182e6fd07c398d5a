//! The deferred-callback queue and its worker pool.

use std::any::Any;
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Mutex, OnceLock};

use parking::{Parker, Unparker};
use tracing::{error, trace};

use super::Inner;

/// A deferred callback.
pub(crate) type Job = Box<dyn FnOnce() + Send>;

/// The queue state, with the parked-worker mask kept under the same lock so
/// a producer and a parking worker can never miss each other.
struct QueueState {
    jobs: VecDeque<Job>,
    /// Bit mask of currently parked workers.
    parked: usize,
}

/// An unbounded MPMC FIFO queue of deferred callbacks.
///
/// Workers park when the queue is empty; a push unparks one parked worker.
pub(super) struct WorkQueue {
    state: Mutex<QueueState>,
    unparkers: OnceLock<Box<[Unparker]>>,
}

impl WorkQueue {
    pub(super) fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                jobs: VecDeque::new(),
                parked: 0,
            }),
            unparkers: OnceLock::new(),
        }
    }

    /// Creates the parker/unparker pairs for the worker pool and returns the
    /// parkers.
    ///
    /// # Panics
    ///
    /// This will panic if the pool size is more than `usize::BITS`.
    pub(super) fn register_workers(&self, num_workers: usize) -> Vec<Parker> {
        assert!(
            num_workers <= usize::BITS as usize,
            "the worker pool size should be at most {}",
            usize::BITS
        );

        let (parkers, unparkers): (Vec<_>, Vec<_>) =
            (0..num_workers).map(|_| parking::pair()).unzip();
        assert!(
            self.unparkers.set(unparkers.into_boxed_slice()).is_ok(),
            "the worker pool is only registered once"
        );

        parkers
    }

    /// Enqueues a job and unparks one parked worker, if any.
    pub(super) fn push(&self, job: Job) {
        let worker = {
            let mut state = self.state.lock().unwrap();
            state.jobs.push_back(job);

            if state.parked == 0 {
                None
            } else {
                let worker = state.parked.trailing_zeros() as usize;
                state.parked &= !(1 << worker);
                Some(worker)
            }
        };

        if let Some(worker) = worker {
            // The pool is necessarily registered since a worker was parked.
            self.unparkers.get().unwrap()[worker].unpark();
        }
    }

    /// Dequeues the oldest job, or marks the worker as parked if the queue
    /// is empty.
    fn pop_or_park(&self, worker: usize) -> Option<Job> {
        let mut state = self.state.lock().unwrap();
        match state.jobs.pop_front() {
            Some(job) => Some(job),
            None => {
                state.parked |= 1 << worker;
                None
            }
        }
    }

    /// Clears the parked bit of a worker after it was unparked.
    fn clear_parked(&self, worker: usize) {
        self.state.lock().unwrap().parked &= !(1 << worker);
    }

    /// Unparks all workers, parked or not.
    ///
    /// A worker that is between publishing its parked bit and actually
    /// parking consumes the unpark token instead, so no stop notification
    /// can be missed.
    pub(super) fn wake_all(&self) {
        if let Some(unparkers) = self.unparkers.get() {
            for unparker in unparkers.iter() {
                unparker.unpark();
            }
        }
    }
}

/// The main loop of a worker thread.
pub(super) fn run(inner: &Inner, index: usize, parker: Parker) {
    inner.run_gate.wait();

    loop {
        if !inner.is_running() {
            break;
        }

        match inner.queue.pop_or_park(index) {
            Some(job) => execute(job),
            None => {
                parker.park();
                inner.queue.clear_parked(index);
            }
        }
    }

    trace!(worker = index, "worker exiting");
}

/// Invokes a deferred callback, catching panics so a faulty callback does
/// not take the worker down.
fn execute(job: Job) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(job)) {
        error!(
            panic = payload_as_str(&payload).unwrap_or("<opaque payload>"),
            "a deferred callback panicked"
        );
    }
}

fn payload_as_str(payload: &Box<dyn Any + Send>) -> Option<&str> {
    payload
        .downcast_ref::<&'static str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
}
