//! The execution engine: lifecycle phases, deferred callbacks and timers.
//!
//! An [`Engine`] drives a graph of nodes with three cooperating facilities:
//!
//! * a set of *lifecycle tasks*, each combining up to three phases: an
//!   *init* callback run once before the engine starts, a *poll* callback
//!   run repeatedly while the engine runs, and a *shutdown* callback run
//!   once after it stops,
//! * a *timer scheduler* sampling the engine clock on a dedicated thread and
//!   dispatching periodic callbacks,
//! * a pool of *worker threads* draining a FIFO queue of deferred callbacks.
//!
//! Tasks and timers are registered before [`run`](Engine::run) is called;
//! `run` then drives initialization to completion, transitions the engine to
//! the running state and blocks until [`stop`](Engine::stop). If any init
//! callback fails the engine never transitions to running: poll callbacks
//! are skipped, registered shutdown callbacks still run and `run` returns
//! [`RunError::InitFailed`].
//!
//! `Engine` is a cheap clonable handle: clones share the same underlying
//! engine and any clone may be captured by node callbacks, for instance to
//! query the current time or to request a stop.
//!
//! # Examples
//!
//! ```
//! use fluxion::engine::Engine;
//!
//! let engine = Engine::new();
//!
//! // Report the start of the run.
//! engine.create_init_callback(|| {
//!     println!("starting");
//!     true
//! });
//!
//! // Stop the engine once its clock reaches 50ms.
//! let handle = engine.clone();
//! engine.create_poll_callback(move || {
//!     if handle.get_time().time >= 0.05 {
//!         handle.stop();
//!     }
//!     true
//! });
//!
//! engine.run().unwrap();
//! ```

mod task;
mod timer;
mod worker;

use std::error::Error;
use std::fmt;
use std::mem;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};

use crossbeam_utils::CachePadded;
use tracing::{debug, error, info};

use crate::time::{TimeCell, TimeCellReader, TimePoint, TimeSource};
use crate::util::gate::Gate;

use self::timer::TimerEntry;
use self::worker::WorkQueue;

/// Number of worker threads spawned by [`Engine::run`].
const DEFAULT_NUM_WORKERS: usize = 4;

/// The shared state of an `Engine` and its clones.
struct Inner {
    /// Opened when `run` starts the init phase.
    init_gate: Gate,
    /// Opened once the outcome of the init phase is decided.
    run_gate: Gate,
    /// Opened when the engine stops.
    stop_gate: Gate,
    /// True from the end of a successful init phase until `stop`.
    running: CachePadded<AtomicBool>,
    /// Cleared permanently when any init callback fails.
    init_valid: AtomicBool,
    /// Set when `run` is first called.
    started: AtomicBool,
    /// Number of registered init phases that have not completed yet.
    init_count: Mutex<usize>,
    init_done: Condvar,
    /// The deferred-callback queue, shared with the worker pool.
    queue: WorkQueue,
    time_reader: TimeCellReader,
    /// The writing side of the time cell, taken by the timing thread.
    time_cell: Mutex<Option<TimeCell>>,
    time_source: Mutex<Option<Box<dyn TimeSource>>>,
    /// Timer records; written before `run`, then owned by the timing thread.
    timers: Mutex<Vec<TimerEntry>>,
    threads: Mutex<Vec<JoinHandle<()>>>,
}

impl Inner {
    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Accounts for one more registered init phase.
    fn register_init(&self) {
        *self.init_count.lock().unwrap() += 1;
    }

    /// Publishes the outcome of one init phase.
    fn complete_init(&self, valid: bool) {
        if !valid {
            // The flag must be cleared before the count is decremented so
            // that `run` cannot observe a completed init phase as valid.
            self.init_valid.store(false, Ordering::SeqCst);
            error!("an init callback failed");
        }

        let mut count = self.init_count.lock().unwrap();
        *count -= 1;
        if *count == 0 {
            drop(count);
            self.init_done.notify_all();
        }
    }
}

/// The dataflow execution engine.
///
/// See the [module-level documentation](self) for details and examples.
#[derive(Clone)]
pub struct Engine {
    inner: Arc<Inner>,
}

impl Engine {
    /// Creates a new engine.
    pub fn new() -> Self {
        let time_cell = TimeCell::new(TimePoint::default());

        Self {
            inner: Arc::new(Inner {
                init_gate: Gate::new(),
                run_gate: Gate::new(),
                stop_gate: Gate::new(),
                running: CachePadded::new(AtomicBool::new(false)),
                init_valid: AtomicBool::new(true),
                started: AtomicBool::new(false),
                init_count: Mutex::new(0),
                init_done: Condvar::new(),
                queue: WorkQueue::new(),
                time_reader: time_cell.reader(),
                time_cell: Mutex::new(Some(time_cell)),
                time_source: Mutex::new(None),
                timers: Mutex::new(Vec::new()),
                threads: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Enqueues a one-shot deferred callback.
    ///
    /// The callback is executed by one of the engine's worker threads, in
    /// FIFO order with respect to other deferred callbacks. Callbacks
    /// enqueued but not yet executed when the engine stops are dropped.
    pub fn push_callback<F>(&self, callback: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.inner.queue.push(Box::new(callback));
    }

    /// Registers a task with a poll phase.
    ///
    /// The poll callback is invoked repeatedly, on a dedicated thread, while
    /// the engine is running and the callback returns `true`.
    pub fn create_poll_callback<P>(&self, poll: P)
    where
        P: FnMut() -> bool + Send + 'static,
    {
        let inner = self.inner.clone();
        self.spawn_task(move || task::poll(&inner, poll));
    }

    /// Registers a task with an init phase.
    ///
    /// The init callback is invoked once when `run` starts. A callback
    /// returning `false` fails the initialization of the whole engine: no
    /// poll callback of any task will be invoked during the run.
    pub fn create_init_callback<I>(&self, init: I)
    where
        I: FnOnce() -> bool + Send + 'static,
    {
        let inner = self.inner.clone();
        self.inner.register_init();
        self.spawn_task(move || {
            task::init(&inner, init);
        });
    }

    /// Registers a task with an init phase and a poll phase.
    ///
    /// The poll phase is skipped if initialization fails, whether in this
    /// task or in any other.
    pub fn create_init_poll_callback<I, P>(&self, init: I, poll: P)
    where
        I: FnOnce() -> bool + Send + 'static,
        P: FnMut() -> bool + Send + 'static,
    {
        let inner = self.inner.clone();
        self.inner.register_init();
        self.spawn_task(move || {
            if task::init(&inner, init) {
                task::poll(&inner, poll);
            }
        });
    }

    /// Registers a task with a poll phase and a shutdown phase.
    ///
    /// The shutdown callback is invoked once after the poll phase exits,
    /// even when the poll phase was skipped due to an initialization
    /// failure.
    pub fn create_poll_shutdown_callback<P, S>(&self, poll: P, shutdown: S)
    where
        P: FnMut() -> bool + Send + 'static,
        S: FnOnce() + Send + 'static,
    {
        let inner = self.inner.clone();
        self.spawn_task(move || {
            task::poll(&inner, poll);
            shutdown();
        });
    }

    /// Registers a task with all three phases.
    ///
    /// The shutdown callback is invoked once in all cases, including when
    /// this task's own init callback fails.
    pub fn create_init_poll_shutdown_callback<I, P, S>(&self, init: I, poll: P, shutdown: S)
    where
        I: FnOnce() -> bool + Send + 'static,
        P: FnMut() -> bool + Send + 'static,
        S: FnOnce() + Send + 'static,
    {
        let inner = self.inner.clone();
        self.inner.register_init();
        self.spawn_task(move || {
            if task::init(&inner, init) {
                task::poll(&inner, poll);
            } else {
                inner.run_gate.wait();
            }
            shutdown();
        });
    }

    /// Registers a task with a shutdown phase.
    ///
    /// The shutdown callback is invoked once when the engine stops, or
    /// without further wait when initialization fails.
    pub fn create_shutdown_callback<S>(&self, shutdown: S)
    where
        S: FnOnce() + Send + 'static,
    {
        let inner = self.inner.clone();
        self.spawn_task(move || {
            task::wait_stopped(&inner);
            shutdown();
        });
    }

    /// Registers a periodic timer callback.
    ///
    /// Once the engine runs, the callback is invoked with the current time
    /// every `period` seconds, via the deferred-callback queue. When the
    /// engine clock jumps by more than one period between two sampling
    /// passes, the callback is still dispatched at most once per pass: late
    /// ticks are not replayed.
    ///
    /// # Panics
    ///
    /// This will panic if the period is not strictly positive or if the
    /// engine has already started.
    pub fn create_timer_callback<F>(&self, period: f64, callback: F)
    where
        F: FnMut(TimePoint) + Send + 'static,
    {
        assert!(period > 0.0, "the timer period should be strictly positive");
        assert!(
            !self.inner.started.load(Ordering::SeqCst),
            "timer callbacks cannot be registered once the engine has started"
        );

        self.inner.timers.lock().unwrap().push(TimerEntry {
            period,
            next_time: 0.0,
            callback: Arc::new(Mutex::new(callback)),
        });
    }

    /// Installs a time source, replacing the default system clock.
    ///
    /// # Panics
    ///
    /// This will panic if the engine has already started.
    pub fn set_time_source<S>(&self, source: S)
    where
        S: TimeSource + 'static,
    {
        assert!(
            !self.inner.started.load(Ordering::SeqCst),
            "the time source cannot be changed once the engine has started"
        );

        *self.inner.time_source.lock().unwrap() = Some(Box::new(source));
    }

    /// Returns the engine time last published by the timing thread.
    ///
    /// Before the timing thread publishes its first sample this is the
    /// origin of engine time.
    pub fn get_time(&self) -> TimePoint {
        self.inner.time_reader.read()
    }

    /// Runs the engine with the default number of worker threads.
    ///
    /// See [`run_with`](Self::run_with).
    pub fn run(&self) -> Result<(), RunError> {
        self.run_with(DEFAULT_NUM_WORKERS)
    }

    /// Runs the engine.
    ///
    /// This spawns the timing thread and `num_workers` worker threads
    /// (clamped to at least one), releases all registered init callbacks
    /// and, once they all completed successfully, transitions the engine to
    /// the running state. The call then blocks until [`stop`](Self::stop)
    /// is called and all background threads have terminated.
    pub fn run_with(&self, num_workers: usize) -> Result<(), RunError> {
        if self.inner.started.swap(true, Ordering::SeqCst) {
            return Err(RunError::AlreadyStarted);
        }
        let num_workers = num_workers.max(1);

        debug!(num_workers, "starting the engine");

        // The timing thread takes ownership of the time cell, the time
        // source and the timer records.
        {
            let inner = self.inner.clone();
            let cell = self.inner.time_cell.lock().unwrap().take().unwrap();
            let source = self.inner.time_source.lock().unwrap().take();
            let timers = mem::take(&mut *self.inner.timers.lock().unwrap());

            let handle = thread::Builder::new()
                .name("fluxion-timer".into())
                .spawn(move || timer::run(&inner, cell, source, timers))
                .expect("failed to spawn the timing thread");
            self.inner.threads.lock().unwrap().push(handle);
        }

        for (index, parker) in self
            .inner
            .queue
            .register_workers(num_workers)
            .into_iter()
            .enumerate()
        {
            let inner = self.inner.clone();
            let handle = thread::Builder::new()
                .name(format!("fluxion-worker-{index}"))
                .spawn(move || worker::run(&inner, index, parker))
                .expect("failed to spawn a worker thread");
            self.inner.threads.lock().unwrap().push(handle);
        }

        // Release the init callbacks and wait until all of them completed.
        self.inner.init_gate.open();
        {
            let mut count = self.inner.init_count.lock().unwrap();
            while *count > 0 {
                count = self.inner.init_done.wait(count).unwrap();
            }
        }

        let valid = self.inner.init_valid.load(Ordering::SeqCst);
        if valid {
            self.inner.running.store(true, Ordering::SeqCst);
            info!("engine running");
        } else {
            error!("initialization failed, the engine will not run");
        }
        self.inner.run_gate.open();

        let handles: Vec<_> = self.inner.threads.lock().unwrap().drain(..).collect();
        for handle in handles {
            if handle.join().is_err() {
                error!("a background task panicked");
            }
        }

        debug!("engine terminated");

        if valid {
            Ok(())
        } else {
            Err(RunError::InitFailed)
        }
    }

    /// Stops the engine.
    ///
    /// All poll loops exit once they observe the stop, shutdown callbacks
    /// run and [`run`](Self::run) returns. Deferred callbacks still queued
    /// are dropped. This method is thread-safe and returns without waiting
    /// for the engine to finish stopping.
    pub fn stop(&self) {
        debug!("engine stop requested");
        self.inner.running.store(false, Ordering::SeqCst);
        self.inner.stop_gate.open();
        self.inner.queue.wake_all();
    }

    /// Spawns a dedicated thread for a lifecycle task.
    fn spawn_task<F>(&self, body: F)
    where
        F: FnOnce() + Send + 'static,
    {
        assert!(
            !self.inner.started.load(Ordering::SeqCst),
            "tasks cannot be registered once the engine has started"
        );

        let mut threads = self.inner.threads.lock().unwrap();
        let handle = thread::Builder::new()
            .name(format!("fluxion-task-{}", threads.len()))
            .spawn(body)
            .expect("failed to spawn a task thread");
        threads.push(handle);
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Engine")
            .field("running", &self.inner.is_running())
            .finish_non_exhaustive()
    }
}

/// An error returned when the engine cannot run to completion.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RunError {
    /// An init callback returned `false`, so the engine never transitioned
    /// to the running state.
    InitFailed,
    /// The engine was already run.
    AlreadyStarted,
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::InitFailed => f.write_str("an init callback failed"),
            Self::AlreadyStarted => f.write_str("the engine was already run"),
        }
    }
}

impl Error for RunError {}
