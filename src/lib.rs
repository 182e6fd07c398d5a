//! A multithreaded dataflow execution engine with typed ports and periodic
//! timers.
//!
//! Fluxion promotes a component-oriented architecture close to flow-based
//! programming: a node is an isolated entity with a fixed set of typed
//! inputs and outputs, communicating with other nodes through values
//! delivered over connections established during graph assembly.
//! Request-reply patterns are possible as well, with the helpers of the
//! [`service`] module.
//!
//! An [`Engine`](engine::Engine) drives the graph with parallel OS threads:
//! a timing thread samples the engine clock and dispatches periodic
//! callbacks, a pool of worker threads drains a queue of deferred callbacks,
//! and each registered lifecycle task runs init, poll and shutdown phases on
//! its own thread, coordinated across the whole graph.
//!
//! # A practical overview
//!
//! Building a running graph involves three distinct activities:
//!
//! 1. the design of nodes, each owning its ports and registering its
//!    callbacks against the engine,
//! 2. the assembly of a graph by connecting node ports with
//!    [`ports::connect`],
//! 3. the execution of the graph with [`Engine::run`](engine::Engine::run),
//!    which blocks until [`Engine::stop`](engine::Engine::stop) is called.
//!
//! Values written to an output port fan out to every connected input port.
//! The input variant picks the delivery discipline:
//!
//! * [`DirectInput`](ports::DirectInput) invokes a callback inline on the
//!   writer's thread,
//! * [`SampledInput`](ports::SampledInput) retains the freshest value for
//!   reader-pulled, latest-wins access,
//! * [`CallbackInput`](ports::CallbackInput) buffers values in a bounded
//!   ring, with producer back-pressure, and invokes a callback on a worker
//!   thread.
//!
//! Symmetrically, [`DirectOutput`](ports::DirectOutput) emits written values
//! immediately while [`TimedOutput`](ports::TimedOutput) emits the latest
//! written value at a fixed rate.
//!
//! # Example
//!
//! A counter node emitting at 100 Hz, sampled and printed at 25 Hz by a
//! second node, with a third node stopping the engine after 200 ms:
//!
//! ```
//! use fluxion::engine::Engine;
//! use fluxion::ports::{connect, DirectOutput, OutputPort, SampledInput};
//!
//! let engine = Engine::new();
//!
//! // A node emitting an increasing counter at 100 Hz.
//! let counter_out = DirectOutput::new();
//! {
//!     let out = counter_out.clone();
//!     let mut value = 0u64;
//!     engine.create_timer_callback(0.01, move |_| {
//!         out.write(value);
//!         value += 1;
//!     });
//! }
//!
//! // A node sampling the freshest counter value at 25 Hz.
//! let counter_in = SampledInput::with_default(0);
//! connect(&counter_out, &counter_in);
//! {
//!     let input = counter_in.clone();
//!     engine.create_timer_callback(0.04, move |time| {
//!         if let Some(value) = input.get() {
//!             println!("t = {:.2} s: counter = {}", time.time, *value);
//!         }
//!     });
//! }
//!
//! // A node stopping the engine after 200 ms.
//! let handle = engine.clone();
//! engine.create_poll_callback(move || {
//!     if handle.get_time().time < 0.2 {
//!         true
//!     } else {
//!         handle.stop();
//!         false
//!     }
//! });
//!
//! engine.run().unwrap();
//! ```
//!
//! # Ordering guarantees
//!
//! * Within a single output, inputs receive each written value in connect
//!   order, and two values written by the same producer are delivered in
//!   write order.
//! * Deferred callbacks are popped from the queue in FIFO order, but their
//!   execution may interleave arbitrarily across worker threads.
//! * A [`SampledInput`](ports::SampledInput) provides no FIFO guarantee,
//!   only latest-visible semantics; a [`CallbackInput`](ports::CallbackInput)
//!   consumes every committed value exactly once, in commit order.
#![warn(missing_docs, missing_debug_implementations, unreachable_pub)]

pub mod engine;
pub mod ports;
pub mod service;
pub mod time;
pub(crate) mod util;
