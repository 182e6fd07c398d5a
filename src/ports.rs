//! Typed ports for node graphs.
//!
//! Nodes communicate exclusively through ports. An output port emits values;
//! an input port receives them, with the delivery discipline picked by the
//! input variant:
//!
//! * [`DirectInput`] invokes a callback inline on the writer's thread,
//! * [`SampledInput`] retains the freshest value for reader-pulled access,
//! * [`CallbackInput`] buffers values and invokes a callback on a worker
//!   thread.
//!
//! Output variants pick the emission discipline:
//!
//! * [`DirectOutput`] fans a written value out immediately,
//! * [`TimedOutput`] retains the latest written value and fans it out
//!   periodically.
//!
//! Ports are clonable. Their clones are shallow copies, meaning that all
//! clones of an output deliver to the same connected inputs, and all clones
//! of an input share the same state. This makes it possible for a node to
//! keep a port as a public member while its callbacks capture a clone of the
//! same port.
//!
//! Connections are established with [`connect`] before the engine runs and
//! last for the lifetime of the graph. Connecting one output to the same
//! input twice delivers every written value twice.

mod fan_out;
mod input;
mod output;

pub use fan_out::FanOut;
pub use input::queued::{CallbackInput, CallbackInputWriter, Dequeued};
pub use input::sampled::{Sample, SampledInput, SampledInputWriter};
pub use input::{DirectInput, DirectInputWriter};
pub use output::{DirectOutput, TimedOutput};

/// A writer handle delivering values to an input port.
///
/// Writer handles are captured by [`connect`] and stored in the output's
/// fan-out registry; they keep the input's shared state alive for as long as
/// the output remains connected.
pub trait PortWriter<T>: Send + Sync + 'static {
    /// Delivers a value to the input.
    fn write(&self, value: T);
}

/// A typed endpoint receiving values from a connected output.
pub trait InputPort<T> {
    /// The writer handle through which connected outputs deliver values.
    type Writer: PortWriter<T>;

    /// Returns a new writer handle for this input.
    ///
    /// This is called by [`connect`]; it is not meant to be called from node
    /// code.
    fn writer(&self) -> Self::Writer;
}

/// A typed endpoint emitting values to connected inputs.
pub trait OutputPort<T> {
    /// Emits a value.
    fn write(&self, value: T);

    /// Returns the fan-out registry backing this output.
    ///
    /// This is called by [`connect`]; it is not meant to be called from node
    /// code.
    fn fan_out(&self) -> &FanOut<T>;
}

/// Connects an output port to an input port.
///
/// Each value subsequently written to `output` is delivered to `input`, after
/// all inputs connected earlier. The connection is permanent; connections
/// must be established before the engine runs.
pub fn connect<T, O, I>(output: &O, input: &I)
where
    T: Clone + Send + 'static,
    O: OutputPort<T> + ?Sized,
    I: InputPort<T> + ?Sized,
{
    output.fan_out().add(Box::new(input.writer()));
}
