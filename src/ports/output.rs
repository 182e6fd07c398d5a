use std::fmt;
use std::sync::{Arc, Mutex};

use crate::engine::Engine;

use super::{FanOut, OutputPort};

/// An output port that fans a written value out immediately.
///
/// The value is delivered to every connected input before `write` returns,
/// in connect order, on the writer's thread.
pub struct DirectOutput<T> {
    fan_out: Arc<FanOut<T>>,
}

impl<T: Clone + Send + 'static> DirectOutput<T> {
    /// Creates a new, disconnected output port.
    pub fn new() -> Self {
        Self::default()
    }
}

impl<T: Clone + Send + 'static> OutputPort<T> for DirectOutput<T> {
    fn write(&self, value: T) {
        self.fan_out.write_value(value);
    }

    fn fan_out(&self) -> &FanOut<T> {
        &self.fan_out
    }
}

impl<T> Clone for DirectOutput<T> {
    fn clone(&self) -> Self {
        Self {
            fan_out: self.fan_out.clone(),
        }
    }
}

impl<T: Clone + Send + 'static> Default for DirectOutput<T> {
    fn default() -> Self {
        Self {
            fan_out: Arc::new(FanOut::new()),
        }
    }
}

impl<T: 'static> fmt::Debug for DirectOutput<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "DirectOutput ({} connected ports)", self.fan_out.len())
    }
}

/// The shared data of a `TimedOutput`.
struct TimedInner<T> {
    fan_out: FanOut<T>,
    slot: Mutex<Option<T>>,
}

/// A rate-limited output port.
///
/// A written value is not emitted immediately but stored in an internal
/// slot, overwriting any value stored earlier. A periodic timer callback
/// fans out the latest stored value, if any: intermediate values written
/// within one period are dropped.
pub struct TimedOutput<T> {
    inner: Arc<TimedInner<T>>,
}

impl<T: Clone + Send + 'static> TimedOutput<T> {
    /// Creates a new, disconnected output port emitting at the specified
    /// period \[s\].
    pub fn new(engine: &Engine, period: f64) -> Self {
        let inner = Arc::new(TimedInner {
            fan_out: FanOut::new(),
            slot: Mutex::new(None),
        });

        let timer_inner = inner.clone();
        engine.create_timer_callback(period, move |_| {
            let value = timer_inner.slot.lock().unwrap().clone();
            if let Some(value) = value {
                timer_inner.fan_out.write_value(value);
            }
        });

        Self { inner }
    }
}

impl<T: Clone + Send + 'static> OutputPort<T> for TimedOutput<T> {
    fn write(&self, value: T) {
        *self.inner.slot.lock().unwrap() = Some(value);
    }

    fn fan_out(&self) -> &FanOut<T> {
        &self.inner.fan_out
    }
}

impl<T> Clone for TimedOutput<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: 'static> fmt::Debug for TimedOutput<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "TimedOutput ({} connected ports)", self.inner.fan_out.len())
    }
}
