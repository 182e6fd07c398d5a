pub(crate) mod queued;
pub(crate) mod sampled;

use std::fmt;
use std::sync::Arc;

use super::{InputPort, PortWriter};

/// An input port invoking a callback inline on the writer's thread.
///
/// This is the lowest-latency delivery discipline: the callback has run to
/// completion by the time the producing `write` returns. The callback must be
/// reentrant if several producers may write concurrently.
pub struct DirectInput<T> {
    callback: Arc<dyn Fn(T) + Send + Sync>,
}

impl<T: Send + 'static> DirectInput<T> {
    /// Creates an input port invoking the provided callback with each
    /// received value.
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        Self {
            callback: Arc::new(callback),
        }
    }
}

impl<T: Send + 'static> InputPort<T> for DirectInput<T> {
    type Writer = DirectInputWriter<T>;

    fn writer(&self) -> Self::Writer {
        DirectInputWriter {
            callback: self.callback.clone(),
        }
    }
}

impl<T> Clone for DirectInput<T> {
    fn clone(&self) -> Self {
        Self {
            callback: self.callback.clone(),
        }
    }
}

impl<T> fmt::Debug for DirectInput<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("DirectInput").finish_non_exhaustive()
    }
}

/// A writer handle of a `DirectInput`.
pub struct DirectInputWriter<T> {
    callback: Arc<dyn Fn(T) + Send + Sync>,
}

impl<T: Send + 'static> PortWriter<T> for DirectInputWriter<T> {
    fn write(&self, value: T) {
        (self.callback)(value);
    }
}

impl<T> fmt::Debug for DirectInputWriter<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("DirectInputWriter").finish_non_exhaustive()
    }
}
