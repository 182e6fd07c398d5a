use std::fmt;
use std::sync::Mutex;

use super::PortWriter;

/// The registry of inputs connected to an output port.
///
/// Writers are invoked in registration order; the registry lock is held for
/// the whole fan-out so a value is never interleaved with another one written
/// concurrently to the same output.
pub struct FanOut<T> {
    writers: Mutex<Vec<Box<dyn PortWriter<T>>>>,
}

impl<T: 'static> FanOut<T> {
    /// Creates an empty registry.
    pub(crate) fn new() -> Self {
        Self {
            writers: Mutex::new(Vec::new()),
        }
    }

    /// Appends a writer to the registry.
    pub(crate) fn add(&self, writer: Box<dyn PortWriter<T>>) {
        self.writers.lock().unwrap().push(writer);
    }

    /// Delivers a value to every registered writer, in registration order.
    pub(crate) fn write_value(&self, value: T)
    where
        T: Clone,
    {
        let writers = self.writers.lock().unwrap();
        for writer in writers.iter() {
            writer.write(value.clone());
        }
    }

    /// Returns the number of registered writers.
    pub(crate) fn len(&self) -> usize {
        self.writers.lock().unwrap().len()
    }
}

impl<T: 'static> Default for FanOut<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> fmt::Debug for FanOut<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "FanOut ({} connected ports)", self.len())
    }
}
