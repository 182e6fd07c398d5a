use std::ops::Sub;
use std::time::{SystemTime, UNIX_EPOCH};

/// A point in engine time.
///
/// The interpretation of the fields depends on the installed time provider.
///
/// With the default real-time provider:
///
/// * `time` is the elapsed time since the start of the run \[s\],
/// * `timestamp` is a Unix timestamp \[ns since the epoch\],
/// * `rate` is 1.
///
/// With a simulation or playback provider:
///
/// * `time` is the elapsed system time since the start of the simulation or
///   playback, which is not in general the elapsed real time,
/// * `timestamp` counts nanoseconds since the start of the simulation or
///   playback,
/// * `rate` is the ratio between real time and system time (e.g. 2 for a
///   simulation running twice faster than real time).
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TimePoint {
    /// Elapsed time since start \[s\].
    pub time: f64,
    /// Wall-clock or simulation timestamp \[ns\].
    pub timestamp: i64,
    /// Ratio between real time and engine time.
    pub rate: f64,
}

impl TimePoint {
    /// Returns the current wall-clock timestamp \[ns since the Unix epoch\].
    pub fn now_timestamp() -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock is set before the Unix epoch")
            .as_nanos() as i64
    }

    /// Returns the current wall-clock time, with `time` measured from the
    /// provided reference timestamp.
    pub fn now(initial_timestamp: i64) -> Self {
        let timestamp = Self::now_timestamp();

        Self {
            time: 1.0e-9 * (timestamp - initial_timestamp) as f64,
            timestamp,
            rate: 1.0,
        }
    }
}

impl Default for TimePoint {
    /// Returns the origin of engine time, with a unit rate.
    fn default() -> Self {
        Self {
            time: 0.0,
            timestamp: 0,
            rate: 1.0,
        }
    }
}

impl Sub for TimePoint {
    type Output = Duration;

    fn sub(self, rhs: Self) -> Duration {
        Duration {
            elapsed: self.time - rhs.time,
            elapsed_timestamp: self.timestamp - rhs.timestamp,
        }
    }
}

/// The difference between two [`TimePoint`]s.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Duration {
    /// Elapsed engine time \[s\].
    pub elapsed: f64,
    /// Elapsed timestamp \[ns\].
    pub elapsed_timestamp: i64,
}
