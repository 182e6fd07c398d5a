//! The timing thread.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::trace;

use crate::time::{TimeCell, TimePoint, TimeSource};

use super::Inner;

/// Minimum wall-clock pause between two sampling passes.
const MIN_TICK: Duration = Duration::from_micros(20);
/// Maximum wall-clock pause, bounding the latency with which a stop request
/// is observed.
const MAX_TICK: Duration = Duration::from_millis(1);
/// Pause between two samples of a custom time source, whose time scale is
/// unrelated to wall time.
const SOURCE_TICK: Duration = Duration::from_micros(100);

/// A periodic callback record.
pub(super) struct TimerEntry {
    /// Dispatch period \[s\].
    pub(super) period: f64,
    /// Engine time of the next dispatch \[s\].
    pub(super) next_time: f64,
    pub(super) callback: Arc<Mutex<dyn FnMut(TimePoint) + Send>>,
}

/// The main loop of the timing thread.
///
/// Each pass samples the time source, publishes the new engine time and
/// enqueues a deferred callback for every timer that came due. A timer is
/// dispatched at most once per pass even when the engine time jumped by
/// several periods, and its next due time advances by exactly one period per
/// dispatch.
pub(super) fn run(
    inner: &Inner,
    cell: TimeCell,
    mut source: Option<Box<dyn TimeSource>>,
    mut timers: Vec<TimerEntry>,
) {
    inner.run_gate.wait();
    if !inner.is_running() {
        return;
    }

    let initial_timestamp = TimePoint::now_timestamp();

    while inner.is_running() {
        let new_time = match &mut source {
            Some(source) => source.now(),
            None => TimePoint::now(initial_timestamp),
        };
        cell.write(new_time);

        for entry in &mut timers {
            if entry.next_time < new_time.time {
                trace!(
                    period = entry.period,
                    time = new_time.time,
                    "dispatching a timer callback"
                );

                // The time is captured by value: the callback observes the
                // time of the pass that dispatched it.
                let callback = entry.callback.clone();
                inner.queue.push(Box::new(move || {
                    let mut callback = callback.lock().unwrap();
                    (&mut *callback)(new_time);
                }));

                entry.next_time += entry.period;
            }
        }

        spin_sleep::sleep(pause(&timers, new_time.time, source.is_some()));
    }
}

/// Returns the wall-clock pause before the next sampling pass.
fn pause(timers: &[TimerEntry], now: f64, has_source: bool) -> Duration {
    if has_source {
        return SOURCE_TICK;
    }

    let next_due = timers
        .iter()
        .fold(f64::INFINITY, |next, entry| next.min(entry.next_time - now));

    if next_due.is_finite() {
        Duration::from_secs_f64(next_due.max(0.0)).clamp(MIN_TICK, MAX_TICK)
    } else {
        MAX_TICK
    }
}
