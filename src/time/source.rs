use super::TimePoint;

/// A provider of the engine's current time.
///
/// This trait abstracts over different kinds of time providers, such as
/// simulation clocks and data-playback clocks. When no source is installed
/// the engine falls back to the system clock, with `time` measured from the
/// start of the run.
///
/// The timing thread samples the source repeatedly, so the returned `time`
/// must be monotonically non-decreasing; `rate` is informational. The source
/// may advance arbitrarily between two samples, including not at all.
///
/// The trait is blanket-implemented for closures, so a source can be
/// installed with e.g.:
///
/// ```
/// use fluxion::engine::Engine;
/// use fluxion::time::TimePoint;
///
/// let engine = Engine::new();
/// let mut step = 0;
/// engine.set_time_source(move || {
///     step += 1;
///     TimePoint {
///         time: 0.1 * step as f64,
///         timestamp: 100_000_000 * step,
///         rate: 0.0,
///     }
/// });
/// ```
pub trait TimeSource: Send {
    /// Returns the current time.
    fn now(&mut self) -> TimePoint;
}

impl<F> TimeSource for F
where
    F: FnMut() -> TimePoint + Send,
{
    fn now(&mut self) -> TimePoint {
        self()
    }
}
