//! Engine time and time sources.
//!
//! This module provides most notably:
//!
//! * [`TimePoint`]: the engine's timestamp, pairing the elapsed time since
//!   start with a nanosecond wall-clock timestamp and a real-time rate,
//! * [`Duration`]: the difference between two [`TimePoint`]s,
//! * [`TimeSource`]: a trait abstracting over real-time and simulated time
//!   providers.
//!
//! The engine's current time is sampled by the timing thread and published to
//! all other threads through an internal single-writer cell; it can be
//! queried at any time with [`Engine::get_time`](crate::engine::Engine::get_time).

mod atomic_time;
mod source;
mod time_point;

pub(crate) use atomic_time::{TimeCell, TimeCellReader};
pub use source::TimeSource;
pub use time_point::{Duration, TimePoint};
