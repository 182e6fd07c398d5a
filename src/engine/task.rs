//! Phase helpers for background lifecycle tasks.
//!
//! Each registered task runs on its own thread and is assembled from the
//! phase helpers below:
//!
//! | Task kind            | Phases                                        |
//! |----------------------|-----------------------------------------------|
//! | init                 | `init`                                        |
//! | poll                 | `poll`                                        |
//! | init + poll          | `init`, then `poll` if no init failed         |
//! | poll + shutdown      | `poll`, then the shutdown callback            |
//! | init + poll + shutdown | as above, the shutdown callback always runs |
//! | shutdown             | `wait_stopped`, then the shutdown callback    |

use std::sync::atomic::Ordering;

use super::Inner;

/// Runs the init phase of a task.
///
/// Blocks until `run` releases the init phase, invokes the init callback and
/// publishes its outcome. Returns whether this task's init succeeded.
pub(super) fn init(inner: &Inner, init: impl FnOnce() -> bool) -> bool {
    inner.init_gate.wait();
    let valid = init();
    inner.complete_init(valid);
    valid
}

/// Runs the poll phase of a task.
///
/// Blocks until the outcome of the init phase is decided, then invokes the
/// poll callback repeatedly until it returns `false` or the engine stops.
/// When initialization failed the engine never entered the running state and
/// the poll callback is not invoked at all.
pub(super) fn poll(inner: &Inner, mut poll: impl FnMut() -> bool) {
    inner.run_gate.wait();
    while inner.is_running() && poll() {}
}

/// Blocks until the engine has stopped, or returns immediately when
/// initialization failed.
pub(super) fn wait_stopped(inner: &Inner) {
    inner.run_gate.wait();
    if inner.init_valid.load(Ordering::SeqCst) {
        inner.stop_gate.wait();
    }
}
