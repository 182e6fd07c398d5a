//! Lifecycle phase coordination.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use fluxion::engine::{Engine, RunError};

#[test]
fn running_implies_every_init_completed() {
    let engine = Engine::new();
    let init_count = Arc::new(AtomicUsize::new(0));

    for _ in 0..4 {
        let init_count = init_count.clone();
        engine.create_init_callback(move || {
            thread::sleep(Duration::from_millis(10));
            init_count.fetch_add(1, Ordering::SeqCst);
            true
        });
    }

    let observed = Arc::new(AtomicUsize::new(usize::MAX));
    {
        let init_count = init_count.clone();
        let observed = observed.clone();
        let handle = engine.clone();
        engine.create_poll_callback(move || {
            observed.store(init_count.load(Ordering::SeqCst), Ordering::SeqCst);
            handle.stop();
            false
        });
    }

    engine.run().unwrap();
    assert_eq!(observed.load(Ordering::SeqCst), 4);
}

#[test]
fn init_failure_poisons_the_run() {
    let engine = Engine::new();

    let failing_shutdown_ran = Arc::new(AtomicBool::new(false));
    {
        let shutdown_ran = failing_shutdown_ran.clone();
        engine.create_init_poll_shutdown_callback(
            || false,
            || panic!("the poll phase should not run"),
            move || shutdown_ran.store(true, Ordering::SeqCst),
        );
    }

    let polled = Arc::new(AtomicBool::new(false));
    let other_shutdown_ran = Arc::new(AtomicBool::new(false));
    {
        let polled = polled.clone();
        let shutdown_ran = other_shutdown_ran.clone();
        engine.create_poll_shutdown_callback(
            move || {
                polled.store(true, Ordering::SeqCst);
                false
            },
            move || shutdown_ran.store(true, Ordering::SeqCst),
        );
    }

    assert_eq!(engine.run(), Err(RunError::InitFailed));
    assert!(!polled.load(Ordering::SeqCst));
    assert!(failing_shutdown_ran.load(Ordering::SeqCst));
    assert!(other_shutdown_ran.load(Ordering::SeqCst));
}

#[test]
fn run_can_only_be_called_once() {
    let engine = Engine::new();

    {
        let handle = engine.clone();
        engine.create_poll_callback(move || {
            handle.stop();
            false
        });
    }

    engine.run().unwrap();
    assert_eq!(engine.run(), Err(RunError::AlreadyStarted));
}

#[test]
fn stop_unblocks_run_promptly() {
    let engine = Engine::new();

    let stopper = {
        let engine = engine.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(100));
            engine.stop();
        })
    };

    let start = Instant::now();
    engine.run().unwrap();
    let elapsed = start.elapsed();

    assert!(elapsed >= Duration::from_millis(100));
    assert!(elapsed < Duration::from_secs(2));
    stopper.join().unwrap();
}

#[test]
fn poll_exit_is_local_to_its_task() {
    let engine = Engine::new();

    let short_polls = Arc::new(AtomicUsize::new(0));
    {
        let polls = short_polls.clone();
        engine.create_poll_callback(move || {
            polls.fetch_add(1, Ordering::SeqCst);
            false
        });
    }

    let long_polls = Arc::new(AtomicUsize::new(0));
    {
        let polls = long_polls.clone();
        let handle = engine.clone();
        engine.create_poll_callback(move || {
            thread::sleep(Duration::from_millis(1));
            if polls.fetch_add(1, Ordering::SeqCst) + 1 == 50 {
                handle.stop();
            }
            true
        });
    }

    engine.run().unwrap();
    assert_eq!(short_polls.load(Ordering::SeqCst), 1);
    assert_eq!(long_polls.load(Ordering::SeqCst), 50);
}

#[test]
fn shutdown_only_task_waits_for_stop() {
    let engine = Engine::new();
    let order = Arc::new(Mutex::new(Vec::new()));

    {
        let order = order.clone();
        engine.create_shutdown_callback(move || order.lock().unwrap().push("shutdown"));
    }
    {
        let order = order.clone();
        let handle = engine.clone();
        engine.create_poll_callback(move || {
            thread::sleep(Duration::from_millis(50));
            order.lock().unwrap().push("poll");
            handle.stop();
            false
        });
    }

    engine.run().unwrap();
    assert_eq!(*order.lock().unwrap(), vec!["poll", "shutdown"]);
}

#[test]
fn deferred_callbacks_run_in_fifo_order_on_a_single_worker() {
    let engine = Engine::new();
    let log = Arc::new(Mutex::new(Vec::new()));

    {
        let engine_handle = engine.clone();
        let log = log.clone();
        engine.create_init_callback(move || {
            for i in 0..10 {
                let log = log.clone();
                engine_handle.push_callback(move || log.lock().unwrap().push(i));
            }
            true
        });
    }
    {
        let log = log.clone();
        let handle = engine.clone();
        engine.create_poll_callback(move || {
            if log.lock().unwrap().len() == 10 {
                handle.stop();
                false
            } else {
                true
            }
        });
    }

    engine.run_with(1).unwrap();
    assert_eq!(*log.lock().unwrap(), (0..10).collect::<Vec<_>>());
}

#[test]
fn worker_survives_a_panicking_callback() {
    let engine = Engine::new();
    let done = Arc::new(AtomicBool::new(false));

    {
        let engine_handle = engine.clone();
        let done = done.clone();
        engine.create_init_callback(move || {
            engine_handle.push_callback(|| panic!("faulty callback"));
            let done = done.clone();
            engine_handle.push_callback(move || done.store(true, Ordering::SeqCst));
            true
        });
    }
    {
        let done = done.clone();
        let handle = engine.clone();
        engine.create_poll_callback(move || {
            if done.load(Ordering::SeqCst) {
                handle.stop();
                false
            } else {
                true
            }
        });
    }

    engine.run_with(1).unwrap();
    assert!(done.load(Ordering::SeqCst));
}
