//! Timer scheduling and time-source behavior.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use fluxion::engine::Engine;
use fluxion::time::TimePoint;

#[test]
fn timer_fires_at_its_period() {
    let engine = Engine::new();
    let fires = Arc::new(AtomicUsize::new(0));

    {
        let fires = fires.clone();
        engine.create_timer_callback(0.05, move |_| {
            fires.fetch_add(1, Ordering::SeqCst);
        });
    }
    {
        let handle = engine.clone();
        engine.create_poll_callback(move || {
            thread::sleep(Duration::from_millis(5));
            if handle.get_time().time >= 1.0 {
                handle.stop();
            }
            true
        });
    }

    engine.run().unwrap();

    let fires = fires.load(Ordering::SeqCst);
    assert!(
        (18..=23).contains(&fires),
        "unexpected number of timer dispatches: {fires}"
    );
}

#[test]
fn time_jumps_dispatch_at_most_once_per_pass() {
    let engine = Engine::new();

    let samples = Arc::new(AtomicUsize::new(0));
    {
        let samples = samples.clone();
        engine.set_time_source(move || {
            let n = (samples.fetch_add(1, Ordering::SeqCst) + 1) as i64;
            TimePoint {
                time: n as f64,
                timestamp: n * 1_000_000_000,
                rate: 0.0,
            }
        });
    }

    // Each sampling pass crosses one hundred 10 ms periods.
    let fires = Arc::new(AtomicUsize::new(0));
    {
        let fires = fires.clone();
        engine.create_timer_callback(0.01, move |_| {
            fires.fetch_add(1, Ordering::SeqCst);
        });
    }
    {
        let handle = engine.clone();
        let samples = samples.clone();
        engine.create_poll_callback(move || {
            if samples.load(Ordering::SeqCst) >= 50 {
                handle.stop();
            }
            thread::sleep(Duration::from_millis(1));
            true
        });
    }

    engine.run().unwrap();

    let fires = fires.load(Ordering::SeqCst);
    let samples = samples.load(Ordering::SeqCst);
    assert!(
        fires <= samples,
        "dispatched {fires} times over {samples} passes"
    );
    assert!(fires >= 10);
}

#[test]
fn next_due_time_advances_by_one_period_per_dispatch() {
    let engine = Engine::new();

    // A frozen time source: the timer keeps firing only until its next due
    // time has crossed the current time.
    engine.set_time_source(|| TimePoint {
        time: 1.0,
        timestamp: 1_000_000_000,
        rate: 0.0,
    });

    let fires = Arc::new(AtomicUsize::new(0));
    {
        let fires = fires.clone();
        engine.create_timer_callback(0.3, move |time| {
            assert_eq!(time.time, 1.0);
            fires.fetch_add(1, Ordering::SeqCst);
        });
    }
    {
        let handle = engine.clone();
        engine.create_poll_callback(move || {
            // Leave ample room for many sampling passes.
            thread::sleep(Duration::from_millis(100));
            handle.stop();
            false
        });
    }

    engine.run().unwrap();

    // The next due time starts at 0 and advances by 0.3 per dispatch: it
    // crosses the frozen time of 1.0 after exactly four dispatches.
    assert_eq!(fires.load(Ordering::SeqCst), 4);
}

#[test]
fn poll_driven_timeout_stops_the_engine() {
    let engine = Engine::new();

    let initial = Arc::new(Mutex::new(TimePoint::default()));
    {
        let engine_handle = engine.clone();
        let initial = initial.clone();
        engine.create_init_poll_callback(
            {
                let initial = initial.clone();
                let engine_handle = engine_handle.clone();
                move || {
                    *initial.lock().unwrap() = engine_handle.get_time();
                    true
                }
            },
            move || {
                let elapsed = (engine_handle.get_time() - *initial.lock().unwrap()).elapsed;
                if elapsed >= 0.5 {
                    engine_handle.stop();
                }
                thread::sleep(Duration::from_millis(1));
                true
            },
        );
    }

    let start = Instant::now();
    engine.run().unwrap();
    let elapsed = start.elapsed();

    assert!(elapsed >= Duration::from_millis(450), "stopped after {elapsed:?}");
    assert!(elapsed <= Duration::from_millis(900), "stopped after {elapsed:?}");

    // The worker pool is gone: deferred callbacks no longer execute.
    let ran_after_stop = Arc::new(AtomicBool::new(false));
    {
        let ran = ran_after_stop.clone();
        engine.push_callback(move || ran.store(true, Ordering::SeqCst));
    }
    thread::sleep(Duration::from_millis(50));
    assert!(!ran_after_stop.load(Ordering::SeqCst));
}
