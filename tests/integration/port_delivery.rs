//! Port delivery disciplines.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use fluxion::engine::Engine;
use fluxion::ports::{
    connect, CallbackInput, DirectInput, DirectOutput, OutputPort, SampledInput, TimedOutput,
};

#[test]
fn fan_out_delivers_in_connect_order() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let output = DirectOutput::new();

    let inputs: Vec<_> = (0..3)
        .map(|id| {
            let log = log.clone();
            DirectInput::new(move |value: u64| log.lock().unwrap().push((id, value)))
        })
        .collect();
    for input in &inputs {
        connect(&output, input);
    }

    output.write(7);

    assert_eq!(*log.lock().unwrap(), vec![(0, 7), (1, 7), (2, 7)]);
}

#[test]
fn connecting_twice_delivers_twice() {
    let count = Arc::new(AtomicUsize::new(0));
    let output = DirectOutput::new();
    let input = {
        let count = count.clone();
        DirectInput::new(move |_: u64| {
            count.fetch_add(1, Ordering::SeqCst);
        })
    };

    connect(&output, &input);
    connect(&output, &input);

    output.write(1);
    output.write(2);

    assert_eq!(count.load(Ordering::SeqCst), 4);
}

#[test]
fn sampled_input_observations_are_monotonic() {
    let output = DirectOutput::new();
    let input = SampledInput::with_default(0u64);
    connect(&output, &input);

    let writer = thread::spawn(move || {
        for value in 1..=1000 {
            output.write(value);
        }
    });

    let mut last = 0;
    let deadline = Instant::now() + Duration::from_secs(10);
    while last != 1000 {
        assert!(Instant::now() < deadline, "the writer appears stuck");
        {
            let value = input.get().unwrap();
            assert!(
                *value >= last,
                "observed a rollback: {} after {}",
                *value,
                last
            );
            last = *value;
        }
        thread::sleep(Duration::from_millis(1));
    }

    writer.join().unwrap();
}

#[test]
fn callback_input_consumes_every_value_exactly_once() {
    let engine = Engine::new();
    let received = Arc::new(Mutex::new(Vec::new()));

    let input = {
        let received = received.clone();
        CallbackInput::with_capacity(
            &engine,
            move |value: &u64| received.lock().unwrap().push(*value),
            4,
        )
    };
    let output = DirectOutput::new();
    connect(&output, &input);

    {
        let handle = engine.clone();
        let received = received.clone();
        let mut produced = false;
        engine.create_poll_callback(move || {
            if !produced {
                produced = true;
                for value in 0..100 {
                    output.write(value);
                }
            }
            if received.lock().unwrap().len() == 100 {
                handle.stop();
                false
            } else {
                true
            }
        });
    }

    engine.run().unwrap();
    assert_eq!(*received.lock().unwrap(), (0..100).collect::<Vec<_>>());
}

#[test]
fn timed_output_emits_the_latest_value_at_its_period() {
    let engine = Engine::new();
    let received = Arc::new(Mutex::new(Vec::new()));

    let output = TimedOutput::new(&engine, 0.05);
    let input = {
        let received = received.clone();
        DirectInput::new(move |value: u64| received.lock().unwrap().push(value))
    };
    connect(&output, &input);

    // Overwrite the slot much faster than the emission period.
    {
        let output = output.clone();
        let mut value = 0;
        engine.create_timer_callback(0.001, move |_| {
            value += 1;
            output.write(value);
        });
    }
    {
        let handle = engine.clone();
        engine.create_poll_callback(move || {
            thread::sleep(Duration::from_millis(5));
            if handle.get_time().time >= 0.5 {
                handle.stop();
            }
            true
        });
    }

    engine.run().unwrap();

    let received = received.lock().unwrap();
    // Roughly one emission per 50 ms window, far fewer than the ~500 writes.
    assert!(
        received.len() >= 5 && received.len() <= 15,
        "{} emissions",
        received.len()
    );
    assert!(received.windows(2).all(|w| w[0] <= w[1]));
}
