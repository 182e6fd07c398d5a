//! Producer back-pressure on a bounded input.

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use fluxion::engine::Engine;
use fluxion::ports::{connect, CallbackInput, DirectOutput, OutputPort};

#[test]
fn full_ring_blocks_the_producer_until_a_slot_frees() {
    let engine = Engine::new();

    // A slow consumer holding each value for 100 ms.
    let input = CallbackInput::with_capacity(
        &engine,
        |_: &u64| thread::sleep(Duration::from_millis(100)),
        2,
    );
    let output = DirectOutput::new();
    connect(&output, &input);

    let write_times = Arc::new(Mutex::new(Vec::new()));
    {
        let handle = engine.clone();
        let write_times = write_times.clone();
        let mut produced = false;
        engine.create_poll_callback(move || {
            if !produced {
                produced = true;
                let start = Instant::now();
                for value in 0..3 {
                    output.write(value);
                    write_times.lock().unwrap().push(start.elapsed());
                }
                handle.stop();
            }
            false
        });
    }

    engine.run().unwrap();

    let write_times = write_times.lock().unwrap();
    assert!(write_times[0] < Duration::from_millis(50));
    assert!(write_times[1] < Duration::from_millis(50));
    // The third write completes only once the first value was consumed.
    assert!(
        write_times[2] >= Duration::from_millis(80),
        "third write returned after {:?}",
        write_times[2]
    );
    assert!(write_times[2] < Duration::from_millis(500));
}
