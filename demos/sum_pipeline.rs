//! Example: the sum pipeline.
//!
//! This example demonstrates in particular:
//!
//! * nodes owning typed ports and registering timer callbacks,
//! * latest-wins sampling of two producers running at different rates,
//! * a timeout built from an init/poll task.
//!
//! ```text
//!                    ┌──────────────────┐
//!                    │ SequenceGenerator├────┐
//!                    │     (20 Hz)      │    │  ┌──────────────────┐
//!                    └──────────────────┘    └─►│                  │
//!                                               │ MessageGenerator │   ┌───────────────┐
//!                    ┌──────────────────┐    ┌─►│      (5 Hz)      ├──►│ MessageViewer │
//!                    │ SequenceGenerator├────┘  └──────────────────┘   └───────────────┘
//!                    │      (4 Hz)      │
//!                    └──────────────────┘
//! ```

use std::sync::{Arc, Mutex};

use fluxion::engine::Engine;
use fluxion::ports::{connect, DirectInput, DirectOutput, OutputPort, SampledInput};
use fluxion::time::TimePoint;

/// Prints every received message to stdout.
struct MessageViewer {
    in_message: DirectInput<String>,
}

impl MessageViewer {
    fn new() -> Self {
        Self {
            in_message: DirectInput::new(|message: String| println!("{message}")),
        }
    }

    /// The message to display -- input port.
    fn in_message(&self) -> &DirectInput<String> {
        &self.in_message
    }
}

/// Emits a message describing its two inputs and their sum.
struct MessageGenerator {
    in_a: SampledInput<i64>,
    in_b: SampledInput<i64>,
    out_message: DirectOutput<String>,
}

impl MessageGenerator {
    fn new(engine: &Engine, period: f64) -> Self {
        let in_a = SampledInput::new();
        let in_b = SampledInput::new();
        let out_message = DirectOutput::new();

        {
            let in_a = in_a.clone();
            let in_b = in_b.clone();
            let out = out_message.clone();
            engine.create_timer_callback(period, move |_| {
                let a = match in_a.get() {
                    Some(a) => *a,
                    None => return,
                };
                let b = match in_b.get() {
                    Some(b) => *b,
                    None => return,
                };
                out.write(format!("a: {a}, b: {b}, sum: {}", a + b));
            });
        }

        Self {
            in_a,
            in_b,
            out_message,
        }
    }

    /// One input integer -- input port.
    fn in_a(&self) -> &SampledInput<i64> {
        &self.in_a
    }

    /// Another input integer -- input port.
    fn in_b(&self) -> &SampledInput<i64> {
        &self.in_b
    }

    /// The generated message -- output port.
    fn out_message(&self) -> &DirectOutput<String> {
        &self.out_message
    }
}

/// Emits an arithmetic sequence of integers.
struct SequenceGenerator {
    out_value: DirectOutput<i64>,
}

impl SequenceGenerator {
    fn new(engine: &Engine, period: f64, initial: i64, step: i64) -> Self {
        let out_value = DirectOutput::new();

        {
            let out = out_value.clone();
            let mut value = initial;
            engine.create_timer_callback(period, move |_| {
                out.write(value);
                value += step;
            });
        }

        Self { out_value }
    }

    /// The sequence value -- output port.
    fn out_value(&self) -> &DirectOutput<i64> {
        &self.out_value
    }
}

/// Stops the engine once the elapsed time exceeds a limit.
struct Timeout;

impl Timeout {
    fn register(engine: &Engine, timeout: f64) {
        let initial = Arc::new(Mutex::new(TimePoint::default()));
        let engine_handle = engine.clone();

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
                let time = engine_handle.get_time();
                let duration = time - *initial.lock().unwrap();
                if duration.elapsed >= timeout {
                    engine_handle.stop();
                }
                std::thread::sleep(std::time::Duration::from_millis(1));
                true
            },
        );
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let engine = Engine::new();

    let a_generator = SequenceGenerator::new(&engine, 1.0 / 20.0, 0, 1);
    let b_generator = SequenceGenerator::new(&engine, 1.0 / 4.0, 0, -5);
    let message_generator = MessageGenerator::new(&engine, 1.0 / 5.0);
    let message_viewer = MessageViewer::new();
    Timeout::register(&engine, 5.0);

    connect(a_generator.out_value(), message_generator.in_a());
    connect(b_generator.out_value(), message_generator.in_b());
    connect(message_generator.out_message(), message_viewer.in_message());

    engine.run().unwrap();
}
