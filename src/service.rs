//! Request/response helpers built atop connected port pairs.
//!
//! A [`ServiceClient`] owns a request output and a response input; a
//! [`ServiceServer`] owns a request input and a response output. Wiring both
//! directions with [`connect`] lets the client call the server either
//! synchronously, blocking until the response arrives, or asynchronously
//! with a completion callback invoked on a worker thread.
//!
//! A client supports one outstanding call at a time, with no cancellation
//! and no built-in timeout; a timeout can be composed from a poll task
//! watching the engine clock.
//!
//! # Examples
//!
//! ```
//! use std::thread;
//!
//! use fluxion::engine::Engine;
//! use fluxion::service::{self, ServiceClient, ServiceServer};
//!
//! let engine = Engine::new();
//!
//! let client = ServiceClient::new(&engine);
//! let server = ServiceServer::new(&engine, |request: &i32| request * 2);
//! service::connect(&client, &server);
//!
//! let runner = {
//!     let engine = engine.clone();
//!     thread::spawn(move || engine.run())
//! };
//!
//! assert_eq!(client.sync_call(21), 42);
//!
//! engine.stop();
//! runner.join().unwrap().unwrap();
//! ```

use std::fmt;
use std::sync::{Arc, Mutex};

use crate::engine::Engine;
use crate::ports::{self, CallbackInput, DirectInput, DirectOutput, OutputPort};
use crate::util::response_slot::ResponseSlot;

/// The completion state shared between a client and its response input.
struct ClientShared<R> {
    response: ResponseSlot<R>,
    callback: Mutex<Option<Box<dyn FnOnce(R) + Send>>>,
}

/// The calling side of a request/response pair.
pub struct ServiceClient<T, R> {
    out_request: DirectOutput<T>,
    in_response: DirectInput<R>,
    shared: Arc<ClientShared<R>>,
}

impl<T, R> ServiceClient<T, R>
where
    T: Clone + Send + 'static,
    R: Send + 'static,
{
    /// Creates a client on the provided engine.
    pub fn new(engine: &Engine) -> Self {
        let shared = Arc::new(ClientShared {
            response: ResponseSlot::new(),
            callback: Mutex::new(None),
        });

        let in_response = {
            let shared = shared.clone();
            let engine = engine.clone();

            DirectInput::new(move |response: R| {
                shared.response.fulfill(response);

                if shared.callback.lock().unwrap().is_some() {
                    let shared = shared.clone();
                    engine.push_callback(move || {
                        let callback = shared.callback.lock().unwrap().take();
                        if let (Some(callback), Some(response)) =
                            (callback, shared.response.try_take())
                        {
                            callback(response);
                        }
                    });
                }
            })
        };

        Self {
            out_request: DirectOutput::new(),
            in_response,
            shared,
        }
    }

    /// Sends a request and blocks until the response arrives.
    ///
    /// The engine's worker pool processes the request, so this must not be
    /// called from a deferred callback when no other worker is available to
    /// serve the request.
    pub fn sync_call(&self, request: T) -> R {
        self.shared.callback.lock().unwrap().take();
        self.shared.response.reset();
        self.out_request.write(request);

        self.shared.response.take_blocking()
    }

    /// Sends a request and returns immediately.
    ///
    /// The provided callback is eventually invoked with the response, on a
    /// worker thread.
    pub fn async_call<F>(&self, request: T, callback: F)
    where
        F: FnOnce(R) + Send + 'static,
    {
        *self.shared.callback.lock().unwrap() = Some(Box::new(callback));
        self.shared.response.reset();
        self.out_request.write(request);
    }

    /// The output port emitting requests.
    pub fn out_request(&self) -> &DirectOutput<T> {
        &self.out_request
    }

    /// The input port receiving responses.
    pub fn in_response(&self) -> &DirectInput<R> {
        &self.in_response
    }
}

impl<T, R> fmt::Debug for ServiceClient<T, R> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ServiceClient").finish_non_exhaustive()
    }
}

/// The serving side of a request/response pair.
///
/// Requests are buffered and served one at a time, on a worker thread, by
/// the callback provided at construction.
pub struct ServiceServer<T, R> {
    in_request: CallbackInput<T>,
    out_response: DirectOutput<R>,
}

impl<T, R> ServiceServer<T, R>
where
    T: Send + 'static,
    R: Clone + Send + 'static,
{
    /// Creates a server responding to each request with the provided
    /// callback.
    pub fn new<F>(engine: &Engine, callback: F) -> Self
    where
        F: Fn(&T) -> R + Send + Sync + 'static,
    {
        let out_response = DirectOutput::new();
        let in_request = {
            let out_response = out_response.clone();
            CallbackInput::new(engine, move |request: &T| {
                out_response.write(callback(request));
            })
        };

        Self {
            in_request,
            out_response,
        }
    }

    /// The input port receiving requests.
    pub fn in_request(&self) -> &CallbackInput<T> {
        &self.in_request
    }

    /// The output port emitting responses.
    pub fn out_response(&self) -> &DirectOutput<R> {
        &self.out_response
    }
}

impl<T, R> fmt::Debug for ServiceServer<T, R> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ServiceServer").finish_non_exhaustive()
    }
}

/// Connects a client to a server, wiring both the request and the response
/// directions.
pub fn connect<T, R>(client: &ServiceClient<T, R>, server: &ServiceServer<T, R>)
where
    T: Clone + Send + 'static,
    R: Clone + Send + 'static,
{
    ports::connect(client.out_request(), server.in_request());
    ports::connect(server.out_response(), client.in_response());
}
