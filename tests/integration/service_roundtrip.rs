//! Request/response round trips.

use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use fluxion::engine::Engine;
use fluxion::service::{self, ServiceClient, ServiceServer};

#[test]
fn sync_and_async_calls_round_trip() {
    let engine = Engine::new();

    let client = ServiceClient::new(&engine);
    let server = ServiceServer::new(&engine, |request: &i64| request * 2);
    service::connect(&client, &server);

    let runner = {
        let engine = engine.clone();
        thread::spawn(move || engine.run())
    };

    assert_eq!(client.sync_call(21), 42);

    let (tx, rx) = mpsc::channel();
    client.async_call(10, move |response| {
        let worker = thread::current().name().map(str::to_owned).unwrap_or_default();
        tx.send((response, worker)).unwrap();
    });

    let (response, worker) = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(response, 20);
    assert!(
        worker.starts_with("fluxion-worker-"),
        "callback ran on thread {worker:?}"
    );

    engine.stop();
    runner.join().unwrap().unwrap();
}

#[test]
fn consecutive_sync_calls_reuse_the_client() {
    let engine = Engine::new();

    let client = ServiceClient::new(&engine);
    let server = ServiceServer::new(&engine, |request: &u64| request + 1);
    service::connect(&client, &server);

    let runner = {
        let engine = engine.clone();
        thread::spawn(move || engine.run())
    };

    for request in 0..10 {
        assert_eq!(client.sync_call(request), request + 1);
    }

    engine.stop();
    runner.join().unwrap().unwrap();
}
