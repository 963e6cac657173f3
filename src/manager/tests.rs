//! End-to-end tests for the connection task, driven over an in-memory
//! transport on a paused clock.

// ============================================================================
// Imports
// ============================================================================

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tokio::time::{Instant, sleep};

use crate::addon::{Addon, AddonBuilder, LifecycleEvent, LifecycleKind};
use crate::error::{Error, Result};
use crate::identifiers::{AddonId, ClientId};
use crate::protocol::WireFormat;
use crate::transport::{Connector, Incoming, Transport};

use super::{ConnectionState, ReconnectPolicy};

// ============================================================================
// Mock Transport
// ============================================================================

/// Client half of an in-memory channel.
struct MockTransport {
    inbound: mpsc::UnboundedReceiver<Incoming>,
    outbound: mpsc::UnboundedSender<String>,
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&mut self, text: String) -> Result<()> {
        self.outbound
            .send(text)
            .map_err(|_| Error::connection("server half dropped"))
    }

    async fn recv(&mut self) -> Result<Incoming> {
        Ok(self
            .inbound
            .recv()
            .await
            .unwrap_or(Incoming::Closed { reason: None }))
    }

    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Server half of an in-memory channel.
struct ServerSide {
    to_client: mpsc::UnboundedSender<Incoming>,
    from_client: mpsc::UnboundedReceiver<String>,
    format: WireFormat,
}

impl ServerSide {
    fn push(&self, event: &str, data: Value) {
        let (event_key, data_key) = self.format.fields();
        let mut frame = serde_json::Map::new();
        frame.insert(event_key.to_string(), Value::String(event.to_string()));
        frame.insert(data_key.to_string(), data);
        self.push_raw(&Value::Object(frame).to_string());
    }

    fn push_raw(&self, text: &str) {
        let _ = self.to_client.send(Incoming::Text(text.to_string()));
    }

    fn close(&self, reason: &str) {
        let _ = self.to_client.send(Incoming::Closed {
            reason: Some(reason.to_string()),
        });
    }

    /// Next frame written by the addon, as `(event, data)`.
    async fn next_frame(&mut self) -> (String, Value) {
        let text = self.from_client.recv().await.expect("addon wrote a frame");
        let mut frame: Value = serde_json::from_str(&text).expect("frame is json");
        let (event_key, data_key) = self.format.fields();
        let event = frame[event_key].as_str().expect("discriminator").to_string();
        (event, frame[data_key].take())
    }

    fn try_next_frame(&mut self) -> Option<String> {
        self.from_client.try_recv().ok()
    }

    /// Reads the registration frame and accepts it.
    async fn accept(&mut self, addon_id: &str) -> Value {
        let (event, registration) = self.next_frame().await;
        assert_eq!(event, "addon-register");
        self.push("addon-result", json!({ "ok": true, "id": addon_id }));
        settle().await;
        registration
    }

    fn register_client(&self, id: &str, name: &str) {
        self.push(
            "client-register",
            json!({ "id": id, "name": name, "session": { "room": "r1" } }),
        );
    }
}

fn channel_pair(format: WireFormat) -> (MockTransport, ServerSide) {
    let (to_client, inbound) = mpsc::unbounded_channel();
    let (outbound, from_client) = mpsc::unbounded_channel();
    (
        MockTransport { inbound, outbound },
        ServerSide {
            to_client,
            from_client,
            format,
        },
    )
}

// ============================================================================
// Mock Connector
// ============================================================================

/// Hands out queued transports; refuses once the queue is empty.
#[derive(Clone, Default)]
struct MockConnector {
    queue: Arc<Mutex<VecDeque<MockTransport>>>,
    attempts: Arc<AtomicUsize>,
}

impl MockConnector {
    fn with_sessions(count: usize, format: WireFormat) -> (Self, Vec<ServerSide>) {
        let connector = Self::default();
        let servers = (0..count)
            .map(|_| {
                let (transport, server) = channel_pair(format);
                connector.queue.lock().push_back(transport);
                server
            })
            .collect();
        (connector, servers)
    }

    fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self) -> Result<Box<dyn Transport>> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        match self.queue.lock().pop_front() {
            Some(transport) => Ok(Box::new(transport)),
            None => Err(Error::connection("connection refused")),
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

type Log<T> = Arc<Mutex<Vec<T>>>;

/// Lets the connection task run until it blocks.
async fn settle() {
    sleep(Duration::from_millis(1)).await;
}

fn builder(connector: &MockConnector) -> AddonBuilder {
    Addon::builder()
        .token("test-token")
        .name("Test Addon")
        .connector(connector.clone())
}

/// Records every lifecycle notification, with the time it was emitted.
fn record_lifecycle(mut builder: AddonBuilder, log: &Log<(Instant, LifecycleEvent)>) -> AddonBuilder {
    for kind in LifecycleKind::ALL {
        let log = Arc::clone(log);
        builder = builder.on(kind, move |_, event| {
            log.lock().push((Instant::now(), event.clone()));
        });
    }
    builder
}

fn kinds(log: &Log<(Instant, LifecycleEvent)>) -> Vec<LifecycleKind> {
    log.lock().iter().map(|(_, event)| event.kind()).collect()
}

async fn wait_until_finished(addon: &Addon) {
    while addon.is_running() {
        sleep(Duration::from_millis(100)).await;
    }
}

fn assert_near(actual: Duration, expected_ms: u64) {
    let expected = Duration::from_millis(expected_ms);
    assert!(
        actual >= expected && actual < expected + Duration::from_millis(50),
        "expected ~{expected_ms}ms, got {actual:?}"
    );
}

// ============================================================================
// Handshake
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_handshake_reaches_ready() {
    let (connector, mut servers) = MockConnector::with_sessions(1, WireFormat::Compact);
    let states: Log<(LifecycleKind, ConnectionState)> = Arc::default();

    let mut b = builder(&connector).command("/top", |_, _, _| {});
    for kind in [LifecycleKind::Connected, LifecycleKind::Ready] {
        let states = Arc::clone(&states);
        b = b.on(kind, move |addon, _| states.lock().push((kind, addon.state())));
    }
    let addon = b.build().expect("build");

    addon.start();
    settle().await;
    assert_eq!(addon.state(), ConnectionState::Handshaking);
    assert!(addon.addon_id().is_none());

    let registration = servers[0].accept("addon-7").await;
    assert_eq!(registration["token"], "test-token");
    assert_eq!(registration["name"], "Test Addon");
    assert_eq!(registration["commands"], json!(["top"]));

    assert_eq!(addon.state(), ConnectionState::Ready);
    assert_eq!(addon.addon_id(), Some(AddonId::new("addon-7")));
    assert_eq!(
        *states.lock(),
        vec![
            (LifecycleKind::Connected, ConnectionState::Handshaking),
            (LifecycleKind::Ready, ConnectionState::Ready),
        ]
    );

    addon.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_named_wire_format() {
    let (connector, mut servers) = MockConnector::with_sessions(1, WireFormat::Named);
    let addon = builder(&connector)
        .wire_format(WireFormat::Named)
        .build()
        .expect("build");

    addon.start();
    settle().await;
    servers[0].accept("a1").await;
    assert!(addon.is_ready());

    addon.broadcast_chat("hello all");
    let (event, data) = servers[0].next_frame().await;
    assert_eq!(event, "addon-broadcast");
    assert_eq!(data, json!({ "event": "chat", "data": { "message": "hello all" } }));

    addon.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_unexpected_ack_after_ready_is_ignored() {
    let (connector, mut servers) = MockConnector::with_sessions(1, WireFormat::Compact);
    let addon = builder(&connector).build().expect("build");

    addon.start();
    settle().await;
    servers[0].accept("a1").await;

    servers[0].push("addon-result", json!({ "ok": false, "err": "late" }));
    settle().await;

    assert!(addon.is_ready());
    assert_eq!(addon.addon_id(), Some(AddonId::new("a1")));
    addon.stop().await;
}

// ============================================================================
// Registration Rejection
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_rejection_emits_non_fatal_error_and_retries() {
    let (connector, mut servers) = MockConnector::with_sessions(2, WireFormat::Compact);
    let log: Log<(Instant, LifecycleEvent)> = Arc::default();
    let addon = record_lifecycle(builder(&connector), &log)
        .build()
        .expect("build");

    addon.start();
    let (event, _) = servers[0].next_frame().await;
    assert_eq!(event, "addon-register");
    servers[0].push("addon-result", json!({ "ok": false, "err": "bad token" }));
    settle().await;

    {
        let log = log.lock();
        let (_, last) = log.last().expect("event emitted");
        assert_eq!(
            *last,
            LifecycleEvent::Error {
                message: "Registration rejected: bad token".into(),
                fatal: false,
            }
        );
    }
    assert_eq!(addon.state(), ConnectionState::Disconnected);
    assert!(!kinds(&log).contains(&LifecycleKind::Ready));

    // Second attempt after the first backoff step
    servers[1].accept("a1").await;
    assert!(addon.is_ready());
    assert_eq!(connector.attempts(), 2);

    addon.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_repeated_rejection_exhausts_attempts() {
    let (connector, mut servers) = MockConnector::with_sessions(3, WireFormat::Compact);
    let log: Log<(Instant, LifecycleEvent)> = Arc::default();
    let addon = record_lifecycle(builder(&connector), &log)
        .reconnect_policy(ReconnectPolicy::default().with_max_attempts(2))
        .build()
        .expect("build");

    addon.start();
    for server in &mut servers {
        let (event, _) = server.next_frame().await;
        assert_eq!(event, "addon-register");
        server.push("addon-result", json!({ "ok": false }));
    }
    wait_until_finished(&addon).await;

    let errors: Vec<_> = log
        .lock()
        .iter()
        .filter_map(|(_, event)| match event {
            LifecycleEvent::Error { message, fatal } => Some((message.clone(), *fatal)),
            _ => None,
        })
        .collect();

    assert_eq!(errors.len(), 4);
    assert!(errors[..3].iter().all(|(_, fatal)| !fatal));
    assert_eq!(errors[0].0, "Registration rejected: no reason given");
    assert!(errors[3].1);
    assert!(errors[3].0.contains("Max reconnect attempts reached"));
}

#[tokio::test(start_paused = true)]
async fn test_null_registration_result_is_a_rejection() {
    let (connector, mut servers) = MockConnector::with_sessions(1, WireFormat::Compact);
    let log: Log<(Instant, LifecycleEvent)> = Arc::default();
    let addon = record_lifecycle(builder(&connector), &log)
        .build()
        .expect("build");

    addon.start();
    servers[0].next_frame().await;
    servers[0].push_raw(r#"{"e":"addon-result","d":null}"#);
    settle().await;

    assert_eq!(addon.state(), ConnectionState::Disconnected);
    {
        let log = log.lock();
        let (_, last) = log.last().expect("events");
        assert_eq!(
            *last,
            LifecycleEvent::Error {
                message: "Registration rejected: no reason given".into(),
                fatal: false,
            }
        );
    }

    addon.stop().await;
}

// ============================================================================
// Reconnect
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_reconnect_schedule_then_fatal_error() {
    let connector = MockConnector::default();
    let log: Log<(Instant, LifecycleEvent)> = Arc::default();
    let addon = record_lifecycle(builder(&connector), &log)
        .build()
        .expect("build");

    let started = Instant::now();
    addon.start();
    wait_until_finished(&addon).await;

    // Initial attempt plus ten reconnects
    assert_eq!(connector.attempts(), 11);

    let log = log.lock();
    let offline: Vec<Instant> = log
        .iter()
        .filter(|(_, event)| event.kind() == LifecycleKind::Offline)
        .map(|(at, _)| *at)
        .collect();
    assert_eq!(offline.len(), 11);
    assert_near(offline[0] - started, 0);

    let gaps: Vec<Duration> = offline.windows(2).map(|w| w[1] - w[0]).collect();
    let expected = [1000, 2000, 3000, 4000, 5000, 5000, 5000, 5000, 5000, 5000];
    for (gap, expected_ms) in gaps.iter().zip(expected) {
        assert_near(*gap, expected_ms);
    }

    let (_, last) = log.last().expect("events");
    match last {
        LifecycleEvent::Error { message, fatal } => {
            assert!(fatal);
            assert!(message.contains("Max reconnect attempts reached"));
        }
        other => panic!("expected fatal error, got {other:?}"),
    }
    assert_eq!(addon.state(), ConnectionState::Disconnected);
}

#[tokio::test(start_paused = true)]
async fn test_successful_registration_resets_attempts() {
    let (connector, mut servers) = MockConnector::with_sessions(2, WireFormat::Compact);
    let log: Log<(Instant, LifecycleEvent)> = Arc::default();
    let addon = record_lifecycle(builder(&connector), &log)
        .build()
        .expect("build");

    addon.start();
    settle().await;
    servers[0].accept("a1").await;
    let dropped_at = Instant::now();
    servers[0].close("server restart");
    settle().await;

    servers[1].accept("a2").await;
    assert_near(Instant::now() - dropped_at, 1000);
    assert_eq!(addon.addon_id(), Some(AddonId::new("a2")));

    // Counter was reset, so the next drop waits one step again
    let dropped_at = Instant::now();
    servers[1].close("again");
    settle().await;
    sleep(Duration::from_millis(500)).await;
    assert_eq!(connector.attempts(), 2);
    sleep(Duration::from_millis(600)).await;
    assert_eq!(connector.attempts(), 3);
    assert_near(Instant::now() - dropped_at, 1100);

    addon.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_stop_suppresses_reconnect() {
    let (connector, mut servers) = MockConnector::with_sessions(1, WireFormat::Compact);
    let log: Log<(Instant, LifecycleEvent)> = Arc::default();
    let addon = record_lifecycle(builder(&connector), &log)
        .build()
        .expect("build");

    addon.start();
    settle().await;
    servers[0].accept("a1").await;

    addon.stop().await;
    assert!(!addon.is_running());
    assert_eq!(addon.state(), ConnectionState::Disconnected);

    sleep(Duration::from_secs(60)).await;
    assert_eq!(connector.attempts(), 1);
    assert!(!kinds(&log).contains(&LifecycleKind::Offline));
}

#[tokio::test(start_paused = true)]
async fn test_stop_during_backoff() {
    let connector = MockConnector::default();
    let addon = builder(&connector).build().expect("build");

    addon.start();
    settle().await;
    assert_eq!(connector.attempts(), 1);

    addon.stop().await;
    sleep(Duration::from_secs(30)).await;
    assert_eq!(connector.attempts(), 1);
    assert!(!addon.is_running());
}

#[tokio::test(start_paused = true)]
async fn test_start_is_idempotent() {
    let (connector, _servers) = MockConnector::with_sessions(1, WireFormat::Compact);
    let addon = builder(&connector).build().expect("build");

    addon.start();
    addon.start();
    settle().await;

    assert_eq!(connector.attempts(), 1);
    addon.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_dropping_last_handle_stops_reconnecting() {
    let connector = MockConnector::default();
    let addon = builder(&connector).build().expect("build");

    addon.start();
    settle().await;
    assert_eq!(connector.attempts(), 1);

    let shared = Arc::downgrade(&addon.inner);
    drop(addon);
    settle().await;

    sleep(Duration::from_secs(120)).await;
    assert_eq!(connector.attempts(), 1);
    assert!(shared.upgrade().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_handler_handle_does_not_keep_connection_alive() {
    let (connector, mut servers) = MockConnector::with_sessions(1, WireFormat::Compact);
    let kept: Log<Addon> = Arc::default();
    let addon = builder(&connector)
        .on(LifecycleKind::Ready, {
            let kept = Arc::clone(&kept);
            move |addon, _| kept.lock().push(addon.clone())
        })
        .build()
        .expect("build");

    addon.start();
    settle().await;
    servers[0].accept("a1").await;
    assert_eq!(kept.lock().len(), 1);

    drop(addon);
    settle().await;

    // Transport is closed once the task exits
    assert!(servers[0].from_client.recv().await.is_none());

    let handle = kept.lock()[0].clone();
    assert!(!handle.is_running());
    assert_eq!(handle.state(), ConnectionState::Disconnected);
    handle.start();
    settle().await;
    assert!(!handle.is_running());
    assert_eq!(connector.attempts(), 1);

    // Breaks the handler -> handle cycle so the test does not leak
    kept.lock().clear();
}

// ============================================================================
// Client Registry
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_disconnect_clears_registry() {
    let (connector, mut servers) = MockConnector::with_sessions(1, WireFormat::Compact);
    let log: Log<(Instant, LifecycleEvent)> = Arc::default();
    let addon = record_lifecycle(builder(&connector), &log)
        .build()
        .expect("build");

    addon.start();
    settle().await;
    servers[0].accept("a1").await;
    servers[0].register_client("c1", "alice");
    servers[0].register_client("c2", "bob");
    settle().await;
    assert_eq!(addon.clients().len(), 2);

    servers[0].close("bye");
    settle().await;

    assert!(addon.clients().is_empty());
    assert!(addon.addon_id().is_none());
    assert_eq!(addon.state(), ConnectionState::Disconnected);

    let log = log.lock();
    let (_, last) = log.last().expect("events");
    assert_eq!(
        *last,
        LifecycleEvent::Offline {
            reason: "bye".into()
        }
    );
}

#[tokio::test(start_paused = true)]
async fn test_client_lifecycle_updates_registry() {
    let (connector, mut servers) = MockConnector::with_sessions(1, WireFormat::Compact);
    let log: Log<(Instant, LifecycleEvent)> = Arc::default();
    let addon = record_lifecycle(builder(&connector), &log)
        .build()
        .expect("build");

    addon.start();
    settle().await;
    servers[0].accept("a1").await;

    servers[0].register_client("c1", "alice");
    servers[0].push("client-connect", json!({ "id": 42, "name": "bob" }));
    settle().await;

    let ids: Vec<ClientId> = addon.clients().into_iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![ClientId::new("c1"), ClientId::from_number(42)]);
    let alice = addon.client(&ClientId::new("c1")).expect("alice");
    assert_eq!(alice.session, Some(json!({ "room": "r1" })));

    servers[0].push("client-disconnect", json!({ "id": 42, "name": "bob" }));
    servers[0].push("client-unregister", json!({ "id": "c1", "name": "alice" }));
    settle().await;
    assert!(addon.clients().is_empty());

    let tail: Vec<LifecycleKind> = kinds(&log).into_iter().skip(2).collect();
    assert_eq!(
        tail,
        vec![
            LifecycleKind::Register,
            LifecycleKind::Connect,
            LifecycleKind::Disconnect,
            LifecycleKind::Unregister,
        ]
    );

    addon.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_null_client_name_still_updates_registry() {
    let (connector, mut servers) = MockConnector::with_sessions(1, WireFormat::Compact);
    let log: Log<(Instant, LifecycleEvent)> = Arc::default();
    let addon = record_lifecycle(builder(&connector), &log)
        .build()
        .expect("build");

    addon.start();
    settle().await;
    servers[0].accept("a1").await;

    servers[0].push("client-register", json!({ "id": "c1", "name": null }));
    servers[0].register_client("c2", "Bob");
    settle().await;

    let c1 = addon.client(&ClientId::new("c1")).expect("registered");
    assert_eq!(c1.name, "");
    assert_eq!(addon.clients().len(), 2);

    servers[0].push("client-unregister", json!({ "id": "c2", "name": null }));
    settle().await;

    assert!(addon.client(&ClientId::new("c2")).is_none());
    assert_eq!(addon.clients().len(), 1);
    assert_eq!(
        kinds(&log).iter().filter(|kind| **kind == LifecycleKind::Unregister).count(),
        1
    );

    addon.stop().await;
}

// ============================================================================
// Routing
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_event_after_register_sees_client() {
    let (connector, mut servers) = MockConnector::with_sessions(1, WireFormat::Compact);
    let seen: Log<(String, Value)> = Arc::default();
    let seen_by_handler = Arc::clone(&seen);

    let addon = builder(&connector)
        .on_event("submit", move |addon, data, client| {
            // Registry already reflects the client when its event arrives
            assert!(addon.client(&client.id).is_some());
            seen_by_handler.lock().push((client.name.clone(), data.clone()));
        })
        .build()
        .expect("build");

    addon.start();
    settle().await;
    servers[0].accept("a1").await;

    // Same batch: registration immediately followed by an event
    servers[0].register_client("c1", "alice");
    servers[0].push(
        "event",
        json!({ "client": "c1", "event": "g:submit", "data": { "word": "hyphen" } }),
    );
    settle().await;

    assert_eq!(
        *seen.lock(),
        vec![("alice".to_string(), json!({ "word": "hyphen" }))]
    );
    addon.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_event_for_unknown_client_is_dropped() {
    let (connector, mut servers) = MockConnector::with_sessions(1, WireFormat::Compact);
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);

    let addon = builder(&connector)
        .on_event("submit", move |_, _, _| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .build()
        .expect("build");

    addon.start();
    settle().await;
    servers[0].accept("a1").await;

    servers[0].push(
        "event",
        json!({ "client": "c9", "event": "g:submit", "data": {} }),
    );
    settle().await;

    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(addon.is_ready());
    addon.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_command_routing() {
    let (connector, mut servers) = MockConnector::with_sessions(1, WireFormat::Compact);
    let invocations: Log<(String, String)> = Arc::default();
    let recorded = Arc::clone(&invocations);

    let addon = builder(&connector)
        .command("/foo", move |addon, client, args| {
            recorded.lock().push((client.id.to_string(), args.to_string()));
            addon.send_chat(&client.id, format!("foo {args}"));
        })
        .build()
        .expect("build");

    addon.start();
    settle().await;
    servers[0].accept("a1").await;
    servers[0].register_client("c1", "alice");

    servers[0].push(
        "event",
        json!({ "client": "c1", "event": "command", "data": { "command": "foo", "args": "bar" } }),
    );
    servers[0].push(
        "event",
        json!({ "client": "c1", "event": "command", "data": { "command": "zzz", "args": "x" } }),
    );
    servers[0].push(
        "event",
        json!({ "client": "c1", "event": "command", "data": { "command": "foo" } }),
    );
    settle().await;

    assert_eq!(
        *invocations.lock(),
        vec![
            ("c1".to_string(), "bar".to_string()),
            ("c1".to_string(), String::new()),
        ]
    );

    let (event, data) = servers[0].next_frame().await;
    assert_eq!(event, "addon-send");
    assert_eq!(
        data,
        json!({ "to": "c1", "event": "chat", "data": { "message": "foo bar" } })
    );

    addon.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_game_prefix_is_stripped() {
    let (connector, mut servers) = MockConnector::with_sessions(1, WireFormat::Compact);
    let names: Log<String> = Arc::default();

    let mut b = builder(&connector);
    for name in ["wordSubmitted", "ready", "g:wordSubmitted"] {
        let names = Arc::clone(&names);
        b = b.on_event(name, move |_, _, _| names.lock().push(name.to_string()));
    }
    let addon = b.build().expect("build");

    addon.start();
    settle().await;
    servers[0].accept("a1").await;
    servers[0].register_client("c1", "alice");
    for event in ["g:wordSubmitted", "ready", "unhandled"] {
        servers[0].push("event", json!({ "client": "c1", "event": event, "data": {} }));
    }
    settle().await;

    assert_eq!(*names.lock(), vec!["wordSubmitted", "ready"]);
    addon.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_malformed_frames_are_ignored() {
    let (connector, mut servers) = MockConnector::with_sessions(1, WireFormat::Compact);
    let addon = builder(&connector).build().expect("build");

    addon.start();
    settle().await;
    servers[0].accept("a1").await;

    servers[0].push_raw("not json");
    servers[0].push_raw("[1, 2, 3]");
    servers[0].push_raw(r#"{"d": {}}"#);
    servers[0].push("client-register", json!({ "name": "no id" }));
    servers[0].push("something-new", json!({}));
    servers[0].register_client("c1", "alice");
    settle().await;

    assert!(addon.is_ready());
    assert_eq!(addon.clients().len(), 1);
    addon.stop().await;
}

// ============================================================================
// Outbound
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_send_dropped_until_ready() {
    let (connector, mut servers) = MockConnector::with_sessions(1, WireFormat::Compact);
    let addon = builder(&connector).build().expect("build");
    let client = ClientId::new("c1");

    // Not started
    addon.send_chat(&client, "too early");

    addon.start();
    settle().await;

    // Handshaking
    addon.broadcast("tick", json!({}));

    servers[0].accept("a1").await;
    assert!(servers[0].try_next_frame().is_none());

    addon.send(&client, "score", json!({ "points": 3 }));
    let (event, data) = servers[0].next_frame().await;
    assert_eq!(event, "addon-send");
    assert_eq!(data["event"], "score");
    assert_eq!(data["data"]["points"], 3);

    addon.stop().await;
}

// ============================================================================
// Direct Messages
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_direct_message_without_connection() {
    let connector = MockConnector::default();
    let addon = builder(&connector).build().expect("build");

    let err = addon
        .send_discord_message(&ClientId::new("c1"), "hi")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotConnected));
    assert_eq!(err.to_string(), "No connection");
}

#[tokio::test(start_paused = true)]
async fn test_direct_message_results() {
    let (connector, mut servers) = MockConnector::with_sessions(1, WireFormat::Compact);
    let addon = builder(&connector).build().expect("build");

    addon.start();
    settle().await;
    servers[0].accept("a1").await;

    let ok = tokio::spawn({
        let addon = addon.clone();
        async move { addon.send_discord_message(&ClientId::new("c1"), "hi").await }
    });
    let (event, data) = servers[0].next_frame().await;
    assert_eq!(event, "addon-dm");
    assert_eq!(data, json!({ "to": "c1", "message": "hi" }));
    servers[0].push("addon-dm-result", json!({ "ok": true }));
    ok.await.expect("join").expect("delivered");

    let failed = tokio::spawn({
        let addon = addon.clone();
        async move {
            addon
                .send_discord_file(&ClientId::new("c1"), "stats.txt", "1,2,3")
                .await
        }
    });
    let (_, data) = servers[0].next_frame().await;
    assert_eq!(
        data,
        json!({ "to": "c1", "fileName": "stats.txt", "fileContent": "1,2,3" })
    );
    servers[0].push("addon-dm-result", json!({ "ok": false, "err": "X" }));
    let err = failed.await.expect("join").unwrap_err();
    assert!(matches!(err, Error::DirectMessage { ref detail } if detail == "X"));

    let defaulted = tokio::spawn({
        let addon = addon.clone();
        async move { addon.send_discord_message(&ClientId::new("c1"), "hi").await }
    });
    servers[0].next_frame().await;
    servers[0].push("addon-dm-result", json!({ "ok": false }));
    let err = defaulted.await.expect("join").unwrap_err();
    assert!(matches!(err, Error::DirectMessage { ref detail } if detail == "Failed"));

    addon.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_direct_message_timeout() {
    let (connector, mut servers) = MockConnector::with_sessions(1, WireFormat::Compact);
    let addon = builder(&connector).build().expect("build");

    addon.start();
    settle().await;
    servers[0].accept("a1").await;

    let sent_at = Instant::now();
    let pending = tokio::spawn({
        let addon = addon.clone();
        async move { addon.send_discord_message(&ClientId::new("c1"), "hi").await }
    });
    servers[0].next_frame().await;

    let err = pending.await.expect("join").unwrap_err();
    assert!(err.is_timeout());
    assert_near(Instant::now() - sent_at, 10_000);

    // The timed-out entry is gone, so a fresh request gets the next result
    let next = tokio::spawn({
        let addon = addon.clone();
        async move { addon.send_discord_message(&ClientId::new("c1"), "again").await }
    });
    servers[0].next_frame().await;
    servers[0].push("addon-dm-result", json!({ "ok": true }));
    next.await.expect("join").expect("delivered");

    addon.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_late_result_settles_next_request() {
    let (connector, mut servers) = MockConnector::with_sessions(1, WireFormat::Compact);
    let addon = builder(&connector)
        .dm_timeout(Duration::from_millis(500))
        .build()
        .expect("build");

    addon.start();
    settle().await;
    servers[0].accept("a1").await;

    let err = tokio::spawn({
        let addon = addon.clone();
        async move { addon.send_discord_message(&ClientId::new("c1"), "first").await }
    });
    servers[0].next_frame().await;
    assert!(err.await.expect("join").unwrap_err().is_timeout());

    let second = tokio::spawn({
        let addon = addon.clone();
        async move { addon.send_discord_message(&ClientId::new("c1"), "second").await }
    });
    servers[0].next_frame().await;

    // Result for "first" arrives late; results carry no id, so it lands on "second"
    servers[0].push("addon-dm-result", json!({ "ok": false, "err": "blocked" }));
    let err = second.await.expect("join").unwrap_err();
    assert_eq!(err.to_string(), "Direct message failed: blocked");

    addon.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_direct_message_fails_on_disconnect() {
    let (connector, mut servers) = MockConnector::with_sessions(1, WireFormat::Compact);
    let addon = builder(&connector).build().expect("build");

    addon.start();
    settle().await;
    servers[0].accept("a1").await;

    let pending = tokio::spawn({
        let addon = addon.clone();
        async move { addon.send_discord_message(&ClientId::new("c1"), "hi").await }
    });
    servers[0].next_frame().await;
    servers[0].close("gone");

    let err = pending.await.expect("join").unwrap_err();
    assert!(matches!(err, Error::ConnectionClosed));

    addon.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_custom_dm_timeout() {
    let (connector, mut servers) = MockConnector::with_sessions(1, WireFormat::Compact);
    let addon = builder(&connector)
        .dm_timeout(Duration::from_millis(250))
        .build()
        .expect("build");

    addon.start();
    settle().await;
    servers[0].accept("a1").await;

    let sent_at = Instant::now();
    let err = addon
        .send_discord_message(&ClientId::new("c1"), "hi")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::RequestTimeout { timeout_ms: 250, .. }));
    assert_near(Instant::now() - sent_at, 250);

    addon.stop().await;
}
