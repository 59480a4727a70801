use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use pretty_assertions::assert_eq;
use taskboard_core::JobHandle;
use taskboard_engine::{
    open_stream, Connector, StreamError, StreamHandle, StreamObserver, StreamState, Transport,
};
use tokio::sync::{mpsc, Notify};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Callback {
    Event(String, bool),
    Error(StreamError),
}

#[derive(Default)]
struct RecordingObserver {
    calls: Mutex<Vec<Callback>>,
}

impl RecordingObserver {
    fn calls(&self) -> Vec<Callback> {
        self.calls.lock().unwrap().clone()
    }
}

impl StreamObserver for RecordingObserver {
    fn on_event(&self, data: String, is_terminal: bool) {
        self.calls
            .lock()
            .unwrap()
            .push(Callback::Event(data, is_terminal));
    }

    fn on_error(&self, error: StreamError) {
        self.calls.lock().unwrap().push(Callback::Error(error));
    }
}

struct ScriptedTransport {
    rx: mpsc::UnboundedReceiver<Result<String, StreamError>>,
    releases: Arc<AtomicUsize>,
}

#[async_trait::async_trait]
impl Transport for ScriptedTransport {
    async fn next_message(&mut self) -> Option<Result<String, StreamError>> {
        self.rx.recv().await
    }

    fn release(&mut self) {
        self.releases.fetch_add(1, Ordering::SeqCst);
    }
}

struct ScriptedConnector {
    transport: Mutex<Option<ScriptedTransport>>,
    refuse: Option<StreamError>,
}

#[async_trait::async_trait]
impl Connector for ScriptedConnector {
    type Transport = ScriptedTransport;

    async fn connect(&self, _handle: &JobHandle) -> Result<ScriptedTransport, StreamError> {
        if let Some(err) = self.refuse.clone() {
            return Err(err);
        }
        Ok(self
            .transport
            .lock()
            .unwrap()
            .take()
            .expect("single connect"))
    }
}

struct Harness {
    tx: mpsc::UnboundedSender<Result<String, StreamError>>,
    releases: Arc<AtomicUsize>,
    observer: Arc<RecordingObserver>,
    stream: StreamHandle,
}

fn start(idle_timeout: Option<Duration>) -> Harness {
    let (tx, rx) = mpsc::unbounded_channel();
    let releases = Arc::new(AtomicUsize::new(0));
    let connector = Arc::new(ScriptedConnector {
        transport: Mutex::new(Some(ScriptedTransport {
            rx,
            releases: releases.clone(),
        })),
        refuse: None,
    });
    let observer = Arc::new(RecordingObserver::default());
    let stream = open_stream(
        connector,
        JobHandle::new("run-42.log"),
        observer.clone(),
        idle_timeout,
    );
    Harness {
        tx,
        releases,
        observer,
        stream,
    }
}

fn message(data: &str, done: bool) -> Result<String, StreamError> {
    Ok(serde_json::json!({ "event": "log", "data": data, "done": done }).to_string())
}

async fn wait_for_state(stream: &StreamHandle, wanted: StreamState) {
    for _ in 0..200 {
        if stream.state() == wanted {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("stream never reached {wanted:?}, still {:?}", stream.state());
}

#[tokio::test]
async fn events_arrive_in_order_and_done_closes_stream() {
    let harness = start(None);
    for (data, done) in [("row 1 ok", false), ("row 2 ok", false), ("complete", true)] {
        harness.tx.send(message(data, done)).unwrap();
    }
    // Anything after the terminal event is never read.
    harness.tx.send(message("ghost", false)).unwrap();

    let state = harness.stream.finished().await;

    assert_eq!(state, StreamState::Closed);
    assert_eq!(
        harness.observer.calls(),
        vec![
            Callback::Event("row 1 ok".to_string(), false),
            Callback::Event("row 2 ok".to_string(), false),
            Callback::Event("complete".to_string(), true),
        ]
    );
    assert_eq!(harness.releases.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn many_messages_keep_arrival_order() {
    let harness = start(None);
    let lines: Vec<String> = (0..100).map(|i| format!("line {i}")).collect();
    for line in &lines {
        harness.tx.send(message(line, false)).unwrap();
    }
    harness.tx.send(message("DONE", true)).unwrap();

    harness.stream.finished().await;

    let received: Vec<String> = harness
        .observer
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            Callback::Event(data, false) => Some(data),
            _ => None,
        })
        .collect();
    assert_eq!(received, lines);
}

#[tokio::test]
async fn close_releases_once_and_silences_callbacks() {
    let harness = start(None);
    wait_for_state(&harness.stream, StreamState::Open).await;

    harness.stream.close();
    assert_eq!(harness.stream.state(), StreamState::Closed);
    harness.stream.close();
    let _ = harness.tx.send(message("too late", false));
    let _ = harness.tx.send(Err(StreamError::AbortedByServer("reset".to_string())));

    let state = harness.stream.finished().await;

    assert_eq!(state, StreamState::Closed);
    assert!(harness.observer.calls().is_empty());
    assert_eq!(harness.releases.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn undecodable_message_fails_stream() {
    let harness = start(None);
    harness.tx.send(message("row 1 ok", false)).unwrap();
    harness.tx.send(Ok("row 2 ok".to_string())).unwrap();

    let state = harness.stream.finished().await;

    assert_eq!(state, StreamState::Failed);
    let calls = harness.observer.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0], Callback::Event("row 1 ok".to_string(), false));
    assert!(matches!(calls[1], Callback::Error(StreamError::DecodeFailure(_))));
    assert_eq!(harness.releases.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn server_closing_before_done_is_abort() {
    let harness = start(None);
    harness.tx.send(message("row 1 ok", false)).unwrap();
    drop(harness.tx);

    let state = harness.stream.finished().await;

    assert_eq!(state, StreamState::Failed);
    let calls = harness.observer.calls();
    assert_eq!(calls.len(), 2);
    assert!(matches!(calls[1], Callback::Error(StreamError::AbortedByServer(_))));
    assert_eq!(harness.releases.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn transport_error_fails_stream_once() {
    let harness = start(None);
    let error = StreamError::AbortedByServer("connection reset".to_string());
    harness.tx.send(Err(error.clone())).unwrap();
    harness.tx.send(Err(error.clone())).unwrap();

    let state = harness.stream.finished().await;

    assert_eq!(state, StreamState::Failed);
    assert_eq!(harness.observer.calls(), vec![Callback::Error(error)]);
    assert_eq!(harness.releases.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn idle_stream_times_out_when_configured() {
    let harness = start(Some(Duration::from_millis(50)));

    let state = harness.stream.finished().await;

    assert_eq!(state, StreamState::Failed);
    assert_eq!(
        harness.observer.calls(),
        vec![Callback::Error(StreamError::IdleTimeout(Duration::from_millis(
            50
        )))]
    );
    assert_eq!(harness.releases.load(Ordering::SeqCst), 1);
    drop(harness.tx);
}

#[tokio::test]
async fn connection_failure_reports_error_without_release() {
    let connector = Arc::new(ScriptedConnector {
        transport: Mutex::new(None),
        refuse: Some(StreamError::ConnectionFailed("refused".to_string())),
    });
    let observer = Arc::new(RecordingObserver::default());

    let stream = open_stream(
        connector,
        JobHandle::new("run-42.log"),
        observer.clone(),
        None,
    );
    let state = stream.finished().await;

    assert_eq!(state, StreamState::Failed);
    assert_eq!(
        observer.calls(),
        vec![Callback::Error(StreamError::ConnectionFailed(
            "refused".to_string()
        ))]
    );
}

/// Connector that stays in `connect` until the gate opens.
struct GatedConnector {
    gate: Arc<Notify>,
    releases: Arc<AtomicUsize>,
}

#[async_trait::async_trait]
impl Connector for GatedConnector {
    type Transport = EndlessTransport;

    async fn connect(&self, _handle: &JobHandle) -> Result<EndlessTransport, StreamError> {
        self.gate.notified().await;
        Ok(EndlessTransport {
            sent: 0,
            releases: self.releases.clone(),
        })
    }
}

/// Transport that always has another log line ready.
struct EndlessTransport {
    sent: u64,
    releases: Arc<AtomicUsize>,
}

#[async_trait::async_trait]
impl Transport for EndlessTransport {
    async fn next_message(&mut self) -> Option<Result<String, StreamError>> {
        self.sent += 1;
        tokio::task::yield_now().await;
        Some(message(&format!("line {}", self.sent), false))
    }

    fn release(&mut self) {
        self.releases.fetch_add(1, Ordering::SeqCst);
    }
}

#[tokio::test]
async fn close_while_connecting_never_calls_back() {
    let gate = Arc::new(Notify::new());
    let releases = Arc::new(AtomicUsize::new(0));
    let connector = Arc::new(GatedConnector {
        gate: gate.clone(),
        releases: releases.clone(),
    });
    let observer = Arc::new(RecordingObserver::default());
    let stream = open_stream(
        connector,
        JobHandle::new("run-42.log"),
        observer.clone(),
        None,
    );
    assert_eq!(stream.state(), StreamState::Connecting);

    stream.close();
    gate.notify_one();
    let state = stream.finished().await;

    assert_eq!(state, StreamState::Closed);
    assert!(observer.calls().is_empty());
    assert_eq!(releases.load(Ordering::SeqCst), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn no_callback_lands_after_close_returns() {
    for _ in 0..200 {
        let gate = Arc::new(Notify::new());
        let releases = Arc::new(AtomicUsize::new(0));
        let connector = Arc::new(GatedConnector {
            gate: gate.clone(),
            releases: releases.clone(),
        });
        let observer = Arc::new(RecordingObserver::default());
        let stream = open_stream(
            connector,
            JobHandle::new("run-42.log"),
            observer.clone(),
            None,
        );
        gate.notify_one();
        while observer.calls().len() < 50 {
            tokio::task::yield_now().await;
        }

        stream.close();
        let seen = observer.calls().len();
        tokio::time::sleep(Duration::from_millis(1)).await;

        assert_eq!(observer.calls().len(), seen);
        assert_eq!(stream.finished().await, StreamState::Closed);
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }
}
