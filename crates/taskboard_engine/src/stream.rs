//! Log stream consumer.
//!
//! A stream runs as one tokio task that exclusively owns its transport and
//! walks `Connecting -> Open -> Closed | Failed`. Observers are called from
//! that task, in transport order, one message at a time. Terminal callbacks
//! fire at most once and the transport is released exactly once.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use engine_logging::{engine_debug, engine_info, engine_warn};
use taskboard_core::JobHandle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::decode::decode_event;
use crate::{StreamError, StreamState};

/// Receives the decoded events of one stream.
///
/// Callbacks run while the stream's state lock is held, so they must not call
/// back into the owning `StreamHandle`.
pub trait StreamObserver: Send + Sync {
    /// One decoded message; `is_terminal` mirrors the event's `done` flag.
    fn on_event(&self, data: String, is_terminal: bool);
    /// The stream failed. Called at most once, never after `on_event(_, true)`.
    fn on_error(&self, error: StreamError);
}

/// An open server-push connection yielding raw message payloads.
#[async_trait::async_trait]
pub trait Transport: Send {
    /// Next message data, or `None` once the server has closed the stream.
    async fn next_message(&mut self) -> Option<Result<String, StreamError>>;

    /// Drop the underlying connection.
    fn release(&mut self);
}

/// Opens transports for job handles.
#[async_trait::async_trait]
pub trait Connector: Send + Sync {
    type Transport: Transport + 'static;

    async fn connect(&self, handle: &JobHandle) -> Result<Self::Transport, StreamError>;
}

/// Caller side of a running stream. Dropping it closes the stream.
pub struct StreamHandle {
    cancel: CancellationToken,
    state: Arc<Mutex<StreamState>>,
    task: Option<JoinHandle<()>>,
}

impl StreamHandle {
    pub fn state(&self) -> StreamState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Close the stream unless it already reached a terminal state.
    ///
    /// The stream reports `Closed` immediately. Callbacks run under the same
    /// lock, so once this returns none is running and none will start. The
    /// transport is released by the stream task.
    pub fn close(&self) {
        {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            if !state.is_terminal() {
                *state = StreamState::Closed;
            }
        }
        self.cancel.cancel();
    }

    /// Wait for the stream task to finish and return the terminal state.
    pub async fn finished(mut self) -> StreamState {
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
        self.state()
    }
}

impl Drop for StreamHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Start consuming the stream for `handle`. Must be called inside a tokio runtime.
pub fn open_stream<C>(
    connector: Arc<C>,
    handle: JobHandle,
    observer: Arc<dyn StreamObserver>,
    idle_timeout: Option<Duration>,
) -> StreamHandle
where
    C: Connector + 'static,
{
    let cancel = CancellationToken::new();
    let state = Arc::new(Mutex::new(StreamState::Connecting));
    let session = StreamSession {
        connector,
        handle,
        observer,
        idle_timeout,
        cancel: cancel.clone(),
        state: state.clone(),
        transport: None,
    };
    let task = tokio::spawn(session.run());
    StreamHandle {
        cancel,
        state,
        task: Some(task),
    }
}

struct StreamSession<C: Connector> {
    connector: Arc<C>,
    handle: JobHandle,
    observer: Arc<dyn StreamObserver>,
    idle_timeout: Option<Duration>,
    cancel: CancellationToken,
    state: Arc<Mutex<StreamState>>,
    transport: Option<C::Transport>,
}

enum Step {
    Cancelled,
    Message(Option<Result<String, StreamError>>),
}

impl<C: Connector> StreamSession<C> {
    async fn run(mut self) {
        let logfile = self.handle.log_stream_id.clone();
        let cancel = self.cancel.clone();

        let connected = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            result = self.connector.connect(&self.handle) => Some(result),
        };
        match connected {
            None => {
                engine_debug!("Stream {} closed while connecting", logfile);
                self.close();
                return;
            }
            Some(Err(err)) => {
                self.fail(err);
                return;
            }
            Some(Ok(transport)) => {
                self.transport = Some(transport);
                if !self.transition(StreamState::Open) {
                    self.close();
                    return;
                }
                engine_info!("Stream {} open", logfile);
            }
        }

        loop {
            let step = {
                let Some(transport) = self.transport.as_mut() else {
                    return;
                };
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => Step::Cancelled,
                    next = next_with_idle(transport, self.idle_timeout) => Step::Message(next),
                }
            };

            let raw = match step {
                Step::Cancelled => {
                    engine_debug!("Stream {} closed by caller", logfile);
                    self.close();
                    return;
                }
                Step::Message(None) => {
                    self.fail(StreamError::AbortedByServer(
                        "stream ended before the done event".to_string(),
                    ));
                    return;
                }
                Step::Message(Some(Err(err))) => {
                    self.fail(err);
                    return;
                }
                Step::Message(Some(Ok(raw))) => raw,
            };

            let event = match decode_event(&raw) {
                Ok(event) => event,
                Err(err) => {
                    self.fail(err);
                    return;
                }
            };

            let terminal = event.done;
            if !self.deliver(event.data, terminal) {
                engine_debug!("Stream {} closed before delivery", logfile);
                self.release();
                return;
            }
            if terminal {
                engine_info!("Stream {} done", logfile);
                self.release();
                return;
            }
        }
    }

    /// Hands one event to the observer unless the stream is already terminal.
    /// A terminal event moves the stream to `Closed` in the same critical section.
    fn deliver(&self, data: String, terminal: bool) -> bool {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.is_terminal() {
            return false;
        }
        self.observer.on_event(data, terminal);
        if terminal {
            *state = StreamState::Closed;
        }
        true
    }

    /// Moves to `next` unless a terminal state was already set (e.g. by `close`).
    fn transition(&self, next: StreamState) -> bool {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.is_terminal() {
            return false;
        }
        *state = next;
        true
    }

    fn close(&mut self) {
        self.transition(StreamState::Closed);
        self.release();
    }

    fn fail(&mut self, error: StreamError) {
        self.release();
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.is_terminal() {
            engine_debug!(
                "Stream {} error after close ignored: {}",
                self.handle.log_stream_id,
                error
            );
            return;
        }
        *state = StreamState::Failed;
        engine_warn!("Stream {} failed: {}", self.handle.log_stream_id, error);
        self.observer.on_error(error);
    }

    fn release(&mut self) {
        if let Some(mut transport) = self.transport.take() {
            transport.release();
        }
    }
}

async fn next_with_idle<T: Transport>(
    transport: &mut T,
    idle_timeout: Option<Duration>,
) -> Option<Result<String, StreamError>> {
    match idle_timeout {
        Some(limit) => match tokio::time::timeout(limit, transport.next_message()).await {
            Ok(next) => next,
            Err(_) => Some(Err(StreamError::IdleTimeout(limit))),
        },
        None => transport.next_message().await,
    }
}
