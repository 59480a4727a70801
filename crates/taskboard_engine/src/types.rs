use std::time::Duration;

use taskboard_core::{JobHandle, RunId};

/// One decoded log-stream message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamEvent {
    pub data: String,
    pub done: bool,
}

/// Lifecycle of a single log stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Connecting,
    Open,
    /// Terminal success: done event seen or closed by the caller.
    Closed,
    /// Terminal error.
    Failed,
}

impl StreamState {
    pub fn is_terminal(self) -> bool {
        matches!(self, StreamState::Closed | StreamState::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    Dispatched {
        run_id: RunId,
        result: Result<JobHandle, DispatchError>,
    },
    Log {
        run_id: RunId,
        data: String,
        done: bool,
    },
    StreamFailed {
        run_id: RunId,
        error: StreamError,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    #[error("backend rejected request with HTTP {status}: {body}")]
    BackendRejected { status: u16, body: String },
    #[error("malformed dispatch response: {0}")]
    MalformedResponse(String),
    #[error("dispatch transport error: {0}")]
    Transport(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StreamError {
    #[error("log stream connection failed: {0}")]
    ConnectionFailed(String),
    #[error("undecodable log stream message: {0}")]
    DecodeFailure(String),
    #[error("log stream aborted by server: {0}")]
    AbortedByServer(String),
    #[error("log stream idle for {0:?}")]
    IdleTimeout(Duration),
}

/// Errors raised while setting up the engine itself.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("invalid base url '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
    #[error("failed to build http client: {0}")]
    Client(String),
    #[error("failed to start async runtime: {0}")]
    Runtime(#[from] std::io::Error),
}
