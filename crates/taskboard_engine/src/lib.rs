//! Taskboard engine: job dispatch and log-stream IO.
mod decode;
mod dispatch;
mod engine;
mod settings;
mod sse;
mod stream;
mod transport;
mod types;

pub use decode::decode_event;
pub use dispatch::{Dispatcher, ReqwestDispatcher};
pub use engine::EngineHandle;
pub use settings::EngineSettings;
pub use sse::SseDecoder;
pub use stream::{open_stream, Connector, StreamHandle, StreamObserver, Transport};
pub use transport::{ReqwestConnector, SseTransport};
pub use types::{DispatchError, EngineError, EngineEvent, StreamError, StreamEvent, StreamState};
