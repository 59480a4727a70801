use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use engine_logging::{engine_debug, engine_info};
use taskboard_core::{JobHandle, JobRequest, RunId};

use crate::dispatch::{Dispatcher, ReqwestDispatcher};
use crate::stream::{open_stream, Connector, StreamHandle, StreamObserver};
use crate::transport::ReqwestConnector;
use crate::{EngineError, EngineEvent, EngineSettings, StreamError};

enum EngineCommand {
    Dispatch { run_id: RunId, request: JobRequest },
    OpenStream { run_id: RunId, handle: JobHandle },
    CloseStream { run_id: RunId },
}

/// Runs dispatches and the log stream on a background tokio runtime.
///
/// Commands go in through the handle's methods; results come back as
/// `EngineEvent`s in the order the engine produced them. At most one stream is
/// active: opening another closes the previous one.
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    event_rx: mpsc::Receiver<EngineEvent>,
}

impl EngineHandle {
    pub fn new(settings: EngineSettings) -> Result<Self, EngineError> {
        let dispatcher = Arc::new(ReqwestDispatcher::new(&settings)?);
        let connector = Arc::new(ReqwestConnector::new(&settings)?);
        Self::with_parts(dispatcher, connector, settings.stream_idle_timeout)
    }

    pub fn with_parts<C>(
        dispatcher: Arc<dyn Dispatcher>,
        connector: Arc<C>,
        idle_timeout: Option<Duration>,
    ) -> Result<Self, EngineError>
    where
        C: Connector + 'static,
    {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let runtime = tokio::runtime::Runtime::new()?;

        thread::spawn(move || {
            let mut active: Option<(RunId, StreamHandle)> = None;
            while let Ok(command) = cmd_rx.recv() {
                match command {
                    EngineCommand::Dispatch { run_id, request } => {
                        let dispatcher = dispatcher.clone();
                        let event_tx = event_tx.clone();
                        runtime.spawn(async move {
                            let result = dispatcher.start_job(&request).await;
                            let _ = event_tx.send(EngineEvent::Dispatched { run_id, result });
                        });
                    }
                    EngineCommand::OpenStream { run_id, handle } => {
                        if let Some((previous, stream)) = active.take() {
                            engine_debug!(
                                "Closing stream of run {} before opening run {}",
                                previous,
                                run_id
                            );
                            stream.close();
                        }
                        let observer = Arc::new(ChannelObserver {
                            run_id,
                            tx: event_tx.clone(),
                        });
                        let _guard = runtime.enter();
                        let stream =
                            open_stream(connector.clone(), handle, observer, idle_timeout);
                        active = Some((run_id, stream));
                    }
                    EngineCommand::CloseStream { run_id } => match active.take() {
                        Some((current, stream)) if current == run_id => {
                            engine_info!("Closing stream of run {}", run_id);
                            stream.close();
                        }
                        other => active = other,
                    },
                }
            }
            engine_debug!("Engine command channel closed; shutting down");
        });

        Ok(Self { cmd_tx, event_rx })
    }

    pub fn dispatch(&self, run_id: RunId, request: JobRequest) {
        let _ = self.cmd_tx.send(EngineCommand::Dispatch { run_id, request });
    }

    pub fn open_stream(&self, run_id: RunId, handle: JobHandle) {
        let _ = self.cmd_tx.send(EngineCommand::OpenStream { run_id, handle });
    }

    pub fn close_stream(&self, run_id: RunId) {
        let _ = self.cmd_tx.send(EngineCommand::CloseStream { run_id });
    }

    pub fn try_recv(&self) -> Option<EngineEvent> {
        self.event_rx.try_recv().ok()
    }

    /// Block up to `timeout` for the next event.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<EngineEvent> {
        self.event_rx.recv_timeout(timeout).ok()
    }
}

struct ChannelObserver {
    run_id: RunId,
    tx: mpsc::Sender<EngineEvent>,
}

impl StreamObserver for ChannelObserver {
    fn on_event(&self, data: String, is_terminal: bool) {
        let _ = self.tx.send(EngineEvent::Log {
            run_id: self.run_id,
            data,
            done: is_terminal,
        });
    }

    fn on_error(&self, error: StreamError) {
        let _ = self.tx.send(EngineEvent::StreamFailed {
            run_id: self.run_id,
            error,
        });
    }
}
