use std::time::Duration;

use engine_logging::{engine_debug, engine_info};
use taskboard_core::{Effect, Msg};
use taskboard_engine::{EngineEvent, EngineHandle};

/// Executes IO effects on the engine and turns engine events back into messages.
pub struct EffectRunner {
    engine: EngineHandle,
}

impl EffectRunner {
    pub fn new(engine: EngineHandle) -> Self {
        Self { engine }
    }

    /// Runs one IO effect. Returns the effect back if it is not an engine concern.
    pub fn run(&self, effect: Effect) -> Option<Effect> {
        match effect {
            Effect::Dispatch { run_id, request } => {
                engine_info!(
                    "Dispatch run_id={} job={}/{} parameters={}",
                    run_id,
                    request.source,
                    request.job_type,
                    request.parameters.len()
                );
                self.engine.dispatch(run_id, request);
                None
            }
            Effect::OpenStream { run_id, handle } => {
                engine_info!("OpenStream run_id={} logfile={}", run_id, handle.log_stream_id);
                self.engine.open_stream(run_id, handle);
                None
            }
            Effect::CloseStream { run_id } => {
                engine_info!("CloseStream run_id={}", run_id);
                self.engine.close_stream(run_id);
                None
            }
            other @ Effect::Notify(_) => Some(other),
        }
    }

    /// Wait up to `timeout` for the next engine event, mapped to a message.
    pub fn next_msg(&self, timeout: Duration) -> Option<Msg> {
        self.engine.recv_timeout(timeout).map(map_event)
    }
}

fn map_event(event: EngineEvent) -> Msg {
    match event {
        EngineEvent::Dispatched {
            run_id,
            result: Ok(handle),
        } => Msg::DispatchSucceeded { run_id, handle },
        EngineEvent::Dispatched {
            run_id,
            result: Err(err),
        } => {
            engine_debug!("Run {} dispatch error: {:?}", run_id, err);
            Msg::DispatchFailed {
                run_id,
                reason: err.to_string(),
            }
        }
        EngineEvent::Log { run_id, data, done } => Msg::LogReceived {
            run_id,
            payload: data,
            terminal: done,
        },
        EngineEvent::StreamFailed { run_id, error } => {
            engine_debug!("Run {} stream error: {:?}", run_id, error);
            Msg::StreamFailed {
                run_id,
                reason: error.to_string(),
            }
        }
    }
}
