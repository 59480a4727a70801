use crate::{JobHandle, JobRequest, RunId};

#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    /// User asked to start a job. Ignored unless the view state is idle.
    RunJob(JobRequest),
    /// Dispatcher returned a log stream handle for the run.
    DispatchSucceeded { run_id: RunId, handle: JobHandle },
    /// Dispatcher rejected the request or its response was unusable.
    DispatchFailed { run_id: RunId, reason: String },
    /// One decoded stream event. `terminal` is the event's `done` flag.
    LogReceived {
        run_id: RunId,
        payload: String,
        terminal: bool,
    },
    /// Stream failed after the handle was obtained.
    StreamFailed { run_id: RunId, reason: String },
    /// User clicked Cancel.
    CancelRequested,
    /// Return to idle so a fresh job can be run.
    Reset,
    /// Poll interval elapsed with no engine event.
    Tick,
}
