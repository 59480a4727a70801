use crate::{JobHandle, JobRequest, Notification, RunId};

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Dispatch { run_id: RunId, request: JobRequest },
    OpenStream { run_id: RunId, handle: JobHandle },
    CloseStream { run_id: RunId },
    Notify(Notification),
}
