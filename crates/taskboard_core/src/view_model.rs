use crate::{JobStatus, JobType, Notification, RunId};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppViewModel {
    pub status: JobStatus,
    pub run_id: RunId,
    pub job_type: Option<JobType>,
    pub logfile: Option<String>,
    pub rows: Vec<LogRowView>,
    pub notification: Option<Notification>,
    pub dirty: bool,
}

/// A numbered log line as shown in the logfile panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRowView {
    pub index: u64,
    pub line: String,
}
