use crate::view_model::{AppViewModel, LogRowView};
use crate::{JobHandle, JobType, LogRecord, Notification, RunId};

/// Lifecycle of the single job a view state tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JobStatus {
    #[default]
    Idle,
    Pending,
    Streaming,
    Completed,
    Failed,
}

impl JobStatus {
    /// Pending or Streaming: a run is in flight.
    pub fn is_active(self) -> bool {
        matches!(self, JobStatus::Pending | JobStatus::Streaming)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppState {
    run_id: RunId,
    job_type: Option<JobType>,
    handle: Option<JobHandle>,
    records: Vec<LogRecord>,
    status: JobStatus,
    notification: Option<Notification>,
    dirty: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    /// Id of the current (or most recent) run; 0 before the first run.
    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    pub fn handle(&self) -> Option<&JobHandle> {
        self.handle.as_ref()
    }

    pub fn records(&self) -> &[LogRecord] {
        &self.records
    }

    pub fn view(&self) -> AppViewModel {
        AppViewModel {
            status: self.status,
            run_id: self.run_id,
            job_type: self.job_type,
            logfile: self
                .handle
                .as_ref()
                .map(|handle| handle.log_stream_id.clone()),
            rows: self
                .records
                .iter()
                .map(|record| LogRowView {
                    index: record.sequence,
                    line: record.payload.trim_end_matches(['\r', '\n']).to_string(),
                })
                .collect(),
            notification: self.notification.clone(),
            dirty: self.dirty,
        }
    }

    /// Returns whether state changed since the last call and clears the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn job_type(&self) -> Option<JobType> {
        self.job_type
    }

    /// True when `run_id` belongs to the run this state is tracking.
    pub(crate) fn is_current(&self, run_id: RunId) -> bool {
        self.run_id == run_id
    }

    pub(crate) fn begin_run(&mut self, job_type: JobType) -> RunId {
        self.run_id += 1;
        self.job_type = Some(job_type);
        self.handle = None;
        self.records.clear();
        self.notification = None;
        self.status = JobStatus::Pending;
        self.dirty = true;
        self.run_id
    }

    pub(crate) fn attach_stream(&mut self, handle: JobHandle) {
        self.handle = Some(handle);
        self.status = JobStatus::Streaming;
        self.dirty = true;
    }

    pub(crate) fn append_record(&mut self, payload: String) {
        debug_assert!(self.status.is_active());
        let sequence = self.records.len() as u64;
        self.records.push(LogRecord { sequence, payload });
        self.dirty = true;
    }

    pub(crate) fn finish(&mut self, status: JobStatus) {
        debug_assert!(status.is_terminal());
        self.status = status;
        self.dirty = true;
    }

    pub(crate) fn set_notification(&mut self, notification: Notification) {
        self.notification = Some(notification);
        self.dirty = true;
    }

    /// Back to idle. The run counter survives so late events of the old run stay stale.
    pub(crate) fn reset(&mut self) {
        let run_id = self.run_id;
        *self = Self {
            run_id,
            dirty: true,
            ..Self::default()
        };
    }
}
