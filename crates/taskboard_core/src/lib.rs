//! Taskboard core: pure job/view state machine and view-model helpers.
mod effect;
mod job;
mod msg;
mod notification;
mod state;
mod update;
mod view_model;

pub use effect::Effect;
pub use job::{JobHandle, JobRequest, JobType, LogRecord, RunId, UnknownJobType, DEFAULT_SOURCE};
pub use msg::Msg;
pub use notification::{Notification, NotificationKind};
pub use state::{AppState, JobStatus};
pub use update::update;
pub use view_model::{AppViewModel, LogRowView};
