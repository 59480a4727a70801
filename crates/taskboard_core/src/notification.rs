use crate::{JobType, RunId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    /// Spinner-style toast that a later notification with the same id replaces.
    Pending,
    Success,
    Error,
}

/// A user-visible toast. Notifications sharing an `id` update one toast in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub id: RunId,
    pub kind: NotificationKind,
    pub message: String,
}

impl Notification {
    pub(crate) fn streaming(id: RunId, job_type: JobType) -> Self {
        Self {
            id,
            kind: NotificationKind::Pending,
            message: format!("{}...", job_type.progress_phrase()),
        }
    }

    pub(crate) fn completed(id: RunId, job_type: JobType) -> Self {
        Self {
            id,
            kind: NotificationKind::Success,
            message: format!("{}!", job_type.done_phrase()),
        }
    }

    pub(crate) fn dispatch_failed(id: RunId, job_type: JobType) -> Self {
        Self {
            id,
            kind: NotificationKind::Error,
            message: format!(
                "Something went wrong during {} request!",
                job_type.activity()
            ),
        }
    }

    pub(crate) fn stream_failed(id: RunId, job_type: JobType) -> Self {
        Self {
            id,
            kind: NotificationKind::Error,
            message: format!("Lost the {} log stream!", job_type.activity()),
        }
    }

    pub(crate) fn cancelled(id: RunId, job_type: JobType) -> Self {
        let activity = job_type.activity();
        let mut chars = activity.chars();
        let capitalized = match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
            None => String::new(),
        };
        Self {
            id,
            kind: NotificationKind::Error,
            message: format!("{capitalized} cancelled."),
        }
    }
}
