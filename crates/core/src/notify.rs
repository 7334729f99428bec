//! Fire-and-forget user feedback. Services only return results; whoever called them decides
//! which [`Notice`] to show.

use std::fmt;

use parking_lot::Mutex;

use crate::error::StoreResult;
use crate::services::{MutationOutcome, Operation};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Error,
    Info,
}

impl NoticeKind {
    pub fn label(&self) -> &'static str {
        match self {
            NoticeKind::Success => "ok",
            NoticeKind::Error => "error",
            NoticeKind::Info => "info",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Error,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Info,
            message: message.into(),
        }
    }

    /// At most one notice per terminal state. Successes without a message (loads, ignored
    /// toggles) produce none.
    pub fn from_result<T>(
        operation: Operation,
        result: &StoreResult<MutationOutcome<T>>,
    ) -> Option<Self> {
        match result {
            Ok(outcome) => outcome.notice().map(Notice::success),
            Err(err) => Some(Notice::error(format!(
                "{}: {}",
                operation.failure_message(),
                err
            ))),
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind.label(), self.message)
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Routes the notice for `result`, if any, to `notifier`. Returns whether one was sent.
pub fn dispatch<T>(
    notifier: &dyn Notifier,
    operation: Operation,
    result: &StoreResult<MutationOutcome<T>>,
) -> bool {
    match Notice::from_result(operation, result) {
        Some(notice) => {
            notifier.notify(notice);
            true
        }
        None => false,
    }
}

/// Keeps every notice in arrival order.
#[derive(Debug, Default)]
pub struct NoticeLog {
    notices: Mutex<Vec<Notice>>,
}

impl NoticeLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().clone()
    }

    pub fn take(&self) -> Vec<Notice> {
        std::mem::take(&mut *self.notices.lock())
    }

    pub fn count(&self, kind: NoticeKind) -> usize {
        self.notices
            .lock()
            .iter()
            .filter(|notice| notice.kind == kind)
            .count()
    }

    pub fn has_errors(&self) -> bool {
        self.count(NoticeKind::Error) > 0
    }
}

impl Notifier for NoticeLog {
    fn notify(&self, notice: Notice) {
        tracing::debug!(kind = notice.kind.label(), message = %notice.message, "notice");
        self.notices.lock().push(notice);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{RemoteError, StoreError};
    use pretty_assertions::assert_eq;

    #[test]
    fn success_with_message_becomes_success_notice() {
        let result: StoreResult<MutationOutcome> =
            Ok(MutationOutcome::new(Operation::DeleteNote, ()).with_notice("Note deleted"));
        assert_eq!(
            Notice::from_result(Operation::DeleteNote, &result),
            Some(Notice::success("Note deleted"))
        );
    }

    #[test]
    fn silent_success_produces_no_notice() {
        let log = NoticeLog::new();
        let result: StoreResult<MutationOutcome<usize>> =
            Ok(MutationOutcome::new(Operation::LoadItems, 3));
        assert!(!dispatch(&log, Operation::LoadItems, &result));
        assert!(log.notices().is_empty());
    }

    #[test]
    fn failure_is_worded_by_operation() {
        let log = NoticeLog::new();
        let result: StoreResult<MutationOutcome> =
            Err(StoreError::Remote(RemoteError::new("connection reset")));
        assert!(dispatch(&log, Operation::AddNote, &result));
        assert_eq!(
            log.take(),
            vec![Notice::error("Failed to add note: connection reset")]
        );
        assert!(!log.has_errors());
    }

    #[test]
    fn display_prefixes_kind() {
        assert_eq!(Notice::info("Page 1 of 3").to_string(), "[info] Page 1 of 3");
    }
}
