//! Mutation services: remote call first, then the matching local transition.
//!
//! Each service owns its state for the lifetime of one application instance. The state lock is
//! only taken between remote calls, so concurrent operations interleave at `.await` points and
//! never while a merge is in progress.

mod blog;
mod routine;

pub use blog::BlogService;
pub use routine::{BulkUpdate, DaySchedule, RoutineService};

use crate::error::StoreError;

/// The user-triggered operations a service runs, used to word notifications and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    LoadItems,
    LoadNotes,
    AddItem,
    UpdateItem,
    DeleteItem,
    AddNote,
    DeleteNote,
    ToggleCompleted,
    Export,
    LoadPosts,
    LoadPost,
    AddPost,
    EditPost,
    RemovePost,
}

impl Operation {
    pub fn failure_message(self) -> &'static str {
        match self {
            Operation::LoadItems => "Failed to load your routine data",
            Operation::LoadNotes => "Failed to load notes",
            Operation::AddItem => "Failed to add routine item",
            Operation::UpdateItem => "Failed to update routine item",
            Operation::DeleteItem => "Failed to delete routine item",
            Operation::AddNote => "Failed to add note",
            Operation::DeleteNote => "Failed to delete note",
            Operation::ToggleCompleted => "Failed to update status",
            Operation::Export => "Failed to export data",
            Operation::LoadPosts => "Failed to load blog posts",
            Operation::LoadPost => "Failed to load blog post",
            Operation::AddPost => "Failed to create blog post",
            Operation::EditPost => "Failed to update blog post",
            Operation::RemovePost => "Failed to delete blog post",
        }
    }
}

/// What a successful operation did.
#[derive(Debug, Clone, PartialEq)]
pub struct MutationOutcome<T = ()> {
    pub operation: Operation,
    pub value: T,
    /// False when the target id was not in local state, so only the remote changed.
    pub applied_locally: bool,
    notice: Option<String>,
}

impl<T> MutationOutcome<T> {
    pub(crate) fn new(operation: Operation, value: T) -> Self {
        Self {
            operation,
            value,
            applied_locally: true,
            notice: None,
        }
    }

    pub(crate) fn with_notice(mut self, message: impl Into<String>) -> Self {
        self.notice = Some(message.into());
        self
    }

    pub(crate) fn applied(mut self, applied_locally: bool) -> Self {
        self.applied_locally = applied_locally;
        self
    }

    /// Success message for the user, if this outcome warrants one.
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn into_value(self) -> T {
        self.value
    }
}

pub(crate) fn log_failure(operation: Operation, id: Option<&str>, err: &StoreError) {
    tracing::error!(
        ?operation,
        id = id.unwrap_or("-"),
        error = %err,
        "{}",
        operation.failure_message()
    );
}
