pub mod config;
pub mod database;
pub mod error;
pub mod export;
pub mod model;
pub mod notify;
pub mod pagination;
pub mod remote;
pub mod services;
pub mod state;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{AppConfig, RemoteConfig};
pub use database::Database;
pub use error::{RemoteError, StoreError, StoreResult};
pub use export::{ExportDocument, ExportSnapshot};
pub use model::*;
pub use notify::{Notice, NoticeKind, NoticeLog, Notifier};
pub use pagination::{PageOf, PageRequest, DEFAULT_PAGE_SIZE};
pub use remote::Backends;
pub use services::{BlogService, BulkUpdate, DaySchedule, MutationOutcome, Operation, RoutineService};
pub use state::{BlogState, CollectionState, RoutineState, Selection};
