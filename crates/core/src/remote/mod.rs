//! The seam between the in-memory store and the external data store.
//!
//! Each accessor performs exactly one call against the backing table and maps row shapes to
//! model types. There are no retries: a failure surfaces as a [`RemoteError`].

mod http;
mod local;
pub(crate) mod rows;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use crate::config::AppConfig;
use crate::error::RemoteError;
use crate::model::{
    BlogPost, BlogPostUpdate, NewBlogPost, NewRoutineItem, Note, RoutineItem, RoutineItemUpdate,
};
use crate::pagination::{PageOf, PageRequest};

pub use http::HttpRemote;
pub use local::LocalRemote;

pub type RemoteResult<T> = std::result::Result<T, RemoteError>;

/// `routine_items` and `routine_notes`.
#[async_trait]
pub trait RoutineRemote: Send + Sync {
    /// All items ordered by time range. Notes are not included.
    async fn fetch_items(&self) -> RemoteResult<Vec<RoutineItem>>;

    async fn create_item(&self, item: &NewRoutineItem) -> RemoteResult<RoutineItem>;

    async fn update_item(&self, id: &str, update: &RoutineItemUpdate) -> RemoteResult<()>;

    async fn delete_item(&self, id: &str) -> RemoteResult<()>;

    /// Notes of one item, newest first.
    async fn fetch_notes(&self, item_id: &str) -> RemoteResult<Vec<Note>>;

    async fn add_note(&self, item_id: &str, content: &str) -> RemoteResult<Note>;

    async fn delete_note(&self, note_id: &str) -> RemoteResult<()>;

    async fn set_completed(&self, id: &str, completed: bool) -> RemoteResult<()>;
}

/// `blog_posts`.
#[async_trait]
pub trait BlogRemote: Send + Sync {
    /// One page ordered by date (newest first) plus the exact row count.
    async fn fetch_posts(&self, page: PageRequest) -> RemoteResult<PageOf<BlogPost>>;

    async fn fetch_post(&self, id: &str) -> RemoteResult<BlogPost>;

    async fn create_post(&self, post: &NewBlogPost) -> RemoteResult<BlogPost>;

    async fn update_post(&self, id: &str, update: &BlogPostUpdate) -> RemoteResult<()>;

    async fn delete_post(&self, id: &str) -> RemoteResult<()>;
}

#[derive(Clone)]
pub struct Backends {
    pub routine: Arc<dyn RoutineRemote>,
    pub blog: Arc<dyn BlogRemote>,
}

/// Uses the configured REST endpoint, or the local SQLite store when none is set.
pub fn open(config: &AppConfig) -> Result<Backends> {
    match config.remote() {
        Some(remote) => {
            let http = Arc::new(HttpRemote::new(remote)?);
            tracing::debug!(url = remote.url.as_str(), "using remote data store");
            Ok(Backends {
                routine: http.clone(),
                blog: http,
            })
        }
        None => {
            let local = Arc::new(LocalRemote::new(config.clone())?);
            tracing::debug!(
                path = %config.db_path().display(),
                "no remote configured, using local store"
            );
            Ok(Backends {
                routine: local.clone(),
                blog: local,
            })
        }
    }
}
