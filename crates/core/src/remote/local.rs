use anyhow::{anyhow, Result};
use async_trait::async_trait;

use super::{BlogRemote, RemoteResult, RoutineRemote};
use crate::config::AppConfig;
use crate::database::Database;
use crate::error::RemoteError;
use crate::model::{
    BlogPost, BlogPostUpdate, NewBlogPost, NewRoutineItem, Note, RoutineItem, RoutineItemUpdate,
};
use crate::pagination::{PageOf, PageRequest};

/// Persisted fallback for when no remote is configured. Each call opens its own
/// connection on the blocking pool.
#[derive(Debug, Clone)]
pub struct LocalRemote {
    config: AppConfig,
}

impl LocalRemote {
    /// Creates the schema and seeds the default week on first use.
    pub fn new(config: AppConfig) -> Result<Self> {
        Database::initialize(&config)?;
        Ok(Self { config })
    }

    async fn with_database<T, F>(&self, f: F) -> RemoteResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Database) -> Result<T> + Send + 'static,
    {
        let config = self.config.clone();
        let outcome = tokio::task::spawn_blocking(move || {
            let db = Database::initialize(&config)?;
            f(&db)
        })
        .await
        .map_err(|err| anyhow!("blocking task failed: {}", err))?;
        outcome.map_err(RemoteError::from)
    }
}

#[async_trait]
impl RoutineRemote for LocalRemote {
    async fn fetch_items(&self) -> RemoteResult<Vec<RoutineItem>> {
        self.with_database(|db| db.fetch_items()).await
    }

    async fn create_item(&self, item: &NewRoutineItem) -> RemoteResult<RoutineItem> {
        let item = item.clone();
        self.with_database(move |db| db.insert_item(&item)).await
    }

    // A filter matching no rows is a successful no-op, as it is for the REST backend.
    async fn update_item(&self, id: &str, update: &RoutineItemUpdate) -> RemoteResult<()> {
        let id = id.to_string();
        let update = update.clone();
        self.with_database(move |db| db.update_item(&id, &update).map(|_| ()))
            .await
    }

    async fn delete_item(&self, id: &str) -> RemoteResult<()> {
        let id = id.to_string();
        self.with_database(move |db| db.delete_item(&id).map(|_| ()))
            .await
    }

    async fn fetch_notes(&self, item_id: &str) -> RemoteResult<Vec<Note>> {
        let item_id = item_id.to_string();
        self.with_database(move |db| db.fetch_notes(&item_id)).await
    }

    async fn add_note(&self, item_id: &str, content: &str) -> RemoteResult<Note> {
        let item_id = item_id.to_string();
        let content = content.to_string();
        self.with_database(move |db| db.insert_note(&item_id, &content))
            .await
    }

    async fn delete_note(&self, note_id: &str) -> RemoteResult<()> {
        let note_id = note_id.to_string();
        self.with_database(move |db| db.delete_note(&note_id).map(|_| ()))
            .await
    }

    async fn set_completed(&self, id: &str, completed: bool) -> RemoteResult<()> {
        let id = id.to_string();
        self.with_database(move |db| db.set_completed(&id, completed).map(|_| ()))
            .await
    }
}

#[async_trait]
impl BlogRemote for LocalRemote {
    async fn fetch_posts(&self, page: PageRequest) -> RemoteResult<PageOf<BlogPost>> {
        self.with_database(move |db| db.fetch_posts(&page)).await
    }

    async fn fetch_post(&self, id: &str) -> RemoteResult<BlogPost> {
        let id = id.to_string();
        self.with_database(move |db| {
            db.fetch_post(&id)?
                .ok_or_else(|| anyhow!("Blog post {} not found", id))
        })
        .await
    }

    async fn create_post(&self, post: &NewBlogPost) -> RemoteResult<BlogPost> {
        let post = post.clone();
        self.with_database(move |db| db.insert_post(&post)).await
    }

    async fn update_post(&self, id: &str, update: &BlogPostUpdate) -> RemoteResult<()> {
        let id = id.to_string();
        let update = update.clone();
        self.with_database(move |db| db.update_post(&id, &update).map(|_| ()))
            .await
    }

    async fn delete_post(&self, id: &str) -> RemoteResult<()> {
        let id = id.to_string();
        self.with_database(move |db| db.delete_post(&id).map(|_| ()))
            .await
    }
}
