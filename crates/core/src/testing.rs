//! Fixtures and an in-memory remote with failure injection, shared by the unit tests.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use parking_lot::Mutex;

use crate::error::RemoteError;
use crate::model::{
    BlogPost, BlogPostUpdate, NewBlogPost, NewRoutineItem, Note, RoutineItem, RoutineItemUpdate,
    TimeBlock, WeekDay,
};
use crate::pagination::{PageOf, PageRequest};
use crate::remote::{BlogRemote, RemoteResult, RoutineRemote};

pub(crate) fn item(id: &str) -> RoutineItem {
    RoutineItem {
        id: id.to_string(),
        title: format!("Item {id}"),
        day: WeekDay::Monday,
        time_block: TimeBlock::Morning,
        completed: false,
        time_range: None,
        description: None,
        category: None,
        emoji: None,
        color: None,
        notes: Vec::new(),
    }
}

pub(crate) fn post(id: &str, date: &str) -> BlogPost {
    BlogPost {
        id: id.to_string(),
        title: format!("Post {id}"),
        description: String::new(),
        content: "<p>Hello</p>".to_string(),
        date: date.to_string(),
        read_time: "1 min read".to_string(),
        author: "Sam".to_string(),
        image: None,
    }
}

pub(crate) fn new_post(title: &str, date: &str) -> NewBlogPost {
    NewBlogPost {
        title: title.to_string(),
        description: format!("About {title}"),
        content: "<p>Body</p>".to_string(),
        date: date.to_string(),
        read_time: "2 min read".to_string(),
        author: "Sam".to_string(),
        image: None,
    }
}

/// Remote tables held in memory. Calls fail when their operation name or target id has been
/// registered with [`FakeRemote::fail_on`]. `set_completed` and `fetch_notes` sleep for queued
/// delays so tests can force responses to arrive out of order.
#[derive(Default)]
pub(crate) struct FakeRemote {
    items: Mutex<Vec<RoutineItem>>,
    notes: Mutex<HashMap<String, Vec<Note>>>,
    posts: Mutex<Vec<BlogPost>>,
    failing: Mutex<HashSet<String>>,
    toggle_delays: Mutex<VecDeque<Duration>>,
    note_delays: Mutex<VecDeque<Duration>>,
    calls: Mutex<Vec<String>>,
    next_id: AtomicU64,
}

impl FakeRemote {
    pub fn with_items(items: Vec<RoutineItem>) -> Self {
        let remote = Self::default();
        *remote.items.lock() = items;
        remote
    }

    pub fn with_posts(posts: Vec<BlogPost>) -> Self {
        let remote = Self::default();
        *remote.posts.lock() = posts;
        remote
    }

    pub fn fail_on(&self, key: &str) {
        self.failing.lock().insert(key.to_string());
    }

    pub fn recover(&self, key: &str) {
        self.failing.lock().remove(key);
    }

    pub fn delay_toggles(&self, delays: impl IntoIterator<Item = Duration>) {
        self.toggle_delays.lock().extend(delays);
    }

    pub fn delay_note_fetches(&self, delays: impl IntoIterator<Item = Duration>) {
        self.note_delays.lock().extend(delays);
    }

    pub fn seed_notes(&self, item_id: &str, notes: Vec<Note>) {
        self.notes.lock().insert(item_id.to_string(), notes);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self, op: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|call| call.split(':').next() == Some(op))
            .count()
    }

    pub fn remote_item(&self, id: &str) -> Option<RoutineItem> {
        self.items.lock().iter().find(|item| item.id == id).cloned()
    }

    pub fn remote_post(&self, id: &str) -> Option<BlogPost> {
        self.posts.lock().iter().find(|post| post.id == id).cloned()
    }

    fn record(&self, op: &str, target: &str) -> RemoteResult<()> {
        self.calls.lock().push(format!("{op}:{target}"));
        let failing = self.failing.lock();
        if failing.contains(op) || failing.contains(target) {
            return Err(RemoteError::new(format!("{op} failed for {target}")));
        }
        Ok(())
    }

    fn next_id(&self, prefix: &str) -> String {
        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        format!("{prefix}-{n}")
    }
}

#[async_trait]
impl RoutineRemote for FakeRemote {
    async fn fetch_items(&self) -> RemoteResult<Vec<RoutineItem>> {
        self.record("fetch_items", "*")?;
        Ok(self.items.lock().clone())
    }

    async fn create_item(&self, new_item: &NewRoutineItem) -> RemoteResult<RoutineItem> {
        self.record("create_item", &new_item.title)?;
        let created = RoutineItem {
            id: self.next_id("item"),
            title: new_item.title.clone(),
            day: new_item.day,
            time_block: new_item.time_block,
            completed: new_item.completed,
            time_range: new_item.time_range.clone(),
            description: new_item.description.clone(),
            category: new_item.category.clone(),
            emoji: new_item.emoji.clone(),
            color: new_item.color.clone(),
            notes: Vec::new(),
        };
        self.items.lock().push(created.clone());
        Ok(created)
    }

    async fn update_item(&self, id: &str, update: &RoutineItemUpdate) -> RemoteResult<()> {
        self.record("update_item", id)?;
        if let Some(stored) = self.items.lock().iter_mut().find(|item| item.id == id) {
            update.apply_to(stored);
        }
        Ok(())
    }

    async fn delete_item(&self, id: &str) -> RemoteResult<()> {
        self.record("delete_item", id)?;
        self.items.lock().retain(|item| item.id != id);
        self.notes.lock().remove(id);
        Ok(())
    }

    async fn fetch_notes(&self, item_id: &str) -> RemoteResult<Vec<Note>> {
        let delay = self.note_delays.lock().pop_front();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.record("fetch_notes", item_id)?;
        Ok(self
            .notes
            .lock()
            .get(item_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn add_note(&self, item_id: &str, content: &str) -> RemoteResult<Note> {
        self.record("add_note", item_id)?;
        let n = self.next_id.load(Ordering::SeqCst) as i64;
        let note = Note {
            id: self.next_id("note"),
            content: content.to_string(),
            created_at: Utc
                .timestamp_opt(1_700_000_000 + n, 0)
                .single()
                .unwrap_or_else(Utc::now),
        };
        self.notes
            .lock()
            .entry(item_id.to_string())
            .or_default()
            .insert(0, note.clone());
        Ok(note)
    }

    async fn delete_note(&self, note_id: &str) -> RemoteResult<()> {
        self.record("delete_note", note_id)?;
        for notes in self.notes.lock().values_mut() {
            notes.retain(|note| note.id != note_id);
        }
        Ok(())
    }

    async fn set_completed(&self, id: &str, completed: bool) -> RemoteResult<()> {
        let delay = self.toggle_delays.lock().pop_front();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.record("set_completed", id)?;
        if let Some(stored) = self.items.lock().iter_mut().find(|item| item.id == id) {
            stored.completed = completed;
        }
        Ok(())
    }
}

#[async_trait]
impl BlogRemote for FakeRemote {
    async fn fetch_posts(&self, page: PageRequest) -> RemoteResult<PageOf<BlogPost>> {
        self.record("fetch_posts", &page.page.to_string())?;
        let mut posts = self.posts.lock().clone();
        posts.sort_by(|a, b| b.date.cmp(&a.date));
        let total = posts.len() as u64;
        let items = posts
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.page_size as usize)
            .collect();
        Ok(PageOf { items, total })
    }

    async fn fetch_post(&self, id: &str) -> RemoteResult<BlogPost> {
        self.record("fetch_post", id)?;
        self.remote_post(id)
            .ok_or_else(|| RemoteError::new(format!("Blog post {id} not found")))
    }

    async fn create_post(&self, new_post: &NewBlogPost) -> RemoteResult<BlogPost> {
        self.record("create_post", &new_post.title)?;
        let created = BlogPost {
            id: self.next_id("post"),
            title: new_post.title.clone(),
            description: new_post.description.clone(),
            content: new_post.content.clone(),
            date: new_post.date.clone(),
            read_time: new_post.read_time.clone(),
            author: new_post.author.clone(),
            image: new_post.image.clone(),
        };
        self.posts.lock().push(created.clone());
        Ok(created)
    }

    async fn update_post(&self, id: &str, update: &BlogPostUpdate) -> RemoteResult<()> {
        self.record("update_post", id)?;
        if let Some(stored) = self.posts.lock().iter_mut().find(|post| post.id == id) {
            update.apply_to(stored);
        }
        Ok(())
    }

    async fn delete_post(&self, id: &str) -> RemoteResult<()> {
        self.record("delete_post", id)?;
        self.posts.lock().retain(|post| post.id != id);
        Ok(())
    }
}
