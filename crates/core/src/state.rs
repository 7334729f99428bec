//! In-memory mirrors of the remote tables and the single focused entity.
//!
//! Every transition here is a pure function of the previous state and the delta: ids and
//! timestamps arrive already assigned by the remote accessor.

use std::collections::HashMap;

use crate::model::{BlogPost, Entity, Note, RoutineItem};
use crate::pagination::{total_pages, DEFAULT_PAGE_SIZE};

#[derive(Debug, Clone)]
pub struct CollectionState<T> {
    entries: HashMap<String, T>,
    loading: bool,
}

impl<T> Default for CollectionState<T> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            loading: false,
        }
    }
}

impl<T: Entity + Clone> CollectionState<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn begin_load(&mut self) {
        self.loading = true;
    }

    /// Replaces the whole mapping with a fresh fetch.
    pub fn finish_load(&mut self, entities: Vec<T>) {
        self.entries = entities
            .into_iter()
            .map(|entity| (entity.id().to_string(), entity))
            .collect();
        self.loading = false;
    }

    /// Keeps stale entries rather than emptying the view.
    pub fn fail_load(&mut self) {
        self.loading = false;
    }

    pub fn upsert(&mut self, entity: T) {
        self.entries.insert(entity.id().to_string(), entity);
    }

    /// Applies `f` to the entry at `id`. Absent ids are a no-op and never create an entry.
    pub fn patch(&mut self, id: &str, f: impl FnOnce(&mut T)) -> bool {
        match self.entries.get_mut(id) {
            Some(entity) => {
                f(entity);
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, id: &str) -> Option<T> {
        self.entries.remove(id)
    }

    pub fn get(&self, id: &str) -> Option<&T> {
        self.entries.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn ids(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.entries.values()
    }

    pub fn entries(&self) -> &HashMap<String, T> {
        &self.entries
    }
}

/// At most one focused entity, kept in step with its collection.
#[derive(Debug, Clone)]
pub struct Selection<T> {
    current: Option<T>,
}

impl<T> Default for Selection<T> {
    fn default() -> Self {
        Self { current: None }
    }
}

impl<T: Entity + Clone> Selection<T> {
    pub fn select(&mut self, entity: Option<T>) {
        self.current = entity;
    }

    pub fn clear(&mut self) {
        self.current = None;
    }

    pub fn current(&self) -> Option<&T> {
        self.current.as_ref()
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.current
            .as_ref()
            .is_some_and(|entity| entity.id() == id)
    }

    pub fn patch_if_selected(&mut self, id: &str, f: impl FnOnce(&mut T)) -> bool {
        match self.current.as_mut() {
            Some(entity) if entity.id() == id => {
                f(entity);
                true
            }
            _ => false,
        }
    }

    pub fn clear_if_selected(&mut self, id: &str) -> bool {
        if self.is_selected(id) {
            self.current = None;
            true
        } else {
            false
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RoutineState {
    pub items: CollectionState<RoutineItem>,
    pub selected: Selection<RoutineItem>,
}

impl RoutineState {
    /// Patches the collection entry and the selection in the same step.
    /// Returns whether the collection held `id`.
    pub fn patch_item(&mut self, id: &str, f: impl Fn(&mut RoutineItem)) -> bool {
        let applied = self.items.patch(id, &f);
        self.selected.patch_if_selected(id, &f);
        applied
    }

    /// Notes live on the selection. A collection entry is only touched when it already
    /// carries notes of its own. Returns whether the collection held `id`.
    pub fn patch_notes(&mut self, id: &str, f: impl Fn(&mut Vec<Note>)) -> bool {
        self.selected.patch_if_selected(id, |item| f(&mut item.notes));
        self.items.patch(id, |item| {
            if !item.notes.is_empty() {
                f(&mut item.notes);
            }
        })
    }

    pub fn remove_item(&mut self, id: &str) -> Option<RoutineItem> {
        let removed = self.items.remove(id);
        self.selected.clear_if_selected(id);
        removed
    }

    /// Items in weekly display order.
    pub fn sorted_items(&self) -> Vec<RoutineItem> {
        let mut items: Vec<RoutineItem> = self.items.values().cloned().collect();
        items.sort_by(|a, b| a.display_cmp(b));
        items
    }
}

#[derive(Debug, Clone)]
pub struct BlogState {
    pub posts: CollectionState<BlogPost>,
    pub selected: Selection<BlogPost>,
    pub total: Option<u64>,
    pub page: u32,
    pub page_size: u32,
}

impl Default for BlogState {
    fn default() -> Self {
        Self::with_page_size(DEFAULT_PAGE_SIZE)
    }
}

impl BlogState {
    pub fn with_page_size(page_size: u32) -> Self {
        Self {
            posts: CollectionState::new(),
            selected: Selection::default(),
            total: None,
            page: 1,
            page_size,
        }
    }

    pub fn total_pages(&self) -> u32 {
        total_pages(self.total.unwrap_or(0), self.page_size)
    }

    /// Posts of the current page, newest first.
    pub fn sorted_posts(&self) -> Vec<BlogPost> {
        let mut posts: Vec<BlogPost> = self.posts.values().cloned().collect();
        posts.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| a.id.cmp(&b.id)));
        posts
    }
}
