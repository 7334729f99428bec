//! Row shapes of the remote tables (snake_case columns) and their mapping to model types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{
    BlogPost, BlogPostUpdate, NewBlogPost, NewRoutineItem, Note, RoutineItem, RoutineItemUpdate,
    TimeBlock, WeekDay,
};

pub(crate) const ROUTINE_ITEMS: &str = "routine_items";
pub(crate) const ROUTINE_NOTES: &str = "routine_notes";
pub(crate) const BLOG_POSTS: &str = "blog_posts";

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RoutineItemRow {
    pub id: String,
    pub title: String,
    pub day: WeekDay,
    pub time_block: TimeBlock,
    #[serde(default)]
    pub completed: Option<bool>,
    #[serde(default)]
    pub time_range: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub emoji: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
}

impl From<RoutineItemRow> for RoutineItem {
    fn from(row: RoutineItemRow) -> Self {
        RoutineItem {
            id: row.id,
            title: row.title,
            day: row.day,
            time_block: row.time_block,
            completed: row.completed.unwrap_or(false),
            time_range: row.time_range,
            description: row.description,
            category: row.category,
            emoji: row.emoji,
            color: row.color,
            notes: Vec::new(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct RoutineItemInsert<'a> {
    pub title: &'a str,
    pub day: WeekDay,
    pub time_block: TimeBlock,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_range: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emoji: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<&'a str>,
    pub completed: bool,
}

impl<'a> From<&'a NewRoutineItem> for RoutineItemInsert<'a> {
    fn from(item: &'a NewRoutineItem) -> Self {
        Self {
            title: &item.title,
            day: item.day,
            time_block: item.time_block,
            time_range: item.time_range.as_deref(),
            description: item.description.as_deref(),
            category: item.category.as_deref(),
            emoji: item.emoji.as_deref(),
            color: item.color.as_deref(),
            completed: item.completed,
        }
    }
}

/// Only the fields that are set end up in the request body.
#[derive(Debug, Default, Serialize)]
pub(crate) struct RoutineItemPatch<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub day: Option<WeekDay>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_block: Option<TimeBlock>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_range: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emoji: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}

impl<'a> From<&'a RoutineItemUpdate> for RoutineItemPatch<'a> {
    fn from(update: &'a RoutineItemUpdate) -> Self {
        Self {
            title: update.title.as_deref(),
            day: update.day,
            time_block: update.time_block,
            time_range: update.time_range.as_deref(),
            description: update.description.as_deref(),
            category: update.category.as_deref(),
            emoji: update.emoji.as_deref(),
            color: update.color.as_deref(),
            completed: update.completed,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct NoteRow {
    pub id: String,
    pub content: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl From<NoteRow> for Note {
    fn from(row: NoteRow) -> Self {
        Note {
            id: row.id,
            content: row.content,
            created_at: row.created_at.unwrap_or_else(Utc::now),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct NoteInsert<'a> {
    pub routine_item_id: &'a str,
    pub content: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct BlogPostRow {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub read_time: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

impl From<BlogPostRow> for BlogPost {
    fn from(row: BlogPostRow) -> Self {
        BlogPost {
            id: row.id,
            title: row.title,
            description: row.description.unwrap_or_default(),
            content: row.content.unwrap_or_default(),
            date: row.date.unwrap_or_default(),
            read_time: row.read_time.unwrap_or_default(),
            author: row.author.unwrap_or_default(),
            image: row.image,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct BlogPostInsert<'a> {
    pub title: &'a str,
    pub description: &'a str,
    pub content: &'a str,
    pub date: &'a str,
    pub read_time: &'a str,
    pub author: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<&'a str>,
}

impl<'a> From<&'a NewBlogPost> for BlogPostInsert<'a> {
    fn from(post: &'a NewBlogPost) -> Self {
        Self {
            title: &post.title,
            description: &post.description,
            content: &post.content,
            date: &post.date,
            read_time: &post.read_time,
            author: &post.author,
            image: post.image.as_deref(),
        }
    }
}

#[derive(Debug, Default, Serialize)]
pub(crate) struct BlogPostPatch<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_time: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<&'a str>,
}

impl<'a> From<&'a BlogPostUpdate> for BlogPostPatch<'a> {
    fn from(update: &'a BlogPostUpdate) -> Self {
        Self {
            title: update.title.as_deref(),
            description: update.description.as_deref(),
            content: update.content.as_deref(),
            date: update.date.as_deref(),
            read_time: update.read_time.as_deref(),
            author: update.author.as_deref(),
            image: update.image.as_deref(),
        }
    }
}
