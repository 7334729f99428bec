//! SQLite-backed stand-in for the remote tables, used when no remote backend is configured.

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{named_params, types::Value, Connection, OptionalExtension, Row, ToSql};
use ulid::Ulid;

use crate::config::AppConfig;
use crate::model::{
    BlogPost, BlogPostUpdate, NewBlogPost, NewRoutineItem, Note, RoutineItem, RoutineItemUpdate,
    DEFAULT_ROUTINE_ITEMS,
};
use crate::pagination::{PageOf, PageRequest};

const SEEDED_KEY: &str = "seeded";

const ITEM_COLUMNS: &str = "id, title, day, time_block, completed, time_range, description, \
     category, emoji, color";

const POST_COLUMNS: &str = "id, title, description, content, date, read_time, author, image";

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn initialize(config: &AppConfig) -> Result<Self> {
        let conn = Connection::open(config.db_path()).with_context(|| {
            format!("Failed to open database at {}", config.db_path().display())
        })?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")
            .context("Failed to configure SQLite pragmas")?;

        let db = Self { conn };
        db.apply_migrations()?;
        db.seed_defaults()?;
        Ok(db)
    }

    pub fn fetch_items(&self) -> Result<Vec<RoutineItem>> {
        let sql = format!(
            "SELECT {ITEM_COLUMNS} FROM routine_items \
             ORDER BY time_range IS NULL, time_range ASC, created_at ASC"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query([])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(map_item(row)?);
        }
        Ok(items)
    }

    pub fn fetch_item(&self, id: &str) -> Result<Option<RoutineItem>> {
        let sql = format!("SELECT {ITEM_COLUMNS} FROM routine_items WHERE id = ? LIMIT 1");
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query([id])?;
        match rows.next()? {
            Some(row) => Ok(Some(map_item(row)?)),
            None => Ok(None),
        }
    }

    pub fn insert_item(&self, item: &NewRoutineItem) -> Result<RoutineItem> {
        let id = Ulid::new().to_string();
        let now = timestamp(Utc::now());
        self.conn.execute(
            "INSERT INTO routine_items (
                id, title, day, time_block, completed, time_range, description, category, emoji,
                color, created_at, updated_at
            ) VALUES (
                :id, :title, :day, :time_block, :completed, :time_range, :description, :category,
                :emoji, :color, :created_at, :updated_at
            )",
            named_params![
                ":id": &id,
                ":title": &item.title,
                ":day": item.day.as_str(),
                ":time_block": item.time_block.as_str(),
                ":completed": item.completed,
                ":time_range": item.time_range.as_deref(),
                ":description": item.description.as_deref(),
                ":category": item.category.as_deref(),
                ":emoji": item.emoji.as_deref(),
                ":color": item.color.as_deref(),
                ":created_at": &now,
                ":updated_at": &now,
            ],
        )?;
        self.fetch_item(&id)?
            .ok_or_else(|| anyhow!("Inserted routine item {} could not be read back", id))
    }

    /// Writes only the fields set on `update`. Returns whether a row matched.
    pub fn update_item(&self, id: &str, update: &RoutineItemUpdate) -> Result<bool> {
        let mut assignments: Vec<(&str, Value)> = Vec::new();
        if let Some(title) = &update.title {
            assignments.push(("title", Value::from(title.clone())));
        }
        if let Some(day) = update.day {
            assignments.push(("day", Value::from(day.as_str().to_string())));
        }
        if let Some(block) = update.time_block {
            assignments.push(("time_block", Value::from(block.as_str().to_string())));
        }
        if let Some(time_range) = &update.time_range {
            assignments.push(("time_range", Value::from(time_range.clone())));
        }
        if let Some(description) = &update.description {
            assignments.push(("description", Value::from(description.clone())));
        }
        if let Some(category) = &update.category {
            assignments.push(("category", Value::from(category.clone())));
        }
        if let Some(emoji) = &update.emoji {
            assignments.push(("emoji", Value::from(emoji.clone())));
        }
        if let Some(color) = &update.color {
            assignments.push(("color", Value::from(color.clone())));
        }
        if let Some(completed) = update.completed {
            assignments.push(("completed", Value::from(completed)));
        }
        self.apply_assignments("routine_items", id, assignments)
    }

    pub fn set_completed(&self, id: &str, completed: bool) -> Result<bool> {
        let updated = self.conn.execute(
            "UPDATE routine_items SET completed = :completed, updated_at = :updated WHERE id = :id",
            named_params![
                ":completed": completed,
                ":updated": timestamp(Utc::now()),
                ":id": id,
            ],
        )?;
        Ok(updated > 0)
    }

    pub fn delete_item(&self, id: &str) -> Result<bool> {
        let affected = self.conn.execute(
            "DELETE FROM routine_items WHERE id = :id",
            named_params![":id": id],
        )?;
        Ok(affected > 0)
    }

    /// Notes of one item, newest first.
    pub fn fetch_notes(&self, item_id: &str) -> Result<Vec<Note>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, content, created_at FROM routine_notes \
             WHERE routine_item_id = ? ORDER BY created_at DESC, rowid DESC",
        )?;
        let mut rows = stmt.query([item_id])?;
        let mut notes = Vec::new();
        while let Some(row) = rows.next()? {
            notes.push(map_note(row)?);
        }
        Ok(notes)
    }

    pub fn insert_note(&self, item_id: &str, content: &str) -> Result<Note> {
        let id = Ulid::new().to_string();
        let created_at = Utc::now();
        self.conn
            .execute(
                "INSERT INTO routine_notes (id, routine_item_id, content, created_at)
                 VALUES (:id, :item_id, :content, :created_at)",
                named_params![
                    ":id": &id,
                    ":item_id": item_id,
                    ":content": content,
                    ":created_at": timestamp(created_at),
                ],
            )
            .with_context(|| format!("Failed to add note to routine item {}", item_id))?;
        Ok(Note {
            id,
            content: content.to_string(),
            created_at: parse_datetime_required(timestamp(created_at))?,
        })
    }

    pub fn delete_note(&self, note_id: &str) -> Result<bool> {
        let affected = self.conn.execute(
            "DELETE FROM routine_notes WHERE id = :id",
            named_params![":id": note_id],
        )?;
        Ok(affected > 0)
    }

    pub fn count_posts(&self) -> Result<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM blog_posts", [], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }

    /// One page ordered newest first, plus the exact total.
    pub fn fetch_posts(&self, page: &PageRequest) -> Result<PageOf<BlogPost>> {
        let total = self.count_posts()?;
        let sql = format!(
            "SELECT {POST_COLUMNS} FROM blog_posts \
             ORDER BY date DESC, created_at DESC LIMIT ? OFFSET ?"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let limit = i64::from(page.page_size);
        let offset = i64::try_from(page.offset()).context("Page offset too large")?;
        let params: [&dyn ToSql; 2] = [&limit, &offset];
        let mut rows = stmt.query(&params[..])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(map_post(row)?);
        }
        Ok(PageOf { items, total })
    }

    pub fn fetch_post(&self, id: &str) -> Result<Option<BlogPost>> {
        let sql = format!("SELECT {POST_COLUMNS} FROM blog_posts WHERE id = ? LIMIT 1");
        self.conn
            .query_row(&sql, [id], |row| Ok(map_post(row)))
            .optional()?
            .transpose()
    }

    pub fn insert_post(&self, post: &NewBlogPost) -> Result<BlogPost> {
        let id = Ulid::new().to_string();
        let now = timestamp(Utc::now());
        self.conn.execute(
            "INSERT INTO blog_posts (
                id, title, description, content, date, read_time, author, image, created_at,
                updated_at
            ) VALUES (
                :id, :title, :description, :content, :date, :read_time, :author, :image,
                :created_at, :updated_at
            )",
            named_params![
                ":id": &id,
                ":title": &post.title,
                ":description": &post.description,
                ":content": &post.content,
                ":date": &post.date,
                ":read_time": &post.read_time,
                ":author": &post.author,
                ":image": post.image.as_deref(),
                ":created_at": &now,
                ":updated_at": &now,
            ],
        )?;
        self.fetch_post(&id)?
            .ok_or_else(|| anyhow!("Inserted blog post {} could not be read back", id))
    }

    pub fn update_post(&self, id: &str, update: &BlogPostUpdate) -> Result<bool> {
        let fields = [
            ("title", &update.title),
            ("description", &update.description),
            ("content", &update.content),
            ("date", &update.date),
            ("read_time", &update.read_time),
            ("author", &update.author),
            ("image", &update.image),
        ];
        let assignments = fields
            .into_iter()
            .filter_map(|(column, value)| {
                value
                    .as_ref()
                    .map(|value| (column, Value::from(value.clone())))
            })
            .collect();
        self.apply_assignments("blog_posts", id, assignments)
    }

    pub fn delete_post(&self, id: &str) -> Result<bool> {
        let affected = self.conn.execute(
            "DELETE FROM blog_posts WHERE id = :id",
            named_params![":id": id],
        )?;
        Ok(affected > 0)
    }

    fn apply_assignments(
        &self,
        table: &str,
        id: &str,
        assignments: Vec<(&str, Value)>,
    ) -> Result<bool> {
        if assignments.is_empty() {
            let exists: Option<i64> = self
                .conn
                .query_row(
                    &format!("SELECT 1 FROM {table} WHERE id = ?"),
                    [id],
                    |row| row.get(0),
                )
                .optional()?;
            return Ok(exists.is_some());
        }

        let mut sql = format!("UPDATE {table} SET ");
        let mut values: Vec<Value> = Vec::with_capacity(assignments.len() + 2);
        for (column, value) in assignments {
            sql.push_str(column);
            sql.push_str(" = ?, ");
            values.push(value);
        }
        sql.push_str("updated_at = ? WHERE id = ?");
        values.push(Value::from(timestamp(Utc::now())));
        values.push(Value::from(id.to_string()));

        let param_refs: Vec<&dyn ToSql> = values.iter().map(|v| v as &dyn ToSql).collect();
        let updated = self.conn.execute(&sql, &param_refs[..])?;
        Ok(updated > 0)
    }

    /// Fills an empty store with the default week exactly once.
    fn seed_defaults(&self) -> Result<bool> {
        let seeded: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM meta WHERE key = ?",
                [SEEDED_KEY],
                |row| row.get(0),
            )
            .optional()?;
        if seeded.is_some() {
            return Ok(false);
        }

        let existing: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM routine_items", [], |row| row.get(0))?;
        let tx = self.conn.unchecked_transaction()?;
        if existing == 0 {
            for seed in DEFAULT_ROUTINE_ITEMS {
                self.insert_item(&seed.to_new_item())?;
            }
        }
        tx.execute(
            "INSERT OR REPLACE INTO meta (key, value) VALUES (?, ?)",
            [SEEDED_KEY, "1"],
        )?;
        tx.commit()?;
        Ok(existing == 0)
    }

    fn apply_migrations(&self) -> Result<()> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS meta (key TEXT PRIMARY KEY, value TEXT);
             CREATE TABLE IF NOT EXISTS routine_items (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                day TEXT NOT NULL,
                time_block TEXT NOT NULL,
                completed INTEGER NOT NULL DEFAULT 0,
                time_range TEXT,
                description TEXT,
                category TEXT,
                emoji TEXT,
                color TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
             );
             CREATE TABLE IF NOT EXISTS routine_notes (
                id TEXT PRIMARY KEY,
                routine_item_id TEXT NOT NULL REFERENCES routine_items(id) ON DELETE CASCADE,
                content TEXT NOT NULL,
                created_at TEXT NOT NULL
             );
             CREATE TABLE IF NOT EXISTS blog_posts (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                content TEXT NOT NULL DEFAULT '',
                date TEXT NOT NULL,
                read_time TEXT NOT NULL DEFAULT '',
                author TEXT NOT NULL DEFAULT '',
                image TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
             );
             CREATE INDEX IF NOT EXISTS idx_routine_items_slot ON routine_items(day, time_block);
             CREATE INDEX IF NOT EXISTS idx_routine_notes_item ON routine_notes(routine_item_id);
             CREATE INDEX IF NOT EXISTS idx_blog_posts_date ON blog_posts(date);
            ",
        )?;
        Ok(())
    }
}

fn map_item(row: &Row<'_>) -> Result<RoutineItem> {
    Ok(RoutineItem {
        id: row.get(0)?,
        title: row.get(1)?,
        day: row.get::<_, String>(2)?.parse()?,
        time_block: row.get::<_, String>(3)?.parse()?,
        completed: row.get(4)?,
        time_range: row.get(5)?,
        description: row.get(6)?,
        category: row.get(7)?,
        emoji: row.get(8)?,
        color: row.get(9)?,
        notes: Vec::new(),
    })
}

fn map_note(row: &Row<'_>) -> Result<Note> {
    Ok(Note {
        id: row.get(0)?,
        content: row.get(1)?,
        created_at: parse_datetime_required(row.get::<_, String>(2)?)?,
    })
}

fn map_post(row: &Row<'_>) -> Result<BlogPost> {
    Ok(BlogPost {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        content: row.get(3)?,
        date: row.get(4)?,
        read_time: row.get(5)?,
        author: row.get(6)?,
        image: row.get(7)?,
    })
}

/// Microsecond precision keeps lexical order equal to chronological order.
fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_datetime_required(raw: String) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| anyhow!("Failed to parse timestamp '{}': {}", raw, e))
}
