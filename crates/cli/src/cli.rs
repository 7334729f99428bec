use std::path::PathBuf;

use clap::{value_parser, Args, Parser, Subcommand};

use crate::core::{
    BlogPostUpdate, ItemFilter, NewBlogPost, NewRoutineItem, RoutineItemUpdate, TimeBlock, WeekDay,
};

#[derive(Parser, Debug, Clone)]
#[command(
    name = "routine",
    version,
    about = "Plan a weekly routine, keep notes on it, and publish blog posts.",
    after_help = "Examples:\n  routine                      Show the week (same as `routine week`)\n  routine add --day mon --block morning Stretch\n  routine toggle 01HV3K...\n  routine blog list --page 2\n  routine export --dir ~/Downloads"
)]
pub struct Cli {
    /// Override the data directory (defaults to platform-specific app dir)
    #[arg(long, value_name = "PATH", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Tracing filter directive (e.g. "info", "routine_core=debug")
    #[arg(long = "log", value_name = "DIRECTIVE", global = true)]
    pub log_filter: Option<String>,

    /// REST endpoint of the hosted data store (falls back to ROUTINE_REMOTE_URL)
    #[arg(long, value_name = "URL", global = true, requires = "remote_key")]
    pub remote_url: Option<String>,

    /// API key for the hosted data store (falls back to ROUTINE_REMOTE_KEY)
    #[arg(long, value_name = "KEY", global = true, requires = "remote_url")]
    pub remote_key: Option<String>,

    #[command(subcommand)]
    pub command: Option<CliCommand>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum CliCommand {
    /// Show the weekly grid (default command)
    Week(FilterArgs),
    /// List routine items, optionally filtered
    List(ListArgs),
    /// List the distinct categories in use
    Categories,
    /// Show one routine item with its notes
    Show(ShowArgs),
    /// Add a routine item
    Add(AddArgs),
    /// Change fields of a routine item
    Edit(EditArgs),
    /// Delete one or more routine items by id
    Delete(IdsArgs),
    /// Flip the completed flag of one or more routine items
    Toggle(IdsArgs),
    /// Mark every matching item complete (or incomplete)
    MarkAll(MarkAllArgs),
    /// Manage notes on a routine item
    #[command(subcommand)]
    Note(NoteCommand),
    /// Write the current routine data to a JSON file
    Export(ExportArgs),
    /// Manage blog posts
    #[command(subcommand)]
    Blog(BlogCommand),
}

#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// Only items on this day
    #[arg(long, value_enum)]
    pub day: Option<WeekDay>,

    /// Only items in this time block
    #[arg(long = "block", value_enum)]
    pub time_block: Option<TimeBlock>,

    /// Only items in this category (case-insensitive)
    #[arg(long)]
    pub category: Option<String>,

    /// Only completed items
    #[arg(long, conflicts_with = "pending")]
    pub done: bool,

    /// Only items not yet completed
    #[arg(long)]
    pub pending: bool,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ListArgs {
    #[command(flatten)]
    pub filter: FilterArgs,

    /// Print items as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ShowArgs {
    #[arg(value_name = "ID")]
    pub id: String,
}

#[derive(Args, Debug, Clone)]
pub struct AddArgs {
    /// Item title
    #[arg(value_name = "TITLE", required = true)]
    pub title: Vec<String>,

    #[arg(long, value_enum)]
    pub day: WeekDay,

    #[arg(long = "block", value_enum)]
    pub time_block: TimeBlock,

    /// Free-text time range, e.g. "07:00 - 08:00"
    #[arg(long = "time")]
    pub time_range: Option<String>,

    #[arg(long)]
    pub description: Option<String>,

    #[arg(long)]
    pub category: Option<String>,

    #[arg(long)]
    pub emoji: Option<String>,

    #[arg(long)]
    pub color: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct EditArgs {
    #[arg(value_name = "ID")]
    pub id: String,

    #[arg(long)]
    pub title: Option<String>,

    #[arg(long, value_enum)]
    pub day: Option<WeekDay>,

    #[arg(long = "block", value_enum)]
    pub time_block: Option<TimeBlock>,

    #[arg(long = "time")]
    pub time_range: Option<String>,

    #[arg(long)]
    pub description: Option<String>,

    #[arg(long)]
    pub category: Option<String>,

    #[arg(long)]
    pub emoji: Option<String>,

    #[arg(long)]
    pub color: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct IdsArgs {
    /// One or more routine item ids (see `routine list`)
    #[arg(value_name = "ID", required = true)]
    pub ids: Vec<String>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct MarkAllArgs {
    #[command(flatten)]
    pub filter: FilterArgs,

    /// Mark items incomplete instead
    #[arg(long)]
    pub incomplete: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum NoteCommand {
    /// Attach a note to a routine item
    Add {
        #[arg(value_name = "ITEM_ID")]
        item_id: String,
        #[arg(value_name = "TEXT", required = true)]
        content: Vec<String>,
    },
    /// Remove a note from a routine item
    Delete {
        #[arg(value_name = "ITEM_ID")]
        item_id: String,
        #[arg(value_name = "NOTE_ID")]
        note_id: String,
    },
}

#[derive(Args, Debug, Clone, Default)]
pub struct ExportArgs {
    /// Directory to write the export into (defaults to the current directory)
    #[arg(long, value_name = "PATH")]
    pub dir: Option<PathBuf>,

    /// Print a data URI instead of writing a file
    #[arg(long)]
    pub data_uri: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum BlogCommand {
    /// List one page of posts, newest first
    List {
        #[arg(long, default_value_t = 1, value_parser = value_parser!(u32))]
        page: u32,
    },
    /// Show one post in full
    Show {
        #[arg(value_name = "ID")]
        id: String,
    },
    /// Publish a new post
    Add(PostArgs),
    /// Change fields of a post
    Edit(EditPostArgs),
    /// Delete a post
    Delete {
        #[arg(value_name = "ID")]
        id: String,
    },
}

#[derive(Args, Debug, Clone)]
pub struct PostArgs {
    #[arg(long)]
    pub title: String,

    #[arg(long, default_value = "")]
    pub description: String,

    /// Post body (HTML allowed)
    #[arg(long)]
    pub content: String,

    /// Publication date, e.g. 2024-05-01 (defaults to today)
    #[arg(long)]
    pub date: Option<String>,

    #[arg(long = "read-time", default_value = "")]
    pub read_time: String,

    #[arg(long, default_value = "")]
    pub author: String,

    /// Cover image URL
    #[arg(long)]
    pub image: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct EditPostArgs {
    #[arg(value_name = "ID")]
    pub id: String,

    #[arg(long)]
    pub title: Option<String>,

    #[arg(long)]
    pub description: Option<String>,

    #[arg(long)]
    pub content: Option<String>,

    #[arg(long)]
    pub date: Option<String>,

    #[arg(long = "read-time")]
    pub read_time: Option<String>,

    #[arg(long)]
    pub author: Option<String>,

    #[arg(long)]
    pub image: Option<String>,
}

impl From<&FilterArgs> for ItemFilter {
    fn from(args: &FilterArgs) -> Self {
        let completed = match (args.done, args.pending) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        };
        ItemFilter {
            day: args.day,
            time_block: args.time_block,
            category: args.category.clone(),
            completed,
        }
    }
}

impl From<AddArgs> for NewRoutineItem {
    fn from(args: AddArgs) -> Self {
        NewRoutineItem {
            time_range: args.time_range,
            description: args.description,
            category: args.category,
            emoji: args.emoji,
            color: args.color,
            ..NewRoutineItem::new(args.day, args.time_block, args.title.join(" "))
        }
    }
}

impl From<&EditArgs> for RoutineItemUpdate {
    fn from(args: &EditArgs) -> Self {
        RoutineItemUpdate {
            title: args.title.clone(),
            day: args.day,
            time_block: args.time_block,
            time_range: args.time_range.clone(),
            description: args.description.clone(),
            category: args.category.clone(),
            emoji: args.emoji.clone(),
            color: args.color.clone(),
            completed: None,
        }
    }
}

impl PostArgs {
    pub fn into_new_post(self, today: &str) -> NewBlogPost {
        NewBlogPost {
            title: self.title,
            description: self.description,
            content: self.content,
            date: self.date.unwrap_or_else(|| today.to_string()),
            read_time: self.read_time,
            author: self.author,
            image: self.image,
        }
    }
}

impl From<&EditPostArgs> for BlogPostUpdate {
    fn from(args: &EditPostArgs) -> Self {
        BlogPostUpdate {
            title: args.title.clone(),
            description: args.description.clone(),
            content: args.content.clone(),
            date: args.date.clone(),
            read_time: args.read_time.clone(),
            author: args.author.clone(),
            image: args.image.clone(),
        }
    }
}
