use std::fmt;
use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Local;

use crate::cli::{BlogCommand, CliCommand, ExportArgs, MarkAllArgs, NoteCommand};
use crate::config::AppConfig;
use crate::core::notify::dispatch;
use crate::core::{
    remote, BlogPost, BlogService, ItemFilter, MutationOutcome, Notice, NoticeKind, NoticeLog,
    Notifier, Operation, RoutineItem, RoutineService, StoreResult,
};

/// One application instance: both services over the configured backend plus the notices
/// the current command produced.
pub struct App {
    pub routine: RoutineService,
    pub blog: BlogService,
    pub notices: NoticeLog,
}

impl App {
    pub fn open(config: &AppConfig) -> Result<Self> {
        let backends = remote::open(config).context("failed to open data store")?;
        Ok(Self {
            routine: RoutineService::new(backends.routine),
            blog: BlogService::with_page_size(backends.blog, config.page_size()),
            notices: NoticeLog::new(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandStatus {
    Success,
    Failed,
}

pub async fn execute<W: Write>(
    app: &App,
    command: CliCommand,
    mut writer: W,
) -> Result<CommandStatus> {
    let mut status = match command {
        CliCommand::Blog(command) => handle_blog(app, command, &mut writer).await?,
        command => {
            let load = app.routine.load().await;
            if dispatch(&app.notices, Operation::LoadItems, &load) {
                CommandStatus::Failed
            } else {
                handle_routine(app, command, &mut writer).await?
            }
        }
    };

    for notice in app.notices.take() {
        if notice.kind == NoticeKind::Error {
            status = CommandStatus::Failed;
        }
        writeln!(writer, "{notice}")?;
    }
    Ok(status)
}

async fn handle_routine<W: Write>(
    app: &App,
    command: CliCommand,
    mut writer: W,
) -> Result<CommandStatus> {
    let routine = &app.routine;
    match command {
        CliCommand::Week(args) => {
            write_week(routine, &ItemFilter::from(&args), &mut writer)?;
        }
        CliCommand::List(args) => {
            let items = routine.list(&ItemFilter::from(&args.filter));
            if args.json {
                writeln!(writer, "{}", serde_json::to_string_pretty(&items)?)?;
            } else if items.is_empty() {
                writeln!(writer, "No routine items")?;
            } else {
                for item in &items {
                    writeln!(writer, "{}", ItemLine(item))?;
                }
            }
        }
        CliCommand::Categories => {
            let categories = routine.categories();
            if categories.is_empty() {
                writeln!(writer, "No categories")?;
            }
            for category in categories {
                writeln!(writer, "{category}")?;
            }
        }
        CliCommand::Show(args) => {
            let result = routine.select(Some(&args.id)).await;
            dispatch(&app.notices, Operation::LoadNotes, &result);
            let Ok(outcome) = result else {
                return Ok(CommandStatus::Failed);
            };
            match outcome.into_value() {
                Some(item) => write_item_detail(&item, &mut writer)?,
                None => {
                    app.notices
                        .notify(Notice::info(format!("No routine item {}", args.id)));
                    return Ok(CommandStatus::Failed);
                }
            }
        }
        CliCommand::Add(args) => {
            let result = routine.create_item(args.into()).await;
            if let Ok(outcome) = &result {
                writeln!(writer, "{}", ItemLine(&outcome.value))?;
            }
            dispatch(&app.notices, Operation::AddItem, &result);
        }
        CliCommand::Edit(args) => {
            let result = routine.update_item(&args.id, (&args).into()).await;
            report_local_miss(app, &args.id, &result);
            dispatch(&app.notices, Operation::UpdateItem, &result);
        }
        CliCommand::Delete(args) => {
            for id in &args.ids {
                let result = routine.delete_item(id).await;
                report_local_miss(app, id, &result);
                dispatch(&app.notices, Operation::DeleteItem, &result);
            }
        }
        CliCommand::Toggle(args) => {
            for id in &args.ids {
                let result = routine.toggle_completed(id).await;
                report_local_miss(app, id, &result);
                dispatch(&app.notices, Operation::ToggleCompleted, &result);
            }
        }
        CliCommand::MarkAll(args) => handle_mark_all(app, &args).await,
        CliCommand::Note(NoteCommand::Add { item_id, content }) => {
            let result = routine.add_note(&item_id, &content.join(" ")).await;
            if let Ok(outcome) = &result {
                writeln!(writer, "{}", outcome.value.id)?;
            }
            dispatch(&app.notices, Operation::AddNote, &result);
        }
        CliCommand::Note(NoteCommand::Delete { item_id, note_id }) => {
            let result = routine.delete_note(&item_id, &note_id).await;
            dispatch(&app.notices, Operation::DeleteNote, &result);
        }
        CliCommand::Export(args) => handle_export(app, &args, &mut writer)?,
        CliCommand::Blog(command) => return handle_blog(app, command, &mut writer).await,
    }
    Ok(CommandStatus::Success)
}

async fn handle_mark_all(app: &App, args: &MarkAllArgs) {
    let filter = ItemFilter::from(&args.filter);
    let updates = app
        .routine
        .set_all_completed(&filter, !args.incomplete)
        .await;
    if updates.is_empty() {
        app.notices.notify(Notice::info("Nothing to update"));
    }
    for update in &updates {
        dispatch(&app.notices, Operation::ToggleCompleted, &update.result);
    }
}

fn handle_export<W: Write>(app: &App, args: &ExportArgs, mut writer: W) -> Result<()> {
    let result = app.routine.export().and_then(|outcome| {
        let line = if args.data_uri {
            outcome.value.data_uri()
        } else {
            let dir = match &args.dir {
                Some(dir) => dir.clone(),
                None => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            };
            let path = outcome.value.write_to(&dir, Local::now().date_naive())?;
            path.display().to_string()
        };
        Ok((line, outcome))
    });
    let result = match result {
        Ok((line, outcome)) => {
            writeln!(writer, "{line}")?;
            Ok(outcome)
        }
        Err(err) => {
            tracing::error!(error = %err, "export failed");
            Err(err)
        }
    };
    dispatch(&app.notices, Operation::Export, &result);
    Ok(())
}

async fn handle_blog<W: Write>(
    app: &App,
    command: BlogCommand,
    mut writer: W,
) -> Result<CommandStatus> {
    let blog = &app.blog;
    match command {
        BlogCommand::List { page } => {
            let result = blog.fetch_posts(page).await;
            if result.is_ok() {
                write_post_page(blog, &mut writer)?;
            }
            dispatch(&app.notices, Operation::LoadPosts, &result);
        }
        BlogCommand::Show { id } => {
            let result = blog.get_post(&id).await;
            if let Ok(outcome) = &result {
                write_post_detail(&outcome.value, &mut writer)?;
            }
            dispatch(&app.notices, Operation::LoadPost, &result);
        }
        BlogCommand::Add(args) => {
            let today = Local::now().format("%Y-%m-%d").to_string();
            let result = blog.add_post(args.into_new_post(&today)).await;
            if let Ok(outcome) = &result {
                writeln!(writer, "{}", PostLine(&outcome.value))?;
            }
            dispatch(&app.notices, Operation::AddPost, &result);
        }
        BlogCommand::Edit(args) => {
            let result = blog.edit_post(&args.id, (&args).into()).await;
            dispatch(&app.notices, Operation::EditPost, &result);
        }
        BlogCommand::Delete { id } => {
            let result = blog.remove_post(&id).await;
            dispatch(&app.notices, Operation::RemovePost, &result);
        }
    }
    Ok(CommandStatus::Success)
}

/// Writes that reached the remote but matched nothing loaded locally are worth a mention.
fn report_local_miss<T>(
    app: &App,
    id: &str,
    result: &StoreResult<MutationOutcome<T>>,
) {
    if matches!(result, Ok(outcome) if !outcome.applied_locally) {
        app.notices
            .notify(Notice::info(format!("No routine item {id}")));
    }
}

fn write_week<W: Write>(
    routine: &RoutineService,
    filter: &ItemFilter,
    mut writer: W,
) -> Result<()> {
    for schedule in routine.week(filter) {
        writeln!(writer, "{}", schedule.day.title())?;
        if schedule.is_empty() {
            writeln!(writer, "  (nothing planned)")?;
            continue;
        }
        for (block, items) in &schedule.blocks {
            if items.is_empty() {
                continue;
            }
            writeln!(writer, "  {block}")?;
            for item in items {
                writeln!(writer, "    {}", SlotLine(item))?;
            }
        }
    }
    Ok(())
}

fn write_item_detail<W: Write>(item: &RoutineItem, mut writer: W) -> Result<()> {
    writeln!(writer, "{}", ItemLine(item))?;
    if let Some(description) = &item.description {
        writeln!(writer, "  {description}")?;
    }
    if let Some(color) = &item.color {
        writeln!(writer, "  color: {color}")?;
    }
    if item.notes.is_empty() {
        writeln!(writer, "  No notes")?;
    }
    for note in &item.notes {
        writeln!(
            writer,
            "  - {} {} ({})",
            note.created_at.with_timezone(&Local).format("%Y-%m-%d %H:%M"),
            note.content,
            note.id
        )?;
    }
    Ok(())
}

fn write_post_page<W: Write>(blog: &BlogService, mut writer: W) -> Result<()> {
    let posts = blog.posts();
    let total = blog.snapshot().total.unwrap_or(0);
    writeln!(
        writer,
        "Page {} of {} ({} post{})",
        blog.current_page(),
        blog.total_pages().max(1),
        total,
        if total == 1 { "" } else { "s" }
    )?;
    for post in &posts {
        writeln!(writer, "{}", PostLine(post))?;
    }
    Ok(())
}

fn write_post_detail<W: Write>(post: &BlogPost, mut writer: W) -> Result<()> {
    writeln!(writer, "{}", post.title)?;
    writeln!(writer, "{} · {} · {}", post.date, post.author, post.read_time)?;
    if let Some(image) = &post.image {
        writeln!(writer, "{image}")?;
    }
    if !post.description.is_empty() {
        writeln!(writer, "\n{}", post.description)?;
    }
    writeln!(writer, "\n{}", post.content)?;
    Ok(())
}

struct ItemLine<'a>(&'a RoutineItem);

impl fmt::Display for ItemLine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let item = self.0;
        write!(f, "{} {:<9} {:<9} ", item.id, item.day, item.time_block)?;
        write!(f, "{}", SlotLine(item))
    }
}

struct SlotLine<'a>(&'a RoutineItem);

impl fmt::Display for SlotLine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let item = self.0;
        write!(f, "[{}] ", if item.completed { "x" } else { " " })?;
        if let Some(emoji) = &item.emoji {
            write!(f, "{emoji} ")?;
        }
        write!(f, "{}", item.title)?;
        if let Some(range) = &item.time_range {
            write!(f, " ({range})")?;
        }
        if let Some(category) = &item.category {
            write!(f, " #{category}")?;
        }
        Ok(())
    }
}

struct PostLine<'a>(&'a BlogPost);

impl fmt::Display for PostLine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let post = self.0;
        write!(f, "{} {}  {}", post.id, post.date, post.title)?;
        if !post.read_time.is_empty() {
            write!(f, " ({})", post.read_time)?;
        }
        Ok(())
    }
}
