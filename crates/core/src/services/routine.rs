use std::collections::BTreeSet;
use std::sync::Arc;

use parking_lot::Mutex;

use super::{log_failure, MutationOutcome, Operation};
use crate::error::{StoreError, StoreResult};
use crate::export::{ExportDocument, ExportSnapshot};
use crate::model::{
    ItemFilter, NewRoutineItem, Note, RoutineItem, RoutineItemUpdate, TimeBlock, WeekDay,
};
use crate::remote::RoutineRemote;
use crate::state::RoutineState;

/// Result of one item inside a bulk completion change.
#[derive(Debug)]
pub struct BulkUpdate {
    pub id: String,
    pub result: StoreResult<MutationOutcome<bool>>,
}

/// One column of the weekly grid.
#[derive(Debug, Clone, PartialEq)]
pub struct DaySchedule {
    pub day: WeekDay,
    pub blocks: Vec<(TimeBlock, Vec<RoutineItem>)>,
}

impl DaySchedule {
    pub fn is_empty(&self) -> bool {
        self.blocks.iter().all(|(_, items)| items.is_empty())
    }
}

pub struct RoutineService {
    remote: Arc<dyn RoutineRemote>,
    state: Mutex<RoutineState>,
}

impl RoutineService {
    pub fn new(remote: Arc<dyn RoutineRemote>) -> Self {
        Self {
            remote,
            state: Mutex::new(RoutineState::default()),
        }
    }

    pub fn snapshot(&self) -> RoutineState {
        self.state.lock().clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.lock().items.is_loading()
    }

    pub fn item(&self, id: &str) -> Option<RoutineItem> {
        self.state.lock().items.get(id).cloned()
    }

    pub fn selected(&self) -> Option<RoutineItem> {
        self.state.lock().selected.current().cloned()
    }

    /// All items in display order.
    pub fn items(&self) -> Vec<RoutineItem> {
        self.state.lock().sorted_items()
    }

    pub fn list(&self, filter: &ItemFilter) -> Vec<RoutineItem> {
        self.items()
            .into_iter()
            .filter(|item| filter.matches(item))
            .collect()
    }

    /// Distinct non-empty categories, sorted.
    pub fn categories(&self) -> Vec<String> {
        let state = self.state.lock();
        let categories: BTreeSet<String> = state
            .items
            .values()
            .filter_map(|item| item.category.clone())
            .filter(|category| !category.trim().is_empty())
            .collect();
        categories.into_iter().collect()
    }

    /// Every day and time block of the week, each with the matching items.
    pub fn week(&self, filter: &ItemFilter) -> Vec<DaySchedule> {
        let items = self.list(filter);
        WeekDay::ALL
            .iter()
            .map(|day| DaySchedule {
                day: *day,
                blocks: TimeBlock::ALL
                    .iter()
                    .map(|block| {
                        let slot = items
                            .iter()
                            .filter(|item| item.day == *day && item.time_block == *block)
                            .cloned()
                            .collect();
                        (*block, slot)
                    })
                    .collect(),
            })
            .collect()
    }

    /// Replaces the collection with a fresh fetch. On failure the previous items stay.
    pub async fn load(&self) -> StoreResult<MutationOutcome<usize>> {
        self.state.lock().items.begin_load();
        match self.remote.fetch_items().await {
            Ok(items) => {
                let count = items.len();
                let mut state = self.state.lock();
                state.items.finish_load(items);
                let selected_id = state.selected.current().map(|item| item.id.clone());
                if let Some(id) = selected_id {
                    match state.items.get(&id).cloned() {
                        Some(fresh) => {
                            state.selected.patch_if_selected(&id, |current| {
                                let notes = std::mem::take(&mut current.notes);
                                *current = fresh;
                                current.notes = notes;
                            });
                        }
                        None => state.selected.clear(),
                    }
                }
                tracing::debug!(count, "loaded routine items");
                Ok(MutationOutcome::new(Operation::LoadItems, count))
            }
            Err(err) => {
                self.state.lock().items.fail_load();
                fail(Operation::LoadItems, None, err)
            }
        }
    }

    /// Focuses `id` and loads its notes onto the selection. The notes are dropped if the
    /// selection moved on while they were in flight. Unknown ids clear the selection.
    pub async fn select(&self, id: Option<&str>) -> StoreResult<MutationOutcome<Option<RoutineItem>>> {
        let Some(id) = id else {
            self.state.lock().selected.clear();
            return Ok(MutationOutcome::new(Operation::LoadNotes, None));
        };

        let entry = {
            let mut state = self.state.lock();
            let entry = state.items.get(id).cloned();
            state.selected.select(entry.clone());
            entry
        };
        if entry.is_none() {
            return Ok(MutationOutcome::new(Operation::LoadNotes, None).applied(false));
        }

        match self.remote.fetch_notes(id).await {
            Ok(notes) => {
                let mut state = self.state.lock();
                let applied = state
                    .selected
                    .patch_if_selected(id, |item| item.notes = notes);
                let current = if applied {
                    state.selected.current().cloned()
                } else {
                    tracing::debug!(id, "selection moved on, dropping fetched notes");
                    None
                };
                Ok(MutationOutcome::new(Operation::LoadNotes, current).applied(applied))
            }
            Err(err) => fail(Operation::LoadNotes, Some(id), err),
        }
    }

    pub async fn add_item(
        &self,
        day: WeekDay,
        time_block: TimeBlock,
        title: impl Into<String>,
    ) -> StoreResult<MutationOutcome<RoutineItem>> {
        self.create_item(NewRoutineItem::new(day, time_block, title))
            .await
    }

    pub async fn create_item(
        &self,
        item: NewRoutineItem,
    ) -> StoreResult<MutationOutcome<RoutineItem>> {
        let item = item.normalized();
        if item.title.is_empty() {
            return fail(
                Operation::AddItem,
                None,
                StoreError::InvalidInput("Title is required".into()),
            );
        }

        match self.remote.create_item(&item).await {
            Ok(created) => {
                self.state.lock().items.upsert(created.clone());
                tracing::info!(id = %created.id, title = %created.title, "routine item added");
                Ok(MutationOutcome::new(Operation::AddItem, created)
                    .with_notice("New routine item added"))
            }
            Err(err) => fail(Operation::AddItem, None, err),
        }
    }

    /// Blank strings are dropped before the remote call so local state matches what was sent.
    pub async fn update_item(
        &self,
        id: &str,
        update: RoutineItemUpdate,
    ) -> StoreResult<MutationOutcome> {
        let update = update.normalized();
        if update.is_empty() {
            return fail(
                Operation::UpdateItem,
                Some(id),
                StoreError::InvalidInput("Nothing to update".into()),
            );
        }

        if let Err(err) = self.remote.update_item(id, &update).await {
            return fail(Operation::UpdateItem, Some(id), err);
        }
        let applied = self
            .state
            .lock()
            .patch_item(id, |item| update.apply_to(item));
        Ok(MutationOutcome::new(Operation::UpdateItem, ())
            .applied(applied)
            .with_notice("Routine item updated"))
    }

    pub async fn delete_item(&self, id: &str) -> StoreResult<MutationOutcome> {
        if let Err(err) = self.remote.delete_item(id).await {
            return fail(Operation::DeleteItem, Some(id), err);
        }
        let removed = self.state.lock().remove_item(id).is_some();
        tracing::info!(id, removed, "routine item deleted");
        Ok(MutationOutcome::new(Operation::DeleteItem, ())
            .applied(removed)
            .with_notice("Routine item deleted"))
    }

    /// The new note goes first, keeping notes newest first.
    pub async fn add_note(
        &self,
        item_id: &str,
        content: &str,
    ) -> StoreResult<MutationOutcome<Note>> {
        let content = content.trim();
        if content.is_empty() {
            return fail(
                Operation::AddNote,
                Some(item_id),
                StoreError::InvalidInput("Note content cannot be empty".into()),
            );
        }

        match self.remote.add_note(item_id, content).await {
            Ok(note) => {
                let applied = self
                    .state
                    .lock()
                    .patch_notes(item_id, |notes| notes.insert(0, note.clone()));
                Ok(MutationOutcome::new(Operation::AddNote, note)
                    .applied(applied)
                    .with_notice("Note added"))
            }
            Err(err) => fail(Operation::AddNote, Some(item_id), err),
        }
    }

    pub async fn delete_note(&self, item_id: &str, note_id: &str) -> StoreResult<MutationOutcome> {
        if let Err(err) = self.remote.delete_note(note_id).await {
            return fail(Operation::DeleteNote, Some(note_id), err);
        }
        let applied = self
            .state
            .lock()
            .patch_notes(item_id, |notes| notes.retain(|note| note.id != note_id));
        Ok(MutationOutcome::new(Operation::DeleteNote, ())
            .applied(applied)
            .with_notice("Note deleted"))
    }

    /// Flips the locally known value. Concurrent toggles of one item are not sequenced: each
    /// reads the value current at its own call, and the last response to arrive wins.
    /// Ids that are not loaded are ignored without a remote call.
    pub async fn toggle_completed(&self, id: &str) -> StoreResult<MutationOutcome<bool>> {
        let current = self.state.lock().items.get(id).map(|item| item.completed);
        let Some(current) = current else {
            tracing::debug!(id, "toggle ignored, item not loaded");
            return Ok(MutationOutcome::new(Operation::ToggleCompleted, false).applied(false));
        };
        self.apply_completion(id, !current).await
    }

    /// Mark-all: one independent remote update per matching item whose value differs. A
    /// failure leaves that item as it was and does not undo the others.
    pub async fn set_all_completed(&self, filter: &ItemFilter, completed: bool) -> Vec<BulkUpdate> {
        let targets: Vec<String> = self
            .list(filter)
            .into_iter()
            .filter(|item| item.completed != completed)
            .map(|item| item.id)
            .collect();

        let mut updates = Vec::with_capacity(targets.len());
        for id in targets {
            let result = self.apply_completion(&id, completed).await;
            updates.push(BulkUpdate { id, result });
        }
        let failed = updates.iter().filter(|update| update.result.is_err()).count();
        tracing::info!(total = updates.len(), failed, completed, "bulk completion finished");
        updates
    }

    /// Captures the collection as it is right now; nothing is refetched.
    pub fn export(&self) -> StoreResult<MutationOutcome<ExportDocument>> {
        let snapshot = ExportSnapshot::capture(&self.state.lock().items);
        match snapshot.into_document() {
            Ok(document) => Ok(MutationOutcome::new(Operation::Export, document)
                .with_notice("Data exported successfully")),
            Err(err) => fail(Operation::Export, None, err),
        }
    }

    async fn apply_completion(
        &self,
        id: &str,
        completed: bool,
    ) -> StoreResult<MutationOutcome<bool>> {
        if let Err(err) = self.remote.set_completed(id, completed).await {
            return fail(Operation::ToggleCompleted, Some(id), err);
        }
        let applied = self
            .state
            .lock()
            .patch_item(id, |item| item.completed = completed);
        let message = if completed {
            "Marked as completed"
        } else {
            "Marked as incomplete"
        };
        Ok(MutationOutcome::new(Operation::ToggleCompleted, completed)
            .applied(applied)
            .with_notice(message))
    }
}

fn fail<T>(operation: Operation, id: Option<&str>, err: impl Into<StoreError>) -> StoreResult<T> {
    let err = err.into();
    log_failure(operation, id, &err);
    Err(err)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::notify::{dispatch, NoticeKind, NoticeLog};
    use crate::testing::{item, FakeRemote};
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    async fn loaded(items: Vec<RoutineItem>) -> (RoutineService, Arc<FakeRemote>) {
        let remote = Arc::new(FakeRemote::with_items(items));
        let service = RoutineService::new(remote.clone());
        service.load().await.expect("load");
        (service, remote)
    }

    fn note(id: &str, content: &str, secs: i64) -> Note {
        Note {
            id: id.into(),
            content: content.into(),
            created_at: Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn load_keeps_stale_items_on_failure() {
        let (service, remote) = loaded(vec![item("A"), item("B")]).await;
        remote.fail_on("fetch_items");

        let err = service.load().await.unwrap_err();
        assert!(matches!(err, StoreError::Remote(_)));
        assert_eq!(service.items().len(), 2);
        assert!(!service.is_loading());
    }

    #[tokio::test]
    async fn toggle_flips_value_and_notifies_once() {
        let (service, remote) = loaded(vec![item("A")]).await;
        let log = NoticeLog::new();

        let result = service.toggle_completed("A").await;
        dispatch(&log, Operation::ToggleCompleted, &result);

        assert!(service.item("A").unwrap().completed);
        assert_eq!(log.count(NoticeKind::Success), 1);
        assert_eq!(log.notices().len(), 1);
        assert_eq!(log.notices()[0].message, "Marked as completed");
        assert!(remote.remote_item("A").unwrap().completed);
    }

    #[tokio::test]
    async fn toggle_of_unknown_item_is_silent() {
        let (service, remote) = loaded(vec![item("A")]).await;
        let log = NoticeLog::new();

        let result = service.toggle_completed("missing").await;
        dispatch(&log, Operation::ToggleCompleted, &result);

        assert!(!result.unwrap().applied_locally);
        assert_eq!(remote.call_count("set_completed"), 0);
        assert!(log.notices().is_empty());
    }

    #[tokio::test]
    async fn failed_toggle_leaves_state_unchanged() {
        let (service, remote) = loaded(vec![item("A")]).await;
        remote.fail_on("A");
        let log = NoticeLog::new();

        let result = service.toggle_completed("A").await;
        dispatch(&log, Operation::ToggleCompleted, &result);

        assert!(!service.item("A").unwrap().completed);
        assert_eq!(log.count(NoticeKind::Error), 1);
        assert!(log.notices()[0]
            .message
            .starts_with("Failed to update status"));
    }

    #[tokio::test]
    async fn double_toggle_in_flight_ends_on_last_response() {
        let (service, remote) = loaded(vec![item("A")]).await;
        remote.delay_toggles([Duration::from_millis(50)]);

        let (first, second) =
            tokio::join!(service.toggle_completed("A"), service.toggle_completed("A"));

        // Both calls read `false` before either response landed.
        assert_eq!(first.unwrap().value, true);
        assert_eq!(second.unwrap().value, true);
        assert!(service.item("A").unwrap().completed);
        assert_eq!(
            remote.calls().iter().filter(|c| *c == "set_completed:A").count(),
            2
        );
    }

    #[tokio::test]
    async fn note_for_unloaded_item_only_reaches_remote() {
        let (service, remote) = loaded(vec![item("A")]).await;

        let outcome = service.add_note("X", "hello").await.expect("add note");

        assert!(!outcome.applied_locally);
        assert_eq!(remote.call_count("add_note"), 1);
        assert!(service.item("X").is_none());
        assert_eq!(service.items().len(), 1);
    }

    #[tokio::test]
    async fn notes_follow_the_selection() {
        let (service, remote) = loaded(vec![item("A"), item("B")]).await;
        remote.seed_notes("A", vec![note("n0", "older", 0)]);

        let selected = service.select(Some("A")).await.expect("select");
        assert_eq!(selected.value.unwrap().notes.len(), 1);
        assert!(service.item("A").unwrap().notes.is_empty());

        let added = service.add_note("A", "  newest  ").await.expect("add note");
        assert_eq!(added.value.content, "newest");
        let notes: Vec<String> = service
            .selected()
            .unwrap()
            .notes
            .into_iter()
            .map(|note| note.content)
            .collect();
        assert_eq!(notes, vec!["newest".to_string(), "older".to_string()]);

        service
            .delete_note("A", "n0")
            .await
            .expect("delete note");
        assert_eq!(service.selected().unwrap().notes.len(), 1);
    }

    #[tokio::test]
    async fn added_note_stays_off_the_unselected_entry() {
        let (service, _remote) = loaded(vec![item("A"), item("B")]).await;
        service.select(Some("A")).await.expect("select A");

        service.add_note("A", "hello").await.expect("add note");
        service.select(Some("B")).await.expect("select B");

        assert!(service.item("A").unwrap().notes.is_empty());
        let document = service.export().expect("export").into_value();
        assert!(!document.json.contains("hello"));
    }

    #[tokio::test]
    async fn late_notes_are_dropped_once_selection_moved() {
        let (service, remote) = loaded(vec![item("A"), item("B")]).await;
        remote.seed_notes("A", vec![note("na", "for A", 0)]);
        remote.seed_notes("B", vec![note("nb", "for B", 1)]);
        remote.delay_note_fetches([Duration::from_millis(50)]);

        let (first, second) = tokio::join!(service.select(Some("A")), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            service.select(Some("B")).await
        });

        let first = first.expect("select A");
        assert!(!first.applied_locally);
        assert!(first.value.is_none());
        assert!(second.expect("select B").applied_locally);
        let selected = service.selected().unwrap();
        assert_eq!(selected.id, "B");
        assert_eq!(selected.notes.len(), 1);
        assert_eq!(selected.notes[0].id, "nb");
    }

    #[tokio::test]
    async fn reload_refreshes_selection_and_keeps_its_notes() {
        let (service, remote) = loaded(vec![item("A")]).await;
        remote.seed_notes("A", vec![note("n0", "kept", 0)]);
        service.select(Some("A")).await.expect("select");
        let update = RoutineItemUpdate {
            title: Some("Renamed elsewhere".into()),
            ..RoutineItemUpdate::default()
        };
        remote.update_item("A", &update).await.expect("remote update");

        service.load().await.expect("reload");

        let selected = service.selected().unwrap();
        assert_eq!(selected.title, "Renamed elsewhere");
        assert_eq!(selected.notes.len(), 1);
        assert_eq!(selected.notes[0].content, "kept");
    }

    #[tokio::test]
    async fn note_fetch_can_be_retried_after_failure() {
        let (service, remote) = loaded(vec![item("A")]).await;
        remote.seed_notes("A", vec![note("n0", "older", 0)]);
        remote.fail_on("fetch_notes");

        assert!(service.select(Some("A")).await.is_err());
        assert!(service.selected().unwrap().notes.is_empty());

        remote.recover("fetch_notes");
        let outcome = service.select(Some("A")).await.expect("select");
        assert_eq!(outcome.value.unwrap().notes.len(), 1);
    }

    #[tokio::test]
    async fn blank_note_is_rejected_before_remote() {
        let (service, remote) = loaded(vec![item("A")]).await;
        let err = service.add_note("A", "   ").await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidInput(_)));
        assert_eq!(remote.call_count("add_note"), 0);
    }

    #[tokio::test]
    async fn selecting_unknown_item_clears_selection() {
        let (service, _remote) = loaded(vec![item("A")]).await;
        service.select(Some("A")).await.expect("select");
        let outcome = service.select(Some("nope")).await.expect("select");
        assert!(outcome.value.is_none());
        assert!(service.selected().is_none());
    }

    #[tokio::test]
    async fn delete_clears_matching_selection() {
        let (service, _remote) = loaded(vec![item("A"), item("B")]).await;
        service.select(Some("A")).await.expect("select");

        service.delete_item("A").await.expect("delete");

        assert!(service.selected().is_none());
        assert!(service.item("A").is_none());
        assert!(service.item("B").is_some());
    }

    #[tokio::test]
    async fn failed_delete_keeps_item_and_selection() {
        let (service, remote) = loaded(vec![item("A")]).await;
        service.select(Some("A")).await.expect("select");
        remote.fail_on("delete_item");

        assert!(service.delete_item("A").await.is_err());
        assert!(service.item("A").is_some());
        assert_eq!(service.selected().map(|item| item.id), Some("A".into()));
    }

    #[tokio::test]
    async fn update_merges_into_collection_and_selection() {
        let (service, remote) = loaded(vec![item("A")]).await;
        service.select(Some("A")).await.expect("select");

        let update = RoutineItemUpdate {
            title: Some("Evening run".into()),
            time_block: Some(TimeBlock::Evening),
            description: Some("   ".into()),
            ..RoutineItemUpdate::default()
        };
        service.update_item("A", update).await.expect("update");

        let stored = service.item("A").unwrap();
        assert_eq!(stored.title, "Evening run");
        assert_eq!(stored.time_block, TimeBlock::Evening);
        assert!(stored.description.is_none());
        assert_eq!(service.selected().unwrap().title, "Evening run");
        assert_eq!(remote.remote_item("A").unwrap().title, "Evening run");
    }

    #[tokio::test]
    async fn add_item_starts_incomplete() {
        let (service, _remote) = loaded(Vec::new()).await;
        let outcome = service
            .add_item(WeekDay::Friday, TimeBlock::Night, "Journal")
            .await
            .expect("add");
        assert_eq!(outcome.notice(), Some("New routine item added"));
        let created = service.item(&outcome.value.id).unwrap();
        assert!(!created.completed);
        assert_eq!(created.day, WeekDay::Friday);
    }

    #[tokio::test]
    async fn mark_all_reports_each_item_separately() {
        let items = (1..=5).map(|n| item(&format!("i{n}"))).collect();
        let (service, remote) = loaded(items).await;
        remote.fail_on("i3");
        let log = NoticeLog::new();

        let updates = service.set_all_completed(&ItemFilter::default(), true).await;
        for update in &updates {
            dispatch(&log, Operation::ToggleCompleted, &update.result);
        }

        assert_eq!(updates.len(), 5);
        for id in ["i1", "i2", "i4", "i5"] {
            assert!(service.item(id).unwrap().completed, "{id} should be done");
        }
        assert!(!service.item("i3").unwrap().completed);
        assert_eq!(log.count(NoticeKind::Success), 4);
        assert_eq!(log.count(NoticeKind::Error), 1);
    }

    #[tokio::test]
    async fn mark_all_skips_items_already_in_target_state() {
        let mut done = item("B");
        done.completed = true;
        let (service, remote) = loaded(vec![item("A"), done]).await;

        let updates = service.set_all_completed(&ItemFilter::default(), true).await;
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].id, "A");
        assert_eq!(remote.call_count("set_completed"), 1);
    }

    #[tokio::test]
    async fn export_matches_collection_at_call_time() {
        let (service, _remote) = loaded(vec![item("A"), item("B")]).await;
        service.toggle_completed("B").await.expect("toggle");

        let outcome = service.export().expect("export");
        let parsed: ExportSnapshot = serde_json::from_str(&outcome.value.json).unwrap();

        let state = service.snapshot();
        assert_eq!(parsed.items.len(), state.items.len());
        for (id, item) in state.items.entries() {
            assert_eq!(parsed.items.get(id), Some(item));
        }
    }

    #[tokio::test]
    async fn categories_and_week_grid() {
        let mut a = item("A");
        a.category = Some("Health".into());
        let mut b = item("B");
        b.category = Some("Work".into());
        b.day = WeekDay::Wednesday;
        b.time_block = TimeBlock::Afternoon;
        let mut c = item("C");
        c.category = Some("Health".into());
        let (service, _remote) = loaded(vec![a, b, c]).await;

        assert_eq!(service.categories(), vec!["Health", "Work"]);

        let week = service.week(&ItemFilter::default());
        assert_eq!(week.len(), 7);
        let monday = &week[0];
        assert_eq!(monday.day, WeekDay::Monday);
        assert_eq!(monday.blocks[0].1.len(), 2);
        assert!(week[1].is_empty());
        assert_eq!(week[2].blocks[1].1[0].id, "B");
    }

    #[tokio::test]
    async fn reload_drops_selection_of_vanished_item() {
        let (service, remote) = loaded(vec![item("A")]).await;
        service.select(Some("A")).await.expect("select");
        remote.delete_item("A").await.expect("remote delete");

        service.load().await.expect("reload");
        assert!(service.selected().is_none());
    }
}
