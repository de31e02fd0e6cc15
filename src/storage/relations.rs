//! Parent/child integrity rules layered over the [`Store`].
//!
//! The store itself only knows how to persist single records. Everything that
//! touches more than one record at once lives here: cascade deletes, ordered
//! appends, bulk replacement of a script's lines and sibling renumbering. Each
//! operation runs in a single transaction, so a failure leaves the store
//! exactly as it was.

use super::{
    ImageStore, Store, child_count, delete_children, delete_record, insert_record, load_children,
    load_record, next_position, not_found, record_exists, write_record,
};
use crate::models::{
    ChatMessage, ChatMessageDraft, ChildEntity, Entity, EntityKind, Expense, ExpensePatch,
    PracticeDialogue, PracticeDialogueDraft, PracticeScript, PracticeScriptPatch, Report, Schedule,
    SchedulePatch, Speaker,
};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use uuid::Uuid;

/// One submitted line for [`Relations::replace_dialogues`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogueLine {
    pub speaker: Speaker,
    pub content: String,
}

impl DialogueLine {
    pub fn new(speaker: Speaker, content: impl Into<String>) -> Self {
        Self {
            speaker,
            content: content.into(),
        }
    }
}

/// Relationship-aware operations borrowed from a [`Store`].
pub struct Relations<'s> {
    store: &'s mut Store,
}

impl<'s> Relations<'s> {
    pub(crate) fn new(store: &'s mut Store) -> Self {
        Self { store }
    }

    // === Cascade delete ===

    /// Delete a script and every line it owns.
    pub fn delete_script(&mut self, script_id: Uuid) -> Result<usize> {
        self.cascade(EntityKind::PracticeScript, EntityKind::PracticeDialogue, script_id)
    }

    /// Delete a report and its whole chat log.
    pub fn delete_report(&mut self, report_id: Uuid) -> Result<usize> {
        self.cascade(EntityKind::Report, EntityKind::ChatMessage, report_id)
    }

    /// Returns the number of children removed. A missing parent is a no-op.
    fn cascade(&mut self, parent: EntityKind, child: EntityKind, parent_id: Uuid) -> Result<usize> {
        let removed = self.store.transaction(|tx| {
            if !record_exists(tx, parent, parent_id)? {
                return Ok(0);
            }
            let removed = delete_children(tx, child, parent_id)?;
            let remaining = child_count(tx, child, parent_id)?;
            if remaining > 0 {
                return Err(Error::ConstraintViolation(format!(
                    "{} {} still owns {} {} record(s)",
                    parent, parent_id, remaining, child
                )));
            }
            delete_record(tx, parent, parent_id)?;
            Ok(removed)
        })?;
        tracing::info!(kind = %parent, id = %parent_id, children = removed, "cascade delete");
        Ok(removed)
    }

    // === Ordered insert ===

    /// Append a line to the end of a script.
    pub fn add_dialogue(
        &mut self,
        script_id: Uuid,
        speaker: Speaker,
        content: impl Into<String>,
    ) -> Result<PracticeDialogue> {
        let draft = PracticeDialogueDraft::new(script_id, speaker, content);
        self.append::<PracticeDialogue>(script_id, move |order| PracticeDialogueDraft {
            order: Some(order),
            ..draft
        })
    }

    /// Append a message to the end of a report's chat log.
    pub fn add_message(
        &mut self,
        report_id: Uuid,
        sender: Speaker,
        content: impl Into<String>,
        timestamp: Option<DateTime<Utc>>,
    ) -> Result<ChatMessage> {
        let draft = ChatMessageDraft::new(report_id, sender, content);
        self.append::<ChatMessage>(report_id, move |order| ChatMessageDraft {
            order: Some(order),
            timestamp,
            ..draft
        })
    }

    fn append<T: ChildEntity>(
        &mut self,
        parent_id: Uuid,
        draft: impl FnOnce(u32) -> T::Draft,
    ) -> Result<T> {
        let record = self.store.transaction(|tx| {
            ensure_parent::<T>(tx, parent_id)?;
            let order = next_order::<T>(tx, parent_id)?;
            let record = T::from_draft(Uuid::new_v4(), Utc::now(), draft(order))?;
            insert_record(tx, &record)?;
            Ok(record)
        })?;
        tracing::debug!(kind = %T::KIND, parent = %parent_id, order = record.order(), "appended child");
        Ok(record)
    }

    // === Bulk replace ===

    /// Replace a script's lines with `lines`.
    ///
    /// Each kept line's order is its 0-based position in `lines`; lines with
    /// empty content are dropped and leave their position unused.
    pub fn replace_dialogues(
        &mut self,
        script_id: Uuid,
        lines: Vec<DialogueLine>,
    ) -> Result<Vec<PracticeDialogue>> {
        let created = self.store.transaction(|tx| {
            ensure_parent::<PracticeDialogue>(tx, script_id)?;
            delete_children(tx, EntityKind::PracticeDialogue, script_id)?;

            let now = Utc::now();
            let mut created = Vec::new();
            for (index, line) in lines.into_iter().enumerate() {
                if line.content.is_empty() {
                    continue;
                }
                let draft = PracticeDialogueDraft {
                    order: Some(index as u32),
                    ..PracticeDialogueDraft::new(script_id, line.speaker, line.content)
                };
                let dialogue = PracticeDialogue::from_draft(Uuid::new_v4(), now, draft)?;
                insert_record(tx, &dialogue)?;
                created.push(dialogue);
            }
            Ok(created)
        })?;
        tracing::info!(script = %script_id, lines = created.len(), "replaced dialogues");
        Ok(created)
    }

    // === Child delete with renumbering ===

    /// Delete one line and close the gap it leaves.
    pub fn delete_dialogue(&mut self, dialogue_id: Uuid) -> Result<()> {
        self.delete_child::<PracticeDialogue>(dialogue_id)
    }

    /// Delete one chat message and close the gap it leaves.
    pub fn delete_message(&mut self, message_id: Uuid) -> Result<()> {
        self.delete_child::<ChatMessage>(message_id)
    }

    fn delete_child<T: ChildEntity>(&mut self, id: Uuid) -> Result<()> {
        self.store.transaction(|tx| {
            let Some(child) = load_record::<T>(tx, id)? else {
                return Ok(());
            };
            delete_record(tx, T::KIND, id)?;
            renumber::<T>(tx, child.parent_id())
        })?;
        tracing::debug!(kind = %T::KIND, %id, "deleted child");
        Ok(())
    }

    // === Schedules ===

    /// Delete a schedule along with its attached image, if any.
    pub fn delete_schedule(&mut self, schedule_id: Uuid, images: Option<&ImageStore>) -> Result<()> {
        let removed = self.store.transaction(|tx| {
            let schedule = load_record::<Schedule>(tx, schedule_id)?;
            delete_record(tx, EntityKind::Schedule, schedule_id)?;
            Ok(schedule)
        })?;

        if let (Some(images), Some(path)) = (images, removed.and_then(|s| s.image_path)) {
            // The record is already gone; a leftover file is only wasted space
            if let Err(e) = images.delete(&path) {
                tracing::warn!(schedule = %schedule_id, path = %path, error = %e, "failed to remove image");
            }
        }
        Ok(())
    }

    // === Toggles ===

    /// Flip a script's favorite flag, returning the new value.
    pub fn toggle_favorite(&mut self, script_id: Uuid) -> Result<bool> {
        let script: PracticeScript = self.store.get(script_id)?;
        let value = !script.is_favorite;
        self.store.update::<PracticeScript>(
            script_id,
            PracticeScriptPatch {
                is_favorite: Some(value),
                ..Default::default()
            },
        )?;
        Ok(value)
    }

    /// Flip a schedule's completed flag, returning the new value.
    pub fn toggle_completed(&mut self, schedule_id: Uuid) -> Result<bool> {
        let schedule: Schedule = self.store.get(schedule_id)?;
        let value = !schedule.is_completed;
        self.store.update::<Schedule>(
            schedule_id,
            SchedulePatch {
                is_completed: Some(value),
                ..Default::default()
            },
        )?;
        Ok(value)
    }

    /// Flip an expense's paid flag, returning the new value.
    pub fn toggle_paid(&mut self, expense_id: Uuid) -> Result<bool> {
        let expense: Expense = self.store.get(expense_id)?;
        let value = !expense.is_paid;
        self.store.update::<Expense>(
            expense_id,
            ExpensePatch {
                is_paid: Some(value),
                ..Default::default()
            },
        )?;
        Ok(value)
    }
}

fn ensure_parent<T: ChildEntity>(conn: &Connection, parent_id: Uuid) -> Result<()> {
    let parent = T::KIND
        .parent()
        .ok_or_else(|| Error::Other(format!("{} has no parent kind", T::KIND)))?;
    if !record_exists(conn, parent, parent_id)? {
        return Err(not_found(parent, parent_id));
    }
    Ok(())
}

/// Next free position. A bulk replace may leave gaps, so this is one past the
/// highest order rather than the child count.
fn next_order<T: ChildEntity>(conn: &Connection, parent_id: Uuid) -> Result<u32> {
    next_position(conn, T::KIND, parent_id)
}

/// Rewrite sibling orders to 0..n-1, preserving their relative order.
fn renumber<T: ChildEntity>(conn: &Connection, parent_id: Uuid) -> Result<()> {
    // Ascending walk: each target slot is already free when we reach it
    for (index, mut sibling) in load_children::<T>(conn, parent_id)?.into_iter().enumerate() {
        let index = index as u32;
        if sibling.order() != index {
            sibling.set_order(index);
            write_record(conn, &sibling)?;
        }
    }
    Ok(())
}
