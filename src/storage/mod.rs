//! Storage layer for meetgreet data.
//!
//! This module owns every persisted record. All data lives in a single SQLite
//! database (`meetgreet.db`) inside the data directory, one table per entity
//! kind. Each row keeps the record body as JSON next to the columns the store
//! needs for identity and ordering:
//!
//! - `id` - UUID primary key, immutable
//! - `parent_id` / `ord` - owning record and position (child kinds only)
//! - `created_at` - creation timestamp
//! - `body` - the serialized record
//!
//! Child tables reference their parent with `ON DELETE RESTRICT` and enforce
//! `UNIQUE(parent_id, ord)`, so the database rejects an orphaning delete or a
//! duplicate position. Parent/child rules are applied explicitly by
//! [`relations::Relations`].
//!
//! Every mutation runs in one transaction: readers never observe a partially
//! applied operation.

pub mod images;
pub mod relations;

pub use images::{ImageStore, ImageUpload};
pub use relations::{DialogueLine, Relations};

use crate::models::{
    ChildEntity, Entity, EntityKind, PracticeScript, PracticeScriptPatch, UiSettings,
    UiSettingsDraft, UiSettingsPatch,
};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Transaction, params};
use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

/// Database file name inside the data directory.
pub const DB_FILE: &str = "meetgreet.db";

/// Columns added after the first schema version, applied on open when missing.
const ADDITIVE_COLUMNS: &[(&str, &str)] = &[("updated_at", "TEXT")];

/// A store handle shared between long-lived collaborators.
pub type SharedStore = Arc<Mutex<Store>>;

/// Lock a shared store, surfacing a poisoned lock as an error.
pub fn lock(store: &SharedStore) -> Result<MutexGuard<'_, Store>> {
    store
        .lock()
        .map_err(|_| Error::Other("Store lock poisoned".to_string()))
}

/// Optional filter predicate for [`Store::query`].
pub type Filter<'a, T> = Option<&'a dyn Fn(&T) -> bool>;

/// Optional comparator for [`Store::query`].
pub type Sort<'a, T> = Option<&'a dyn Fn(&T, &T) -> Ordering>;

/// Storage manager for a single data directory.
pub struct Store {
    /// Data directory, `None` for an in-memory store
    pub root: Option<PathBuf>,
    conn: Connection,
}

impl Store {
    /// Open existing storage in the given data directory.
    pub fn open(data_dir: &Path) -> Result<Self> {
        if !Self::exists(data_dir) {
            return Err(Error::NotInitialized);
        }
        let conn = Connection::open(data_dir.join(DB_FILE))?;
        Self::from_connection(conn, Some(data_dir.to_path_buf()))
    }

    /// Initialize storage in the given data directory. Safe to call again on
    /// an initialized directory.
    pub fn init(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)?;
        let conn = Connection::open(data_dir.join(DB_FILE))?;
        Self::from_connection(conn, Some(data_dir.to_path_buf()))
    }

    /// Check if storage exists in the given data directory.
    pub fn exists(data_dir: &Path) -> bool {
        data_dir.join(DB_FILE).exists()
    }

    /// Open a store that lives only as long as this value.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn, None)
    }

    fn from_connection(conn: Connection, root: Option<PathBuf>) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Self::init_schema(&conn)?;
        Self::migrate(&conn)?;
        Ok(Self { root, conn })
    }

    /// Wrap this store for sharing with collaborators.
    pub fn into_shared(self) -> SharedStore {
        Arc::new(Mutex::new(self))
    }

    /// Initialize the SQLite schema.
    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS schedules (
                id TEXT PRIMARY KEY,
                parent_id TEXT,
                ord INTEGER,
                created_at TEXT NOT NULL,
                updated_at TEXT,
                body TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS expenses (
                id TEXT PRIMARY KEY,
                parent_id TEXT,
                ord INTEGER,
                created_at TEXT NOT NULL,
                updated_at TEXT,
                body TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS practice_scripts (
                id TEXT PRIMARY KEY,
                parent_id TEXT,
                ord INTEGER,
                created_at TEXT NOT NULL,
                updated_at TEXT,
                body TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS practice_dialogues (
                id TEXT PRIMARY KEY,
                parent_id TEXT NOT NULL,
                ord INTEGER NOT NULL CHECK (ord >= 0),
                created_at TEXT NOT NULL,
                updated_at TEXT,
                body TEXT NOT NULL,
                UNIQUE (parent_id, ord),
                FOREIGN KEY (parent_id) REFERENCES practice_scripts(id) ON DELETE RESTRICT
            );

            CREATE TABLE IF NOT EXISTS reports (
                id TEXT PRIMARY KEY,
                parent_id TEXT,
                ord INTEGER,
                created_at TEXT NOT NULL,
                updated_at TEXT,
                body TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS chat_messages (
                id TEXT PRIMARY KEY,
                parent_id TEXT NOT NULL,
                ord INTEGER NOT NULL CHECK (ord >= 0),
                created_at TEXT NOT NULL,
                updated_at TEXT,
                body TEXT NOT NULL,
                UNIQUE (parent_id, ord),
                FOREIGN KEY (parent_id) REFERENCES reports(id) ON DELETE RESTRICT
            );

            CREATE TABLE IF NOT EXISTS ui_settings (
                id TEXT PRIMARY KEY,
                parent_id TEXT,
                ord INTEGER,
                created_at TEXT NOT NULL,
                updated_at TEXT,
                body TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_dialogues_parent ON practice_dialogues(parent_id, ord);
            CREATE INDEX IF NOT EXISTS idx_messages_parent ON chat_messages(parent_id, ord);
            "#,
        )?;
        Ok(())
    }

    /// Add columns introduced after a table was first created.
    fn migrate(conn: &Connection) -> Result<()> {
        for kind in EntityKind::ALL {
            let table = kind.table();
            let existing = table_columns(conn, table)?;
            for (column, decl) in ADDITIVE_COLUMNS {
                if !existing.iter().any(|c| c == column) {
                    tracing::info!(table, column, "adding missing column");
                    conn.execute(
                        &format!("ALTER TABLE {} ADD COLUMN {} {}", table, column, decl),
                        [],
                    )?;
                }
            }
        }
        Ok(())
    }

    /// Run `f` inside one transaction. Any error rolls the whole thing back.
    pub(crate) fn transaction<R>(
        &mut self,
        f: impl FnOnce(&Transaction<'_>) -> Result<R>,
    ) -> Result<R> {
        let tx = self.conn.transaction()?;
        let out = f(&tx)?;
        tx.commit()?;
        Ok(out)
    }

    /// Relationship-aware operations over this store.
    pub fn relations(&mut self) -> Relations<'_> {
        Relations::new(self)
    }

    // === Generic record operations ===

    /// Create a record from its draft, applying defaults for unsupplied fields.
    ///
    /// Child records must name an existing parent. A child draft without a
    /// position is appended after its last sibling.
    pub fn create<T: Entity>(&mut self, draft: T::Draft) -> Result<T> {
        let record = self.transaction(|tx| {
            let draft = match T::unplaced_parent(&draft) {
                Some(parent_id) => {
                    let order = next_position(tx, T::KIND, parent_id)?;
                    T::place(draft, order)
                }
                None => draft,
            };
            let record = T::from_draft(Uuid::new_v4(), Utc::now(), draft)?;
            insert_record(tx, &record)?;
            Ok(record)
        })?;
        tracing::debug!(kind = %T::KIND, id = %record.id(), "created record");
        Ok(record)
    }

    /// Get a record by ID.
    pub fn get<T: Entity>(&self, id: Uuid) -> Result<T> {
        load_record::<T>(&self.conn, id)?.ok_or_else(|| not_found(T::KIND, id))
    }

    /// Apply a partial update. Fields left as `None` in the patch are unchanged.
    pub fn update<T: Entity>(&mut self, id: Uuid, patch: T::Patch) -> Result<T> {
        let record = self.transaction(|tx| {
            let mut record = load_record::<T>(tx, id)?.ok_or_else(|| not_found(T::KIND, id))?;
            record.apply_patch(patch)?;
            write_record(tx, &record)?;
            Ok(record)
        })?;
        tracing::debug!(kind = %T::KIND, %id, "updated record");
        Ok(record)
    }

    /// Delete a record by ID. Deleting a missing ID succeeds.
    ///
    /// Parents that still own children are rejected with
    /// [`Error::ConstraintViolation`]; use [`Relations`] to cascade.
    pub fn delete<T: Entity>(&mut self, id: Uuid) -> Result<()> {
        let removed = self.transaction(|tx| delete_record(tx, T::KIND, id))?;
        if removed > 0 {
            tracing::debug!(kind = %T::KIND, %id, "deleted record");
        }
        Ok(())
    }

    /// List records of one kind, optionally filtered and sorted.
    ///
    /// Without a comparator, records come back in creation order.
    pub fn query<T: Entity>(&self, filter: Filter<'_, T>, sort: Sort<'_, T>) -> Result<Vec<T>> {
        let sql = format!("SELECT body FROM {} ORDER BY rowid ASC", T::KIND.table());
        let mut records = decode_rows::<T>(&self.conn, &sql, [])?;
        if let Some(filter) = filter {
            records.retain(|r| filter(r));
        }
        if let Some(sort) = sort {
            records.sort_by(|a, b| sort(a, b));
        }
        Ok(records)
    }

    /// List every record of one kind in creation order.
    pub fn list<T: Entity>(&self) -> Result<Vec<T>> {
        self.query::<T>(None, None)
    }

    /// Children of a parent, sorted by their position.
    pub fn children<T: ChildEntity>(&self, parent_id: Uuid) -> Result<Vec<T>> {
        load_children::<T>(&self.conn, parent_id)
    }

    /// Number of children a parent currently owns.
    pub fn child_count<T: ChildEntity>(&self, parent_id: Uuid) -> Result<u32> {
        child_count(&self.conn, T::KIND, parent_id)
    }

    // === Settings ===

    /// Get the settings row, creating it with defaults on first access.
    pub fn settings(&mut self) -> Result<UiSettings> {
        if let Some(settings) = self.list::<UiSettings>()?.into_iter().next() {
            return Ok(settings);
        }
        self.create::<UiSettings>(UiSettingsDraft::default())
    }

    /// Update the settings row.
    pub fn update_settings(&mut self, patch: UiSettingsPatch) -> Result<UiSettings> {
        let current = self.settings()?;
        self.update::<UiSettings>(current.id, patch)
    }

    // === Practice bookkeeping ===

    /// Record one completed rehearsal: bump the count and stamp the time.
    pub fn record_practice(&mut self, script_id: Uuid, at: DateTime<Utc>) -> Result<PracticeScript> {
        let script = self.transaction(|tx| {
            let mut script = load_record::<PracticeScript>(tx, script_id)?
                .ok_or_else(|| not_found(EntityKind::PracticeScript, script_id))?;
            script.apply_patch(PracticeScriptPatch {
                practice_count: Some(script.practice_count.saturating_add(1)),
                last_practiced_at: Some(Some(at)),
                ..Default::default()
            })?;
            write_record(tx, &script)?;
            Ok(script)
        })?;
        tracing::info!(
            script = %script_id,
            practice_count = script.practice_count,
            "recorded completed rehearsal"
        );
        Ok(script)
    }
}

// === Row-level helpers, shared with the relationship layer ===

pub(crate) fn not_found(kind: EntityKind, id: Uuid) -> Error {
    Error::NotFound(format!("{} not found: {}", kind, id))
}

fn table_columns(conn: &Connection, table: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", table))?;
    let columns = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(columns)
}

fn decode_rows<T: Entity>(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> Result<Vec<T>> {
    let mut stmt = conn.prepare(sql)?;
    let bodies = stmt
        .query_map(params, |row| row.get::<_, String>(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    bodies
        .iter()
        .map(|body| serde_json::from_str::<T>(body).map_err(Error::from))
        .collect()
}

pub(crate) fn record_exists(conn: &Connection, kind: EntityKind, id: Uuid) -> Result<bool> {
    let found: Option<i64> = conn
        .query_row(
            &format!("SELECT 1 FROM {} WHERE id = ?1", kind.table()),
            [id.to_string()],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

pub(crate) fn load_record<T: Entity>(conn: &Connection, id: Uuid) -> Result<Option<T>> {
    let body: Option<String> = conn
        .query_row(
            &format!("SELECT body FROM {} WHERE id = ?1", T::KIND.table()),
            [id.to_string()],
            |row| row.get(0),
        )
        .optional()?;
    body.map(|b| serde_json::from_str::<T>(&b).map_err(Error::from))
        .transpose()
}

pub(crate) fn insert_record<T: Entity>(conn: &Connection, record: &T) -> Result<()> {
    let link = record.parent_link();
    if let (Some(parent_kind), Some((parent_id, _))) = (T::KIND.parent(), link) {
        if !record_exists(conn, parent_kind, parent_id)? {
            return Err(not_found(parent_kind, parent_id));
        }
    }
    conn.execute(
        &format!(
            "INSERT INTO {} (id, parent_id, ord, created_at, body) VALUES (?1, ?2, ?3, ?4, ?5)",
            T::KIND.table()
        ),
        params![
            record.id().to_string(),
            link.map(|(p, _)| p.to_string()),
            link.map(|(_, o)| o),
            record.created_at().to_rfc3339(),
            serde_json::to_string(record)?,
        ],
    )?;
    Ok(())
}

pub(crate) fn write_record<T: Entity>(conn: &Connection, record: &T) -> Result<()> {
    let changed = conn.execute(
        &format!(
            "UPDATE {} SET ord = ?2, updated_at = ?3, body = ?4 WHERE id = ?1",
            T::KIND.table()
        ),
        params![
            record.id().to_string(),
            record.parent_link().map(|(_, o)| o),
            Utc::now().to_rfc3339(),
            serde_json::to_string(record)?,
        ],
    )?;
    if changed == 0 {
        return Err(not_found(T::KIND, record.id()));
    }
    Ok(())
}

pub(crate) fn delete_record(conn: &Connection, kind: EntityKind, id: Uuid) -> Result<usize> {
    let removed = conn.execute(
        &format!("DELETE FROM {} WHERE id = ?1", kind.table()),
        [id.to_string()],
    )?;
    Ok(removed)
}

pub(crate) fn load_children<T: ChildEntity>(conn: &Connection, parent_id: Uuid) -> Result<Vec<T>> {
    let sql = format!(
        "SELECT body FROM {} WHERE parent_id = ?1 ORDER BY ord ASC",
        T::KIND.table()
    );
    let mut children = decode_rows::<T>(conn, &sql, [parent_id.to_string()])?;
    // Bodies are authoritative for position
    children.sort_by_key(|c| c.order());
    Ok(children)
}

pub(crate) fn child_count(conn: &Connection, kind: EntityKind, parent_id: Uuid) -> Result<u32> {
    let count: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM {} WHERE parent_id = ?1", kind.table()),
        [parent_id.to_string()],
        |row| row.get(0),
    )?;
    Ok(count as u32)
}

/// Position after the last child of `parent_id`; 0 for a parent with none.
pub(crate) fn next_position(conn: &Connection, kind: EntityKind, parent_id: Uuid) -> Result<u32> {
    let next: i64 = conn.query_row(
        &format!(
            "SELECT COALESCE(MAX(ord) + 1, 0) FROM {} WHERE parent_id = ?1",
            kind.table()
        ),
        [parent_id.to_string()],
        |row| row.get(0),
    )?;
    Ok(next as u32)
}

pub(crate) fn delete_children(conn: &Connection, kind: EntityKind, parent_id: Uuid) -> Result<usize> {
    let removed = conn.execute(
        &format!("DELETE FROM {} WHERE parent_id = ?1", kind.table()),
        [parent_id.to_string()],
    )?;
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        ChatMessage, ChatMessageDraft, EventCategory, Expense, ExpenseDraft, ExpensePatch,
        PaymentMethod, PracticeDialogue, PracticeDialogueDraft, PracticeScriptDraft, Report,
        ReportDraft, Schedule, ScheduleDraft, Speaker,
    };
    use crate::test_utils::TestEnv;

    fn create_test_store() -> Store {
        Store::open_in_memory().unwrap()
    }

    #[test]
    fn test_store_init_and_exists() {
        let env = TestEnv::new();
        assert!(!Store::exists(env.data_path()));
        assert!(matches!(
            Store::open(env.data_path()),
            Err(Error::NotInitialized)
        ));

        env.init_store();
        assert!(Store::exists(env.data_path()));
        assert!(env.data_path().join(DB_FILE).exists());

        // Init is idempotent
        env.init_store();
    }

    #[test]
    fn test_create_then_get_merges_defaults() {
        let mut store = create_test_store();

        let created = store
            .create::<Schedule>(ScheduleDraft {
                title: Some("Tour final".to_string()),
                location: Some("Budokan".to_string()),
                ..Default::default()
            })
            .unwrap();

        let fetched: Schedule = store.get(created.id).unwrap();
        assert_eq!(fetched, created);
        assert_eq!(fetched.title, "Tour final");
        assert_eq!(fetched.location, "Budokan");
        assert_eq!(fetched.category, EventCategory::Live);
        assert!(!fetched.is_completed);
    }

    #[test]
    fn test_get_missing_is_not_found() {
        let store = create_test_store();
        let err = store.get::<Schedule>(Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_update_is_partial() {
        let mut store = create_test_store();
        let expense = store
            .create::<Expense>(ExpenseDraft {
                title: Some("Ticket".to_string()),
                amount: Some(8000),
                ..Default::default()
            })
            .unwrap();

        let updated = store
            .update::<Expense>(
                expense.id,
                ExpensePatch {
                    is_paid: Some(true),
                    ..Default::default()
                },
            )
            .unwrap();

        assert!(updated.is_paid);
        assert_eq!(updated.title, "Ticket");
        assert_eq!(updated.amount, 8000);
        assert_eq!(updated.payment_method, PaymentMethod::Cash);
        assert_eq!(store.get::<Expense>(expense.id).unwrap(), updated);
    }

    #[test]
    fn test_update_missing_is_not_found() {
        let mut store = create_test_store();
        let err = store
            .update::<Expense>(Uuid::new_v4(), ExpensePatch::default())
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_invalid_patch_leaves_record_unchanged() {
        let mut store = create_test_store();
        let expense = store.create::<Expense>(ExpenseDraft::default()).unwrap();

        let err = store
            .update::<Expense>(
                expense.id,
                ExpensePatch {
                    title: Some("changed".to_string()),
                    amount: Some(-1),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, Error::InvalidFieldValue(_)));
        assert_eq!(store.get::<Expense>(expense.id).unwrap(), expense);
    }

    #[test]
    fn test_delete_is_idempotent() {
        let mut store = create_test_store();
        store.delete::<Schedule>(Uuid::new_v4()).unwrap();

        let schedule = store.create::<Schedule>(ScheduleDraft::default()).unwrap();
        store.delete::<Schedule>(schedule.id).unwrap();
        assert!(matches!(
            store.get::<Schedule>(schedule.id),
            Err(Error::NotFound(_))
        ));
        store.delete::<Schedule>(schedule.id).unwrap();
    }

    #[test]
    fn test_query_filter_and_sort() {
        let mut store = create_test_store();
        for (title, amount) in [("a", 300), ("b", 100), ("c", 200)] {
            store
                .create::<Expense>(ExpenseDraft {
                    title: Some(title.to_string()),
                    amount: Some(amount),
                    ..Default::default()
                })
                .unwrap();
        }

        let all = store.list::<Expense>().unwrap();
        let titles: Vec<_> = all.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["a", "b", "c"]);

        let filter = |e: &Expense| e.amount >= 200;
        let sort = |a: &Expense, b: &Expense| a.amount.cmp(&b.amount);
        let big = store.query::<Expense>(Some(&filter), Some(&sort)).unwrap();
        let titles: Vec<_> = big.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["c", "a"]);
    }

    #[test]
    fn test_child_requires_existing_parent() {
        let mut store = create_test_store();
        let err = store
            .create::<PracticeDialogue>(PracticeDialogueDraft::new(
                Uuid::new_v4(),
                Speaker::User,
                "hello",
            ))
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_duplicate_child_order_is_rejected() {
        let mut store = create_test_store();
        let script = store
            .create::<PracticeScript>(PracticeScriptDraft::default())
            .unwrap();

        let mut draft = PracticeDialogueDraft::new(script.id, Speaker::User, "one");
        draft.order = Some(0);
        store.create::<PracticeDialogue>(draft.clone()).unwrap();

        let err = store.create::<PracticeDialogue>(draft).unwrap_err();
        assert!(matches!(err, Error::ConstraintViolation(_)));
        assert_eq!(store.child_count::<PracticeDialogue>(script.id).unwrap(), 1);
    }

    #[test]
    fn test_create_child_without_order_appends() {
        let mut store = create_test_store();
        let script = store
            .create::<PracticeScript>(PracticeScriptDraft::default())
            .unwrap();

        let first = store
            .create::<PracticeDialogue>(PracticeDialogueDraft::new(script.id, Speaker::User, "a"))
            .unwrap();
        let second = store
            .create::<PracticeDialogue>(PracticeDialogueDraft::new(script.id, Speaker::User, "b"))
            .unwrap();
        assert_eq!(first.order, 0);
        assert_eq!(second.order, 1);

        let mut gap = PracticeDialogueDraft::new(script.id, Speaker::Counterpart, "c");
        gap.order = Some(4);
        store.create::<PracticeDialogue>(gap).unwrap();
        let after_gap = store
            .create::<PracticeDialogue>(PracticeDialogueDraft::new(script.id, Speaker::User, "d"))
            .unwrap();
        assert_eq!(after_gap.order, 5);

        let contents: Vec<String> = store
            .children::<PracticeDialogue>(script.id)
            .unwrap()
            .into_iter()
            .map(|l| l.content)
            .collect();
        assert_eq!(contents, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_create_message_without_order_appends() {
        let mut store = create_test_store();
        let report = store.create::<Report>(ReportDraft::default()).unwrap();

        for text in ["hi", "thanks", "bye"] {
            store
                .create::<ChatMessage>(ChatMessageDraft::new(report.id, Speaker::User, text))
                .unwrap();
        }

        let orders: Vec<u32> = store
            .children::<ChatMessage>(report.id)
            .unwrap()
            .iter()
            .map(|m| m.order)
            .collect();
        assert_eq!(orders, vec![0, 1, 2]);
    }

    #[test]
    fn test_children_sorted_regardless_of_insertion_order() {
        let mut store = create_test_store();
        let script = store
            .create::<PracticeScript>(PracticeScriptDraft::default())
            .unwrap();

        for order in [2u32, 0, 5, 1] {
            let mut draft =
                PracticeDialogueDraft::new(script.id, Speaker::Counterpart, format!("line {}", order));
            draft.order = Some(order);
            store.create::<PracticeDialogue>(draft).unwrap();
        }

        let lines = store.children::<PracticeDialogue>(script.id).unwrap();
        let orders: Vec<u32> = lines.iter().map(|l| l.order).collect();
        assert_eq!(orders, vec![0, 1, 2, 5]);
    }

    #[test]
    fn test_plain_delete_of_parent_with_children_is_rejected() {
        let mut store = create_test_store();
        let script = store
            .create::<PracticeScript>(PracticeScriptDraft::default())
            .unwrap();
        store
            .create::<PracticeDialogue>(PracticeDialogueDraft::new(script.id, Speaker::User, "hi"))
            .unwrap();

        let err = store.delete::<PracticeScript>(script.id).unwrap_err();
        assert!(matches!(err, Error::ConstraintViolation(_)));
        assert!(store.get::<PracticeScript>(script.id).is_ok());
        assert_eq!(store.child_count::<PracticeDialogue>(script.id).unwrap(), 1);
    }

    #[test]
    fn test_settings_singleton() {
        let mut store = create_test_store();
        let first = store.settings().unwrap();
        let second = store.settings().unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(first.theme, "default");

        let updated = store
            .update_settings(UiSettingsPatch {
                theme: Some("game".to_string()),
                narration_rate: Some(0.7),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(updated.id, first.id);
        assert_eq!(updated.theme, "game");
        assert_eq!(store.list::<UiSettings>().unwrap().len(), 1);
    }

    #[test]
    fn test_record_practice_increments_once() {
        let mut store = create_test_store();
        let script = store
            .create::<PracticeScript>(PracticeScriptDraft::default())
            .unwrap();

        let at = Utc::now();
        let after = store.record_practice(script.id, at).unwrap();
        assert_eq!(after.practice_count, 1);
        assert_eq!(after.last_practiced_at, Some(at));

        let after = store.record_practice(script.id, at).unwrap();
        assert_eq!(after.practice_count, 2);
    }

    #[test]
    fn test_records_survive_reopen() {
        let env = TestEnv::new();
        let id = {
            let mut store = env.init_store();
            store
                .create::<Schedule>(ScheduleDraft {
                    title: Some("Fan meeting".to_string()),
                    category: Some(EventCategory::FanMeeting),
                    ..Default::default()
                })
                .unwrap()
                .id
        };

        let store = env.open_store();
        let schedule: Schedule = store.get(id).unwrap();
        assert_eq!(schedule.title, "Fan meeting");
        assert_eq!(schedule.category, EventCategory::FanMeeting);
    }

    #[test]
    fn test_migration_adds_missing_column() {
        let env = TestEnv::new();
        {
            // Simulate a database written before `updated_at` existed
            let conn = Connection::open(env.data_path().join(DB_FILE)).unwrap();
            conn.execute_batch(
                "CREATE TABLE schedules (
                    id TEXT PRIMARY KEY,
                    parent_id TEXT,
                    ord INTEGER,
                    created_at TEXT NOT NULL,
                    body TEXT NOT NULL
                );",
            )
            .unwrap();
        }

        let mut store = env.open_store();
        let columns = table_columns(&store.conn, "schedules").unwrap();
        assert!(columns.iter().any(|c| c == "updated_at"));

        // The migrated table is fully usable
        let schedule = store.create::<Schedule>(ScheduleDraft::default()).unwrap();
        store
            .update::<Schedule>(schedule.id, Default::default())
            .unwrap();
    }

    #[test]
    fn test_unknown_persisted_enum_falls_back() {
        let store = create_test_store();
        let id = Uuid::new_v4();
        store
            .conn
            .execute(
                "INSERT INTO expenses (id, created_at, body) VALUES (?1, ?2, ?3)",
                params![
                    id.to_string(),
                    "2026-01-01T00:00:00+00:00",
                    format!(
                        r#"{{"id":"{}","amount":10,"category":"lottery","expense_date":"2026-01-01T00:00:00Z","payment_method":"barter","created_at":"2026-01-01T00:00:00Z"}}"#,
                        id
                    ),
                ],
            )
            .unwrap();

        let expense: Expense = store.get(id).unwrap();
        assert_eq!(expense.category, crate::models::ExpenseCategory::Other);
        assert_eq!(expense.payment_method, PaymentMethod::Other);
        assert!(!expense.is_paid);
    }
}
