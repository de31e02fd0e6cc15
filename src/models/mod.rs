//! Data models for meetgreet entities.
//!
//! This module defines the persisted records:
//! - `Schedule` - An event on the calendar, with deadlines and an optional image
//! - `Expense` - Money spent on an event, in minor currency units
//! - `PracticeScript` - A rehearsal script, parent of `PracticeDialogue` lines
//! - `PracticeDialogue` - One ordered line of a script
//! - `Report` - A post-event report, parent of `ChatMessage` entries
//! - `ChatMessage` - One ordered message of a report's chat log
//! - `UiSettings` - Singleton display and narration preferences
//!
//! Every entity implements [`Entity`], which is how the store applies defaults
//! at creation and partial patches at update. Children additionally implement
//! [`ChildEntity`].

pub mod kinds;

pub use kinds::{EventCategory, ExpenseCategory, PaymentMethod, PracticeEventType, Speaker};

use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// The kinds of records held by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Schedule,
    Expense,
    PracticeScript,
    PracticeDialogue,
    Report,
    ChatMessage,
    UiSettings,
}

impl EntityKind {
    /// All kinds, parents before children.
    pub const ALL: [EntityKind; 7] = [
        EntityKind::Schedule,
        EntityKind::Expense,
        EntityKind::PracticeScript,
        EntityKind::PracticeDialogue,
        EntityKind::Report,
        EntityKind::ChatMessage,
        EntityKind::UiSettings,
    ];

    /// SQLite table backing this kind.
    pub fn table(&self) -> &'static str {
        match self {
            EntityKind::Schedule => "schedules",
            EntityKind::Expense => "expenses",
            EntityKind::PracticeScript => "practice_scripts",
            EntityKind::PracticeDialogue => "practice_dialogues",
            EntityKind::Report => "reports",
            EntityKind::ChatMessage => "chat_messages",
            EntityKind::UiSettings => "ui_settings",
        }
    }

    /// The owning kind for child collections.
    pub fn parent(&self) -> Option<EntityKind> {
        match self {
            EntityKind::PracticeDialogue => Some(EntityKind::PracticeScript),
            EntityKind::ChatMessage => Some(EntityKind::Report),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Schedule => "schedule",
            EntityKind::Expense => "expense",
            EntityKind::PracticeScript => "practice_script",
            EntityKind::PracticeDialogue => "practice_dialogue",
            EntityKind::Report => "report",
            EntityKind::ChatMessage => "chat_message",
            EntityKind::UiSettings => "ui_settings",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A record the store can persist.
///
/// `Draft` carries the caller-supplied initial fields; anything left as `None`
/// takes the entity's default. `Patch` is a partial update: `None` fields are
/// left unchanged. Both are validated before anything is written.
pub trait Entity: Serialize + DeserializeOwned + Clone + fmt::Debug {
    const KIND: EntityKind;

    type Draft;
    type Patch: Default;

    fn id(&self) -> Uuid;

    fn created_at(&self) -> DateTime<Utc>;

    /// Build a new record, applying defaults for unsupplied fields.
    fn from_draft(id: Uuid, now: DateTime<Utc>, draft: Self::Draft) -> Result<Self>;

    /// Apply a partial update in place.
    fn apply_patch(&mut self, patch: Self::Patch) -> Result<()>;

    /// Parent id and position for child records.
    fn parent_link(&self) -> Option<(Uuid, u32)> {
        None
    }

    /// Parent of a child draft that leaves its position to the store.
    fn unplaced_parent(_draft: &Self::Draft) -> Option<Uuid> {
        None
    }

    /// Fill in the position of a child draft.
    fn place(draft: Self::Draft, _order: u32) -> Self::Draft {
        draft
    }
}

/// A record that belongs to exactly one parent and is ordered among siblings.
pub trait ChildEntity: Entity {
    fn parent_id(&self) -> Uuid;

    fn order(&self) -> u32;

    fn set_order(&mut self, order: u32);
}

// === Validation ===

/// Highest report rating.
pub const MAX_RATING: i64 = 5;

/// Validate an expense amount. Amounts are whole minor units and never negative.
pub fn validate_amount(amount: i64) -> Result<u64> {
    u64::try_from(amount).map_err(|_| {
        Error::InvalidFieldValue(format!("amount must be non-negative, got {}", amount))
    })
}

/// Validate a report rating (1-5).
pub fn validate_rating(rating: i64) -> Result<u8> {
    if !(1..=MAX_RATING).contains(&rating) {
        return Err(Error::InvalidFieldValue(format!(
            "rating must be 1-{}, got {}",
            MAX_RATING, rating
        )));
    }
    Ok(rating as u8)
}

fn validate_bounded(name: &str, value: f32, min: f32, max: f32) -> Result<f32> {
    if !value.is_finite() || value < min || value > max {
        return Err(Error::InvalidFieldValue(format!(
            "{} must be within {}-{}, got {}",
            name, min, max, value
        )));
    }
    Ok(value)
}

// === Schedule ===

/// An event on the user's calendar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    /// Unique identifier
    pub id: Uuid,

    /// Event title
    #[serde(default)]
    pub title: String,

    /// Free-form description
    #[serde(default)]
    pub description: String,

    /// When the event takes place
    pub event_date: DateTime<Utc>,

    /// Venue
    #[serde(default)]
    pub location: String,

    /// Event category
    #[serde(default)]
    pub category: EventCategory,

    /// Whether the event has been attended / closed
    #[serde(default)]
    pub is_completed: bool,

    #[serde(default)]
    pub notes: String,

    /// Ticket application deadline
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticket_deadline: Option<DateTime<Utc>>,

    /// Payment deadline
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_deadline: Option<DateTime<Utc>>,

    /// Path of the attached image, relative to the image directory.
    /// Written only after the image has been persisted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_path: Option<String>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

/// Initial fields for a new [`Schedule`].
#[derive(Debug, Clone, Default)]
pub struct ScheduleDraft {
    pub title: Option<String>,
    pub description: Option<String>,
    pub event_date: Option<DateTime<Utc>>,
    pub location: Option<String>,
    pub category: Option<EventCategory>,
    pub is_completed: Option<bool>,
    pub notes: Option<String>,
    pub ticket_deadline: Option<DateTime<Utc>>,
    pub payment_deadline: Option<DateTime<Utc>>,
}

/// Partial update for a [`Schedule`].
#[derive(Debug, Clone, Default)]
pub struct SchedulePatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub event_date: Option<DateTime<Utc>>,
    pub location: Option<String>,
    pub category: Option<EventCategory>,
    pub is_completed: Option<bool>,
    pub notes: Option<String>,
    /// `Some(None)` clears the deadline
    pub ticket_deadline: Option<Option<DateTime<Utc>>>,
    pub payment_deadline: Option<Option<DateTime<Utc>>>,
    pub image_path: Option<Option<String>>,
}

impl Entity for Schedule {
    const KIND: EntityKind = EntityKind::Schedule;
    type Draft = ScheduleDraft;
    type Patch = SchedulePatch;

    fn id(&self) -> Uuid {
        self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn from_draft(id: Uuid, now: DateTime<Utc>, draft: ScheduleDraft) -> Result<Self> {
        Ok(Self {
            id,
            title: draft.title.unwrap_or_default(),
            description: draft.description.unwrap_or_default(),
            event_date: draft.event_date.unwrap_or(now),
            location: draft.location.unwrap_or_default(),
            category: draft.category.unwrap_or_default(),
            is_completed: draft.is_completed.unwrap_or(false),
            notes: draft.notes.unwrap_or_default(),
            ticket_deadline: draft.ticket_deadline,
            payment_deadline: draft.payment_deadline,
            image_path: None,
            created_at: now,
        })
    }

    fn apply_patch(&mut self, patch: SchedulePatch) -> Result<()> {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(event_date) = patch.event_date {
            self.event_date = event_date;
        }
        if let Some(location) = patch.location {
            self.location = location;
        }
        if let Some(category) = patch.category {
            self.category = category;
        }
        if let Some(is_completed) = patch.is_completed {
            self.is_completed = is_completed;
        }
        if let Some(notes) = patch.notes {
            self.notes = notes;
        }
        if let Some(deadline) = patch.ticket_deadline {
            self.ticket_deadline = deadline;
        }
        if let Some(deadline) = patch.payment_deadline {
            self.payment_deadline = deadline;
        }
        if let Some(path) = patch.image_path {
            self.image_path = path;
        }
        Ok(())
    }
}

// === Expense ===

/// Money spent on an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    pub id: Uuid,

    #[serde(default)]
    pub title: String,

    /// Amount in minor currency units
    #[serde(default)]
    pub amount: u64,

    #[serde(default)]
    pub category: ExpenseCategory,

    /// When the money was spent
    pub expense_date: DateTime<Utc>,

    #[serde(default)]
    pub payment_method: PaymentMethod,

    #[serde(default)]
    pub is_paid: bool,

    #[serde(default)]
    pub notes: String,

    pub created_at: DateTime<Utc>,
}

/// Initial fields for a new [`Expense`].
#[derive(Debug, Clone, Default)]
pub struct ExpenseDraft {
    pub title: Option<String>,
    /// Validated non-negative at creation
    pub amount: Option<i64>,
    pub category: Option<ExpenseCategory>,
    pub expense_date: Option<DateTime<Utc>>,
    pub payment_method: Option<PaymentMethod>,
    pub is_paid: Option<bool>,
    pub notes: Option<String>,
}

/// Partial update for an [`Expense`].
#[derive(Debug, Clone, Default)]
pub struct ExpensePatch {
    pub title: Option<String>,
    pub amount: Option<i64>,
    pub category: Option<ExpenseCategory>,
    pub expense_date: Option<DateTime<Utc>>,
    pub payment_method: Option<PaymentMethod>,
    pub is_paid: Option<bool>,
    pub notes: Option<String>,
}

impl Entity for Expense {
    const KIND: EntityKind = EntityKind::Expense;
    type Draft = ExpenseDraft;
    type Patch = ExpensePatch;

    fn id(&self) -> Uuid {
        self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn from_draft(id: Uuid, now: DateTime<Utc>, draft: ExpenseDraft) -> Result<Self> {
        let amount = validate_amount(draft.amount.unwrap_or(0))?;
        Ok(Self {
            id,
            title: draft.title.unwrap_or_default(),
            amount,
            category: draft.category.unwrap_or_default(),
            expense_date: draft.expense_date.unwrap_or(now),
            payment_method: draft.payment_method.unwrap_or_default(),
            is_paid: draft.is_paid.unwrap_or(false),
            notes: draft.notes.unwrap_or_default(),
            created_at: now,
        })
    }

    fn apply_patch(&mut self, patch: ExpensePatch) -> Result<()> {
        // Validate before touching any field so a rejected patch changes nothing
        let amount = patch.amount.map(validate_amount).transpose()?;

        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(amount) = amount {
            self.amount = amount;
        }
        if let Some(category) = patch.category {
            self.category = category;
        }
        if let Some(expense_date) = patch.expense_date {
            self.expense_date = expense_date;
        }
        if let Some(method) = patch.payment_method {
            self.payment_method = method;
        }
        if let Some(is_paid) = patch.is_paid {
            self.is_paid = is_paid;
        }
        if let Some(notes) = patch.notes {
            self.notes = notes;
        }
        Ok(())
    }
}

// === PracticeScript ===

/// A rehearsal script. Its lines are [`PracticeDialogue`] children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PracticeScript {
    pub id: Uuid,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub description: String,

    /// Kind of event being rehearsed for
    #[serde(default)]
    pub event_type: PracticeEventType,

    /// Number of completed rehearsals
    #[serde(default)]
    pub practice_count: u32,

    /// When the last rehearsal completed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_practiced_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub is_favorite: bool,

    pub created_at: DateTime<Utc>,
}

/// Initial fields for a new [`PracticeScript`].
#[derive(Debug, Clone, Default)]
pub struct PracticeScriptDraft {
    pub title: Option<String>,
    pub description: Option<String>,
    pub event_type: Option<PracticeEventType>,
    pub is_favorite: Option<bool>,
}

/// Partial update for a [`PracticeScript`].
#[derive(Debug, Clone, Default)]
pub struct PracticeScriptPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub event_type: Option<PracticeEventType>,
    pub practice_count: Option<u32>,
    pub last_practiced_at: Option<Option<DateTime<Utc>>>,
    pub is_favorite: Option<bool>,
}

impl Entity for PracticeScript {
    const KIND: EntityKind = EntityKind::PracticeScript;
    type Draft = PracticeScriptDraft;
    type Patch = PracticeScriptPatch;

    fn id(&self) -> Uuid {
        self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn from_draft(id: Uuid, now: DateTime<Utc>, draft: PracticeScriptDraft) -> Result<Self> {
        Ok(Self {
            id,
            title: draft.title.unwrap_or_default(),
            description: draft.description.unwrap_or_default(),
            event_type: draft.event_type.unwrap_or_default(),
            practice_count: 0,
            last_practiced_at: None,
            is_favorite: draft.is_favorite.unwrap_or(false),
            created_at: now,
        })
    }

    fn apply_patch(&mut self, patch: PracticeScriptPatch) -> Result<()> {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(event_type) = patch.event_type {
            self.event_type = event_type;
        }
        if let Some(count) = patch.practice_count {
            self.practice_count = count;
        }
        if let Some(at) = patch.last_practiced_at {
            self.last_practiced_at = at;
        }
        if let Some(is_favorite) = patch.is_favorite {
            self.is_favorite = is_favorite;
        }
        Ok(())
    }
}

// === PracticeDialogue ===

/// One line of a [`PracticeScript`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PracticeDialogue {
    pub id: Uuid,

    /// Owning script
    pub script_id: Uuid,

    #[serde(default)]
    pub content: String,

    /// Who says the line
    #[serde(default)]
    pub speaker: Speaker,

    /// Position within the script
    #[serde(default)]
    pub order: u32,

    #[serde(default)]
    pub notes: String,

    pub created_at: DateTime<Utc>,
}

/// Initial fields for a new [`PracticeDialogue`].
#[derive(Debug, Clone)]
pub struct PracticeDialogueDraft {
    pub script_id: Uuid,
    pub content: Option<String>,
    pub speaker: Option<Speaker>,
    pub order: Option<u32>,
    pub notes: Option<String>,
}

impl PracticeDialogueDraft {
    pub fn new(script_id: Uuid, speaker: Speaker, content: impl Into<String>) -> Self {
        Self {
            script_id,
            content: Some(content.into()),
            speaker: Some(speaker),
            order: None,
            notes: None,
        }
    }
}

/// Partial update for a [`PracticeDialogue`]. Position is managed by the
/// relationship layer and cannot be patched.
#[derive(Debug, Clone, Default)]
pub struct PracticeDialoguePatch {
    pub content: Option<String>,
    pub speaker: Option<Speaker>,
    pub notes: Option<String>,
}

impl Entity for PracticeDialogue {
    const KIND: EntityKind = EntityKind::PracticeDialogue;
    type Draft = PracticeDialogueDraft;
    type Patch = PracticeDialoguePatch;

    fn id(&self) -> Uuid {
        self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn from_draft(id: Uuid, now: DateTime<Utc>, draft: PracticeDialogueDraft) -> Result<Self> {
        Ok(Self {
            id,
            script_id: draft.script_id,
            content: draft.content.unwrap_or_default(),
            speaker: draft.speaker.unwrap_or_default(),
            order: draft.order.unwrap_or(0),
            notes: draft.notes.unwrap_or_default(),
            created_at: now,
        })
    }

    fn apply_patch(&mut self, patch: PracticeDialoguePatch) -> Result<()> {
        if let Some(content) = patch.content {
            self.content = content;
        }
        if let Some(speaker) = patch.speaker {
            self.speaker = speaker;
        }
        if let Some(notes) = patch.notes {
            self.notes = notes;
        }
        Ok(())
    }

    fn parent_link(&self) -> Option<(Uuid, u32)> {
        Some((self.script_id, self.order))
    }

    fn unplaced_parent(draft: &PracticeDialogueDraft) -> Option<Uuid> {
        draft.order.is_none().then_some(draft.script_id)
    }

    fn place(draft: PracticeDialogueDraft, order: u32) -> PracticeDialogueDraft {
        PracticeDialogueDraft {
            order: Some(order),
            ..draft
        }
    }
}

impl ChildEntity for PracticeDialogue {
    fn parent_id(&self) -> Uuid {
        self.script_id
    }

    fn order(&self) -> u32 {
        self.order
    }

    fn set_order(&mut self, order: u32) {
        self.order = order;
    }
}

// === Report ===

/// A post-event report. Its chat log is made of [`ChatMessage`] children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub id: Uuid,

    #[serde(default)]
    pub title: String,

    pub event_date: DateTime<Utc>,

    #[serde(default)]
    pub event_name: String,

    #[serde(default)]
    pub location: String,

    /// 1-5
    #[serde(default = "default_rating")]
    pub rating: u8,

    #[serde(default)]
    pub notes: String,

    pub created_at: DateTime<Utc>,
}

fn default_rating() -> u8 {
    MAX_RATING as u8
}

/// Initial fields for a new [`Report`].
#[derive(Debug, Clone, Default)]
pub struct ReportDraft {
    pub title: Option<String>,
    pub event_date: Option<DateTime<Utc>>,
    pub event_name: Option<String>,
    pub location: Option<String>,
    pub rating: Option<i64>,
    pub notes: Option<String>,
}

/// Partial update for a [`Report`].
#[derive(Debug, Clone, Default)]
pub struct ReportPatch {
    pub title: Option<String>,
    pub event_date: Option<DateTime<Utc>>,
    pub event_name: Option<String>,
    pub location: Option<String>,
    pub rating: Option<i64>,
    pub notes: Option<String>,
}

impl Entity for Report {
    const KIND: EntityKind = EntityKind::Report;
    type Draft = ReportDraft;
    type Patch = ReportPatch;

    fn id(&self) -> Uuid {
        self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn from_draft(id: Uuid, now: DateTime<Utc>, draft: ReportDraft) -> Result<Self> {
        let rating = match draft.rating {
            Some(rating) => validate_rating(rating)?,
            None => default_rating(),
        };
        Ok(Self {
            id,
            title: draft.title.unwrap_or_default(),
            event_date: draft.event_date.unwrap_or(now),
            event_name: draft.event_name.unwrap_or_default(),
            location: draft.location.unwrap_or_default(),
            rating,
            notes: draft.notes.unwrap_or_default(),
            created_at: now,
        })
    }

    fn apply_patch(&mut self, patch: ReportPatch) -> Result<()> {
        let rating = patch.rating.map(validate_rating).transpose()?;

        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(event_date) = patch.event_date {
            self.event_date = event_date;
        }
        if let Some(event_name) = patch.event_name {
            self.event_name = event_name;
        }
        if let Some(location) = patch.location {
            self.location = location;
        }
        if let Some(rating) = rating {
            self.rating = rating;
        }
        if let Some(notes) = patch.notes {
            self.notes = notes;
        }
        Ok(())
    }
}

// === ChatMessage ===

/// One message in a [`Report`]'s chat log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,

    /// Owning report
    pub report_id: Uuid,

    #[serde(default)]
    pub content: String,

    #[serde(default)]
    pub sender: Speaker,

    /// Position within the report
    #[serde(default)]
    pub order: u32,

    /// When the exchange happened
    pub timestamp: DateTime<Utc>,

    pub created_at: DateTime<Utc>,
}

/// Initial fields for a new [`ChatMessage`].
#[derive(Debug, Clone)]
pub struct ChatMessageDraft {
    pub report_id: Uuid,
    pub content: Option<String>,
    pub sender: Option<Speaker>,
    pub order: Option<u32>,
    pub timestamp: Option<DateTime<Utc>>,
}

impl ChatMessageDraft {
    pub fn new(report_id: Uuid, sender: Speaker, content: impl Into<String>) -> Self {
        Self {
            report_id,
            content: Some(content.into()),
            sender: Some(sender),
            order: None,
            timestamp: None,
        }
    }
}

/// Partial update for a [`ChatMessage`].
#[derive(Debug, Clone, Default)]
pub struct ChatMessagePatch {
    pub content: Option<String>,
    pub sender: Option<Speaker>,
    pub timestamp: Option<DateTime<Utc>>,
}

impl Entity for ChatMessage {
    const KIND: EntityKind = EntityKind::ChatMessage;
    type Draft = ChatMessageDraft;
    type Patch = ChatMessagePatch;

    fn id(&self) -> Uuid {
        self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn from_draft(id: Uuid, now: DateTime<Utc>, draft: ChatMessageDraft) -> Result<Self> {
        Ok(Self {
            id,
            report_id: draft.report_id,
            content: draft.content.unwrap_or_default(),
            sender: draft.sender.unwrap_or_default(),
            order: draft.order.unwrap_or(0),
            timestamp: draft.timestamp.unwrap_or(now),
            created_at: now,
        })
    }

    fn apply_patch(&mut self, patch: ChatMessagePatch) -> Result<()> {
        if let Some(content) = patch.content {
            self.content = content;
        }
        if let Some(sender) = patch.sender {
            self.sender = sender;
        }
        if let Some(timestamp) = patch.timestamp {
            self.timestamp = timestamp;
        }
        Ok(())
    }

    fn parent_link(&self) -> Option<(Uuid, u32)> {
        Some((self.report_id, self.order))
    }

    fn unplaced_parent(draft: &ChatMessageDraft) -> Option<Uuid> {
        draft.order.is_none().then_some(draft.report_id)
    }

    fn place(draft: ChatMessageDraft, order: u32) -> ChatMessageDraft {
        ChatMessageDraft {
            order: Some(order),
            ..draft
        }
    }
}

impl ChildEntity for ChatMessage {
    fn parent_id(&self) -> Uuid {
        self.report_id
    }

    fn order(&self) -> u32 {
        self.order
    }

    fn set_order(&mut self, order: u32) {
        self.order = order;
    }
}

// === UiSettings ===

/// Narration rate bounds.
pub const NARRATION_RATE_RANGE: (f32, f32) = (0.0, 1.0);
/// Narration pitch bounds.
pub const NARRATION_PITCH_RANGE: (f32, f32) = (0.5, 2.0);
/// Narration volume bounds.
pub const NARRATION_VOLUME_RANGE: (f32, f32) = (0.0, 1.0);

/// Display and narration preferences. The store keeps a single row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UiSettings {
    pub id: Uuid,

    /// Theme identifier
    #[serde(default = "default_theme")]
    pub theme: String,

    #[serde(default = "default_rate")]
    pub narration_rate: f32,

    #[serde(default = "default_unit")]
    pub narration_pitch: f32,

    #[serde(default = "default_unit")]
    pub narration_volume: f32,

    #[serde(default = "default_true")]
    pub animations_enabled: bool,

    pub created_at: DateTime<Utc>,
}

fn default_theme() -> String {
    "default".to_string()
}

fn default_rate() -> f32 {
    0.5
}

fn default_unit() -> f32 {
    1.0
}

fn default_true() -> bool {
    true
}

/// Initial fields for [`UiSettings`].
#[derive(Debug, Clone, Default)]
pub struct UiSettingsDraft {
    pub theme: Option<String>,
    pub narration_rate: Option<f32>,
    pub narration_pitch: Option<f32>,
    pub narration_volume: Option<f32>,
    pub animations_enabled: Option<bool>,
}

/// Partial update for [`UiSettings`].
#[derive(Debug, Clone, Default)]
pub struct UiSettingsPatch {
    pub theme: Option<String>,
    pub narration_rate: Option<f32>,
    pub narration_pitch: Option<f32>,
    pub narration_volume: Option<f32>,
    pub animations_enabled: Option<bool>,
}

fn validate_narration(
    rate: Option<f32>,
    pitch: Option<f32>,
    volume: Option<f32>,
) -> Result<(Option<f32>, Option<f32>, Option<f32>)> {
    let (rate_min, rate_max) = NARRATION_RATE_RANGE;
    let (pitch_min, pitch_max) = NARRATION_PITCH_RANGE;
    let (volume_min, volume_max) = NARRATION_VOLUME_RANGE;
    Ok((
        rate.map(|v| validate_bounded("narration rate", v, rate_min, rate_max))
            .transpose()?,
        pitch
            .map(|v| validate_bounded("narration pitch", v, pitch_min, pitch_max))
            .transpose()?,
        volume
            .map(|v| validate_bounded("narration volume", v, volume_min, volume_max))
            .transpose()?,
    ))
}

impl Entity for UiSettings {
    const KIND: EntityKind = EntityKind::UiSettings;
    type Draft = UiSettingsDraft;
    type Patch = UiSettingsPatch;

    fn id(&self) -> Uuid {
        self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn from_draft(id: Uuid, now: DateTime<Utc>, draft: UiSettingsDraft) -> Result<Self> {
        let (rate, pitch, volume) =
            validate_narration(draft.narration_rate, draft.narration_pitch, draft.narration_volume)?;
        Ok(Self {
            id,
            theme: draft.theme.unwrap_or_else(default_theme),
            narration_rate: rate.unwrap_or_else(default_rate),
            narration_pitch: pitch.unwrap_or_else(default_unit),
            narration_volume: volume.unwrap_or_else(default_unit),
            animations_enabled: draft.animations_enabled.unwrap_or(true),
            created_at: now,
        })
    }

    fn apply_patch(&mut self, patch: UiSettingsPatch) -> Result<()> {
        let (rate, pitch, volume) =
            validate_narration(patch.narration_rate, patch.narration_pitch, patch.narration_volume)?;

        if let Some(theme) = patch.theme {
            self.theme = theme;
        }
        if let Some(rate) = rate {
            self.narration_rate = rate;
        }
        if let Some(pitch) = pitch {
            self.narration_pitch = pitch;
        }
        if let Some(volume) = volume {
            self.narration_volume = volume;
        }
        if let Some(enabled) = patch.animations_enabled {
            self.animations_enabled = enabled;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    #[test]
    fn test_schedule_defaults() {
        let at = now();
        let schedule = Schedule::from_draft(Uuid::new_v4(), at, ScheduleDraft::default()).unwrap();
        assert_eq!(schedule.title, "");
        assert_eq!(schedule.category, EventCategory::Live);
        assert!(!schedule.is_completed);
        assert_eq!(schedule.event_date, at);
        assert_eq!(schedule.created_at, at);
        assert!(schedule.image_path.is_none());
    }

    #[test]
    fn test_expense_defaults() {
        let expense = Expense::from_draft(Uuid::new_v4(), now(), ExpenseDraft::default()).unwrap();
        assert_eq!(expense.amount, 0);
        assert_eq!(expense.category, ExpenseCategory::Ticket);
        assert_eq!(expense.payment_method, PaymentMethod::Cash);
        assert!(!expense.is_paid);
    }

    #[test]
    fn test_expense_rejects_negative_amount() {
        let draft = ExpenseDraft {
            amount: Some(-1),
            ..Default::default()
        };
        let err = Expense::from_draft(Uuid::new_v4(), now(), draft).unwrap_err();
        assert!(matches!(err, Error::InvalidFieldValue(_)));
    }

    #[test]
    fn test_expense_rejected_patch_changes_nothing() {
        let mut expense = Expense::from_draft(Uuid::new_v4(), now(), ExpenseDraft::default()).unwrap();
        let before = expense.clone();
        let patch = ExpensePatch {
            title: Some("Ticket".to_string()),
            amount: Some(-500),
            ..Default::default()
        };
        assert!(expense.apply_patch(patch).is_err());
        assert_eq!(expense, before);
    }

    #[test]
    fn test_practice_script_defaults() {
        let script =
            PracticeScript::from_draft(Uuid::new_v4(), now(), PracticeScriptDraft::default())
                .unwrap();
        assert_eq!(script.practice_count, 0);
        assert!(!script.is_favorite);
        assert!(script.last_practiced_at.is_none());
        assert_eq!(script.event_type, PracticeEventType::MeetAndGreet);
    }

    #[test]
    fn test_report_rating_bounds() {
        let report = Report::from_draft(Uuid::new_v4(), now(), ReportDraft::default()).unwrap();
        assert_eq!(report.rating, 5);

        for bad in [0, 6, -3] {
            let draft = ReportDraft {
                rating: Some(bad),
                ..Default::default()
            };
            assert!(Report::from_draft(Uuid::new_v4(), now(), draft).is_err());
        }

        let draft = ReportDraft {
            rating: Some(1),
            ..Default::default()
        };
        assert_eq!(Report::from_draft(Uuid::new_v4(), now(), draft).unwrap().rating, 1);
    }

    #[test]
    fn test_chat_message_defaults_to_self_sender() {
        let draft = ChatMessageDraft {
            report_id: Uuid::new_v4(),
            content: None,
            sender: None,
            order: None,
            timestamp: None,
        };
        let message = ChatMessage::from_draft(Uuid::new_v4(), now(), draft).unwrap();
        assert_eq!(message.sender, Speaker::User);
        assert_eq!(message.timestamp, message.created_at);
    }

    #[test]
    fn test_ui_settings_defaults_and_bounds() {
        let settings = UiSettings::from_draft(Uuid::new_v4(), now(), UiSettingsDraft::default()).unwrap();
        assert_eq!(settings.theme, "default");
        assert_eq!(settings.narration_rate, 0.5);
        assert_eq!(settings.narration_pitch, 1.0);
        assert_eq!(settings.narration_volume, 1.0);
        assert!(settings.animations_enabled);

        let mut settings = settings;
        let patch = UiSettingsPatch {
            narration_pitch: Some(3.0),
            ..Default::default()
        };
        assert!(matches!(
            settings.apply_patch(patch),
            Err(Error::InvalidFieldValue(_))
        ));
        assert_eq!(settings.narration_pitch, 1.0);
    }

    #[test]
    fn test_unknown_enum_values_fall_back_on_read() {
        let json = format!(
            r#"{{"id":"{}","title":"x","event_date":"2026-01-01T00:00:00Z","category":"karaoke","created_at":"2026-01-01T00:00:00Z"}}"#,
            Uuid::new_v4()
        );
        let schedule: Schedule = serde_json::from_str(&json).unwrap();
        assert_eq!(schedule.category, EventCategory::Other);
        assert_eq!(schedule.location, "");
    }

    #[test]
    fn test_entity_kind_parents() {
        assert_eq!(
            EntityKind::PracticeDialogue.parent(),
            Some(EntityKind::PracticeScript)
        );
        assert_eq!(EntityKind::ChatMessage.parent(), Some(EntityKind::Report));
        assert_eq!(EntityKind::Schedule.parent(), None);
    }
}
