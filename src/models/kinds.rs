//! Enumerated field types.
//!
//! Parsing user input (`FromStr`) is strict and rejects unknown names.
//! Reading persisted values is lenient: an unknown stored string resolves to
//! the enum's fallback variant instead of failing the whole record.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of event on the schedule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventCategory {
    #[default]
    Live,
    MeetAndGreet,
    Release,
    Festival,
    FanMeeting,
    Other,
}

impl EventCategory {
    pub const ALL: [EventCategory; 6] = [
        EventCategory::Live,
        EventCategory::MeetAndGreet,
        EventCategory::Release,
        EventCategory::Festival,
        EventCategory::FanMeeting,
        EventCategory::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventCategory::Live => "live",
            EventCategory::MeetAndGreet => "meet_and_greet",
            EventCategory::Release => "release",
            EventCategory::Festival => "festival",
            EventCategory::FanMeeting => "fan_meeting",
            EventCategory::Other => "other",
        }
    }
}

impl fmt::Display for EventCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for EventCategory {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        lookup(&Self::ALL, s, Self::as_str, "event category")
    }
}

impl From<String> for EventCategory {
    fn from(s: String) -> Self {
        s.parse().unwrap_or(EventCategory::Other)
    }
}

impl From<EventCategory> for String {
    fn from(value: EventCategory) -> Self {
        value.as_str().to_string()
    }
}

/// What an expense was spent on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ExpenseCategory {
    #[default]
    Ticket,
    Transportation,
    Accommodation,
    Goods,
    Food,
    Gift,
    Other,
}

impl ExpenseCategory {
    pub const ALL: [ExpenseCategory; 7] = [
        ExpenseCategory::Ticket,
        ExpenseCategory::Transportation,
        ExpenseCategory::Accommodation,
        ExpenseCategory::Goods,
        ExpenseCategory::Food,
        ExpenseCategory::Gift,
        ExpenseCategory::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExpenseCategory::Ticket => "ticket",
            ExpenseCategory::Transportation => "transportation",
            ExpenseCategory::Accommodation => "accommodation",
            ExpenseCategory::Goods => "goods",
            ExpenseCategory::Food => "food",
            ExpenseCategory::Gift => "gift",
            ExpenseCategory::Other => "other",
        }
    }
}

impl fmt::Display for ExpenseCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ExpenseCategory {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        lookup(&Self::ALL, s, Self::as_str, "expense category")
    }
}

impl From<String> for ExpenseCategory {
    fn from(s: String) -> Self {
        s.parse().unwrap_or(ExpenseCategory::Other)
    }
}

impl From<ExpenseCategory> for String {
    fn from(value: ExpenseCategory) -> Self {
        value.as_str().to_string()
    }
}

/// How an expense was paid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PaymentMethod {
    #[default]
    Cash,
    CreditCard,
    ElectronicMoney,
    BankTransfer,
    Other,
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 5] = [
        PaymentMethod::Cash,
        PaymentMethod::CreditCard,
        PaymentMethod::ElectronicMoney,
        PaymentMethod::BankTransfer,
        PaymentMethod::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::CreditCard => "credit_card",
            PaymentMethod::ElectronicMoney => "electronic_money",
            PaymentMethod::BankTransfer => "bank_transfer",
            PaymentMethod::Other => "other",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        lookup(&Self::ALL, s, Self::as_str, "payment method")
    }
}

impl From<String> for PaymentMethod {
    fn from(s: String) -> Self {
        s.parse().unwrap_or(PaymentMethod::Other)
    }
}

impl From<PaymentMethod> for String {
    fn from(value: PaymentMethod) -> Self {
        value.as_str().to_string()
    }
}

/// Kind of event a script rehearses for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PracticeEventType {
    #[default]
    MeetAndGreet,
    Handshake,
    PhotoSession,
    Signing,
    TalkEvent,
    Other,
}

impl PracticeEventType {
    pub const ALL: [PracticeEventType; 6] = [
        PracticeEventType::MeetAndGreet,
        PracticeEventType::Handshake,
        PracticeEventType::PhotoSession,
        PracticeEventType::Signing,
        PracticeEventType::TalkEvent,
        PracticeEventType::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PracticeEventType::MeetAndGreet => "meet_and_greet",
            PracticeEventType::Handshake => "handshake",
            PracticeEventType::PhotoSession => "photo_session",
            PracticeEventType::Signing => "signing",
            PracticeEventType::TalkEvent => "talk_event",
            PracticeEventType::Other => "other",
        }
    }
}

impl fmt::Display for PracticeEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PracticeEventType {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        lookup(&Self::ALL, s, Self::as_str, "event type")
    }
}

impl From<String> for PracticeEventType {
    fn from(s: String) -> Self {
        s.parse().unwrap_or(PracticeEventType::Other)
    }
}

impl From<PracticeEventType> for String {
    fn from(value: PracticeEventType) -> Self {
        value.as_str().to_string()
    }
}

/// Who says a dialogue line or sent a chat message.
///
/// `User` is the person using the app ("self"); `Counterpart` is the person
/// they are rehearsing for or reporting about.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Speaker {
    #[default]
    User,
    Counterpart,
}

impl Speaker {
    pub fn as_str(&self) -> &'static str {
        match self {
            Speaker::User => "self",
            Speaker::Counterpart => "counterpart",
        }
    }

    pub fn is_user(&self) -> bool {
        matches!(self, Speaker::User)
    }
}

impl fmt::Display for Speaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Speaker {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "self" | "user" | "me" => Ok(Speaker::User),
            "counterpart" | "them" | "oshi" => Ok(Speaker::Counterpart),
            _ => Err(crate::Error::InvalidFieldValue(format!(
                "Invalid speaker: '{}'. Expected 'self' or 'counterpart'.",
                s
            ))),
        }
    }
}

impl From<String> for Speaker {
    fn from(s: String) -> Self {
        s.parse().unwrap_or_default()
    }
}

impl From<Speaker> for String {
    fn from(value: Speaker) -> Self {
        value.as_str().to_string()
    }
}

/// Case-insensitive lookup accepting `snake_case`, `kebab-case` and spaced names.
fn lookup<T: Copy>(
    all: &[T],
    input: &str,
    name: impl Fn(&T) -> &'static str,
    what: &str,
) -> crate::Result<T> {
    let normalized = input.trim().to_lowercase().replace(['-', ' '], "_");
    all.iter()
        .find(|v| name(*v) == normalized)
        .copied()
        .ok_or_else(|| {
            let expected: Vec<&str> = all.iter().map(|v| name(v)).collect();
            crate::Error::InvalidFieldValue(format!(
                "Invalid {}: '{}'. Expected one of: {}",
                what,
                input,
                expected.join(", ")
            ))
        })
}
