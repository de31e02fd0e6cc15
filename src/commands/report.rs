//! Event report and chat message commands.

use super::{Deleted, Output, format_local, json, open_store, resolve_id, short_id};
use crate::Result;
use crate::models::{ChatMessage, Report, ReportDraft, Speaker};
use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use std::path::Path;

#[derive(Serialize)]
pub struct ReportRecord {
    #[serde(flatten)]
    pub report: Report,
    pub messages: Vec<ChatMessage>,
}

fn stars(rating: u8) -> String {
    "★".repeat(rating as usize) + &"☆".repeat(5usize.saturating_sub(rating as usize))
}

impl Output for ReportRecord {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let r = &self.report;
        let mut lines = vec![
            format!("{} {} {}", short_id(&r.id), r.title, stars(r.rating)),
            format!("  When:  {}", format_local(&r.event_date)),
        ];
        if !r.event_name.is_empty() {
            lines.push(format!("  Event: {}", r.event_name));
        }
        if !r.location.is_empty() {
            lines.push(format!("  Where: {}", r.location));
        }
        if !r.notes.is_empty() {
            lines.push(format!("  {}", r.notes));
        }
        if !self.messages.is_empty() {
            lines.push("  Conversation:".to_string());
        }
        for message in &self.messages {
            let who = if message.sender.is_user() { "me" } else { "them" };
            lines.push(format!(
                "    [{}] {:>4}: {}  ({})",
                message.timestamp.with_timezone(&Local).format("%H:%M"),
                who,
                message.content,
                short_id(&message.id)
            ));
        }
        lines.join("\n")
    }
}

#[derive(Serialize)]
pub struct ReportList {
    pub reports: Vec<Report>,
    pub count: usize,
}

impl Output for ReportList {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        if self.reports.is_empty() {
            return "No reports.".to_string();
        }
        let mut lines = vec![format!("{} report(s):", self.count)];
        for r in &self.reports {
            lines.push(format!(
                "  {} {} {} {}",
                short_id(&r.id),
                r.event_date.with_timezone(&Local).format("%Y-%m-%d"),
                r.title,
                stars(r.rating)
            ));
        }
        lines.join("\n")
    }
}

#[derive(Serialize)]
#[serde(transparent)]
pub struct MessageRecord {
    pub message: ChatMessage,
}

impl Output for MessageRecord {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        format!(
            "Added message {} ({}) as #{}: {}",
            short_id(&self.message.id),
            self.message.sender,
            self.message.order + 1,
            self.message.content
        )
    }
}

pub fn report_add(data_dir: &Path, draft: ReportDraft) -> Result<ReportRecord> {
    let mut store = open_store(data_dir)?;
    let report = store.create::<Report>(draft)?;
    Ok(ReportRecord {
        report,
        messages: Vec::new(),
    })
}

/// List reports, most recent event first.
pub fn report_list(data_dir: &Path) -> Result<ReportList> {
    let store = open_store(data_dir)?;
    let newest_first = |a: &Report, b: &Report| b.event_date.cmp(&a.event_date);
    let reports = store.query::<Report>(None, Some(&newest_first))?;
    Ok(ReportList {
        count: reports.len(),
        reports,
    })
}

pub fn report_show(data_dir: &Path, id: &str) -> Result<ReportRecord> {
    let store = open_store(data_dir)?;
    let id = resolve_id::<Report>(&store, id)?;
    Ok(ReportRecord {
        report: store.get(id)?,
        messages: store.children(id)?,
    })
}

/// Delete a report together with its chat log.
pub fn report_delete(data_dir: &Path, id: &str) -> Result<Deleted> {
    let mut store = open_store(data_dir)?;
    let id = resolve_id::<Report>(&store, id)?;
    store.get::<Report>(id)?;
    let removed = store.relations().delete_report(id)?;
    Ok(Deleted {
        id,
        kind: "report".to_string(),
        children_deleted: Some(removed),
    })
}

pub fn message_add(
    data_dir: &Path,
    report_id: &str,
    sender: Speaker,
    content: &str,
    at: Option<DateTime<Utc>>,
) -> Result<MessageRecord> {
    let mut store = open_store(data_dir)?;
    let report_id = resolve_id::<Report>(&store, report_id)?;
    let message = store
        .relations()
        .add_message(report_id, sender, content, at)?;
    Ok(MessageRecord { message })
}

pub fn message_delete(data_dir: &Path, id: &str) -> Result<Deleted> {
    let mut store = open_store(data_dir)?;
    let id = resolve_id::<ChatMessage>(&store, id)?;
    store.relations().delete_message(id)?;
    Ok(Deleted {
        id,
        kind: "message".to_string(),
        children_deleted: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::commands::{init, parse_datetime};
    use crate::test_utils::TestEnv;

    fn new_report(env: &TestEnv, title: &str, date: &str) -> Report {
        report_add(
            env.data_path(),
            ReportDraft {
                title: Some(title.to_string()),
                event_date: Some(parse_datetime(date).unwrap()),
                rating: Some(4),
                ..Default::default()
            },
        )
        .unwrap()
        .report
    }

    #[test]
    fn test_messages_in_order_and_cascade() {
        let env = TestEnv::new();
        init(env.data_path()).unwrap();
        let report = new_report(&env, "Spring handshake", "2024-04-01");
        let id = report.id.to_string();

        message_add(env.data_path(), &id, Speaker::User, "I came from Osaka!", None).unwrap();
        let reply =
            message_add(env.data_path(), &id, Speaker::Counterpart, "So far, thank you!", None)
                .unwrap();
        assert_eq!(reply.message.order, 1);

        let shown = report_show(env.data_path(), &id).unwrap();
        assert_eq!(shown.messages.len(), 2);
        assert!(shown.to_human().contains("★★★★☆"));

        let deleted = report_delete(env.data_path(), &id).unwrap();
        assert_eq!(deleted.children_deleted, Some(2));
        // Already gone with its report
        message_delete(env.data_path(), &reply.message.id.to_string()).unwrap();
    }

    #[test]
    fn test_invalid_rating_rejected() {
        let env = TestEnv::new();
        init(env.data_path()).unwrap();
        let result = report_add(
            env.data_path(),
            ReportDraft {
                rating: Some(6),
                ..Default::default()
            },
        );
        assert!(matches!(result, Err(Error::InvalidFieldValue(_))));
    }

    #[test]
    fn test_list_newest_first() {
        let env = TestEnv::new();
        init(env.data_path()).unwrap();
        new_report(&env, "Old", "2023-01-01");
        new_report(&env, "New", "2024-01-01");
        let list = report_list(env.data_path()).unwrap();
        assert_eq!(list.reports[0].title, "New");
    }

    #[test]
    fn test_message_on_missing_report() {
        let env = TestEnv::new();
        init(env.data_path()).unwrap();
        let result = message_add(
            env.data_path(),
            &uuid::Uuid::new_v4().to_string(),
            Speaker::User,
            "Hello?",
            None,
        );
        assert!(matches!(result, Err(Error::NotFound(_))));
    }
}
