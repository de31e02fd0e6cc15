//! Schedule commands.

use super::{Deleted, Output, Toggled, format_local, json, open_store, resolve_id, short_id};
use crate::aggregate;
use crate::models::{EventCategory, Schedule, ScheduleDraft, SchedulePatch};
use crate::storage::ImageStore;
use crate::{Error, Result};
use chrono::{Datelike, Local, NaiveDate};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Serialize)]
#[serde(transparent)]
pub struct ScheduleRecord {
    pub schedule: Schedule,
}

impl Output for ScheduleRecord {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let s = &self.schedule;
        let mut lines = vec![
            format!(
                "{} {}{}",
                short_id(&s.id),
                s.title,
                if s.is_completed { " [done]" } else { "" }
            ),
            format!("  When:     {}", format_local(&s.event_date)),
            format!("  Category: {}", s.category),
        ];
        if !s.location.is_empty() {
            lines.push(format!("  Where:    {}", s.location));
        }
        if let Some(deadline) = &s.ticket_deadline {
            lines.push(format!("  Tickets by: {}", format_local(deadline)));
        }
        if let Some(deadline) = &s.payment_deadline {
            lines.push(format!("  Pay by:     {}", format_local(deadline)));
        }
        if !s.description.is_empty() {
            lines.push(format!("  {}", s.description));
        }
        if !s.notes.is_empty() {
            lines.push(format!("  Notes: {}", s.notes));
        }
        if let Some(image) = &s.image_path {
            lines.push(format!("  Image: {}", image));
        }
        lines.join("\n")
    }
}

#[derive(Serialize)]
pub struct ScheduleList {
    pub schedules: Vec<Schedule>,
    pub count: usize,
}

impl ScheduleList {
    fn new(schedules: Vec<Schedule>) -> Self {
        let count = schedules.len();
        Self { schedules, count }
    }
}

impl Output for ScheduleList {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        if self.schedules.is_empty() {
            return "No events.".to_string();
        }
        let mut lines = vec![format!("{} event(s):", self.count)];
        for s in &self.schedules {
            lines.push(format!(
                "  {} {} {} [{}]{}",
                short_id(&s.id),
                format_local(&s.event_date),
                s.title,
                s.category,
                if s.is_completed { " (done)" } else { "" }
            ));
        }
        lines.join("\n")
    }
}

#[derive(Serialize)]
pub struct DaySchedules {
    pub date: NaiveDate,
    pub count: usize,
    pub schedules: Vec<Schedule>,
}

impl Output for DaySchedules {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        if self.schedules.is_empty() {
            return format!("No events on {}.", self.date);
        }
        let mut lines = vec![format!("{} event(s) on {}:", self.count, self.date)];
        for s in &self.schedules {
            lines.push(format!(
                "  {} {} {}",
                short_id(&s.id),
                s.event_date.with_timezone(&Local).format("%H:%M"),
                s.title
            ));
        }
        lines.join("\n")
    }
}

#[derive(Serialize)]
pub struct Calendar {
    pub year: i32,
    pub month: u32,
    /// Day of month to number of events; days without events are absent
    pub days: BTreeMap<u32, usize>,
}

impl Output for Calendar {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let Some(first) = NaiveDate::from_ymd_opt(self.year, self.month, 1) else {
            return String::new();
        };
        let mut out = format!("{}\nMo Tu We Th Fr Sa Su\n", first.format("%B %Y"));
        let offset = first.weekday().num_days_from_monday() as usize;
        out.push_str(&"   ".repeat(offset));

        let mut column = offset;
        let mut day = first;
        while day.month() == self.month {
            let cell = match self.days.get(&day.day()) {
                Some(_) => format!("{:>2}*", day.day()),
                None => format!("{:>2} ", day.day()),
            };
            out.push_str(&cell);
            column += 1;
            if column % 7 == 0 {
                out.push('\n');
            }
            match day.succ_opt() {
                Some(next) => day = next,
                None => break,
            }
        }
        let total: usize = self.days.values().sum();
        out.push_str(&format!("\n{} event(s), * marks a day with events", total));
        out
    }
}

#[derive(Serialize)]
pub struct ImageAttached {
    pub id: uuid::Uuid,
    pub image_path: String,
}

impl Output for ImageAttached {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        format!("Attached {} to {}", self.image_path, self.id)
    }
}

pub fn schedule_add(data_dir: &Path, draft: ScheduleDraft) -> Result<ScheduleRecord> {
    let mut store = open_store(data_dir)?;
    let schedule = store.create::<Schedule>(draft)?;
    Ok(ScheduleRecord { schedule })
}

/// List events by date. `completed` filters on done state when given.
pub fn schedule_list(
    data_dir: &Path,
    category: Option<EventCategory>,
    month: Option<(i32, u32)>,
    completed: Option<bool>,
) -> Result<ScheduleList> {
    let store = open_store(data_dir)?;
    let filter = |s: &Schedule| {
        category.is_none_or(|c| s.category == c)
            && completed.is_none_or(|done| s.is_completed == done)
            && month.is_none_or(|(year, month)| {
                let local = s.event_date.with_timezone(&Local);
                local.year() == year && local.month() == month
            })
    };
    let by_date = |a: &Schedule, b: &Schedule| a.event_date.cmp(&b.event_date);
    let schedules = store.query::<Schedule>(Some(&filter), Some(&by_date))?;
    Ok(ScheduleList::new(schedules))
}

pub fn schedule_show(data_dir: &Path, id: &str) -> Result<ScheduleRecord> {
    let store = open_store(data_dir)?;
    let id = resolve_id::<Schedule>(&store, id)?;
    Ok(ScheduleRecord {
        schedule: store.get(id)?,
    })
}

pub fn schedule_update(data_dir: &Path, id: &str, patch: SchedulePatch) -> Result<ScheduleRecord> {
    let mut store = open_store(data_dir)?;
    let id = resolve_id::<Schedule>(&store, id)?;
    Ok(ScheduleRecord {
        schedule: store.update(id, patch)?,
    })
}

pub fn schedule_done(data_dir: &Path, id: &str) -> Result<Toggled> {
    let mut store = open_store(data_dir)?;
    let id = resolve_id::<Schedule>(&store, id)?;
    let value = store.relations().toggle_completed(id)?;
    Ok(Toggled {
        id,
        field: "is_completed",
        value,
    })
}

/// Delete an event and the image file it references.
pub fn schedule_delete(data_dir: &Path, id: &str) -> Result<Deleted> {
    let mut store = open_store(data_dir)?;
    let id = resolve_id::<Schedule>(&store, id)?;
    let images = ImageStore::new(data_dir);
    store.relations().delete_schedule(id, Some(&images))?;
    Ok(Deleted {
        id,
        kind: "schedule".to_string(),
        children_deleted: None,
    })
}

pub fn schedule_upcoming(data_dir: &Path, limit: Option<usize>) -> Result<ScheduleList> {
    let store = open_store(data_dir)?;
    let schedules = store.list::<Schedule>()?;
    let upcoming = aggregate::upcoming(&schedules, &Local::now())
        .into_iter()
        .take(limit.unwrap_or(usize::MAX))
        .cloned()
        .collect();
    Ok(ScheduleList::new(upcoming))
}

pub fn schedule_day(data_dir: &Path, date: Option<NaiveDate>) -> Result<DaySchedules> {
    let store = open_store(data_dir)?;
    let date = date.unwrap_or_else(|| Local::now().date_naive());
    let schedules = store.list::<Schedule>()?;
    let mut on_day: Vec<Schedule> = aggregate::schedules_on(&schedules, date, &Local)
        .into_iter()
        .cloned()
        .collect();
    on_day.sort_by_key(|s| s.event_date);
    Ok(DaySchedules {
        date,
        count: on_day.len(),
        schedules: on_day,
    })
}

pub fn schedule_calendar(data_dir: &Path, year: i32, month: u32) -> Result<Calendar> {
    let store = open_store(data_dir)?;
    let schedules = store.list::<Schedule>()?;
    Ok(Calendar {
        year,
        month,
        days: aggregate::month_occupancy(&schedules, year, month, &Local),
    })
}

/// Copy an image file into the data directory and attach it to an event.
pub fn schedule_attach(data_dir: &Path, id: &str, image: &Path) -> Result<ImageAttached> {
    let store = open_store(data_dir)?;
    let id = resolve_id::<Schedule>(&store, id)?;
    let bytes = std::fs::read(image).map_err(|e| {
        Error::InvalidFieldValue(format!("Cannot read image {}: {}", image.display(), e))
    })?;

    let images = ImageStore::new(data_dir);
    let upload = images.save_for_schedule(store.into_shared(), id, bytes);
    let image_path = upload.wait()?;
    Ok(ImageAttached { id, image_path })
}
