//! Conversion from ClickUp records to report tasks.

use chrono::{DateTime, Utc};

use super::types::{Assignee, ClickUpTask};
use crate::report::{Task, TaskKind, TimeWindow};

/// Source name used for roll-up tasks.
pub const SOURCE_NAME: &str = "ClickUp";

/// Status given to a roll-up whose records are all closed.
pub const STATUS_COMPLETED: &str = "completed";

/// Status given to a roll-up with at least one open record.
pub const STATUS_IN_PROGRESS: &str = "in progress";

/// What `completed_at` holds for a roll-up that still has open records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OpenRollUpCompletion {
    /// The time the roll-up was built.
    #[default]
    Now,
    /// Left empty.
    Unset,
}

/// Parse a Unix-millisecond string.
pub fn parse_millis(value: Option<&str>) -> Option<DateTime<Utc>> {
    value
        .and_then(|s| s.trim().parse::<i64>().ok())
        .and_then(DateTime::from_timestamp_millis)
}

/// Comma-joined usernames, falling back to the numeric ID.
pub fn assignee_names(assignees: &[Assignee]) -> String {
    assignees
        .iter()
        .map(|a| match a.username.as_deref() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => a.id.to_string(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn created_at(record: &ClickUpTask) -> Option<DateTime<Utc>> {
    parse_millis(record.date_created.as_deref())
}

fn updated_at(record: &ClickUpTask) -> Option<DateTime<Utc>> {
    parse_millis(record.date_updated.as_deref()).or_else(|| created_at(record))
}

/// Closed records with an unreadable close date fall back to their last update.
fn closed_at(record: &ClickUpTask) -> Option<DateTime<Utc>> {
    let raw = record.date_closed.as_deref()?;
    Some(
        parse_millis(Some(raw))
            .or_else(|| updated_at(record))
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH),
    )
}

/// One task per record, labelled with its list's display name.
pub fn to_task(record: &ClickUpTask, list_name: &str) -> Task {
    let created = created_at(record).unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
    let mut task = Task::new(record.id.clone(), record.name.clone(), created);
    task.description = record.description.clone().unwrap_or_default();
    task.status = record.status.status.clone();
    task.url = record.url.clone();
    task.updated_at = updated_at(record).unwrap_or(created);
    task.completed_at = closed_at(record);
    task.source = list_name.to_string();
    task.kind = TaskKind::Task;
    task.assignee = assignee_names(&record.assignees);
    task.labels = vec![list_name.to_string()];
    task
}

/// `• title` for each record, in input order.
pub fn bullets(records: &[ClickUpTask]) -> Vec<String> {
    records.iter().map(|r| format!("• {}", r.name)).collect()
}

/// Title for a roll-up: the list name, optionally followed by a category.
pub fn roll_up_title(list_name: &str, category: &str) -> String {
    if category.is_empty() {
        list_name.to_string()
    } else {
        format!("{list_name} {category}")
    }
}

/// Collapse one list's records into a single project task.
///
/// The roll-up is completed only when every record is closed; its
/// `completed_at` is then the latest close date. Otherwise `open` decides.
pub fn roll_up(
    list_id: &str,
    title: String,
    records: &[ClickUpTask],
    achievements: &[String],
    window: TimeWindow,
    open: OpenRollUpCompletion,
    now: DateTime<Utc>,
) -> Task {
    let created = window
        .start
        .or_else(|| records.iter().filter_map(created_at).min())
        .unwrap_or(now);

    let mut task = Task::new(list_id, title, created);
    task.achievements = achievements.join("\n");
    task.updated_at = records.iter().filter_map(updated_at).max().unwrap_or(created);
    task.source = SOURCE_NAME.to_string();
    task.kind = TaskKind::Project;

    let all_closed = !records.is_empty() && records.iter().all(|r| r.date_closed.is_some());
    if all_closed {
        task.status = STATUS_COMPLETED.to_string();
        task.completed_at = records.iter().filter_map(closed_at).max();
    } else {
        task.status = STATUS_IN_PROGRESS.to_string();
        task.completed_at = match open {
            OpenRollUpCompletion::Now => Some(now),
            OpenRollUpCompletion::Unset => None,
        };
    }

    task
}
