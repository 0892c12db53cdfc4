use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::SourceError;

/// Coarse classification of a [`Task`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TaskKind {
    /// A single tracked record.
    Task,
    /// A roll-up standing in for an entire list.
    Project,
}

impl TaskKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskKind::Task => "Task",
            TaskKind::Project => "Project",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A normalized, source-agnostic activity record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Identifier, unique within its source.
    pub id: String,
    pub title: String,
    pub description: String,
    /// Free text in the source's own vocabulary.
    pub status: String,
    pub url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Present iff the source considers the task closed.
    pub completed_at: Option<DateTime<Utc>>,
    /// Originating list or service name.
    pub source: String,
    #[serde(rename = "type")]
    pub kind: TaskKind,
    /// Display name(s) of the assignees, comma-joined.
    pub assignee: String,
    pub labels: Vec<String>,
    /// Bullet list summarizing the records behind a roll-up.
    pub achievements: String,
    pub challenges: String,
    pub support_required: String,
    pub support_from: String,
    pub follow_up: String,
}

impl Task {
    /// A task with only identity, title, and timestamps set.
    pub fn new(id: impl Into<String>, title: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            status: String::new(),
            url: String::new(),
            created_at,
            updated_at: created_at,
            completed_at: None,
            source: String::new(),
            kind: TaskKind::Task,
            assignee: String::new(),
            labels: Vec::new(),
            achievements: String::new(),
            challenges: String::new(),
            support_required: String::new(),
            support_from: String::new(),
            follow_up: String::new(),
        }
    }

    #[inline]
    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }
}

/// A reporting window. A missing bound is unbounded on that side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl TimeWindow {
    pub fn new(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        Self { start, end }
    }

    pub fn between(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self::new(Some(start), Some(end))
    }

    /// The whole history.
    pub fn unbounded() -> Self {
        Self::default()
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fmt_bound = |b: Option<DateTime<Utc>>| {
            b.map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| "…".to_string())
        };
        write!(f, "{} -> {}", fmt_bound(self.start), fmt_bound(self.end))
    }
}

/// Summary counts over a set of tasks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Statistics {
    pub total: usize,
    pub completed: usize,
    pub by_source: BTreeMap<String, usize>,
    pub by_status: BTreeMap<String, usize>,
    pub by_type: BTreeMap<String, usize>,
}

/// One configured adapter over a remote service.
///
/// # Example
///
/// ```ignore
/// use devreport::report::{ActivitySource, TimeWindow};
///
/// async fn count<S: ActivitySource>(source: &S) -> usize {
///     source.health_check().await.ok();
///     source.fetch_tasks("alice", TimeWindow::unbounded()).await.map_or(0, |t| t.len())
/// }
/// ```
#[async_trait]
pub trait ActivitySource: Send + Sync {
    /// Name used as the key in aggregate errors and logs.
    fn name(&self) -> &str;

    /// One lightweight authenticated call. Fails with [`SourceError::Unavailable`].
    async fn health_check(&self) -> Result<(), SourceError>;

    /// Fetch and normalize every task in `window`.
    async fn fetch_tasks(&self, user: &str, window: TimeWindow) -> Result<Vec<Task>, SourceError>;
}
