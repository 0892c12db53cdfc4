//! [`ActivitySource`] over one or more ClickUp lists.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use super::client::{ClickUpClient, DEFAULT_MAX_WORKERS};
use super::convert::{self, OpenRollUpCompletion, SOURCE_NAME};
use super::error::{ClickUpError, short_error_message};
use super::fan_out::fetch_many;
use super::types::{ClickUpTask, ListRef};
use crate::report::{ActivitySource, SourceError, Task, TimeWindow};
use crate::rewrite::{PassThrough, TextRewriter};

/// Category appended to roll-up titles unless configured otherwise.
pub const DEFAULT_CATEGORY: &str = "Improvements/Issues/New Development/Urgent Support/Fixes";

/// Settings for per-list roll-ups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollUpOptions {
    /// Appended to the list name in the title; empty for none.
    pub category: String,
    pub open_completion: OpenRollUpCompletion,
}

impl Default for RollUpOptions {
    fn default() -> Self {
        Self {
            category: DEFAULT_CATEGORY.to_string(),
            open_completion: OpenRollUpCompletion::default(),
        }
    }
}

/// How fetched records become tasks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceMode {
    /// One task per record.
    PerRecord,
    /// One project task per list.
    RollUp(RollUpOptions),
}

impl Default for SourceMode {
    fn default() -> Self {
        SourceMode::RollUp(RollUpOptions::default())
    }
}

/// ClickUp as an activity source.
///
/// ```ignore
/// use devreport::clickup::{ClickUpClient, ClickUpSource, FetchOptions, ListRef, SourceMode};
///
/// let client = ClickUpClient::new(&token, Vec::new(), &FetchOptions::default())?;
/// let source = ClickUpSource::new(client, vec![ListRef::new("901")])
///     .with_mode(SourceMode::PerRecord);
/// ```
#[derive(Clone)]
pub struct ClickUpSource {
    client: ClickUpClient,
    lists: Vec<ListRef>,
    mode: SourceMode,
    max_workers: usize,
    rewriter: Arc<dyn TextRewriter>,
}

impl ClickUpSource {
    pub fn new(client: ClickUpClient, lists: Vec<ListRef>) -> Self {
        Self {
            client,
            lists,
            mode: SourceMode::default(),
            max_workers: DEFAULT_MAX_WORKERS,
            rewriter: Arc::new(PassThrough),
        }
    }

    /// Build a source over every list in `folder_id`.
    pub async fn from_folder(client: ClickUpClient, folder_id: &str) -> Result<Self, ClickUpError> {
        let lists = client.list_folder_lists(folder_id).await?;
        Ok(Self::new(client, lists))
    }

    #[must_use]
    pub fn with_mode(mut self, mode: SourceMode) -> Self {
        self.mode = mode;
        self
    }

    #[must_use]
    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers;
        self
    }

    #[must_use]
    pub fn with_rewriter(mut self, rewriter: Arc<dyn TextRewriter>) -> Self {
        self.rewriter = rewriter;
        self
    }

    pub fn lists(&self) -> &[ListRef] {
        &self.lists
    }

    fn known_names(&self) -> HashMap<&str, &str> {
        self.lists
            .iter()
            .filter_map(|l| l.name.as_deref().map(|n| (l.id.as_str(), n)))
            .collect()
    }

    fn per_record(&self, records: &[ClickUpTask]) -> Vec<Task> {
        let names = self.known_names();
        records
            .iter()
            .map(|r| {
                let name = names
                    .get(r.list.id.as_str())
                    .copied()
                    .unwrap_or(r.list.name.as_str());
                convert::to_task(r, name)
            })
            .collect()
    }

    async fn roll_ups(
        &self,
        records: Vec<ClickUpTask>,
        window: TimeWindow,
        options: &RollUpOptions,
    ) -> Vec<Task> {
        let mut groups: BTreeMap<String, Vec<ClickUpTask>> = BTreeMap::new();
        for record in records {
            groups.entry(record.list.id.clone()).or_default().push(record);
        }

        let names = self.known_names();
        let now = Utc::now();
        let mut tasks = Vec::with_capacity(groups.len());

        for (list_id, group) in groups {
            let name = match names.get(list_id.as_str()) {
                Some(name) => (*name).to_string(),
                None => self.resolve_name(&list_id, &group).await,
            };

            let achievements = self.rewriter.rewrite_lines(convert::bullets(&group)).await;
            tasks.push(convert::roll_up(
                &list_id,
                convert::roll_up_title(&name, &options.category),
                &group,
                &achievements,
                window,
                options.open_completion,
                now,
            ));
        }

        tasks
    }

    /// Look up a list's name, falling back to the name embedded in its records.
    async fn resolve_name(&self, list_id: &str, group: &[ClickUpTask]) -> String {
        match self.client.fetch_list_details(list_id).await {
            Ok(details) => details.name,
            Err(e) => {
                tracing::warn!(
                    list_id,
                    error = %e,
                    "Could not fetch list details, using embedded name"
                );
                group
                    .first()
                    .map(|r| r.list.name.clone())
                    .filter(|n| !n.is_empty())
                    .unwrap_or_else(|| list_id.to_string())
            }
        }
    }
}

#[async_trait]
impl ActivitySource for ClickUpSource {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    async fn health_check(&self) -> Result<(), SourceError> {
        self.client.health_check().await.map_err(SourceError::from)
    }

    #[tracing::instrument(skip(self, window), fields(lists = self.lists.len()))]
    async fn fetch_tasks(&self, user: &str, window: TimeWindow) -> Result<Vec<Task>, SourceError> {
        let mut seen = HashSet::new();
        let list_ids: Vec<String> = self
            .lists
            .iter()
            .filter(|l| seen.insert(l.id.as_str()))
            .map(|l| l.id.clone())
            .collect();
        let fetched = fetch_many(&self.client, &list_ids, window, self.max_workers).await;

        if fetched.is_partial() {
            for (list_id, e) in &fetched.failures {
                tracing::warn!(list_id = %list_id, error = %e, "Skipping failed list");
            }
        }

        if !list_ids.is_empty() && fetched.failures.len() == list_ids.len() {
            if fetched.failures.values().all(ClickUpError::is_cancelled) {
                return Err(SourceError::Cancelled);
            }
            return Err(SourceError::Fetch {
                failures: fetched
                    .failures
                    .iter()
                    .map(|(id, e)| (id.clone(), short_error_message(e)))
                    .collect(),
            });
        }

        let tasks = match &self.mode {
            SourceMode::PerRecord => self.per_record(&fetched.records),
            SourceMode::RollUp(options) => self.roll_ups(fetched.records, window, options).await,
        };

        tracing::info!(count = tasks.len(), "Normalized ClickUp tasks");
        Ok(tasks)
    }
}
