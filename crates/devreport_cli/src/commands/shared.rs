use std::sync::Arc;
use std::time::Duration;

use clap::ValueEnum;
use devreport::clickup::{ClickUpClient, ClickUpSource, ListRef, SourceMode};
use devreport::http::reqwest_transport::ReqwestTransport;
use devreport::{
    ActivitySource, AggregateError, OllamaRewriter, ProgressCallback, Statistics, Task,
    TextRewriter,
};
use tokio_util::sync::CancellationToken;

use crate::config::{Config, split_list};

/// Output format for reports.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub(crate) enum OutputFormat {
    /// Display as a formatted table (default)
    #[default]
    Table,
    /// Display as JSON
    Json,
}

/// ClickUp connection flags shared by every command.
#[derive(Debug, Clone, clap::Args)]
pub(crate) struct ClickUpArgs {
    /// ClickUp API token (default from config)
    #[arg(long = "clickup-token", env = "CLICKUP_API_KEY", hide_env_values = true)]
    pub token: Option<String>,

    /// Comma-separated ClickUp list IDs
    #[arg(long = "clickup-listid", env = "CLICKUP_LISTIDS")]
    pub list_ids: Option<String>,

    /// ClickUp folder ID; fetches every list in the folder
    #[arg(long = "clickup-folderid", env = "CLICKUP_FOLDERID")]
    pub folder_id: Option<String>,

    /// Comma-separated assignee IDs to filter by
    #[arg(long = "clickup-assignees", env = "CLICKUP_ASSIGNEE_IDS")]
    pub assignees: Option<String>,

    /// Maximum lists fetched concurrently (default from config or 5)
    #[arg(short = 'c', long)]
    pub max_workers: Option<usize>,
}

/// Build the ClickUp source from flags layered over config.
pub(crate) async fn build_clickup_source(
    args: &ClickUpArgs,
    config: &Config,
    mode: SourceMode,
    cancel: &CancellationToken,
    progress: Arc<ProgressCallback>,
    rewriter: Option<Arc<dyn TextRewriter>>,
) -> Result<Arc<dyn ActivitySource>, Box<dyn std::error::Error>> {
    let token = args
        .token
        .clone()
        .or_else(|| config.clickup.token.clone())
        .ok_or("No ClickUp token configured. Set CLICKUP_API_KEY or [clickup].token")?;

    let assignee_ids = args
        .assignees
        .as_deref()
        .map(split_list)
        .unwrap_or_else(|| config.clickup.assignee_ids.clone());

    let mut options = config.fetch.options();
    if let Some(workers) = args.max_workers {
        options.max_workers = workers;
    }

    let client = ClickUpClient::new(&token, assignee_ids, &options)?
        .with_base_url(&config.clickup.base_url)
        .with_cancellation(cancel.clone())
        .with_progress(progress);

    let folder_id = args.folder_id.clone().or_else(|| config.clickup.folder_id.clone());
    let source = match folder_id {
        Some(folder_id) => {
            let source = ClickUpSource::from_folder(client, &folder_id).await?;
            tracing::info!(folder_id = %folder_id, lists = source.lists().len(), "Resolved folder");
            source
        }
        None => {
            let ids = args
                .list_ids
                .as_deref()
                .map(split_list)
                .unwrap_or_else(|| config.clickup.list_ids.clone());
            ClickUpSource::new(client, ids.into_iter().map(ListRef::new).collect())
        }
    };

    if source.lists().is_empty() {
        return Err("No ClickUp lists found. Provide --clickup-listid or --clickup-folderid".into());
    }

    let mut source = source
        .with_mode(mode)
        .with_max_workers(options.max_workers);
    if let Some(rewriter) = rewriter {
        source = source.with_rewriter(rewriter);
    }

    Ok(Arc::new(source))
}

/// The Ollama rewriter, when enabled.
pub(crate) fn build_rewriter(
    config: &Config,
    force: bool,
) -> Result<Option<Arc<dyn TextRewriter>>, Box<dyn std::error::Error>> {
    if !(force || config.rewrite.enabled) {
        return Ok(None);
    }
    let options = config.rewrite.options();
    // The rewriter applies its own deadline; this only guards the socket.
    let transport = ReqwestTransport::with_timeout(options.timeout + Duration::from_secs(5))?;
    Ok(Some(Arc::new(OllamaRewriter::new(Arc::new(transport), options))))
}

/// Summary counts for display.
#[derive(Debug, Clone, serde::Serialize, tabled::Tabled)]
pub(crate) struct CountRow {
    #[tabled(rename = "Group")]
    pub group: String,
    #[tabled(rename = "Value")]
    pub value: String,
    #[tabled(rename = "Count")]
    pub count: usize,
}

pub(crate) fn statistics_rows(stats: &Statistics) -> Vec<CountRow> {
    let mut rows = vec![
        CountRow {
            group: "Total".to_string(),
            value: String::new(),
            count: stats.total,
        },
        CountRow {
            group: "Completed".to_string(),
            value: String::new(),
            count: stats.completed,
        },
    ];
    for (group, map) in [
        ("Source", &stats.by_source),
        ("Status", &stats.by_status),
        ("Type", &stats.by_type),
    ] {
        rows.extend(map.iter().map(|(value, count)| CountRow {
            group: group.to_string(),
            value: value.clone(),
            count: *count,
        }));
    }
    rows
}

pub(crate) fn print_table<T: tabled::Tabled>(rows: Vec<T>) {
    let mut table = tabled::Table::new(rows);
    table.with(tabled::settings::Style::rounded());
    println!("{}", table);
}

pub(crate) fn print_json<T: serde::Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub(crate) fn format_date(task_date: Option<chrono::DateTime<chrono::Utc>>) -> String {
    task_date
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// Warn about sources that failed while others succeeded.
pub(crate) fn report_failures(failures: &AggregateError) {
    for (source, err) in failures.iter() {
        eprintln!("⚠ {source}: {err}");
    }
}

pub(crate) fn report_empty(tasks: &[Task]) -> bool {
    if tasks.is_empty() {
        println!("No activities found for this period");
        true
    } else {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn statistics_rows_flatten_groups() {
        let stats = Statistics {
            total: 3,
            completed: 1,
            by_source: BTreeMap::from([("Backend".to_string(), 3)]),
            by_status: BTreeMap::from([("open".to_string(), 2), ("closed".to_string(), 1)]),
            by_type: BTreeMap::from([("Task".to_string(), 3)]),
        };

        let rows = statistics_rows(&stats);
        assert_eq!(rows.len(), 6);
        assert_eq!(rows[0].count, 3);
        assert_eq!(rows[1].count, 1);
        assert_eq!(rows[3].group, "Status");
        assert_eq!(rows[3].value, "closed");
    }

    #[test]
    fn format_date_uses_placeholder() {
        assert_eq!(format_date(None), "-");
    }
}
