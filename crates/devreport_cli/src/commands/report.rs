use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use devreport::clickup::{OpenRollUpCompletion, RollUpOptions, SourceMode};
use devreport::{Annotations, Generator, Task, TimeWindow, annotate};
use tokio_util::sync::CancellationToken;

use crate::commands::shared::{
    ClickUpArgs, OutputFormat, build_clickup_source, build_rewriter, print_json, print_table,
    report_empty, report_failures,
};
use crate::config::Config;
use crate::progress::ProgressReporter;

/// Flags for `devreport report`.
#[derive(Debug, Clone, clap::Args)]
pub(crate) struct ReportArgs {
    /// Username the report is generated for
    #[arg(short, long)]
    pub user: String,

    /// Start date, YYYY-MM-DD (default: 7 days ago)
    #[arg(short, long)]
    pub start: Option<NaiveDate>,

    /// End date, YYYY-MM-DD (default: now)
    #[arg(short, long)]
    pub end: Option<NaiveDate>,

    /// Category label appended to each project title
    #[arg(long)]
    pub category: Option<String>,

    /// Comma-separated challenges, one per project
    #[arg(long, default_value = "")]
    pub challenges: String,

    /// Comma-separated support required, one per project
    #[arg(long, default_value = "")]
    pub support_required: String,

    /// Comma-separated support sources, one per project
    #[arg(long, default_value = "")]
    pub support_from: String,

    /// Comma-separated follow-ups, one per project
    #[arg(long, default_value = "")]
    pub follow_up: String,

    /// Leave open projects without a completion date
    #[arg(long)]
    pub no_open_completion: bool,

    /// Rephrase achievements with the local Ollama model
    #[arg(long)]
    pub rephrase: bool,

    #[command(flatten)]
    pub clickup: ClickUpArgs,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

/// Project row for the report table.
#[derive(tabled::Tabled)]
struct ProjectRow {
    #[tabled(rename = "Key Activity")]
    title: String,
    #[tabled(rename = "Achievements")]
    achievements: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Challenges")]
    challenges: String,
    #[tabled(rename = "Support Required")]
    support_required: String,
    #[tabled(rename = "Support From")]
    support_from: String,
    #[tabled(rename = "Follow Up")]
    follow_up: String,
}

impl From<&Task> for ProjectRow {
    fn from(task: &Task) -> Self {
        Self {
            title: task.title.clone(),
            achievements: task.achievements.clone(),
            status: task.status.clone(),
            challenges: task.challenges.clone(),
            support_required: task.support_required.clone(),
            support_from: task.support_from.clone(),
            follow_up: task.follow_up.clone(),
        }
    }
}

#[derive(serde::Serialize)]
struct ReportOutput<'a> {
    user: &'a str,
    window: TimeWindow,
    tasks: &'a [Task],
    failures: Vec<(String, String)>,
}

/// Window from explicit dates, falling back to the last seven days.
fn report_window(start: Option<NaiveDate>, end: Option<NaiveDate>, now: DateTime<Utc>) -> TimeWindow {
    let midnight = |d: NaiveDate| d.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
    let start = start.and_then(midnight).unwrap_or(now - Duration::days(7));
    let end = end.and_then(midnight).unwrap_or(now);
    TimeWindow::between(start, end)
}

pub(crate) async fn handle_report(
    args: ReportArgs,
    config: &Config,
    cancel: CancellationToken,
) -> Result<(), Box<dyn std::error::Error>> {
    let window = report_window(args.start, args.end, Utc::now());
    if let (Some(start), Some(end)) = (window.start, window.end)
        && start > end
    {
        return Err(format!("Start date {start} is after end date {end}").into());
    }

    let reporter = Arc::new(ProgressReporter::new());
    let mode = SourceMode::RollUp(RollUpOptions {
        category: args
            .category
            .clone()
            .unwrap_or_else(|| config.clickup.category.clone()),
        open_completion: if args.no_open_completion {
            OpenRollUpCompletion::Unset
        } else {
            OpenRollUpCompletion::Now
        },
    });

    let rewriter = build_rewriter(config, args.rephrase)?;
    let source = build_clickup_source(
        &args.clickup,
        config,
        mode,
        &cancel,
        reporter.as_callback(),
        rewriter,
    )
    .await?;

    tracing::info!(user = %args.user, window = %window, "Generating report");

    let generator = Generator::new(vec![source]).with_progress(reporter.as_callback());
    let result = generator.generate(&args.user, window, &cancel).await;
    reporter.finish();
    let mut outcome = result?;

    let annotations = Annotations::from_lists(
        &args.challenges,
        &args.support_required,
        &args.support_from,
        &args.follow_up,
    );
    annotate(&mut outcome.tasks, &annotations);

    match args.format {
        OutputFormat::Json => {
            let failures = outcome
                .failures
                .iter()
                .map(|(source, err)| (source.clone(), err.to_string()))
                .collect();
            print_json(&ReportOutput {
                user: &args.user,
                window,
                tasks: &outcome.tasks,
                failures,
            })?;
        }
        OutputFormat::Table => {
            report_failures(&outcome.failures);
            println!("Report for {} ({window})", args.user);
            if !report_empty(&outcome.tasks) {
                print_table(outcome.tasks.iter().map(ProjectRow::from).collect());
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn report_window_defaults_to_last_week() {
        let now = Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap();
        let window = report_window(None, None, now);
        assert_eq!(window.start, Some(Utc.with_ymd_and_hms(2025, 1, 8, 12, 0, 0).unwrap()));
        assert_eq!(window.end, Some(now));
    }

    #[test]
    fn report_window_uses_midnight_for_explicit_dates() {
        let now = Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap();
        let window = report_window(NaiveDate::from_ymd_opt(2025, 1, 1), NaiveDate::from_ymd_opt(2025, 1, 10), now);
        assert_eq!(window.start, Some(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()));
        assert_eq!(window.end, Some(Utc.with_ymd_and_hms(2025, 1, 10, 0, 0, 0).unwrap()));
    }
}
