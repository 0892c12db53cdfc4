use std::sync::Arc;

use chrono::Utc;
use devreport::clickup::SourceMode;
use devreport::{Generator, Period, Statistics, Task, TimeWindow, statistics};
use tokio_util::sync::CancellationToken;

use crate::commands::shared::{
    ClickUpArgs, CountRow, OutputFormat, build_clickup_source, format_date, print_json,
    print_table, report_empty, report_failures, statistics_rows,
};
use crate::config::Config;
use crate::progress::ProgressReporter;

/// Flags for `devreport summary`.
#[derive(Debug, Clone, clap::Args)]
pub(crate) struct SummaryArgs {
    /// Reporting period: today, yesterday, this-week, last-week, this-month, last-month, all-time
    #[arg(short, long, default_value_t = Period::ThisWeek)]
    pub period: Period,

    #[command(flatten)]
    pub clickup: ClickUpArgs,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

/// Task row for the summary table.
#[derive(tabled::Tabled)]
struct TaskRow {
    #[tabled(rename = "Task")]
    title: String,
    #[tabled(rename = "List")]
    source: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Assignee")]
    assignee: String,
    #[tabled(rename = "Created")]
    created: String,
    #[tabled(rename = "Completed")]
    completed: String,
}

impl From<&Task> for TaskRow {
    fn from(task: &Task) -> Self {
        Self {
            title: task.title.clone(),
            source: task.source.clone(),
            status: task.status.clone(),
            assignee: task.assignee.clone(),
            created: format_date(Some(task.created_at)),
            completed: format_date(task.completed_at),
        }
    }
}

#[derive(serde::Serialize)]
struct SummaryOutput<'a> {
    period: &'static str,
    window: TimeWindow,
    tasks: &'a [Task],
    statistics: Statistics,
    failures: Vec<(String, String)>,
}

pub(crate) async fn handle_summary(
    args: SummaryArgs,
    config: &Config,
    cancel: CancellationToken,
) -> Result<(), Box<dyn std::error::Error>> {
    let window = args.period.resolve(Utc::now());
    let reporter = Arc::new(ProgressReporter::new());

    let source = build_clickup_source(
        &args.clickup,
        config,
        SourceMode::PerRecord,
        &cancel,
        reporter.as_callback(),
        None,
    )
    .await?;

    tracing::info!(period = %args.period, window = %window, "Generating team summary");

    let generator = Generator::new(vec![source]).with_progress(reporter.as_callback());
    let result = generator.generate("", window, &cancel).await;
    reporter.finish();
    let outcome = result?;
    let stats = statistics(&outcome.tasks);

    match args.format {
        OutputFormat::Json => {
            let failures = outcome
                .failures
                .iter()
                .map(|(source, err)| (source.clone(), err.to_string()))
                .collect();
            print_json(&SummaryOutput {
                period: args.period.as_str(),
                window,
                tasks: &outcome.tasks,
                statistics: stats,
                failures,
            })?;
        }
        OutputFormat::Table => {
            report_failures(&outcome.failures);
            println!("Team summary for {} ({window})", args.period);
            if !report_empty(&outcome.tasks) {
                print_table(outcome.tasks.iter().map(TaskRow::from).collect());
                print_table::<CountRow>(statistics_rows(&stats));
            }
        }
    }

    Ok(())
}
