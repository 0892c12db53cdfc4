//! devreport CLI - activity reports from ClickUp lists.

mod commands;
mod config;
mod progress;
mod shutdown;

use clap::{Parser, Subcommand};
use console::Term;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use crate::commands::report::{ReportArgs, handle_report};
use crate::commands::summary::{SummaryArgs, handle_summary};

#[derive(Parser)]
#[command(name = "devreport")]
#[command(version)]
#[command(about = "Activity reports aggregated from ClickUp lists")]
#[command(
    long_about = "devreport fetches tasks from one or more ClickUp lists concurrently, \
respecting the API rate limit, and renders either a per-project report for one \
user or a per-task team summary for a reporting period."
)]
#[command(after_long_help = r#"EXAMPLES
    Weekly report, one row per list:
        $ devreport report --user alice --clickup-listid 901,902

    Report for an explicit window, every list in a folder:
        $ devreport report --user alice --clickup-folderid 777 --start 2025-01-01 --end 2025-01-31

    Annotate projects by position (use | for bullet lists):
        $ devreport report --user alice --challenges "none,flaky CI|slow reviews"

    Team summary for last month as JSON:
        $ devreport summary --period last-month --format json

CONFIGURATION
    devreport reads configuration from:
      1. ~/.config/devreport/config.toml (or $XDG_CONFIG_HOME/devreport/config.toml)
      2. ./devreport.toml
      3. Environment variables (DEVREPORT_* prefix, e.g., DEVREPORT_CLICKUP__TOKEN)
      4. .env file in current directory

ENVIRONMENT VARIABLES
    CLICKUP_API_KEY           ClickUp personal API token
    CLICKUP_LISTIDS           Comma-separated list IDs
    CLICKUP_FOLDERID          Folder whose lists are fetched
    CLICKUP_ASSIGNEE_IDS      Comma-separated assignee IDs
"#)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Per-project activity report for one user
    Report(ReportArgs),
    /// Per-task team summary for a reporting period
    Summary(SummaryArgs),
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let cancel = CancellationToken::new();
    shutdown::setup_shutdown_handler(cancel.clone());

    // Initialize tracing for non-TTY mode (structured logging)
    if !Term::stdout().is_term() {
        let env_filter = match EnvFilter::try_from_default_env() {
            Ok(filter) => filter,
            Err(_) => EnvFilter::new("devreport=info,devreport_cli=info"),
        };

        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .init();
    }

    // Load configuration (config file -> env vars -> defaults)
    let config = config::Config::load();
    let cli = Cli::parse();

    match cli.command {
        Commands::Report(args) => handle_report(args, &config, cancel).await,
        Commands::Summary(args) => handle_summary(args, &config, cancel).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn summary_parses_period_alias() {
        let cli = Cli::try_parse_from(["devreport", "summary", "--period", "lastweek"]).unwrap();
        match cli.command {
            Commands::Summary(args) => assert_eq!(args.period, devreport::Period::LastWeek),
            _ => panic!("expected summary"),
        }
    }

    #[test]
    fn report_requires_user() {
        assert!(Cli::try_parse_from(["devreport", "report"]).is_err());
    }
}
