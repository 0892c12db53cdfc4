use devreport::FetchProgress;

/// Logging reporter using tracing for structured output.
pub struct LoggingReporter;

impl LoggingReporter {
    pub fn new() -> Self {
        Self
    }

    pub fn handle(&self, event: FetchProgress) {
        match event {
            FetchProgress::FetchingLists { count, workers } => {
                tracing::info!(count, workers, "Fetching lists");
            }

            FetchProgress::FetchedPage {
                list_id,
                page,
                count,
                total_so_far,
            } => {
                tracing::debug!(list_id = %list_id, page, count, total_so_far, "Fetched page");
            }

            FetchProgress::ListComplete { list_id, total } => {
                tracing::info!(list_id = %list_id, total, "List complete");
            }

            FetchProgress::ListFailed { list_id, error } => {
                tracing::warn!(list_id = %list_id, error = %error, "List failed");
            }

            FetchProgress::RetryBackoff {
                target,
                attempt,
                delay_ms,
                error,
            } => {
                tracing::info!(target_path = %target, attempt, delay_ms, error = %error, "Backing off");
            }

            FetchProgress::SourceSkipped { source, reason } => {
                tracing::warn!(source = %source, reason = %reason, "Source skipped");
            }

            FetchProgress::SourceComplete { source, tasks } => {
                tracing::info!(source = %source, tasks, "Source complete");
            }

            _ => {}
        }
    }
}

impl Default for LoggingReporter {
    fn default() -> Self {
        Self::new()
    }
}
