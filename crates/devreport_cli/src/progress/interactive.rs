use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use devreport::FetchProgress;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

/// Interactive progress reporter using indicatif.
///
/// One spinner per list, created lazily on its first page, plus a status line
/// for retries and skipped sources.
pub struct InteractiveReporter {
    multi: MultiProgress,
    lists: Mutex<HashMap<String, ProgressBar>>,
}

impl InteractiveReporter {
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
            lists: Mutex::new(HashMap::new()),
        }
    }

    fn list_bar(&self, bars: &mut HashMap<String, ProgressBar>, list_id: &str) -> ProgressBar {
        bars.entry(list_id.to_string())
            .or_insert_with(|| {
                let pb = self.multi.add(ProgressBar::new_spinner());
                pb.set_style(Self::counter_style());
                pb.set_prefix(format!("list {list_id}"));
                pb.enable_steady_tick(Duration::from_millis(100));
                pb
            })
            .clone()
    }

    pub fn handle(&self, event: FetchProgress) {
        let mut bars = self.lists.lock().unwrap_or_else(|e| e.into_inner());

        match event {
            FetchProgress::FetchingLists { count, workers } => {
                let _ = self
                    .multi
                    .println(format!("Fetching {count} lists with {workers} workers"));
            }

            FetchProgress::FetchedPage {
                list_id,
                page,
                total_so_far,
                ..
            } => {
                let pb = self.list_bar(&mut bars, &list_id);
                pb.set_position(total_so_far as u64);
                pb.set_message(format!("tasks (page {})", page + 1));
            }

            FetchProgress::ListComplete { list_id, total } => {
                let pb = self.list_bar(&mut bars, &list_id);
                pb.set_style(Self::done_style());
                pb.finish_with_message(format!("✓ {total} tasks"));
            }

            FetchProgress::ListFailed { list_id, error } => {
                let pb = self.list_bar(&mut bars, &list_id);
                pb.set_style(Self::done_style());
                pb.abandon_with_message(format!("✗ {error}"));
            }

            FetchProgress::RetryBackoff {
                target,
                attempt,
                delay_ms,
                ..
            } => {
                let _ = self.multi.println(format!(
                    "  retrying {target} (attempt {attempt}) in {:.1}s",
                    delay_ms as f64 / 1000.0
                ));
            }

            FetchProgress::SourceSkipped { source, reason } => {
                let _ = self.multi.println(format!("⚠ {source} skipped: {reason}"));
            }

            FetchProgress::SourceComplete { source, tasks } => {
                let _ = self.multi.println(format!("{source}: {tasks} tasks"));
            }

            _ => {}
        }
    }

    pub fn finish(&self) {
        let bars = self.lists.lock().unwrap_or_else(|e| e.into_inner());
        for pb in bars.values() {
            if !pb.is_finished() {
                pb.finish_and_clear();
            }
        }
    }

    fn counter_style() -> ProgressStyle {
        ProgressStyle::default_spinner()
            .template("{prefix:.bold.cyan} {spinner:.green} {pos:>4} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
    }

    fn done_style() -> ProgressStyle {
        ProgressStyle::default_spinner()
            .template("{prefix:.bold.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
    }
}

impl Default for InteractiveReporter {
    fn default() -> Self {
        Self::new()
    }
}
