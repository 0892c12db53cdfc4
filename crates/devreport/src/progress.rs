//! Progress events emitted while fetching activity.
//!
//! The library never prints; front ends subscribe with a [`ProgressCallback`]
//! and render events however they like.

/// Progress events emitted during a fetch.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum FetchProgress {
    /// Starting a fan-out over several lists.
    FetchingLists {
        /// Number of lists submitted.
        count: usize,
        /// Worker pool size actually used.
        workers: usize,
    },

    /// Fetched one page of a list.
    FetchedPage {
        list_id: String,
        /// Page index (0-indexed).
        page: u32,
        /// Records on this page.
        count: usize,
        /// Running total for this list.
        total_so_far: usize,
    },

    /// A list finished paginating.
    ListComplete { list_id: String, total: usize },

    /// A list failed; its records are discarded.
    ListFailed { list_id: String, error: String },

    /// A request is about to back off before retrying.
    RetryBackoff {
        /// Request path being retried.
        target: String,
        /// Attempt number that just failed (1-indexed).
        attempt: u32,
        delay_ms: u64,
        error: String,
    },

    /// A source was skipped because it failed its health check or fetch.
    SourceSkipped { source: String, reason: String },

    /// A source contributed tasks.
    SourceComplete { source: String, tasks: usize },
}

/// Callback type for progress reporting.
pub type ProgressCallback = Box<dyn Fn(FetchProgress) + Send + Sync>;

/// Helper to emit progress events.
#[inline]
pub fn emit(on_progress: Option<&ProgressCallback>, event: FetchProgress) {
    if let Some(cb) = on_progress {
        cb(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn emit_calls_callback() {
        let count = Arc::new(AtomicUsize::new(0));
        let capture = Arc::clone(&count);
        let callback: ProgressCallback = Box::new(move |_| {
            capture.fetch_add(1, Ordering::SeqCst);
        });

        emit(
            Some(&callback),
            FetchProgress::ListComplete {
                list_id: "1".to_string(),
                total: 3,
            },
        );
        emit(None, FetchProgress::ListComplete {
            list_id: "2".to_string(),
            total: 0,
        });

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
