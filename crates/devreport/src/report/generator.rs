//! Cross-source aggregation.
//!
//! The generator visits every configured source in order, skips sources whose
//! health check fails, and merges whatever the remaining sources return into a
//! single stream ordered newest first.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::errors::{AggregateError, GenerateError, SourceError};
use super::types::{ActivitySource, Statistics, Task, TimeWindow};
use crate::progress::{FetchProgress, ProgressCallback, emit};

/// Tasks from every source that succeeded, plus the sources that did not.
#[derive(Debug, Default)]
pub struct GenerateOutcome {
    /// Sorted by `created_at`, newest first.
    pub tasks: Vec<Task>,
    /// Sources that were skipped or failed. Empty on a clean run.
    pub failures: AggregateError,
}

/// Aggregates tasks across sources.
#[derive(Clone, Default)]
pub struct Generator {
    sources: Vec<Arc<dyn ActivitySource>>,
    on_progress: Option<Arc<ProgressCallback>>,
}

impl Generator {
    pub fn new(sources: Vec<Arc<dyn ActivitySource>>) -> Self {
        Self {
            sources,
            on_progress: None,
        }
    }

    #[must_use]
    pub fn with_progress(mut self, callback: Arc<ProgressCallback>) -> Self {
        self.on_progress = Some(callback);
        self
    }

    /// Fetch from every source and merge the results.
    ///
    /// `cancel` is checked before each source; a source already fetching is
    /// left to finish on its own.
    ///
    /// # Errors
    ///
    /// [`GenerateError::Cancelled`] if cancellation was observed before or
    /// inside a source, or
    /// [`GenerateError::AllSourcesFailed`] when no task was produced and at
    /// least one source failed.
    #[tracing::instrument(skip_all, fields(user = %user, window = %window, sources = self.sources.len()))]
    pub async fn generate(
        &self,
        user: &str,
        window: TimeWindow,
        cancel: &CancellationToken,
    ) -> Result<GenerateOutcome, GenerateError> {
        let on_progress = self.on_progress.as_deref();
        let mut all: Vec<Task> = Vec::new();
        let mut failures = AggregateError::new();

        for source in &self.sources {
            if cancel.is_cancelled() {
                tracing::warn!("Cancellation requested, stopping before {}", source.name());
                return Err(GenerateError::Cancelled);
            }

            tracing::info!(source = source.name(), "Fetching tasks");

            if let Err(e) = source.health_check().await {
                if matches!(e, SourceError::Cancelled) {
                    tracing::warn!(source = source.name(), "Cancelled during health check");
                    return Err(GenerateError::Cancelled);
                }
                tracing::warn!(source = source.name(), error = %e, "Source unavailable");
                emit(
                    on_progress,
                    FetchProgress::SourceSkipped {
                        source: source.name().to_string(),
                        reason: e.to_string(),
                    },
                );
                let err = match e {
                    SourceError::Unavailable { .. } => e,
                    other => SourceError::unavailable(format!("health check failed: {other}")),
                };
                failures.insert(source.name(), err);
                continue;
            }

            match source.fetch_tasks(user, window).await {
                Ok(tasks) => {
                    tracing::info!(source = source.name(), count = tasks.len(), "Fetched tasks");
                    emit(
                        on_progress,
                        FetchProgress::SourceComplete {
                            source: source.name().to_string(),
                            tasks: tasks.len(),
                        },
                    );
                    all.extend(tasks);
                }
                Err(SourceError::Cancelled) => {
                    tracing::warn!(source = source.name(), "Cancelled while fetching tasks");
                    return Err(GenerateError::Cancelled);
                }
                Err(e) => {
                    tracing::warn!(source = source.name(), error = %e, "Failed to fetch tasks");
                    emit(
                        on_progress,
                        FetchProgress::SourceSkipped {
                            source: source.name().to_string(),
                            reason: e.to_string(),
                        },
                    );
                    failures.insert(source.name(), e);
                }
            }
        }

        // Stable: equal timestamps keep fetch order.
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        if all.is_empty() && !failures.is_empty() {
            return Err(GenerateError::AllSourcesFailed(failures));
        }

        Ok(GenerateOutcome {
            tasks: all,
            failures,
        })
    }

    /// Summary counts for `tasks`.
    pub fn statistics(tasks: &[Task]) -> Statistics {
        statistics(tasks)
    }
}

/// Count tasks overall, completed, and grouped by source, status, and type.
pub fn statistics(tasks: &[Task]) -> Statistics {
    let mut stats = Statistics {
        total: tasks.len(),
        ..Statistics::default()
    };

    for task in tasks {
        *stats.by_source.entry(task.source.clone()).or_default() += 1;
        *stats.by_status.entry(task.status.clone()).or_default() += 1;
        *stats.by_type.entry(task.kind.to_string()).or_default() += 1;
        if task.is_completed() {
            stats.completed += 1;
        }
    }

    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::TaskKind;
    use async_trait::async_trait;
    use chrono::{DateTime, TimeZone, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, day, 9, 0, 0).unwrap()
    }

    fn task(id: &str, source: &str, day: u32) -> Task {
        let mut t = Task::new(id, format!("task {id}"), at(day));
        t.source = source.to_string();
        t.status = "open".to_string();
        t
    }

    struct FakeSource {
        name: String,
        healthy: bool,
        result: Result<Vec<Task>, SourceError>,
        fetch_calls: AtomicUsize,
    }

    impl FakeSource {
        fn ok(name: &str, tasks: Vec<Task>) -> Arc<Self> {
            Arc::new(Self {
                name: name.to_string(),
                healthy: true,
                result: Ok(tasks),
                fetch_calls: AtomicUsize::new(0),
            })
        }

        fn unhealthy(name: &str) -> Arc<Self> {
            Arc::new(Self {
                name: name.to_string(),
                healthy: false,
                result: Ok(vec![task("never", name, 1)]),
                fetch_calls: AtomicUsize::new(0),
            })
        }

        fn failing(name: &str) -> Arc<Self> {
            Arc::new(Self {
                name: name.to_string(),
                healthy: true,
                result: Err(SourceError::internal("boom")),
                fetch_calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl ActivitySource for FakeSource {
        fn name(&self) -> &str {
            &self.name
        }

        async fn health_check(&self) -> Result<(), SourceError> {
            if self.healthy {
                Ok(())
            } else {
                Err(SourceError::unavailable("status 401"))
            }
        }

        async fn fetch_tasks(
            &self,
            _user: &str,
            _window: TimeWindow,
        ) -> Result<Vec<Task>, SourceError> {
            self.fetch_calls.fetch_add(1, Ordering::SeqCst);
            self.result.clone()
        }
    }

    fn generator(sources: Vec<Arc<FakeSource>>) -> Generator {
        Generator::new(
            sources
                .into_iter()
                .map(|s| s as Arc<dyn ActivitySource>)
                .collect(),
        )
    }

    #[test]
    fn statistics_of_empty_input_is_all_zero() {
        let stats = statistics(&[]);
        assert_eq!(stats, Statistics::default());
        assert_eq!(stats.total, 0);
        assert_eq!(stats.completed, 0);
        assert!(stats.by_source.is_empty());
        assert!(stats.by_status.is_empty());
        assert!(stats.by_type.is_empty());
    }

    #[test]
    fn statistics_groups_sum_to_total() {
        let mut tasks = vec![
            task("1", "Backend", 1),
            task("2", "Backend", 2),
            task("3", "Frontend", 3),
            task("4", "ClickUp", 4),
        ];
        tasks[1].status = "complete".to_string();
        tasks[1].completed_at = Some(at(5));
        tasks[3].kind = TaskKind::Project;

        let stats = Generator::statistics(&tasks);

        assert_eq!(stats.total, 4);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.by_source.values().sum::<usize>(), stats.total);
        assert_eq!(stats.by_status.values().sum::<usize>(), stats.total);
        assert_eq!(stats.by_type.values().sum::<usize>(), stats.total);
        assert_eq!(stats.by_source["Backend"], 2);
        assert_eq!(stats.by_status["open"], 3);
        assert_eq!(stats.by_type["Project"], 1);
        assert_eq!(stats.by_type["Task"], 3);
    }

    #[tokio::test]
    async fn merges_sources_newest_first_with_stable_ties() {
        let a = FakeSource::ok("A", vec![task("a1", "A", 1), task("a2", "A", 3)]);
        let b = FakeSource::ok("B", vec![task("b1", "B", 3), task("b2", "B", 2)]);

        let outcome = generator(vec![a, b])
            .generate("alice", TimeWindow::unbounded(), &CancellationToken::new())
            .await
            .expect("both sources succeed");

        let ids: Vec<&str> = outcome.tasks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["a2", "b1", "b2", "a1"]);
        assert!(
            outcome
                .tasks
                .windows(2)
                .all(|w| w[0].created_at >= w[1].created_at)
        );
        assert!(outcome.failures.is_empty());
    }

    #[tokio::test]
    async fn unhealthy_source_is_skipped_without_fetching() {
        let down = FakeSource::unhealthy("Down");
        let up = FakeSource::ok("Up", vec![task("u1", "Up", 1)]);

        let outcome = generator(vec![Arc::clone(&down), up])
            .generate("alice", TimeWindow::unbounded(), &CancellationToken::new())
            .await
            .expect("one source still succeeds");

        assert_eq!(down.fetch_calls.load(Ordering::SeqCst), 0);
        assert_eq!(outcome.tasks.len(), 1);
        assert!(matches!(
            outcome.failures.get("Down"),
            Some(SourceError::Unavailable { .. })
        ));
    }

    #[tokio::test]
    async fn fails_when_no_source_produced_tasks() {
        let err = generator(vec![FakeSource::failing("X"), FakeSource::unhealthy("Y")])
            .generate("alice", TimeWindow::unbounded(), &CancellationToken::new())
            .await
            .expect_err("nothing usable");

        match err {
            GenerateError::AllSourcesFailed(agg) => {
                assert_eq!(agg.len(), 2);
                assert!(agg.get("X").is_some());
                assert!(agg.get("Y").is_some());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_result_without_failures_is_success() {
        let outcome = generator(vec![FakeSource::ok("Quiet", Vec::new())])
            .generate("alice", TimeWindow::unbounded(), &CancellationToken::new())
            .await
            .expect("nothing found is not an error");
        assert!(outcome.tasks.is_empty());
        assert!(outcome.failures.is_empty());
    }

    #[tokio::test]
    async fn cancellation_is_checked_before_each_source() {
        let source = FakeSource::ok("A", vec![task("a1", "A", 1)]);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = generator(vec![Arc::clone(&source)])
            .generate("alice", TimeWindow::unbounded(), &cancel)
            .await
            .expect_err("cancelled");

        assert!(matches!(err, GenerateError::Cancelled));
        assert_eq!(source.fetch_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn cancelled_source_cancels_generation() {
        let cancelled = Arc::new(FakeSource {
            name: "A".to_string(),
            healthy: true,
            result: Err(SourceError::Cancelled),
            fetch_calls: AtomicUsize::new(0),
        });
        let later = FakeSource::ok("B", vec![task("b1", "B", 1)]);

        let err = generator(vec![cancelled, Arc::clone(&later)])
            .generate("alice", TimeWindow::unbounded(), &CancellationToken::new())
            .await
            .expect_err("cancelled");

        assert!(matches!(err, GenerateError::Cancelled));
        assert_eq!(later.fetch_calls.load(Ordering::SeqCst), 0);
    }
}
