//! Concurrent fetching of many lists through a bounded worker pool.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinSet;

use super::client::ClickUpClient;
use super::error::{ClickUpError, short_error_message};
use super::types::ClickUpTask;
use crate::progress::{FetchProgress, emit};
use crate::report::TimeWindow;

/// Records from every list that succeeded plus the failures of those that did not.
#[derive(Debug, Default)]
pub struct FanOutResult {
    /// Unordered across lists; in page order within a list.
    pub records: Vec<ClickUpTask>,
    /// Keyed by list ID. A failed list contributes no records.
    pub failures: BTreeMap<String, ClickUpError>,
}

impl FanOutResult {
    pub fn is_partial(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// The outcome for one list, produced by exactly one worker.
struct ListFetch {
    list_id: String,
    result: Result<Vec<ClickUpTask>, ClickUpError>,
}

/// Fetch every list in `list_ids` with at most `max_workers` in flight.
///
/// Workers pull IDs from a shared queue that is closed once every ID has been
/// submitted, and push exactly one [`ListFetch`] per ID. All workers are
/// joined before this returns.
#[tracing::instrument(skip_all, fields(lists = list_ids.len()))]
pub async fn fetch_many(
    client: &ClickUpClient,
    list_ids: &[String],
    window: TimeWindow,
    max_workers: usize,
) -> FanOutResult {
    let mut outcome = FanOutResult::default();
    if list_ids.is_empty() {
        return outcome;
    }

    let workers = max_workers.clamp(1, list_ids.len());
    tracing::info!(workers, "Fetching lists");
    emit(
        client.progress(),
        FetchProgress::FetchingLists {
            count: list_ids.len(),
            workers,
        },
    );

    let (work_tx, work_rx) = mpsc::channel::<String>(list_ids.len());
    let (result_tx, mut result_rx) = mpsc::channel::<ListFetch>(list_ids.len());
    let work_rx = Arc::new(Mutex::new(work_rx));

    let mut set = JoinSet::new();
    for _ in 0..workers {
        let client = client.clone();
        let work_rx = Arc::clone(&work_rx);
        let result_tx = result_tx.clone();
        set.spawn(async move {
            loop {
                // Hold the lock only while waiting for the next ID.
                let next = work_rx.lock().await.recv().await;
                let Some(list_id) = next else { break };
                let result = client.fetch_all(&list_id, window).await;
                if result_tx.send(ListFetch { list_id, result }).await.is_err() {
                    break;
                }
            }
        });
    }
    drop(result_tx);

    for id in list_ids {
        // Capacity equals the number of IDs, so this never waits.
        if work_tx.send(id.clone()).await.is_err() {
            break;
        }
    }
    drop(work_tx);

    while let Some(ListFetch { list_id, result }) = result_rx.recv().await {
        match result {
            Ok(records) => {
                emit(
                    client.progress(),
                    FetchProgress::ListComplete {
                        list_id: list_id.clone(),
                        total: records.len(),
                    },
                );
                outcome.records.extend(records);
            }
            Err(e) => {
                tracing::warn!(list_id = %list_id, error = %e, "List fetch failed");
                emit(
                    client.progress(),
                    FetchProgress::ListFailed {
                        list_id: list_id.clone(),
                        error: short_error_message(&e),
                    },
                );
                outcome.failures.insert(list_id, e);
            }
        }
    }

    while let Some(joined) = set.join_next().await {
        if let Err(e) = joined {
            tracing::error!(error = %e, "Fetch worker panicked");
        }
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clickup::client::tests::{BASE, client, page, task_json};
    use crate::http::{HttpMethod, MockTransport};
    use crate::progress::ProgressCallback;
    use std::collections::BTreeSet;
    use std::sync::Mutex as StdMutex;

    fn ids(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn failed_list_is_isolated() {
        let mock = MockTransport::new();
        let a = format!("{BASE}/list/A/task");
        let b = format!("{BASE}/list/B/task");
        let c = format!("{BASE}/list/C/task");
        mock.push_json(HttpMethod::Get, &a, page(vec![task_json("a1", "A", 1), task_json("a2", "A", 2)]));
        mock.push_json(HttpMethod::Get, &a, page(Vec::new()));
        mock.push_json(HttpMethod::Get, &b, page(vec![task_json("b1", "B", 1)]));
        mock.push_status(HttpMethod::Get, &b, 403);
        mock.push_json(HttpMethod::Get, &c, page(vec![task_json("c1", "C", 3)]));
        mock.push_json(HttpMethod::Get, &c, page(Vec::new()));

        let result = fetch_many(
            &client(&mock, &[]),
            &ids(&["A", "B", "C"]),
            TimeWindow::unbounded(),
            2,
        )
        .await;

        let got: BTreeSet<&str> = result.records.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(got, BTreeSet::from(["a1", "a2", "c1"]));
        assert!(result.is_partial());
        assert_eq!(result.failures.len(), 1);
        assert!(matches!(
            result.failures.get("B"),
            Some(ClickUpError::Api { status: 403, .. })
        ));
    }

    #[tokio::test]
    async fn worker_count_is_clamped_to_list_count() {
        let mock = MockTransport::new();
        mock.push_json(HttpMethod::Get, format!("{BASE}/list/A/task"), page(Vec::new()));

        let events = Arc::new(StdMutex::new(Vec::new()));
        let capture = Arc::clone(&events);
        let callback: ProgressCallback = Box::new(move |event| {
            if let FetchProgress::FetchingLists { count, workers } = event {
                capture
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .push((count, workers));
            }
        });
        let client = client(&mock, &[]).with_progress(Arc::new(callback));

        let result = fetch_many(&client, &ids(&["A"]), TimeWindow::unbounded(), 16).await;
        assert!(result.records.is_empty());
        assert!(!result.is_partial());

        let result = fetch_many(&client, &[], TimeWindow::unbounded(), 0).await;
        assert!(result.records.is_empty());

        let events = events.lock().unwrap_or_else(|e| e.into_inner()).clone();
        assert_eq!(events, vec![(1, 1)]);
    }

    #[tokio::test]
    async fn zero_workers_still_makes_progress() {
        let mock = MockTransport::new();
        for id in ["A", "B", "C"] {
            let url = format!("{BASE}/list/{id}/task");
            mock.push_json(HttpMethod::Get, &url, page(vec![task_json(&format!("{id}1"), id, 1)]));
            mock.push_json(HttpMethod::Get, &url, page(Vec::new()));
        }

        let result = fetch_many(
            &client(&mock, &[]),
            &ids(&["A", "B", "C"]),
            TimeWindow::unbounded(),
            0,
        )
        .await;

        assert_eq!(result.records.len(), 3);
        assert!(result.failures.is_empty());
        assert_eq!(mock.requests().len(), 6);
    }
}
