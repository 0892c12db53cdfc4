//! ClickUp API client.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use url::Url;

use super::error::ClickUpError;
use super::types::{ClickUpTask, FolderListsResponse, ListDetails, ListRef, TasksResponse};
use crate::http::reqwest_transport::ReqwestTransport;
use crate::http::{HttpRequest, HttpResponse, HttpTransport};
use crate::progress::{FetchProgress, ProgressCallback, emit};
use crate::rate_limit::{ApiRateLimiter, rate_limits};
use crate::report::TimeWindow;
use crate::retry::RetryConfig;
use crate::transport::RateLimitedTransport;

/// ClickUp API v2 root.
pub const DEFAULT_BASE_URL: &str = "https://api.clickup.com/api/v2";

/// Default number of lists fetched concurrently.
pub const DEFAULT_MAX_WORKERS: usize = 5;

/// Per-request timeout for the default transport.
const REQUEST_TIMEOUT: StdDuration = StdDuration::from_secs(30);

/// Tunables for fetching from ClickUp.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Worker pool size for fan-out fetches.
    pub max_workers: usize,
    pub requests_per_minute: u32,
    pub burst: u32,
    pub retry: RetryConfig,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            max_workers: DEFAULT_MAX_WORKERS,
            requests_per_minute: rate_limits::DEFAULT_REQUESTS_PER_MINUTE,
            burst: rate_limits::DEFAULT_BURST,
            retry: RetryConfig::default(),
        }
    }
}

impl FetchOptions {
    pub fn limiter(&self) -> ApiRateLimiter {
        ApiRateLimiter::per_minute(self.requests_per_minute, self.burst)
    }
}

/// ClickUp API client.
///
/// Every request goes through one [`RateLimitedTransport`], so all clones of a
/// client share a single token bucket.
#[derive(Clone)]
pub struct ClickUpClient {
    transport: RateLimitedTransport,
    base_url: String,
    token: String,
    assignee_ids: Vec<String>,
}

impl ClickUpClient {
    /// Create a client backed by reqwest.
    ///
    /// # Example
    ///
    /// ```ignore
    /// use devreport::clickup::{ClickUpClient, FetchOptions};
    ///
    /// let client = ClickUpClient::new("pk_123", vec!["4242".into()], &FetchOptions::default())?;
    /// client.health_check().await?;
    /// ```
    pub fn new(
        token: &str,
        assignee_ids: Vec<String>,
        options: &FetchOptions,
    ) -> Result<Self, ClickUpError> {
        let http = ReqwestTransport::with_timeout(REQUEST_TIMEOUT)
            .map_err(|e| ClickUpError::Transport(e.into()))?;
        let transport =
            RateLimitedTransport::new(Arc::new(http), options.limiter(), options.retry.clone());
        Ok(Self::new_with_transport(transport, token, assignee_ids))
    }

    pub fn new_with_transport(
        transport: RateLimitedTransport,
        token: &str,
        assignee_ids: Vec<String>,
    ) -> Self {
        Self {
            transport,
            base_url: DEFAULT_BASE_URL.to_string(),
            token: token.to_string(),
            assignee_ids,
        }
    }

    /// Convenience for tests and alternative transports.
    pub fn with_http(
        http: Arc<dyn HttpTransport>,
        token: &str,
        assignee_ids: Vec<String>,
        options: &FetchOptions,
    ) -> Self {
        let transport = RateLimitedTransport::new(http, options.limiter(), options.retry.clone());
        Self::new_with_transport(transport, token, assignee_ids)
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.transport = self.transport.with_cancellation(cancel);
        self
    }

    #[must_use]
    pub fn with_progress(mut self, callback: Arc<ProgressCallback>) -> Self {
        self.transport = self.transport.with_progress(callback);
        self
    }

    pub(crate) fn progress(&self) -> Option<&ProgressCallback> {
        self.transport.progress()
    }

    fn endpoint(&self, path: &str) -> Result<Url, ClickUpError> {
        Ok(Url::parse(&format!("{}{}", self.base_url, path))?)
    }

    async fn send(&self, url: &Url) -> Result<HttpResponse, ClickUpError> {
        let request = HttpRequest::get(url.as_str())
            .with_header("Authorization", self.token.as_str())
            .with_header("Accept", "application/json");

        let response = self.transport.send(request).await?;

        if !response.is_success() {
            return Err(ClickUpError::Api {
                status: response.status,
                body: response.body_text(),
            });
        }
        Ok(response)
    }

    /// Make an authenticated GET request.
    async fn get<T: DeserializeOwned>(&self, url: &Url) -> Result<T, ClickUpError> {
        let response = self.send(url).await?;
        Ok(serde_json::from_slice(&response.body)?)
    }

    /// Verify the token with one `GET /user`.
    pub async fn health_check(&self) -> Result<(), ClickUpError> {
        let url = self.endpoint("/user")?;
        self.send(&url).await.map(|_| ())
    }

    /// Fetch a list's metadata, including its display name.
    pub async fn fetch_list_details(&self, list_id: &str) -> Result<ListDetails, ClickUpError> {
        let url = self.endpoint(&format!("/list/{list_id}"))?;
        self.get(&url).await
    }

    /// Resolve every list in a folder.
    pub async fn list_folder_lists(&self, folder_id: &str) -> Result<Vec<ListRef>, ClickUpError> {
        let url = self.endpoint(&format!("/folder/{folder_id}/list"))?;
        let response: FolderListsResponse = self.get(&url).await?;
        tracing::info!(
            folder_id,
            count = response.lists.len(),
            "Resolved folder lists"
        );
        Ok(response.lists.into_iter().map(ListRef::from).collect())
    }

    /// URL for one page of a list's tasks.
    pub(crate) fn page_url(
        &self,
        list_id: &str,
        window: TimeWindow,
        page: u32,
    ) -> Result<Url, ClickUpError> {
        let mut url = self.endpoint(&format!("/list/{list_id}/task"))?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("subtasks", "true")
                .append_pair("include_timl", "true")
                .append_pair("order_by", "created")
                .append_pair("include_closed", "true")
                .append_pair("page", &page.to_string());
            for id in &self.assignee_ids {
                query.append_pair("assignees[]", id);
            }
            if let Some(start) = window.start {
                query.append_pair("date_created_gt", &start.timestamp_millis().to_string());
            }
            if let Some(end) = window.end {
                query.append_pair("date_created_lt", &end.timestamp_millis().to_string());
            }
        }
        Ok(url)
    }

    /// Fetch every task in a list, page by page, until a page comes back empty.
    ///
    /// Any failure discards the pages already fetched for this list.
    #[tracing::instrument(skip(self, window), fields(window = %window))]
    pub async fn fetch_all(
        &self,
        list_id: &str,
        window: TimeWindow,
    ) -> Result<Vec<ClickUpTask>, ClickUpError> {
        let mut all = Vec::new();
        let mut page: u32 = 0;

        loop {
            let url = self.page_url(list_id, window, page)?;
            let response: TasksResponse = self.get(&url).await?;
            let count = response.tasks.len();

            if count == 0 {
                break;
            }

            all.extend(response.tasks);
            tracing::debug!(page, count, total = all.len(), "Fetched page");
            emit(
                self.progress(),
                FetchProgress::FetchedPage {
                    list_id: list_id.to_string(),
                    page,
                    count,
                    total_so_far: all.len(),
                },
            );

            page += 1;
        }

        tracing::info!(total = all.len(), pages = page + 1, "Fetched list");
        Ok(all)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::http::{HttpMethod, MockTransport};
    use crate::transport::TransportError;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    pub(crate) const BASE: &str = "https://api.test/api/v2";

    pub(crate) fn client(mock: &MockTransport, assignees: &[&str]) -> ClickUpClient {
        let options = FetchOptions {
            requests_per_minute: 60_000,
            burst: 100,
            ..FetchOptions::default()
        };
        ClickUpClient::with_http(
            Arc::new(mock.clone()),
            "pk_test",
            assignees.iter().map(|s| s.to_string()).collect(),
            &options,
        )
        .with_base_url(BASE)
    }

    pub(crate) fn task_json(id: &str, list_id: &str, created_ms: i64) -> serde_json::Value {
        json!({
            "id": id,
            "name": format!("Task {id}"),
            "description": "",
            "status": {"status": "open"},
            "url": format!("https://app.clickup.com/t/{id}"),
            "date_created": created_ms.to_string(),
            "date_updated": created_ms.to_string(),
            "date_closed": null,
            "assignees": [],
            "list": {"id": list_id, "name": format!("List {list_id}")}
        })
    }

    pub(crate) fn page(tasks: Vec<serde_json::Value>) -> serde_json::Value {
        json!({ "tasks": tasks })
    }

    fn tasks_url(list_id: &str) -> String {
        format!("{BASE}/list/{list_id}/task")
    }

    #[tokio::test]
    async fn paginates_until_empty_page() {
        let mock = MockTransport::new();
        let url = tasks_url("901");
        mock.push_json(HttpMethod::Get, &url, page(vec![task_json("a", "901", 1), task_json("b", "901", 2)]));
        mock.push_json(HttpMethod::Get, &url, page(vec![task_json("c", "901", 3), task_json("d", "901", 4)]));
        mock.push_json(HttpMethod::Get, &url, page(Vec::new()));

        let tasks = client(&mock, &[])
            .fetch_all("901", TimeWindow::unbounded())
            .await
            .expect("three pages");

        assert_eq!(tasks.len(), 4);
        let requests = mock.requests();
        assert_eq!(requests.len(), 3);
        for (i, req) in requests.iter().enumerate() {
            let url = Url::parse(&req.url).unwrap();
            let page = url
                .query_pairs()
                .find(|(k, _)| k == "page")
                .map(|(_, v)| v.into_owned());
            assert_eq!(page, Some(i.to_string()));
        }
    }

    #[tokio::test]
    async fn non_success_page_discards_the_list() {
        let mock = MockTransport::new();
        let url = tasks_url("901");
        mock.push_json(HttpMethod::Get, &url, page(vec![task_json("a", "901", 1)]));
        mock.push_status(HttpMethod::Get, &url, 404);

        let err = client(&mock, &[])
            .fetch_all("901", TimeWindow::unbounded())
            .await
            .expect_err("second page fails");
        assert!(matches!(err, ClickUpError::Api { status: 404, .. }));
    }

    #[test]
    fn page_url_carries_filters() {
        let mock = MockTransport::new();
        let window = TimeWindow::between(
            Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2025, 1, 8, 0, 0, 0).unwrap(),
        );

        let url = client(&mock, &["11", "22"])
            .page_url("901", window, 3)
            .unwrap();
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        let get = |key: &str| {
            pairs
                .iter()
                .filter(|(k, _)| k == key)
                .map(|(_, v)| v.as_str())
                .collect::<Vec<_>>()
        };

        assert_eq!(url.path(), "/api/v2/list/901/task");
        assert_eq!(get("include_closed"), vec!["true"]);
        assert_eq!(get("order_by"), vec!["created"]);
        assert_eq!(get("subtasks"), vec!["true"]);
        assert_eq!(get("page"), vec!["3"]);
        assert_eq!(get("assignees[]"), vec!["11", "22"]);
        assert_eq!(get("date_created_gt"), vec!["1735689600000"]);
        assert_eq!(get("date_created_lt"), vec!["1736294400000"]);
    }

    #[test]
    fn unbounded_window_sends_no_date_filters() {
        let mock = MockTransport::new();
        let url = client(&mock, &[])
            .page_url("901", TimeWindow::unbounded(), 0)
            .unwrap();
        assert!(!url.query_pairs().any(|(k, _)| k.starts_with("date_created")));
        assert!(!url.query_pairs().any(|(k, _)| k == "assignees[]"));
    }

    #[tokio::test]
    async fn health_check_sends_token_and_maps_status() {
        let mock = MockTransport::new();
        mock.push_json(HttpMethod::Get, format!("{BASE}/user"), json!({"user": {"id": 1}}));
        mock.push_status(HttpMethod::Get, format!("{BASE}/user"), 401);

        let client = client(&mock, &[]);
        client.health_check().await.expect("healthy");
        let err = client.health_check().await.expect_err("unauthorized");
        assert!(matches!(err, ClickUpError::Api { status: 401, .. }));

        let auth = crate::http::header_get(&mock.requests()[0].headers, "authorization")
            .map(str::to_string);
        assert_eq!(auth.as_deref(), Some("pk_test"));
    }

    #[tokio::test]
    async fn resolves_folder_lists_and_details() {
        let mock = MockTransport::new();
        mock.push_json(
            HttpMethod::Get,
            format!("{BASE}/folder/77/list"),
            json!({"lists": [{"id": "1", "name": "Backend"}, {"id": "2", "name": "Frontend"}]}),
        );
        mock.push_json(
            HttpMethod::Get,
            format!("{BASE}/list/1"),
            json!({"id": "1", "name": "Backend", "folder": {"id": "77", "name": "Eng"}}),
        );

        let client = client(&mock, &[]);
        let lists = client.list_folder_lists("77").await.unwrap();
        assert_eq!(
            lists,
            vec![ListRef::named("1", "Backend"), ListRef::named("2", "Frontend")]
        );

        let details = client.fetch_list_details("1").await.unwrap();
        assert_eq!(details.name, "Backend");
        assert_eq!(details.folder.map(|f| f.name).as_deref(), Some("Eng"));
    }

    #[tokio::test]
    async fn transport_errors_are_wrapped() {
        let mock = MockTransport::new();
        let options = FetchOptions {
            requests_per_minute: 60_000,
            burst: 100,
            retry: RetryConfig::default().with_max_retries(0),
            ..FetchOptions::default()
        };
        let client = ClickUpClient::with_http(Arc::new(mock.clone()), "pk", Vec::new(), &options)
            .with_base_url(BASE);

        let err = client.health_check().await.expect_err("no mock registered");
        assert!(matches!(
            err,
            ClickUpError::Transport(TransportError::RetriesExhausted { attempts: 1, .. })
        ));
    }
}
