use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use reqwest::{Client, Method, Response};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use shared::slskd::SearchResult;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use url::Url;

use super::models::{DownloadRequestFile, SearchResponse, SearchStatusResponse};
use crate::error::{Result, SoulspotError};
use crate::traits::DownloadBackend;

/// Server-side timeout sent with each search request.
const SEARCH_REQUEST_TIMEOUT_MS: i64 = 30_000;
/// How often a pending search is polled for completion.
const POLL_INTERVAL_MS: u64 = 2_000;

const DEFAULT_USERNAME: &str = "slskd";
const DEFAULT_PASSWORD: &str = "slskd";

#[derive(Debug, Clone)]
pub struct SlskdClient {
    base_url: Url,
    api_key: Option<String>,
    username: String,
    password: String,
    token: Arc<Mutex<Option<String>>>,
    client: Client,
    search_timeout: Duration,
}

#[derive(Default)]
pub struct SlskdClientBuilder {
    base_url: Option<String>,
    api_key: Option<String>,
    username: Option<String>,
    password: Option<String>,
    search_timeout_seconds: Option<i64>,
}

impl SlskdClientBuilder {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn base_url(mut self, url: &str) -> Self {
        self.base_url = Some(url.to_string());
        self
    }

    pub fn api_key(mut self, key: &str) -> Self {
        self.api_key = Some(key.to_string());
        self
    }

    pub fn credentials(mut self, username: &str, password: &str) -> Self {
        self.username = Some(username.to_string());
        self.password = Some(password.to_string());
        self
    }

    pub fn search_timeout(mut self, seconds: i64) -> Self {
        self.search_timeout_seconds = Some(seconds);
        self
    }

    pub fn build(self) -> Result<SlskdClient> {
        let base_url_str = self.base_url.ok_or(SoulspotError::NotConfigured)?;
        let base_url = Url::parse(base_url_str.trim_end_matches('/'))?;

        Ok(SlskdClient {
            base_url,
            api_key: self.api_key,
            username: self.username.unwrap_or_else(|| DEFAULT_USERNAME.to_string()),
            password: self.password.unwrap_or_else(|| DEFAULT_PASSWORD.to_string()),
            token: Arc::new(Mutex::new(None)),
            client: Client::new(),
            search_timeout: Duration::seconds(self.search_timeout_seconds.unwrap_or(60)),
        })
    }
}

impl SlskdClient {
    async fn make_request<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<B>,
    ) -> Result<T> {
        let url = self.base_url.join(&format!("api/v0/{endpoint}"))?;
        debug!("Request: {} {}", method, url);
        let mut request = self.client.request(method, url);
        if let Some(key) = &self.api_key {
            request = request.header("X-API-Key", key);
        } else if let Some(token) = self.token.lock().await.as_deref() {
            request = request.bearer_auth(token);
        }
        if let Some(b) = body {
            request = request.json(&b);
        }
        let response = request.send().await?;
        Self::handle_response(response).await
    }

    async fn handle_response<T: DeserializeOwned>(response: Response) -> Result<T> {
        let status = response.status();
        if status.is_success() {
            let text = response.text().await?;
            let payload = if text.trim().is_empty() { "null" } else { &text };
            serde_json::from_str(payload).map_err(|e| SoulspotError::Api {
                status: status.as_u16(),
                message: format!("JSON parse error: {e}"),
            })
        } else {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Could not read error body".to_string());
            Err(SoulspotError::Api {
                status: status.as_u16(),
                message,
            })
        }
    }

    /// Session login. Stores the JWT used by subsequent requests when no API
    /// key is configured.
    pub async fn login(&self) -> Result<()> {
        #[derive(Serialize)]
        struct LoginRequest<'a> {
            username: &'a str,
            password: &'a str,
        }
        #[derive(Deserialize)]
        struct LoginResponse {
            token: String,
        }

        let response: LoginResponse = self
            .make_request(
                Method::POST,
                "session",
                Some(&LoginRequest {
                    username: &self.username,
                    password: &self.password,
                }),
            )
            .await?;
        *self.token.lock().await = Some(response.token);
        info!("Logged in to slskd, session token stored");
        Ok(())
    }

    pub async fn start_search(&self, query: &str) -> Result<String> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct SearchRequest<'a> {
            search_text: &'a str,
            timeout: i64,
        }
        #[derive(Deserialize)]
        struct SearchId {
            id: String,
        }

        info!("Starting search for: '{query}'");
        let response: SearchId = self
            .make_request(
                Method::POST,
                "searches",
                Some(&SearchRequest {
                    search_text: query,
                    timeout: SEARCH_REQUEST_TIMEOUT_MS,
                }),
            )
            .await?;
        info!("Search initiated with ID: {}", response.id);
        Ok(response.id)
    }

    async fn search_state(&self, search_id: &str) -> Result<SearchStatusResponse> {
        self.make_request(Method::GET, &format!("searches/{search_id}"), None::<()>)
            .await
    }

    /// Poll until the search finishes. slskd reports compound states such as
    /// "Completed, TimedOut", so completion is a substring check.
    pub async fn wait_for_search(&self, search_id: &str) -> Result<()> {
        let deadline = Utc::now() + self.search_timeout;
        loop {
            let status = self.search_state(search_id).await?;

            if status.state == "Cancelled" {
                return Err(SoulspotError::SearchCancelled(search_id.to_string()));
            }

            if status.is_complete
                || status.state.contains("Completed")
                || status.state.contains("TimedOut")
            {
                info!(
                    "Search {} finished (state: {}, {} files)",
                    search_id, status.state, status.file_count
                );
                return Ok(());
            }

            if Utc::now() >= deadline {
                return Err(SoulspotError::SearchTimedOut(
                    search_id.to_string(),
                    self.search_timeout.num_seconds(),
                ));
            }

            debug!(
                "Search {} still running (state: {}), polling again in {}ms",
                search_id, status.state, POLL_INTERVAL_MS
            );
            tokio::time::sleep(tokio::time::Duration::from_millis(POLL_INTERVAL_MS)).await;
        }
    }

    /// Fetch the peer responses for a search, flattened to one candidate per
    /// offered file.
    pub async fn search_responses(&self, search_id: &str) -> Result<Vec<SearchResult>> {
        let responses: Vec<SearchResponse> = self
            .make_request(
                Method::GET,
                &format!("searches/{search_id}/responses"),
                None::<()>,
            )
            .await?;

        let results: Vec<SearchResult> = responses
            .into_iter()
            .flat_map(|response| {
                let username = response.username;
                let upload_speed = response.upload_speed;
                response.files.into_iter().map(move |file| SearchResult {
                    username: username.clone(),
                    filename: file.filename,
                    size: file.size,
                    upload_speed,
                    locked: file.is_locked,
                })
            })
            .collect();

        debug!("Search {} returned {} candidate files", search_id, results.len());
        Ok(results)
    }

    /// Queue a download with the owning peer, carrying the exact filename and
    /// size reported by the search.
    pub async fn enqueue_download(&self, candidate: &SearchResult) -> Result<()> {
        let files = vec![DownloadRequestFile {
            filename: candidate.filename.clone(),
            size: candidate.size,
        }];
        let endpoint = format!("transfers/downloads/{}", candidate.username);
        info!(
            "Queueing download: {} from {} ({} bytes)",
            candidate.filename, candidate.username, candidate.size
        );
        self.make_request::<serde_json::Value, _>(Method::POST, &endpoint, Some(&files))
            .await?;
        Ok(())
    }

    /// Remove a finished search from slskd's registry. A 404 means someone
    /// beat us to it.
    pub async fn delete_search(&self, search_id: &str) -> Result<()> {
        debug!("Deleting search {}", search_id);
        match self
            .make_request::<(), ()>(Method::DELETE, &format!("searches/{search_id}"), None)
            .await
        {
            Ok(()) => Ok(()),
            Err(SoulspotError::Api { status: 404, .. }) => Ok(()),
            Err(e) => Err(e),
        }
    }

    pub async fn check_connection(&self) -> bool {
        self.make_request::<serde_json::Value, ()>(Method::GET, "session", None)
            .await
            .is_ok()
    }
}

#[async_trait]
impl DownloadBackend for SlskdClient {
    fn id(&self) -> &'static str {
        "slskd"
    }

    fn name(&self) -> &'static str {
        "slskd"
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchResult>> {
        let search_id = self.start_search(query).await?;
        self.wait_for_search(&search_id).await?;
        let results = self.search_responses(&search_id).await?;
        if let Err(e) = self.delete_search(&search_id).await {
            warn!("Failed to clean up search {search_id}: {e}");
        }
        Ok(results)
    }

    async fn enqueue(&self, candidate: &SearchResult) -> Result<()> {
        self.enqueue_download(candidate).await
    }

    async fn health_check(&self) -> bool {
        self.check_connection().await
    }
}
