//! HTTP adapter for the notekeep API.
//!
//! Responses arrive in the `{success, data?, message?, pagination?, meta?}`
//! envelope. Reads tolerate a missing `data` field and return empty results;
//! operations that must return a note treat it as an error. Only reads are
//! retried.

use std::time::Duration;

use reqwest::{Client, RequestBuilder};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::Value as JsonValue;
use tracing::{debug, warn};
use uuid::Uuid;

use notekeep_core::{
    CreateNoteRequest, Note, NotePatch, PaginationMeta, SearchHit, SortField, SortOrder,
    DEFAULT_PAGE_LIMIT,
};

use crate::error::{ClientError, Result};

/// Default API endpoint.
pub const DEFAULT_BASE_URL: &str = "http://localhost:5000";

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Default number of retries for reads.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default delay before the first retry; doubled on each further attempt.
pub const DEFAULT_RETRY_BASE_DELAY: Duration = Duration::from_secs(1);

/// Configuration for [`NotesClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server root, without the `/api` prefix.
    pub base_url: String,
    pub timeout: Duration,
    pub max_retries: u32,
    pub retry_base_delay: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_retries: DEFAULT_MAX_RETRIES,
            retry_base_delay: DEFAULT_RETRY_BASE_DELAY,
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Read `NOTEKEEP_API_URL` and `NOTEKEEP_TIMEOUT_SECS`, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            base_url: std::env::var("NOTEKEEP_API_URL")
                .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            timeout: std::env::var("NOTEKEEP_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
            ..Self::default()
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.max_retries = n;
        self
    }

    pub fn retry_base_delay(mut self, delay: Duration) -> Self {
        self.retry_base_delay = delay;
        self
    }

    /// Delay before retry number `attempt` (0-based).
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        self.retry_base_delay
            .saturating_mul(2u32.saturating_pow(attempt))
    }
}

/// List parameters. Unset fields use the server defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteFilter {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub sort_by: Option<SortField>,
    pub sort_order: Option<SortOrder>,
    pub archived: Option<bool>,
    pub search: Option<String>,
}

impl NoteFilter {
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(page) = self.page {
            pairs.push(("page", page.to_string()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit", limit.to_string()));
        }
        if let Some(field) = self.sort_by {
            pairs.push(("sortBy", field.as_str().to_string()));
        }
        if let Some(order) = self.sort_order {
            pairs.push(("sortOrder", order.as_str().to_string()));
        }
        if let Some(archived) = self.archived {
            pairs.push(("archived", archived.to_string()));
        }
        if let Some(search) = self.search.as_deref().filter(|s| !s.trim().is_empty()) {
            pairs.push(("search", search.to_string()));
        }
        pairs
    }
}

/// One page of notes.
#[derive(Debug, Clone, PartialEq)]
pub struct NoteList {
    pub notes: Vec<Note>,
    pub pagination: PaginationMeta,
}

/// Body of `GET /health`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub database: Option<String>,
    #[serde(default)]
    pub environment: Option<String>,
    #[serde(default)]
    pub uptime: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: Option<T>,
    pagination: Option<PaginationMeta>,
}

/// HTTP client for the notes API.
#[derive(Debug, Clone)]
pub struct NotesClient {
    http: Client,
    config: ClientConfig,
}

impl NotesClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ClientError::transport(&e))?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Send once and return the status plus decoded body of a success response.
    async fn execute(&self, request: RequestBuilder) -> Result<(u16, JsonValue)> {
        let response = request.send().await.map_err(|e| ClientError::transport(&e))?;
        let status = response.status().as_u16();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ClientError::transport(&e))?;
        let body: Option<JsonValue> = serde_json::from_slice(&bytes).ok();

        if !(200..300).contains(&status) {
            return Err(ClientError::from_response(status, body.as_ref()));
        }
        Ok((status, body.unwrap_or(JsonValue::Null)))
    }

    /// Send a read, retrying transport failures and 5xx responses.
    async fn read<F>(&self, op: &'static str, build: F) -> Result<(u16, JsonValue)>
    where
        F: Fn() -> RequestBuilder,
    {
        let mut attempt = 0;
        loop {
            match self.execute(build()).await {
                Err(err) if err.is_retryable() && attempt < self.config.max_retries => {
                    let delay = self.config.retry_delay(attempt);
                    attempt += 1;
                    warn!(
                        subsystem = "client",
                        op,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        code = %err.code,
                        error = %err,
                        "Retrying request"
                    );
                    tokio::time::sleep(delay).await;
                }
                other => return other,
            }
        }
    }

    fn decode<T: DeserializeOwned>(status: u16, body: JsonValue) -> Result<Envelope<T>> {
        if body.is_null() {
            return Ok(Envelope {
                data: None,
                pagination: None,
            });
        }
        serde_json::from_value(body).map_err(|e| ClientError::invalid_body(status, e))
    }

    fn entity<T: DeserializeOwned>(op: &str, status: u16, body: JsonValue) -> Result<T> {
        Self::decode::<T>(status, body)?
            .data
            .ok_or_else(|| ClientError::missing_data(op, status))
    }

    /// `GET /health`.
    pub async fn health(&self) -> Result<HealthStatus> {
        let (status, body) = self
            .read("health", || self.http.get(self.url("/health")))
            .await?;
        serde_json::from_value(body).map_err(|e| ClientError::invalid_body(status, e))
    }

    /// `GET /api/notes`.
    pub async fn list_notes(&self, filter: &NoteFilter) -> Result<NoteList> {
        let pairs = filter.query_pairs();
        let (status, body) = self
            .read("list", || self.http.get(self.url("/api/notes")).query(&pairs))
            .await?;
        let envelope = Self::decode::<Vec<Note>>(status, body)?;
        let notes = envelope.data.unwrap_or_default();
        debug!(
            subsystem = "client",
            op = "list",
            result_count = notes.len(),
            "Fetched notes"
        );
        let pagination = envelope.pagination.unwrap_or_else(|| {
            PaginationMeta::new(
                filter.page.unwrap_or(1),
                filter.limit.unwrap_or(DEFAULT_PAGE_LIMIT),
                notes.len() as u64,
            )
        });
        Ok(NoteList { notes, pagination })
    }

    /// `GET /api/notes/search`.
    pub async fn search_notes(&self, query: &str, limit: Option<u32>) -> Result<Vec<SearchHit>> {
        let mut pairs = vec![("q", query.to_string())];
        if let Some(limit) = limit {
            pairs.push(("limit", limit.to_string()));
        }
        let (status, body) = self
            .read("search", || {
                self.http.get(self.url("/api/notes/search")).query(&pairs)
            })
            .await?;
        Ok(Self::decode::<Vec<SearchHit>>(status, body)?
            .data
            .unwrap_or_default())
    }

    /// `GET /api/notes/:id`.
    pub async fn get_note(&self, id: Uuid) -> Result<Note> {
        let url = self.url(&format!("/api/notes/{}", id));
        let (status, body) = self.read("get", || self.http.get(&url)).await?;
        Self::entity("get", status, body)
    }

    /// `POST /api/notes`.
    pub async fn create_note(&self, req: &CreateNoteRequest) -> Result<Note> {
        let (status, body) = self
            .execute(self.http.post(self.url("/api/notes")).json(req))
            .await?;
        Self::entity("create", status, body)
    }

    /// `PUT /api/notes/:id`.
    pub async fn update_note(&self, id: Uuid, patch: &NotePatch) -> Result<Note> {
        let url = self.url(&format!("/api/notes/{}", id));
        let (status, body) = self.execute(self.http.put(url).json(patch)).await?;
        Self::entity("update", status, body)
    }

    /// `DELETE /api/notes/:id`.
    pub async fn delete_note(&self, id: Uuid) -> Result<()> {
        let url = self.url(&format!("/api/notes/{}", id));
        self.execute(self.http.delete(url)).await?;
        Ok(())
    }

    /// `PATCH /api/notes/:id/archive`.
    pub async fn toggle_archive(&self, id: Uuid) -> Result<Note> {
        let url = self.url(&format!("/api/notes/{}/archive", id));
        let (status, body) = self.execute(self.http.patch(url)).await?;
        Self::entity("toggle_archive", status, body)
    }
}
