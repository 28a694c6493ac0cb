//! HTTP client for the note server.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use super::{HealthCheck, RemoteNoteStore};
use crate::error::{Error, Result};
use crate::models::{Note, NoteKey};
use crate::util::{compact_text, is_http_url, normalize_text_option};

const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(3);

/// Talks to `/v1/books/{book}/records/{record}/note` and `/healthz`.
#[derive(Clone)]
pub struct HttpNoteStore {
    base_url: String,
    client: Client,
}

impl std::fmt::Debug for HttpNoteStore {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("HttpNoteStore")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl HttpNoteStore {
    pub fn new(base_url: impl Into<String>, request_timeout: Duration) -> Result<Self> {
        let base_url = normalize_base_url(base_url.into())?;
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|error| Error::Config(format!("failed to build HTTP client: {error}")))?;
        Ok(Self { base_url, client })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn note_url(&self, key: &NoteKey) -> String {
        format!(
            "{}/v1/books/{}/records/{}/note",
            self.base_url,
            urlencoding::encode(&key.book_key),
            urlencoding::encode(&key.record_uuid)
        )
    }
}

#[async_trait]
impl RemoteNoteStore for HttpNoteStore {
    async fn fetch_note(&self, key: &NoteKey) -> Result<Option<Note>> {
        let response = self
            .client
            .get(self.note_url(key))
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api(parse_api_error(status, &body)));
        }

        let note = response
            .json::<Note>()
            .await
            .map_err(|error| Error::Api(format!("invalid note payload: {error}")))?;
        Ok(Some(note))
    }

    async fn save_note(&self, key: &NoteKey, note: &Note) -> Result<Note> {
        let response = self
            .client
            .put(self.note_url(key))
            .header("Accept", "application/json")
            .json(note)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if status == StatusCode::CONFLICT {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::VersionConflict {
                server_version: parse_conflict_version(&body),
            });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api(parse_api_error(status, &body)));
        }

        response
            .json::<Note>()
            .await
            .map_err(|error| Error::Api(format!("invalid saved note payload: {error}")))
    }
}

#[async_trait]
impl HealthCheck for HttpNoteStore {
    async fn is_server_reachable(&self) -> bool {
        let result = self
            .client
            .get(format!("{}/healthz", self.base_url))
            .timeout(HEALTH_CHECK_TIMEOUT)
            .send()
            .await;
        match result {
            Ok(response) => response.status().is_success(),
            Err(error) => {
                tracing::debug!("Health check against {} failed: {}", self.base_url, error);
                false
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<String>,
    message: Option<String>,
    server_version: Option<i64>,
}

fn transport_error(error: reqwest::Error) -> Error {
    Error::Network(error.to_string())
}

fn parse_conflict_version(body: &str) -> Option<i64> {
    serde_json::from_str::<ApiErrorBody>(body)
        .ok()
        .and_then(|payload| payload.server_version)
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ApiErrorBody>(body) {
        if let Some(message) = payload.message.or(payload.error) {
            return format!("{} ({})", message.trim(), status.as_u16());
        }
    }

    let trimmed = compact_text(body);
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("{} ({})", trimmed, status.as_u16())
    }
}

fn normalize_base_url(raw: String) -> Result<String> {
    let base_url = normalize_text_option(Some(raw))
        .ok_or_else(|| Error::Config("server URL must not be empty".to_string()))?;
    if is_http_url(&base_url) {
        Ok(base_url.trim_end_matches('/').to_string())
    } else {
        Err(Error::Config(
            "server URL must include http:// or https://".to_string(),
        ))
    }
}
