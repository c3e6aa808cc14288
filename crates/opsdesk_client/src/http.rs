use std::fmt;

use async_trait::async_trait;
use opsdesk_contract::{FileRecord, ListKind, OperationResult};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, warn};

use crate::transport::OpsTransport;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8080/api/ops";

const MALFORMED_RESPONSE: &str = "malformed ops response";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Get,
    Post,
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verb::Get => f.write_str("GET"),
            Verb::Post => f.write_str("POST"),
        }
    }
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request to {path} failed: {source}")]
    Network {
        path: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{path} returned HTTP {status}")]
    Status {
        path: String,
        status: u16,
        body: String,
    },
    #[error("cannot address {path} under {base_url}")]
    InvalidUrl { path: String, base_url: String },
    #[error("invalid JSON from {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Live transport talking JSON over HTTP to an ops backend.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Raw call. Non-2xx statuses are errors; a 2xx with an empty body
    /// yields `{"success": true}`.
    pub async fn call(
        &self,
        verb: Verb,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, TransportError> {
        let url = format!("{}{}", self.base_url, path);
        self.send(verb, url, path, body).await
    }

    /// Appends each segment percent-encoded, so ids with reserved
    /// characters stay a single path segment.
    fn endpoint(&self, segments: &[&str]) -> Result<reqwest::Url, TransportError> {
        let invalid = || TransportError::InvalidUrl {
            path: segments.join("/"),
            base_url: self.base_url.clone(),
        };
        let mut url = reqwest::Url::parse(&self.base_url).map_err(|_| invalid())?;
        url.path_segments_mut()
            .map_err(|_| invalid())?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send(
        &self,
        verb: Verb,
        url: impl reqwest::IntoUrl + fmt::Display,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, TransportError> {
        debug!(verb = %verb, url = %url, "ops api call");

        let mut request = match verb {
            Verb::Get => self.client.get(url),
            Verb::Post => self.client.post(url),
        };
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|source| TransportError::Network {
            path: path.to_string(),
            source,
        })?;
        let status = response.status();
        let text = response.text().await.map_err(|source| TransportError::Network {
            path: path.to_string(),
            source,
        })?;

        if !status.is_success() {
            return Err(TransportError::Status {
                path: path.to_string(),
                status: status.as_u16(),
                body: text,
            });
        }

        if text.trim().is_empty() {
            return Ok(json!({ "success": true }));
        }

        serde_json::from_str(&text).map_err(|source| TransportError::Decode {
            path: path.to_string(),
            source,
        })
    }

    async fn mutate(&self, action: &str, file_id: &str) -> OperationResult {
        let path = format!("/{action}/{file_id}");
        let sent = match self.endpoint(&[action, file_id]) {
            Ok(url) => self.send(Verb::Post, url, &path, None).await,
            Err(err) => Err(err),
        };
        match sent {
            Ok(value) => normalize_success(value),
            Err(TransportError::Status { status, body, .. }) => {
                let reason = server_error(&body).unwrap_or_else(|| format!("HTTP {status}"));
                warn!(path = %path, status, reason = %reason, "ops mutation rejected");
                OperationResult::rejected(reason)
            }
            Err(err) => {
                warn!(path = %path, error = %err, "ops mutation failed");
                OperationResult::rejected(err.to_string())
            }
        }
    }
}

#[async_trait]
impl OpsTransport for HttpTransport {
    async fn fetch_list(&self, kind: ListKind) -> Vec<FileRecord> {
        let path = kind.path();
        let decoded = self.call(Verb::Get, path, None).await.and_then(|value| {
            serde_json::from_value::<Vec<FileRecord>>(value).map_err(|source| {
                TransportError::Decode {
                    path: path.to_string(),
                    source,
                }
            })
        });

        match decoded {
            Ok(records) => records,
            Err(err) => {
                warn!(path, error = %err, "list fetch failed, rendering empty list");
                Vec::new()
            }
        }
    }

    async fn acknowledge(&self, file_id: &str) -> OperationResult {
        self.mutate("acknowledge", file_id).await
    }

    async fn transfer(&self, file_id: &str) -> OperationResult {
        self.mutate("transfer", file_id).await
    }
}

/// Backends answer either `{success, file?, error?}` or the bare record.
/// An empty body was already mapped to `{"success": true}` by `call`.
fn normalize_success(value: Value) -> OperationResult {
    if value.get("success").is_some() {
        return serde_json::from_value(value).unwrap_or_else(|err| {
            OperationResult::rejected(format!("malformed ops response: {err}"))
        });
    }

    match serde_json::from_value::<FileRecord>(value) {
        Ok(file) => OperationResult::ok(file),
        Err(err) => {
            warn!(error = %err, "unrecognized ops response body");
            OperationResult::rejected(MALFORMED_RESPONSE)
        }
    }
}

fn server_error(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value
        .get("error")
        .and_then(Value::as_str)
        .map(str::to_owned)
}
