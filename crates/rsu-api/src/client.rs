//! HTTP client for the sc2replaystats API.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::error::{ApiError, ApiResult};
use crate::service::{ReplayService, ReplayStatus, RequestId};

/// Identifies this uploader to the service.
const UPLOAD_METHOD: &str = "sc2-rsu";
const REPLAY_CONTENT_TYPE: &str = "application/octet-stream";
const FALLBACK_FILE_NAME: &str = "replay.SC2Replay";

#[derive(Debug, Deserialize)]
struct UploadResponse {
    #[serde(default)]
    replay_queue_id: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    #[serde(default)]
    replay_id: Option<Value>,
}

/// reqwest-backed [`ReplayService`] implementation.
///
/// Cloning is cheap; the underlying connection pool is shared.
#[derive(Debug, Clone)]
pub struct Sc2ReplayStatsClient {
    client: Client,
    api_root: Url,
    api_key: String,
}

impl Sc2ReplayStatsClient {
    /// Build a client for `api_root` authenticating with a pre-validated `api_key`.
    ///
    /// # Errors
    ///
    /// Returns an error if `api_root` is not a valid base URL or the HTTP
    /// client cannot be constructed.
    pub fn new(api_root: &str, api_key: impl Into<String>, timeout: Duration) -> ApiResult<Self> {
        let api_root = parse_root(api_root)?;
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("sc2-rsu/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|source| ApiError::ClientBuild { source })?;

        Ok(Self {
            client,
            api_root,
            api_key: api_key.into().trim().to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> ApiResult<Url> {
        self.api_root
            .join(path)
            .map_err(|err| ApiError::InvalidRoot {
                value: self.api_root.to_string(),
                reason: err.to_string(),
            })
    }
}

#[async_trait]
impl ReplayService for Sc2ReplayStatsClient {
    async fn upload_replay(&self, path: &Path) -> ApiResult<RequestId> {
        const OPERATION: &str = "replay.upload";

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| ApiError::ReadReplay {
                path: path.to_path_buf(),
                source,
            })?;
        let file_name = path
            .file_name()
            .map_or_else(|| FALLBACK_FILE_NAME.to_string(), |name| {
                name.to_string_lossy().into_owned()
            });
        debug!(path = %path.display(), bytes = bytes.len(), "submitting replay");

        let url = self.endpoint("replay")?;
        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(REPLAY_CONTENT_TYPE)
            .map_err(|source| ApiError::http(OPERATION, url.as_str(), source))?;
        let form = Form::new()
            .text("upload_method", UPLOAD_METHOD)
            .part("replay_file", part);

        let response = self
            .client
            .post(url.clone())
            .header(AUTHORIZATION, &self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|source| ApiError::http(OPERATION, url.as_str(), source))?;

        let body: UploadResponse = decode(OPERATION, url.as_str(), response).await?;
        body.replay_queue_id
            .and_then(resolved_value)
            .map(RequestId::new)
            .ok_or(ApiError::MissingField {
                operation: OPERATION,
                field: "replay_queue_id",
            })
    }

    async fn replay_status(&self, rqid: &RequestId) -> ApiResult<ReplayStatus> {
        const OPERATION: &str = "replay.status";

        let url = self.endpoint(&format!("replay/status/{rqid}"))?;
        let response = self
            .client
            .get(url.clone())
            .header(AUTHORIZATION, &self.api_key)
            .send()
            .await
            .map_err(|source| ApiError::http(OPERATION, url.as_str(), source))?;

        let body: StatusResponse = decode(OPERATION, url.as_str(), response).await?;
        Ok(ReplayStatus::from_resolved(
            body.replay_id.and_then(resolved_value),
        ))
    }
}

fn parse_root(raw: &str) -> ApiResult<Url> {
    let trimmed = raw.trim();
    let normalised = if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{trimmed}/")
    };
    let url = Url::parse(&normalised).map_err(|err| ApiError::InvalidRoot {
        value: raw.to_string(),
        reason: err.to_string(),
    })?;
    if url.cannot_be_a_base() {
        return Err(ApiError::InvalidRoot {
            value: raw.to_string(),
            reason: "cannot be a base URL".to_string(),
        });
    }
    Ok(url)
}

async fn decode<T: DeserializeOwned>(
    operation: &'static str,
    url: &str,
    response: Response,
) -> ApiResult<T> {
    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|source| ApiError::http(operation, url, source))?;

    if !status.is_success() {
        return Err(ApiError::Status {
            operation,
            status: status.as_u16(),
            body: text.trim().to_string(),
        });
    }

    serde_json::from_str(&text).map_err(|source| ApiError::Decode { operation, source })
}

/// The service reports identifiers as strings or bare numbers; null and empty mean "none".
fn resolved_value(value: Value) -> Option<String> {
    match value {
        Value::String(raw) if !raw.trim().is_empty() => Some(raw),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}
