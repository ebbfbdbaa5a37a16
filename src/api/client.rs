use super::types::{ErrorBody, FeedPage, NewPost, PageQuery, Post, UploadResponse};
use futures::StreamExt;
use reqwest::redirect::Policy;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Upper bound on any JSON response body.
const MAX_RESPONSE_SIZE: usize = 4 * 1024 * 1024; // 4MB

const POSTS_PATH: &str = "api/v1/posts";
const UPLOAD_PATH: &str = "api/v1/upload";

/// Errors from the feed server's REST surface.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[source] reqwest::Error),
    #[error("Request timed out")]
    Timeout,
    /// Non-2xx response that carried the server's `{error}` body
    #[error("{message} (HTTP {status})")]
    Server { status: u16, message: String },
    /// Non-2xx response without a readable error body
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    #[error("Invalid response: {0}")]
    Decode(String),
    #[error("Response too large")]
    ResponseTooLarge,
    #[error("Invalid server URL: {0}")]
    InvalidUrl(String),
    #[error("Failed to read {path}: {source}")]
    File {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ApiError::Timeout
        } else {
            ApiError::Network(e)
        }
    }
}

impl ApiError {
    /// True for failures worth retrying from the same position.
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::Network(_) | ApiError::Timeout => true,
            ApiError::Server { status, .. } | ApiError::HttpStatus(status) => *status >= 500,
            ApiError::Decode(_)
            | ApiError::ResponseTooLarge
            | ApiError::InvalidUrl(_)
            | ApiError::File { .. } => false,
        }
    }
}

/// Redirect policy: at most 3 hops, no loops.
fn create_redirect_policy() -> Policy {
    Policy::custom(|attempt| {
        if attempt.previous().len() >= 3 {
            return attempt.error("Too many redirects (max 3)");
        }
        if attempt
            .previous()
            .iter()
            .any(|prev| prev.as_str() == attempt.url().as_str())
        {
            return attempt.error("Redirect loop detected");
        }
        tracing::debug!(to = %attempt.url(), hop = attempt.previous().len() + 1, "Following redirect");
        attempt.follow()
    })
}

/// HTTP client for the feed server.
///
/// Cheap to clone: `reqwest::Client` is reference counted internally.
#[derive(Clone, Debug)]
pub struct ApiClient {
    http: reqwest::Client,
    base: Url,
}

impl ApiClient {
    /// Build a client for `server_url` with the given request timeout.
    pub fn new(server_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .redirect(create_redirect_policy())
            .pool_max_idle_per_host(4)
            .pool_idle_timeout(Duration::from_secs(30))
            .timeout(timeout)
            .build()?;
        Self::with_client(http, server_url)
    }

    fn with_client(http: reqwest::Client, server_url: &str) -> Result<Self, ApiError> {
        let mut base =
            Url::parse(server_url).map_err(|e| ApiError::InvalidUrl(format!("{server_url}: {e}")))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(ApiError::InvalidUrl(format!(
                "{server_url}: scheme must be http or https"
            )));
        }
        // Relative joins need a trailing slash or the last segment is replaced
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self { http, base })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        self.base
            .join(path)
            .map_err(|e| ApiError::InvalidUrl(format!("{path}: {e}")))
    }

    /// WebSocket URL of the real-time channel (`http` → `ws`, `https` → `wss`).
    pub fn channel_url(&self, ws_path: &str) -> Result<Url, ApiError> {
        let mut url = self.endpoint(ws_path.trim_start_matches('/'))?;
        let scheme = if url.scheme() == "https" { "wss" } else { "ws" };
        url.set_scheme(scheme)
            .map_err(|()| ApiError::InvalidUrl(format!("cannot use {scheme} for {url}")))?;
        Ok(url)
    }

    /// Fetch one page of the feed.
    pub async fn list_posts(&self, query: &PageQuery) -> Result<FeedPage, ApiError> {
        let url = self.endpoint(POSTS_PATH)?;
        tracing::debug!(
            tag = query.tag.as_deref().unwrap_or(""),
            has_cursor = query.cursor.is_some(),
            limit = query.limit,
            "Fetching feed page"
        );
        let response = self.http.get(url).query(&query.to_pairs()).send().await?;
        read_json(response).await
    }

    /// Create a post from an already-uploaded image.
    pub async fn create_post(&self, post: &NewPost) -> Result<Post, ApiError> {
        let url = self.endpoint(POSTS_PATH)?;
        let response = self.http.post(url).json(post).send().await?;
        let created: Post = read_json(response).await?;
        tracing::info!(post_id = %created.id, tags = created.tags.len(), "Post created");
        Ok(created)
    }

    /// Upload one image file and return the URL the server stored it under.
    pub async fn upload_image(&self, path: &Path, mime: &str) -> Result<String, ApiError> {
        let bytes = tokio::fs::read(path).await.map_err(|source| ApiError::File {
            path: path.display().to_string(),
            source,
        })?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        let size = bytes.len();

        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(mime)?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let url = self.endpoint(UPLOAD_PATH)?;
        let response = self.http.post(url).multipart(form).send().await?;
        let uploaded: UploadResponse = read_json(response).await?;
        tracing::info!(bytes = size, image_url = %uploaded.image_url, "Image uploaded");
        Ok(uploaded.image_url)
    }
}

/// Read a bounded body and decode it, mapping non-2xx to the server's error message.
async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
    let status = response.status();
    let body = read_limited_bytes(response, MAX_RESPONSE_SIZE).await?;

    if !status.is_success() {
        let code = status.as_u16();
        return Err(match serde_json::from_slice::<ErrorBody>(&body) {
            Ok(ErrorBody { error }) if !error.is_empty() => ApiError::Server {
                status: code,
                message: error,
            },
            _ => ApiError::HttpStatus(code),
        });
    }

    serde_json::from_slice(&body).map_err(|e| ApiError::Decode(e.to_string()))
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, ApiError> {
    if let Some(len) = response.content_length() {
        if len as usize > limit {
            return Err(ApiError::ResponseTooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(ApiError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }
    Ok(bytes)
}
