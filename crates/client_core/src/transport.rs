//! HTTP access to a solver demo backend.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde_json::Value;
use shared::error::ApiErrorBody;
use tracing::debug;
use url::Url;

use crate::error::RequestError;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[async_trait]
pub trait Transport: Send + Sync {
    async fn get_json(&self, path: &str) -> Result<Value, RequestError>;
    async fn post_json(&self, path: &str, body: Option<&Value>) -> Result<(), RequestError>;
    async fn delete(&self, path: &str) -> Result<(), RequestError>;
}

pub struct HttpTransport {
    http: Client,
    base_url: Url,
}

impl HttpTransport {
    pub fn new(base_url: &str, request_timeout: Duration) -> Result<Self, RequestError> {
        let base_url = normalize_base_url(base_url)?;
        let http = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(RequestError::Client)?;
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Paths are resolved below the base url, so a base of
    /// `http://host/demo` and a path of `/rooms` yield `http://host/demo/rooms`.
    pub fn endpoint(&self, path: &str) -> Result<Url, RequestError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|source| RequestError::InvalidUrl {
                url: format!("{}{path}", self.base_url),
                source,
            })
    }
}

fn normalize_base_url(raw: &str) -> Result<Url, RequestError> {
    let trimmed = raw.trim();
    let with_slash = if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{trimmed}/")
    };
    Url::parse(&with_slash).map_err(|source| RequestError::InvalidUrl {
        url: raw.to_string(),
        source,
    })
}

fn transport_error(url: &Url, source: reqwest::Error) -> RequestError {
    RequestError::Transport {
        url: url.to_string(),
        source,
    }
}

async fn ensure_success(url: &Url, response: Response) -> Result<Response, RequestError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let reason = status
        .canonical_reason()
        .unwrap_or("Unknown Status")
        .to_string();
    let raw = response
        .text()
        .await
        .map_err(|source| transport_error(url, source))?;
    debug!(%url, status = status.as_u16(), "backend rejected request");

    match serde_json::from_str::<ApiErrorBody>(&raw) {
        Ok(body) => Err(RequestError::Server {
            status: status.as_u16(),
            reason,
            body,
        }),
        Err(_) => Err(RequestError::MalformedErrorBody {
            status: status.as_u16(),
            reason,
            raw,
        }),
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get_json(&self, path: &str) -> Result<Value, RequestError> {
        let url = self.endpoint(path)?;
        let response = self
            .http
            .get(url.clone())
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|source| transport_error(&url, source))?;
        let bytes = ensure_success(&url, response)
            .await?
            .bytes()
            .await
            .map_err(|source| transport_error(&url, source))?;
        serde_json::from_slice(&bytes).map_err(|source| RequestError::Decode {
            url: url.to_string(),
            source,
        })
    }

    async fn post_json(&self, path: &str, body: Option<&Value>) -> Result<(), RequestError> {
        let url = self.endpoint(path)?;
        let mut request = self.http.post(url.clone());
        request = match body {
            Some(body) => request.json(body),
            None => request.header(reqwest::header::CONTENT_TYPE, "application/json"),
        };
        let response = request
            .send()
            .await
            .map_err(|source| transport_error(&url, source))?;
        ensure_success(&url, response).await?;
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<(), RequestError> {
        let url = self.endpoint(path)?;
        let response = self
            .http
            .delete(url.clone())
            .send()
            .await
            .map_err(|source| transport_error(&url, source))?;
        ensure_success(&url, response).await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/transport_tests.rs"]
mod tests;
