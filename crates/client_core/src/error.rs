use shared::error::ApiErrorBody;
use thiserror::Error;

/// Everything that can go wrong between issuing a request and holding a
/// decoded response. The controller turns each of these into a notification.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("invalid server url '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("failed to build http client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{status} {reason}")]
    Server {
        status: u16,
        reason: String,
        body: ApiErrorBody,
    },
    #[error("{status} {reason} (unreadable error body)")]
    MalformedErrorBody {
        status: u16,
        reason: String,
        raw: String,
    },
    #[error("failed to encode request body for {url}: {source}")]
    Encode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

impl RequestError {
    /// Text shown to the user: the server's own message when it sent one,
    /// otherwise `<status>: <reason>` or the transport failure.
    pub fn user_message(&self) -> String {
        match self {
            RequestError::Server {
                status,
                reason,
                body,
            } => body
                .detail()
                .map(str::to_string)
                .unwrap_or_else(|| format!("{status}: {reason}")),
            RequestError::MalformedErrorBody { status, reason, .. } => {
                format!("{status}: {reason}")
            }
            other => other.to_string(),
        }
    }

    pub fn stack(&self) -> Option<&str> {
        match self {
            RequestError::Server { body, .. } => body.stack.as_deref(),
            _ => None,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            RequestError::Server { status, .. }
            | RequestError::MalformedErrorBody { status, .. } => Some(*status),
            RequestError::Transport { source, .. } => source.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
