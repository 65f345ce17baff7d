use serde::{Deserialize, Serialize};
use shared::error::{ApiError, ErrorCode};
use thiserror::Error;

/// Failure of a single REST call. Stored verbatim in the employee state, so it
/// carries rendered messages rather than source errors.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GatewayError {
    #[error("request failed: {message}")]
    Transport { message: String },
    #[error("server responded with status {status}{}", status_detail(.message))]
    Status {
        status: u16,
        #[serde(default)]
        message: Option<String>,
    },
    #[error("invalid response body: {message}")]
    Decode { message: String },
}

fn status_detail(message: &Option<String>) -> String {
    message
        .as_deref()
        .map(|message| format!(": {message}"))
        .unwrap_or_default()
}

impl GatewayError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    pub fn status(status: u16, message: Option<String>) -> Self {
        Self::Status { status, message }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Status { status, .. } => ErrorCode::from_status(*status),
            Self::Transport { .. } | Self::Decode { .. } => ErrorCode::Unknown,
        }
    }

    pub fn to_api_error(&self) -> ApiError {
        ApiError::new(self.code(), self.to_string())
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::decode(err.to_string())
        } else {
            Self::transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        Self::decode(err.to_string())
    }
}

#[derive(Debug, Error)]
pub enum StreamError {
    #[error("invalid event stream url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("websocket failure: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("event stream handshake failed: {0}")]
    Handshake(String),
    #[error("malformed event stream packet: {0}")]
    Packet(String),
    #[error("event stream is closed")]
    Closed,
}
