//! Proxy error type
//!
//! Maps request failures to an HTTP status and the JSON error body sent to clients.

use hyper::StatusCode;
use serde_json::{json, Value};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProxyError {
    #[error("missing outlet id")]
    MissingOutletId,

    #[error("malformed outlet id")]
    MalformedOutletId,

    #[error("invalid upstream url '{url}': {reason}")]
    InvalidUpstreamUrl { url: String, reason: String },

    #[error("{0}")]
    Upstream(#[from] reqwest::Error),

    #[error("failed to build http client: {0}")]
    ClientInit(String),
}

impl ProxyError {
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::MissingOutletId | Self::MalformedOutletId => StatusCode::BAD_REQUEST,
            Self::InvalidUpstreamUrl { .. } | Self::Upstream(_) | Self::ClientInit(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// `{"error": ...}` for client errors, `{"error":"proxy_error","message": ...}` otherwise
    pub fn body(&self) -> Value {
        if self.status().is_client_error() {
            json!({ "error": self.to_string() })
        } else {
            json!({ "error": "proxy_error", "message": self.to_string() })
        }
    }
}
