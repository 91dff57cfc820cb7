//! Relay error types.
//!
//! Every failure the relay reports to a caller is one of these variants. The
//! status code and outward message are fixed per variant and rendered as
//! `{"message": "..."}` by the `IntoResponse` impl.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use crate::forward::ForwardError;

/// Which part of the signature header was unusable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureHeaderFault {
    /// Header missing, or not exactly `algorithm=digest`
    Shape,
    /// Digest is not valid hex
    Contents,
}

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("failed to read request body: {0}")]
    BodyRead(String),

    #[error("webhook does not exist")]
    WebhookNotFound,

    #[error("malformed signature header ({0:?})")]
    MalformedSignatureHeader(SignatureHeaderFault),

    #[error("malformed signature header, unknown algo: {0}")]
    UnknownAlgorithm(String),

    #[error("invalid signature")]
    InvalidSignature,

    #[error("webhook already exists")]
    AlreadyExists,

    #[error("invalid secret, must be base64: {0}")]
    InvalidSecretEncoding(String),

    #[error("invalid request body: {0}")]
    InvalidRequestBody(String),

    #[error("malformed ping event: {0}")]
    MalformedPingEvent(String),

    #[error(transparent)]
    Forward(#[from] ForwardError),
}

impl RelayError {
    /// HTTP status reported for this failure.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BodyRead(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::WebhookNotFound => StatusCode::NOT_FOUND,
            Self::MalformedSignatureHeader(_) => StatusCode::BAD_REQUEST,
            Self::UnknownAlgorithm(_) => StatusCode::BAD_REQUEST,
            Self::InvalidSignature => StatusCode::FORBIDDEN,
            Self::AlreadyExists => StatusCode::CONFLICT,
            Self::InvalidSecretEncoding(_) => StatusCode::BAD_REQUEST,
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::MalformedPingEvent(_) => StatusCode::BAD_REQUEST,
            Self::Forward(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message placed in the response envelope.
    ///
    /// Differs from `Display` where the log line carries more detail than the
    /// caller should see (body read causes, the offending algorithm token).
    pub fn message(&self) -> String {
        match self {
            Self::BodyRead(_) => "failed to read request body".to_string(),
            Self::MalformedSignatureHeader(SignatureHeaderFault::Shape) => {
                "malformed signature header".to_string()
            }
            Self::MalformedSignatureHeader(SignatureHeaderFault::Contents) => {
                "malformed signature header, unknown contents".to_string()
            }
            Self::UnknownAlgorithm(_) => "malformed signature header, unknown algo".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, status = status.as_u16(), "relay_request_failed");
        }

        (
            status,
            Json(serde_json::json!({ "message": self.message() })),
        )
            .into_response()
    }
}
