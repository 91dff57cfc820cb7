//! Routes admitted deliveries by event type.
//!
//! Ping events are acknowledged locally. Everything else, including
//! deliveries without an event header, is forwarded downstream.

use axum::body::Body;
use axum::http::{header::CONTENT_TYPE, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::RelayError;
use crate::forward::{Forwarded, Forwarder};
use crate::pipeline::Admitted;

/// Header carrying the sender's event classification.
pub const EVENT_HEADER: &str = "X-Github-Event";

/// Event header value of a liveness check from the sender.
pub const PING_EVENT: &str = "ping";

/// Classification of an admitted delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    Ping,
    Other(Option<String>),
}

impl EventKind {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        match headers.get(EVENT_HEADER).and_then(|v| v.to_str().ok()) {
            Some(PING_EVENT) => EventKind::Ping,
            Some(other) => EventKind::Other(Some(other.to_string())),
            None => EventKind::Other(None),
        }
    }
}

/// Ping delivery body. Only `zen` is echoed back.
#[derive(Debug, Deserialize)]
pub struct PingEvent {
    #[serde(default)]
    pub zen: String,
    #[serde(default)]
    pub hook_id: Option<i64>,
    #[serde(default)]
    pub hook: Option<serde_json::Value>,
}

/// Ping acknowledgement.
#[derive(Debug, Serialize)]
pub struct PingResponse {
    pub zen: String,
}

/// Answer a ping without contacting the downstream target.
pub fn acknowledge_ping(admitted: &Admitted) -> Result<Response, RelayError> {
    let event: PingEvent = serde_json::from_slice(&admitted.body).map_err(|e| {
        warn!(webhook_id = %admitted.webhook.id, error = %e, "ping_event_malformed");
        RelayError::MalformedPingEvent(e.to_string())
    })?;

    info!(
        webhook_id = %admitted.webhook.id,
        hook_id = ?event.hook_id,
        "ping_acknowledged"
    );

    Ok((StatusCode::ACCEPTED, Json(PingResponse { zen: event.zen })).into_response())
}

/// Turn a downstream response into the response for the original caller.
pub fn relay_response(forwarded: Forwarded) -> Response {
    let status = StatusCode::from_u16(forwarded.status).unwrap_or(StatusCode::BAD_GATEWAY);
    let mut response = Response::new(Body::from(forwarded.body));
    *response.status_mut() = status;

    if let Some(content_type) = forwarded
        .content_type
        .and_then(|ct| HeaderValue::from_str(&ct).ok())
    {
        response.headers_mut().insert(CONTENT_TYPE, content_type);
    }

    response
}

/// Dispatch an admitted delivery to the ping path or the forwarder.
pub async fn dispatch(
    admitted: Admitted,
    headers: &HeaderMap,
    forwarder: &Forwarder,
) -> Result<Response, RelayError> {
    match EventKind::from_headers(headers) {
        EventKind::Ping => acknowledge_ping(&admitted),
        EventKind::Other(event) => {
            info!(
                webhook_id = %admitted.webhook.id,
                event = ?event,
                url = %admitted.webhook.url,
                "delivery_forwarding"
            );
            let forwarded = forwarder
                .forward(&admitted.webhook.url, admitted.body)
                .await?;
            Ok(relay_response(forwarded))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::WebhookRecord;
    use crate::web::signature::{Signature, SignatureAlgorithm};
    use axum::body::Bytes;
    use chrono::Utc;
    use std::time::Duration;

    fn admitted(body: &'static str, url: &str) -> Admitted {
        Admitted {
            body: Bytes::from_static(body.as_bytes()),
            webhook: WebhookRecord {
                id: "hook-id".to_string(),
                name: "hook".to_string(),
                team: "team".to_string(),
                url: url.to_string(),
                secret: b"foobar".to_vec(),
                created_at: Utc::now(),
            },
            signature: Signature {
                algorithm: SignatureAlgorithm::HmacSha1,
                digest: vec![],
            },
        }
    }

    fn event_headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("x-github-event", HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_event_kind_from_headers() {
        assert_eq!(EventKind::from_headers(&event_headers("ping")), EventKind::Ping);
        assert_eq!(
            EventKind::from_headers(&event_headers("push")),
            EventKind::Other(Some("push".to_string()))
        );
        assert_eq!(EventKind::from_headers(&HeaderMap::new()), EventKind::Other(None));
    }

    #[tokio::test]
    async fn test_ping_is_acknowledged_without_forwarding() {
        // Unroutable target: a forward attempt would fail the test.
        let forwarder = Forwarder::new(Duration::from_millis(50)).unwrap();
        let delivery = admitted(
            r#"{"zen":"Mind your words, they are important.","hook_id":42}"#,
            "http://127.0.0.1:1/unreachable",
        );

        let response = dispatch(delivery, &event_headers("ping"), &forwarder)
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], br#"{"zen":"Mind your words, they are important."}"#);
    }

    #[test]
    fn test_ping_with_invalid_json() {
        let delivery = admitted("not json", "http://forward.tld");
        let err = acknowledge_ping(&delivery).unwrap_err();
        assert!(matches!(err, RelayError::MalformedPingEvent(_)));
    }

    #[tokio::test]
    async fn test_forward_failure_is_reported() {
        let forwarder = Forwarder::new(Duration::from_millis(200)).unwrap();
        let delivery = admitted("{}", "http://127.0.0.1:1/unreachable");

        let err = dispatch(delivery, &event_headers("push"), &forwarder)
            .await
            .unwrap_err();
        assert!(matches!(err, RelayError::Forward(_)));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_relay_response_copies_status_and_type() {
        let response = relay_response(Forwarded {
            status: 418,
            content_type: Some("text/plain".to_string()),
            body: Bytes::from_static(b"teapot"),
        });
        assert_eq!(response.status(), StatusCode::IM_A_TEAPOT);
        assert_eq!(response.headers()[CONTENT_TYPE], "text/plain");
    }
}
