//! HTTP endpoint handlers.
//!
//! Registry management (`/hooks`, `/hooks/:id`), the delivery entry point
//! (`POST /hooks/:id`) and liveness/readiness probes.

use std::sync::Arc;

use anyhow::Result;
use axum::{
    body::Body,
    extract::{Path, State},
    http::{header::HOST, HeaderMap, StatusCode},
    response::Response,
    Json,
};
use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::Config;
use crate::dispatch::dispatch;
use crate::error::RelayError;
use crate::forward::Forwarder;
use crate::pipeline::{capture_body, AdmissionPipeline};
use crate::registry::{Registry, WebhookRecord};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub registry: Registry,
    pub pipeline: AdmissionPipeline,
    pub forwarder: Forwarder,
}

impl AppState {
    pub fn new(config: Config, registry: Registry, forwarder: Forwarder) -> Self {
        let pipeline = AdmissionPipeline::new(registry.clone(), config.max_body_bytes);
        Self {
            config: Arc::new(config),
            registry,
            pipeline,
            forwarder,
        }
    }

    /// Build state with an empty registry and a forwarder using the configured timeout.
    pub fn from_config(config: Config) -> Result<Self> {
        let forwarder = Forwarder::new(config.forward_timeout())?;
        Ok(Self::new(config, Registry::new(), forwarder))
    }
}

// =============================================================================
// Probes
// =============================================================================

pub async fn is_alive() -> &'static str {
    "is alive"
}

pub async fn is_ready() -> &'static str {
    "is ready"
}

// =============================================================================
// Registry management
// =============================================================================

/// Body of `POST /hooks`.
#[derive(Debug, Deserialize)]
pub struct CreateWebhookRequest {
    pub name: String,
    pub team: String,
    pub url: String,
    /// Base64-encoded shared secret
    pub secret: String,
}

/// Outward view of a webhook. The secret is never included.
#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    pub id: String,
    pub name: String,
    pub team: String,
    pub url: String,
    pub proxy_url: String,
    pub created_at: DateTime<Utc>,
}

impl WebhookResponse {
    fn render(webhook: WebhookRecord, config: &Config, headers: &HeaderMap) -> Self {
        let proxy_url = proxy_url(config, headers, &webhook.id);
        Self {
            id: webhook.id,
            name: webhook.name,
            team: webhook.team,
            url: webhook.url,
            proxy_url,
            created_at: webhook.created_at,
        }
    }
}

/// Public URL at which a webhook receives deliveries.
///
/// Uses `PUBLIC_URL` when configured, then the request's `Host` header,
/// and falls back to a path relative to the serving address.
pub fn proxy_url(config: &Config, headers: &HeaderMap, id: &str) -> String {
    if let Some(base) = &config.public_url {
        return format!("{}/hooks/{}", base, id);
    }

    match headers.get(HOST).and_then(|v| v.to_str().ok()) {
        Some(host) if !host.is_empty() => format!("http://{}/hooks/{}", host, id),
        _ => format!("/hooks/{}", id),
    }
}

pub async fn list_hooks(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Json<Vec<WebhookResponse>> {
    let webhooks = state
        .registry
        .list()
        .await
        .into_iter()
        .map(|w| WebhookResponse::render(w, &state.config, &headers))
        .collect();

    Json(webhooks)
}

pub async fn create_hook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Body,
) -> Result<(StatusCode, Json<WebhookResponse>), RelayError> {
    let ctx = capture_body(body, state.config.max_body_bytes).await?;

    let request: CreateWebhookRequest = serde_json::from_slice(&ctx.body).map_err(|e| {
        warn!(error = %e, "create_webhook_invalid_body");
        RelayError::InvalidRequestBody(e.to_string())
    })?;

    let secret = base64::engine::general_purpose::STANDARD
        .decode(request.secret.as_bytes())
        .map_err(|e| {
            warn!(team = %request.team, name = %request.name, error = %e, "create_webhook_invalid_secret");
            RelayError::InvalidSecretEncoding(e.to_string())
        })?;

    if let Err(e) = url::Url::parse(&request.url) {
        warn!(url = %request.url, error = %e, "create_webhook_invalid_url");
        return Err(RelayError::InvalidRequestBody(format!("invalid url: {}", e)));
    }

    let webhook = state
        .registry
        .create(&request.name, &request.team, &request.url, secret)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(WebhookResponse::render(webhook, &state.config, &headers)),
    ))
}

pub async fn get_hook(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<WebhookResponse>, RelayError> {
    match state.registry.get(&id).await {
        Some(webhook) => Ok(Json(WebhookResponse::render(webhook, &state.config, &headers))),
        None => {
            info!(webhook_id = %id, "webhook_not_found");
            Err(RelayError::WebhookNotFound)
        }
    }
}

pub async fn delete_hook(State(state): State<AppState>, Path(id): Path<String>) -> StatusCode {
    state.registry.delete(&id).await;
    StatusCode::NO_CONTENT
}

// =============================================================================
// Deliveries
// =============================================================================

/// Delivery entry point: admit, then ping-acknowledge or forward.
pub async fn receive_hook(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Body,
) -> Result<Response, RelayError> {
    let admitted = state.pipeline.admit(&id, &headers, body).await?;
    dispatch(admitted, &headers, &state.forwarder).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_proxy_url_relative_without_host() {
        let config = Config::default();
        assert_eq!(proxy_url(&config, &HeaderMap::new(), "abc"), "/hooks/abc");
    }

    #[test]
    fn test_proxy_url_from_host_header() {
        let config = Config::default();
        let mut headers = HeaderMap::new();
        headers.insert(HOST, HeaderValue::from_static("relay.internal:8080"));
        assert_eq!(
            proxy_url(&config, &headers, "abc"),
            "http://relay.internal:8080/hooks/abc"
        );
    }

    #[test]
    fn test_proxy_url_prefers_public_url() {
        let config = Config {
            public_url: Some("https://relay.example.com".to_string()),
            ..Config::default()
        };
        let mut headers = HeaderMap::new();
        headers.insert(HOST, HeaderValue::from_static("relay.internal:8080"));
        assert_eq!(
            proxy_url(&config, &headers, "abc"),
            "https://relay.example.com/hooks/abc"
        );
    }

    #[test]
    fn test_webhook_response_omits_secret() {
        let webhook = WebhookRecord {
            id: "abc".to_string(),
            name: "hook".to_string(),
            team: "team".to_string(),
            url: "http://forward.tld".to_string(),
            secret: b"foobar".to_vec(),
            created_at: Utc::now(),
        };
        let rendered =
            serde_json::to_value(WebhookResponse::render(webhook, &Config::default(), &HeaderMap::new()))
                .unwrap();

        assert!(rendered.get("secret").is_none());
        assert_eq!(rendered["proxy_url"], "/hooks/abc");
    }
}
