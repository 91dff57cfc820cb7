//! Admission pipeline for proxied deliveries.
//!
//! A delivery must pass these stages in order before it is dispatched:
//!
//! ```text
//! capture body → resolve webhook → parse signature → verify signature
//! ```
//!
//! Each stage enriches the `RequestContext` or stops the request with a
//! `RelayError`. Nothing after a failed stage runs.

use axum::body::{Body, Bytes};
use axum::http::HeaderMap;
use tracing::{debug, info, warn};

use crate::error::{RelayError, SignatureHeaderFault};
use crate::registry::{Registry, WebhookRecord};
use crate::web::signature::{self, Signature, SIGNATURE_HEADER};

/// Per-request state built up by the pipeline stages.
#[derive(Debug)]
pub struct RequestContext {
    /// Exact bytes received; the signature covers these
    pub body: Bytes,
    pub webhook: Option<WebhookRecord>,
    pub signature: Option<Signature>,
}

impl RequestContext {
    pub fn new(body: Bytes) -> Self {
        Self {
            body,
            webhook: None,
            signature: None,
        }
    }
}

/// A delivery that passed every admission stage.
#[derive(Debug)]
pub struct Admitted {
    pub body: Bytes,
    pub webhook: WebhookRecord,
    pub signature: Signature,
}

/// Stage 1: read the whole body into memory.
pub async fn capture_body(body: Body, max_bytes: usize) -> Result<RequestContext, RelayError> {
    match axum::body::to_bytes(body, max_bytes).await {
        Ok(bytes) => Ok(RequestContext::new(bytes)),
        Err(e) => {
            warn!(error = %e, max_bytes = max_bytes, "request_body_read_failed");
            Err(RelayError::BodyRead(e.to_string()))
        }
    }
}

/// Stage 2: resolve the path-embedded webhook id.
pub async fn resolve_webhook(
    ctx: &mut RequestContext,
    registry: &Registry,
    webhook_id: &str,
) -> Result<(), RelayError> {
    match registry.get(webhook_id).await {
        Some(webhook) => {
            ctx.webhook = Some(webhook);
            Ok(())
        }
        None => {
            warn!(webhook_id = %webhook_id, "webhook_not_found");
            Err(RelayError::WebhookNotFound)
        }
    }
}

/// Stage 3: parse the signature header into algorithm and digest bytes.
pub fn parse_signature(ctx: &mut RequestContext, headers: &HeaderMap) -> Result<(), RelayError> {
    let value = match headers.get(SIGNATURE_HEADER) {
        Some(v) => match v.to_str() {
            Ok(s) => Some(s),
            Err(_) => {
                warn!("signature_header_not_ascii");
                return Err(RelayError::MalformedSignatureHeader(SignatureHeaderFault::Shape));
            }
        },
        None => None,
    };

    ctx.signature = Some(signature::parse_signature_header(value)?);
    Ok(())
}

/// Stage 4: check the digest against the captured body and webhook secret.
///
/// Fails closed if the earlier stages have not populated the context.
pub fn verify_signature(ctx: &RequestContext) -> Result<(), RelayError> {
    let (webhook, sig) = match (&ctx.webhook, &ctx.signature) {
        (Some(w), Some(s)) => (w, s),
        _ => return Err(RelayError::InvalidSignature),
    };

    if signature::verify(&ctx.body, sig, &webhook.secret) {
        Ok(())
    } else {
        warn!(
            webhook_id = %webhook.id,
            signature = %hex::encode(&sig.digest),
            body_length = ctx.body.len(),
            "signature_invalid"
        );
        Err(RelayError::InvalidSignature)
    }
}

/// Runs the admission stages for one delivery.
#[derive(Clone)]
pub struct AdmissionPipeline {
    registry: Registry,
    max_body_bytes: usize,
}

impl AdmissionPipeline {
    pub fn new(registry: Registry, max_body_bytes: usize) -> Self {
        Self {
            registry,
            max_body_bytes,
        }
    }

    pub async fn admit(
        &self,
        webhook_id: &str,
        headers: &HeaderMap,
        body: Body,
    ) -> Result<Admitted, RelayError> {
        debug!(
            webhook_id = %webhook_id,
            headers = ?headers.keys().map(|k| k.as_str()).collect::<Vec<_>>(),
            "delivery_received"
        );

        let mut ctx = capture_body(body, self.max_body_bytes).await?;
        resolve_webhook(&mut ctx, &self.registry, webhook_id).await?;
        parse_signature(&mut ctx, headers)?;
        verify_signature(&ctx)?;

        match (ctx.webhook, ctx.signature) {
            (Some(webhook), Some(signature)) => {
                info!(
                    webhook_id = %webhook.id,
                    body_length = ctx.body.len(),
                    "delivery_admitted"
                );
                Ok(Admitted {
                    body: ctx.body,
                    webhook,
                    signature,
                })
            }
            _ => Err(RelayError::InvalidSignature),
        }
    }
}
