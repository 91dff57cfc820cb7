//! Web server module for the relay's HTTP surface.
//!
//! This module provides:
//! - Registry management endpoints under `/hooks`
//! - The signed delivery entry point `POST /hooks/:id`
//! - Liveness and readiness probes

pub mod handlers;
pub mod routes;
pub mod signature;

pub use handlers::{proxy_url, AppState, CreateWebhookRequest, WebhookResponse};
pub use routes::router;
pub use signature::{parse_signature_header, verify_sha1_mac, Signature, SIGNATURE_HEADER};
