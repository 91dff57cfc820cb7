//! HookRelay - signed webhook relay.
//!
//! Registers webhook endpoints and relays verified deliveries to each
//! endpoint's downstream URL.
//!
//! ## Delivery flow
//!
//! ```text
//! POST /hooks/:id → admission pipeline → dispatcher → ping ack | forwarder → caller
//! ```
//!
//! The admission pipeline captures the body, resolves the webhook, then
//! parses and verifies the `X-Hub-Signature` HMAC before anything is
//! forwarded.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod forward;
pub mod pipeline;
pub mod registry;
pub mod web;

// Re-export commonly used types
pub use config::Config;
pub use error::RelayError;
pub use forward::{ForwardError, Forwarder};
pub use pipeline::{AdmissionPipeline, RequestContext};
pub use registry::{derive_id, Registry, WebhookRecord};
pub use web::{router, AppState};
