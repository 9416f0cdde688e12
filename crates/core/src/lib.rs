//! # igsession Core
//!
//! Pure request logic - no network or filesystem code.
//!
//! This crate contains:
//! - Payload signing
//! - Response decoding and success decisions
//! - Failed-response classification
//! - Session patches derived from response headers
//! - Per-mode header profiles
//! - Port interfaces (traits) for persistence
//!
//! ## Architecture Principles
//! - Only depends on `igsession-domain`
//! - All I/O via traits implemented in `igsession-infra`

pub mod classifier;
pub mod decode;
pub mod headers;
pub mod outcome;
pub mod signing;
pub mod state_update;

// Infrastructure ports
pub mod ports;

// Re-export specific items to avoid ambiguity
pub use classifier::{classify, classify_and_apply, Classification, Rule, RULES};
pub use decode::{decode_body, is_success_status, preserve_large_integers};
pub use headers::{merge_headers, AppHeaders, WebHeaders};
pub use outcome::{app_succeeded, is_truthy, web_outcome, WebOutcome};
pub use ports::{SessionRecord, SessionStore};
pub use signing::{sign, RequestSigner, SignedBody};
pub use state_update::derive_state_update;
