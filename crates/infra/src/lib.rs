//! # igsession Infrastructure
//!
//! Network, filesystem and logging implementations around the pure core.
//!
//! This crate contains:
//! - The retrying HTTP client and the cookie-jar adapter
//! - The web/app [`Transport`]
//! - Configuration loading
//! - File-backed session persistence
//! - Log subscriber setup
//!
//! ## Architecture
//! - Implements traits defined in `igsession-core`
//! - Contains all "impure" code (network, filesystem, environment)

pub mod api;
pub mod config;
pub mod errors;
pub mod http;
pub mod persistence;
pub mod telemetry;

// Re-export commonly used items
pub use api::{IgResponse, RequestBody, RequestSpec, Transport};
pub use errors::InfraError;
pub use http::{HttpClient, HttpClientBuilder, RawResponse, SessionCookieStore};
pub use persistence::{persist_on_error, FileSessionStore};
