//! # igsession Domain
//!
//! Session types shared by the logic and I/O crates.
//!
//! This crate contains:
//! - The error taxonomy and `Result` alias
//! - `SessionState` and its snapshot codec
//! - The cookie jar
//! - Client configuration and wire constants
//!
//! ## Architecture
//! - No dependencies on other igsession crates
//! - No network or filesystem access

pub mod config;
pub mod constants;
pub mod cookies;
pub mod errors;
pub mod session;
pub mod snapshot;

// Re-export commonly used items
pub use config::ClientConfig;
pub use cookies::{Cookie, CookieJar, SerializedJar};
pub use errors::{IgError, IgErrorKind, ResponseDetails, Result};
pub use session::{SessionPatch, SessionState};
pub use snapshot::{SnapshotField, SnapshotSource, SNAPSHOT_VERSION};
