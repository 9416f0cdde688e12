//! Session-aware request API
//!
//! [`Transport`] sends [`RequestSpec`]s in web or app mode against one
//! shared session and returns [`IgResponse`]s or classified errors.

pub mod request;
pub mod transport;

pub use request::{IgResponse, RequestBody, RequestSpec};
pub use transport::Transport;
