//! HTTP plumbing: the retrying client and the cookie store adapter

pub mod client;
pub mod cookies;

pub use client::{HttpClient, HttpClientBuilder, RawResponse};
pub use cookies::SessionCookieStore;
