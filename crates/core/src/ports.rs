//! Port interfaces for session persistence

use async_trait::async_trait;
use igsession_domain::Result;
use serde_json::{Map, Value};

/// A serialized session record, as produced by `SessionState::serialize`.
pub type SessionRecord = Map<String, Value>;

/// Trait for persisting session snapshots across process lifetimes
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Replace the stored snapshot
    async fn save(&self, record: &SessionRecord) -> Result<()>;

    /// Load the stored snapshot, or `None` if nothing has been saved
    async fn load(&self) -> Result<Option<SessionRecord>>;

    /// Remove the stored snapshot; succeeds when nothing is stored
    async fn clear(&self) -> Result<()>;
}
