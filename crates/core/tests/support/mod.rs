//! Shared test helpers for `igsession-core` integration tests.
//!
//! Provides an in-memory `SessionStore` so persistence flows can be tested
//! without touching the filesystem.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use igsession_core::{SessionRecord, SessionStore};
use igsession_domain::Result as DomainResult;

/// In-memory mock for `SessionStore`.
#[derive(Default, Clone)]
pub struct MemorySessionStore {
    record: Arc<Mutex<Option<SessionRecord>>>,
    saves: Arc<Mutex<usize>>,
}

impl MemorySessionStore {
    /// Number of `save` calls observed so far.
    pub fn save_count(&self) -> usize {
        *self.saves.lock().unwrap()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn save(&self, record: &SessionRecord) -> DomainResult<()> {
        *self.record.lock().unwrap() = Some(record.clone());
        *self.saves.lock().unwrap() += 1;
        Ok(())
    }

    async fn load(&self) -> DomainResult<Option<SessionRecord>> {
        Ok(self.record.lock().unwrap().clone())
    }

    async fn clear(&self) -> DomainResult<()> {
        *self.record.lock().unwrap() = None;
        Ok(())
    }
}
