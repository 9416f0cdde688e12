//! File-backed session persistence
//!
//! [`FileSessionStore`] implements the [`SessionStore`] port on top of a
//! single JSON file. [`persist_on_error`] keeps that file current whenever
//! the service rejects a request, so a checkpoint or a rotated token is not
//! lost if the process dies before the caller saves.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use igsession_core::{SessionRecord, SessionStore};
use igsession_domain::{IgError, Result};
use serde_json::Value;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::api::Transport;
use crate::errors::InfraError;

/// Session store writing one pretty-printed JSON file.
///
/// Saves go through a sibling temporary file and a rename, so readers never
/// observe a partially written snapshot.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn save(&self, record: &SessionRecord) -> Result<()> {
        let contents = serde_json::to_vec_pretty(record)
            .map_err(|e| IgError::Storage(format!("failed to encode session: {e}")))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(InfraError::from)?;
        }

        let temp = self.temp_path();
        tokio::fs::write(&temp, contents).await.map_err(InfraError::from)?;
        tokio::fs::rename(&temp, &self.path).await.map_err(InfraError::from)?;

        debug!(path = %self.path.display(), "Session written");
        Ok(())
    }

    async fn load(&self) -> Result<Option<SessionRecord>> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(InfraError::from(err).into()),
        };

        match serde_json::from_str::<Value>(&contents) {
            Ok(Value::Object(record)) => Ok(Some(record)),
            Ok(_) => Err(IgError::Storage(format!(
                "session file {} does not hold a JSON object",
                self.path.display()
            ))),
            Err(e) => Err(IgError::Storage(format!(
                "session file {} is not valid JSON: {e}",
                self.path.display()
            ))),
        }
    }

    async fn clear(&self) -> Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(InfraError::from(err).into()),
        }
    }
}

/// Saves the session to `store` after every error published by `transport`.
///
/// The task only holds the session, not the transport, so it ends once every
/// clone of the transport is dropped. Save failures are logged and do not
/// stop the task.
pub fn persist_on_error(transport: &Transport, store: Arc<dyn SessionStore>) -> JoinHandle<()> {
    let mut errors = transport.subscribe_errors();
    let state = transport.state();

    tokio::spawn(async move {
        loop {
            match errors.recv().await {
                Ok(err) => {
                    debug!(kind = ?err.kind(), "Persisting session after failed request");
                    let record = state.read().serialize();
                    let saved = match record {
                        Ok(record) => store.save(&record).await,
                        Err(e) => Err(e),
                    };
                    if let Err(save_err) = saved {
                        warn!(error = %save_err, "Failed to persist session");
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    debug!(skipped, "Error subscriber lagged");
                }
                Err(RecvError::Closed) => {
                    info!("Error channel closed; session persistence stopped");
                    break;
                }
            }
        }
    })
}
