//! File-backed session persistence.
//!
//! Two JSON documents live side by side in the state directory:
//! `state.json` is the authoritative session snapshot, `context.json` is
//! the derived digest, rebuilt on every save so an operator (or another
//! tool) can inspect progress without loading the full state.

use std::path::{Path, PathBuf};

use autoforge_core::{SessionState, StateError};
use tracing::{debug, info, warn};

use crate::digest::ContextDigest;

pub struct SessionStore {
    state_path: PathBuf,
    digest_path: PathBuf,
}

impl SessionStore {
    /// A store rooted at the given state directory.
    pub fn new(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            state_path: dir.join("state.json"),
            digest_path: dir.join("context.json"),
        }
    }

    pub fn state_path(&self) -> &Path {
        &self.state_path
    }

    /// Persist the snapshot and its rebuilt digest.
    pub fn save(&self, state: &SessionState) -> Result<(), StateError> {
        if let Some(parent) = self.state_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StateError::Storage(format!("create state dir: {e}")))?;
        }

        let json = serde_json::to_string_pretty(state)
            .map_err(|e| StateError::Storage(format!("serialize state: {e}")))?;
        std::fs::write(&self.state_path, json)
            .map_err(|e| StateError::Storage(format!("write {}: {e}", self.state_path.display())))?;

        let digest = serde_json::to_string_pretty(&ContextDigest::build(state))
            .map_err(|e| StateError::Storage(format!("serialize digest: {e}")))?;
        std::fs::write(&self.digest_path, digest)
            .map_err(|e| StateError::Storage(format!("write {}: {e}", self.digest_path.display())))?;

        debug!(path = %self.state_path.display(), "Session saved");
        Ok(())
    }

    /// Load the snapshot if one exists.
    ///
    /// A missing file means a fresh start and returns `Ok(None)`. A corrupt
    /// file is logged and also treated as a fresh start rather than
    /// blocking the session.
    pub fn load(&self) -> Result<Option<SessionState>, StateError> {
        let json = match std::fs::read_to_string(&self.state_path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(StateError::Storage(format!(
                    "read {}: {e}",
                    self.state_path.display()
                )));
            }
        };

        match serde_json::from_str(&json) {
            Ok(state) => {
                info!(path = %self.state_path.display(), "Resumed saved session");
                Ok(Some(state))
            }
            Err(e) => {
                warn!(
                    path = %self.state_path.display(),
                    error = %e,
                    "Saved session is corrupt, starting fresh"
                );
                Ok(None)
            }
        }
    }

    /// Remove both documents, e.g. after finalizing a completed project.
    pub fn clear(&self) -> Result<(), StateError> {
        for path in [&self.state_path, &self.digest_path] {
            match std::fs::remove_file(path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(StateError::Storage(format!("remove {}: {e}", path.display())));
                }
            }
        }
        Ok(())
    }
}
