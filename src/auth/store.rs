// Credential persistence
// One opaque record per installation, injected into the lifecycle manager

use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use super::types::Credential;

/// Durable key-value persistence of a single credential record.
///
/// A corrupt or unreadable record is reported as absent so the caller can
/// re-authorize instead of failing the run.
pub trait CredentialStore: Send + Sync {
    fn load(&self) -> Result<Option<Credential>>;
    fn save(&self, credential: &Credential) -> Result<()>;
}

/// JSON file store, written with an atomic replace
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> Result<Option<Credential>> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Failed to read credential file: {}", self.path.display())
                })
            }
        };

        match serde_json::from_str(&raw) {
            Ok(credential) => Ok(Some(credential)),
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Persisted credential is unreadable, treating as absent"
                );
                Ok(None)
            }
        }
    }

    fn save(&self, credential: &Credential) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create credential directory: {}", parent.display())
            })?;
        }

        let json = serde_json::to_string_pretty(credential)
            .context("Failed to serialize credential")?;

        // Write to a sibling temp file, then rename over the target
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)
            .with_context(|| format!("Failed to write credential file: {}", tmp.display()))?;
        fs::rename(&tmp, &self.path).with_context(|| {
            format!("Failed to replace credential file: {}", self.path.display())
        })?;

        tracing::debug!(path = %self.path.display(), "Credential persisted");
        Ok(())
    }
}

/// In-memory store for tests and ephemeral runs
#[derive(Clone, Default)]
pub struct MemoryCredentialStore {
    record: Arc<Mutex<Option<Credential>>>,
}

impl MemoryCredentialStore {
    pub fn new(initial: Option<Credential>) -> Self {
        Self {
            record: Arc::new(Mutex::new(initial)),
        }
    }

    /// Snapshot of the stored record (test inspection)
    pub fn snapshot(&self) -> Option<Credential> {
        self.record.lock().expect("store lock poisoned").clone()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self) -> Result<Option<Credential>> {
        Ok(self.snapshot())
    }

    fn save(&self, credential: &Credential) -> Result<()> {
        *self.record.lock().expect("store lock poisoned") = Some(credential.clone());
        Ok(())
    }
}
