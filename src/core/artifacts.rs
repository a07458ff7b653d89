use std::ops::Deref;
use std::path::{Path, PathBuf};

use tokio::fs;
use uuid::Uuid;

use crate::config::Config;
use crate::core::domain::Artifact;

#[derive(Debug, thiserror::Error)]
pub enum StagingError {
    #[error("Failed to stage source file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Allocates per-submission source and binary paths inside the sandbox directory.
#[derive(Clone, Debug)]
pub struct ArtifactStore {
    dir: PathBuf,
    source_extension: String,
    binary_extension: String,
}

impl ArtifactStore {
    pub fn new<T>(dir: T, source_extension: &str, binary_extension: &str) -> Self
    where
        T: AsRef<Path>,
    {
        ArtifactStore {
            dir: dir.as_ref().into(),
            source_extension: source_extension.to_string(),
            binary_extension: binary_extension.to_string(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            &config.sandbox_dir,
            &config.toolchain.source_extension,
            &config.toolchain.binary_extension,
        )
    }

    #[tracing::instrument(skip(self, source))]
    pub async fn stage(&self, source: &str) -> Result<Artifact, StagingError> {
        let id = Uuid::new_v4();
        let source_path = self.dir.join(format!("{}.{}", id, self.source_extension));
        let binary_path = self.dir.join(format!("{}.{}", id, self.binary_extension));

        let io_err = |source| StagingError::Io {
            path: source_path.clone(),
            source,
        };
        fs::create_dir_all(&self.dir).await.map_err(io_err)?;
        fs::write(&source_path, source).await.map_err(io_err)?;

        tracing::debug!("Staged artifact {} at {}", id, source_path.display());
        Ok(Artifact {
            id,
            source_path,
            binary_path,
        })
    }

    /// Removes both files. Never fails; a missing file is expected when
    /// compilation did not produce a binary.
    #[tracing::instrument(skip(self))]
    pub async fn release(&self, artifact: Artifact) {
        for path in [&artifact.source_path, &artifact.binary_path] {
            if let Err(e) = fs::remove_file(path).await {
                tracing::debug!("Skipping removal of {}: {}", path.display(), e);
            }
        }
    }
}

/// A staged artifact that is removed from disk when dropped, so a cancelled
/// submission does not leak its files.
#[derive(Debug)]
pub struct StagedArtifact<'a> {
    store: &'a ArtifactStore,
    artifact: Artifact,
    released: bool,
}

impl<'a> StagedArtifact<'a> {
    pub fn new(store: &'a ArtifactStore, artifact: Artifact) -> Self {
        StagedArtifact {
            store,
            artifact,
            released: false,
        }
    }

    pub async fn release(mut self) {
        self.store.release(self.artifact.clone()).await;
        self.released = true;
    }
}

impl Deref for StagedArtifact<'_> {
    type Target = Artifact;

    fn deref(&self) -> &Artifact {
        &self.artifact
    }
}

impl Drop for StagedArtifact<'_> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        tracing::debug!("Artifact {} dropped before release", self.artifact.id);
        for path in [&self.artifact.source_path, &self.artifact.binary_path] {
            if let Err(e) = std::fs::remove_file(path) {
                tracing::debug!("Skipping removal of {}: {}", path.display(), e);
            }
        }
    }
}
