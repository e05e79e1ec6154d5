use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::encode::EncodedAudio;
use crate::error::Result;

/// An encoded file living in its own temporary directory.
struct Artifact {
    dir: TempDir,
    path: PathBuf,
}

/// Temporary files holding cut results.
///
/// A cut result becomes the new working source, so it has to exist on disk while it is being
/// edited. Every artifact is revoked (deleted) as soon as a newer one supersedes it.
#[derive(Default)]
pub struct ArtifactStore {
    current: Option<Artifact>,
}

impl ArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes `encoded` to a new temp file called `name` and revokes the previous artifact.
    ///
    /// On failure the previous artifact is kept.
    pub fn store(&mut self, encoded: &EncodedAudio, name: &str) -> Result<PathBuf> {
        let dir = tempfile::Builder::new().prefix("audio-cutter-").tempdir()?;
        let path = dir.path().join(name);
        std::fs::write(&path, &encoded.bytes)?;
        log::debug!("Stored artifact {}", path.display());

        self.revoke_all();
        self.current = Some(Artifact {
            dir,
            path: path.clone(),
        });
        Ok(path)
    }

    /// Path of the live artifact, if any.
    pub fn current(&self) -> Option<&Path> {
        self.current.as_ref().map(|a| a.path.as_path())
    }

    pub fn revoke_all(&mut self) {
        if let Some(artifact) = self.current.take() {
            log::debug!("Revoking artifact {}", artifact.path.display());
            if let Err(e) = artifact.dir.close() {
                log::warn!("Could not remove artifact {}: {}", artifact.path.display(), e);
            }
        }
    }
}

impl Drop for ArtifactStore {
    fn drop(&mut self) {
        self.revoke_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::{WAV_EXTENSION, WAV_MIME};

    fn encoded(bytes: &[u8]) -> EncodedAudio {
        EncodedAudio {
            bytes: bytes.to_vec(),
            mime: WAV_MIME,
            extension: WAV_EXTENSION,
        }
    }

    #[test]
    fn newer_artifact_revokes_older() {
        let mut store = ArtifactStore::new();
        let first = store.store(&encoded(b"one"), "song_cut.wav").unwrap();
        assert!(first.exists());
        assert_eq!(first.file_name().unwrap(), "song_cut.wav");

        let second = store.store(&encoded(b"two"), "song_cut.wav").unwrap();
        assert!(!first.exists());
        assert_eq!(std::fs::read(&second).unwrap(), b"two");
        assert_eq!(store.current(), Some(second.as_path()));
    }

    #[test]
    fn revoke_all_and_drop_remove_files() {
        let mut store = ArtifactStore::new();
        let path = store.store(&encoded(b"x"), "a_cut.wav").unwrap();
        store.revoke_all();
        assert!(!path.exists());
        assert_eq!(store.current(), None);

        let path = store.store(&encoded(b"y"), "b_cut.wav").unwrap();
        drop(store);
        assert!(!path.exists());
    }
}
