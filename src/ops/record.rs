//! Artifact recording.
//!
//! Each attempted build cell leaves exactly one file in the artifacts
//! directory: the renamed binary on success, or an empty `<name>.failed`
//! sentinel on failure. Recording a cell replaces that same cell's leftover
//! from an earlier run, so a directory listing always reflects the latest
//! outcome. Other cells' files are never touched.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;

use crate::core::artifact::{ArtifactRecord, CellIdentity, Outcome, RecordedOutcome};
use crate::core::error::AnvilError;
use crate::util::fs::{ensure_dir, move_file, remove_file_if_exists, touch};
use crate::util::shell::{Shell, Status};

/// Moves build outputs into the artifacts directory.
pub struct ArtifactRecorder {
    dir: PathBuf,
    /// Extension of the produced binary (e.g. `exe`), kept on artifacts
    extension: Option<String>,
    recorded: HashSet<CellIdentity>,
    shell: Arc<Shell>,
}

impl ArtifactRecorder {
    /// Create a recorder, creating the artifacts directory if needed.
    pub fn new(dir: impl Into<PathBuf>, binary: &Path, shell: Arc<Shell>) -> Result<Self> {
        let dir = dir.into();
        ensure_dir(&dir)?;
        Ok(ArtifactRecorder {
            dir,
            extension: binary
                .extension()
                .map(|e| e.to_string_lossy().into_owned()),
            recorded: HashSet::new(),
            shell,
        })
    }

    /// Path a successful cell's binary is moved to.
    pub fn artifact_path(&self, identity: &CellIdentity) -> PathBuf {
        match &self.extension {
            Some(ext) => self.dir.join(format!("{}.{}", identity, ext)),
            None => self.dir.join(identity.as_str()),
        }
    }

    /// Path of a failed cell's sentinel.
    pub fn marker_path(&self, identity: &CellIdentity) -> PathBuf {
        self.dir.join(identity.failed_marker())
    }

    /// Record one cell's outcome.
    ///
    /// A success whose binary is missing is recorded as a failure.
    pub fn record(&mut self, identity: &CellIdentity, outcome: Outcome) -> Result<ArtifactRecord> {
        if !self.recorded.insert(identity.clone()) {
            return Err(AnvilError::DuplicateArtifact {
                name: identity.to_string(),
            }
            .into());
        }

        let outcome = match outcome {
            Outcome::Success(binary) if !binary.is_file() => Outcome::Failure(format!(
                "build succeeded but produced no binary at {}",
                binary.display()
            )),
            other => other,
        };

        let artifact = self.artifact_path(identity);
        let marker = self.marker_path(identity);

        match outcome {
            Outcome::Success(binary) => {
                remove_file_if_exists(&marker)?;
                move_file(&binary, &artifact)?;
                self.shell.status(Status::Recorded, identity);
                tracing::debug!("{} -> {}", binary.display(), artifact.display());
                Ok(ArtifactRecord {
                    identity: identity.clone(),
                    outcome: RecordedOutcome::Success,
                    output_path: artifact,
                })
            }
            Outcome::Failure(reason) => {
                remove_file_if_exists(&artifact)?;
                touch(&marker)?;
                self.shell
                    .status(Status::Failed, format!("{} ({})", identity, reason));
                Ok(ArtifactRecord {
                    identity: identity.clone(),
                    outcome: RecordedOutcome::BuildFailed,
                    output_path: marker,
                })
            }
        }
    }
}
