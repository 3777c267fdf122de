//! Artifact writer.
//!
//! Fresh artifacts are written atomically. Splices read, merge and write
//! back under a per-path lock, so two splices of the same file never
//! interleave.

use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::debug;

use super::splice::{self, SpliceError};
use super::{Artifact, GenerationReason, WriteMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Written,
    /// The file already had exactly this content.
    Unchanged,
}

/// Writes artifacts below an output root.
#[derive(Debug)]
pub struct ArtifactWriter {
    out_dir: PathBuf,
    splice_locks: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl ArtifactWriter {
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
            splice_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Absolute target of an artifact.
    pub fn target(&self, artifact: &Artifact) -> PathBuf {
        self.out_dir.join(&artifact.path)
    }

    pub fn write(&self, artifact: &Artifact) -> Result<(PathBuf, WriteOutcome), GenerationReason> {
        let path = self.target(artifact);
        let outcome = match artifact.mode {
            WriteMode::Create => write_if_changed(&path, &artifact.content)?,
            WriteMode::Splice => self.splice_into(&path, &artifact.content)?,
        };
        debug!(path = %path.display(), kind = %artifact.kind, outcome = ?outcome, "artifact written");
        Ok((path, outcome))
    }

    fn splice_into(&self, path: &Path, block: &str) -> Result<WriteOutcome, GenerationReason> {
        let lock = self.lock_for(path);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        if !path.is_file() {
            return Err(SpliceError::MissingFile {
                path: path.to_path_buf(),
            }
            .into());
        }
        let existing = fs::read_to_string(path).map_err(|e| GenerationReason::io(path, e))?;
        let merged = splice::splice(&existing, block)?;
        if merged == existing {
            return Ok(WriteOutcome::Unchanged);
        }
        write_atomic(path, merged.as_bytes())?;
        Ok(WriteOutcome::Written)
    }

    fn lock_for(&self, path: &Path) -> Arc<Mutex<()>> {
        let mut locks = self.splice_locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.entry(path.to_path_buf()).or_default().clone()
    }
}

fn write_if_changed(path: &Path, content: &str) -> Result<WriteOutcome, GenerationReason> {
    if let Ok(existing) = fs::read_to_string(path) {
        if existing == content {
            return Ok(WriteOutcome::Unchanged);
        }
    }
    write_atomic(path, content.as_bytes())?;
    Ok(WriteOutcome::Written)
}

fn write_atomic(path: &Path, data: &[u8]) -> Result<(), GenerationReason> {
    let io = |e: std::io::Error| GenerationReason::io(path, e);

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(io)?;
        }
    }

    let file_name = path
        .file_name()
        .ok_or_else(|| GenerationReason::io(path, "path has no file name"))?;
    let tmp_path = path.with_file_name(format!(".{}.soliton.tmp", file_name.to_string_lossy()));

    let mut file = OpenOptions::new()
        .create(true)
        .truncate(true)
        .write(true)
        .open(&tmp_path)
        .map_err(io)?;
    file.write_all(data).map_err(io)?;
    file.sync_all().map_err(io)?;
    drop(file);

    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        io(e)
    })
}
