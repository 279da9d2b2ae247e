use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("directory missing or not writable: {0}")]
    Dir(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Ensure the directory exists; create if missing.
pub fn ensure_dir(dir: &Path) -> Result<(), PersistError> {
    if dir.exists() {
        let meta = fs::metadata(dir).map_err(|e| PersistError::Dir(e.to_string()))?;
        if !meta.is_dir() {
            return Err(PersistError::Dir(format!("{} is not a directory", dir.display())));
        }
    } else {
        fs::create_dir_all(dir).map_err(|e| PersistError::Dir(e.to_string()))?;
    }
    Ok(())
}

/// Atomically write content to `{dir}/{filename}` by writing a temp file then renaming.
#[derive(Debug, Clone)]
pub struct AtomicFileWriter {
    dir: PathBuf,
}

impl AtomicFileWriter {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn write(&self, filename: &str, content: &[u8]) -> Result<PathBuf, PersistError> {
        let mut staged = self.stage(filename)?;
        staged.write_chunk(content)?;
        staged.commit()
    }

    /// Opens a temp file next to `{dir}/{filename}` for incremental writes.
    /// Nothing appears under the target name until [`StagedFile::commit`].
    pub fn stage(&self, filename: &str) -> Result<StagedFile, PersistError> {
        ensure_dir(&self.dir)?;
        Ok(StagedFile {
            tmp: NamedTempFile::new_in(&self.dir)?,
            target: self.dir.join(filename),
            written: 0,
        })
    }

    /// Removes `{dir}/{filename}`. A missing file is not an error.
    pub fn remove(&self, filename: &str) -> Result<(), PersistError> {
        match fs::remove_file(self.dir.join(filename)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

/// A file being written in pieces. Dropping it without `commit` deletes the
/// temp file.
#[derive(Debug)]
pub struct StagedFile {
    tmp: NamedTempFile,
    target: PathBuf,
    written: u64,
}

impl StagedFile {
    pub fn write_chunk(&mut self, chunk: &[u8]) -> Result<(), PersistError> {
        self.tmp.write_all(chunk)?;
        self.written += chunk.len() as u64;
        Ok(())
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    /// Flushes and moves the temp file onto the target name.
    pub fn commit(mut self) -> Result<PathBuf, PersistError> {
        self.tmp.flush()?;
        self.tmp.as_file_mut().sync_all()?;
        self.tmp
            .persist(&self.target)
            .map_err(|e| PersistError::Io(e.error))?;
        Ok(self.target)
    }
}
