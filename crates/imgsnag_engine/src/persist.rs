use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("{0:?} exists but is not a directory")]
    NotADirectory(PathBuf),
    #[error("cannot create or write to {path:?}: {source}")]
    Unwritable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{0:?} has no usable file name")]
    InvalidPath(PathBuf),
    #[error("failed to serialize: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Create `dir` (and parents) if needed and check that files can be created in it.
pub fn ensure_output_dir(dir: &Path) -> Result<(), PersistError> {
    let unwritable = |source: io::Error| PersistError::Unwritable {
        path: dir.to_path_buf(),
        source,
    };
    match fs::metadata(dir) {
        Ok(meta) if !meta.is_dir() => return Err(PersistError::NotADirectory(dir.to_path_buf())),
        Ok(_) => {}
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            fs::create_dir_all(dir).map_err(unwritable)?;
        }
        Err(err) => return Err(unwritable(err)),
    }
    // Scratch file is removed on drop.
    NamedTempFile::new_in(dir).map_err(unwritable)?;
    Ok(())
}

/// Writes whole files under one directory via temp file and rename, so a
/// reader never sees a half-written image or config.
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

    /// Write `bytes` to `dir/file_name`, replacing any existing file.
    ///
    /// `dir` must already exist; see [`ensure_output_dir`].
    pub fn write(&self, file_name: &str, bytes: &[u8]) -> Result<PathBuf, PersistError> {
        let mut staged = NamedTempFile::new_in(&self.dir)?;
        staged.write_all(bytes)?;
        staged.as_file_mut().sync_all()?;

        let target = self.dir.join(file_name);
        staged.persist(&target).map_err(|err| PersistError::Io(err.error))?;
        Ok(target)
    }
}
