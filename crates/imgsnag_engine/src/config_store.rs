use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use imgsnag_core::RunConfig;
use snag_logging::{snag_error, snag_info, snag_warn};

use crate::persist::{ensure_output_dir, AtomicFileWriter, PersistError};

/// JSON file holding the URL queue, cookie and history.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the config, degrading to an empty default when the file is
    /// missing, unreadable or malformed.
    pub fn load(&self) -> RunConfig {
        let content = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                snag_info!("No config file at {:?}; using defaults", self.path);
                return RunConfig::default();
            }
            Err(err) => {
                snag_warn!("Failed to read config from {:?}: {}", self.path, err);
                return RunConfig::default();
            }
        };

        match RunConfig::from_json(&content) {
            Ok(config) => {
                snag_info!(
                    "Loaded config from {:?} ({} queued, {} in history)",
                    self.path,
                    config.target_urls.len(),
                    config.history.len()
                );
                config
            }
            Err(err) => {
                snag_error!("Failed to parse config {:?}: {}", self.path, err);
                RunConfig::default()
            }
        }
    }

    pub fn save(&self, config: &RunConfig) -> Result<(), PersistError> {
        let content = config.to_json_pretty()?;

        let dir = self
            .path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let filename = self
            .path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| PersistError::InvalidPath(self.path.clone()))?;

        ensure_output_dir(&dir)?;
        AtomicFileWriter::new(dir).write(filename, content.as_bytes())?;
        Ok(())
    }

    /// Save and log instead of failing; the in-memory config stays as is.
    pub fn save_or_log(&self, config: &RunConfig) -> bool {
        match self.save(config) {
            Ok(()) => {
                snag_info!("Updated {:?}: moved URL to history", self.path);
                true
            }
            Err(err) => {
                snag_error!("Failed to update config {:?}: {}", self.path, err);
                false
            }
        }
    }
}
