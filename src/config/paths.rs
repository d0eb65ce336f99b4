use std::env;
use std::fs;
use std::io;
use std::path::PathBuf;

const APP_DIR: &str = "endpoint-status";

/// Where config and state live on this machine.
pub struct Paths;

#[derive(Debug, thiserror::Error)]
pub enum PathError {
    #[error("Failed to create directory {path}: {source}")]
    CreateDirectory { path: PathBuf, source: io::Error },
}

impl Paths {
    /// Config directory: `ENDPOINT_STATUS_CONFIG`'s parent when set, else the
    /// platform config dir (e.g. `~/.config/endpoint-status`).
    pub fn config_dir() -> PathBuf {
        if let Some(file) = env_path("ENDPOINT_STATUS_CONFIG") {
            return match file.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
                _ => file,
            };
        }
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(APP_DIR)
    }

    pub fn config_file() -> PathBuf {
        env_path("ENDPOINT_STATUS_CONFIG").unwrap_or_else(|| Self::config_dir().join("config.toml"))
    }

    /// Holds the status blob and the log file. `ENDPOINT_STATUS_STATE`
    /// overrides; otherwise the XDG state dir, or the local data dir on
    /// platforms without one.
    pub fn state_dir() -> PathBuf {
        if let Some(dir) = env_path("ENDPOINT_STATUS_STATE") {
            return dir;
        }
        dirs::state_dir()
            .or_else(dirs::data_local_dir)
            .unwrap_or_else(|| PathBuf::from(".local/state"))
            .join(APP_DIR)
    }

    pub fn ensure_state_dir() -> Result<PathBuf, PathError> {
        let dir = Self::state_dir();
        fs::create_dir_all(&dir).map_err(|source| PathError::CreateDirectory {
            path: dir.clone(),
            source,
        })?;
        Ok(dir)
    }
}

fn env_path(key: &str) -> Option<PathBuf> {
    env::var_os(key)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}
