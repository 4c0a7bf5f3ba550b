//! Configuration path management
//!
//! Everything grappler persists lives under one home directory:
//! `$GRAPPLER_HOME` when set, otherwise `~/.grappler/`.

use crate::config::{APP_DIRECTORY, CONFIG_FILE_NAME, HOME_ENV, LOGS_DIRECTORY, STATE_FILE_NAME};
use crate::error::{GrapplerError, GrapplerResult};
use std::path::{Path, PathBuf};

/// Paths of the config file, the state file and the service logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrapplerPaths {
    pub home_dir: PathBuf,
    /// Group configuration (YAML)
    pub config_file: PathBuf,
    /// Run state (JSON)
    pub state_file: PathBuf,
    /// `<group>-<role>.log` files
    pub logs_dir: PathBuf,
}

impl GrapplerPaths {
    pub fn resolve() -> GrapplerResult<Self> {
        if let Some(home) = std::env::var_os(HOME_ENV).filter(|value| !value.is_empty()) {
            return Ok(Self::at(home));
        }

        let home_dir = dirs::home_dir().ok_or(GrapplerError::NoHomeDirectory)?;
        Ok(Self::at(home_dir.join(APP_DIRECTORY)))
    }

    /// Layout rooted at `root` instead of the user's home.
    pub fn at(root: impl AsRef<Path>) -> Self {
        let home_dir = root.as_ref().to_path_buf();
        Self {
            config_file: home_dir.join(CONFIG_FILE_NAME),
            state_file: home_dir.join(STATE_FILE_NAME),
            logs_dir: home_dir.join(LOGS_DIRECTORY),
            home_dir,
        }
    }
}
