//! Group configuration (`~/.grappler/config.yaml`)

use crate::config::CONFIG_VERSION;
use crate::error::ConfigError;
use crate::logging::warn;
use crate::role::Role;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Configuration file root structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupConfig {
    pub version: String,

    #[serde(default)]
    pub groups: BTreeMap<String, Group>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy: Option<ProxyConfig>,
}

/// A backend + frontend pair started and stopped together.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend: Option<ServiceSpec>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frontend: Option<ServiceSpec>,
}

/// How to launch one service. Read-only to the supervisor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceSpec {
    pub directory: PathBuf,

    /// Branch checked out in `directory`; informational only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,

    pub command: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub use_existing_conductor: bool,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            use_existing_conductor: true,
        }
    }
}

impl Group {
    pub fn service(&self, role: Role) -> Option<&ServiceSpec> {
        match role {
            Role::Backend => self.backend.as_ref(),
            Role::Frontend => self.frontend.as_ref(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.backend.is_none() && self.frontend.is_none()
    }
}

impl GroupConfig {
    pub fn new(groups: BTreeMap<String, Group>) -> Self {
        Self {
            version: CONFIG_VERSION.to_string(),
            groups,
            proxy: Some(ProxyConfig::default()),
        }
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = serde_yaml::to_string(self)?;

        let write_err = |source: io::Error| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        fs::write(path, content).map_err(write_err)
    }

    pub fn group(&self, name: &str) -> Option<&Group> {
        self.groups.get(name)
    }

    /// Whether to advertise `<port>.port.localhost` URLs. Defaults to on.
    pub fn proxy_enabled(&self) -> bool {
        self.proxy.as_ref().map_or(true, |proxy| proxy.enabled)
    }

    /// Drop services whose directory no longer exists, and groups left with
    /// no service at all. Returns whether anything changed.
    pub fn prune_missing_directories(&mut self) -> bool {
        let mut updated = false;

        for (name, group) in self.groups.iter_mut() {
            for role in Role::ALL {
                let slot = match role {
                    Role::Backend => &mut group.backend,
                    Role::Frontend => &mut group.frontend,
                };
                let Some(spec) = slot else { continue };

                match fs::metadata(&spec.directory) {
                    Ok(_) => {}
                    Err(err) if err.kind() == io::ErrorKind::NotFound => {
                        *slot = None;
                        updated = true;
                    }
                    Err(err) => warn(format!(
                        "failed to stat {} directory for {}: {}",
                        role, name, err
                    )),
                }
            }
        }

        let before = self.groups.len();
        self.groups.retain(|_, group| !group.is_empty());
        updated || self.groups.len() != before
    }
}
