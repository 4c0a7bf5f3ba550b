//! Error types for grappler
//!
//! Each concern owns a small error enum; `GrapplerError` aggregates them for
//! the command layer and adds the group context the operator needs.

use crate::role::Role;
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PortError {
    #[error("no available {role} ports in range {start}-{end}")]
    NoAvailablePort { role: Role, start: u16, end: u16 },
}

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("failed to start {role} for group {group:?}: {reason}")]
    SpawnFailed {
        role: Role,
        group: String,
        reason: String,
    },
    #[error("failed to terminate process {pid}: {reason}")]
    TerminationFailed { pid: u32, reason: String },
}

#[derive(Debug, Error)]
pub enum HealthError {
    #[error("service on port {port} did not become healthy within {waited:?}")]
    TimedOut {
        port: u16,
        waited: Duration,
        attempts: u32,
    },
}

#[derive(Debug, Error)]
pub enum StateError {
    #[error("failed to read state file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse state file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to serialize state: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("failed to write state file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path} (run 'grappler init' first): {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] serde_yaml::Error),
    #[error("failed to write config file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Error)]
pub enum WorktreeError {
    #[error("failed to run git in {path}: {source}")]
    GitLaunch {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to list worktrees in {path}: {stderr}")]
    ListFailed { path: PathBuf, stderr: String },
    #[error("failed to open git repository at {path}: {source}")]
    Repository {
        path: PathBuf,
        #[source]
        source: git2::Error,
    },
}

#[derive(Debug, Error)]
pub enum ListeningError {
    #[error("lsof failed: {0}")]
    Launch(#[from] io::Error),
    #[error("lsof failed: {0}")]
    Failed(String),
}

/// Errors surfaced by the `init`, `start`, `stop` and `status` operations.
#[derive(Debug, Error)]
pub enum GrapplerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    State(#[from] StateError),

    #[error("failed to allocate port for group {group:?}: {source}")]
    PortAllocation {
        group: String,
        #[source]
        source: PortError,
    },

    #[error(transparent)]
    Process(#[from] ProcessError),

    #[error(transparent)]
    Worktree(#[from] WorktreeError),

    #[error("group {0:?} not found in config")]
    GroupNotFound(String),

    #[error("group {0:?} has no backend or frontend configured")]
    EmptyGroup(String),

    #[error("group {0:?} is already running")]
    AlreadyRunning(String),

    #[error("group {0:?} is not running")]
    NotRunning(String),

    #[error("cannot determine home directory; set GRAPPLER_HOME")]
    NoHomeDirectory,
}

pub type GrapplerResult<T> = Result<T, GrapplerError>;
