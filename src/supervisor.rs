use crate::config::START_TIME_TOLERANCE_MS;
use crate::error::ProcessError;
use crate::group_config::ServiceSpec;
use crate::logging::{debug, warn};
use crate::platform;
use crate::role::Role;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;

/// Result of re-validating a recorded pid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
    Alive,
    Exited,
    /// The pid is alive but belongs to a process created at a different time.
    Reused,
}

/// Spawns service processes and signals them by pid.
///
/// Processes are tracked by bare pid so a later grappler invocation, which
/// never owned a handle, can still check and stop them.
#[derive(Debug, Clone)]
pub struct ProcessSupervisor {
    logs_dir: PathBuf,
}

impl ProcessSupervisor {
    pub fn new(logs_dir: impl Into<PathBuf>) -> Self {
        Self {
            logs_dir: logs_dir.into(),
        }
    }

    pub fn log_path(&self, group: &str, role: Role) -> PathBuf {
        self.logs_dir.join(format!("{}-{}.log", group, role))
    }

    /// Launch `spec` and return its pid without waiting for it.
    ///
    /// stdout and stderr go to `<logs>/<group>-<role>.log`, truncated first.
    /// The environment is ours, then `spec.env`, then `extra_env`; later
    /// entries win. A detached task reaps the child and closes the log file
    /// when it exits.
    pub async fn start(
        &self,
        spec: &ServiceSpec,
        role: Role,
        group: &str,
        extra_env: &BTreeMap<String, String>,
    ) -> Result<u32, ProcessError> {
        let spawn_failed = |reason: String| ProcessError::SpawnFailed {
            role,
            group: group.to_string(),
            reason,
        };

        fs::create_dir_all(&self.logs_dir).map_err(|err| {
            spawn_failed(format!(
                "failed to create logs directory {}: {}",
                self.logs_dir.display(),
                err
            ))
        })?;

        let log_path = self.log_path(group, role);
        let log_file = File::create(&log_path).map_err(|err| {
            spawn_failed(format!(
                "failed to create log file {}: {}",
                log_path.display(),
                err
            ))
        })?;

        let parts = split_command(&spec.command);
        let (program, args) = parts
            .split_first()
            .ok_or_else(|| spawn_failed("empty command".to_string()))?;

        let clone_log = || {
            log_file
                .try_clone()
                .map_err(|err| spawn_failed(format!("failed to share log file: {}", err)))
        };

        let mut command = Command::new(program);
        command
            .args(args)
            .current_dir(&spec.directory)
            .stdin(Stdio::null())
            .stdout(clone_log()?)
            .stderr(clone_log()?);

        for (key, value) in &spec.env {
            command.env(key, value);
        }
        for (key, value) in extra_env {
            command.env(key, value);
        }

        platform::prepare_command(&mut command);

        let mut child = command
            .spawn()
            .map_err(|err| spawn_failed(format!("failed to start process: {}", err)))?;
        // Release the parent's copies of the child's stdio.
        drop(command);

        let pid = child
            .id()
            .ok_or_else(|| spawn_failed("process exited before its pid was read".to_string()))?;

        debug(format!(
            "Started {} for group {} pid={} log={}",
            role,
            group,
            pid,
            log_path.display()
        ));

        let label = format!("{}-{}", group, role);
        tokio::spawn(async move {
            match child.wait().await {
                Ok(status) => debug(format!("{} (pid {}) exited: {}", label, pid, status)),
                Err(err) => warn(format!("failed to reap {} (pid {}): {}", label, pid, err)),
            }
            drop(log_file);
        });

        Ok(pid)
    }

    /// Ask `pid` to terminate with SIGTERM. A missing or zero pid is a no-op.
    pub fn stop(&self, pid: Option<u32>) -> Result<(), ProcessError> {
        let Some(pid) = nonzero(pid) else {
            return Ok(());
        };

        platform::send_terminate(pid).map_err(|err| ProcessError::TerminationFailed {
            pid,
            reason: err.to_string(),
        })
    }

    /// Whether `pid` currently exists. Never errors.
    pub fn is_running(&self, pid: Option<u32>) -> bool {
        nonzero(pid).is_some_and(platform::process_alive)
    }

    /// OS creation time of `pid`, if it can be read.
    pub fn start_time(&self, pid: u32) -> Option<u64> {
        platform::process_start_time(pid)
    }

    /// Re-validate `pid` against the creation time recorded when it was started.
    ///
    /// Without a recorded time (older state files) a live pid is trusted.
    pub fn check(&self, pid: Option<u32>, recorded_start: Option<u64>) -> Liveness {
        let Some(pid) = nonzero(pid) else {
            return Liveness::Exited;
        };
        if !platform::process_alive(pid) {
            return Liveness::Exited;
        }

        match (recorded_start, self.start_time(pid)) {
            (Some(recorded), Some(actual))
                if recorded.abs_diff(actual) > START_TIME_TOLERANCE_MS =>
            {
                Liveness::Reused
            }
            _ => Liveness::Alive,
        }
    }
}

fn nonzero(pid: Option<u32>) -> Option<u32> {
    pid.filter(|pid| *pid != 0)
}

/// Split a command line on spaces. Double-quoted text is kept as one token
/// with the quotes removed; there are no escape sequences.
pub fn split_command(line: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut in_quote = false;

    for ch in line.chars() {
        match ch {
            '"' => in_quote = !in_quote,
            ' ' if !in_quote => {
                if !current.is_empty() {
                    parts.push(std::mem::take(&mut current));
                }
            }
            _ => current.push(ch),
        }
    }

    if !current.is_empty() {
        parts.push(current);
    }

    parts
}
