//! Listening TCP sockets on the host, via `lsof`.
//!
//! Used by `status` to show ports held by processes grappler did not start,
//! attributed to a worktree through the owning process's working directory.

use crate::error::ListeningError;
use crate::logging::debug;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::process::Command;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListeningPort {
    pub pid: u32,
    pub port: u16,
    pub command: String,
    pub cwd: Option<PathBuf>,
}

/// Every listening TCP port with its owning process and that process's cwd.
pub fn collect_listening_ports() -> Result<Vec<ListeningPort>, ListeningError> {
    let output = Command::new("lsof")
        .args(["-nP", "-iTCP", "-sTCP:LISTEN", "-F", "pcn"])
        .output()?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    if !output.status.success() {
        // lsof exits 1 with no output when nothing is listening
        if stdout.trim().is_empty() {
            return Ok(Vec::new());
        }
        return Err(ListeningError::Failed(
            String::from_utf8_lossy(&output.stderr).trim().to_string(),
        ));
    }

    let mut ports = parse_lsof_listing(&stdout);

    let mut cwd_by_pid: HashMap<u32, Option<PathBuf>> = HashMap::new();
    for port in &mut ports {
        let cwd = cwd_by_pid
            .entry(port.pid)
            .or_insert_with(|| lookup_cwd(port.pid));
        port.cwd = cwd.clone();
    }

    debug(format!("lsof reported {} listening port(s)", ports.len()));
    Ok(ports)
}

fn lookup_cwd(pid: u32) -> Option<PathBuf> {
    let output = Command::new("lsof")
        .args(["-a", "-p", &pid.to_string(), "-d", "cwd", "-Fn"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    parse_cwd_listing(&String::from_utf8_lossy(&output.stdout))
}

/// Parse `lsof -F pcn` field output. `p` starts a process, `c` names it and
/// each `n` is one socket. Duplicate (pid, port) pairs are dropped.
pub fn parse_lsof_listing(output: &str) -> Vec<ListeningPort> {
    let mut ports = Vec::new();
    let mut seen = HashSet::new();
    let mut pid: Option<u32> = None;
    let mut command = String::new();

    for line in output.lines() {
        let Some(field) = line.chars().next() else {
            continue;
        };
        let value = &line[field.len_utf8()..];

        match field {
            'p' => {
                pid = value.parse().ok();
                command.clear();
            }
            'c' => command = value.to_string(),
            'n' => {
                let (Some(pid), Some(port)) = (pid, parse_port(value)) else {
                    continue;
                };
                if seen.insert((pid, port)) {
                    ports.push(ListeningPort {
                        pid,
                        port,
                        command: command.clone(),
                        cwd: None,
                    });
                }
            }
            _ => {}
        }
    }

    ports
}

/// Port from an lsof socket name such as `*:8080`, `127.0.0.1:5000` or
/// `[::1]:3000->[::1]:51234`.
pub fn parse_port(name: &str) -> Option<u16> {
    let local = name.split("->").next().unwrap_or(name);
    let (_, port) = local.rsplit_once(':')?;
    port.parse().ok().filter(|port| *port != 0)
}

pub fn parse_cwd_listing(output: &str) -> Option<PathBuf> {
    output
        .lines()
        .find_map(|line| line.strip_prefix('n'))
        .map(PathBuf::from)
}

/// The deepest of `worktrees` that contains `cwd`.
pub fn match_worktree<'a>(worktrees: &'a [PathBuf], cwd: &Path) -> Option<&'a Path> {
    worktrees
        .iter()
        .filter(|worktree| cwd.starts_with(worktree))
        .max_by_key(|worktree| worktree.components().count())
        .map(PathBuf::as_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_field_output_and_dedupes() {
        let output = "p101\ncnode\nn*:5000\nn[::]:5000\n\
                      p202\ncgo\nn127.0.0.1:8000\nn127.0.0.1:8000->127.0.0.1:40000\n\
                      pbogus\ncghost\nn*:9999\n";

        let ports = parse_lsof_listing(output);
        let summary: Vec<_> = ports
            .iter()
            .map(|p| (p.pid, p.port, p.command.as_str()))
            .collect();
        assert_eq!(summary, vec![(101, 5000, "node"), (202, 8000, "go")]);
        assert!(ports.iter().all(|p| p.cwd.is_none()));
    }

    #[test]
    fn port_parsing() {
        assert_eq!(parse_port("*:8080"), Some(8080));
        assert_eq!(parse_port("[::1]:3000->[::1]:51234"), Some(3000));
        assert_eq!(parse_port("localhost:"), None);
        assert_eq!(parse_port("no-port"), None);
        assert_eq!(parse_port("*:*"), None);
    }

    #[test]
    fn cwd_listing() {
        assert_eq!(
            parse_cwd_listing("p101\nfcwd\nn/src/web/app\n"),
            Some(PathBuf::from("/src/web/app"))
        );
        assert_eq!(parse_cwd_listing("p101\n"), None);
    }

    #[test]
    fn deepest_containing_worktree_wins() {
        let worktrees = vec![
            PathBuf::from("/src/web"),
            PathBuf::from("/src/web/nested-wt"),
            PathBuf::from("/src/webapp"),
        ];

        assert_eq!(
            match_worktree(&worktrees, Path::new("/src/web/nested-wt/pkg")),
            Some(Path::new("/src/web/nested-wt"))
        );
        assert_eq!(
            match_worktree(&worktrees, Path::new("/src/web")),
            Some(Path::new("/src/web"))
        );
        // component-wise: /src/webapp2 is not inside /src/webapp
        assert_eq!(match_worktree(&worktrees, Path::new("/src/webapp2")), None);
    }
}
