//! Git worktree discovery and backend/frontend pairing
//!
//! Worktrees are listed through the `git` CLI, which understands linked
//! worktrees across git versions; the repository common dir comes from
//! `git2` so worktrees of one repository can be grouped together.

use crate::config::{DEFAULT_BACKEND_COMMAND, DEFAULT_FRONTEND_COMMAND};
use crate::error::WorktreeError;
use crate::group_config::{Group, ServiceSpec};
use crate::logging::debug;
use std::collections::{BTreeMap, HashSet};
use std::path::{Component, Path, PathBuf};
use std::process::Command;

const CONDUCTOR_WORKSPACES: &str = "conductor/workspaces/";
const MAIN_GROUP: &str = "main";

/// One checkout of a repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Worktree {
    pub path: PathBuf,
    /// Short branch name, `(detached)`, or empty for a bare entry.
    pub branch: String,
}

/// List every worktree of the repository at `repo`.
pub fn scan_worktrees(repo: &Path) -> Result<Vec<Worktree>, WorktreeError> {
    let output = Command::new("git")
        .args(["worktree", "list", "--porcelain"])
        .current_dir(repo)
        .output()
        .map_err(|source| WorktreeError::GitLaunch {
            path: repo.to_path_buf(),
            source,
        })?;

    if !output.status.success() {
        return Err(WorktreeError::ListFailed {
            path: repo.to_path_buf(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    let worktrees = parse_worktree_list(&String::from_utf8_lossy(&output.stdout));
    debug(format!(
        "found {} worktree(s) in {}",
        worktrees.len(),
        repo.display()
    ));
    Ok(worktrees)
}

/// Parse `git worktree list --porcelain` output. Records are separated by
/// blank lines; unknown attribute lines are ignored.
pub fn parse_worktree_list(output: &str) -> Vec<Worktree> {
    let mut worktrees = Vec::new();
    let mut current: Option<Worktree> = None;

    for line in output.lines().map(str::trim) {
        if line.is_empty() {
            worktrees.extend(current.take());
            continue;
        }

        if let Some(path) = line.strip_prefix("worktree ") {
            worktrees.extend(current.take());
            current = Some(Worktree {
                path: PathBuf::from(path),
                branch: String::new(),
            });
        } else if let Some(entry) = current.as_mut() {
            if let Some(branch) = line.strip_prefix("branch ") {
                entry.branch = branch
                    .strip_prefix("refs/heads/")
                    .unwrap_or(branch)
                    .to_string();
            } else if line.starts_with("detached") {
                entry.branch = "(detached)".to_string();
            }
        }
    }

    worktrees.extend(current);
    worktrees
}

/// Display name of a worktree: its basename, with the primary checkouts
/// (`core`, `web`) called `main`.
pub fn worktree_name(path: &Path) -> String {
    let base = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    match base.as_str() {
        "core" | "web" => MAIN_GROUP.to_string(),
        _ => base,
    }
}

pub fn is_conductor_workspace(path: &Path) -> bool {
    path.to_string_lossy().contains(CONDUCTOR_WORKSPACES)
}

/// `<name>` from `.../conductor/workspaces/<repo>/<name>/...`.
pub fn conductor_name(path: &Path) -> Option<String> {
    let parts: Vec<_> = path
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();

    parts
        .iter()
        .position(|part| part == "workspaces")
        .and_then(|index| parts.get(index + 2))
        .cloned()
}

/// Shared git directory of the repository containing `path`. Every linked
/// worktree of a repository reports the same common dir.
pub fn common_dir(path: &Path) -> Result<PathBuf, WorktreeError> {
    let repo = git2::Repository::discover(path).map_err(|source| WorktreeError::Repository {
        path: path.to_path_buf(),
        source,
    })?;

    // Collecting the components drops the trailing separator libgit2 adds.
    let git_dir: PathBuf = repo.path().components().collect();
    if !repo.is_worktree() {
        return Ok(git_dir);
    }

    // A linked worktree's git dir is `<common>/worktrees/<name>`.
    match git_dir.parent() {
        Some(worktrees) if worktrees.file_name().map_or(false, |name| name == "worktrees") => {
            Ok(worktrees.parent().unwrap_or(worktrees).to_path_buf())
        }
        _ => Ok(git_dir),
    }
}

/// Repository root for display: the parent of a `.git` common dir.
pub fn repository_root(common_dir: &Path) -> &Path {
    match (common_dir.file_name(), common_dir.parent()) {
        (Some(name), Some(parent)) if name == ".git" => parent,
        _ => common_dir,
    }
}

fn service(worktree: &Worktree, command: &str) -> ServiceSpec {
    ServiceSpec {
        directory: worktree.path.clone(),
        branch: Some(worktree.branch.clone()).filter(|branch| !branch.is_empty()),
        command: command.to_string(),
        env: BTreeMap::new(),
    }
}

/// Build groups from the worktrees of a backend and a frontend repository.
///
/// 1. Each conductor backend takes the first conductor frontend not yet
///    taken, forming `<backend>-<frontend>`.
/// 2. The `main` backend and `main` frontend outside conductor form `main`.
/// 3. Every other backend not yet grouped becomes a backend-only group.
pub fn pair_worktrees(backends: &[Worktree], frontends: &[Worktree]) -> BTreeMap<String, Group> {
    let mut groups = BTreeMap::new();
    let mut paired_frontends: HashSet<&Path> = HashSet::new();
    let mut paired_backends: HashSet<&Path> = HashSet::new();

    for backend in backends.iter().filter(|wt| is_conductor_workspace(&wt.path)) {
        let Some(backend_name) = conductor_name(&backend.path) else {
            continue;
        };

        let partner = frontends.iter().find_map(|frontend| {
            if !is_conductor_workspace(&frontend.path)
                || paired_frontends.contains(frontend.path.as_path())
            {
                return None;
            }
            conductor_name(&frontend.path).map(|name| (frontend, name))
        });

        if let Some((frontend, frontend_name)) = partner {
            let name = format!("{}-{}", backend_name, frontend_name);
            groups.insert(
                name.clone(),
                Group {
                    name,
                    backend: Some(service(backend, DEFAULT_BACKEND_COMMAND)),
                    frontend: Some(service(frontend, DEFAULT_FRONTEND_COMMAND)),
                },
            );
            paired_frontends.insert(&frontend.path);
            paired_backends.insert(&backend.path);
        }
    }

    let is_main = |wt: &&Worktree| {
        !is_conductor_workspace(&wt.path) && worktree_name(&wt.path) == MAIN_GROUP
    };
    if let (Some(backend), Some(frontend)) = (
        backends.iter().find(is_main),
        frontends.iter().find(is_main),
    ) {
        groups.insert(
            MAIN_GROUP.to_string(),
            Group {
                name: MAIN_GROUP.to_string(),
                backend: Some(service(backend, DEFAULT_BACKEND_COMMAND)),
                frontend: Some(service(frontend, DEFAULT_FRONTEND_COMMAND)),
            },
        );
        paired_backends.insert(&backend.path);
    }

    for backend in backends {
        if paired_backends.contains(backend.path.as_path()) {
            continue;
        }
        let name = worktree_name(&backend.path);
        if name == MAIN_GROUP || name.is_empty() || groups.contains_key(&name) {
            continue;
        }
        groups.insert(
            name.clone(),
            Group {
                name,
                backend: Some(service(backend, DEFAULT_BACKEND_COMMAND)),
                frontend: None,
            },
        );
    }

    groups
}
