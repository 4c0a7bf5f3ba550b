use super::start::proxy_url;
use super::{rule, Context};
use crate::error::GrapplerResult;
use crate::group_config::GroupConfig;
use crate::listening::{self, ListeningPort};
use crate::logging::debug;
use crate::role::Role;
use crate::storage::RunStateStore;
use crate::supervisor::Liveness;
use crate::worktree::{self, Worktree};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::PathBuf;

/// One row of the status table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupStatus {
    pub name: String,
    pub running: bool,
    pub backend_port: Option<u16>,
    pub frontend_port: Option<u16>,
    pub access: Option<String>,
    /// `Some(branch)` for each configured service; the branch may be unknown.
    pub backend_branch: Option<Option<String>>,
    pub frontend_branch: Option<Option<String>>,
}

impl GroupStatus {
    pub fn port(&self, role: Role) -> Option<u16> {
        match role {
            Role::Backend => self.backend_port,
            Role::Frontend => self.frontend_port,
        }
    }
}

/// Re-validate every configured group against the live process table.
///
/// A record none of whose pids is still alive is deleted. The state is saved
/// before returning.
pub fn status_groups(
    ctx: &Context,
    config: &GroupConfig,
    state: &RunStateStore,
) -> GrapplerResult<Vec<GroupStatus>> {
    let mut rows = Vec::with_capacity(config.groups.len());

    for (name, group) in &config.groups {
        let mut row = GroupStatus {
            name: name.clone(),
            running: false,
            backend_port: None,
            frontend_port: None,
            access: None,
            backend_branch: group.backend.as_ref().map(|spec| spec.branch.clone()),
            frontend_branch: group.frontend.as_ref().map(|spec| spec.branch.clone()),
        };

        if let Some(record) = state.get(name).filter(|record| record.running) {
            let alive = |role: Role| {
                ctx.supervisor.check(record.pid(role), record.start_time(role)) == Liveness::Alive
            };

            if alive(Role::Backend) || alive(Role::Frontend) {
                row.running = true;
                row.backend_port = record.backend_port;
                row.frontend_port = record.frontend_port;
                row.access = match (record.frontend_port, record.backend_port) {
                    (Some(port), _) if config.proxy_enabled() => Some(proxy_url(port)),
                    (Some(port), _) | (None, Some(port)) => {
                        Some(format!("http://localhost:{}", port))
                    }
                    (None, None) => None,
                };
            } else {
                debug(format!("group {} has no live processes, clearing record", name));
                state.delete(name);
            }
        }

        rows.push(row);
    }

    ctx.save_state(state)?;
    Ok(rows)
}

/// A port in use inside a worktree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortUse {
    /// `backend`, `frontend`, or `listen` for sockets found via lsof.
    pub kind: String,
    pub port: u16,
    /// Owning group, or the process command for `listen` entries.
    pub label: Option<String>,
}

impl fmt::Display for PortUse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.label.as_deref().filter(|label| !label.is_empty()) {
            Some(label) => write!(f, "{}:{} ({})", self.kind, self.port, label),
            None => write!(f, "{}:{}", self.kind, self.port),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryPorts {
    pub root: PathBuf,
    pub worktrees: Vec<(Worktree, Vec<PortUse>)>,
}

/// Ports grappler itself holds, keyed by service directory.
pub fn grappler_ports(config: &GroupConfig, rows: &[GroupStatus]) -> HashMap<PathBuf, Vec<PortUse>> {
    let mut ports: HashMap<PathBuf, Vec<PortUse>> = HashMap::new();

    for row in rows.iter().filter(|row| row.running) {
        let Some(group) = config.group(&row.name) else {
            continue;
        };
        for role in Role::ALL {
            if let (Some(spec), Some(port)) = (group.service(role), row.port(role)) {
                push_unique(
                    ports.entry(spec.directory.clone()).or_default(),
                    PortUse {
                        kind: role.to_string(),
                        port,
                        label: Some(row.name.clone()),
                    },
                );
            }
        }
    }

    ports
}

/// Worktrees of every repository referenced by the config, keyed by common dir.
pub fn scan_repositories(config: &GroupConfig) -> GrapplerResult<BTreeMap<PathBuf, Vec<Worktree>>> {
    let mut sample_dirs: BTreeMap<PathBuf, PathBuf> = BTreeMap::new();
    for group in config.groups.values() {
        for spec in Role::ALL.iter().filter_map(|role| group.service(*role)) {
            let common = worktree::common_dir(&spec.directory)?;
            sample_dirs
                .entry(common)
                .or_insert_with(|| spec.directory.clone());
        }
    }

    let mut repos = BTreeMap::new();
    for (common, dir) in sample_dirs {
        repos.insert(common, worktree::scan_worktrees(&dir)?);
    }
    Ok(repos)
}

/// Attach grappler ports and externally found listeners to each worktree.
///
/// A listener is attributed to the deepest worktree containing its process's
/// cwd, and skipped when that worktree already shows the same port.
pub fn build_port_map(
    repos: BTreeMap<PathBuf, Vec<Worktree>>,
    mut running: HashMap<PathBuf, Vec<PortUse>>,
    listeners: &[ListeningPort],
) -> Vec<RepositoryPorts> {
    let worktree_paths: Vec<PathBuf> = repos
        .values()
        .flatten()
        .map(|worktree| worktree.path.clone())
        .collect();

    for listener in listeners {
        let Some(cwd) = listener.cwd.as_deref() else {
            continue;
        };
        if let Some(path) = listening::match_worktree(&worktree_paths, cwd) {
            push_unique(
                running.entry(path.to_path_buf()).or_default(),
                PortUse {
                    kind: "listen".to_string(),
                    port: listener.port,
                    label: Some(listener.command.clone()),
                },
            );
        }
    }

    repos
        .into_iter()
        .map(|(common, mut worktrees)| {
            worktrees.sort_by(|a, b| a.path.cmp(&b.path));
            RepositoryPorts {
                root: worktree::repository_root(&common).to_path_buf(),
                worktrees: worktrees
                    .into_iter()
                    .map(|worktree| {
                        let ports = running.get(&worktree.path).cloned().unwrap_or_default();
                        (worktree, ports)
                    })
                    .collect(),
            }
        })
        .collect()
}

fn push_unique(ports: &mut Vec<PortUse>, port: PortUse) {
    if !ports.iter().any(|existing| existing.port == port.port) {
        ports.push(port);
    }
}

pub fn run(ctx: &Context) -> GrapplerResult<()> {
    let mut config = ctx.load_config()?;
    if config.prune_missing_directories() {
        ctx.save_config(&config)?;
    }
    let state = ctx.load_state()?;

    println!("Grappler Status");
    println!("{}", rule('=', 80));

    if config.groups.is_empty() {
        println!("No groups configured");
        return Ok(());
    }

    let rows = status_groups(ctx, &config, &state)?;
    print_table(&rows);

    println!("{}", rule('=', 80));
    println!("Worktree Port Map");
    println!("{}", rule('-', 80));

    let repos = match scan_repositories(&config) {
        Ok(repos) => repos,
        Err(err) => {
            println!("⚠ Failed to scan worktrees: {}", err);
            return Ok(());
        }
    };
    if repos.is_empty() {
        println!("No worktrees found");
        return Ok(());
    }

    let listeners = listening::collect_listening_ports().unwrap_or_else(|err| {
        println!("⚠ Failed to scan listening ports: {}", err);
        Vec::new()
    });

    let map = build_port_map(repos, grappler_ports(&config, &rows), &listeners);
    print_port_map(&map);
    Ok(())
}

fn print_table(rows: &[GroupStatus]) {
    println!(
        "{:<20} {:<15} {:<15} {:<10} {}",
        "GROUP", "BACKEND PORT", "FRONTEND PORT", "STATUS", "ACCESS"
    );
    println!("{}", rule('-', 80));

    let dash = |port: Option<u16>| port.map_or_else(|| "-".to_string(), |port| port.to_string());

    for row in rows {
        println!(
            "{:<20} {:<15} {:<15} {:<10} {}",
            row.name,
            dash(row.backend_port),
            dash(row.frontend_port),
            if row.running { "running" } else { "stopped" },
            row.access.as_deref().unwrap_or("-"),
        );
        if let Some(branch) = &row.backend_branch {
            println!("  Backend:  {}", branch.as_deref().unwrap_or("-"));
        }
        if let Some(branch) = &row.frontend_branch {
            println!("  Frontend: {}", branch.as_deref().unwrap_or("-"));
        }
        println!();
    }
}

fn print_port_map(map: &[RepositoryPorts]) {
    for repo in map {
        println!("Repository: {}", repo.root.display());
        println!("{:<50} {:<20} {}", "WORKTREE", "BRANCH", "PORTS IN USE");
        println!("{}", rule('-', 80));

        for (worktree, ports) in &repo.worktrees {
            let in_use = if ports.is_empty() {
                "-".to_string()
            } else {
                ports
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ")
            };
            println!(
                "{:<50} {:<20} {}",
                worktree.path.display().to_string(),
                worktree.branch,
                in_use
            );
        }
        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group_config::{Group, ServiceSpec};
    use pretty_assertions::assert_eq;
    use std::path::Path;

    fn wt(path: &str, branch: &str) -> Worktree {
        Worktree {
            path: PathBuf::from(path),
            branch: branch.to_string(),
        }
    }

    fn listener(port: u16, command: &str, cwd: Option<&str>) -> ListeningPort {
        ListeningPort {
            pid: 42,
            port,
            command: command.to_string(),
            cwd: cwd.map(PathBuf::from),
        }
    }

    #[test]
    fn port_use_display() {
        let labelled = PortUse {
            kind: "backend".to_string(),
            port: 8000,
            label: Some("alpha".to_string()),
        };
        let bare = PortUse {
            kind: "listen".to_string(),
            port: 9229,
            label: Some(String::new()),
        };
        assert_eq!(labelled.to_string(), "backend:8000 (alpha)");
        assert_eq!(bare.to_string(), "listen:9229");
    }

    #[test]
    fn grappler_ports_only_for_running_rows() {
        let spec = |dir: &str| ServiceSpec {
            directory: PathBuf::from(dir),
            command: "./run".to_string(),
            ..ServiceSpec::default()
        };
        let mut groups = BTreeMap::new();
        for name in ["alpha", "beta"] {
            groups.insert(
                name.to_string(),
                Group {
                    name: name.to_string(),
                    backend: Some(spec(&format!("/src/{}-api", name))),
                    frontend: Some(spec(&format!("/src/{}-web", name))),
                },
            );
        }
        let config = GroupConfig::new(groups);

        let row = |name: &str, running: bool| GroupStatus {
            name: name.to_string(),
            running,
            backend_port: running.then_some(8000),
            frontend_port: running.then_some(5000),
            access: None,
            backend_branch: None,
            frontend_branch: None,
        };

        let ports = grappler_ports(&config, &[row("alpha", true), row("beta", false)]);
        assert_eq!(ports.len(), 2);
        assert_eq!(
            ports[Path::new("/src/alpha-web")][0].to_string(),
            "frontend:5000 (alpha)"
        );
        assert!(!ports.contains_key(Path::new("/src/beta-api")));
    }

    #[test]
    fn port_map_merges_listeners_into_deepest_worktree() {
        let mut repos = BTreeMap::new();
        repos.insert(
            PathBuf::from("/src/web/.git"),
            vec![
                wt("/src/web/wt/lisbon", "feature"),
                wt("/src/web", "main"),
            ],
        );

        let mut running = HashMap::new();
        running.insert(
            PathBuf::from("/src/web/wt/lisbon"),
            vec![PortUse {
                kind: "frontend".to_string(),
                port: 5000,
                label: Some("dakar-lisbon".to_string()),
            }],
        );

        let listeners = vec![
            listener(5000, "node", Some("/src/web/wt/lisbon")),
            listener(6006, "storybook", Some("/src/web/wt/lisbon/packages/ui")),
            listener(9229, "node", Some("/src/web/tools")),
            listener(7000, "elsewhere", Some("/opt/other")),
            listener(7001, "unknown-cwd", None),
        ];

        let map = build_port_map(repos, running, &listeners);
        assert_eq!(map.len(), 1);
        assert_eq!(map[0].root, PathBuf::from("/src/web"));

        let rendered: Vec<(String, Vec<String>)> = map[0]
            .worktrees
            .iter()
            .map(|(worktree, ports)| {
                (
                    worktree.path.display().to_string(),
                    ports.iter().map(ToString::to_string).collect(),
                )
            })
            .collect();

        assert_eq!(
            rendered,
            vec![
                ("/src/web".to_string(), vec!["listen:9229 (node)".to_string()]),
                (
                    "/src/web/wt/lisbon".to_string(),
                    vec![
                        "frontend:5000 (dakar-lisbon)".to_string(),
                        "listen:6006 (storybook)".to_string(),
                    ]
                ),
            ]
        );
    }
}
