use super::{rule, Context};
use crate::config::PROXY_PORT;
use crate::error::{GrapplerError, GrapplerResult};
use crate::group_config::{Group, GroupConfig};
use crate::logging::{info, warn};
use crate::ports;
use crate::role::Role;
use crate::run_record::RunRecord;
use crate::storage::RunStateStore;
use chrono::Utc;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// One service brought up by `launch_group`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchedService {
    pub role: Role,
    pub port: u16,
    pub pid: u32,
    pub log_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchedGroup {
    pub name: String,
    /// Backend first when present.
    pub services: Vec<LaunchedService>,
}

impl LaunchedGroup {
    pub fn service(&self, role: Role) -> Option<&LaunchedService> {
        self.services.iter().find(|service| service.role == role)
    }
}

/// Look up `name` and make sure it has something to run.
pub fn resolve_group<'a>(config: &'a GroupConfig, name: &str) -> GrapplerResult<&'a Group> {
    let group = config
        .group(name)
        .ok_or_else(|| GrapplerError::GroupNotFound(name.to_string()))?;
    if group.is_empty() {
        return Err(GrapplerError::EmptyGroup(name.to_string()));
    }
    Ok(group)
}

/// Allocate ports, spawn the group's services and persist the run record.
///
/// Every port is allocated before anything is spawned. If a later service
/// fails to spawn, the ones already running are stopped and no record is
/// written. Health is not checked here.
pub async fn launch_group(
    ctx: &Context,
    config: &GroupConfig,
    state: &RunStateStore,
    name: &str,
) -> GrapplerResult<LaunchedGroup> {
    let group = resolve_group(config, name)?;

    if state.get(name).is_some_and(|record| record.running) {
        return Err(GrapplerError::AlreadyRunning(name.to_string()));
    }

    let mut planned = Vec::new();
    for role in Role::ALL {
        if let Some(spec) = group.service(role) {
            let port = ports::allocate(role, state).map_err(|source| {
                GrapplerError::PortAllocation {
                    group: name.to_string(),
                    source,
                }
            })?;
            planned.push((role, spec, port));
        }
    }

    let mut record = RunRecord::started(Utc::now());
    let mut launched: Vec<LaunchedService> = Vec::new();

    for (role, spec, port) in planned {
        let extra_env = BTreeMap::from([(role.port_env().to_string(), port.to_string())]);

        let pid = match ctx.supervisor.start(spec, role, name, &extra_env).await {
            Ok(pid) => pid,
            Err(err) => {
                for service in &launched {
                    if let Err(stop_err) = ctx.supervisor.stop(Some(service.pid)) {
                        warn(format!(
                            "failed to stop {} after aborted start: {}",
                            service.role, stop_err
                        ));
                    }
                }
                return Err(err.into());
            }
        };

        record.set_service(role, port, pid, ctx.supervisor.start_time(pid));
        launched.push(LaunchedService {
            role,
            port,
            pid,
            log_path: ctx.supervisor.log_path(name, role),
        });
    }

    state.set(name, record);
    ctx.save_state(state)?;
    info(format!("group {} started", name));

    Ok(LaunchedGroup {
        name: name.to_string(),
        services: launched,
    })
}

pub fn proxy_url(frontend_port: u16) -> String {
    format!("http://{}.port.localhost:{}", frontend_port, PROXY_PORT)
}

pub async fn run(ctx: &Context, name: &str, health_timeout: Duration) -> GrapplerResult<()> {
    let config = ctx.load_config()?;
    resolve_group(&config, name)?;
    let state = ctx.load_state()?;

    println!("Starting group {:?}...", name);
    let launched = launch_group(ctx, &config, &state, name).await?;

    for service in &launched.services {
        println!(
            "✓ {} started on port {} (PID: {})",
            service.role.display_name(),
            service.port,
            service.pid
        );
    }

    println!("\nWaiting for services to be healthy...");
    for service in &launched.services {
        let label = service.role.display_name();
        match ctx.prober.wait_for_health(service.port, health_timeout).await {
            Ok(()) => println!("✓ {} healthy (http://localhost:{})", label, service.port),
            Err(err) => {
                println!("⚠ {} health check failed: {}", label, err);
                println!("  Check logs: {}", service.log_path.display());
            }
        }
    }

    print_banner(&launched, config.proxy_enabled());
    Ok(())
}

fn print_banner(launched: &LaunchedGroup, proxy_enabled: bool) {
    println!("\n{}", rule('=', 50));
    println!("Group {:?} is running", launched.name);

    let backend = launched.service(Role::Backend);
    let frontend = launched.service(Role::Frontend);

    if let Some(frontend) = frontend {
        if proxy_enabled {
            println!("\nAccess frontend via conductor proxy:");
            println!("  {}", proxy_url(frontend.port));
        }
        println!("\nDirect access:");
    }
    if let Some(backend) = backend {
        println!("  Backend:  http://localhost:{}", backend.port);
    }
    if let Some(frontend) = frontend {
        println!("  Frontend: http://localhost:{}", frontend.port);
    }

    println!("\n{}", rule('=', 50));
}
