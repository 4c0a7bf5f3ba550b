use super::Context;
use crate::error::{GrapplerError, GrapplerResult, ProcessError};
use crate::logging::info;
use crate::role::Role;
use crate::storage::RunStateStore;
use crate::supervisor::Liveness;

#[derive(Debug)]
pub enum StopOutcome {
    Stopped,
    /// The process was already gone; nothing was signalled.
    AlreadyExited,
    /// The pid now belongs to an unrelated process; nothing was signalled.
    PidReused,
    Failed(ProcessError),
}

#[derive(Debug)]
pub struct StoppedService {
    pub role: Role,
    pub pid: u32,
    pub outcome: StopOutcome,
}

#[derive(Debug)]
pub struct StopReport {
    pub group: String,
    pub services: Vec<StoppedService>,
}

/// Signal a running group's processes and forget its record.
///
/// Individual termination failures are reported, not raised; the record is
/// removed and the state saved either way.
pub fn stop_group(ctx: &Context, state: &RunStateStore, name: &str) -> GrapplerResult<StopReport> {
    let record = state
        .get(name)
        .filter(|record| record.running)
        .ok_or_else(|| GrapplerError::NotRunning(name.to_string()))?;

    let mut services = Vec::new();
    for role in Role::ALL {
        let Some(pid) = record.pid(role) else {
            continue;
        };

        let outcome = match ctx.supervisor.check(Some(pid), record.start_time(role)) {
            Liveness::Exited => StopOutcome::AlreadyExited,
            Liveness::Reused => StopOutcome::PidReused,
            Liveness::Alive => match ctx.supervisor.stop(Some(pid)) {
                Ok(()) => StopOutcome::Stopped,
                Err(err) => StopOutcome::Failed(err),
            },
        };
        services.push(StoppedService { role, pid, outcome });
    }

    state.delete(name);
    ctx.save_state(state)?;
    info(format!("group {} stopped", name));

    Ok(StopReport {
        group: name.to_string(),
        services,
    })
}

pub fn run(ctx: &Context, name: &str) -> GrapplerResult<()> {
    let state = ctx.load_state()?;

    println!("Stopping group {:?}...", name);
    let report = stop_group(ctx, &state, name)?;

    for service in &report.services {
        let label = service.role.display_name();
        match &service.outcome {
            StopOutcome::Stopped => println!("✓ {} stopped (PID: {})", label, service.pid),
            StopOutcome::AlreadyExited => {
                println!("✓ {} already exited (PID: {})", label, service.pid)
            }
            StopOutcome::PidReused => println!(
                "⚠ {} PID {} now belongs to another process; not signalled",
                label, service.pid
            ),
            StopOutcome::Failed(err) => println!("⚠ Failed to stop {}: {}", service.role, err),
        }
    }

    println!("\n✓ Group {:?} stopped", report.group);
    Ok(())
}
