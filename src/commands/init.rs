use super::Context;
use crate::error::GrapplerResult;
use crate::group_config::GroupConfig;
use crate::logging::info;
use crate::storage::RunStateStore;
use crate::worktree;
use std::path::Path;

/// Scan both repositories, pair their worktrees and write the config.
///
/// An existing state file is left alone so running groups stay tracked.
pub fn init_config(
    ctx: &Context,
    backend_repo: &Path,
    frontend_repo: &Path,
) -> GrapplerResult<GroupConfig> {
    let backends = worktree::scan_worktrees(backend_repo)?;
    let frontends = worktree::scan_worktrees(frontend_repo)?;
    println!(
        "\nFound {} backend worktrees and {} frontend worktrees",
        backends.len(),
        frontends.len()
    );

    let config = GroupConfig::new(worktree::pair_worktrees(&backends, &frontends));
    ctx.save_config(&config)?;

    if !ctx.paths.state_file.exists() {
        ctx.save_state(&RunStateStore::new())?;
    }

    info(format!("wrote {} group(s)", config.groups.len()));
    Ok(config)
}

pub fn run(ctx: &Context, backend_repo: &Path, frontend_repo: &Path) -> GrapplerResult<()> {
    println!("Scanning worktrees...");
    println!("  Backend:  {}", backend_repo.display());
    println!("  Frontend: {}", frontend_repo.display());

    let config = init_config(ctx, backend_repo, frontend_repo)?;

    println!("\n✓ Configuration saved to {}", ctx.paths.config_file.display());
    println!("✓ State file at {}", ctx.paths.state_file.display());
    println!("\nDiscovered groups:");

    for (name, group) in &config.groups {
        println!("  {}:", name);
        for (label, spec) in [("Backend: ", &group.backend), ("Frontend:", &group.frontend)] {
            if let Some(spec) = spec {
                println!(
                    "    {} {} ({})",
                    label,
                    spec.directory.display(),
                    spec.branch.as_deref().unwrap_or("-")
                );
            }
        }
    }

    println!("\nRun 'grappler start <group>' to start a group");
    Ok(())
}
