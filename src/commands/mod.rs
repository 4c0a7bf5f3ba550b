//! Command handlers
//!
//! Each subcommand has a core function that does the work and persists state,
//! plus a `run` wrapper that prints progress for humans.

pub mod init;
pub mod parser;
pub mod start;
pub mod status;
pub mod stop;

pub use parser::{Cli, Commands};

use crate::error::GrapplerResult;
use crate::group_config::GroupConfig;
use crate::health::HealthProber;
use crate::storage::RunStateStore;
use crate::supervisor::ProcessSupervisor;
use crate::utils::GrapplerPaths;
use std::time::Duration;

/// Shared collaborators for one grappler invocation.
#[derive(Debug, Clone)]
pub struct Context {
    pub paths: GrapplerPaths,
    pub supervisor: ProcessSupervisor,
    pub prober: HealthProber,
}

impl Context {
    pub fn new(paths: GrapplerPaths) -> Self {
        Self {
            supervisor: ProcessSupervisor::new(&paths.logs_dir),
            prober: HealthProber::new(),
            paths,
        }
    }

    pub fn with_prober(mut self, prober: HealthProber) -> Self {
        self.prober = prober;
        self
    }

    pub fn load_config(&self) -> GrapplerResult<GroupConfig> {
        Ok(GroupConfig::load(&self.paths.config_file)?)
    }

    pub fn save_config(&self, config: &GroupConfig) -> GrapplerResult<()> {
        Ok(config.save(&self.paths.config_file)?)
    }

    pub fn load_state(&self) -> GrapplerResult<RunStateStore> {
        Ok(RunStateStore::load(&self.paths.state_file)?)
    }

    pub fn save_state(&self, state: &RunStateStore) -> GrapplerResult<()> {
        Ok(state.save(&self.paths.state_file)?)
    }
}

/// Dispatch a parsed subcommand.
pub async fn execute(ctx: &Context, command: Commands) -> GrapplerResult<()> {
    match command {
        Commands::Init {
            backend_repo,
            frontend_repo,
        } => init::run(ctx, &backend_repo, &frontend_repo),
        Commands::Start {
            group,
            health_timeout,
        } => start::run(ctx, &group, Duration::from_secs(health_timeout)).await,
        Commands::Stop { group } => stop::run(ctx, &group),
        Commands::Status => status::run(ctx),
    }
}

pub(crate) fn rule(ch: char, width: usize) -> String {
    std::iter::repeat(ch).take(width).collect()
}
