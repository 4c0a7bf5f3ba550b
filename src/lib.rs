//! Grappler Library
//!
//! Runs paired backend/frontend development services per git worktree, with
//! non-colliding port allocation, pid tracking across invocations and HTTP
//! readiness checks.

pub mod commands;
pub mod config;
pub mod error;
pub mod group_config;
pub mod health;
pub mod listening;
pub mod logging;
pub mod platform;
pub mod ports;
pub mod role;
pub mod run_record;
pub mod storage;
pub mod supervisor;
pub mod utils;
pub mod worktree;

// Re-export commonly used types for convenience
pub use commands::Context;
pub use error::{GrapplerError, GrapplerResult};
pub use group_config::{Group, GroupConfig, ProxyConfig, ServiceSpec};
pub use health::HealthProber;
pub use role::Role;
pub use run_record::RunRecord;
pub use storage::RunStateStore;
pub use supervisor::{Liveness, ProcessSupervisor};
pub use utils::GrapplerPaths;
