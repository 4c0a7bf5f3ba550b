//! Command line parsing
//!
//! clap definitions for the `grappler` binary.

use clap::{Parser, Subcommand};
use std::ffi::OsString;
use std::path::PathBuf;

/// grappler - run paired backend/frontend dev services per worktree
#[derive(Parser, Debug, Clone)]
#[command(
    name = "grappler",
    about = "Start, stop and inspect paired backend/frontend dev services",
    version
)]
pub struct Cli {
    /// Print debug diagnostics on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Scan both repositories for worktrees and write the group config
    Init {
        /// Backend repository (any worktree of it)
        #[arg(value_name = "BACKEND_REPO")]
        backend_repo: PathBuf,
        /// Frontend repository (any worktree of it)
        #[arg(value_name = "FRONTEND_REPO")]
        frontend_repo: PathBuf,
    },

    /// Allocate ports and start a group's services
    Start {
        group: String,
        /// Seconds to wait for each service to answer HTTP
        #[arg(long, value_name = "SECS", default_value_t = 30)]
        health_timeout: u64,
    },

    /// Stop a running group
    Stop { group: String },

    /// Show every group, its ports and the worktree port map
    Status,
}

impl Cli {
    /// Parse argv; clap prints usage and exits on failure.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    pub fn try_parse_args_from<I, T>(iter: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        Self::try_parse_from(iter)
    }

    /// Filter directive for the logger: `-v` turns on our debug output.
    pub fn log_level(&self) -> Option<&'static str> {
        self.verbose.then_some("grappler=debug")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_start_with_default_timeout() {
        let cli = Cli::try_parse_args_from(["grappler", "start", "alpha"]).unwrap();
        assert_eq!(
            cli.command,
            Commands::Start {
                group: "alpha".to_string(),
                health_timeout: 30
            }
        );
        assert_eq!(cli.log_level(), None);
    }

    #[test]
    fn parses_health_timeout_and_global_verbose() {
        let cli =
            Cli::try_parse_args_from(["grappler", "start", "beta", "--health-timeout", "5", "-v"])
                .unwrap();
        assert!(matches!(cli.command, Commands::Start { health_timeout: 5, .. }));
        assert_eq!(cli.log_level(), Some("grappler=debug"));
    }

    #[test]
    fn init_requires_both_repositories() {
        assert!(Cli::try_parse_args_from(["grappler", "init", "/src/core"]).is_err());

        let cli = Cli::try_parse_args_from(["grappler", "init", "/src/core", "/src/web"]).unwrap();
        assert_eq!(
            cli.command,
            Commands::Init {
                backend_repo: PathBuf::from("/src/core"),
                frontend_repo: PathBuf::from("/src/web"),
            }
        );
    }

    #[test]
    fn stop_and_status() {
        let cli = Cli::try_parse_args_from(["grappler", "stop", "alpha"]).unwrap();
        assert_eq!(
            cli.command,
            Commands::Stop {
                group: "alpha".to_string()
            }
        );
        let cli = Cli::try_parse_args_from(["grappler", "status"]).unwrap();
        assert_eq!(cli.command, Commands::Status);
    }

    #[test]
    fn subcommand_is_required() {
        assert!(Cli::try_parse_args_from(["grappler"]).is_err());
    }
}
