//! Logger bootstrap
//!
//! Diagnostics go to stderr so they never mix with command output on stdout.

use anyhow::Result;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the global tracing subscriber.
///
/// `log_level` wins when given; otherwise `RUST_LOG` is honoured, falling
/// back to `warn`.
pub fn init_logger(log_level: Option<&str>) -> Result<()> {
    let env_filter = match log_level {
        Some(level) => EnvFilter::try_new(level)?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .compact();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    tracing::debug!("Logger initialized");
    Ok(())
}
