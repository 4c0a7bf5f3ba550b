//! Platform-specific process primitives
//!
//! Unix gets real signal delivery; other targets compile but report every
//! pid as gone and refuse to terminate.

#[cfg(unix)]
mod unix;

#[cfg(unix)]
pub use unix::{prepare_command, process_alive, process_start_time, send_terminate};

#[cfg(not(unix))]
mod fallback {
    use std::io;

    pub fn prepare_command(_cmd: &mut tokio::process::Command) {}

    pub fn process_alive(_pid: u32) -> bool {
        false
    }

    pub fn send_terminate(_pid: u32) -> io::Result<()> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "process termination is only supported on Unix",
        ))
    }

    pub fn process_start_time(_pid: u32) -> Option<u64> {
        None
    }
}

#[cfg(not(unix))]
pub use fallback::{prepare_command, process_alive, process_start_time, send_terminate};
