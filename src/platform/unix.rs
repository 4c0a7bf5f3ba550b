use crate::logging::debug;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use std::io;

/// Put the child in its own process group.
///
/// Services must outlive the grappler invocation that started them, so a
/// Ctrl-C aimed at the terminal's foreground group must not reach them.
pub fn prepare_command(cmd: &mut tokio::process::Command) {
    // SAFETY: setpgid is async-signal-safe and touches no parent state.
    unsafe {
        cmd.pre_exec(|| {
            if libc::setpgid(0, 0) != 0 {
                return Err(io::Error::last_os_error());
            }
            Ok(())
        });
    }
}

/// Liveness probe with signal 0. Any failure, EPERM included, counts as gone.
pub fn process_alive(pid: u32) -> bool {
    match to_pid(pid) {
        Some(pid) => kill(pid, None).is_ok(),
        None => false,
    }
}

/// Send SIGTERM once. No waiting, no SIGKILL escalation.
pub fn send_terminate(pid: u32) -> io::Result<()> {
    let target = to_pid(pid).ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidInput, format!("invalid pid {}", pid))
    })?;
    kill(target, Signal::SIGTERM).map_err(io::Error::from)?;
    debug(format!("pid={} sent SIGTERM", pid));
    Ok(())
}

/// Creation time of `pid` in milliseconds since the Unix epoch.
pub fn process_start_time(pid: u32) -> Option<u64> {
    let process = psutil::process::Process::new(pid).ok()?;
    Some(process.create_time().as_millis() as u64)
}

// 0 and values that would wrap negative address process groups in kill(2)
fn to_pid(pid: u32) -> Option<Pid> {
    match i32::try_from(pid) {
        Ok(raw) if raw > 0 => Some(Pid::from_raw(raw)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn current_process_is_alive() {
        assert!(process_alive(std::process::id()));
    }

    #[test]
    fn pid_zero_and_group_targets_are_rejected() {
        assert!(!process_alive(0));
        assert!(!process_alive(u32::MAX));
        assert!(send_terminate(0).is_err());
        assert!(send_terminate(u32::MAX).is_err());
    }

    #[test]
    fn nonexistent_pid_is_not_alive() {
        assert!(!process_alive(0x7FFF_FFF0));
        assert!(send_terminate(0x7FFF_FFF0).is_err());
    }

    #[test]
    fn start_time_of_current_process_is_in_the_past() {
        let started = process_start_time(std::process::id()).expect("own start time");
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_millis() as u64;
        assert!(started <= now + 1000);
        assert!(started > 0);
    }
}
