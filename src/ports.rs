//! Port allocation
//!
//! Each role owns a fixed port range. Allocation walks the range upwards,
//! skips ports the run state already records for that role, and confirms the
//! remaining candidates with a throwaway bind so ports held by processes we
//! never started (leftovers from a crash, unrelated tools) are skipped too.
//!
//! Nothing is reserved: the port is free at the moment of the probe, and the
//! child that binds it later may still lose a race.

use crate::{error::PortError, logging::debug, role::Role, storage::RunStateStore};
use std::collections::HashSet;
use std::io::ErrorKind;
use std::net::{Ipv4Addr, Ipv6Addr, TcpListener};
use std::ops::RangeInclusive;

/// Lowest available port for `role` that `state` does not already claim.
pub fn allocate(role: Role, state: &RunStateStore) -> Result<u16, PortError> {
    let range = role.port_range();
    let claimed = state.claimed_ports(role);

    match first_available(range.clone(), &claimed, is_port_available) {
        Some(port) => {
            debug(format!("allocated {} port {}", role, port));
            Ok(port)
        }
        None => Err(PortError::NoAvailablePort {
            role,
            start: *range.start(),
            end: *range.end(),
        }),
    }
}

fn first_available<F>(range: RangeInclusive<u16>, claimed: &HashSet<u16>, probe: F) -> Option<u16>
where
    F: Fn(u16) -> bool,
{
    range
        .filter(|port| !claimed.contains(port))
        .find(|port| probe(*port))
}

/// Whether a TCP listener can bind `port` on the loopback interface right now.
///
/// Both `127.0.0.1` and `[::1]` must be free. A host without IPv6 loopback
/// only needs the IPv4 bind.
pub fn is_port_available(port: u16) -> bool {
    if TcpListener::bind((Ipv4Addr::LOCALHOST, port)).is_err() {
        return false;
    }

    match TcpListener::bind((Ipv6Addr::LOCALHOST, port)) {
        Ok(_) => true,
        Err(err) if matches!(err.kind(), ErrorKind::AddrNotAvailable | ErrorKind::Unsupported) => {
            true
        }
        #[cfg(unix)]
        Err(err) if err.raw_os_error() == Some(libc::EAFNOSUPPORT) => true,
        Err(_) => false,
    }
}
