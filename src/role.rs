use crate::config::{
    BACKEND_PORT_END, BACKEND_PORT_ENV, BACKEND_PORT_START, FRONTEND_PORT_END, FRONTEND_PORT_ENV,
    FRONTEND_PORT_START,
};
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

/// Which half of a group a service plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Backend,
    Frontend,
}

impl Role {
    /// Provisioning order: backend always comes before frontend.
    pub const ALL: [Role; 2] = [Role::Backend, Role::Frontend];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Backend => "backend",
            Role::Frontend => "frontend",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Role::Backend => "Backend",
            Role::Frontend => "Frontend",
        }
    }

    pub fn port_range(&self) -> RangeInclusive<u16> {
        match self {
            Role::Backend => BACKEND_PORT_START..=BACKEND_PORT_END,
            Role::Frontend => FRONTEND_PORT_START..=FRONTEND_PORT_END,
        }
    }

    /// Environment variable carrying the allocated port into the child.
    pub fn port_env(&self) -> &'static str {
        match self {
            Role::Backend => BACKEND_PORT_ENV,
            Role::Frontend => FRONTEND_PORT_ENV,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranges_do_not_overlap() {
        let backend = Role::Backend.port_range();
        let frontend = Role::Frontend.port_range();
        assert!(frontend.end() < backend.start());
        assert_eq!(*backend.start(), 8000);
        assert_eq!(*frontend.start(), 5000);
    }

    #[test]
    fn port_env_names() {
        assert_eq!(Role::Backend.port_env(), "SERVER_PORT");
        assert_eq!(Role::Frontend.port_env(), "CONDUCTOR_PORT");
    }
}
