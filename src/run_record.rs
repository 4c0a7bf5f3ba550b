use crate::role::Role;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Persisted runtime facts about one group's processes and ports.
///
/// A zero port or pid in the state file is read back as absent, matching the
/// way older state files omitted unset values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRecord {
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "zero_as_none"
    )]
    pub backend_port: Option<u16>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "zero_as_none"
    )]
    pub frontend_port: Option<u16>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "zero_as_none"
    )]
    pub backend_pid: Option<u32>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "zero_as_none"
    )]
    pub frontend_pid: Option<u32>,
    #[serde(default)]
    pub running: bool,
    /// OS creation time of the backend process, milliseconds since the epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend_start_time: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frontend_start_time: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
}

fn zero_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default + PartialEq,
{
    let value = Option::<T>::deserialize(deserializer)?;
    Ok(value.filter(|v| *v != T::default()))
}

impl RunRecord {
    /// A fresh record for a start operation; services are filled in as they launch.
    pub fn started(started_at: DateTime<Utc>) -> Self {
        Self {
            running: true,
            started_at: Some(started_at),
            ..Self::default()
        }
    }

    pub fn port(&self, role: Role) -> Option<u16> {
        match role {
            Role::Backend => self.backend_port,
            Role::Frontend => self.frontend_port,
        }
    }

    pub fn pid(&self, role: Role) -> Option<u32> {
        match role {
            Role::Backend => self.backend_pid,
            Role::Frontend => self.frontend_pid,
        }
        .filter(|pid| *pid != 0)
    }

    pub fn start_time(&self, role: Role) -> Option<u64> {
        match role {
            Role::Backend => self.backend_start_time,
            Role::Frontend => self.frontend_start_time,
        }
    }

    pub fn set_service(&mut self, role: Role, port: u16, pid: u32, start_time: Option<u64>) {
        match role {
            Role::Backend => {
                self.backend_port = Some(port);
                self.backend_pid = Some(pid);
                self.backend_start_time = start_time;
            }
            Role::Frontend => {
                self.frontend_port = Some(port);
                self.frontend_pid = Some(pid);
                self.frontend_start_time = start_time;
            }
        }
    }

    pub fn has_process(&self) -> bool {
        Role::ALL.iter().any(|role| self.pid(*role).is_some())
    }

    /// Not running and no process to track: equivalent to having no record.
    pub fn is_vacant(&self) -> bool {
        !self.running && !self.has_process()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_values_deserialize_as_absent() {
        let record: RunRecord = serde_json::from_str(
            r#"{"backend_port": 8000, "frontend_port": 0, "backend_pid": 4242, "frontend_pid": 0, "running": true}"#,
        )
        .expect("record should parse");

        assert_eq!(record.backend_port, Some(8000));
        assert_eq!(record.frontend_port, None);
        assert_eq!(record.backend_pid, Some(4242));
        assert_eq!(record.frontend_pid, None);
        assert!(record.running);
    }

    #[test]
    fn legacy_record_without_start_times_parses() {
        let record: RunRecord =
            serde_json::from_str(r#"{"backend_port": 8001, "backend_pid": 99, "running": true}"#)
                .expect("legacy record should parse");
        assert_eq!(record.backend_start_time, None);
        assert_eq!(record.started_at, None);
    }

    #[test]
    fn absent_fields_are_not_serialized() {
        let mut record = RunRecord::default();
        record.set_service(Role::Backend, 8000, 1234, None);
        record.running = true;

        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"backend_port\":8000"));
        assert!(!json.contains("frontend_port"));
        assert!(!json.contains("backend_start_time"));
        assert!(json.contains("\"running\":true"));
    }

    #[test]
    fn vacancy() {
        assert!(RunRecord::default().is_vacant());

        let mut record = RunRecord::default();
        record.frontend_port = Some(5000);
        assert!(record.is_vacant(), "a port alone does not keep a record alive");

        record.set_service(Role::Frontend, 5000, 77, None);
        assert!(!record.is_vacant());
        assert!(record.has_process());
        assert_eq!(record.pid(Role::Backend), None);
    }
}
