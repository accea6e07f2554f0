//! Types of the `service_logs/v1` service.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Severity of a service log entry. Serialized capitalised, e.g. `Warning`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Debug,
    Info,
    Warning,
    Error,
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Severity::Debug => "Debug",
            Severity::Info => "Info",
            Severity::Warning => "Warning",
            Severity::Error => "Error",
            Severity::Fatal => "Fatal",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "debug" => Ok(Severity::Debug),
            "info" => Ok(Severity::Info),
            "warning" => Ok(Severity::Warning),
            "error" => Ok(Severity::Error),
            "fatal" => Ok(Severity::Fatal),
            _ => Err(format!("unknown severity '{}'", s)),
        }
    }
}

model! {
    /// Entry of the service log of a cluster.
    resource LogEntry = "LogEntry" {
        cluster_uuid: String,
        cluster_id: String,
        service_name: String,
        severity: Severity,
        summary: String,
        description: String,
        timestamp: DateTime<Utc>,
        username: String,
        internal_only: bool,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_entry_wire_format() {
        let json = r#"{
            "kind": "LogEntry",
            "id": "2xyz",
            "cluster_uuid": "c0ffee",
            "service_name": "SREManualAction",
            "severity": "Warning",
            "summary": "Node replaced",
            "timestamp": "2024-05-02T08:30:00Z",
            "internal_only": false
        }"#;

        let entry: LogEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.severity, Some(Severity::Warning));
        assert_eq!(entry.internal_only, Some(false));
        assert!(entry.username.is_none());

        let encoded = serde_json::to_value(&entry).unwrap();
        assert_eq!(encoded["severity"], "Warning");
        assert!(encoded.get("description").is_none());
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Debug < Severity::Warning);
        assert!(Severity::Fatal > Severity::Error);
        assert_eq!(Severity::Info.to_string(), "Info");
        assert_eq!("warning".parse::<Severity>(), Ok(Severity::Warning));
        assert!("loud".parse::<Severity>().is_err());
    }
}
