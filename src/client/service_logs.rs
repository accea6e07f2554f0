//! Clients of the `service_logs/v1` service.

use super::request::{AddRequest, DeleteRequest, GetRequest, ListRequest, RequestCore};
use super::Connection;
use crate::model::service_logs::LogEntry;

/// Root of the `service_logs` service, before the version segment.
#[derive(Debug, Clone)]
pub struct ServiceLogsClient {
    connection: Connection,
    path: String,
}

impl ServiceLogsClient {
    pub(crate) fn new(connection: Connection, path: String) -> Self {
        Self { connection, path }
    }

    pub fn v1(&self) -> Client {
        Client {
            connection: self.connection.clone(),
            path: format!("{}/v1", self.path),
        }
    }
}

/// Root of version 1 of the `service_logs` service.
#[derive(Debug, Clone)]
pub struct Client {
    connection: Connection,
    path: String,
}

impl Client {
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn cluster_logs(&self) -> ClusterLogsClient {
        ClusterLogsClient {
            connection: self.connection.clone(),
            path: format!("{}/cluster_logs", self.path),
        }
    }
}

/// Service log entries of all the clusters.
#[derive(Debug, Clone)]
pub struct ClusterLogsClient {
    connection: Connection,
    path: String,
}

impl ClusterLogsClient {
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Lists entries. Use `search("cluster_id = '...'")` to select a cluster.
    pub fn list(&self) -> ListRequest<LogEntry> {
        ListRequest::new(RequestCore::new(self.connection.clone(), self.path.clone()))
    }

    pub fn add(&self) -> AddRequest<LogEntry> {
        AddRequest::add(RequestCore::new(self.connection.clone(), self.path.clone()))
    }

    pub fn log_entry(&self, id: &str) -> LogEntryClient {
        LogEntryClient {
            connection: self.connection.clone(),
            path: format!("{}/{}", self.path, super::encode_segment(id)),
        }
    }
}

/// Single service log entry.
#[derive(Debug, Clone)]
pub struct LogEntryClient {
    connection: Connection,
    path: String,
}

impl LogEntryClient {
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn get(&self) -> GetRequest<LogEntry> {
        GetRequest::new(RequestCore::new(self.connection.clone(), self.path.clone()))
    }

    pub fn delete(&self) -> DeleteRequest {
        DeleteRequest::delete(RequestCore::new(self.connection.clone(), self.path.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths() {
        let connection = Connection::builder()
            .url("https://api.example.com")
            .build()
            .unwrap();
        let logs = connection.service_logs().v1().cluster_logs();

        assert_eq!(logs.path(), "/api/service_logs/v1/cluster_logs");
        assert_eq!(
            logs.log_entry("2abc").path(),
            "/api/service_logs/v1/cluster_logs/2abc"
        );
    }
}
