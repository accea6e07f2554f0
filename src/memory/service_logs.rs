use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use super::search::select;
use super::{paginate, sorted, MemoryServer, Store, CLUSTER_LOGS_PATH};
use crate::model::clusters_mgmt::Cluster;
use crate::model::service_logs::{LogEntry, Severity};
use crate::model::{ObjectMeta, Resource};
use crate::server::service_logs::{ClusterLogsServer, LogEntryServer, ServiceLogsServer};
use crate::server::{
    ListServerRequest, ListServerResponse, ServerError, ServerResponse, ServerResult,
};

/// Service name of the entries written by the server itself
const SERVICE_NAME: &str = "ClusterLifecycle";

const LOG_ENTRY_FIELDS: &[&str] = &[
    "id",
    "cluster_id",
    "cluster_uuid",
    "severity",
    "service_name",
];

fn log_entry_field(entry: &LogEntry, name: &str) -> Option<String> {
    match name {
        "id" => entry.object_id().map(str::to_string),
        "cluster_id" => entry.cluster_id.clone(),
        "cluster_uuid" => entry.cluster_uuid.clone(),
        "severity" => entry.severity.map(|s| s.to_string()),
        "service_name" => entry.service_name.clone(),
        _ => None,
    }
}

impl Store {
    /// Writes an entry to the service log of `cluster`.
    pub(super) fn record_log(
        &self,
        cluster: &Cluster,
        severity: Severity,
        summary: &str,
        description: String,
    ) {
        let mut entry = LogEntry::new()
            .service_name(SERVICE_NAME)
            .severity(severity)
            .summary(summary)
            .description(description)
            .timestamp(Utc::now())
            .internal_only(false);
        entry.cluster_id = cluster.object_id().map(str::to_string);
        entry.cluster_uuid = cluster.external_id.clone();
        self.insert_log_entry(entry);
    }

    fn insert_log_entry(&self, mut entry: LogEntry) -> LogEntry {
        let id = Uuid::new_v4().simple().to_string();
        entry.meta = ObjectMeta {
            kind: Some(LogEntry::KIND.to_string()),
            id: Some(id.clone()),
            href: Some(format!("{}/{}", CLUSTER_LOGS_PATH, id)),
        };
        entry.timestamp.get_or_insert_with(Utc::now);
        debug!(
            "Service log entry '{}' for cluster '{}': {}",
            id,
            entry.cluster_id.as_deref().unwrap_or_default(),
            entry.summary.as_deref().unwrap_or_default()
        );
        self.log_entries.insert(id, self.stored(entry.clone()));
        entry
    }
}

impl ServiceLogsServer for MemoryServer {
    fn cluster_logs(&self) -> Option<Arc<dyn ClusterLogsServer>> {
        Some(Arc::new(ClusterLogs {
            store: self.store.clone(),
        }))
    }
}

struct ClusterLogs {
    store: Arc<Store>,
}

#[async_trait]
impl ClusterLogsServer for ClusterLogs {
    async fn list(&self, request: ListServerRequest) -> ServerResult<ListServerResponse<LogEntry>> {
        let entries = sorted(&self.store.log_entries, LogEntry::clone);
        let entries = select(
            entries,
            request.search.as_deref(),
            request.order.as_deref(),
            LOG_ENTRY_FIELDS,
            log_entry_field,
        )
        .map_err(ServerError::BadRequest)?;
        paginate(entries, &request)
    }

    async fn add(&self, body: LogEntry) -> ServerResult<ServerResponse<LogEntry>> {
        if body.cluster_id.is_none() && body.cluster_uuid.is_none() {
            return Err(ServerError::BadRequest(
                "One of 'cluster_id' or 'cluster_uuid' is mandatory".to_string(),
            ));
        }
        if body.summary.as_deref().map_or(true, |s| s.trim().is_empty()) {
            return Err(ServerError::BadRequest("Summary is mandatory".to_string()));
        }
        let mut body = body;
        body.severity.get_or_insert(Severity::Info);
        let entry = self.store.insert_log_entry(body);
        info!(
            "Added service log entry '{}'",
            entry.object_id().unwrap_or_default()
        );
        Ok(ServerResponse::with_body(entry))
    }

    fn log_entry(&self, id: &str) -> Option<Arc<dyn LogEntryServer>> {
        if !self.store.log_entries.contains_key(id) {
            return None;
        }
        Some(Arc::new(LogEntryItem {
            store: self.store.clone(),
            id: id.to_string(),
        }))
    }
}

struct LogEntryItem {
    store: Arc<Store>,
    id: String,
}

impl LogEntryItem {
    fn not_found(&self) -> ServerError {
        ServerError::NotFound(format!("Service log entry '{}' not found", self.id))
    }
}

#[async_trait]
impl LogEntryServer for LogEntryItem {
    async fn get(&self) -> ServerResult<ServerResponse<LogEntry>> {
        self.store
            .log_entries
            .get(&self.id)
            .map(|entry| ServerResponse::with_body(entry.value.clone()))
            .ok_or_else(|| self.not_found())
    }

    async fn delete(&self) -> ServerResult<ServerResponse<()>> {
        self.store
            .log_entries
            .remove(&self.id)
            .ok_or_else(|| self.not_found())?;
        Ok(ServerResponse::empty())
    }
}
