//! Server interfaces of the `service_logs/v1` service and their dispatch.

use std::sync::Arc;

use async_trait::async_trait;
use axum::http::{Method, StatusCode};
use axum::response::Response;

use super::dispatch::{
    locate, read_body, read_list_request, send_method_not_allowed, send_not_found, write_empty,
    write_list, write_object, Call,
};
use super::request::{ListServerRequest, ListServerResponse, ServerResponse, ServerResult};
use crate::model::service_logs::LogEntry;

/// Root of version 1 of the service.
pub trait ServiceLogsServer: Send + Sync {
    fn cluster_logs(&self) -> Option<Arc<dyn ClusterLogsServer>>;
}

#[async_trait]
pub trait ClusterLogsServer: Send + Sync {
    /// Lists entries. Searches usually select a cluster with `cluster_id`.
    async fn list(&self, request: ListServerRequest) -> ServerResult<ListServerResponse<LogEntry>>;

    async fn add(&self, body: LogEntry) -> ServerResult<ServerResponse<LogEntry>>;

    fn log_entry(&self, id: &str) -> Option<Arc<dyn LogEntryServer>>;
}

#[async_trait]
pub trait LogEntryServer: Send + Sync {
    async fn get(&self) -> ServerResult<ServerResponse<LogEntry>>;

    async fn delete(&self) -> ServerResult<ServerResponse<()>>;
}

pub(crate) async fn dispatch(
    call: &Call,
    server: &dyn ServiceLogsServer,
    segments: &[&str],
) -> Response {
    match segments.split_first() {
        Some((&"cluster_logs", rest)) => {
            locate!(call, server.cluster_logs(), dispatch_cluster_logs, rest)
        }
        _ => send_not_found(call),
    }
}

async fn dispatch_cluster_logs(
    call: &Call,
    server: &dyn ClusterLogsServer,
    segments: &[&str],
) -> Response {
    match segments.split_first() {
        None => match call.method {
            Method::GET => match read_list_request(call) {
                Ok(request) => write_list(call, server.list(request).await),
                Err(response) => response,
            },
            Method::POST => match read_body(call) {
                Ok(body) => write_object(call, StatusCode::CREATED, server.add(body).await),
                Err(response) => response,
            },
            _ => send_method_not_allowed(call),
        },
        Some((id, rest)) => locate!(call, server.log_entry(id), dispatch_log_entry, rest),
    }
}

async fn dispatch_log_entry(
    call: &Call,
    server: &dyn LogEntryServer,
    segments: &[&str],
) -> Response {
    if !segments.is_empty() {
        return send_not_found(call);
    }
    match call.method {
        Method::GET => write_object(call, StatusCode::OK, server.get().await),
        Method::DELETE => write_empty(call, StatusCode::NO_CONTENT, server.delete().await),
        _ => send_method_not_allowed(call),
    }
}
