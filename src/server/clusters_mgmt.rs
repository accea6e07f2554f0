//! Server interfaces of the `clusters_mgmt/v1` service and their dispatch.
//!
//! Collections expose `list`/`add` and a locator of their items; items
//! expose `get`/`update`/`delete` and locators of their sub-resources. A
//! locator that returns `None` makes the dispatcher answer 404.

use std::sync::Arc;

use async_trait::async_trait;
use axum::http::{Method, StatusCode};
use axum::response::Response;

use super::dispatch::{
    locate, read_body, read_list_request, read_query, send_method_not_allowed, send_not_found,
    write_empty, write_list, write_object, Call,
};
use super::request::{
    ClusterDeleteServerRequest, ListServerRequest, ListServerResponse, ServerResponse,
    ServerResult,
};
use crate::model::clusters_mgmt::{
    AddOn, AddOnInstallation, Cluster, ClusterStatus, Credentials, Event, Group, Log,
    ProvisionShard, User, Version,
};

/// Root of version 1 of the service.
pub trait ClustersMgmtServer: Send + Sync {
    fn clusters(&self) -> Option<Arc<dyn ClustersServer>>;

    fn addons(&self) -> Option<Arc<dyn AddOnsServer>>;

    fn versions(&self) -> Option<Arc<dyn VersionsServer>>;

    fn events(&self) -> Option<Arc<dyn EventsServer>>;
}

#[async_trait]
pub trait ClustersServer: Send + Sync {
    async fn list(&self, request: ListServerRequest) -> ServerResult<ListServerResponse<Cluster>>;

    /// Provisions a new cluster, 201 unless the response says otherwise.
    async fn add(&self, body: Cluster) -> ServerResult<ServerResponse<Cluster>>;

    fn cluster(&self, id: &str) -> Option<Arc<dyn ClusterServer>>;
}

#[async_trait]
pub trait ClusterServer: Send + Sync {
    async fn get(&self) -> ServerResult<ServerResponse<Cluster>>;

    async fn update(&self, body: Cluster) -> ServerResult<ServerResponse<Cluster>>;

    async fn delete(&self, request: ClusterDeleteServerRequest)
        -> ServerResult<ServerResponse<()>>;

    async fn hibernate(&self) -> ServerResult<ServerResponse<()>>;

    async fn resume(&self) -> ServerResult<ServerResponse<()>>;

    fn addons(&self) -> Option<Arc<dyn AddOnInstallationsServer>>;

    fn groups(&self) -> Option<Arc<dyn GroupsServer>>;

    fn logs(&self) -> Option<Arc<dyn LogsServer>>;

    fn credentials(&self) -> Option<Arc<dyn CredentialsServer>>;

    fn provision_shard(&self) -> Option<Arc<dyn ProvisionShardServer>>;

    fn status(&self) -> Option<Arc<dyn ClusterStatusServer>>;
}

#[async_trait]
pub trait AddOnInstallationsServer: Send + Sync {
    async fn list(
        &self,
        request: ListServerRequest,
    ) -> ServerResult<ListServerResponse<AddOnInstallation>>;

    async fn add(&self, body: AddOnInstallation) -> ServerResult<ServerResponse<AddOnInstallation>>;

    fn addon(&self, id: &str) -> Option<Arc<dyn AddOnInstallationServer>>;
}

#[async_trait]
pub trait AddOnInstallationServer: Send + Sync {
    async fn get(&self) -> ServerResult<ServerResponse<AddOnInstallation>>;

    async fn update(
        &self,
        body: AddOnInstallation,
    ) -> ServerResult<ServerResponse<AddOnInstallation>>;

    async fn delete(&self) -> ServerResult<ServerResponse<()>>;
}

#[async_trait]
pub trait GroupsServer: Send + Sync {
    async fn list(&self, request: ListServerRequest) -> ServerResult<ListServerResponse<Group>>;

    fn group(&self, id: &str) -> Option<Arc<dyn GroupServer>>;
}

#[async_trait]
pub trait GroupServer: Send + Sync {
    async fn get(&self) -> ServerResult<ServerResponse<Group>>;

    fn users(&self) -> Option<Arc<dyn UsersServer>>;
}

#[async_trait]
pub trait UsersServer: Send + Sync {
    async fn list(&self, request: ListServerRequest) -> ServerResult<ListServerResponse<User>>;

    async fn add(&self, body: User) -> ServerResult<ServerResponse<User>>;

    fn user(&self, id: &str) -> Option<Arc<dyn UserServer>>;
}

#[async_trait]
pub trait UserServer: Send + Sync {
    async fn get(&self) -> ServerResult<ServerResponse<User>>;

    async fn delete(&self) -> ServerResult<ServerResponse<()>>;
}

#[async_trait]
pub trait LogsServer: Send + Sync {
    async fn list(&self, request: ListServerRequest) -> ServerResult<ListServerResponse<Log>>;

    fn log(&self, id: &str) -> Option<Arc<dyn LogServer>>;
}

#[async_trait]
pub trait LogServer: Send + Sync {
    async fn get(&self) -> ServerResult<ServerResponse<Log>>;
}

#[async_trait]
pub trait CredentialsServer: Send + Sync {
    async fn get(&self) -> ServerResult<ServerResponse<Credentials>>;
}

#[async_trait]
pub trait ProvisionShardServer: Send + Sync {
    async fn get(&self) -> ServerResult<ServerResponse<ProvisionShard>>;
}

#[async_trait]
pub trait ClusterStatusServer: Send + Sync {
    async fn get(&self) -> ServerResult<ServerResponse<ClusterStatus>>;
}

#[async_trait]
pub trait AddOnsServer: Send + Sync {
    async fn list(&self, request: ListServerRequest) -> ServerResult<ListServerResponse<AddOn>>;

    async fn add(&self, body: AddOn) -> ServerResult<ServerResponse<AddOn>>;

    fn addon(&self, id: &str) -> Option<Arc<dyn AddOnServer>>;
}

#[async_trait]
pub trait AddOnServer: Send + Sync {
    async fn get(&self) -> ServerResult<ServerResponse<AddOn>>;

    async fn update(&self, body: AddOn) -> ServerResult<ServerResponse<AddOn>>;

    async fn delete(&self) -> ServerResult<ServerResponse<()>>;
}

#[async_trait]
pub trait VersionsServer: Send + Sync {
    async fn list(&self, request: ListServerRequest) -> ServerResult<ListServerResponse<Version>>;

    fn version(&self, id: &str) -> Option<Arc<dyn VersionServer>>;
}

#[async_trait]
pub trait VersionServer: Send + Sync {
    async fn get(&self) -> ServerResult<ServerResponse<Version>>;
}

#[async_trait]
pub trait EventsServer: Send + Sync {
    async fn add(&self, body: Event) -> ServerResult<ServerResponse<Event>>;
}

// ============================================================================
// Dispatch
// ============================================================================

pub(crate) async fn dispatch(
    call: &Call,
    server: &dyn ClustersMgmtServer,
    segments: &[&str],
) -> Response {
    match segments.split_first() {
        Some((&"clusters", rest)) => locate!(call, server.clusters(), dispatch_clusters, rest),
        Some((&"addons", rest)) => locate!(call, server.addons(), dispatch_addons, rest),
        Some((&"versions", rest)) => locate!(call, server.versions(), dispatch_versions, rest),
        Some((&"events", rest)) => locate!(call, server.events(), dispatch_events, rest),
        _ => send_not_found(call),
    }
}

async fn dispatch_clusters(call: &Call, server: &dyn ClustersServer, segments: &[&str]) -> Response {
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
        Some((id, rest)) => locate!(call, server.cluster(id), dispatch_cluster, rest),
    }
}

async fn dispatch_cluster(call: &Call, server: &dyn ClusterServer, segments: &[&str]) -> Response {
    match segments.split_first() {
        None => match call.method {
            Method::GET => write_object(call, StatusCode::OK, server.get().await),
            Method::PATCH => match read_body(call) {
                Ok(body) => write_object(call, StatusCode::OK, server.update(body).await),
                Err(response) => response,
            },
            Method::DELETE => match read_query(call, ClusterDeleteServerRequest::from_query) {
                Ok(request) => write_empty(call, StatusCode::NO_CONTENT, server.delete(request).await),
                Err(response) => response,
            },
            _ => send_method_not_allowed(call),
        },
        Some((&"hibernate", [])) => match call.method {
            Method::POST => write_empty(call, StatusCode::OK, server.hibernate().await),
            _ => send_method_not_allowed(call),
        },
        Some((&"resume", [])) => match call.method {
            Method::POST => write_empty(call, StatusCode::OK, server.resume().await),
            _ => send_method_not_allowed(call),
        },
        Some((&"addons", rest)) => {
            locate!(call, server.addons(), dispatch_addon_installations, rest)
        }
        Some((&"groups", rest)) => locate!(call, server.groups(), dispatch_groups, rest),
        Some((&"logs", rest)) => locate!(call, server.logs(), dispatch_logs, rest),
        Some((&"credentials", rest)) => {
            locate!(call, server.credentials(), dispatch_credentials, rest)
        }
        Some((&"provision_shard", rest)) => {
            locate!(call, server.provision_shard(), dispatch_provision_shard, rest)
        }
        Some((&"status", rest)) => locate!(call, server.status(), dispatch_cluster_status, rest),
        _ => send_not_found(call),
    }
}

async fn dispatch_addon_installations(
    call: &Call,
    server: &dyn AddOnInstallationsServer,
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
        Some((id, rest)) => {
            locate!(call, server.addon(id), dispatch_addon_installation, rest)
        }
    }
}

async fn dispatch_addon_installation(
    call: &Call,
    server: &dyn AddOnInstallationServer,
    segments: &[&str],
) -> Response {
    if !segments.is_empty() {
        return send_not_found(call);
    }
    match call.method {
        Method::GET => write_object(call, StatusCode::OK, server.get().await),
        Method::PATCH => match read_body(call) {
            Ok(body) => write_object(call, StatusCode::OK, server.update(body).await),
            Err(response) => response,
        },
        Method::DELETE => write_empty(call, StatusCode::NO_CONTENT, server.delete().await),
        _ => send_method_not_allowed(call),
    }
}

async fn dispatch_groups(call: &Call, server: &dyn GroupsServer, segments: &[&str]) -> Response {
    match segments.split_first() {
        None => match call.method {
            Method::GET => match read_list_request(call) {
                Ok(request) => write_list(call, server.list(request).await),
                Err(response) => response,
            },
            _ => send_method_not_allowed(call),
        },
        Some((id, rest)) => locate!(call, server.group(id), dispatch_group, rest),
    }
}

async fn dispatch_group(call: &Call, server: &dyn GroupServer, segments: &[&str]) -> Response {
    match segments.split_first() {
        None => match call.method {
            Method::GET => write_object(call, StatusCode::OK, server.get().await),
            _ => send_method_not_allowed(call),
        },
        Some((&"users", rest)) => locate!(call, server.users(), dispatch_users, rest),
        _ => send_not_found(call),
    }
}

async fn dispatch_users(call: &Call, server: &dyn UsersServer, segments: &[&str]) -> Response {
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
        Some((id, rest)) => locate!(call, server.user(id), dispatch_user, rest),
    }
}

async fn dispatch_user(call: &Call, server: &dyn UserServer, segments: &[&str]) -> Response {
    if !segments.is_empty() {
        return send_not_found(call);
    }
    match call.method {
        Method::GET => write_object(call, StatusCode::OK, server.get().await),
        Method::DELETE => write_empty(call, StatusCode::NO_CONTENT, server.delete().await),
        _ => send_method_not_allowed(call),
    }
}

async fn dispatch_logs(call: &Call, server: &dyn LogsServer, segments: &[&str]) -> Response {
    match segments.split_first() {
        None => match call.method {
            Method::GET => match read_list_request(call) {
                Ok(request) => write_list(call, server.list(request).await),
                Err(response) => response,
            },
            _ => send_method_not_allowed(call),
        },
        Some((id, rest)) => locate!(call, server.log(id), dispatch_log, rest),
    }
}

async fn dispatch_log(call: &Call, server: &dyn LogServer, segments: &[&str]) -> Response {
    if !segments.is_empty() {
        return send_not_found(call);
    }
    match call.method {
        Method::GET => write_object(call, StatusCode::OK, server.get().await),
        _ => send_method_not_allowed(call),
    }
}

async fn dispatch_credentials(
    call: &Call,
    server: &dyn CredentialsServer,
    segments: &[&str],
) -> Response {
    if !segments.is_empty() {
        return send_not_found(call);
    }
    match call.method {
        Method::GET => write_object(call, StatusCode::OK, server.get().await),
        _ => send_method_not_allowed(call),
    }
}

async fn dispatch_provision_shard(
    call: &Call,
    server: &dyn ProvisionShardServer,
    segments: &[&str],
) -> Response {
    if !segments.is_empty() {
        return send_not_found(call);
    }
    match call.method {
        Method::GET => write_object(call, StatusCode::OK, server.get().await),
        _ => send_method_not_allowed(call),
    }
}

async fn dispatch_cluster_status(
    call: &Call,
    server: &dyn ClusterStatusServer,
    segments: &[&str],
) -> Response {
    if !segments.is_empty() {
        return send_not_found(call);
    }
    match call.method {
        Method::GET => write_object(call, StatusCode::OK, server.get().await),
        _ => send_method_not_allowed(call),
    }
}

async fn dispatch_addons(call: &Call, server: &dyn AddOnsServer, segments: &[&str]) -> Response {
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
        Some((id, rest)) => locate!(call, server.addon(id), dispatch_addon, rest),
    }
}

async fn dispatch_addon(call: &Call, server: &dyn AddOnServer, segments: &[&str]) -> Response {
    if !segments.is_empty() {
        return send_not_found(call);
    }
    match call.method {
        Method::GET => write_object(call, StatusCode::OK, server.get().await),
        Method::PATCH => match read_body(call) {
            Ok(body) => write_object(call, StatusCode::OK, server.update(body).await),
            Err(response) => response,
        },
        Method::DELETE => write_empty(call, StatusCode::NO_CONTENT, server.delete().await),
        _ => send_method_not_allowed(call),
    }
}

async fn dispatch_versions(call: &Call, server: &dyn VersionsServer, segments: &[&str]) -> Response {
    match segments.split_first() {
        None => match call.method {
            Method::GET => match read_list_request(call) {
                Ok(request) => write_list(call, server.list(request).await),
                Err(response) => response,
            },
            _ => send_method_not_allowed(call),
        },
        Some((id, rest)) => locate!(call, server.version(id), dispatch_version, rest),
    }
}

async fn dispatch_version(call: &Call, server: &dyn VersionServer, segments: &[&str]) -> Response {
    if !segments.is_empty() {
        return send_not_found(call);
    }
    match call.method {
        Method::GET => write_object(call, StatusCode::OK, server.get().await),
        _ => send_method_not_allowed(call),
    }
}

async fn dispatch_events(call: &Call, server: &dyn EventsServer, segments: &[&str]) -> Response {
    if !segments.is_empty() {
        return send_not_found(call);
    }
    match call.method {
        Method::POST => match read_body(call) {
            Ok(body) => write_object(call, StatusCode::CREATED, server.add(body).await),
            Err(response) => response,
        },
        _ => send_method_not_allowed(call),
    }
}
