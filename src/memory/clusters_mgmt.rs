use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use tracing::{debug, info};
use uuid::Uuid;

use super::search::select;
use super::{
    id_field, merge, paginate, sorted, ClusterRecord, GroupRecord, Installing, MemoryServer,
    Store, ADDONS_PATH, CLUSTERS_PATH, DEFAULT_GROUPS, EVENTS_PATH, VERSIONS_PATH,
};
use crate::client::encode_segment;
use crate::model::clusters_mgmt::{
    AddOn, AddOnInstallation, AddOnInstallationState, AdminCredentials, CloudProvider,
    CloudRegion, Cluster, ClusterApi, ClusterConsole, ClusterNodes, ClusterState, ClusterStatus,
    Credentials, Event, Group, Log, ProvisionShard, User, Version,
};
use crate::model::service_logs::Severity;
use crate::model::{ObjectList, ObjectMeta, Resource};
use crate::server::clusters_mgmt::*;
use crate::server::{
    ClusterDeleteServerRequest, ListServerRequest, ListServerResponse, ServerError,
    ServerResponse, ServerResult,
};

/// Domain of the API and console URLs of the clusters
const BASE_DOMAIN: &str = "devshift.example.com";

/// Fields of clusters that searches and orders can use
const CLUSTER_FIELDS: &[&str] = &["id", "name", "state", "openshift_version"];

const INSTALLATION_FIELDS: &[&str] = &["id", "state"];

const ID_FIELDS: &[&str] = &["id"];

fn cluster_field(cluster: &Cluster, name: &str) -> Option<String> {
    match name {
        "id" => cluster.object_id().map(str::to_string),
        "name" => cluster.name.clone(),
        "state" => cluster.state.map(|s| s.as_str().to_string()),
        "openshift_version" => cluster.openshift_version.clone(),
        _ => None,
    }
}

fn installation_field(installation: &AddOnInstallation, name: &str) -> Option<String> {
    match name {
        "id" => installation.object_id().map(str::to_string),
        "state" => installation.state.and_then(|s| {
            serde_json::to_value(s)
                .ok()
                .and_then(|v| v.as_str().map(str::to_string))
        }),
        _ => None,
    }
}

fn cluster_not_found(id: &str) -> ServerError {
    ServerError::NotFound(format!("Cluster '{}' not found", id))
}

fn bad_request(reason: String) -> ServerError {
    ServerError::BadRequest(reason)
}

/// Sets the state of a cluster and of its embedded status.
fn set_state(cluster: &mut Cluster, state: ClusterState) {
    cluster.state = Some(state);
    let href = cluster
        .object_href()
        .map(|href| format!("{}/status", href))
        .unwrap_or_default();
    cluster.status = Some(
        ClusterStatus::new()
            .href(href)
            .state(state)
            .dns_ready(state != ClusterState::Installing)
            .description(match state {
                ClusterState::Installing => "Installation in progress",
                ClusterState::Ready => "Cluster is ready",
                ClusterState::Hibernating => "Cluster is hibernating",
                _ => "",
            }),
    );
}

fn kubeconfig(name: &str, api_url: &str, token: &str) -> String {
    format!(
        "apiVersion: v1\n\
         kind: Config\n\
         clusters:\n\
         - name: {name}\n  cluster:\n    server: {api_url}\n\
         contexts:\n\
         - name: admin\n  context:\n    cluster: {name}\n    user: admin\n\
         current-context: admin\n\
         users:\n\
         - name: admin\n  user:\n    token: {token}\n"
    )
}

impl Store {
    fn add_cluster(&self, body: Cluster) -> ServerResult<Cluster> {
        let name = match body.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => return Err(bad_request("Cluster name is mandatory".to_string())),
        };
        let version = match body.version.as_ref().and_then(|v| v.object_id()) {
            Some(id) => self
                .versions
                .get(id)
                .map(|entry| entry.value.clone())
                .ok_or_else(|| bad_request(format!("Version '{}' doesn't exist", id)))?,
            None => self
                .default_version()
                .ok_or_else(|| ServerError::Internal("No default version".to_string()))?,
        };
        if version.enabled == Some(false) {
            return Err(bad_request(format!(
                "Version '{}' isn't enabled",
                version.object_id().unwrap_or_default()
            )));
        }
        let version_id = version.object_id().unwrap_or_default().to_string();

        let id = Uuid::new_v4().simple().to_string();
        match self.cluster_names.entry(name.clone()) {
            Entry::Occupied(_) => {
                return Err(bad_request(format!(
                    "Cluster name '{}' is already in use",
                    name
                )))
            }
            Entry::Vacant(entry) => {
                entry.insert(id.clone());
            }
        }
        let href = format!("{}/{}", CLUSTERS_PATH, id);
        let now = Utc::now();
        let api_url = format!("https://api.{}.{}:6443", name, BASE_DOMAIN);

        let mut cluster = body;
        cluster.meta = ObjectMeta {
            kind: Some(Cluster::KIND.to_string()),
            id: Some(id.clone()),
            href: Some(href.clone()),
        };
        cluster.name = Some(name.clone());
        cluster.external_id = Some(Uuid::new_v4().to_string());
        cluster.creation_timestamp = Some(now);
        cluster.openshift_version = version.raw_id.clone();
        cluster.version = Some(
            Version::link_to(version_id.as_str())
                .href(format!("{}/{}", VERSIONS_PATH, version_id)),
        );
        cluster.managed.get_or_insert(true);
        cluster.multi_az.get_or_insert(false);
        cluster
            .cloud_provider
            .get_or_insert_with(|| CloudProvider::link_to("aws"));
        cluster
            .region
            .get_or_insert_with(|| CloudRegion::link_to("us-east-1"));
        cluster
            .nodes
            .get_or_insert_with(|| ClusterNodes::new().compute(2).infra(2).master(3));
        cluster.api = Some(ClusterApi::new().url(api_url.clone()).listening("external"));
        cluster.console = Some(ClusterConsole::new().url(format!(
            "https://console-openshift-console.apps.{}.{}",
            name, BASE_DOMAIN
        )));
        cluster.provision_shard = Some(
            ProvisionShard::link_to(self.provision_shard.object_id().unwrap_or_default())
                .href(format!("{}/provision_shard", href)),
        );
        cluster.addons = Some(ObjectList::link(format!("{}/addons", href)));
        cluster.groups = Some(ObjectList::link(format!("{}/groups", href)));

        let state = if self.install_steps == 0 {
            ClusterState::Ready
        } else {
            ClusterState::Installing
        };
        set_state(&mut cluster, state);

        let groups = DEFAULT_GROUPS
            .iter()
            .map(|group_id| {
                let group_href = format!("{}/groups/{}", href, group_id);
                GroupRecord {
                    group: Group::new()
                        .id(*group_id)
                        .href(group_href.clone())
                        .users(ObjectList::link(format!("{}/users", group_href))),
                    users: Vec::new(),
                }
            })
            .collect();

        let token = Uuid::new_v4().simple().to_string();
        let credentials = Credentials::new()
            .id(id.clone())
            .href(format!("{}/credentials", href))
            .kubeconfig(kubeconfig(&name, &api_url, &token))
            .admin(
                AdminCredentials::new()
                    .user("kubeadmin")
                    .password(Uuid::new_v4().simple().to_string()),
            );

        let install_log = Log::new()
            .id("install")
            .href(format!("{}/logs/install", href))
            .content(format!(
                "{} Installing cluster '{}' with version '{}'\n",
                now.to_rfc3339(),
                name,
                cluster.openshift_version.as_deref().unwrap_or_default()
            ));

        let record = ClusterRecord {
            cluster: cluster.clone(),
            remaining_steps: self.install_steps,
            installations: Vec::new(),
            groups,
            logs: vec![install_log],
            credentials,
        };
        self.clusters.insert(id.clone(), self.stored(record));

        info!("Added cluster '{}' with identifier '{}'", name, id);
        self.record_log(
            &cluster,
            Severity::Info,
            "Cluster installation started",
            format!("Installation of cluster '{}' has started", name),
        );

        Ok(cluster)
    }

    /// Moves an installing cluster one step closer to ready.
    fn advance(&self, record: &mut ClusterRecord) {
        if record.cluster.state != Some(ClusterState::Installing) {
            return;
        }
        if record.remaining_steps > 1 {
            record.remaining_steps -= 1;
            return;
        }
        record.remaining_steps = 0;
        set_state(&mut record.cluster, ClusterState::Ready);

        let name = record.cluster.name.clone().unwrap_or_default();
        if let Some(log) = record.logs.iter_mut().find(|l| l.object_id() == Some("install")) {
            let content = log.content.get_or_insert_with(String::new);
            content.push_str(&format!(
                "{} Cluster '{}' is ready\n",
                Utc::now().to_rfc3339(),
                name
            ));
        }

        info!("Cluster '{}' is ready", name);
        self.record_log(
            &record.cluster,
            Severity::Info,
            "Cluster installation completed",
            format!("Cluster '{}' has been installed and is ready", name),
        );
    }
}

impl ClustersMgmtServer for MemoryServer {
    fn clusters(&self) -> Option<Arc<dyn ClustersServer>> {
        Some(Arc::new(Clusters {
            store: self.store.clone(),
        }))
    }

    fn addons(&self) -> Option<Arc<dyn AddOnsServer>> {
        Some(Arc::new(AddOns {
            store: self.store.clone(),
        }))
    }

    fn versions(&self) -> Option<Arc<dyn VersionsServer>> {
        Some(Arc::new(Versions {
            store: self.store.clone(),
        }))
    }

    fn events(&self) -> Option<Arc<dyn EventsServer>> {
        Some(Arc::new(Events {
            store: self.store.clone(),
        }))
    }
}

// ============================================================================
// Clusters
// ============================================================================

struct Clusters {
    store: Arc<Store>,
}

#[async_trait]
impl ClustersServer for Clusters {
    async fn list(&self, request: ListServerRequest) -> ServerResult<ListServerResponse<Cluster>> {
        let clusters = sorted(&self.store.clusters, |record| record.cluster.clone());
        let clusters = select(
            clusters,
            request.search.as_deref(),
            request.order.as_deref(),
            CLUSTER_FIELDS,
            cluster_field,
        )
        .map_err(bad_request)?;
        paginate(clusters, &request)
    }

    async fn add(&self, body: Cluster) -> ServerResult<ServerResponse<Cluster>> {
        self.store.add_cluster(body).map(ServerResponse::with_body)
    }

    fn cluster(&self, id: &str) -> Option<Arc<dyn ClusterServer>> {
        if !self.store.clusters.contains_key(id) {
            return None;
        }
        Some(Arc::new(ClusterItem {
            store: self.store.clone(),
            id: id.to_string(),
        }))
    }
}

struct ClusterItem {
    store: Arc<Store>,
    id: String,
}

impl ClusterItem {
    /// Runs `f` on the record of the cluster, or fails with not found.
    fn with_record<R>(
        &self,
        f: impl FnOnce(&mut ClusterRecord) -> ServerResult<R>,
    ) -> ServerResult<R> {
        let mut entry = self
            .store
            .clusters
            .get_mut(&self.id)
            .ok_or_else(|| cluster_not_found(&self.id))?;
        f(&mut entry.value)
    }

    fn transition(
        &self,
        from: ClusterState,
        to: ClusterState,
        action: &str,
    ) -> ServerResult<ServerResponse<()>> {
        self.with_record(|record| {
            let current = record.cluster.state.unwrap_or(ClusterState::Unknown);
            if current != from {
                return Err(bad_request(format!(
                    "Can't {} cluster '{}' because it is in state '{}'",
                    action, self.id, current
                )));
            }
            set_state(&mut record.cluster, to);
            info!("Cluster '{}' moved from '{}' to '{}'", self.id, from, to);
            self.store.record_log(
                &record.cluster,
                Severity::Info,
                &format!("Cluster {} requested", action),
                format!("Cluster is now in state '{}'", to),
            );
            Ok(ServerResponse::empty())
        })
    }

    fn child<T>(&self, build: impl FnOnce(Arc<Store>, String) -> T) -> T {
        build(self.store.clone(), self.id.clone())
    }
}

#[async_trait]
impl ClusterServer for ClusterItem {
    async fn get(&self) -> ServerResult<ServerResponse<Cluster>> {
        self.with_record(|record| {
            self.store.advance(record);
            Ok(ServerResponse::with_body(record.cluster.clone()))
        })
    }

    async fn update(&self, body: Cluster) -> ServerResult<ServerResponse<Cluster>> {
        self.with_record(|record| {
            if let Some(ref name) = body.name {
                if record.cluster.name.as_ref() != Some(name) {
                    return Err(bad_request("Cluster name can't be changed".to_string()));
                }
            }
            let mut merged = merge(&record.cluster, &body)?;
            merged.state = record.cluster.state;
            merged.status = record.cluster.status.clone();
            record.cluster = merged;
            debug!("Updated cluster '{}'", self.id);
            Ok(ServerResponse::with_body(record.cluster.clone()))
        })
    }

    async fn delete(
        &self,
        request: ClusterDeleteServerRequest,
    ) -> ServerResult<ServerResponse<()>> {
        let (_, stored) = self
            .store
            .clusters
            .remove(&self.id)
            .ok_or_else(|| cluster_not_found(&self.id))?;
        let cluster = stored.value.cluster;
        let name = cluster.name.clone().unwrap_or_default();
        self.store
            .cluster_names
            .remove_if(&name, |_, owner| *owner == self.id);

        if request.deprovision.unwrap_or(true) {
            info!("Deleted cluster '{}'", self.id);
            self.store.record_log(
                &cluster,
                Severity::Info,
                "Cluster deleted",
                format!("Cluster '{}' and its cloud resources have been deleted", name),
            );
        } else {
            info!("Deleted cluster '{}' without deprovisioning", self.id);
            self.store.record_log(
                &cluster,
                Severity::Warning,
                "Cluster deleted without deprovisioning",
                format!(
                    "Cluster '{}' has been deleted, its cloud resources have been kept",
                    name
                ),
            );
        }
        Ok(ServerResponse::empty())
    }

    async fn hibernate(&self) -> ServerResult<ServerResponse<()>> {
        self.transition(ClusterState::Ready, ClusterState::Hibernating, "hibernate")
    }

    async fn resume(&self) -> ServerResult<ServerResponse<()>> {
        self.transition(ClusterState::Hibernating, ClusterState::Ready, "resume")
    }

    fn addons(&self) -> Option<Arc<dyn AddOnInstallationsServer>> {
        Some(Arc::new(self.child(|store, cluster_id| AddOnInstallations {
            store,
            cluster_id,
        })))
    }

    fn groups(&self) -> Option<Arc<dyn GroupsServer>> {
        Some(Arc::new(self.child(|store, cluster_id| Groups {
            store,
            cluster_id,
        })))
    }

    fn logs(&self) -> Option<Arc<dyn LogsServer>> {
        Some(Arc::new(self.child(|store, cluster_id| Logs {
            store,
            cluster_id,
        })))
    }

    fn credentials(&self) -> Option<Arc<dyn CredentialsServer>> {
        Some(Arc::new(self.child(|store, cluster_id| ClusterCredentials {
            store,
            cluster_id,
        })))
    }

    fn provision_shard(&self) -> Option<Arc<dyn ProvisionShardServer>> {
        Some(Arc::new(self.child(|store, cluster_id| ClusterProvisionShard {
            store,
            cluster_id,
        })))
    }

    fn status(&self) -> Option<Arc<dyn ClusterStatusServer>> {
        Some(Arc::new(self.child(|store, cluster_id| Status {
            store,
            cluster_id,
        })))
    }
}

/// Sub-resource of a cluster.
macro_rules! cluster_child {
    ($name:ident) => {
        struct $name {
            store: Arc<Store>,
            cluster_id: String,
        }

        impl $name {
            fn with_record<R>(
                &self,
                f: impl FnOnce(&mut ClusterRecord) -> ServerResult<R>,
            ) -> ServerResult<R> {
                let mut entry = self
                    .store
                    .clusters
                    .get_mut(&self.cluster_id)
                    .ok_or_else(|| cluster_not_found(&self.cluster_id))?;
                f(&mut entry.value)
            }
        }
    };
}

cluster_child!(Status);
cluster_child!(ClusterCredentials);
cluster_child!(ClusterProvisionShard);
cluster_child!(Logs);
cluster_child!(Groups);
cluster_child!(AddOnInstallations);

#[async_trait]
impl ClusterStatusServer for Status {
    async fn get(&self) -> ServerResult<ServerResponse<ClusterStatus>> {
        self.with_record(|record| {
            self.store.advance(record);
            let status = record.cluster.status.clone().unwrap_or_default();
            Ok(ServerResponse::with_body(status))
        })
    }
}

#[async_trait]
impl CredentialsServer for ClusterCredentials {
    async fn get(&self) -> ServerResult<ServerResponse<Credentials>> {
        self.with_record(|record| Ok(ServerResponse::with_body(record.credentials.clone())))
    }
}

#[async_trait]
impl ProvisionShardServer for ClusterProvisionShard {
    async fn get(&self) -> ServerResult<ServerResponse<ProvisionShard>> {
        self.with_record(|_| Ok(ServerResponse::with_body(self.store.provision_shard.clone())))
    }
}

// ============================================================================
// Logs
// ============================================================================

#[async_trait]
impl LogsServer for Logs {
    async fn list(&self, request: ListServerRequest) -> ServerResult<ListServerResponse<Log>> {
        let logs = self.with_record(|record| Ok(record.logs.clone()))?;
        let logs = select(
            logs,
            request.search.as_deref(),
            request.order.as_deref(),
            ID_FIELDS,
            id_field,
        )
        .map_err(bad_request)?;
        paginate(logs, &request)
    }

    fn log(&self, id: &str) -> Option<Arc<dyn LogServer>> {
        let exists = self
            .with_record(|record| Ok(record.logs.iter().any(|l| l.object_id() == Some(id))))
            .unwrap_or(false);
        if !exists {
            return None;
        }
        Some(Arc::new(LogItem {
            store: self.store.clone(),
            cluster_id: self.cluster_id.clone(),
            id: id.to_string(),
        }))
    }
}

struct LogItem {
    store: Arc<Store>,
    cluster_id: String,
    id: String,
}

#[async_trait]
impl LogServer for LogItem {
    async fn get(&self) -> ServerResult<ServerResponse<Log>> {
        let entry = self
            .store
            .clusters
            .get(&self.cluster_id)
            .ok_or_else(|| cluster_not_found(&self.cluster_id))?;
        entry
            .value
            .logs
            .iter()
            .find(|l| l.object_id() == Some(self.id.as_str()))
            .cloned()
            .map(ServerResponse::with_body)
            .ok_or_else(|| ServerError::NotFound(format!("Log '{}' not found", self.id)))
    }
}

// ============================================================================
// Groups and users
// ============================================================================

#[async_trait]
impl GroupsServer for Groups {
    async fn list(&self, request: ListServerRequest) -> ServerResult<ListServerResponse<Group>> {
        let groups = self.with_record(|record| {
            Ok(record
                .groups
                .iter()
                .map(|g| g.group.clone())
                .collect::<Vec<_>>())
        })?;
        let groups = select(
            groups,
            request.search.as_deref(),
            request.order.as_deref(),
            ID_FIELDS,
            id_field,
        )
        .map_err(bad_request)?;
        paginate(groups, &request)
    }

    fn group(&self, id: &str) -> Option<Arc<dyn GroupServer>> {
        let exists = self
            .with_record(|record| {
                Ok(record
                    .groups
                    .iter()
                    .any(|g| g.group.object_id() == Some(id)))
            })
            .unwrap_or(false);
        if !exists {
            return None;
        }
        Some(Arc::new(GroupItem {
            store: self.store.clone(),
            cluster_id: self.cluster_id.clone(),
            group_id: id.to_string(),
        }))
    }
}

#[derive(Clone)]
struct GroupItem {
    store: Arc<Store>,
    cluster_id: String,
    group_id: String,
}

impl GroupItem {
    fn with_group<R>(&self, f: impl FnOnce(&mut GroupRecord) -> ServerResult<R>) -> ServerResult<R> {
        let mut entry = self
            .store
            .clusters
            .get_mut(&self.cluster_id)
            .ok_or_else(|| cluster_not_found(&self.cluster_id))?;
        let group = entry
            .value
            .groups
            .iter_mut()
            .find(|g| g.group.object_id() == Some(self.group_id.as_str()))
            .ok_or_else(|| ServerError::NotFound(format!("Group '{}' not found", self.group_id)))?;
        f(group)
    }
}

#[async_trait]
impl GroupServer for GroupItem {
    async fn get(&self) -> ServerResult<ServerResponse<Group>> {
        self.with_group(|record| Ok(ServerResponse::with_body(record.group.clone())))
    }

    fn users(&self) -> Option<Arc<dyn UsersServer>> {
        Some(Arc::new(Users {
            group: self.clone(),
        }))
    }
}

struct Users {
    group: GroupItem,
}

#[async_trait]
impl UsersServer for Users {
    async fn list(&self, request: ListServerRequest) -> ServerResult<ListServerResponse<User>> {
        let users = self.group.with_group(|record| Ok(record.users.clone()))?;
        let users = select(
            users,
            request.search.as_deref(),
            request.order.as_deref(),
            ID_FIELDS,
            id_field,
        )
        .map_err(bad_request)?;
        paginate(users, &request)
    }

    async fn add(&self, body: User) -> ServerResult<ServerResponse<User>> {
        let id = match body.object_id().map(str::trim) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => return Err(bad_request("User identifier is mandatory".to_string())),
        };
        let user = self.group.with_group(|record| {
            if record.users.iter().any(|u| u.object_id() == Some(id.as_str())) {
                return Err(bad_request(format!(
                    "User '{}' already belongs to group '{}'",
                    id, self.group.group_id
                )));
            }
            let href = format!(
                "{}/{}/groups/{}/users/{}",
                CLUSTERS_PATH,
                self.group.cluster_id,
                self.group.group_id,
                encode_segment(&id)
            );
            let user = User::new().id(id.clone()).href(href);
            record.users.push(user.clone());
            Ok(user)
        })?;
        info!(
            "Added user '{}' to group '{}' of cluster '{}'",
            id, self.group.group_id, self.group.cluster_id
        );
        Ok(ServerResponse::with_body(user))
    }

    fn user(&self, id: &str) -> Option<Arc<dyn UserServer>> {
        let exists = self
            .group
            .with_group(|record| Ok(record.users.iter().any(|u| u.object_id() == Some(id))))
            .unwrap_or(false);
        if !exists {
            return None;
        }
        Some(Arc::new(UserItem {
            group: self.group.clone(),
            id: id.to_string(),
        }))
    }
}

struct UserItem {
    group: GroupItem,
    id: String,
}

impl UserItem {
    fn not_found(&self) -> ServerError {
        ServerError::NotFound(format!(
            "User '{}' not found in group '{}'",
            self.id, self.group.group_id
        ))
    }
}

#[async_trait]
impl UserServer for UserItem {
    async fn get(&self) -> ServerResult<ServerResponse<User>> {
        self.group.with_group(|record| {
            record
                .users
                .iter()
                .find(|u| u.object_id() == Some(self.id.as_str()))
                .cloned()
                .map(ServerResponse::with_body)
                .ok_or_else(|| self.not_found())
        })
    }

    async fn delete(&self) -> ServerResult<ServerResponse<()>> {
        self.group.with_group(|record| {
            let before = record.users.len();
            record
                .users
                .retain(|u| u.object_id() != Some(self.id.as_str()));
            if record.users.len() == before {
                return Err(self.not_found());
            }
            info!(
                "Removed user '{}' from group '{}'",
                self.id, self.group.group_id
            );
            Ok(ServerResponse::empty())
        })
    }
}

// ============================================================================
// Add-on installations
// ============================================================================

impl Store {
    fn advance_installation(&self, installing: &mut Installing<AddOnInstallation>) {
        if installing.value.state != Some(AddOnInstallationState::Installing) {
            return;
        }
        if installing.remaining_steps > 1 {
            installing.remaining_steps -= 1;
            return;
        }
        installing.remaining_steps = 0;
        installing.value.state = Some(AddOnInstallationState::Ready);
        installing.value.state_description = Some("Add-on is installed".to_string());
        installing.value.updated_timestamp = Some(Utc::now());
        debug!(
            "Add-on installation '{}' is ready",
            installing.value.object_id().unwrap_or_default()
        );
    }
}

#[async_trait]
impl AddOnInstallationsServer for AddOnInstallations {
    async fn list(
        &self,
        request: ListServerRequest,
    ) -> ServerResult<ListServerResponse<AddOnInstallation>> {
        let installations = self.with_record(|record| {
            Ok(record
                .installations
                .iter()
                .map(|i| i.value.clone())
                .collect::<Vec<_>>())
        })?;
        let installations = select(
            installations,
            request.search.as_deref(),
            request.order.as_deref(),
            INSTALLATION_FIELDS,
            installation_field,
        )
        .map_err(bad_request)?;
        paginate(installations, &request)
    }

    async fn add(
        &self,
        body: AddOnInstallation,
    ) -> ServerResult<ServerResponse<AddOnInstallation>> {
        let addon_id = body
            .addon
            .as_ref()
            .and_then(|a| a.object_id())
            .map(str::to_string)
            .ok_or_else(|| bad_request("Add-on identifier is mandatory".to_string()))?;
        let addon = self
            .store
            .addons
            .get(&addon_id)
            .map(|entry| entry.value.clone())
            .ok_or_else(|| bad_request(format!("Add-on '{}' doesn't exist", addon_id)))?;
        if addon.enabled == Some(false) {
            return Err(bad_request(format!("Add-on '{}' isn't enabled", addon_id)));
        }

        let steps = self.store.install_steps;
        let installation = self.with_record(|record| {
            if record
                .installations
                .iter()
                .any(|i| i.value.object_id() == Some(addon_id.as_str()))
            {
                return Err(bad_request(format!(
                    "Add-on '{}' is already installed in cluster '{}'",
                    addon_id, self.cluster_id
                )));
            }
            let cluster_href = record.cluster.object_href().unwrap_or_default().to_string();
            let now = Utc::now();
            let mut installation = body;
            installation.meta = ObjectMeta {
                kind: Some(AddOnInstallation::KIND.to_string()),
                id: Some(addon_id.clone()),
                href: Some(format!("{}/addons/{}", cluster_href, addon_id)),
            };
            installation.addon = Some(
                AddOn::link_to(addon_id.as_str()).href(format!("{}/{}", ADDONS_PATH, addon_id)),
            );
            installation.cluster =
                Some(Cluster::link_to(self.cluster_id.as_str()).href(cluster_href));
            installation.state = Some(if steps == 0 {
                AddOnInstallationState::Ready
            } else {
                AddOnInstallationState::Installing
            });
            installation.creation_timestamp = Some(now);
            installation.updated_timestamp = Some(now);

            record.installations.push(Installing {
                value: installation.clone(),
                remaining_steps: steps,
            });
            Ok(installation)
        })?;

        info!(
            "Installing add-on '{}' in cluster '{}'",
            addon_id, self.cluster_id
        );
        Ok(ServerResponse::with_body(installation))
    }

    fn addon(&self, id: &str) -> Option<Arc<dyn AddOnInstallationServer>> {
        let exists = self
            .with_record(|record| {
                Ok(record
                    .installations
                    .iter()
                    .any(|i| i.value.object_id() == Some(id)))
            })
            .unwrap_or(false);
        if !exists {
            return None;
        }
        Some(Arc::new(AddOnInstallationItem {
            store: self.store.clone(),
            cluster_id: self.cluster_id.clone(),
            id: id.to_string(),
        }))
    }
}

struct AddOnInstallationItem {
    store: Arc<Store>,
    cluster_id: String,
    id: String,
}

impl AddOnInstallationItem {
    fn with_installation<R>(
        &self,
        f: impl FnOnce(&mut ClusterRecord, usize) -> ServerResult<R>,
    ) -> ServerResult<R> {
        let mut entry = self
            .store
            .clusters
            .get_mut(&self.cluster_id)
            .ok_or_else(|| cluster_not_found(&self.cluster_id))?;
        let record = &mut entry.value;
        let index = record
            .installations
            .iter()
            .position(|i| i.value.object_id() == Some(self.id.as_str()))
            .ok_or_else(|| {
                ServerError::NotFound(format!("Add-on installation '{}' not found", self.id))
            })?;
        f(record, index)
    }
}

#[async_trait]
impl AddOnInstallationServer for AddOnInstallationItem {
    async fn get(&self) -> ServerResult<ServerResponse<AddOnInstallation>> {
        self.with_installation(|record, index| {
            let installing = &mut record.installations[index];
            self.store.advance_installation(installing);
            Ok(ServerResponse::with_body(installing.value.clone()))
        })
    }

    async fn update(
        &self,
        body: AddOnInstallation,
    ) -> ServerResult<ServerResponse<AddOnInstallation>> {
        self.with_installation(|record, index| {
            let installing = &mut record.installations[index];
            let current = &installing.value;
            let mut merged = merge(current, &body)?;
            merged.addon = current.addon.clone();
            merged.cluster = current.cluster.clone();
            merged.state = current.state;
            merged.updated_timestamp = Some(Utc::now());
            installing.value = merged;
            Ok(ServerResponse::with_body(installing.value.clone()))
        })
    }

    async fn delete(&self) -> ServerResult<ServerResponse<()>> {
        self.with_installation(|record, index| {
            record.installations.remove(index);
            info!(
                "Removed add-on '{}' from cluster '{}'",
                self.id, self.cluster_id
            );
            Ok(ServerResponse::empty())
        })
    }
}

// ============================================================================
// Add-on catalog
// ============================================================================

struct AddOns {
    store: Arc<Store>,
}

#[async_trait]
impl AddOnsServer for AddOns {
    async fn list(&self, request: ListServerRequest) -> ServerResult<ListServerResponse<AddOn>> {
        let addons = sorted(&self.store.addons, AddOn::clone);
        let addons = select(
            addons,
            request.search.as_deref(),
            request.order.as_deref(),
            ID_FIELDS,
            id_field,
        )
        .map_err(bad_request)?;
        paginate(addons, &request)
    }

    async fn add(&self, body: AddOn) -> ServerResult<ServerResponse<AddOn>> {
        let id = match body.object_id().map(str::trim) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => return Err(bad_request("Add-on identifier is mandatory".to_string())),
        };
        let entry = match self.store.addons.entry(id.clone()) {
            Entry::Occupied(_) => {
                return Err(bad_request(format!("Add-on '{}' already exists", id)))
            }
            Entry::Vacant(entry) => entry,
        };
        let mut addon = body;
        addon.meta = ObjectMeta {
            kind: Some(AddOn::KIND.to_string()),
            id: Some(id.clone()),
            href: Some(format!("{}/{}", ADDONS_PATH, encode_segment(&id))),
        };
        entry.insert(self.store.stored(addon.clone()));
        info!("Added add-on '{}' to the catalog", id);
        Ok(ServerResponse::with_body(addon))
    }

    fn addon(&self, id: &str) -> Option<Arc<dyn AddOnServer>> {
        if !self.store.addons.contains_key(id) {
            return None;
        }
        Some(Arc::new(AddOnItem {
            store: self.store.clone(),
            id: id.to_string(),
        }))
    }
}

struct AddOnItem {
    store: Arc<Store>,
    id: String,
}

impl AddOnItem {
    fn not_found(&self) -> ServerError {
        ServerError::NotFound(format!("Add-on '{}' not found", self.id))
    }
}

#[async_trait]
impl AddOnServer for AddOnItem {
    async fn get(&self) -> ServerResult<ServerResponse<AddOn>> {
        self.store
            .addons
            .get(&self.id)
            .map(|entry| ServerResponse::with_body(entry.value.clone()))
            .ok_or_else(|| self.not_found())
    }

    async fn update(&self, body: AddOn) -> ServerResult<ServerResponse<AddOn>> {
        let mut entry = self
            .store
            .addons
            .get_mut(&self.id)
            .ok_or_else(|| self.not_found())?;
        let merged = merge(&entry.value, &body)?;
        entry.value = merged;
        Ok(ServerResponse::with_body(entry.value.clone()))
    }

    async fn delete(&self) -> ServerResult<ServerResponse<()>> {
        self.store
            .addons
            .remove(&self.id)
            .ok_or_else(|| self.not_found())?;
        info!("Removed add-on '{}' from the catalog", self.id);
        Ok(ServerResponse::empty())
    }
}

// ============================================================================
// Versions and events
// ============================================================================

struct Versions {
    store: Arc<Store>,
}

fn version_field(version: &Version, name: &str) -> Option<String> {
    match name {
        "id" => version.object_id().map(str::to_string),
        "raw_id" => version.raw_id.clone(),
        "channel_group" => version.channel_group.clone(),
        "enabled" => version.enabled.map(|v| v.to_string()),
        _ => None,
    }
}

#[async_trait]
impl VersionsServer for Versions {
    async fn list(&self, request: ListServerRequest) -> ServerResult<ListServerResponse<Version>> {
        let versions = sorted(&self.store.versions, Version::clone);
        let versions = select(
            versions,
            request.search.as_deref(),
            request.order.as_deref(),
            &["id", "raw_id", "channel_group", "enabled"],
            version_field,
        )
        .map_err(bad_request)?;
        paginate(versions, &request)
    }

    fn version(&self, id: &str) -> Option<Arc<dyn VersionServer>> {
        let version = self.store.versions.get(id)?.value.clone();
        Some(Arc::new(VersionItem { version }))
    }
}

struct VersionItem {
    version: Version,
}

#[async_trait]
impl VersionServer for VersionItem {
    async fn get(&self) -> ServerResult<ServerResponse<Version>> {
        Ok(ServerResponse::with_body(self.version.clone()))
    }
}

struct Events {
    store: Arc<Store>,
}

#[async_trait]
impl EventsServer for Events {
    async fn add(&self, body: Event) -> ServerResult<ServerResponse<Event>> {
        let key = match body.key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => key.to_string(),
            _ => return Err(bad_request("Event key is mandatory".to_string())),
        };
        let id = Uuid::new_v4().simple().to_string();
        let mut event = body;
        event.meta = ObjectMeta {
            kind: Some(Event::KIND.to_string()),
            id: Some(id.clone()),
            href: Some(format!("{}/{}", EVENTS_PATH, id)),
        };
        self.store
            .events
            .insert(id, self.store.stored(event.clone()));
        info!("Tracked event '{}'", key);
        Ok(ServerResponse::with_body(event))
    }
}
