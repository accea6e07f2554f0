//! In-memory implementation of every server trait.
//!
//! Used by `ocm serve` and by the integration tests. State lives in
//! [`DashMap`]s shared by all the clones of a [`MemoryServer`]; nothing is
//! persisted.

mod clusters_mgmt;
mod search;
mod service_logs;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::Router;
use chrono::{TimeZone, Utc};
use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::model::clusters_mgmt::{
    AddOn, AddOnInstallMode, AddOnInstallation, AddOnParameter, CloudProvider, CloudRegion,
    Cluster, Credentials, Event, Group, Log, ProvisionShard, ServerConfig, User, Version,
};
use crate::model::service_logs::LogEntry;
use crate::model::{ObjectList, Resource};
use crate::server::{create_router, ListServerRequest, ListServerResponse, Server, ServerError};

/// Number of GETs after which an installing cluster becomes ready
pub const DEFAULT_INSTALL_STEPS: u32 = 2;

/// Page size used when the request doesn't give one
pub const DEFAULT_PAGE_SIZE: i32 = 100;

pub(crate) const CLUSTERS_PATH: &str = "/api/clusters_mgmt/v1/clusters";
pub(crate) const ADDONS_PATH: &str = "/api/clusters_mgmt/v1/addons";
pub(crate) const VERSIONS_PATH: &str = "/api/clusters_mgmt/v1/versions";
pub(crate) const EVENTS_PATH: &str = "/api/clusters_mgmt/v1/events";
pub(crate) const PROVISION_SHARDS_PATH: &str = "/api/clusters_mgmt/v1/provision_shards";
pub(crate) const CLUSTER_LOGS_PATH: &str = "/api/service_logs/v1/cluster_logs";

/// Groups created with every cluster
pub(crate) const DEFAULT_GROUPS: &[&str] = &["dedicated-admins", "cluster-admins"];

/// In-memory API server. Clones share the same state.
#[derive(Clone)]
pub struct MemoryServer {
    store: Arc<Store>,
}

impl Default for MemoryServer {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryServer {
    pub fn new() -> Self {
        Self::with_install_steps(DEFAULT_INSTALL_STEPS)
    }

    /// Creates a server whose clusters need `steps` GETs to become ready.
    /// With zero steps clusters are ready as soon as they are added.
    pub fn with_install_steps(steps: u32) -> Self {
        let store = Store::new(steps);
        store.seed();
        Self {
            store: Arc::new(store),
        }
    }

    /// Router serving both `clusters_mgmt` and `service_logs`.
    pub fn router(&self) -> Router {
        create_router(
            Server::new()
                .clusters_mgmt(Arc::new(self.clone()))
                .service_logs(Arc::new(self.clone())),
        )
    }

    pub fn cluster_count(&self) -> usize {
        self.store.clusters.len()
    }

    /// Tracking events posted to `/events`, oldest first.
    pub fn events(&self) -> Vec<Event> {
        sorted(&self.store.events, Event::clone)
    }
}

/// Stored value with its insertion order.
struct Stored<T> {
    seq: u64,
    value: T,
}

/// Value that progresses towards ready as it is read.
struct Installing<T> {
    value: T,
    remaining_steps: u32,
}

struct GroupRecord {
    group: Group,
    users: Vec<User>,
}

struct ClusterRecord {
    cluster: Cluster,
    remaining_steps: u32,
    installations: Vec<Installing<AddOnInstallation>>,
    groups: Vec<GroupRecord>,
    logs: Vec<Log>,
    credentials: Credentials,
}

struct Store {
    install_steps: u32,
    sequence: AtomicU64,
    clusters: DashMap<String, Stored<ClusterRecord>>,
    /// Cluster identifier by name, claimed before a cluster is stored.
    cluster_names: DashMap<String, String>,
    addons: DashMap<String, Stored<AddOn>>,
    versions: DashMap<String, Stored<Version>>,
    events: DashMap<String, Stored<Event>>,
    log_entries: DashMap<String, Stored<LogEntry>>,
    provision_shard: ProvisionShard,
}

impl Store {
    fn new(install_steps: u32) -> Self {
        let created = Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).single();
        let mut provision_shard = ProvisionShard::new()
            .id("shard-1")
            .href(format!("{}/shard-1", PROVISION_SHARDS_PATH))
            .status("active")
            .topology("dedicated")
            .cloud_provider(CloudProvider::link_to("aws"))
            .region(CloudRegion::link_to("us-east-1"))
            .hive_config(
                ServerConfig::new()
                    .id("hive-1")
                    .server("https://api.hive-1.example.com:6443"),
            );
        provision_shard.creation_timestamp = created;
        provision_shard.last_update_timestamp = created;

        Self {
            install_steps,
            sequence: AtomicU64::new(0),
            clusters: DashMap::new(),
            cluster_names: DashMap::new(),
            addons: DashMap::new(),
            versions: DashMap::new(),
            events: DashMap::new(),
            log_entries: DashMap::new(),
            provision_shard,
        }
    }

    fn next_seq(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::SeqCst)
    }

    fn stored<T>(&self, value: T) -> Stored<T> {
        Stored {
            seq: self.next_seq(),
            value,
        }
    }

    /// Fills the add-on and version catalogs.
    fn seed(&self) {
        let versions = [
            ("openshift-v4.14.20", "4.14.20", "stable", false),
            ("openshift-v4.15.10", "4.15.10", "stable", true),
            ("openshift-v4.16.0-rc.2", "4.16.0-rc.2", "candidate", false),
        ];
        for (id, raw_id, channel_group, default) in versions {
            let version = Version::new()
                .id(id)
                .href(format!("{}/{}", VERSIONS_PATH, id))
                .raw_id(raw_id)
                .enabled(true)
                .default_version(default)
                .channel_group(channel_group)
                .rosa_enabled(channel_group == "stable");
            self.versions.insert(id.to_string(), self.stored(version));
        }

        let addons = [
            (
                "cluster-logging-operator",
                "Cluster Logging Operator",
                "openshift-logging",
            ),
            ("managed-odh", "Red Hat OpenShift Data Science", "redhat-ods-operator"),
            ("prow-operator", "Prow", "prow"),
        ];
        for (id, name, namespace) in addons {
            let mut addon = AddOn::new()
                .id(id)
                .href(format!("{}/{}", ADDONS_PATH, id))
                .name(name)
                .label(format!("api.openshift.com/addon-{}", id))
                .enabled(true)
                .hidden(false)
                .install_mode(AddOnInstallMode::OwnNamespace)
                .operator_name(id)
                .target_namespace(namespace)
                .resource_name(format!("addon-{}", id))
                .resource_cost(1.0);
            if id == "managed-odh" {
                addon.parameters = Some(ObjectList::from(vec![AddOnParameter::new()
                    .id("notification-email")
                    .name("Notification email")
                    .value_type("string")
                    .required(false)
                    .editable(true)
                    .enabled(true)]));
            }
            self.addons.insert(id.to_string(), self.stored(addon));
        }
    }

    fn default_version(&self) -> Option<Version> {
        self.versions
            .iter()
            .find(|entry| entry.value.default_version == Some(true))
            .map(|entry| entry.value.clone())
    }
}

/// Values of `map`, in insertion order.
fn sorted<T, R, F>(map: &DashMap<String, Stored<T>>, f: F) -> Vec<R>
where
    F: Fn(&T) -> R,
{
    let mut entries: Vec<(u64, R)> = map
        .iter()
        .map(|entry| (entry.seq, f(&entry.value)))
        .collect();
    entries.sort_by_key(|(seq, _)| *seq);
    entries.into_iter().map(|(_, value)| value).collect()
}

/// Looks up the identifier of any resource, for searches on `id`.
fn id_field<T: Resource>(item: &T, name: &str) -> Option<String> {
    match name {
        "id" => item.object_id().map(str::to_string),
        _ => None,
    }
}

/// Cuts the requested page out of `items`.
fn paginate<T>(
    items: Vec<T>,
    request: &ListServerRequest,
) -> Result<ListServerResponse<T>, ServerError> {
    let page = request.page.unwrap_or(1);
    let size = request.size.unwrap_or(DEFAULT_PAGE_SIZE);
    if page < 1 {
        return Err(ServerError::BadRequest(format!(
            "Page number must be greater than zero, got {}",
            page
        )));
    }
    if size < 0 {
        return Err(ServerError::BadRequest(format!(
            "Page size can't be negative, got {}",
            size
        )));
    }

    let total = items.len() as i32;
    let start = (page as usize - 1).saturating_mul(size as usize);
    let items: Vec<T> = items.into_iter().skip(start).take(size as usize).collect();
    let count = items.len() as i32;

    Ok(ListServerResponse::new(items)
        .page(page)
        .size(count)
        .total(total))
}

/// Applies the fields set in `patch` on top of `current`.
///
/// Identity (kind, id, href) always comes from `current`.
fn merge<T>(current: &T, patch: &T) -> Result<T, ServerError>
where
    T: Serialize + DeserializeOwned + Resource,
{
    let mut target = serde_json::to_value(current).map_err(internal)?;
    let patch = serde_json::to_value(patch).map_err(internal)?;
    if let (Value::Object(target), Value::Object(patch)) = (&mut target, patch) {
        for (key, value) in patch {
            target.insert(key, value);
        }
    }
    let mut merged: T = serde_json::from_value(target).map_err(internal)?;
    *merged.meta_mut() = current.meta().clone();
    Ok(merged)
}

fn internal(err: serde_json::Error) -> ServerError {
    ServerError::Internal(err.to_string())
}
