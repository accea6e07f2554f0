//! Clients of the `clusters_mgmt/v1` service.
//!
//! Each client knows the path of its resource and creates request builders
//! or the clients of its sub-resources:
//!
//! ```text
//! connection.clusters_mgmt().v1()
//!     .clusters().cluster("123").addons().addon("logging").get()
//! ```

use tokio::time::Instant;

use super::poll::PollRequest;
use super::request::{
    ActionRequest, AddRequest, DeleteRequest, EmptyRequest, GetRequest, ListRequest,
    RequestCore, Response, UpdateRequest,
};
use super::Connection;
use crate::error::Result;
use crate::model::clusters_mgmt::{
    AddOn, AddOnInstallation, Cluster, ClusterStatus, Credentials, Event, Group, Log,
    ProvisionShard, User, Version,
};

macro_rules! resource_client {
    ($(#[$attr:meta])* $name:ident) => {
        $(#[$attr])*
        #[derive(Debug, Clone)]
        pub struct $name {
            connection: Connection,
            path: String,
        }

        impl $name {
            pub(crate) fn new(connection: Connection, path: String) -> Self {
                Self { connection, path }
            }

            /// Path of the resource, relative to the server URL.
            pub fn path(&self) -> &str {
                &self.path
            }

            #[allow(dead_code)]
            fn core(&self) -> RequestCore {
                RequestCore::new(self.connection.clone(), self.path.clone())
            }

            #[allow(dead_code)]
            fn child(&self, segment: &str) -> (Connection, String) {
                (
                    self.connection.clone(),
                    format!("{}/{}", self.path, super::encode_segment(segment)),
                )
            }
        }
    };
}

resource_client!(
    /// Root of the `clusters_mgmt` service, before the version segment.
    ClustersMgmtClient
);

impl ClustersMgmtClient {
    pub fn v1(&self) -> Client {
        let (connection, path) = self.child("v1");
        Client::new(connection, path)
    }
}

resource_client!(
    /// Root of version 1 of the `clusters_mgmt` service.
    Client
);

impl Client {
    pub fn clusters(&self) -> ClustersClient {
        let (connection, path) = self.child("clusters");
        ClustersClient::new(connection, path)
    }

    /// Catalog of add-ons that can be installed in clusters.
    pub fn addons(&self) -> AddOnsClient {
        let (connection, path) = self.child("addons");
        AddOnsClient::new(connection, path)
    }

    pub fn versions(&self) -> VersionsClient {
        let (connection, path) = self.child("versions");
        VersionsClient::new(connection, path)
    }

    pub fn events(&self) -> EventsClient {
        let (connection, path) = self.child("events");
        EventsClient::new(connection, path)
    }
}

resource_client!(ClustersClient);

impl ClustersClient {
    pub fn list(&self) -> ListRequest<Cluster> {
        ListRequest::new(self.core())
    }

    /// Provisions a new cluster. The server answers 201 with the cluster.
    pub fn add(&self) -> AddRequest<Cluster> {
        AddRequest::add(self.core())
    }

    pub fn cluster(&self, id: &str) -> ClusterClient {
        let (connection, path) = self.child(id);
        ClusterClient::new(connection, path)
    }
}

resource_client!(ClusterClient);

impl ClusterClient {
    pub fn get(&self) -> GetRequest<Cluster> {
        GetRequest::new(self.core())
    }

    /// Updates the fields of the cluster that are set in the body.
    pub fn update(&self) -> UpdateRequest<Cluster> {
        UpdateRequest::update(self.core())
    }

    pub fn delete(&self) -> ClusterDeleteRequest {
        ClusterDeleteRequest {
            request: EmptyRequest::delete(self.core()),
            deprovision: None,
        }
    }

    pub fn hibernate(&self) -> ActionRequest {
        let (connection, path) = self.child("hibernate");
        ActionRequest::action(RequestCore::new(connection, path))
    }

    pub fn resume(&self) -> ActionRequest {
        let (connection, path) = self.child("resume");
        ActionRequest::action(RequestCore::new(connection, path))
    }

    /// Waits for the cluster, e.g. until its state is `ready`.
    pub fn poll(&self) -> PollRequest<Cluster> {
        PollRequest::new(self.get())
    }

    /// Add-ons installed in the cluster.
    pub fn addons(&self) -> AddOnInstallationsClient {
        let (connection, path) = self.child("addons");
        AddOnInstallationsClient::new(connection, path)
    }

    pub fn groups(&self) -> GroupsClient {
        let (connection, path) = self.child("groups");
        GroupsClient::new(connection, path)
    }

    pub fn logs(&self) -> LogsClient {
        let (connection, path) = self.child("logs");
        LogsClient::new(connection, path)
    }

    pub fn credentials(&self) -> CredentialsClient {
        let (connection, path) = self.child("credentials");
        CredentialsClient::new(connection, path)
    }

    pub fn provision_shard(&self) -> ProvisionShardClient {
        let (connection, path) = self.child("provision_shard");
        ProvisionShardClient::new(connection, path)
    }

    pub fn status(&self) -> ClusterStatusClient {
        let (connection, path) = self.child("status");
        ClusterStatusClient::new(connection, path)
    }
}

/// Request that deletes a cluster.
pub struct ClusterDeleteRequest {
    request: DeleteRequest,
    deprovision: Option<bool>,
}

impl ClusterDeleteRequest {
    pub fn parameter(mut self, name: &str, value: impl std::fmt::Display) -> Self {
        self.request = self.request.parameter(name, value);
        self
    }

    pub fn header(mut self, name: &str, value: impl std::fmt::Display) -> Self {
        self.request = self.request.header(name, value);
        self
    }

    /// When `false` the cloud resources are left in place and only the
    /// record of the cluster is removed. Defaults to `true` on the server.
    pub fn deprovision(mut self, value: bool) -> Self {
        self.deprovision = Some(value);
        self
    }

    pub async fn send(&self) -> Result<Response<()>> {
        self.request.send_inner(self.extra(), None).await
    }

    pub async fn send_with_timeout(&self, timeout: std::time::Duration) -> Result<Response<()>> {
        self.request
            .send_inner(self.extra(), Some(Instant::now() + timeout))
            .await
    }

    fn extra(&self) -> Vec<(String, String)> {
        self.deprovision
            .map(|value| vec![("deprovision".to_string(), value.to_string())])
            .unwrap_or_default()
    }
}

resource_client!(AddOnInstallationsClient);

impl AddOnInstallationsClient {
    pub fn list(&self) -> ListRequest<AddOnInstallation> {
        ListRequest::new(self.core())
    }

    pub fn add(&self) -> AddRequest<AddOnInstallation> {
        AddRequest::add(self.core())
    }

    pub fn addon(&self, id: &str) -> AddOnInstallationClient {
        let (connection, path) = self.child(id);
        AddOnInstallationClient::new(connection, path)
    }
}

resource_client!(AddOnInstallationClient);

impl AddOnInstallationClient {
    pub fn get(&self) -> GetRequest<AddOnInstallation> {
        GetRequest::new(self.core())
    }

    pub fn update(&self) -> UpdateRequest<AddOnInstallation> {
        UpdateRequest::update(self.core())
    }

    pub fn delete(&self) -> DeleteRequest {
        DeleteRequest::delete(self.core())
    }

    pub fn poll(&self) -> PollRequest<AddOnInstallation> {
        PollRequest::new(self.get())
    }
}

resource_client!(GroupsClient);

impl GroupsClient {
    pub fn list(&self) -> ListRequest<Group> {
        ListRequest::new(self.core())
    }

    pub fn group(&self, id: &str) -> GroupClient {
        let (connection, path) = self.child(id);
        GroupClient::new(connection, path)
    }
}

resource_client!(GroupClient);

impl GroupClient {
    pub fn get(&self) -> GetRequest<Group> {
        GetRequest::new(self.core())
    }

    pub fn users(&self) -> UsersClient {
        let (connection, path) = self.child("users");
        UsersClient::new(connection, path)
    }
}

resource_client!(UsersClient);

impl UsersClient {
    pub fn list(&self) -> ListRequest<User> {
        ListRequest::new(self.core())
    }

    pub fn add(&self) -> AddRequest<User> {
        AddRequest::add(self.core())
    }

    pub fn user(&self, id: &str) -> UserClient {
        let (connection, path) = self.child(id);
        UserClient::new(connection, path)
    }
}

resource_client!(UserClient);

impl UserClient {
    pub fn get(&self) -> GetRequest<User> {
        GetRequest::new(self.core())
    }

    pub fn delete(&self) -> DeleteRequest {
        DeleteRequest::delete(self.core())
    }
}

resource_client!(LogsClient);

impl LogsClient {
    pub fn list(&self) -> ListRequest<Log> {
        ListRequest::new(self.core())
    }

    /// Log with the given identifier, e.g. `install` or `uninstall`.
    pub fn log(&self, id: &str) -> LogClient {
        let (connection, path) = self.child(id);
        LogClient::new(connection, path)
    }
}

resource_client!(LogClient);

impl LogClient {
    pub fn get(&self) -> GetRequest<Log> {
        GetRequest::new(self.core())
    }
}

resource_client!(CredentialsClient);

impl CredentialsClient {
    pub fn get(&self) -> GetRequest<Credentials> {
        GetRequest::new(self.core())
    }
}

resource_client!(ProvisionShardClient);

impl ProvisionShardClient {
    pub fn get(&self) -> GetRequest<ProvisionShard> {
        GetRequest::new(self.core())
    }
}

resource_client!(ClusterStatusClient);

impl ClusterStatusClient {
    pub fn get(&self) -> GetRequest<ClusterStatus> {
        GetRequest::new(self.core())
    }

    pub fn poll(&self) -> PollRequest<ClusterStatus> {
        PollRequest::new(self.get())
    }
}

resource_client!(AddOnsClient);

impl AddOnsClient {
    pub fn list(&self) -> ListRequest<AddOn> {
        ListRequest::new(self.core())
    }

    pub fn add(&self) -> AddRequest<AddOn> {
        AddRequest::add(self.core())
    }

    pub fn addon(&self, id: &str) -> AddOnClient {
        let (connection, path) = self.child(id);
        AddOnClient::new(connection, path)
    }
}

resource_client!(AddOnClient);

impl AddOnClient {
    pub fn get(&self) -> GetRequest<AddOn> {
        GetRequest::new(self.core())
    }

    pub fn update(&self) -> UpdateRequest<AddOn> {
        UpdateRequest::update(self.core())
    }

    pub fn delete(&self) -> DeleteRequest {
        DeleteRequest::delete(self.core())
    }
}

resource_client!(VersionsClient);

impl VersionsClient {
    pub fn list(&self) -> ListRequest<Version> {
        ListRequest::new(self.core())
    }

    /// Version with the given identifier, e.g. `openshift-v4.15.2`.
    pub fn version(&self, id: &str) -> VersionClient {
        let (connection, path) = self.child(id);
        VersionClient::new(connection, path)
    }
}

resource_client!(VersionClient);

impl VersionClient {
    pub fn get(&self) -> GetRequest<Version> {
        GetRequest::new(self.core())
    }
}

resource_client!(EventsClient);

impl EventsClient {
    pub fn add(&self) -> AddRequest<Event> {
        AddRequest::add(self.core())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connection() -> Connection {
        Connection::builder()
            .url("http://localhost:8000")
            .build()
            .unwrap()
    }

    #[test]
    fn test_paths() {
        let root = connection().clusters_mgmt().v1();

        assert_eq!(root.path(), "/api/clusters_mgmt/v1");
        assert_eq!(
            root.clusters().cluster("123").path(),
            "/api/clusters_mgmt/v1/clusters/123"
        );
        assert_eq!(
            root.clusters()
                .cluster("123")
                .groups()
                .group("dedicated-admins")
                .users()
                .user("alice")
                .path(),
            "/api/clusters_mgmt/v1/clusters/123/groups/dedicated-admins/users/alice"
        );
        assert_eq!(
            root.clusters().cluster("123").provision_shard().path(),
            "/api/clusters_mgmt/v1/clusters/123/provision_shard"
        );
        assert_eq!(root.versions().version("v4").path(), "/api/clusters_mgmt/v1/versions/v4");
    }

    #[test]
    fn test_delete_deprovision_parameter() {
        let request = connection()
            .clusters_mgmt()
            .v1()
            .clusters()
            .cluster("123")
            .delete();
        assert!(request.extra().is_empty());

        let request = request.deprovision(false);
        assert_eq!(
            request.extra(),
            vec![("deprovision".to_string(), "false".to_string())]
        );
    }
}
