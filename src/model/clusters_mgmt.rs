//! Types of the `clusters_mgmt/v1` service.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ObjectList;

/// Overall state of a cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusterState {
    Error,
    Hibernating,
    Installing,
    Pending,
    PoweringDown,
    Ready,
    Resuming,
    Uninstalling,
    Unknown,
    Validating,
    Waiting,
}

impl ClusterState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClusterState::Error => "error",
            ClusterState::Hibernating => "hibernating",
            ClusterState::Installing => "installing",
            ClusterState::Pending => "pending",
            ClusterState::PoweringDown => "powering_down",
            ClusterState::Ready => "ready",
            ClusterState::Resuming => "resuming",
            ClusterState::Uninstalling => "uninstalling",
            ClusterState::Unknown => "unknown",
            ClusterState::Validating => "validating",
            ClusterState::Waiting => "waiting",
        }
    }

    /// States a cluster does not leave without outside action.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ClusterState::Ready | ClusterState::Error | ClusterState::Hibernating
        )
    }
}

impl fmt::Display for ClusterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ClusterState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_value(serde_json::Value::String(s.to_lowercase()))
            .map_err(|_| format!("unknown cluster state '{}'", s))
    }
}

/// How an add-on operator is installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddOnInstallMode {
    AllNamespaces,
    OwnNamespace,
    SingleNamespace,
}

/// State of an add-on installed in a cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddOnInstallationState {
    Deleting,
    Failed,
    Installing,
    Pending,
    Ready,
}

model! {
    /// Definition of an OpenShift cluster.
    resource Cluster = "Cluster" {
        name: String,
        display_name: String,
        external_id: String,
        state: ClusterState,
        openshift_version: String,
        multi_az: bool,
        managed: bool,
        etcd_encryption: bool,
        creation_timestamp: DateTime<Utc>,
        expiration_timestamp: DateTime<Utc>,
        properties: HashMap<String, String>,
        region: CloudRegion,
        cloud_provider: CloudProvider,
        version: Version,
        status: ClusterStatus,
        api: ClusterApi,
        console: ClusterConsole,
        nodes: ClusterNodes,
        billing_model: String,
        load_balancer_quota: i32,
        provision_shard: ProvisionShard,
        addons: ObjectList<AddOnInstallation>,
        groups: ObjectList<Group>,
    }
}

model! {
    /// Detailed status of a cluster.
    resource ClusterStatus = "ClusterStatus" {
        state: ClusterState,
        description: String,
        dns_ready: bool,
        provision_error_code: String,
        provision_error_message: String,
    }
}

model! {
    /// Information about the API server of a cluster.
    value ClusterApi {
        url: String,
        listening: String,
    }
}

model! {
    value ClusterConsole {
        url: String,
    }
}

model! {
    /// Counts and machine types of the nodes of a cluster.
    value ClusterNodes {
        compute: i32,
        infra: i32,
        master: i32,
        compute_machine_type: String,
        availability_zones: Vec<String>,
    }
}

model! {
    resource CloudRegion = "CloudRegion" {
        name: String,
        display_name: String,
        enabled: bool,
        supports_multi_az: bool,
    }
}

model! {
    resource CloudProvider = "CloudProvider" {
        name: String,
        display_name: String,
    }
}

model! {
    /// Version of OpenShift that clusters can be installed with.
    resource Version = "Version" {
        raw_id: String,
        enabled: bool,
        #[serde(rename = "default")]
        default_version: bool,
        channel_group: String,
        rosa_enabled: bool,
        end_of_life_timestamp: DateTime<Utc>,
        available_upgrades: Vec<String>,
    }
}

model! {
    /// Add-on that can be installed in a cluster.
    resource AddOn = "AddOn" {
        name: String,
        label: String,
        description: String,
        docs_link: String,
        icon: String,
        enabled: bool,
        hidden: bool,
        has_external_resources: bool,
        install_mode: AddOnInstallMode,
        operator_name: String,
        target_namespace: String,
        resource_name: String,
        resource_cost: f64,
        parameters: ObjectList<AddOnParameter>,
        requirements: Vec<AddOnRequirement>,
        sub_operators: Vec<AddOnSubOperator>,
    }
}

model! {
    resource AddOnParameter = "AddOnParameter" {
        name: String,
        description: String,
        value_type: String,
        validation: String,
        default_value: String,
        required: bool,
        editable: bool,
        enabled: bool,
    }
}

model! {
    /// Condition that must hold before an add-on can be installed.
    resource AddOnRequirement = "AddOnRequirement" {
        resource: String,
        data: HashMap<String, serde_json::Value>,
        enabled: bool,
    }
}

model! {
    value AddOnSubOperator {
        operator_name: String,
        operator_namespace: String,
        enabled: bool,
    }
}

model! {
    /// Add-on installed in a cluster.
    resource AddOnInstallation = "AddOnInstallation" {
        addon: AddOn,
        cluster: Cluster,
        state: AddOnInstallationState,
        state_description: String,
        operator_version: String,
        creation_timestamp: DateTime<Utc>,
        updated_timestamp: DateTime<Utc>,
        parameters: ObjectList<AddOnInstallationParameter>,
    }
}

model! {
    resource AddOnInstallationParameter = "AddOnInstallationParameter" {
        value: String,
    }
}

model! {
    /// Group of users of a cluster, e.g. `dedicated-admins`.
    resource Group = "Group" {
        users: ObjectList<User>,
    }
}

model! {
    /// User of a cluster. The identifier is the user name.
    resource User = "User" {}
}

model! {
    /// Install or uninstall log of a cluster.
    resource Log = "Log" {
        content: String,
    }
}

model! {
    /// Credentials of a cluster.
    resource Credentials = "Credentials" {
        kubeconfig: String,
        admin: AdminCredentials,
        ssh: SshCredentials,
    }
}

model! {
    value AdminCredentials {
        user: String,
        password: String,
    }
}

model! {
    value SshCredentials {
        public_key: String,
        private_key: String,
    }
}

model! {
    /// Provisioning shard a cluster was placed on.
    resource ProvisionShard = "ProvisionShard" {
        status: String,
        topology: String,
        cloud_provider: CloudProvider,
        region: CloudRegion,
        hive_config: ServerConfig,
        creation_timestamp: DateTime<Utc>,
        last_update_timestamp: DateTime<Utc>,
    }
}

model! {
    /// Endpoint of a management server used by a provisioning shard.
    resource ServerConfig = "ServerConfig" {
        server: String,
        kubeconfig: String,
    }
}

model! {
    /// Tracking event sent by a client.
    resource Event = "Event" {
        key: String,
        body: HashMap<String, String>,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Resource;

    #[test]
    fn test_cluster_round_trip() {
        let cluster = Cluster::new()
            .id("1a2b")
            .href("/api/clusters_mgmt/v1/clusters/1a2b")
            .name("prod")
            .state(ClusterState::Ready)
            .multi_az(true)
            .region(CloudRegion::link_to("us-east-1"))
            .nodes(ClusterNodes::new().compute(3).availability_zones(vec![
                "us-east-1a".to_string(),
            ]))
            .addons(vec![AddOnInstallation::new()
                .id("logging")
                .state(AddOnInstallationState::Installing)]);

        let json = serde_json::to_string(&cluster).unwrap();
        let decoded: Cluster = serde_json::from_str(&json).unwrap();

        assert_eq!(decoded, cluster);
    }

    #[test]
    fn test_cluster_wire_format() {
        let json = r#"{
            "kind": "Cluster",
            "id": "1a2b",
            "name": "prod",
            "state": "powering_down",
            "creation_timestamp": "2024-03-01T10:00:00Z",
            "region": {"kind": "CloudRegionLink", "id": "us-east-1"},
            "addons": {"kind": "AddOnInstallationList", "href": "/x/addons", "items": []},
            "properties": {"owner": "team-a"}
        }"#;

        let cluster: Cluster = serde_json::from_str(json).unwrap();
        assert_eq!(cluster.state, Some(ClusterState::PoweringDown));
        assert!(cluster.region.as_ref().unwrap().is_link());
        assert_eq!(
            cluster.addons.as_ref().unwrap().href.as_deref(),
            Some("/x/addons")
        );
        assert_eq!(
            cluster.properties.as_ref().unwrap().get("owner").map(String::as_str),
            Some("team-a")
        );
        assert_eq!(
            cluster.creation_timestamp.unwrap().to_rfc3339(),
            "2024-03-01T10:00:00+00:00"
        );
    }

    #[test]
    fn test_version_default_field_name() {
        let version = Version::new().raw_id("4.15.2").default_version(true);
        let json = serde_json::to_value(&version).unwrap();

        assert_eq!(json["default"], true);
        assert!(json.get("default_version").is_none());
    }

    #[test]
    fn test_add_on_nested_lists() {
        let json = r#"{
            "kind": "AddOn",
            "id": "logging",
            "install_mode": "own_namespace",
            "resource_cost": 0.5,
            "parameters": {"items": [{"id": "retention", "required": true}]},
            "requirements": [{"id": "r1", "resource": "cluster", "data": {"multi_az": true}}],
            "sub_operators": [{"operator_name": "fluentd", "enabled": false}]
        }"#;

        let addon: AddOn = serde_json::from_str(json).unwrap();
        assert_eq!(addon.install_mode, Some(AddOnInstallMode::OwnNamespace));
        assert_eq!(addon.resource_cost, Some(0.5));
        let parameters = addon.parameters.unwrap();
        assert_eq!(parameters.items[0].required, Some(true));
        assert_eq!(addon.sub_operators.unwrap()[0].enabled, Some(false));
    }

    #[test]
    fn test_cluster_state_from_str() {
        assert_eq!("ready".parse::<ClusterState>(), Ok(ClusterState::Ready));
        assert_eq!(
            "Powering_Down".parse::<ClusterState>(),
            Ok(ClusterState::PoweringDown)
        );
        assert!("bogus".parse::<ClusterState>().is_err());
        assert_eq!(ClusterState::PoweringDown.to_string(), "powering_down");
    }

    #[test]
    fn test_credentials_empty_ssh() {
        let credentials = Credentials::new().ssh(SshCredentials::new());
        let json = serde_json::to_value(&credentials).unwrap();

        assert_eq!(json["ssh"], serde_json::json!({}));
        assert!(json.get("admin").is_none());
    }
}
