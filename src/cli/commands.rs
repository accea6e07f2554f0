//! Command implementations for the CLI
//!
//! SBIO pattern: Commands return Results, I/O is handled by caller

use std::time::Duration;

use serde::de::DeserializeOwned;
use thiserror::Error;

use super::{CreateClusterArgs, ListArgs};
use crate::client::{Connection, ListRequest, ListResponse, Response};
use crate::config::{self, Config, ConfigError, Context};
use crate::model::clusters_mgmt::{
    AddOn, AddOnInstallation, CloudProvider, CloudRegion, Cluster, ClusterNodes, ClusterState,
    Credentials, Group, User, Version,
};
use crate::model::service_logs::{LogEntry, Severity};
use crate::model::Resource;

/// Errors that can occur during command execution
#[derive(Error, Debug)]
pub enum CommandError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Api(#[from] crate::error::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Server sent an empty response for {0}")]
    EmptyResponse(String),

    #[error("Cluster '{id}' is in state '{state}'")]
    UnexpectedState { id: String, state: ClusterState },
}

/// Result type for commands
pub type CommandResult<T> = Result<T, CommandError>;

// ============================================================================
// Context Commands (Pure business logic)
// ============================================================================

/// Info about a context for display
#[derive(Debug, Clone)]
pub struct ContextInfo {
    pub name: String,
    pub url: String,
    pub is_current: bool,
}

/// List all contexts
pub fn context_list(config: &Config) -> Vec<ContextInfo> {
    let current = config.current_context.as_deref();
    config
        .contexts
        .iter()
        .map(|(name, ctx)| ContextInfo {
            name: name.clone(),
            url: ctx.url.clone(),
            is_current: Some(name.as_str()) == current,
        })
        .collect()
}

/// Get current context name and URL
pub fn context_current(config: &Config) -> CommandResult<(String, String)> {
    let ctx = config::get_current_context(config)?;
    Ok((ctx.name.clone(), ctx.url.clone()))
}

/// Switch to a context
pub fn context_use(config: &mut Config, name: &str) -> CommandResult<()> {
    config::set_current_context(config, name)?;
    Ok(())
}

/// Add a new context. The first context added becomes the current one.
pub fn context_add(
    config: &mut Config,
    name: &str,
    url: &str,
    token: Option<&str>,
    description: Option<&str>,
) -> CommandResult<()> {
    if reqwest::Url::parse(url).is_err() {
        return Err(CommandError::InvalidArgument(format!(
            "'{}' is not a valid URL",
            url
        )));
    }
    let mut ctx = Context::new(name, url);
    if let Some(token) = token {
        ctx = ctx.with_token(token);
    }
    if let Some(description) = description {
        ctx = ctx.with_description(description);
    }
    config::add_context(config, ctx);
    if config.current_context.is_none() {
        config.current_context = Some(name.to_string());
    }
    Ok(())
}

/// Delete a context
pub fn context_delete(config: &mut Config, name: &str) -> CommandResult<bool> {
    Ok(config::remove_context(config, name).is_some())
}

// ============================================================================
// Request building (Pure business logic)
// ============================================================================

/// Cluster sent by `ocm create cluster`.
pub fn cluster_spec(args: &CreateClusterArgs) -> Cluster {
    let mut cluster = Cluster::new().name(args.name.as_str());
    if let Some(ref display_name) = args.display_name {
        cluster = cluster.display_name(display_name.as_str());
    }
    if let Some(ref version) = args.version {
        cluster = cluster.version(Version::link_to(version.as_str()));
    }
    if let Some(ref region) = args.region {
        cluster = cluster.region(CloudRegion::link_to(region.as_str()));
    }
    if let Some(ref provider) = args.provider {
        cluster = cluster.cloud_provider(CloudProvider::link_to(provider.as_str()));
    }
    if args.multi_az {
        cluster = cluster.multi_az(true);
    }
    if let Some(compute) = args.compute_nodes {
        cluster = cluster.nodes(ClusterNodes::new().compute(compute));
    }
    cluster
}

/// Search selecting the service log of a cluster, optionally by severity.
pub fn log_search(cluster: &str, severity: Option<Severity>) -> CommandResult<String> {
    if cluster.contains('\'') {
        return Err(CommandError::InvalidArgument(format!(
            "cluster identifier '{}' contains a quote",
            cluster
        )));
    }
    let mut search = format!("cluster_id = '{}'", cluster);
    if let Some(severity) = severity {
        search.push_str(&format!(" and severity = '{}'", severity));
    }
    Ok(search)
}

fn with_list_args<T: DeserializeOwned>(mut request: ListRequest<T>, args: &ListArgs) -> ListRequest<T> {
    if let Some(ref search) = args.search {
        request = request.search(search.as_str());
    }
    if let Some(ref order) = args.order {
        request = request.order(order.as_str());
    }
    if let Some(page) = args.page {
        request = request.page(page);
    }
    if let Some(size) = args.size {
        request = request.size(size);
    }
    request
}

fn body<T>(response: Response<T>, what: &str) -> CommandResult<T> {
    response
        .into_body()
        .ok_or_else(|| CommandError::EmptyResponse(what.to_string()))
}

// ============================================================================
// API Commands
// ============================================================================

/// Opens a connection to the endpoint selected by flags, environment or context.
pub fn connect(config: &Config, url: Option<&str>, token: Option<&str>) -> CommandResult<Connection> {
    let endpoint = config.endpoint(url, token)?;
    let mut builder = Connection::builder().url(endpoint.url);
    if let Some(token) = endpoint.token {
        builder = builder.token(token);
    }
    Ok(builder.build()?)
}

pub async fn list_clusters(conn: &Connection, args: &ListArgs) -> CommandResult<ListResponse<Cluster>> {
    let request = with_list_args(conn.clusters_mgmt().v1().clusters().list(), args);
    Ok(request.send().await?)
}

pub async fn get_cluster(conn: &Connection, id: &str) -> CommandResult<Cluster> {
    let response = conn.clusters_mgmt().v1().clusters().cluster(id).get().send().await?;
    body(response, &format!("cluster '{}'", id))
}

pub async fn create_cluster(conn: &Connection, args: &CreateClusterArgs) -> CommandResult<Cluster> {
    let response = conn
        .clusters_mgmt()
        .v1()
        .clusters()
        .add()
        .body(cluster_spec(args))
        .send()
        .await?;
    body(response, &format!("new cluster '{}'", args.name))
}

/// Deletes a cluster, returning the status of the response.
pub async fn delete_cluster(conn: &Connection, id: &str, deprovision: bool) -> CommandResult<u16> {
    let response = conn
        .clusters_mgmt()
        .v1()
        .clusters()
        .cluster(id)
        .delete()
        .deprovision(deprovision)
        .send()
        .await?;
    Ok(response.status())
}

pub async fn hibernate_cluster(conn: &Connection, id: &str) -> CommandResult<()> {
    conn.clusters_mgmt()
        .v1()
        .clusters()
        .cluster(id)
        .hibernate()
        .send()
        .await?;
    Ok(())
}

pub async fn resume_cluster(conn: &Connection, id: &str) -> CommandResult<()> {
    conn.clusters_mgmt()
        .v1()
        .clusters()
        .cluster(id)
        .resume()
        .send()
        .await?;
    Ok(())
}

/// What `ocm wait cluster` waits for
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WaitCondition {
    State(ClusterState),
    Deleted,
}

/// Polls a cluster until `condition` holds.
///
/// Waiting for a state stops early when the cluster reaches `error`. Returns
/// the last cluster seen, `None` once it is deleted.
pub async fn wait_for_cluster(
    conn: &Connection,
    id: &str,
    condition: WaitCondition,
    timeout: Duration,
    interval: Duration,
) -> CommandResult<Option<Cluster>> {
    let poll = conn
        .clusters_mgmt()
        .v1()
        .clusters()
        .cluster(id)
        .poll()
        .interval(interval)
        .timeout(timeout);

    match condition {
        WaitCondition::Deleted => {
            poll.status(404).start().await?;
            Ok(None)
        }
        WaitCondition::State(wanted) => {
            let response = poll
                .predicate(move |response: &Response<Cluster>| {
                    matches!(
                        response.body().and_then(|c| c.state),
                        Some(state) if state == wanted || state == ClusterState::Error
                    )
                })
                .start()
                .await?;
            let cluster = body(response, &format!("cluster '{}'", id))?;
            match cluster.state {
                Some(state) if state != wanted => Err(CommandError::UnexpectedState {
                    id: id.to_string(),
                    state,
                }),
                _ => Ok(Some(cluster)),
            }
        }
    }
}

pub async fn list_addons(conn: &Connection, args: &ListArgs) -> CommandResult<ListResponse<AddOn>> {
    let request = with_list_args(conn.clusters_mgmt().v1().addons().list(), args);
    Ok(request.send().await?)
}

pub async fn list_addon_installations(
    conn: &Connection,
    cluster: &str,
    args: &ListArgs,
) -> CommandResult<ListResponse<AddOnInstallation>> {
    let addons = conn.clusters_mgmt().v1().clusters().cluster(cluster).addons();
    Ok(with_list_args(addons.list(), args).send().await?)
}

pub async fn list_versions(conn: &Connection, args: &ListArgs) -> CommandResult<ListResponse<Version>> {
    let request = with_list_args(conn.clusters_mgmt().v1().versions().list(), args);
    Ok(request.send().await?)
}

pub async fn list_groups(conn: &Connection, cluster: &str) -> CommandResult<Vec<Group>> {
    let response = conn
        .clusters_mgmt()
        .v1()
        .clusters()
        .cluster(cluster)
        .groups()
        .list()
        .send()
        .await?;
    Ok(response.into_items())
}

pub async fn list_users(conn: &Connection, cluster: &str, group: &str) -> CommandResult<Vec<User>> {
    let response = conn
        .clusters_mgmt()
        .v1()
        .clusters()
        .cluster(cluster)
        .groups()
        .group(group)
        .users()
        .list()
        .send()
        .await?;
    Ok(response.into_items())
}

pub async fn get_credentials(conn: &Connection, cluster: &str) -> CommandResult<Credentials> {
    let response = conn
        .clusters_mgmt()
        .v1()
        .clusters()
        .cluster(cluster)
        .credentials()
        .get()
        .send()
        .await?;
    body(response, &format!("credentials of cluster '{}'", cluster))
}

pub async fn list_service_logs(
    conn: &Connection,
    cluster: &str,
    severity: Option<Severity>,
    size: i32,
) -> CommandResult<ListResponse<LogEntry>> {
    let response = conn
        .service_logs()
        .v1()
        .cluster_logs()
        .list()
        .search(log_search(cluster, severity)?)
        .size(size)
        .send()
        .await?;
    Ok(response)
}

/// Identifier of a resource for messages, `<unknown>` when unset.
pub fn display_id<T: Resource>(resource: &T) -> &str {
    resource.object_id().unwrap_or("<unknown>")
}
