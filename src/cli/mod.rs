//! CLI module for ocm
//!
//! Provides kubectl-like subcommands:
//! - `ocm context` - Manage API server contexts
//! - `ocm get` - List or show resources (clusters, addons, versions, groups, users)
//! - `ocm create cluster` / `ocm delete cluster` - Provision and remove clusters
//! - `ocm hibernate` / `ocm resume` - Power clusters down and up
//! - `ocm wait cluster` - Poll a cluster until it reaches a state
//! - `ocm logs` / `ocm credentials` - Service logs and admin credentials
//! - `ocm serve` - Run the in-memory API server

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod display;

pub use commands::*;
pub use display::*;

use crate::model::clusters_mgmt::ClusterState;
use crate::model::service_logs::Severity;

#[derive(Parser, Debug)]
#[command(name = "ocm")]
#[command(about = "Manage clusters through the cluster management API")]
#[command(version)]
pub struct Cli {
    /// Enable verbose logging output (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to config file (default: ~/.ocm/config)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// API server URL, overrides the current context
    #[arg(long, env = "OCM_URL", global = true)]
    pub url: Option<String>,

    /// Bearer token, overrides the current context
    #[arg(long, env = "OCM_TOKEN", global = true, hide_env_values = true)]
    pub token: Option<String>,

    /// Path to a .env file loaded before connecting
    #[arg(long, value_name = "FILE", global = true)]
    pub env_file: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table, global = true)]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage API server contexts
    Context(ContextArgs),

    /// Get/list resources
    Get(GetArgs),

    /// Create a resource
    Create(CreateArgs),

    /// Delete a resource
    Delete(DeleteArgs),

    /// Hibernate a ready cluster
    Hibernate {
        /// Cluster identifier
        id: String,
    },

    /// Resume a hibernating cluster
    Resume {
        /// Cluster identifier
        id: String,
    },

    /// Wait for a resource to reach a condition
    Wait(WaitArgs),

    /// Show the service log of a cluster
    Logs(LogsArgs),

    /// Show the admin credentials of a cluster
    Credentials {
        /// Cluster identifier
        id: String,
    },

    /// Run the in-memory API server
    Serve(ServeArgs),
}

/// Paging and filtering shared by the list commands
#[derive(clap::Args, Debug, Clone, Default)]
pub struct ListArgs {
    /// Search criteria, e.g. "name = 'mycluster'"
    #[arg(long)]
    pub search: Option<String>,

    /// Order criteria, e.g. "name desc"
    #[arg(long)]
    pub order: Option<String>,

    /// Page number, starting at 1
    #[arg(long)]
    pub page: Option<i32>,

    /// Page size
    #[arg(long)]
    pub size: Option<i32>,
}

/// Arguments for the get command
#[derive(Parser, Debug)]
pub struct GetArgs {
    /// Resource type to list
    #[command(subcommand)]
    pub resource: GetResource,
}

#[derive(Subcommand, Debug)]
pub enum GetResource {
    /// List clusters
    #[command(name = "clusters")]
    Clusters(ListArgs),

    /// Show a single cluster
    #[command(name = "cluster")]
    Cluster {
        /// Cluster identifier
        id: String,
    },

    /// List the add-on catalog, or the add-ons installed in a cluster
    #[command(name = "addons", visible_alias = "addon")]
    Addons {
        /// Cluster identifier
        #[arg(long)]
        cluster: Option<String>,

        #[command(flatten)]
        list: ListArgs,
    },

    /// List available versions
    #[command(name = "versions", visible_alias = "version")]
    Versions(ListArgs),

    /// List the groups of a cluster
    #[command(name = "groups", visible_alias = "group")]
    Groups {
        /// Cluster identifier
        cluster: String,
    },

    /// List the users of a group
    #[command(name = "users", visible_alias = "user")]
    Users {
        /// Cluster identifier
        cluster: String,

        /// Group identifier
        #[arg(long, default_value = "dedicated-admins")]
        group: String,
    },
}

/// Arguments for the create command
#[derive(Parser, Debug)]
pub struct CreateArgs {
    #[command(subcommand)]
    pub resource: CreateResource,
}

#[derive(Subcommand, Debug)]
pub enum CreateResource {
    /// Provision a new cluster
    #[command(name = "cluster")]
    Cluster(CreateClusterArgs),
}

#[derive(clap::Args, Debug, Clone)]
pub struct CreateClusterArgs {
    /// Cluster name
    pub name: String,

    /// Version identifier, e.g. openshift-v4.15.10 (default: the default version)
    #[arg(long)]
    pub version: Option<String>,

    /// Cloud region
    #[arg(long)]
    pub region: Option<String>,

    /// Cloud provider
    #[arg(long)]
    pub provider: Option<String>,

    /// Spread the nodes over several availability zones
    #[arg(long)]
    pub multi_az: bool,

    /// Number of compute nodes
    #[arg(long)]
    pub compute_nodes: Option<i32>,

    #[arg(long)]
    pub display_name: Option<String>,
}

/// Arguments for the delete command
#[derive(Parser, Debug)]
pub struct DeleteArgs {
    #[command(subcommand)]
    pub resource: DeleteResource,
}

#[derive(Subcommand, Debug)]
pub enum DeleteResource {
    /// Delete a cluster
    #[command(name = "cluster")]
    Cluster {
        /// Cluster identifier
        id: String,

        /// Also remove the cloud resources of the cluster
        #[arg(
            long,
            default_value_t = true,
            num_args = 0..=1,
            default_missing_value = "true",
            action = ArgAction::Set
        )]
        deprovision: bool,
    },
}

/// Arguments for the wait command
#[derive(Parser, Debug)]
pub struct WaitArgs {
    #[command(subcommand)]
    pub resource: WaitResource,
}

#[derive(Subcommand, Debug)]
pub enum WaitResource {
    /// Wait until a cluster is in a state, or gone
    #[command(name = "cluster")]
    Cluster {
        /// Cluster identifier
        id: String,

        /// State to wait for
        #[arg(long, default_value = "ready", conflicts_with = "deleted")]
        state: ClusterState,

        /// Wait until the cluster no longer exists
        #[arg(long)]
        deleted: bool,

        /// Give up after this many seconds
        #[arg(long, default_value = "3600")]
        timeout: u64,

        /// Seconds between two checks
        #[arg(long, default_value = "5")]
        interval: u64,
    },
}

/// Arguments for the logs command
#[derive(Parser, Debug)]
pub struct LogsArgs {
    /// Cluster identifier
    pub cluster: String,

    /// Only show entries of this severity
    #[arg(long)]
    pub severity: Option<Severity>,

    /// Number of entries to show
    #[arg(long, default_value = "100")]
    pub size: i32,
}

/// Arguments for the context command
#[derive(Parser, Debug)]
pub struct ContextArgs {
    #[command(subcommand)]
    pub action: ContextAction,
}

#[derive(Subcommand, Debug)]
pub enum ContextAction {
    /// List all contexts
    List,

    /// Show current context
    Current,

    /// Switch to a context
    Use {
        /// Context name
        name: String,
    },

    /// Add a new context
    Add {
        /// Context name
        name: String,

        /// Server URL
        #[arg(value_name = "URL")]
        server: String,

        /// Bearer token stored with the context
        #[arg(long)]
        api_token: Option<String>,

        #[arg(long)]
        description: Option<String>,
    },

    /// Delete a context
    Delete {
        /// Context name
        name: String,
    },
}

/// Arguments for the serve command
#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Bind address for the server
    #[arg(long, default_value = "127.0.0.1")]
    pub bind_addr: String,

    /// Port to listen on
    #[arg(short, long, default_value = "8000")]
    pub port: u16,

    /// Number of GETs an installing cluster needs to become ready
    #[arg(long, default_value_t = crate::memory::DEFAULT_INSTALL_STEPS)]
    pub install_steps: u32,
}
