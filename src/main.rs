use std::process;
use std::time::Duration;

use anyhow::Context as _;
use clap::Parser;
use serde::Serialize;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use ocm_sdk::cli::*;
use ocm_sdk::client::{Connection, ListResponse};
use ocm_sdk::config::{self, default_config_path, Config};
use ocm_sdk::memory::MemoryServer;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .init();

    // Load .env file if specified
    if let Some(ref env_file) = cli.env_file {
        if let Err(e) = dotenvy::from_path(env_file) {
            error!("Failed to load env file {}: {}", env_file.display(), e);
            process::exit(1);
        }
    }

    if let Err(e) = run(cli).await {
        error!("{:#}", e);
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config_path = cli.config.clone().unwrap_or_else(default_config_path);

    match cli.command {
        Commands::Context(ref args) => {
            let mut config = config::load_config_from(&config_path)?;
            run_context(&mut config, &args.action)?;
            if !matches!(args.action, ContextAction::List | ContextAction::Current) {
                config::save_config_to(&config, &config_path)?;
            }
            Ok(())
        }
        Commands::Serve(ref args) => serve(args).await,
        ref command => {
            let config = config::load_config_from(&config_path)?;
            // values from --env-file are only visible once it has been loaded
            let url = cli.url.clone().or_else(|| std::env::var("OCM_URL").ok());
            let token = cli.token.clone().or_else(|| std::env::var("OCM_TOKEN").ok());
            let conn = connect(&config, url.as_deref(), token.as_deref())?;
            info!("Using API server {}", conn.url());
            run_api(&conn, command, cli.output).await
        }
    }
}

fn run_context(config: &mut Config, action: &ContextAction) -> CommandResult<()> {
    match action {
        ContextAction::List => print!("{}", format_context_list(&context_list(config))),
        ContextAction::Current => {
            let (name, url) = context_current(config)?;
            print!("{}", format_current_context(&name, &url));
        }
        ContextAction::Use { name } => {
            context_use(config, name)?;
            println!("Switched to context \"{}\".", name);
        }
        ContextAction::Add {
            name,
            server,
            api_token,
            description,
        } => {
            context_add(
                config,
                name,
                server,
                api_token.as_deref(),
                description.as_deref(),
            )?;
            println!("Context \"{}\" added.", name);
        }
        ContextAction::Delete { name } => {
            if context_delete(config, name)? {
                println!("Context \"{}\" deleted.", name);
            } else {
                println!("Context \"{}\" not found.", name);
            }
        }
    }
    Ok(())
}

async fn run_api(conn: &Connection, command: &Commands, output: OutputFormat) -> anyhow::Result<()> {
    match command {
        Commands::Get(args) => match &args.resource {
            GetResource::Clusters(list) => {
                let page = list_clusters(conn, list).await?;
                print_page(output, page, format_cluster_list)?;
            }
            GetResource::Cluster { id } => {
                let cluster = get_cluster(conn, id).await?;
                print_object(output, &cluster, format_cluster)?;
            }
            GetResource::Addons {
                cluster: Some(cluster),
                list,
            } => {
                let page = list_addon_installations(conn, cluster, list).await?;
                print_page(output, page, format_addon_installation_list)?;
            }
            GetResource::Addons {
                cluster: None,
                list,
            } => {
                let page = list_addons(conn, list).await?;
                print_page(output, page, format_addon_list)?;
            }
            GetResource::Versions(list) => {
                let page = list_versions(conn, list).await?;
                print_page(output, page, format_version_list)?;
            }
            GetResource::Groups { cluster } => {
                let groups = list_groups(conn, cluster).await?;
                print_object(output, &groups, |g| format_group_list(g))?;
            }
            GetResource::Users { cluster, group } => {
                let users = list_users(conn, cluster, group).await?;
                print_object(output, &users, |u| format_user_list(u))?;
            }
        },
        Commands::Create(args) => match &args.resource {
            CreateResource::Cluster(spec) => {
                let cluster = create_cluster(conn, spec).await?;
                match output {
                    OutputFormat::Json => print!("{}", format_json(&cluster)?),
                    OutputFormat::Table => println!(
                        "Cluster \"{}\" created with identifier '{}'.",
                        spec.name,
                        display_id(&cluster)
                    ),
                }
            }
        },
        Commands::Delete(args) => match &args.resource {
            DeleteResource::Cluster { id, deprovision } => {
                let status = delete_cluster(conn, id, *deprovision).await?;
                if status == 202 {
                    println!("Cluster '{}' is being deleted.", id);
                } else {
                    println!("Cluster '{}' deleted.", id);
                }
            }
        },
        Commands::Hibernate { id } => {
            hibernate_cluster(conn, id).await?;
            println!("Cluster '{}' is hibernating.", id);
        }
        Commands::Resume { id } => {
            resume_cluster(conn, id).await?;
            println!("Cluster '{}' is resuming.", id);
        }
        Commands::Wait(args) => match &args.resource {
            WaitResource::Cluster {
                id,
                state,
                deleted,
                timeout,
                interval,
            } => {
                let condition = if *deleted {
                    WaitCondition::Deleted
                } else {
                    WaitCondition::State(*state)
                };
                let cluster = wait_for_cluster(
                    conn,
                    id,
                    condition,
                    Duration::from_secs(*timeout),
                    Duration::from_secs(*interval),
                )
                .await?;
                match cluster {
                    Some(cluster) => println!(
                        "Cluster '{}' is {}.",
                        id,
                        cluster
                            .state
                            .map(|s| s.to_string())
                            .unwrap_or_else(|| "unknown".to_string())
                    ),
                    None => println!("Cluster '{}' deleted.", id),
                }
            }
        },
        Commands::Logs(args) => {
            let page = list_service_logs(conn, &args.cluster, args.severity, args.size).await?;
            print_page(output, page, format_log_entries)?;
        }
        Commands::Credentials { id } => {
            let credentials = get_credentials(conn, id).await?;
            print_object(output, &credentials, format_credentials)?;
        }
        Commands::Context(_) | Commands::Serve(_) => {}
    }
    Ok(())
}

fn print_page<T, F>(output: OutputFormat, page: ListResponse<T>, table: F) -> anyhow::Result<()>
where
    T: Serialize,
    F: Fn(&[T]) -> String,
{
    match output {
        OutputFormat::Json => print!("{}", format_json(page.items())?),
        OutputFormat::Table => {
            print!("{}", table(page.items()));
            if let Some(summary) = format_page_summary(page.items().len(), page.total()) {
                print!("{}", summary);
            }
        }
    }
    Ok(())
}

fn print_object<T, F>(output: OutputFormat, value: &T, table: F) -> anyhow::Result<()>
where
    T: Serialize + ?Sized,
    F: Fn(&T) -> String,
{
    match output {
        OutputFormat::Json => print!("{}", format_json(value)?),
        OutputFormat::Table => print!("{}", table(value)),
    }
    Ok(())
}

async fn serve(args: &ServeArgs) -> anyhow::Result<()> {
    let server = MemoryServer::with_install_steps(args.install_steps);
    let addr = format!("{}:{}", args.bind_addr, args.port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("Server listening on {}", addr);
    info!("Endpoints:");
    info!("  /api/clusters_mgmt/v1 - Clusters, add-ons, versions and events");
    info!("  /api/service_logs/v1  - Cluster service logs");

    axum::serve(listener, server.router())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }
}
