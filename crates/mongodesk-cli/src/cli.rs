//! mongodesk command-line interface
//!
//! Manages saved MongoDB connection profiles and the live clients dialed for
//! them. Configuration comes from an optional TOML file plus `MONGODESK_*`
//! environment variables; stored connection strings are encrypted with
//! `MONGODESK_ENCRYPTION_KEY`.
//!
//! ```text
//! mongodesk keygen
//! mongodesk test --uri mongodb://localhost:27017
//! mongodesk save --name Local --uri mongodb://localhost:27017
//! mongodesk list
//! mongodesk databases <ID>
//! mongodesk watch <ID> --interval 10
//! ```

mod logging;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use mongodesk_connection::{ConnectionManager, ConnectionStore};
use mongodesk_core::{AppConfig, DatabaseDriver, SecretCodec};
use mongodesk_driver_mongodb::MongoDbDriver;
use mongodesk_services::{
    ConnectionService, SaveConnectionRequest, ServiceError, UpdateConnectionRequest,
};
use uuid::Uuid;

#[derive(Debug, Parser)]
#[command(name = "mongodesk", version, about = "MongoDB connection manager")]
struct Cli {
    /// Emit machine-readable JSON instead of tables
    #[arg(long, global = true)]
    json: bool,

    /// Path to a TOML configuration file
    #[arg(long, global = true, env = "MONGODESK_CONFIG")]
    config: Option<PathBuf>,

    /// Path to the saved connections file
    #[arg(long, global = true, env = "MONGODESK_STORE")]
    store: Option<PathBuf>,

    /// Verbose logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Test a connection string without saving it
    Test {
        #[arg(long, env = "MONGODESK_URI", hide_env_values = true)]
        uri: String,
    },
    /// Test and save a new connection profile
    Save {
        #[arg(long)]
        name: String,
        #[arg(long, env = "MONGODESK_URI", hide_env_values = true)]
        uri: String,
        #[arg(long)]
        color: Option<String>,
    },
    /// Change a saved profile; a new connection string is tested first
    Update {
        id: Uuid,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        uri: Option<String>,
        #[arg(long)]
        color: Option<String>,
    },
    /// List saved profiles
    List,
    /// Close any live client and delete a saved profile
    Delete { id: Uuid },
    /// List databases through a saved profile
    Databases { id: Uuid },
    /// Connect and ping a saved profile
    Ping { id: Uuid },
    /// Hold a connection open and ping it on an interval until Ctrl-C
    Watch {
        id: Uuid,
        /// Seconds between pings
        #[arg(long, default_value_t = 10)]
        interval: u64,
    },
    /// Print a fresh random encryption key
    Keygen,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let logging_config = if cli.verbose {
        logging::LoggingConfig::verbose()
    } else {
        logging::LoggingConfig::default()
    };
    // Held until exit so buffered file logs are flushed
    let _log_guard = match logging::init(logging_config) {
        Ok(guard) => guard,
        Err(e) => {
            // Logging is not available yet
            eprintln!("failed to initialize logging: {e:#}");
            None
        }
    };

    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report_error(&e, cli.json);
            ExitCode::FAILURE
        }
    }
}

fn report_error(err: &anyhow::Error, json: bool) {
    let debug = std::env::var("MONGODESK_DEBUG_ERRORS").is_ok_and(|v| v == "true");
    match err.downcast_ref::<ServiceError>() {
        Some(service_error) => {
            tracing::debug!(code = service_error.code(), "command failed");
            let envelope = service_error.to_envelope(debug);
            if json {
                if let Err(e) = output::print_json(&envelope) {
                    eprintln!("error: {e:#}");
                }
            } else {
                output::print_error(&envelope);
            }
        }
        None => eprintln!("error: {err:#}"),
    }
}

async fn run(cli: &Cli) -> anyhow::Result<()> {
    if let Command::Keygen = cli.command {
        println!("{}", SecretCodec::generate_key_hex()?);
        return Ok(());
    }

    let config = load_config(cli.config.as_deref()).await?;
    let app = App::build(&config, cli.store.clone()).await?;

    let result = dispatch(&app, cli).await;
    app.service.shutdown().await;
    result
}

/// Everything a command needs, built once per invocation
struct App {
    service: ConnectionService,
}

impl App {
    async fn build(config: &AppConfig, store_path: Option<PathBuf>) -> anyhow::Result<Self> {
        // Fatal before any other component starts
        let codec = Arc::new(config.secret_codec()?);

        let store_path =
            store_path.unwrap_or_else(|| logging::data_directory().join("connections.json"));
        let store = Arc::new(
            ConnectionStore::open(&store_path)
                .await
                .with_context(|| format!("failed to open {}", store_path.display()))?,
        );
        let migrated = store.migrate_plaintext(&codec).await?;
        if migrated > 0 {
            tracing::info!(migrated, "encrypted legacy plaintext connection strings");
        }

        let driver: Arc<dyn DatabaseDriver> = Arc::new(MongoDbDriver::new());
        let manager = Arc::new(ConnectionManager::from_config(driver, config));
        manager.start_sweeper();

        Ok(Self {
            service: ConnectionService::new(manager, store, codec),
        })
    }
}

async fn load_config(path: Option<&std::path::Path>) -> anyhow::Result<AppConfig> {
    let default_path = dirs::config_dir().map(|dir| dir.join("mongodesk").join("config.toml"));

    let source = match (path, default_path) {
        (Some(path), _) => Some(
            tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("failed to read {}", path.display()))?,
        ),
        (None, Some(default_path)) if default_path.exists() => {
            Some(tokio::fs::read_to_string(&default_path).await?)
        }
        _ => None,
    };

    Ok(AppConfig::load(source.as_deref())?)
}

async fn dispatch(app: &App, cli: &Cli) -> anyhow::Result<()> {
    let service = &app.service;

    match &cli.command {
        Command::Test { uri } => {
            let outcome = service.test(uri).await;
            if cli.json {
                output::print_json(&outcome)?;
            } else {
                output::print_test_outcome(&outcome);
            }
            if !outcome.ok {
                anyhow::bail!("connection test failed");
            }
        }
        Command::Save { name, uri, color } => {
            let summary = service
                .save(SaveConnectionRequest {
                    name: name.clone(),
                    color: color.clone(),
                    connection_string: uri.clone(),
                })
                .await?;
            if cli.json {
                output::print_json(&summary)?;
            } else {
                println!("Saved connection {} ({})", summary.name, summary.id);
            }
        }
        Command::Update {
            id,
            name,
            uri,
            color,
        } => {
            let summary = service
                .update(
                    *id,
                    UpdateConnectionRequest {
                        name: name.clone(),
                        color: color.clone(),
                        connection_string: uri.clone(),
                    },
                )
                .await?;
            if cli.json {
                output::print_json(&summary)?;
            } else {
                println!("Updated connection {} ({})", summary.name, summary.id);
            }
        }
        Command::List => {
            let connections = service.list();
            if cli.json {
                output::print_json(&connections)?;
            } else {
                output::print_connections(&connections);
            }
        }
        Command::Delete { id } => {
            service.delete(*id).await?;
            if cli.json {
                output::print_json(&serde_json::json!({ "success": true, "id": id }))?;
            } else {
                println!("Deleted connection {id}");
            }
        }
        Command::Databases { id } => {
            let databases = service.list_databases(*id).await?;
            if cli.json {
                output::print_json(&databases)?;
            } else {
                output::print_databases(&databases);
            }
        }
        Command::Ping { id } => {
            service.connect(*id).await?;
            let ok = service.ping(*id).await;
            if cli.json {
                output::print_json(&serde_json::json!({ "ok": ok }))?;
            } else {
                println!("{}", if ok { "pong" } else { "no response" });
            }
            if !ok {
                anyhow::bail!("ping failed");
            }
        }
        Command::Watch { id, interval } => watch(service, *id, *interval, cli.json).await?,
        // Handled before configuration is loaded
        Command::Keygen => {}
    }

    Ok(())
}

async fn watch(
    service: &ConnectionService,
    id: Uuid,
    interval_secs: u64,
    json: bool,
) -> anyhow::Result<()> {
    service.connect(id).await?;
    tracing::info!(connection_id = %id, interval_secs, "watching connection");

    let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupted, shutting down");
                break;
            }
            _ = ticker.tick() => {
                // Redial if the handle was swept
                if !service.status(id).active {
                    service.connect(id).await?;
                }
                let ok = service.ping(id).await;
                let stats = service.stats();
                if json {
                    output::print_json(&serde_json::json!({ "ok": ok, "stats": stats }))?;
                } else {
                    println!("ping: {}", if ok { "ok" } else { "failed" });
                    output::print_stats(&stats);
                }
            }
        }
    }

    Ok(())
}
