//! Frontdesk - AI receptionist simulator
//!
//! Entry point for the web server and the small maintenance commands.

use anyhow::Context;
use clap::{Parser, Subcommand};
use frontdesk_core::{
    api::{ApiServer, ApiServerConfig},
    config::FrontdeskConfig,
    ConnectionMode, EventBroadcaster, HelpDesk, KnowledgeBaseView, LibsqlStorage,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, Level};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "frontdesk")]
#[command(about = "AI receptionist simulator with a human supervisor loop", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Set log level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Database path (overrides FRONTDESK_DB_PATH, the config file and the default)
    #[arg(long)]
    db_path: Option<String>,

    /// Configuration file
    #[arg(long, env = "FRONTDESK_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the web server (default)
    Serve {
        /// Listen address
        #[arg(long)]
        addr: Option<String>,

        /// Change-notification channel capacity
        #[arg(long)]
        capacity: Option<usize>,
    },

    /// Create the database and a default configuration file
    Init {
        /// Database path
        #[arg(short, long)]
        database: Option<String>,
    },

    /// Print learned knowledge entries
    Knowledge {
        /// Case-insensitive filter over question and answer
        #[arg(short, long)]
        search: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // Broadcast receivers dropped by SSE disconnects are not worth logging
    let level = level.as_str().to_lowercase();
    let filter = EnvFilter::new(format!(
        "frontdesk={level},frontdesk_core={level},tower_http={level},\
         tokio::sync::broadcast=error,tokio_stream=error"
    ));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    debug!("Frontdesk v{} starting...", env!("CARGO_PKG_VERSION"));

    let config_path = cli.config.clone().unwrap_or_else(FrontdeskConfig::default_path);
    let config = FrontdeskConfig::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    match cli.command {
        None => serve(&config, cli.db_path, None, None).await,
        Some(Commands::Serve { addr, capacity }) => serve(&config, cli.db_path, addr, capacity).await,
        Some(Commands::Init { database }) => {
            let mode = config.connection_mode(database.or(cli.db_path))?;
            let location = describe(&mode);
            LibsqlStorage::new_with_validation(mode, true).await?;
            println!("✓ Database initialized: {}", location);

            if !config_path.exists() {
                config.save(&config_path)?;
                println!("✓ Configuration written: {}", config_path.display());
            }
            Ok(())
        }
        Some(Commands::Knowledge { search }) => {
            let desk = open_desk(&config, cli.db_path, config.server.event_capacity).await?;
            let mut view = KnowledgeBaseView::new(desk);
            view.refresh().await?;
            view.set_search(search.unwrap_or_default());

            let entries = view.filtered();
            if entries.is_empty() {
                let (title, hint) = view.empty_message();
                println!("{}", title);
                println!("  {}", hint);
                return Ok(());
            }

            println!("{} of {} learned answers", entries.len(), view.count());
            for entry in entries {
                println!();
                println!("Q: {}", entry.question);
                println!("A: {}", entry.answer);
                println!("   learned {}", entry.created_at.format("%Y-%m-%d %H:%M"));
            }
            Ok(())
        }
    }
}

async fn serve(
    config: &FrontdeskConfig,
    db_path: Option<String>,
    addr: Option<String>,
    capacity: Option<usize>,
) -> anyhow::Result<()> {
    let addr = addr.unwrap_or_else(|| config.server.addr.clone());
    let socket_addr: SocketAddr = addr
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid address '{}': {}", addr, e))?;
    let capacity = capacity.unwrap_or(config.server.event_capacity);

    let desk = open_desk(config, db_path, capacity).await?;
    let server = ApiServer::new(
        ApiServerConfig {
            addr: socket_addr,
            agent: config.agent.clone(),
        },
        desk,
    );

    debug!("Starting server instance {}", server.instance_id());
    server.serve().await
}

async fn open_desk(
    config: &FrontdeskConfig,
    db_path: Option<String>,
    capacity: usize,
) -> anyhow::Result<HelpDesk> {
    let mode = config.connection_mode(db_path)?;
    debug!("Database: {}", describe(&mode));

    let storage = LibsqlStorage::new_with_validation(mode, true).await?;
    Ok(HelpDesk::new(
        Arc::new(storage),
        EventBroadcaster::new(capacity),
    ))
}

fn describe(mode: &ConnectionMode) -> String {
    match mode {
        ConnectionMode::Local(path) => path.clone(),
        ConnectionMode::Remote { url, .. } => url.clone(),
    }
}
