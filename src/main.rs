use std::fs;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use schemakeep::clock::{Clock, SystemClock};
use schemakeep::config::ServerConfig;
use schemakeep::server::{AppState, create_router};
use schemakeep::service::{ChangeFeed, ExtensionService};
use schemakeep::store::{SqliteStore, Store};

#[derive(Parser)]
#[command(name = "schemakeep")]
#[command(about = "A store for versioned XML schema extensions", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(long, short, default_value = "8080")]
        port: u16,

        /// Data directory for the database
        #[arg(long, default_value = "./data")]
        data_dir: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("schemakeep=info".parse()?))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            host,
            port,
            data_dir,
        } => {
            let config = ServerConfig {
                host,
                port,
                data_dir: data_dir.into(),
            };

            fs::create_dir_all(&config.data_dir)?;

            let store = SqliteStore::new(config.db_path())?;
            store.initialize()?;

            let store: Arc<dyn Store> = Arc::new(store);
            let clock: Arc<dyn Clock> = Arc::new(SystemClock);

            let state = Arc::new(AppState {
                extensions: ExtensionService::new(store.clone(), clock.clone()),
                changes: ChangeFeed::new(store, clock),
            });

            let app = create_router(state);
            let addr = config.socket_addr()?;

            info!("Starting server on {}", addr);

            let listener = tokio::net::TcpListener::bind(addr).await?;
            axum::serve(listener, app).await?;
        }
    }

    Ok(())
}
