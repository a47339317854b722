use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_appender::rolling;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use rfidpi::db::TagStore;
use rfidpi::host::SystemHost;
use rfidpi::server::config::ServerConfig;
use rfidpi::version::VERSION;
use rfidpi::wiegand;

#[derive(Parser, Debug)]
#[command(author, version = VERSION, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Port to listen on, overriding the configuration
    #[arg(short, long)]
    port: Option<u16>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the REST API (default)
    Serve,
    /// Decode a 26-bit Wiegand bit string into the JSON body the reader posts
    Decode { bits: String },
}

fn init_logging(log_dir: &str) {
    // Log to a file: JSON format, daily rotation
    let file_appender = rolling::daily(log_dir, "rfidpi.log");
    let file_layer = fmt::layer()
        .with_writer(file_appender)
        .with_ansi(false)
        .json();

    // Log to stdout: human-readable format
    let stdout_layer = fmt::layer().with_writer(std::io::stdout);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer)
        .init();
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for the shutdown signal.");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received, stopping HTTP server.");
}

async fn serve(config: ServerConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config = Arc::new(config);
    let addr = config.socket_addr()?;

    // --- Tag Store Setup ---
    let tag_store = match TagStore::open(&config.database_path) {
        Ok(store) => {
            info!(path = %config.database_path, "Tag store ready.");
            Arc::new(store)
        }
        Err(e) => {
            error!(path = %config.database_path, error = %e, "Failed to open tag store.");
            return Err(e.into());
        }
    };

    let host = Arc::new(SystemHost::new(
        config.restart_command.clone(),
        config.shutdown_command.clone(),
    ));

    if config.admin_token.is_none() {
        warn!("No admin token configured: reset, shutdown and restart routes are open to any caller.");
    }

    let app = rfidpi::web::create_axum_router(tag_store, host, config.clone());

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(address = %addr, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("HTTP server stopped.");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = Args::parse();

    if let Some(Command::Decode { bits }) = &args.command {
        let tag = wiegand::decode(bits)?.into_new_tag();
        println!("{}", serde_json::to_string(&tag)?);
        return Ok(());
    }

    let mut config = ServerConfig::load(args.config.as_deref())?;
    if let Some(port) = args.port {
        config.port = port;
    }

    init_logging(&config.log_dir);
    info!("Starting RFIDPi tag server, version: {}", VERSION);

    serve(config).await
}
