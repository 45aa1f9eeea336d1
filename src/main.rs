//! mockd - CLI entry point

use anyhow::{Context, Result};
use clap::Parser;
use mockd::{config, EventNotifier, LogObserver, MockServer};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(
    name = "mockd",
    about = "Configuration-driven HTTP mock server - canned responses and latency simulation",
    version
)]
struct Args {
    /// Path to the endpoint configuration file (JSON, or YAML by extension)
    #[arg(short, long, default_value = "data/sample.json")]
    config: PathBuf,

    /// Port to listen on
    #[arg(short, long, default_value_t = 8080)]
    port: u16,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'L', long, default_value = "info")]
    log_level: Level,

    /// Mirror every emitted event into the log stream
    #[arg(long)]
    log_events: bool,

    /// Print the bundled sample configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Validate the configuration and exit
    #[arg(long)]
    validate: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(args.log_level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // Print the bundled sample config if requested
    if args.print_config {
        print!("{}", include_str!("../data/sample.json"));
        return Ok(());
    }

    // Load configuration; any parse or validation failure is fatal before
    // the listener starts.
    info!(path = ?args.config, "Loading configuration");
    let definitions = config::from_file(&args.config).with_context(|| {
        format!(
            "failed to load configuration from {}",
            args.config.display()
        )
    })?;

    if args.validate {
        println!(
            "Configuration is valid ({} endpoints defined)",
            definitions.len()
        );
        return Ok(());
    }

    // Observers attach here, before the listener begins accepting.
    let mut notifier = EventNotifier::new();
    if args.log_events {
        notifier.register(Arc::new(LogObserver));
    }

    let server = MockServer::new(definitions, notifier);
    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    server.serve(addr).await
}
