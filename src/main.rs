//! Mock DB Server - CLI Entry Point

use anyhow::Result;
use clap::Parser;
use mockdb_server::{database, MockServer, RandomSource, ServerConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(
    name = "mockdb-server",
    about = "File-backed mock HTTP server - JSON routes with templated random values",
    version
)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Path of the database file [default: db.json]
    #[arg(long)]
    db: Option<PathBuf>,

    /// Load the database once at startup instead of on every request
    #[arg(short = 's', long = "static")]
    static_mode: bool,

    /// Listen address [default: 0.0.0.0:3000]
    #[arg(short, long, value_name = "ADDR")]
    listen: Option<String>,

    /// Seed for the random generators (non-deterministic when omitted)
    #[arg(long)]
    seed: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'L', long, default_value = "info")]
    log_level: Level,

    /// Print default configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Validate configuration and database, then exit
    #[arg(long)]
    validate: bool,
}

impl Args {
    fn apply(&self, config: &mut ServerConfig) {
        if let Some(db) = &self.db {
            config.db = db.clone();
        }
        if self.static_mode {
            config.static_mode = true;
        }
        if let Some(listen) = &self.listen {
            config.listen = listen.clone();
        }
    }
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

    // Print default config if requested
    if args.print_config {
        let default_config = include_str!("../demos/default-config.yaml");
        println!("{}", default_config);
        return Ok(());
    }

    // Load configuration
    let mut config = match &args.config {
        Some(path) => {
            info!(path = ?path, "Loading configuration");
            ServerConfig::from_file(path)?
        }
        None => ServerConfig::default(),
    };
    args.apply(&mut config);
    config.validate()?;

    let rng = match args.seed {
        Some(seed) => RandomSource::seeded(seed),
        None => RandomSource::from_entropy(),
    };

    // Validate and exit if requested
    if args.validate {
        let table = database::load(&config.db, &rng)?;
        println!(
            "Database is valid ({} routes defined in {})",
            table.len(),
            config.db.display()
        );
        return Ok(());
    }

    let addr = config.listen_addr()?;
    let server = Arc::new(MockServer::new(config, rng)?);
    let listener = TcpListener::bind(addr).await?;

    info!(address = %addr, "Starting mock server");
    server.serve(listener).await?;

    Ok(())
}
