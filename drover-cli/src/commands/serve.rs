//! `drover log-serve` - host a shared log database.

// Layer 1: Standard library
use std::path::PathBuf;

// Layer 2: Third-party
use clap::Args;
use drover_store::{
    discover_service, LogService, LogServiceConfig, SERVICE_PORT_BASE, SERVICE_PORT_END,
};

// Layer 3: Internal
use crate::error::{CliError, Result};

#[derive(Args)]
pub struct ServeArgs {
    /// Log database to own and serve
    #[arg(long)]
    db: PathBuf,

    /// TCP protocol port (the HTTP info port is 200 below it)
    #[arg(long, default_value_t = SERVICE_PORT_BASE)]
    port: u16,

    /// Scan the port range for a service holding --db instead of serving
    #[arg(long)]
    find: bool,
}

pub async fn execute(args: ServeArgs) -> Result<()> {
    if args.find {
        match discover_service(&args.db, SERVICE_PORT_BASE..=SERVICE_PORT_END).await {
            Some(info) => {
                println!(
                    "found {} v{} on port {} (http {}), db {}, {} sessions, idle {} ms",
                    info.server,
                    info.version,
                    info.port,
                    info.http_port,
                    info.db_path,
                    info.session_count,
                    info.idle_time_ms,
                );
            }
            None => println!("no log service holds {}", args.db.display()),
        }
        return Ok(());
    }

    let config = LogServiceConfig::new(&args.db).with_port(args.port);
    let service = LogService::start(config)
        .await
        .map_err(|error| CliError::runtime(format!("cannot start log service: {error}")))?;

    println!(
        "serving {} on port {} (http {}), ctrl-c to stop",
        args.db.display(),
        service.port(),
        service.http_port(),
    );

    tokio::signal::ctrl_c()
        .await
        .map_err(|error| CliError::runtime(format!("signal handler: {error}")))?;

    eprintln!("shutting down");
    service.stop().await?;
    Ok(())
}
