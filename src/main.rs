use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use machine_dispatch::api;
use machine_dispatch::config::ServerConfig;
use machine_dispatch::scheduler::Dispatcher;
use machine_dispatch::shutdown::install_shutdown_handler;

#[derive(Parser, Debug)]
#[command(name = "machine-dispatch")]
#[command(version)]
#[command(about = "Hands queued jobs to polling worker devices")]
struct Args {
    /// Address to bind the HTTP API to
    #[arg(long, default_value = "127.0.0.1")]
    host: IpAddr,

    /// Port for the HTTP API
    #[arg(long, default_value = "8000")]
    port: u16,

    /// Flag devices as stale in the queue status after this many ms of silence
    #[arg(long, default_value = "30000")]
    device_stale_after_ms: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::new(SocketAddr::new(args.host, args.port))
        .with_device_stale_after_ms(args.device_stale_after_ms);

    tracing::info!(
        listen_addr = %config.listen_addr,
        device_stale_after_ms = config.device_stale_after_ms,
        "Starting machine-dispatch"
    );

    let dispatcher = Arc::new(Dispatcher::new());
    let shutdown = install_shutdown_handler()?;

    api::serve(config, dispatcher, shutdown).await?;
    Ok(())
}
