//! snmpgwd: HTTP gateway for SNMPv3 commands and trap streaming.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use snmp_gateway::config::GatewayConfig;
use snmp_gateway::http::{AppState, router};
use snmp_gateway::trap::{self, TrapListener};
use snmp_gateway::Client;

#[derive(Parser, Debug)]
#[command(name = "snmpgwd", about = "HTTP gateway for SNMPv3 commands and traps", version)]
struct Args {
    /// HTTP API bind address.
    #[arg(long, default_value = "0.0.0.0:8000")]
    http_bind: SocketAddr,

    /// Trap listener bind address.
    #[arg(long, default_value = "0.0.0.0:162")]
    trap_bind: SocketAddr,

    /// UDP port commands are sent to on target hosts.
    #[arg(long, default_value_t = 161)]
    command_port: u16,

    /// Command timeout in seconds.
    #[arg(long, default_value_t = 5)]
    timeout: u64,

    /// v2c community accepted from trap senders.
    #[arg(long, default_value = "public")]
    trap_community: String,

    /// v3 user accepted from trap senders at noAuthNoPriv.
    #[arg(long, default_value = "usr-none-none")]
    trap_user: String,
}

impl Args {
    fn into_config(self) -> GatewayConfig {
        GatewayConfig {
            http_bind: self.http_bind,
            trap_bind: self.trap_bind,
            command_port: self.command_port,
            timeout: Duration::from_secs(self.timeout),
            trap_community: self.trap_community,
            trap_user: self.trap_user,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Args::parse().into_config();

    let (bridge, traps) = trap::channel();
    let listener = TrapListener::bind(&config.trap_listener_config())?;
    let shutdown = CancellationToken::new();
    let listener_handle = listener.spawn(bridge, shutdown.clone());

    let state = AppState {
        client: Arc::new(Client::new(config.timeout)?),
        traps,
        command_port: config.command_port,
    };

    let http = tokio::net::TcpListener::bind(config.http_bind).await?;
    tracing::info!(addr = %config.http_bind, "http api listening");

    axum::serve(http, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    shutdown.cancel();
    listener_handle.join();
    tracing::info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to install shutdown signal handler");
        // Without a signal handler, park forever rather than exit early.
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
