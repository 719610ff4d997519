//! Gateway runtime configuration.

use std::net::SocketAddr;
use std::time::Duration;

use crate::client::DEFAULT_TIMEOUT;
use crate::trap::{AcceptedCredentials, TrapListenerConfig};

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// HTTP API bind address.
    pub http_bind: SocketAddr,
    /// Trap listener bind address.
    pub trap_bind: SocketAddr,
    /// UDP port commands are sent to on target hosts.
    pub command_port: u16,
    /// Per-exchange command timeout.
    pub timeout: Duration,
    /// v2c community accepted from trap senders.
    pub trap_community: String,
    /// v3 user accepted from trap senders at noAuthNoPriv.
    pub trap_user: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            http_bind: SocketAddr::from(([0, 0, 0, 0], 8000)),
            trap_bind: SocketAddr::from(([0, 0, 0, 0], 162)),
            command_port: 161,
            timeout: DEFAULT_TIMEOUT,
            trap_community: "public".to_string(),
            trap_user: "usr-none-none".to_string(),
        }
    }
}

impl GatewayConfig {
    pub fn trap_listener_config(&self) -> TrapListenerConfig {
        TrapListenerConfig {
            bind: self.trap_bind,
            recv_buffer_size: None,
            accepted: AcceptedCredentials {
                community: self.trap_community.clone(),
                v3_user: self.trap_user.clone(),
            },
        }
    }
}
