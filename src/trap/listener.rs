//! Blocking UDP trap listener.
//!
//! Trap reception runs on a dedicated OS thread with a plain blocking
//! socket rather than inside the async runtime: the loop is trivial,
//! latency-insensitive, and must keep draining the socket even when the
//! runtime is saturated with HTTP work. A short read timeout lets the
//! thread poll for shutdown.

use std::net::{SocketAddr, UdpSocket};
use std::thread::JoinHandle;
use std::time::Duration;

use socket2::{Domain, Protocol, Socket, Type};
use tokio_util::sync::CancellationToken;

use super::{AcceptedCredentials, TrapBridge, parse_trap};
use crate::error::{Error, Result};

const RECV_BUF_SIZE: usize = 65535;

/// How often the receive loop wakes to check for cancellation.
const POLL_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Debug, Clone)]
pub struct TrapListenerConfig {
    /// Local address to receive traps on.
    pub bind: SocketAddr,
    /// OS receive buffer size, when the default is too small for bursts.
    pub recv_buffer_size: Option<usize>,
    /// Sender identities to accept.
    pub accepted: AcceptedCredentials,
}

impl Default for TrapListenerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 162)),
            recv_buffer_size: None,
            accepted: AcceptedCredentials::default(),
        }
    }
}

/// A bound trap socket, not yet receiving.
#[derive(Debug)]
pub struct TrapListener {
    socket: UdpSocket,
    accepted: AcceptedCredentials,
}

/// Join handle for a running listener thread.
#[derive(Debug)]
pub struct TrapListenerHandle {
    thread: JoinHandle<()>,
}

impl TrapListenerHandle {
    /// Wait for the listener thread to exit. Call after cancelling the
    /// token passed to [`TrapListener::spawn`].
    pub fn join(self) {
        if self.thread.join().is_err() {
            tracing::error!("trap listener thread panicked");
        }
    }
}

impl TrapListener {
    /// Bind the trap socket. Fails fast on an unavailable port so startup
    /// surfaces the error instead of a silent dead listener.
    pub fn bind(config: &TrapListenerConfig) -> Result<Self> {
        let socket = bind_socket(config).map_err(|source| Error::Io {
            target: Some(config.bind),
            source,
        })?;
        Ok(Self {
            socket,
            accepted: config.accepted.clone(),
        })
    }

    /// Local address the listener is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.socket.local_addr().map_err(|source| Error::Io {
            target: None,
            source,
        })
    }

    /// Start the receive loop on a dedicated thread. The loop runs until
    /// `shutdown` is cancelled; malformed or unauthorized datagrams are
    /// logged and dropped.
    pub fn spawn(self, bridge: TrapBridge, shutdown: CancellationToken) -> TrapListenerHandle {
        let thread = std::thread::Builder::new()
            .name("trap-listener".to_string())
            .spawn(move || self.run(bridge, shutdown));
        match thread {
            Ok(thread) => TrapListenerHandle { thread },
            Err(err) => {
                // Thread spawn only fails on resource exhaustion; surface
                // it and hand back a handle that joins immediately.
                tracing::error!(error = %err, "failed to spawn trap listener thread");
                TrapListenerHandle {
                    thread: std::thread::spawn(|| {}),
                }
            }
        }
    }

    fn run(self, bridge: TrapBridge, shutdown: CancellationToken) {
        tracing::info!(addr = ?self.socket.local_addr(), "trap listener started");
        let mut buf = [0u8; RECV_BUF_SIZE];
        while !shutdown.is_cancelled() {
            let (len, source) = match self.socket.recv_from(&mut buf) {
                Ok(received) => received,
                Err(err)
                    if matches!(
                        err.kind(),
                        std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
                    ) =>
                {
                    continue;
                }
                Err(err) => {
                    tracing::warn!(error = %err, "trap socket receive error");
                    continue;
                }
            };
            match parse_trap(&buf[..len], source, &self.accepted) {
                Ok(event) => {
                    tracing::debug!(source = %event.source, bindings = event.var_binds.len(), "trap received");
                    bridge.publish(event);
                }
                Err(err) => {
                    tracing::warn!(%source, error = %err, "dropping trap datagram");
                }
            }
        }
        tracing::info!("trap listener stopped");
    }
}

fn bind_socket(config: &TrapListenerConfig) -> std::io::Result<UdpSocket> {
    let domain = Domain::for_address(config.bind);
    let socket = Socket::new(domain, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;
    if let Some(size) = config.recv_buffer_size {
        socket.set_recv_buffer_size(size)?;
    }
    socket.bind(&config.bind.into())?;
    socket.set_read_timeout(Some(POLL_INTERVAL))?;
    Ok(socket.into())
}
