//! Trap reception: datagram parsing, event model, and the hand-off
//! between the blocking listener thread and async consumers.

mod bridge;
mod listener;

pub use bridge::{TrapBridge, TrapStream, channel};
pub use listener::{TrapListener, TrapListenerConfig, TrapListenerHandle};

use std::net::SocketAddr;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::ber::Reader;
use crate::error::{Error, Result};
use crate::message::{self, ScopedPduData};
use crate::pdu::{Pdu, PduType};

/// One binding of a received trap, pre-rendered for transport to
/// subscribers.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct EventBinding {
    pub oid: String,
    pub value: String,
}

/// A received trap, as published to stream subscribers.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TrapEvent {
    /// Reception time, seconds since the Unix epoch.
    pub timestamp: u64,
    /// Sender IP address.
    pub source: String,
    #[serde(rename = "varBinds")]
    pub var_binds: Vec<EventBinding>,
}

impl TrapEvent {
    fn from_pdu(source: SocketAddr, pdu: &Pdu) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        Self {
            timestamp,
            source: source.ip().to_string(),
            var_binds: pdu
                .varbinds
                .iter()
                .map(|vb| EventBinding {
                    oid: vb.oid.to_string(),
                    value: vb.value.to_string(),
                })
                .collect(),
        }
    }
}

/// Sender identities the listener accepts traps from.
#[derive(Debug, Clone)]
pub struct AcceptedCredentials {
    /// v2c community string.
    pub community: String,
    /// v3 user, accepted at noAuthNoPriv only.
    pub v3_user: String,
}

impl Default for AcceptedCredentials {
    fn default() -> Self {
        Self {
            community: "public".to_string(),
            v3_user: "usr-none-none".to_string(),
        }
    }
}

fn reject(detail: &'static str) -> Error {
    Error::Io {
        target: None,
        source: std::io::Error::new(std::io::ErrorKind::InvalidData, detail),
    }
}

/// Parse a received datagram into a trap event.
///
/// Accepts v2c traps carrying the configured community and v3 traps from
/// the configured user at noAuthNoPriv. Anything else is an error; the
/// listener logs and drops it.
pub fn parse_trap(
    data: &[u8],
    source: SocketAddr,
    accepted: &AcceptedCredentials,
) -> Result<TrapEvent> {
    let version = peek_version(data)?;
    let pdu = match version {
        1 => {
            let msg = message::decode_v2c(data)?;
            if msg.community != accepted.community.as_bytes() {
                return Err(reject("unknown community"));
            }
            msg.pdu
        }
        3 => {
            let msg = message::decode_v3(data)?;
            if msg.is_authenticated() || msg.is_encrypted() {
                return Err(reject("authenticated traps not accepted"));
            }
            if msg.security.user != accepted.v3_user.as_bytes() {
                return Err(reject("unknown v3 user"));
            }
            match msg.data {
                ScopedPduData::Plain(scoped) => scoped.pdu,
                ScopedPduData::Encrypted(_) => return Err(reject("encrypted trap")),
            }
        }
        other => {
            return Err(reject(match other {
                0 => "SNMPv1 traps not accepted",
                _ => "unknown message version",
            }));
        }
    };
    if pdu.pdu_type != PduType::TrapV2 {
        return Err(reject("not a notification PDU"));
    }
    Ok(TrapEvent::from_pdu(source, &pdu))
}

fn peek_version(data: &[u8]) -> Result<i64> {
    let mut r = Reader::new(data);
    let mut msg = r.read_sequence()?;
    msg.read_integer()
}
