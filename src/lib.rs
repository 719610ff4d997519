//! HTTP gateway for SNMPv3.
//!
//! Exposes SNMP GET, GETNEXT, and SET as HTTP endpoints and re-publishes
//! received traps as a server-sent event stream. Speaks SNMPv3 with USM
//! authentication (HMAC-MD5-96, HMAC-SHA-96) and privacy (DES-CBC,
//! AES-128-CFB) to agents; accepts v2c community and v3 noAuthNoPriv
//! traps from senders.
//!
//! # Architecture
//!
//! ```text
//! HTTP client ── axum ── Client ── UDP ── agent
//! trap sender ── UDP ── TrapListener (thread) ── TrapBridge ── SSE
//! ```
//!
//! Commands are stateless: each one runs an engine discovery probe and
//! then the request itself, so there is no engine cache to invalidate.
//! Trap reception runs on a dedicated blocking thread and hands events
//! to async subscribers through an unbounded channel.

pub mod ber;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod message;
pub mod oid;
pub mod pdu;
pub mod trap;
pub mod v3;
pub mod value;
pub mod varbind;

pub use client::Client;
pub use error::{Error, Result};
pub use oid::Oid;
pub use v3::{Credentials, SecurityLevel};
pub use value::Value;
pub use varbind::VarBind;
