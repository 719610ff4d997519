//! SNMPv3 command executor.
//!
//! One UDP exchange pair per command: a discovery probe to learn the
//! agent's engine id, boots, and time, then the authenticated request
//! itself. No engine cache is kept; the gateway trades a round trip per
//! command for having no state to invalidate.

use std::net::SocketAddr;
use std::time::Duration;

use bytes::Bytes;
use tokio::net::UdpSocket;

use crate::error::{DecodeErrorKind, Error, ErrorStatus, Result};
use crate::message::{
    self, FLAG_AUTH, FLAG_PRIV, FLAG_REPORTABLE, ScopedPdu, ScopedPduData, V3Message,
};
use crate::oid::Oid;
use crate::pdu::{Pdu, PduType};
use crate::v3::{auth, privacy, AuthProtocol, Credentials, PrivProtocol, SaltCounter, UsmSecurityParams};
use crate::value::Value;
use crate::varbind::VarBind;

const RECV_BUF_SIZE: usize = 65535;

/// Default per-exchange timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Executes GET, GETNEXT, and SET commands against SNMPv3 agents.
#[derive(Debug)]
pub struct Client {
    timeout: Duration,
    salts: SaltCounter,
}

impl Client {
    pub fn new(timeout: Duration) -> Result<Self> {
        Ok(Self {
            timeout,
            salts: SaltCounter::new()?,
        })
    }

    /// Read the values bound to `oids`.
    pub async fn get(
        &self,
        target: SocketAddr,
        creds: &Credentials,
        oids: &[Oid],
    ) -> Result<Vec<VarBind>> {
        let varbinds = oids.iter().cloned().map(VarBind::null).collect();
        self.execute(target, creds, PduType::GetRequest, varbinds)
            .await
    }

    /// Read the lexicographic successor of `oid`: a single MIB walk step.
    /// Always yields exactly one binding.
    pub async fn get_next(
        &self,
        target: SocketAddr,
        creds: &Credentials,
        oid: &Oid,
    ) -> Result<Vec<VarBind>> {
        let varbinds = self
            .execute(
                target,
                creds,
                PduType::GetNextRequest,
                vec![VarBind::null(oid.clone())],
            )
            .await?;
        first_binding(varbinds)
    }

    /// Write `value` to `oid` and return the agent's echo of the binding.
    pub async fn set(
        &self,
        target: SocketAddr,
        creds: &Credentials,
        oid: &Oid,
        value: Value,
    ) -> Result<Vec<VarBind>> {
        self.execute(
            target,
            creds,
            PduType::SetRequest,
            vec![VarBind::new(oid.clone(), value)],
        )
        .await
    }

    async fn execute(
        &self,
        target: SocketAddr,
        creds: &Credentials,
        pdu_type: PduType,
        varbinds: Vec<VarBind>,
    ) -> Result<Vec<VarBind>> {
        let socket = UdpSocket::bind("0.0.0.0:0").await.map_err(|source| Error::Io {
            target: Some(target),
            source,
        })?;
        socket.connect(target).await.map_err(|source| Error::Io {
            target: Some(target),
            source,
        })?;

        let engine = self.discover(&socket, target).await?;
        tracing::debug!(
            %target,
            engine_id = %hex(&engine.engine_id),
            boots = engine.engine_boots,
            time = engine.engine_time,
            "engine discovered"
        );

        let auth_protocol = creds.wire_auth();
        let priv_protocol = creds.wire_priv();
        let auth_key = match (&creds.auth_key, auth_protocol) {
            (Some(password), proto) if proto != AuthProtocol::None => {
                auth::password_to_key(proto, password.as_bytes(), &engine.engine_id)
            }
            _ => Vec::new(),
        };
        // The privacy key is localized with the auth protocol's hash
        // (RFC 3414 2.6), truncated to the cipher's key length.
        let priv_key = match (&creds.priv_key, priv_protocol) {
            (Some(password), proto) if proto != PrivProtocol::None => {
                let mut key =
                    auth::password_to_key(auth_protocol, password.as_bytes(), &engine.engine_id);
                key.truncate(proto.key_len());
                key
            }
            _ => Vec::new(),
        };

        let request_id = random_id()?;
        let msg_id = random_id()?;
        let pdu = Pdu::request(pdu_type, request_id, varbinds);
        let scoped = ScopedPdu::new(engine.engine_id.clone(), pdu);

        let mut flags = FLAG_REPORTABLE;
        if auth_protocol != AuthProtocol::None {
            flags |= FLAG_AUTH;
        }

        let (data, priv_params) = if priv_protocol != PrivProtocol::None {
            flags |= FLAG_PRIV;
            let encrypted = privacy::encrypt(
                priv_protocol,
                &priv_key,
                engine.engine_boots,
                engine.engine_time,
                self.salts.next(),
                &scoped.to_bytes(),
            )?;
            (
                ScopedPduData::Encrypted(encrypted.ciphertext),
                Bytes::from(encrypted.priv_params),
            )
        } else {
            (ScopedPduData::Plain(scoped), Bytes::new())
        };

        let security = UsmSecurityParams {
            engine_id: engine.engine_id.clone(),
            engine_boots: engine.engine_boots,
            engine_time: engine.engine_time,
            user: Bytes::copy_from_slice(creds.user.as_bytes()),
            auth_params: if flags & FLAG_AUTH != 0 {
                Bytes::from_static(&[0u8; auth::MAC_LEN])
            } else {
                Bytes::new()
            },
            priv_params,
        };

        let (mut datagram, auth_offset) = message::encode_v3(msg_id, flags, &security, &data);
        if let Some(offset) = auth_offset {
            let mac = auth::sign(auth_protocol, &auth_key, &datagram)?;
            datagram[offset..offset + auth::MAC_LEN].copy_from_slice(&mac);
        }

        let (reply, raw) = self.exchange(&socket, target, &datagram, msg_id).await?;

        if reply.is_authenticated() {
            self.verify_mac(target, auth_protocol, &auth_key, &reply, &raw)?;
        }

        let scoped = match reply.data {
            ScopedPduData::Plain(scoped) => scoped,
            ScopedPduData::Encrypted(ciphertext) => {
                let plaintext = privacy::decrypt(
                    priv_protocol,
                    &priv_key,
                    reply.security.engine_boots,
                    reply.security.engine_time,
                    &reply.security.priv_params,
                    &ciphertext,
                )?;
                let mut r = crate::ber::Reader::new(&plaintext);
                ScopedPdu::decode(&mut r)?
            }
        };

        interpret_reply(target, request_id, scoped.pdu)
    }

    /// One probe exchange: empty security parameters, reportable flag, and
    /// an empty GET. The agent answers with a usmStats report carrying its
    /// engine parameters.
    async fn discover(&self, socket: &UdpSocket, target: SocketAddr) -> Result<UsmSecurityParams> {
        let msg_id = random_id()?;
        let probe = message::encode_discovery(msg_id, random_id()?);
        let (reply, _) = self.exchange(socket, target, &probe, msg_id).await?;
        if reply.security.engine_id.is_empty() {
            return Err(Error::Io {
                target: Some(target),
                source: std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    "discovery reply without engine id",
                ),
            });
        }
        Ok(reply.security)
    }

    /// Send a datagram and wait for the matching reply, returning both the
    /// decoded message and the raw bytes (needed for MAC verification).
    async fn exchange(
        &self,
        socket: &UdpSocket,
        target: SocketAddr,
        datagram: &[u8],
        msg_id: i32,
    ) -> Result<(V3Message, Vec<u8>)> {
        socket.send(datagram).await.map_err(|source| Error::Io {
            target: Some(target),
            source,
        })?;
        let mut buf = vec![0u8; RECV_BUF_SIZE];
        let len = tokio::time::timeout(self.timeout, socket.recv(&mut buf))
            .await
            .map_err(|_| Error::Timeout {
                target: Some(target),
                elapsed: self.timeout,
            })?
            .map_err(|source| Error::Io {
                target: Some(target),
                source,
            })?;
        buf.truncate(len);
        let reply = message::decode_v3(&buf)?;
        if reply.msg_id != msg_id {
            return Err(Error::RequestIdMismatch {
                expected: msg_id,
                actual: reply.msg_id,
            });
        }
        Ok((reply, buf))
    }

    fn verify_mac(
        &self,
        target: SocketAddr,
        protocol: AuthProtocol,
        key: &[u8],
        reply: &V3Message,
        raw: &[u8],
    ) -> Result<()> {
        let offset = reply.auth_params_offset.ok_or(Error::AuthenticationFailed {
            target: Some(target),
        })?;
        // A hostile reply can claim authentication but carry a short MAC
        // field; the offset is only valid for a full-length one.
        if reply.security.auth_params.len() != auth::MAC_LEN
            || offset + auth::MAC_LEN > raw.len()
        {
            return Err(Error::AuthenticationFailed {
                target: Some(target),
            });
        }
        let mut zeroed = raw.to_vec();
        zeroed[offset..offset + auth::MAC_LEN].fill(0);
        if auth::verify(protocol, key, &zeroed, &reply.security.auth_params)? {
            Ok(())
        } else {
            Err(Error::AuthenticationFailed {
                target: Some(target),
            })
        }
    }
}

/// Keep only the first binding of a GETNEXT reply. An agent that answers
/// status 0 with no bindings gives us nothing to report a successor from,
/// so that counts as a malformed reply.
fn first_binding(mut varbinds: Vec<VarBind>) -> Result<Vec<VarBind>> {
    if varbinds.is_empty() {
        return Err(Error::decode(0, DecodeErrorKind::EmptyResponse));
    }
    varbinds.truncate(1);
    Ok(varbinds)
}

/// Map an error-index to the OID it points at. The index is 1-based per
/// RFC 3416; zero or out-of-range means the agent did not identify a
/// binding.
fn failing_oid(varbinds: &[VarBind], index: i32) -> Option<Oid> {
    if index < 1 {
        return None;
    }
    varbinds.get(index as usize - 1).map(|vb| vb.oid.clone())
}

fn interpret_reply(target: SocketAddr, request_id: i32, pdu: Pdu) -> Result<Vec<VarBind>> {
    if pdu.pdu_type == PduType::Report {
        let oid = pdu
            .varbinds
            .first()
            .map(|vb| vb.oid.clone())
            .unwrap_or_default();
        return Err(Error::Report { oid });
    }
    if pdu.request_id != request_id {
        return Err(Error::RequestIdMismatch {
            expected: request_id,
            actual: pdu.request_id,
        });
    }
    if pdu.error_status != 0 {
        return Err(Error::Protocol {
            target: Some(target),
            status: ErrorStatus::from_i32(pdu.error_status),
            index: pdu.error_index.max(0) as u32,
            oid: failing_oid(&pdu.varbinds, pdu.error_index),
        });
    }
    Ok(pdu.varbinds)
}

fn random_id() -> Result<i32> {
    let mut bytes = [0u8; 4];
    getrandom::fill(&mut bytes).map_err(|_| Error::EncryptionFailed {
        detail: "request id entropy unavailable",
    })?;
    Ok(i32::from_be_bytes(bytes) & 0x7FFF_FFFF)
}

fn hex(data: &[u8]) -> String {
    use std::fmt::Write as _;
    let mut out = String::with_capacity(data.len() * 2);
    for byte in data {
        let _ = write!(out, "{byte:02x}");
    }
    out
}
