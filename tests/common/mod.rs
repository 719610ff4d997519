//! In-process mock agent for end-to-end tests.
//!
//! Speaks just enough SNMPv3 to exercise the gateway: answers discovery
//! probes with a usmStats report carrying fixed engine parameters, then
//! serves GET/GETNEXT/SET against a scripted object table. Optionally
//! verifies and signs with a configured auth password, and decrypts and
//! encrypts with a configured privacy password; requests that fail
//! verification are silently dropped, like a real agent.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::ops::Bound;

use bytes::Bytes;
use tokio::net::UdpSocket;

use snmp_gateway::ber::Reader;
use snmp_gateway::message::{self, FLAG_AUTH, FLAG_PRIV, ScopedPdu, ScopedPduData, V3Message};
use snmp_gateway::oid::Oid;
use snmp_gateway::pdu::{Pdu, PduType};
use snmp_gateway::v3::auth::{self, MAC_LEN};
use snmp_gateway::v3::{AuthProtocol, PrivProtocol, UsmSecurityParams, privacy};
use snmp_gateway::value::Value;
use snmp_gateway::varbind::VarBind;

pub const ENGINE_ID: &[u8] = &[0x80, 0x00, 0x1F, 0x88, 0x80, 0xA1, 0xB2, 0xC3];
pub const ENGINE_BOOTS: i32 = 5;
pub const ENGINE_TIME: i32 = 1000;

#[derive(Default)]
pub struct MockAgentConfig {
    /// Scripted MIB: GET looks up exact OIDs, GETNEXT walks successors.
    pub objects: BTreeMap<Oid, Value>,
    /// When set, incoming requests must carry a valid MAC for this
    /// password and responses are signed with it.
    pub auth: Option<(AuthProtocol, String)>,
    /// When set, encrypted requests are decrypted with this password and
    /// responses to them are encrypted. Requires `auth`.
    pub privacy: Option<(PrivProtocol, String)>,
    /// When set, every command is answered with this (status, index).
    pub error: Option<(i32, i32)>,
}

pub struct MockAgent {
    pub addr: SocketAddr,
}

struct Keys {
    auth: Option<(AuthProtocol, Vec<u8>)>,
    privacy: Option<(PrivProtocol, Vec<u8>)>,
}

pub async fn spawn_agent(config: MockAgentConfig) -> MockAgent {
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = socket.local_addr().unwrap();
    tokio::spawn(run(socket, config));
    MockAgent { addr }
}

fn localize_keys(config: &MockAgentConfig) -> Keys {
    let auth = config
        .auth
        .as_ref()
        .map(|(proto, password)| (*proto, auth::password_to_key(*proto, password.as_bytes(), ENGINE_ID)));
    // The privacy key is localized with the auth protocol's hash and
    // truncated to the cipher's key length, matching the client.
    let privacy = config.privacy.as_ref().map(|(proto, password)| {
        let (auth_proto, _) = config.auth.as_ref().expect("privacy requires auth");
        let mut key = auth::password_to_key(*auth_proto, password.as_bytes(), ENGINE_ID);
        key.truncate(proto.key_len());
        (*proto, key)
    });
    Keys { auth, privacy }
}

async fn run(socket: UdpSocket, config: MockAgentConfig) {
    let keys = localize_keys(&config);
    let mut buf = vec![0u8; 65535];
    loop {
        let Ok((len, peer)) = socket.recv_from(&mut buf).await else {
            return;
        };
        let raw = &buf[..len];
        let Ok(msg) = message::decode_v3(raw) else {
            continue;
        };
        let reply = if msg.security.engine_id.is_empty() {
            discovery_reply(&msg)
        } else {
            command_reply(&msg, raw, &config, &keys)
        };
        if let Some(datagram) = reply {
            let _ = socket.send_to(&datagram, peer).await;
        }
    }
}

fn discovery_reply(msg: &V3Message) -> Option<Vec<u8>> {
    let ScopedPduData::Plain(scoped) = &msg.data else {
        return None;
    };
    let report = Pdu {
        pdu_type: PduType::Report,
        request_id: scoped.pdu.request_id,
        error_status: 0,
        error_index: 0,
        varbinds: vec![VarBind::new(
            // usmStatsUnknownEngineIDs
            "1.3.6.1.6.3.15.1.1.4.0".parse().unwrap(),
            Value::Counter32(1),
        )],
    };
    let security = UsmSecurityParams {
        engine_id: Bytes::from_static(ENGINE_ID),
        engine_boots: ENGINE_BOOTS,
        engine_time: ENGINE_TIME,
        user: Bytes::new(),
        auth_params: Bytes::new(),
        priv_params: Bytes::new(),
    };
    let scoped = ScopedPdu::new(Bytes::from_static(ENGINE_ID), report);
    let (datagram, _) = message::encode_v3(msg.msg_id, 0, &security, &ScopedPduData::Plain(scoped));
    Some(datagram)
}

fn request_pdu(msg: &V3Message, keys: &Keys) -> Option<Pdu> {
    match &msg.data {
        ScopedPduData::Plain(scoped) => Some(scoped.pdu.clone()),
        ScopedPduData::Encrypted(ciphertext) => {
            let (proto, key) = keys.privacy.as_ref()?;
            let plaintext = privacy::decrypt(
                *proto,
                key,
                msg.security.engine_boots,
                msg.security.engine_time,
                &msg.security.priv_params,
                ciphertext,
            )
            .ok()?;
            let mut r = Reader::new(&plaintext);
            Some(ScopedPdu::decode(&mut r).ok()?.pdu)
        }
    }
}

fn command_reply(
    msg: &V3Message,
    raw: &[u8],
    config: &MockAgentConfig,
    keys: &Keys,
) -> Option<Vec<u8>> {
    if let Some((proto, key)) = &keys.auth {
        let offset = msg.auth_params_offset?;
        let mut zeroed = raw.to_vec();
        zeroed[offset..offset + MAC_LEN].fill(0);
        if !auth::verify(*proto, key, &zeroed, &msg.security.auth_params).unwrap() {
            return None;
        }
    }
    let request = request_pdu(msg, keys)?;

    let (error_status, error_index, varbinds) = match config.error {
        Some((status, index)) => (status, index, request.varbinds.clone()),
        None => (0, 0, answer(config, &request)),
    };
    let response = Pdu {
        pdu_type: PduType::Response,
        request_id: request.request_id,
        error_status,
        error_index,
        varbinds,
    };
    let scoped = ScopedPdu::new(Bytes::from_static(ENGINE_ID), response);

    let flags = msg.flags & (FLAG_AUTH | FLAG_PRIV);
    let (data, priv_params) = if flags & FLAG_PRIV != 0 {
        let (proto, key) = keys.privacy.as_ref()?;
        let encrypted =
            privacy::encrypt(*proto, key, ENGINE_BOOTS, ENGINE_TIME, 0x42, &scoped.to_bytes())
                .ok()?;
        (
            ScopedPduData::Encrypted(encrypted.ciphertext),
            Bytes::from(encrypted.priv_params),
        )
    } else {
        (ScopedPduData::Plain(scoped), Bytes::new())
    };

    let security = UsmSecurityParams {
        engine_id: Bytes::from_static(ENGINE_ID),
        engine_boots: ENGINE_BOOTS,
        engine_time: ENGINE_TIME,
        user: msg.security.user.clone(),
        auth_params: if flags & FLAG_AUTH != 0 {
            Bytes::from_static(&[0u8; MAC_LEN])
        } else {
            Bytes::new()
        },
        priv_params,
    };
    let (mut datagram, auth_offset) = message::encode_v3(msg.msg_id, flags, &security, &data);
    if let (Some(offset), Some((proto, key))) = (auth_offset, &keys.auth) {
        let mac = auth::sign(*proto, key, &datagram).unwrap();
        datagram[offset..offset + MAC_LEN].copy_from_slice(&mac);
    }
    Some(datagram)
}

fn answer(config: &MockAgentConfig, request: &Pdu) -> Vec<VarBind> {
    request
        .varbinds
        .iter()
        .map(|vb| match request.pdu_type {
            PduType::GetRequest => match config.objects.get(&vb.oid) {
                Some(value) => VarBind::new(vb.oid.clone(), value.clone()),
                None => VarBind::new(vb.oid.clone(), Value::NoSuchObject),
            },
            PduType::GetNextRequest => {
                let next = config
                    .objects
                    .range((Bound::Excluded(vb.oid.clone()), Bound::Unbounded))
                    .next();
                match next {
                    Some((oid, value)) => VarBind::new(oid.clone(), value.clone()),
                    None => VarBind::new(vb.oid.clone(), Value::EndOfMibView),
                }
            }
            // SET: accept and echo.
            _ => vb.clone(),
        })
        .collect()
}
