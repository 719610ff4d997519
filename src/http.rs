//! HTTP surface: command endpoints and the trap event stream.

use std::convert::Infallible;
use std::net::IpAddr;
use std::sync::Arc;

use axum::Router;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Json;
use futures::{Stream, StreamExt};
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};

use crate::client::Client;
use crate::error::{Error, Result, ValidationErrorKind};
use crate::oid::Oid;
use crate::trap::TrapStream;
use crate::v3::{Credentials, SecurityLevel};
use crate::value::Value;
use crate::varbind::VarBind;

/// Shared state behind every handler.
#[derive(Clone)]
pub struct AppState {
    pub client: Arc<Client>,
    pub traps: TrapStream,
    /// UDP port commands are sent to on the target host.
    pub command_port: u16,
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    Router::new()
        .route("/snmp/get", get(snmp_get))
        .route("/snmp/getnext", get(snmp_getnext))
        .route("/snmp/set", post(snmp_set))
        .route("/traps/stream", get(trap_stream))
        .layer(cors)
        .with_state(state)
}

/// Credential and target fields shared by all command endpoints.
#[derive(Debug, Deserialize)]
pub struct CommandParams {
    pub ip: String,
    pub user: String,
    pub oid: String,
    pub security_level: SecurityLevel,
    pub auth_key: Option<String>,
    pub auth_protocol: Option<String>,
    pub priv_key: Option<String>,
    pub priv_protocol: Option<String>,
}

/// SET request body: command params plus the value to write.
#[derive(Debug, Deserialize)]
pub struct SetParams {
    #[serde(flatten)]
    pub command: CommandParams,
    pub value: String,
    #[serde(rename = "type")]
    pub value_type: String,
}

struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = if self.0.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            tracing::warn!(error = %self.0, "command failed");
            StatusCode::INTERNAL_SERVER_ERROR
        };
        (status, Json(json!({ "detail": self.0.to_string() }))).into_response()
    }
}

fn parse_command(
    params: &CommandParams,
    command_port: u16,
) -> Result<(std::net::SocketAddr, Credentials, Oid)> {
    let ip: IpAddr = params
        .ip
        .parse()
        .map_err(|_| Error::validation(ValidationErrorKind::InvalidTarget(params.ip.clone())))?;
    let creds = Credentials::build(
        &params.user,
        params.security_level,
        params.auth_key.as_deref(),
        params.auth_protocol.as_deref(),
        params.priv_key.as_deref(),
        params.priv_protocol.as_deref(),
    )?;
    let oid: Oid = params
        .oid
        .parse()
        .map_err(|_| Error::validation(ValidationErrorKind::InvalidOid(params.oid.clone())))?;
    Ok(((ip, command_port).into(), creds, oid))
}

fn render(varbinds: &[VarBind]) -> Vec<String> {
    varbinds.iter().map(|vb| vb.to_string()).collect()
}

async fn snmp_get(
    State(state): State<AppState>,
    Query(params): Query<CommandParams>,
) -> std::result::Result<Json<serde_json::Value>, ApiError> {
    let (target, creds, oid) = parse_command(&params, state.command_port)?;
    let varbinds = state.client.get(target, &creds, &[oid]).await?;
    Ok(Json(json!({ "snmp_result": render(&varbinds) })))
}

async fn snmp_getnext(
    State(state): State<AppState>,
    Query(params): Query<CommandParams>,
) -> std::result::Result<Json<serde_json::Value>, ApiError> {
    let (target, creds, oid) = parse_command(&params, state.command_port)?;
    let varbinds = state.client.get_next(target, &creds, &oid).await?;
    Ok(Json(json!({ "snmp_next_result": render(&varbinds) })))
}

async fn snmp_set(
    State(state): State<AppState>,
    Json(params): Json<SetParams>,
) -> std::result::Result<Json<serde_json::Value>, ApiError> {
    let (target, creds, oid) = parse_command(&params.command, state.command_port)?;
    let value = Value::from_tagged(&params.value_type, &params.value)?;
    let varbinds = state.client.set(target, &creds, &oid, value).await?;
    Ok(Json(json!({ "snmp_set_result": render(&varbinds) })))
}

/// Infinite SSE stream of received traps. The underlying queue starts
/// filling at listener startup, so events arriving before the first
/// subscriber are delivered, not lost.
async fn trap_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    let stream = state.traps.clone().into_stream().map(|event| {
        let payload = serde_json::to_string(&event).unwrap_or_else(|err| {
            tracing::error!(error = %err, "trap event serialization failed");
            String::from("{}")
        });
        Ok(Event::default().data(payload))
    });
    Sse::new(stream).keep_alive(KeepAlive::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(level: SecurityLevel) -> CommandParams {
        CommandParams {
            ip: "192.0.2.10".to_string(),
            user: "operator".to_string(),
            oid: "1.3.6.1.2.1.1.5.0".to_string(),
            security_level: level,
            auth_key: None,
            auth_protocol: None,
            priv_key: None,
            priv_protocol: None,
        }
    }

    #[test]
    fn test_parse_command_happy_path() {
        let (target, creds, oid) = parse_command(&params(SecurityLevel::NoAuthNoPriv), 161).unwrap();
        assert_eq!(target.to_string(), "192.0.2.10:161");
        assert_eq!(creds.user, "operator");
        assert_eq!(oid.to_string(), "1.3.6.1.2.1.1.5.0");
    }

    #[test]
    fn test_bad_ip_is_client_error() {
        let mut p = params(SecurityLevel::NoAuthNoPriv);
        p.ip = "not-an-ip".to_string();
        let err = parse_command(&p, 161).unwrap_err();
        assert!(err.is_client_error());
    }

    #[test]
    fn test_bad_oid_is_client_error() {
        let mut p = params(SecurityLevel::NoAuthNoPriv);
        p.oid = "1.3.x".to_string();
        let err = parse_command(&p, 161).unwrap_err();
        assert!(err.is_client_error());
    }

    #[test]
    fn test_missing_auth_key_is_client_error() {
        let err = parse_command(&params(SecurityLevel::AuthNoPriv), 161).unwrap_err();
        assert!(matches!(
            err,
            Error::Validation {
                kind: ValidationErrorKind::MissingAuthKey
            }
        ));
    }

    #[test]
    fn test_set_params_deserialize_flattened() {
        let body: SetParams = serde_json::from_value(json!({
            "ip": "192.0.2.10",
            "user": "operator",
            "oid": "1.3.6.1.2.1.1.5.0",
            "security_level": "noAuthNoPriv",
            "value": "myhost",
            "type": "OctetString"
        }))
        .unwrap();
        assert_eq!(body.value, "myhost");
        assert_eq!(body.value_type, "OctetString");
        assert_eq!(body.command.security_level, SecurityLevel::NoAuthNoPriv);
    }
}
