//! Heartbeat wire format.
//!
//! One UTF-8 JSON object per datagram:
//! `{ "type": "HEARTBEAT", "service": "<non-empty>", "port": <1-65535> }`

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::registry::types::ServiceId;

pub const HEARTBEAT_TYPE: &str = "HEARTBEAT";

/// Largest accepted datagram. Anything longer is rejected as oversized.
pub const MAX_DATAGRAM_SIZE: usize = 1024;

/// A decoded inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Announcement {
    Heartbeat { service: ServiceId, port: u16 },
    /// Any other `type`. Kept so newer nodes can talk to older registries.
    Unknown { kind: String },
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("datagram of {len} bytes exceeds the {limit}-byte limit")]
    Oversized { len: usize, limit: usize },

    #[error("payload is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    #[error("payload is not a valid message object: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("missing field `{0}`")]
    MissingField(&'static str),

    #[error("invalid field `{field}`: {reason}")]
    InvalidField { field: &'static str, reason: String },
}

#[derive(Debug, Serialize)]
struct HeartbeatWire<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    service: &'a str,
    port: u16,
}

/// Decodes a single datagram payload.
pub fn decode(payload: &[u8]) -> Result<Announcement, DecodeError> {
    if payload.len() > MAX_DATAGRAM_SIZE {
        return Err(DecodeError::Oversized {
            len: payload.len(),
            limit: MAX_DATAGRAM_SIZE,
        });
    }

    let text = std::str::from_utf8(payload)?;

    // Parsing into a map rejects JSON arrays and scalars up front.
    let object: Map<String, Value> = serde_json::from_str(text)?;

    let kind = match object.get("type") {
        Some(Value::String(kind)) => kind,
        Some(other) => return Err(invalid("type", format!("expected a string, got {}", other))),
        None => return Err(DecodeError::MissingField("type")),
    };

    // Other message kinds may shape their fields differently; only the
    // discriminator is read before handing them back as unknown.
    if kind.as_str() != HEARTBEAT_TYPE {
        return Ok(Announcement::Unknown { kind: kind.clone() });
    }

    let service = match object.get("service") {
        Some(Value::String(service)) if !service.is_empty() => service.clone(),
        Some(Value::String(_)) => return Err(invalid("service", "must not be empty".to_string())),
        Some(other) => {
            return Err(invalid("service", format!("expected a string, got {}", other)));
        }
        None => return Err(DecodeError::MissingField("service")),
    };

    let port = match object.get("port") {
        Some(value) => value
            .as_u64()
            .and_then(|port| u16::try_from(port).ok())
            .filter(|port| *port != 0)
            .ok_or_else(|| invalid("port", format!("{} is not an integer in 1-65535", value)))?,
        None => return Err(DecodeError::MissingField("port")),
    };

    Ok(Announcement::Heartbeat {
        service: ServiceId(service),
        port,
    })
}

fn invalid(field: &'static str, reason: String) -> DecodeError {
    DecodeError::InvalidField { field, reason }
}

/// Encodes the heartbeat a node sends for `service` reachable on `port`.
pub fn encode_heartbeat(service: &str, port: u16) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(&HeartbeatWire {
        kind: HEARTBEAT_TYPE,
        service,
        port,
    })
}
