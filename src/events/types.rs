use serde::Serialize;
use std::net::IpAddr;
use std::time::{Duration, Instant};

use crate::registry::types::{MembershipRecord, ServiceId};

/// A member as presented to operators: the record plus its current silence.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MemberSummary {
    pub identity: ServiceId,
    pub address: IpAddr,
    pub port: u16,
    pub silent_ms: u64,
}

impl MemberSummary {
    pub fn from_record(record: &MembershipRecord, now: Instant) -> Self {
        Self {
            identity: record.identity.clone(),
            address: record.address,
            port: record.listen_port,
            silent_ms: duration_ms(record.silent_for(now)),
        }
    }
}

/// Events emitted by the ingestor and the sweeper.
///
/// Serialized with an `event` tag, e.g.
/// `{"event":"evicted","identity":"svc-A","silent_ms":181000}`.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RegistryEvent {
    /// First accepted heartbeat for an unseen identity.
    Registered {
        identity: ServiceId,
        address: IpAddr,
        port: u16,
    },
    /// Heartbeat for an identity that was already live.
    Refreshed {
        identity: ServiceId,
        address: IpAddr,
        port: u16,
    },
    /// Removed by the sweeper after staying silent past the threshold.
    Evicted { identity: ServiceId, silent_ms: u64 },
    /// Periodic report of everything currently live.
    MembershipSnapshot { members: Vec<MemberSummary> },
}

pub fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
