use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use std::time::{Duration, Instant};

/// The identity a service claims for itself in its heartbeats.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct ServiceId(pub String);

impl ServiceId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ServiceId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Last known liveness of a single service.
///
/// `address` always comes from the datagram envelope, never from the payload.
/// `last_seen` is monotonic and never moves backwards for a given record.
#[derive(Debug, Clone, PartialEq)]
pub struct MembershipRecord {
    pub identity: ServiceId,
    pub address: IpAddr,
    pub listen_port: u16,
    pub last_seen: Instant,
}

impl MembershipRecord {
    /// How long the service has been silent as of `now`.
    pub fn silent_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_seen)
    }
}

/// Whether an upsert created a new record or refreshed an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Registered,
    Refreshed,
}

/// A record removed by the sweeper, together with how long it had been silent.
#[derive(Debug, Clone)]
pub struct EvictedRecord {
    pub record: MembershipRecord,
    pub silent_for: Duration,
}
