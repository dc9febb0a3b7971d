use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::types::{EvictedRecord, MembershipRecord, ServiceId, UpsertOutcome};

/// Concurrent membership table shared by the ingestor and the sweeper.
///
/// All mutation goes through [`MembershipStore::upsert`] and
/// [`MembershipStore::remove_if_stale`]. Both take the owning shard's write lock for the
/// whole read-modify-write of a record, which gives two guarantees:
/// - readers observe a record either fully old or fully new;
/// - an upsert racing with eviction either lands before the staleness check (the record is
///   fresh and survives) or after the removal (the record is registered again).
pub struct MembershipStore {
    members: DashMap<ServiceId, MembershipRecord>,
}

impl MembershipStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Creates or refreshes the record for `identity`, stamped with the current instant.
    pub fn upsert(&self, identity: ServiceId, address: IpAddr, listen_port: u16) -> UpsertOutcome {
        self.upsert_at(identity, address, listen_port, Instant::now())
    }

    /// Same as [`MembershipStore::upsert`] with an explicit observation instant.
    pub fn upsert_at(
        &self,
        identity: ServiceId,
        address: IpAddr,
        listen_port: u16,
        now: Instant,
    ) -> UpsertOutcome {
        match self.members.entry(identity) {
            Entry::Occupied(mut entry) => {
                let record = entry.get_mut();
                record.address = address;
                record.listen_port = listen_port;
                record.last_seen = record.last_seen.max(now);
                UpsertOutcome::Refreshed
            }
            Entry::Vacant(entry) => {
                let identity = entry.key().clone();
                entry.insert(MembershipRecord {
                    identity,
                    address,
                    listen_port,
                    last_seen: now,
                });
                UpsertOutcome::Registered
            }
        }
    }

    /// Removes every record that has been silent for longer than `threshold` as of `now`.
    ///
    /// Records refreshed after `now` was taken have `last_seen >= now` and are kept.
    /// The returned records are ordered by identity.
    pub fn remove_if_stale(&self, threshold: Duration, now: Instant) -> Vec<EvictedRecord> {
        let mut evicted = Vec::new();

        self.members.retain(|_, record| {
            let silent_for = record.silent_for(now);
            if silent_for > threshold {
                evicted.push(EvictedRecord {
                    record: record.clone(),
                    silent_for,
                });
                false
            } else {
                true
            }
        });

        evicted.sort_by(|a, b| a.record.identity.cmp(&b.record.identity));
        evicted
    }

    /// Copies every record out of the table, ordered by identity.
    pub fn snapshot(&self) -> Vec<MembershipRecord> {
        let mut records: Vec<MembershipRecord> = self
            .members
            .iter()
            .map(|entry| entry.value().clone())
            .collect();

        records.sort_by(|a, b| a.identity.cmp(&b.identity));
        records
    }

    pub fn get(&self, identity: &ServiceId) -> Option<MembershipRecord> {
        self.members.get(identity).map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

impl Default for MembershipStore {
    fn default() -> Self {
        Self {
            members: DashMap::new(),
        }
    }
}
