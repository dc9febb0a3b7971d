use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::events::bus::EventBus;
use crate::events::types::{MemberSummary, RegistryEvent, duration_ms};
use crate::registry::store::MembershipStore;
use crate::registry::types::{EvictedRecord, MembershipRecord};

pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_secs(30);
pub const DEFAULT_STALE_AFTER: Duration = Duration::from_secs(120);

/// How often the sweeper runs and how much silence it tolerates.
///
/// `stale_after` must exceed `check_interval` so every member is checked at least once
/// before it can be evicted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepPolicy {
    pub check_interval: Duration,
    pub stale_after: Duration,
}

impl Default for SweepPolicy {
    fn default() -> Self {
        Self {
            check_interval: DEFAULT_CHECK_INTERVAL,
            stale_after: DEFAULT_STALE_AFTER,
        }
    }
}

/// Outcome of a single sweep.
#[derive(Debug, Clone)]
pub struct SweepReport {
    pub evicted: Vec<EvictedRecord>,
    pub members: Vec<MembershipRecord>,
}

pub struct ExpirySweeper {
    store: Arc<MembershipStore>,
    events: EventBus,
    policy: SweepPolicy,
}

impl ExpirySweeper {
    pub fn new(store: Arc<MembershipStore>, events: EventBus, policy: SweepPolicy) -> Arc<Self> {
        Arc::new(Self {
            store,
            events,
            policy,
        })
    }

    /// Sweeps every `check_interval` until `shutdown` fires.
    ///
    /// The first sweep happens one full interval after start.
    pub async fn run(self: Arc<Self>, shutdown: CancellationToken) {
        tracing::info!(
            "Expiry sweeper started (interval {:?}, stale after {:?})",
            self.policy.check_interval,
            self.policy.stale_after
        );

        let mut interval = tokio::time::interval(self.policy.check_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        interval.tick().await;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!("Expiry sweeper shutting down");
                    break;
                }
                _ = interval.tick() => {
                    // Read through tokio's clock so paused-time tests stay consistent.
                    let now = tokio::time::Instant::now().into_std();
                    let report = self.sweep_at(now);
                    tracing::debug!(
                        "Sweep finished: {} evicted, {} live",
                        report.evicted.len(),
                        report.members.len()
                    );
                }
            }
        }
    }

    /// Runs one sweep as of `now`: evict, report evictions, report membership.
    ///
    /// The membership report is skipped when nothing is live.
    pub fn sweep_at(&self, now: Instant) -> SweepReport {
        let evicted = self.store.remove_if_stale(self.policy.stale_after, now);

        for removed in &evicted {
            self.events.publish(RegistryEvent::Evicted {
                identity: removed.record.identity.clone(),
                silent_ms: duration_ms(removed.silent_for),
            });
        }

        let members = self.store.snapshot();
        if !members.is_empty() {
            self.events.publish(RegistryEvent::MembershipSnapshot {
                members: members
                    .iter()
                    .map(|record| MemberSummary::from_record(record, now))
                    .collect(),
            });
        }

        SweepReport { evicted, members }
    }
}
