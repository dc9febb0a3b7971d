use clap::Parser;
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

use crate::events::bus::DEFAULT_EVENT_CAPACITY;
use crate::sweeper::sweeper::SweepPolicy;

pub const DEFAULT_REGISTRY_PORT: u16 = 9000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error(
        "stale threshold ({stale_after_ms}ms) must exceed the sweep interval ({sweep_interval_ms}ms)"
    )]
    ThresholdNotAboveInterval {
        stale_after_ms: u64,
        sweep_interval_ms: u64,
    },

    #[error("service name must not be empty")]
    EmptyService,

    #[error("heartbeat delay range {min_ms}..={max_ms}ms is empty")]
    InvalidDelayRange { min_ms: u64, max_ms: u64 },
}

/// Registry (coordinator) settings.
#[derive(Parser, Debug, Clone)]
#[command(name = "registry")]
#[command(about = "Service registry fed by UDP heartbeats")]
pub struct RegistryConfig {
    /// UDP address heartbeats are received on
    #[arg(long, env = "REGISTRY_LISTEN", default_value = "0.0.0.0:9000")]
    pub listen: SocketAddr,

    /// Silence (ms) after which a service is evicted
    #[arg(long, env = "REGISTRY_STALE_AFTER_MS", default_value_t = 120_000)]
    pub stale_after_ms: u64,

    /// Interval (ms) between expiry sweeps
    #[arg(long, env = "REGISTRY_SWEEP_INTERVAL_MS", default_value_t = 30_000)]
    pub sweep_interval_ms: u64,

    /// Optional TCP address for the read-only HTTP membership view
    #[arg(long, env = "REGISTRY_HTTP_ADDR")]
    pub http_addr: Option<SocketAddr>,

    /// Buffered events per subscriber before slow consumers start missing events
    #[arg(long, env = "REGISTRY_EVENT_CAPACITY", default_value_t = DEFAULT_EVENT_CAPACITY)]
    pub event_capacity: usize,
}

impl RegistryConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sweep_interval_ms == 0 {
            return Err(ConfigError::Zero("sweep interval"));
        }
        if self.stale_after_ms == 0 {
            return Err(ConfigError::Zero("stale threshold"));
        }
        if self.event_capacity == 0 {
            return Err(ConfigError::Zero("event capacity"));
        }
        if self.stale_after_ms <= self.sweep_interval_ms {
            return Err(ConfigError::ThresholdNotAboveInterval {
                stale_after_ms: self.stale_after_ms,
                sweep_interval_ms: self.sweep_interval_ms,
            });
        }
        Ok(())
    }

    pub fn sweep_policy(&self) -> SweepPolicy {
        SweepPolicy {
            check_interval: Duration::from_millis(self.sweep_interval_ms),
            stale_after: Duration::from_millis(self.stale_after_ms),
        }
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        let policy = SweepPolicy::default();
        Self {
            listen: SocketAddr::from(([0, 0, 0, 0], DEFAULT_REGISTRY_PORT)),
            stale_after_ms: policy.stale_after.as_millis() as u64,
            sweep_interval_ms: policy.check_interval.as_millis() as u64,
            http_addr: None,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

/// Heartbeat node settings.
#[derive(Parser, Debug, Clone)]
#[command(name = "heartbeat-node")]
#[command(about = "Announces a service to a registry with periodic UDP heartbeats")]
pub struct AnnouncerConfig {
    /// Registry host name or IP
    pub registry_host: String,

    /// Registry UDP port
    pub registry_port: u16,

    /// Name this service announces itself as
    pub service: String,

    /// Port the service itself is reachable on
    pub port: u16,

    /// Shortest delay (ms) between heartbeats
    #[arg(long, env = "HEARTBEAT_MIN_DELAY_MS", default_value_t = 15_000)]
    pub min_delay_ms: u64,

    /// Longest delay (ms) between heartbeats
    #[arg(long, env = "HEARTBEAT_MAX_DELAY_MS", default_value_t = 30_000)]
    pub max_delay_ms: u64,
}

impl AnnouncerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service.is_empty() {
            return Err(ConfigError::EmptyService);
        }
        if self.registry_port == 0 {
            return Err(ConfigError::Zero("registry port"));
        }
        if self.port == 0 {
            return Err(ConfigError::Zero("service port"));
        }
        if self.min_delay_ms == 0 || self.min_delay_ms > self.max_delay_ms {
            return Err(ConfigError::InvalidDelayRange {
                min_ms: self.min_delay_ms,
                max_ms: self.max_delay_ms,
            });
        }
        Ok(())
    }
}
