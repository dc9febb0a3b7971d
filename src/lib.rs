//! Heartbeat Registry Library
//!
//! A minimal service-discovery coordinator. Worker nodes announce liveness over UDP,
//! the coordinator keeps a membership table and evicts entries that stop announcing.
//!
//! ## Architecture Modules
//! The coordinator is a producer/consumer/reaper trio around one shared table:
//!
//! - **`registry`**: The membership store. A concurrent table keyed by service identity
//!   holding each service's last observed address, port and liveness timestamp.
//! - **`ingest`**: The announcement ingestor. Receives heartbeat datagrams, decodes the
//!   JSON wire format and upserts the store.
//! - **`sweeper`**: The expiry sweeper. Periodically evicts stale members and reports the
//!   current membership.
//! - **`events`**: The reporting surface (registered / refreshed / evicted / snapshot).
//! - **`http`**: Read-only HTTP view of the membership table.
//! - **`announcer`**: The node side: periodically sends heartbeats to a coordinator.
//! - **`config`**: Command line / environment configuration for both binaries.
//! - **`coordinator`**: Wires everything together under one shutdown signal.

pub mod announcer;
pub mod config;
pub mod coordinator;
pub mod events;
pub mod http;
pub mod ingest;
pub mod registry;
pub mod sweeper;
