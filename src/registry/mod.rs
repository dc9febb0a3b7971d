//! Membership Store Module
//!
//! Holds the coordinator's view of which services are currently alive.
//!
//! ## Core Concepts
//! - **One record per identity**: Creation and refresh are the same upsert operation.
//! - **Liveness by presence**: A record existing in the store is the only signal that a
//!   service is considered live. Absence means unknown or dead.
//! - **Shard-level atomicity**: Records live in a `DashMap`; each record is written while its
//!   shard lock is held, so concurrent readers never see a half-updated record.

pub mod store;
pub mod types;
