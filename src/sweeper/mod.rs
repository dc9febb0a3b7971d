//! Expiry Sweeper Module
//!
//! Periodically reconciles the membership store against the staleness policy: members
//! silent for longer than the threshold are evicted, then the remaining membership is
//! reported.

pub mod sweeper;
