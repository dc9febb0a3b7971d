//! Coordinator
//!
//! Owns one membership store and runs the long-lived tasks around it:
//! - the announcement ingestor (UDP receive loop),
//! - the expiry sweeper (timer loop),
//! - the console event log,
//! - optionally the HTTP membership view.
//!
//! The tasks never talk to each other directly; they share the store and a single
//! shutdown token. Any task failing fatally cancels the rest.

pub mod service;
