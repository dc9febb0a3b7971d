//! Configuration
//!
//! Command line (and environment) configuration for the registry and the heartbeat node.
//! Values are parsed with `clap` and then checked with `validate()` before anything binds.

pub mod types;
