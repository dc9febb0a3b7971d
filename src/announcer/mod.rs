//! Heartbeat Announcer
//!
//! The node side of the protocol: a service periodically tells the registry it is alive.
//! Heartbeats are fire-and-forget; a lost datagram looks the same to the registry as a
//! late one, which is why the delay between sends stays well under the registry's
//! staleness threshold.

pub mod sender;
