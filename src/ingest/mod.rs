//! Announcement Ingestor Module
//!
//! Receives heartbeat datagrams and applies them to the membership store.
//!
//! ## Workflow
//! 1. **Receive**: One datagram per iteration into a fixed-size, reused buffer.
//! 2. **Attribute**: The sender's IP is taken from the UDP envelope, never from the payload.
//! 3. **Decode**: The payload is parsed as the JSON wire message (see `protocol`).
//!    Malformed datagrams are logged and dropped; the loop always continues.
//! 4. **Apply**: `HEARTBEAT` messages upsert the store and publish `registered` / `refreshed`.
//!    Unknown message types are ignored.

pub mod listener;
pub mod protocol;

#[cfg(test)]
mod tests;
