//! Reporting Surface
//!
//! The structured event stream consumed by operators. The core publishes on an
//! [`bus::EventBus`]; any number of consumers subscribe. The bundled consumer
//! ([`log::run_event_log`]) prints the stream to the console through `tracing`.

pub mod bus;
pub mod log;
pub mod types;
