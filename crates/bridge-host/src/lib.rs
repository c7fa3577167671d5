//! Host-facing command surface for the printer bridge
//!
//! Requests arrive as `{ callbackId, action, args }` objects and results go
//! back as `{ callbackId, status, message, keepCallback }`. Commands that
//! resolve later (discovery, printing) answer with `keepCallback: true`
//! first and a final result once they finish.

pub mod host;
pub mod protocol;

pub use host::{CommandHost, ConnectDefaults, forward_events};
pub use protocol::{HostError, HostOutput, HostRequest, HostResponse, ResponseStatus};
