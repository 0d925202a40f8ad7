//! Network transport for formatted entries.
//!
//! This module defines the [`Transport`] state machine, which queues
//! [`LogEntry`](crate::log_entry::LogEntry) values and writes them to the
//! collector one line at a time. Connections are opened lazily on the first
//! entry, re-opened on demand after a failure, and closed through a
//! deferred `end` protocol that still drains whatever is queued. The
//! bundled TCP/TLS channel lives on a dedicated worker thread which
//! serialises every event the state machine sees.

mod channel;
mod config;
mod state;
mod tcp;
pub(crate) mod worker;


pub use channel::{Channel, Connector};
pub use config::{
    DEFAULT_CONNECT_TIMEOUT, DEFAULT_HOST, DEFAULT_PLAIN_PORT, DEFAULT_SECURE_PORT,
    DEFAULT_SHUTDOWN_TIMEOUT, DEFAULT_WRITE_TIMEOUT, Endpoint, TlsOptions, TransportConfig,
};
pub use state::{ClosingPhase, ConnectionPhase, Transport};
pub use tcp::{ActiveConnection, PeerMonitor, connect_endpoint};
