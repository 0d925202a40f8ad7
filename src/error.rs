//! Error types reported by the logger and its transport.
//!
//! Apart from [`Logger::set_level`](crate::Logger::set_level), none of these
//! errors are returned to the caller. They are delivered through the
//! notification channel so a failing endpoint can never abort the host
//! application's control flow.

use std::io;

use thiserror::Error;

/// Errors surfaced while accepting, formatting, or shipping log entries.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum LogError {
    /// The level name is not present in the logger's registry.
    #[error("Unknown log level: {0}")]
    UnknownLevel(String),
    /// An entry was submitted after `end()` started closing the transport.
    #[error("transport is closed; entry rejected")]
    TransportClosed,
    /// The value could not be serialised.
    #[error("failed to format log value: {0}")]
    Format(String),
    /// Network-layer failure.
    #[error(transparent)]
    Channel(#[from] ChannelError),
}

/// Failures raised by the network channel.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ChannelError {
    /// The TCP connection could not be established.
    #[error("failed to connect to {addr}: {message}")]
    Connect {
        addr: String,
        kind: io::ErrorKind,
        message: String,
    },
    /// The TLS handshake finished without a trustworthy peer.
    #[error("secure channel to {host} is not authorized: {message}")]
    Unauthorized { host: String, message: String },
    /// Writing an entry failed.
    #[error("write failed: {message}")]
    Write { kind: io::ErrorKind, message: String },
    /// The peer closed or reset the connection.
    #[error("connection closed by peer: {message}")]
    Peer { kind: io::ErrorKind, message: String },
    /// Shutting the channel down failed.
    #[error("failed to close channel: {message}")]
    Close { kind: io::ErrorKind, message: String },
    /// Entries that could not be sent before the transport closed.
    #[error("{count} pending entries discarded: transport closed before they were sent")]
    Discarded { count: usize },
}

impl ChannelError {
    pub(crate) fn connect(addr: impl Into<String>, err: &io::Error) -> Self {
        Self::Connect {
            addr: addr.into(),
            kind: err.kind(),
            message: err.to_string(),
        }
    }

    pub(crate) fn unauthorized(host: impl Into<String>, message: impl ToString) -> Self {
        Self::Unauthorized {
            host: host.into(),
            message: message.to_string(),
        }
    }

    pub(crate) fn write(err: &io::Error) -> Self {
        Self::Write {
            kind: err.kind(),
            message: err.to_string(),
        }
    }

    pub(crate) fn peer(err: &io::Error) -> Self {
        Self::Peer {
            kind: err.kind(),
            message: err.to_string(),
        }
    }

    pub(crate) fn close(err: &io::Error) -> Self {
        Self::Close {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}
