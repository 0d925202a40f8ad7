//! Configuration consumed by the transport lifecycle.
//!
//! `LoggerBuilder` constructs these values before handing them to the worker
//! thread.

use std::time::Duration;

use crate::log_entry::LineFormat;

/// Default collector host.
pub const DEFAULT_HOST: &str = "api.logentries.com";
/// Default port for plaintext connections.
pub const DEFAULT_PLAIN_PORT: u16 = 10000;
/// Default port for TLS connections.
pub const DEFAULT_SECURE_PORT: u16 = 20000;
/// Default connection timeout applied when establishing sockets.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// Default write timeout applied to socket writes.
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(1);
/// Default time the logger waits for the transport to settle on drop.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(2);

/// TLS connection options.
#[derive(Clone, Debug)]
pub struct TlsOptions {
    /// Domain name presented during the TLS handshake.
    pub domain: String,
    /// Skip certificate validation when true (intended for tests).
    pub insecure_skip_verify: bool,
}

/// TCP endpoint with optional TLS.
#[derive(Clone, Debug)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
    pub tls: Option<TlsOptions>,
}

impl Endpoint {
    /// Endpoint with the default port for the chosen security mode.
    pub fn new(host: impl Into<String>, secure: bool) -> Self {
        let host = host.into();
        let (port, tls) = if secure {
            (
                DEFAULT_SECURE_PORT,
                Some(TlsOptions {
                    domain: host.clone(),
                    insecure_skip_verify: false,
                }),
            )
        } else {
            (DEFAULT_PLAIN_PORT, None)
        };
        Self { host, port, tls }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Endpoint {
    fn default() -> Self {
        Self::new(DEFAULT_HOST, false)
    }
}

/// Everything the transport worker needs.
#[derive(Clone, Debug)]
pub struct TransportConfig {
    pub endpoint: Endpoint,
    pub line: LineFormat,
    pub connect_timeout: Duration,
    pub write_timeout: Duration,
}

impl TransportConfig {
    pub fn new(endpoint: Endpoint, line: LineFormat) -> Self {
        Self {
            endpoint,
            line,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
        }
    }
}
