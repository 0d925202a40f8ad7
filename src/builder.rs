//! Builder for [`Logger`](crate::Logger).
//!
//! Exposes the recognised connection, formatting and filtering options.
//! Validation is deferred to [`LoggerBuilder::build`], which also starts the
//! transport worker.

use std::{io, io::Write, time::Duration};

use thiserror::Error;

use crate::{
    formatter::{DefaultFormatter, TimestampSource},
    level::{LevelRegistry, LevelRegistryError},
    log_entry::LineFormat,
    logger::Logger,
    notifier::Notifier,
    transport::{DEFAULT_HOST, DEFAULT_SHUTDOWN_TIMEOUT, Endpoint, TransportConfig},
};

/// Errors that may occur while building a logger.
#[derive(Debug, Error)]
pub enum BuildError {
    /// Invalid user supplied configuration.
    #[error("invalid logger configuration: {0}")]
    InvalidConfig(String),
    /// The custom level table was rejected.
    #[error(transparent)]
    Levels(#[from] LevelRegistryError),
    /// Underlying I/O error whilst reading configuration or starting threads.
    #[error(transparent)]
    Io(#[from] io::Error),
}

macro_rules! ensure_positive {
    ($value:expr, $field:expr) => {{
        if $value == 0 {
            Err(BuildError::InvalidConfig(format!(
                "{} must be greater than zero",
                $field
            )))
        } else {
            Ok($value)
        }
    }};
}

macro_rules! option_setter {
    ($(#[$meta:meta])* $fn_name:ident, $field:ident, $ty:ty) => {
        $(#[$meta])*
        pub fn $fn_name(mut self, value: $ty) -> Self {
            self.$field = Some(value);
            self
        }
    };
}

/// Builder for constructing [`Logger`] instances.
#[derive(Clone, Debug, Default)]
pub struct LoggerBuilder {
    token: Option<String>,
    host: Option<String>,
    port: Option<u16>,
    secure: bool,
    tls_insecure: bool,
    use_quotes: bool,
    levels: Option<LevelRegistry>,
    level: Option<String>,
    flatten: Option<bool>,
    timestamp: Option<TimestampSource>,
    print_errors: Option<bool>,
    connect_timeout_ms: Option<u64>,
    write_timeout_ms: Option<u64>,
    shutdown_timeout_ms: Option<u64>,
}

impl LoggerBuilder {
    /// Create a builder with no token configured.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the destination token prefixed to every line.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Override the collector host.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    option_setter!(
        #[doc = "Override the collector port."]
        with_port,
        port,
        u16
    );

    /// Use TLS. Changes the default port.
    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// Accept any certificate and hostname on TLS connections.
    pub fn with_tls_insecure(mut self, insecure: bool) -> Self {
        self.tls_insecure = insecure;
        self
    }

    /// Wrap each field in double quotes on the wire.
    pub fn with_use_quotes(mut self, use_quotes: bool) -> Self {
        self.use_quotes = use_quotes;
        self
    }

    option_setter!(
        #[doc = "Replace the default syslog level table."]
        with_levels,
        levels,
        LevelRegistry
    );

    /// Set the initial threshold.
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = Some(level.into());
        self
    }

    option_setter!(
        #[doc = "Flatten structured values (default) or serialise them as JSON."]
        with_flatten,
        flatten,
        bool
    );
    option_setter!(with_timestamp, timestamp, TimestampSource);
    option_setter!(
        #[doc = "Mirror error notifications to stderr (default true)."]
        with_print_errors,
        print_errors,
        bool
    );
    option_setter!(with_connect_timeout_ms, connect_timeout_ms, u64);
    option_setter!(with_write_timeout_ms, write_timeout_ms, u64);
    option_setter!(with_shutdown_timeout_ms, shutdown_timeout_ms, u64);

    fn validate(&self) -> Result<(), BuildError> {
        self.validate_token()?;
        self.validate_endpoint()?;
        self.validate_level()?;
        self.validate_timeouts()
    }

    fn validate_token(&self) -> Result<(), BuildError> {
        match self.token.as_deref() {
            Some(token) if !token.is_empty() => Ok(()),
            _ => Err(BuildError::InvalidConfig("token is required".into())),
        }
    }

    fn validate_endpoint(&self) -> Result<(), BuildError> {
        if matches!(self.host.as_deref(), Some("")) {
            return Err(BuildError::InvalidConfig("host must not be empty".into()));
        }
        if let Some(port) = self.port {
            ensure_positive!(port, "port")?;
        }
        Ok(())
    }

    fn validate_level(&self) -> Result<(), BuildError> {
        let Some(level) = self.level.as_deref() else {
            return Ok(());
        };
        if self.registry().contains(level) {
            Ok(())
        } else {
            Err(BuildError::InvalidConfig(format!(
                "level `{level}` is not in the level table"
            )))
        }
    }

    fn validate_timeouts(&self) -> Result<(), BuildError> {
        if let Some(ms) = self.connect_timeout_ms {
            ensure_positive!(ms, "connect_timeout_ms")?;
        }
        if let Some(ms) = self.write_timeout_ms {
            ensure_positive!(ms, "write_timeout_ms")?;
        }
        if let Some(ms) = self.shutdown_timeout_ms {
            ensure_positive!(ms, "shutdown_timeout_ms")?;
        }
        Ok(())
    }

    fn registry(&self) -> LevelRegistry {
        self.levels.clone().unwrap_or_default()
    }

    pub(crate) fn transport_config(&self) -> TransportConfig {
        let host = self.host.clone().unwrap_or_else(|| DEFAULT_HOST.to_owned());
        let mut endpoint = Endpoint::new(host, self.secure);
        if let Some(port) = self.port {
            endpoint = endpoint.with_port(port);
        }
        if let Some(tls) = endpoint.tls.as_mut() {
            tls.insecure_skip_verify = self.tls_insecure;
        }
        let line = LineFormat::new(self.token.clone().unwrap_or_default(), self.use_quotes);
        let mut config = TransportConfig::new(endpoint, line);
        if let Some(ms) = self.connect_timeout_ms {
            config.connect_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = self.write_timeout_ms {
            config.write_timeout = Duration::from_millis(ms);
        }
        config
    }

    pub(crate) fn print_errors(&self) -> bool {
        self.print_errors.unwrap_or(true)
    }

    pub(crate) fn logger_parts(&self) -> LoggerParts {
        LoggerParts {
            registry: self.registry(),
            level: self.level.clone(),
            formatter: DefaultFormatter::new(self.flatten.unwrap_or(true)),
            timestamp: self.timestamp.clone().unwrap_or_default(),
            shutdown_timeout: self
                .shutdown_timeout_ms
                .map_or(DEFAULT_SHUTDOWN_TIMEOUT, Duration::from_millis),
        }
    }

    /// Validate the options and start the logger.
    pub fn build(&self) -> Result<Logger, BuildError> {
        self.build_with_notifier(Notifier::new(self.print_errors()))
    }

    /// Like [`build`](Self::build) but printing errors to `diagnostic`
    /// instead of stderr.
    pub fn build_with_diagnostic<W>(&self, diagnostic: W) -> Result<Logger, BuildError>
    where
        W: Write + Send + 'static,
    {
        self.build_with_notifier(Notifier::with_diagnostic(self.print_errors(), diagnostic))
    }

    fn build_with_notifier(&self, notifier: Notifier) -> Result<Logger, BuildError> {
        self.validate()?;
        Logger::start(self.logger_parts(), self.transport_config(), notifier)
    }
}

/// Non-transport pieces of a logger.
#[derive(Clone, Debug)]
pub(crate) struct LoggerParts {
    pub registry: LevelRegistry,
    pub level: Option<String>,
    pub formatter: DefaultFormatter,
    pub timestamp: TimestampSource,
    pub shutdown_timeout: Duration,
}
