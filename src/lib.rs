//! Token-authenticated line logging over persistent TCP/TLS connections.
//!
//! A [`Logger`] validates each call against its [`LevelRegistry`], renders
//! the value as a single line, and hands the entry to a background transport
//! that connects lazily, drains in FIFO order, and requeues on failure.
//! Runtime failures are never returned to the caller; subscribe with
//! [`Logger::on_error`] or leave `printerror` enabled to see them.
//!
//! ```no_run
//! use tokenlog::{LoggerBuilder, Value};
//!
//! let logger = LoggerBuilder::new()
//!     .with_token("2bfbea1e-10c3-4419-bdad-7e6435882e1f")
//!     .with_secure(true)
//!     .build()?;
//! logger.info(Value::map([("user", "ada"), ("action", "login")]));
//! logger.end();
//! # Ok::<(), tokenlog::BuildError>(())
//! ```

mod builder;
pub mod error;
mod file_config;
pub mod formatter;
pub mod level;
mod log_entry;
mod logger;
pub mod notifier;
pub mod rate_limited_warner;
pub mod transport;
pub mod value;

pub use builder::{BuildError, LoggerBuilder};
pub use error::{ChannelError, LogError};
pub use formatter::{DefaultFormatter, TimestampSource, TimestampValue, ValueFormatter};
pub use level::{Level, LevelRegistry, LevelRegistryBuilder, LevelRegistryError};
pub use log_entry::{LineFormat, LogEntry};
pub use logger::{LevelLogger, Logger};
pub use notifier::{EventSink, Notification, NotificationKind, Notifier};
pub use value::Value;
