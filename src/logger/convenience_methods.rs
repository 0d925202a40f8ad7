//! Per-level convenience methods.
//!
//! Each method forwards to [`Logger::log`] with a fixed syslog level name.
//! With a custom level table these names may be missing, in which case the
//! call is reported as an unknown level like any other.

use crate::{error::LogError, level::Level, value::Value};

use super::Logger;

macro_rules! level_methods {
    ($($(#[$meta:meta])* $name:ident),+ $(,)?) => {
        impl Logger {
            $(
                $(#[$meta])*
                pub fn $name(&self, value: impl Into<Value>) {
                    self.log(stringify!($name), value);
                }
            )+
        }
    };
}

level_methods!(
    /// Log at `debug`.
    debug,
    /// Log at `info`.
    info,
    /// Log at `notice`.
    notice,
    /// Log at `warning`.
    warning,
    /// Log at `err`.
    err,
    /// Log at `crit`.
    crit,
    /// Log at `alert`.
    alert,
    /// Log at `emerg`.
    emerg,
);

impl Logger {
    /// Bind a level name, resolving it once.
    ///
    /// Useful with custom level tables, where the per-level methods above do
    /// not exist.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use tokenlog::LoggerBuilder;
    /// let levels = tokenlog::LevelRegistry::builder()
    ///     .with_levels([("trace", 0), ("audit", 5)])
    ///     .build()?;
    /// let logger = LoggerBuilder::new()
    ///     .with_token("TOKEN")
    ///     .with_levels(levels)
    ///     .build()?;
    /// let audit = logger.leveled("audit")?;
    /// audit.log("user 42 signed in");
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn leveled(&self, name: &str) -> Result<LevelLogger<'_>, LogError> {
        let level = self
            .registry
            .get(name)
            .cloned()
            .ok_or_else(|| LogError::UnknownLevel(name.to_owned()))?;
        Ok(LevelLogger {
            logger: self,
            level,
        })
    }
}

/// A logger bound to a single level.
#[derive(Debug)]
pub struct LevelLogger<'a> {
    logger: &'a Logger,
    level: Level,
}

impl LevelLogger<'_> {
    pub fn level(&self) -> &Level {
        &self.level
    }

    pub fn log(&self, value: impl Into<Value>) {
        self.logger.log_at(&self.level, value);
    }

    pub fn is_enabled(&self) -> bool {
        self.logger.passes(&self.level)
    }
}
