//! Core logger implementation.
//!
//! [`Logger`] validates level names against its registry, applies the active
//! threshold, formats the value and hands the resulting
//! [`LogEntry`](crate::log_entry::LogEntry) to the transport worker. Only
//! [`Logger::set_level`] ever returns an error to the caller; every other
//! failure is published on the notification channel.

mod convenience_methods;

#[cfg(test)]
mod logger_tests;

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};
use log::warn;
// parking_lot avoids poisoning and matches crate-wide locking strategy
use parking_lot::{Mutex, RwLock};

use crate::{
    builder::{BuildError, LoggerParts},
    error::LogError,
    formatter::{DefaultFormatter, TimestampSource, ValueFormatter},
    level::{Level, LevelRegistry},
    log_entry::LogEntry,
    notifier::{EventSink, Notification, NotificationKind, Notifier},
    transport::{
        TransportConfig,
        worker::{TransportCommand, WorkerHandle, spawn_worker},
    },
    value::Value,
};

pub use convenience_methods::LevelLogger;

/// Client handle shipping log entries to a remote collector.
pub struct Logger {
    registry: LevelRegistry,
    threshold: RwLock<Option<Level>>,
    formatter: DefaultFormatter,
    timestamp: TimestampSource,
    notifier: Arc<Notifier>,
    tx: Option<Sender<TransportCommand>>,
    handle: Mutex<Option<JoinHandle<()>>>,
    done_rx: Receiver<()>,
    shutdown_timeout: Duration,
}

impl Logger {
    pub(crate) fn start(
        parts: LoggerParts,
        config: TransportConfig,
        notifier: Notifier,
    ) -> Result<Self, BuildError> {
        let notifier = Arc::new(notifier);
        let worker = spawn_worker(config, Arc::clone(&notifier) as Arc<dyn EventSink>)?;
        Ok(Self::from_parts(parts, notifier, worker))
    }

    pub(crate) fn from_parts(
        parts: LoggerParts,
        notifier: Arc<Notifier>,
        worker: WorkerHandle,
    ) -> Self {
        let threshold = parts
            .level
            .as_deref()
            .and_then(|name| parts.registry.get(name))
            .cloned();
        Self {
            registry: parts.registry,
            threshold: RwLock::new(threshold),
            formatter: parts.formatter,
            timestamp: parts.timestamp,
            notifier,
            tx: Some(worker.tx),
            handle: Mutex::new(Some(worker.handle)),
            done_rx: worker.done_rx,
            shutdown_timeout: parts.shutdown_timeout,
        }
    }

    /// Log `value` at `level`.
    ///
    /// Unknown levels are reported as [`LogError::UnknownLevel`] on the
    /// notification channel. Levels below the active threshold are ignored.
    pub fn log(&self, level: &str, value: impl Into<Value>) {
        match self.registry.get(level) {
            Some(level) => self.log_at(level, value),
            None => self.report(LogError::UnknownLevel(level.to_owned())),
        }
    }

    pub(crate) fn log_at(&self, level: &Level, value: impl Into<Value>) {
        if !self.passes(level) {
            return;
        }
        let message = match self.formatter.format(&value.into()) {
            Ok(message) => message,
            Err(err) => return self.report(err),
        };
        let entry = LogEntry::new(self.timestamp.stamp(), level.name(), message);
        self.dispatch(TransportCommand::Consume(entry));
    }

    fn passes(&self, level: &Level) -> bool {
        self.threshold
            .read()
            .as_ref()
            .is_none_or(|threshold| level.severity() >= threshold.severity())
    }

    /// Whether an entry at `level` would currently be transmitted.
    pub fn is_enabled(&self, level: &str) -> bool {
        self.registry.get(level).is_some_and(|l| self.passes(l))
    }

    /// Name of the active threshold, or `None` when every level passes.
    pub fn level(&self) -> Option<String> {
        self.threshold.read().as_ref().map(|l| l.name().to_owned())
    }

    /// Set the active threshold.
    ///
    /// Fails synchronously for names missing from the registry, leaving the
    /// threshold unchanged.
    pub fn set_level(&self, name: &str) -> Result<Level, LogError> {
        let level = self
            .registry
            .get(name)
            .cloned()
            .ok_or_else(|| LogError::UnknownLevel(name.to_owned()))?;
        *self.threshold.write() = Some(level.clone());
        Ok(level)
    }

    /// Remove the threshold so every level passes.
    pub fn clear_level(&self) {
        *self.threshold.write() = None;
    }

    /// The level table this logger validates against.
    pub fn levels(&self) -> &LevelRegistry {
        &self.registry
    }

    /// Close the transport once queued entries are sent.
    ///
    /// Has no effect if nothing has been logged yet. Completion is signalled
    /// by an `End` notification.
    pub fn end(&self) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(TransportCommand::End);
        }
    }

    /// Subscribe to notifications of `kind`.
    pub fn on<F>(&self, kind: NotificationKind, listener: F)
    where
        F: Fn(&Notification) + Send + Sync + 'static,
    {
        self.notifier.on(kind, listener);
    }

    /// Subscribe to error notifications.
    pub fn on_error<F>(&self, listener: F)
    where
        F: Fn(&LogError) + Send + Sync + 'static,
    {
        self.notifier.on_error(listener);
    }

    /// Close the transport and wait for the worker to exit.
    pub fn close(&mut self) {
        let settled = self.request_shutdown();
        self.join_worker(settled);
    }

    fn dispatch(&self, cmd: TransportCommand) {
        let delivered = self.tx.as_ref().is_some_and(|tx| tx.send(cmd).is_ok());
        if !delivered {
            self.report(LogError::TransportClosed);
        }
    }

    fn report(&self, err: LogError) {
        self.notifier.notify(Notification::Error(err));
    }

    fn request_shutdown(&mut self) -> bool {
        let Some(tx) = self.tx.take() else {
            return false;
        };
        if tx.send(TransportCommand::Shutdown).is_err() {
            return false;
        }
        self.done_rx.recv_timeout(self.shutdown_timeout).is_ok()
    }

    fn join_worker(&mut self, settled: bool) {
        let Some(handle) = self.handle.lock().take() else {
            return;
        };
        if !settled {
            warn!(
                "tokenlog: transport did not settle within {:?}; detaching worker",
                self.shutdown_timeout
            );
            return;
        }
        if handle.join().is_err() {
            warn!("tokenlog: transport worker panicked");
        }
    }
}

impl Drop for Logger {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logger")
            .field("levels", &self.registry.len())
            .field("threshold", &self.level())
            .field("formatter", &self.formatter)
            .field("timestamp", &self.timestamp)
            .finish()
    }
}
