//! Notification channel shared by the logger and its transport.
//!
//! Failures and lifecycle events are published to an [`EventSink`] instead
//! of being returned through the call that caused them. [`Notifier`] is the
//! standard sink: it fans events out to subscribed listeners and, when
//! configured, mirrors every error onto a diagnostic stream.

use std::{
    io::{self, Write},
    panic::{self, AssertUnwindSafe},
    sync::Arc,
};

use log::warn;
use parking_lot::{Mutex, RwLock};

use crate::{error::LogError, log_entry::LogEntry, rate_limited_warner::RateLimitedWarner};

/// Event published on the notification channel.
#[derive(Clone, Debug, PartialEq)]
pub enum Notification {
    /// The transport established a connection.
    Connect,
    /// An entry was accepted for transmission.
    Log(LogEntry),
    /// The transport finished closing.
    End,
    /// A runtime failure.
    Error(LogError),
}

impl Notification {
    pub fn kind(&self) -> NotificationKind {
        match self {
            Self::Connect => NotificationKind::Connect,
            Self::Log(_) => NotificationKind::Log,
            Self::End => NotificationKind::End,
            Self::Error(_) => NotificationKind::Error,
        }
    }
}

/// Discriminant used to subscribe to a class of notifications.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NotificationKind {
    Connect,
    Log,
    End,
    Error,
}

/// Receiver of notifications.
///
/// Implementations must not panic or block for long: they run on the
/// transport worker thread.
pub trait EventSink: Send + Sync {
    fn notify(&self, notification: Notification);
}

type Listener = Arc<dyn Fn(&Notification) + Send + Sync>;

/// Fan-out [`EventSink`] with optional diagnostic printing.
pub struct Notifier {
    listeners: RwLock<Vec<(NotificationKind, Listener)>>,
    print_errors: bool,
    diagnostic: Mutex<Box<dyn Write + Send>>,
    unhandled: RateLimitedWarner,
}

impl Notifier {
    /// Create a notifier that prints errors to stderr when `print_errors` is set.
    pub fn new(print_errors: bool) -> Self {
        Self::with_diagnostic(print_errors, io::stderr())
    }

    /// Create a notifier writing error lines to `diagnostic`.
    pub fn with_diagnostic<W>(print_errors: bool, diagnostic: W) -> Self
    where
        W: Write + Send + 'static,
    {
        Self {
            listeners: RwLock::new(Vec::new()),
            print_errors,
            diagnostic: Mutex::new(Box::new(diagnostic)),
            unhandled: RateLimitedWarner::default(),
        }
    }

    /// Subscribe `listener` to notifications of `kind`.
    pub fn on<F>(&self, kind: NotificationKind, listener: F)
    where
        F: Fn(&Notification) + Send + Sync + 'static,
    {
        self.listeners.write().push((kind, Arc::new(listener)));
    }

    /// Subscribe to error notifications only.
    pub fn on_error<F>(&self, listener: F)
    where
        F: Fn(&LogError) + Send + Sync + 'static,
    {
        self.on(NotificationKind::Error, move |n| {
            if let Notification::Error(err) = n {
                listener(err);
            }
        });
    }

    pub fn has_listeners(&self, kind: NotificationKind) -> bool {
        self.listeners.read().iter().any(|(k, _)| *k == kind)
    }

    fn print_error(&self, err: &LogError) {
        let mut out = self.diagnostic.lock();
        if writeln!(out, "tokenlog: {err}").and_then(|_| out.flush()).is_err() {
            warn!("tokenlog: failed to write error to diagnostic stream: {err}");
        }
    }
}

impl EventSink for Notifier {
    fn notify(&self, notification: Notification) {
        let kind = notification.kind();
        // Snapshot so listeners may subscribe further without deadlocking.
        let matching: Vec<Listener> = self
            .listeners
            .read()
            .iter()
            .filter(|(k, _)| *k == kind)
            .map(|(_, l)| Arc::clone(l))
            .collect();

        if let Notification::Error(err) = &notification {
            if self.print_errors {
                self.print_error(err);
            } else if matching.is_empty() {
                self.unhandled.record();
                self.unhandled.warn_if_due(|count| {
                    warn!("tokenlog: {count} unhandled error notification(s); latest: {err}");
                });
            }
        }

        for listener in matching {
            // Listeners run on the transport worker; a panic must not escape into it.
            if panic::catch_unwind(AssertUnwindSafe(|| listener(&notification))).is_err() {
                warn!("tokenlog: {kind:?} listener panicked");
            }
        }
    }
}

impl Drop for Notifier {
    fn drop(&mut self) {
        self.unhandled.flush(|count| {
            warn!("tokenlog: {count} unhandled error notification(s) suppressed");
        });
    }
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier")
            .field("listeners", &self.listeners.read().len())
            .field("print_errors", &self.print_errors)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuf {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().clone()).expect("utf-8 output")
        }
    }

    #[test]
    fn listeners_only_receive_their_kind() {
        let notifier = Notifier::with_diagnostic(false, io::sink());
        let connects = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&connects);
        notifier.on(NotificationKind::Connect, move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });

        notifier.notify(Notification::Connect);
        notifier.notify(Notification::End);
        notifier.notify(Notification::Connect);

        assert_eq!(connects.load(Ordering::SeqCst), 2);
        assert!(notifier.has_listeners(NotificationKind::Connect));
        assert!(!notifier.has_listeners(NotificationKind::End));
    }

    #[test]
    fn panicking_listener_does_not_stop_delivery() {
        let notifier = Notifier::with_diagnostic(false, io::sink());
        let delivered = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&delivered);
        notifier.on(NotificationKind::Connect, |_| panic!("listener failure"));
        notifier.on(NotificationKind::Connect, move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });

        notifier.notify(Notification::Connect);
        notifier.notify(Notification::Connect);

        assert_eq!(delivered.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn errors_are_printed_when_enabled() {
        let buf = SharedBuf::default();
        let notifier = Notifier::with_diagnostic(true, buf.clone());
        notifier.notify(Notification::Error(LogError::UnknownLevel("loud".into())));
        assert_eq!(buf.text(), "tokenlog: Unknown log level: loud\n");
    }

    #[test]
    fn errors_reach_listeners_without_printing() {
        let buf = SharedBuf::default();
        let notifier = Notifier::with_diagnostic(false, buf.clone());
        let errors = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&errors);
        notifier.on_error(move |err| sink.lock().push(err.clone()));

        notifier.notify(Notification::Error(LogError::TransportClosed));

        assert_eq!(*errors.lock(), vec![LogError::TransportClosed]);
        assert!(buf.text().is_empty());
    }
}
