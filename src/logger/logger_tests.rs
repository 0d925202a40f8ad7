//! Unit tests for [`Logger`] filtering and dispatch.
//!
//! The transport worker is replaced by a bare command queue so tests can
//! inspect exactly what the logger hands over.

use super::*;
use crate::formatter::TimestampValue;
use crossbeam_channel::{bounded, unbounded};
use proptest::prelude::*;
use rstest::{fixture, rstest};
use std::io;
use std::thread;

struct Fixture {
    logger: Logger,
    commands: Receiver<TransportCommand>,
    errors: Arc<Mutex<Vec<LogError>>>,
}

impl Fixture {
    fn entries(&self) -> Vec<LogEntry> {
        self.commands
            .try_iter()
            .filter_map(|cmd| match cmd {
                TransportCommand::Consume(entry) => Some(entry),
                _ => None,
            })
            .collect()
    }

    fn messages(&self) -> Vec<String> {
        self.entries()
            .iter()
            .filter_map(LogEntry::message)
            .map(str::to_owned)
            .collect()
    }

    fn errors(&self) -> Vec<LogError> {
        self.errors.lock().clone()
    }
}

fn parts(registry: LevelRegistry, level: Option<&str>, timestamp: TimestampSource) -> LoggerParts {
    LoggerParts {
        registry,
        level: level.map(str::to_owned),
        formatter: DefaultFormatter::default(),
        timestamp,
        shutdown_timeout: Duration::from_millis(200),
    }
}

fn detached_worker() -> (WorkerHandle, Receiver<TransportCommand>) {
    let (tx, rx) = unbounded();
    let (done_tx, done_rx) = bounded(1);
    done_tx.send(()).expect("done signal");
    let handle = thread::spawn(|| {});
    (
        WorkerHandle {
            tx,
            handle,
            done_rx,
        },
        rx,
    )
}

fn fixture_with(parts: LoggerParts) -> Fixture {
    let notifier = Arc::new(Notifier::with_diagnostic(false, io::sink()));
    let errors = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&errors);
    notifier.on_error(move |err| seen.lock().push(err.clone()));
    let (worker, commands) = detached_worker();
    Fixture {
        logger: Logger::from_parts(parts, notifier, worker),
        commands,
        errors,
    }
}

#[fixture]
fn fx() -> Fixture {
    fixture_with(parts(
        LevelRegistry::default(),
        None,
        TimestampSource::Disabled,
    ))
}

#[rstest]
fn unset_threshold_admits_every_level(fx: Fixture) {
    for level in LevelRegistry::default().iter() {
        fx.logger.log(level.name(), level.name());
    }
    assert_eq!(fx.messages().len(), 8);
    assert_eq!(fx.logger.level(), None);
}

#[rstest]
fn threshold_filters_lower_severities(fx: Fixture) {
    let level = fx.logger.set_level("warning").expect("known level");
    assert_eq!(level.severity(), 3);

    fx.logger.info("dropped");
    fx.logger.warning("kept");
    fx.logger.emerg("also kept");

    assert_eq!(fx.messages(), ["kept", "also kept"]);
    assert_eq!(fx.logger.level().as_deref(), Some("warning"));
    assert!(fx.errors().is_empty());
}

#[rstest]
fn unknown_set_level_fails_and_keeps_threshold(fx: Fixture) {
    fx.logger.set_level("err").expect("known level");
    let err = fx.logger.set_level("verbose").expect_err("unknown level");
    assert_eq!(err, LogError::UnknownLevel("verbose".into()));
    assert_eq!(fx.logger.level().as_deref(), Some("err"));
}

#[rstest]
fn unknown_log_level_is_reported_not_sent(fx: Fixture) {
    fx.logger.log("verbose", "hello");
    assert!(fx.entries().is_empty());
    assert_eq!(fx.errors(), [LogError::UnknownLevel("verbose".into())]);
}

#[rstest]
fn clear_level_admits_everything_again(fx: Fixture) {
    fx.logger.set_level("crit").expect("known level");
    assert!(!fx.logger.is_enabled("debug"));
    fx.logger.clear_level();
    assert!(fx.logger.is_enabled("debug"));
    assert!(!fx.logger.is_enabled("verbose"));
}

#[rstest]
fn entries_carry_level_then_message(fx: Fixture) {
    fx.logger.notice(Value::map([("a", Value::from(1)), ("b", Value::from("x"))]));
    let entries = fx.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].fields(), ["notice", "a=1 b=x "]);
}

#[rstest]
fn timestamp_field_comes_first() {
    let fx = fixture_with(parts(
        LevelRegistry::default(),
        None,
        TimestampSource::custom(|| TimestampValue::EpochMillis(1_431_877_577_231)),
    ));
    fx.logger.info("boot");
    let entries = fx.entries();
    assert_eq!(
        entries[0].fields(),
        ["2015-05-17T15:46:17.231Z", "info", "boot"]
    );
}

#[rstest]
fn initial_level_applies_from_parts() {
    let fx = fixture_with(parts(
        LevelRegistry::default(),
        Some("alert"),
        TimestampSource::Disabled,
    ));
    fx.logger.crit("dropped");
    fx.logger.alert("kept");
    assert_eq!(fx.messages(), ["kept"]);
}

#[rstest]
fn custom_levels_reach_the_wire_through_leveled() {
    let registry = LevelRegistry::builder()
        .with_levels([("trace", 0), ("audit", 5)])
        .build()
        .expect("valid registry");
    let fx = fixture_with(parts(registry, Some("audit"), TimestampSource::Disabled));

    fx.logger.info("not a level here");
    let audit = fx.logger.leveled("audit").expect("registered level");
    audit.log("signed in");
    fx.logger.leveled("trace").expect("registered level").log("hidden");

    assert_eq!(fx.messages(), ["signed in"]);
    assert_eq!(fx.errors(), [LogError::UnknownLevel("info".into())]);
    assert!(matches!(
        fx.logger.leveled("info"),
        Err(LogError::UnknownLevel(name)) if name == "info"
    ));
}

#[rstest]
fn end_is_forwarded_to_the_worker(fx: Fixture) {
    fx.logger.end();
    assert!(matches!(
        fx.commands.try_recv(),
        Ok(TransportCommand::End)
    ));
}

#[rstest]
fn logging_after_close_reports_transport_closed(mut fx: Fixture) {
    fx.logger.close();
    assert!(matches!(
        fx.commands.try_recv(),
        Ok(TransportCommand::Shutdown)
    ));
    fx.logger.info("too late");
    assert_eq!(fx.errors(), [LogError::TransportClosed]);
}

proptest! {
    #[test]
    fn admission_matches_severity_order(threshold in 0usize..8, level in 0usize..8) {
        let fx = fixture_with(parts(
            LevelRegistry::default(),
            None,
            TimestampSource::Disabled,
        ));
        let names: Vec<String> = LevelRegistry::default()
            .iter()
            .map(|l| l.name().to_owned())
            .collect();
        fx.logger.set_level(&names[threshold]).expect("known level");
        let current_level = fx.logger.level();
        prop_assert_eq!(current_level.as_deref(), Some(names[threshold].as_str()));
        fx.logger.log(&names[level], "sample");
        prop_assert_eq!(fx.entries().len(), usize::from(level >= threshold));
    }
}
