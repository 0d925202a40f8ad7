//! Pluggable timestamp providers for the first entry field.

use std::{fmt, sync::Arc};

use chrono::{DateTime, Utc};

use super::iso8601;

/// Result produced by a custom timestamp provider.
#[derive(Clone, Debug, PartialEq)]
pub enum TimestampValue {
    DateTime(DateTime<Utc>),
    /// Milliseconds since the Unix epoch.
    EpochMillis(i64),
    /// Passed through unchanged.
    Raw(String),
}

impl TimestampValue {
    fn render(self) -> String {
        match self {
            Self::DateTime(dt) => iso8601(&dt),
            Self::EpochMillis(ms) => DateTime::<Utc>::from_timestamp_millis(ms)
                .map_or_else(|| ms.to_string(), |dt| iso8601(&dt)),
            Self::Raw(raw) => raw,
        }
    }
}

type Provider = Arc<dyn Fn() -> TimestampValue + Send + Sync>;

/// Where entry timestamps come from.
#[derive(Clone, Default)]
pub enum TimestampSource {
    /// No timestamp field is emitted.
    Disabled,
    /// Current wall-clock time.
    #[default]
    WallClock,
    /// Caller-supplied provider.
    Custom(Provider),
}

impl TimestampSource {
    /// Wrap a provider closure.
    pub fn custom<F>(provider: F) -> Self
    where
        F: Fn() -> TimestampValue + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(provider))
    }

    /// `true` maps to the wall clock, `false` disables timestamps.
    pub fn from_flag(enabled: bool) -> Self {
        if enabled {
            Self::WallClock
        } else {
            Self::Disabled
        }
    }

    /// Produce the timestamp field, or `None` when disabled.
    pub fn stamp(&self) -> Option<String> {
        match self {
            Self::Disabled => None,
            Self::WallClock => Some(iso8601(&Utc::now())),
            Self::Custom(provider) => Some(provider().render()),
        }
    }
}

impl fmt::Debug for TimestampSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disabled => f.write_str("Disabled"),
            Self::WallClock => f.write_str("WallClock"),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn disabled_source_emits_nothing() {
        assert_eq!(TimestampSource::Disabled.stamp(), None);
        assert_eq!(TimestampSource::from_flag(false).stamp(), None);
    }

    #[rstest]
    fn wall_clock_is_iso8601() {
        let stamp = TimestampSource::WallClock.stamp().expect("timestamp");
        assert_eq!(stamp.len(), "2015-05-17T15:46:17.231Z".len());
        assert!(stamp.ends_with('Z'));
        assert!(DateTime::parse_from_rfc3339(&stamp).is_ok());
    }

    #[rstest]
    #[case(TimestampValue::EpochMillis(1_431_877_577_231), "2015-05-17T15:46:17.231Z")]
    #[case(TimestampValue::Raw("yesterday".into()), "yesterday")]
    fn custom_provider_results_are_rendered(
        #[case] produced: TimestampValue,
        #[case] expected: &str,
    ) {
        let source = TimestampSource::custom(move || produced.clone());
        assert_eq!(source.stamp().as_deref(), Some(expected));
    }
}
