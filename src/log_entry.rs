//! Entry representation shipped by the transport.
//!
//! A [`LogEntry`] holds the ordered fields `[timestamp?, level, message]`.
//! Field order is reproduced verbatim on the wire.

use std::fmt;

/// Immutable, ordered fields of one log line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogEntry {
    fields: Vec<String>,
}

impl LogEntry {
    /// Build an entry from an optional timestamp, a level name and a message.
    pub fn new(timestamp: Option<String>, level: &str, message: String) -> Self {
        let mut fields = Vec::with_capacity(3);
        fields.extend(timestamp);
        fields.push(level.to_owned());
        fields.push(message);
        Self { fields }
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// The final field, i.e. the formatted message.
    pub fn message(&self) -> Option<&str> {
        self.fields.last().map(String::as_str)
    }

    /// Render the newline-terminated wire line for this entry.
    pub fn to_line(&self, format: &LineFormat) -> String {
        let mut line = String::with_capacity(
            format.token.len() + self.fields.iter().map(|f| f.len() + 3).sum::<usize>() + 1,
        );
        line.push_str(&format.token);
        if format.use_quotes {
            line.push('"');
            line.push_str(&self.fields.join("\" \""));
            line.push('"');
        } else {
            line.push_str(&self.fields.join(" "));
        }
        line.push('\n');
        line
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.fields.join(" "))
    }
}

/// How entries are rendered onto the wire.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LineFormat {
    /// Destination credential, prefixed verbatim to every line.
    pub token: String,
    /// Wrap each field in double quotes.
    pub use_quotes: bool,
}

impl LineFormat {
    pub fn new(token: impl Into<String>, use_quotes: bool) -> Self {
        Self {
            token: token.into(),
            use_quotes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn entry() -> LogEntry {
        LogEntry::new(
            Some("2015-05-17T15:46:17.231Z".into()),
            "info",
            "a=1 ".into(),
        )
    }

    #[rstest]
    fn fields_keep_order() {
        assert_eq!(
            entry().fields(),
            ["2015-05-17T15:46:17.231Z", "info", "a=1 "]
        );
        let untimed = LogEntry::new(None, "err", "boom".into());
        assert_eq!(untimed.fields(), ["err", "boom"]);
        assert_eq!(untimed.message(), Some("boom"));
    }

    #[rstest]
    #[case(false, "tok 2015-05-17T15:46:17.231Z info a=1 \n")]
    #[case(true, "tok \"2015-05-17T15:46:17.231Z\" \"info\" \"a=1 \"\n")]
    fn renders_wire_line(#[case] use_quotes: bool, #[case] expected: &str) {
        let format = LineFormat::new("tok ", use_quotes);
        assert_eq!(entry().to_line(&format), expected);
    }
}
