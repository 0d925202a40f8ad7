//! INI loading for [`LoggerBuilder`].
//!
//! A configuration file names one section holding the logger options and an
//! optional `[<section>.levels]` table listing custom levels in order:
//!
//! ```ini
//! [tokenlog]
//! token = 2bfbea1e-10c3-4419-bdad-7e6435882e1f
//! secure = true
//! level = notice
//!
//! [tokenlog.levels]
//! trace = 0
//! notice = 2
//! page = 9
//! ```

use std::{fs, io::ErrorKind, path::Path};

use ini::{Ini, Properties};

use crate::{
    builder::{BuildError, LoggerBuilder},
    formatter::TimestampSource,
    level::LevelRegistry,
};

impl LoggerBuilder {
    /// Read builder options from `section` of the INI file at `path`.
    pub fn from_ini_file(path: impl AsRef<Path>, section: &str) -> Result<Self, BuildError> {
        let path = path.as_ref();
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(BuildError::InvalidConfig(format!(
                    "{} doesn't exist",
                    path.display()
                )));
            }
            Err(err) => return Err(err.into()),
        };
        if text.trim().is_empty() {
            return Err(BuildError::InvalidConfig(format!(
                "{} is an empty file",
                path.display()
            )));
        }
        Self::from_ini_str(&text, section)
    }

    /// Parse builder options from INI `text`.
    pub fn from_ini_str(text: &str, section: &str) -> Result<Self, BuildError> {
        let ini = Ini::load_from_str(text)
            .map_err(|err| BuildError::InvalidConfig(format!("invalid INI: {err}")))?;
        let props = ini
            .section(Some(section))
            .ok_or_else(|| BuildError::InvalidConfig(format!("missing section [{section}]")))?;
        let mut builder = apply_options(Self::new(), props)?;
        if let Some(levels) = ini.section(Some(format!("{section}.levels"))) {
            builder = builder.with_levels(parse_levels(levels)?);
        }
        Ok(builder)
    }
}

fn apply_options(
    mut builder: LoggerBuilder,
    props: &Properties,
) -> Result<LoggerBuilder, BuildError> {
    for (key, value) in props.iter() {
        builder = match key {
            "token" => builder.with_token(value),
            "host" => builder.with_host(value),
            "port" => builder.with_port(parse_number(key, value)?),
            "secure" => builder.with_secure(parse_bool(key, value)?),
            "usequotes" => builder.with_use_quotes(parse_bool(key, value)?),
            "flatten" => builder.with_flatten(parse_bool(key, value)?),
            "timestamp" => {
                builder.with_timestamp(TimestampSource::from_flag(parse_bool(key, value)?))
            }
            "printerror" => builder.with_print_errors(parse_bool(key, value)?),
            "level" => builder.with_level(value),
            "tls_insecure" => builder.with_tls_insecure(parse_bool(key, value)?),
            "connect_timeout_ms" => builder.with_connect_timeout_ms(parse_number(key, value)?),
            "write_timeout_ms" => builder.with_write_timeout_ms(parse_number(key, value)?),
            "shutdown_timeout_ms" => builder.with_shutdown_timeout_ms(parse_number(key, value)?),
            other => {
                return Err(BuildError::InvalidConfig(format!(
                    "unknown option `{other}`"
                )));
            }
        };
    }
    Ok(builder)
}

fn parse_levels(props: &Properties) -> Result<LevelRegistry, BuildError> {
    let mut levels = LevelRegistry::builder();
    for (name, severity) in props.iter() {
        levels = levels.with_level(name, parse_number(name, severity)?);
    }
    Ok(levels.build()?)
}

fn parse_bool(key: &str, value: &str) -> Result<bool, BuildError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "yes" | "true" | "on" => Ok(true),
        "0" | "no" | "false" | "off" => Ok(false),
        _ => Err(BuildError::InvalidConfig(format!(
            "`{key}` expects a boolean, got `{value}`"
        ))),
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, BuildError> {
    value.trim().parse().map_err(|_| {
        BuildError::InvalidConfig(format!("`{key}` expects a number, got `{value}`"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::Level;
    use rstest::rstest;
    use std::io::Write;
    use std::time::Duration;
    use tempfile::NamedTempFile;

    const CONFIG: &str = "\
[tokenlog]
token = abc
host = collector.internal
secure = yes
usequotes = on
flatten = false
timestamp = 0
printerror = False
level = notice
write_timeout_ms = 250

[tokenlog.levels]
trace = 0
notice = 2
page = 9
";

    #[rstest]
    fn reads_options_and_ordered_levels() {
        let builder = LoggerBuilder::from_ini_str(CONFIG, "tokenlog").expect("valid config");
        let config = builder.transport_config();
        assert_eq!(config.endpoint.host, "collector.internal");
        assert_eq!(config.endpoint.port, 20000);
        assert!(config.endpoint.tls.is_some());
        assert!(config.line.use_quotes);
        assert_eq!(config.line.token, "abc");
        assert_eq!(config.write_timeout, Duration::from_millis(250));
        assert!(!builder.print_errors());

        let parts = builder.logger_parts();
        assert!(!parts.formatter.flatten());
        assert!(parts.timestamp.stamp().is_none());
        assert_eq!(parts.level.as_deref(), Some("notice"));
        let names: Vec<&str> = parts.registry.iter().map(Level::name).collect();
        assert_eq!(names, ["trace", "notice", "page"]);
    }

    #[rstest]
    #[case("[tokenlog]\ntoken = a\nverbose = 1\n", "unknown option")]
    #[case("[tokenlog]\nport = http\n", "expects a number")]
    #[case("[tokenlog]\nsecure = maybe\n", "expects a boolean")]
    #[case("[other]\ntoken = a\n", "missing section")]
    fn rejects_bad_options(#[case] text: &str, #[case] fragment: &str) {
        let err = LoggerBuilder::from_ini_str(text, "tokenlog").expect_err("config must fail");
        assert!(
            matches!(&err, BuildError::InvalidConfig(msg) if msg.contains(fragment)),
            "unexpected error: {err}"
        );
    }

    #[rstest]
    fn reserved_level_names_fail_the_load() {
        let text = "[tokenlog]\ntoken = a\n[tokenlog.levels]\nend = 1\n";
        let err = LoggerBuilder::from_ini_str(text, "tokenlog").expect_err("reserved level");
        assert!(matches!(err, BuildError::Levels(_)));
    }

    #[rstest]
    fn loads_from_disk() {
        let mut file = NamedTempFile::new().expect("temp file");
        file.write_all(CONFIG.as_bytes()).expect("write config");
        let builder = LoggerBuilder::from_ini_file(file.path(), "tokenlog").expect("valid file");
        assert_eq!(builder.transport_config().line.token, "abc");
    }

    #[rstest]
    fn missing_and_empty_files_are_config_errors() {
        let dir = tempfile::tempdir().expect("temp dir");
        let missing = dir.path().join("absent.ini");
        let err = LoggerBuilder::from_ini_file(&missing, "tokenlog").expect_err("missing");
        assert!(matches!(err, BuildError::InvalidConfig(msg) if msg.contains("doesn't exist")));

        let empty = NamedTempFile::new().expect("temp file");
        let err = LoggerBuilder::from_ini_file(empty.path(), "tokenlog").expect_err("empty");
        assert!(matches!(err, BuildError::InvalidConfig(msg) if msg.contains("empty file")));
    }
}
