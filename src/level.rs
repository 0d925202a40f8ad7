//! Severity levels and the registry that names them.
//!
//! A [`LevelRegistry`] is an immutable, insertion-ordered table mapping level
//! names to integer severities. Lower numbers admit more output. Registries
//! are produced by [`LevelRegistryBuilder`], which rejects duplicate, empty,
//! and reserved names so a registry can never shadow the logger's own
//! control surface.

use std::fmt;

use once_cell::sync::Lazy;
use thiserror::Error;

/// Names that may never be registered as levels.
///
/// Covers every non-level method on [`Logger`](crate::Logger) plus `once`.
pub const RESERVED_NAMES: &[&str] = &[
    "log",
    "end",
    "level",
    "levels",
    "on",
    "once",
    "on_error",
    "set_level",
    "clear_level",
    "is_enabled",
    "leveled",
    "close",
];

/// Syslog-style levels used when no registry is supplied.
pub const DEFAULT_LEVELS: &[(&str, u32)] = &[
    ("debug", 0),
    ("info", 1),
    ("notice", 2),
    ("warning", 3),
    ("err", 4),
    ("crit", 5),
    ("alert", 6),
    ("emerg", 7),
];

static DEFAULT_REGISTRY: Lazy<LevelRegistry> = Lazy::new(|| LevelRegistry {
    levels: DEFAULT_LEVELS
        .iter()
        .map(|(name, severity)| Level::new(*name, *severity))
        .collect(),
});

/// Errors raised while building a [`LevelRegistry`].
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum LevelRegistryError {
    /// No levels were supplied.
    #[error("level registry must contain at least one level")]
    Empty,
    /// A level name was empty.
    #[error("level names must not be empty")]
    EmptyName,
    /// The same name was registered twice.
    #[error("duplicate level name: {0}")]
    Duplicate(String),
    /// The name collides with a logger method.
    #[error("level name `{0}` is reserved")]
    Reserved(String),
}

/// A named severity.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Level {
    name: String,
    severity: u32,
}

impl Level {
    pub(crate) fn new(name: impl Into<String>, severity: u32) -> Self {
        Self {
            name: name.into(),
            severity,
        }
    }

    /// Level name as registered.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Integer rank of the level.
    pub fn severity(&self) -> u32 {
        self.severity
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Immutable mapping from level name to severity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LevelRegistry {
    levels: Vec<Level>,
}

impl LevelRegistry {
    /// Start building a custom registry.
    pub fn builder() -> LevelRegistryBuilder {
        LevelRegistryBuilder::new()
    }

    /// Look up a level by name.
    pub fn get(&self, name: &str) -> Option<&Level> {
        self.levels.iter().find(|level| level.name == name)
    }

    /// Severity of `name`, if registered.
    pub fn severity(&self, name: &str) -> Option<u32> {
        self.get(name).map(Level::severity)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Iterate levels in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Level> {
        self.levels.iter()
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }
}

impl Default for LevelRegistry {
    fn default() -> Self {
        DEFAULT_REGISTRY.clone()
    }
}

/// Builder for [`LevelRegistry`].
///
/// Validation is deferred to [`build`](Self::build) so that callers can
/// assemble the table incrementally.
#[derive(Clone, Debug, Default)]
pub struct LevelRegistryBuilder {
    levels: Vec<(String, u32)>,
}

impl LevelRegistryBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a level.
    pub fn with_level(mut self, name: impl Into<String>, severity: u32) -> Self {
        self.levels.push((name.into(), severity));
        self
    }

    /// Append several levels, keeping iteration order.
    pub fn with_levels<I, S>(mut self, levels: I) -> Self
    where
        I: IntoIterator<Item = (S, u32)>,
        S: Into<String>,
    {
        self.levels
            .extend(levels.into_iter().map(|(name, sev)| (name.into(), sev)));
        self
    }

    /// Validate the accumulated levels and freeze them into a registry.
    pub fn build(self) -> Result<LevelRegistry, LevelRegistryError> {
        if self.levels.is_empty() {
            return Err(LevelRegistryError::Empty);
        }
        let mut levels: Vec<Level> = Vec::with_capacity(self.levels.len());
        for (name, severity) in self.levels {
            if name.is_empty() {
                return Err(LevelRegistryError::EmptyName);
            }
            if RESERVED_NAMES.contains(&name.as_str()) {
                return Err(LevelRegistryError::Reserved(name));
            }
            if levels.iter().any(|level| level.name == name) {
                return Err(LevelRegistryError::Duplicate(name));
            }
            levels.push(Level::new(name, severity));
        }
        Ok(LevelRegistry { levels })
    }
}
