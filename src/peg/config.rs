//! Parser configuration
//!
//! [ParserConfig] is fixed at construction time. Its defaults live in
//! `defaults/parser.default.toml`, which is embedded so that docs and runtime
//! behavior stay in sync. Applications layer their own files and overrides on top
//! via [Loader] before deserializing.

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, File, FileFormat, ValueKind};
use serde::{Deserialize, Serialize};
use std::path::Path;

const DEFAULT_TOML: &str = include_str!("../../defaults/parser.default.toml");

/// What the driver does after an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecoveryMode {
    /// Stop at the first problem
    #[default]
    Strict,
    /// Record, recover and keep parsing
    Resilient,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorRecoveryConfig {
    pub mode: RecoveryMode,
    /// Maximum recorded errors; 0 is unlimited
    pub max_errors: usize,
}

impl Default for ErrorRecoveryConfig {
    fn default() -> Self {
        Self {
            mode: RecoveryMode::Strict,
            max_errors: 1,
        }
    }
}

/// Verbosity of the engine's tracing events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DebugLevel {
    #[default]
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl DebugLevel {
    /// True if events at `level` should be emitted
    pub fn enables(self, level: DebugLevel) -> bool {
        self != DebugLevel::Off && level != DebugLevel::Off && level <= self
    }
}

/// Construction-time parser settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    pub start_rule: String,
    pub error_recovery: ErrorRecoveryConfig,
    /// Token kinds skipped between pattern elements
    pub ignored: Vec<String>,
    pub debug: DebugLevel,
    pub max_depth: usize,
    pub max_cache_size: usize,
    pub memoize: bool,
    /// Cache entries older than this many insertions are dropped on eviction
    pub cache_freshness: usize,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            start_rule: "root".to_string(),
            error_recovery: ErrorRecoveryConfig::default(),
            ignored: vec!["ws".to_string()],
            debug: DebugLevel::Off,
            max_depth: 1000,
            max_cache_size: 1,
            memoize: true,
            cache_freshness: 1000,
        }
    }
}

impl ParserConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_start_rule(mut self, name: impl Into<String>) -> Self {
        self.start_rule = name.into();
        self
    }

    pub fn resilient(mut self) -> Self {
        self.error_recovery.mode = RecoveryMode::Resilient;
        self
    }

    pub fn strict(mut self) -> Self {
        self.error_recovery.mode = RecoveryMode::Strict;
        self
    }

    pub fn with_max_errors(mut self, max_errors: usize) -> Self {
        self.error_recovery.max_errors = max_errors;
        self
    }

    pub fn with_ignored<S: Into<String>>(mut self, kinds: impl IntoIterator<Item = S>) -> Self {
        self.ignored = kinds.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_debug(mut self, level: DebugLevel) -> Self {
        self.debug = level;
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_max_cache_size(mut self, size: usize) -> Self {
        self.max_cache_size = size;
        self
    }

    pub fn with_memoize(mut self, memoize: bool) -> Self {
        self.memoize = memoize;
        self
    }

    pub fn is_resilient(&self) -> bool {
        self.error_recovery.mode == RecoveryMode::Resilient
    }
}

/// Layered [ParserConfig] source.
///
/// Layers apply in the order they are added, on top of
/// `defaults/parser.default.toml`. Keys mirror the TOML layout: top-level
/// fields by name (`max_depth`, `ignored`) and recovery settings under
/// `error_recovery.` (`error_recovery.mode`, `error_recovery.max_errors`).
#[derive(Debug, Clone)]
pub struct Loader {
    builder: ConfigBuilder<DefaultState>,
}

impl Loader {
    /// Engine defaults only; start rule `root`, strict mode.
    pub fn new() -> Self {
        let builder = Config::builder().add_source(File::from_str(DEFAULT_TOML, FileFormat::Toml));
        Self { builder }
    }

    /// Layer a TOML file. `build` fails if it is missing.
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(true);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Layer a TOML file if it exists, such as a per-project `gramma.toml`.
    pub fn with_optional_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(false);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Layer inline TOML. Languages use this for their own defaults.
    pub fn with_toml(mut self, toml: &str) -> Self {
        self.builder = self
            .builder
            .add_source(File::from_str(toml, FileFormat::Toml));
        self
    }

    /// Override one dotted key, e.g. `("error_recovery.mode", "resilient")`.
    ///
    /// Overrides win over every file layer regardless of call order.
    pub fn set_override<I>(mut self, key: &str, value: I) -> Result<Self, ConfigError>
    where
        I: Into<ValueKind>,
    {
        self.builder = self.builder.set_override(key, value)?;
        Ok(self)
    }

    /// Merge the layers. Unknown enum values and mistyped fields are errors.
    pub fn build(self) -> Result<ParserConfig, ConfigError> {
        self.builder.build()?.try_deserialize()
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

/// The embedded engine defaults.
pub fn load_defaults() -> Result<ParserConfig, ConfigError> {
    Loader::new().build()
}
