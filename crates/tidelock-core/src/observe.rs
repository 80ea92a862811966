//! # Structured Logging
//!
//! The library only emits `tracing` events. Binaries call [`init_logging`]
//! once to install a `tracing-subscriber` formatter on stderr, keeping
//! stdout free for reports.
//!
//! | Event | Level |
//! |-------|-------|
//! | PLL lock acquired / lost | info |
//! | integrator divergence, step ceiling hit | warn |
//! | parameter changes, resets, buffer clears | debug |
//! | zero crossings | trace |
//!
//! ## Example
//!
//! ```rust,ignore
//! use tidelock_core::observe::{init_logging, LogConfig, LogFormat, LogLevel};
//!
//! init_logging(&LogConfig {
//!     level: LogLevel::Debug,
//!     format: LogFormat::Compact,
//!     ..Default::default()
//! });
//!
//! tracing::info!(vco_hz = 0.407, "PLL locked");
//! ```

use serde::{Deserialize, Serialize};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Log level configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Every zero crossing
    Trace,
    /// Parameter changes and resets
    Debug,
    /// Lock transitions (default)
    #[default]
    Info,
    /// Divergence and step ceiling
    Warn,
    /// Errors only
    Error,
}

impl LogLevel {
    /// One step more verbose, saturating at `Trace`.
    pub fn more_verbose(self) -> Self {
        match self {
            LogLevel::Error => LogLevel::Warn,
            LogLevel::Warn => LogLevel::Info,
            LogLevel::Info => LogLevel::Debug,
            LogLevel::Debug | LogLevel::Trace => LogLevel::Trace,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "trace"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per event
    Json,
    /// Multi-line, human-readable
    Pretty,
    /// One line per event
    #[default]
    Compact,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: LogLevel,
    pub format: LogFormat,
    /// Directive string (e.g. "tidelock_core=trace"); overrides `level`
    pub filter: Option<String>,
    /// Include file:line
    pub source_location: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Compact,
            filter: None,
            source_location: false,
        }
    }
}

impl LogConfig {
    /// Verbose preset for debugging the loop.
    pub fn development() -> Self {
        Self {
            level: LogLevel::Debug,
            format: LogFormat::Pretty,
            source_location: true,
            ..Default::default()
        }
    }

    /// Errors only.
    pub fn quiet() -> Self {
        Self {
            level: LogLevel::Error,
            ..Default::default()
        }
    }

    /// Filter directives this config resolves to, ignoring `RUST_LOG`.
    pub fn directives(&self) -> String {
        match &self.filter {
            Some(custom) => custom.clone(),
            None => self.level.to_string(),
        }
    }
}

/// Install the global subscriber.
///
/// `RUST_LOG` takes precedence over the configured level unless an explicit
/// `filter` is set. Calls after the first are ignored.
pub fn init_logging(config: &LogConfig) {
    let fallback = || EnvFilter::new(config.level.to_string());
    let filter = match &config.filter {
        Some(custom) => EnvFilter::try_new(custom).unwrap_or_else(|_| fallback()),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| fallback()),
    };

    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_file(config.source_location)
        .with_line_number(config.source_location)
        .with_target(config.source_location);

    let registry = tracing_subscriber::registry().with(filter);
    let result = match config.format {
        LogFormat::Json => registry.with(layer.json()).try_init(),
        LogFormat::Pretty => registry.with(layer.pretty()).try_init(),
        LogFormat::Compact => registry.with(layer.compact()).try_init(),
    };

    // Already initialized
    let _ = result;
}
