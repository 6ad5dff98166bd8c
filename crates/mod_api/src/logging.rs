//! Per-mod logger handles.

use crate::context::LogLevel;
use tracing::{debug, error, info, trace, warn};

/// A logger handle keyed by a mod's display name.
///
/// `tracing` targets are static, so a dynamically named logger can't be a
/// target of its own; instead the name travels as a structured `logger` field
/// on every record, under the shared `mods` target. Subscribers can filter on
/// the target and group on the field.
///
/// Handles are created once when the mod is constructed and stored as a field,
/// then used from anywhere in the mod. They carry no configuration; formatting
/// and routing belong to the subscriber installed by the host binary.
///
/// # Examples
///
/// ```rust
/// use mod_api::ModLogger;
///
/// let logger = ModLogger::named("My Mod");
/// logger.info("My Mod is up");
/// ```
#[derive(Debug, Clone)]
pub struct ModLogger {
    name: String,
}

impl ModLogger {
    /// Creates a logger handle for the given name.
    pub fn named(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Returns the name this handle was created with.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Writes a record at the given level.
    pub fn log(&self, level: LogLevel, message: &str) {
        match level {
            LogLevel::Error => error!(target: "mods", logger = %self.name, "{}", message),
            LogLevel::Warn => warn!(target: "mods", logger = %self.name, "{}", message),
            LogLevel::Info => info!(target: "mods", logger = %self.name, "{}", message),
            LogLevel::Debug => debug!(target: "mods", logger = %self.name, "{}", message),
            LogLevel::Trace => trace!(target: "mods", logger = %self.name, "{}", message),
        }
    }

    /// Writes an error record.
    pub fn error(&self, message: &str) {
        self.log(LogLevel::Error, message);
    }

    /// Writes a warning record.
    pub fn warn(&self, message: &str) {
        self.log(LogLevel::Warn, message);
    }

    /// Writes an informational record.
    pub fn info(&self, message: &str) {
        self.log(LogLevel::Info, message);
    }

    /// Writes a debug record.
    pub fn debug(&self, message: &str) {
        self.log(LogLevel::Debug, message);
    }

    /// Writes a trace record.
    pub fn trace(&self, message: &str) {
        self.log(LogLevel::Trace, message);
    }
}
