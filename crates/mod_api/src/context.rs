//! Host context handed to mod lifecycle hooks.

use crate::event::EventBus;
use std::sync::Arc;

/// Context providing mods access to host services.
///
/// An implementation of this trait is passed to every lifecycle hook. It is the
/// only channel through which a mod reaches the host: the event bus for
/// lifecycle notifications, and host-mediated logging for mods that do not hold
/// their own [`ModLogger`](crate::ModLogger).
///
/// # Examples
///
/// ```rust,ignore
/// async fn on_init(&mut self, context: Arc<dyn HostContext>) -> Result<(), ModError> {
///     context.log(LogLevel::Info, "ready");
///     context.events().emit("my_mod_ready", &ReadyEvent {}).await
///         .map_err(|e| ModError::ExecutionError(e.to_string()))?;
///     Ok(())
/// }
/// ```
pub trait HostContext: Send + Sync {
    /// Returns a reference to the event bus.
    ///
    /// This is the same bus the host emits lifecycle events on, so handlers
    /// registered here observe `mod_loaded`, `startup_complete`, and
    /// `mod_unloaded` alongside any mod-defined events.
    fn events(&self) -> Arc<EventBus>;

    /// Logs a message with the specified level through the host's logging
    /// pipeline.
    ///
    /// Mods that want records attributed to a display name should prefer
    /// [`ModLogger`](crate::ModLogger); this method exists for code that only
    /// holds a context.
    fn log(&self, level: LogLevel, message: &str);
}

/// Enumeration of log levels for structured logging.
///
/// These levels follow standard logging conventions and map directly onto the
/// host's `tracing` levels.
///
/// # Level Guidelines
///
/// - **Error**: Mod failures, unrecoverable conditions
/// - **Warn**: Recoverable errors, deprecated usage
/// - **Info**: Lifecycle messages, major events
/// - **Debug**: Detailed debugging information
/// - **Trace**: Very detailed execution traces
#[derive(Debug, Clone, Copy)]
pub enum LogLevel {
    /// Critical errors that may affect host stability
    Error,
    /// Warning conditions that should be investigated
    Warn,
    /// General informational messages
    Info,
    /// Detailed information for debugging
    Debug,
    /// Very detailed trace information
    Trace,
}
