//! Error types shared by the host, the loader, and mod entry points.

/// Errors that can occur during mod lifecycle operations.
///
/// This enum covers all error conditions that can arise while discovering,
/// loading, initializing, and unloading mods.
///
/// # Error Categories
///
/// - **Manifest**: The `mod.toml` describing a mod is missing, malformed, or
///   inconsistent with the entry point it describes
/// - **InitializationFailed**: The mod failed to load or initialize properly
/// - **ExecutionError**: Runtime error during normal operation
/// - **NotFound**: Requested mod doesn't exist
/// - **Runtime**: Panic or other unexpected runtime condition
#[derive(Debug, thiserror::Error)]
pub enum ModError {
    /// Mod manifest was missing, malformed, or contradicts the entry point
    #[error("Mod manifest error: {0}")]
    Manifest(String),
    /// Mod initialization failed during startup
    #[error("Mod initialization failed: {0}")]
    InitializationFailed(String),
    /// Error occurred during mod execution
    #[error("Mod execution error: {0}")]
    ExecutionError(String),
    /// Requested mod was not found
    #[error("Mod not found: {0}")]
    NotFound(String),
    /// Runtime error such as a panic inside the entry point
    #[error("Mod runtime error: {0}")]
    Runtime(String),
}

/// Errors that can occur during event bus operations.
#[derive(Debug, thiserror::Error)]
pub enum EventError {
    /// Serialization failed when converting an event to bytes
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    /// Deserialization failed when converting bytes to an event
    #[error("Deserialization error: {0}")]
    Deserialization(serde_json::Error),
    /// Handler execution failed during event processing
    #[error("Handler execution error: {0}")]
    HandlerExecution(String),
}
