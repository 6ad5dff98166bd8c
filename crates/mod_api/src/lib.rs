//! # Mod API
//!
//! The boundary between a game host and its mods. This crate defines everything a
//! mod compiles against: the entry point traits, the lifecycle event bus, the
//! per-mod logger, and the FFI export macro used by dynamically loaded mods.
//!
//! ## Core Features
//!
//! - **Type Safety**: Lifecycle events are strongly typed with compile-time guarantees
//! - **Async/Await Support**: Built on Tokio, matching the host runtime
//! - **Panic Safety**: Entry point calls are isolated at the FFI boundary
//! - **Serialization**: Built-in JSON serialization for event payloads
//! - **Statistics**: Handler and emission counters for monitoring
//!
//! ## Mod Development
//!
//! Implement [`ModEntrypoint`] and export it with [`declare_mod!`]:
//!
//! ```rust,ignore
//! use mod_api::*;
//! use std::sync::Arc;
//!
//! struct MyMod {
//!     logger: ModLogger,
//! }
//!
//! impl MyMod {
//!     fn new() -> Self {
//!         Self { logger: ModLogger::named("My Mod") }
//!     }
//! }
//!
//! #[async_trait::async_trait]
//! impl ModEntrypoint for MyMod {
//!     fn id(&self) -> &str { "my_mod" }
//!     fn display_name(&self) -> &str { "My Mod" }
//!     fn version(&self) -> &str { "1.0.0" }
//!
//!     async fn on_init(&mut self, _context: Arc<dyn HostContext>) -> Result<(), ModError> {
//!         self.logger.info("My Mod is up");
//!         Ok(())
//!     }
//! }
//!
//! declare_mod!(MyMod);
//! ```
//!
//! The host discovers the compiled library through a `mod.toml` manifest, creates
//! the instance via the exported `create_mod` symbol, and drives it through the
//! two-phase lifecycle: handler registration first, then initialization.

pub mod context;
pub mod entrypoint;
pub mod error;
pub mod event;
pub mod logging;

pub use context::{HostContext, LogLevel};
pub use entrypoint::{Mod, ModEntrypoint, ModWrapper};
pub use error::{EventError, ModError};
pub use event::{
    Event, EventBus, EventBusStats, EventHandler, ModLoadedEvent, ModUnloadedEvent,
    StartupCompleteEvent, TypedEventHandler,
};
pub use logging::ModLogger;

use std::sync::Arc;

/// Returns the current Unix timestamp in seconds.
///
/// All lifecycle events use this function for their `timestamp` field so that
/// timestamps are consistent across the host and every loaded mod.
///
/// # Panics
///
/// Panics if the system clock is set to a time before the Unix epoch.
pub fn current_timestamp() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("Time went backwards")
        .as_secs()
}

/// Creates a new event bus instance.
///
/// This is the primary factory function for creating the bus shared between the
/// host and its mods. The returned bus is ready to accept handler registrations
/// and event emissions.
///
/// # Examples
///
/// ```rust,ignore
/// let events = create_event_bus();
///
/// events.on("startup_complete", |event: StartupCompleteEvent| {
///     println!("{} mods up", event.mod_count);
///     Ok(())
/// }).await?;
/// ```
pub fn create_event_bus() -> Arc<EventBus> {
    Arc::new(EventBus::new())
}
