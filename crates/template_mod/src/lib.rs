//! The template mod: a minimal starting point for writing mods.
//!
//! This crate demonstrates the whole surface a mod touches and nothing more:
//! identity constants, a named logger created once at load time, an optional
//! event handler, and the [`declare_mod!`] export that makes the compiled
//! library loadable through a `mod.toml` manifest. Copy it, change the
//! constants, and build from there.

use async_trait::async_trait;
use mod_api::{
    declare_mod, EventBus, HostContext, ModEntrypoint, ModError, ModLogger, StartupCompleteEvent,
};
use std::sync::Arc;

// ============================================================================
// Template Mod
// ============================================================================

/// Stable identifier, matching the `id` field of the shipped `mod.toml`.
pub const MOD_ID: &str = "template";

/// Human-readable name, attached to every log record this mod writes.
pub const MOD_NAME: &str = "Template Mod";

/// The smallest useful mod: announces itself once when the host initializes
/// it, and shows how to subscribe to a host lifecycle event.
pub struct TemplateMod {
    logger: ModLogger,
}

impl TemplateMod {
    pub fn new() -> Self {
        Self {
            // One logger for the whole mod, keyed by display name
            logger: ModLogger::named(MOD_NAME),
        }
    }
}

impl Default for TemplateMod {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ModEntrypoint for TemplateMod {
    fn id(&self) -> &str {
        MOD_ID
    }

    fn display_name(&self) -> &str {
        MOD_NAME
    }

    fn version(&self) -> &str {
        env!("CARGO_PKG_VERSION")
    }

    async fn register_handlers(&mut self, events: Arc<EventBus>) -> Result<(), ModError> {
        let logger = self.logger.clone();
        events
            .on("startup_complete", move |_event: StartupCompleteEvent| {
                logger.info("This line is printed by a Template Mod event handler!");
                Ok(())
            })
            .await
            .map_err(|e| ModError::ExecutionError(e.to_string()))
    }

    async fn on_init(&mut self, _context: Arc<dyn HostContext>) -> Result<(), ModError> {
        self.logger
            .info(&format!("Hello mod world from {}", MOD_NAME));
        Ok(())
    }
}

declare_mod!(TemplateMod);
