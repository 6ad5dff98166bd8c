//! Entry point traits, the panic-isolating wrapper, and the FFI export macro.

use crate::context::HostContext;
use crate::error::ModError;
use crate::event::EventBus;
use async_trait::async_trait;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

/// High-level entry point trait that mods implement.
///
/// This trait is the safe face of the mod boundary. It handles none of the FFI
/// or lifecycle plumbing itself; [`ModWrapper`] and [`declare_mod!`](crate::declare_mod)
/// take care of that, so mod authors focus on what the mod does.
///
/// # Two-Phase Initialization Lifecycle
///
/// 1. **Handler Registration Phase**: `register_handlers()` is called on ALL
///    mods first
/// 2. **Initialization Phase**: `on_init()` is called only after ALL mods have
///    registered handlers
/// 3. **Operation Phase**: the mod receives events it subscribed to
/// 4. **Shutdown Phase**: `on_shutdown()` is called for cleanup
///
/// This ordering guarantees that by the time any mod initializes, every other
/// mod's handlers are already in place, so initialization-time events are never
/// missed.
///
/// # Critical Rule
///
/// - **`register_handlers()`**: ONLY register event handlers. Do NOT emit
///   events or perform business logic.
/// - **`on_init()`**: Perform initialization logic and emit events freely.
#[async_trait]
pub trait ModEntrypoint: Send + Sync + 'static {
    /// Returns the stable identifier of this mod.
    ///
    /// Must be unique among all loaded mods and must match the `id` declared
    /// in the mod's manifest. Used for registration, lookup, and namespacing.
    fn id(&self) -> &str;

    /// Returns the human-readable name of this mod.
    ///
    /// Used wherever the mod appears in log output.
    fn display_name(&self) -> &str;

    /// Returns the version string of this mod.
    ///
    /// Should follow semantic versioning (e.g., "1.2.3").
    fn version(&self) -> &str;

    /// Registers event handlers during pre-initialization (Phase 1).
    ///
    /// Called on every mod before any mod proceeds to `on_init()`. Use this
    /// method ONLY to register handlers on the bus.
    async fn register_handlers(&mut self, _events: Arc<EventBus>) -> Result<(), ModError> {
        Ok(()) // Default implementation registers nothing
    }

    /// Initializes the mod (Phase 2).
    ///
    /// Called exactly once per load, after every mod has completed
    /// `register_handlers()`. This is the mod's main hook: announce yourself,
    /// set up state, emit events.
    async fn on_init(&mut self, context: Arc<dyn HostContext>) -> Result<(), ModError>;

    /// Shuts the mod down gracefully.
    ///
    /// Called when the mod is being unloaded or the host is shutting down.
    /// Shutdown errors are logged but don't prevent unloading.
    async fn on_shutdown(&mut self, _context: Arc<dyn HostContext>) -> Result<(), ModError> {
        Ok(()) // Default implementation does nothing
    }
}

/// Low-level mod trait used across the FFI boundary.
///
/// This is the interface the loader drives. Mod authors should implement
/// [`ModEntrypoint`] instead; [`ModWrapper`] bridges the two and supplies the
/// panic isolation that makes the boundary safe.
///
/// # Mod Lifecycle
///
/// 1. **Pre-initialization**: `pre_init()` for handler registration
/// 2. **Initialization**: `init()` with full host context
/// 3. **Operation**: the mod receives events
/// 4. **Shutdown**: `shutdown()` for cleanup
#[async_trait]
pub trait Mod: Send + Sync {
    /// Returns the mod identifier.
    fn id(&self) -> &str;

    /// Returns the human-readable mod name.
    fn display_name(&self) -> &str;

    /// Returns the mod version string.
    fn version(&self) -> &str;

    /// Pre-initialization phase for registering event handlers.
    async fn pre_init(&mut self, context: Arc<dyn HostContext>) -> Result<(), ModError>;

    /// Main initialization phase with full host context access.
    async fn init(&mut self, context: Arc<dyn HostContext>) -> Result<(), ModError>;

    /// Shutdown phase for cleanup.
    async fn shutdown(&mut self, context: Arc<dyn HostContext>) -> Result<(), ModError>;
}

/// Bridges [`ModEntrypoint`] and [`Mod`] with panic protection.
///
/// Every call into the wrapped entry point runs under `catch_unwind`, so a
/// panicking mod degrades into a [`ModError::Runtime`] instead of unwinding
/// across the FFI boundary and taking the host down with it.
pub struct ModWrapper<T> {
    inner: T,
}

impl<T: ModEntrypoint> ModWrapper<T> {
    /// Wraps an entry point for use behind the [`Mod`] trait.
    pub fn new(inner: T) -> Self {
        Self { inner }
    }

    /// Converts a panic payload into a structured error.
    fn panic_to_error(panic_info: Box<dyn std::any::Any + Send>) -> ModError {
        let message = if let Some(s) = panic_info.downcast_ref::<&str>() {
            format!("Mod panicked: {}", s)
        } else if let Some(s) = panic_info.downcast_ref::<String>() {
            format!("Mod panicked: {}", s)
        } else {
            "Mod panicked with unknown error".to_string()
        };

        ModError::Runtime(message)
    }
}

#[async_trait]
impl<T: ModEntrypoint> Mod for ModWrapper<T> {
    fn id(&self) -> &str {
        // For synchronous methods, we can use catch_unwind directly
        match catch_unwind(AssertUnwindSafe(|| self.inner.id())) {
            Ok(id) => id,
            Err(_) => "unknown-mod-id", // Fallback if the entry point panics
        }
    }

    fn display_name(&self) -> &str {
        match catch_unwind(AssertUnwindSafe(|| self.inner.display_name())) {
            Ok(name) => name,
            Err(_) => "unknown-mod-name", // Fallback if the entry point panics
        }
    }

    fn version(&self) -> &str {
        match catch_unwind(AssertUnwindSafe(|| self.inner.version())) {
            Ok(version) => version,
            Err(_) => "unknown-version", // Fallback if the entry point panics
        }
    }

    async fn pre_init(&mut self, context: Arc<dyn HostContext>) -> Result<(), ModError> {
        let events = context.events();

        // Run directly on the current thread using a local executor
        match catch_unwind(AssertUnwindSafe(|| {
            futures::executor::block_on(self.inner.register_handlers(events))
        })) {
            Ok(result) => result,
            Err(panic_info) => Err(Self::panic_to_error(panic_info)),
        }
    }

    async fn init(&mut self, context: Arc<dyn HostContext>) -> Result<(), ModError> {
        match catch_unwind(AssertUnwindSafe(|| {
            futures::executor::block_on(self.inner.on_init(context))
        })) {
            Ok(result) => result,
            Err(panic_info) => Err(Self::panic_to_error(panic_info)),
        }
    }

    async fn shutdown(&mut self, context: Arc<dyn HostContext>) -> Result<(), ModError> {
        match catch_unwind(AssertUnwindSafe(|| {
            futures::executor::block_on(self.inner.on_shutdown(context))
        })) {
            Ok(result) => result,
            Err(panic_info) => Err(Self::panic_to_error(panic_info)),
        }
    }
}

/// Exports a [`ModEntrypoint`] implementation from a cdylib with minimal
/// boilerplate.
///
/// Every mod library exports two symbols: `create_mod` to construct the
/// instance and `destroy_mod` to tear it down. This macro generates both,
/// wrapping the given type in [`ModWrapper`] so all lifecycle calls are
/// panic-isolated.
///
/// The type must provide a `new()` constructor.
///
/// # Usage
///
/// ```rust,ignore
/// struct MyMod { /* state */ }
///
/// impl MyMod {
///     fn new() -> Self { Self { /* initialization */ } }
/// }
///
/// #[async_trait]
/// impl ModEntrypoint for MyMod {
///     // Implementation
/// }
///
/// declare_mod!(MyMod);
/// ```
#[macro_export]
macro_rules! declare_mod {
    ($mod_type:ty) => {
        /// Mod creation function - required export.
        ///
        /// # Safety
        ///
        /// Called by the mod loader across the FFI boundary. Panics are caught
        /// here so creation failures surface as a null pointer rather than
        /// undefined behavior.
        #[no_mangle]
        pub unsafe extern "C" fn create_mod() -> *mut dyn $crate::Mod {
            // Critical: catch panics at the FFI boundary to prevent UB
            match std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                let entry = Box::new($crate::ModWrapper::new(<$mod_type>::new()));
                Box::into_raw(entry) as *mut dyn $crate::Mod
            })) {
                Ok(mod_ptr) => mod_ptr,
                Err(panic_info) => {
                    eprintln!("Mod creation panicked: {:?}", panic_info);
                    std::ptr::null_mut::<$crate::ModWrapper<$mod_type>>() as *mut dyn $crate::Mod
                }
            }
        }

        /// Mod destruction function - required export.
        ///
        /// # Safety
        ///
        /// Operates on the raw pointer produced by `create_mod`. Null pointers
        /// are ignored and destruction panics are swallowed; leaking is better
        /// than crashing the host process.
        #[no_mangle]
        pub unsafe extern "C" fn destroy_mod(instance: *mut dyn $crate::Mod) {
            if instance.is_null() {
                return;
            }

            let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                let _ = Box::from_raw(instance);
            }));
        }
    };
}
