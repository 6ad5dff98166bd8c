//! Typed lifecycle event bus shared between the host and its mods.

use crate::error::EventError;
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

/// Core trait that defines what an event is in the mod system.
///
/// Most types will automatically implement this trait through the blanket
/// implementation if they implement the required marker traits.
///
/// # Safety
///
/// Events must be Send + Sync as they may be processed across multiple threads.
/// The Debug requirement ensures events can be logged for debugging purposes.
pub trait Event: Send + Sync + Any + std::fmt::Debug {
    /// Returns the type name of this event for debugging and routing.
    fn type_name() -> &'static str
    where
        Self: Sized;

    /// Serializes the event to bytes so it can cross the mod boundary.
    fn serialize(&self) -> Result<Vec<u8>, EventError>;

    /// Deserializes an event from bytes.
    fn deserialize(data: &[u8]) -> Result<Self, EventError>
    where
        Self: Sized;

    /// Returns a reference to this event as `&dyn Any` for dynamic typing.
    fn as_any(&self) -> &dyn Any;
}

/// Blanket implementation of Event for types that meet the requirements.
///
/// Any type that implements Serialize + DeserializeOwned + Send + Sync + Any +
/// Debug automatically gets an Event implementation with JSON serialization.
/// This makes it very easy to create new event types - just derive the required
/// traits:
///
/// ```rust
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Debug, Serialize, Deserialize)]
/// struct MyEvent {
///     data: String,
/// }
/// // MyEvent now implements Event automatically!
/// ```
impl<T> Event for T
where
    T: Serialize + DeserializeOwned + Send + Sync + Any + std::fmt::Debug + 'static,
{
    fn type_name() -> &'static str {
        std::any::type_name::<T>()
    }

    fn serialize(&self) -> Result<Vec<u8>, EventError> {
        serde_json::to_vec(self).map_err(EventError::Serialization)
    }

    fn deserialize(data: &[u8]) -> Result<Self, EventError> {
        serde_json::from_slice(data).map_err(EventError::Deserialization)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Handler trait for processing events asynchronously.
///
/// This trait abstracts over the type-specific handling logic and provides a
/// uniform interface for the bus to call handlers. Most users will not
/// implement it directly, but instead register closures through
/// [`EventBus::on`].
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Handles an event from serialized data.
    async fn handle(&self, data: &[u8]) -> Result<(), EventError>;

    /// Returns the TypeId of the event type this handler expects.
    fn expected_type_id(&self) -> TypeId;

    /// Returns a human-readable name for this handler for debugging.
    fn handler_name(&self) -> &str;
}

/// Type-safe wrapper bridging a typed closure to the generic [`EventHandler`]
/// trait.
///
/// # Type Parameters
///
/// * `T` - The event type this handler processes
/// * `F` - The function type that handles the event
pub struct TypedEventHandler<T, F>
where
    T: Event,
    F: Fn(T) -> Result<(), EventError> + Send + Sync,
{
    handler: F,
    name: String,
    _phantom: std::marker::PhantomData<T>,
}

impl<T, F> TypedEventHandler<T, F>
where
    T: Event,
    F: Fn(T) -> Result<(), EventError> + Send + Sync,
{
    /// Creates a new typed event handler.
    ///
    /// # Arguments
    ///
    /// * `name` - Human-readable name for debugging
    /// * `handler` - Function to handle events of type T
    pub fn new(name: String, handler: F) -> Self {
        Self {
            handler,
            name,
            _phantom: std::marker::PhantomData,
        }
    }
}

#[async_trait]
impl<T, F> EventHandler for TypedEventHandler<T, F>
where
    T: Event,
    F: Fn(T) -> Result<(), EventError> + Send + Sync,
{
    async fn handle(&self, data: &[u8]) -> Result<(), EventError> {
        let event = T::deserialize(data)?;
        (self.handler)(event)
    }

    fn expected_type_id(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn handler_name(&self) -> &str {
        &self.name
    }
}

/// The event bus that routes lifecycle events between the host and its mods.
///
/// # Thread Safety
///
/// The bus is fully thread-safe and is shared as `Arc<EventBus>`. All
/// operations are protected by async read-write locks.
///
/// # Dispatch Semantics
///
/// - Handler lookup is O(1) using a HashMap keyed by event name
/// - Multiple handlers for the same event run sequentially
/// - Failed handlers don't prevent other handlers from running
/// - Emitting an event nobody listens for is not an error
///
/// # Examples
///
/// ```rust,ignore
/// let events = create_event_bus();
///
/// events.on("startup_complete", |event: StartupCompleteEvent| {
///     println!("Host is up with {} mods", event.mod_count);
///     Ok(())
/// }).await?;
///
/// events.emit("startup_complete", &StartupCompleteEvent {
///     mod_count: 1,
///     timestamp: current_timestamp(),
/// }).await?;
/// ```
pub struct EventBus {
    /// Map of event names to their registered handlers
    handlers: RwLock<HashMap<String, Vec<Arc<dyn EventHandler>>>>,
    /// Bus statistics for monitoring
    stats: RwLock<EventBusStats>,
}

impl EventBus {
    /// Creates a new event bus with no registered handlers.
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
            stats: RwLock::new(EventBusStats::default()),
        }
    }

    /// Registers a typed handler for an event name.
    ///
    /// # Arguments
    ///
    /// * `event_name` - Name of the event (e.g., "startup_complete")
    /// * `handler` - Function to handle events of type T
    ///
    /// # Returns
    ///
    /// Returns `Ok(())` if registration succeeds, or `Err(EventError)` if it
    /// fails.
    pub async fn on<T, F>(&self, event_name: &str, handler: F) -> Result<(), EventError>
    where
        T: Event + 'static,
        F: Fn(T) -> Result<(), EventError> + Send + Sync + 'static,
    {
        let handler_name = format!("{}::{}", event_name, T::type_name());
        let typed_handler = TypedEventHandler::new(handler_name, handler);
        let handler_arc: Arc<dyn EventHandler> = Arc::new(typed_handler);

        let mut handlers = self.handlers.write().await;
        handlers
            .entry(event_name.to_string())
            .or_insert_with(Vec::new)
            .push(handler_arc);

        let mut stats = self.stats.write().await;
        stats.total_handlers += 1;

        info!("📝 Registered handler for {}", event_name);
        Ok(())
    }

    /// Emits an event to all registered handlers.
    ///
    /// The event is serialized once and then dispatched to every handler
    /// registered under `event_name`. Individual handler failures are logged
    /// but don't cause the emission to fail.
    ///
    /// # Arguments
    ///
    /// * `event_name` - Name of the event
    /// * `event` - The event instance to emit
    ///
    /// # Returns
    ///
    /// Returns `Ok(())` if emission succeeds, or `Err(EventError)` if
    /// serialization fails.
    pub async fn emit<T>(&self, event_name: &str, event: &T) -> Result<(), EventError>
    where
        T: Event,
    {
        let data = event.serialize()?;
        let handlers = self.handlers.read().await;

        if let Some(event_handlers) = handlers.get(event_name) {
            debug!(
                "📤 Emitting {} to {} handlers",
                event_name,
                event_handlers.len()
            );

            for handler in event_handlers {
                if let Err(e) = handler.handle(&data).await {
                    error!("❌ Handler {} failed: {}", handler.handler_name(), e);
                }
            }

            let mut stats = self.stats.write().await;
            stats.events_emitted += 1;
        } else {
            warn!("⚠️ No handlers for event: {}", event_name);
        }

        Ok(())
    }

    /// Returns current bus statistics.
    pub async fn get_stats(&self) -> EventBusStats {
        let stats = self.stats.read().await;
        stats.clone()
    }
}

/// Statistics about the event bus's usage.
///
/// # Examples
///
/// ```rust,ignore
/// let stats = events.get_stats().await;
/// println!("Handlers: {}, Events: {}", stats.total_handlers, stats.events_emitted);
/// ```
#[derive(Debug, Default, Clone)]
pub struct EventBusStats {
    /// Total number of registered event handlers
    pub total_handlers: usize,
    /// Total number of events emitted since bus creation
    pub events_emitted: u64,
}

// ============================================================================
// Host Lifecycle Events
// ============================================================================

/// Event emitted under the name `mod_loaded` when a mod completes
/// initialization.
///
/// This event signals that a mod has been loaded and its `on_init` hook has
/// returned successfully. It's typically used for:
/// - Logging load activity
/// - Tracking which mods are active
/// - Letting mods react to the presence of other mods
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModLoadedEvent {
    /// Identifier of the loaded mod
    pub mod_id: String,
    /// Human-readable name of the loaded mod
    pub display_name: String,
    /// Version string of the loaded mod
    pub version: String,
    /// Unix timestamp when the mod was loaded
    pub timestamp: u64,
}

/// Event emitted under the name `mod_unloaded` when a mod is unloaded.
///
/// Once this event fires the mod should no longer receive events or process
/// requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModUnloadedEvent {
    /// Identifier of the unloaded mod
    pub mod_id: String,
    /// Unix timestamp when the mod was unloaded
    pub timestamp: u64,
}

/// Event emitted under the name `startup_complete` once the host has loaded
/// and initialized every discovered mod.
///
/// Handlers registered during a mod's `register_handlers` phase are guaranteed
/// to observe this event, which makes it the natural place to hook "the host
/// is fully up" behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartupCompleteEvent {
    /// Number of mods that initialized successfully
    pub mod_count: usize,
    /// Unix timestamp when startup completed
    pub timestamp: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::current_timestamp;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Test event type for unit testing.
    #[derive(Debug, Serialize, Deserialize)]
    struct TestEvent {
        message: String,
    }

    #[tokio::test]
    async fn test_typed_dispatch_reaches_registered_handler() {
        let events = EventBus::new();
        let seen = Arc::new(AtomicUsize::new(0));
        let seen_clone = seen.clone();

        events
            .on("test_event", move |event: TestEvent| {
                assert_eq!(event.message, "hello");
                seen_clone.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .await
            .expect("Failed to register handler");

        events
            .emit(
                "test_event",
                &TestEvent {
                    message: "hello".to_string(),
                },
            )
            .await
            .expect("Failed to emit event");

        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_handler_failure_does_not_stop_others() {
        let events = EventBus::new();
        let seen = Arc::new(AtomicUsize::new(0));

        events
            .on("test_event", |_event: TestEvent| {
                Err(EventError::HandlerExecution("deliberate failure".to_string()))
            })
            .await
            .expect("Failed to register failing handler");

        let seen_clone = seen.clone();
        events
            .on("test_event", move |_event: TestEvent| {
                seen_clone.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .await
            .expect("Failed to register second handler");

        events
            .emit(
                "test_event",
                &TestEvent {
                    message: "still delivered".to_string(),
                },
            )
            .await
            .expect("Emission should succeed despite a failing handler");

        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_emit_without_handlers_is_not_an_error() {
        let events = EventBus::new();

        events
            .emit(
                "nobody_listens",
                &TestEvent {
                    message: "into the void".to_string(),
                },
            )
            .await
            .expect("Emitting with no handlers should succeed");

        let stats = events.get_stats().await;
        assert_eq!(stats.total_handlers, 0);
        assert_eq!(stats.events_emitted, 0);
    }

    #[tokio::test]
    async fn test_event_bus_stats() -> Result<(), Box<dyn std::error::Error>> {
        let events = EventBus::new();

        let initial_stats = events.get_stats().await;
        assert_eq!(initial_stats.total_handlers, 0);
        assert_eq!(initial_stats.events_emitted, 0);

        events.on("test1", |_event: TestEvent| Ok(())).await?;
        events.on("test2", |_event: TestEvent| Ok(())).await?;

        let stats_after_registration = events.get_stats().await;
        assert_eq!(stats_after_registration.total_handlers, 2);
        assert_eq!(stats_after_registration.events_emitted, 0);

        events
            .emit("test1", &TestEvent { message: "test".to_string() })
            .await?;
        events
            .emit("test2", &TestEvent { message: "test".to_string() })
            .await?;

        let final_stats = events.get_stats().await;
        assert_eq!(final_stats.total_handlers, 2);
        assert_eq!(final_stats.events_emitted, 2);

        Ok(())
    }

    #[tokio::test]
    async fn test_lifecycle_event_serialization() -> Result<(), Box<dyn std::error::Error>> {
        let loaded = ModLoadedEvent {
            mod_id: "template".to_string(),
            display_name: "Template Mod".to_string(),
            version: "1.0.0".to_string(),
            timestamp: current_timestamp(),
        };

        let serialized = <ModLoadedEvent as Event>::serialize(&loaded)?;
        let deserialized = <ModLoadedEvent as Event>::deserialize(&serialized)?;
        assert_eq!(loaded.mod_id, deserialized.mod_id);
        assert_eq!(loaded.display_name, deserialized.display_name);

        let startup = StartupCompleteEvent {
            mod_count: 3,
            timestamp: current_timestamp(),
        };

        let serialized = <StartupCompleteEvent as Event>::serialize(&startup)?;
        let deserialized = <StartupCompleteEvent as Event>::deserialize(&serialized)?;
        assert_eq!(startup.mod_count, deserialized.mod_count);

        Ok(())
    }
}
