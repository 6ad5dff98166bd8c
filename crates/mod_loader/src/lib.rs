//! Mod loading with safe dylib handling for manifest-described mods.
//!
//! Provides manifest-driven discovery, dynamic mod loading, two-phase
//! lifecycle management, and in-process registration for embedded and test
//! builds.

pub mod manifest;

pub use manifest::{platform_library_filename, ModManifest, MANIFEST_FILE_NAME};

use libloading::{Library, Symbol};
use mod_api::{
    create_event_bus, current_timestamp, EventBus, HostContext, LogLevel, Mod, ModError,
    ModLoadedEvent, ModUnloadedEvent,
};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

// ============================================================================
// Mod Manager
// ============================================================================

/// Manages loaded mods and their lifecycles.
///
/// Mods arrive through two paths: dynamic libraries discovered via `mod.toml`
/// manifests under the mods directory, and in-process instances handed to
/// [`ModManager::register_mod`]. Both paths run the same two-phase lifecycle:
/// every mod registers its event handlers before any mod initializes.
pub struct ModManager {
    /// Event bus shared across all mods
    events: Arc<EventBus>,
    /// Host context shared with mods
    host_context: Arc<HostContextImpl>,
    /// Loaded mods keyed by id
    mods: RwLock<HashMap<String, LoadedMod>>,
    /// Directory scanned for mod manifests
    mods_directory: PathBuf,
}

/// A loaded mod with its library and instance
struct LoadedMod {
    /// The mod instance
    instance: Box<dyn Mod>,
    /// The loaded library, kept alive to prevent unloading; `None` for mods
    /// registered in-process
    _library: Option<Library>,
    /// Mod metadata
    metadata: ModMetadata,
    /// Registered event handler count
    handler_count: usize,
}

/// A mod that has been created but not yet initialized
struct PartiallyLoadedMod {
    /// The mod instance
    instance: Box<dyn Mod>,
    /// The loaded library, if any
    library: Option<Library>,
    /// Mod metadata
    metadata: ModMetadata,
    /// Mod id (cached for convenience)
    id: String,
}

/// Mod metadata
#[derive(Debug, Clone)]
struct ModMetadata {
    id: String,
    name: String,
    version: String,
    path: Option<PathBuf>,
    loaded_at: std::time::SystemTime,
}

impl ModManager {
    /// Creates a new mod manager on the given bus, scanning the given
    /// directory for manifests.
    pub fn new(events: Arc<EventBus>, mods_directory: impl AsRef<Path>) -> Self {
        let host_context = Arc::new(HostContextImpl::new(events.clone()));

        Self {
            events,
            host_context,
            mods: RwLock::new(HashMap::new()),
            mods_directory: mods_directory.as_ref().to_path_buf(),
        }
    }

    /// Loads a mod instance from a discovered library but doesn't initialize
    /// it.
    async fn load_mod_instance(
        &self,
        discovery: &ModDiscovery,
    ) -> Result<PartiallyLoadedMod, ModError> {
        let library_path = &discovery.library_path;

        debug!("Loading mod instance from: {}", library_path.display());

        if !library_path.exists() {
            return Err(ModError::InitializationFailed(format!(
                "Mod library not found at {}",
                library_path.display()
            )));
        }

        // Load the dynamic library
        let library = unsafe {
            Library::new(library_path).map_err(|e| {
                ModError::InitializationFailed(format!("Failed to load library: {}", e))
            })?
        };

        // Get the mod creation function
        let create_mod: Symbol<unsafe extern "C" fn() -> *mut dyn Mod> = unsafe {
            library.get(b"create_mod").map_err(|e| {
                ModError::InitializationFailed(format!(
                    "Failed to find create_mod function: {}",
                    e
                ))
            })?
        };

        // Create the mod instance
        let mod_ptr = unsafe { create_mod() };
        if mod_ptr.is_null() {
            return Err(ModError::InitializationFailed(
                "create_mod returned null pointer".to_string(),
            ));
        }

        let instance = unsafe { Box::from_raw(mod_ptr) };

        // The manifest and the entry point must agree on who this is
        let mod_id = instance.id().to_string();
        if mod_id != discovery.manifest.id {
            return Err(ModError::Manifest(format!(
                "Manifest declares id '{}' but entry point reports '{}'",
                discovery.manifest.id, mod_id
            )));
        }

        if discovery.manifest.version != instance.version() {
            warn!(
                "Mod {} manifest declares version {} but entry point reports {}",
                mod_id,
                discovery.manifest.version,
                instance.version()
            );
        }

        // Check if the mod is already loaded
        {
            let mods = self.mods.read().await;
            if mods.contains_key(&mod_id) {
                return Err(ModError::ExecutionError(format!(
                    "Mod {} is already loaded",
                    mod_id
                )));
            }
        }

        let metadata = ModMetadata {
            id: mod_id.clone(),
            name: instance.display_name().to_string(),
            version: instance.version().to_string(),
            path: Some(library_path.clone()),
            loaded_at: std::time::SystemTime::now(),
        };

        debug!("Created mod instance: {} v{}", mod_id, metadata.version);

        Ok(PartiallyLoadedMod {
            instance,
            library: Some(library),
            metadata,
            id: mod_id,
        })
    }

    /// Registers an in-process mod instance and initializes it immediately.
    ///
    /// This is the path for hosts that compile their mods in statically (and
    /// for tests). The instance runs the same `pre_init` then `init` sequence
    /// as a dylib mod. Note that when several mods are registered one after
    /// another, earlier mods initialize before later mods have registered
    /// handlers; dylib deployments get whole-set ordering from
    /// [`ModManager::load_all_mods`].
    pub async fn register_mod(&self, instance: Box<dyn Mod>) -> Result<(), ModError> {
        let mod_id = instance.id().to_string();

        info!("Registering in-process mod: {}", mod_id);

        {
            let mods = self.mods.read().await;
            if mods.contains_key(&mod_id) {
                return Err(ModError::ExecutionError(format!(
                    "Mod {} is already loaded",
                    mod_id
                )));
            }
        }

        let metadata = ModMetadata {
            id: mod_id.clone(),
            name: instance.display_name().to_string(),
            version: instance.version().to_string(),
            path: None,
            loaded_at: std::time::SystemTime::now(),
        };

        let mut partial = PartiallyLoadedMod {
            instance,
            library: None,
            metadata,
            id: mod_id,
        };

        // Pre-initialization with handler counting
        let handler_count_before = self.get_total_handlers().await;

        partial
            .instance
            .pre_init(self.host_context.clone())
            .await
            .map_err(|e| {
                error!("Mod {} pre-initialization failed: {}", partial.id, e);
                e
            })?;

        let handlers_registered = self.get_total_handlers().await - handler_count_before;

        info!(
            "Mod {} pre-initialized successfully, registered {} handlers",
            partial.id, handlers_registered
        );

        // Initialize the mod
        partial
            .instance
            .init(self.host_context.clone())
            .await
            .map_err(|e| {
                error!("Mod {} initialization failed: {}", partial.id, e);
                e
            })?;

        info!("Mod {} initialized successfully", partial.id);

        self.store_loaded(partial, handlers_registered).await;
        Ok(())
    }

    /// Scans the mods directory for manifests.
    ///
    /// Every subdirectory containing a `mod.toml` is a candidate. Directories
    /// with malformed manifests are logged and skipped; they never abort the
    /// scan. A missing mods directory yields an empty list.
    pub async fn discover_mods(&self) -> Result<Vec<ModDiscovery>, ModError> {
        if !self.mods_directory.exists() {
            warn!(
                "Mods directory does not exist: {}",
                self.mods_directory.display()
            );
            return Ok(Vec::new());
        }

        let mut discoveries = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.mods_directory)
            .await
            .map_err(|e| {
                ModError::InitializationFailed(format!("Failed to read mods directory: {}", e))
            })?;

        while let Some(entry) = entries.next_entry().await.map_err(|e| {
            ModError::InitializationFailed(format!("Failed to read directory entry: {}", e))
        })? {
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }

            let manifest_path = path.join(MANIFEST_FILE_NAME);
            if !manifest_path.exists() {
                debug!("Skipping {}: no {}", path.display(), MANIFEST_FILE_NAME);
                continue;
            }

            let manifest = match ModManifest::load_from_file(&manifest_path).await {
                Ok(manifest) => manifest,
                Err(e) => {
                    error!("Skipping mod at {}: {}", path.display(), e);
                    continue;
                }
            };

            let library_path = path.join(platform_library_filename(&manifest.library));
            let is_loaded = {
                let mods = self.mods.read().await;
                mods.contains_key(&manifest.id)
            };

            discoveries.push(ModDiscovery {
                manifest,
                manifest_path,
                library_path,
                is_loaded,
            });
        }

        Ok(discoveries)
    }

    /// Loads all discovered mods with two-phase initialization: all `pre_init`
    /// first, then all `init`.
    ///
    /// A failing mod is quarantined and the rest continue; the returned list
    /// holds the ids that loaded successfully.
    pub async fn load_all_mods(&self) -> Result<Vec<String>, ModError> {
        let discoveries = self.discover_mods().await?;
        let mut partially_loaded: Vec<PartiallyLoadedMod> = Vec::new();
        let mut failed_mods = Vec::new();

        info!(
            "Starting two-phase mod loading for {} discovered mods",
            discoveries.len()
        );

        // Phase 1: Load libraries and create mod instances
        info!("Phase 1: Loading mod libraries and creating instances");
        for discovery in discoveries {
            if discovery.is_loaded {
                continue;
            }

            match self.load_mod_instance(&discovery).await {
                Ok(partial) => {
                    if partially_loaded.iter().any(|p| p.id == partial.id) {
                        error!(
                            "Duplicate mod id {} discovered at {}, skipping",
                            partial.id,
                            discovery.library_path.display()
                        );
                        failed_mods.push((
                            partial.id.clone(),
                            ModError::ExecutionError(format!(
                                "Mod {} is already loaded",
                                partial.id
                            )),
                        ));
                        continue;
                    }

                    info!("Loaded mod instance: {}", partial.id);
                    partially_loaded.push(partial);
                }
                Err(e) => {
                    error!(
                        "Failed to load mod instance {}: {}",
                        discovery.manifest.id, e
                    );
                    failed_mods.push((discovery.manifest.id.clone(), e));
                }
            }
        }

        info!(
            "Phase 1 complete: {} mod instances loaded",
            partially_loaded.len()
        );

        // Phase 2: Call pre_init on all mods (register all handlers)
        info!("Phase 2: Registering event handlers for all mods");
        let mut pre_init_failed = Vec::new();
        let mut handler_counts = Vec::new();

        for partial in &mut partially_loaded {
            let handler_count_before = self.get_total_handlers().await;

            match partial.instance.pre_init(self.host_context.clone()).await {
                Ok(()) => {
                    let handlers_registered =
                        self.get_total_handlers().await - handler_count_before;
                    handler_counts.push(handlers_registered);

                    info!(
                        "Mod {} pre-initialized successfully, registered {} handlers",
                        partial.id, handlers_registered
                    );
                }
                Err(e) => {
                    error!("Mod {} pre-initialization failed: {}", partial.id, e);
                    handler_counts.push(0);
                    pre_init_failed.push((partial.id.clone(), e));
                }
            }
        }

        // Remove failed mods, keeping each instance welded to its handler count
        let pre_initialized: Vec<(PartiallyLoadedMod, usize)> = partially_loaded
            .into_iter()
            .zip(handler_counts.into_iter())
            .filter(|(p, _)| !pre_init_failed.iter().any(|(id, _)| id == &p.id))
            .collect();
        failed_mods.extend(pre_init_failed);

        info!(
            "Phase 2 complete: {} mods pre-initialized",
            pre_initialized.len()
        );

        // Phase 3: Call init on all successfully pre-initialized mods
        info!("Phase 3: Initializing all mods");
        let mut loaded_mods = Vec::new();
        let mut init_failed = Vec::new();

        for (mut partial, handler_count) in pre_initialized {
            match partial.instance.init(self.host_context.clone()).await {
                Ok(()) => {
                    info!("Mod {} initialized successfully", partial.id);

                    let id = partial.id.clone();
                    self.store_loaded(partial, handler_count).await;
                    loaded_mods.push(id);
                }
                Err(e) => {
                    error!("Mod {} initialization failed: {}", partial.id, e);
                    init_failed.push((partial.id, e));
                }
            }
        }

        failed_mods.extend(init_failed);

        if !failed_mods.is_empty() {
            warn!("Failed to load {} mods", failed_mods.len());
            for (id, error) in failed_mods {
                warn!("  {}: {}", id, error);
            }
        }

        info!(
            "Two-phase loading complete: {} mods loaded successfully from {}",
            loaded_mods.len(),
            self.mods_directory.display()
        );

        Ok(loaded_mods)
    }

    /// Stores a fully initialized mod and announces it on the bus.
    async fn store_loaded(&self, partial: PartiallyLoadedMod, handler_count: usize) {
        let PartiallyLoadedMod {
            instance,
            library,
            metadata,
            id,
        } = partial;

        let display_name = metadata.name.clone();
        let version = metadata.version.clone();

        let loaded = LoadedMod {
            instance,
            _library: library,
            metadata,
            handler_count,
        };

        {
            let mut mods = self.mods.write().await;
            mods.insert(id.clone(), loaded);
        }

        // Emit mod loaded event
        self.events
            .emit(
                "mod_loaded",
                &ModLoadedEvent {
                    mod_id: id,
                    display_name,
                    version,
                    timestamp: current_timestamp(),
                },
            )
            .await
            .map_err(|e| {
                warn!("Failed to emit mod loaded event: {}", e);
            })
            .ok();
    }

    /// Unloads a specific mod.
    pub async fn unload_mod(&self, mod_id: &str) -> Result<(), ModError> {
        let mut mods = self.mods.write().await;

        if let Some(mut loaded) = mods.remove(mod_id) {
            info!("Unloading mod: {}", mod_id);

            // Shutdown the mod
            if let Err(e) = loaded.instance.shutdown(self.host_context.clone()).await {
                error!("Error shutting down mod {}: {}", mod_id, e);
            }

            // Emit mod unloaded event
            self.events
                .emit(
                    "mod_unloaded",
                    &ModUnloadedEvent {
                        mod_id: mod_id.to_string(),
                        timestamp: current_timestamp(),
                    },
                )
                .await
                .map_err(|e| {
                    warn!("Failed to emit mod unloaded event: {}", e);
                })
                .ok();

            info!("Mod {} unloaded successfully", mod_id);
            Ok(())
        } else {
            Err(ModError::NotFound(mod_id.to_string()))
        }
    }

    /// Shuts down all mods.
    pub async fn shutdown_all(&self) -> Result<(), ModError> {
        let mut mods = self.mods.write().await;
        let mod_ids: Vec<String> = mods.keys().cloned().collect();

        info!("Shutting down {} mods", mod_ids.len());

        for mod_id in mod_ids {
            if let Some(mut loaded) = mods.remove(&mod_id) {
                if let Err(e) = loaded.instance.shutdown(self.host_context.clone()).await {
                    error!("Error shutting down mod {}: {}", mod_id, e);
                }
            }
        }

        info!("All mods shut down");
        Ok(())
    }

    /// Returns statistics for the manager and every loaded mod.
    pub async fn get_stats(&self) -> ModSystemStats {
        let mods = self.mods.read().await;
        let bus_stats = self.events.get_stats().await;

        ModSystemStats {
            total_mods: mods.len(),
            total_handlers: bus_stats.total_handlers,
            events_emitted: bus_stats.events_emitted,
            mods: mods
                .iter()
                .map(|(id, loaded)| ModStats {
                    id: id.clone(),
                    name: loaded.metadata.name.clone(),
                    version: loaded.metadata.version.clone(),
                    handler_count: loaded.handler_count,
                    loaded_at: loaded.metadata.loaded_at,
                })
                .collect(),
        }
    }

    /// Returns the ids of all loaded mods.
    pub async fn get_loaded_mods(&self) -> Vec<String> {
        let mods = self.mods.read().await;
        mods.keys().cloned().collect()
    }

    /// Returns information about a loaded mod.
    pub async fn get_mod_info(&self, mod_id: &str) -> Option<ModInfo> {
        let mods = self.mods.read().await;
        mods.get(mod_id).map(|loaded| ModInfo {
            id: loaded.metadata.id.clone(),
            name: loaded.metadata.name.clone(),
            version: loaded.metadata.version.clone(),
            path: loaded.metadata.path.clone(),
            loaded_at: loaded.metadata.loaded_at,
        })
    }

    /// Total handlers currently registered on the bus.
    async fn get_total_handlers(&self) -> usize {
        self.events.get_stats().await.total_handlers
    }
}

// ============================================================================
// Host Context Implementation
// ============================================================================

/// Host context backed by the shared event bus and the host's `tracing`
/// pipeline.
pub struct HostContextImpl {
    events: Arc<EventBus>,
}

impl HostContextImpl {
    pub fn new(events: Arc<EventBus>) -> Self {
        Self { events }
    }
}

impl HostContext for HostContextImpl {
    fn events(&self) -> Arc<EventBus> {
        self.events.clone()
    }

    fn log(&self, level: LogLevel, message: &str) {
        match level {
            LogLevel::Error => error!("{}", message),
            LogLevel::Warn => warn!("{}", message),
            LogLevel::Info => info!("{}", message),
            LogLevel::Debug => debug!("{}", message),
            LogLevel::Trace => tracing::trace!("{}", message),
        }
    }
}

// ============================================================================
// Discovery, Statistics, and Info Types
// ============================================================================

/// A mod found on disk, described by its manifest.
#[derive(Debug, Clone)]
pub struct ModDiscovery {
    /// The parsed manifest
    pub manifest: ModManifest,
    /// Where the manifest was read from
    pub manifest_path: PathBuf,
    /// Resolved platform-specific library path next to the manifest
    pub library_path: PathBuf,
    /// Whether a mod with this id is already loaded
    pub is_loaded: bool,
}

/// Statistics for the whole mod system.
#[derive(Debug, Clone)]
pub struct ModSystemStats {
    pub total_mods: usize,
    pub total_handlers: usize,
    pub events_emitted: u64,
    pub mods: Vec<ModStats>,
}

/// Statistics for a single loaded mod.
#[derive(Debug, Clone)]
pub struct ModStats {
    pub id: String,
    pub name: String,
    pub version: String,
    pub handler_count: usize,
    pub loaded_at: std::time::SystemTime,
}

/// Information about a loaded mod.
#[derive(Debug, Clone)]
pub struct ModInfo {
    pub id: String,
    pub name: String,
    pub version: String,
    /// Library path for dylib mods, `None` for in-process registrations
    pub path: Option<PathBuf>,
    pub loaded_at: std::time::SystemTime,
}

// ============================================================================
// Utility Functions
// ============================================================================

/// Creates a mod manager with its own event bus.
pub fn create_mod_manager(mods_directory: impl AsRef<Path>) -> ModManager {
    let events = create_event_bus();
    ModManager::new(events, mods_directory)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use mod_api::{ModWrapper, StartupCompleteEvent};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// Shared probes so tests can observe a mod instance after it moves into
    /// the manager.
    #[derive(Clone, Default)]
    struct TestModState {
        init_calls: Arc<AtomicUsize>,
        handlers_seen_at_init: Arc<AtomicUsize>,
        shut_down: Arc<AtomicBool>,
        startup_events: Arc<AtomicUsize>,
    }

    /// Mock mod for testing the manager directly against the low-level trait.
    struct TestMod {
        id: String,
        state: TestModState,
    }

    impl TestMod {
        fn new(id: &str) -> (Self, TestModState) {
            let state = TestModState::default();
            (
                Self {
                    id: id.to_string(),
                    state: state.clone(),
                },
                state,
            )
        }
    }

    #[async_trait]
    impl Mod for TestMod {
        fn id(&self) -> &str {
            &self.id
        }

        fn display_name(&self) -> &str {
            "Test Mod"
        }

        fn version(&self) -> &str {
            "1.0.0"
        }

        async fn pre_init(&mut self, context: Arc<dyn HostContext>) -> Result<(), ModError> {
            let startup_events = self.state.startup_events.clone();
            context
                .events()
                .on("startup_complete", move |_event: StartupCompleteEvent| {
                    startup_events.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                })
                .await
                .map_err(|e| ModError::ExecutionError(e.to_string()))
        }

        async fn init(&mut self, context: Arc<dyn HostContext>) -> Result<(), ModError> {
            self.state.init_calls.fetch_add(1, Ordering::SeqCst);

            // Snapshot how many handlers were on the bus when init ran
            let stats = context.events().get_stats().await;
            self.state
                .handlers_seen_at_init
                .store(stats.total_handlers, Ordering::SeqCst);

            context.log(LogLevel::Info, "Test mod initialized");
            Ok(())
        }

        async fn shutdown(&mut self, _context: Arc<dyn HostContext>) -> Result<(), ModError> {
            self.state.shut_down.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    fn write_manifest(dir: &Path, id: &str, library: &str) {
        std::fs::create_dir_all(dir).expect("Failed to create mod directory");
        std::fs::write(
            dir.join(MANIFEST_FILE_NAME),
            format!(
                "id = \"{}\"\nname = \"Some Mod\"\nversion = \"1.0.0\"\nlibrary = \"{}\"\n",
                id, library
            ),
        )
        .expect("Failed to write manifest");
    }

    #[tokio::test]
    async fn test_mod_manager_creation() {
        let manager = create_mod_manager("./test_mods");

        let loaded = manager.get_loaded_mods().await;
        assert!(loaded.is_empty());
    }

    #[tokio::test]
    async fn test_discovery_of_missing_directory_is_empty() {
        let manager = create_mod_manager("./does_not_exist_anywhere");

        let discoveries = manager
            .discover_mods()
            .await
            .expect("missing directory should not be an error");
        assert!(discoveries.is_empty());
    }

    #[tokio::test]
    async fn test_discovery_skips_entries_without_manifest() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        std::fs::create_dir(dir.path().join("not_a_mod")).expect("Failed to create subdir");
        std::fs::write(dir.path().join("stray_file.txt"), "hello").expect("Failed to write file");

        let manager = create_mod_manager(dir.path());
        let discoveries = manager.discover_mods().await.expect("discovery failed");
        assert!(discoveries.is_empty());
    }

    #[tokio::test]
    async fn test_discovery_reads_valid_manifest() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        write_manifest(&dir.path().join("template_mod"), "template", "template_mod");

        let manager = create_mod_manager(dir.path());
        let discoveries = manager.discover_mods().await.expect("discovery failed");

        assert_eq!(discoveries.len(), 1);
        let discovery = &discoveries[0];
        assert_eq!(discovery.manifest.id, "template");
        assert!(!discovery.is_loaded);
        assert_eq!(
            discovery.library_path.file_name().and_then(|n| n.to_str()),
            Some(platform_library_filename("template_mod").as_str())
        );
    }

    #[tokio::test]
    async fn test_discovery_skips_invalid_manifest() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        write_manifest(&dir.path().join("good_mod"), "good", "good_mod");

        let bad_dir = dir.path().join("bad_mod");
        std::fs::create_dir_all(&bad_dir).expect("Failed to create bad mod dir");
        std::fs::write(bad_dir.join(MANIFEST_FILE_NAME), "id = \"Bad Id\"")
            .expect("Failed to write bad manifest");

        let manager = create_mod_manager(dir.path());
        let discoveries = manager.discover_mods().await.expect("discovery failed");

        assert_eq!(discoveries.len(), 1);
        assert_eq!(discoveries[0].manifest.id, "good");
    }

    #[tokio::test]
    async fn test_register_mod_lifecycle() {
        let events = create_event_bus();
        let manager = ModManager::new(events.clone(), "./test_mods");

        let (test_mod, state) = TestMod::new("test_mod");
        manager
            .register_mod(Box::new(test_mod))
            .await
            .expect("registration should succeed");

        // init ran exactly once, and only after pre_init registered handlers
        assert_eq!(state.init_calls.load(Ordering::SeqCst), 1);
        assert_eq!(state.handlers_seen_at_init.load(Ordering::SeqCst), 1);
        assert_eq!(manager.get_loaded_mods().await, vec!["test_mod".to_string()]);

        let stats = manager.get_stats().await;
        assert_eq!(stats.total_mods, 1);
        assert_eq!(stats.total_handlers, 1);
        assert!(stats
            .mods
            .iter()
            .any(|m| m.id == "test_mod" && m.handler_count == 1));

        // The handler registered in pre_init observes the startup event
        events
            .emit(
                "startup_complete",
                &StartupCompleteEvent {
                    mod_count: 1,
                    timestamp: current_timestamp(),
                },
            )
            .await
            .expect("emission failed");
        assert_eq!(state.startup_events.load(Ordering::SeqCst), 1);

        manager
            .unload_mod("test_mod")
            .await
            .expect("unload should succeed");
        assert!(state.shut_down.load(Ordering::SeqCst));
        assert!(manager.get_loaded_mods().await.is_empty());
    }

    #[tokio::test]
    async fn test_register_duplicate_id_is_rejected() {
        let manager = create_mod_manager("./test_mods");

        let (first, _) = TestMod::new("twice");
        let (second, _) = TestMod::new("twice");

        manager
            .register_mod(Box::new(first))
            .await
            .expect("first registration should succeed");

        let result = manager.register_mod(Box::new(second)).await;
        match result {
            Err(ModError::ExecutionError(message)) => {
                assert!(message.contains("already loaded"));
            }
            other => panic!("Expected duplicate rejection, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unload_unknown_mod_is_not_found() {
        let manager = create_mod_manager("./test_mods");

        let result = manager.unload_mod("ghost").await;
        assert!(matches!(result, Err(ModError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_load_all_mods_with_empty_directory() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let manager = create_mod_manager(dir.path());

        let loaded = manager.load_all_mods().await.expect("load_all failed");
        assert!(loaded.is_empty());

        let stats = manager.get_stats().await;
        assert_eq!(stats.total_mods, 0);
    }

    #[tokio::test]
    async fn test_load_all_skips_mod_with_missing_library() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        write_manifest(&dir.path().join("phantom"), "phantom", "phantom_mod");

        let manager = create_mod_manager(dir.path());

        // Discovered, but there's no compiled library next to the manifest
        let discoveries = manager.discover_mods().await.expect("discovery failed");
        assert_eq!(discoveries.len(), 1);

        let loaded = manager.load_all_mods().await.expect("load_all failed");
        assert!(loaded.is_empty());
        assert!(manager.get_loaded_mods().await.is_empty());
    }

    #[tokio::test]
    async fn test_shutdown_all_empties_the_manager() {
        let manager = create_mod_manager("./test_mods");

        let (first, first_state) = TestMod::new("first");
        let (second, second_state) = TestMod::new("second");
        manager
            .register_mod(Box::new(first))
            .await
            .expect("first registration failed");
        manager
            .register_mod(Box::new(second))
            .await
            .expect("second registration failed");

        manager.shutdown_all().await.expect("shutdown_all failed");

        assert!(first_state.shut_down.load(Ordering::SeqCst));
        assert!(second_state.shut_down.load(Ordering::SeqCst));
        assert!(manager.get_loaded_mods().await.is_empty());
    }

    #[tokio::test]
    async fn test_host_context_exposes_the_shared_bus() {
        let events = create_event_bus();
        let context = HostContextImpl::new(events.clone());

        assert!(Arc::ptr_eq(&context.events(), &events));

        // Smoke the level mapping
        context.log(LogLevel::Info, "host context test");
        context.log(LogLevel::Trace, "host context test");
    }

    #[tokio::test]
    async fn test_template_mod_full_lifecycle() {
        let events = create_event_bus();
        let manager = ModManager::new(events.clone(), "./test_mods");

        manager
            .register_mod(Box::new(ModWrapper::new(template_mod::TemplateMod::new())))
            .await
            .expect("template mod should load");

        assert_eq!(
            manager.get_loaded_mods().await,
            vec![template_mod::MOD_ID.to_string()]
        );

        let info = manager
            .get_mod_info(template_mod::MOD_ID)
            .await
            .expect("mod info should exist");
        assert_eq!(info.name, template_mod::MOD_NAME);
        assert!(info.path.is_none());

        // The startup hook registered during pre_init fires on emission
        events
            .emit(
                "startup_complete",
                &StartupCompleteEvent {
                    mod_count: 1,
                    timestamp: current_timestamp(),
                },
            )
            .await
            .expect("startup emission failed");

        let stats = manager.get_stats().await;
        assert_eq!(stats.total_mods, 1);
        assert_eq!(stats.total_handlers, 1);
        assert_eq!(stats.events_emitted, 1);

        manager.shutdown_all().await.expect("shutdown failed");
        assert!(manager.get_loaded_mods().await.is_empty());
    }
}
