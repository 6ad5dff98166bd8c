//! Main application entry point for the mod host
//!
//! Provides CLI interface, configuration loading, and host startup driving
//! mod discovery and the two-phase mod lifecycle.

use clap::{Arg, Command};
use mod_api::{create_event_bus, current_timestamp, EventBus, StartupCompleteEvent};
use mod_loader::ModManager;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

// ============================================================================
// Configuration
// ============================================================================

/// Application configuration loaded from TOML file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Mod configuration
    pub mods: ModSettings,
    /// Logging configuration
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModSettings {
    /// Mod directory
    pub directory: String,
    /// Auto-load mods on startup
    pub auto_load: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level filter
    pub level: String,
    /// JSON formatting
    pub json_format: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            mods: ModSettings {
                directory: "mods".to_string(),
                auto_load: true,
            },
            logging: LoggingSettings {
                level: "info".to_string(),
                json_format: false,
            },
        }
    }
}

impl AppConfig {
    /// Load configuration from file
    pub async fn load_from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        if path.exists() {
            let content = tokio::fs::read_to_string(path).await?;
            let config: AppConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            // Create default config file
            let default_config = AppConfig::default();
            let toml_content = toml::to_string_pretty(&default_config)?;
            tokio::fs::write(path, toml_content).await?;
            info!("Created default configuration file: {}", path.display());
            Ok(default_config)
        }
    }

    /// Apply command line overrides on top of the file configuration
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(mods_dir) = &args.mods_dir {
            self.mods.directory = mods_dir.to_string_lossy().to_string();
        }

        if let Some(log_level) = &args.log_level {
            self.logging.level = log_level.clone();
        }

        if args.json_logs {
            self.logging.json_format = true;
        }
    }

    /// Configuration validation
    pub fn validate(&self) -> Result<(), String> {
        // Validate mods directory
        if self.mods.directory.is_empty() {
            return Err("Mods directory cannot be empty".to_string());
        }

        // Validate log level
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(format!(
                "Invalid log level: {}. Must be one of: {:?}",
                self.logging.level, valid_levels
            ));
        }

        Ok(())
    }
}

// ============================================================================
// CLI Interface
// ============================================================================

/// Command line arguments
#[derive(Debug, Clone)]
pub struct CliArgs {
    pub config_path: PathBuf,
    pub mods_dir: Option<PathBuf>,
    pub log_level: Option<String>,
    pub json_logs: bool,
}

impl CliArgs {
    /// Parse command line arguments
    pub fn parse() -> Self {
        let matches = Command::new("Mod Host")
            .version(env!("CARGO_PKG_VERSION"))
            .about("Development host that loads mods and drives their lifecycle")
            .arg(
                Arg::new("config")
                    .short('c')
                    .long("config")
                    .value_name("FILE")
                    .help("Configuration file path")
                    .default_value("config.toml"),
            )
            .arg(
                Arg::new("mods")
                    .short('m')
                    .long("mods")
                    .value_name("DIR")
                    .help("Mods directory path"),
            )
            .arg(
                Arg::new("log-level")
                    .short('l')
                    .long("log-level")
                    .value_name("LEVEL")
                    .help("Log level (trace, debug, info, warn, error)"),
            )
            .arg(
                Arg::new("json-logs")
                    .long("json-logs")
                    .help("Output logs in JSON format")
                    .action(clap::ArgAction::SetTrue),
            )
            .get_matches();

        Self {
            config_path: PathBuf::from(
                matches
                    .get_one::<String>("config")
                    .expect("Default config path should always be set"),
            ),
            mods_dir: matches.get_one::<String>("mods").map(PathBuf::from),
            log_level: matches.get_one::<String>("log-level").cloned(),
            json_logs: matches.get_flag("json-logs"),
        }
    }
}

// ============================================================================
// Logging Setup
// ============================================================================

/// Initialize logging system
fn setup_logging(
    config: &LoggingSettings,
    json_format: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let log_level = config.level.as_str();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if json_format || config.json_format {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_file(false)
                    .with_line_number(false)
                    .with_thread_ids(true)
                    .with_thread_names(true),
            )
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_file(false)
                    .with_line_number(false)
                    .with_thread_ids(true)
                    .with_thread_names(true),
            )
            .init();
    }

    info!("🔧 Logging initialized with level: {}", log_level);
    Ok(())
}

// ============================================================================
// Signal Handling
// ============================================================================

/// Setup graceful shutdown signal handling
async fn setup_signal_handlers() -> Result<(), Box<dyn std::error::Error>> {
    #[cfg(unix)]
    {
        use signal::unix::{signal, SignalKind};

        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigterm = signal(SignalKind::terminate())?;

        tokio::select! {
            _ = sigint.recv() => {
                info!("📡 Received SIGINT");
            }
            _ = sigterm.recv() => {
                info!("📡 Received SIGTERM");
            }
        }
    }

    #[cfg(windows)]
    {
        signal::ctrl_c().await?;
        info!("📡 Received Ctrl+C");
    }

    Ok(())
}

// ============================================================================
// Application
// ============================================================================

/// Main application struct tying configuration, the event bus, and the mod
/// manager together
pub struct Application {
    config: AppConfig,
    events: Arc<EventBus>,
    manager: ModManager,
}

impl Application {
    /// Create new application from parsed arguments
    pub async fn new(args: CliArgs) -> Result<Self, Box<dyn std::error::Error>> {
        // Load configuration first (before logging setup)
        let mut config = AppConfig::load_from_file(&args.config_path).await?;

        config.apply_cli_overrides(&args);

        // Validate configuration
        if let Err(e) = config.validate() {
            return Err(format!("Configuration validation failed: {}", e).into());
        }

        // Setup logging
        setup_logging(&config.logging, args.json_logs)?;

        let events = create_event_bus();
        let manager = ModManager::new(events.clone(), &config.mods.directory);

        // Log startup information
        info!("🚀 Mod Host v{}", env!("CARGO_PKG_VERSION"));
        info!(
            "📂 Config: {} | Mods: {}",
            args.config_path.display(),
            config.mods.directory
        );

        Ok(Self {
            config,
            events,
            manager,
        })
    }

    /// Run the application until a shutdown signal arrives
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        info!("📋 Configuration Summary:");
        info!("  - Mods directory: {}", self.config.mods.directory);
        info!("  - Auto-load: {}", self.config.mods.auto_load);

        let loaded = if self.config.mods.auto_load {
            self.manager.load_all_mods().await?
        } else {
            info!("Auto-load disabled, no mods loaded at startup");
            Vec::new()
        };

        // Handlers registered during pre_init are guaranteed to observe this
        self.events
            .emit(
                "startup_complete",
                &StartupCompleteEvent {
                    mod_count: loaded.len(),
                    timestamp: current_timestamp(),
                },
            )
            .await
            .map_err(|e| format!("Failed to emit startup event: {}", e))?;

        info!("✅ Mod host is now running with {} mods", loaded.len());
        info!("🛑 Press Ctrl+C to gracefully shutdown");

        setup_signal_handlers().await?;

        info!("Shutdown signal received, initiating graceful shutdown...");

        self.manager.shutdown_all().await?;

        let final_stats = self.manager.get_stats().await;
        info!("📊 Final Statistics:");
        info!("  - Events emitted: {}", final_stats.events_emitted);
        info!("  - Handlers registered: {}", final_stats.total_handlers);

        info!("✅ Mod host shutdown complete");

        Ok(())
    }
}

// ============================================================================
// Entry Point
// ============================================================================

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse CLI arguments
    let args = CliArgs::parse();

    // Create and run application
    match Application::new(args).await {
        Ok(app) => {
            if let Err(e) = app.run().await {
                error!("❌ Application error: {:?}", e);
                std::process::exit(1);
            }
        }
        Err(e) => {
            eprintln!("❌ Failed to start application: {:?}", e);
            std::process::exit(1);
        }
    }

    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
