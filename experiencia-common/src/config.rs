//! Configuration loading and root folder resolution
//!
//! Bootstrap configuration only: where the data lives, which port to bind,
//! how loudly to log. Missing or unreadable config files never abort startup;
//! the caller gets compiled defaults and a warning.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "EXPERIENCIA_ROOT_FOLDER";

/// Default HTTP port
pub const DEFAULT_PORT: u16 = 8080;

/// Default application name, used as the prefix of alert headers
pub const DEFAULT_APPLICATION_NAME: &str = "experienciaApp";

/// Built-in defaults for the current platform
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub root_folder: PathBuf,
    pub log_level: String,
    pub port: u16,
}

impl CompiledDefaults {
    pub fn for_current_platform() -> Self {
        Self {
            root_folder: default_root_folder(),
            log_level: default_log_level(),
            port: DEFAULT_PORT,
        }
    }
}

/// OS-dependent default root folder path
fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/experiencia (or /var/lib/experiencia for system-wide)
        dirs::data_local_dir()
            .map(|d| d.join("experiencia"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/experiencia"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join("experiencia"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/experiencia"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("experiencia"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\experiencia"))
    } else {
        PathBuf::from("./experiencia_data")
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_application_name() -> String {
    DEFAULT_APPLICATION_NAME.to_string()
}

fn default_database_file() -> String {
    "experiencia.db".to_string()
}

fn default_search_file() -> String {
    "search.db".to_string()
}

/// Bootstrap configuration loaded from TOML
///
/// Every field has a default so an empty file is a valid config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Folder holding the primary database and the search index
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Prefix for `X-{app}-alert` style headers
    #[serde(default = "default_application_name")]
    pub application_name: String,

    /// Primary database file name, relative to the root folder
    #[serde(default = "default_database_file")]
    pub database_file: String,

    /// Search index file name, relative to the root folder
    #[serde(default = "default_search_file")]
    pub search_file: String,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            root_folder: None,
            port: default_port(),
            application_name: default_application_name(),
            database_file: default_database_file(),
            search_file: default_search_file(),
            logging: LoggingConfig::default(),
        }
    }
}

impl TomlConfig {
    /// Parse a TOML config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Invalid config file {}: {}", path.display(), e)))
    }

    /// Load the config file if one is available, otherwise fall back to defaults
    ///
    /// An explicit path that cannot be read is reported with a warning, not an error.
    pub fn load_or_default(explicit: Option<&Path>) -> Self {
        let (config, source) = Self::load_with_source(explicit);
        source.log();
        config
    }

    /// Like [`TomlConfig::load_or_default`] but without logging
    ///
    /// Startup loads the config before the subscriber exists; the returned
    /// [`ConfigSource`] is logged once it does.
    pub fn load_with_source(explicit: Option<&Path>) -> (Self, ConfigSource) {
        let path = match explicit {
            Some(p) => Some(p.to_path_buf()),
            None => find_config_file(),
        };

        match path {
            Some(path) => match Self::load(&path) {
                Ok(config) => (config, ConfigSource::File(path)),
                Err(e) => (Self::default(), ConfigSource::Fallback(e.to_string())),
            },
            None => (Self::default(), ConfigSource::Defaults),
        }
    }
}

/// Where the effective configuration came from
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigSource {
    File(PathBuf),
    /// No config file found
    Defaults,
    /// A config file was found but could not be used
    Fallback(String),
}

impl ConfigSource {
    pub fn log(&self) {
        match self {
            ConfigSource::File(path) => info!("Loaded configuration from {}", path.display()),
            ConfigSource::Defaults => info!("No config file found - using built-in defaults"),
            ConfigSource::Fallback(reason) => warn!("{} - using built-in defaults", reason),
        }
    }
}

/// Locate the platform config file, if one exists
///
/// Linux checks `~/.config/experiencia/config.toml` then `/etc/experiencia/config.toml`.
pub fn find_config_file() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("experiencia").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/experiencia/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// Root folder resolution, highest priority first:
/// 1. Command-line argument
/// 2. `EXPERIENCIA_ROOT_FOLDER` environment variable
/// 3. `root_folder` in the TOML config
/// 4. OS-dependent compiled default
#[derive(Debug, Clone, Default)]
pub struct RootFolderResolver {
    cli_arg: Option<PathBuf>,
    config_value: Option<PathBuf>,
}

impl RootFolderResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cli_arg(mut self, path: Option<PathBuf>) -> Self {
        self.cli_arg = path;
        self
    }

    pub fn with_config(mut self, config: &TomlConfig) -> Self {
        self.config_value = config.root_folder.clone();
        self
    }

    pub fn resolve(&self) -> PathBuf {
        if let Some(path) = &self.cli_arg {
            return path.clone();
        }

        if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
            if !path.is_empty() {
                return PathBuf::from(path);
            }
        }

        if let Some(path) = &self.config_value {
            return path.clone();
        }

        default_root_folder()
    }
}

/// Prepares the resolved root folder and derives data file paths
#[derive(Debug, Clone)]
pub struct RootFolderInitializer {
    root: PathBuf,
    database_file: String,
    search_file: String,
}

impl RootFolderInitializer {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            database_file: default_database_file(),
            search_file: default_search_file(),
        }
    }

    /// Take file names from the config instead of the defaults
    pub fn with_config(mut self, config: &TomlConfig) -> Self {
        self.database_file = config.database_file.clone();
        self.search_file = config.search_file.clone();
        self
    }

    /// Create the root folder (and parents) if missing; idempotent
    pub fn ensure_directory_exists(&self) -> Result<()> {
        if !self.root.exists() {
            std::fs::create_dir_all(&self.root)?;
            info!("Created root folder: {}", self.root.display());
        }
        Ok(())
    }

    pub fn database_path(&self) -> PathBuf {
        self.root.join(&self.database_file)
    }

    pub fn search_index_path(&self) -> PathBuf {
        self.root.join(&self.search_file)
    }

    pub fn database_exists(&self) -> bool {
        self.database_path().exists()
    }
}
