//! Configuration system using TOML files.
//!
//! Config is stored in the OS-standard config directory:
//! - Windows: %APPDATA%\deckready\config.toml
//! - macOS: ~/Library/Application Support/deckready/config.toml
//! - Linux: ~/.config/deckready/config.toml
//!
//! Every field has a default, so a partial file (or none at all) is fine.
//! Command-line flags override whatever is loaded here.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::download::{CommandTemplate, QualityTier};
use crate::library::LibraryLayout;
use crate::normalize::InputOrder;

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Organised AIFF library
    pub library: LibraryConfig,

    /// External downloader and its working directory
    pub downloader: DownloaderConfig,

    /// Resolution defaults
    pub resolve: ResolveConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
    /// Root of the organised library
    pub root: PathBuf,

    pub layout: LibraryLayout,

    /// File accepted downloads into the library
    pub organise: bool,

    /// Converter program used for non-AIFF downloads
    pub converter: String,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            root: dirs::audio_dir()
                .map(|d| d.join("Organised AIFF"))
                .unwrap_or_else(|| PathBuf::from("organised")),
            layout: LibraryLayout::default(),
            organise: true,
            converter: "ffmpeg".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloaderConfig {
    /// Where the downloader writes, and where run logs live
    pub dir: PathBuf,

    pub program: String,

    /// Argument template; `{query}`, `{quality}`, `{quality_code}` and
    /// `{dir}` are substituted per invocation
    pub args: Vec<String>,
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        let template = CommandTemplate::default();
        Self {
            dir: dirs::download_dir()
                .map(|d| d.join("deckready"))
                .unwrap_or_else(|| PathBuf::from("downloads")),
            program: template.program,
            args: template.args,
        }
    }
}

impl DownloaderConfig {
    pub fn template(&self) -> CommandTemplate {
        CommandTemplate {
            program: self.program.clone(),
            args: self.args.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolveConfig {
    /// Pin a single quality tier (disables fallback)
    pub quality: Option<QualityTier>,

    /// Which side of "A - B" holds the title
    pub order: InputOrder,
}

// ============================================================================
// Config File Operations
// ============================================================================

/// Get the config directory path
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("deckready"))
}

/// Get the full path to the config file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("config.toml"))
}

/// Load configuration from disk
///
/// Returns default config if file doesn't exist or can't be parsed.
/// Logs warnings but doesn't fail - we always return a usable config.
pub fn load() -> Config {
    let Some(path) = config_path() else {
        tracing::warn!("Could not determine config directory, using defaults");
        return Config::default();
    };

    if !path.exists() {
        tracing::debug!("No config file found at {:?}, using defaults", path);
        return Config::default();
    }

    match load_from(&path) {
        Ok(config) => {
            tracing::debug!("Loaded config from {:?}", path);
            config
        }
        Err(e) => {
            tracing::error!("{}", e);
            tracing::warn!("Using default configuration");
            Config::default()
        }
    }
}

/// Load and parse a specific config file.
pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
    let contents =
        std::fs::read_to_string(path).map_err(|e| ConfigError::Read(path.to_path_buf(), e))?;
    toml::from_str(&contents).map_err(|e| ConfigError::Parse(path.to_path_buf(), e))
}

/// Save configuration to the default location
///
/// Creates the config directory if it doesn't exist.
pub fn save(config: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path().ok_or(ConfigError::NoConfigDir)?;
    save_to(config, &path)?;
    Ok(path)
}

/// Save configuration to `path`, atomically.
pub fn save_to(config: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|e| ConfigError::CreateDir(dir.to_path_buf(), e))?;
    }

    // Serialize to pretty TOML
    let contents = toml::to_string_pretty(config).map_err(ConfigError::Serialize)?;

    // Write atomically (write to temp, then rename)
    let temp_path = path.with_extension("toml.tmp");
    std::fs::write(&temp_path, &contents).map_err(|e| ConfigError::Write(temp_path.clone(), e))?;
    std::fs::rename(&temp_path, path)
        .map_err(|e| ConfigError::Rename(temp_path, path.to_path_buf(), e))?;

    tracing::info!("Saved config to {:?}", path);
    Ok(())
}

// ============================================================================
// Error Types
// ============================================================================

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to read config file {0}: {1}")]
    Read(PathBuf, std::io::Error),

    #[error("Failed to parse config file {0}: {1}")]
    Parse(PathBuf, toml::de::Error),

    #[error("Failed to create config directory {0}: {1}")]
    CreateDir(PathBuf, std::io::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(toml::ser::Error),

    #[error("Failed to write config to {0}: {1}")]
    Write(PathBuf, std::io::Error),

    #[error("Failed to rename temp file {0} to {1}: {2}")]
    Rename(PathBuf, PathBuf, std::io::Error),
}

// ============================================================================
// Tests
// ============================================================================
