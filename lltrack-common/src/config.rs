//! Configuration loading and root folder resolution
//!
//! Root folder priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable `LLTRACK_ROOT_FOLDER`
//! 3. TOML config file (`root_folder` key)
//! 4. OS-dependent compiled default (fallback)
//!
//! A missing or malformed TOML file is never fatal: it is logged and the
//! defaults are used. A missing vision API key is fatal.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "LLTRACK_ROOT_FOLDER";

/// Environment variable holding the vision API credential
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

pub const DEFAULT_PORT: u16 = 5001;
pub const DEFAULT_VISION_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_VISION_MODEL: &str = "gpt-4o";
pub const DEFAULT_VISION_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_VISION_MAX_TOKENS: u32 = 500;
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

const DATABASE_FILE: &str = "lltrack.db";
const UPLOADS_DIR: &str = "uploads";
const OUTPUT_DIR: &str = "output";

/// Contents of `~/.config/lltrack/config.toml`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    pub root_folder: Option<PathBuf>,
    pub port: Option<u16>,
    pub max_upload_bytes: Option<usize>,
    #[serde(default)]
    pub vision: VisionToml,
}

/// `[vision]` table of the TOML config
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VisionToml {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub timeout_secs: Option<u64>,
    pub max_tokens: Option<u32>,
}

impl TomlConfig {
    /// Load the user config file, falling back to defaults when absent or invalid
    pub fn load() -> Self {
        match default_config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => TomlConfig::default(),
        }
    }

    /// Load a specific config file, falling back to defaults on any error
    pub fn load_from(path: &Path) -> Self {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                warn!("Could not read config file {}: {} (using defaults)", path.display(), e);
                return TomlConfig::default();
            }
        };

        match Self::parse(&content) {
            Ok(config) => {
                info!("Loaded config file: {}", path.display());
                config
            }
            Err(e) => {
                warn!("{} (using defaults)", e);
                TomlConfig::default()
            }
        }
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Invalid config file: {}", e)))
    }
}

/// Platform config file location
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("lltrack").join("config.toml"))
}

/// Resolves the root folder holding the database, uploads and output
pub struct RootFolderResolver {
    cli_arg: Option<PathBuf>,
    toml_root: Option<PathBuf>,
}

impl RootFolderResolver {
    pub fn new(cli_arg: Option<PathBuf>, toml_config: &TomlConfig) -> Self {
        Self {
            cli_arg,
            toml_root: toml_config.root_folder.clone(),
        }
    }

    pub fn resolve(&self) -> PathBuf {
        if let Some(path) = &self.cli_arg {
            return path.clone();
        }

        if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
            if !path.trim().is_empty() {
                return PathBuf::from(path);
            }
        }

        if let Some(path) = &self.toml_root {
            return path.clone();
        }

        default_root_folder()
    }
}

/// OS-dependent default root folder
pub fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("lltrack"))
        .unwrap_or_else(|| PathBuf::from("./lltrack_data"))
}

/// Creates the root folder layout and names the files inside it
pub struct RootFolderInitializer {
    root_folder: PathBuf,
}

impl RootFolderInitializer {
    pub fn new(root_folder: PathBuf) -> Self {
        Self { root_folder }
    }

    /// Create root, uploads and output directories if missing
    pub fn ensure_directory_exists(&self) -> Result<()> {
        for dir in [self.root_folder.clone(), self.uploads_dir(), self.output_dir()] {
            if !dir.exists() {
                std::fs::create_dir_all(&dir)?;
                info!("Created directory: {}", dir.display());
            }
        }
        Ok(())
    }

    pub fn root_folder(&self) -> &Path {
        &self.root_folder
    }

    pub fn database_path(&self) -> PathBuf {
        self.root_folder.join(DATABASE_FILE)
    }

    pub fn uploads_dir(&self) -> PathBuf {
        self.root_folder.join(UPLOADS_DIR)
    }

    pub fn output_dir(&self) -> PathBuf {
        self.root_folder.join(OUTPUT_DIR)
    }
}

/// Settings for the external vision service
#[derive(Debug, Clone)]
pub struct VisionConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
    pub max_tokens: u32,
}

impl VisionConfig {
    /// Resolve vision settings: API key from environment, then TOML
    ///
    /// A missing key is a configuration error; callers treat it as fatal.
    pub fn resolve(toml_config: &TomlConfig) -> Result<Self> {
        let api_key = resolve_api_key(toml_config)?;
        let vision = &toml_config.vision;

        Ok(Self {
            api_key,
            base_url: vision
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_VISION_BASE_URL.to_string()),
            model: vision
                .model
                .clone()
                .unwrap_or_else(|| DEFAULT_VISION_MODEL.to_string()),
            timeout_secs: vision.timeout_secs.unwrap_or(DEFAULT_VISION_TIMEOUT_SECS),
            max_tokens: vision.max_tokens.unwrap_or(DEFAULT_VISION_MAX_TOKENS),
        })
    }

    /// Settings with defaults for everything but the key and endpoint
    pub fn with_endpoint(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.into(),
            model: DEFAULT_VISION_MODEL.to_string(),
            timeout_secs: DEFAULT_VISION_TIMEOUT_SECS,
            max_tokens: DEFAULT_VISION_MAX_TOKENS,
        }
    }
}

fn resolve_api_key(toml_config: &TomlConfig) -> Result<String> {
    if let Ok(key) = std::env::var(API_KEY_ENV) {
        if is_valid_key(&key) {
            info!("Vision API key loaded from environment variable");
            return Ok(key);
        }
    }

    if let Some(key) = &toml_config.vision.api_key {
        if is_valid_key(key) {
            info!("Vision API key loaded from TOML config");
            return Ok(key.clone());
        }
    }

    Err(Error::Config(format!(
        "{} not set. Configure it using one of:\n\
         1. Environment: {}=your-key (a .env file in the working directory is read)\n\
         2. TOML config: ~/.config/lltrack/config.toml ([vision] api_key = \"your-key\")",
        API_KEY_ENV, API_KEY_ENV
    )))
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_valid_key() {
        assert!(is_valid_key("sk-abc"));
        assert!(!is_valid_key(""));
        assert!(!is_valid_key("   \t"));
    }

    #[test]
    fn test_initializer_paths() {
        let init = RootFolderInitializer::new(PathBuf::from("/srv/lltrack"));
        assert_eq!(init.database_path(), PathBuf::from("/srv/lltrack/lltrack.db"));
        assert_eq!(init.uploads_dir(), PathBuf::from("/srv/lltrack/uploads"));
        assert_eq!(init.output_dir(), PathBuf::from("/srv/lltrack/output"));
    }

    #[test]
    fn test_with_endpoint_uses_defaults() {
        let config = VisionConfig::with_endpoint("k", "http://localhost:1234");
        assert_eq!(config.model, "gpt-4o");
        assert_eq!(config.timeout_secs, 60);
        assert_eq!(config.max_tokens, 500);
    }
}
