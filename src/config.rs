//! Configuration for watchcopy.
//!
//! Layered the usual way:
//! - Default values
//! - TOML configuration file (`.watchcopy/settings.toml`)
//! - Environment variable overrides
//! - CLI argument overrides (applied by the commands)
//!
//! # Environment Variables
//!
//! Environment variables must be prefixed with `WATCHCOPY_` and use double
//! underscores to separate nested levels:
//! - `WATCHCOPY_WATCH__POLL_TIMEOUT_SECS=60` sets `watch.poll_timeout_secs`
//! - `WATCHCOPY_LOGGING__DEFAULT=debug` sets `logging.default`

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::mapping::{DEFAULT_PREFIX, Properties};

/// Directory holding the settings file.
pub const CONFIG_DIR: &str = ".watchcopy";
const SETTINGS_FILE: &str = "settings.toml";

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Settings {
    /// Version of the configuration schema
    #[serde(default = "default_version")]
    pub version: u32,

    /// Source/destination pairs
    #[serde(default)]
    pub mirrors: Vec<MirrorSettings>,

    /// Watch loop settings
    #[serde(default)]
    pub watch: WatchSettings,

    /// Log levels
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// One configured pair. Either half may be missing here; completeness is
/// checked together with the other pair sources.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct MirrorSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct WatchSettings {
    /// Upper bound for one wait on notifications, in seconds
    #[serde(default = "default_poll_timeout_secs")]
    pub poll_timeout_secs: u64,

    /// Copy entries that already exist inside a newly created directory
    #[serde(default = "default_true")]
    pub sync_new_directories: bool,

    /// Prefix of the indexed `from[i]` / `to[i]` defines
    #[serde(default = "default_property_prefix")]
    pub property_prefix: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct LoggingConfig {
    /// Default level for every module
    #[serde(default = "default_log_level")]
    pub default: String,

    /// Per-module overrides, e.g. `registry = "debug"`
    #[serde(default)]
    pub modules: HashMap<String, String>,
}

// Default value functions
fn default_version() -> u32 {
    1
}
fn default_true() -> bool {
    true
}
fn default_poll_timeout_secs() -> u64 {
    60 * 60
}
fn default_property_prefix() -> String {
    DEFAULT_PREFIX.to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            mirrors: Vec::new(),
            watch: WatchSettings::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for WatchSettings {
    fn default() -> Self {
        Self {
            poll_timeout_secs: default_poll_timeout_secs(),
            sync_new_directories: true,
            property_prefix: default_property_prefix(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default: default_log_level(),
            modules: HashMap::new(),
        }
    }
}

impl WatchSettings {
    pub fn poll_timeout(&self) -> Duration {
        Duration::from_secs(self.poll_timeout_secs.max(1))
    }
}

impl Settings {
    /// Load configuration from all sources
    pub fn load() -> Result<Self, Box<figment::Error>> {
        let config_path = Self::find_workspace_config()
            .unwrap_or_else(|| PathBuf::from(CONFIG_DIR).join(SETTINGS_FILE));
        Self::load_from(config_path)
    }

    /// Load configuration from a specific file, plus environment overrides
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, Box<figment::Error>> {
        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path.as_ref()))
            // Double underscore becomes a dot, single underscores stay
            .merge(Env::prefixed("WATCHCOPY_").map(|key| {
                key.as_str().to_lowercase().replace("__", ".").into()
            }))
            .extract()
            .map_err(Box::new)
    }

    /// Find `.watchcopy/settings.toml` from the current directory upwards
    pub fn find_workspace_config() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;

        for ancestor in current.ancestors() {
            let config_dir = ancestor.join(CONFIG_DIR);
            if config_dir.is_dir() {
                return Some(config_dir.join(SETTINGS_FILE));
            }
        }

        None
    }

    /// Mirrors from the settings file as indexed properties.
    ///
    /// Each `[[mirrors]]` entry keeps its position, so an empty or half
    /// entry is reported against its own index.
    pub fn properties(&self) -> Properties {
        let mut properties = Properties::new();
        for (index, mirror) in self.mirrors.iter().enumerate() {
            if mirror.from.is_none() && mirror.to.is_none() {
                tracing::warn!("[config] mirrors[{index}] has neither from nor to");
            }
            properties.push_pair(
                &self.watch.property_prefix,
                mirror.from.as_deref(),
                mirror.to.as_deref(),
            );
        }
        properties
    }

    /// Save current configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Box<dyn std::error::Error>> {
        let parent = path.as_ref().parent().ok_or("Invalid path")?;
        std::fs::create_dir_all(parent)?;

        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, format!("{SETTINGS_HEADER}{toml_string}"))?;

        Ok(())
    }

    /// Create a default settings file in the current directory
    pub fn init_config_file(force: bool) -> Result<PathBuf, Box<dyn std::error::Error>> {
        let config_path = PathBuf::from(CONFIG_DIR).join(SETTINGS_FILE);

        if !force && config_path.exists() {
            return Err("Configuration file already exists. Use --force to overwrite".into());
        }

        Settings::default().save(&config_path)?;
        Ok(config_path)
    }
}

const SETTINGS_HEADER: &str = r#"# watchcopy settings
#
# Add one [[mirrors]] table per source/destination pair:
#
# [[mirrors]]
# from = "build/classes"
# to = "/opt/app/webapps/ROOT/WEB-INF/classes"
#
"#;
