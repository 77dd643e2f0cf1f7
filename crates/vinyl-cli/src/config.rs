use anyhow::{Context, Result};
use confyg::{env, Confygery};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use vinyl_core::StoreOptions;

/// Configuration for vinyl.
///
/// Configuration is loaded from multiple sources with the following priority:
/// 1. CLI arguments (highest priority)
/// 2. Environment variables (VINYL_* prefix)
/// 3. Config file (~/.config/vinyl/config.toml)
/// 4. Built-in defaults (lowest priority)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path to the SQLite catalog.
    ///
    /// Can be set via:
    /// - CLI: --db /path/to/db
    /// - ENV: VINYL_DATABASE_PATH
    /// - Config: database_path = "/path/to/db"
    /// - Default: ~/.local/share/vinyl/vinyl.db
    pub database_path: PathBuf,

    pub logging: LoggingConfig,

    pub store: StoreOptions,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive, e.g. "info" or "vinyl_core=debug".
    pub level: String,

    /// Coloured output.
    pub ansi: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            ansi: true,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: default_db_path(),
            logging: LoggingConfig::default(),
            store: StoreOptions::default(),
        }
    }
}

impl Config {
    /// Load configuration from file and environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed.
    pub fn load() -> Result<Self> {
        Self::load_from(&config_file_path())
    }

    /// Load configuration from a specific file (if it exists) and the
    /// environment.
    pub fn load_from(config_path: &Path) -> Result<Self> {
        let mut builder = Confygery::new().context("Failed to create config builder")?;

        if config_path.exists() {
            let path_str = config_path
                .to_str()
                .ok_or_else(|| anyhow::anyhow!("Config path contains invalid UTF-8"))?;
            builder
                .add_file(path_str)
                .context("Failed to load config file")?;
        }

        let env_opts = env::Options::with_top_level("vinyl");
        builder
            .add_env(env_opts)
            .context("Failed to load environment variables")?;

        let config: Self = builder.build().context("Failed to build configuration")?;
        Ok(config)
    }

    /// Load configuration, letting `--db` override the database path.
    pub fn load_with_db_path(db_path: Option<PathBuf>) -> Result<Self> {
        let mut config = Self::load()?;
        if let Some(db_path) = db_path {
            config.database_path = db_path;
        }
        Ok(config)
    }
}

/// Returns: ~/.local/share/vinyl/vinyl.db (or platform equivalent)
fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("vinyl")
        .join("vinyl.db")
}

/// Get the config file path.
///
/// Returns:
/// - Linux: ~/.config/vinyl/config.toml
/// - macOS: ~/Library/Application Support/vinyl/config.toml
/// - Windows: %APPDATA%\vinyl\config.toml
pub fn config_file_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("vinyl")
        .join("config.toml")
}

/// Get the example config file content.
pub fn example_config() -> &'static str {
    r#"# Vinyl Configuration File
#
# Configuration is loaded from multiple sources with the following priority:
# 1. CLI arguments (highest priority)
# 2. Environment variables (VINYL_* prefix)
# 3. This config file
# 4. Built-in defaults (lowest priority)

# Path to the SQLite catalog
#
# Can also be set via:
# - CLI: vinyl --db /custom/path.db recent
# - Environment: VINYL_DATABASE_PATH=/custom/path.db
#
# Default: Platform-specific data directory
#database_path = "/path/to/custom/vinyl.db"

[logging]
# Filter directive; RUST_LOG takes precedence, -v raises it to debug
level = "info"
ansi = true

[store]
# Read-only connections serving queries
read_pool_size = 4
# How long a write waits for a lock held by another process
busy_timeout_ms = 5000
# Largest accepted album cover, in bytes
max_cover_bytes = 2097152
"#
}

/// Create default config file if it doesn't exist.
///
/// Returns true if a new file was created, false if it already existed.
pub fn ensure_config_file() -> Result<bool> {
    ensure_config_file_at(&config_file_path())
}

pub fn ensure_config_file_at(config_path: &Path) -> Result<bool> {
    if config_path.exists() {
        return Ok(false);
    }

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create config directory")?;
    }

    std::fs::write(config_path, example_config()).context("Failed to write config file")?;

    Ok(true)
}

/// Keys accepted by `vinyl config set`.
pub const SETTABLE_KEYS: &[&str] = &[
    "database_path",
    "logging.level",
    "logging.ansi",
    "store.read_pool_size",
    "store.busy_timeout_ms",
    "store.max_cover_bytes",
];

/// Set `key` to `value` in the TOML file at `config_path`, keeping comments
/// and layout intact.
pub fn set_value_at(config_path: &Path, key: &str, value: &str) -> Result<()> {
    let item = match key {
        "database_path" | "logging.level" => toml_edit::value(value),
        "logging.ansi" => toml_edit::value(
            value
                .parse::<bool>()
                .with_context(|| format!("{} expects true or false, got {:?}", key, value))?,
        ),
        "store.read_pool_size" | "store.busy_timeout_ms" | "store.max_cover_bytes" => {
            toml_edit::value(
                value
                    .parse::<i64>()
                    .ok()
                    .filter(|n| *n >= 0)
                    .with_context(|| {
                        format!("{} expects a non-negative integer, got {:?}", key, value)
                    })?,
            )
        }
        _ => anyhow::bail!(
            "Unknown config key: {}\n\nValid keys: {}",
            key,
            SETTABLE_KEYS.join(", ")
        ),
    };

    let contents = std::fs::read_to_string(config_path).context("Failed to read config file")?;
    let mut doc: toml_edit::DocumentMut = contents
        .parse()
        .context("Failed to parse config file")?;

    match key.split_once('.') {
        Some((section, field)) => {
            if !doc.contains_table(section) {
                doc[section] = toml_edit::table();
            }
            doc[section][field] = item;
        }
        None => doc[key] = item,
    }

    std::fs::write(config_path, doc.to_string()).context("Failed to write config file")?;
    Ok(())
}
