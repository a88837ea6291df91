//! # Configuration
//!
//! Quinn Cash reads a single TOML file (default `config.toml`). Every section has
//! defaults, so an empty file is a valid configuration.
//!
//! - [`FamilyConfig`] - whose account the terminal is playing on
//! - [`StorageConfig`] - where the sled database lives
//! - [`LoggingConfig`] - log level and optional log file
//! - [`GameConfig`] - starter words and terminal pacing for the spelling game
//! - [`SecurityConfig`] - Argon2 cost parameters for the parent PIN
//!
//! ```rust,no_run
//! use quinncash::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     Config::create_default("config.toml").await?;
//!     let config = Config::load("config.toml").await?;
//!     println!("Playing as {}", config.family.child_name);
//!     Ok(())
//! }
//! ```
//!
//! ```toml
//! [family]
//! child_name = "Quinn"
//! user_id = "quinn"
//!
//! [storage]
//! data_dir = "./data"
//!
//! [logging]
//! level = "warn"
//! file = "quinncash.log"
//! ```

use anyhow::{anyhow, Result};
use argon2::{Algorithm, Argon2, Params, Version};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::fs;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub family: FamilyConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub game: GameConfig,
    #[serde(default)]
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FamilyConfig {
    /// Name shown in greetings.
    pub child_name: String,
    /// Account key in the store.
    pub user_id: String,
}

impl Default for FamilyConfig {
    fn default() -> Self {
        Self {
            child_name: "Quinn".to_string(),
            user_id: "quinn".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: "./data".to_string(),
        }
    }
}

impl StorageConfig {
    /// Directory of the sled database inside `data_dir`.
    pub fn db_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join("family")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    #[serde(default)]
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            file: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameConfig {
    /// Seed cat, dog, sun... into an empty word list when the store opens.
    #[serde(default = "default_true")]
    pub seed_starter_words: bool,
    /// How often the terminal redraws while waiting on animation timers.
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
}

fn default_true() -> bool {
    true
}

fn default_tick_ms() -> u64 {
    50
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            seed_starter_words: true,
            tick_ms: default_tick_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Argon2Config {
    #[serde(default)]
    pub memory_kib: Option<u32>,
    #[serde(default)]
    pub time_cost: Option<u32>,
    #[serde(default)]
    pub parallelism: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SecurityConfig {
    #[serde(default)]
    pub argon2: Option<Argon2Config>,
}

impl SecurityConfig {
    /// Argon2id hasher with any configured cost overrides. Invalid overrides fall back to
    /// the library defaults.
    pub fn argon2(&self) -> Argon2<'static> {
        let Some(a) = &self.argon2 else {
            return Argon2::default();
        };
        let base = Params::DEFAULT;
        let mem = a.memory_kib.unwrap_or(base.m_cost());
        let time = a.time_cost.unwrap_or(base.t_cost());
        let para = a.parallelism.unwrap_or(base.p_cost());
        match Params::new(mem, time, para, None) {
            Ok(params) => Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
            Err(e) => {
                log::warn!("invalid argon2 parameters ({}), using defaults", e);
                Argon2::default()
            }
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))?;

        if config.family.user_id.trim().is_empty() {
            return Err(anyhow!("Config file {}: family.user_id must not be empty", path));
        }
        Ok(config)
    }

    /// Create a default configuration file
    pub async fn create_default(path: &str) -> Result<()> {
        let config = Config::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path, e))?;

        Ok(())
    }
}
