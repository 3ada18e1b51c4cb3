//! # Configuration Management Module
//!
//! Runtime configuration for the field server, loaded from a TOML file.
//!
//! ## Configuration Structure
//!
//! - [`ServerConfig`] - Listener address, session cap and frame limit
//! - [`LoggingConfig`] - Log level and optional log file
//! - [`EconomyConfig`] - Party currency split and bonus percentages
//! - [`PickupConfig`] - Excluded item category band and drop ownership window
//! - [`CompanionConfig`] - Affinity cap, fullness cap and the level threshold table
//! - [`ZoneConfig`] - One entry per hosted zone
//! - [`CatalogConfig`] - Optional JSON item catalog
//!
//! ## Usage
//!
//! ```rust,no_run
//! use fieldhost::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("fieldhost.toml").await?;
//!     config.validate()?;
//!     println!("Listening on {}", config.server.bind);
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration File Format
//!
//! ```toml
//! default_zone = 100
//!
//! [server]
//! bind = "0.0.0.0:8484"
//! max_sessions = 500
//! max_frame_size = 65536
//!
//! [logging]
//! level = "info"
//!
//! [economy]
//! party_share_percent = 40
//! party_bonus_percent = 5
//!
//! [[zones]]
//! id = 100
//! name = "Town Square"
//! ```
//!
//! Every gameplay section has defaults, so a file with only `[server]` and
//! `[logging]` is valid.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_zone_id")]
    pub default_zone: u32,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    #[serde(default)]
    pub economy: EconomyConfig,
    #[serde(default)]
    pub pickup: PickupConfig,
    #[serde(default)]
    pub companion: CompanionConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default = "default_zones")]
    pub zones: Vec<ZoneConfig>,
}

fn default_zone_id() -> u32 {
    100
}

fn default_zones() -> Vec<ZoneConfig> {
    vec![ZoneConfig {
        id: default_zone_id(),
        name: "Town Square".to_string(),
        everlast: false,
        potion_allowed: true,
        consume_cooldown_secs: 0,
    }]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind: String,
    pub max_sessions: usize,
    #[serde(default = "default_max_frame_size")]
    pub max_frame_size: usize,
}

fn default_max_frame_size() -> usize {
    crate::protocol::framer::DEFAULT_MAX_FRAME_SIZE
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
}

/// Currency split applied when a party member picks up someone else's drop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EconomyConfig {
    /// Share of the pile handed to the other present party members.
    pub party_share_percent: u8,
    /// Extra amount (percent of the pile) for each recipient holding a party bonus.
    pub party_bonus_percent: u8,
}

impl Default for EconomyConfig {
    fn default() -> Self {
        Self {
            party_share_percent: 40,
            party_bonus_percent: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PickupConfig {
    /// Item category (`item_id / 10000`) that can never be picked up.
    pub blocked_category: u32,
    /// Seconds after spawn at which owner-only and party-only monster drops
    /// open to everyone. 0 keeps ownership for the object's whole life.
    #[serde(default)]
    pub ownership_window_secs: u64,
}

impl Default for PickupConfig {
    fn default() -> Self {
        Self {
            blocked_category: 291,
            ownership_window_secs: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanionConfig {
    pub max_affinity: u32,
    pub max_fullness: u8,
    pub max_slots: u8,
    /// Percent chance a cash-shop food also raises affinity.
    pub cash_food_affinity_chance: u8,
    /// Percent chance ordinary food also raises affinity.
    pub food_affinity_chance: u8,
    /// `level_thresholds[n]` is the affinity needed to reach level `n + 1`.
    pub level_thresholds: Vec<u32>,
}

impl Default for CompanionConfig {
    fn default() -> Self {
        Self {
            max_affinity: 30_000,
            max_fullness: 100,
            max_slots: 3,
            cash_food_affinity_chance: 100,
            food_affinity_chance: 10,
            level_thresholds: vec![
                0, 1, 3, 6, 14, 31, 60, 108, 181, 287, 434, 632, 891, 1224, 1642, 2161, 2793,
                3557, 4467, 5542, 6801, 8263, 9950, 11882, 14084, 16578, 19391, 22547, 26074,
                30000,
            ],
        }
    }
}

impl CompanionConfig {
    pub fn max_level(&self) -> u8 {
        self.level_thresholds.len().min(u8::MAX as usize) as u8
    }

    /// Affinity required to stand at `level`, or `None` past the table.
    pub fn threshold_for(&self, level: u8) -> Option<u32> {
        if level == 0 {
            return None;
        }
        self.level_thresholds.get(level as usize - 1).copied()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoneConfig {
    pub id: u32,
    pub name: String,
    /// Drops never expire in this zone.
    #[serde(default)]
    pub everlast: bool,
    #[serde(default = "default_potion_allowed")]
    pub potion_allowed: bool,
    #[serde(default)]
    pub consume_cooldown_secs: u64,
}

fn default_potion_allowed() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CatalogConfig {
    /// JSON file with item metadata and companion command tables.
    #[serde(default)]
    pub file: Option<String>,
}

impl Config {
    /// Load configuration from a file
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))?;

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

    /// Reject values the runtime cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.economy.party_share_percent > 100 {
            return Err(anyhow!(
                "economy.party_share_percent must be <= 100 (got {})",
                self.economy.party_share_percent
            ));
        }
        if self.economy.party_bonus_percent > 100 {
            return Err(anyhow!(
                "economy.party_bonus_percent must be <= 100 (got {})",
                self.economy.party_bonus_percent
            ));
        }
        let thresholds = &self.companion.level_thresholds;
        if thresholds.is_empty() {
            return Err(anyhow!("companion.level_thresholds must not be empty"));
        }
        if thresholds.windows(2).any(|w| w[0] > w[1]) {
            return Err(anyhow!(
                "companion.level_thresholds must be non-decreasing"
            ));
        }
        if self.companion.max_slots == 0 {
            return Err(anyhow!("companion.max_slots must be at least 1"));
        }
        if self.server.max_sessions == 0 {
            return Err(anyhow!("server.max_sessions must be at least 1"));
        }
        if !self.zones.iter().any(|z| z.id == self.default_zone) {
            return Err(anyhow!(
                "default_zone {} is not listed in [[zones]]",
                self.default_zone
            ));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            default_zone: default_zone_id(),
            server: ServerConfig {
                bind: "0.0.0.0:8484".to_string(),
                max_sessions: 500,
                max_frame_size: default_max_frame_size(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                file: Some("fieldhost.log".to_string()),
            },
            economy: EconomyConfig::default(),
            pickup: PickupConfig::default(),
            companion: CompanionConfig::default(),
            catalog: CatalogConfig::default(),
            zones: default_zones(),
        }
    }
}
