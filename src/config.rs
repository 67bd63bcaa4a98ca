//! TOML configuration.
//!
//! ```toml
//! [db]
//! path = "./data/lachaise.sqlite"
//!
//! [mediawiki]
//! user_agent = "lachaise-sync/0.3 (ops@example.org)"
//!
//! [sync]
//! languages = ["fr", "en"]
//! accepted_locations_of_burial = ["Q311"]
//!
//! [server]
//! bind = "127.0.0.1:7340"
//! ```
//!
//! Every section except `[db]` may be omitted. A missing
//! `mediawiki.user_agent` is only an error once a sync needs the network.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use lachaise_sync_core::chunk::DEFAULT_BATCH_SIZE;

use crate::mediawiki::MAX_IDS_PER_REQUEST;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub mediawiki: MediawikiConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MediawikiConfig {
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default = "default_wikidata_endpoint")]
    pub wikidata_endpoint: String,
    #[serde(default = "default_commons_endpoint")]
    pub commons_endpoint: String,
    /// `{language}` is replaced with the language code.
    #[serde(default = "default_wikipedia_endpoint")]
    pub wikipedia_endpoint: String,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for MediawikiConfig {
    fn default() -> Self {
        Self {
            user_agent: None,
            wikidata_endpoint: default_wikidata_endpoint(),
            commons_endpoint: default_commons_endpoint(),
            wikipedia_endpoint: default_wikipedia_endpoint(),
            batch_size: default_batch_size(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl MediawikiConfig {
    pub fn wikipedia_endpoint_for(&self, language: &str) -> String {
        self.wikipedia_endpoint.replace("{language}", language)
    }
}

fn default_wikidata_endpoint() -> String {
    "https://www.wikidata.org/w/api.php".to_string()
}
fn default_commons_endpoint() -> String {
    "https://commons.wikimedia.org/w/api.php".to_string()
}
fn default_wikipedia_endpoint() -> String {
    "https://{language}.wikipedia.org/w/api.php".to_string()
}
fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct SyncConfig {
    #[serde(default = "default_languages")]
    pub languages: Vec<String>,
    #[serde(default = "default_accepted_locations_of_burial")]
    pub accepted_locations_of_burial: Vec<String>,
    #[serde(default = "default_synced_instance_of")]
    pub synced_instance_of: Vec<String>,
    #[serde(default = "default_thumbnail_width")]
    pub thumbnail_width: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            languages: default_languages(),
            accepted_locations_of_burial: default_accepted_locations_of_burial(),
            synced_instance_of: default_synced_instance_of(),
            thumbnail_width: default_thumbnail_width(),
        }
    }
}

fn default_languages() -> Vec<String> {
    vec!["fr".to_string(), "en".to_string()]
}
fn default_accepted_locations_of_burial() -> Vec<String> {
    // Père Lachaise Cemetery
    vec!["Q311".to_string()]
}
fn default_synced_instance_of() -> Vec<String> {
    vec!["Q5".to_string(), "Q173387".to_string()]
}
fn default_thumbnail_width() -> u32 {
    280
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7340".to_string()
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    let batch_size = config.mediawiki.batch_size;
    if batch_size == 0 || batch_size > MAX_IDS_PER_REQUEST {
        anyhow::bail!(
            "mediawiki.batch_size must be in 1..={}, got {}",
            MAX_IDS_PER_REQUEST,
            batch_size
        );
    }

    if config.mediawiki.timeout_secs == 0 {
        anyhow::bail!("mediawiki.timeout_secs must be > 0");
    }

    if let Some(agent) = &config.mediawiki.user_agent {
        if agent.trim().is_empty() {
            anyhow::bail!("mediawiki.user_agent must not be blank when set");
        }
    }

    if config.sync.languages.is_empty() {
        anyhow::bail!("sync.languages must list at least one language");
    }

    if config.sync.thumbnail_width == 0 {
        anyhow::bail!("sync.thumbnail_width must be > 0");
    }

    for code in config
        .sync
        .accepted_locations_of_burial
        .iter()
        .chain(&config.sync.synced_instance_of)
    {
        if !code.starts_with('Q') || code[1..].parse::<u64>().is_err() {
            anyhow::bail!("'{}' is not a Wikidata item code", code);
        }
    }

    Ok(())
}
