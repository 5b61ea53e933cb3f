use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;

use crate::core::{EngineConfig, RankingCaps, ScoringWeights};

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub backend: BackendSettings,
    pub database: DatabaseSettings,
    pub cache: CacheSettings,
    #[serde(default)]
    pub matching: MatchingSettings,
    #[serde(default)]
    pub scoring: ScoringSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BackendSettings {
    pub endpoint: String,
    pub api_key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: Option<u32>,
    pub min_connections: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheSettings {
    pub redis_url: String,
    pub l1_cache_size: Option<u64>,
}

/// Engine tunables; the defaults are the observed production values
#[derive(Debug, Clone, Deserialize)]
pub struct MatchingSettings {
    #[serde(default = "default_fan_out_limit")]
    pub fan_out_limit: usize,
    #[serde(default = "default_worker_pool_size")]
    pub worker_pool_size: usize,
    #[serde(default = "default_shortlist_cap")]
    pub shortlist_cap: usize,
    #[serde(default = "default_per_provider_cap")]
    pub per_provider_cap: usize,
    #[serde(default = "default_total_cap")]
    pub total_cap: usize,
    #[serde(default = "default_advanced_min_score")]
    pub advanced_min_score: f64,
    #[serde(default = "default_legacy_min_score")]
    pub legacy_min_score: f64,
}

impl Default for MatchingSettings {
    fn default() -> Self {
        Self {
            fan_out_limit: default_fan_out_limit(),
            worker_pool_size: default_worker_pool_size(),
            shortlist_cap: default_shortlist_cap(),
            per_provider_cap: default_per_provider_cap(),
            total_cap: default_total_cap(),
            advanced_min_score: default_advanced_min_score(),
            legacy_min_score: default_legacy_min_score(),
        }
    }
}

fn default_fan_out_limit() -> usize {
    100
}
fn default_worker_pool_size() -> usize {
    16
}
fn default_shortlist_cap() -> usize {
    25
}
fn default_per_provider_cap() -> usize {
    2
}
fn default_total_cap() -> usize {
    20
}
fn default_advanced_min_score() -> f64 {
    0.4
}
fn default_legacy_min_score() -> f64 {
    0.3
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScoringSettings {
    #[serde(default)]
    pub weights: WeightsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WeightsConfig {
    #[serde(default = "default_category_weight")]
    pub category: f64,
    #[serde(default = "default_proximity_weight")]
    pub proximity: f64,
    #[serde(default = "default_budget_weight")]
    pub budget: f64,
    #[serde(default = "default_temporal_weight")]
    pub temporal: f64,
    #[serde(default = "default_reputation_weight")]
    pub reputation: f64,
    #[serde(default = "default_verification_weight")]
    pub verification: f64,
    #[serde(default = "default_collaboration_weight")]
    pub collaboration: f64,
    #[serde(default = "default_preference_weight")]
    pub preference: f64,
}

impl Default for WeightsConfig {
    fn default() -> Self {
        Self {
            category: default_category_weight(),
            proximity: default_proximity_weight(),
            budget: default_budget_weight(),
            temporal: default_temporal_weight(),
            reputation: default_reputation_weight(),
            verification: default_verification_weight(),
            collaboration: default_collaboration_weight(),
            preference: default_preference_weight(),
        }
    }
}

fn default_category_weight() -> f64 {
    0.25
}
fn default_proximity_weight() -> f64 {
    0.20
}
fn default_budget_weight() -> f64 {
    0.15
}
fn default_temporal_weight() -> f64 {
    0.10
}
fn default_reputation_weight() -> f64 {
    0.10
}
fn default_verification_weight() -> f64 {
    0.08
}
fn default_collaboration_weight() -> f64 {
    0.07
}
fn default_preference_weight() -> f64 {
    0.05
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "json".to_string()
}

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration file (config/default.toml, then config/local.toml)
    /// 3. Environment variables (prefixed with CRAFTLINK_)
    pub fn load() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g. CRAFTLINK_SERVER__PORT -> server.port
            .add_source(
                Environment::with_prefix("CRAFTLINK")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(
                Environment::with_prefix("CRAFTLINK")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }

    /// Assemble the engine configuration from the matching/scoring sections
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            fan_out_limit: self.matching.fan_out_limit,
            worker_pool_size: self.matching.worker_pool_size,
            caps: RankingCaps {
                shortlist: self.matching.shortlist_cap,
                per_provider: self.matching.per_provider_cap,
                total: self.matching.total_cap,
            },
            weights: ScoringWeights {
                category: self.scoring.weights.category,
                proximity: self.scoring.weights.proximity,
                budget: self.scoring.weights.budget,
                temporal: self.scoring.weights.temporal,
                reputation: self.scoring.weights.reputation,
                verification: self.scoring.weights.verification,
                collaboration: self.scoring.weights.collaboration,
                preference: self.scoring.weights.preference,
            },
            advanced_min_score: self.matching.advanced_min_score,
            legacy_min_score: self.matching.legacy_min_score,
        }
    }
}
