use std::path::PathBuf;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::payment::{default_advance_rate, validate_advance_rate};
use crate::domain::pricing::DEFAULT_SHORT_STAY_DAY_LIMIT;
use crate::error::{BookingError, Result};

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub pricing: PricingConfig,
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        validate_advance_rate(self.pricing.advance_rate)
            .map_err(|e| BookingError::Config(format!("pricing.advance_rate: {e}")))?;
        if self.pricing.default_short_stay_day_limit == 0 {
            return Err(BookingError::Config(
                "pricing.default_short_stay_day_limit must be at least 1".into(),
            ));
        }
        if self.store.backend == StoreBackend::Postgrest && self.store.base_url.trim().is_empty()
        {
            return Err(BookingError::Config(
                "store.base_url is required for the postgrest backend".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Memory,
    Postgrest,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    #[serde(default)]
    pub base_url: String,
    /// Overridden by `VILLA_STORE_API_KEY` when set.
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_retries")]
    pub max_retries: u32,
    #[serde(default = "default_rate_limit")]
    pub rate_limit_per_second: f64,
    /// YAML seed file loaded into the memory backend at startup.
    #[serde(default)]
    pub seed_path: Option<PathBuf>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            base_url: String::new(),
            api_key: None,
            request_timeout_secs: default_timeout(),
            max_retries: default_retries(),
            rate_limit_per_second: default_rate_limit(),
            seed_path: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PricingConfig {
    #[serde(default = "default_advance_rate")]
    pub advance_rate: Decimal,
    #[serde(default = "default_short_stay_limit")]
    pub default_short_stay_day_limit: u32,
    /// Price nights without a calendar price from the seasonal table.
    #[serde(default = "default_true")]
    pub seasonal_fallback: bool,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            advance_rate: default_advance_rate(),
            default_short_stay_day_limit: default_short_stay_limit(),
            seasonal_fallback: true,
        }
    }
}

fn default_timeout() -> u64 {
    10
}

fn default_retries() -> u32 {
    2
}

fn default_rate_limit() -> f64 {
    20.0
}

fn default_short_stay_limit() -> u32 {
    DEFAULT_SHORT_STAY_DAY_LIMIT
}

fn default_true() -> bool {
    true
}
