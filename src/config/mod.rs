pub mod types;

use std::path::Path;

use crate::error::{BookingError, Result};
use types::Config;

pub const API_KEY_ENV: &str = "VILLA_STORE_API_KEY";

pub fn load_config(path: &Path) -> Result<Config> {
    let mut config = if path.exists() {
        let content = std::fs::read_to_string(path).map_err(|e| {
            BookingError::Config(format!(
                "failed to read config file {}: {e}",
                path.display()
            ))
        })?;
        // An empty file deserializes to null rather than a mapping.
        if content.trim().is_empty() {
            Config::default()
        } else {
            serde_yml::from_str(&content)?
        }
    } else {
        tracing::info!(
            "Config file not found at {}, using defaults",
            path.display()
        );
        Config::default()
    };

    apply_env_overrides(&mut config, std::env::var(API_KEY_ENV).ok());
    config.validate()?;
    Ok(config)
}

fn apply_env_overrides(config: &mut Config, api_key: Option<String>) {
    if let Some(key) = api_key.filter(|k| !k.trim().is_empty()) {
        config.store.api_key = Some(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;
    use types::StoreBackend;

    #[test]
    fn load_config_missing_file_returns_defaults() {
        let config = load_config(Path::new("/tmp/nonexistent_villa_config_12345.yaml")).unwrap();
        assert_eq!(config.store.backend, StoreBackend::Memory);
        assert_eq!(config.pricing.default_short_stay_day_limit, 7);
    }

    #[test]
    fn load_config_valid_yaml() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            tmp,
            "store:\n  backend: postgrest\n  base_url: https://db.example.com\n  max_retries: 5\npricing:\n  default_short_stay_day_limit: 5"
        )
        .unwrap();
        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.store.backend, StoreBackend::Postgrest);
        assert_eq!(config.store.max_retries, 5);
        assert_eq!(config.pricing.default_short_stay_day_limit, 5);
    }

    #[test]
    fn load_config_empty_yaml() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        writeln!(tmp).unwrap();
        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.store.request_timeout_secs, 10);
        assert!(config.pricing.seasonal_fallback);
    }

    #[test]
    fn load_config_invalid_yaml() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        writeln!(tmp, "{{{{invalid yaml: [[[").unwrap();
        assert!(load_config(tmp.path()).is_err());
    }

    #[test]
    fn load_config_rejects_invalid_values() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        writeln!(tmp, "pricing:\n  advance_rate: 0").unwrap();
        assert!(matches!(
            load_config(tmp.path()),
            Err(BookingError::Config(_))
        ));
    }

    #[test]
    fn env_key_overrides_file_key() {
        let mut config = Config::default();
        config.store.api_key = Some("from-file".into());
        apply_env_overrides(&mut config, Some("from-env".into()));
        assert_eq!(config.store.api_key.as_deref(), Some("from-env"));
        apply_env_overrides(&mut config, Some("  ".into()));
        assert_eq!(config.store.api_key.as_deref(), Some("from-env"));
        apply_env_overrides(&mut config, None);
        assert_eq!(config.store.api_key.as_deref(), Some("from-env"));
    }
}
