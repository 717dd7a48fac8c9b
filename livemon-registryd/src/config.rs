use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub auth: AuthConfig,
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub store: StoreConfig,
    /// Domain-suffix -> provider credentials
    #[serde(default)]
    pub zones: HashMap<String, ZoneBinding>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub access_token: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeneralConfig {
    /// Seconds a registration stays current before a renewal is expected
    #[serde(default = "default_valid_period")]
    pub valid_period: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_listen")]
    pub listen: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

/// Credentials for managing records in one provider zone
#[derive(Debug, Clone, Deserialize)]
pub struct ZoneBinding {
    pub api_key: String,
    pub email: String,
    pub zone_id: String,
    /// Whether the api key may edit records
    #[serde(default)]
    pub edit: bool,
}

fn default_valid_period() -> i64 {
    120
}

fn default_listen() -> String {
    "0.0.0.0:5000".to_string()
}

fn default_store_path() -> PathBuf {
    PathBuf::from("/var/lib/livemon/services.json")
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            valid_period: default_valid_period(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Find the zone binding responsible for a domain.
    ///
    /// When several configured suffixes match, the longest one wins, so
    /// `sub.example.com` beats `example.com` for `a.sub.example.com`.
    pub fn zone_for(&self, domain: &str) -> Option<&ZoneBinding> {
        self.zones
            .iter()
            .filter(|(suffix, _)| domain.ends_with(suffix.as_str()))
            .max_by_key(|(suffix, _)| suffix.len())
            .map(|(_, binding)| binding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binding(zone_id: &str) -> ZoneBinding {
        ZoneBinding {
            api_key: "k".to_string(),
            email: "a@b.c".to_string(),
            zone_id: zone_id.to_string(),
            edit: true,
        }
    }

    fn config_with_zones(zones: &[&str]) -> Config {
        Config {
            auth: AuthConfig {
                access_token: "secret".to_string(),
            },
            general: GeneralConfig::default(),
            api: ApiConfig::default(),
            store: StoreConfig::default(),
            zones: zones
                .iter()
                .map(|z| (z.to_string(), binding(z)))
                .collect(),
        }
    }

    #[test]
    fn test_zone_lookup_suffix_match() {
        let config = config_with_zones(&["example.com"]);

        assert!(config.zone_for("a.example.com").is_some());
        assert!(config.zone_for("example.com").is_some());
        assert!(config.zone_for("example.org").is_none());
    }

    #[test]
    fn test_zone_lookup_longest_suffix_wins() {
        let config = config_with_zones(&["example.com", "sub.example.com"]);

        let binding = config.zone_for("a.sub.example.com").unwrap();
        assert_eq!(binding.zone_id, "sub.example.com");

        let binding = config.zone_for("b.example.com").unwrap();
        assert_eq!(binding.zone_id, "example.com");
    }

    #[test]
    fn test_zone_lookup_no_zones() {
        let config = config_with_zones(&[]);
        assert!(config.zone_for("a.example.com").is_none());
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
            [auth]
            access_token = "secret"

            [general]
            valid_period = 300

            [api]
            listen = "127.0.0.1:8080"

            [store]
            path = "/tmp/services.json"

            [zones."example.com"]
            api_key = "cf-key"
            email = "ops@example.com"
            zone_id = "abc123"
            edit = true
        "#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.general.valid_period, 300);
        assert_eq!(config.api.listen, "127.0.0.1:8080");
        assert_eq!(config.zones["example.com"].zone_id, "abc123");
    }

    #[test]
    fn test_parse_config_defaults() {
        let config: Config = toml::from_str("[auth]\naccess_token = \"t\"").unwrap();
        assert_eq!(config.general.valid_period, 120);
        assert_eq!(config.api.listen, "0.0.0.0:5000");
        assert!(config.zones.is_empty());
    }
}
