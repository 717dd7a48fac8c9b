use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;
use shared::types::ServiceType;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub general: GeneralConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub services: Vec<ServiceDefinition>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeneralConfig {
    /// Base URL of the registry, e.g. "http://registry.example.com:5000"
    pub server_url: String,
    /// Seconds between scheduler passes
    #[serde(default = "default_sleep_interval")]
    pub sleep_interval: u64,
    /// Refuse to start without root privileges (some probes need them)
    #[serde(default)]
    pub require_root: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub access_token: String,
}

/// One service this node monitors and reports on. `name` is the join key with
/// the registry's records and must be stable across restarts.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceDefinition {
    pub name: String,
    #[serde(rename = "type")]
    pub service_type: ServiceType,
    #[serde(default)]
    pub description: String,
    /// Seconds a healthy verdict stays current before re-evaluation
    pub check_period: i64,
    /// Opaque payload forwarded to the registry; DNS-type services carry
    /// `domain` and optional `ttl`/`proxied`/`priority` here
    #[serde(default)]
    pub data: Value,
    pub method: MethodSpec,
}

/// Which check backend to run and with what parameters
#[derive(Debug, Clone, Deserialize)]
pub struct MethodSpec {
    pub name: String,
    #[serde(default)]
    pub param: Vec<Value>,
}

fn default_sleep_interval() -> u64 {
    60
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
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let toml = r#"
            [general]
            server_url = "http://registry.example.com:5000"
            sleep_interval = 30
            require_root = true

            [auth]
            access_token = "secret"

            [[services]]
            name = "nginx"
            type = "http"
            description = "front proxy"
            check_period = 300
            method = { name = "systemd", param = ["nginx"] }

            [[services]]
            name = "home"
            type = "dns"
            check_period = 600
            data = { domain = "home.example.com", ttl = 300 }
            method = { name = "dns", param = ["home.example.com", 4] }
        "#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.general.sleep_interval, 30);
        assert!(config.general.require_root);
        assert_eq!(config.services.len(), 2);

        let dns = &config.services[1];
        assert_eq!(dns.service_type, ServiceType::Dns);
        assert_eq!(dns.data["domain"], "home.example.com");
        assert_eq!(dns.method.name, "dns");
        assert_eq!(dns.method.param[1], serde_json::json!(4));
    }

    #[test]
    fn test_parse_config_defaults() {
        let toml = r#"
            [general]
            server_url = "http://localhost:5000"

            [auth]
            access_token = "t"
        "#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.general.sleep_interval, 60);
        assert!(!config.general.require_root);
        assert!(config.services.is_empty());
    }
}
