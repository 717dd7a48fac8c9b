use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Service type tag. Serialized as its lowercase string form both on the wire
/// and in the registry's persisted store.
///
/// `Dns` is the only variant with special-cased behavior: an unhealthy DNS
/// service triggers record failover on the agent side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceType {
    /// DNS binding, kept pointed at the host currently serving it
    Dns,
    /// Plain HTTP endpoint (e.g. a file server)
    Http,
    /// HTTPS endpoint
    Https,
    /// FRP tunnel server
    Frps,
    /// FRP tunnel client
    Frpc,
    /// Proxy service (usually an Xray-compatible server)
    Proxy,
    /// Automated agent / bot process
    Robot,
}

impl ServiceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceType::Dns => "dns",
            ServiceType::Http => "http",
            ServiceType::Https => "https",
            ServiceType::Frps => "frps",
            ServiceType::Frpc => "frpc",
            ServiceType::Proxy => "proxy",
            ServiceType::Robot => "robot",
        }
    }
}

/// A service as known to the registry.
/// This is the authoritative record, persisted as a JSON object keyed by name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisteredService {
    pub name: String,

    #[serde(rename = "type")]
    pub service_type: ServiceType,

    #[serde(default)]
    pub description: String,

    /// Unix timestamp of first registration. Preserved across metadata updates.
    pub create_time: i64,

    /// Last reported health verdict
    pub valid: bool,

    /// Unix timestamp until which the last report is considered current
    pub valid_until: i64,

    /// Opaque payload supplied by the agent. Interpreted only by DNS-type
    /// handling (domain, ttl, proxied, priority) and echoed in status views.
    #[serde(default)]
    pub data: Value,
}

impl RegisteredService {
    /// Whether a report denotes the same service as this record.
    /// Identity for the renew-vs-replace decision is (name, type, description, data).
    pub fn same_metadata(
        &self,
        service_type: ServiceType,
        description: &str,
        data: &Value,
    ) -> bool {
        self.service_type == service_type && self.description == description && self.data == *data
    }

    /// Human-readable create time for authenticated status views
    pub fn create_time_display(&self) -> String {
        DateTime::<Utc>::from_timestamp(self.create_time, 0)
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default()
    }
}

/// Three-way status reported by the registry's status endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceStatus {
    Offline,
    Online,
    Expired,
}

impl ServiceStatus {
    /// Pure derivation from the last verdict and its validity window.
    pub fn derive(valid: bool, valid_until: i64, now: i64) -> Self {
        if !valid {
            ServiceStatus::Offline
        } else if now < valid_until {
            ServiceStatus::Online
        } else {
            ServiceStatus::Expired
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceStatus::Offline => "offline",
            ServiceStatus::Online => "online",
            ServiceStatus::Expired => "unknown/expired",
        }
    }
}
