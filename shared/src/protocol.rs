use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::ServiceType;

/// API paths served by the registry
pub const API_SRV_REG: &str = "/api/srv/reg";
pub const API_SRV_RENEW: &str = "/api/srv/renew";
pub const API_DNS_GET: &str = "/api/dns/get";
pub const API_DNS_ADD: &str = "/api/dns/add";
pub const API_DNS_UPDATE: &str = "/api/dns/update";
pub const API_DNS_DELETE: &str = "/api/dns/delete";

/// Body of `POST /api/srv/reg` and `POST /api/srv/renew`.
/// `description` and `data` are only required on first registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub token: String,
    pub name: String,
    #[serde(rename = "type")]
    pub service_type: ServiceType,
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Body of `POST /api/dns/update` (alias `/api/dns/add`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DnsUpsertRequest {
    pub token: String,
    pub domain: String,
    /// Record type, defaults to A
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub record_type: Option<String>,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxied: Option<bool>,
}

/// Parameters of `GET|POST /api/dns/get` and `/api/dns/delete`.
/// Arrives as a query string on GET and as a JSON body on POST.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DnsQueryRequest {
    #[serde(default)]
    pub token: Option<String>,
    pub domain: String,
}

/// Parameters of the status endpoint. A missing or mismatched token selects
/// the reduced view rather than producing an error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatusQuery {
    #[serde(default)]
    pub token: Option<String>,
}

/// One service in the status map returned by `GET|POST /`.
/// `create_time` and `data` are present only for authenticated callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusEntry {
    #[serde(rename = "type")]
    pub service_type: ServiceType,
    pub description: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Whether a DNS upsert created a new record or updated an existing one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpsertKind {
    Add,
    Update,
}

/// Response body of a successful DNS upsert
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpsertResponse {
    #[serde(rename = "type")]
    pub kind: UpsertKind,
    /// Record object as returned by the provider
    pub result: Value,
}
