use anyhow::{anyhow, Context, Result};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::config::ZoneBinding;

const API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Cloudflare's sentinel TTL meaning "automatic"
pub const TTL_AUTO: u32 = 1;

/// Thin client for the Cloudflare v4 DNS records API.
///
/// Record objects are passed through as raw JSON; the registry only inspects
/// `name` and `id` for the create-vs-update decision.
#[derive(Clone)]
pub struct CloudflareApi {
    http: reqwest::Client,
}

#[derive(Deserialize)]
struct Envelope {
    success: bool,
    #[serde(default)]
    result: Value,
    #[serde(default)]
    errors: Value,
}

/// Payload for creating or updating a record
pub struct RecordPayload {
    pub record_type: String,
    pub name: String,
    pub content: String,
    pub ttl: u32,
    pub priority: Option<u16>,
    pub proxied: bool,
}

impl RecordPayload {
    fn to_json(&self) -> Value {
        let mut body = json!({
            "type": self.record_type,
            "name": self.name,
            "content": self.content,
            "ttl": self.ttl,
            "proxied": self.proxied,
        });
        if let Some(priority) = self.priority {
            body["priority"] = json!(priority);
        }
        body
    }
}

impl CloudflareApi {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
        }
    }

    fn headers(zone: &ZoneBinding) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "X-Auth-Email",
            HeaderValue::from_str(&zone.email).context("Invalid email header")?,
        );
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", zone.api_key))
                .context("Invalid api key header")?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }

    async fn unwrap_envelope(resp: reqwest::Response) -> Result<Value> {
        let status = resp.status();
        let envelope: Envelope = resp
            .json()
            .await
            .context("Malformed provider response")?;
        if !status.is_success() || !envelope.success {
            return Err(anyhow!(
                "Provider call failed (status {}): {}",
                status,
                envelope.errors
            ));
        }
        Ok(envelope.result)
    }

    /// Fetch the full record list for a zone
    pub async fn list_records(&self, zone: &ZoneBinding) -> Result<Vec<Value>> {
        let url = format!("{API_BASE}/zones/{}/dns_records", zone.zone_id);
        let resp = self
            .http
            .get(url)
            .headers(Self::headers(zone)?)
            .send()
            .await
            .context("Provider request failed")?;

        match Self::unwrap_envelope(resp).await? {
            Value::Array(records) => Ok(records),
            other => Err(anyhow!("Expected record list, got: {other}")),
        }
    }

    pub async fn create_record(&self, zone: &ZoneBinding, payload: &RecordPayload) -> Result<Value> {
        let url = format!("{API_BASE}/zones/{}/dns_records", zone.zone_id);
        let resp = self
            .http
            .post(url)
            .headers(Self::headers(zone)?)
            .json(&payload.to_json())
            .send()
            .await
            .context("Provider request failed")?;
        Self::unwrap_envelope(resp).await
    }

    pub async fn update_record(
        &self,
        zone: &ZoneBinding,
        record_id: &str,
        payload: &RecordPayload,
    ) -> Result<Value> {
        let url = format!("{API_BASE}/zones/{}/dns_records/{record_id}", zone.zone_id);
        let resp = self
            .http
            .put(url)
            .headers(Self::headers(zone)?)
            .json(&payload.to_json())
            .send()
            .await
            .context("Provider request failed")?;
        Self::unwrap_envelope(resp).await
    }

    pub async fn delete_record(&self, zone: &ZoneBinding, record_id: &str) -> Result<Value> {
        let url = format!("{API_BASE}/zones/{}/dns_records/{record_id}", zone.zone_id);
        let resp = self
            .http
            .delete(url)
            .headers(Self::headers(zone)?)
            .send()
            .await
            .context("Provider request failed")?;
        Self::unwrap_envelope(resp).await
    }
}

impl Default for CloudflareApi {
    fn default() -> Self {
        Self::new()
    }
}
