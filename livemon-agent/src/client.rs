use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use shared::protocol::{DnsUpsertRequest, RegisterRequest, API_DNS_UPDATE, API_SRV_REG, API_SRV_RENEW};

use crate::config::ServiceDefinition;
use crate::netinfo::{self, IpFamily};

/// Where the scheduler sends verdicts and failover requests.
/// Split out as a trait so scheduler behavior is testable without a registry.
#[async_trait]
pub trait ReportSink: Send + Sync {
    /// Report one evaluation verdict; `first_run` selects register over renew
    async fn report(&self, def: &ServiceDefinition, valid: bool, first_run: bool) -> Result<()>;

    /// Ask the registry to repoint the service's DNS record at this host
    async fn dns_failover(&self, def: &ServiceDefinition) -> Result<()>;
}

/// HTTP client for the registry API
pub struct RegistryClient {
    base_url: String,
    token: String,
    http: reqwest::Client,
}

impl RegistryClient {
    pub fn new(server_url: &str, token: &str) -> Self {
        Self {
            base_url: server_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            http: reqwest::Client::new(),
        }
    }

    async fn post_json<T: serde::Serialize>(&self, path: &str, body: &T) -> Result<()> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .with_context(|| format!("Request to {path} failed"))?;

        if !resp.status().is_success() {
            bail!("Registry answered {} on {path}", resp.status());
        }
        Ok(())
    }
}

#[async_trait]
impl ReportSink for RegistryClient {
    async fn report(&self, def: &ServiceDefinition, valid: bool, first_run: bool) -> Result<()> {
        let body = RegisterRequest {
            token: self.token.clone(),
            name: def.name.clone(),
            service_type: def.service_type,
            valid,
            // metadata travels only on first registration
            description: first_run.then(|| def.description.clone()),
            data: first_run.then(|| def.data.clone()),
        };
        let path = if first_run { API_SRV_REG } else { API_SRV_RENEW };
        self.post_json(path, &body).await
    }

    async fn dns_failover(&self, def: &ServiceDefinition) -> Result<()> {
        let domain = def
            .data
            .get("domain")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow!("DNS service {} has no data.domain", def.name))?;

        // the record family follows the check's configured family
        let family = def
            .method
            .param
            .last()
            .and_then(IpFamily::from_param)
            .unwrap_or(IpFamily::V4);
        let content = netinfo::local_addr(family).await?;

        let body = DnsUpsertRequest {
            token: self.token.clone(),
            domain: domain.to_string(),
            record_type: Some(family.record_type().to_string()),
            content: content.to_string(),
            ttl: def
                .data
                .get("ttl")
                .and_then(|v| v.as_u64())
                .and_then(|v| u32::try_from(v).ok()),
            priority: def
                .data
                .get("priority")
                .and_then(|v| v.as_u64())
                .and_then(|v| u16::try_from(v).ok()),
            proxied: def.data.get("proxied").and_then(|v| v.as_bool()),
        };
        self.post_json(API_DNS_UPDATE, &body).await
    }
}
