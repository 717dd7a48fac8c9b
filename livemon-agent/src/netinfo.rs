use std::collections::HashSet;
use std::net::IpAddr;

use anyhow::{anyhow, Context, Result};
use serde_json::Value;

/// Address family for probes and failover records
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpFamily {
    V4,
    V6,
}

impl IpFamily {
    /// Parse the family from a check parameter (`4` or `6`, number or string)
    pub fn from_param(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => match n.as_i64() {
                Some(4) => Some(IpFamily::V4),
                Some(6) => Some(IpFamily::V6),
                _ => None,
            },
            Value::String(s) => match s.as_str() {
                "4" => Some(IpFamily::V4),
                "6" => Some(IpFamily::V6),
                _ => None,
            },
            _ => None,
        }
    }

    /// DNS record type carrying an address of this family
    pub fn record_type(self) -> &'static str {
        match self {
            IpFamily::V4 => "A",
            IpFamily::V6 => "AAAA",
        }
    }

    pub fn matches(self, addr: &IpAddr) -> bool {
        match self {
            IpFamily::V4 => addr.is_ipv4(),
            IpFamily::V6 => addr.is_ipv6(),
        }
    }
}

/// Resolve a name to its address set for one family
pub async fn resolve(host: &str, family: IpFamily) -> Result<HashSet<IpAddr>> {
    let addrs: HashSet<IpAddr> = tokio::net::lookup_host((host, 0u16))
        .await
        .with_context(|| format!("Failed to resolve {host}"))?
        .map(|sock| sock.ip())
        .filter(|ip| family.matches(ip))
        .collect();
    Ok(addrs)
}

/// The local host's address set for one family, resolved via its own hostname
pub async fn local_addrs(family: IpFamily) -> Result<HashSet<IpAddr>> {
    let host = hostname::get()
        .context("Failed to read local hostname")?
        .to_string_lossy()
        .into_owned();
    resolve(&host, family).await
}

/// One local address of the requested family, used as failover record content
pub async fn local_addr(family: IpFamily) -> Result<IpAddr> {
    local_addrs(family)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("No local address for family {:?}", family))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_family_from_param() {
        assert_eq!(IpFamily::from_param(&json!(4)), Some(IpFamily::V4));
        assert_eq!(IpFamily::from_param(&json!(6)), Some(IpFamily::V6));
        assert_eq!(IpFamily::from_param(&json!("4")), Some(IpFamily::V4));
        assert_eq!(IpFamily::from_param(&json!(5)), None);
        assert_eq!(IpFamily::from_param(&json!(null)), None);
    }

    #[test]
    fn test_record_type() {
        assert_eq!(IpFamily::V4.record_type(), "A");
        assert_eq!(IpFamily::V6.record_type(), "AAAA");
    }

    #[test]
    fn test_family_matches() {
        let v4: IpAddr = "127.0.0.1".parse().unwrap();
        let v6: IpAddr = "::1".parse().unwrap();
        assert!(IpFamily::V4.matches(&v4));
        assert!(!IpFamily::V4.matches(&v6));
        assert!(IpFamily::V6.matches(&v6));
    }

    #[tokio::test]
    async fn test_resolve_localhost() {
        let addrs = resolve("localhost", IpFamily::V4).await.unwrap();
        assert!(addrs.contains(&"127.0.0.1".parse().unwrap()));
    }
}
