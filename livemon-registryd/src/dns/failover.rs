use anyhow::{anyhow, Result};
use serde_json::Value;
use shared::protocol::{DnsUpsertRequest, UpsertKind, UpsertResponse};

use crate::config::ZoneBinding;
use crate::dns::cloudflare::{CloudflareApi, RecordPayload, TTL_AUTO};

/// Provider-side TTL bounds for explicitly supplied values
const TTL_MIN: u32 = 60;
const TTL_MAX: u32 = 86400;

/// Validate a caller-supplied TTL. An omitted TTL maps to the provider's
/// automatic sentinel; an out-of-range value is a caller error.
pub fn validate_ttl(ttl: Option<u32>) -> Result<u32, u32> {
    match ttl {
        None => Ok(TTL_AUTO),
        Some(ttl) if (TTL_MIN..=TTL_MAX).contains(&ttl) => Ok(ttl),
        Some(ttl) => Err(ttl),
    }
}

/// Scan a provider record list for the record whose name equals the requested
/// domain exactly, returning its identifier.
pub fn find_record<'a>(records: &'a [Value], domain: &str) -> Option<&'a str> {
    records
        .iter()
        .find(|rec| rec.get("name").and_then(Value::as_str) == Some(domain))
        .and_then(|rec| rec.get("id").and_then(Value::as_str))
}

/// Reconcile one desired record against the provider's current record set:
/// update in place when a record with the exact domain name exists, create
/// otherwise. The provider's storage is canonical; racing duplicates converge
/// by last-write-wins rather than locking.
pub async fn upsert_record(
    api: &CloudflareApi,
    zone: &ZoneBinding,
    req: &DnsUpsertRequest,
    ttl: u32,
) -> Result<UpsertResponse> {
    let records = api.list_records(zone).await?;

    let payload = RecordPayload {
        record_type: req.record_type.clone().unwrap_or_else(|| "A".to_string()),
        name: req.domain.clone(),
        content: req.content.clone(),
        ttl,
        priority: req.priority,
        proxied: req.proxied.unwrap_or(false),
    };

    match find_record(&records, &req.domain) {
        Some(record_id) => {
            let result = api.update_record(zone, record_id, &payload).await?;
            Ok(UpsertResponse {
                kind: UpsertKind::Update,
                result,
            })
        }
        None => {
            let result = api.create_record(zone, &payload).await?;
            Ok(UpsertResponse {
                kind: UpsertKind::Add,
                result,
            })
        }
    }
}

/// Delete the record matching the exact domain name. Returns the provider's
/// response, or `Ok(None)` when no record with that name exists.
pub async fn delete_record(
    api: &CloudflareApi,
    zone: &ZoneBinding,
    domain: &str,
) -> Result<Option<Value>> {
    let records = api.list_records(zone).await?;

    match find_record(&records, domain) {
        Some(record_id) => {
            let record_id = record_id.to_string();
            let result = api.delete_record(zone, &record_id).await?;
            Ok(Some(result))
        }
        None => Ok(None),
    }
}

/// Guard for zones configured with a read-only api key
pub fn require_edit(zone: &ZoneBinding) -> Result<()> {
    if zone.edit {
        Ok(())
    } else {
        Err(anyhow!("Zone api key does not permit record edits"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ttl_validation() {
        assert_eq!(validate_ttl(None), Ok(TTL_AUTO));
        assert_eq!(validate_ttl(Some(300)), Ok(300));
        assert_eq!(validate_ttl(Some(60)), Ok(60));
        assert_eq!(validate_ttl(Some(86400)), Ok(86400));
        assert_eq!(validate_ttl(Some(30)), Err(30));
        assert_eq!(validate_ttl(Some(59)), Err(59));
        assert_eq!(validate_ttl(Some(86401)), Err(86401));
    }

    #[test]
    fn test_find_record_exact_name() {
        let records = vec![
            json!({"id": "R1", "name": "a.example.com", "type": "A"}),
            json!({"id": "R2", "name": "b.example.com", "type": "AAAA"}),
        ];

        assert_eq!(find_record(&records, "a.example.com"), Some("R1"));
        assert_eq!(find_record(&records, "b.example.com"), Some("R2"));
        assert_eq!(find_record(&records, "c.example.com"), None);
        // no suffix matching here: the name must be exact
        assert_eq!(find_record(&records, "example.com"), None);
    }

    #[test]
    fn test_find_record_empty_list() {
        assert_eq!(find_record(&[], "a.example.com"), None);
    }
}
