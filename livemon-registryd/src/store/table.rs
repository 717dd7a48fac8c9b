use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::Value;
use shared::types::{RegisteredService, ServiceType};

/// Outcome of applying a registration report to the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterOutcome {
    /// Name was unknown, a new record was created
    Registered,
    /// Metadata unchanged, validity window extended
    Renewed,
    /// Same name and type but changed description/data, record replaced
    Updated,
    /// Name exists under a different service type, report rejected
    TypeConflict,
}

/// The authoritative service table.
///
/// Every mutation is written to the store file before it is committed to
/// memory, so an acknowledged registration survives a crash. Callers must
/// serialize mutations (see `StoreHandle`).
pub struct ServiceTable {
    services: HashMap<String, RegisteredService>,
    path: PathBuf,
}

impl ServiceTable {
    /// Load the table from the store file, starting empty if it does not exist
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let services = match std::fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents)
                .with_context(|| format!("Corrupt store file: {}", path.display()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read store file: {}", path.display()))
            }
        };

        Ok(Self { services, path })
    }

    /// Apply a registration report. `valid_until` for the record becomes
    /// `now + valid_period`. The mutation is persisted before this returns;
    /// a persistence failure leaves the in-memory table unchanged.
    pub fn register(
        &mut self,
        name: &str,
        service_type: ServiceType,
        valid: bool,
        description: Option<String>,
        data: Option<Value>,
        valid_period: i64,
        now: i64,
    ) -> Result<RegisterOutcome> {
        let valid_until = now + valid_period;

        let (outcome, record) = match self.services.get(name) {
            None => (
                RegisterOutcome::Registered,
                RegisteredService {
                    name: name.to_string(),
                    service_type,
                    description: description.unwrap_or_default(),
                    create_time: now,
                    valid,
                    valid_until,
                    data: data.unwrap_or(Value::Null),
                },
            ),
            Some(prev) if prev.service_type != service_type => {
                // name+type is the identity key; cross-type reports never overwrite
                return Ok(RegisterOutcome::TypeConflict);
            }
            Some(prev) => {
                // a renew-style report omits metadata; absent fields inherit
                // the record's current values instead of counting as a change
                let description = description.unwrap_or_else(|| prev.description.clone());
                let data = data.unwrap_or_else(|| prev.data.clone());

                if prev.same_metadata(service_type, &description, &data) {
                    let mut renewed = prev.clone();
                    renewed.valid = valid;
                    renewed.valid_until = valid_until;
                    (RegisterOutcome::Renewed, renewed)
                } else {
                    (
                        RegisterOutcome::Updated,
                        RegisteredService {
                            name: name.to_string(),
                            service_type,
                            description,
                            create_time: prev.create_time,
                            valid,
                            valid_until,
                            data,
                        },
                    )
                }
            }
        };

        let prev = self.services.insert(name.to_string(), record);
        if let Err(e) = self.save() {
            // roll back so an unacknowledged change is never served
            match prev {
                Some(p) => {
                    self.services.insert(name.to_string(), p);
                }
                None => {
                    self.services.remove(name);
                }
            }
            return Err(e);
        }

        Ok(outcome)
    }

    /// Administrative removal. Not reachable from the network protocol.
    pub fn remove(&mut self, name: &str) -> Result<bool> {
        let Some(prev) = self.services.remove(name) else {
            return Ok(false);
        };
        if let Err(e) = self.save() {
            self.services.insert(name.to_string(), prev);
            return Err(e);
        }
        Ok(true)
    }

    pub fn get(&self, name: &str) -> Option<&RegisteredService> {
        self.services.get(name)
    }

    pub fn snapshot(&self) -> Vec<RegisteredService> {
        self.services.values().cloned().collect()
    }

    /// Serialize the full table as a JSON object keyed by name and write it
    /// via temp-file-then-rename so the store is never left half-written.
    fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let json = serde_json::to_string_pretty(&self.services)
            .context("Failed to serialize service table")?;

        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)
            .with_context(|| format!("Failed to write store file: {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace store file: {}", self.path.display()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn table() -> (ServiceTable, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let table = ServiceTable::load(dir.path().join("services.json")).unwrap();
        (table, dir)
    }

    #[test]
    fn test_register_creates_record() {
        let (mut table, _dir) = table();

        let outcome = table
            .register(
                "web",
                ServiceType::Http,
                true,
                Some("file server".to_string()),
                Some(json!({"port": 8080})),
                120,
                1000,
            )
            .unwrap();
        assert_eq!(outcome, RegisterOutcome::Registered);

        let srv = table.get("web").unwrap();
        assert_eq!(srv.create_time, 1000);
        assert_eq!(srv.valid_until, 1120);
        assert!(srv.valid);
    }

    #[test]
    fn test_renew_is_idempotent() {
        let (mut table, _dir) = table();

        table
            .register(
                "web",
                ServiceType::Http,
                true,
                Some("file server".to_string()),
                Some(json!({"port": 8080})),
                120,
                1000,
            )
            .unwrap();

        let outcome = table
            .register(
                "web",
                ServiceType::Http,
                true,
                Some("file server".to_string()),
                Some(json!({"port": 8080})),
                120,
                1050,
            )
            .unwrap();
        assert_eq!(outcome, RegisterOutcome::Renewed);

        let srv = table.get("web").unwrap();
        assert_eq!(srv.create_time, 1000, "create_time must not change on renew");
        assert_eq!(srv.valid_until, 1170);
        assert_eq!(srv.description, "file server");
        assert_eq!(srv.data, json!({"port": 8080}));
    }

    #[test]
    fn test_renew_without_metadata_keeps_existing() {
        let (mut table, _dir) = table();

        table
            .register(
                "relay",
                ServiceType::Frpc,
                true,
                Some("tunnel".to_string()),
                Some(json!({"port": 7000})),
                120,
                1000,
            )
            .unwrap();

        // the renew body carries no description/data; the record's metadata
        // must survive untouched
        let outcome = table
            .register("relay", ServiceType::Frpc, false, None, None, 120, 1100)
            .unwrap();
        assert_eq!(outcome, RegisterOutcome::Renewed);

        let srv = table.get("relay").unwrap();
        assert_eq!(srv.description, "tunnel");
        assert_eq!(srv.data, json!({"port": 7000}));
        assert!(!srv.valid, "renew carries the latest verdict");
        assert_eq!(srv.valid_until, 1220);
    }

    #[test]
    fn test_metadata_change_preserves_create_time() {
        let (mut table, _dir) = table();

        table
            .register(
                "web",
                ServiceType::Http,
                true,
                Some("old".to_string()),
                Some(json!({})),
                120,
                1000,
            )
            .unwrap();

        let outcome = table
            .register(
                "web",
                ServiceType::Http,
                false,
                Some("new".to_string()),
                Some(json!({"x": 1})),
                120,
                2000,
            )
            .unwrap();
        assert_eq!(outcome, RegisterOutcome::Updated);

        let srv = table.get("web").unwrap();
        assert_eq!(srv.create_time, 1000);
        assert_eq!(srv.description, "new");
        assert_eq!(srv.data, json!({"x": 1}));
        assert!(!srv.valid);
    }

    #[test]
    fn test_cross_type_registration_rejected() {
        let (mut table, _dir) = table();

        table
            .register("web", ServiceType::Http, true, None, None, 120, 1000)
            .unwrap();

        let outcome = table
            .register("web", ServiceType::Dns, true, None, None, 120, 2000)
            .unwrap();
        assert_eq!(outcome, RegisterOutcome::TypeConflict);

        // the existing record is untouched
        let srv = table.get("web").unwrap();
        assert_eq!(srv.service_type, ServiceType::Http);
        assert_eq!(srv.valid_until, 1120);
    }

    #[test]
    fn test_persistence_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("services.json");

        let mut table = ServiceTable::load(&path).unwrap();
        table
            .register(
                "web",
                ServiceType::Https,
                true,
                Some("site".to_string()),
                Some(json!({"domain": "a.example.com"})),
                120,
                1000,
            )
            .unwrap();
        drop(table);

        let reloaded = ServiceTable::load(&path).unwrap();
        let srv = reloaded.get("web").unwrap();
        assert_eq!(srv.service_type, ServiceType::Https);
        assert_eq!(srv.create_time, 1000);
        assert_eq!(srv.data, json!({"domain": "a.example.com"}));
    }

    #[test]
    fn test_persisted_layout_keyed_by_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("services.json");

        let mut table = ServiceTable::load(&path).unwrap();
        table
            .register("web", ServiceType::Http, true, None, None, 120, 1000)
            .unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["web"]["type"], "http");
        assert_eq!(raw["web"]["create_time"], 1000);
    }

    #[test]
    fn test_remove() {
        let (mut table, _dir) = table();

        table
            .register("web", ServiceType::Http, true, None, None, 120, 1000)
            .unwrap();
        assert!(table.remove("web").unwrap());
        assert!(!table.remove("web").unwrap());
        assert!(table.get("web").is_none());
    }
}
