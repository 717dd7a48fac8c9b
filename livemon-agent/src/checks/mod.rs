pub mod backends;

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;

/// A pluggable health-check backend.
///
/// Implementations turn a parameter list into a boolean verdict. Probe
/// failures of any kind (timeouts, resolution errors, bad parameters) are an
/// unhealthy verdict, never an error.
#[async_trait]
pub trait HealthCheck: Send + Sync {
    async fn evaluate(&self, params: &[Value]) -> bool;
}

/// Registration table mapping backend names to implementations.
/// New backends are added here, not by branching in the scheduler.
pub struct CheckTable {
    backends: HashMap<&'static str, Box<dyn HealthCheck>>,
}

impl CheckTable {
    /// Table with all built-in backends registered
    pub fn builtin() -> Self {
        let mut table = Self {
            backends: HashMap::new(),
        };
        table.register("systemd", Box::new(backends::SystemdCheck));
        table.register("tcp", Box::new(backends::TcpCheck));
        table.register("http", Box::new(backends::HttpCheck::new()));
        table.register("ping", Box::new(backends::PingCheck));
        table.register("dns", Box::new(backends::DnsCheck));
        table.register("file", Box::new(backends::FileCheck));
        table.register("pid", Box::new(backends::PidCheck));
        table
    }

    pub fn register(&mut self, name: &'static str, check: Box<dyn HealthCheck>) {
        self.backends.insert(name, check);
    }

    pub fn get(&self, name: &str) -> Option<&dyn HealthCheck> {
        self.backends.get(name).map(|b| b.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.backends.contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_backends_registered() {
        let table = CheckTable::builtin();
        for name in ["systemd", "tcp", "http", "ping", "dns", "file", "pid"] {
            assert!(table.contains(name), "missing builtin backend {name}");
        }
        assert!(!table.contains("smoke-signal"));
    }
}
