use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::process::Command;

use crate::checks::HealthCheck;
use crate::netinfo::{self, IpFamily};

/// Timeout applied to network-type probes
const CHECK_TIMEOUT: Duration = Duration::from_secs(5);

fn str_param<'a>(params: &'a [Value], idx: usize) -> Option<&'a str> {
    params.get(idx).and_then(Value::as_str)
}

fn int_param(params: &[Value], idx: usize) -> Option<i64> {
    params.get(idx).and_then(Value::as_i64)
}

/// systemd unit status: healthy iff `systemctl is-active` reports active
pub struct SystemdCheck;

#[async_trait]
impl HealthCheck for SystemdCheck {
    async fn evaluate(&self, params: &[Value]) -> bool {
        let Some(unit) = str_param(params, 0) else {
            tracing::warn!("systemd check: missing unit name parameter");
            return false;
        };
        match Command::new("systemctl")
            .args(["is-active", "--quiet", unit])
            .status()
            .await
        {
            Ok(status) => status.success(),
            Err(e) => {
                tracing::warn!("systemd check for {unit} failed to run: {e}");
                false
            }
        }
    }
}

/// TCP reachability: healthy iff a connection is established within the timeout
pub struct TcpCheck;

#[async_trait]
impl HealthCheck for TcpCheck {
    async fn evaluate(&self, params: &[Value]) -> bool {
        let (Some(host), Some(port)) = (str_param(params, 0), int_param(params, 1)) else {
            tracing::warn!("tcp check: expected (host, port) parameters");
            return false;
        };
        let Ok(port) = u16::try_from(port) else {
            tracing::warn!("tcp check: port {port} out of range");
            return false;
        };
        matches!(
            tokio::time::timeout(CHECK_TIMEOUT, tokio::net::TcpStream::connect((host, port))).await,
            Ok(Ok(_))
        )
    }
}

/// HTTP reachability: healthy iff the request completes, whatever the status
pub struct HttpCheck {
    client: reqwest::Client,
}

impl HttpCheck {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl HealthCheck for HttpCheck {
    async fn evaluate(&self, params: &[Value]) -> bool {
        let Some(url) = str_param(params, 0) else {
            tracing::warn!("http check: missing url parameter");
            return false;
        };
        self.client
            .get(url)
            .timeout(CHECK_TIMEOUT)
            .send()
            .await
            .is_ok()
    }
}

/// ICMP reachability via the system ping binary
pub struct PingCheck;

#[async_trait]
impl HealthCheck for PingCheck {
    async fn evaluate(&self, params: &[Value]) -> bool {
        let Some(host) = str_param(params, 0) else {
            tracing::warn!("ping check: missing host parameter");
            return false;
        };
        match Command::new("ping")
            .args(["-c", "2", "-W", "2", host])
            .stdout(Stdio::null())
            .status()
            .await
        {
            Ok(status) => status.success(),
            Err(e) => {
                tracing::warn!("ping check for {host} failed to run: {e}");
                false
            }
        }
    }
}

/// Address-resolution probe: healthy iff the domain's resolved address set
/// intersects this host's own address set for the same family
pub struct DnsCheck;

#[async_trait]
impl HealthCheck for DnsCheck {
    async fn evaluate(&self, params: &[Value]) -> bool {
        let Some(domain) = str_param(params, 0) else {
            tracing::warn!("dns check: missing domain parameter");
            return false;
        };
        let family = params
            .get(1)
            .and_then(IpFamily::from_param)
            .unwrap_or(IpFamily::V4);

        let resolved = match netinfo::resolve(domain, family).await {
            Ok(addrs) => addrs,
            Err(e) => {
                tracing::debug!("dns check: resolving {domain} failed: {e}");
                return false;
            }
        };
        let local = match netinfo::local_addrs(family).await {
            Ok(addrs) => addrs,
            Err(e) => {
                tracing::debug!("dns check: local address lookup failed: {e}");
                return false;
            }
        };
        !resolved.is_disjoint(&local)
    }
}

/// File presence: healthy iff the path exists and is a regular file
pub struct FileCheck;

#[async_trait]
impl HealthCheck for FileCheck {
    async fn evaluate(&self, params: &[Value]) -> bool {
        let Some(path) = str_param(params, 0) else {
            tracing::warn!("file check: missing path parameter");
            return false;
        };
        tokio::fs::metadata(path)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false)
    }
}

/// Pid liveness: healthy iff signal 0 does not report "no such process".
/// EPERM still counts as alive, the process just belongs to someone else.
pub struct PidCheck;

#[async_trait]
impl HealthCheck for PidCheck {
    async fn evaluate(&self, params: &[Value]) -> bool {
        let Some(pid) = int_param(params, 0) else {
            tracing::warn!("pid check: missing pid parameter");
            return false;
        };
        let Ok(pid) = libc::pid_t::try_from(pid) else {
            tracing::warn!("pid check: pid {pid} out of range");
            return false;
        };
        let ret = unsafe { libc::kill(pid, 0) };
        ret == 0 || std::io::Error::last_os_error().raw_os_error() != Some(libc::ESRCH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_malformed_params_are_unhealthy() {
        assert!(!SystemdCheck.evaluate(&[]).await);
        assert!(!TcpCheck.evaluate(&[json!("localhost")]).await);
        assert!(!TcpCheck.evaluate(&[json!("localhost"), json!(70000)]).await);
        assert!(!HttpCheck::new().evaluate(&[json!(42)]).await);
        assert!(!PingCheck.evaluate(&[]).await);
        assert!(!DnsCheck.evaluate(&[]).await);
        assert!(!FileCheck.evaluate(&[]).await);
        assert!(!PidCheck.evaluate(&[json!("not-a-pid")]).await);
    }

    #[tokio::test]
    async fn test_file_check() {
        let dir = std::env::temp_dir();
        let path = dir.join("livemon-file-check-test");
        std::fs::write(&path, b"x").unwrap();

        assert!(
            FileCheck
                .evaluate(&[json!(path.to_string_lossy())])
                .await
        );
        assert!(
            !FileCheck
                .evaluate(&[json!(dir.to_string_lossy())])
                .await,
            "directories are not files"
        );
        assert!(!FileCheck.evaluate(&[json!("/no/such/file")]).await);

        std::fs::remove_file(&path).unwrap();
    }

    #[tokio::test]
    async fn test_pid_check_own_process() {
        let pid = std::process::id() as i64;
        assert!(PidCheck.evaluate(&[json!(pid)]).await);
    }

    #[tokio::test]
    async fn test_tcp_check_refused_port() {
        // nothing listens on this port of the discard range
        assert!(!TcpCheck.evaluate(&[json!("127.0.0.1"), json!(9)]).await);
    }
}
