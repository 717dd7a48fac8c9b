use std::time::Duration;

use anyhow::{bail, Result};
use shared::types::ServiceType;
use tokio_util::sync::CancellationToken;

use crate::checks::CheckTable;
use crate::client::ReportSink;
use crate::config::ServiceDefinition;

/// A service definition plus its validity window on this node
struct ScheduledService {
    def: ServiceDefinition,
    valid_until: i64,
}

/// Cooperative evaluation loop over this node's services.
///
/// One pass evaluates every due service sequentially, so two evaluations of
/// the same service can never overlap. The very first pass evaluates
/// everything unconditionally so the registry learns about all services at
/// startup.
pub struct Scheduler<S: ReportSink> {
    services: Vec<ScheduledService>,
    checks: CheckTable,
    sink: S,
}

impl<S: ReportSink> Scheduler<S> {
    /// Build the scheduler. An unknown check backend name in any service
    /// definition is a configuration error and refuses startup.
    pub fn new(defs: Vec<ServiceDefinition>, checks: CheckTable, sink: S) -> Result<Self> {
        let now = chrono::Utc::now().timestamp();
        let mut services = Vec::with_capacity(defs.len());
        for def in defs {
            if !checks.contains(&def.method.name) {
                bail!(
                    "Unknown check backend '{}' for service '{}'",
                    def.method.name,
                    def.name
                );
            }
            let valid_until = now + def.check_period;
            services.push(ScheduledService { def, valid_until });
        }
        Ok(Self {
            services,
            checks,
            sink,
        })
    }

    /// Run until cancelled: one unconditional first pass, then one pass per tick
    pub async fn run(mut self, sleep_interval: u64, cancel: CancellationToken) {
        self.pass(true, chrono::Utc::now().timestamp()).await;

        loop {
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_secs(sleep_interval)) => {
                    self.pass(false, chrono::Utc::now().timestamp()).await;
                }
                _ = cancel.cancelled() => {
                    tracing::info!("Scheduler shutting down");
                    break;
                }
            }
        }
    }

    /// One pass over all services, evaluating those that are due
    async fn pass(&mut self, first_run: bool, now: i64) {
        let Self {
            services,
            checks,
            sink,
        } = self;

        for svc in services.iter_mut() {
            if !first_run && now < svc.valid_until {
                continue;
            }

            let healthy = match checks.get(&svc.def.method.name) {
                Some(check) => check.evaluate(&svc.def.method.param).await,
                None => {
                    // backend names were validated at startup
                    tracing::warn!("No backend '{}' registered", svc.def.method.name);
                    false
                }
            };

            if healthy {
                svc.valid_until = now + svc.def.check_period;
            } else {
                tracing::warn!(service = %svc.def.name, "Health check failed");
                // failover is best effort: the reported verdict stays unhealthy
                if svc.def.service_type == ServiceType::Dns {
                    match sink.dns_failover(&svc.def).await {
                        Ok(()) => {
                            tracing::info!(service = %svc.def.name, "DNS failover submitted")
                        }
                        Err(e) => {
                            tracing::warn!(service = %svc.def.name, "DNS failover failed: {e:#}")
                        }
                    }
                }
            }

            if let Err(e) = sink.report(&svc.def, healthy, first_run).await {
                tracing::warn!(service = %svc.def.name, "Report failed: {e:#}");
            }
        }
    }
}
