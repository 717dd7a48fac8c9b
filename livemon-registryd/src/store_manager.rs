use std::thread;

use anyhow::Result;
use serde_json::Value;
use shared::types::{RegisteredService, ServiceType};
use tokio::sync::{mpsc, oneshot};

use crate::store::table::{RegisterOutcome, ServiceTable};

/// Commands sent to the store thread
pub enum StoreCommand {
    Register {
        name: String,
        service_type: ServiceType,
        valid: bool,
        description: Option<String>,
        data: Option<Value>,
        reply: oneshot::Sender<Result<RegisterOutcome>>,
    },
    Snapshot(oneshot::Sender<Vec<RegisteredService>>),
    Remove(String, oneshot::Sender<Result<bool>>),
    Shutdown,
}

/// Handle to the single-writer store thread.
///
/// All table mutations funnel through one command channel, which serializes
/// the read-modify-write of the register/renew decision and keeps the
/// persist-before-acknowledge ordering: the reply is only sent after the
/// store file has been written.
#[derive(Clone)]
pub struct StoreHandle {
    tx: mpsc::Sender<StoreCommand>,
}

impl StoreHandle {
    /// Spawn the store thread owning the table. File IO is synchronous, so
    /// the loop runs on a dedicated thread rather than a tokio task.
    pub fn spawn(mut table: ServiceTable, valid_period: i64) -> Self {
        let (tx, mut rx) = mpsc::channel::<StoreCommand>(256);

        thread::spawn(move || {
            while let Some(cmd) = rx.blocking_recv() {
                match cmd {
                    StoreCommand::Register {
                        name,
                        service_type,
                        valid,
                        description,
                        data,
                        reply,
                    } => {
                        let now = chrono::Utc::now().timestamp();
                        let result = table.register(
                            &name,
                            service_type,
                            valid,
                            description,
                            data,
                            valid_period,
                            now,
                        );
                        let _ = reply.send(result);
                    }
                    StoreCommand::Snapshot(reply) => {
                        let _ = reply.send(table.snapshot());
                    }
                    StoreCommand::Remove(name, reply) => {
                        let _ = reply.send(table.remove(&name));
                    }
                    StoreCommand::Shutdown => {
                        tracing::info!("Store thread shutting down");
                        break;
                    }
                }
            }
        });

        Self { tx }
    }

    /// Apply a registration report. Returns once the change is persisted.
    pub async fn register(
        &self,
        name: String,
        service_type: ServiceType,
        valid: bool,
        description: Option<String>,
        data: Option<Value>,
    ) -> Result<RegisterOutcome> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(StoreCommand::Register {
                name,
                service_type,
                valid,
                description,
                data,
                reply,
            })
            .await?;
        rx.await?
    }

    /// Current view of all registered services
    pub async fn snapshot(&self) -> Result<Vec<RegisteredService>> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(StoreCommand::Snapshot(reply)).await?;
        Ok(rx.await?)
    }

    /// Administrative unregister; true if the name existed
    pub async fn remove(&self, name: String) -> Result<bool> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(StoreCommand::Remove(name, reply)).await?;
        rx.await?
    }

    /// Shutdown the store thread
    pub async fn shutdown(&self) -> Result<()> {
        self.tx.send(StoreCommand::Shutdown).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_register_and_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let table = ServiceTable::load(dir.path().join("services.json")).unwrap();
        let handle = StoreHandle::spawn(table, 120);

        let outcome = handle
            .register("web".to_string(), ServiceType::Http, true, None, None)
            .await
            .unwrap();
        assert_eq!(outcome, RegisterOutcome::Registered);

        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].name, "web");

        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_concurrent_reports_serialize() {
        let dir = tempfile::tempdir().unwrap();
        let table = ServiceTable::load(dir.path().join("services.json")).unwrap();
        let handle = StoreHandle::spawn(table, 120);

        // two racing reports for the same name end up as one create plus one
        // renew, never two creates
        let h1 = handle.clone();
        let h2 = handle.clone();
        let (a, b) = tokio::join!(
            h1.register("web".to_string(), ServiceType::Http, true, None, None),
            h2.register("web".to_string(), ServiceType::Http, true, None, None),
        );

        let outcomes = [a.unwrap(), b.unwrap()];
        assert!(outcomes.contains(&RegisterOutcome::Registered));
        assert!(outcomes.contains(&RegisterOutcome::Renewed));

        handle.shutdown().await.unwrap();
    }
}
