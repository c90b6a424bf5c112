//! Asynchronous inventory projection
//!
//! Stock summaries are denormalized per (product, warehouse) and recomputed
//! out of band: movement execution enqueues a job and commits without
//! waiting. Delivery is at-least-once; the projector recomputes from source
//! rows, so re-processing the same movement id is harmless.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::{error, info};
use uuid::Uuid;

use crate::error::AppResult;

/// A projection job for one (product, warehouse) summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectorJob {
    /// Movement that triggered the recompute, for traceability
    pub movement_id: Uuid,
    pub product_id: Uuid,
    pub warehouse_id: Uuid,
}

/// Queue contract for scheduling projection work; fire-and-forget from the
/// workflow's perspective
#[async_trait]
pub trait ProjectorQueue: Send + Sync {
    async fn enqueue(&self, job: ProjectorJob) -> Result<(), String>;
}

/// Channel-backed queue feeding the in-process worker
#[derive(Debug, Clone)]
pub struct ChannelProjectorQueue {
    sender: mpsc::Sender<ProjectorJob>,
}

impl ChannelProjectorQueue {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<ProjectorJob>) {
        let (sender, receiver) = mpsc::channel(capacity);
        (Self { sender }, receiver)
    }
}

#[async_trait]
impl ProjectorQueue for ChannelProjectorQueue {
    async fn enqueue(&self, job: ProjectorJob) -> Result<(), String> {
        self.sender
            .send(job)
            .await
            .map_err(|e| format!("Failed to enqueue projector job: {}", e))
    }
}

/// Recording queue for tests
#[derive(Debug, Default, Clone)]
pub struct RecordingProjectorQueue {
    jobs: Arc<Mutex<Vec<ProjectorJob>>>,
}

impl RecordingProjectorQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueued(&self) -> Vec<ProjectorJob> {
        self.jobs.lock().expect("job log poisoned").clone()
    }
}

#[async_trait]
impl ProjectorQueue for RecordingProjectorQueue {
    async fn enqueue(&self, job: ProjectorJob) -> Result<(), String> {
        self.jobs.lock().expect("job log poisoned").push(job);
        Ok(())
    }
}

/// Projector that recomputes denormalized stock summaries
#[derive(Clone)]
pub struct InventoryProjector {
    db: PgPool,
}

impl InventoryProjector {
    /// Create a new InventoryProjector instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Recompute the stock summary for one (product, warehouse) pair from
    /// the lots table. Idempotent by construction.
    pub async fn rebuild_summary(&self, product_id: Uuid, warehouse_id: Uuid) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO stock_summaries (product_id, warehouse_id, quantity, total_value, lot_count, refreshed_at)
            SELECT $1, $2,
                   COALESCE(SUM(quantity_remaining), 0),
                   COALESCE(SUM(quantity_remaining * unit_cost), 0),
                   COUNT(*) FILTER (WHERE quantity_remaining > 0),
                   NOW()
            FROM lots
            WHERE product_id = $1 AND warehouse_id = $2 AND is_available = TRUE
            ON CONFLICT (product_id, warehouse_id) DO UPDATE
            SET quantity = EXCLUDED.quantity,
                total_value = EXCLUDED.total_value,
                lot_count = EXCLUDED.lot_count,
                refreshed_at = EXCLUDED.refreshed_at
            "#,
        )
        .bind(product_id)
        .bind(warehouse_id)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    /// Rebuild every known (product, warehouse) summary. Backstop for jobs
    /// lost between enqueue and processing; delivery is at-least-once, so
    /// repeating work is safe.
    pub async fn sweep(&self) -> AppResult<u64> {
        let pairs: Vec<(Uuid, Uuid)> = sqlx::query_as(
            "SELECT DISTINCT product_id, warehouse_id FROM lots WHERE is_available = TRUE",
        )
        .fetch_all(&self.db)
        .await?;

        let count = pairs.len() as u64;
        for (product_id, warehouse_id) in pairs {
            self.rebuild_summary(product_id, warehouse_id).await?;
        }
        Ok(count)
    }

    /// Worker loop: drain the job channel until it closes. Failures are
    /// logged and the loop continues; a dropped job is picked up by the
    /// next recompute for the same pair.
    pub async fn run(&self, mut receiver: mpsc::Receiver<ProjectorJob>) {
        info!("Inventory projector worker started");
        while let Some(job) = receiver.recv().await {
            if let Err(e) = self.rebuild_summary(job.product_id, job.warehouse_id).await {
                error!(
                    movement_id = %job.movement_id,
                    product_id = %job.product_id,
                    warehouse_id = %job.warehouse_id,
                    error = %e,
                    "Failed to rebuild stock summary"
                );
            }
        }
        info!("Inventory projector worker stopped");
    }
}
