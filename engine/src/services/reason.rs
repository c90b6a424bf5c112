//! Movement reason configuration store
//!
//! Read-only provider of approval policy per movement category. Injected
//! into the movement workflow at construction; there is no process-wide
//! settings singleton.

use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use shared::MovementReason;

use crate::error::{AppError, AppResult};

/// Store for movement reason configuration
#[derive(Clone)]
pub struct MovementReasonStore {
    db: PgPool,
}

impl MovementReasonStore {
    /// Create a new MovementReasonStore instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Find an active reason by id. A missing or inactive reason is a
    /// validation failure for the requesting movement.
    pub async fn find(&self, company_id: Uuid, reason_id: Uuid) -> AppResult<MovementReason> {
        let row: Option<(Uuid, Uuid, String, bool, Option<Decimal>, bool)> = sqlx::query_as(
            "SELECT id, company_id, name, requires_approval, approval_threshold, is_active \
             FROM movement_reasons \
             WHERE id = $1 AND company_id = $2",
        )
        .bind(reason_id)
        .bind(company_id)
        .fetch_optional(&self.db)
        .await?;

        let row = row.ok_or_else(|| AppError::NotFound("MovementReason".to_string()))?;
        if !row.5 {
            return Err(AppError::validation(
                "reason_id",
                "Movement reason is inactive",
            ));
        }

        Ok(MovementReason {
            id: row.0,
            company_id: row.1,
            name: row.2,
            requires_approval: row.3,
            approval_threshold: row.4,
            is_active: row.5,
        })
    }

    /// List active reasons for a company
    pub async fn list_active(&self, company_id: Uuid) -> AppResult<Vec<MovementReason>> {
        let rows: Vec<(Uuid, Uuid, String, bool, Option<Decimal>, bool)> = sqlx::query_as(
            "SELECT id, company_id, name, requires_approval, approval_threshold, is_active \
             FROM movement_reasons \
             WHERE company_id = $1 AND is_active = TRUE \
             ORDER BY name",
        )
        .bind(company_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| MovementReason {
                id: row.0,
                company_id: row.1,
                name: row.2,
                requires_approval: row.3,
                approval_threshold: row.4,
                is_active: row.5,
            })
            .collect())
    }
}
