//! Lot registry: read access over physical inventory lots
//!
//! Read-only queries for allocation (FIFO/FEFO ordering) plus the
//! row-locked fetch and guarded decrement used inside the execution
//! transaction. Lots with zero quantity are excluded from allocation but
//! never deleted, to preserve the audit trail.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use shared::{Lot, LotOrdering};

use crate::error::{AppError, AppResult};

/// Row tuple for lot queries
type LotRow = (
    Uuid,
    Uuid,
    Uuid,
    Uuid,
    String,
    Decimal,
    Decimal,
    Option<NaiveDate>,
    Option<NaiveDate>,
    bool,
    DateTime<Utc>,
    DateTime<Utc>,
);

const LOT_COLUMNS: &str = "id, company_id, product_id, warehouse_id, lot_number, \
     quantity_remaining, unit_cost, manufactured_date, expiration_date, \
     is_available, created_at, updated_at";

fn lot_from_row(row: LotRow) -> Lot {
    Lot {
        id: row.0,
        company_id: row.1,
        product_id: row.2,
        warehouse_id: row.3,
        lot_number: row.4,
        quantity_remaining: row.5,
        unit_cost: row.6,
        manufactured_date: row.7,
        expiration_date: row.8,
        is_available: row.9,
        created_at: row.10,
        updated_at: row.11,
    }
}

/// Registry service for querying and mutating lots
#[derive(Clone)]
pub struct LotRegistry {
    db: PgPool,
}

impl LotRegistry {
    /// Create a new LotRegistry instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Lots of a product with stock remaining, in allocation order.
    ///
    /// FIFO orders by receipt (creation) order, oldest first; FEFO orders by
    /// expiration date ascending with undated lots last. Unavailable and
    /// exhausted lots are excluded.
    pub async fn lots_for(
        &self,
        company_id: Uuid,
        product_id: Uuid,
        warehouse_id: Option<Uuid>,
        ordering: LotOrdering,
    ) -> AppResult<Vec<Lot>> {
        let order_clause = match ordering {
            LotOrdering::Fifo => "created_at ASC",
            LotOrdering::Fefo => "expiration_date ASC NULLS LAST, created_at ASC",
        };

        let rows: Vec<LotRow> = if let Some(warehouse_id) = warehouse_id {
            sqlx::query_as(&format!(
                "SELECT {LOT_COLUMNS} FROM lots \
                 WHERE company_id = $1 AND product_id = $2 AND warehouse_id = $3 \
                   AND quantity_remaining > 0 AND is_available = TRUE \
                 ORDER BY {order_clause}"
            ))
            .bind(company_id)
            .bind(product_id)
            .bind(warehouse_id)
            .fetch_all(&self.db)
            .await?
        } else {
            sqlx::query_as(&format!(
                "SELECT {LOT_COLUMNS} FROM lots \
                 WHERE company_id = $1 AND product_id = $2 \
                   AND quantity_remaining > 0 AND is_available = TRUE \
                 ORDER BY {order_clause}"
            ))
            .bind(company_id)
            .bind(product_id)
            .fetch_all(&self.db)
            .await?
        };

        Ok(rows.into_iter().map(lot_from_row).collect())
    }

    /// Get a lot by id
    pub async fn get_lot(&self, company_id: Uuid, lot_id: Uuid) -> AppResult<Lot> {
        let row: LotRow = sqlx::query_as(&format!(
            "SELECT {LOT_COLUMNS} FROM lots WHERE id = $1 AND company_id = $2"
        ))
        .bind(lot_id)
        .bind(company_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Lot".to_string()))?;

        Ok(lot_from_row(row))
    }

    /// Total available quantity of a product at a warehouse
    pub async fn available_quantity(
        &self,
        company_id: Uuid,
        product_id: Uuid,
        warehouse_id: Uuid,
    ) -> AppResult<Decimal> {
        let total: Decimal = sqlx::query_scalar(
            "SELECT COALESCE(SUM(quantity_remaining), 0) FROM lots \
             WHERE company_id = $1 AND product_id = $2 AND warehouse_id = $3 \
               AND is_available = TRUE",
        )
        .bind(company_id)
        .bind(product_id)
        .bind(warehouse_id)
        .fetch_one(&self.db)
        .await?;

        Ok(total)
    }

    /// Fetch a lot with a row lock, inside the execution transaction.
    ///
    /// Concurrent executions against the same lot serialize here, so the
    /// availability re-check below cannot be invalidated before commit.
    pub async fn lock_lot(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        lot_id: Uuid,
    ) -> AppResult<Lot> {
        let row: LotRow = sqlx::query_as(&format!(
            "SELECT {LOT_COLUMNS} FROM lots WHERE id = $1 FOR UPDATE"
        ))
        .bind(lot_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Lot".to_string()))?;

        Ok(lot_from_row(row))
    }

    /// Decrement a lot's remaining quantity inside a transaction.
    ///
    /// The WHERE clause refuses to take the quantity below zero; zero
    /// affected rows means the lot changed since it was locked and the
    /// caller must roll back.
    pub async fn decrement_lot(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        lot_id: Uuid,
        quantity: Decimal,
    ) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE lots \
             SET quantity_remaining = quantity_remaining - $2, updated_at = NOW() \
             WHERE id = $1 AND quantity_remaining >= $2",
        )
        .bind(lot_id)
        .bind(quantity)
        .execute(&mut **tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::InsufficientStock {
                requested: quantity,
                available: Decimal::ZERO,
            });
        }
        Ok(())
    }

    /// Increment a lot's remaining quantity inside a transaction
    /// (positive adjustments against an existing lot)
    pub async fn increment_lot(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        lot_id: Uuid,
        quantity: Decimal,
    ) -> AppResult<()> {
        sqlx::query(
            "UPDATE lots \
             SET quantity_remaining = quantity_remaining + $2, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(lot_id)
        .bind(quantity)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    /// Create a lot on receipt (purchase, production, transfer destination)
    #[allow(clippy::too_many_arguments)]
    pub async fn create_lot(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        company_id: Uuid,
        product_id: Uuid,
        warehouse_id: Uuid,
        lot_number: &str,
        quantity: Decimal,
        unit_cost: Decimal,
        manufactured_date: Option<NaiveDate>,
        expiration_date: Option<NaiveDate>,
    ) -> AppResult<Lot> {
        let row: LotRow = sqlx::query_as(&format!(
            "INSERT INTO lots (company_id, product_id, warehouse_id, lot_number, \
                               quantity_remaining, unit_cost, manufactured_date, expiration_date) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {LOT_COLUMNS}"
        ))
        .bind(company_id)
        .bind(product_id)
        .bind(warehouse_id)
        .bind(lot_number)
        .bind(quantity)
        .bind(unit_cost)
        .bind(manufactured_date)
        .bind(expiration_date)
        .fetch_one(&mut **tx)
        .await?;

        Ok(lot_from_row(row))
    }
}
