//! Pre-flight alerting checks for the movement workflow
//!
//! Advisory checks run before stock mutation: stock-overflow attempts and
//! transactions dated inside a closed accounting period. Raising an alert
//! does not by itself block execution; escalation to a rejection is a
//! workflow policy decision.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::warn;
use uuid::Uuid;

use shared::MovementType;

use crate::error::AppResult;

/// Typed alert payloads; one variant per advisory scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Alert {
    StockOverflowAttempt {
        product_id: Uuid,
        warehouse_id: Uuid,
        requested_quantity: Decimal,
        available_quantity: Decimal,
        operation: MovementType,
    },
    ClosedPeriodTransaction {
        company_id: Uuid,
        warehouse_id: Option<Uuid>,
        transaction_date: NaiveDate,
        period_start: NaiveDate,
        period_end: NaiveDate,
    },
}

impl Alert {
    /// Stable code for downstream routing
    pub fn code(&self) -> &'static str {
        match self {
            Alert::StockOverflowAttempt { .. } => "STOCK_OVERFLOW_ATTEMPT",
            Alert::ClosedPeriodTransaction { .. } => "CLOSED_PERIOD_TRANSACTION",
        }
    }
}

/// Alerting service for pre-flight movement advisories
#[derive(Clone)]
pub struct AlertingService {
    db: PgPool,
}

impl AlertingService {
    /// Create a new AlertingService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Check whether an outbound request exceeds the stock currently on
    /// hand for the product at the warehouse
    pub async fn check_stock_overflow_attempt(
        &self,
        company_id: Uuid,
        product_id: Uuid,
        warehouse_id: Uuid,
        requested_quantity: Decimal,
        operation: MovementType,
    ) -> AppResult<Option<Alert>> {
        let available: Decimal = sqlx::query_scalar(
            "SELECT COALESCE(SUM(quantity_remaining), 0) FROM lots \
             WHERE company_id = $1 AND product_id = $2 AND warehouse_id = $3 \
               AND is_available = TRUE",
        )
        .bind(company_id)
        .bind(product_id)
        .bind(warehouse_id)
        .fetch_one(&self.db)
        .await?;

        if requested_quantity > available {
            warn!(
                %product_id,
                %warehouse_id,
                %requested_quantity,
                %available,
                "Stock overflow attempt detected"
            );
            return Ok(Some(Alert::StockOverflowAttempt {
                product_id,
                warehouse_id,
                requested_quantity,
                available_quantity: available,
                operation,
            }));
        }
        Ok(None)
    }

    /// Check whether a transaction date falls inside a closed accounting
    /// period for the company
    pub async fn check_closed_period_transaction(
        &self,
        company_id: Uuid,
        warehouse_id: Option<Uuid>,
        transaction_date: NaiveDate,
    ) -> AppResult<Option<Alert>> {
        let period: Option<(NaiveDate, NaiveDate)> = sqlx::query_as(
            "SELECT period_start, period_end FROM accounting_periods \
             WHERE company_id = $1 AND is_closed = TRUE \
               AND $2 BETWEEN period_start AND period_end \
             LIMIT 1",
        )
        .bind(company_id)
        .bind(transaction_date)
        .fetch_optional(&self.db)
        .await?;

        match period {
            Some((period_start, period_end)) => {
                warn!(
                    %company_id,
                    %transaction_date,
                    "Transaction dated inside a closed accounting period"
                );
                Ok(Some(Alert::ClosedPeriodTransaction {
                    company_id,
                    warehouse_id,
                    transaction_date,
                    period_start,
                    period_end,
                }))
            }
            None => Ok(None),
        }
    }
}
