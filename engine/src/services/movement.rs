//! Movement workflow: the request → approval → execution state machine
//!
//! Owns the movement lifecycle, calls the allocation engine and policy
//! validator, commits transactional side effects, and emits domain events.
//! Collaborators (reason store, alerting, event publisher, projector queue)
//! are injected at construction.

use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::{PgPool, Postgres, Transaction};
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;
use validator::Validate;

use shared::{
    format_movement_number, AllocationPlan, InventoryDelta, LotOrdering, Movement, MovementStatus,
    MovementType, Pagination,
};

use crate::config::WorkflowConfig;
use crate::error::{AppError, AppResult};
use crate::events::{EventPublisher, MovementEvent};
use crate::services::alerting::{Alert, AlertingService};
use crate::services::allocation;
use crate::services::lot_registry::LotRegistry;
use crate::services::policy;
use crate::services::projector::{ProjectorJob, ProjectorQueue};
use crate::services::reason::MovementReasonStore;

/// Input for requesting a movement
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RequestMovementInput {
    pub company_id: Uuid,
    pub product_id: Uuid,
    pub movement_type: MovementType,
    pub quantity: Decimal,
    pub unit_cost: Decimal,
    pub reason_id: Uuid,
    /// Warehouse for in/out/adjustment movements
    pub warehouse_id: Option<Uuid>,
    pub from_warehouse_id: Option<Uuid>,
    pub to_warehouse_id: Option<Uuid>,
    /// Required for adjustments; determines the quantity sign
    pub adjustment_kind: Option<shared::AdjustmentKind>,
    /// Pre-chosen lot for outbound movements; otherwise FEFO allocation
    /// picks lots at execution time
    pub lot_id: Option<Uuid>,
    pub requested_by: Uuid,
    #[validate(length(max = 500))]
    pub notes: Option<String>,
    /// Lot number for the lot an inbound movement creates; defaults to the
    /// generated movement number
    pub lot_number: Option<String>,
    pub lot_expiration_date: Option<chrono::NaiveDate>,
}

/// Result of a movement request
#[derive(Debug, Clone, Serialize)]
pub struct MovementOutcome {
    pub movement: Movement,
    pub requires_approval: bool,
    /// Pre-flight advisories raised during intake (soft gate)
    pub advisories: Vec<Alert>,
}

/// Filters for listing movements
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MovementFilter {
    pub status: Option<MovementStatus>,
    pub movement_type: Option<MovementType>,
    pub product_id: Option<Uuid>,
}

/// Row struct for movement queries
#[derive(sqlx::FromRow)]
struct MovementRow {
    id: Uuid,
    company_id: Uuid,
    movement_number: String,
    product_id: Uuid,
    warehouse_id: Option<Uuid>,
    from_warehouse_id: Option<Uuid>,
    to_warehouse_id: Option<Uuid>,
    quantity: Decimal,
    unit_cost: Decimal,
    movement_type: String,
    reason_id: Uuid,
    status: String,
    lot_id: Option<Uuid>,
    lot_number: Option<String>,
    lot_expiration_date: Option<chrono::NaiveDate>,
    requested_by: Uuid,
    approved_by: Option<Uuid>,
    approval_notes: Option<String>,
    approved_at: Option<chrono::DateTime<Utc>>,
    executed_at: Option<chrono::DateTime<Utc>>,
    created_at: chrono::DateTime<Utc>,
    updated_at: chrono::DateTime<Utc>,
}

impl MovementRow {
    fn into_movement(self) -> AppResult<Movement> {
        let movement_type = MovementType::from_str(&self.movement_type).ok_or_else(|| {
            AppError::Internal(anyhow::anyhow!(
                "Unknown movement type '{}' for movement {}",
                self.movement_type,
                self.id
            ))
        })?;
        let status = MovementStatus::from_str(&self.status).ok_or_else(|| {
            AppError::Internal(anyhow::anyhow!(
                "Unknown movement status '{}' for movement {}",
                self.status,
                self.id
            ))
        })?;

        Ok(Movement {
            id: self.id,
            company_id: self.company_id,
            movement_number: self.movement_number,
            product_id: self.product_id,
            warehouse_id: self.warehouse_id,
            from_warehouse_id: self.from_warehouse_id,
            to_warehouse_id: self.to_warehouse_id,
            quantity: self.quantity,
            unit_cost: self.unit_cost,
            movement_type,
            reason_id: self.reason_id,
            status,
            lot_id: self.lot_id,
            lot_number: self.lot_number,
            lot_expiration_date: self.lot_expiration_date,
            requested_by: self.requested_by,
            approved_by: self.approved_by,
            approval_notes: self.approval_notes,
            approved_at: self.approved_at,
            executed_at: self.executed_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

const MOVEMENT_COLUMNS: &str = "id, company_id, movement_number, product_id, warehouse_id, \
     from_warehouse_id, to_warehouse_id, quantity, unit_cost, movement_type, reason_id, \
     status, lot_id, lot_number, lot_expiration_date, requested_by, approved_by, \
     approval_notes, approved_at, executed_at, created_at, updated_at";

/// Workflow service driving the movement lifecycle
#[derive(Clone)]
pub struct MovementWorkflow {
    db: PgPool,
    lots: LotRegistry,
    reasons: MovementReasonStore,
    alerting: AlertingService,
    events: Arc<dyn EventPublisher>,
    projector_queue: Arc<dyn ProjectorQueue>,
    config: WorkflowConfig,
}

impl MovementWorkflow {
    /// Create a new MovementWorkflow with its injected collaborators
    pub fn new(
        db: PgPool,
        lots: LotRegistry,
        reasons: MovementReasonStore,
        alerting: AlertingService,
        events: Arc<dyn EventPublisher>,
        projector_queue: Arc<dyn ProjectorQueue>,
        config: WorkflowConfig,
    ) -> Self {
        Self {
            db,
            lots,
            reasons,
            alerting,
            events,
            projector_queue,
            config,
        }
    }

    /// Request a movement: validate, number, persist, and decide whether
    /// human approval is needed.
    ///
    /// Persistence happens in a single transaction; a failed validation or
    /// policy check leaves nothing committed. On success the movement is in
    /// `pending` (needs approval) or `approved` (auto) state and a
    /// `MovementRequested` event fires.
    pub async fn request_movement(&self, input: RequestMovementInput) -> AppResult<MovementOutcome> {
        let normalized_quantity = policy::validate_request_shape(&input)?;
        policy::validate_transfer(&input)?;

        let reason = self.reasons.find(input.company_id, input.reason_id).await?;

        let today = Utc::now().date_naive();
        let consumes = Self::consumes_stock(input.movement_type, normalized_quantity);

        // An explicitly chosen lot must belong to this product and sit in
        // the source warehouse; a consumed one must also be usable. Checked
        // before anything persists.
        if let Some(lot_id) = input.lot_id {
            let lot = self.lots.get_lot(input.company_id, lot_id).await?;
            let source = match input.movement_type {
                MovementType::Transfer => input.from_warehouse_id,
                _ => input.warehouse_id,
            };
            policy::validate_lot_ownership(&lot, input.product_id, source)?;
            if consumes {
                policy::validate_lot_usability(&lot, normalized_quantity.abs(), today)?;
            }
        }

        let advisories = self
            .collect_advisories(&input, normalized_quantity, today)
            .await?;

        if let Some(alert) =
            policy::escalated_advisory(&advisories, self.config.reject_closed_period)
        {
            return Err(AppError::policy(
                alert.code(),
                "Movement dated inside a closed accounting period",
            ));
        }

        let total_value = normalized_quantity.abs() * input.unit_cost;
        let requires_approval = policy::requires_approval(&reason, total_value);
        let status = if requires_approval {
            MovementStatus::Pending
        } else {
            MovementStatus::Approved
        };

        let mut tx = self.db.begin().await?;
        let sequence = Self::next_sequence(&mut tx, input.movement_type, today).await?;
        let movement_number = format_movement_number(input.movement_type, today, sequence);

        let row: MovementRow = sqlx::query_as(&format!(
            "INSERT INTO movements (company_id, movement_number, product_id, warehouse_id, \
                 from_warehouse_id, to_warehouse_id, quantity, unit_cost, movement_type, \
                 reason_id, status, lot_id, lot_number, lot_expiration_date, requested_by) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15) \
             RETURNING {MOVEMENT_COLUMNS}"
        ))
        .bind(input.company_id)
        .bind(&movement_number)
        .bind(input.product_id)
        .bind(input.warehouse_id)
        .bind(input.from_warehouse_id)
        .bind(input.to_warehouse_id)
        .bind(normalized_quantity)
        .bind(input.unit_cost)
        .bind(input.movement_type.as_str())
        .bind(input.reason_id)
        .bind(status.as_str())
        .bind(input.lot_id)
        .bind(&input.lot_number)
        .bind(input.lot_expiration_date)
        .bind(input.requested_by)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        let movement = row.into_movement()?;
        info!(
            movement_number = %movement.movement_number,
            status = %movement.status,
            "Movement requested"
        );

        self.publish(MovementEvent::MovementRequested {
            movement: movement.clone(),
            raw_data: serde_json::to_value(&input).unwrap_or_else(|_| json!(null)),
        })
        .await;

        Ok(MovementOutcome {
            movement,
            requires_approval,
            advisories,
        })
    }

    /// Approve a pending movement.
    ///
    /// Compare-and-set on status: approving an already-approved (or
    /// terminal) movement is rejected, not silently accepted.
    pub async fn approve_movement(
        &self,
        company_id: Uuid,
        movement_id: Uuid,
        approver_id: Uuid,
        notes: Option<String>,
    ) -> AppResult<Movement> {
        let row: Option<MovementRow> = sqlx::query_as(&format!(
            "UPDATE movements \
             SET status = 'approved', approved_by = $3, approval_notes = $4, \
                 approved_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND company_id = $2 AND status = 'pending' \
             RETURNING {MOVEMENT_COLUMNS}"
        ))
        .bind(movement_id)
        .bind(company_id)
        .bind(approver_id)
        .bind(&notes)
        .fetch_optional(&self.db)
        .await?;

        let movement = match row {
            Some(row) => row.into_movement()?,
            None => {
                let current = self.get_movement(company_id, movement_id).await?;
                return Err(AppError::StateTransition {
                    from: current.status,
                    to: MovementStatus::Approved,
                });
            }
        };

        info!(movement_number = %movement.movement_number, %approver_id, "Movement approved");
        self.publish(MovementEvent::MovementApproved {
            movement: movement.clone(),
            approver_id,
            notes,
        })
        .await;

        Ok(movement)
    }

    /// Reject a pending or approved movement (terminal)
    pub async fn reject_movement(
        &self,
        company_id: Uuid,
        movement_id: Uuid,
        approver_id: Uuid,
        notes: Option<String>,
    ) -> AppResult<Movement> {
        let movement = self
            .terminate(
                company_id,
                movement_id,
                MovementStatus::Rejected,
                Some(approver_id),
                notes.clone(),
            )
            .await?;

        self.publish(MovementEvent::MovementRejected {
            movement: movement.clone(),
            approver_id,
            notes,
        })
        .await;
        Ok(movement)
    }

    /// Cancel a pending or approved movement before execution.
    ///
    /// No inventory side effects exist yet, so there is nothing to undo.
    /// Completed movements are not cancellable; reversal requires a
    /// compensating movement.
    pub async fn cancel_movement(
        &self,
        company_id: Uuid,
        movement_id: Uuid,
        user_id: Uuid,
    ) -> AppResult<Movement> {
        let movement = self
            .terminate(company_id, movement_id, MovementStatus::Cancelled, None, None)
            .await?;

        self.publish(MovementEvent::MovementCancelled {
            movement: movement.clone(),
            user_id,
        })
        .await;
        Ok(movement)
    }

    /// Execute an approved movement: allocate lots, apply the inventory
    /// mutation in one transaction, and schedule the stock-summary
    /// recompute.
    ///
    /// A partial allocation plan fails the whole execution with
    /// `InsufficientStock`; the movement stays `approved` and no lot is
    /// touched. Chosen lots are locked (`FOR UPDATE`) and re-checked inside
    /// the transaction, so concurrent executions against the same lot
    /// cannot over-allocate it.
    pub async fn execute_movement(
        &self,
        company_id: Uuid,
        movement_id: Uuid,
        user_id: Uuid,
    ) -> AppResult<Vec<InventoryDelta>> {
        let movement = self.get_movement(company_id, movement_id).await?;
        if movement.status != MovementStatus::Approved {
            return Err(AppError::StateTransition {
                from: movement.status,
                to: MovementStatus::Completed,
            });
        }

        let today = Utc::now().date_naive();
        let deltas = Self::calculate_inventory_changes(&movement);
        let consumes = Self::consumes_stock(movement.movement_type, movement.quantity);
        let consumed_quantity = movement.quantity.abs();

        // Plan allocation before opening the transaction; a partial plan is
        // a hard failure with nothing touched
        let plan = if consumes {
            let plan = self.plan_for_execution(&movement, today).await?;
            if !plan.is_complete {
                warn!(
                    movement_number = %movement.movement_number,
                    requested = %consumed_quantity,
                    allocated = %plan.total_allocated,
                    "Insufficient stock for execution"
                );
                return Err(AppError::InsufficientStock {
                    requested: consumed_quantity,
                    available: plan.total_allocated,
                });
            }
            Some(plan)
        } else {
            None
        };

        let mut tx = self.db.begin().await?;

        // Status CAS guards against a concurrent execute of the same movement
        let bound_lot = plan
            .as_ref()
            .and_then(|p| p.entries.first())
            .map(|e| e.lot_id);
        let updated: Option<MovementRow> = sqlx::query_as(&format!(
            "UPDATE movements \
             SET status = 'completed', lot_id = COALESCE($3, lot_id), \
                 executed_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND company_id = $2 AND status = 'approved' \
             RETURNING {MOVEMENT_COLUMNS}"
        ))
        .bind(movement_id)
        .bind(company_id)
        .bind(bound_lot)
        .fetch_optional(&mut *tx)
        .await?;

        let completed = match updated {
            Some(row) => row.into_movement()?,
            None => {
                tx.rollback().await?;
                let current = self.get_movement(company_id, movement_id).await?;
                return Err(AppError::StateTransition {
                    from: current.status,
                    to: MovementStatus::Completed,
                });
            }
        };

        let apply_result = self
            .apply_stock_mutation(&mut tx, &completed, plan.as_ref(), today)
            .await;
        if let Err(e) = apply_result {
            tx.rollback().await?;
            if e.is_infrastructure() {
                error!(
                    movement_id = %movement_id,
                    movement_number = %completed.movement_number,
                    error = %e,
                    "Execution rolled back on infrastructure failure"
                );
            }
            return Err(e);
        }

        tx.commit().await?;
        info!(movement_number = %completed.movement_number, "Movement executed");

        // Post-commit: summary recompute and lifecycle event. Failures here
        // are logged, not surfaced; the committed movement stands.
        for delta in &deltas {
            let job = ProjectorJob {
                movement_id: completed.id,
                product_id: delta.product_id,
                warehouse_id: delta.warehouse_id,
            };
            if let Err(e) = self.projector_queue.enqueue(job).await {
                warn!(movement_id = %completed.id, error = %e, "Failed to enqueue projector job");
            }
        }
        self.publish(MovementEvent::MovementExecuted {
            movement: completed,
            user_id,
        })
        .await;

        Ok(deltas)
    }

    /// Map a movement to the signed inventory deltas executing it applies.
    ///
    /// Pure: `in` adds, `out` subtracts, `transfer` nets to zero across the
    /// two warehouses, `adjustment` applies its already-normalized quantity
    /// as-is.
    pub fn calculate_inventory_changes(movement: &Movement) -> Vec<InventoryDelta> {
        match movement.movement_type {
            MovementType::In => movement
                .warehouse_id
                .map(|warehouse_id| {
                    vec![InventoryDelta {
                        product_id: movement.product_id,
                        warehouse_id,
                        quantity_change: movement.quantity,
                    }]
                })
                .unwrap_or_default(),
            MovementType::Out => movement
                .warehouse_id
                .map(|warehouse_id| {
                    vec![InventoryDelta {
                        product_id: movement.product_id,
                        warehouse_id,
                        quantity_change: -movement.quantity,
                    }]
                })
                .unwrap_or_default(),
            MovementType::Transfer => {
                match (movement.from_warehouse_id, movement.to_warehouse_id) {
                    (Some(from), Some(to)) => vec![
                        InventoryDelta {
                            product_id: movement.product_id,
                            warehouse_id: from,
                            quantity_change: -movement.quantity,
                        },
                        InventoryDelta {
                            product_id: movement.product_id,
                            warehouse_id: to,
                            quantity_change: movement.quantity,
                        },
                    ],
                    _ => Vec::new(),
                }
            }
            MovementType::Adjustment => movement
                .warehouse_id
                .map(|warehouse_id| {
                    vec![InventoryDelta {
                        product_id: movement.product_id,
                        warehouse_id,
                        quantity_change: movement.quantity,
                    }]
                })
                .unwrap_or_default(),
        }
    }

    /// Preview an allocation without touching any state; used by
    /// recommendation flows. Optimized mode applies the waste-minimization
    /// heuristic; execution never uses it.
    pub async fn preview_allocation(
        &self,
        company_id: Uuid,
        product_id: Uuid,
        warehouse_id: Option<Uuid>,
        quantity: Decimal,
        ordering: LotOrdering,
        optimized: bool,
    ) -> AppResult<AllocationPlan> {
        let today = Utc::now().date_naive();
        let lots = self
            .lots
            .lots_for(company_id, product_id, warehouse_id, ordering)
            .await?;
        let usable: Vec<_> = lots.into_iter().filter(|l| !l.is_expired(today)).collect();

        let plan = if optimized {
            allocation::allocate_optimized(&usable, quantity, today, self.config.near_expiry_days)
        } else {
            allocation::allocate(&usable, quantity)
        };
        Ok(plan)
    }

    /// Get a movement by id
    pub async fn get_movement(&self, company_id: Uuid, movement_id: Uuid) -> AppResult<Movement> {
        let row: MovementRow = sqlx::query_as(&format!(
            "SELECT {MOVEMENT_COLUMNS} FROM movements WHERE id = $1 AND company_id = $2"
        ))
        .bind(movement_id)
        .bind(company_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Movement".to_string()))?;

        row.into_movement()
    }

    /// List movements for a company, newest first
    pub async fn list_movements(
        &self,
        company_id: Uuid,
        filter: MovementFilter,
        pagination: Pagination,
    ) -> AppResult<Vec<Movement>> {
        let mut sql = format!(
            "SELECT {MOVEMENT_COLUMNS} FROM movements WHERE company_id = $1"
        );
        if filter.status.is_some() {
            sql.push_str(" AND status = $2");
        }
        if filter.movement_type.is_some() {
            sql.push_str(&format!(
                " AND movement_type = ${}",
                2 + filter.status.is_some() as usize
            ));
        }
        if filter.product_id.is_some() {
            sql.push_str(&format!(
                " AND product_id = ${}",
                2 + filter.status.is_some() as usize + filter.movement_type.is_some() as usize
            ));
        }
        sql.push_str(" ORDER BY created_at DESC LIMIT ");
        sql.push_str(&pagination.limit().to_string());
        sql.push_str(" OFFSET ");
        sql.push_str(&pagination.offset().to_string());

        let mut query = sqlx::query_as::<_, MovementRow>(&sql).bind(company_id);
        if let Some(status) = filter.status {
            query = query.bind(status.as_str());
        }
        if let Some(movement_type) = filter.movement_type {
            query = query.bind(movement_type.as_str());
        }
        if let Some(product_id) = filter.product_id {
            query = query.bind(product_id);
        }

        let rows = query.fetch_all(&self.db).await?;
        rows.into_iter().map(MovementRow::into_movement).collect()
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    /// Whether executing this movement consumes existing lots
    fn consumes_stock(movement_type: MovementType, quantity: Decimal) -> bool {
        movement_type.consumes_lots()
            || (movement_type == MovementType::Adjustment && quantity < Decimal::ZERO)
    }

    /// Atomic per-(type, date) sequence for movement numbering
    async fn next_sequence(
        tx: &mut Transaction<'_, Postgres>,
        movement_type: MovementType,
        date: chrono::NaiveDate,
    ) -> AppResult<i32> {
        let seq: i32 = sqlx::query_scalar(
            "INSERT INTO movement_sequences (movement_type, seq_date, next_seq) \
             VALUES ($1, $2, 1) \
             ON CONFLICT (movement_type, seq_date) \
             DO UPDATE SET next_seq = movement_sequences.next_seq + 1 \
             RETURNING next_seq",
        )
        .bind(movement_type.as_str())
        .bind(date)
        .fetch_one(&mut **tx)
        .await?;
        Ok(seq)
    }

    async fn collect_advisories(
        &self,
        input: &RequestMovementInput,
        normalized_quantity: Decimal,
        today: chrono::NaiveDate,
    ) -> AppResult<Vec<Alert>> {
        let mut advisories = Vec::new();

        if Self::consumes_stock(input.movement_type, normalized_quantity) {
            let source = match input.movement_type {
                MovementType::Transfer => input.from_warehouse_id,
                _ => input.warehouse_id,
            };
            if let Some(warehouse_id) = source {
                if let Some(alert) = self
                    .alerting
                    .check_stock_overflow_attempt(
                        input.company_id,
                        input.product_id,
                        warehouse_id,
                        normalized_quantity.abs(),
                        input.movement_type,
                    )
                    .await?
                {
                    advisories.push(alert);
                }
            }
        }

        if let Some(alert) = self
            .alerting
            .check_closed_period_transaction(
                input.company_id,
                input.warehouse_id.or(input.from_warehouse_id),
                today,
            )
            .await?
        {
            advisories.push(alert);
        }

        Ok(advisories)
    }

    /// Compute the execution allocation: the pre-chosen lot if one is
    /// bound, otherwise plain greedy FEFO over the source warehouse
    async fn plan_for_execution(
        &self,
        movement: &Movement,
        today: chrono::NaiveDate,
    ) -> AppResult<AllocationPlan> {
        let required = movement.quantity.abs();

        if let Some(lot_id) = movement.lot_id {
            let lot = self.lots.get_lot(movement.company_id, lot_id).await?;
            policy::validate_lot_ownership(&lot, movement.product_id, movement.source_warehouse())?;
            policy::validate_lot_usability(&lot, required, today)?;
            return Ok(allocation::allocate(&[lot], required));
        }

        let lots = self
            .lots
            .lots_for(
                movement.company_id,
                movement.product_id,
                movement.source_warehouse(),
                LotOrdering::Fefo,
            )
            .await?;
        let usable: Vec<_> = lots.into_iter().filter(|l| !l.is_expired(today)).collect();
        Ok(allocation::allocate(&usable, required))
    }

    /// Apply lot-level mutations inside the execution transaction:
    /// decrement consumed lots (re-checking under the row lock) and create
    /// the lots that inbound sides of the movement produce.
    async fn apply_stock_mutation(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        movement: &Movement,
        plan: Option<&AllocationPlan>,
        today: chrono::NaiveDate,
    ) -> AppResult<()> {
        if let Some(plan) = plan {
            for entry in &plan.entries {
                // Re-check-then-act under the row lock; the plan was
                // computed outside the transaction and may be stale
                let locked = self.lots.lock_lot(tx, entry.lot_id).await?;
                policy::validate_lot_usability(&locked, entry.allocated_quantity, today)?;
                self.lots
                    .decrement_lot(tx, entry.lot_id, entry.allocated_quantity)
                    .await?;

                // Transfers materialize a destination lot per consumed lot,
                // carrying cost and expiry for traceability
                if movement.movement_type == MovementType::Transfer {
                    if let Some(to_warehouse) = movement.to_warehouse_id {
                        self.lots
                            .create_lot(
                                tx,
                                movement.company_id,
                                movement.product_id,
                                to_warehouse,
                                &locked.lot_number,
                                entry.allocated_quantity,
                                locked.unit_cost,
                                locked.manufactured_date,
                                locked.expiration_date,
                            )
                            .await?;
                    }
                }
            }
            return Ok(());
        }

        // Inbound receipt or positive adjustment
        let warehouse_id = movement
            .warehouse_id
            .ok_or_else(|| AppError::validation("warehouse_id", "Warehouse is required"))?;

        match (movement.movement_type, movement.lot_id) {
            // Positive adjustment against an existing lot tops it up; the
            // lot must belong to the movement's product and warehouse or
            // the recompute would target the wrong summary
            (MovementType::Adjustment, Some(lot_id)) => {
                let locked = self.lots.lock_lot(tx, lot_id).await?;
                policy::validate_lot_ownership(&locked, movement.product_id, Some(warehouse_id))?;
                self.lots
                    .increment_lot(tx, lot_id, movement.quantity)
                    .await?;
            }
            _ => {
                let lot_number = movement
                    .lot_number
                    .clone()
                    .unwrap_or_else(|| movement.movement_number.clone());
                self.lots
                    .create_lot(
                        tx,
                        movement.company_id,
                        movement.product_id,
                        warehouse_id,
                        &lot_number,
                        movement.quantity.abs(),
                        movement.unit_cost,
                        None,
                        movement.lot_expiration_date,
                    )
                    .await?;
            }
        }
        Ok(())
    }

    /// CAS transition to a terminal failure/abort state
    async fn terminate(
        &self,
        company_id: Uuid,
        movement_id: Uuid,
        terminal: MovementStatus,
        approver_id: Option<Uuid>,
        notes: Option<String>,
    ) -> AppResult<Movement> {
        let row: Option<MovementRow> = sqlx::query_as(&format!(
            "UPDATE movements \
             SET status = $3, approved_by = COALESCE($4, approved_by), \
                 approval_notes = COALESCE($5, approval_notes), updated_at = NOW() \
             WHERE id = $1 AND company_id = $2 AND status IN ('pending', 'approved') \
             RETURNING {MOVEMENT_COLUMNS}"
        ))
        .bind(movement_id)
        .bind(company_id)
        .bind(terminal.as_str())
        .bind(approver_id)
        .bind(&notes)
        .fetch_optional(&self.db)
        .await?;

        match row {
            Some(row) => {
                let movement = row.into_movement()?;
                info!(
                    movement_number = %movement.movement_number,
                    status = %movement.status,
                    "Movement terminated"
                );
                Ok(movement)
            }
            None => {
                let current = self.get_movement(company_id, movement_id).await?;
                Err(AppError::StateTransition {
                    from: current.status,
                    to: terminal,
                })
            }
        }
    }

    /// Publish a lifecycle event; post-commit failures are logged, never
    /// surfaced to the caller whose movement already committed
    async fn publish(&self, event: MovementEvent) {
        if let Err(e) = self.events.publish(event).await {
            warn!(error = %e, "Failed to publish movement event");
        }
    }
}
