//! Movement models and the movement lifecycle state machine

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of stock-affecting transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementType {
    In,
    Out,
    Transfer,
    Adjustment,
}

impl MovementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementType::In => "in",
            MovementType::Out => "out",
            MovementType::Transfer => "transfer",
            MovementType::Adjustment => "adjustment",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "in" => Some(MovementType::In),
            "out" => Some(MovementType::Out),
            "transfer" => Some(MovementType::Transfer),
            "adjustment" => Some(MovementType::Adjustment),
            _ => None,
        }
    }

    /// Prefix used in generated movement numbers
    pub fn number_prefix(&self) -> &'static str {
        match self {
            MovementType::In => "ENT",
            MovementType::Out => "SAL",
            MovementType::Transfer => "TRF",
            MovementType::Adjustment => "AJU",
        }
    }

    /// Whether executing this movement consumes existing lots
    pub fn consumes_lots(&self) -> bool {
        matches!(self, MovementType::Out | MovementType::Transfer)
    }
}

/// Lifecycle status of a movement.
///
/// Transitions are forward-only: `Requested` is the transient intake state,
/// `Pending`/`Approved` are the working states, and `Completed`, `Rejected`
/// and `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementStatus {
    Requested,
    Pending,
    Approved,
    Completed,
    Rejected,
    Cancelled,
}

impl MovementStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementStatus::Requested => "requested",
            MovementStatus::Pending => "pending",
            MovementStatus::Approved => "approved",
            MovementStatus::Completed => "completed",
            MovementStatus::Rejected => "rejected",
            MovementStatus::Cancelled => "cancelled",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "requested" => Some(MovementStatus::Requested),
            "pending" => Some(MovementStatus::Pending),
            "approved" => Some(MovementStatus::Approved),
            "completed" => Some(MovementStatus::Completed),
            "rejected" => Some(MovementStatus::Rejected),
            "cancelled" => Some(MovementStatus::Cancelled),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            MovementStatus::Completed | MovementStatus::Rejected | MovementStatus::Cancelled
        )
    }

    /// Whether the state machine accepts a transition from `self` to `next`
    pub fn can_transition_to(&self, next: MovementStatus) -> bool {
        use MovementStatus::*;
        match (self, next) {
            (Requested, Pending) | (Requested, Approved) => true,
            (Pending, Approved) => true,
            (Pending, Rejected) | (Pending, Cancelled) => true,
            (Approved, Completed) => true,
            (Approved, Rejected) | (Approved, Cancelled) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for MovementStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Adjustment subtype; determines the sign of the adjusted quantity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentKind {
    Positive,
    Return,
    Negative,
    Damage,
    Expiry,
    Loss,
}

impl AdjustmentKind {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "positive" => Some(AdjustmentKind::Positive),
            "return" => Some(AdjustmentKind::Return),
            "negative" => Some(AdjustmentKind::Negative),
            "damage" => Some(AdjustmentKind::Damage),
            "expiry" => Some(AdjustmentKind::Expiry),
            "loss" => Some(AdjustmentKind::Loss),
            _ => None,
        }
    }

    /// +1 for stock-increasing kinds, -1 for stock-decreasing kinds
    pub fn sign(&self) -> i64 {
        match self {
            AdjustmentKind::Positive | AdjustmentKind::Return => 1,
            AdjustmentKind::Negative
            | AdjustmentKind::Damage
            | AdjustmentKind::Expiry
            | AdjustmentKind::Loss => -1,
        }
    }

    /// Normalize a raw quantity to the sign this kind implies.
    ///
    /// Idempotent: normalizing an already-normalized quantity is a no-op.
    pub fn normalize_quantity(&self, quantity: Decimal) -> Decimal {
        let magnitude = quantity.abs();
        if self.sign() < 0 {
            -magnitude
        } else {
            magnitude
        }
    }
}

/// One stock-affecting transaction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Movement {
    pub id: Uuid,
    pub company_id: Uuid,
    /// Human-readable, e.g. "SAL-20260829-0007"
    pub movement_number: String,
    pub product_id: Uuid,
    pub warehouse_id: Option<Uuid>,
    pub from_warehouse_id: Option<Uuid>,
    pub to_warehouse_id: Option<Uuid>,
    pub quantity: Decimal,
    pub unit_cost: Decimal,
    pub movement_type: MovementType,
    pub reason_id: Uuid,
    pub status: MovementStatus,
    /// Bound once a lot has been chosen for execution
    pub lot_id: Option<Uuid>,
    /// Lot number for the lot an inbound movement will create
    pub lot_number: Option<String>,
    /// Expiration date for the lot an inbound movement will create
    pub lot_expiration_date: Option<NaiveDate>,
    pub requested_by: Uuid,
    pub approved_by: Option<Uuid>,
    pub approval_notes: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub executed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Movement {
    /// Warehouse the movement consumes stock from
    pub fn source_warehouse(&self) -> Option<Uuid> {
        match self.movement_type {
            MovementType::Transfer => self.from_warehouse_id,
            _ => self.warehouse_id,
        }
    }

    /// Monetary value used for approval-threshold evaluation
    pub fn total_value(&self) -> Decimal {
        self.quantity.abs() * self.unit_cost
    }
}

/// Signed inventory change applied by executing a movement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryDelta {
    pub product_id: Uuid,
    pub warehouse_id: Uuid,
    pub quantity_change: Decimal,
}

/// Generate a movement number: `{prefix}-{YYYYMMDD}-{seq:04}`
pub fn format_movement_number(movement_type: MovementType, date: NaiveDate, sequence: i32) -> String {
    format!(
        "{}-{}-{:04}",
        movement_type.number_prefix(),
        date.format("%Y%m%d"),
        sequence
    )
}
