//! Lot and allocation models

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A physically distinct, traceable batch of one product in one warehouse
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lot {
    pub id: Uuid,
    pub company_id: Uuid,
    pub product_id: Uuid,
    pub warehouse_id: Uuid,
    /// Supplier or internal lot number (not globally unique)
    pub lot_number: String,
    pub quantity_remaining: Decimal,
    pub unit_cost: Decimal,
    pub manufactured_date: Option<NaiveDate>,
    pub expiration_date: Option<NaiveDate>,
    pub is_available: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Lot {
    /// Whether the lot has passed its expiration date
    pub fn is_expired(&self, today: NaiveDate) -> bool {
        matches!(self.expiration_date, Some(exp) if exp < today)
    }

    /// Whether the lot expires within `days` days of `today` (exclusive of
    /// already-expired lots)
    pub fn expires_within(&self, today: NaiveDate, days: i64) -> bool {
        match self.expiration_date {
            Some(exp) => exp >= today && (exp - today).num_days() <= days,
            None => false,
        }
    }
}

/// Ordering strategy when listing lots for allocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LotOrdering {
    /// First in, first out: oldest receipt first
    Fifo,
    /// First expired, first out: soonest expiration first, undated lots last
    Fefo,
}

/// One line of an allocation plan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationEntry {
    pub lot_id: Uuid,
    pub lot_number: String,
    pub allocated_quantity: Decimal,
    /// Quantity the lot had available when the plan was computed
    pub available_quantity: Decimal,
    pub expiration_date: Option<NaiveDate>,
    pub unit_cost: Decimal,
}

/// Transient result of running the allocation engine over a lot sequence.
///
/// Never persisted; the workflow either executes it whole or discards it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationPlan {
    pub entries: Vec<AllocationEntry>,
    pub requested_quantity: Decimal,
    pub total_allocated: Decimal,
    /// True when total_allocated == requested_quantity
    pub is_complete: bool,
}

impl AllocationPlan {
    /// An empty plan for a request that found no usable lots
    pub fn empty(requested_quantity: Decimal) -> Self {
        Self {
            entries: Vec::new(),
            requested_quantity,
            total_allocated: Decimal::ZERO,
            is_complete: false,
        }
    }

    /// Quantity still missing after allocation
    pub fn shortfall(&self) -> Decimal {
        self.requested_quantity - self.total_allocated
    }

    /// Plan cost at each lot's unit cost
    pub fn total_cost(&self) -> Decimal {
        self.entries
            .iter()
            .map(|e| e.allocated_quantity * e.unit_cost)
            .sum()
    }
}
