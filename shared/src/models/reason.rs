//! Movement reason configuration

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Configuration entity describing whether a category of movement requires
/// approval, and above what monetary value. Consumed read-only by the
/// movement workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovementReason {
    pub id: Uuid,
    pub company_id: Uuid,
    pub name: String,
    pub requires_approval: bool,
    /// Monetary threshold; `None` means every movement with this reason
    /// needs approval when `requires_approval` is set
    pub approval_threshold: Option<Decimal>,
    pub is_active: bool,
}

impl MovementReason {
    /// Whether a movement of the given monetary value must be approved
    /// by a human before execution
    pub fn approval_required_for(&self, value: Decimal) -> bool {
        if !self.requires_approval {
            return false;
        }
        match self.approval_threshold {
            Some(threshold) => value >= threshold,
            None => true,
        }
    }
}
