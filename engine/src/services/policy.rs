//! Movement policy validation
//!
//! Stateless rule checks run by the movement workflow before any stock
//! mutation is committed. Each check either accepts or returns a structured
//! rejection; nothing here touches the database.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use uuid::Uuid;
use validator::Validate;

use shared::{
    validate_nonzero_quantity, validate_positive_quantity, validate_transfer_endpoints,
    validate_unit_cost, Lot, MovementReason, MovementType,
};

use crate::error::{AppError, AppResult};
use crate::services::alerting::Alert;
use crate::services::movement::RequestMovementInput;

/// Validate mandatory fields and quantity sign consistency.
///
/// Returns the sign-normalized quantity to persist. Adjustment quantities
/// are normalized from the adjustment kind at intake, so normalization is
/// idempotent over already-normalized values.
pub fn validate_request_shape(input: &RequestMovementInput) -> AppResult<Decimal> {
    input.validate().map_err(|e| AppError::Validation {
        field: "request".to_string(),
        message: e.to_string(),
    })?;

    validate_unit_cost(input.unit_cost).map_err(|msg| AppError::validation("unit_cost", msg))?;

    match input.movement_type {
        MovementType::In | MovementType::Out => {
            validate_positive_quantity(input.quantity)
                .map_err(|msg| AppError::validation("quantity", msg))?;
            if input.warehouse_id.is_none() {
                return Err(AppError::validation("warehouse_id", "Warehouse is required"));
            }
            Ok(input.quantity)
        }
        MovementType::Transfer => {
            validate_positive_quantity(input.quantity)
                .map_err(|msg| AppError::validation("quantity", msg))?;
            if input.from_warehouse_id.is_none() || input.to_warehouse_id.is_none() {
                return Err(AppError::validation(
                    "warehouse_id",
                    "Transfers require both source and destination warehouses",
                ));
            }
            Ok(input.quantity)
        }
        MovementType::Adjustment => {
            validate_nonzero_quantity(input.quantity)
                .map_err(|msg| AppError::validation("quantity", msg))?;
            if input.warehouse_id.is_none() {
                return Err(AppError::validation("warehouse_id", "Warehouse is required"));
            }
            let kind = input.adjustment_kind.ok_or_else(|| {
                AppError::validation("adjustment_kind", "Adjustment kind is required")
            })?;
            Ok(kind.normalize_quantity(input.quantity))
        }
    }
}

/// Validate an explicitly chosen lot for an outbound/transfer movement:
/// not expired, and enough quantity remaining.
pub fn validate_lot_usability(lot: &Lot, requested: Decimal, today: NaiveDate) -> AppResult<()> {
    if !lot.is_available {
        return Err(AppError::policy(
            "LOT_UNAVAILABLE",
            &format!("Lot {} is flagged unavailable", lot.lot_number),
        ));
    }
    if lot.is_expired(today) {
        return Err(AppError::policy(
            "LOT_EXPIRED",
            &format!("Lot {} is expired", lot.lot_number),
        ));
    }
    if lot.quantity_remaining < requested {
        return Err(AppError::InsufficientStock {
            requested,
            available: lot.quantity_remaining,
        });
    }
    Ok(())
}

/// Validate that an explicitly chosen lot belongs to the movement's product
/// and sits in the warehouse the movement draws on (or tops up)
pub fn validate_lot_ownership(
    lot: &Lot,
    product_id: Uuid,
    warehouse_id: Option<Uuid>,
) -> AppResult<()> {
    if lot.product_id != product_id {
        return Err(AppError::validation(
            "lot_id",
            "Lot does not belong to the requested product",
        ));
    }
    if let Some(warehouse_id) = warehouse_id {
        if lot.warehouse_id != warehouse_id {
            return Err(AppError::validation(
                "lot_id",
                "Lot is not stored in the movement's warehouse",
            ));
        }
    }
    Ok(())
}

/// The advisory that escalates to a hard rejection, if any.
///
/// Only the closed-period advisory escalates, and only when the workflow is
/// configured to reject it; the overflow advisory stays soft because an
/// actual shortage is caught by allocation at execution time.
pub fn escalated_advisory(advisories: &[Alert], reject_closed_period: bool) -> Option<&Alert> {
    if !reject_closed_period {
        return None;
    }
    advisories
        .iter()
        .find(|a| matches!(a, Alert::ClosedPeriodTransaction { .. }))
}

/// Validate that a transfer does not target its own source warehouse
pub fn validate_transfer(input: &RequestMovementInput) -> AppResult<()> {
    if input.movement_type != MovementType::Transfer {
        return Ok(());
    }
    validate_transfer_endpoints(input.from_warehouse_id, input.to_warehouse_id)
        .map_err(|msg| AppError::policy("SAME_WAREHOUSE_TRANSFER", msg))
}

/// Whether the movement's reason flags it for human approval at this value
pub fn requires_approval(reason: &MovementReason, total_value: Decimal) -> bool {
    reason.approval_required_for(total_value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use shared::AdjustmentKind;
    use std::str::FromStr;
    use uuid::Uuid;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn base_input(movement_type: MovementType, quantity: &str) -> RequestMovementInput {
        RequestMovementInput {
            company_id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            movement_type,
            quantity: dec(quantity),
            unit_cost: dec("10"),
            reason_id: Uuid::new_v4(),
            warehouse_id: Some(Uuid::new_v4()),
            from_warehouse_id: None,
            to_warehouse_id: None,
            adjustment_kind: None,
            lot_id: None,
            requested_by: Uuid::new_v4(),
            notes: None,
            lot_number: None,
            lot_expiration_date: None,
        }
    }

    #[test]
    fn outbound_quantity_must_be_positive() {
        let input = base_input(MovementType::Out, "-5");
        assert!(validate_request_shape(&input).is_err());
    }

    #[test]
    fn damage_adjustment_normalizes_to_negative() {
        let mut input = base_input(MovementType::Adjustment, "4");
        input.adjustment_kind = Some(AdjustmentKind::Damage);
        assert_eq!(validate_request_shape(&input).unwrap(), dec("-4"));

        // Idempotent over already-normalized input
        input.quantity = dec("-4");
        assert_eq!(validate_request_shape(&input).unwrap(), dec("-4"));
    }

    #[test]
    fn return_adjustment_normalizes_to_positive() {
        let mut input = base_input(MovementType::Adjustment, "-2");
        input.adjustment_kind = Some(AdjustmentKind::Return);
        assert_eq!(validate_request_shape(&input).unwrap(), dec("2"));
    }

    #[test]
    fn adjustment_requires_kind() {
        let input = base_input(MovementType::Adjustment, "4");
        assert!(validate_request_shape(&input).is_err());
    }

    #[test]
    fn same_warehouse_transfer_rejected() {
        let wh = Uuid::new_v4();
        let mut input = base_input(MovementType::Transfer, "5");
        input.warehouse_id = None;
        input.from_warehouse_id = Some(wh);
        input.to_warehouse_id = Some(wh);

        let err = validate_transfer(&input).unwrap_err();
        assert_eq!(err.code(), "POLICY_REJECTION");
    }

    #[test]
    fn expired_lot_rejected_for_outbound() {
        let today = Utc::now().date_naive();
        let now = Utc::now();
        let lot = Lot {
            id: Uuid::new_v4(),
            company_id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            warehouse_id: Uuid::new_v4(),
            lot_number: "L-1".to_string(),
            quantity_remaining: dec("10"),
            unit_cost: dec("5"),
            manufactured_date: None,
            expiration_date: Some(today - Duration::days(1)),
            is_available: true,
            created_at: now,
            updated_at: now,
        };

        let err = validate_lot_usability(&lot, dec("3"), today).unwrap_err();
        assert_eq!(err.code(), "POLICY_REJECTION");
    }

    #[test]
    fn approval_threshold_evaluation() {
        let reason = MovementReason {
            id: Uuid::new_v4(),
            company_id: Uuid::new_v4(),
            name: "Dispatch".to_string(),
            requires_approval: true,
            approval_threshold: Some(dec("500")),
            is_active: true,
        };

        // $200 stays under the threshold, auto-approved
        assert!(!requires_approval(&reason, dec("200")));
        // $1000 meets it
        assert!(requires_approval(&reason, dec("1000")));
        // Threshold boundary counts as requiring approval
        assert!(requires_approval(&reason, dec("500")));
    }
}
