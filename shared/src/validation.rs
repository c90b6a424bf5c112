//! Validation utilities for the Warehouse Inventory Management Platform
//!
//! Pure, stateless checks shared by the movement engine and its callers.

use rust_decimal::Decimal;
use uuid::Uuid;

/// Validate that a movement quantity is strictly positive
pub fn validate_positive_quantity(quantity: Decimal) -> Result<(), &'static str> {
    if quantity <= Decimal::ZERO {
        return Err("Quantity must be greater than zero");
    }
    Ok(())
}

/// Validate that an adjustment quantity is nonzero (its sign is normalized
/// later from the adjustment kind)
pub fn validate_nonzero_quantity(quantity: Decimal) -> Result<(), &'static str> {
    if quantity == Decimal::ZERO {
        return Err("Quantity must be nonzero");
    }
    Ok(())
}

/// Validate that a unit cost is not negative
pub fn validate_unit_cost(unit_cost: Decimal) -> Result<(), &'static str> {
    if unit_cost < Decimal::ZERO {
        return Err("Unit cost cannot be negative");
    }
    Ok(())
}

/// Validate transfer endpoints: both present and distinct
pub fn validate_transfer_endpoints(
    from_warehouse_id: Option<Uuid>,
    to_warehouse_id: Option<Uuid>,
) -> Result<(), &'static str> {
    match (from_warehouse_id, to_warehouse_id) {
        (None, _) | (_, None) => Err("Transfers require both source and destination warehouses"),
        (Some(from), Some(to)) if from == to => {
            Err("Source and destination warehouse must differ")
        }
        _ => Ok(()),
    }
}
