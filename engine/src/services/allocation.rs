//! Lot allocation engine
//!
//! Pure allocation logic over a pre-ordered lot sequence. The caller decides
//! the ordering (FIFO/FEFO via the lot registry) and which lots are usable;
//! this module only distributes the required quantity across them.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use shared::{AllocationEntry, AllocationPlan, Lot};

/// Allocate `required_quantity` greedily across `lots`, in the given order.
///
/// Walks the sequence once, taking `min(remaining, lot.quantity_remaining)`
/// from each lot until the requirement is met or lots run out. A plan with
/// `is_complete == false` signals insufficient stock; the workflow treats
/// that as a hard failure for execution, never a silent truncation.
pub fn allocate(lots: &[Lot], required_quantity: Decimal) -> AllocationPlan {
    let mut remaining = required_quantity;
    let mut entries = Vec::new();

    for lot in lots {
        if remaining <= Decimal::ZERO {
            break;
        }
        if lot.quantity_remaining <= Decimal::ZERO {
            continue;
        }

        let take = remaining.min(lot.quantity_remaining);
        entries.push(entry_for(lot, take));
        remaining -= take;
    }

    let total_allocated = required_quantity - remaining.max(Decimal::ZERO);
    AllocationPlan {
        entries,
        requested_quantity: required_quantity,
        total_allocated,
        is_complete: remaining <= Decimal::ZERO,
    }
}

/// Waste-minimizing allocation used for recommendation and preview flows.
///
/// Before falling back to plain greedy consumption, prefers a single lot
/// that either exactly matches the requirement, or exceeds it while
/// expiring within `near_expiry_days` of `today` (so a soon-to-expire lot
/// is drawn down instead of being fragmented across several dispatches).
///
/// The transactional execution path always uses [`allocate`] for
/// determinism and auditability.
pub fn allocate_optimized(
    lots: &[Lot],
    required_quantity: Decimal,
    today: NaiveDate,
    near_expiry_days: i64,
) -> AllocationPlan {
    if required_quantity <= Decimal::ZERO {
        return AllocationPlan::empty(required_quantity);
    }

    // Exact match: consume one lot whole, leaving no fragment
    if let Some(lot) = lots
        .iter()
        .find(|l| l.quantity_remaining == required_quantity)
    {
        return single_lot_plan(lot, required_quantity);
    }

    // A larger lot about to expire: draw the whole requirement from it
    if let Some(lot) = lots.iter().find(|l| {
        l.quantity_remaining > required_quantity && l.expires_within(today, near_expiry_days)
    }) {
        return single_lot_plan(lot, required_quantity);
    }

    allocate(lots, required_quantity)
}

fn single_lot_plan(lot: &Lot, quantity: Decimal) -> AllocationPlan {
    AllocationPlan {
        entries: vec![entry_for(lot, quantity)],
        requested_quantity: quantity,
        total_allocated: quantity,
        is_complete: true,
    }
}

fn entry_for(lot: &Lot, allocated: Decimal) -> AllocationEntry {
    AllocationEntry {
        lot_id: lot.id,
        lot_number: lot.lot_number.clone(),
        allocated_quantity: allocated,
        available_quantity: lot.quantity_remaining,
        expiration_date: lot.expiration_date,
        unit_cost: lot.unit_cost,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use std::str::FromStr;
    use uuid::Uuid;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn lot(number: &str, quantity: &str, expiration: Option<NaiveDate>) -> Lot {
        let now = Utc::now();
        Lot {
            id: Uuid::new_v4(),
            company_id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            warehouse_id: Uuid::new_v4(),
            lot_number: number.to_string(),
            quantity_remaining: dec(quantity),
            unit_cost: dec("10"),
            manufactured_date: None,
            expiration_date: expiration,
            is_available: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn allocates_across_lots_in_order() {
        let lots = vec![lot("A", "10", None), lot("B", "5", None)];
        let plan = allocate(&lots, dec("12"));

        assert!(plan.is_complete);
        assert_eq!(plan.total_allocated, dec("12"));
        assert_eq!(plan.entries.len(), 2);
        assert_eq!(plan.entries[0].lot_number, "A");
        assert_eq!(plan.entries[0].allocated_quantity, dec("10"));
        assert_eq!(plan.entries[1].lot_number, "B");
        assert_eq!(plan.entries[1].allocated_quantity, dec("2"));
    }

    #[test]
    fn partial_plan_when_stock_insufficient() {
        let lots = vec![lot("A", "10", None), lot("B", "5", None)];
        let plan = allocate(&lots, dec("20"));

        assert!(!plan.is_complete);
        assert_eq!(plan.total_allocated, dec("15"));
        assert_eq!(plan.shortfall(), dec("5"));
    }

    #[test]
    fn empty_lot_list_yields_empty_plan() {
        let plan = allocate(&[], dec("7"));
        assert!(!plan.is_complete);
        assert!(plan.entries.is_empty());
        assert_eq!(plan.total_allocated, Decimal::ZERO);
    }

    #[test]
    fn exact_stock_leaves_no_remainder() {
        let lots = vec![lot("A", "4", None), lot("B", "6", None)];
        let plan = allocate(&lots, dec("10"));

        assert!(plan.is_complete);
        assert_eq!(plan.entries[1].allocated_quantity, dec("6"));
    }

    #[test]
    fn zero_quantity_lots_are_skipped() {
        let lots = vec![lot("EMPTY", "0", None), lot("B", "5", None)];
        let plan = allocate(&lots, dec("3"));

        assert_eq!(plan.entries.len(), 1);
        assert_eq!(plan.entries[0].lot_number, "B");
    }

    #[test]
    fn fefo_order_consumes_soonest_expiry_first() {
        let today = Utc::now().date_naive();
        let lots = vec![
            lot("C", "3", Some(today + Duration::days(5))),
            lot("D", "100", Some(today + Duration::days(60))),
        ];
        let plan = allocate(&lots, dec("3"));

        assert!(plan.is_complete);
        assert_eq!(plan.entries.len(), 1);
        assert_eq!(plan.entries[0].lot_number, "C");
    }

    #[test]
    fn optimized_prefers_exact_match_lot() {
        let lots = vec![
            lot("A", "10", None),
            lot("EXACT", "7", None),
            lot("B", "20", None),
        ];
        let plan = allocate_optimized(&lots, dec("7"), Utc::now().date_naive(), 30);

        assert!(plan.is_complete);
        assert_eq!(plan.entries.len(), 1);
        assert_eq!(plan.entries[0].lot_number, "EXACT");
    }

    #[test]
    fn optimized_prefers_larger_near_expiry_lot() {
        let today = Utc::now().date_naive();
        let lots = vec![
            lot("FAR", "5", Some(today + Duration::days(90))),
            lot("NEAR", "50", Some(today + Duration::days(10))),
        ];
        let plan = allocate_optimized(&lots, dec("8"), today, 30);

        assert!(plan.is_complete);
        assert_eq!(plan.entries.len(), 1);
        assert_eq!(plan.entries[0].lot_number, "NEAR");
        assert_eq!(plan.entries[0].allocated_quantity, dec("8"));
    }

    #[test]
    fn optimized_falls_back_to_greedy() {
        let today = Utc::now().date_naive();
        let lots = vec![
            lot("A", "5", Some(today + Duration::days(90))),
            lot("B", "5", Some(today + Duration::days(120))),
        ];
        let plan = allocate_optimized(&lots, dec("8"), today, 30);

        assert!(plan.is_complete);
        assert_eq!(plan.entries.len(), 2);
        assert_eq!(plan.entries[0].lot_number, "A");
        assert_eq!(plan.entries[1].allocated_quantity, dec("3"));
    }
}
