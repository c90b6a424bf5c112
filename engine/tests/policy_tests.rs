//! Movement policy validation tests
//!
//! Covers request shape validation, adjustment sign normalization and its
//! idempotence, lot usability, transfer endpoints, and approval thresholds.

use chrono::{Duration, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use std::str::FromStr;
use uuid::Uuid;

use shared::{AdjustmentKind, Lot, MovementReason, MovementType};
use warehouse_inventory_engine::services::alerting::Alert;
use warehouse_inventory_engine::services::movement::RequestMovementInput;
use warehouse_inventory_engine::services::policy::{
    escalated_advisory, requires_approval, validate_lot_ownership, validate_lot_usability,
    validate_request_shape, validate_transfer,
};

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn input(movement_type: MovementType, quantity: Decimal) -> RequestMovementInput {
    RequestMovementInput {
        company_id: Uuid::new_v4(),
        product_id: Uuid::new_v4(),
        movement_type,
        quantity,
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

fn reason(requires: bool, threshold: Option<Decimal>) -> MovementReason {
    MovementReason {
        id: Uuid::new_v4(),
        company_id: Uuid::new_v4(),
        name: "Test reason".to_string(),
        requires_approval: requires,
        approval_threshold: threshold,
        is_active: true,
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Zero quantity fails for every movement type
    #[test]
    fn test_zero_quantity_rejected() {
        for mt in [
            MovementType::In,
            MovementType::Out,
            MovementType::Transfer,
            MovementType::Adjustment,
        ] {
            let mut i = input(mt, Decimal::ZERO);
            if mt == MovementType::Transfer {
                i.from_warehouse_id = Some(Uuid::new_v4());
                i.to_warehouse_id = Some(Uuid::new_v4());
            }
            i.adjustment_kind = Some(AdjustmentKind::Positive);
            assert!(validate_request_shape(&i).is_err(), "type {:?}", mt);
        }
    }

    /// Loss/damage/expiry adjustments normalize to negative magnitudes
    #[test]
    fn test_negative_kinds_normalize() {
        for kind in [
            AdjustmentKind::Negative,
            AdjustmentKind::Damage,
            AdjustmentKind::Expiry,
            AdjustmentKind::Loss,
        ] {
            let mut i = input(MovementType::Adjustment, dec("7"));
            i.adjustment_kind = Some(kind);
            assert_eq!(validate_request_shape(&i).unwrap(), dec("-7"));
        }
    }

    /// Positive/return adjustments normalize to positive magnitudes
    #[test]
    fn test_positive_kinds_normalize() {
        for kind in [AdjustmentKind::Positive, AdjustmentKind::Return] {
            let mut i = input(MovementType::Adjustment, dec("-7"));
            i.adjustment_kind = Some(kind);
            assert_eq!(validate_request_shape(&i).unwrap(), dec("7"));
        }
    }

    /// Transfer with identical endpoints is rejected before persistence
    #[test]
    fn test_same_warehouse_transfer_rejected() {
        let wh = Uuid::new_v4();
        let mut i = input(MovementType::Transfer, dec("5"));
        i.warehouse_id = None;
        i.from_warehouse_id = Some(wh);
        i.to_warehouse_id = Some(wh);

        assert!(validate_transfer(&i).is_err());
    }

    /// Distinct endpoints pass
    #[test]
    fn test_distinct_warehouse_transfer_accepted() {
        let mut i = input(MovementType::Transfer, dec("5"));
        i.warehouse_id = None;
        i.from_warehouse_id = Some(Uuid::new_v4());
        i.to_warehouse_id = Some(Uuid::new_v4());

        assert!(validate_transfer(&i).is_ok());
    }

    /// Expired lot rejected; short lot reports insufficient stock
    #[test]
    fn test_lot_usability() {
        let today = Utc::now().date_naive();
        let now = Utc::now();
        let mut lot = Lot {
            id: Uuid::new_v4(),
            company_id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            warehouse_id: Uuid::new_v4(),
            lot_number: "L-7".to_string(),
            quantity_remaining: dec("10"),
            unit_cost: dec("4"),
            manufactured_date: None,
            expiration_date: Some(today + Duration::days(10)),
            is_available: true,
            created_at: now,
            updated_at: now,
        };

        assert!(validate_lot_usability(&lot, dec("10"), today).is_ok());

        let err = validate_lot_usability(&lot, dec("11"), today).unwrap_err();
        assert_eq!(err.code(), "INSUFFICIENT_STOCK");

        lot.expiration_date = Some(today - Duration::days(1));
        let err = validate_lot_usability(&lot, dec("5"), today).unwrap_err();
        assert_eq!(err.code(), "POLICY_REJECTION");
    }

    /// A chosen lot sitting in a different warehouse than the movement's
    /// source is rejected; accepting it would decrement one warehouse while
    /// the summary recompute targets another
    #[test]
    fn test_lot_in_wrong_warehouse_rejected() {
        let now = Utc::now();
        let product_id = Uuid::new_v4();
        let warehouse_a = Uuid::new_v4();
        let warehouse_b = Uuid::new_v4();
        let lot = Lot {
            id: Uuid::new_v4(),
            company_id: Uuid::new_v4(),
            product_id,
            warehouse_id: warehouse_b,
            lot_number: "L-9".to_string(),
            quantity_remaining: dec("20"),
            unit_cost: dec("4"),
            manufactured_date: None,
            expiration_date: None,
            is_available: true,
            created_at: now,
            updated_at: now,
        };

        let err = validate_lot_ownership(&lot, product_id, Some(warehouse_a)).unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");

        assert!(validate_lot_ownership(&lot, product_id, Some(warehouse_b)).is_ok());
    }

    /// A chosen lot belonging to another product is rejected; a positive
    /// adjustment topping it up would inflate the other product's stock
    #[test]
    fn test_lot_for_other_product_rejected() {
        let now = Utc::now();
        let warehouse_id = Uuid::new_v4();
        let lot = Lot {
            id: Uuid::new_v4(),
            company_id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            warehouse_id,
            lot_number: "L-10".to_string(),
            quantity_remaining: dec("20"),
            unit_cost: dec("4"),
            manufactured_date: None,
            expiration_date: None,
            is_available: true,
            created_at: now,
            updated_at: now,
        };

        let err = validate_lot_ownership(&lot, Uuid::new_v4(), Some(warehouse_id)).unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }

    /// The overflow advisory never escalates to a rejection; shortage is
    /// caught by allocation at execution time
    #[test]
    fn test_overflow_advisory_stays_soft() {
        let advisories = vec![Alert::StockOverflowAttempt {
            product_id: Uuid::new_v4(),
            warehouse_id: Uuid::new_v4(),
            requested_quantity: dec("50"),
            available_quantity: dec("10"),
            operation: MovementType::Out,
        }];

        assert!(escalated_advisory(&advisories, true).is_none());
        assert!(escalated_advisory(&advisories, false).is_none());
    }

    /// The closed-period advisory escalates only when the workflow is
    /// configured to reject it
    #[test]
    fn test_closed_period_escalation_follows_config() {
        let today = Utc::now().date_naive();
        let advisories = vec![Alert::ClosedPeriodTransaction {
            company_id: Uuid::new_v4(),
            warehouse_id: Some(Uuid::new_v4()),
            transaction_date: today,
            period_start: today - Duration::days(30),
            period_end: today + Duration::days(1),
        }];

        let escalated = escalated_advisory(&advisories, true).expect("escalates when configured");
        assert_eq!(escalated.code(), "CLOSED_PERIOD_TRANSACTION");

        assert!(escalated_advisory(&advisories, false).is_none());
    }

    /// Reason with $500 threshold: $200 auto-approves, $1000 needs approval
    #[test]
    fn test_approval_threshold() {
        let r = reason(true, Some(dec("500")));

        // quantity 2 x unit cost 100
        assert!(!requires_approval(&r, dec("200")));
        // quantity 10 x unit cost 100
        assert!(requires_approval(&r, dec("1000")));
    }

    /// A reason without the flag never requires approval
    #[test]
    fn test_no_approval_flag() {
        let r = reason(false, Some(dec("1")));
        assert!(!requires_approval(&r, dec("1000000")));
    }

    /// A flagged reason without a threshold always requires approval
    #[test]
    fn test_flag_without_threshold() {
        let r = reason(true, None);
        assert!(requires_approval(&r, dec("0.01")));
    }
}

// ============================================================================
// Property Tests
// ============================================================================

fn kind_strategy() -> impl Strategy<Value = AdjustmentKind> {
    prop_oneof![
        Just(AdjustmentKind::Positive),
        Just(AdjustmentKind::Return),
        Just(AdjustmentKind::Negative),
        Just(AdjustmentKind::Damage),
        Just(AdjustmentKind::Expiry),
        Just(AdjustmentKind::Loss),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Sign normalization is idempotent: normalizing twice equals once
    #[test]
    fn prop_sign_normalization_idempotent(
        kind in kind_strategy(),
        raw in -10_000i64..10_000
    ) {
        prop_assume!(raw != 0);
        let raw = Decimal::from(raw);

        let once = kind.normalize_quantity(raw);
        let twice = kind.normalize_quantity(once);

        prop_assert_eq!(once, twice);
        prop_assert_eq!(once.abs(), raw.abs());
        if kind.sign() < 0 {
            prop_assert!(once < Decimal::ZERO);
        } else {
            prop_assert!(once > Decimal::ZERO);
        }
    }

    /// Threshold evaluation: approval iff flagged and value meets threshold
    #[test]
    fn prop_threshold_evaluation(
        flagged in any::<bool>(),
        threshold in 1u64..100_000,
        value in 0u64..200_000
    ) {
        let threshold = Decimal::from(threshold);
        let value = Decimal::from(value);
        let r = reason(flagged, Some(threshold));

        let expected = flagged && value >= threshold;
        prop_assert_eq!(requires_approval(&r, value), expected);
    }
}
