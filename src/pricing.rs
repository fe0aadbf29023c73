//! Checkout pricing rules: coupon validation, first-order discount, totals.
//!
//! Everything here is pure; handlers fetch the rows and the assembler does
//! the writes. Amounts are whole INR units.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::CouponError;
use crate::models::{Coupon, UserOrderStats};

/// Cart value a first order must exceed for the automatic discount.
pub const FIRST_ORDER_MIN_SUBTOTAL: i64 = 4000;
/// First-order discount rate, in percent.
pub const FIRST_ORDER_DISCOUNT_PCT: i64 = 5;

/// A coupon that passed validation against the current cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppliedCoupon {
    pub code: String,
    pub discount: i64,
}

/// Full price breakdown for a quote or a confirmed order.
#[derive(Debug, Clone, Serialize)]
pub struct PriceBreakdown {
    pub subtotal: i64,
    pub coupon_discount: i64,
    pub first_order_discount: i64,
    pub total_discount: i64,
    pub final_total: i64,
}

impl PriceBreakdown {
    pub fn compose(subtotal: i64, coupon_discount: i64, first_order_discount: i64) -> Self {
        let total_discount = coupon_discount + first_order_discount;
        Self {
            subtotal,
            coupon_discount,
            first_order_discount,
            total_discount,
            final_total: (subtotal - total_discount).max(0),
        }
    }
}

pub fn normalize_code(raw: &str) -> String {
    raw.trim().to_uppercase()
}

/// Checks a fetched coupon row against the cart subtotal.
///
/// Missing rows map to `NotFound` before this runs; an inactive row is
/// indistinguishable from a missing one. No side effects here — the usage
/// counter moves only at order confirmation.
pub fn validate_coupon(
    coupon: &Coupon,
    subtotal: i64,
    now: DateTime<Utc>,
) -> Result<AppliedCoupon, CouponError> {
    if !coupon.is_active {
        return Err(CouponError::NotFound);
    }
    if now < coupon.valid_from || now > coupon.valid_until {
        return Err(CouponError::Expired);
    }
    if let Some(max) = coupon.max_uses {
        if coupon.current_uses >= max {
            return Err(CouponError::UsageExceeded);
        }
    }
    if subtotal < coupon.min_order_amount {
        return Err(CouponError::MinimumNotMet);
    }
    Ok(AppliedCoupon {
        code: coupon.code.clone(),
        discount: coupon.discount_amount,
    })
}

/// Eligible when the user has no stats row yet, or has neither completed an
/// order nor consumed the discount.
pub fn first_order_eligible(stats: Option<&UserOrderStats>) -> bool {
    match stats {
        None => true,
        Some(s) => s.order_count == 0 && !s.first_order_discount_used,
    }
}

/// round(subtotal * 5%) above the threshold, otherwise zero.
pub fn first_order_discount(stats: Option<&UserOrderStats>, subtotal: i64) -> i64 {
    if first_order_eligible(stats) && subtotal > FIRST_ORDER_MIN_SUBTOTAL {
        (subtotal * FIRST_ORDER_DISCOUNT_PCT + 50) / 100
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use uuid::Uuid;

    fn coupon(discount: i64, min_order: i64) -> Coupon {
        let now = Utc::now();
        Coupon {
            id: Uuid::new_v4(),
            code: "SAVE200".into(),
            discount_amount: discount,
            min_order_amount: min_order,
            valid_from: now - Duration::days(1),
            valid_until: now + Duration::days(1),
            max_uses: Some(100),
            current_uses: 0,
            is_active: true,
            created_at: now,
        }
    }

    fn stats(order_count: i32, used: bool) -> UserOrderStats {
        UserOrderStats {
            user_id: Uuid::new_v4(),
            order_count,
            first_order_discount_used: used,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn coupon_succeeds_at_or_above_minimum() {
        let c = coupon(200, 1500);
        let applied = validate_coupon(&c, 1500, Utc::now()).unwrap();
        assert_eq!(applied.code, "SAVE200");
        assert_eq!(applied.discount, 200);
    }

    #[test]
    fn coupon_below_minimum_is_rejected() {
        let c = coupon(200, 1500);
        assert_eq!(
            validate_coupon(&c, 1000, Utc::now()),
            Err(CouponError::MinimumNotMet)
        );
    }

    #[test]
    fn coupon_outside_window_is_expired() {
        let c = coupon(200, 0);
        assert_eq!(
            validate_coupon(&c, 5000, c.valid_until + Duration::seconds(1)),
            Err(CouponError::Expired)
        );
        assert_eq!(
            validate_coupon(&c, 5000, c.valid_from - Duration::seconds(1)),
            Err(CouponError::Expired)
        );
    }

    #[test]
    fn exhausted_coupon_is_rejected_regardless_of_other_fields() {
        let mut c = coupon(200, 0);
        c.current_uses = 100; // == max_uses
        assert_eq!(
            validate_coupon(&c, 1_000_000, Utc::now()),
            Err(CouponError::UsageExceeded)
        );
    }

    #[test]
    fn uncapped_coupon_never_exceeds_usage() {
        let mut c = coupon(200, 0);
        c.max_uses = None;
        c.current_uses = 10_000;
        assert!(validate_coupon(&c, 500, Utc::now()).is_ok());
    }

    #[test]
    fn inactive_coupon_reads_as_not_found() {
        let mut c = coupon(200, 0);
        c.is_active = false;
        assert_eq!(
            validate_coupon(&c, 5000, Utc::now()),
            Err(CouponError::NotFound)
        );
    }

    #[test]
    fn first_order_discount_above_threshold() {
        // 5000 cart with no prior orders
        assert_eq!(first_order_discount(None, 5000), 250);
        assert_eq!(first_order_discount(Some(&stats(0, false)), 5000), 250);
    }

    #[test]
    fn first_order_discount_rounds_half_up() {
        // 4010 * 5% = 200.5
        assert_eq!(first_order_discount(None, 4010), 201);
    }

    #[test]
    fn no_discount_at_or_below_threshold() {
        assert_eq!(first_order_discount(None, 4000), 0);
        assert_eq!(first_order_discount(None, 3999), 0);
    }

    #[test]
    fn no_discount_after_first_order_or_consumption() {
        assert_eq!(first_order_discount(Some(&stats(1, false)), 5000), 0);
        assert_eq!(first_order_discount(Some(&stats(0, true)), 5000), 0);
    }

    #[test]
    fn final_total_never_negative() {
        let b = PriceBreakdown::compose(1000, 800, 500);
        assert_eq!(b.total_discount, 1300);
        assert_eq!(b.final_total, 0);
        for (sub, c, f) in [(0, 0, 0), (100, 0, 0), (100, 100, 100), (5000, 200, 250)] {
            assert!(PriceBreakdown::compose(sub, c, f).final_total >= 0);
        }
    }

    #[test]
    fn first_order_5000_pays_4750() {
        let discount = first_order_discount(None, 5000);
        let b = PriceBreakdown::compose(5000, 0, discount);
        assert_eq!(b.first_order_discount, 250);
        assert_eq!(b.final_total, 4750);
    }

    #[test]
    fn code_normalization() {
        assert_eq!(normalize_code("  save200 "), "SAVE200");
    }
}
