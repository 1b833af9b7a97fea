use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use bramble_core::DomainError;
use bramble_core::money;

/// How a coupon discounts a cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscountType {
    Percentage,
    Fixed,
}

/// A discount code with a validity window and an optional usage cap.
///
/// A coupon is valid iff it is active, `now` falls inside
/// `[valid_from, valid_to]`, and the usage counter is below the cap (when a
/// cap is set). Rejections carry the specific reason; callers must never
/// silently drop an invalid coupon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coupon {
    pub code: String,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    pub min_purchase: Decimal,
    pub max_uses: Option<u32>,
    pub uses_count: u32,
    pub valid_from: DateTime<Utc>,
    pub valid_to: DateTime<Utc>,
    pub is_active: bool,
}

impl Coupon {
    /// Check intrinsic validity (active flag, window, usage cap).
    pub fn validity(&self, now: DateTime<Utc>) -> Result<(), DomainError> {
        if !self.is_active {
            return Err(DomainError::validation(format!(
                "coupon '{}' is not active",
                self.code
            )));
        }
        if now < self.valid_from {
            return Err(DomainError::validation(format!(
                "coupon '{}' is not valid yet",
                self.code
            )));
        }
        if now > self.valid_to {
            return Err(DomainError::validation(format!(
                "coupon '{}' has expired",
                self.code
            )));
        }
        if let Some(cap) = self.max_uses {
            if self.uses_count >= cap {
                return Err(DomainError::validation(format!(
                    "coupon '{}' has reached its usage cap",
                    self.code
                )));
            }
        }
        Ok(())
    }

    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        self.validity(now).is_ok()
    }

    /// Full check for applying this coupon to a cart subtotal.
    pub fn validate_for(&self, subtotal: Decimal, now: DateTime<Utc>) -> Result<(), DomainError> {
        self.validity(now)?;
        if subtotal < self.min_purchase {
            return Err(DomainError::validation(format!(
                "coupon '{}' requires a minimum purchase of {}",
                self.code, self.min_purchase
            )));
        }
        Ok(())
    }

    /// Discount amount for a given subtotal.
    ///
    /// Percentage coupons round to two decimal places; fixed coupons are
    /// clamped to the subtotal so a discount can never exceed what is
    /// being discounted.
    pub fn discount_for(&self, subtotal: Decimal) -> Decimal {
        match self.discount_type {
            DiscountType::Percentage => money::percent_of(subtotal, self.discount_value),
            DiscountType::Fixed => self.discount_value.min(subtotal),
        }
    }

    /// Count one application of this coupon.
    ///
    /// Called exactly once per order creation; recomputing totals for
    /// display must not touch the counter.
    pub fn record_use(&mut self) {
        self.uses_count += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bramble_core::money::cents;
    use chrono::Duration;

    fn test_coupon(discount_type: DiscountType, value: Decimal) -> Coupon {
        let now = Utc::now();
        Coupon {
            code: "WELCOME".to_string(),
            discount_type,
            discount_value: value,
            min_purchase: Decimal::ZERO,
            max_uses: None,
            uses_count: 0,
            valid_from: now - Duration::days(1),
            valid_to: now + Duration::days(1),
            is_active: true,
        }
    }

    #[test]
    fn percentage_coupon_discounts_ten_percent() {
        let coupon = test_coupon(DiscountType::Percentage, Decimal::from(10));
        assert_eq!(coupon.discount_for(cents(100_000)), cents(10_000));
    }

    #[test]
    fn fixed_coupon_is_clamped_to_subtotal() {
        let coupon = test_coupon(DiscountType::Fixed, cents(50_00));
        assert_eq!(coupon.discount_for(cents(30_00)), cents(30_00));
        assert_eq!(coupon.discount_for(cents(80_00)), cents(50_00));
    }

    #[test]
    fn inactive_coupon_is_rejected() {
        let mut coupon = test_coupon(DiscountType::Fixed, cents(10_00));
        coupon.is_active = false;

        let err = coupon.validity(Utc::now()).unwrap_err();
        assert!(matches!(err, DomainError::Validation(msg) if msg.contains("not active")));
    }

    #[test]
    fn expired_coupon_is_rejected() {
        let mut coupon = test_coupon(DiscountType::Fixed, cents(10_00));
        coupon.valid_to = Utc::now() - Duration::hours(1);

        let err = coupon.validity(Utc::now()).unwrap_err();
        assert!(matches!(err, DomainError::Validation(msg) if msg.contains("expired")));
    }

    #[test]
    fn not_yet_valid_coupon_is_rejected() {
        let mut coupon = test_coupon(DiscountType::Fixed, cents(10_00));
        coupon.valid_from = Utc::now() + Duration::hours(1);

        let err = coupon.validity(Utc::now()).unwrap_err();
        assert!(matches!(err, DomainError::Validation(msg) if msg.contains("not valid yet")));
    }

    #[test]
    fn usage_cap_is_enforced() {
        let mut coupon = test_coupon(DiscountType::Fixed, cents(10_00));
        coupon.max_uses = Some(2);
        coupon.uses_count = 1;
        assert!(coupon.is_valid(Utc::now()));

        coupon.record_use();
        let err = coupon.validity(Utc::now()).unwrap_err();
        assert!(matches!(err, DomainError::Validation(msg) if msg.contains("usage cap")));
    }

    #[test]
    fn minimum_purchase_is_enforced() {
        let mut coupon = test_coupon(DiscountType::Percentage, Decimal::from(10));
        coupon.min_purchase = cents(500_00);

        let err = coupon.validate_for(cents(499_99), Utc::now()).unwrap_err();
        assert!(matches!(err, DomainError::Validation(msg) if msg.contains("minimum purchase")));

        assert!(coupon.validate_for(cents(500_00), Utc::now()).is_ok());
    }
}
