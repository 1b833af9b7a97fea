//! Order-total computation: subtotal, shipping, tax, discount, total.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use bramble_core::money::{self, cents};
use bramble_core::{DomainError, ValueObject};

use crate::cart::Cart;
use crate::coupon::Coupon;

/// Pricing knobs, fixed at construction time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingConfig {
    /// Flat shipping fee charged below the free-shipping threshold.
    pub flat_shipping_fee: Decimal,
    /// Subtotals at or above this ship for free.
    pub free_shipping_threshold: Decimal,
    /// Tax rate in percent (e.g. `6.65`).
    pub tax_rate_percent: Decimal,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            flat_shipping_fee: cents(50_00),
            free_shipping_threshold: cents(500_00),
            tax_rate_percent: Decimal::new(665, 2),
        }
    }
}

impl ValueObject for PricingConfig {}

/// Monetary breakdown of an order, frozen at checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderTotals {
    pub subtotal: Decimal,
    pub shipping: Decimal,
    pub tax: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
}

impl OrderTotals {
    /// Whether the components add up: every field non-negative and
    /// `total == max(subtotal + shipping + tax - discount, 0)`.
    pub fn balances(&self) -> bool {
        let non_negative = !self.subtotal.is_sign_negative()
            && !self.shipping.is_sign_negative()
            && !self.tax.is_sign_negative()
            && !self.discount.is_sign_negative()
            && !self.total.is_sign_negative();

        non_negative
            && self.total
                == money::clamp_non_negative(
                    self.subtotal + self.shipping + self.tax - self.discount,
                )
    }
}

impl ValueObject for OrderTotals {}

/// Compute the monetary breakdown for a cart.
///
/// An invalid coupon (inactive, outside its window, capped, or below its
/// minimum purchase) is an error carrying the specific reason; it is never
/// silently ignored. The coupon usage counter is *not* touched here — the
/// caller counts one use when an order is actually created.
pub fn compute_totals(
    cart: &Cart,
    config: &PricingConfig,
    coupon: Option<&Coupon>,
    now: DateTime<Utc>,
) -> Result<OrderTotals, DomainError> {
    let subtotal = cart.subtotal();

    let shipping = if subtotal > Decimal::ZERO && subtotal < config.free_shipping_threshold {
        config.flat_shipping_fee
    } else {
        Decimal::ZERO
    };

    let tax = money::percent_of(subtotal, config.tax_rate_percent);

    let discount = match coupon {
        Some(coupon) => {
            coupon.validate_for(subtotal, now)?;
            coupon.discount_for(subtotal)
        }
        None => Decimal::ZERO,
    };

    let total = money::clamp_non_negative(subtotal + shipping + tax - discount);

    Ok(OrderTotals {
        subtotal,
        shipping,
        tax,
        discount,
        total,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::{CartId, CartOwner, ProductId};
    use crate::coupon::DiscountType;
    use bramble_core::{AggregateId, UserId};
    use chrono::Duration;
    use proptest::prelude::*;

    fn cart_with_subtotal(minor: i64) -> Cart {
        let mut cart = Cart::new(
            CartId::new(AggregateId::new()),
            CartOwner::User(UserId::new()),
        );
        cart.add_line(
            ProductId::new(AggregateId::new()),
            "Item",
            "SKU-1",
            cents(minor),
            1,
        )
        .unwrap();
        cart
    }

    fn test_coupon(discount_type: DiscountType, value: Decimal) -> Coupon {
        let now = Utc::now();
        Coupon {
            code: "SAVE".to_string(),
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
    fn below_threshold_cart_pays_flat_fee_and_rounded_tax() {
        // 450.00 at 6.65% tax: the 29.925 half cent rounds up to 29.93.
        let cart = cart_with_subtotal(450_00);
        let totals =
            compute_totals(&cart, &PricingConfig::default(), None, Utc::now()).unwrap();

        assert_eq!(totals.subtotal, cents(450_00));
        assert_eq!(totals.shipping, cents(50_00));
        assert_eq!(totals.tax, cents(29_93));
        assert_eq!(totals.discount, Decimal::ZERO);
        assert_eq!(totals.total, cents(529_93));
    }

    #[test]
    fn threshold_subtotal_ships_free() {
        let cart = cart_with_subtotal(500_00);
        let totals =
            compute_totals(&cart, &PricingConfig::default(), None, Utc::now()).unwrap();
        assert_eq!(totals.shipping, Decimal::ZERO);
    }

    #[test]
    fn empty_cart_computes_all_zeros() {
        let cart = Cart::new(
            CartId::new(AggregateId::new()),
            CartOwner::Session("sess-1".to_string()),
        );
        let totals =
            compute_totals(&cart, &PricingConfig::default(), None, Utc::now()).unwrap();

        assert_eq!(totals.subtotal, Decimal::ZERO);
        assert_eq!(totals.shipping, Decimal::ZERO);
        assert_eq!(totals.tax, Decimal::ZERO);
        assert_eq!(totals.total, Decimal::ZERO);
    }

    #[test]
    fn percentage_coupon_reduces_total() {
        let cart = cart_with_subtotal(1_000_00);
        let coupon = test_coupon(DiscountType::Percentage, Decimal::from(10));
        let totals =
            compute_totals(&cart, &PricingConfig::default(), Some(&coupon), Utc::now()).unwrap();

        assert_eq!(totals.discount, cents(100_00));
        // 1000.00 + 0 shipping + 66.50 tax - 100.00
        assert_eq!(totals.total, cents(966_50));
    }

    #[test]
    fn invalid_coupon_is_an_error_not_ignored() {
        let cart = cart_with_subtotal(100_00);
        let mut coupon = test_coupon(DiscountType::Percentage, Decimal::from(10));
        coupon.min_purchase = cents(500_00);

        let err =
            compute_totals(&cart, &PricingConfig::default(), Some(&coupon), Utc::now())
                .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn oversized_percentage_discount_clamps_total_at_zero() {
        // 600.00 ships free; a 200% coupon discounts 1200.00, far past
        // subtotal + tax, so the total floors at zero.
        let cart = cart_with_subtotal(600_00);
        let coupon = test_coupon(DiscountType::Percentage, Decimal::from(200));
        let totals =
            compute_totals(&cart, &PricingConfig::default(), Some(&coupon), Utc::now()).unwrap();

        assert_eq!(totals.discount, cents(1_200_00));
        assert_eq!(totals.total, Decimal::ZERO);
        assert!(totals.balances());
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: for any cart, total == subtotal + shipping + tax - discount,
        /// clamped at zero, and every component is non-negative.
        #[test]
        fn totals_always_balance(
            prices in prop::collection::vec(1i64..100_000i64, 1..8),
            quantities in prop::collection::vec(1u32..10u32, 8),
            percent in 0i64..300i64,
        ) {
            let mut cart = Cart::new(
                CartId::new(AggregateId::new()),
                CartOwner::User(UserId::new()),
            );
            for (i, price) in prices.iter().enumerate() {
                cart.add_line(
                    ProductId::new(AggregateId::new()),
                    format!("Item {i}"),
                    format!("SKU-{i}"),
                    cents(*price),
                    quantities[i],
                ).unwrap();
            }

            let coupon = test_coupon(DiscountType::Percentage, Decimal::from(percent));
            let totals = compute_totals(
                &cart,
                &PricingConfig::default(),
                Some(&coupon),
                Utc::now(),
            ).unwrap();

            prop_assert!(totals.balances());
            prop_assert!(!totals.total.is_sign_negative());
        }
    }
}
