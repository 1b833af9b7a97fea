//! Fixed-point monetary arithmetic helpers.
//!
//! All monetary values in the domain are `rust_decimal::Decimal` carried to
//! two decimal places. Rounding is **midpoint away from zero** (a half cent
//! always rounds up in magnitude: 29.925 → 29.93), applied in exactly one
//! place so every module rounds the same way.

use rust_decimal::{Decimal, RoundingStrategy};

/// Number of decimal places for monetary amounts.
pub const SCALE: u32 = 2;

const ONE_HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// Round a monetary amount to two decimal places, midpoint away from zero.
pub fn round2(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Apply a percentage rate (e.g. `6.65` for 6.65%) to an amount, rounded.
pub fn percent_of(amount: Decimal, rate_percent: Decimal) -> Decimal {
    round2(amount * rate_percent / ONE_HUNDRED)
}

/// Build an amount from minor units (cents).
pub fn cents(minor: i64) -> Decimal {
    Decimal::new(minor, SCALE)
}

/// Clamp an amount to zero minimum.
pub fn clamp_non_negative(amount: Decimal) -> Decimal {
    if amount.is_sign_negative() {
        Decimal::ZERO
    } else {
        amount
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_the_half_cent_away_from_zero() {
        // 450.00 * 6.65% = 29.9250 exactly; the half cent rounds up.
        let tax = percent_of(cents(45_000), Decimal::new(665, 2));
        assert_eq!(tax, cents(2_993));

        assert_eq!(round2(Decimal::new(29_925, 3)), cents(2_993));
        assert_eq!(round2(Decimal::new(-29_925, 3)), cents(-2_993));
    }

    #[test]
    fn percent_of_whole_amounts() {
        // 2% commission on 1000.00
        assert_eq!(percent_of(cents(100_000), Decimal::from(2)), cents(2_000));
        // 10% discount on 1000.00
        assert_eq!(percent_of(cents(100_000), Decimal::from(10)), cents(10_000));
    }

    #[test]
    fn clamp_floors_at_zero() {
        assert_eq!(clamp_non_negative(cents(-1)), Decimal::ZERO);
        assert_eq!(clamp_non_negative(cents(1)), cents(1));
        assert_eq!(clamp_non_negative(Decimal::ZERO), Decimal::ZERO);
    }
}
