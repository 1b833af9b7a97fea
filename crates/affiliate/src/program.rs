use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use bramble_core::ValueObject;
use bramble_core::money::{cents, percent_of};

/// Unique referral code identifying an affiliate.
///
/// Generated once when the account is enrolled and immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AffiliateCode(String);

impl AffiliateCode {
    /// Generate a fresh code from the random tail of a UUID.
    pub fn generate() -> Self {
        let hex = Uuid::now_v7().simple().to_string();
        let tail = &hex[hex.len() - 6..];
        Self(format!("AF-{}", tail.to_uppercase()))
    }

    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for AffiliateCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Affiliate program configuration, fixed at construction time.
///
/// The commission rate is *captured onto each commission entry when it is
/// created*; changing the program never rewrites previously accrued
/// commissions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AffiliateProgram {
    pub name: String,
    /// Commission rate in percent (e.g. `2.00`).
    pub commission_rate_percent: Decimal,
    /// Smallest withdrawal an affiliate may request.
    pub min_withdrawal: Decimal,
    /// How long a referral attribution lives, in days.
    pub referral_window_days: u32,
    pub is_active: bool,
}

impl AffiliateProgram {
    /// Commission owed on an order amount at the program's current rate.
    pub fn commission_on(&self, order_amount: Decimal) -> Decimal {
        percent_of(order_amount, self.commission_rate_percent)
    }
}

impl Default for AffiliateProgram {
    fn default() -> Self {
        Self {
            name: "Bramble Partner Program".to_string(),
            commission_rate_percent: Decimal::new(200, 2),
            min_withdrawal: cents(1_000_00),
            referral_window_days: 30,
            is_active: true,
        }
    }
}

impl ValueObject for AffiliateProgram {}
