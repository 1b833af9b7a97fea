//! Affiliate program: membership lifecycle, commission accrual, withdrawals,
//! and the append-only balance ledger.

pub mod account;
pub mod program;

pub use account::{
    AffiliateAccount, AffiliateCommand, AffiliateEvent, AffiliateId, AffiliateStatus,
    CommissionEntry, CommissionId, CommissionStatus, LedgerEntry, LedgerEntryKind, PayoutMethod,
    WithdrawalEntry, WithdrawalId, WithdrawalStatus,
};
pub use program::{AffiliateCode, AffiliateProgram};
