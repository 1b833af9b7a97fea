use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use bramble_core::money::percent_of;
use bramble_core::{Aggregate, AggregateId, AggregateRoot, DomainError, UserId};
use bramble_events::Event;
use bramble_orders::OrderId;

use crate::program::AffiliateCode;

/// Affiliate account identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AffiliateId(pub AggregateId);

impl AffiliateId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for AffiliateId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Commission entry identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommissionId(pub AggregateId);

impl CommissionId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for CommissionId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Withdrawal entry identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WithdrawalId(pub AggregateId);

impl WithdrawalId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for WithdrawalId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Membership lifecycle. Suspension is reversible; rejection is not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AffiliateStatus {
    Pending,
    Active,
    Suspended,
    Rejected,
}

/// Lifecycle of one referred order's commission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommissionStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

/// Lifecycle of one withdrawal request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WithdrawalStatus {
    Pending,
    Approved,
    Processing,
    Paid,
    Rejected,
}

impl WithdrawalStatus {
    /// Requested-but-unsettled states hold funds against the balance.
    pub fn holds_funds(self) -> bool {
        matches!(
            self,
            WithdrawalStatus::Pending | WithdrawalStatus::Approved | WithdrawalStatus::Processing
        )
    }
}

/// How a withdrawal pays out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayoutMethod {
    BankTransfer,
    Upi,
    Paypal,
}

/// Kind of a balance-affecting ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedgerEntryKind {
    Earning,
    Withdrawal,
    Bonus,
    Deduction,
}

/// Append-only ledger row: one balance-affecting event with the balance it
/// left behind. Never mutated or deleted; the audit trail stands on its own
/// next to the mutable running totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub kind: LedgerEntryKind,
    pub amount: Decimal,
    pub description: String,
    pub balance_after: Decimal,
    pub related_commission: Option<CommissionId>,
    pub related_withdrawal: Option<WithdrawalId>,
    pub occurred_at: DateTime<Utc>,
}

/// One referred order and its commission.
///
/// The rate is captured when the entry is created; program changes never
/// rewrite it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommissionEntry {
    pub id: CommissionId,
    pub order_id: OrderId,
    pub order_amount: Decimal,
    pub commission_rate_percent: Decimal,
    pub commission_amount: Decimal,
    pub status: CommissionStatus,
    pub created_at: DateTime<Utc>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// One withdrawal request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawalEntry {
    pub id: WithdrawalId,
    pub amount: Decimal,
    pub method: PayoutMethod,
    pub status: WithdrawalStatus,
    pub requested_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
    pub paid_at: Option<DateTime<Utc>>,
}

/// Aggregate root: one affiliate's account.
///
/// Holds the membership status, running totals, commission and withdrawal
/// entries, and the append-only ledger. Everything that touches the balance
/// goes through this aggregate, which is what serializes concurrent
/// commission and withdrawal activity per affiliate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AffiliateAccount {
    id: AffiliateId,
    user_id: Option<UserId>,
    code: Option<AffiliateCode>,
    status: AffiliateStatus,
    total_earnings: Decimal,
    total_withdrawn: Decimal,
    total_referrals: u32,
    commissions: Vec<CommissionEntry>,
    withdrawals: Vec<WithdrawalEntry>,
    ledger: Vec<LedgerEntry>,
    joined_at: Option<DateTime<Utc>>,
    approved_at: Option<DateTime<Utc>>,
    version: u64,
    created: bool,
}

impl AffiliateAccount {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: AffiliateId) -> Self {
        Self {
            id,
            user_id: None,
            code: None,
            status: AffiliateStatus::Pending,
            total_earnings: Decimal::ZERO,
            total_withdrawn: Decimal::ZERO,
            total_referrals: 0,
            commissions: Vec::new(),
            withdrawals: Vec::new(),
            ledger: Vec::new(),
            joined_at: None,
            approved_at: None,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> AffiliateId {
        self.id
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.user_id
    }

    pub fn code(&self) -> Option<&AffiliateCode> {
        self.code.as_ref()
    }

    pub fn status(&self) -> AffiliateStatus {
        self.status
    }

    pub fn is_active(&self) -> bool {
        self.status == AffiliateStatus::Active
    }

    pub fn total_earnings(&self) -> Decimal {
        self.total_earnings
    }

    pub fn total_withdrawn(&self) -> Decimal {
        self.total_withdrawn
    }

    pub fn total_referrals(&self) -> u32 {
        self.total_referrals
    }

    pub fn commissions(&self) -> &[CommissionEntry] {
        &self.commissions
    }

    pub fn withdrawals(&self) -> &[WithdrawalEntry] {
        &self.withdrawals
    }

    pub fn ledger(&self) -> &[LedgerEntry] {
        &self.ledger
    }

    pub fn joined_at(&self) -> Option<DateTime<Utc>> {
        self.joined_at
    }

    pub fn approved_at(&self) -> Option<DateTime<Utc>> {
        self.approved_at
    }

    /// Money earned and not yet paid out.
    pub fn available_balance(&self) -> Decimal {
        self.total_earnings - self.total_withdrawn
    }

    /// Sum of withdrawal requests that are not yet settled.
    pub fn outstanding_withdrawals(&self) -> Decimal {
        self.withdrawals
            .iter()
            .filter(|w| w.status.holds_funds())
            .map(|w| w.amount)
            .sum()
    }

    /// What a new withdrawal request may draw on: the available balance
    /// minus funds already held by open requests.
    pub fn withdrawable_balance(&self) -> Decimal {
        self.available_balance() - self.outstanding_withdrawals()
    }

    /// Commission accrued but not yet completed.
    pub fn pending_commission(&self) -> Decimal {
        self.commissions
            .iter()
            .filter(|c| c.status == CommissionStatus::Pending)
            .map(|c| c.commission_amount)
            .sum()
    }

    fn commission(&self, id: CommissionId) -> Result<&CommissionEntry, DomainError> {
        self.commissions
            .iter()
            .find(|c| c.id == id)
            .ok_or(DomainError::NotFound)
    }

    fn withdrawal(&self, id: WithdrawalId) -> Result<&WithdrawalEntry, DomainError> {
        self.withdrawals
            .iter()
            .find(|w| w.id == id)
            .ok_or(DomainError::NotFound)
    }
}

impl AggregateRoot for AffiliateAccount {
    type Id = AffiliateId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AffiliateCommand {
    Enroll {
        account_id: AffiliateId,
        user_id: UserId,
        code: AffiliateCode,
        occurred_at: DateTime<Utc>,
    },
    Approve {
        account_id: AffiliateId,
        occurred_at: DateTime<Utc>,
    },
    Reject {
        account_id: AffiliateId,
        occurred_at: DateTime<Utc>,
    },
    Suspend {
        account_id: AffiliateId,
        occurred_at: DateTime<Utc>,
    },
    Reactivate {
        account_id: AffiliateId,
        occurred_at: DateTime<Utc>,
    },
    /// Record a referred order; the commission rate is captured here, once.
    RecordReferral {
        account_id: AffiliateId,
        commission_id: CommissionId,
        order_id: OrderId,
        order_amount: Decimal,
        commission_rate_percent: Decimal,
        occurred_at: DateTime<Utc>,
    },
    ConfirmCommission {
        account_id: AffiliateId,
        commission_id: CommissionId,
        occurred_at: DateTime<Utc>,
    },
    CompleteCommission {
        account_id: AffiliateId,
        commission_id: CommissionId,
        occurred_at: DateTime<Utc>,
    },
    CancelCommission {
        account_id: AffiliateId,
        commission_id: CommissionId,
        occurred_at: DateTime<Utc>,
    },
    GrantBonus {
        account_id: AffiliateId,
        amount: Decimal,
        description: String,
        occurred_at: DateTime<Utc>,
    },
    /// `min_withdrawal` is captured from the program by the caller so the
    /// aggregate stays free of ambient configuration.
    RequestWithdrawal {
        account_id: AffiliateId,
        withdrawal_id: WithdrawalId,
        amount: Decimal,
        method: PayoutMethod,
        min_withdrawal: Decimal,
        occurred_at: DateTime<Utc>,
    },
    ApproveWithdrawal {
        account_id: AffiliateId,
        withdrawal_id: WithdrawalId,
        occurred_at: DateTime<Utc>,
    },
    StartPayout {
        account_id: AffiliateId,
        withdrawal_id: WithdrawalId,
        occurred_at: DateTime<Utc>,
    },
    MarkWithdrawalPaid {
        account_id: AffiliateId,
        withdrawal_id: WithdrawalId,
        occurred_at: DateTime<Utc>,
    },
    RejectWithdrawal {
        account_id: AffiliateId,
        withdrawal_id: WithdrawalId,
        occurred_at: DateTime<Utc>,
    },
}

impl AffiliateCommand {
    pub fn account_id(&self) -> AffiliateId {
        match self {
            AffiliateCommand::Enroll { account_id, .. }
            | AffiliateCommand::Approve { account_id, .. }
            | AffiliateCommand::Reject { account_id, .. }
            | AffiliateCommand::Suspend { account_id, .. }
            | AffiliateCommand::Reactivate { account_id, .. }
            | AffiliateCommand::RecordReferral { account_id, .. }
            | AffiliateCommand::ConfirmCommission { account_id, .. }
            | AffiliateCommand::CompleteCommission { account_id, .. }
            | AffiliateCommand::CancelCommission { account_id, .. }
            | AffiliateCommand::GrantBonus { account_id, .. }
            | AffiliateCommand::RequestWithdrawal { account_id, .. }
            | AffiliateCommand::ApproveWithdrawal { account_id, .. }
            | AffiliateCommand::StartPayout { account_id, .. }
            | AffiliateCommand::MarkWithdrawalPaid { account_id, .. }
            | AffiliateCommand::RejectWithdrawal { account_id, .. } => *account_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AffiliateEvent {
    Enrolled {
        account_id: AffiliateId,
        user_id: UserId,
        code: AffiliateCode,
        occurred_at: DateTime<Utc>,
    },
    Approved {
        account_id: AffiliateId,
        occurred_at: DateTime<Utc>,
    },
    Rejected {
        account_id: AffiliateId,
        occurred_at: DateTime<Utc>,
    },
    Suspended {
        account_id: AffiliateId,
        occurred_at: DateTime<Utc>,
    },
    Reactivated {
        account_id: AffiliateId,
        occurred_at: DateTime<Utc>,
    },
    CommissionAccrued {
        account_id: AffiliateId,
        commission_id: CommissionId,
        order_id: OrderId,
        order_amount: Decimal,
        commission_rate_percent: Decimal,
        commission_amount: Decimal,
        occurred_at: DateTime<Utc>,
    },
    CommissionConfirmed {
        account_id: AffiliateId,
        commission_id: CommissionId,
        occurred_at: DateTime<Utc>,
    },
    /// The exactly-once earning credit.
    CommissionCompleted {
        account_id: AffiliateId,
        commission_id: CommissionId,
        amount: Decimal,
        balance_after: Decimal,
        occurred_at: DateTime<Utc>,
    },
    CommissionCancelled {
        account_id: AffiliateId,
        commission_id: CommissionId,
        occurred_at: DateTime<Utc>,
    },
    /// Cancellation of a *completed* commission: the earning is clawed back.
    CommissionRevoked {
        account_id: AffiliateId,
        commission_id: CommissionId,
        amount: Decimal,
        balance_after: Decimal,
        occurred_at: DateTime<Utc>,
    },
    BonusGranted {
        account_id: AffiliateId,
        amount: Decimal,
        description: String,
        balance_after: Decimal,
        occurred_at: DateTime<Utc>,
    },
    WithdrawalRequested {
        account_id: AffiliateId,
        withdrawal_id: WithdrawalId,
        amount: Decimal,
        method: PayoutMethod,
        occurred_at: DateTime<Utc>,
    },
    WithdrawalApproved {
        account_id: AffiliateId,
        withdrawal_id: WithdrawalId,
        occurred_at: DateTime<Utc>,
    },
    WithdrawalProcessing {
        account_id: AffiliateId,
        withdrawal_id: WithdrawalId,
        occurred_at: DateTime<Utc>,
    },
    WithdrawalPaid {
        account_id: AffiliateId,
        withdrawal_id: WithdrawalId,
        amount: Decimal,
        balance_after: Decimal,
        occurred_at: DateTime<Utc>,
    },
    WithdrawalRejected {
        account_id: AffiliateId,
        withdrawal_id: WithdrawalId,
        occurred_at: DateTime<Utc>,
    },
}

impl Event for AffiliateEvent {
    fn event_type(&self) -> &'static str {
        match self {
            AffiliateEvent::Enrolled { .. } => "affiliate.account.enrolled",
            AffiliateEvent::Approved { .. } => "affiliate.account.approved",
            AffiliateEvent::Rejected { .. } => "affiliate.account.rejected",
            AffiliateEvent::Suspended { .. } => "affiliate.account.suspended",
            AffiliateEvent::Reactivated { .. } => "affiliate.account.reactivated",
            AffiliateEvent::CommissionAccrued { .. } => "affiliate.commission.accrued",
            AffiliateEvent::CommissionConfirmed { .. } => "affiliate.commission.confirmed",
            AffiliateEvent::CommissionCompleted { .. } => "affiliate.commission.completed",
            AffiliateEvent::CommissionCancelled { .. } => "affiliate.commission.cancelled",
            AffiliateEvent::CommissionRevoked { .. } => "affiliate.commission.revoked",
            AffiliateEvent::BonusGranted { .. } => "affiliate.bonus.granted",
            AffiliateEvent::WithdrawalRequested { .. } => "affiliate.withdrawal.requested",
            AffiliateEvent::WithdrawalApproved { .. } => "affiliate.withdrawal.approved",
            AffiliateEvent::WithdrawalProcessing { .. } => "affiliate.withdrawal.processing",
            AffiliateEvent::WithdrawalPaid { .. } => "affiliate.withdrawal.paid",
            AffiliateEvent::WithdrawalRejected { .. } => "affiliate.withdrawal.rejected",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            AffiliateEvent::Enrolled { occurred_at, .. }
            | AffiliateEvent::Approved { occurred_at, .. }
            | AffiliateEvent::Rejected { occurred_at, .. }
            | AffiliateEvent::Suspended { occurred_at, .. }
            | AffiliateEvent::Reactivated { occurred_at, .. }
            | AffiliateEvent::CommissionAccrued { occurred_at, .. }
            | AffiliateEvent::CommissionConfirmed { occurred_at, .. }
            | AffiliateEvent::CommissionCompleted { occurred_at, .. }
            | AffiliateEvent::CommissionCancelled { occurred_at, .. }
            | AffiliateEvent::CommissionRevoked { occurred_at, .. }
            | AffiliateEvent::BonusGranted { occurred_at, .. }
            | AffiliateEvent::WithdrawalRequested { occurred_at, .. }
            | AffiliateEvent::WithdrawalApproved { occurred_at, .. }
            | AffiliateEvent::WithdrawalProcessing { occurred_at, .. }
            | AffiliateEvent::WithdrawalPaid { occurred_at, .. }
            | AffiliateEvent::WithdrawalRejected { occurred_at, .. } => *occurred_at,
        }
    }
}

impl Aggregate for AffiliateAccount {
    type Command = AffiliateCommand;
    type Event = AffiliateEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            AffiliateEvent::Enrolled {
                account_id,
                user_id,
                code,
                occurred_at,
            } => {
                self.id = *account_id;
                self.user_id = Some(*user_id);
                self.code = Some(code.clone());
                self.status = AffiliateStatus::Pending;
                self.joined_at = Some(*occurred_at);
                self.created = true;
            }
            AffiliateEvent::Approved { occurred_at, .. } => {
                self.status = AffiliateStatus::Active;
                self.approved_at = Some(*occurred_at);
            }
            AffiliateEvent::Rejected { .. } => {
                self.status = AffiliateStatus::Rejected;
            }
            AffiliateEvent::Suspended { .. } => {
                self.status = AffiliateStatus::Suspended;
            }
            AffiliateEvent::Reactivated { .. } => {
                self.status = AffiliateStatus::Active;
            }
            AffiliateEvent::CommissionAccrued {
                commission_id,
                order_id,
                order_amount,
                commission_rate_percent,
                commission_amount,
                occurred_at,
                ..
            } => {
                self.commissions.push(CommissionEntry {
                    id: *commission_id,
                    order_id: *order_id,
                    order_amount: *order_amount,
                    commission_rate_percent: *commission_rate_percent,
                    commission_amount: *commission_amount,
                    status: CommissionStatus::Pending,
                    created_at: *occurred_at,
                    confirmed_at: None,
                    completed_at: None,
                });
                self.total_referrals += 1;
            }
            AffiliateEvent::CommissionConfirmed {
                commission_id,
                occurred_at,
                ..
            } => {
                if let Some(entry) = self.commissions.iter_mut().find(|c| c.id == *commission_id) {
                    entry.status = CommissionStatus::Confirmed;
                    entry.confirmed_at = Some(*occurred_at);
                }
            }
            AffiliateEvent::CommissionCompleted {
                commission_id,
                amount,
                balance_after,
                occurred_at,
                ..
            } => {
                let order_id = self
                    .commissions
                    .iter()
                    .find(|c| c.id == *commission_id)
                    .map(|c| c.order_id);
                if let Some(entry) = self.commissions.iter_mut().find(|c| c.id == *commission_id) {
                    entry.status = CommissionStatus::Completed;
                    entry.completed_at = Some(*occurred_at);
                }
                self.total_earnings += *amount;
                self.ledger.push(LedgerEntry {
                    kind: LedgerEntryKind::Earning,
                    amount: *amount,
                    description: match order_id {
                        Some(order_id) => format!("commission for order {order_id}"),
                        None => "commission".to_string(),
                    },
                    balance_after: *balance_after,
                    related_commission: Some(*commission_id),
                    related_withdrawal: None,
                    occurred_at: *occurred_at,
                });
            }
            AffiliateEvent::CommissionCancelled { commission_id, .. } => {
                if let Some(entry) = self.commissions.iter_mut().find(|c| c.id == *commission_id) {
                    entry.status = CommissionStatus::Cancelled;
                }
            }
            AffiliateEvent::CommissionRevoked {
                commission_id,
                amount,
                balance_after,
                occurred_at,
                ..
            } => {
                let order_id = self
                    .commissions
                    .iter()
                    .find(|c| c.id == *commission_id)
                    .map(|c| c.order_id);
                if let Some(entry) = self.commissions.iter_mut().find(|c| c.id == *commission_id) {
                    entry.status = CommissionStatus::Cancelled;
                }
                self.total_earnings -= *amount;
                self.ledger.push(LedgerEntry {
                    kind: LedgerEntryKind::Deduction,
                    amount: *amount,
                    description: match order_id {
                        Some(order_id) => format!("commission revoked for order {order_id}"),
                        None => "commission revoked".to_string(),
                    },
                    balance_after: *balance_after,
                    related_commission: Some(*commission_id),
                    related_withdrawal: None,
                    occurred_at: *occurred_at,
                });
            }
            AffiliateEvent::BonusGranted {
                amount,
                description,
                balance_after,
                occurred_at,
                ..
            } => {
                self.total_earnings += *amount;
                self.ledger.push(LedgerEntry {
                    kind: LedgerEntryKind::Bonus,
                    amount: *amount,
                    description: description.clone(),
                    balance_after: *balance_after,
                    related_commission: None,
                    related_withdrawal: None,
                    occurred_at: *occurred_at,
                });
            }
            AffiliateEvent::WithdrawalRequested {
                withdrawal_id,
                amount,
                method,
                occurred_at,
                ..
            } => {
                self.withdrawals.push(WithdrawalEntry {
                    id: *withdrawal_id,
                    amount: *amount,
                    method: *method,
                    status: WithdrawalStatus::Pending,
                    requested_at: *occurred_at,
                    approved_at: None,
                    paid_at: None,
                });
            }
            AffiliateEvent::WithdrawalApproved {
                withdrawal_id,
                occurred_at,
                ..
            } => {
                if let Some(entry) = self.withdrawals.iter_mut().find(|w| w.id == *withdrawal_id) {
                    entry.status = WithdrawalStatus::Approved;
                    entry.approved_at = Some(*occurred_at);
                }
            }
            AffiliateEvent::WithdrawalProcessing { withdrawal_id, .. } => {
                if let Some(entry) = self.withdrawals.iter_mut().find(|w| w.id == *withdrawal_id) {
                    entry.status = WithdrawalStatus::Processing;
                }
            }
            AffiliateEvent::WithdrawalPaid {
                withdrawal_id,
                amount,
                balance_after,
                occurred_at,
                ..
            } => {
                let method = self
                    .withdrawals
                    .iter()
                    .find(|w| w.id == *withdrawal_id)
                    .map(|w| w.method);
                if let Some(entry) = self.withdrawals.iter_mut().find(|w| w.id == *withdrawal_id) {
                    entry.status = WithdrawalStatus::Paid;
                    entry.paid_at = Some(*occurred_at);
                }
                self.total_withdrawn += *amount;
                self.ledger.push(LedgerEntry {
                    kind: LedgerEntryKind::Withdrawal,
                    amount: *amount,
                    description: match method {
                        Some(method) => format!("withdrawal paid via {method:?}"),
                        None => "withdrawal paid".to_string(),
                    },
                    balance_after: *balance_after,
                    related_commission: None,
                    related_withdrawal: Some(*withdrawal_id),
                    occurred_at: *occurred_at,
                });
            }
            AffiliateEvent::WithdrawalRejected { withdrawal_id, .. } => {
                if let Some(entry) = self.withdrawals.iter_mut().find(|w| w.id == *withdrawal_id) {
                    entry.status = WithdrawalStatus::Rejected;
                }
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        self.ensure_account_id(command.account_id())?;
        if !matches!(command, AffiliateCommand::Enroll { .. }) && !self.created {
            return Err(DomainError::not_found());
        }

        match command {
            AffiliateCommand::Enroll {
                account_id,
                user_id,
                code,
                occurred_at,
            } => self.handle_enroll(*account_id, *user_id, code, *occurred_at),
            AffiliateCommand::Approve {
                account_id,
                occurred_at,
            } => self.handle_approve(*account_id, *occurred_at),
            AffiliateCommand::Reject {
                account_id,
                occurred_at,
            } => self.handle_reject(*account_id, *occurred_at),
            AffiliateCommand::Suspend {
                account_id,
                occurred_at,
            } => self.handle_suspend(*account_id, *occurred_at),
            AffiliateCommand::Reactivate {
                account_id,
                occurred_at,
            } => self.handle_reactivate(*account_id, *occurred_at),
            AffiliateCommand::RecordReferral {
                account_id,
                commission_id,
                order_id,
                order_amount,
                commission_rate_percent,
                occurred_at,
            } => self.handle_record_referral(
                *account_id,
                *commission_id,
                *order_id,
                *order_amount,
                *commission_rate_percent,
                *occurred_at,
            ),
            AffiliateCommand::ConfirmCommission {
                account_id,
                commission_id,
                occurred_at,
            } => self.handle_confirm_commission(*account_id, *commission_id, *occurred_at),
            AffiliateCommand::CompleteCommission {
                account_id,
                commission_id,
                occurred_at,
            } => self.handle_complete_commission(*account_id, *commission_id, *occurred_at),
            AffiliateCommand::CancelCommission {
                account_id,
                commission_id,
                occurred_at,
            } => self.handle_cancel_commission(*account_id, *commission_id, *occurred_at),
            AffiliateCommand::GrantBonus {
                account_id,
                amount,
                description,
                occurred_at,
            } => self.handle_grant_bonus(*account_id, *amount, description, *occurred_at),
            AffiliateCommand::RequestWithdrawal {
                account_id,
                withdrawal_id,
                amount,
                method,
                min_withdrawal,
                occurred_at,
            } => self.handle_request_withdrawal(
                *account_id,
                *withdrawal_id,
                *amount,
                *method,
                *min_withdrawal,
                *occurred_at,
            ),
            AffiliateCommand::ApproveWithdrawal {
                account_id,
                withdrawal_id,
                occurred_at,
            } => self.handle_approve_withdrawal(*account_id, *withdrawal_id, *occurred_at),
            AffiliateCommand::StartPayout {
                account_id,
                withdrawal_id,
                occurred_at,
            } => self.handle_start_payout(*account_id, *withdrawal_id, *occurred_at),
            AffiliateCommand::MarkWithdrawalPaid {
                account_id,
                withdrawal_id,
                occurred_at,
            } => self.handle_mark_withdrawal_paid(*account_id, *withdrawal_id, *occurred_at),
            AffiliateCommand::RejectWithdrawal {
                account_id,
                withdrawal_id,
                occurred_at,
            } => self.handle_reject_withdrawal(*account_id, *withdrawal_id, *occurred_at),
        }
    }
}

impl AffiliateAccount {
    fn ensure_account_id(&self, account_id: AffiliateId) -> Result<(), DomainError> {
        if self.id != account_id {
            return Err(DomainError::invariant("account_id mismatch"));
        }
        Ok(())
    }

    fn handle_enroll(
        &self,
        account_id: AffiliateId,
        user_id: UserId,
        code: &AffiliateCode,
        occurred_at: DateTime<Utc>,
    ) -> Result<Vec<AffiliateEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("affiliate account already exists"));
        }

        Ok(vec![AffiliateEvent::Enrolled {
            account_id,
            user_id,
            code: code.clone(),
            occurred_at,
        }])
    }

    fn handle_approve(
        &self,
        account_id: AffiliateId,
        occurred_at: DateTime<Utc>,
    ) -> Result<Vec<AffiliateEvent>, DomainError> {
        if self.status != AffiliateStatus::Pending {
            return Err(DomainError::invariant(
                "only pending applications can be approved",
            ));
        }
        Ok(vec![AffiliateEvent::Approved {
            account_id,
            occurred_at,
        }])
    }

    fn handle_reject(
        &self,
        account_id: AffiliateId,
        occurred_at: DateTime<Utc>,
    ) -> Result<Vec<AffiliateEvent>, DomainError> {
        if self.status != AffiliateStatus::Pending {
            return Err(DomainError::invariant(
                "only pending applications can be rejected",
            ));
        }
        Ok(vec![AffiliateEvent::Rejected {
            account_id,
            occurred_at,
        }])
    }

    fn handle_suspend(
        &self,
        account_id: AffiliateId,
        occurred_at: DateTime<Utc>,
    ) -> Result<Vec<AffiliateEvent>, DomainError> {
        if self.status != AffiliateStatus::Active {
            return Err(DomainError::invariant("only active accounts can be suspended"));
        }
        Ok(vec![AffiliateEvent::Suspended {
            account_id,
            occurred_at,
        }])
    }

    fn handle_reactivate(
        &self,
        account_id: AffiliateId,
        occurred_at: DateTime<Utc>,
    ) -> Result<Vec<AffiliateEvent>, DomainError> {
        if self.status != AffiliateStatus::Suspended {
            return Err(DomainError::invariant(
                "only suspended accounts can be reactivated",
            ));
        }
        Ok(vec![AffiliateEvent::Reactivated {
            account_id,
            occurred_at,
        }])
    }

    fn handle_record_referral(
        &self,
        account_id: AffiliateId,
        commission_id: CommissionId,
        order_id: OrderId,
        order_amount: Decimal,
        commission_rate_percent: Decimal,
        occurred_at: DateTime<Utc>,
    ) -> Result<Vec<AffiliateEvent>, DomainError> {
        if !self.is_active() {
            return Err(DomainError::invariant(
                "only active affiliates earn commission",
            ));
        }
        if self.commissions.iter().any(|c| c.id == commission_id) {
            return Err(DomainError::conflict("commission entry already exists"));
        }
        if order_amount <= Decimal::ZERO {
            return Err(DomainError::validation("order_amount must be positive"));
        }
        if commission_rate_percent.is_sign_negative() {
            return Err(DomainError::validation(
                "commission rate must not be negative",
            ));
        }

        let commission_amount = percent_of(order_amount, commission_rate_percent);

        Ok(vec![AffiliateEvent::CommissionAccrued {
            account_id,
            commission_id,
            order_id,
            order_amount,
            commission_rate_percent,
            commission_amount,
            occurred_at,
        }])
    }

    fn handle_confirm_commission(
        &self,
        account_id: AffiliateId,
        commission_id: CommissionId,
        occurred_at: DateTime<Utc>,
    ) -> Result<Vec<AffiliateEvent>, DomainError> {
        let entry = self.commission(commission_id)?;

        // Idempotent safety net: order transitions re-fire this internally.
        if entry.status != CommissionStatus::Pending {
            return Ok(vec![]);
        }

        Ok(vec![AffiliateEvent::CommissionConfirmed {
            account_id,
            commission_id,
            occurred_at,
        }])
    }

    fn handle_complete_commission(
        &self,
        account_id: AffiliateId,
        commission_id: CommissionId,
        occurred_at: DateTime<Utc>,
    ) -> Result<Vec<AffiliateEvent>, DomainError> {
        let entry = self.commission(commission_id)?;

        // Exactly-once credit: anything past pending/confirmed is a no-op.
        match entry.status {
            CommissionStatus::Pending | CommissionStatus::Confirmed => {}
            CommissionStatus::Completed | CommissionStatus::Cancelled => return Ok(vec![]),
        }

        let amount = entry.commission_amount;
        Ok(vec![AffiliateEvent::CommissionCompleted {
            account_id,
            commission_id,
            amount,
            balance_after: self.available_balance() + amount,
            occurred_at,
        }])
    }

    fn handle_cancel_commission(
        &self,
        account_id: AffiliateId,
        commission_id: CommissionId,
        occurred_at: DateTime<Utc>,
    ) -> Result<Vec<AffiliateEvent>, DomainError> {
        let entry = self.commission(commission_id)?;

        match entry.status {
            CommissionStatus::Cancelled => Ok(vec![]),
            CommissionStatus::Completed => {
                let amount = entry.commission_amount;
                // The claw-back must not overdraw funds already promised to
                // open withdrawal requests.
                if self.withdrawable_balance() - amount < Decimal::ZERO {
                    return Err(DomainError::invariant(
                        "revoking this commission would overdraw the affiliate balance",
                    ));
                }
                Ok(vec![AffiliateEvent::CommissionRevoked {
                    account_id,
                    commission_id,
                    amount,
                    balance_after: self.available_balance() - amount,
                    occurred_at,
                }])
            }
            CommissionStatus::Pending | CommissionStatus::Confirmed => {
                Ok(vec![AffiliateEvent::CommissionCancelled {
                    account_id,
                    commission_id,
                    occurred_at,
                }])
            }
        }
    }

    fn handle_grant_bonus(
        &self,
        account_id: AffiliateId,
        amount: Decimal,
        description: &str,
        occurred_at: DateTime<Utc>,
    ) -> Result<Vec<AffiliateEvent>, DomainError> {
        if !self.is_active() {
            return Err(DomainError::invariant(
                "bonuses can only be granted to active accounts",
            ));
        }
        if amount <= Decimal::ZERO {
            return Err(DomainError::validation("bonus amount must be positive"));
        }

        Ok(vec![AffiliateEvent::BonusGranted {
            account_id,
            amount,
            description: description.to_string(),
            balance_after: self.available_balance() + amount,
            occurred_at,
        }])
    }

    fn handle_request_withdrawal(
        &self,
        account_id: AffiliateId,
        withdrawal_id: WithdrawalId,
        amount: Decimal,
        method: PayoutMethod,
        min_withdrawal: Decimal,
        occurred_at: DateTime<Utc>,
    ) -> Result<Vec<AffiliateEvent>, DomainError> {
        if !self.is_active() {
            return Err(DomainError::invariant(
                "only active affiliates can request withdrawals",
            ));
        }
        if self.withdrawals.iter().any(|w| w.id == withdrawal_id) {
            return Err(DomainError::conflict("withdrawal request already exists"));
        }
        if amount <= Decimal::ZERO {
            return Err(DomainError::validation("withdrawal amount must be positive"));
        }
        if amount < min_withdrawal {
            return Err(DomainError::validation(format!(
                "minimum withdrawal amount is {min_withdrawal}"
            )));
        }
        // Open requests hold their funds; two concurrent requests cannot
        // both draw on the same balance.
        if amount > self.withdrawable_balance() {
            return Err(DomainError::validation(format!(
                "insufficient balance: {} available for withdrawal",
                self.withdrawable_balance()
            )));
        }

        Ok(vec![AffiliateEvent::WithdrawalRequested {
            account_id,
            withdrawal_id,
            amount,
            method,
            occurred_at,
        }])
    }

    fn handle_approve_withdrawal(
        &self,
        account_id: AffiliateId,
        withdrawal_id: WithdrawalId,
        occurred_at: DateTime<Utc>,
    ) -> Result<Vec<AffiliateEvent>, DomainError> {
        let entry = self.withdrawal(withdrawal_id)?;
        if entry.status != WithdrawalStatus::Pending {
            return Err(DomainError::invariant(
                "only pending withdrawals can be approved",
            ));
        }
        Ok(vec![AffiliateEvent::WithdrawalApproved {
            account_id,
            withdrawal_id,
            occurred_at,
        }])
    }

    fn handle_start_payout(
        &self,
        account_id: AffiliateId,
        withdrawal_id: WithdrawalId,
        occurred_at: DateTime<Utc>,
    ) -> Result<Vec<AffiliateEvent>, DomainError> {
        let entry = self.withdrawal(withdrawal_id)?;
        if entry.status != WithdrawalStatus::Approved {
            return Err(DomainError::invariant(
                "only approved withdrawals can start payout",
            ));
        }
        Ok(vec![AffiliateEvent::WithdrawalProcessing {
            account_id,
            withdrawal_id,
            occurred_at,
        }])
    }

    fn handle_mark_withdrawal_paid(
        &self,
        account_id: AffiliateId,
        withdrawal_id: WithdrawalId,
        occurred_at: DateTime<Utc>,
    ) -> Result<Vec<AffiliateEvent>, DomainError> {
        let entry = self.withdrawal(withdrawal_id)?;
        if !entry.status.holds_funds() {
            return Err(DomainError::invariant(
                "withdrawal has already been settled",
            ));
        }
        if entry.amount > self.available_balance() {
            return Err(DomainError::invariant(
                "insufficient balance to settle withdrawal",
            ));
        }

        Ok(vec![AffiliateEvent::WithdrawalPaid {
            account_id,
            withdrawal_id,
            amount: entry.amount,
            balance_after: self.available_balance() - entry.amount,
            occurred_at,
        }])
    }

    fn handle_reject_withdrawal(
        &self,
        account_id: AffiliateId,
        withdrawal_id: WithdrawalId,
        occurred_at: DateTime<Utc>,
    ) -> Result<Vec<AffiliateEvent>, DomainError> {
        let entry = self.withdrawal(withdrawal_id)?;
        if !entry.status.holds_funds() {
            return Err(DomainError::invariant(
                "withdrawal has already been settled",
            ));
        }
        Ok(vec![AffiliateEvent::WithdrawalRejected {
            account_id,
            withdrawal_id,
            occurred_at,
        }])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bramble_core::money::cents;
    use bramble_events::execute;
    use crate::program::AffiliateProgram;
    use proptest::prelude::*;

    fn test_account_id() -> AffiliateId {
        AffiliateId::new(AggregateId::new())
    }

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn enrolled_account() -> AffiliateAccount {
        let account_id = test_account_id();
        let mut account = AffiliateAccount::empty(account_id);
        execute(
            &mut account,
            &AffiliateCommand::Enroll {
                account_id,
                user_id: UserId::new(),
                code: AffiliateCode::generate(),
                occurred_at: test_time(),
            },
        )
        .unwrap();
        account
    }

    fn active_account() -> AffiliateAccount {
        let mut account = enrolled_account();
        let id = account.id_typed();
        execute(
            &mut account,
            &AffiliateCommand::Approve {
                account_id: id,
                occurred_at: test_time(),
            },
        )
        .unwrap();
        account
    }

    /// Active account with one completed commission worth `minor` cents.
    fn account_with_earnings(minor: i64) -> (AffiliateAccount, CommissionId) {
        let mut account = active_account();
        let id = account.id_typed();
        let commission_id = CommissionId::new(AggregateId::new());
        // Rate of 100% makes the commission equal the order amount.
        execute(
            &mut account,
            &AffiliateCommand::RecordReferral {
                account_id: id,
                commission_id,
                order_id: OrderId::new(AggregateId::new()),
                order_amount: cents(minor),
                commission_rate_percent: Decimal::from(100),
                occurred_at: test_time(),
            },
        )
        .unwrap();
        execute(
            &mut account,
            &AffiliateCommand::CompleteCommission {
                account_id: id,
                commission_id,
                occurred_at: test_time(),
            },
        )
        .unwrap();
        (account, commission_id)
    }

    fn record_referral(
        account: &mut AffiliateAccount,
        order_amount: Decimal,
        rate: Decimal,
    ) -> CommissionId {
        let commission_id = CommissionId::new(AggregateId::new());
        execute(
            account,
            &AffiliateCommand::RecordReferral {
                account_id: account.id_typed(),
                commission_id,
                order_id: OrderId::new(AggregateId::new()),
                order_amount,
                commission_rate_percent: rate,
                occurred_at: test_time(),
            },
        )
        .unwrap();
        commission_id
    }

    fn request_withdrawal(
        account: &mut AffiliateAccount,
        amount: Decimal,
        min: Decimal,
    ) -> Result<WithdrawalId, DomainError> {
        let withdrawal_id = WithdrawalId::new(AggregateId::new());
        execute(
            account,
            &AffiliateCommand::RequestWithdrawal {
                account_id: account.id_typed(),
                withdrawal_id,
                amount,
                method: PayoutMethod::BankTransfer,
                min_withdrawal: min,
                occurred_at: test_time(),
            },
        )?;
        Ok(withdrawal_id)
    }

    #[test]
    fn enrollment_starts_pending_with_a_code() {
        let account = enrolled_account();
        assert_eq!(account.status(), AffiliateStatus::Pending);
        assert!(account.code().is_some());
        assert!(account.joined_at().is_some());
        assert_eq!(account.available_balance(), Decimal::ZERO);
    }

    #[test]
    fn approval_activates_and_timestamps() {
        let account = active_account();
        assert_eq!(account.status(), AffiliateStatus::Active);
        assert!(account.approved_at().is_some());
    }

    #[test]
    fn approve_twice_is_an_error() {
        let mut account = active_account();
        let id = account.id_typed();
        let err = execute(
            &mut account,
            &AffiliateCommand::Approve {
                account_id: id,
                occurred_at: test_time(),
            },
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    #[test]
    fn suspend_and_reactivate_round_trip() {
        let mut account = active_account();
        let id = account.id_typed();

        execute(
            &mut account,
            &AffiliateCommand::Suspend { account_id: id, occurred_at: test_time() },
        )
        .unwrap();
        assert_eq!(account.status(), AffiliateStatus::Suspended);

        execute(
            &mut account,
            &AffiliateCommand::Reactivate { account_id: id, occurred_at: test_time() },
        )
        .unwrap();
        assert_eq!(account.status(), AffiliateStatus::Active);
    }

    #[test]
    fn referral_captures_rate_and_computes_two_percent() {
        let mut account = active_account();
        let commission_id = record_referral(&mut account, cents(1_000_00), Decimal::new(200, 2));

        let entry = account.commission(commission_id).unwrap();
        assert_eq!(entry.commission_amount, cents(20_00));
        assert_eq!(entry.status, CommissionStatus::Pending);
        assert_eq!(account.total_referrals(), 1);
        // Accrual alone credits nothing; the amount only shows as pending.
        assert_eq!(account.total_earnings(), Decimal::ZERO);
        assert_eq!(account.pending_commission(), cents(20_00));
        assert!(account.ledger().is_empty());
    }

    #[test]
    fn pending_accounts_do_not_earn() {
        let mut account = enrolled_account();
        let id = account.id_typed();
        let err = execute(
            &mut account,
            &AffiliateCommand::RecordReferral {
                account_id: id,
                commission_id: CommissionId::new(AggregateId::new()),
                order_id: OrderId::new(AggregateId::new()),
                order_amount: cents(100_00),
                commission_rate_percent: Decimal::from(2),
                occurred_at: test_time(),
            },
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    #[test]
    fn completing_a_commission_credits_exactly_once() {
        let mut account = active_account();
        let commission_id = record_referral(&mut account, cents(1_000_00), Decimal::from(2));
        let id = account.id_typed();

        let complete = AffiliateCommand::CompleteCommission {
            account_id: id,
            commission_id,
            occurred_at: test_time(),
        };

        execute(&mut account, &complete).unwrap();
        assert_eq!(account.total_earnings(), cents(20_00));
        assert_eq!(account.ledger().len(), 1);
        assert_eq!(account.ledger()[0].kind, LedgerEntryKind::Earning);
        assert_eq!(account.ledger()[0].balance_after, cents(20_00));

        // Second completion is a silent no-op: no event, no double credit.
        let events = execute(&mut account, &complete).unwrap();
        assert!(events.is_empty());
        assert_eq!(account.total_earnings(), cents(20_00));
        assert_eq!(account.ledger().len(), 1);
    }

    #[test]
    fn confirm_is_idempotent() {
        let mut account = active_account();
        let commission_id = record_referral(&mut account, cents(500_00), Decimal::from(2));
        let id = account.id_typed();

        let confirm = AffiliateCommand::ConfirmCommission {
            account_id: id,
            commission_id,
            occurred_at: test_time(),
        };

        let events = execute(&mut account, &confirm).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(
            account.commission(commission_id).unwrap().status,
            CommissionStatus::Confirmed
        );

        let events = execute(&mut account, &confirm).unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn cancelling_a_completed_commission_restores_earnings_exactly() {
        let mut account = active_account();
        let commission_id = record_referral(&mut account, cents(999_95), Decimal::new(665, 2));
        let id = account.id_typed();

        let before = account.total_earnings();
        execute(
            &mut account,
            &AffiliateCommand::CompleteCommission {
                account_id: id,
                commission_id,
                occurred_at: test_time(),
            },
        )
        .unwrap();
        assert!(account.total_earnings() > before);

        execute(
            &mut account,
            &AffiliateCommand::CancelCommission {
                account_id: id,
                commission_id,
                occurred_at: test_time(),
            },
        )
        .unwrap();

        assert_eq!(account.total_earnings(), before);
        assert_eq!(account.ledger().len(), 2);
        assert_eq!(account.ledger()[1].kind, LedgerEntryKind::Deduction);
        assert_eq!(account.ledger()[1].balance_after, before);
        assert_eq!(
            account.commission(commission_id).unwrap().status,
            CommissionStatus::Cancelled
        );
    }

    #[test]
    fn cancelling_a_pending_commission_touches_no_earnings() {
        let mut account = active_account();
        let commission_id = record_referral(&mut account, cents(100_00), Decimal::from(2));
        let id = account.id_typed();

        execute(
            &mut account,
            &AffiliateCommand::CancelCommission {
                account_id: id,
                commission_id,
                occurred_at: test_time(),
            },
        )
        .unwrap();

        assert_eq!(account.total_earnings(), Decimal::ZERO);
        assert!(account.ledger().is_empty());
        assert_eq!(
            account.commission(commission_id).unwrap().status,
            CommissionStatus::Cancelled
        );
    }

    #[test]
    fn cancelled_commission_cannot_complete_later() {
        let mut account = active_account();
        let commission_id = record_referral(&mut account, cents(100_00), Decimal::from(2));
        let id = account.id_typed();

        execute(
            &mut account,
            &AffiliateCommand::CancelCommission {
                account_id: id,
                commission_id,
                occurred_at: test_time(),
            },
        )
        .unwrap();

        let events = execute(
            &mut account,
            &AffiliateCommand::CompleteCommission {
                account_id: id,
                commission_id,
                occurred_at: test_time(),
            },
        )
        .unwrap();
        assert!(events.is_empty());
        assert_eq!(account.total_earnings(), Decimal::ZERO);
    }

    #[test]
    fn withdrawal_below_minimum_is_rejected() {
        let (mut account, _) = account_with_earnings(2_000_00);
        let err = request_withdrawal(&mut account, cents(999_99), cents(1_000_00)).unwrap_err();
        assert!(matches!(
            err,
            DomainError::Validation(msg) if msg.contains("minimum withdrawal")
        ));
    }

    #[test]
    fn withdrawal_beyond_balance_is_rejected() {
        let (mut account, _) = account_with_earnings(1_000_00);
        let err = request_withdrawal(&mut account, cents(1_200_00), cents(1_000_00)).unwrap_err();
        assert!(matches!(
            err,
            DomainError::Validation(msg) if msg.contains("insufficient balance")
        ));
    }

    #[test]
    fn withdrawal_of_exactly_the_minimum_at_exact_balance_is_accepted() {
        let (mut account, _) = account_with_earnings(1_000_00);
        let withdrawal_id =
            request_withdrawal(&mut account, cents(1_000_00), cents(1_000_00)).unwrap();
        assert_eq!(
            account.withdrawal(withdrawal_id).unwrap().status,
            WithdrawalStatus::Pending
        );
    }

    #[test]
    fn open_requests_hold_their_funds() {
        let (mut account, _) = account_with_earnings(1_000_00);

        request_withdrawal(&mut account, cents(600_00), cents(100_00)).unwrap();
        // 400.00 left to draw on; a second 600.00 must not pass.
        let err = request_withdrawal(&mut account, cents(600_00), cents(100_00)).unwrap_err();
        assert!(matches!(
            err,
            DomainError::Validation(msg) if msg.contains("insufficient balance")
        ));
        assert_eq!(account.withdrawable_balance(), cents(400_00));
    }

    #[test]
    fn rejecting_a_request_releases_the_hold() {
        let (mut account, _) = account_with_earnings(1_000_00);
        let id = account.id_typed();

        let withdrawal_id =
            request_withdrawal(&mut account, cents(1_000_00), cents(100_00)).unwrap();
        execute(
            &mut account,
            &AffiliateCommand::RejectWithdrawal {
                account_id: id,
                withdrawal_id,
                occurred_at: test_time(),
            },
        )
        .unwrap();

        // The full balance is requestable again; nothing was ever paid.
        assert_eq!(account.total_withdrawn(), Decimal::ZERO);
        request_withdrawal(&mut account, cents(1_000_00), cents(100_00)).unwrap();
    }

    #[test]
    fn mark_paid_settles_once_and_writes_the_ledger() {
        let (mut account, _) = account_with_earnings(1_500_00);
        let id = account.id_typed();

        let withdrawal_id =
            request_withdrawal(&mut account, cents(1_000_00), cents(100_00)).unwrap();

        let paid = AffiliateCommand::MarkWithdrawalPaid {
            account_id: id,
            withdrawal_id,
            occurred_at: test_time(),
        };
        execute(&mut account, &paid).unwrap();

        assert_eq!(account.total_withdrawn(), cents(1_000_00));
        assert_eq!(account.available_balance(), cents(500_00));
        let last = account.ledger().last().unwrap();
        assert_eq!(last.kind, LedgerEntryKind::Withdrawal);
        assert_eq!(last.balance_after, cents(500_00));

        let err = execute(&mut account, &paid).unwrap_err();
        assert!(matches!(
            err,
            DomainError::InvariantViolation(msg) if msg.contains("already been settled")
        ));
        assert_eq!(account.total_withdrawn(), cents(1_000_00));
    }

    #[test]
    fn payout_chain_pending_approved_processing_paid() {
        let (mut account, _) = account_with_earnings(1_000_00);
        let id = account.id_typed();
        let withdrawal_id =
            request_withdrawal(&mut account, cents(1_000_00), cents(100_00)).unwrap();

        execute(
            &mut account,
            &AffiliateCommand::ApproveWithdrawal {
                account_id: id,
                withdrawal_id,
                occurred_at: test_time(),
            },
        )
        .unwrap();
        assert_eq!(
            account.withdrawal(withdrawal_id).unwrap().status,
            WithdrawalStatus::Approved
        );

        execute(
            &mut account,
            &AffiliateCommand::StartPayout {
                account_id: id,
                withdrawal_id,
                occurred_at: test_time(),
            },
        )
        .unwrap();
        assert_eq!(
            account.withdrawal(withdrawal_id).unwrap().status,
            WithdrawalStatus::Processing
        );

        execute(
            &mut account,
            &AffiliateCommand::MarkWithdrawalPaid {
                account_id: id,
                withdrawal_id,
                occurred_at: test_time(),
            },
        )
        .unwrap();
        assert_eq!(
            account.withdrawal(withdrawal_id).unwrap().status,
            WithdrawalStatus::Paid
        );
        assert!(account.withdrawal(withdrawal_id).unwrap().paid_at.is_some());
    }

    #[test]
    fn revoking_funds_held_by_open_requests_is_refused() {
        let (mut account, commission_id) = account_with_earnings(1_000_00);
        let id = account.id_typed();

        request_withdrawal(&mut account, cents(1_000_00), cents(100_00)).unwrap();

        let err = execute(
            &mut account,
            &AffiliateCommand::CancelCommission {
                account_id: id,
                commission_id,
                occurred_at: test_time(),
            },
        )
        .unwrap_err();
        assert!(matches!(
            err,
            DomainError::InvariantViolation(msg) if msg.contains("overdraw")
        ));
        assert_eq!(account.total_earnings(), cents(1_000_00));
    }

    #[test]
    fn bonus_credits_the_ledger() {
        let mut account = active_account();
        let id = account.id_typed();
        execute(
            &mut account,
            &AffiliateCommand::GrantBonus {
                account_id: id,
                amount: cents(250_00),
                description: "festival promotion".to_string(),
                occurred_at: test_time(),
            },
        )
        .unwrap();

        assert_eq!(account.total_earnings(), cents(250_00));
        assert_eq!(account.ledger()[0].kind, LedgerEntryKind::Bonus);
        assert_eq!(account.ledger()[0].balance_after, cents(250_00));
    }

    #[test]
    fn program_rate_changes_never_rewrite_existing_entries() {
        let mut account = active_account();
        let program = AffiliateProgram::default();
        let commission_id = record_referral(
            &mut account,
            cents(1_000_00),
            program.commission_rate_percent,
        );

        // Somebody doubles the program rate afterwards; the entry keeps 2%.
        let later_program = AffiliateProgram {
            commission_rate_percent: Decimal::from(4),
            ..program
        };
        let _ = later_program;

        let entry = account.commission(commission_id).unwrap();
        assert_eq!(entry.commission_rate_percent, Decimal::new(200, 2));
        assert_eq!(entry.commission_amount, cents(20_00));
    }

    #[test]
    fn handle_does_not_mutate_state() {
        let (account, commission_id) = account_with_earnings(500_00);
        let before = account.clone();

        let _ = account.handle(&AffiliateCommand::CancelCommission {
            account_id: account.id_typed(),
            commission_id,
            occurred_at: test_time(),
        });

        assert_eq!(account, before);
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: under any interleaving of completions, cancellations,
        /// withdrawal requests and settlements, the balance equation holds,
        /// the balance never goes negative, and every ledger row snapshots
        /// the balance it left behind.
        #[test]
        fn balance_invariants_hold_under_random_operations(
            ops in prop::collection::vec((0u8..6u8, 1i64..2_000_00i64), 1..40)
        ) {
            let mut account = active_account();
            let id = account.id_typed();
            let mut commissions: Vec<CommissionId> = Vec::new();
            let mut withdrawals: Vec<WithdrawalId> = Vec::new();

            for (op, minor) in ops {
                let amount = cents(minor);
                match op {
                    0 => {
                        let commission_id = CommissionId::new(AggregateId::new());
                        let _ = execute(&mut account, &AffiliateCommand::RecordReferral {
                            account_id: id,
                            commission_id,
                            order_id: OrderId::new(AggregateId::new()),
                            order_amount: amount,
                            commission_rate_percent: Decimal::from(2),
                            occurred_at: test_time(),
                        });
                        commissions.push(commission_id);
                    }
                    1 => {
                        if let Some(commission_id) = commissions.last().copied() {
                            let _ = execute(&mut account, &AffiliateCommand::CompleteCommission {
                                account_id: id,
                                commission_id,
                                occurred_at: test_time(),
                            });
                        }
                    }
                    2 => {
                        if let Some(commission_id) = commissions.first().copied() {
                            let _ = execute(&mut account, &AffiliateCommand::CancelCommission {
                                account_id: id,
                                commission_id,
                                occurred_at: test_time(),
                            });
                        }
                    }
                    3 => {
                        let withdrawal_id = WithdrawalId::new(AggregateId::new());
                        if execute(&mut account, &AffiliateCommand::RequestWithdrawal {
                            account_id: id,
                            withdrawal_id,
                            amount,
                            method: PayoutMethod::Upi,
                            min_withdrawal: cents(1_00),
                            occurred_at: test_time(),
                        }).is_ok() {
                            withdrawals.push(withdrawal_id);
                        }
                    }
                    4 => {
                        if let Some(withdrawal_id) = withdrawals.last().copied() {
                            let _ = execute(&mut account, &AffiliateCommand::MarkWithdrawalPaid {
                                account_id: id,
                                withdrawal_id,
                                occurred_at: test_time(),
                            });
                        }
                    }
                    _ => {
                        if let Some(withdrawal_id) = withdrawals.first().copied() {
                            let _ = execute(&mut account, &AffiliateCommand::RejectWithdrawal {
                                account_id: id,
                                withdrawal_id,
                                occurred_at: test_time(),
                            });
                        }
                    }
                }

                prop_assert_eq!(
                    account.available_balance(),
                    account.total_earnings() - account.total_withdrawn()
                );
                prop_assert!(!account.available_balance().is_sign_negative());
                prop_assert!(!account.withdrawable_balance().is_sign_negative());
                if let Some(last) = account.ledger().last() {
                    prop_assert_eq!(last.balance_after, account.available_balance());
                }
            }
        }
    }
}
