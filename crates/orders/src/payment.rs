use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use bramble_core::{AggregateId, Entity};

use crate::order::OrderId;

/// Payment record identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaymentId(pub AggregateId);

impl PaymentId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

/// How the customer pays. Gateway integration lives outside this crate;
/// the ledger only records the chosen method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Card,
    Upi,
    NetBanking,
    CashOnDelivery,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentRecordStatus {
    Initiated,
    Success,
    Failed,
    Refunded,
}

/// One payment attempt against an order.
///
/// Created atomically with the order at checkout; settled later by the
/// payment collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub id: PaymentId,
    pub order_id: OrderId,
    pub method: PaymentMethod,
    pub status: PaymentRecordStatus,
    pub amount: Decimal,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl PaymentRecord {
    pub fn initiated(
        id: PaymentId,
        order_id: OrderId,
        method: PaymentMethod,
        amount: Decimal,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            order_id,
            method,
            status: PaymentRecordStatus::Initiated,
            amount,
            created_at,
            completed_at: None,
        }
    }
}

impl Entity for PaymentRecord {
    type Id = PaymentId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
