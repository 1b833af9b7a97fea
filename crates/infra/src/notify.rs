//! Notification boundary.
//!
//! The storefront never sends email itself; it hands a `Notification` to
//! whatever `Notifier` the deployment wires in (SMTP, push, a test
//! recorder). Delivery is fire-and-forget: failures are logged and
//! swallowed, and they never roll back the operation that produced them.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("notification delivery failed: {0}")]
pub struct NotifyError(pub String);

/// User-facing messages emitted by storefront operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Notification {
    OrderPlaced {
        order_number: String,
        email: String,
        total: Decimal,
    },
    OrderShipped {
        order_number: String,
        email: String,
    },
    OrderDelivered {
        order_number: String,
        email: String,
    },
    OrderCancelled {
        order_number: String,
        email: String,
    },
    AffiliateApplicationReceived {
        affiliate_code: String,
    },
    AffiliateApproved {
        affiliate_code: String,
    },
    AffiliateRejected {
        affiliate_code: String,
    },
    AffiliateSuspended {
        affiliate_code: String,
    },
    WithdrawalApproved {
        affiliate_code: String,
        amount: Decimal,
    },
    WithdrawalPaid {
        affiliate_code: String,
        amount: Decimal,
    },
    WithdrawalRejected {
        affiliate_code: String,
        amount: Decimal,
    },
}

/// Notification collaborator boundary.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: &Notification) -> Result<(), NotifyError>;
}

impl<T> Notifier for std::sync::Arc<T>
where
    T: Notifier + ?Sized,
{
    fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        (**self).notify(notification)
    }
}

/// Stand-in delivery channel: logs every notification at info level.
#[derive(Debug, Default)]
pub struct LoggingNotifier;

impl Notifier for LoggingNotifier {
    fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        tracing::info!(?notification, "notification dispatched");
        Ok(())
    }
}
