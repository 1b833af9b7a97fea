//! `bramble-infra` — application layer: in-memory stores, the storefront
//! service, notification dispatch, and read-model projections.

pub mod checkout;
pub mod notify;
pub mod projections;
pub mod store;


pub use checkout::{CheckoutRequest, Storefront, StorefrontConfig};
pub use notify::{LoggingNotifier, Notification, Notifier, NotifyError};
pub use store::{InMemoryStore, KeyStore};
