use chrono::{DateTime, Utc};

/// A domain event: an immutable fact about something that happened.
///
/// Events carry a stable type name (for routing and storage), a schema
/// version (for evolution), and the business time at which they occurred.
/// Once emitted they are append-only; nothing rewrites history.
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Stable event name/type identifier (e.g. "orders.order.placed").
    fn event_type(&self) -> &'static str;

    /// Schema version for this event type.
    fn version(&self) -> u32;

    /// When the event occurred (business time).
    fn occurred_at(&self) -> DateTime<Utc>;
}
