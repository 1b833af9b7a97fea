//! Read-model projections fed from the event bus.
//!
//! Projections are disposable: they can be rebuilt from the event history
//! at any time, and they guard on per-aggregate sequence numbers so
//! at-least-once delivery cannot double-count.

pub mod affiliate_summary;
