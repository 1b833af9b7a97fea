//! Order lifecycle: immutable checkout snapshots and the status state machine.

pub mod order;
pub mod payment;

pub use order::{
    Cancel, ConfirmPayment, Deliver, FailPayment, Order, OrderCommand, OrderEvent, OrderId,
    OrderItem, OrderNumber, OrderStatus, PaymentStatus, PlaceOrder, Refund, Ship,
    ShippingAddress,
};
pub use payment::{PaymentId, PaymentMethod, PaymentRecord, PaymentRecordStatus};
