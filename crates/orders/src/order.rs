use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use bramble_core::{Aggregate, AggregateId, AggregateRoot, DomainError, UserId, ValueObject};
use bramble_events::Event;
use bramble_pricing::{OrderTotals, ProductId};

use crate::payment::PaymentMethod;

/// Order identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(pub AggregateId);

impl OrderId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for OrderId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Human-readable order number, generated once at creation and never
/// reassigned.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderNumber(String);

impl OrderNumber {
    /// Derive the order number from the order id (the random tail of the
    /// UUID keeps numbers short without a shared counter).
    pub fn derive_from(id: OrderId) -> Self {
        let hex = id.0.as_uuid().simple().to_string();
        let tail = &hex[hex.len() - 10..];
        Self(format!("SO-{}", tail.to_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Order status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
    Refunded,
}

impl OrderStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            OrderStatus::Delivered | OrderStatus::Cancelled | OrderStatus::Refunded
        )
    }
}

/// Payment status, tracked alongside the order status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
    Refunded,
}

/// Shipping destination, copied onto the order at checkout.
///
/// A snapshot, not a reference: editing a saved address later must never
/// rewrite the history of where past orders went.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub email: String,
    pub address_line1: String,
    pub address_line2: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
}

impl ShippingAddress {
    pub fn validate(&self) -> Result<(), DomainError> {
        let required = [
            ("first_name", &self.first_name),
            ("last_name", &self.last_name),
            ("phone", &self.phone),
            ("email", &self.email),
            ("address_line1", &self.address_line1),
            ("city", &self.city),
            ("state", &self.state),
            ("postal_code", &self.postal_code),
            ("country", &self.country),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(DomainError::validation(format!(
                    "shipping address is missing {field}"
                )));
            }
        }
        if !self.email.contains('@') {
            return Err(DomainError::validation("shipping email is malformed"));
        }
        Ok(())
    }
}

impl ValueObject for ShippingAddress {}

/// One product line snapshotted at order time.
///
/// Decoupled from the live product so later price changes don't rewrite
/// past orders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub line_no: u32,
    pub product_id: ProductId,
    pub name: String,
    pub sku: String,
    /// Unit price at order time, two decimal places.
    pub unit_price: Decimal,
    pub quantity: u32,
}

impl OrderItem {
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// Aggregate root: Order.
///
/// The monetary fields and item snapshot are fixed by `OrderPlaced` and
/// never recomputed; only status, payment status and timestamps evolve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    id: OrderId,
    number: Option<OrderNumber>,
    user_id: Option<UserId>,
    status: OrderStatus,
    payment_status: PaymentStatus,
    items: Vec<OrderItem>,
    totals: Option<OrderTotals>,
    shipping: Option<ShippingAddress>,
    payment_method: Option<PaymentMethod>,
    affiliate_code: Option<String>,
    shipped_at: Option<DateTime<Utc>>,
    delivered_at: Option<DateTime<Utc>>,
    version: u64,
    created: bool,
}

impl Order {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: OrderId) -> Self {
        Self {
            id,
            number: None,
            user_id: None,
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
            items: Vec::new(),
            totals: None,
            shipping: None,
            payment_method: None,
            affiliate_code: None,
            shipped_at: None,
            delivered_at: None,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> OrderId {
        self.id
    }

    pub fn number(&self) -> Option<&OrderNumber> {
        self.number.as_ref()
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.user_id
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn payment_status(&self) -> PaymentStatus {
        self.payment_status
    }

    pub fn items(&self) -> &[OrderItem] {
        &self.items
    }

    pub fn totals(&self) -> Option<&OrderTotals> {
        self.totals.as_ref()
    }

    pub fn shipping(&self) -> Option<&ShippingAddress> {
        self.shipping.as_ref()
    }

    pub fn payment_method(&self) -> Option<PaymentMethod> {
        self.payment_method
    }

    pub fn affiliate_code(&self) -> Option<&str> {
        self.affiliate_code.as_deref()
    }

    pub fn shipped_at(&self) -> Option<DateTime<Utc>> {
        self.shipped_at
    }

    pub fn delivered_at(&self) -> Option<DateTime<Utc>> {
        self.delivered_at
    }

    pub fn is_cancellable(&self) -> bool {
        !self.status.is_terminal()
    }
}

impl AggregateRoot for Order {
    type Id = OrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: PlaceOrder (checkout snapshot).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceOrder {
    pub order_id: OrderId,
    pub order_number: OrderNumber,
    pub user_id: UserId,
    pub items: Vec<OrderItem>,
    pub totals: OrderTotals,
    pub shipping: ShippingAddress,
    pub payment_method: PaymentMethod,
    pub affiliate_code: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ConfirmPayment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmPayment {
    pub order_id: OrderId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: FailPayment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailPayment {
    pub order_id: OrderId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: Ship.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ship {
    pub order_id: OrderId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: Deliver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deliver {
    pub order_id: OrderId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: Cancel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cancel {
    pub order_id: OrderId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: Refund.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Refund {
    pub order_id: OrderId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderCommand {
    PlaceOrder(PlaceOrder),
    ConfirmPayment(ConfirmPayment),
    FailPayment(FailPayment),
    Ship(Ship),
    Deliver(Deliver),
    Cancel(Cancel),
    Refund(Refund),
}

/// Event: OrderPlaced (the immutable snapshot).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPlaced {
    pub order_id: OrderId,
    pub order_number: OrderNumber,
    pub user_id: UserId,
    pub items: Vec<OrderItem>,
    pub totals: OrderTotals,
    pub shipping: ShippingAddress,
    pub payment_method: PaymentMethod,
    pub affiliate_code: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderEvent {
    OrderPlaced(OrderPlaced),
    PaymentConfirmed { order_id: OrderId, occurred_at: DateTime<Utc> },
    PaymentFailed { order_id: OrderId, occurred_at: DateTime<Utc> },
    OrderShipped { order_id: OrderId, occurred_at: DateTime<Utc> },
    OrderDelivered { order_id: OrderId, occurred_at: DateTime<Utc> },
    OrderCancelled { order_id: OrderId, occurred_at: DateTime<Utc> },
    OrderRefunded { order_id: OrderId, occurred_at: DateTime<Utc> },
}

impl Event for OrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            OrderEvent::OrderPlaced(_) => "orders.order.placed",
            OrderEvent::PaymentConfirmed { .. } => "orders.order.payment_confirmed",
            OrderEvent::PaymentFailed { .. } => "orders.order.payment_failed",
            OrderEvent::OrderShipped { .. } => "orders.order.shipped",
            OrderEvent::OrderDelivered { .. } => "orders.order.delivered",
            OrderEvent::OrderCancelled { .. } => "orders.order.cancelled",
            OrderEvent::OrderRefunded { .. } => "orders.order.refunded",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            OrderEvent::OrderPlaced(e) => e.occurred_at,
            OrderEvent::PaymentConfirmed { occurred_at, .. }
            | OrderEvent::PaymentFailed { occurred_at, .. }
            | OrderEvent::OrderShipped { occurred_at, .. }
            | OrderEvent::OrderDelivered { occurred_at, .. }
            | OrderEvent::OrderCancelled { occurred_at, .. }
            | OrderEvent::OrderRefunded { occurred_at, .. } => *occurred_at,
        }
    }
}

impl Aggregate for Order {
    type Command = OrderCommand;
    type Event = OrderEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            OrderEvent::OrderPlaced(e) => {
                self.id = e.order_id;
                self.number = Some(e.order_number.clone());
                self.user_id = Some(e.user_id);
                self.status = OrderStatus::Pending;
                self.payment_status = PaymentStatus::Pending;
                self.items = e.items.clone();
                self.totals = Some(e.totals);
                self.shipping = Some(e.shipping.clone());
                self.payment_method = Some(e.payment_method);
                self.affiliate_code = e.affiliate_code.clone();
                self.created = true;
            }
            OrderEvent::PaymentConfirmed { .. } => {
                self.status = OrderStatus::Processing;
                self.payment_status = PaymentStatus::Paid;
            }
            OrderEvent::PaymentFailed { .. } => {
                self.payment_status = PaymentStatus::Failed;
            }
            OrderEvent::OrderShipped { occurred_at, .. } => {
                self.status = OrderStatus::Shipped;
                self.shipped_at = Some(*occurred_at);
            }
            OrderEvent::OrderDelivered { occurred_at, .. } => {
                self.status = OrderStatus::Delivered;
                self.delivered_at = Some(*occurred_at);
            }
            OrderEvent::OrderCancelled { .. } => {
                self.status = OrderStatus::Cancelled;
            }
            OrderEvent::OrderRefunded { .. } => {
                self.status = OrderStatus::Refunded;
                self.payment_status = PaymentStatus::Refunded;
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            OrderCommand::PlaceOrder(cmd) => self.handle_place(cmd),
            OrderCommand::ConfirmPayment(cmd) => self.handle_confirm_payment(cmd),
            OrderCommand::FailPayment(cmd) => self.handle_fail_payment(cmd),
            OrderCommand::Ship(cmd) => self.handle_ship(cmd),
            OrderCommand::Deliver(cmd) => self.handle_deliver(cmd),
            OrderCommand::Cancel(cmd) => self.handle_cancel(cmd),
            OrderCommand::Refund(cmd) => self.handle_refund(cmd),
        }
    }
}

impl Order {
    fn ensure_created(&self) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        Ok(())
    }

    fn ensure_order_id(&self, order_id: OrderId) -> Result<(), DomainError> {
        if self.id != order_id {
            return Err(DomainError::invariant("order_id mismatch"));
        }
        Ok(())
    }

    fn handle_place(&self, cmd: &PlaceOrder) -> Result<Vec<OrderEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("order already exists"));
        }

        if cmd.items.is_empty() {
            return Err(DomainError::validation("cannot place an order without items"));
        }

        let mut items_total = Decimal::ZERO;
        for item in &cmd.items {
            if item.quantity == 0 {
                return Err(DomainError::validation("item quantity must be positive"));
            }
            if item.unit_price <= Decimal::ZERO {
                return Err(DomainError::validation("item unit_price must be positive"));
            }
            items_total += item.line_total();
        }

        if items_total != cmd.totals.subtotal {
            return Err(DomainError::invariant(
                "order items do not sum to the subtotal",
            ));
        }

        if !cmd.totals.balances() {
            return Err(DomainError::invariant("order totals do not balance"));
        }

        cmd.shipping.validate()?;

        Ok(vec![OrderEvent::OrderPlaced(OrderPlaced {
            order_id: cmd.order_id,
            order_number: cmd.order_number.clone(),
            user_id: cmd.user_id,
            items: cmd.items.clone(),
            totals: cmd.totals,
            shipping: cmd.shipping.clone(),
            payment_method: cmd.payment_method,
            affiliate_code: cmd.affiliate_code.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_confirm_payment(
        &self,
        cmd: &ConfirmPayment,
    ) -> Result<Vec<OrderEvent>, DomainError> {
        self.ensure_created()?;
        self.ensure_order_id(cmd.order_id)?;

        if self.status != OrderStatus::Pending {
            return Err(DomainError::invariant(
                "only pending orders can confirm payment",
            ));
        }

        Ok(vec![OrderEvent::PaymentConfirmed {
            order_id: cmd.order_id,
            occurred_at: cmd.occurred_at,
        }])
    }

    fn handle_fail_payment(&self, cmd: &FailPayment) -> Result<Vec<OrderEvent>, DomainError> {
        self.ensure_created()?;
        self.ensure_order_id(cmd.order_id)?;

        if self.status != OrderStatus::Pending {
            return Err(DomainError::invariant(
                "payment can only fail while the order is pending",
            ));
        }

        Ok(vec![OrderEvent::PaymentFailed {
            order_id: cmd.order_id,
            occurred_at: cmd.occurred_at,
        }])
    }

    fn handle_ship(&self, cmd: &Ship) -> Result<Vec<OrderEvent>, DomainError> {
        self.ensure_created()?;
        self.ensure_order_id(cmd.order_id)?;

        if self.status != OrderStatus::Processing {
            return Err(DomainError::invariant("only processing orders can ship"));
        }

        Ok(vec![OrderEvent::OrderShipped {
            order_id: cmd.order_id,
            occurred_at: cmd.occurred_at,
        }])
    }

    fn handle_deliver(&self, cmd: &Deliver) -> Result<Vec<OrderEvent>, DomainError> {
        self.ensure_created()?;
        self.ensure_order_id(cmd.order_id)?;

        if self.status != OrderStatus::Shipped {
            return Err(DomainError::invariant("only shipped orders can deliver"));
        }

        Ok(vec![OrderEvent::OrderDelivered {
            order_id: cmd.order_id,
            occurred_at: cmd.occurred_at,
        }])
    }

    fn handle_cancel(&self, cmd: &Cancel) -> Result<Vec<OrderEvent>, DomainError> {
        self.ensure_created()?;
        self.ensure_order_id(cmd.order_id)?;

        if self.status.is_terminal() {
            return Err(DomainError::invariant(
                "cannot cancel a delivered, refunded, or already cancelled order",
            ));
        }

        Ok(vec![OrderEvent::OrderCancelled {
            order_id: cmd.order_id,
            occurred_at: cmd.occurred_at,
        }])
    }

    fn handle_refund(&self, cmd: &Refund) -> Result<Vec<OrderEvent>, DomainError> {
        self.ensure_created()?;
        self.ensure_order_id(cmd.order_id)?;

        if self.status != OrderStatus::Delivered {
            return Err(DomainError::invariant(
                "only delivered orders can be refunded",
            ));
        }

        Ok(vec![OrderEvent::OrderRefunded {
            order_id: cmd.order_id,
            occurred_at: cmd.occurred_at,
        }])
    }
}
