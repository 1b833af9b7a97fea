//! Storefront application service.
//!
//! Orchestrates the stores, the event bus, and the notification boundary:
//!
//! ```text
//! request
//!   ↓
//! 1. Validate (cart → address → coupon), compute totals
//!   ↓
//! 2. Decide events on the aggregates (pure, nothing persisted yet)
//!   ↓
//! 3. Commit to the stores (all fallible work already done)
//!   ↓
//! 4. Publish envelopes to the bus, dispatch notifications (best effort)
//! ```
//!
//! Checkout is all-or-nothing: every fallible step runs before the first
//! store mutation, so a rejected coupon or bad address leaves the cart and
//! every table untouched. Affiliate balance changes run inside the account
//! store's write lock, which serializes concurrent commission and
//! withdrawal activity per affiliate.

use bramble_core::AggregateRoot;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::Value as JsonValue;
use uuid::Uuid;

use bramble_affiliate::{
    AffiliateAccount, AffiliateCode, AffiliateCommand, AffiliateId, AffiliateProgram,
    CommissionId, PayoutMethod, WithdrawalId,
};
use bramble_core::{AggregateId, DomainError, DomainResult, UserId};
use bramble_events::{Event, EventBus, EventEnvelope, execute};
use bramble_orders::{
    Cancel, ConfirmPayment, Deliver, FailPayment, Order, OrderCommand, OrderId, OrderItem,
    OrderNumber, PaymentId, PaymentMethod, PaymentRecord, PaymentRecordStatus, PlaceOrder,
    Refund, Ship, ShippingAddress,
};
use bramble_pricing::{
    Cart, CartId, CartOwner, Coupon, PricingConfig, ProductId, compute_totals,
};

use crate::notify::{Notification, Notifier};
use crate::store::InMemoryStore;

const ORDER_AGGREGATE: &str = "orders.order";
const AFFILIATE_AGGREGATE: &str = "affiliate.account";

/// Immutable storefront configuration.
#[derive(Debug, Clone, Default)]
pub struct StorefrontConfig {
    pub pricing: PricingConfig,
    pub program: AffiliateProgram,
}

/// Checkout input: everything the ledger needs to freeze an order.
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub user_id: UserId,
    pub shipping: ShippingAddress,
    pub payment_method: PaymentMethod,
    pub coupon_code: Option<String>,
    pub affiliate_code: Option<String>,
}

/// The storefront ledger engine.
///
/// Generic over the notification collaborator and the event bus so tests
/// can wire in recorders and deployments can swap transports.
#[derive(Debug)]
pub struct Storefront<N, B> {
    pricing: PricingConfig,
    program: AffiliateProgram,
    carts: InMemoryStore<CartOwner, Cart>,
    coupons: InMemoryStore<String, Coupon>,
    orders: InMemoryStore<OrderId, Order>,
    /// One payment record per order, created at checkout.
    payments: InMemoryStore<OrderId, PaymentRecord>,
    accounts: InMemoryStore<AffiliateId, AffiliateAccount>,
    codes: InMemoryStore<String, AffiliateId>,
    /// Order → (account, commission) attribution recorded at checkout.
    commission_links: InMemoryStore<OrderId, (AffiliateId, CommissionId)>,
    notifier: N,
    bus: B,
}

impl<N, B> Storefront<N, B>
where
    N: Notifier,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    pub fn new(config: StorefrontConfig, notifier: N, bus: B) -> Self {
        Self {
            pricing: config.pricing,
            program: config.program,
            carts: InMemoryStore::new(),
            coupons: InMemoryStore::new(),
            orders: InMemoryStore::new(),
            payments: InMemoryStore::new(),
            accounts: InMemoryStore::new(),
            codes: InMemoryStore::new(),
            commission_links: InMemoryStore::new(),
            notifier,
            bus,
        }
    }

    pub fn program(&self) -> &AffiliateProgram {
        &self.program
    }

    pub fn pricing(&self) -> &PricingConfig {
        &self.pricing
    }

    // ------------------------------------------------------------------
    // Carts
    // ------------------------------------------------------------------

    /// Fetch the user's cart, creating an empty one on first access.
    pub fn cart_for_user(&self, user_id: UserId) -> Cart {
        self.cart_for_owner(CartOwner::User(user_id))
    }

    /// Fetch an anonymous session's cart, creating it on first access.
    pub fn cart_for_session(&self, session_key: impl Into<String>) -> Cart {
        self.cart_for_owner(CartOwner::Session(session_key.into()))
    }

    fn cart_for_owner(&self, owner: CartOwner) -> Cart {
        let make_owner = owner.clone();
        self.carts
            .get_or_insert_with(owner, || Cart::new(CartId::new(AggregateId::new()), make_owner))
    }

    pub fn cart(&self, owner: &CartOwner) -> Option<Cart> {
        self.carts.get(owner)
    }

    pub fn add_to_cart(
        &self,
        owner: CartOwner,
        product_id: ProductId,
        name: impl Into<String>,
        sku: impl Into<String>,
        unit_price: Decimal,
        quantity: u32,
    ) -> DomainResult<Cart> {
        self.cart_for_owner(owner.clone());
        let name = name.into();
        let sku = sku.into();
        self.carts
            .update(&owner, |cart| {
                cart.add_line(product_id, name, sku, unit_price, quantity)?;
                Ok(cart.clone())
            })
            .unwrap_or_else(|| Err(DomainError::not_found()))
    }

    pub fn update_cart_quantity(
        &self,
        owner: &CartOwner,
        product_id: ProductId,
        quantity: u32,
    ) -> DomainResult<Cart> {
        self.carts
            .update(owner, |cart| {
                cart.update_quantity(product_id, quantity)?;
                Ok(cart.clone())
            })
            .unwrap_or_else(|| Err(DomainError::not_found()))
    }

    pub fn remove_from_cart(&self, owner: &CartOwner, product_id: ProductId) {
        self.carts.update(owner, |cart| cart.remove_line(product_id));
    }

    pub fn clear_cart(&self, owner: &CartOwner) {
        self.carts.update(owner, Cart::clear);
    }

    // ------------------------------------------------------------------
    // Coupons
    // ------------------------------------------------------------------

    pub fn register_coupon(&self, coupon: Coupon) {
        self.coupons.upsert(coupon.code.clone(), coupon);
    }

    pub fn coupon(&self, code: &str) -> Option<Coupon> {
        self.coupons.get(&code.to_string())
    }

    // ------------------------------------------------------------------
    // Checkout
    // ------------------------------------------------------------------

    /// Freeze the user's cart into an order.
    ///
    /// Validation order is fixed: empty cart, then shipping address, then
    /// coupon. Any rejection happens before the first store mutation, so a
    /// failed checkout persists nothing and the cart stays intact for
    /// retry. An unrecognized or inactive affiliate code never blocks the
    /// order; it is skipped with a warning.
    pub fn create_order(&self, request: CheckoutRequest) -> DomainResult<Order> {
        let now = Utc::now();
        let owner = CartOwner::User(request.user_id);

        let cart = self
            .carts
            .get(&owner)
            .filter(|cart| !cart.is_empty())
            .ok_or_else(|| DomainError::validation("cart is empty"))?;

        request.shipping.validate()?;

        let coupon = match request.coupon_code.as_deref() {
            Some(code) => Some(self.coupons.get(&code.to_string()).ok_or_else(|| {
                DomainError::validation(format!("unknown coupon code '{code}'"))
            })?),
            None => None,
        };

        let totals = compute_totals(&cart, &self.pricing, coupon.as_ref(), now)?;

        let items: Vec<OrderItem> = cart
            .lines()
            .iter()
            .enumerate()
            .map(|(i, line)| OrderItem {
                line_no: i as u32 + 1,
                product_id: line.product_id,
                name: line.name.clone(),
                sku: line.sku.clone(),
                unit_price: line.unit_price,
                quantity: line.quantity,
            })
            .collect();

        let order_id = OrderId::new(AggregateId::new());
        let place = PlaceOrder {
            order_id,
            order_number: OrderNumber::derive_from(order_id),
            user_id: request.user_id,
            items,
            totals,
            shipping: request.shipping.clone(),
            payment_method: request.payment_method,
            affiliate_code: request.affiliate_code.clone(),
            occurred_at: now,
        };

        let mut order = Order::empty(order_id);
        let order_events = execute(&mut order, &OrderCommand::PlaceOrder(place))?;

        // Every fallible step has passed; commit.
        if let Some(code) = request.affiliate_code.as_deref() {
            self.track_referral(code, order_id, totals.total, now);
        }

        self.orders.upsert(order_id, order.clone());
        self.publish(order_id.0, ORDER_AGGREGATE, order.version(), &order_events);

        self.payments.upsert(
            order_id,
            PaymentRecord::initiated(
                PaymentId::new(AggregateId::new()),
                order_id,
                request.payment_method,
                totals.total,
                now,
            ),
        );

        if let Some(code) = request.coupon_code.as_deref() {
            self.coupons.update(&code.to_string(), Coupon::record_use);
        }

        self.carts.update(&owner, Cart::clear);

        tracing::info!(order = %order_id, total = %totals.total, "order created");
        self.dispatch(Notification::OrderPlaced {
            order_number: order_number_of(&order),
            email: request.shipping.email.clone(),
            total: totals.total,
        });

        Ok(order)
    }

    /// Attribute an order to the affiliate behind `code`, if there is one.
    ///
    /// Missing or rejected attributions are logged, never propagated: the
    /// customer's order does not depend on referral bookkeeping.
    fn track_referral(
        &self,
        code: &str,
        order_id: OrderId,
        order_amount: Decimal,
        now: DateTime<Utc>,
    ) {
        if !self.program.is_active {
            tracing::debug!(%code, "affiliate program inactive; skipping attribution");
            return;
        }

        let Some(account_id) = self.codes.get(&code.to_string()) else {
            tracing::warn!(%code, "unrecognized affiliate code; order proceeds unattributed");
            return;
        };

        let commission_id = CommissionId::new(AggregateId::new());
        let command = AffiliateCommand::RecordReferral {
            account_id,
            commission_id,
            order_id,
            order_amount,
            commission_rate_percent: self.program.commission_rate_percent,
            occurred_at: now,
        };

        match self.run_account_command(account_id, command) {
            Ok(_) => {
                self.commission_links
                    .upsert(order_id, (account_id, commission_id));
            }
            Err(err) => {
                tracing::warn!(%code, %err, "affiliate attribution skipped");
            }
        }
    }

    // ------------------------------------------------------------------
    // Order transitions
    // ------------------------------------------------------------------

    pub fn confirm_payment(&self, order_id: OrderId) -> DomainResult<Order> {
        let order = self.run_order_command(
            order_id,
            OrderCommand::ConfirmPayment(ConfirmPayment {
                order_id,
                occurred_at: Utc::now(),
            }),
        )?;
        self.settle_payment(order_id, PaymentRecordStatus::Success);
        Ok(order)
    }

    pub fn fail_payment(&self, order_id: OrderId) -> DomainResult<Order> {
        let order = self.run_order_command(
            order_id,
            OrderCommand::FailPayment(FailPayment {
                order_id,
                occurred_at: Utc::now(),
            }),
        )?;
        self.settle_payment(order_id, PaymentRecordStatus::Failed);
        Ok(order)
    }

    pub fn ship_order(&self, order_id: OrderId) -> DomainResult<Order> {
        let order = self.run_order_command(
            order_id,
            OrderCommand::Ship(Ship {
                order_id,
                occurred_at: Utc::now(),
            }),
        )?;
        self.notify_order(&order, |number, email| Notification::OrderShipped {
            order_number: number,
            email,
        });
        Ok(order)
    }

    /// Deliver the order; a linked affiliate commission completes in the
    /// same request (the exactly-once earning credit).
    pub fn deliver_order(&self, order_id: OrderId) -> DomainResult<Order> {
        let order = self.run_order_command(
            order_id,
            OrderCommand::Deliver(Deliver {
                order_id,
                occurred_at: Utc::now(),
            }),
        )?;

        if let Some((account_id, commission_id)) = self.commission_links.get(&order_id) {
            let command = AffiliateCommand::CompleteCommission {
                account_id,
                commission_id,
                occurred_at: Utc::now(),
            };
            if let Err(err) = self.run_account_command(account_id, command) {
                tracing::warn!(%order_id, %err, "linked commission did not complete");
            }
        }

        self.notify_order(&order, |number, email| Notification::OrderDelivered {
            order_number: number,
            email,
        });
        Ok(order)
    }

    /// Cancel the order; a linked commission is cancelled with it, clawing
    /// back the earning when it had already completed.
    pub fn cancel_order(&self, order_id: OrderId) -> DomainResult<Order> {
        let order = self.run_order_command(
            order_id,
            OrderCommand::Cancel(Cancel {
                order_id,
                occurred_at: Utc::now(),
            }),
        )?;

        if let Some((account_id, commission_id)) = self.commission_links.get(&order_id) {
            let command = AffiliateCommand::CancelCommission {
                account_id,
                commission_id,
                occurred_at: Utc::now(),
            };
            // A refused claw-back (funds already held for payout) is left
            // for manual resolution; the customer's cancellation stands.
            if let Err(err) = self.run_account_command(account_id, command) {
                tracing::warn!(%order_id, %err, "linked commission was not cancelled");
            }
        }

        self.notify_order(&order, |number, email| Notification::OrderCancelled {
            order_number: number,
            email,
        });
        Ok(order)
    }

    pub fn refund_order(&self, order_id: OrderId) -> DomainResult<Order> {
        let order = self.run_order_command(
            order_id,
            OrderCommand::Refund(Refund {
                order_id,
                occurred_at: Utc::now(),
            }),
        )?;
        self.settle_payment(order_id, PaymentRecordStatus::Refunded);
        Ok(order)
    }

    pub fn order(&self, order_id: OrderId) -> Option<Order> {
        self.orders.get(&order_id)
    }

    pub fn orders(&self) -> Vec<Order> {
        self.orders.list()
    }

    pub fn payment(&self, order_id: OrderId) -> Option<PaymentRecord> {
        self.payments.get(&order_id)
    }

    // ------------------------------------------------------------------
    // Affiliate administration
    // ------------------------------------------------------------------

    /// Open an affiliate account for a user (application starts pending).
    pub fn enroll_affiliate(&self, user_id: UserId) -> DomainResult<AffiliateAccount> {
        if self
            .accounts
            .list()
            .iter()
            .any(|account| account.user_id() == Some(user_id))
        {
            return Err(DomainError::conflict("user already has an affiliate account"));
        }

        let account_id = AffiliateId::new(AggregateId::new());
        let code = AffiliateCode::generate();
        let mut account = AffiliateAccount::empty(account_id);
        let events = execute(
            &mut account,
            &AffiliateCommand::Enroll {
                account_id,
                user_id,
                code: code.clone(),
                occurred_at: Utc::now(),
            },
        )?;

        self.accounts.upsert(account_id, account.clone());
        self.codes.upsert(code.as_str().to_string(), account_id);
        self.publish(account_id.0, AFFILIATE_AGGREGATE, account.version(), &events);
        self.dispatch(Notification::AffiliateApplicationReceived {
            affiliate_code: code.to_string(),
        });

        Ok(account)
    }

    pub fn approve_affiliate(&self, account_id: AffiliateId) -> DomainResult<AffiliateAccount> {
        let account = self.run_account_command(
            account_id,
            AffiliateCommand::Approve {
                account_id,
                occurred_at: Utc::now(),
            },
        )?;
        self.notify_affiliate(&account, |code| Notification::AffiliateApproved {
            affiliate_code: code,
        });
        Ok(account)
    }

    pub fn reject_affiliate(&self, account_id: AffiliateId) -> DomainResult<AffiliateAccount> {
        let account = self.run_account_command(
            account_id,
            AffiliateCommand::Reject {
                account_id,
                occurred_at: Utc::now(),
            },
        )?;
        self.notify_affiliate(&account, |code| Notification::AffiliateRejected {
            affiliate_code: code,
        });
        Ok(account)
    }

    pub fn suspend_affiliate(&self, account_id: AffiliateId) -> DomainResult<AffiliateAccount> {
        let account = self.run_account_command(
            account_id,
            AffiliateCommand::Suspend {
                account_id,
                occurred_at: Utc::now(),
            },
        )?;
        self.notify_affiliate(&account, |code| Notification::AffiliateSuspended {
            affiliate_code: code,
        });
        Ok(account)
    }

    pub fn reactivate_affiliate(&self, account_id: AffiliateId) -> DomainResult<AffiliateAccount> {
        self.run_account_command(
            account_id,
            AffiliateCommand::Reactivate {
                account_id,
                occurred_at: Utc::now(),
            },
        )
    }

    pub fn grant_bonus(
        &self,
        account_id: AffiliateId,
        amount: Decimal,
        description: impl Into<String>,
    ) -> DomainResult<AffiliateAccount> {
        self.run_account_command(
            account_id,
            AffiliateCommand::GrantBonus {
                account_id,
                amount,
                description: description.into(),
                occurred_at: Utc::now(),
            },
        )
    }

    pub fn confirm_commission(
        &self,
        account_id: AffiliateId,
        commission_id: CommissionId,
    ) -> DomainResult<AffiliateAccount> {
        self.run_account_command(
            account_id,
            AffiliateCommand::ConfirmCommission {
                account_id,
                commission_id,
                occurred_at: Utc::now(),
            },
        )
    }

    pub fn complete_commission(
        &self,
        account_id: AffiliateId,
        commission_id: CommissionId,
    ) -> DomainResult<AffiliateAccount> {
        self.run_account_command(
            account_id,
            AffiliateCommand::CompleteCommission {
                account_id,
                commission_id,
                occurred_at: Utc::now(),
            },
        )
    }

    pub fn cancel_commission(
        &self,
        account_id: AffiliateId,
        commission_id: CommissionId,
    ) -> DomainResult<AffiliateAccount> {
        self.run_account_command(
            account_id,
            AffiliateCommand::CancelCommission {
                account_id,
                commission_id,
                occurred_at: Utc::now(),
            },
        )
    }

    // ------------------------------------------------------------------
    // Withdrawals
    // ------------------------------------------------------------------

    /// Request a payout. The balance guard runs under the account store's
    /// write lock, so two concurrent requests cannot both draw on the same
    /// funds.
    pub fn request_withdrawal(
        &self,
        account_id: AffiliateId,
        amount: Decimal,
        method: PayoutMethod,
    ) -> DomainResult<WithdrawalId> {
        let withdrawal_id = WithdrawalId::new(AggregateId::new());
        self.run_account_command(
            account_id,
            AffiliateCommand::RequestWithdrawal {
                account_id,
                withdrawal_id,
                amount,
                method,
                min_withdrawal: self.program.min_withdrawal,
                occurred_at: Utc::now(),
            },
        )?;
        Ok(withdrawal_id)
    }

    pub fn approve_withdrawal(
        &self,
        account_id: AffiliateId,
        withdrawal_id: WithdrawalId,
    ) -> DomainResult<AffiliateAccount> {
        let account = self.run_account_command(
            account_id,
            AffiliateCommand::ApproveWithdrawal {
                account_id,
                withdrawal_id,
                occurred_at: Utc::now(),
            },
        )?;
        self.notify_withdrawal(&account, withdrawal_id, |affiliate_code, amount| {
            Notification::WithdrawalApproved {
                affiliate_code,
                amount,
            }
        });
        Ok(account)
    }

    pub fn start_payout(
        &self,
        account_id: AffiliateId,
        withdrawal_id: WithdrawalId,
    ) -> DomainResult<AffiliateAccount> {
        self.run_account_command(
            account_id,
            AffiliateCommand::StartPayout {
                account_id,
                withdrawal_id,
                occurred_at: Utc::now(),
            },
        )
    }

    pub fn mark_withdrawal_paid(
        &self,
        account_id: AffiliateId,
        withdrawal_id: WithdrawalId,
    ) -> DomainResult<AffiliateAccount> {
        let account = self.run_account_command(
            account_id,
            AffiliateCommand::MarkWithdrawalPaid {
                account_id,
                withdrawal_id,
                occurred_at: Utc::now(),
            },
        )?;
        self.notify_withdrawal(&account, withdrawal_id, |affiliate_code, amount| {
            Notification::WithdrawalPaid {
                affiliate_code,
                amount,
            }
        });
        Ok(account)
    }

    pub fn reject_withdrawal(
        &self,
        account_id: AffiliateId,
        withdrawal_id: WithdrawalId,
    ) -> DomainResult<AffiliateAccount> {
        let account = self.run_account_command(
            account_id,
            AffiliateCommand::RejectWithdrawal {
                account_id,
                withdrawal_id,
                occurred_at: Utc::now(),
            },
        )?;
        self.notify_withdrawal(&account, withdrawal_id, |affiliate_code, amount| {
            Notification::WithdrawalRejected {
                affiliate_code,
                amount,
            }
        });
        Ok(account)
    }

    pub fn affiliate(&self, account_id: AffiliateId) -> Option<AffiliateAccount> {
        self.accounts.get(&account_id)
    }

    pub fn affiliate_by_code(&self, code: &str) -> Option<AffiliateAccount> {
        let account_id = self.codes.get(&code.to_string())?;
        self.accounts.get(&account_id)
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    /// Run an order command under the order store's write lock and publish
    /// the resulting events.
    fn run_order_command(&self, order_id: OrderId, command: OrderCommand) -> DomainResult<Order> {
        let outcome = self.orders.update(&order_id, |order| {
            let events = execute(order, &command)?;
            Ok::<_, DomainError>((events, order.version(), order.clone()))
        });

        match outcome {
            None => Err(DomainError::not_found()),
            Some(Err(err)) => Err(err),
            Some(Ok((events, version, order))) => {
                self.publish(order_id.0, ORDER_AGGREGATE, version, &events);
                Ok(order)
            }
        }
    }

    /// Run an affiliate command under the account store's write lock and
    /// publish the resulting events. The lock is the per-affiliate
    /// serialization point for every balance-affecting operation.
    fn run_account_command(
        &self,
        account_id: AffiliateId,
        command: AffiliateCommand,
    ) -> DomainResult<AffiliateAccount> {
        let outcome = self.accounts.update(&account_id, |account| {
            let events = execute(account, &command)?;
            Ok::<_, DomainError>((events, account.version(), account.clone()))
        });

        match outcome {
            None => Err(DomainError::not_found()),
            Some(Err(err)) => Err(err),
            Some(Ok((events, version, account))) => {
                self.publish(account_id.0, AFFILIATE_AGGREGATE, version, &events);
                Ok(account)
            }
        }
    }

    /// Wrap typed events in envelopes and publish them.
    ///
    /// Fan-out is best effort: the stores are the source of truth, so a
    /// failed publication is logged, never propagated.
    fn publish<E>(
        &self,
        aggregate_id: AggregateId,
        aggregate_type: &str,
        version_after: u64,
        events: &[E],
    ) where
        E: Event + serde::Serialize,
    {
        let base = version_after.saturating_sub(events.len() as u64);
        for (i, event) in events.iter().enumerate() {
            let payload = match serde_json::to_value(event) {
                Ok(payload) => payload,
                Err(err) => {
                    tracing::warn!(%err, event_type = event.event_type(), "event not serializable");
                    continue;
                }
            };
            let envelope = EventEnvelope::new(
                Uuid::now_v7(),
                aggregate_id,
                aggregate_type,
                base + i as u64 + 1,
                payload,
            );
            if let Err(err) = self.bus.publish(envelope) {
                tracing::warn!(?err, "event publication failed");
            }
        }
    }

    fn dispatch(&self, notification: Notification) {
        if let Err(err) = self.notifier.notify(&notification) {
            tracing::warn!(%err, "notification delivery failed; continuing");
        }
    }

    fn notify_order(
        &self,
        order: &Order,
        make: impl FnOnce(String, String) -> Notification,
    ) {
        if let Some(address) = order.shipping() {
            self.dispatch(make(order_number_of(order), address.email.clone()));
        }
    }

    /// Look up the affiliate code and amount for a withdrawal notification.
    fn notify_withdrawal(
        &self,
        account: &AffiliateAccount,
        withdrawal_id: WithdrawalId,
        make: impl FnOnce(String, Decimal) -> Notification,
    ) {
        let Some(code) = account.code() else { return };
        let Some(entry) = account.withdrawals().iter().find(|w| w.id == withdrawal_id) else {
            return;
        };
        self.dispatch(make(code.to_string(), entry.amount));
    }

    fn settle_payment(&self, order_id: OrderId, status: PaymentRecordStatus) {
        self.payments.update(&order_id, |record| {
            record.status = status;
            record.completed_at = Some(Utc::now());
        });
    }

    fn notify_affiliate(
        &self,
        account: &AffiliateAccount,
        make: impl FnOnce(String) -> Notification,
    ) {
        if let Some(code) = account.code() {
            self.dispatch(make(code.to_string()));
        }
    }
}

fn order_number_of(order: &Order) -> String {
    order
        .number()
        .map(OrderNumber::to_string)
        .unwrap_or_default()
}
