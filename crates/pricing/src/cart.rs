use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use bramble_core::{AggregateId, DomainError, Entity, UserId};

/// Product identifier (catalog management itself lives outside this crate;
/// carts and order lines only ever reference products by id).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(pub AggregateId);

impl ProductId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for ProductId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Cart identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CartId(pub AggregateId);

impl CartId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for CartId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// A cart belongs to exactly one registered user or one anonymous session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CartOwner {
    User(UserId),
    Session(String),
}

/// One product line in a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: ProductId,
    pub name: String,
    pub sku: String,
    /// Unit price, two decimal places.
    pub unit_price: Decimal,
    pub quantity: u32,
}

impl CartLine {
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// Shopping cart: an ordered collection of product lines.
///
/// Each product appears at most once; adding a product that is already in
/// the cart merges the quantities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    id: CartId,
    owner: CartOwner,
    lines: Vec<CartLine>,
}

impl Cart {
    pub fn new(id: CartId, owner: CartOwner) -> Self {
        Self {
            id,
            owner,
            lines: Vec::new(),
        }
    }

    pub fn owner(&self) -> &CartOwner {
        &self.owner
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn total_items(&self) -> u32 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    pub fn subtotal(&self) -> Decimal {
        self.lines.iter().map(CartLine::line_total).sum()
    }

    /// Add a product line; if the product is already in the cart, its
    /// quantity is increased instead.
    pub fn add_line(
        &mut self,
        product_id: ProductId,
        name: impl Into<String>,
        sku: impl Into<String>,
        unit_price: Decimal,
        quantity: u32,
    ) -> Result<(), DomainError> {
        if quantity == 0 {
            return Err(DomainError::validation("quantity must be positive"));
        }
        if unit_price <= Decimal::ZERO {
            return Err(DomainError::validation("unit_price must be positive"));
        }

        if let Some(line) = self.lines.iter_mut().find(|l| l.product_id == product_id) {
            line.quantity += quantity;
            return Ok(());
        }

        self.lines.push(CartLine {
            product_id,
            name: name.into(),
            sku: sku.into(),
            unit_price,
            quantity,
        });
        Ok(())
    }

    /// Set the quantity of an existing line. Zero removes the line.
    pub fn update_quantity(
        &mut self,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<(), DomainError> {
        if quantity == 0 {
            self.remove_line(product_id);
            return Ok(());
        }

        let line = self
            .lines
            .iter_mut()
            .find(|l| l.product_id == product_id)
            .ok_or(DomainError::NotFound)?;
        line.quantity = quantity;
        Ok(())
    }

    pub fn remove_line(&mut self, product_id: ProductId) {
        self.lines.retain(|l| l.product_id != product_id);
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }
}

impl Entity for Cart {
    type Id = CartId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
