//! Sale line items and the quantity-tier discount rules.

use common::{ProductId, SaleItemId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::SaleError;

/// Largest quantity of one product a single sale may carry.
pub const MAX_ITEM_QUANTITY: u32 = 20;

/// Discount tiers as `(minimum quantity, discount percent)`, highest tier first.
pub const DISCOUNT_TIERS: [(u32, u32); 3] = [(10, 20), (4, 10), (1, 0)];

/// Returns the discount percentage for a quantity.
///
/// Quantities of zero or above [`MAX_ITEM_QUANTITY`] are rejected; they are
/// never clamped into a tier.
pub fn discount_for_quantity(quantity: u32) -> Result<Decimal, SaleError> {
    if quantity == 0 {
        return Err(SaleError::business_rule("quantity must be at least 1"));
    }

    if quantity > MAX_ITEM_QUANTITY {
        return Err(SaleError::business_rule(format!(
            "cannot sell more than {MAX_ITEM_QUANTITY} identical items (requested {quantity})"
        )));
    }

    let percent = DISCOUNT_TIERS
        .iter()
        .find(|(min_quantity, _)| quantity >= *min_quantity)
        .map(|(_, percent)| *percent)
        .unwrap_or(0);

    Ok(Decimal::from(percent))
}

/// Computes `unit_price * quantity * (1 - discount / 100)` without rounding.
///
/// Fails when an intermediate product no longer fits in a [`Decimal`].
pub fn line_total(
    unit_price: Decimal,
    quantity: u32,
    discount: Decimal,
) -> Result<Decimal, SaleError> {
    let factor = (Decimal::ONE_HUNDRED - discount) / Decimal::ONE_HUNDRED;
    unit_price
        .checked_mul(Decimal::from(quantity))
        .and_then(|gross| gross.checked_mul(factor))
        .ok_or_else(|| {
            SaleError::business_rule(format!(
                "line total overflows for {quantity} x {unit_price}"
            ))
        })
}

/// A line item owned by a sale.
///
/// `discount` and `total` are derived. Changing the quantity or price does
/// not refresh them; call [`SaleItem::apply_discount_rules`] afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleItem {
    id: SaleItemId,
    product_id: ProductId,
    product_name: String,
    quantity: u32,
    unit_price: Decimal,
    discount: Decimal,
    total: Decimal,
    is_cancelled: bool,
}

impl SaleItem {
    /// Creates a new, not yet priced, line item.
    pub fn new(
        product_id: ProductId,
        product_name: impl Into<String>,
        quantity: u32,
        unit_price: Decimal,
    ) -> Self {
        Self {
            id: SaleItemId::new(),
            product_id,
            product_name: product_name.into(),
            quantity,
            unit_price,
            discount: Decimal::ZERO,
            total: Decimal::ZERO,
            is_cancelled: false,
        }
    }

    /// Rebuilds a persisted line item exactly as it was stored.
    #[allow(clippy::too_many_arguments)]
    pub fn restore(
        id: SaleItemId,
        product_id: ProductId,
        product_name: impl Into<String>,
        quantity: u32,
        unit_price: Decimal,
        discount: Decimal,
        total: Decimal,
        is_cancelled: bool,
    ) -> Self {
        Self {
            id,
            product_id,
            product_name: product_name.into(),
            quantity,
            unit_price,
            discount,
            total,
            is_cancelled,
        }
    }

    pub fn id(&self) -> SaleItemId {
        self.id
    }

    pub fn product_id(&self) -> ProductId {
        self.product_id
    }

    pub fn product_name(&self) -> &str {
        &self.product_name
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn unit_price(&self) -> Decimal {
        self.unit_price
    }

    /// Discount percentage in `[0, 100]`.
    pub fn discount(&self) -> Decimal {
        self.discount
    }

    pub fn total(&self) -> Decimal {
        self.total
    }

    pub fn is_cancelled(&self) -> bool {
        self.is_cancelled
    }

    /// Overwrites the quantity. Derived fields are left untouched.
    pub fn set_quantity(&mut self, quantity: u32) -> Result<(), SaleError> {
        self.ensure_active()?;
        self.quantity = quantity;
        Ok(())
    }

    /// Replaces the cached product name.
    pub fn set_product_name(&mut self, product_name: impl Into<String>) -> Result<(), SaleError> {
        self.ensure_active()?;
        self.product_name = product_name.into();
        Ok(())
    }

    /// Overwrites the unit price. Derived fields are left untouched.
    pub fn set_unit_price(&mut self, unit_price: Decimal) -> Result<(), SaleError> {
        self.ensure_active()?;
        self.unit_price = unit_price;
        Ok(())
    }

    /// Recomputes `discount` and `total` from the current quantity and price.
    ///
    /// On failure the item keeps its previous discount and total.
    pub fn apply_discount_rules(&mut self) -> Result<(), SaleError> {
        let discount = discount_for_quantity(self.quantity)?;

        if self.unit_price <= Decimal::ZERO {
            return Err(SaleError::business_rule(format!(
                "unit price must be greater than zero (got {})",
                self.unit_price
            )));
        }

        let total = line_total(self.unit_price, self.quantity, discount)?;
        self.discount = discount;
        self.total = total;
        Ok(())
    }

    /// Marks the item as cancelled. Cancelling twice is a no-op.
    pub fn cancel(&mut self) {
        self.is_cancelled = true;
    }

    fn ensure_active(&self) -> Result<(), SaleError> {
        if self.is_cancelled {
            return Err(SaleError::ItemCancelled {
                product_id: self.product_id,
            });
        }
        Ok(())
    }
}
