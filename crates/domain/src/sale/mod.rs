//! Sale aggregate and related types.

mod aggregate;
mod events;
mod item;
mod status;

pub use aggregate::{Sale, SaleHeader};
pub use events::{SaleEvent, SaleModification};
pub use item::{DISCOUNT_TIERS, MAX_ITEM_QUANTITY, SaleItem, discount_for_quantity, line_total};
pub use status::SaleStatus;

use common::{ProductId, SaleId};
use thiserror::Error;

/// Errors raised synchronously by the sale aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SaleError {
    /// A pricing or quantity rule was broken.
    #[error("Business rule violation: {reason}")]
    BusinessRuleViolation { reason: String },

    /// An item was required but none was supplied.
    #[error("Sale item is required")]
    MissingItem,

    /// The sale is cancelled and no longer accepts changes.
    #[error("Sale {sale_id} is cancelled and cannot be modified")]
    SaleFrozen { sale_id: SaleId },

    /// The line item is cancelled and no longer accepts changes.
    #[error("Item for product {product_id} is cancelled and cannot be modified")]
    ItemCancelled { product_id: ProductId },
}

impl SaleError {
    pub(crate) fn business_rule(reason: impl Into<String>) -> Self {
        SaleError::BusinessRuleViolation {
            reason: reason.into(),
        }
    }
}
