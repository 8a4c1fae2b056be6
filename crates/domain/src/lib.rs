//! Domain layer for the sales service.
//!
//! This crate holds the sale aggregate and everything inside its boundary:
//! - `Sale` aggregate root with its frozen-after-cancel guard
//! - `SaleItem` line items and the quantity-tier discount rules
//! - `SaleEvent` records handed to notification sinks after state changes

pub mod sale;

pub use sale::{
    DISCOUNT_TIERS, MAX_ITEM_QUANTITY, Sale, SaleError, SaleEvent, SaleHeader, SaleItem,
    SaleModification, SaleStatus, discount_for_quantity, line_total,
};
