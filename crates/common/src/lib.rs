//! Identifier types shared by every layer of the sales service.

pub mod types;

pub use types::{BranchId, CustomerId, ProductId, SaleId, SaleItemId};
