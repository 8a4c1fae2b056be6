//! Application layer for the sales service.
//!
//! Turns commands into aggregate operations, validates input before the
//! aggregate sees it, persists through a [`sale_store::SaleRepository`], and
//! publishes [`domain::SaleEvent`] notifications after each change.

pub mod commands;
pub mod error;
pub mod publisher;
pub mod service;
pub mod validation;

pub use commands::{
    CancelSale, CancelSaleItem, CreateSale, DeleteSale, ListSales, SaleItemInput, SalePage,
    UpdateSale,
};
pub use error::{ApplicationError, Result};
pub use publisher::{EventPublisher, InMemoryEventPublisher, LoggingEventPublisher, PublishError};
pub use service::SaleService;
pub use validation::{ValidationError, validate_create_sale, validate_list_sales, validate_update_sale};
