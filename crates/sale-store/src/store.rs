use async_trait::async_trait;
use common::SaleId;
use domain::Sale;

use crate::{Result, SaleFilter};

/// Persistence gateway for the sale aggregate.
///
/// The repository is the only synchronization point for sales: sale number
/// uniqueness is enforced here, not by the aggregate. A sale is always
/// written and read as a whole, items included.
/// All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait SaleRepository: Send + Sync {
    /// Stores a new sale.
    ///
    /// Fails with `DuplicateSaleNumber` if the sale number is taken.
    async fn create(&self, sale: Sale) -> Result<Sale>;

    /// Retrieves a sale by id.
    async fn get_by_id(&self, id: SaleId) -> Result<Option<Sale>>;

    /// Retrieves a sale by its unique business key.
    async fn get_by_sale_number(&self, sale_number: &str) -> Result<Option<Sale>>;

    /// Retrieves one page of sales matching `filter`.
    ///
    /// Sales are ordered by sale date (newest first), then sale number.
    async fn get_filtered(&self, filter: &SaleFilter) -> Result<Vec<Sale>>;

    /// Counts every sale matching `filter`, ignoring pagination.
    async fn get_filtered_count(&self, filter: &SaleFilter) -> Result<u64>;

    /// Replaces a stored sale, items included.
    ///
    /// Fails with `NotFound` if the sale does not exist and with
    /// `DuplicateSaleNumber` if it was renumbered onto a taken number.
    async fn update(&self, sale: Sale) -> Result<Sale>;

    /// Deletes a sale and its items. Returns false if nothing was deleted.
    async fn delete(&self, id: SaleId) -> Result<bool>;

    /// Counts all stored sales.
    async fn count(&self) -> Result<u64>;
}
