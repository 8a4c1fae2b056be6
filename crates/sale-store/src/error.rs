use common::SaleId;
use thiserror::Error;

/// Errors that can occur when interacting with the sale repository.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Another sale already uses this sale number.
    #[error("Sale number already exists: {0}")]
    DuplicateSaleNumber(String),

    /// The sale was not found in the store.
    #[error("Sale not found: {0}")]
    NotFound(SaleId),

    /// A stored row could not be mapped back into a sale.
    #[error("Corrupt sale record: {0}")]
    CorruptRecord(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Result type for repository operations.
pub type Result<T> = std::result::Result<T, StoreError>;
