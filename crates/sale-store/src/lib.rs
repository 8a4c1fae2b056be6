pub mod error;
pub mod filter;
pub mod memory;
pub mod postgres;
pub mod store;

pub use error::{Result, StoreError};
pub use filter::{DEFAULT_PAGE, DEFAULT_PAGE_SIZE, SaleFilter};
pub use memory::InMemorySaleRepository;
pub use postgres::PostgresSaleRepository;
pub use store::SaleRepository;
