//! Sale commands and queries.

use chrono::{DateTime, Utc};
use common::{BranchId, CustomerId, ProductId, SaleId};
use domain::{Sale, SaleHeader, SaleItem};
use rust_decimal::Decimal;
use sale_store::{DEFAULT_PAGE, DEFAULT_PAGE_SIZE, SaleFilter};

/// One requested line of a create or update command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaleItemInput {
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: Decimal,
}

impl SaleItemInput {
    /// Creates a new line input.
    pub fn new(
        product_id: ProductId,
        product_name: impl Into<String>,
        quantity: u32,
        unit_price: Decimal,
    ) -> Self {
        Self {
            product_id,
            product_name: product_name.into(),
            quantity,
            unit_price,
        }
    }

    /// Strips surrounding whitespace from the product name.
    pub fn normalize(&mut self) {
        trim_in_place(&mut self.product_name);
    }

    /// Builds an unpriced domain item from this input.
    pub fn to_item(&self) -> SaleItem {
        SaleItem::new(
            self.product_id,
            self.product_name.clone(),
            self.quantity,
            self.unit_price,
        )
    }
}

/// Command to register a new sale.
#[derive(Debug, Clone)]
pub struct CreateSale {
    /// Identifier for the new sale.
    pub sale_id: SaleId,

    pub sale_number: String,
    pub sale_date: DateTime<Utc>,
    pub customer_id: CustomerId,
    pub customer_name: String,
    pub branch_id: BranchId,
    pub branch_name: String,

    /// Lines to add, in order.
    pub items: Vec<SaleItemInput>,
}

impl CreateSale {
    /// Creates a CreateSale command with a generated sale ID.
    pub fn new(header: SaleHeader, items: Vec<SaleItemInput>) -> Self {
        Self {
            sale_id: SaleId::new(),
            sale_number: header.sale_number,
            sale_date: header.sale_date,
            customer_id: header.customer_id,
            customer_name: header.customer_name,
            branch_id: header.branch_id,
            branch_name: header.branch_name,
            items,
        }
    }

    /// Strips surrounding whitespace from every text field, items included.
    pub fn normalize(&mut self) {
        trim_in_place(&mut self.sale_number);
        trim_in_place(&mut self.customer_name);
        trim_in_place(&mut self.branch_name);
        self.items.iter_mut().for_each(SaleItemInput::normalize);
    }

    pub fn header(&self) -> SaleHeader {
        SaleHeader {
            sale_number: self.sale_number.clone(),
            sale_date: self.sale_date,
            customer_id: self.customer_id,
            customer_name: self.customer_name.clone(),
            branch_id: self.branch_id,
            branch_name: self.branch_name.clone(),
        }
    }
}

/// Command to overwrite a sale's header and reconcile its items.
///
/// An input whose product matches an active item reprices and renames that
/// item; any other input is added. Active items whose product is not listed are
/// cancelled.
#[derive(Debug, Clone)]
pub struct UpdateSale {
    /// The sale to update.
    pub sale_id: SaleId,

    pub sale_number: String,
    pub sale_date: DateTime<Utc>,
    pub customer_id: CustomerId,
    pub customer_name: String,
    pub branch_id: BranchId,
    pub branch_name: String,

    /// Desired active lines after the update.
    pub items: Vec<SaleItemInput>,
}

impl UpdateSale {
    /// Creates a new UpdateSale command.
    pub fn new(sale_id: SaleId, header: SaleHeader, items: Vec<SaleItemInput>) -> Self {
        Self {
            sale_id,
            sale_number: header.sale_number,
            sale_date: header.sale_date,
            customer_id: header.customer_id,
            customer_name: header.customer_name,
            branch_id: header.branch_id,
            branch_name: header.branch_name,
            items,
        }
    }

    /// Strips surrounding whitespace from every text field, items included.
    pub fn normalize(&mut self) {
        trim_in_place(&mut self.sale_number);
        trim_in_place(&mut self.customer_name);
        trim_in_place(&mut self.branch_name);
        self.items.iter_mut().for_each(SaleItemInput::normalize);
    }

    pub fn header(&self) -> SaleHeader {
        SaleHeader {
            sale_number: self.sale_number.clone(),
            sale_date: self.sale_date,
            customer_id: self.customer_id,
            customer_name: self.customer_name.clone(),
            branch_id: self.branch_id,
            branch_name: self.branch_name.clone(),
        }
    }
}

/// Command to cancel a whole sale.
#[derive(Debug, Clone)]
pub struct CancelSale {
    pub sale_id: SaleId,

    /// Optional reason carried on the notification.
    pub reason: Option<String>,
}

impl CancelSale {
    pub fn new(sale_id: SaleId) -> Self {
        Self {
            sale_id,
            reason: None,
        }
    }

    pub fn with_reason(sale_id: SaleId, reason: impl Into<String>) -> Self {
        Self {
            sale_id,
            reason: Some(reason.into()),
        }
    }
}

/// Command to cancel one line of a sale.
#[derive(Debug, Clone, Copy)]
pub struct CancelSaleItem {
    pub sale_id: SaleId,
    pub product_id: ProductId,
}

impl CancelSaleItem {
    pub fn new(sale_id: SaleId, product_id: ProductId) -> Self {
        Self {
            sale_id,
            product_id,
        }
    }
}

/// Command to remove a sale permanently.
#[derive(Debug, Clone, Copy)]
pub struct DeleteSale {
    pub sale_id: SaleId,
}

impl DeleteSale {
    pub fn new(sale_id: SaleId) -> Self {
        Self { sale_id }
    }
}

/// Query for one page of sales.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListSales {
    /// 1-indexed page number.
    pub page: u32,
    pub page_size: u32,
    pub customer_id: Option<CustomerId>,
    pub branch_id: Option<BranchId>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

impl Default for ListSales {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            page_size: DEFAULT_PAGE_SIZE,
            customer_id: None,
            branch_id: None,
            start_date: None,
            end_date: None,
        }
    }
}

impl ListSales {
    pub fn to_filter(&self) -> SaleFilter {
        SaleFilter {
            page: self.page,
            page_size: self.page_size,
            customer_id: self.customer_id,
            branch_id: self.branch_id,
            start_date: self.start_date,
            end_date: self.end_date,
        }
    }
}

/// One page of sales plus paging totals.
#[derive(Debug, Clone)]
pub struct SalePage {
    pub items: Vec<Sale>,
    pub total_count: u64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u64,
}

impl SalePage {
    /// Builds a page, deriving `total_pages` from the count and page size.
    pub fn new(items: Vec<Sale>, total_count: u64, page: u32, page_size: u32) -> Self {
        let total_pages = if page_size == 0 {
            0
        } else {
            total_count.div_ceil(u64::from(page_size))
        };

        Self {
            items,
            total_count,
            page,
            page_size,
            total_pages,
        }
    }

    pub fn has_next_page(&self) -> bool {
        u64::from(self.page) < self.total_pages
    }

    pub fn has_previous_page(&self) -> bool {
        self.page > 1
    }
}

fn trim_in_place(value: &mut String) {
    let trimmed = value.trim();
    if trimmed.len() != value.len() {
        *value = trimmed.to_string();
    }
}
