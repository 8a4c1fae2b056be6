use chrono::{DateTime, Utc};
use common::{BranchId, CustomerId};
use domain::Sale;

/// First page number; pages are 1-indexed.
pub const DEFAULT_PAGE: u32 = 1;

/// Page size used when the caller does not pick one.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Builder for filtered, paginated sale listings.
///
/// All criteria are AND-combined. Date bounds are inclusive and apply to
/// the sale date. The repository does not cap `page_size`; that is the
/// validator's job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaleFilter {
    /// 1-indexed page number.
    pub page: u32,

    /// Number of sales per page.
    pub page_size: u32,

    /// Filter by customer.
    pub customer_id: Option<CustomerId>,

    /// Filter by branch.
    pub branch_id: Option<BranchId>,

    /// Sales on or after this instant.
    pub start_date: Option<DateTime<Utc>>,

    /// Sales on or before this instant.
    pub end_date: Option<DateTime<Utc>>,
}

impl Default for SaleFilter {
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

impl SaleFilter {
    /// Creates a filter matching every sale, first page, default size.
    pub fn new() -> Self {
        Self::default()
    }

    /// Selects a page.
    pub fn page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }

    /// Sets the page size.
    pub fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Filters by customer.
    pub fn customer_id(mut self, customer_id: CustomerId) -> Self {
        self.customer_id = Some(customer_id);
        self
    }

    /// Filters by branch.
    pub fn branch_id(mut self, branch_id: BranchId) -> Self {
        self.branch_id = Some(branch_id);
        self
    }

    /// Keeps sales dated on or after `start_date`.
    pub fn start_date(mut self, start_date: DateTime<Utc>) -> Self {
        self.start_date = Some(start_date);
        self
    }

    /// Keeps sales dated on or before `end_date`.
    pub fn end_date(mut self, end_date: DateTime<Utc>) -> Self {
        self.end_date = Some(end_date);
        self
    }

    /// Number of rows to skip for the selected page.
    pub fn offset(&self) -> u64 {
        u64::from(self.page.max(1) - 1) * u64::from(self.page_size)
    }

    /// Returns true if `sale` satisfies every criterion (pagination aside).
    pub fn matches(&self, sale: &Sale) -> bool {
        if let Some(customer_id) = self.customer_id
            && sale.customer_id() != customer_id
        {
            return false;
        }
        if let Some(branch_id) = self.branch_id
            && sale.branch_id() != branch_id
        {
            return false;
        }
        if let Some(start) = self.start_date
            && sale.sale_date() < start
        {
            return false;
        }
        if let Some(end) = self.end_date
            && sale.sale_date() > end
        {
            return false;
        }
        true
    }
}
