//! Input validation for sale commands and queries.
//!
//! Validators run before the aggregate is touched and report every failing
//! field at once rather than stopping at the first.

use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Utc};
use domain::MAX_ITEM_QUANTITY;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::commands::{CreateSale, ListSales, SaleItemInput, UpdateSale};

/// Longest accepted sale number.
pub const MAX_SALE_NUMBER_LEN: usize = 50;

/// Longest accepted customer, branch, or product name.
pub const MAX_NAME_LEN: usize = 100;

/// Largest page a listing may request.
pub const MAX_PAGE_SIZE: u32 = 100;

/// A single rejected field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result type for validation; the error lists every failing field.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

#[derive(Default)]
struct Validator {
    errors: Vec<ValidationError>,
}

impl Validator {
    fn check(&mut self, ok: bool, field: impl Into<String>, message: impl Into<String>) {
        if !ok {
            self.errors.push(ValidationError::new(field, message));
        }
    }

    fn required_text(&mut self, field: &str, value: &str, max: usize) {
        let value = value.trim();
        if value.is_empty() {
            self.errors
                .push(ValidationError::new(field, "is required"));
        } else if value.chars().count() > max {
            self.errors.push(ValidationError::new(
                field,
                format!("must be at most {max} characters"),
            ));
        }
    }

    fn header(
        &mut self,
        sale_number: &str,
        sale_date: DateTime<Utc>,
        customer_name: &str,
        branch_name: &str,
    ) {
        self.required_text("sale_number", sale_number, MAX_SALE_NUMBER_LEN);
        self.check(
            sale_date <= Utc::now(),
            "sale_date",
            "cannot be in the future",
        );
        self.required_text("customer_name", customer_name, MAX_NAME_LEN);
        self.required_text("branch_name", branch_name, MAX_NAME_LEN);
    }

    fn items(&mut self, items: &[SaleItemInput]) {
        if items.is_empty() {
            self.errors
                .push(ValidationError::new("items", "at least one item is required"));
            return;
        }

        let mut seen = HashSet::new();
        for (index, item) in items.iter().enumerate() {
            let field = |name: &str| format!("items[{index}].{name}");

            self.required_text(&field("product_name"), &item.product_name, MAX_NAME_LEN);
            self.check(
                (1..=MAX_ITEM_QUANTITY).contains(&item.quantity),
                field("quantity"),
                format!("must be between 1 and {MAX_ITEM_QUANTITY}"),
            );
            self.check(
                item.unit_price > Decimal::ZERO,
                field("unit_price"),
                "must be greater than zero",
            );
            self.check(
                seen.insert(item.product_id),
                field("product_id"),
                "product appears more than once",
            );
        }
    }

    fn finish(self) -> ValidationResult {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }
}

/// Validates a [`CreateSale`] command.
pub fn validate_create_sale(cmd: &CreateSale) -> ValidationResult {
    let mut v = Validator::default();
    v.header(
        &cmd.sale_number,
        cmd.sale_date,
        &cmd.customer_name,
        &cmd.branch_name,
    );
    v.items(&cmd.items);
    v.finish()
}

/// Validates an [`UpdateSale`] command.
pub fn validate_update_sale(cmd: &UpdateSale) -> ValidationResult {
    let mut v = Validator::default();
    v.header(
        &cmd.sale_number,
        cmd.sale_date,
        &cmd.customer_name,
        &cmd.branch_name,
    );
    v.items(&cmd.items);
    v.finish()
}

/// Validates a [`ListSales`] query.
pub fn validate_list_sales(query: &ListSales) -> ValidationResult {
    let mut v = Validator::default();
    v.check(query.page >= 1, "page", "must be at least 1");
    v.check(
        (1..=MAX_PAGE_SIZE).contains(&query.page_size),
        "page_size",
        format!("must be between 1 and {MAX_PAGE_SIZE}"),
    );
    if let (Some(start), Some(end)) = (query.start_date, query.end_date) {
        v.check(
            start <= end,
            "start_date",
            "must not be after end_date",
        );
    }
    v.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use common::{BranchId, CustomerId, ProductId};
    use domain::SaleHeader;

    fn header() -> SaleHeader {
        SaleHeader {
            sale_number: "S-001".to_string(),
            sale_date: Utc::now() - Duration::hours(1),
            customer_id: CustomerId::new(),
            customer_name: "Acme".to_string(),
            branch_id: BranchId::new(),
            branch_name: "North".to_string(),
        }
    }

    fn item(quantity: u32, unit_price: Decimal) -> SaleItemInput {
        SaleItemInput::new(ProductId::new(), "Widget", quantity, unit_price)
    }

    fn fields(errors: &[ValidationError]) -> Vec<&str> {
        errors.iter().map(|e| e.field.as_str()).collect()
    }

    #[test]
    fn test_valid_create_passes() {
        let cmd = CreateSale::new(header(), vec![item(5, Decimal::from(100))]);
        assert!(validate_create_sale(&cmd).is_ok());
    }

    #[test]
    fn test_collects_every_header_failure() {
        let mut h = header();
        h.sale_number = "  ".to_string();
        h.sale_date = Utc::now() + Duration::days(1);
        h.customer_name = String::new();
        h.branch_name = "b".repeat(MAX_NAME_LEN + 1);

        let errors = validate_create_sale(&CreateSale::new(h, vec![item(1, Decimal::ONE)]))
            .unwrap_err();

        assert_eq!(
            fields(&errors),
            vec!["sale_number", "sale_date", "customer_name", "branch_name"]
        );
    }

    #[test]
    fn test_sale_number_length_limit() {
        let mut h = header();
        h.sale_number = "n".repeat(MAX_SALE_NUMBER_LEN);
        let cmd = CreateSale::new(h.clone(), vec![item(1, Decimal::ONE)]);
        assert!(validate_create_sale(&cmd).is_ok());

        h.sale_number.push('n');
        let cmd = CreateSale::new(h, vec![item(1, Decimal::ONE)]);
        assert_eq!(fields(&validate_create_sale(&cmd).unwrap_err()), vec!["sale_number"]);
    }

    #[test]
    fn test_items_are_required() {
        let errors = validate_create_sale(&CreateSale::new(header(), vec![])).unwrap_err();
        assert_eq!(fields(&errors), vec!["items"]);
    }

    #[test]
    fn test_item_rules() {
        let cmd = CreateSale::new(
            header(),
            vec![
                item(0, Decimal::ONE),
                item(21, Decimal::ONE),
                item(20, Decimal::ZERO),
            ],
        );

        let errors = validate_create_sale(&cmd).unwrap_err();
        assert_eq!(
            fields(&errors),
            vec!["items[0].quantity", "items[1].quantity", "items[2].unit_price"]
        );
    }

    #[test]
    fn test_duplicate_products_rejected() {
        let first = item(1, Decimal::ONE);
        let mut second = item(2, Decimal::ONE);
        second.product_id = first.product_id;

        let errors = validate_update_sale(&UpdateSale::new(
            common::SaleId::new(),
            header(),
            vec![first, second],
        ))
        .unwrap_err();

        assert_eq!(fields(&errors), vec!["items[1].product_id"]);
    }

    #[test]
    fn test_list_paging_bounds() {
        assert!(validate_list_sales(&ListSales::default()).is_ok());

        let query = ListSales {
            page: 0,
            page_size: MAX_PAGE_SIZE + 1,
            ..ListSales::default()
        };
        assert_eq!(
            fields(&validate_list_sales(&query).unwrap_err()),
            vec!["page", "page_size"]
        );
    }

    #[test]
    fn test_list_date_range_order() {
        let now = Utc::now();
        let query = ListSales {
            start_date: Some(now),
            end_date: Some(now - Duration::days(1)),
            ..ListSales::default()
        };
        assert_eq!(
            fields(&validate_list_sales(&query).unwrap_err()),
            vec!["start_date"]
        );
    }

    #[test]
    fn test_display() {
        let error = ValidationError::new("page", "must be at least 1");
        assert_eq!(error.to_string(), "page: must be at least 1");
    }
}
