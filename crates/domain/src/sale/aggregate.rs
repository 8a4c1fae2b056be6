//! Sale aggregate implementation.

use chrono::{DateTime, Utc};
use common::{BranchId, CustomerId, ProductId, SaleId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{SaleError, SaleItem, SaleStatus};

/// Header fields of a sale: everything except items and derived state.
///
/// Customer and branch names are cached display copies; the ids are
/// authoritative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleHeader {
    pub sale_number: String,
    pub sale_date: DateTime<Utc>,
    pub customer_id: CustomerId,
    pub customer_name: String,
    pub branch_id: BranchId,
    pub branch_name: String,
}

/// Sale aggregate root.
///
/// Owns its line items and keeps `total_amount` equal to the sum of the
/// totals of every non-cancelled item. Once cancelled, every mutator fails
/// with [`SaleError::SaleFrozen`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "SaleRecord")]
pub struct Sale {
    id: SaleId,
    header: SaleHeader,
    items: Vec<SaleItem>,
    total_amount: Decimal,
    status: SaleStatus,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
}

// Construction
impl Sale {
    /// Creates an active sale with no items.
    pub fn new(id: SaleId, header: SaleHeader) -> Self {
        Self {
            id,
            header,
            items: Vec::new(),
            total_amount: Decimal::ZERO,
            status: SaleStatus::Active,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    /// Rebuilds a persisted sale. The total is derived from `items`.
    pub fn restore(
        id: SaleId,
        header: SaleHeader,
        items: Vec<SaleItem>,
        status: SaleStatus,
        created_at: DateTime<Utc>,
        updated_at: Option<DateTime<Utc>>,
    ) -> Result<Self, SaleError> {
        let total_amount = active_total(&items)?;
        Ok(Self {
            id,
            header,
            items,
            total_amount,
            status,
            created_at,
            updated_at,
        })
    }
}

/// Serialized form of a [`Sale`]. Any `total_amount` in the payload is
/// ignored and rederived on the way in.
#[derive(Deserialize)]
struct SaleRecord {
    id: SaleId,
    header: SaleHeader,
    items: Vec<SaleItem>,
    status: SaleStatus,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
}

impl TryFrom<SaleRecord> for Sale {
    type Error = SaleError;

    fn try_from(record: SaleRecord) -> Result<Self, Self::Error> {
        Sale::restore(
            record.id,
            record.header,
            record.items,
            record.status,
            record.created_at,
            record.updated_at,
        )
    }
}

// Query methods
impl Sale {
    pub fn id(&self) -> SaleId {
        self.id
    }

    pub fn header(&self) -> &SaleHeader {
        &self.header
    }

    pub fn sale_number(&self) -> &str {
        &self.header.sale_number
    }

    pub fn sale_date(&self) -> DateTime<Utc> {
        self.header.sale_date
    }

    pub fn customer_id(&self) -> CustomerId {
        self.header.customer_id
    }

    pub fn customer_name(&self) -> &str {
        &self.header.customer_name
    }

    pub fn branch_id(&self) -> BranchId {
        self.header.branch_id
    }

    pub fn branch_name(&self) -> &str {
        &self.header.branch_name
    }

    /// Returns all items, cancelled ones included, in insertion order.
    pub fn items(&self) -> &[SaleItem] {
        &self.items
    }

    /// Returns the items that still count towards the total.
    pub fn active_items(&self) -> impl Iterator<Item = &SaleItem> {
        self.items.iter().filter(|item| !item.is_cancelled())
    }

    /// Returns the first non-cancelled item for a product.
    pub fn find_active_item(&self, product_id: ProductId) -> Option<&SaleItem> {
        self.active_items()
            .find(|item| item.product_id() == product_id)
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn total_amount(&self) -> Decimal {
        self.total_amount
    }

    pub fn status(&self) -> SaleStatus {
        self.status
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == SaleStatus::Cancelled
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }
}

// Command methods
impl Sale {
    /// Prices `item` with the discount rules, appends it and refreshes the total.
    ///
    /// Passing `None` fails with [`SaleError::MissingItem`]. Any failure
    /// leaves the sale unchanged.
    pub fn add_item(&mut self, item: impl Into<Option<SaleItem>>) -> Result<(), SaleError> {
        self.ensure_active()?;

        let mut item = item.into().ok_or(SaleError::MissingItem)?;
        item.apply_discount_rules()?;
        let total_amount = active_total(self.items.iter().chain(std::iter::once(&item)))?;

        self.items.push(item);
        self.total_amount = total_amount;
        self.touch();
        Ok(())
    }

    /// Reprices the first active item for `product_id`.
    ///
    /// Returns `Ok(false)` when no active item matches; the sale is then
    /// untouched.
    pub fn try_modify_item(
        &mut self,
        product_id: ProductId,
        quantity: u32,
        unit_price: Decimal,
    ) -> Result<bool, SaleError> {
        self.ensure_active()?;

        let Some(index) = self.active_item_index(product_id) else {
            return Ok(false);
        };

        let mut candidate = self.items[index].clone();
        candidate.set_quantity(quantity)?;
        candidate.set_unit_price(unit_price)?;
        candidate.apply_discount_rules()?;
        let total_amount = active_total(
            self.items
                .iter()
                .enumerate()
                .map(|(i, item)| if i == index { &candidate } else { item }),
        )?;

        self.items[index] = candidate;
        self.total_amount = total_amount;
        self.touch();
        Ok(true)
    }

    /// Renames the first active item for `product_id`.
    ///
    /// Returns `Ok(false)` when no active item matches.
    pub fn try_rename_item(
        &mut self,
        product_id: ProductId,
        product_name: &str,
    ) -> Result<bool, SaleError> {
        self.ensure_active()?;

        let Some(index) = self.active_item_index(product_id) else {
            return Ok(false);
        };

        if self.items[index].product_name() != product_name {
            self.items[index].set_product_name(product_name)?;
            self.touch();
        }
        Ok(true)
    }

    /// Like [`Sale::try_modify_item`], treating a missing product as a no-op.
    pub fn modify_item(
        &mut self,
        product_id: ProductId,
        quantity: u32,
        unit_price: Decimal,
    ) -> Result<(), SaleError> {
        self.try_modify_item(product_id, quantity, unit_price)
            .map(|_| ())
    }

    /// Cancels the first active item for `product_id` and refreshes the total.
    ///
    /// Returns `Ok(false)` when no active item matches.
    pub fn try_cancel_item(&mut self, product_id: ProductId) -> Result<bool, SaleError> {
        self.ensure_active()?;

        let Some(index) = self.active_item_index(product_id) else {
            return Ok(false);
        };

        let total_amount = active_total(
            self.items
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != index)
                .map(|(_, item)| item),
        )?;

        self.items[index].cancel();
        self.total_amount = total_amount;
        self.touch();
        Ok(true)
    }

    /// Like [`Sale::try_cancel_item`], treating a missing product as a no-op.
    pub fn cancel_item(&mut self, product_id: ProductId) -> Result<(), SaleError> {
        self.try_cancel_item(product_id).map(|_| ())
    }

    /// Recomputes `total_amount` from the active items and stamps `updated_at`.
    ///
    /// Fails without touching the sale when the sum overflows.
    pub fn calculate_total_amount(&mut self) -> Result<(), SaleError> {
        self.total_amount = active_total(&self.items)?;
        self.touch();
        Ok(())
    }

    /// Replaces the header fields.
    pub fn update_header(&mut self, header: SaleHeader) -> Result<(), SaleError> {
        self.ensure_active()?;
        self.header = header;
        self.touch();
        Ok(())
    }

    /// Moves the sale to `Cancelled`.
    ///
    /// Items keep their own status and the last computed total stands.
    pub fn cancel(&mut self) -> Result<(), SaleError> {
        self.ensure_active()?;
        self.status = SaleStatus::Cancelled;
        self.touch();
        Ok(())
    }
}

impl Sale {
    fn ensure_active(&self) -> Result<(), SaleError> {
        if !self.status.can_modify() {
            return Err(SaleError::SaleFrozen { sale_id: self.id });
        }
        Ok(())
    }

    fn active_item_index(&self, product_id: ProductId) -> Option<usize> {
        self.items
            .iter()
            .position(|item| !item.is_cancelled() && item.product_id() == product_id)
    }

    fn touch(&mut self) {
        self.updated_at = Some(Utc::now());
    }
}

fn active_total<'a>(
    items: impl IntoIterator<Item = &'a SaleItem>,
) -> Result<Decimal, SaleError> {
    items
        .into_iter()
        .filter(|item| !item.is_cancelled())
        .try_fold(Decimal::ZERO, |sum, item| sum.checked_add(item.total()))
        .ok_or_else(|| SaleError::business_rule("sale total overflows"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header() -> SaleHeader {
        SaleHeader {
            sale_number: "S-0001".to_string(),
            sale_date: Utc::now(),
            customer_id: CustomerId::new(),
            customer_name: "Acme Corp".to_string(),
            branch_id: BranchId::new(),
            branch_name: "Downtown".to_string(),
        }
    }

    fn create_sale() -> Sale {
        Sale::new(SaleId::new(), header())
    }

    fn item(product_id: ProductId, quantity: u32, unit_price: i64) -> SaleItem {
        SaleItem::new(product_id, "Widget", quantity, Decimal::from(unit_price))
    }

    fn assert_total_matches_active_items(sale: &Sale) {
        let expected: Decimal = sale.active_items().map(SaleItem::total).sum();
        assert_eq!(sale.total_amount(), expected);
    }

    #[test]
    fn test_new_sale_is_active_and_empty() {
        let sale = create_sale();
        assert_eq!(sale.status(), SaleStatus::Active);
        assert_eq!(sale.item_count(), 0);
        assert_eq!(sale.total_amount(), Decimal::ZERO);
        assert!(sale.updated_at().is_none());
    }

    #[test]
    fn test_add_item_applies_discount_and_total() {
        let mut sale = create_sale();
        sale.add_item(item(ProductId::new(), 5, 100)).unwrap();

        assert_eq!(sale.item_count(), 1);
        assert_eq!(sale.items()[0].discount(), Decimal::from(10));
        assert_eq!(sale.total_amount(), Decimal::from(450));
        assert!(sale.updated_at().is_some());
    }

    #[test]
    fn test_add_missing_item_fails_and_leaves_sale_unchanged() {
        let mut sale = create_sale();
        let before = sale.clone();

        let result = sale.add_item(None::<SaleItem>);

        assert_eq!(result, Err(SaleError::MissingItem));
        assert_eq!(sale, before);
    }

    #[test]
    fn test_add_item_over_ceiling_fails_and_leaves_sale_unchanged() {
        let mut sale = create_sale();
        sale.add_item(item(ProductId::new(), 2, 50)).unwrap();
        let before = sale.clone();

        let result = sale.add_item(item(ProductId::new(), 21, 10));

        assert!(matches!(
            result,
            Err(SaleError::BusinessRuleViolation { .. })
        ));
        assert_eq!(sale, before);
    }

    #[test]
    fn test_total_excludes_cancelled_items() {
        let mut sale = create_sale();
        let cancelled = ProductId::new();
        sale.add_item(item(ProductId::new(), 5, 100)).unwrap();
        sale.add_item(item(ProductId::new(), 15, 10)).unwrap();
        sale.add_item(SaleItem::new(cancelled, "Gadget", 1, Decimal::from(999)))
            .unwrap();
        assert_eq!(sale.total_amount(), Decimal::from(1569));

        sale.cancel_item(cancelled).unwrap();

        assert_eq!(sale.total_amount(), Decimal::from(570));
        assert_total_matches_active_items(&sale);
    }

    #[test]
    fn test_modify_item_reprices() {
        let mut sale = create_sale();
        let product_id = ProductId::new();
        sale.add_item(item(product_id, 2, 50)).unwrap();

        let found = sale
            .try_modify_item(product_id, 10, Decimal::from(50))
            .unwrap();

        assert!(found);
        let modified = sale.find_active_item(product_id).unwrap();
        assert_eq!(modified.quantity(), 10);
        assert_eq!(modified.discount(), Decimal::from(20));
        assert_eq!(sale.total_amount(), Decimal::from(400));
    }

    #[test]
    fn test_modify_missing_item_is_noop() {
        let mut sale = create_sale();
        sale.add_item(item(ProductId::new(), 2, 50)).unwrap();
        let before = sale.clone();

        sale.modify_item(ProductId::new(), 4, Decimal::from(10))
            .unwrap();
        assert_eq!(sale, before);

        let found = sale
            .try_modify_item(ProductId::new(), 4, Decimal::from(10))
            .unwrap();
        assert!(!found);
        assert_eq!(sale, before);
    }

    #[test]
    fn test_modify_item_over_ceiling_keeps_previous_values() {
        let mut sale = create_sale();
        let product_id = ProductId::new();
        sale.add_item(item(product_id, 2, 50)).unwrap();
        let before = sale.clone();

        let result = sale.modify_item(product_id, 25, Decimal::from(50));

        assert!(matches!(
            result,
            Err(SaleError::BusinessRuleViolation { .. })
        ));
        assert_eq!(sale, before);
    }

    #[test]
    fn test_modify_skips_cancelled_item_with_same_product() {
        let mut sale = create_sale();
        let product_id = ProductId::new();
        sale.add_item(item(product_id, 2, 50)).unwrap();
        sale.cancel_item(product_id).unwrap();
        sale.add_item(item(product_id, 3, 50)).unwrap();

        sale.modify_item(product_id, 4, Decimal::from(50)).unwrap();

        assert!(sale.items()[0].is_cancelled());
        assert_eq!(sale.items()[0].quantity(), 2);
        assert_eq!(sale.items()[1].quantity(), 4);
        assert_eq!(sale.total_amount(), Decimal::from(180));
    }

    #[test]
    fn test_cancel_item_twice_leaves_total_unchanged() {
        let mut sale = create_sale();
        let product_id = ProductId::new();
        sale.add_item(item(product_id, 2, 50)).unwrap();
        sale.add_item(item(ProductId::new(), 1, 30)).unwrap();

        assert!(sale.try_cancel_item(product_id).unwrap());
        let total = sale.total_amount();

        assert!(!sale.try_cancel_item(product_id).unwrap());
        assert_eq!(sale.total_amount(), total);

        sale.cancel_item(ProductId::new()).unwrap();
        assert_eq!(sale.total_amount(), total);
        assert_eq!(total, Decimal::from(30));
    }

    #[test]
    fn test_overflowing_total_leaves_sale_unchanged() {
        let mut sale = create_sale();
        let first = ProductId::new();
        let second = ProductId::new();
        sale.add_item(SaleItem::new(first, "Widget", 1, Decimal::MAX))
            .unwrap();
        let before = sale.clone();

        let result = sale.add_item(SaleItem::new(second, "Gadget", 1, Decimal::MAX));
        assert!(matches!(
            result,
            Err(SaleError::BusinessRuleViolation { .. })
        ));
        assert_eq!(sale, before);

        sale.add_item(item(second, 1, 1)).unwrap_err();
        assert_eq!(sale, before);

        let result = sale.try_modify_item(first, 2, Decimal::MAX);
        assert!(matches!(
            result,
            Err(SaleError::BusinessRuleViolation { .. })
        ));
        assert_eq!(sale, before);
    }

    #[test]
    fn test_rename_item_keeps_price_and_total() {
        let mut sale = create_sale();
        let product_id = ProductId::new();
        sale.add_item(item(product_id, 5, 100)).unwrap();

        assert!(sale.try_rename_item(product_id, "Keyboard").unwrap());
        assert_eq!(sale.items()[0].product_name(), "Keyboard");
        assert_eq!(sale.items()[0].total(), Decimal::from(450));
        assert_eq!(sale.total_amount(), Decimal::from(450));

        assert!(!sale.try_rename_item(ProductId::new(), "Mouse").unwrap());
        sale.cancel().unwrap();
        assert!(matches!(
            sale.try_rename_item(product_id, "Mouse"),
            Err(SaleError::SaleFrozen { .. })
        ));
    }

    #[test]
    fn test_calculate_total_on_empty_sale() {
        let mut sale = create_sale();
        sale.calculate_total_amount().unwrap();
        assert_eq!(sale.total_amount(), Decimal::ZERO);
        assert!(sale.updated_at().is_some());
    }

    #[test]
    fn test_cancel_keeps_items_and_total() {
        let mut sale = create_sale();
        sale.add_item(item(ProductId::new(), 5, 100)).unwrap();

        sale.cancel().unwrap();

        assert_eq!(sale.status(), SaleStatus::Cancelled);
        assert!(sale.status().is_terminal());
        assert!(!sale.items()[0].is_cancelled());
        assert_eq!(sale.total_amount(), Decimal::from(450));
    }

    #[test]
    fn test_cancelled_sale_is_frozen() {
        let mut sale = create_sale();
        let product_id = ProductId::new();
        sale.add_item(item(product_id, 5, 100)).unwrap();
        sale.cancel().unwrap();
        let before = sale.clone();

        let frozen = |result: Result<(), SaleError>| {
            matches!(result, Err(SaleError::SaleFrozen { .. }))
        };

        assert!(frozen(sale.add_item(item(ProductId::new(), 1, 1))));
        assert!(frozen(sale.modify_item(product_id, 1, Decimal::ONE)));
        assert!(frozen(sale.cancel_item(product_id)));
        assert!(frozen(sale.update_header(header())));
        assert!(frozen(sale.cancel()));
        assert!(matches!(
            sale.try_modify_item(product_id, 1, Decimal::ONE),
            Err(SaleError::SaleFrozen { .. })
        ));
        assert!(matches!(
            sale.try_cancel_item(product_id),
            Err(SaleError::SaleFrozen { .. })
        ));
        assert_eq!(sale, before);
    }

    #[test]
    fn test_update_header() {
        let mut sale = create_sale();
        let mut new_header = header();
        new_header.sale_number = "S-0002".to_string();

        sale.update_header(new_header.clone()).unwrap();

        assert_eq!(sale.header(), &new_header);
        assert!(sale.updated_at().is_some());
    }

    #[test]
    fn test_total_invariant_after_mixed_operations() {
        let mut sale = create_sale();
        let products: Vec<ProductId> = (0..4).map(|_| ProductId::new()).collect();
        for (index, product_id) in products.iter().enumerate() {
            let quantity = (index as u32 + 1) * 4;
            sale.add_item(item(*product_id, quantity, 25)).unwrap();
            assert_total_matches_active_items(&sale);
        }

        sale.modify_item(products[0], 20, Decimal::new(1050, 2))
            .unwrap();
        assert_total_matches_active_items(&sale);

        sale.cancel_item(products[2]).unwrap();
        assert_total_matches_active_items(&sale);

        sale.modify_item(products[2], 1, Decimal::ONE).unwrap();
        assert_total_matches_active_items(&sale);
    }

    #[test]
    fn test_restore_derives_total() {
        let sale = {
            let mut sale = create_sale();
            sale.add_item(item(ProductId::new(), 5, 100)).unwrap();
            sale.add_item(item(ProductId::new(), 2, 50)).unwrap();
            sale
        };

        let restored = Sale::restore(
            sale.id(),
            sale.header().clone(),
            sale.items().to_vec(),
            sale.status(),
            sale.created_at(),
            sale.updated_at(),
        )
        .unwrap();

        assert_eq!(restored, sale);
        assert_eq!(restored.total_amount(), Decimal::from(550));
    }

    #[test]
    fn test_serialization() {
        let mut sale = create_sale();
        sale.add_item(item(ProductId::new(), 15, 10)).unwrap();

        let json = serde_json::to_string(&sale).unwrap();
        let deserialized: Sale = serde_json::from_str(&json).unwrap();

        assert_eq!(deserialized, sale);
    }

    #[test]
    fn test_deserialization_rederives_total() {
        let mut sale = create_sale();
        sale.add_item(item(ProductId::new(), 5, 100)).unwrap();

        let mut value = serde_json::to_value(&sale).unwrap();
        value["total_amount"] = serde_json::json!("1.00");
        let deserialized: Sale = serde_json::from_value(value).unwrap();

        assert_eq!(deserialized.total_amount(), Decimal::from(450));
        assert_eq!(deserialized, sale);
    }
}
