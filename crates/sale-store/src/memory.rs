use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::SaleId;
use domain::Sale;
use tokio::sync::RwLock;

use crate::{Result, SaleFilter, StoreError, store::SaleRepository};

/// In-memory sale repository.
///
/// Used by tests and when the service runs without a database. Provides
/// the same contract as the PostgreSQL implementation, including sale
/// number uniqueness.
#[derive(Clone, Default)]
pub struct InMemorySaleRepository {
    sales: Arc<RwLock<HashMap<SaleId, Sale>>>,
}

impl InMemorySaleRepository {
    /// Creates a new empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes every stored sale.
    pub async fn clear(&self) {
        self.sales.write().await.clear();
    }

    fn number_taken(sales: &HashMap<SaleId, Sale>, sale_number: &str, except: SaleId) -> bool {
        sales
            .values()
            .any(|s| s.id() != except && s.sale_number() == sale_number)
    }
}

#[async_trait]
impl SaleRepository for InMemorySaleRepository {
    async fn create(&self, sale: Sale) -> Result<Sale> {
        let mut sales = self.sales.write().await;

        if Self::number_taken(&sales, sale.sale_number(), sale.id()) {
            return Err(StoreError::DuplicateSaleNumber(
                sale.sale_number().to_string(),
            ));
        }

        sales.insert(sale.id(), sale.clone());
        Ok(sale)
    }

    async fn get_by_id(&self, id: SaleId) -> Result<Option<Sale>> {
        let sales = self.sales.read().await;
        Ok(sales.get(&id).cloned())
    }

    async fn get_by_sale_number(&self, sale_number: &str) -> Result<Option<Sale>> {
        let sales = self.sales.read().await;
        Ok(sales
            .values()
            .find(|s| s.sale_number() == sale_number)
            .cloned())
    }

    async fn get_filtered(&self, filter: &SaleFilter) -> Result<Vec<Sale>> {
        let sales = self.sales.read().await;
        let mut matching: Vec<_> = sales.values().filter(|s| filter.matches(s)).collect();

        // Newest first, then by sale number
        matching.sort_by(|a, b| {
            b.sale_date()
                .cmp(&a.sale_date())
                .then_with(|| a.sale_number().cmp(b.sale_number()))
        });

        let offset = usize::try_from(filter.offset()).unwrap_or(usize::MAX);
        Ok(matching
            .into_iter()
            .skip(offset)
            .take(filter.page_size as usize)
            .cloned()
            .collect())
    }

    async fn get_filtered_count(&self, filter: &SaleFilter) -> Result<u64> {
        let sales = self.sales.read().await;
        Ok(sales.values().filter(|s| filter.matches(s)).count() as u64)
    }

    async fn update(&self, sale: Sale) -> Result<Sale> {
        let mut sales = self.sales.write().await;

        if !sales.contains_key(&sale.id()) {
            return Err(StoreError::NotFound(sale.id()));
        }

        if Self::number_taken(&sales, sale.sale_number(), sale.id()) {
            return Err(StoreError::DuplicateSaleNumber(
                sale.sale_number().to_string(),
            ));
        }

        sales.insert(sale.id(), sale.clone());
        Ok(sale)
    }

    async fn delete(&self, id: SaleId) -> Result<bool> {
        let mut sales = self.sales.write().await;
        Ok(sales.remove(&id).is_some())
    }

    async fn count(&self) -> Result<u64> {
        let sales = self.sales.read().await;
        Ok(sales.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, Utc};
    use common::{BranchId, CustomerId, ProductId};
    use domain::{SaleHeader, SaleItem};
    use rust_decimal::Decimal;

    fn create_test_sale(sale_number: &str, sale_date: DateTime<Utc>) -> Sale {
        let mut sale = Sale::new(
            SaleId::new(),
            SaleHeader {
                sale_number: sale_number.to_string(),
                sale_date,
                customer_id: CustomerId::new(),
                customer_name: "Customer".to_string(),
                branch_id: BranchId::new(),
                branch_name: "Branch".to_string(),
            },
        );
        sale.add_item(SaleItem::new(
            ProductId::new(),
            "Widget",
            2,
            Decimal::from(50),
        ))
        .unwrap();
        sale
    }

    #[tokio::test]
    async fn create_and_get_by_id() {
        let repo = InMemorySaleRepository::new();
        let sale = create_test_sale("S-1", Utc::now());

        repo.create(sale.clone()).await.unwrap();

        let loaded = repo.get_by_id(sale.id()).await.unwrap();
        assert_eq!(loaded, Some(sale));
    }

    #[tokio::test]
    async fn get_missing_sale_returns_none() {
        let repo = InMemorySaleRepository::new();
        assert!(repo.get_by_id(SaleId::new()).await.unwrap().is_none());
        assert!(repo.get_by_sale_number("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_sale_number_is_rejected() {
        let repo = InMemorySaleRepository::new();
        repo.create(create_test_sale("S-1", Utc::now()))
            .await
            .unwrap();

        let result = repo.create(create_test_sale("S-1", Utc::now())).await;

        assert!(matches!(result, Err(StoreError::DuplicateSaleNumber(n)) if n == "S-1"));
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn get_by_sale_number() {
        let repo = InMemorySaleRepository::new();
        let sale = create_test_sale("S-42", Utc::now());
        repo.create(sale.clone()).await.unwrap();

        let loaded = repo.get_by_sale_number("S-42").await.unwrap().unwrap();
        assert_eq!(loaded.id(), sale.id());
    }

    #[tokio::test]
    async fn update_replaces_sale() {
        let repo = InMemorySaleRepository::new();
        let mut sale = create_test_sale("S-1", Utc::now());
        repo.create(sale.clone()).await.unwrap();

        let product_id = sale.items()[0].product_id();
        sale.cancel_item(product_id).unwrap();
        repo.update(sale.clone()).await.unwrap();

        let loaded = repo.get_by_id(sale.id()).await.unwrap().unwrap();
        assert!(loaded.items()[0].is_cancelled());
        assert_eq!(loaded.total_amount(), Decimal::ZERO);
    }

    #[tokio::test]
    async fn update_missing_sale_fails() {
        let repo = InMemorySaleRepository::new();
        let sale = create_test_sale("S-1", Utc::now());

        let result = repo.update(sale).await;
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn update_onto_taken_number_fails() {
        let repo = InMemorySaleRepository::new();
        repo.create(create_test_sale("S-1", Utc::now()))
            .await
            .unwrap();
        let mut other = create_test_sale("S-2", Utc::now());
        repo.create(other.clone()).await.unwrap();

        let mut header = other.header().clone();
        header.sale_number = "S-1".to_string();
        other.update_header(header).unwrap();

        let result = repo.update(other).await;
        assert!(matches!(result, Err(StoreError::DuplicateSaleNumber(_))));
    }

    #[tokio::test]
    async fn delete_sale() {
        let repo = InMemorySaleRepository::new();
        let sale = create_test_sale("S-1", Utc::now());
        repo.create(sale.clone()).await.unwrap();

        assert!(repo.delete(sale.id()).await.unwrap());
        assert!(!repo.delete(sale.id()).await.unwrap());
        assert_eq!(repo.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn filtered_pages_are_ordered_newest_first() {
        let repo = InMemorySaleRepository::new();
        let now = Utc::now();
        for i in 0..25 {
            repo.create(create_test_sale(&format!("S-{i:02}"), now - Duration::days(i)))
                .await
                .unwrap();
        }

        let first = repo.get_filtered(&SaleFilter::new()).await.unwrap();
        assert_eq!(first.len(), 10);
        assert_eq!(first[0].sale_number(), "S-00");
        assert_eq!(first[9].sale_number(), "S-09");

        let last = repo
            .get_filtered(&SaleFilter::new().page(3))
            .await
            .unwrap();
        assert_eq!(last.len(), 5);
        assert_eq!(last[4].sale_number(), "S-24");

        let beyond = repo
            .get_filtered(&SaleFilter::new().page(4))
            .await
            .unwrap();
        assert!(beyond.is_empty());

        assert_eq!(
            repo.get_filtered_count(&SaleFilter::new().page(4))
                .await
                .unwrap(),
            25
        );
    }

    #[tokio::test]
    async fn filtered_by_customer_and_dates() {
        let repo = InMemorySaleRepository::new();
        let now = Utc::now();
        let target = create_test_sale("S-1", now - Duration::days(2));
        let customer_id = target.customer_id();
        repo.create(target).await.unwrap();
        repo.create(create_test_sale("S-2", now)).await.unwrap();

        let filter = SaleFilter::new().customer_id(customer_id);
        assert_eq!(repo.get_filtered_count(&filter).await.unwrap(), 1);

        let filter = SaleFilter::new().start_date(now - Duration::days(1));
        let sales = repo.get_filtered(&filter).await.unwrap();
        assert_eq!(sales.len(), 1);
        assert_eq!(sales[0].sale_number(), "S-2");

        let filter = SaleFilter::new()
            .customer_id(customer_id)
            .start_date(now - Duration::days(1));
        assert_eq!(repo.get_filtered_count(&filter).await.unwrap(), 0);
    }
}
