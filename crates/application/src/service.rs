//! Sale service coordinating validation, the aggregate, the store, and
//! outbound notifications.

use std::collections::HashSet;
use std::sync::Arc;

use common::{ProductId, SaleId};
use domain::{Sale, SaleEvent, SaleModification};
use rust_decimal::Decimal;
use sale_store::SaleRepository;

use crate::commands::{
    CancelSale, CancelSaleItem, CreateSale, DeleteSale, ListSales, SalePage, UpdateSale,
};
use crate::error::{ApplicationError, Result};
use crate::publisher::EventPublisher;
use crate::validation;

/// Service for managing sales.
///
/// Each command loads the sale, applies the change through the aggregate,
/// persists it, then publishes the matching events. Publishing happens after
/// the write and a failing publisher never undoes it.
pub struct SaleService<R: SaleRepository> {
    repository: R,
    publisher: Arc<dyn EventPublisher>,
}

impl<R: SaleRepository> SaleService<R> {
    /// Creates a new sale service.
    pub fn new(repository: R, publisher: Arc<dyn EventPublisher>) -> Self {
        Self {
            repository,
            publisher,
        }
    }

    /// Returns a reference to the underlying repository.
    pub fn repository(&self) -> &R {
        &self.repository
    }

    /// Registers a new sale with its items.
    #[tracing::instrument(skip(self, cmd), fields(sale_number = %cmd.sale_number))]
    pub async fn create_sale(&self, mut cmd: CreateSale) -> Result<Sale> {
        cmd.normalize();
        validation::validate_create_sale(&cmd).map_err(ApplicationError::Validation)?;
        self.ensure_number_free(&cmd.sale_number, None).await?;

        let mut sale = Sale::new(cmd.sale_id, cmd.header());
        for input in &cmd.items {
            sale.add_item(input.to_item())?;
        }

        let sale = self.repository.create(sale).await?;
        metrics::counter!("sales_created_total").increment(1);
        tracing::info!(sale_id = %sale.id(), total_amount = %sale.total_amount(), "sale created");

        self.publish(SaleEvent::sale_created(&sale)).await;
        Ok(sale)
    }

    /// Overwrites a sale's header and reconciles its items with the command.
    #[tracing::instrument(skip(self, cmd), fields(sale_id = %cmd.sale_id))]
    pub async fn update_sale(&self, mut cmd: UpdateSale) -> Result<Sale> {
        cmd.normalize();
        validation::validate_update_sale(&cmd).map_err(ApplicationError::Validation)?;

        let mut sale = self.load(cmd.sale_id).await?;
        if sale.sale_number() != cmd.sale_number {
            self.ensure_number_free(&cmd.sale_number, Some(sale.id()))
                .await?;
        }

        sale.update_header(cmd.header())?;

        let requested: HashSet<ProductId> = cmd.items.iter().map(|i| i.product_id).collect();
        let dropped: Vec<(ProductId, Decimal)> = sale
            .active_items()
            .filter(|item| !requested.contains(&item.product_id()))
            .map(|item| (item.product_id(), item.total()))
            .collect();

        let mut added = 0;
        let mut modified = 0;
        for input in &cmd.items {
            let unchanged = sale.find_active_item(input.product_id).is_some_and(|item| {
                item.quantity() == input.quantity
                    && item.unit_price() == input.unit_price
                    && item.product_name() == input.product_name
            });

            if sale.try_modify_item(input.product_id, input.quantity, input.unit_price)? {
                sale.try_rename_item(input.product_id, &input.product_name)?;
                if !unchanged {
                    modified += 1;
                }
            } else {
                sale.add_item(input.to_item())?;
                added += 1;
            }
        }

        for (product_id, _) in &dropped {
            sale.cancel_item(*product_id)?;
        }

        let modification = match (added, modified, dropped.len()) {
            (0, 0, 0) => SaleModification::HeaderUpdated,
            (_, 0, 0) => SaleModification::ItemAdded,
            (0, _, 0) => SaleModification::ItemModified,
            _ => SaleModification::ItemsChanged,
        };

        let sale = self.repository.update(sale).await?;
        metrics::counter!("sales_updated_total").increment(1);
        tracing::info!(
            sale_id = %sale.id(),
            added,
            modified,
            cancelled = dropped.len(),
            "sale updated"
        );

        self.publish(SaleEvent::sale_modified(&sale, modification))
            .await;
        for (product_id, amount) in dropped {
            metrics::counter!("sale_items_cancelled_total").increment(1);
            self.publish(SaleEvent::item_cancelled(&sale, product_id, amount))
                .await;
        }

        Ok(sale)
    }

    /// Cancels a whole sale. Items and the last computed total are kept.
    #[tracing::instrument(skip(self, cmd), fields(sale_id = %cmd.sale_id))]
    pub async fn cancel_sale(&self, cmd: CancelSale) -> Result<Sale> {
        let mut sale = self.load(cmd.sale_id).await?;
        sale.cancel()?;

        let sale = self.repository.update(sale).await?;
        metrics::counter!("sales_cancelled_total").increment(1);
        tracing::info!(sale_id = %sale.id(), "sale cancelled");

        self.publish(SaleEvent::sale_cancelled(&sale, cmd.reason))
            .await;
        Ok(sale)
    }

    /// Cancels the active item for one product.
    #[tracing::instrument(skip(self, cmd), fields(sale_id = %cmd.sale_id, product_id = %cmd.product_id))]
    pub async fn cancel_sale_item(&self, cmd: CancelSaleItem) -> Result<Sale> {
        let mut sale = self.load(cmd.sale_id).await?;

        let amount = sale
            .find_active_item(cmd.product_id)
            .map(|item| item.total())
            .unwrap_or_default();

        if !sale.try_cancel_item(cmd.product_id)? {
            return Err(ApplicationError::NotFound {
                resource: "Sale item",
                id: cmd.product_id.to_string(),
            });
        }

        let sale = self.repository.update(sale).await?;
        metrics::counter!("sale_items_cancelled_total").increment(1);
        tracing::info!(sale_id = %sale.id(), total_amount = %sale.total_amount(), "sale item cancelled");

        self.publish(SaleEvent::item_cancelled(&sale, cmd.product_id, amount))
            .await;
        Ok(sale)
    }

    /// Removes a sale permanently.
    #[tracing::instrument(skip(self, cmd), fields(sale_id = %cmd.sale_id))]
    pub async fn delete_sale(&self, cmd: DeleteSale) -> Result<()> {
        if !self.repository.delete(cmd.sale_id).await? {
            return Err(ApplicationError::sale_not_found(cmd.sale_id));
        }

        metrics::counter!("sales_deleted_total").increment(1);
        tracing::info!(sale_id = %cmd.sale_id, "sale deleted");
        Ok(())
    }

    /// Loads a sale by ID.
    ///
    /// Returns None if the sale doesn't exist.
    #[tracing::instrument(skip(self))]
    pub async fn get_sale(&self, sale_id: SaleId) -> Result<Option<Sale>> {
        Ok(self.repository.get_by_id(sale_id).await?)
    }

    /// Loads a sale by its business number.
    #[tracing::instrument(skip(self))]
    pub async fn get_sale_by_number(&self, sale_number: &str) -> Result<Option<Sale>> {
        Ok(self.repository.get_by_sale_number(sale_number).await?)
    }

    /// Returns one page of sales matching the query.
    #[tracing::instrument(skip(self))]
    pub async fn list_sales(&self, query: ListSales) -> Result<SalePage> {
        validation::validate_list_sales(&query).map_err(ApplicationError::Validation)?;

        let filter = query.to_filter();
        let total_count = self.repository.get_filtered_count(&filter).await?;
        let items = self.repository.get_filtered(&filter).await?;

        Ok(SalePage::new(
            items,
            total_count,
            query.page,
            query.page_size,
        ))
    }

    async fn load(&self, sale_id: SaleId) -> Result<Sale> {
        self.repository
            .get_by_id(sale_id)
            .await?
            .ok_or_else(|| ApplicationError::sale_not_found(sale_id))
    }

    async fn ensure_number_free(&self, sale_number: &str, owner: Option<SaleId>) -> Result<()> {
        if let Some(existing) = self.repository.get_by_sale_number(sale_number).await?
            && Some(existing.id()) != owner
        {
            return Err(ApplicationError::Conflict(format!(
                "Sale number {sale_number} is already in use"
            )));
        }
        Ok(())
    }

    async fn publish(&self, event: SaleEvent) {
        if let Err(e) = self.publisher.publish(&event).await {
            tracing::warn!(
                error = %e,
                event_type = event.event_type(),
                sale_id = %event.sale_id(),
                "failed to publish sale event"
            );
        }
    }
}
