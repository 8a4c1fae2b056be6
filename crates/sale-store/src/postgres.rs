use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{BranchId, CustomerId, ProductId, SaleId, SaleItemId};
use domain::{Sale, SaleHeader, SaleItem, SaleStatus};
use rust_decimal::Decimal;
use sqlx::{
    PgPool, Postgres, Row, Transaction,
    postgres::{PgArguments, PgRow},
    query::Query,
};
use uuid::Uuid;

use crate::{Result, SaleFilter, StoreError, store::SaleRepository};

const SALE_COLUMNS: &str = "id, sale_number, sale_date, customer_id, customer_name, branch_id, branch_name, status, created_at, updated_at";

const ITEM_COLUMNS: &str =
    "id, sale_id, product_id, product_name, quantity, unit_price, discount, total, is_cancelled";

/// PostgreSQL-backed sale repository.
#[derive(Clone)]
pub struct PostgresSaleRepository {
    pool: PgPool,
}

impl PostgresSaleRepository {
    /// Creates a new PostgreSQL sale repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_item(row: &PgRow) -> Result<SaleItem> {
        let quantity: i32 = row.try_get("quantity")?;
        let quantity = u32::try_from(quantity)
            .map_err(|_| StoreError::CorruptRecord(format!("negative quantity {quantity}")))?;

        Ok(SaleItem::restore(
            SaleItemId::from_uuid(row.try_get::<Uuid, _>("id")?),
            ProductId::from_uuid(row.try_get::<Uuid, _>("product_id")?),
            row.try_get::<String, _>("product_name")?,
            quantity,
            row.try_get::<Decimal, _>("unit_price")?,
            row.try_get::<Decimal, _>("discount")?,
            row.try_get::<Decimal, _>("total")?,
            row.try_get("is_cancelled")?,
        ))
    }

    fn row_to_sale(row: &PgRow, items: Vec<SaleItem>) -> Result<Sale> {
        let status: String = row.try_get("status")?;
        let status: SaleStatus = status.parse().map_err(StoreError::CorruptRecord)?;

        let header = SaleHeader {
            sale_number: row.try_get("sale_number")?,
            sale_date: row.try_get::<DateTime<Utc>, _>("sale_date")?,
            customer_id: CustomerId::from_uuid(row.try_get::<Uuid, _>("customer_id")?),
            customer_name: row.try_get("customer_name")?,
            branch_id: BranchId::from_uuid(row.try_get::<Uuid, _>("branch_id")?),
            branch_name: row.try_get("branch_name")?,
        };

        Sale::restore(
            SaleId::from_uuid(row.try_get::<Uuid, _>("id")?),
            header,
            items,
            status,
            row.try_get("created_at")?,
            row.try_get("updated_at")?,
        )
        .map_err(|e| StoreError::CorruptRecord(e.to_string()))
    }

    /// Loads the items of every listed sale, grouped by sale and in position order.
    async fn load_items(&self, sale_ids: &[Uuid]) -> Result<HashMap<Uuid, Vec<SaleItem>>> {
        let rows = sqlx::query(&format!(
            "SELECT {ITEM_COLUMNS} FROM sale_items WHERE sale_id = ANY($1) ORDER BY sale_id, position ASC"
        ))
        .bind(sale_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut grouped: HashMap<Uuid, Vec<SaleItem>> = HashMap::new();
        for row in &rows {
            let sale_id: Uuid = row.try_get("sale_id")?;
            grouped
                .entry(sale_id)
                .or_default()
                .push(Self::row_to_item(row)?);
        }
        Ok(grouped)
    }

    async fn rows_to_sales(&self, rows: Vec<PgRow>) -> Result<Vec<Sale>> {
        let ids = rows
            .iter()
            .map(|row| row.try_get::<Uuid, _>("id"))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let mut items = self.load_items(&ids).await?;

        rows.iter()
            .zip(ids)
            .map(|(row, id)| Self::row_to_sale(row, items.remove(&id).unwrap_or_default()))
            .collect()
    }

    async fn row_to_optional_sale(&self, row: Option<PgRow>) -> Result<Option<Sale>> {
        match row {
            Some(row) => Ok(self.rows_to_sales(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn insert_items(tx: &mut Transaction<'_, Postgres>, sale: &Sale) -> Result<()> {
        for (position, item) in sale.items().iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO sale_items (id, sale_id, position, product_id, product_name, quantity, unit_price, discount, total, is_cancelled)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                "#,
            )
            .bind(item.id().as_uuid())
            .bind(sale.id().as_uuid())
            .bind(position as i32)
            .bind(item.product_id().as_uuid())
            .bind(item.product_name())
            .bind(item.quantity() as i32)
            .bind(item.unit_price())
            .bind(item.discount())
            .bind(item.total())
            .bind(item.is_cancelled())
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }

    /// Maps a unique-constraint violation on the sale number to `DuplicateSaleNumber`.
    fn map_write_error(e: sqlx::Error, sale: &Sale) -> StoreError {
        if let sqlx::Error::Database(ref db_err) = e
            && db_err.constraint() == Some("unique_sale_number")
        {
            return StoreError::DuplicateSaleNumber(sale.sale_number().to_string());
        }
        StoreError::Database(e)
    }
}

/// Appends the WHERE clauses for `filter`, numbering placeholders from 1.
///
/// Returns the next free placeholder number.
fn push_filter_clauses(sql: &mut String, filter: &SaleFilter) -> usize {
    let mut param_count = 0;

    if filter.customer_id.is_some() {
        param_count += 1;
        sql.push_str(&format!(" AND customer_id = ${param_count}"));
    }
    if filter.branch_id.is_some() {
        param_count += 1;
        sql.push_str(&format!(" AND branch_id = ${param_count}"));
    }
    if filter.start_date.is_some() {
        param_count += 1;
        sql.push_str(&format!(" AND sale_date >= ${param_count}"));
    }
    if filter.end_date.is_some() {
        param_count += 1;
        sql.push_str(&format!(" AND sale_date <= ${param_count}"));
    }

    param_count + 1
}

/// Binds the values matching the clauses written by [`push_filter_clauses`].
fn bind_filter<'q>(
    mut query: Query<'q, Postgres, PgArguments>,
    filter: &SaleFilter,
) -> Query<'q, Postgres, PgArguments> {
    if let Some(customer_id) = filter.customer_id {
        query = query.bind(customer_id.as_uuid());
    }
    if let Some(branch_id) = filter.branch_id {
        query = query.bind(branch_id.as_uuid());
    }
    if let Some(start) = filter.start_date {
        query = query.bind(start);
    }
    if let Some(end) = filter.end_date {
        query = query.bind(end);
    }
    query
}

#[async_trait]
impl SaleRepository for PostgresSaleRepository {
    #[tracing::instrument(skip(self, sale), fields(sale_id = %sale.id()))]
    async fn create(&self, sale: Sale) -> Result<Sale> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO sales (id, sale_number, sale_date, customer_id, customer_name, branch_id, branch_name, total_amount, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(sale.id().as_uuid())
        .bind(sale.sale_number())
        .bind(sale.sale_date())
        .bind(sale.customer_id().as_uuid())
        .bind(sale.customer_name())
        .bind(sale.branch_id().as_uuid())
        .bind(sale.branch_name())
        .bind(sale.total_amount())
        .bind(sale.status().as_str())
        .bind(sale.created_at())
        .bind(sale.updated_at())
        .execute(&mut *tx)
        .await
        .map_err(|e| Self::map_write_error(e, &sale))?;

        Self::insert_items(&mut tx, &sale).await?;

        tx.commit().await?;
        Ok(sale)
    }

    async fn get_by_id(&self, id: SaleId) -> Result<Option<Sale>> {
        let row = sqlx::query(&format!("SELECT {SALE_COLUMNS} FROM sales WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        self.row_to_optional_sale(row).await
    }

    async fn get_by_sale_number(&self, sale_number: &str) -> Result<Option<Sale>> {
        let row = sqlx::query(&format!(
            "SELECT {SALE_COLUMNS} FROM sales WHERE sale_number = $1"
        ))
        .bind(sale_number)
        .fetch_optional(&self.pool)
        .await?;

        self.row_to_optional_sale(row).await
    }

    async fn get_filtered(&self, filter: &SaleFilter) -> Result<Vec<Sale>> {
        let mut sql = format!("SELECT {SALE_COLUMNS} FROM sales WHERE 1=1");
        let next_param = push_filter_clauses(&mut sql, filter);
        sql.push_str(&format!(
            " ORDER BY sale_date DESC, sale_number ASC LIMIT ${next_param} OFFSET ${}",
            next_param + 1
        ));

        let rows = bind_filter(sqlx::query(&sql), filter)
            .bind(i64::from(filter.page_size))
            .bind(i64::try_from(filter.offset()).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await?;

        self.rows_to_sales(rows).await
    }

    async fn get_filtered_count(&self, filter: &SaleFilter) -> Result<u64> {
        let mut sql = String::from("SELECT COUNT(*) AS total FROM sales WHERE 1=1");
        push_filter_clauses(&mut sql, filter);

        let row = bind_filter(sqlx::query(&sql), filter)
            .fetch_one(&self.pool)
            .await?;
        let total: i64 = row.try_get("total")?;

        Ok(total.max(0) as u64)
    }

    #[tracing::instrument(skip(self, sale), fields(sale_id = %sale.id()))]
    async fn update(&self, sale: Sale) -> Result<Sale> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE sales SET
                sale_number = $2,
                sale_date = $3,
                customer_id = $4,
                customer_name = $5,
                branch_id = $6,
                branch_name = $7,
                total_amount = $8,
                status = $9,
                updated_at = $10
            WHERE id = $1
            "#,
        )
        .bind(sale.id().as_uuid())
        .bind(sale.sale_number())
        .bind(sale.sale_date())
        .bind(sale.customer_id().as_uuid())
        .bind(sale.customer_name())
        .bind(sale.branch_id().as_uuid())
        .bind(sale.branch_name())
        .bind(sale.total_amount())
        .bind(sale.status().as_str())
        .bind(sale.updated_at())
        .execute(&mut *tx)
        .await
        .map_err(|e| Self::map_write_error(e, &sale))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(sale.id()));
        }

        // Items have no lifecycle of their own; replace them wholesale
        sqlx::query("DELETE FROM sale_items WHERE sale_id = $1")
            .bind(sale.id().as_uuid())
            .execute(&mut *tx)
            .await?;
        Self::insert_items(&mut tx, &sale).await?;

        tx.commit().await?;
        Ok(sale)
    }

    #[tracing::instrument(skip(self))]
    async fn delete(&self, id: SaleId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM sales WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn count(&self) -> Result<u64> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sales")
            .fetch_one(&self.pool)
            .await?;

        Ok(total.max(0) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_clauses_number_placeholders_in_bind_order() {
        let filter = SaleFilter::new()
            .branch_id(BranchId::new())
            .end_date(Utc::now());
        let mut sql = String::new();

        let next = push_filter_clauses(&mut sql, &filter);

        assert_eq!(sql, " AND branch_id = $1 AND sale_date <= $2");
        assert_eq!(next, 3);
    }

    #[test]
    fn empty_filter_adds_no_clauses() {
        let mut sql = String::new();
        let next = push_filter_clauses(&mut sql, &SaleFilter::new());
        assert!(sql.is_empty());
        assert_eq!(next, 1);
    }
}
