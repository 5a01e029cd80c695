//! PostgreSQL store over sqlx.

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use si_core::{
    cents_to_price, price_to_cents, total_cents_to_price, Error, NewSale, ProductSummary, Result,
    Sale, SaleChanges, SaleFilter, SaleId,
};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;

use crate::models::{now, SALE_COLUMNS};
use crate::store::SaleStore;

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS sales (
        id           BIGSERIAL    PRIMARY KEY,
        product_name VARCHAR(255) NOT NULL,
        quantity     BIGINT       NOT NULL CONSTRAINT check_quantity_positive CHECK (quantity > 0),
        price_cents  BIGINT       NOT NULL CONSTRAINT check_price_non_negative CHECK (price_cents >= 0),
        sale_date    DATE         NOT NULL,
        created_at   TIMESTAMP    NOT NULL,
        updated_at   TIMESTAMP    NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_sales_product_name ON sales(product_name)",
    "CREATE INDEX IF NOT EXISTS idx_sales_sale_date ON sales(sale_date)",
    "CREATE INDEX IF NOT EXISTS idx_sale_date_product ON sales(sale_date, product_name)",
];

const FILTER_CLAUSE: &str = "($1::date IS NULL OR sale_date >= $1)
     AND ($2::date IS NULL OR sale_date <= $2)
     AND ($3::text IS NULL OR product_name = $3)";

/// PostgreSQL-backed store.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect(url)
            .await
            .map_err(Error::database)?;
        Ok(Self { pool })
    }

    /// Create the sales table and indexes if they are missing.
    pub async fn migrate(&self) -> Result<()> {
        for stmt in SCHEMA {
            sqlx::query(stmt)
                .execute(&self.pool)
                .await
                .map_err(|e| Error::database(format!("Schema setup failed: {e}")))?;
        }
        tracing::info!("PostgreSQL schema ready");
        Ok(())
    }
}

fn sale_from_row(row: &PgRow) -> std::result::Result<Sale, sqlx::Error> {
    Ok(Sale {
        id: SaleId::new(row.try_get("id")?),
        product_name: row.try_get("product_name")?,
        quantity: row.try_get("quantity")?,
        price: cents_to_price(row.try_get("price_cents")?),
        sale_date: row.try_get("sale_date")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

type FilterBinds = (Option<NaiveDate>, Option<NaiveDate>, Option<String>);

fn filter_binds(filter: &SaleFilter) -> Result<FilterBinds> {
    filter.validate()?;
    let f = filter.normalized();
    Ok((f.start_date, f.end_date, f.product_name))
}

/// Revenue sums are NUMERIC so they cannot overflow BIGINT; bring the whole
/// cent amount back to a two-place price.
fn numeric_cents_to_price(mut cents: Decimal) -> Result<Decimal> {
    cents.rescale(0);
    total_cents_to_price(cents.mantissa())
}

#[async_trait]
impl SaleStore for PgStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(Error::database)?;
        Ok(())
    }

    async fn create_sale(&self, new: NewSale) -> Result<Sale> {
        new.validate()?;
        let price_cents = price_to_cents(new.price)?;
        let now = now();
        let q = format!(
            "INSERT INTO sales (product_name, quantity, price_cents, sale_date, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $5)
             RETURNING {SALE_COLUMNS}"
        );
        let row = sqlx::query(&q)
            .bind(&new.product_name)
            .bind(new.quantity)
            .bind(price_cents)
            .bind(new.sale_date)
            .bind(now)
            .fetch_one(&self.pool)
            .await
            .map_err(Error::database)?;
        sale_from_row(&row).map_err(Error::database)
    }

    async fn list_sales(&self, filter: SaleFilter) -> Result<Vec<Sale>> {
        let (start, end, product) = filter_binds(&filter)?;
        let q = format!(
            "SELECT {SALE_COLUMNS} FROM sales WHERE {FILTER_CLAUSE}
             ORDER BY sale_date DESC, id DESC"
        );
        let rows = sqlx::query(&q)
            .bind(start)
            .bind(end)
            .bind(product)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::database)?;
        rows.iter()
            .map(sale_from_row)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::database)
    }

    async fn get_sale(&self, id: SaleId) -> Result<Option<Sale>> {
        let q = format!("SELECT {SALE_COLUMNS} FROM sales WHERE id = $1");
        let row = sqlx::query(&q)
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::database)?;
        row.as_ref()
            .map(sale_from_row)
            .transpose()
            .map_err(Error::database)
    }

    async fn update_sale(&self, id: SaleId, changes: SaleChanges) -> Result<Option<Sale>> {
        changes.validate()?;
        if changes.is_empty() {
            return self.get_sale(id).await;
        }

        let price_cents = changes.price.map(price_to_cents).transpose()?;
        let q = format!(
            "UPDATE sales SET
                product_name = COALESCE($1, product_name),
                quantity     = COALESCE($2, quantity),
                price_cents  = COALESCE($3, price_cents),
                sale_date    = COALESCE($4, sale_date),
                updated_at   = $5
             WHERE id = $6
             RETURNING {SALE_COLUMNS}"
        );
        let row = sqlx::query(&q)
            .bind(changes.product_name)
            .bind(changes.quantity)
            .bind(price_cents)
            .bind(changes.sale_date)
            .bind(now())
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::database)?;
        row.as_ref()
            .map(sale_from_row)
            .transpose()
            .map_err(Error::database)
    }

    async fn delete_sale(&self, id: SaleId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM sales WHERE id = $1")
            .bind(id.get())
            .execute(&self.pool)
            .await
            .map_err(Error::database)?;
        Ok(result.rows_affected() > 0)
    }

    async fn total_revenue(&self, filter: SaleFilter) -> Result<Decimal> {
        let (start, end, product) = filter_binds(&filter)?;
        let q = format!(
            "SELECT COALESCE(SUM(quantity::NUMERIC * price_cents), 0) FROM sales WHERE {FILTER_CLAUSE}"
        );
        let cents: Decimal = sqlx::query_scalar(&q)
            .bind(start)
            .bind(end)
            .bind(product)
            .fetch_one(&self.pool)
            .await
            .map_err(Error::database)?;
        numeric_cents_to_price(cents)
    }

    async fn total_items_sold(&self, filter: SaleFilter) -> Result<i64> {
        let (start, end, product) = filter_binds(&filter)?;
        let q = format!(
            "SELECT COALESCE(SUM(quantity), 0)::BIGINT FROM sales WHERE {FILTER_CLAUSE}"
        );
        sqlx::query_scalar(&q)
            .bind(start)
            .bind(end)
            .bind(product)
            .fetch_one(&self.pool)
            .await
            .map_err(Error::database)
    }

    async fn top_products(&self, filter: SaleFilter, limit: u32) -> Result<Vec<ProductSummary>> {
        let (start, end, product) = filter_binds(&filter)?;
        let q = format!(
            "SELECT product_name,
                    SUM(quantity)::BIGINT AS total_quantity,
                    SUM(quantity::NUMERIC * price_cents) AS revenue_cents
             FROM sales WHERE {FILTER_CLAUSE}
             GROUP BY product_name
             ORDER BY total_quantity DESC, revenue_cents DESC, product_name ASC
             LIMIT $4"
        );
        let rows = sqlx::query(&q)
            .bind(start)
            .bind(end)
            .bind(product)
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await
            .map_err(Error::database)?;

        rows.iter()
            .map(|row| -> Result<ProductSummary> {
                let revenue_cents: Decimal = row.try_get("revenue_cents").map_err(Error::database)?;
                Ok(ProductSummary {
                    product_name: row.try_get("product_name").map_err(Error::database)?,
                    total_quantity: row.try_get("total_quantity").map_err(Error::database)?,
                    total_revenue: numeric_cents_to_price(revenue_cents)?,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn numeric_cents_keep_two_places() {
        let price = numeric_cents_to_price(Decimal::from_str("123456").unwrap()).unwrap();
        assert_eq!(price.to_string(), "1234.56");
        let price = numeric_cents_to_price(Decimal::from_str("500.000").unwrap()).unwrap();
        assert_eq!(price.to_string(), "5.00");
        let huge = Decimal::from_str("42949672930000000000").unwrap();
        assert_eq!(
            numeric_cents_to_price(huge).unwrap().to_string(),
            "429496729300000000.00"
        );
    }

    /// Runs the PostgreSQL queries against `TEST_DATABASE_URL`, e.g.
    /// `TEST_DATABASE_URL=postgres://localhost/sales_test cargo test -- --ignored`.
    #[tokio::test]
    #[ignore = "needs a PostgreSQL server in TEST_DATABASE_URL"]
    async fn pg_store_round_trip() {
        let Ok(url) = std::env::var("TEST_DATABASE_URL") else {
            return;
        };
        let store = PgStore::connect(&url, 2).await.unwrap();
        store.migrate().await.unwrap();
        store.ping().await.unwrap();

        // A product name of its own keeps reruns and shared databases apart.
        let product = format!("pg-test-{}", now().and_utc().timestamp_micros());
        let mine = SaleFilter {
            product_name: Some(product.clone()),
            ..Default::default()
        };
        let sale_on = |quantity: i64, price: &str, day: u32| NewSale {
            product_name: product.clone(),
            quantity,
            price: Decimal::from_str(price).unwrap(),
            sale_date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
        };

        let a = store.create_sale(sale_on(2, "999.99", 10)).await.unwrap();
        let b = store
            .create_sale(sale_on(si_core::MAX_QUANTITY, "99999999.99", 20))
            .await
            .unwrap();
        assert_eq!(store.get_sale(a.id).await.unwrap(), Some(a.clone()));

        let listed = store.list_sales(mine.clone()).await.unwrap();
        assert_eq!(listed.iter().map(|s| s.id).collect::<Vec<_>>(), vec![b.id, a.id]);

        let january_10 = SaleFilter {
            start_date: Some(a.sale_date),
            end_date: Some(a.sale_date),
            ..mine.clone()
        };
        assert_eq!(store.list_sales(january_10).await.unwrap().len(), 1);

        assert_eq!(
            store.total_revenue(mine.clone()).await.unwrap().to_string(),
            "214748364678527163.51"
        );
        assert_eq!(
            store.total_items_sold(mine.clone()).await.unwrap(),
            si_core::MAX_QUANTITY + 2
        );
        let top = store.top_products(mine.clone(), 5).await.unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].total_quantity, si_core::MAX_QUANTITY + 2);

        let changes = SaleChanges {
            quantity: Some(3),
            ..Default::default()
        };
        let updated = store.update_sale(a.id, changes).await.unwrap().unwrap();
        assert_eq!(updated.quantity, 3);
        assert_eq!(updated.created_at, a.created_at);

        assert!(store.delete_sale(a.id).await.unwrap());
        assert!(store.delete_sale(b.id).await.unwrap());
        assert!(store.get_sale(a.id).await.unwrap().is_none());
        assert!(!store.delete_sale(a.id).await.unwrap());
    }
}
