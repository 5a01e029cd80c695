//! Sale CRUD, filtering, and aggregate queries.

use std::collections::HashMap;

use rusqlite::{Connection, ToSql};
use rust_decimal::Decimal;
use si_core::{
    cents_to_price, line_revenue_cents, price_to_cents, total_cents_to_price, Error, NewSale,
    ProductSummary, Result, Sale, SaleChanges, SaleFilter, SaleId,
};

use crate::models::{format_date, format_timestamp, now, FromRow, SALE_COLUMNS};

/// WHERE clause shared by every filtered query; bound by [`filter_params`].
///
/// Dates are stored as `YYYY-MM-DD` text, so string comparison gives the
/// inclusive calendar range.
const FILTER_CLAUSE: &str = "(?1 IS NULL OR sale_date >= ?1)
     AND (?2 IS NULL OR sale_date <= ?2)
     AND (?3 IS NULL OR product_name = ?3)";

/// Owned bind values for [`FILTER_CLAUSE`].
struct FilterParams {
    start_date: Option<String>,
    end_date: Option<String>,
    product_name: Option<String>,
}

impl FilterParams {
    fn new(filter: &SaleFilter) -> Result<Self> {
        filter.validate()?;
        let filter = filter.normalized();
        Ok(Self {
            start_date: filter.start_date.map(format_date),
            end_date: filter.end_date.map(format_date),
            product_name: filter.product_name,
        })
    }

    fn as_params(&self) -> [&dyn ToSql; 3] {
        [&self.start_date, &self.end_date, &self.product_name]
    }
}

/// Insert a new sale and return it with its generated id.
pub fn create_sale(conn: &Connection, new: &NewSale) -> Result<Sale> {
    new.validate()?;
    let price_cents = price_to_cents(new.price)?;
    let now = now();
    let ts = format_timestamp(now);

    conn.execute(
        "INSERT INTO sales (product_name, quantity, price_cents, sale_date, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        rusqlite::params![
            new.product_name,
            new.quantity,
            price_cents,
            format_date(new.sale_date),
            &ts,
            &ts,
        ],
    )
    .map_err(|e| Error::database(e.to_string()))?;

    Ok(Sale {
        id: SaleId::new(conn.last_insert_rowid()),
        product_name: new.product_name.clone(),
        quantity: new.quantity,
        price: cents_to_price(price_cents),
        sale_date: new.sale_date,
        created_at: now,
        updated_at: now,
    })
}

/// List sales matching `filter`, newest sale date first.
pub fn list_sales(conn: &Connection, filter: &SaleFilter) -> Result<Vec<Sale>> {
    let params = FilterParams::new(filter)?;
    let q = format!(
        "SELECT {SALE_COLUMNS} FROM sales WHERE {FILTER_CLAUSE}
         ORDER BY sale_date DESC, id DESC"
    );
    let mut stmt = conn.prepare(&q).map_err(|e| Error::database(e.to_string()))?;
    let rows = stmt
        .query_map(params.as_params().as_slice(), Sale::from_row)
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(rows)
}

/// Get a sale by ID.
pub fn get_sale(conn: &Connection, id: SaleId) -> Result<Option<Sale>> {
    let q = format!("SELECT {SALE_COLUMNS} FROM sales WHERE id = ?1");
    match conn.query_row(&q, [id.get()], Sale::from_row) {
        Ok(sale) => Ok(Some(sale)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e.to_string())),
    }
}

/// Apply `changes` to a sale. Fields left as `None` keep their stored value.
///
/// Returns `Ok(None)` when no sale has this id. An empty change set leaves the
/// row, including `updated_at`, untouched.
pub fn update_sale(conn: &Connection, id: SaleId, changes: &SaleChanges) -> Result<Option<Sale>> {
    changes.validate()?;
    if changes.is_empty() {
        return get_sale(conn, id);
    }

    let price_cents = changes.price.map(price_to_cents).transpose()?;
    let q = format!(
        "UPDATE sales SET
            product_name = COALESCE(?1, product_name),
            quantity     = COALESCE(?2, quantity),
            price_cents  = COALESCE(?3, price_cents),
            sale_date    = COALESCE(?4, sale_date),
            updated_at   = ?5
         WHERE id = ?6
         RETURNING {SALE_COLUMNS}"
    );

    let result = conn.query_row(
        &q,
        rusqlite::params![
            changes.product_name,
            changes.quantity,
            price_cents,
            changes.sale_date.map(format_date),
            format_timestamp(now()),
            id.get(),
        ],
        Sale::from_row,
    );

    match result {
        Ok(sale) => Ok(Some(sale)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e.to_string())),
    }
}

/// Delete a sale. Returns `false` when no sale has this id.
pub fn delete_sale(conn: &Connection, id: SaleId) -> Result<bool> {
    let n = conn
        .execute("DELETE FROM sales WHERE id = ?1", [id.get()])
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(n > 0)
}

/// Sum of `quantity * price` over matching sales; zero when nothing matches.
///
/// Summed in Rust as `i128` cents: SQLite integer arithmetic overflows to REAL
/// well within the range of valid sales.
pub fn total_revenue(conn: &Connection, filter: &SaleFilter) -> Result<Decimal> {
    let params = FilterParams::new(filter)?;
    let q = format!("SELECT quantity, price_cents FROM sales WHERE {FILTER_CLAUSE}");
    let mut stmt = conn.prepare(&q).map_err(|e| Error::database(e.to_string()))?;
    let mut rows = stmt
        .query(params.as_params().as_slice())
        .map_err(|e| Error::database(e.to_string()))?;

    let mut cents: i128 = 0;
    while let Some(row) = rows.next().map_err(|e| Error::database(e.to_string()))? {
        let quantity: i64 = row.get(0).map_err(|e| Error::database(e.to_string()))?;
        let price_cents: i64 = row.get(1).map_err(|e| Error::database(e.to_string()))?;
        cents = checked_total(cents, line_revenue_cents(quantity, price_cents))?;
    }
    total_cents_to_price(cents)
}

/// Sum of `quantity` over matching sales; zero when nothing matches.
pub fn total_items_sold(conn: &Connection, filter: &SaleFilter) -> Result<i64> {
    let params = FilterParams::new(filter)?;
    let q = format!("SELECT COALESCE(SUM(quantity), 0) FROM sales WHERE {FILTER_CLAUSE}");
    conn.query_row(&q, params.as_params().as_slice(), |row| row.get(0))
        .map_err(|e| Error::database(e.to_string()))
}

/// Best-selling products among matching sales, by units sold.
///
/// Ties are broken by revenue, then by product name. Grouped in Rust for the
/// same reason as [`total_revenue`].
pub fn top_products(
    conn: &Connection,
    filter: &SaleFilter,
    limit: u32,
) -> Result<Vec<ProductSummary>> {
    let params = FilterParams::new(filter)?;
    let q = format!("SELECT product_name, quantity, price_cents FROM sales WHERE {FILTER_CLAUSE}");
    let mut stmt = conn.prepare(&q).map_err(|e| Error::database(e.to_string()))?;
    let mut rows = stmt
        .query(params.as_params().as_slice())
        .map_err(|e| Error::database(e.to_string()))?;

    // product -> (units, revenue cents)
    let mut totals: HashMap<String, (i64, i128)> = HashMap::new();
    while let Some(row) = rows.next().map_err(|e| Error::database(e.to_string()))? {
        let name: String = row.get(0).map_err(|e| Error::database(e.to_string()))?;
        let quantity: i64 = row.get(1).map_err(|e| Error::database(e.to_string()))?;
        let price_cents: i64 = row.get(2).map_err(|e| Error::database(e.to_string()))?;

        let entry = totals.entry(name).or_insert((0, 0));
        entry.0 = entry
            .0
            .checked_add(quantity)
            .ok_or_else(|| Error::Internal("units sold overflowed".into()))?;
        entry.1 = checked_total(entry.1, line_revenue_cents(quantity, price_cents))?;
    }

    let mut ranked: Vec<(String, i64, i128)> = totals
        .into_iter()
        .map(|(name, (units, cents))| (name, units, cents))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(b.2.cmp(&a.2)).then(a.0.cmp(&b.0)));
    ranked.truncate(limit as usize);

    ranked
        .into_iter()
        .map(|(product_name, total_quantity, cents)| {
            Ok(ProductSummary {
                product_name,
                total_quantity,
                total_revenue: total_cents_to_price(cents)?,
            })
        })
        .collect()
}

fn checked_total(total: i128, add: i128) -> Result<i128> {
    total
        .checked_add(add)
        .ok_or_else(|| Error::Internal("revenue total overflowed".into()))
}
