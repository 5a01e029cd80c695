//! Sale domain types and the field rules shared by every storage backend.
//!
//! Prices travel through the API as [`Decimal`] values with two fractional
//! digits and are persisted as whole cents, so arithmetic on stored values is
//! always exact.

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Result;
use crate::Error;

/// Longest accepted product name, in characters.
pub const MAX_PRODUCT_NAME_LEN: usize = 255;

/// Largest price representable as NUMERIC(10,2), in cents.
pub const MAX_PRICE_CENTS: i64 = 9_999_999_999;

/// Largest quantity of a single sale (the range of a 32-bit INTEGER column).
pub const MAX_QUANTITY: i64 = i32::MAX as i64;

/// Calendar years a sale date may fall in. Dates outside this range do not
/// sort correctly as `YYYY-MM-DD` text.
pub const SALE_YEARS: std::ops::RangeInclusive<i32> = 1..=9999;

// ---------------------------------------------------------------------------
// SaleId
// ---------------------------------------------------------------------------

/// Database-generated identifier of a sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SaleId(i64);

impl SaleId {
    #[must_use]
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    #[must_use]
    pub fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for SaleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SaleId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        s.parse::<i64>().map(Self)
    }
}

impl From<i64> for SaleId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

// ---------------------------------------------------------------------------
// Sale
// ---------------------------------------------------------------------------

/// A persisted sale record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sale {
    pub id: SaleId,
    pub product_name: String,
    pub quantity: i64,
    pub price: Decimal,
    pub sale_date: NaiveDate,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Fields required to record a new sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSale {
    pub product_name: String,
    pub quantity: i64,
    pub price: Decimal,
    pub sale_date: NaiveDate,
}

impl NewSale {
    /// Check every field against the sale rules.
    pub fn validate(&self) -> Result<()> {
        validate_product_name(&self.product_name)?;
        validate_quantity(self.quantity)?;
        price_to_cents(self.price)?;
        validate_date("sale_date", self.sale_date)?;
        Ok(())
    }
}

/// Partial update of a sale. `None` leaves the stored value unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SaleChanges {
    pub product_name: Option<String>,
    pub quantity: Option<i64>,
    pub price: Option<Decimal>,
    pub sale_date: Option<NaiveDate>,
}

impl SaleChanges {
    /// Check the provided fields against the sale rules.
    pub fn validate(&self) -> Result<()> {
        if let Some(ref name) = self.product_name {
            validate_product_name(name)?;
        }
        if let Some(quantity) = self.quantity {
            validate_quantity(quantity)?;
        }
        if let Some(price) = self.price {
            price_to_cents(price)?;
        }
        if let Some(date) = self.sale_date {
            validate_date("sale_date", date)?;
        }
        Ok(())
    }

    /// True when no field would change.
    pub fn is_empty(&self) -> bool {
        self.product_name.is_none()
            && self.quantity.is_none()
            && self.price.is_none()
            && self.sale_date.is_none()
    }
}

/// Optional restrictions applied when listing or aggregating sales.
///
/// Both date bounds are inclusive; `product_name` is an exact match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleFilter {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub product_name: Option<String>,
}

impl SaleFilter {
    /// Reject date bounds outside [`SALE_YEARS`].
    pub fn validate(&self) -> Result<()> {
        if let Some(date) = self.start_date {
            validate_date("start_date", date)?;
        }
        if let Some(date) = self.end_date {
            validate_date("end_date", date)?;
        }
        Ok(())
    }

    /// Copy of this filter with an empty product name treated as absent.
    pub fn normalized(&self) -> Self {
        Self {
            start_date: self.start_date,
            end_date: self.end_date,
            product_name: self.product_name.clone().filter(|n| !n.is_empty()),
        }
    }

    /// True when the filter matches every sale.
    pub fn is_empty(&self) -> bool {
        let n = self.normalized();
        n.start_date.is_none() && n.end_date.is_none() && n.product_name.is_none()
    }
}

/// Aggregated sales of one product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductSummary {
    pub product_name: String,
    pub total_quantity: i64,
    pub total_revenue: Decimal,
}

// ---------------------------------------------------------------------------
// Field rules
// ---------------------------------------------------------------------------

fn validate_product_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::validation("product_name must not be empty"));
    }
    if name.chars().count() > MAX_PRODUCT_NAME_LEN {
        return Err(Error::validation(format!(
            "product_name must be at most {MAX_PRODUCT_NAME_LEN} characters"
        )));
    }
    Ok(())
}

fn validate_quantity(quantity: i64) -> Result<()> {
    if quantity <= 0 {
        return Err(Error::validation("quantity must be greater than 0"));
    }
    if quantity > MAX_QUANTITY {
        return Err(Error::validation(format!(
            "quantity must be at most {MAX_QUANTITY}"
        )));
    }
    Ok(())
}

fn validate_date(field: &str, date: NaiveDate) -> Result<()> {
    if !SALE_YEARS.contains(&date.year()) {
        return Err(Error::validation(format!(
            "{field} year must be between {} and {}",
            SALE_YEARS.start(),
            SALE_YEARS.end()
        )));
    }
    Ok(())
}

/// Convert a validated price into whole cents.
pub fn price_to_cents(price: Decimal) -> Result<i64> {
    if price.is_sign_negative() && !price.is_zero() {
        return Err(Error::validation("price must be greater than or equal to 0"));
    }
    if price.normalize().scale() > 2 {
        return Err(Error::validation("price must have at most 2 decimal places"));
    }

    let cents = price
        .checked_mul(Decimal::ONE_HUNDRED)
        .and_then(|c| c.trunc().to_i64())
        .filter(|c| *c <= MAX_PRICE_CENTS)
        .ok_or_else(|| Error::validation("price must be less than 100000000"))?;

    Ok(cents)
}

/// Convert stored cents back into a two-place price.
pub fn cents_to_price(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}

/// Revenue of one stored sale, in cents. Cannot overflow for validated rows.
pub fn line_revenue_cents(quantity: i64, price_cents: i64) -> i128 {
    i128::from(quantity) * i128::from(price_cents)
}

/// Convert an aggregated cent amount into a two-place price.
pub fn total_cents_to_price(cents: i128) -> Result<Decimal> {
    Decimal::try_from_i128_with_scale(cents, 2)
        .map_err(|_| Error::Internal(format!("revenue of {cents} cents is out of range")))
}
