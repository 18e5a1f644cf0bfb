//! Price observations and the daily price feed abstraction

use crate::core::ledger::{Keyed, Ledger};
use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Pence per pound. Feed prices are quoted in pounds and stored in pence.
pub const MINOR_PER_MAJOR: Decimal = Decimal::ONE_HUNDRED;

/// Converts a price quoted in major units (pounds) to minor units (pence).
pub fn to_minor_units(major: Decimal) -> Decimal {
    (major * MINOR_PER_MAJOR).normalize()
}

/// Converts a price in minor units (pence) back to major units (pounds).
pub fn to_major_units(minor: Decimal) -> Decimal {
    (minor / MINOR_PER_MAJOR).normalize()
}

/// A single unit price for a fund on a given day, in pence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceObservation {
    pub date: NaiveDate,
    #[serde(rename = "code")]
    pub fund_id: String,
    #[serde(rename = "price_pence", with = "rust_decimal::serde::str")]
    pub price: Decimal,
}

impl Keyed for PriceObservation {
    type Key = (NaiveDate, String);

    fn key(&self) -> Self::Key {
        (self.date, self.fund_id.clone())
    }
}

/// Price ledger keyed on `(date, code)`.
pub type PriceSeriesStore = Ledger<PriceObservation>;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("no price recorded for {fund_id} on {date}")]
pub struct PriceNotFound {
    pub fund_id: String,
    pub date: NaiveDate,
}

impl Ledger<PriceObservation> {
    /// Exact-date lookup. A missing day is reported, never interpolated.
    pub fn lookup(&self, fund_id: &str, date: NaiveDate) -> Result<Decimal, PriceNotFound> {
        self.get(&(date, fund_id.to_string()))
            .map(|obs| obs.price)
            .ok_or_else(|| PriceNotFound {
                fund_id: fund_id.to_string(),
                date,
            })
    }
}

#[async_trait]
pub trait PriceFeed: Send + Sync {
    /// Fetches the latest published prices for every fund of `fund_type`,
    /// already converted to pence.
    async fn fetch_prices(&self, fund_type: &str) -> Result<Vec<PriceObservation>>;
}
