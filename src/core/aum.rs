//! AUM snapshot abstractions

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;

/// Assets under management for one fund at a month-end, in GBP millions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AumSnapshot {
    pub as_of: NaiveDate,
    pub fund_id: String,
    pub aum: Decimal,
    /// The source document did not restate `as_of`. The figure is still a
    /// best-effort value but may belong to another period.
    pub stale: bool,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AumError {
    #[error("network failure: {0}")]
    Network(String),
    #[error("parse failure: {0}")]
    Parse(String),
}

#[async_trait]
pub trait AumSource: Send + Sync {
    async fn fetch_aum(&self, fund_id: &str, as_of: NaiveDate) -> Result<AumSnapshot, AumError>;
}
