//! Quarterly flow back-solving.
//!
//! A fund's net flow over a quarter is the part of its AUM change that price
//! movement does not explain. Holding the unit count implied by the opening
//! AUM constant and revaluing it at the closing price gives the AUM the fund
//! would have had with no subscriptions or redemptions; the difference to the
//! reported closing AUM is the flow.

use crate::core::aum::{AumError, AumSnapshot, AumSource};
use crate::core::calendar;
use crate::core::ledger::{Keyed, Ledger};
use crate::core::price::{PriceNotFound, PriceSeriesStore};
use chrono::NaiveDate;
use futures::future::join_all;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, instrument, warn};

/// GBP millions to GBP. Applied once going into unit space and once coming out.
pub const AUM_SCALE: Decimal = Decimal::from_parts(1_000_000, 0, 0, false, 0);

/// Decimal places kept in reported flows.
pub const FLOW_DECIMALS: u32 = 2;

/// Estimated net flow for one fund over the quarter ending at `quarter_end`,
/// in GBP millions. Positive is a net inflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowRecord {
    pub quarter_end: NaiveDate,
    #[serde(rename = "code")]
    pub fund_id: String,
    #[serde(rename = "flow_gbp_m", with = "rust_decimal::serde::str")]
    pub flow: Decimal,
}

impl Keyed for FlowRecord {
    type Key = (NaiveDate, String);

    fn key(&self) -> Self::Key {
        (self.quarter_end, self.fund_id.clone())
    }
}

/// Flow ledger keyed on `(quarter_end, code)`.
pub type FlowLedger = Ledger<FlowRecord>;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FlowError {
    #[error("{0} is not a month-end date")]
    NotMonthEnd(NaiveDate),
    #[error("AUM unavailable for {as_of}: {source}")]
    Aum {
        as_of: NaiveDate,
        #[source]
        source: AumError,
    },
    #[error("data gap: {0}")]
    DataGap(#[from] PriceNotFound),
    #[error("data integrity fault: {field} is {value}, expected a positive value")]
    DataIntegrity { field: &'static str, value: Decimal },
    #[error("arithmetic overflow while back-solving")]
    Overflow,
}

/// The four observations a back-solve needs. AUM in GBP millions, prices in pence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlowInputs {
    pub aum_start: Decimal,
    pub aum_end: Decimal,
    pub price_start: Decimal,
    pub price_end: Decimal,
}

/// Intermediate and final values of a back-solve. `flow` is unrounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlowBreakdown {
    pub units_start: Decimal,
    pub aum_no_flow: Decimal,
    pub flow: Decimal,
}

impl FlowBreakdown {
    /// The flow rounded for reporting (banker's rounding to two places).
    pub fn reported_flow(&self) -> Decimal {
        let mut flow = self.flow.round_dp(FLOW_DECIMALS);
        flow.rescale(FLOW_DECIMALS);
        flow
    }
}

fn ensure_positive(field: &'static str, value: Decimal) -> Result<(), FlowError> {
    if value <= Decimal::ZERO {
        return Err(FlowError::DataIntegrity { field, value });
    }
    Ok(())
}

/// Pure back-solve arithmetic.
pub fn back_solve(inputs: &FlowInputs) -> Result<FlowBreakdown, FlowError> {
    ensure_positive("aum_start", inputs.aum_start)?;
    ensure_positive("aum_end", inputs.aum_end)?;
    ensure_positive("price_start", inputs.price_start)?;
    ensure_positive("price_end", inputs.price_end)?;

    let units_start = inputs
        .aum_start
        .checked_mul(AUM_SCALE)
        .and_then(|scaled| scaled.checked_div(inputs.price_start))
        .ok_or(FlowError::Overflow)?;
    let aum_no_flow = units_start
        .checked_mul(inputs.price_end)
        .and_then(|value| value.checked_div(AUM_SCALE))
        .ok_or(FlowError::Overflow)?;
    let flow = inputs
        .aum_end
        .checked_sub(aum_no_flow)
        .ok_or(FlowError::Overflow)?;

    Ok(FlowBreakdown {
        units_start,
        aum_no_flow,
        flow,
    })
}

/// A successful estimate for one fund.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowEstimate {
    pub record: FlowRecord,
    pub breakdown: FlowBreakdown,
    /// Snapshot dates whose source document did not confirm the date.
    pub stale_dates: Vec<NaiveDate>,
}

async fn fetch_snapshot(
    aum_source: &(dyn AumSource + Send + Sync),
    fund_id: &str,
    as_of: NaiveDate,
) -> Result<AumSnapshot, FlowError> {
    aum_source
        .fetch_aum(fund_id, as_of)
        .await
        .map_err(|source| FlowError::Aum { as_of, source })
}

/// Back-solves the flow of `fund_id` over the quarter ending at `quarter_end`.
#[instrument(name = "BackSolve", skip(fund_id, prices, aum_source), fields(fund = %fund_id))]
pub async fn estimate_flow(
    fund_id: &str,
    quarter_end: NaiveDate,
    prices: &PriceSeriesStore,
    aum_source: &(dyn AumSource + Send + Sync),
) -> Result<FlowEstimate, FlowError> {
    if !calendar::is_month_end(quarter_end) {
        return Err(FlowError::NotMonthEnd(quarter_end));
    }
    let quarter_start =
        calendar::quarter_start(quarter_end).ok_or(FlowError::NotMonthEnd(quarter_end))?;

    let start = fetch_snapshot(aum_source, fund_id, quarter_start).await?;
    let end = fetch_snapshot(aum_source, fund_id, quarter_end).await?;
    let stale_dates = [&start, &end]
        .iter()
        .filter(|snapshot| snapshot.stale)
        .map(|snapshot| snapshot.as_of)
        .collect();

    let inputs = FlowInputs {
        aum_start: start.aum,
        aum_end: end.aum,
        price_start: prices.lookup(fund_id, quarter_start)?,
        price_end: prices.lookup(fund_id, quarter_end)?,
    };
    let breakdown = back_solve(&inputs)?;
    debug!(?inputs, ?breakdown, "Back-solved flow");

    Ok(FlowEstimate {
        record: FlowRecord {
            quarter_end,
            fund_id: fund_id.to_string(),
            flow: breakdown.reported_flow(),
        },
        breakdown,
        stale_dates,
    })
}

/// A fund left out of a quarter's results, with the reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FundFailure {
    pub fund_id: String,
    pub error: FlowError,
}

/// Outcome of back-solving a whole fund universe for one quarter.
#[derive(Debug, Clone, Default)]
pub struct QuarterEstimate {
    /// Successful records sorted by natural key.
    pub records: Vec<FlowRecord>,
    /// Failures sorted by fund id.
    pub failures: Vec<FundFailure>,
    /// `(fund_id, as_of)` pairs whose AUM came from an unconfirmed document.
    pub stale: Vec<(String, NaiveDate)>,
}

/// Back-solves every fund in `fund_ids` concurrently. A failing fund is logged
/// and reported in `failures`; it never stops the others.
pub async fn estimate_quarter(
    fund_ids: &[String],
    quarter_end: NaiveDate,
    prices: &PriceSeriesStore,
    aum_source: &(dyn AumSource + Send + Sync),
    on_progress: &(dyn Fn() + Send + Sync),
) -> QuarterEstimate {
    let futures = fund_ids.iter().map(|fund_id| async move {
        let result = estimate_flow(fund_id, quarter_end, prices, aum_source).await;
        on_progress();
        (fund_id, result)
    });

    let mut estimate = QuarterEstimate::default();
    for (fund_id, result) in join_all(futures).await {
        match result {
            Ok(flow) => {
                for as_of in flow.stale_dates {
                    warn!(fund = %fund_id, %as_of, "AUM taken from a document that does not confirm its date");
                    estimate.stale.push((fund_id.clone(), as_of));
                }
                estimate.records.push(flow.record);
            }
            Err(e) => {
                error!(fund = %fund_id, error = %e, "Flow estimate failed");
                estimate.failures.push(FundFailure {
                    fund_id: fund_id.clone(),
                    error: e,
                });
            }
        }
    }

    estimate.records.sort_by_key(|r| r.key());
    estimate
        .failures
        .sort_by(|a, b| a.fund_id.cmp(&b.fund_id));
    estimate
}
