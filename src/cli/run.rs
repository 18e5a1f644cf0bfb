use super::{flows, ui};
use crate::core::calendar::{is_month_end, is_quarterly_estimation_day, previous_month_end};
use crate::core::config::{FundUniverse, ScheduleConfig};
use crate::core::flow::estimate_quarter;
use crate::core::{
    AumSource, FlowLedger, FlowRecord, LedgerBackend, PriceFeed, PriceObservation,
    PriceSeriesStore, QuarterEstimate,
};
use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use tracing::{error, info};

/// Daily entry point: ingest prices, then back-solve the previous quarter
/// when `today` falls inside the estimation window.
pub async fn run(
    universe: &FundUniverse,
    schedule: &ScheduleConfig,
    today: NaiveDate,
    price_feed: &(dyn PriceFeed + Send + Sync),
    aum_source: &(dyn AumSource + Send + Sync),
    price_backend: &dyn LedgerBackend<PriceObservation>,
    flow_backend: &dyn LedgerBackend<FlowRecord>,
) -> Result<()> {
    if universe.is_empty() {
        println!("No funds configured. Add fund codes under `funds:` in the config file.");
        return Ok(());
    }

    let mut prices = PriceSeriesStore::load(price_backend)?;
    let added = ingest_prices(universe, price_feed, &mut prices).await?;
    prices.save(price_backend)?;
    info!("Recorded {} new prices ({} total)", added, prices.len());

    if !is_quarterly_estimation_day(today, schedule.estimation_window_days, &schedule.holidays) {
        info!("{} is not a quarterly estimation day", today);
        return Ok(());
    }

    let quarter_end = previous_month_end(today)
        .with_context(|| format!("No month end precedes {today}"))?;
    info!("Estimating flows for quarter ending {}", quarter_end);
    estimate(universe, quarter_end, &prices, aum_source, flow_backend).await?;
    Ok(())
}

/// Fetches every fund group from the feed and merges the observations.
/// Fails only when no group could be fetched at all.
pub async fn ingest_prices(
    universe: &FundUniverse,
    price_feed: &(dyn PriceFeed + Send + Sync),
    prices: &mut PriceSeriesStore,
) -> Result<usize> {
    let mut observations = Vec::new();
    let mut failed = Vec::new();

    for group in universe.groups() {
        match price_feed.fetch_prices(group).await {
            Ok(batch) => observations.extend(batch),
            Err(e) => {
                let reason = format!("{e:#}");
                error!(fund_type = %group, error = %reason, "Price ingest failed");
                failed.push(group);
            }
        }
    }

    if !failed.is_empty() && failed.len() == universe.groups().count() {
        bail!("Price ingest failed for every fund type ({})", failed.join(", "));
    }
    if !failed.is_empty() {
        eprintln!(
            "{}",
            ui::style_text(
                &format!("Prices not updated for: {}", failed.join(", ")),
                ui::StyleType::Warning
            )
        );
    }

    Ok(prices.record_batch(observations))
}

/// Back-solves `quarter_end` for every fund not yet in the ledger, persists the
/// successes and reports the rest on stderr.
pub async fn estimate(
    universe: &FundUniverse,
    quarter_end: NaiveDate,
    prices: &PriceSeriesStore,
    aum_source: &(dyn AumSource + Send + Sync),
    flow_backend: &dyn LedgerBackend<FlowRecord>,
) -> Result<QuarterEstimate> {
    if !is_month_end(quarter_end) {
        bail!("{quarter_end} is not a month end");
    }

    let mut ledger = FlowLedger::load(flow_backend)?;
    let pending: Vec<String> = universe
        .fund_ids()
        .into_iter()
        .filter(|fund_id| !ledger.contains_key(&(quarter_end, fund_id.clone())))
        .collect();

    if pending.is_empty() {
        println!(
            "{}",
            ui::style_text(
                &format!("Flows for {quarter_end} are already recorded."),
                ui::StyleType::Subtle
            )
        );
        return Ok(QuarterEstimate::default());
    }

    let pb = ui::new_progress_bar(pending.len() as u64);
    let estimate = estimate_quarter(&pending, quarter_end, prices, aum_source, &|| pb.inc(1)).await;
    pb.finish_and_clear();

    report_problems(&estimate);

    let added = ledger.record_batch(estimate.records.iter().cloned());
    ledger.save(flow_backend)?;
    info!(
        "Recorded {} flows for {}, {} funds failed",
        added,
        quarter_end,
        estimate.failures.len()
    );

    if !estimate.records.is_empty() {
        println!(
            "\n{}",
            ui::style_text(
                &format!("Estimated flows for quarter ending {quarter_end}"),
                ui::StyleType::Title
            )
        );
        flows::print_table(estimate.records.iter(), universe);
    }
    Ok(estimate)
}

fn report_problems(estimate: &QuarterEstimate) {
    for (fund_id, as_of) in &estimate.stale {
        eprintln!(
            "{}",
            ui::style_text(
                &format!("{fund_id}: factsheet does not confirm {as_of}, AUM may be out of date"),
                ui::StyleType::Warning
            )
        );
    }
    for failure in &estimate.failures {
        eprintln!(
            "{}",
            ui::style_text(
                &format!("{}: {}", failure.fund_id, failure.error),
                ui::StyleType::Error
            )
        );
    }
}
