pub mod cli;
pub mod core;
pub mod providers;
pub mod store;

pub use crate::core::config;

use crate::core::cache::Cache;
use crate::core::FlowLedger;
use crate::core::PriceSeriesStore;
use crate::providers::factsheet::FactsheetProvider;
use crate::providers::price_feed::PriceFeedProvider;
use crate::store::DataFiles;
use anyhow::Result;
use chrono::{Local, NaiveDate};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub enum AppCommand {
    /// Ingest prices and, inside the estimation window, back-solve last quarter.
    Run { today: Option<NaiveDate> },
    /// Back-solve an explicit quarter from stored prices.
    Estimate { quarter_end: NaiveDate },
    /// Show the stored flow ledger.
    Flows { quarter_end: Option<NaiveDate> },
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("Fund flow tracker starting...");

    let config = match config_path {
        Some(path) => config::AppConfig::load_from_path(path)?,
        None => config::AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    if config.funds.is_empty() {
        warn!("No funds configured");
    }

    let data_dir = config.default_data_path()?;
    debug!("Using data directory {}", data_dir.display());
    let files = DataFiles::in_dir(&data_dir);

    match command {
        AppCommand::Run { today } => {
            let today = today.unwrap_or_else(|| Local::now().date_naive());
            let client = providers::util::build_client(Duration::from_secs(
                config.request_timeout_secs,
            ))?;

            let prices = config.providers.price_feed();
            let price_feed = PriceFeedProvider::new(&prices.base_url, client.clone());
            let aum_source = factsheet_provider(&config, client);

            cli::run::run(
                &config.funds,
                &config.schedule,
                today,
                &price_feed,
                &aum_source,
                &files.prices,
                &files.flows,
            )
            .await
        }
        AppCommand::Estimate { quarter_end } => {
            let client = providers::util::build_client(Duration::from_secs(
                config.request_timeout_secs,
            ))?;
            let aum_source = factsheet_provider(&config, client);
            let prices = PriceSeriesStore::load(&files.prices)?;

            cli::run::estimate(&config.funds, quarter_end, &prices, &aum_source, &files.flows)
                .await
                .map(|_| ())
        }
        AppCommand::Flows { quarter_end } => {
            let ledger = FlowLedger::load(&files.flows)?;
            cli::flows::show(&ledger, &config.funds, quarter_end);
            Ok(())
        }
    }
}

fn factsheet_provider(config: &config::AppConfig, client: reqwest::Client) -> FactsheetProvider {
    let factsheets = config.providers.factsheet_source();
    FactsheetProvider::new(&factsheets.url_template, client, Arc::new(Cache::new()))
}
