//! Persistence backends for the price and flow ledgers.

pub mod disk;
pub mod memory;

use crate::core::{FlowRecord, PriceObservation};
use disk::CsvFile;
use std::path::Path;

pub const PRICES_FILE: &str = "prices.csv";
pub const FLOWS_FILE: &str = "quarterly_flows.csv";

/// The two ledger files kept under the data directory.
pub struct DataFiles {
    pub prices: CsvFile<PriceObservation>,
    pub flows: CsvFile<FlowRecord>,
}

impl DataFiles {
    pub fn in_dir(data_dir: &Path) -> Self {
        Self {
            prices: CsvFile::new(data_dir.join(PRICES_FILE)),
            flows: CsvFile::new(data_dir.join(FLOWS_FILE)),
        }
    }
}
