use anyhow::{Context, Result};
use chrono::NaiveDate;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::{fs, path::PathBuf};
use tracing::debug;

/// Fund codes grouped by product line. The group label is also the
/// `fundType` the price feed is queried with; each code maps to a display name.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(transparent)]
pub struct FundUniverse(BTreeMap<String, BTreeMap<String, String>>);

impl FundUniverse {
    pub fn groups(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Every fund code across all groups, sorted and deduplicated.
    pub fn fund_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.0.values().flat_map(|g| g.keys().cloned()).collect();
        ids.sort();
        ids.dedup();
        ids
    }

    pub fn display_name(&self, code: &str) -> Option<&str> {
        self.0
            .values()
            .find_map(|group| group.get(code))
            .map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.values().all(BTreeMap::is_empty)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PriceFeedConfig {
    pub base_url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct FactsheetConfig {
    /// URL with `{code}` and optionally `{as_of}` placeholders.
    pub url_template: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProvidersConfig {
    pub prices: Option<PriceFeedConfig>,
    pub factsheets: Option<FactsheetConfig>,
}

fn default_price_feed() -> PriceFeedConfig {
    PriceFeedConfig {
        base_url: "https://services.sjp.co.uk".to_string(),
    }
}

fn default_factsheets() -> FactsheetConfig {
    FactsheetConfig {
        url_template: "https://fundfactsheets.sjp.co.uk/Latest/{code}_Factsheet.pdf".to_string(),
    }
}

impl ProvidersConfig {
    /// The configured price feed, or the public endpoint when the section is absent.
    pub fn price_feed(&self) -> PriceFeedConfig {
        self.prices.clone().unwrap_or_else(default_price_feed)
    }

    pub fn factsheet_source(&self) -> FactsheetConfig {
        self.factsheets.clone().unwrap_or_else(default_factsheets)
    }
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        ProvidersConfig {
            prices: Some(default_price_feed()),
            factsheets: Some(default_factsheets()),
        }
    }
}

fn default_estimation_window_days() -> u32 {
    10
}

fn default_request_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ScheduleConfig {
    /// Flows are estimated during this many business days at the start of
    /// January, April, July and October.
    #[serde(default = "default_estimation_window_days")]
    pub estimation_window_days: u32,
    #[serde(default)]
    pub holidays: Vec<NaiveDate>,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        ScheduleConfig {
            estimation_window_days: default_estimation_window_days(),
            holidays: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    pub funds: FundUniverse,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    pub data_path: Option<String>,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("uk", "fundflow", "fundflow")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn default_data_path(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.data_path {
            return Ok(PathBuf::from(custom_path));
        }
        let proj_dirs = ProjectDirs::from("uk", "fundflow", "fundflow")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.data_dir().to_path_buf())
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }
}
