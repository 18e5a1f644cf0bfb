use crate::core::aum::{AumError, AumSnapshot, AumSource};
use crate::core::cache::Cache;
use async_trait::async_trait;
use chrono::NaiveDate;
use regex::Regex;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::{Arc, LazyLock};
use tracing::{debug, instrument, warn};

/// Turns a downloaded document into plain text.
pub type TextExtractor = fn(&[u8]) -> Result<String, AumError>;

static FUND_SIZE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)fund\s+size\s*£\s*([\d][\d,]*(?:\.\d+)?)\s*(bn|mn|m)\b")
        .expect("fund size pattern is valid")
});

/// Reads a fund's month-end AUM from its PDF factsheet.
pub struct FactsheetProvider {
    url_template: String,
    client: reqwest::Client,
    documents: Arc<Cache<String, Arc<str>>>,
    extract: TextExtractor,
}

impl FactsheetProvider {
    pub fn new(
        url_template: &str,
        client: reqwest::Client,
        documents: Arc<Cache<String, Arc<str>>>,
    ) -> Self {
        Self::new_with_extractor(url_template, client, documents, pdf_text)
    }

    pub fn new_with_extractor(
        url_template: &str,
        client: reqwest::Client,
        documents: Arc<Cache<String, Arc<str>>>,
        extract: TextExtractor,
    ) -> Self {
        FactsheetProvider {
            url_template: url_template.to_string(),
            client,
            documents,
            extract,
        }
    }

    fn factsheet_url(&self, fund_id: &str, as_of: NaiveDate) -> String {
        self.url_template
            .replace("{code}", fund_id)
            .replace("{as_of}", &as_of.format("%Y-%m-%d").to_string())
    }

    async fn document_text(&self, url: &str) -> Result<Arc<str>, AumError> {
        if let Some(text) = self.documents.get(&url.to_string()).await {
            return Ok(text);
        }

        debug!("Requesting factsheet from {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| AumError::Network(format!("{url}: {e}")))?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| AumError::Network(format!("{url}: {e}")))?;

        // PDF decoding is CPU-bound.
        let extract = self.extract;
        let text = tokio::task::spawn_blocking(move || extract(&bytes))
            .await
            .map_err(|e| AumError::Parse(format!("text extraction did not complete: {e}")))??;

        let text: Arc<str> = Arc::from(text);
        self.documents.put(url.to_string(), Arc::clone(&text)).await;
        debug!("{} factsheets cached", self.documents.len().await);
        Ok(text)
    }
}

/// Extracts the text layer of a PDF.
pub fn pdf_text(bytes: &[u8]) -> Result<String, AumError> {
    // pdf-extract panics on some malformed font tables; that must only cost this fund.
    std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem(bytes))
        .map_err(|_| AumError::Parse("PDF text extraction panicked".to_string()))?
        .map_err(|e| AumError::Parse(format!("unreadable PDF: {e}")))
}

/// Finds the first "Fund size £…" figure and returns it in GBP millions.
pub fn parse_fund_size(text: &str) -> Option<Decimal> {
    let caps = FUND_SIZE.captures(text)?;
    let value = Decimal::from_str(&caps[1].replace(',', "")).ok()?;
    if caps[2].eq_ignore_ascii_case("bn") {
        Some(value * Decimal::ONE_THOUSAND)
    } else {
        Some(value)
    }
}

/// Whether the document states `as_of` the way factsheets print it, e.g. "30 June 2025".
pub fn confirms_date(text: &str, as_of: NaiveDate) -> bool {
    text.contains(&as_of.format("%d %B %Y").to_string())
}

#[async_trait]
impl AumSource for FactsheetProvider {
    #[instrument(name = "FactsheetFetch", skip(self), fields(fund = %fund_id, %as_of))]
    async fn fetch_aum(&self, fund_id: &str, as_of: NaiveDate) -> Result<AumSnapshot, AumError> {
        let url = self.factsheet_url(fund_id, as_of);
        let text = self.document_text(&url).await?;

        let stale = !confirms_date(&text, as_of);
        if stale {
            warn!(
                "{} factsheet does not mention {}, it may not be updated yet",
                fund_id,
                as_of.format("%d %B %Y")
            );
        }

        let aum = parse_fund_size(&text)
            .ok_or_else(|| AumError::Parse(format!("could not find fund size for {fund_id}")))?;
        debug!("{} AUM as of {}: £{}m", fund_id, as_of, aum);

        Ok(AumSnapshot {
            as_of,
            fund_id: fund_id.to_string(),
            aum,
            stale,
        })
    }
}
