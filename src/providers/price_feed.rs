use super::util::with_retry;
use crate::core::price::{PriceFeed, PriceObservation, to_minor_units};
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

/// Client for the fund prices endpoint, one request per fund type.
pub struct PriceFeedProvider {
    base_url: String,
    client: reqwest::Client,
}

impl PriceFeedProvider {
    pub fn new(base_url: &str, client: reqwest::Client) -> Self {
        PriceFeedProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }
}

#[derive(Debug, Deserialize)]
struct PriceFeedResponse {
    funds: Vec<PriceFeedEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PriceFeedEntry {
    fund_code: String,
    price_date: String,
    /// Pounds.
    price: Decimal,
}

fn parse_price_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").map(|dt| dt.date()))
        .or_else(|_| DateTime::parse_from_rfc3339(raw).map(|dt| dt.date_naive()))
        .or_else(|_| NaiveDate::parse_from_str(raw, "%d/%m/%Y"))
        .ok()
}

#[async_trait]
impl PriceFeed for PriceFeedProvider {
    #[instrument(name = "PriceFeedFetch", skip(self), fields(fund_type = %fund_type))]
    async fn fetch_prices(&self, fund_type: &str) -> Result<Vec<PriceObservation>> {
        let url = format!(
            "{}/fund-prices-api/prices?fundType={}",
            self.base_url, fund_type
        );
        debug!("Requesting prices from {}", url);

        let response = with_retry(
            || async {
                self.client
                    .get(&url)
                    .send()
                    .await
                    .and_then(|r| r.error_for_status())
            },
            3,
            500,
        )
        .await
        .with_context(|| format!("Failed to fetch {fund_type} prices"))?;

        let response_text = response
            .text()
            .await
            .with_context(|| format!("Failed to read {fund_type} price response"))?;
        if response_text.trim().is_empty() {
            return Err(anyhow!("Received empty price response for {}", fund_type));
        }

        let feed: PriceFeedResponse = serde_json::from_str(&response_text).with_context(|| {
            format!("Failed to parse {fund_type} price response. Response: '{response_text}'")
        })?;

        let observations: Vec<PriceObservation> = feed
            .funds
            .into_iter()
            .filter_map(|entry| match parse_price_date(&entry.price_date) {
                Some(date) => Some(PriceObservation {
                    date,
                    fund_id: entry.fund_code,
                    price: to_minor_units(entry.price),
                }),
                None => {
                    warn!(
                        fund = %entry.fund_code,
                        price_date = %entry.price_date,
                        "Skipping price with unreadable date"
                    );
                    None
                }
            })
            .collect();

        debug!(
            "Fetched {} {} prices",
            observations.len(),
            fund_type
        );
        Ok(observations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use std::time::Duration;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn create_price_mock_server(
        fund_type: &str,
        mock_response: &str,
        status_code: u16,
    ) -> MockServer {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/fund-prices-api/prices"))
            .and(query_param("fundType", fund_type))
            .respond_with(ResponseTemplate::new(status_code).set_body_string(mock_response))
            .mount(&mock_server)
            .await;
        mock_server
    }

    fn provider(uri: &str) -> PriceFeedProvider {
        let client = crate::providers::util::build_client(Duration::from_secs(5)).unwrap();
        PriceFeedProvider::new(uri, client)
    }

    #[tokio::test]
    async fn test_successful_price_fetch() {
        let mock_response = r#"{"funds": [
            {"fundCode": "0AB", "priceDate": "2025-09-30", "price": 1.2345},
            {"fundCode": "0CD", "priceDate": "2025-09-30T00:00:00", "price": "2.5"}
        ]}"#;
        let mock_server = create_price_mock_server("life", mock_response, 200).await;

        let prices = provider(&mock_server.uri())
            .fetch_prices("life")
            .await
            .unwrap();

        let date = NaiveDate::from_ymd_opt(2025, 9, 30).unwrap();
        assert_eq!(
            prices,
            vec![
                PriceObservation {
                    date,
                    fund_id: "0AB".to_string(),
                    price: Decimal::from_str("123.45").unwrap(),
                },
                PriceObservation {
                    date,
                    fund_id: "0CD".to_string(),
                    price: Decimal::from_str("250").unwrap(),
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_unreadable_dates_are_skipped() {
        let mock_response = r#"{"funds": [
            {"fundCode": "0AB", "priceDate": "yesterday", "price": 1.0},
            {"fundCode": "0CD", "priceDate": "30/09/2025", "price": 3.0}
        ]}"#;
        let mock_server = create_price_mock_server("pension", mock_response, 200).await;

        let prices = provider(&mock_server.uri())
            .fetch_prices("pension")
            .await
            .unwrap();

        assert_eq!(prices.len(), 1);
        assert_eq!(prices[0].fund_id, "0CD");
        assert_eq!(prices[0].price, Decimal::from(300));
    }

    #[tokio::test]
    async fn test_price_feed_error_status() {
        let mock_server = create_price_mock_server("life", "Server Error", 500).await;

        let result = provider(&mock_server.uri()).fetch_prices("life").await;

        assert!(result.is_err());
        assert_eq!(
            result.unwrap_err().to_string(),
            "Failed to fetch life prices"
        );
    }

    #[tokio::test]
    async fn test_price_feed_malformed_response() {
        let mock_response = r#"{ "prices": [] }"#;
        let mock_server = create_price_mock_server("life", mock_response, 200).await;

        let result = provider(&mock_server.uri()).fetch_prices("life").await;

        let error_message = result.unwrap_err().to_string();
        assert!(error_message.contains("Failed to parse life price response"));
        assert!(error_message.contains("Response: '{ \"prices\": [] }'"));
    }

    #[tokio::test]
    async fn test_price_feed_empty_response() {
        let mock_server = create_price_mock_server("life", "", 200).await;

        let result = provider(&mock_server.uri()).fetch_prices("life").await;

        assert_eq!(
            result.unwrap_err().to_string(),
            "Received empty price response for life"
        );
    }

    #[test]
    fn test_parse_price_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2025, 9, 30);
        assert_eq!(parse_price_date("2025-09-30"), expected);
        assert_eq!(parse_price_date("2025-09-30T00:00:00"), expected);
        assert_eq!(parse_price_date("2025-09-30T00:00:00.000"), expected);
        assert_eq!(parse_price_date("2025-09-30T00:00:00+01:00"), expected);
        assert_eq!(parse_price_date(" 30/09/2025 "), expected);
        assert_eq!(parse_price_date("Sep 30"), None);
    }
}
