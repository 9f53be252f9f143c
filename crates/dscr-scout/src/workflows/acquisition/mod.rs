//! Listing acquisition from the brokerage CSV export.

mod parser;

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use tracing::{info, warn};

use crate::workflows::domain::{Listing, MarketFilter};
use crate::workflows::failure::{CollaboratorError, CollaboratorResult, ReasonCode};
use crate::workflows::http::{self, RetryPolicy};
use crate::workflows::pipeline::ListingSource;

const HOMES_PER_PAGE: u32 = 350;

/// Pulls active listings for each configured postal code and merges them.
#[derive(Debug, Clone)]
pub struct CsvListingFeed {
    client: Client,
    base_url: String,
    retry: RetryPolicy,
}

impl CsvListingFeed {
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        max_attempts: u32,
    ) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: http::build_client(timeout)?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            retry: RetryPolicy::new(max_attempts),
        })
    }

    fn export_url(&self, postal_code: &str, filter: &MarketFilter) -> String {
        format!(
            "{}/stingray/api/gis-csv?al=1&market={}&num_homes={}&ord=redfin-recommended-asc\
             &page_number=1&region_id={}&region_type=2&sf=1,2,3,5,6,7&status=1\
             &uipt=1,2,3,4,5,6&v=8&max_price={}",
            self.base_url,
            filter.region.to_lowercase(),
            HOMES_PER_PAGE,
            postal_code,
            filter.max_price.trunc(),
        )
    }

    async fn fetch_postal_code(
        &self,
        postal_code: &str,
        filter: &MarketFilter,
    ) -> Result<Vec<Listing>, String> {
        let url = self.export_url(postal_code, filter);
        let response = http::send_with_retry(self.retry, "listing-feed", || self.client.get(&url))
            .await
            .map_err(|err| format!("{postal_code}: {err}"))?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("{postal_code}: status {}", status.as_u16()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|err| format!("{postal_code}: {err}"))?;

        parser::parse_listings(body.as_ref(), postal_code, filter.max_price, Utc::now())
            .map_err(|err| format!("{postal_code}: {}: {err}", ReasonCode::ListingParse))
    }
}

#[async_trait]
impl ListingSource for CsvListingFeed {
    async fn fetch_listings(&self, filter: &MarketFilter) -> CollaboratorResult<Vec<Listing>> {
        let mut listings = Vec::new();
        let mut failures = Vec::new();

        for postal_code in &filter.postal_codes {
            match self.fetch_postal_code(postal_code, filter).await {
                Ok(batch) => {
                    info!(postal_code = %postal_code, count = batch.len(), "listing export parsed");
                    listings.extend(batch);
                }
                Err(detail) => {
                    warn!(postal_code = %postal_code, error = %detail, "listing export failed");
                    failures.push(detail);
                }
            }
        }

        if listings.is_empty() && !failures.is_empty() {
            return Err(CollaboratorError::new(
                ReasonCode::ListingHttp,
                failures.join("; "),
            ));
        }

        Ok(listings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn filter() -> MarketFilter {
        MarketFilter {
            postal_codes: vec!["85281".to_string()],
            city: "Tempe".to_string(),
            region: "AZ".to_string(),
            bedrooms: 2,
            max_price: dec!(425000.50),
            min_cap_rate: dec!(0.05),
        }
    }

    #[test]
    fn export_url_carries_market_zip_and_price_cap() {
        let feed = CsvListingFeed::new("https://feed.example.com/", Duration::from_secs(5), 3)
            .expect("client builds");
        let url = feed.export_url("85281", &filter());

        assert!(url.starts_with("https://feed.example.com/stingray/api/gis-csv?al=1&market=az&"));
        assert!(url.contains("&region_id=85281&region_type=2&"));
        assert!(url.contains("&num_homes=350&"));
        assert!(url.ends_with("&max_price=425000"));
        assert!(!url.contains(' '));
    }

    #[tokio::test]
    async fn unreachable_feed_fails_with_joined_details() {
        let feed = CsvListingFeed::new("http://127.0.0.1:9", Duration::from_millis(200), 1)
            .expect("client builds");
        let mut market = filter();
        market.postal_codes = vec!["85281".to_string(), "85283".to_string()];

        let err = feed
            .fetch_listings(&market)
            .await
            .expect_err("no listener on the discard port");

        assert_eq!(err.code, ReasonCode::ListingHttp);
        assert!(err.detail.starts_with("85281: "));
        assert!(err.detail.contains("; 85283: "));
    }

    #[tokio::test]
    async fn empty_market_yields_empty_batch() {
        let feed = CsvListingFeed::new("http://127.0.0.1:9", Duration::from_millis(200), 1)
            .expect("client builds");
        let mut market = filter();
        market.postal_codes.clear();

        let listings = feed.fetch_listings(&market).await.expect("nothing to fetch");
        assert!(listings.is_empty());
    }
}
