//! HUD fair-market-rent lookup.

mod response;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::workflows::domain::RentQuote;
use crate::workflows::failure::{CollaboratorError, CollaboratorResult, ReasonCode};
use crate::workflows::http::{self, RetryPolicy};
use crate::workflows::pipeline::RentLookup;

pub struct HudFmrClient {
    client: Client,
    base_url: String,
    token: Option<String>,
    year: i32,
    retry: RetryPolicy,
}

impl HudFmrClient {
    pub fn new(
        base_url: impl Into<String>,
        token: Option<String>,
        year: i32,
        timeout: Duration,
        max_attempts: u32,
    ) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: http::build_client(timeout)?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
            year,
            retry: RetryPolicy::new(max_attempts),
        })
    }

    fn statedata_url(&self, postal_code: &str) -> String {
        format!(
            "{}/api/fmr/statedata?year={}&zipcode={}",
            self.base_url, self.year, postal_code
        )
    }
}

impl std::fmt::Debug for HudFmrClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HudFmrClient")
            .field("base_url", &self.base_url)
            .field("year", &self.year)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[async_trait]
impl RentLookup for HudFmrClient {
    async fn rent_quote(&self, postal_code: &str, bedrooms: u8) -> CollaboratorResult<RentQuote> {
        let url = self.statedata_url(postal_code);
        let response = http::send_with_retry(self.retry, "hud-fmr", || {
            let request = self.client.get(&url);
            match &self.token {
                Some(token) => request.bearer_auth(token),
                None => request,
            }
        })
        .await
        .map_err(|err| hud_http(postal_code, err))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CollaboratorError::new(
                ReasonCode::HudHttp,
                format!("status {} for zip {postal_code}", status.as_u16()),
            ));
        }

        let body = response
            .bytes()
            .await
            .map_err(|err| hud_http(postal_code, err))?;
        let quote = response::parse_quote(&body, postal_code, bedrooms, self.year)?;
        debug!(postal_code, bedrooms, rent = %quote.monthly_rent, year = quote.year, "rent quote");
        Ok(quote)
    }
}

fn hud_http(postal_code: &str, err: reqwest::Error) -> CollaboratorError {
    CollaboratorError::new(ReasonCode::HudHttp, format!("zip {postal_code}: {err}"))
}
