use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::workflows::domain::{Listing, ListingId, ListingRecord, MarketFilter, RentQuote};
use crate::workflows::failure::CollaboratorResult;

/// Traceability identifier for one run, echoed in the outbound digest.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub String);

impl RunId {
    pub fn new(prefix: &str, started_at: DateTime<Utc>) -> Self {
        Self(format!("{}-{}", prefix, started_at.format("%Y%m%d-%H%M")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Acquisition of fresh listing snapshots for a market.
#[async_trait]
pub trait ListingSource: Send + Sync {
    async fn fetch_listings(&self, filter: &MarketFilter) -> CollaboratorResult<Vec<Listing>>;
}

/// Market-rent lookup by postal code and bedroom count.
#[async_trait]
pub trait RentLookup: Send + Sync {
    async fn rent_quote(&self, postal_code: &str, bedrooms: u8) -> CollaboratorResult<RentQuote>;
}

/// Storage abstraction so the orchestrator can be exercised in isolation.
#[async_trait]
pub trait ListingRepository: Send + Sync {
    /// Insert by listing id, or update the mutable evaluation fields of an existing row.
    async fn save(&self, record: &ListingRecord) -> CollaboratorResult<bool>;
    async fn is_already_notified(&self, id: &ListingId, date: NaiveDate) -> bool;
    /// Qualified or Warning listings with no notification log entry for `date`.
    async fn unnotified_qualified(&self, date: NaiveDate) -> CollaboratorResult<Vec<ListingRecord>>;
    async fn get_by_id(&self, id: &ListingId) -> CollaboratorResult<Option<ListingRecord>>;
    async fn log_notification(
        &self,
        ids: &[ListingId],
        date: NaiveDate,
        recipients: &str,
    ) -> CollaboratorResult<bool>;
}

/// Outbound digest delivery.
#[async_trait]
pub trait DigestNotifier: Send + Sync {
    /// Descriptor of who receives the digest, recorded in the notification log.
    fn recipients(&self) -> String;

    /// Returns `Ok(true)` when the digest was handed to the delivery channel.
    async fn send_digest(&self, listings: &[ListingRecord], run_id: &RunId)
        -> CollaboratorResult<bool>;
}
