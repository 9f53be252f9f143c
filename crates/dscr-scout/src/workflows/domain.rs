use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Market-unique listing identifier (the MLS number); the natural key across runs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ListingId(pub String);

impl ListingId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ListingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Immutable snapshot of a listing as delivered by the acquisition feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listing {
    pub id: ListingId,
    pub address: String,
    pub city: String,
    pub postal_code: String,
    pub price: Decimal,
    pub scanned_at: DateTime<Utc>,
}

/// DSCR qualification status; persisted by variant name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DscrStatus {
    Qualified,
    Warning,
    Rejected,
}

impl DscrStatus {
    pub fn label(&self) -> &'static str {
        match self {
            DscrStatus::Qualified => "Qualified",
            DscrStatus::Warning => "Warning",
            DscrStatus::Rejected => "Rejected",
        }
    }

    /// Qualified and Warning listings are eligible for the digest.
    pub fn is_notifiable(&self) -> bool {
        matches!(self, DscrStatus::Qualified | DscrStatus::Warning)
    }
}

impl fmt::Display for DscrStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for DscrStatus {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "Qualified" => Ok(Self::Qualified),
            "Warning" => Ok(Self::Warning),
            "Rejected" => Ok(Self::Rejected),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

/// Whether a market-rent quote could be obtained for the listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RentQuoteStatus {
    Available,
    Unavailable,
}

impl RentQuoteStatus {
    pub fn label(&self) -> &'static str {
        match self {
            RentQuoteStatus::Available => "Available",
            RentQuoteStatus::Unavailable => "Unavailable",
        }
    }
}

impl fmt::Display for RentQuoteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for RentQuoteStatus {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "Available" => Ok(Self::Available),
            "Unavailable" => Ok(Self::Unavailable),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown status variant '{0}'")]
pub struct UnknownVariant(pub String);

/// Discrete bedroom bucket used by the fair-market-rent tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BedroomBucket {
    Efficiency,
    One,
    Two,
    Three,
    FourPlus,
}

impl BedroomBucket {
    pub fn from_bedrooms(bedrooms: u8) -> Self {
        match bedrooms {
            0 => Self::Efficiency,
            1 => Self::One,
            2 => Self::Two,
            3 => Self::Three,
            _ => Self::FourPlus,
        }
    }

    /// Key used by the HUD `basicdata` payload.
    pub fn hud_key(&self) -> &'static str {
        match self {
            BedroomBucket::Efficiency => "Efficiency",
            BedroomBucket::One => "One-Bedroom",
            BedroomBucket::Two => "Two-Bedroom",
            BedroomBucket::Three => "Three-Bedroom",
            BedroomBucket::FourPlus => "Four-Bedroom",
        }
    }
}

/// Market-rent estimate for a postal code and bedroom count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RentQuote {
    pub postal_code: String,
    pub monthly_rent: Decimal,
    pub year: i32,
    pub bedrooms: u8,
}

impl RentQuote {
    pub fn bucket(&self) -> BedroomBucket {
        BedroomBucket::from_bedrooms(self.bedrooms)
    }
}

/// Mutable evaluation fields attached to a listing during enrichment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evaluation {
    pub dscr_status: DscrStatus,
    pub dscr_ratio: Option<Decimal>,
    pub rent_quote_status: RentQuoteStatus,
    pub rent_quote: Option<Decimal>,
    pub rent_quote_year: Option<i32>,
}

impl Evaluation {
    /// State of a listing that has not been (or could not be) evaluated.
    pub fn unavailable() -> Self {
        Self {
            dscr_status: DscrStatus::Rejected,
            dscr_ratio: None,
            rent_quote_status: RentQuoteStatus::Unavailable,
            rent_quote: None,
            rent_quote_year: None,
        }
    }
}

impl Default for Evaluation {
    fn default() -> Self {
        Self::unavailable()
    }
}

/// Listing snapshot merged with its evaluation; the unit of persistence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingRecord {
    pub listing: Listing,
    pub evaluation: Evaluation,
}

impl ListingRecord {
    pub fn new(listing: Listing, evaluation: Evaluation) -> Self {
        Self {
            listing,
            evaluation,
        }
    }

    pub fn id(&self) -> &ListingId {
        &self.listing.id
    }
}

/// Search scope for one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketFilter {
    pub postal_codes: Vec<String>,
    pub city: String,
    pub region: String,
    pub bedrooms: u8,
    pub max_price: Decimal,
    pub min_cap_rate: Decimal,
}
