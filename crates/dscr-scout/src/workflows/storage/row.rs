use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;

use crate::workflows::domain::{
    DscrStatus, Evaluation, Listing, ListingId, ListingRecord, RentQuoteStatus, UnknownVariant,
};

#[derive(Debug, thiserror::Error)]
pub(crate) enum RowDecodeError {
    #[error("column {column} holds non-decimal value '{value}'")]
    Decimal { column: &'static str, value: String },
    #[error(transparent)]
    Status(#[from] UnknownVariant),
    #[error("invalid scan timestamp: {0}")]
    Timestamp(#[from] chrono::ParseError),
    #[error("rent quote year {0} out of range")]
    Year(i64),
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ListingRow {
    pub(crate) listing_id: String,
    pub(crate) address: String,
    pub(crate) city: String,
    pub(crate) postal_code: String,
    pub(crate) price: String,
    pub(crate) dscr_status: String,
    pub(crate) dscr_ratio: Option<String>,
    pub(crate) rent_quote_status: String,
    pub(crate) rent_quote: Option<String>,
    pub(crate) rent_quote_year: Option<i64>,
    pub(crate) scanned_at: String,
}

impl ListingRow {
    pub(crate) fn into_record(self) -> Result<ListingRecord, RowDecodeError> {
        let listing = Listing {
            id: ListingId(self.listing_id),
            address: self.address,
            city: self.city,
            postal_code: self.postal_code,
            price: decimal("price", &self.price)?,
            scanned_at: DateTime::parse_from_rfc3339(&self.scanned_at)?.with_timezone(&Utc),
        };
        let evaluation = Evaluation {
            dscr_status: DscrStatus::from_str(&self.dscr_status)?,
            dscr_ratio: self
                .dscr_ratio
                .as_deref()
                .map(|value| decimal("dscr_ratio", value))
                .transpose()?,
            rent_quote_status: RentQuoteStatus::from_str(&self.rent_quote_status)?,
            rent_quote: self
                .rent_quote
                .as_deref()
                .map(|value| decimal("rent_quote", value))
                .transpose()?,
            rent_quote_year: self
                .rent_quote_year
                .map(|year| i32::try_from(year).map_err(|_| RowDecodeError::Year(year)))
                .transpose()?,
        };
        Ok(ListingRecord::new(listing, evaluation))
    }
}

fn decimal(column: &'static str, value: &str) -> Result<Decimal, RowDecodeError> {
    Decimal::from_str(value).map_err(|_| RowDecodeError::Decimal {
        column,
        value: value.to_string(),
    })
}

pub(crate) fn timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}
