use std::io::Read;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use csv::StringRecord;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use tracing::debug;

use crate::workflows::domain::{Listing, ListingId};

/// Parse one listing-feed CSV export for `postal_code`.
///
/// Headers are matched case-insensitively. Rows without an MLS number are skipped and rows
/// priced above `max_price` are dropped.
pub(crate) fn parse_listings<R: Read>(
    reader: R,
    postal_code: &str,
    max_price: Decimal,
    scanned_at: DateTime<Utc>,
) -> Result<Vec<Listing>, csv::Error> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers: StringRecord = csv_reader
        .headers()?
        .iter()
        .map(|header| header.to_ascii_uppercase())
        .collect();

    let mut listings = Vec::new();
    for (line, record) in csv_reader.records().enumerate() {
        let record = record?;
        // Truncated rows (trailing disclaimers, partial lines) cannot be aligned to headers.
        if record.len() < headers.len() {
            continue;
        }
        let row: FeedRow = match record.deserialize(Some(&headers)) {
            Ok(row) => row,
            Err(err) => {
                debug!(postal_code, line, error = %err, "skipping malformed feed row");
                continue;
            }
        };
        let Some(id) = row.mls_id else {
            continue;
        };
        let price = parse_price(row.price.as_deref());
        if price > max_price {
            continue;
        }
        listings.push(Listing {
            id: ListingId(id),
            address: row.address.unwrap_or_default(),
            city: row.city.unwrap_or_default(),
            postal_code: postal_code.to_string(),
            price,
            scanned_at,
        });
    }

    Ok(listings)
}

#[derive(Debug, Deserialize)]
struct FeedRow {
    #[serde(rename = "MLS#", default, deserialize_with = "empty_string_as_none")]
    mls_id: Option<String>,
    #[serde(rename = "ADDRESS", default, deserialize_with = "empty_string_as_none")]
    address: Option<String>,
    #[serde(rename = "CITY", default, deserialize_with = "empty_string_as_none")]
    city: Option<String>,
    #[serde(rename = "PRICE", default, deserialize_with = "empty_string_as_none")]
    price: Option<String>,
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

/// Currency-formatted price; anything unparseable counts as zero.
pub(crate) fn parse_price(raw: Option<&str>) -> Decimal {
    let Some(raw) = raw else {
        return Decimal::ZERO;
    };
    let cleaned: String = raw.chars().filter(|c| !matches!(c, '$' | ',')).collect();
    Decimal::from_str(cleaned.trim())
        .unwrap_or(Decimal::ZERO)
        .max(Decimal::ZERO)
}
