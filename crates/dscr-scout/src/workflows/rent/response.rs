use std::collections::HashMap;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;

use crate::workflows::domain::{BedroomBucket, RentQuote};
use crate::workflows::failure::{CollaboratorError, CollaboratorResult, ReasonCode};

#[derive(Debug, Deserialize)]
struct FmrEnvelope {
    #[serde(default)]
    data: Option<FmrData>,
}

#[derive(Debug, Deserialize)]
struct FmrData {
    #[serde(default)]
    basicdata: Option<HashMap<String, Value>>,
    #[serde(default)]
    year: Option<Value>,
}

/// Decode a fair-market-rent payload into a quote for one bedroom count.
pub(crate) fn parse_quote(
    body: &[u8],
    postal_code: &str,
    bedrooms: u8,
    fallback_year: i32,
) -> CollaboratorResult<RentQuote> {
    let envelope: FmrEnvelope = serde_json::from_slice(body).map_err(|err| {
        CollaboratorError::new(
            ReasonCode::HudHttp,
            format!("undecodable FMR payload for zip {postal_code}: {err}"),
        )
    })?;

    let Some(data) = envelope.data else {
        return Err(no_data(postal_code));
    };
    let Some(basicdata) = data.basicdata else {
        return Err(no_data(postal_code));
    };

    let bucket = BedroomBucket::from_bedrooms(bedrooms);
    let monthly_rent = basicdata
        .get(bucket.hud_key())
        .and_then(decimal_from_json)
        .ok_or_else(|| {
            CollaboratorError::new(
                ReasonCode::HudNoBedroom,
                format!("no {} data for zip {postal_code}", bucket.hud_key()),
            )
        })?;

    let year = data
        .year
        .as_ref()
        .and_then(year_from_json)
        .unwrap_or(fallback_year);

    Ok(RentQuote {
        postal_code: postal_code.to_string(),
        monthly_rent,
        year,
        bedrooms,
    })
}

fn no_data(postal_code: &str) -> CollaboratorError {
    CollaboratorError::new(
        ReasonCode::HudNoData,
        format!("no FMR data for zip {postal_code}"),
    )
}

/// Rents are non-negative; anything else counts as a missing value.
fn decimal_from_json(value: &Value) -> Option<Decimal> {
    let rent = match value {
        Value::Number(number) => Decimal::from_str(&number.to_string()).ok(),
        Value::String(text) => Decimal::from_str(text.trim()).ok(),
        _ => None,
    }?;
    (!rent.is_sign_negative()).then_some(rent)
}

fn year_from_json(value: &Value) -> Option<i32> {
    match value {
        Value::Number(number) => number.as_i64().and_then(|year| i32::try_from(year).ok()),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const PAYLOAD: &str = r#"{
        "data": {
            "county_name": "Maricopa County",
            "basicdata": {
                "zip_code": "85281",
                "Efficiency": 1180,
                "One-Bedroom": 1302,
                "Two-Bedroom": 1555.5,
                "Three-Bedroom": "2141",
                "Four-Bedroom": 2540
            },
            "year": 2025
        }
    }"#;

    #[test]
    fn picks_bucket_for_bedroom_count() {
        let quote = parse_quote(PAYLOAD.as_bytes(), "85281", 2, 2024).expect("quote");
        assert_eq!(quote.monthly_rent, dec!(1555.5));
        assert_eq!(quote.year, 2025);
        assert_eq!(quote.bedrooms, 2);
        assert_eq!(quote.postal_code, "85281");

        let large = parse_quote(PAYLOAD.as_bytes(), "85281", 6, 2024).expect("quote");
        assert_eq!(large.monthly_rent, dec!(2540));
        let string_valued = parse_quote(PAYLOAD.as_bytes(), "85281", 3, 2024).expect("quote");
        assert_eq!(string_valued.monthly_rent, dec!(2141));
    }

    #[test]
    fn missing_basicdata_is_no_data() {
        let err = parse_quote(br#"{"data":{"year":2025}}"#, "85281", 2, 2025)
            .expect_err("no basicdata");
        assert_eq!(err.code, ReasonCode::HudNoData);

        let err = parse_quote(br#"{}"#, "85281", 2, 2025).expect_err("no data");
        assert_eq!(err.code, ReasonCode::HudNoData);
    }

    #[test]
    fn missing_bucket_is_no_bedroom() {
        let body = br#"{"data":{"basicdata":{"One-Bedroom":1302},"year":2025}}"#;
        let err = parse_quote(body, "85281", 2, 2025).expect_err("no two-bedroom");
        assert_eq!(err.code, ReasonCode::HudNoBedroom);
        assert!(err.to_string().starts_with("HUD_NO_BEDROOM: no Two-Bedroom data"));
    }

    #[test]
    fn negative_rent_is_treated_as_missing_bucket() {
        let body = br#"{"data":{"basicdata":{"Two-Bedroom":-5},"year":2025}}"#;
        let err = parse_quote(body, "85281", 2, 2025).expect_err("negative rent");
        assert_eq!(err.code, ReasonCode::HudNoBedroom);

        let body = br#"{"data":{"basicdata":{"Two-Bedroom":"-1400"},"year":2025}}"#;
        assert!(parse_quote(body, "85281", 2, 2025).is_err());
    }

    #[test]
    fn missing_year_falls_back_to_configured_year() {
        let body = br#"{"data":{"basicdata":{"Two-Bedroom":1400}}}"#;
        let quote = parse_quote(body, "85281", 2, 2026).expect("quote");
        assert_eq!(quote.year, 2026);
    }

    #[test]
    fn garbage_body_is_http_error() {
        let err = parse_quote(b"<html>rate limited</html>", "85281", 2, 2025)
            .expect_err("not json");
        assert_eq!(err.code, ReasonCode::HudHttp);
    }
}
