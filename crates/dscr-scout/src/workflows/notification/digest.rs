use rust_decimal::{Decimal, RoundingStrategy};

use crate::workflows::domain::ListingRecord;
use crate::workflows::pipeline::RunId;

const NOT_AVAILABLE: &str = "n/a";

/// Render the chat digest for one run.
pub fn render_digest(listings: &[ListingRecord], run_id: &RunId) -> String {
    let count = listings.len();
    let mut lines = vec![
        format!("*DSCR Scout Digest* - {run_id}"),
        format!(
            "_{count} propert{} qualified today_",
            if count == 1 { "y" } else { "ies" }
        ),
        String::new(),
    ];

    for record in listings {
        let listing = &record.listing;
        let evaluation = &record.evaluation;
        lines.push(format!("*{}, {}*", listing.address, listing.city));
        lines.push(format!(
            "  Price: ${}  |  DSCR: {}  |  {}",
            whole_dollars(listing.price),
            evaluation
                .dscr_ratio
                .map(two_places)
                .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            evaluation.dscr_status
        ));
        lines.push(format!(
            "  FMR: ${}/mo  |  MLS: {}",
            evaluation
                .rent_quote
                .map(whole_dollars)
                .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            listing.id
        ));
        lines.push(String::new());
    }

    lines.join("\n")
}

fn two_places(value: Decimal) -> String {
    let rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    format!("{rounded:.2}")
}

/// Round to whole units and group thousands with commas.
fn whole_dollars(value: Decimal) -> String {
    let rounded = value.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    let digits = rounded.abs().trunc().to_string();

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, digit) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    if rounded.is_sign_negative() && !rounded.is_zero() {
        format!("-{grouped}")
    } else {
        grouped
    }
}
