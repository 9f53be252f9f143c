//! Debt-service-coverage qualification.
//!
//! The engine is a pure function of the listing price, the market-rent quote and the lending
//! thresholds. It performs no I/O and keeps no state between evaluations, so the pipeline can
//! call it from any number of concurrent enrichment tasks.

mod amortization;
mod policy;
mod thresholds;

pub use amortization::LOAN_TERM_MONTHS;
pub use thresholds::{QualificationThresholds, ThresholdError};

use crate::workflows::domain::{DscrStatus, Evaluation, Listing, RentQuote, RentQuoteStatus};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

const MONTHS_PER_YEAR: Decimal = Decimal::from_parts(12, 0, 0, false, 0);
const RATIO_DECIMALS: u32 = 4;

/// Result of evaluating one listing against one rent quote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualificationOutcome {
    pub status: DscrStatus,
    /// Rounded half away from zero to four decimal places.
    pub dscr_ratio: Decimal,
    pub monthly_noi: Decimal,
    pub monthly_debt_service: Decimal,
}

impl QualificationOutcome {
    /// Fold the outcome and the quote it was computed from into a listing evaluation.
    pub fn to_evaluation(&self, quote: &RentQuote) -> Evaluation {
        Evaluation {
            dscr_status: self.status,
            dscr_ratio: Some(self.dscr_ratio),
            rent_quote_status: RentQuoteStatus::Available,
            rent_quote: Some(quote.monthly_rent),
            rent_quote_year: Some(quote.year),
        }
    }
}

/// Stateless evaluator bound to one set of thresholds.
#[derive(Debug, Clone)]
pub struct QualificationEngine {
    thresholds: QualificationThresholds,
}

impl QualificationEngine {
    pub fn new(thresholds: QualificationThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &QualificationThresholds {
        &self.thresholds
    }

    pub fn analyze(&self, listing: &Listing, quote: &RentQuote) -> QualificationOutcome {
        analyze(listing, quote, &self.thresholds)
    }
}

pub fn analyze(
    listing: &Listing,
    quote: &RentQuote,
    thresholds: &QualificationThresholds,
) -> QualificationOutcome {
    let annual_gross_rent = quote.monthly_rent * MONTHS_PER_YEAR;
    let annual_noi =
        annual_gross_rent * (Decimal::ONE - thresholds.vacancy_rate - thresholds.opex_rate);
    let monthly_noi = annual_noi / MONTHS_PER_YEAR;

    let loan_amount = listing.price * (Decimal::ONE - thresholds.down_payment_fraction);
    let monthly_debt_service = amortization::monthly_payment(
        loan_amount,
        thresholds.annual_interest_rate,
        LOAN_TERM_MONTHS,
    );
    let annual_debt_service = match monthly_debt_service.checked_mul(MONTHS_PER_YEAR) {
        Some(annual) if !annual.is_zero() => annual,
        // No loan, or debt service past decimal range: coverage is zero either way.
        _ => {
            return QualificationOutcome {
                status: DscrStatus::Rejected,
                dscr_ratio: Decimal::ZERO,
                monthly_noi,
                monthly_debt_service,
            }
        }
    };

    let dscr_ratio = (annual_noi / annual_debt_service)
        .round_dp_with_strategy(RATIO_DECIMALS, RoundingStrategy::MidpointAwayFromZero);

    QualificationOutcome {
        status: policy::classify(dscr_ratio, thresholds),
        dscr_ratio,
        monthly_noi,
        monthly_debt_service,
    }
}
