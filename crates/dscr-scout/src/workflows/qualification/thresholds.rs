use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Lending policy applied by the qualification engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualificationThresholds {
    pub min_qualifying_ratio: Decimal,
    pub warning_ratio: Decimal,
    pub vacancy_rate: Decimal,
    pub opex_rate: Decimal,
    /// Nominal annual rate, compounded monthly.
    pub annual_interest_rate: Decimal,
    pub down_payment_fraction: Decimal,
}

impl Default for QualificationThresholds {
    fn default() -> Self {
        Self {
            min_qualifying_ratio: Decimal::new(125, 2),
            warning_ratio: Decimal::ONE,
            vacancy_rate: Decimal::new(5, 2),
            opex_rate: Decimal::new(40, 2),
            annual_interest_rate: Decimal::new(7, 2),
            down_payment_fraction: Decimal::new(20, 2),
        }
    }
}

impl QualificationThresholds {
    pub fn validate(&self) -> Result<(), ThresholdError> {
        if self.warning_ratio < Decimal::ZERO {
            return Err(ThresholdError::NegativeWarningRatio(self.warning_ratio));
        }
        if self.min_qualifying_ratio < self.warning_ratio {
            return Err(ThresholdError::InvertedRatios {
                minimum: self.min_qualifying_ratio,
                warning: self.warning_ratio,
            });
        }

        for (name, value) in [
            ("vacancy_rate", self.vacancy_rate),
            ("opex_rate", self.opex_rate),
            ("down_payment_fraction", self.down_payment_fraction),
        ] {
            if value < Decimal::ZERO || value > Decimal::ONE {
                return Err(ThresholdError::OutOfUnitRange { name, value });
            }
        }

        if self.vacancy_rate + self.opex_rate > Decimal::ONE {
            return Err(ThresholdError::AllowancesExceedIncome {
                vacancy: self.vacancy_rate,
                opex: self.opex_rate,
            });
        }
        if self.annual_interest_rate < Decimal::ZERO {
            return Err(ThresholdError::NegativeInterestRate(
                self.annual_interest_rate,
            ));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ThresholdError {
    #[error("minimum qualifying ratio {minimum} is below the warning ratio {warning}")]
    InvertedRatios { minimum: Decimal, warning: Decimal },
    #[error("warning ratio {0} must not be negative")]
    NegativeWarningRatio(Decimal),
    #[error("{name} must lie within [0, 1], got {value}")]
    OutOfUnitRange { name: &'static str, value: Decimal },
    #[error("vacancy ({vacancy}) and operating expense ({opex}) allowances exceed gross rent")]
    AllowancesExceedIncome { vacancy: Decimal, opex: Decimal },
    #[error("annual interest rate {0} must not be negative")]
    NegativeInterestRate(Decimal),
}
