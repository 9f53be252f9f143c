use super::thresholds::QualificationThresholds;
use crate::workflows::domain::DscrStatus;
use rust_decimal::Decimal;

pub(crate) fn classify(ratio: Decimal, thresholds: &QualificationThresholds) -> DscrStatus {
    if ratio >= thresholds.min_qualifying_ratio {
        DscrStatus::Qualified
    } else if ratio >= thresholds.warning_ratio {
        DscrStatus::Warning
    } else {
        DscrStatus::Rejected
    }
}
