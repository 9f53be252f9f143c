use rust_decimal::{Decimal, MathematicalOps};

/// 30-year fixed amortization.
pub const LOAN_TERM_MONTHS: u64 = 360;

const MONTHS_PER_YEAR: Decimal = Decimal::from_parts(12, 0, 0, false, 0);

/// Level monthly payment for a fully amortizing loan. Intermediate values are not rounded;
/// a payment beyond decimal range saturates at `Decimal::MAX`.
pub(crate) fn monthly_payment(
    principal: Decimal,
    annual_rate: Decimal,
    term_months: u64,
) -> Decimal {
    let term = Decimal::from(term_months);
    let monthly_rate = annual_rate / MONTHS_PER_YEAR;

    if monthly_rate.is_zero() {
        return principal / term;
    }

    let interest = principal.checked_mul(monthly_rate).unwrap_or(Decimal::MAX);
    let growth = match (Decimal::ONE + monthly_rate).checked_powu(term_months) {
        Some(growth) => growth,
        // Past decimal range the annuity factor converges to the periodic rate.
        None => return interest,
    };

    // growth / (growth - 1) tends to 1 as the rate rises.
    match growth.checked_div(growth - Decimal::ONE) {
        Some(annuity) => interest.checked_mul(annuity).unwrap_or(Decimal::MAX),
        None => principal / term,
    }
}
