//! Tax computation.
//!
//! Amounts are carried at full precision through the calculation and rounded
//! to two decimal places (half away from zero) only in the returned
//! breakdown. The total is derived from the rounded parts so that
//! `subtotal + tax_amount == total` always holds.

use std::fmt;
use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::models::TaxBreakdown;

/// Whether a price already includes tax.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaxMode {
    /// The price includes tax; the tax is extracted from it.
    Inclusive,
    /// Tax is added on top of the price.
    #[default]
    Exclusive,
}

impl fmt::Display for TaxMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaxMode::Inclusive => f.write_str("inclusive"),
            TaxMode::Exclusive => f.write_str("exclusive"),
        }
    }
}

impl FromStr for TaxMode {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "inclusive" => Ok(TaxMode::Inclusive),
            "exclusive" => Ok(TaxMode::Exclusive),
            other => Err(EngineError::validation(
                "tax.mode",
                format!("expected 'inclusive' or 'exclusive', got '{}'", other),
            )),
        }
    }
}

/// Rounds a monetary amount to two decimal places, half away from zero.
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Computes tax on `amount` at `rate` percent.
///
/// In exclusive mode `amount` is the pre-tax subtotal. In inclusive mode it
/// is the tax-inclusive total and the subtotal is extracted from it.
///
/// # Errors
///
/// Returns `ValidationError` for a negative rate or amount.
///
/// # Example
///
/// ```
/// use pricing_engine::pricing::{TaxMode, compute_tax};
/// use rust_decimal::Decimal;
/// use std::str::FromStr;
///
/// let tax = compute_tax(Decimal::from(100), Decimal::from_str("7.5").unwrap(), TaxMode::Exclusive).unwrap();
/// assert_eq!(tax.tax_amount.to_string(), "7.50");
/// assert_eq!(tax.total.to_string(), "107.50");
/// ```
pub fn compute_tax(amount: Decimal, rate: Decimal, mode: TaxMode) -> EngineResult<TaxBreakdown> {
    if rate.is_sign_negative() && !rate.is_zero() {
        return Err(EngineError::validation(
            "tax.rate",
            format!("rate must not be negative, got {}", rate),
        ));
    }
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(EngineError::validation(
            "amount",
            format!("taxable amount must not be negative, got {}", amount),
        ));
    }

    let overflow = || EngineError::CalculationError {
        message: format!("tax on {} at {}% overflowed", amount, rate),
    };
    let fraction = rate / Decimal::ONE_HUNDRED;

    let (subtotal, tax) = match mode {
        TaxMode::Exclusive => {
            let tax = amount.checked_mul(fraction).ok_or_else(overflow)?;
            (amount, tax)
        }
        TaxMode::Inclusive => {
            let divisor = Decimal::ONE + fraction;
            let subtotal = amount.checked_div(divisor).ok_or_else(overflow)?;
            (subtotal, amount - subtotal)
        }
    };

    let tax_amount = round_money(tax);
    let total = match mode {
        TaxMode::Exclusive => round_money(subtotal) + tax_amount,
        TaxMode::Inclusive => round_money(amount),
    };

    Ok(TaxBreakdown {
        subtotal: total - tax_amount,
        tax_amount,
        total,
    })
}
