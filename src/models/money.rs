use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Number of fractional digits carried by every balance and amount.
pub const MONEY_SCALE: u32 = 2;

/// A monetary amount: a fixed-point decimal with exactly two fractional
/// digits plus its 3-letter currency code. Binary floating point never
/// appears on any arithmetic path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    pub value: Decimal,
    pub currency: String,
}

impl Money {
    /// Validates and normalizes an amount for a transfer or top-up:
    /// strictly positive, at most two fractional digits, well-formed
    /// currency code.
    pub fn new(value: Decimal, currency: impl Into<String>) -> Result<Self> {
        let currency = currency.into();
        validate_currency(&currency)?;

        if value <= Decimal::ZERO {
            return Err(AppError::invalid_argument("amount must be positive"));
        }
        if value.scale() > MONEY_SCALE {
            return Err(AppError::invalid_argument(
                "amount must have at most two fractional digits",
            ));
        }

        let mut value = value;
        value.rescale(MONEY_SCALE);
        Ok(Self { value, currency })
    }

    /// Parses a decimal string from a wire payload.
    pub fn parse(value: &str, currency: impl Into<String>) -> Result<Self> {
        let value: Decimal = value
            .parse()
            .map_err(|_| AppError::invalid_argument("amount is not a valid decimal"))?;
        Self::new(value, currency)
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.value, self.currency)
    }
}

/// Currency codes are exactly three uppercase ASCII letters.
pub fn validate_currency(currency: &str) -> Result<()> {
    if currency.len() != 3 || !currency.bytes().all(|b| b.is_ascii_uppercase()) {
        return Err(AppError::invalid_argument(
            "currency must be a 3-letter uppercase ISO 4217 code",
        ));
    }
    Ok(())
}
