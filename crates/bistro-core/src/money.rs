//! # Money
//!
//! Currency handling and the rounding rules used by checkout and reporting.
//! Amounts are exact decimals; rounding is always half-up (midpoint away from zero).

use crate::error::{BistroError, BistroResult};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Decimal places used for displayed totals
pub const DISPLAY_DECIMALS: u32 = 2;

/// Supported currencies (ISO 4217)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Currency {
    #[default]
    USD,
    EUR,
    GBP,
    JPY,
    CAD,
    AUD,
}

impl Currency {
    /// Returns the ISO 4217 currency code as the gateway expects it
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::USD => "usd",
            Currency::EUR => "eur",
            Currency::GBP => "gbp",
            Currency::JPY => "jpy",
            Currency::CAD => "cad",
            Currency::AUD => "aud",
        }
    }

    /// Number of minor-unit decimal places (JPY has none)
    pub fn decimal_places(&self) -> u32 {
        match self {
            Currency::JPY => 0,
            _ => 2,
        }
    }

    /// Convert a decimal amount to the smallest currency unit (cents, etc.)
    pub fn to_minor_units(&self, amount: Decimal) -> BistroResult<i64> {
        let scaled = amount
            .checked_mul(Decimal::from(10_i64.pow(self.decimal_places())))
            .ok_or_else(|| BistroError::InvalidPrice {
                message: format!("amount {amount} is too large"),
            })?;
        scaled
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_i64()
            .ok_or_else(|| BistroError::InvalidPrice {
                message: format!("amount {amount} does not fit in minor units"),
            })
    }
}

impl FromStr for Currency {
    type Err = BistroError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "usd" => Ok(Currency::USD),
            "eur" => Ok(Currency::EUR),
            "gbp" => Ok(Currency::GBP),
            "jpy" => Ok(Currency::JPY),
            "cad" => Ok(Currency::CAD),
            "aud" => Ok(Currency::AUD),
            other => Err(BistroError::UnsupportedCurrency {
                currency: other.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str().to_uppercase())
    }
}

/// Round to two decimals, half-up, always carrying two fractional digits
/// so that `15` renders as `15.00`.
pub fn round_money(amount: Decimal) -> Decimal {
    let mut rounded =
        amount.round_dp_with_strategy(DISPLAY_DECIMALS, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(DISPLAY_DECIMALS);
    rounded
}

/// Sum then round once.
pub fn rounded_sum<I>(amounts: I) -> Decimal
where
    I: IntoIterator<Item = Decimal>,
{
    round_money(amounts.into_iter().sum())
}

/// Reject prices a checkout must never see.
pub fn ensure_chargeable(price: Decimal) -> BistroResult<()> {
    if price <= Decimal::ZERO {
        return Err(BistroError::InvalidPrice {
            message: format!("price must be positive, got {price}"),
        });
    }
    Ok(())
}
