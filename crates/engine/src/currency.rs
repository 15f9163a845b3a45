use serde::{Deserialize, Serialize};

use crate::EngineError;

/// ISO currency code of a group and its money values.
///
/// ## Minor units
///
/// The engine stores monetary values as an `i64` number of **minor units**
/// (see `Money`). `minor_units()` returns how many decimal digits are used
/// when converting between:
/// - major units (human input/output, e.g. `10.50 EUR`)
/// - minor units (stored integers, e.g. `1050`)
///
/// Example: EUR has 2 minor units, so `10.50 EUR` ⇄ `1050`, while JPY has
/// none, so `500 JPY` ⇄ `500`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    Eur,
    Usd,
    Gbp,
    Inr,
    Jpy,
}

impl Currency {
    /// Canonical currency code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Currency::Eur => "EUR",
            Currency::Usd => "USD",
            Currency::Gbp => "GBP",
            Currency::Inr => "INR",
            Currency::Jpy => "JPY",
        }
    }

    /// Number of fraction digits used when formatting/parsing amounts.
    #[must_use]
    pub const fn minor_units(self) -> u8 {
        match self {
            Currency::Jpy => 0,
            Currency::Eur | Currency::Usd | Currency::Gbp | Currency::Inr => 2,
        }
    }

    /// Minor units in one major unit (`100` for EUR, `1` for JPY).
    #[must_use]
    pub const fn scale(self) -> i64 {
        10_i64.pow(self.minor_units() as u32)
    }

    /// Largest gap, in minor units, allowed between an exact split's shares
    /// and the expense amount: 0.1 major units.
    #[must_use]
    pub const fn split_tolerance(self) -> i64 {
        self.scale() / 10
    }
}

impl core::fmt::Display for Currency {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.code())
    }
}

impl TryFrom<&str> for Currency {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_uppercase().as_str() {
            "EUR" => Ok(Currency::Eur),
            "USD" => Ok(Currency::Usd),
            "GBP" => Ok(Currency::Gbp),
            "INR" => Ok(Currency::Inr),
            "JPY" => Ok(Currency::Jpy),
            other => Err(EngineError::CurrencyMismatch(format!(
                "unsupported currency: {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_codes_case_insensitively() {
        assert_eq!(Currency::try_from(" inr ").unwrap(), Currency::Inr);
        assert_eq!(Currency::try_from("Jpy").unwrap(), Currency::Jpy);
        assert!(Currency::try_from("XYZ").is_err());
    }

    #[test]
    fn tolerance_follows_minor_units() {
        assert_eq!(Currency::Eur.split_tolerance(), 10);
        assert_eq!(Currency::Jpy.split_tolerance(), 0);
    }
}
