use std::{
    fmt,
    iter::Sum,
    ops::{Add, AddAssign, Neg, Sub, SubAssign},
    str::FromStr,
};

use crate::{Currency, EngineError, ResultEngine};

/// Signed money amount represented as integer **minor units**.
///
/// Use this type for **all** monetary values in the engine (expense amounts,
/// split positions, balances, transfers) so splits stay exactly zero-sum.
///
/// The value is signed:
/// - positive = the member is owed money
/// - negative = the member owes money
///
/// # Examples
///
/// ```rust
/// use engine::Money;
///
/// let amount = Money::new(12_34);
/// assert_eq!(amount.minor(), 1234);
/// assert_eq!(amount.to_string(), "12.34");
/// ```
///
/// Parsing from user input (accepts `.` or `,` as decimal separator; rejects
/// more decimals than the currency has):
///
/// ```rust
/// use engine::{Currency, Money};
///
/// assert_eq!("10,5".parse::<Money>().unwrap().minor(), 1050);
/// assert_eq!(Money::parse("500", Currency::Jpy).unwrap().minor(), 500);
/// assert!(Money::parse("1.5", Currency::Jpy).is_err());
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    /// Creates a new amount from integer minor units.
    #[must_use]
    pub const fn new(minor: i64) -> Self {
        Self(minor)
    }

    /// Returns the raw value in minor units.
    #[must_use]
    pub const fn minor(self) -> i64 {
        self.0
    }

    /// Returns `true` if the amount is 0.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Returns `true` if the amount is positive.
    #[must_use]
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Returns `true` if the amount is negative.
    #[must_use]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Absolute value, saturating at `i64::MAX`.
    #[must_use]
    pub const fn abs(self) -> Money {
        Money(self.0.saturating_abs())
    }

    /// Checked addition (returns `None` on overflow).
    #[must_use]
    pub fn checked_add(self, rhs: Money) -> Option<Money> {
        self.0.checked_add(rhs.0).map(Money)
    }

    /// Checked subtraction (returns `None` on overflow).
    #[must_use]
    pub fn checked_sub(self, rhs: Money) -> Option<Money> {
        self.0.checked_sub(rhs.0).map(Money)
    }

    #[must_use]
    pub const fn saturating_add(self, rhs: Money) -> Money {
        Money(self.0.saturating_add(rhs.0))
    }

    #[must_use]
    pub const fn saturating_sub(self, rhs: Money) -> Money {
        Money(self.0.saturating_sub(rhs.0))
    }

    /// Sum of `amounts`, `None` if any partial sum overflows.
    pub fn checked_sum<I>(amounts: I) -> Option<Money>
    where
        I: IntoIterator<Item = Money>,
    {
        amounts.into_iter().try_fold(Money::ZERO, Money::checked_add)
    }

    /// Sum of `amounts` accumulated in 128 bits, so intermediate totals
    /// never overflow. The result saturates at the `i64` bounds.
    pub(crate) fn wide_sum<I>(amounts: I) -> Money
    where
        I: IntoIterator<Item = Money>,
    {
        let sum: i128 = amounts.into_iter().map(|m| i128::from(m.0)).sum();
        let clamped = if sum < 0 { i64::MIN } else { i64::MAX };
        Money(i64::try_from(sum).unwrap_or(clamped))
    }

    /// Converts a major-unit float (as found in JSON payloads) to minor
    /// units, rounding half away from zero.
    pub fn from_major(value: f64, currency: Currency) -> ResultEngine<Money> {
        if !value.is_finite() {
            return Err(EngineError::InvalidAmount(format!(
                "amount is not a number: {value}"
            )));
        }
        let scaled = (value * currency.scale() as f64).round();
        if scaled.abs() >= i64::MAX as f64 {
            return Err(EngineError::InvalidAmount("amount too large".to_string()));
        }
        Ok(Money(scaled as i64))
    }

    /// Converts back to a major-unit float for wire responses.
    #[must_use]
    pub fn to_major(self, currency: Currency) -> f64 {
        self.0 as f64 / currency.scale() as f64
    }

    /// Formats the amount with the currency's decimals and code, e.g.
    /// `"-10.50 EUR"` or `"500 JPY"`.
    #[must_use]
    pub fn format_in(self, currency: Currency) -> String {
        format!("{} {}", self.format_digits(currency.minor_units()), currency.code())
    }

    fn format_digits(self, digits: u8) -> String {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        if digits == 0 {
            return format!("{sign}{abs}");
        }
        let scale = 10_u64.pow(u32::from(digits));
        let major = abs / scale;
        let minor = abs % scale;
        format!("{sign}{major}.{minor:0width$}", width = usize::from(digits))
    }

    /// Parses a decimal string into minor units of `currency`.
    ///
    /// Accepts `.` or `,` as decimal separator and an optional leading `+`/`-`.
    ///
    /// Validation rules:
    /// - at most `currency.minor_units()` fractional digits
    /// - rejects empty/invalid strings
    pub fn parse(s: &str, currency: Currency) -> ResultEngine<Money> {
        parse_minor(s, currency.minor_units())
    }
}

fn parse_minor(s: &str, digits: u8) -> ResultEngine<Money> {
    let empty = || EngineError::InvalidAmount("empty amount".to_string());
    let invalid = || EngineError::InvalidAmount("invalid amount".to_string());
    let overflow = || EngineError::InvalidAmount("amount too large".to_string());

    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Err(empty());
    }

    let (negative, rest) = if let Some(stripped) = trimmed.strip_prefix('-') {
        (true, stripped)
    } else if let Some(stripped) = trimmed.strip_prefix('+') {
        (false, stripped)
    } else {
        (false, trimmed)
    };

    let rest = rest.trim();
    if rest.is_empty() {
        return Err(empty());
    }

    let rest = rest.replace(',', ".");
    let mut parts = rest.split('.');
    let major_str = parts.next().ok_or_else(invalid)?;
    let frac_str = parts.next().unwrap_or("");

    if parts.next().is_some() {
        return Err(invalid());
    }
    if major_str.is_empty() || !major_str.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }
    if !frac_str.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }
    if frac_str.len() > usize::from(digits) {
        return Err(EngineError::InvalidAmount("too many decimals".to_string()));
    }

    let scale = 10_i64.pow(u32::from(digits));
    let major: i64 = major_str.parse().map_err(|_| overflow())?;
    let minor: i64 = if frac_str.is_empty() {
        0
    } else {
        let padding = 10_i64.pow((usize::from(digits) - frac_str.len()) as u32);
        frac_str.parse::<i64>().map_err(|_| invalid())? * padding
    };

    let total = major
        .checked_mul(scale)
        .and_then(|v| v.checked_add(minor))
        .ok_or_else(overflow)?;

    Ok(Money(if negative { -total } else { total }))
}

impl fmt::Display for Money {
    /// Two-decimal rendering without currency; use [`Money::format_in`] for
    /// currency-aware output.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format_digits(2))
    }
}

impl From<i64> for Money {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<Money> for i64 {
    fn from(value: Money) -> Self {
        value.0
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Self::Output {
        Money(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        self.0 += rhs.0;
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Self::Output {
        Money(self.0 - rhs.0)
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Money) {
        self.0 -= rhs.0;
    }
}

impl Neg for Money {
    type Output = Money;

    fn neg(self) -> Self::Output {
        Money(-self.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

impl FromStr for Money {
    type Err = EngineError;

    /// Parses with two fractional digits (EUR-like currencies).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_minor(s, 2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checked_and_wide_sums() {
        let big = Money::new(i64::MAX / 2 + 10);
        assert_eq!(Money::checked_sum([big, big]), None);
        assert_eq!(
            Money::checked_sum([Money::new(5), Money::new(-7)]),
            Some(Money::new(-2))
        );
        assert_eq!(Money::wide_sum([big, big, -big, -big]), Money::ZERO);
        assert_eq!(Money::wide_sum([big, big, big]), Money::new(i64::MAX));
        assert_eq!(Money::new(i64::MIN).abs(), Money::new(i64::MAX));
    }

    #[test]
    fn display_formats_two_decimals() {
        assert_eq!(Money::new(0).to_string(), "0.00");
        assert_eq!(Money::new(1).to_string(), "0.01");
        assert_eq!(Money::new(10).to_string(), "0.10");
        assert_eq!(Money::new(1050).to_string(), "10.50");
        assert_eq!(Money::new(-1050).to_string(), "-10.50");
    }

    #[test]
    fn format_in_uses_currency_decimals() {
        assert_eq!(Money::new(-1050).format_in(Currency::Eur), "-10.50 EUR");
        assert_eq!(Money::new(500).format_in(Currency::Jpy), "500 JPY");
    }

    #[test]
    fn parse_accepts_dot_or_comma() {
        assert_eq!("10".parse::<Money>().unwrap().minor(), 1000);
        assert_eq!("10.5".parse::<Money>().unwrap().minor(), 1050);
        assert_eq!("10,50".parse::<Money>().unwrap().minor(), 1050);
        assert_eq!("-0.01".parse::<Money>().unwrap().minor(), -1);
        assert_eq!("+1.00".parse::<Money>().unwrap().minor(), 100);
        assert_eq!("  2.30 ".parse::<Money>().unwrap().minor(), 230);
        assert_eq!("7.".parse::<Money>().unwrap().minor(), 700);
    }

    #[test]
    fn parse_rejects_more_decimals_than_currency() {
        assert!("12.345".parse::<Money>().is_err());
        assert!("0.001".parse::<Money>().is_err());
        assert!(Money::parse("3.5", Currency::Jpy).is_err());
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!("".parse::<Money>().is_err());
        assert!("-".parse::<Money>().is_err());
        assert!("1.2.3".parse::<Money>().is_err());
        assert!("abc".parse::<Money>().is_err());
    }

    #[test]
    fn from_major_rounds_to_minor_units() {
        assert_eq!(Money::from_major(0.125, Currency::Eur).unwrap().minor(), 13);
        assert_eq!(Money::from_major(-0.125, Currency::Eur).unwrap().minor(), -13);
        assert_eq!(Money::from_major(0.1 + 0.2, Currency::Eur).unwrap().minor(), 30);
        assert_eq!(Money::from_major(1499.6, Currency::Jpy).unwrap().minor(), 1500);
        assert!(Money::from_major(f64::NAN, Currency::Eur).is_err());
    }
}
