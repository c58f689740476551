//! Exact price arithmetic using decimal amounts.
//!
//! Prices are stored in major currency units (e.g. rupees, dollars) with at
//! most two fractional digits. Payment providers want minor units, so the
//! conversion to integer cents/paise is explicit and fallible.

use core::fmt;
use core::iter::Sum;
use core::ops::Add;
use core::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

/// Errors produced when parsing or converting a [`Price`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// The input was blank.
    #[error("price is required")]
    Empty,
    /// The input is not a decimal number.
    #[error("price must be a number")]
    NotANumber,
    /// Catalog prices must be greater than zero.
    #[error("price must be greater than zero")]
    NotPositive,
    /// Negative amounts are never valid.
    #[error("price cannot be negative")]
    Negative,
    /// More than two decimal places.
    #[error("price can have at most two decimal places")]
    TooPrecise,
    /// Above the largest storable amount.
    #[error("price is too large")]
    TooLarge,
}

/// A non-negative amount of money in major currency units.
///
/// Backed by [`Decimal`], so sums are exact: adding `0.10` ten times gives
/// exactly `1.00`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Price(Decimal);

impl Price {
    /// Zero, the total of an empty cart.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Largest storable amount (fits `NUMERIC(10, 2)`).
    #[must_use]
    pub fn max_amount() -> Decimal {
        Decimal::new(9_999_999_999, 2)
    }

    /// Wrap a decimal amount, checking sign, precision and range.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError::Negative`], [`PriceError::TooPrecise`] or
    /// [`PriceError::TooLarge`].
    pub fn new(amount: Decimal) -> Result<Self, PriceError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(PriceError::Negative);
        }
        if amount.normalize().scale() > 2 {
            return Err(PriceError::TooPrecise);
        }
        if amount > Self::max_amount() {
            return Err(PriceError::TooLarge);
        }
        Ok(Self(amount))
    }

    /// Parse a catalog price from form text, e.g. `"10"` or `"10.50"`.
    ///
    /// Unlike [`Price::new`], zero is rejected: every product must cost something.
    ///
    /// # Errors
    ///
    /// Returns a [`PriceError`] describing why the text is not a valid price.
    pub fn parse(text: &str) -> Result<Self, PriceError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(PriceError::Empty);
        }
        let amount = Decimal::from_str_exact(text).map_err(|_| PriceError::NotANumber)?;
        if amount <= Decimal::ZERO {
            return Err(PriceError::NotPositive);
        }
        Self::new(amount)
    }

    /// The amount in major units.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// The amount in minor units (`amount * 100`), as payment providers expect.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError::TooPrecise`] if the amount has sub-minor-unit
    /// digits, or [`PriceError::TooLarge`] if it does not fit in an `i64`.
    pub fn to_minor_units(&self) -> Result<i64, PriceError> {
        let minor = self.0 * Decimal::ONE_HUNDRED;
        if !minor.fract().is_zero() {
            return Err(PriceError::TooPrecise);
        }
        minor.to_i64().ok_or(PriceError::TooLarge)
    }
}

impl TryFrom<Decimal> for Price {
    type Error = PriceError;

    fn try_from(amount: Decimal) -> Result<Self, Self::Error> {
        Self::new(amount)
    }
}

impl From<Price> for Decimal {
    fn from(price: Price) -> Self {
        price.0
    }
}

impl Add for Price {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sum for Price {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Self> for Price {
    fn sum<I: Iterator<Item = &'a Self>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl FromStr for Price {
    type Err = PriceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Price {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <Decimal as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <Decimal as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Price {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let amount = <Decimal as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self::new(amount)?)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Price {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <Decimal as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

/// Error parsing a [`CurrencyCode`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unsupported currency: {0}")]
pub struct CurrencyError(pub String);

/// ISO 4217 currencies the shop can charge in.
///
/// All of them use two minor-unit digits, which is what
/// [`Price::to_minor_units`] assumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CurrencyCode {
    #[default]
    INR,
    USD,
    EUR,
    GBP,
    CAD,
    AUD,
}

impl CurrencyCode {
    /// Lowercase ISO code, the form payment providers accept.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::INR => "inr",
            Self::USD => "usd",
            Self::EUR => "eur",
            Self::GBP => "gbp",
            Self::CAD => "cad",
            Self::AUD => "aud",
        }
    }

    /// Display symbol.
    #[must_use]
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::INR => "₹",
            Self::USD | Self::CAD | Self::AUD => "$",
            Self::EUR => "€",
            Self::GBP => "£",
        }
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CurrencyCode {
    type Err = CurrencyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "inr" => Ok(Self::INR),
            "usd" => Ok(Self::USD),
            "eur" => Ok(Self::EUR),
            "gbp" => Ok(Self::GBP),
            "cad" => Ok(Self::CAD),
            "aud" => Ok(Self::AUD),
            _ => Err(CurrencyError(s.to_owned())),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn price(s: &str) -> Price {
        Price::parse(s).unwrap()
    }

    #[test]
    fn test_parse_valid_prices() {
        assert_eq!(price("10").amount(), Decimal::new(10, 0));
        assert_eq!(price(" 10.50 ").amount(), Decimal::new(1050, 2));
        assert_eq!(price("0.01").amount(), Decimal::new(1, 2));
    }

    #[test]
    fn test_parse_rejects_invalid_prices() {
        assert_eq!(Price::parse(""), Err(PriceError::Empty));
        assert_eq!(Price::parse("ten"), Err(PriceError::NotANumber));
        assert_eq!(Price::parse("0"), Err(PriceError::NotPositive));
        assert_eq!(Price::parse("-3"), Err(PriceError::NotPositive));
        assert_eq!(Price::parse("1.005"), Err(PriceError::TooPrecise));
        assert_eq!(Price::parse("100000000"), Err(PriceError::TooLarge));
    }

    #[test]
    fn test_trailing_zeros_are_not_extra_precision() {
        assert_eq!(price("2.5000").amount(), Decimal::new(25, 1));
    }

    #[test]
    fn test_minor_units() {
        assert_eq!(price("10").to_minor_units().unwrap(), 1000);
        assert_eq!(price("10.00").to_minor_units().unwrap(), 1000);
        assert_eq!(price("19.99").to_minor_units().unwrap(), 1999);
        assert_eq!(Price::ZERO.to_minor_units().unwrap(), 0);
    }

    #[test]
    fn test_sum_is_exact() {
        let dime = price("0.10");
        let total: Price = std::iter::repeat_n(dime, 10).sum();
        assert_eq!(total, price("1"));
        assert_eq!(total.to_string(), "1.00");
    }

    #[test]
    fn test_empty_sum_is_zero() {
        let total: Price = Vec::<Price>::new().iter().sum();
        assert_eq!(total, Price::ZERO);
        assert_eq!(total.to_string(), "0.00");
    }

    #[test]
    fn test_deserialize_checks_amount() {
        let ok: Price = serde_json::from_str("\"10.50\"").unwrap();
        assert_eq!(ok, price("10.50"));
        assert_eq!(serde_json::to_string(&ok).unwrap(), "\"10.50\"");

        assert!(serde_json::from_str::<Price>("\"-1\"").is_err());
        assert!(serde_json::from_str::<Price>("\"1.234\"").is_err());
        assert!(serde_json::from_str::<Price>("\"100000000\"").is_err());
    }

    #[test]
    fn test_currency_code_parse() {
        assert_eq!("INR".parse::<CurrencyCode>().unwrap(), CurrencyCode::INR);
        assert_eq!("usd".parse::<CurrencyCode>().unwrap(), CurrencyCode::USD);
        assert!("xyz".parse::<CurrencyCode>().is_err());
        assert_eq!(CurrencyCode::default().as_str(), "inr");
    }
}
