//! Euro amounts stored as integer cents.
//!
//! Every price in the catalog and every booking total is a non-negative amount with
//! exactly two fractional digits, so the whole domain works in cents and only formats
//! to a decimal string at the edges (JSON, e-mails, the payment provider).

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A non-negative euro amount in cents.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Money(u64);

/// Error returned when a decimal price string cannot be read.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid amount: {0:?}")]
pub struct MoneyParseError(pub String);

impl Money {
    /// Zero euros.
    pub const ZERO: Self = Self(0);

    /// Creates a `Money` value from cents.
    #[must_use]
    pub const fn from_cents(cents: u64) -> Self {
        Self(cents)
    }

    /// Creates a `Money` value from whole euros, `None` on overflow.
    #[must_use]
    pub const fn from_euros(euros: u64) -> Option<Self> {
        match euros.checked_mul(100) {
            Some(cents) => Some(Self(cents)),
            None => None,
        }
    }

    /// Returns the amount in cents (the provider's minor unit).
    #[must_use]
    pub const fn cents(&self) -> u64 {
        self.0
    }

    /// Checks if the amount is zero
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Multiplies by a participant count, `None` on overflow.
    #[must_use]
    pub const fn checked_mul(self, factor: u32) -> Option<Self> {
        match self.0.checked_mul(factor as u64) {
            Some(cents) => Some(Self(cents)),
            None => None,
        }
    }

    /// Adds two amounts, `None` on overflow.
    #[must_use]
    pub const fn checked_add(self, other: Self) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(cents) => Some(Self(cents)),
            None => None,
        }
    }

    /// Parses a decimal string such as `"100"`, `"99.5"` or `"1250.00"`.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyParseError`] for negative values, more than two fractional
    /// digits, or anything that is not a plain decimal number.
    pub fn parse(input: &str) -> Result<Self, MoneyParseError> {
        let amount = Decimal::from_str(input.trim())
            .map_err(|_| MoneyParseError(input.to_string()))?;
        Self::try_from(amount)
    }

    /// The amount as a two-place decimal.
    #[must_use]
    pub fn to_decimal(self) -> Decimal {
        Decimal::from_i128_with_scale(i128::from(self.0), 2)
    }
}

impl TryFrom<Decimal> for Money {
    type Error = MoneyParseError;

    /// Converts to cents; the amount must be non-negative with at most two places.
    fn try_from(amount: Decimal) -> Result<Self, Self::Error> {
        let err = || MoneyParseError(amount.to_string());
        if amount.is_sign_negative() || amount.scale() > 2 {
            return Err(err());
        }
        amount
            .checked_mul(Decimal::ONE_HUNDRED)
            .and_then(|cents| cents.to_u64())
            .map(Self)
            .ok_or_else(err)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_decimal())
    }
}

impl FromStr for Money {
    type Err = MoneyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

// Amounts travel as decimal strings ("300.00") so clients never see float rounding.
impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        Serialize::serialize(&self.to_decimal(), serializer)
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let amount = <Decimal as Deserialize>::deserialize(deserializer)?;
        Self::try_from(amount).map_err(serde::de::Error::custom)
    }
}
