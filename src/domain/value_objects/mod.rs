//! Value Objects for the catalog and line items

mod slug;

pub use slug::{slugify, Slug, SlugError};

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Product price: two decimal places, `0 <= price < 1_000_000`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Price(Decimal);

impl Price {
    pub const MAX_EXCLUSIVE: Decimal = Decimal::from_parts(1_000_000, 0, 0, false, 0);

    pub fn new(amount: Decimal) -> Result<Self, PriceError> {
        if amount.is_sign_negative() && !amount.is_zero() { return Err(PriceError::Negative); }
        let mut amount = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        if amount >= Self::MAX_EXCLUSIVE { return Err(PriceError::TooLarge); }
        amount.rescale(2);
        Ok(Self(amount))
    }
    pub fn amount(&self) -> Decimal { self.0 }
    pub fn multiply(&self, count: Count) -> Decimal { self.0 * Decimal::from(count.value()) }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum PriceError { Negative, TooLarge }
impl std::error::Error for PriceError {}
impl fmt::Display for PriceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Negative => write!(f, "price must not be negative"),
            Self::TooLarge => write!(f, "price must be below {}", Price::MAX_EXCLUSIVE),
        }
    }
}

/// Line item quantity, always at least one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Count(u32);

impl Count {
    pub const ONE: Count = Count(1);

    pub fn new(value: u32) -> Result<Self, CountError> {
        if value == 0 { return Err(CountError::Zero); }
        Ok(Self(value))
    }
    pub fn value(&self) -> u32 { self.0 }
    pub fn saturating_add(&self, other: Count) -> Self { Self(self.0.saturating_add(other.0)) }
    /// `None` when nothing would be left, i.e. `other >= self`.
    pub fn checked_sub(&self, other: Count) -> Option<Self> {
        if other.0 >= self.0 { None } else { Some(Self(self.0 - other.0)) }
    }
}

impl TryFrom<u32> for Count {
    type Error = CountError;
    fn try_from(value: u32) -> Result<Self, Self::Error> { Self::new(value) }
}

impl TryFrom<i64> for Count {
    type Error = CountError;
    fn try_from(value: i64) -> Result<Self, Self::Error> {
        u32::try_from(value).map_err(|_| CountError::OutOfRange(value)).and_then(Self::new)
    }
}

impl From<Count> for u32 {
    fn from(count: Count) -> u32 { count.0 }
}

impl fmt::Display for Count {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum CountError { Zero, OutOfRange(i64) }
impl std::error::Error for CountError {}
impl fmt::Display for CountError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Zero => write!(f, "count must be at least 1"),
            Self::OutOfRange(v) => write!(f, "count {v} out of range"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_rounds_to_cents() {
        let p = Price::new(Decimal::new(199999, 4)).unwrap();
        assert_eq!(p.amount(), Decimal::new(2000, 2));
        assert_eq!(p.to_string(), "20.00");
    }

    #[test]
    fn test_price_bounds() {
        assert_eq!(Price::new(Decimal::new(-1, 2)), Err(PriceError::Negative));
        assert_eq!(Price::new(Decimal::from(1_000_000)), Err(PriceError::TooLarge));
        assert!(Price::new(Decimal::new(99999999, 2)).is_ok());
    }

    #[test]
    fn test_count_arithmetic() {
        let three = Count::new(3).unwrap();
        let two = Count::new(2).unwrap();
        assert_eq!(three.checked_sub(two), Some(Count::ONE));
        assert_eq!(three.checked_sub(three), None);
        assert_eq!(two.checked_sub(three), None);
        assert_eq!(three.saturating_add(two).value(), 5);
        assert_eq!(Count::new(0), Err(CountError::Zero));
        assert_eq!(Count::try_from(-4i64), Err(CountError::OutOfRange(-4)));
    }

    #[test]
    fn test_count_rejects_zero_in_json() {
        assert!(serde_json::from_str::<Count>("0").is_err());
        assert_eq!(serde_json::from_str::<Count>("7").unwrap().value(), 7);
    }
}
