//! Value Objects for the storefront

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::Add;

/// Money value object. The store trades in a single currency, so only the
/// amount is carried.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Money = Money(Decimal::ZERO);

    pub fn new(amount: Decimal) -> Self { Self(amount) }
    pub fn from_major(units: i64) -> Self { Self(Decimal::from(units)) }
    pub fn amount(&self) -> Decimal { self.0 }
    pub fn is_negative(&self) -> bool { self.0.is_sign_negative() && !self.0.is_zero() }

    pub fn times(&self, qty: u32) -> Money { Money(self.0 * Decimal::from(qty)) }

    /// Multiplies by `rate` and rounds half away from zero to cents.
    pub fn scaled(&self, rate: Decimal) -> Money {
        Money((self.0 * rate).round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
    }
}

impl Add for Money {
    type Output = Money;
    fn add(self, rhs: Money) -> Money { Money(self.0 + rhs.0) }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money { iter.fold(Money::ZERO, Add::add) }
}

impl From<Decimal> for Money {
    fn from(value: Decimal) -> Self { Self(value) }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

/// Non-negative stock count.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quantity(u32);

impl Quantity {
    pub fn new(value: u32) -> Self { Self(value) }
    pub fn value(&self) -> u32 { self.0 }
    pub fn add(&self, other: u32) -> Self { Self(self.0.saturating_add(other)) }
    pub fn subtract(&self, other: u32) -> Option<Self> {
        if other > self.0 { None } else { Some(Self(self.0 - other)) }
    }
    /// Subtracts, bottoming out at zero.
    pub fn subtract_clamped(&self, other: u32) -> Self { Self(self.0.saturating_sub(other)) }
    pub fn is_zero(&self) -> bool { self.0 == 0 }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

/// Externally visible order reference, e.g. `ORD-20261019-000042`.
///
/// Built from the store's order sequence, so two orders never share one.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderNumber(String);

impl OrderNumber {
    pub fn new(placed_at: DateTime<Utc>, sequence: u64) -> Self {
        Self(format!("ORD-{}-{:06}", placed_at.format("%Y%m%d"), sequence))
    }
    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

/// Carrier-facing tracking reference, e.g. `TRK261019000042`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackingNumber(String);

impl TrackingNumber {
    pub fn new(placed_at: DateTime<Utc>, sequence: u64) -> Self {
        Self(format!("TRK{}{:06}", placed_at.format("%y%m%d"), sequence))
    }
    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for TrackingNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

/// Invoice reference. Derived from the order number, so it is stable.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InvoiceNumber(String);

impl InvoiceNumber {
    pub fn for_order(order_number: &OrderNumber) -> Self { Self(format!("INV-{}", order_number)) }
    pub fn for_cart(user_id: uuid::Uuid) -> Self {
        let short = user_id.simple().to_string();
        Self(format!("INV-CART-{}", &short[..8].to_uppercase()))
    }
    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for InvoiceNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_money_scaled_rounds_to_cents() {
        let m = Money::new(Decimal::new(12345, 2));
        assert_eq!(m.scaled(Decimal::new(10, 2)).amount(), Decimal::new(1235, 2));
    }

    #[test]
    fn test_money_sum() {
        let total: Money = [Money::from_major(100), Money::from_major(50)].into_iter().sum();
        assert_eq!(total, Money::from_major(150));
    }

    #[test]
    fn test_quantity_subtract() {
        let q = Quantity::new(5);
        assert_eq!(q.subtract(6), None);
        assert_eq!(q.subtract_clamped(6).value(), 0);
        assert_eq!(q.add(3).value(), 8);
    }

    #[test]
    fn test_order_and_tracking_numbers() {
        let at = Utc.with_ymd_and_hms(2026, 10, 19, 8, 30, 0).unwrap();
        assert_eq!(OrderNumber::new(at, 42).as_str(), "ORD-20261019-000042");
        assert_eq!(TrackingNumber::new(at, 42).as_str(), "TRK261019000042");
        assert_ne!(OrderNumber::new(at, 42), OrderNumber::new(at, 43));
    }

    #[test]
    fn test_invoice_number_is_derived() {
        let at = Utc.with_ymd_and_hms(2026, 1, 2, 0, 0, 0).unwrap();
        let number = OrderNumber::new(at, 7);
        assert_eq!(InvoiceNumber::for_order(&number).as_str(), "INV-ORD-20260102-000007");
        assert_eq!(InvoiceNumber::for_order(&number), InvoiceNumber::for_order(&number));
    }
}
