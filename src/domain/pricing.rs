//! Order pricing.
//!
//! Cart reads, checkout and invoices all price through [`PricingPolicy::totals`]
//! so the three views cannot drift apart.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::Money;

/// Anything with a unit price and a quantity.
pub trait Priced {
    fn unit_price(&self) -> Money;
    fn quantity(&self) -> u32;
    fn line_total(&self) -> Money { self.unit_price().times(self.quantity()) }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PricingPolicy {
    /// Orders strictly above this subtotal ship free.
    pub free_shipping_threshold: Money,
    pub flat_shipping_fee: Money,
    pub tax_rate: Decimal,
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self {
            free_shipping_threshold: Money::from_major(500),
            flat_shipping_fee: Money::from_major(50),
            tax_rate: Decimal::new(10, 2),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    pub subtotal: Money,
    pub shipping: Money,
    pub tax: Money,
    pub total: Money,
}

impl PricingPolicy {
    pub fn totals<'a, I, L>(&self, items: I) -> Totals
    where
        I: IntoIterator<Item = &'a L>,
        L: Priced + 'a,
    {
        let subtotal: Money = items.into_iter().map(Priced::line_total).sum();
        let shipping = if subtotal > self.free_shipping_threshold { Money::ZERO } else { self.flat_shipping_fee };
        let tax = subtotal.scaled(self.tax_rate);
        Totals { subtotal, shipping, tax, total: subtotal + shipping + tax }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Line(i64, u32);
    impl Priced for Line {
        fn unit_price(&self) -> Money { Money::from_major(self.0) }
        fn quantity(&self) -> u32 { self.1 }
    }

    #[test]
    fn test_free_shipping_over_threshold() {
        let t = PricingPolicy::default().totals(&[Line(300, 2)]);
        assert_eq!(t.subtotal, Money::from_major(600));
        assert_eq!(t.shipping, Money::ZERO);
        assert_eq!(t.tax, Money::from_major(60));
        assert_eq!(t.total, Money::from_major(660));
    }

    #[test]
    fn test_flat_shipping_under_threshold() {
        let t = PricingPolicy::default().totals(&[Line(100, 2)]);
        assert_eq!(t.subtotal, Money::from_major(200));
        assert_eq!(t.shipping, Money::from_major(50));
        assert_eq!(t.tax, Money::from_major(20));
        assert_eq!(t.total, Money::from_major(270));
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let t = PricingPolicy::default().totals(&[Line(250, 2)]);
        assert_eq!(t.shipping, Money::from_major(50));
        let t = PricingPolicy::default().totals(&[Line(501, 1)]);
        assert_eq!(t.shipping, Money::ZERO);
    }

    #[test]
    fn test_totals_are_idempotent() {
        let items = [Line(199, 3), Line(15, 1)];
        let policy = PricingPolicy::default();
        let first = policy.totals(&items);
        assert_eq!(first, policy.totals(&items));
        assert_eq!(first.total, first.subtotal + first.tax + first.shipping);
    }

    #[test]
    fn test_tax_rounds_to_cents() {
        struct Cents;
        impl Priced for Cents {
            fn unit_price(&self) -> Money { Money::new(Decimal::new(1995, 2)) }
            fn quantity(&self) -> u32 { 1 }
        }
        let t = PricingPolicy::default().totals(&[Cents]);
        assert_eq!(t.tax.amount(), Decimal::new(200, 2));
    }
}
