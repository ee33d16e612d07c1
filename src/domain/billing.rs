//! Invoice projection for orders and live carts. Read-only.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::aggregates::{Cart, Order, PaymentMethod, PaymentStatus, ShippingAddress};
use crate::domain::pricing::{Priced, PricingPolicy};
use crate::domain::value_objects::{InvoiceNumber, Money, OrderNumber};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyInfo {
    pub name: String,
    pub address: String,
    pub email: String,
    pub phone: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub user_id: Uuid,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<ShippingAddress>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceLine {
    pub product_id: Uuid,
    pub name: String,
    pub unit_price: Money,
    pub quantity: u32,
    pub amount: Money,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub invoice_number: InvoiceNumber,
    pub order_number: Option<OrderNumber>,
    pub date: DateTime<Utc>,
    pub company: CompanyInfo,
    pub customer: Customer,
    pub items: Vec<InvoiceLine>,
    pub subtotal: Money,
    pub tax: Money,
    pub shipping: Money,
    pub total: Money,
    pub payment_method: Option<PaymentMethod>,
    pub payment_status: Option<PaymentStatus>,
}

impl Invoice {
    /// Totals are copied from the order, never recomputed.
    pub fn for_order(order: &Order, company: &CompanyInfo) -> Self {
        let address = order.shipping_address();
        let totals = order.totals();
        Self {
            invoice_number: InvoiceNumber::for_order(order.order_number()),
            order_number: Some(order.order_number().clone()),
            date: order.created_at(),
            company: company.clone(),
            customer: Customer {
                user_id: order.user_id(),
                name: Some(address.full_name.clone()),
                email: None,
                phone: Some(address.phone.clone()),
                address: Some(address.clone()),
            },
            items: order.items().iter().map(|i| InvoiceLine {
                product_id: i.product_id, name: i.name.clone(), unit_price: i.price, quantity: i.quantity, amount: i.line_total(),
            }).collect(),
            subtotal: totals.subtotal,
            tax: totals.tax,
            shipping: totals.shipping,
            total: totals.total,
            payment_method: Some(order.payment_method()),
            payment_status: Some(order.payment_status()),
        }
    }

    pub fn for_cart(cart: &Cart, customer: Customer, company: &CompanyInfo, policy: &PricingPolicy, date: DateTime<Utc>) -> Self {
        let totals = policy.totals(cart.items());
        Self {
            invoice_number: InvoiceNumber::for_cart(cart.user_id()),
            order_number: None,
            date,
            company: company.clone(),
            customer,
            items: cart.items().iter().map(|i| InvoiceLine {
                product_id: i.product_id, name: i.name.clone(), unit_price: i.price, quantity: i.quantity, amount: i.line_total(),
            }).collect(),
            subtotal: totals.subtotal,
            tax: totals.tax,
            shipping: totals.shipping,
            total: totals.total,
            payment_method: None,
            payment_status: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::order::sample_address;
    use crate::domain::aggregates::product::draft;
    use crate::domain::aggregates::{NewOrder, OrderItem, Product};

    fn company() -> CompanyInfo {
        CompanyInfo { name: "Shopfront".into(), address: "1 Market St".into(), email: "billing@shop.test".into(), phone: "000".into() }
    }

    #[test]
    fn test_order_invoice() {
        let items = vec![OrderItem { product_id: Uuid::new_v4(), name: "Shoe".into(), price: Money::from_major(300), quantity: 2, image: None }];
        let totals = PricingPolicy::default().totals(&items);
        let order = Order::place(NewOrder {
            user_id: Uuid::new_v4(), sequence: 9, items, totals, shipping_address: sample_address(), payment_method: PaymentMethod::Cod,
        }).unwrap();
        let invoice = Invoice::for_order(&order, &company());
        assert_eq!(invoice.invoice_number.as_str(), format!("INV-{}", order.order_number()));
        assert_eq!(invoice, Invoice::for_order(&order, &company()));
        assert_eq!(invoice.total, Money::from_major(660));
        assert_eq!(invoice.items[0].amount, Money::from_major(600));
        assert_eq!(invoice.customer.name.as_deref(), Some("Asha Rao"));
    }

    #[test]
    fn test_cart_invoice_uses_shared_pricing() {
        let product = Product::create(draft("Mug", 100, 10)).unwrap();
        let mut cart = Cart::for_user(Uuid::new_v4());
        cart.add_item(&product, 2).unwrap();
        let customer = Customer { user_id: cart.user_id(), ..Default::default() };
        let invoice = Invoice::for_cart(&cart, customer, &company(), &PricingPolicy::default(), Utc::now());
        assert_eq!(invoice.subtotal, Money::from_major(200));
        assert_eq!(invoice.shipping, Money::from_major(50));
        assert_eq!(invoice.tax, Money::from_major(20));
        assert_eq!(invoice.total, Money::from_major(270));
        assert!(invoice.order_number.is_none());
    }
}
