use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use super::inventory::persist_stock_change;
use super::Shop;
use crate::auth::Principal;
use crate::domain::aggregates::{
    NewOrder, Order, OrderAction, OrderItem, PaymentMethod, ShippingAddress, StockAction,
};
use crate::domain::billing::Invoice;
use crate::error::{Result, ShopError};
use crate::store::{Store, Transaction};

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrder {
    /// Falls back to the caller's cart when absent.
    #[serde(default)]
    pub items: Option<Vec<OrderLine>>,
    pub shipping_address: ShippingAddress,
    #[serde(default)]
    pub payment_method: PaymentMethod,
}

#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub product_id: Uuid,
    pub quantity: u32,
}

/// Sums quantities of repeated products. Lines come back sorted by product
/// id, which is the order product rows are locked in.
fn merge_lines(lines: impl IntoIterator<Item = OrderLine>) -> Vec<OrderLine> {
    let mut merged: Vec<OrderLine> = Vec::new();
    for line in lines {
        match merged.iter_mut().find(|l| l.product_id == line.product_id) {
            Some(existing) => existing.quantity = existing.quantity.saturating_add(line.quantity),
            None => merged.push(line),
        }
    }
    merged.sort_by_key(|l| l.product_id);
    merged
}

impl<S: Store> Shop<S> {
    /// Checkout. Either every line is in stock and the order, the stock
    /// decrements and the emptied cart are committed together, or nothing
    /// changes.
    pub async fn place_order(&self, user_id: Uuid, input: PlaceOrder) -> Result<Order> {
        input.shipping_address.validate()?;
        let mut tx = self.store.begin().await?;

        // Cart before products, same as the cart operations.
        let cart = tx.cart(user_id).await?;
        let requested = match input.items {
            Some(items) => items,
            None => cart
                .map(|cart| cart.items().iter().map(|i| OrderLine { product_id: i.product_id, quantity: i.quantity }).collect())
                .unwrap_or_default(),
        };
        let lines = merge_lines(requested);
        if lines.is_empty() {
            return Err(ShopError::Validation("order has no items".to_string()));
        }
        if lines.iter().any(|l| l.quantity == 0) {
            return Err(ShopError::Validation("quantity must be at least 1".to_string()));
        }

        let mut reserved = Vec::with_capacity(lines.len());
        for line in &lines {
            let product = tx.product(line.product_id).await?
                .ok_or_else(|| ShopError::not_found(format!("product {}", line.product_id)))?;
            product.ensure_available(line.quantity)?;
            reserved.push((product, line.quantity));
        }

        // Prices come from the product records, not from cart snapshots.
        let items: Vec<OrderItem> = reserved.iter().map(|(p, quantity)| OrderItem {
            product_id: p.id(),
            name: p.name().to_string(),
            price: p.price(),
            quantity: *quantity,
            image: p.primary_image().map(str::to_string),
        }).collect();
        let totals = self.pricing.totals(&items);
        let sequence = tx.next_order_sequence().await?;
        let mut order = Order::place(NewOrder {
            user_id,
            sequence,
            items,
            totals,
            shipping_address: input.shipping_address,
            payment_method: input.payment_method,
        })?;
        tx.insert_order(&order).await?;

        let mut events = order.take_events();
        let reason = format!("Order {} placed", order.order_number());
        for (mut product, quantity) in reserved {
            let change = product.reserve(quantity)?;
            persist_stock_change(&mut tx, &product, StockAction::Subtract, quantity, change, &reason).await?;
            events.extend(product.take_events());
        }
        tx.delete_cart(user_id).await?;
        tx.commit().await?;

        tracing::info!(
            order_number = %order.order_number(), %user_id, items = order.items().len(),
            total = %order.total(), payment = ?order.payment_method(), "order placed"
        );
        self.notifier.publish(events);
        Ok(order)
    }

    pub async fn order(&self, principal: &Principal, order_id: Uuid) -> Result<Order> {
        let mut tx = self.store.begin().await?;
        visible(tx.order(order_id).await?, principal, order_id)
    }

    /// Customers see their own orders; admins see all.
    pub async fn orders(&self, principal: &Principal) -> Result<Vec<Order>> {
        let mut tx = self.store.begin().await?;
        tx.orders((!principal.is_admin).then_some(principal.user_id)).await
    }

    pub async fn order_invoice(&self, principal: &Principal, order_id: Uuid) -> Result<Invoice> {
        let order = self.order(principal, order_id).await?;
        Ok(Invoice::for_order(&order, &self.company))
    }

    /// Moves an order through the state machine. Cancelling puts every
    /// item's quantity back on its product.
    pub async fn transition_order(&self, principal: &Principal, order_id: Uuid, action: OrderAction, reason: Option<String>) -> Result<Order> {
        if !action.customer_allowed() {
            principal.require_admin()?;
        }
        let mut tx = self.store.begin().await?;
        let mut order = visible(tx.order(order_id).await?, principal, order_id)?;
        let from = order.apply(action, reason)?;
        tx.update_order(&order).await?;
        let mut events = order.take_events();

        if action == OrderAction::Cancel {
            let reason = format!("Order {} cancelled", order.order_number());
            let mut items: Vec<&OrderItem> = order.items().iter().collect();
            items.sort_by_key(|i| i.product_id);
            for item in items {
                let Some(mut product) = tx.product(item.product_id).await? else {
                    tracing::warn!(order_number = %order.order_number(), product_id = %item.product_id, "product gone; stock not restored");
                    continue;
                };
                let change = product.adjust_stock(StockAction::Add, item.quantity);
                persist_stock_change(&mut tx, &product, StockAction::Add, item.quantity, change, &reason).await?;
                events.extend(product.take_events());
            }
        }
        tx.commit().await?;

        tracing::info!(
            order_number = %order.order_number(), %action, %from, to = %order.status(),
            actor = %principal.user_id, "order status changed"
        );
        self.notifier.publish(events);
        Ok(order)
    }

    pub async fn cancel_order(&self, principal: &Principal, order_id: Uuid, reason: Option<String>) -> Result<Order> {
        self.transition_order(principal, order_id, OrderAction::Cancel, reason).await
    }

    pub async fn request_return(&self, principal: &Principal, order_id: Uuid, reason: Option<String>) -> Result<Order> {
        self.transition_order(principal, order_id, OrderAction::RequestReturn, reason).await
    }
}

/// Another customer's order reads as missing.
fn visible(order: Option<Order>, principal: &Principal, order_id: Uuid) -> Result<Order> {
    order
        .filter(|o| principal.is_admin || o.user_id() == principal.user_id)
        .ok_or_else(|| ShopError::not_found(format!("order {order_id}")))
}

#[cfg(test)]
mod tests {
    use super::super::testing::{seed, shop};
    use super::*;
    use crate::domain::aggregates::order::sample_address;
    use crate::domain::aggregates::{OrderStatus, PaymentStatus};
    use crate::domain::value_objects::Money;
    use crate::store::{MemoryStore, MovementFilter};

    fn checkout(items: Option<Vec<OrderLine>>) -> PlaceOrder {
        PlaceOrder { items, shipping_address: sample_address(), payment_method: PaymentMethod::Cod }
    }

    fn line(product_id: Uuid, quantity: u32) -> OrderLine { OrderLine { product_id, quantity } }

    async fn delivered_order(shop: &Shop<MemoryStore>, user: Uuid) -> Order {
        let p = seed(shop, "Boot", 150, 5).await;
        let order = shop.place_order(user, checkout(Some(vec![line(p.id(), 1)]))).await.unwrap();
        let admin = Principal::admin(Uuid::new_v4());
        for action in [OrderAction::Confirm, OrderAction::Ship, OrderAction::Deliver] {
            shop.transition_order(&admin, order.id(), action, None).await.unwrap();
        }
        shop.order(&admin, order.id()).await.unwrap()
    }

    #[tokio::test]
    async fn test_place_order_from_cart() {
        let shop = shop();
        let user = Uuid::new_v4();
        let p = seed(&shop, "Sneaker", 300, 10).await;
        shop.add_to_cart(user, p.id(), 2).await.unwrap();

        let order = shop.place_order(user, checkout(None)).await.unwrap();
        assert_eq!(order.totals().subtotal, Money::from_major(600));
        assert_eq!(order.totals().shipping, Money::ZERO);
        assert_eq!(order.totals().tax, Money::from_major(60));
        assert_eq!(order.total(), Money::from_major(660));
        assert_eq!(order.status(), OrderStatus::Pending);
        assert_eq!(order.payment_status(), PaymentStatus::Pending);
        assert_eq!(order.tracking_history().len(), 1);

        assert!(shop.cart(user).await.unwrap().items.is_empty());
        assert_eq!(shop.product(p.id()).await.unwrap().stock(), 8);
        let log = shop.stock_movements(&MovementFilter { product_id: Some(p.id()), limit: 10 }).await.unwrap();
        assert_eq!(log[0].quantity, -2);
    }

    #[tokio::test]
    async fn test_insufficient_stock_changes_nothing() {
        let shop = shop();
        let user = Uuid::new_v4();
        let plenty = seed(&shop, "Plenty", 10, 50).await;
        let scarce = seed(&shop, "Scarce", 10, 1).await;
        shop.add_to_cart(user, plenty.id(), 3).await.unwrap();

        let err = shop.place_order(user, checkout(Some(vec![line(plenty.id(), 3), line(scarce.id(), 2)]))).await.unwrap_err();
        assert!(matches!(err, ShopError::InsufficientStock(_)));
        assert_eq!(shop.product(plenty.id()).await.unwrap().stock(), 50);
        assert_eq!(shop.product(scarce.id()).await.unwrap().stock(), 1);
        assert!(shop.orders(&Principal::customer(user)).await.unwrap().is_empty());
        assert_eq!(shop.cart(user).await.unwrap().item_count, 1);
    }

    #[tokio::test]
    async fn test_duplicate_lines_are_merged_before_stock_check() {
        let shop = shop();
        let p = seed(&shop, "Cap", 20, 3).await;
        let err = shop.place_order(Uuid::new_v4(), checkout(Some(vec![line(p.id(), 2), line(p.id(), 2)]))).await.unwrap_err();
        assert!(matches!(err, ShopError::InsufficientStock(_)));
    }

    #[tokio::test]
    async fn test_checkout_uses_current_price() {
        let shop = shop();
        let user = Uuid::new_v4();
        let p = seed(&shop, "Scarf", 100, 5).await;
        shop.add_to_cart(user, p.id(), 1).await.unwrap();
        shop.update_product(p.id(), crate::domain::aggregates::ProductRevision { price: Some(Money::from_major(120)), ..Default::default() }).await.unwrap();
        let order = shop.place_order(user, checkout(None)).await.unwrap();
        assert_eq!(order.items()[0].price, Money::from_major(120));
    }

    #[tokio::test]
    async fn test_empty_checkout_and_bad_address() {
        let shop = shop();
        let err = shop.place_order(Uuid::new_v4(), checkout(None)).await.unwrap_err();
        assert!(matches!(err, ShopError::Validation(_)));

        let p = seed(&shop, "Belt", 10, 5).await;
        let mut input = checkout(Some(vec![line(p.id(), 1)]));
        input.shipping_address.postal_code.clear();
        assert!(matches!(shop.place_order(Uuid::new_v4(), input).await, Err(ShopError::Validation(_))));
    }

    #[tokio::test]
    async fn test_order_numbers_are_unique() {
        let shop = shop();
        let p = seed(&shop, "Pen", 1, 100).await;
        let a = shop.place_order(Uuid::new_v4(), checkout(Some(vec![line(p.id(), 1)]))).await.unwrap();
        let b = shop.place_order(Uuid::new_v4(), checkout(Some(vec![line(p.id(), 1)]))).await.unwrap();
        assert_ne!(a.order_number(), b.order_number());
        assert_ne!(a.tracking_number(), b.tracking_number());
    }

    #[tokio::test]
    async fn test_online_payment_marked_paid() {
        let shop = shop();
        let p = seed(&shop, "Ink", 5, 10).await;
        let mut input = checkout(Some(vec![line(p.id(), 1)]));
        input.payment_method = PaymentMethod::Online;
        let order = shop.place_order(Uuid::new_v4(), input).await.unwrap();
        assert_eq!(order.payment_status(), PaymentStatus::Paid);
    }

    #[tokio::test]
    async fn test_cancel_pending_restores_stock() {
        let shop = shop();
        let user = Uuid::new_v4();
        let a = seed(&shop, "A", 10, 5).await;
        let b = seed(&shop, "B", 10, 5).await;
        let order = shop.place_order(user, checkout(Some(vec![line(a.id(), 2), line(b.id(), 5)]))).await.unwrap();
        assert_eq!(shop.product(b.id()).await.unwrap().stock(), 0);

        let cancelled = shop.cancel_order(&Principal::customer(user), order.id(), Some("wrong size".into())).await.unwrap();
        assert_eq!(cancelled.status(), OrderStatus::Cancelled);
        let cancel_entries = cancelled.tracking_history().iter().filter(|e| e.status == "Cancelled").count();
        assert_eq!(cancel_entries, 1);
        assert_eq!(cancelled.tracking_history().len(), 2);
        assert_eq!(shop.product(a.id()).await.unwrap().stock(), 5);
        assert_eq!(shop.product(b.id()).await.unwrap().stock(), 5);
    }

    #[tokio::test]
    async fn test_cancel_writes_one_add_movement_per_item() {
        let shop = shop();
        let user = Uuid::new_v4();
        let a = seed(&shop, "A", 10, 5).await;
        let b = seed(&shop, "B", 10, 5).await;
        let order = shop.place_order(user, checkout(Some(vec![line(a.id(), 2), line(b.id(), 3)]))).await.unwrap();
        shop.cancel_order(&Principal::customer(user), order.id(), None).await.unwrap();

        let expected = format!("Order {} cancelled", order.order_number());
        for (product, quantity) in [(&a, 2i64), (&b, 3)] {
            let log = shop.stock_movements(&MovementFilter { product_id: Some(product.id()), limit: 10 }).await.unwrap();
            let adds: Vec<_> = log.iter().filter(|m| m.action == StockAction::Add).collect();
            assert_eq!(adds.len(), 1);
            assert_eq!(adds[0].quantity, quantity);
            assert_eq!(adds[0].reason, expected);
            assert_eq!(adds[0].new_stock, 5);
        }
    }

    #[tokio::test]
    async fn test_lines_are_taken_in_product_id_order() {
        let shop = shop();
        let a = seed(&shop, "A", 10, 5).await;
        let b = seed(&shop, "B", 10, 5).await;
        let (low, high) = if a.id() < b.id() { (a.id(), b.id()) } else { (b.id(), a.id()) };
        let order = shop.place_order(Uuid::new_v4(), checkout(Some(vec![line(high, 1), line(low, 1)]))).await.unwrap();
        let ids: Vec<Uuid> = order.items().iter().map(|i| i.product_id).collect();
        assert_eq!(ids, vec![low, high]);
    }

    #[tokio::test]
    async fn test_cancel_shipped_fails() {
        let shop = shop();
        let user = Uuid::new_v4();
        let p = seed(&shop, "Lamp", 10, 5).await;
        let order = shop.place_order(user, checkout(Some(vec![line(p.id(), 1)]))).await.unwrap();
        let admin = Principal::admin(Uuid::new_v4());
        shop.transition_order(&admin, order.id(), OrderAction::Confirm, None).await.unwrap();
        shop.transition_order(&admin, order.id(), OrderAction::Ship, None).await.unwrap();

        let err = shop.cancel_order(&Principal::customer(user), order.id(), None).await.unwrap_err();
        assert!(matches!(err, ShopError::InvalidTransition(_)));
        assert_eq!(shop.product(p.id()).await.unwrap().stock(), 4);
    }

    #[tokio::test]
    async fn test_request_return() {
        let shop = shop();
        let user = Uuid::new_v4();
        let customer = Principal::customer(user);
        let order = delivered_order(&shop, user).await;
        let before = order.tracking_history().to_vec();

        let returned = shop.request_return(&customer, order.id(), Some("defective".into())).await.unwrap();
        assert_eq!(returned.status(), OrderStatus::ReturnRequested);
        assert_eq!(returned.return_reason(), Some("defective"));
        assert_eq!(&returned.tracking_history()[..before.len()], &before[..]);
        assert_eq!(returned.tracking_history().len(), before.len() + 1);
    }

    #[tokio::test]
    async fn test_request_return_before_delivery_fails() {
        let shop = shop();
        let user = Uuid::new_v4();
        let p = seed(&shop, "Sock", 5, 5).await;
        let order = shop.place_order(user, checkout(Some(vec![line(p.id(), 1)]))).await.unwrap();
        let err = shop.request_return(&Principal::customer(user), order.id(), None).await.unwrap_err();
        assert!(matches!(err, ShopError::InvalidTransition(_)));
    }

    #[tokio::test]
    async fn test_customer_cannot_ship_or_touch_foreign_orders() {
        let shop = shop();
        let owner = Uuid::new_v4();
        let p = seed(&shop, "Mat", 5, 5).await;
        let order = shop.place_order(owner, checkout(Some(vec![line(p.id(), 1)]))).await.unwrap();

        let err = shop.transition_order(&Principal::customer(owner), order.id(), OrderAction::Ship, None).await.unwrap_err();
        assert!(matches!(err, ShopError::Unauthorized));
        let err = shop.cancel_order(&Principal::customer(Uuid::new_v4()), order.id(), None).await.unwrap_err();
        assert!(matches!(err, ShopError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_order_listing_scoped() {
        let shop = shop();
        let p = seed(&shop, "Cup", 5, 10).await;
        let alice = Uuid::new_v4();
        shop.place_order(alice, checkout(Some(vec![line(p.id(), 1)]))).await.unwrap();
        shop.place_order(Uuid::new_v4(), checkout(Some(vec![line(p.id(), 1)]))).await.unwrap();
        assert_eq!(shop.orders(&Principal::customer(alice)).await.unwrap().len(), 1);
        assert_eq!(shop.orders(&Principal::admin(Uuid::new_v4())).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_order_invoice() {
        let shop = shop();
        let user = Uuid::new_v4();
        let p = seed(&shop, "Rug", 100, 10).await;
        let order = shop.place_order(user, checkout(Some(vec![line(p.id(), 2)]))).await.unwrap();
        let invoice = shop.order_invoice(&Principal::customer(user), order.id()).await.unwrap();
        assert_eq!(invoice.invoice_number.as_str(), format!("INV-{}", order.order_number()));
        assert_eq!(invoice.total, Money::from_major(270));
    }

    #[test]
    fn test_merge_lines() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let merged = merge_lines([line(a, 1), line(b, 2), line(a, 3)]);
        assert_eq!(merged.len(), 2);
        assert!(merged[0].product_id < merged[1].product_id);
        let a_line = merged.iter().find(|l| l.product_id == a).unwrap();
        assert_eq!(a_line.quantity, 4);
    }
}
