use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use super::Shop;
use crate::domain::aggregates::{Product, StockAction, StockChange, StockMovement};
use crate::error::{Result, ShopError};
use crate::store::{MovementFilter, Store, Transaction};

#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct StockAdjustment {
    pub product_id: Uuid,
    pub action: StockAction,
    #[validate(range(min = 1, message = "quantity must be at least 1"))]
    pub quantity: u32,
    #[serde(default = "default_reason")]
    #[validate(length(min = 1, max = 500, message = "reason is required"))]
    pub reason: String,
}

fn default_reason() -> String { "Manual adjustment".to_string() }

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockLevel {
    pub product_id: Uuid,
    pub stock: u32,
}

/// Saves `product` and appends the audit record for `change`.
pub(super) async fn persist_stock_change<T: Transaction>(
    tx: &mut T,
    product: &Product,
    action: StockAction,
    quantity: u32,
    change: StockChange,
    reason: &str,
) -> Result<StockMovement> {
    let movement = StockMovement::record(product, action, quantity, change, reason);
    tx.save_product(product).await?;
    tx.record_movement(&movement).await?;
    Ok(movement)
}

impl<S: Store> Shop<S> {
    /// Manual stock correction. Subtracting more than is on hand leaves zero.
    pub async fn adjust_stock(&self, adj: StockAdjustment) -> Result<StockMovement> {
        adj.validate()?;
        let mut tx = self.store.begin().await?;
        let mut product = tx.product(adj.product_id).await?
            .ok_or_else(|| ShopError::not_found(format!("product {}", adj.product_id)))?;
        let change = product.adjust_stock(adj.action, adj.quantity);
        let movement = persist_stock_change(&mut tx, &product, adj.action, adj.quantity, change, &adj.reason).await?;
        let events = product.take_events();
        tx.commit().await?;

        tracing::info!(
            product_id = %adj.product_id, action = %adj.action, quantity = adj.quantity,
            previous = change.previous, new = change.new, "stock adjusted"
        );
        self.notifier.publish(events);
        Ok(movement)
    }

    /// Overwrites stock levels without audit records. All or nothing.
    pub async fn bulk_set_stock(&self, mut levels: Vec<StockLevel>) -> Result<usize> {
        // Lock rows in product id order, as checkout does.
        levels.sort_by_key(|l| l.product_id);
        let mut tx = self.store.begin().await?;
        let mut events = Vec::new();
        for level in &levels {
            let mut product = tx.product(level.product_id).await?
                .ok_or_else(|| ShopError::not_found(format!("product {}", level.product_id)))?;
            product.set_stock(level.stock);
            tx.save_product(&product).await?;
            events.extend(product.take_events());
        }
        tx.commit().await?;

        tracing::info!(count = levels.len(), "bulk stock update applied");
        self.notifier.publish(events);
        Ok(levels.len())
    }

    pub async fn stock_movements(&self, filter: &MovementFilter) -> Result<Vec<StockMovement>> {
        let mut tx = self.store.begin().await?;
        tx.movements(filter).await
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{seed, shop};
    use super::*;

    fn adjustment(product_id: Uuid, action: StockAction, quantity: u32) -> StockAdjustment {
        StockAdjustment { product_id, action, quantity, reason: "cycle count".into() }
    }

    #[tokio::test]
    async fn test_adjust_add_then_subtract() {
        for (initial, q1, q2) in [(10u32, 4u32, 3u32), (2, 0, 9), (0, 5, 5)] {
            let shop = shop();
            let p = seed(&shop, "Bolt", 1, initial).await;
            shop.adjust_stock(adjustment(p.id(), StockAction::Add, q1)).await.unwrap();
            let last = shop.adjust_stock(adjustment(p.id(), StockAction::Subtract, q2)).await.unwrap();
            let expected = (i64::from(initial) + i64::from(q1) - i64::from(q2)).max(0);
            assert_eq!(i64::from(last.new_stock), expected);
            assert_eq!(i64::from(shop.product(p.id()).await.unwrap().stock()), expected);
        }
    }

    #[tokio::test]
    async fn test_adjust_records_signed_movement() {
        let shop = shop();
        let p = seed(&shop, "Nut", 1, 3).await;
        let m = shop.adjust_stock(adjustment(p.id(), StockAction::Subtract, 5)).await.unwrap();
        assert_eq!((m.previous_stock, m.new_stock, m.quantity), (3, 0, -5));
        assert_eq!(m.reason, "cycle count");

        let log = shop.stock_movements(&MovementFilter { product_id: Some(p.id()), limit: 10 }).await.unwrap();
        assert_eq!(log, vec![m]);
    }

    #[tokio::test]
    async fn test_adjust_rejects_zero_quantity() {
        let shop = shop();
        let p = seed(&shop, "Washer", 1, 3).await;
        let err = shop.adjust_stock(adjustment(p.id(), StockAction::Add, 0)).await.unwrap_err();
        assert!(matches!(err, ShopError::Validation(_)));
    }

    #[tokio::test]
    async fn test_adjust_unknown_product() {
        let err = shop().adjust_stock(adjustment(Uuid::new_v4(), StockAction::Add, 1)).await.unwrap_err();
        assert!(matches!(err, ShopError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_bulk_set_is_unaudited_and_atomic() {
        let shop = shop();
        let a = seed(&shop, "A", 1, 1).await;
        let b = seed(&shop, "B", 1, 1).await;
        let n = shop.bulk_set_stock(vec![StockLevel { product_id: a.id(), stock: 40 }, StockLevel { product_id: b.id(), stock: 0 }]).await.unwrap();
        assert_eq!(n, 2);
        assert_eq!(shop.product(a.id()).await.unwrap().stock(), 40);
        assert!(shop.stock_movements(&MovementFilter { product_id: None, limit: 10 }).await.unwrap().is_empty());

        let err = shop.bulk_set_stock(vec![StockLevel { product_id: a.id(), stock: 7 }, StockLevel { product_id: Uuid::new_v4(), stock: 1 }]).await.unwrap_err();
        assert!(matches!(err, ShopError::NotFound(_)));
        assert_eq!(shop.product(a.id()).await.unwrap().stock(), 40);
    }
}
