use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use super::{MovementFilter, ProductFilter, Store, Transaction};
use crate::domain::aggregates::{Cart, Order, Product, StockMovement};
use crate::error::{Result, ShopError};

/// In-process store for development and tests.
///
/// Transactions run one at a time: `begin` takes the lock and works on a
/// copy of the collections, `commit` swaps the copy in.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<Collections>>,
}

#[derive(Clone, Default)]
struct Collections {
    products: HashMap<Uuid, Product>,
    carts: HashMap<Uuid, Cart>,
    orders: HashMap<Uuid, Order>,
    movements: Vec<StockMovement>,
    order_sequence: u64,
}

pub struct MemoryTransaction {
    guard: OwnedMutexGuard<Collections>,
    staged: Collections,
}

impl MemoryStore {
    pub fn new() -> Self { Self::default() }
}

impl Store for MemoryStore {
    type Tx = MemoryTransaction;

    async fn begin(&self) -> Result<MemoryTransaction> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let staged = guard.clone();
        Ok(MemoryTransaction { guard, staged })
    }
}

impl Transaction for MemoryTransaction {
    async fn product(&mut self, id: Uuid) -> Result<Option<Product>> {
        Ok(self.staged.products.get(&id).cloned())
    }

    async fn products(&mut self, filter: &ProductFilter) -> Result<Vec<Product>> {
        let search = filter.search.as_deref().map(str::to_lowercase);
        let mut products: Vec<Product> = self.staged.products.values()
            .filter(|p| filter.category.as_deref().map_or(true, |c| p.category() == Some(c)))
            .filter(|p| search.as_deref().map_or(true, |s| p.name().to_lowercase().contains(s)))
            .cloned()
            .collect();
        products.sort_by(|a, b| b.created_at().cmp(&a.created_at()).then_with(|| b.id().cmp(&a.id())));
        Ok(products.into_iter().skip(filter.offset.max(0) as usize).take(filter.limit.max(0) as usize).collect())
    }

    async fn save_product(&mut self, product: &Product) -> Result<()> {
        self.staged.products.insert(product.id(), product.clone());
        Ok(())
    }

    async fn record_movement(&mut self, movement: &StockMovement) -> Result<()> {
        self.staged.movements.push(movement.clone());
        Ok(())
    }

    async fn movements(&mut self, filter: &MovementFilter) -> Result<Vec<StockMovement>> {
        Ok(self.staged.movements.iter().rev()
            .filter(|m| filter.product_id.map_or(true, |id| m.product_id == id))
            .take(filter.limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn cart(&mut self, user_id: Uuid) -> Result<Option<Cart>> {
        Ok(self.staged.carts.get(&user_id).cloned())
    }

    async fn save_cart(&mut self, cart: &Cart) -> Result<()> {
        self.staged.carts.insert(cart.user_id(), cart.clone());
        Ok(())
    }

    async fn delete_cart(&mut self, user_id: Uuid) -> Result<()> {
        self.staged.carts.remove(&user_id);
        Ok(())
    }

    async fn order(&mut self, id: Uuid) -> Result<Option<Order>> {
        Ok(self.staged.orders.get(&id).cloned())
    }

    async fn orders(&mut self, user_id: Option<Uuid>) -> Result<Vec<Order>> {
        let mut orders: Vec<Order> = self.staged.orders.values()
            .filter(|o| user_id.map_or(true, |id| o.user_id() == id))
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at().cmp(&a.created_at()).then_with(|| b.id().cmp(&a.id())));
        Ok(orders)
    }

    async fn insert_order(&mut self, order: &Order) -> Result<()> {
        let taken = self.staged.orders.values().any(|o| {
            o.id() == order.id() || o.order_number() == order.order_number() || o.tracking_number() == order.tracking_number()
        });
        if taken {
            return Err(ShopError::Conflict(format!("order {} already exists", order.order_number())));
        }
        self.staged.orders.insert(order.id(), order.clone());
        Ok(())
    }

    async fn update_order(&mut self, order: &Order) -> Result<()> {
        match self.staged.orders.get_mut(&order.id()) {
            Some(existing) => { *existing = order.clone(); Ok(()) }
            None => Err(ShopError::not_found(format!("order {}", order.id()))),
        }
    }

    async fn next_order_sequence(&mut self) -> Result<u64> {
        self.staged.order_sequence += 1;
        Ok(self.staged.order_sequence)
    }

    async fn commit(mut self) -> Result<()> {
        *self.guard = self.staged;
        Ok(())
    }
}
