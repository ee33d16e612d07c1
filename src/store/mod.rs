//! Document storage.
//!
//! Every service operation opens one [`Transaction`], does all of its reads
//! and writes through it and commits at the end. Dropping a transaction
//! without committing discards everything it wrote.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::{PgStore, MIGRATOR};

use std::future::Future;
use uuid::Uuid;

use crate::domain::aggregates::{Cart, Order, Product, StockMovement};
use crate::error::Result;

#[derive(Clone, Debug, Default)]
pub struct ProductFilter {
    pub category: Option<String>,
    /// Case-insensitive substring match on the product name.
    pub search: Option<String>,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Clone, Debug, Default)]
pub struct MovementFilter {
    pub product_id: Option<Uuid>,
    pub limit: i64,
}

pub trait Store: Clone + Send + Sync + 'static {
    type Tx: Transaction;

    fn begin(&self) -> impl Future<Output = Result<Self::Tx>> + Send;
}

pub trait Transaction: Send {
    /// Loads a product and holds it until commit.
    fn product(&mut self, id: Uuid) -> impl Future<Output = Result<Option<Product>>> + Send;
    fn products(&mut self, filter: &ProductFilter) -> impl Future<Output = Result<Vec<Product>>> + Send;
    fn save_product(&mut self, product: &Product) -> impl Future<Output = Result<()>> + Send;

    fn record_movement(&mut self, movement: &StockMovement) -> impl Future<Output = Result<()>> + Send;
    /// Newest first.
    fn movements(&mut self, filter: &MovementFilter) -> impl Future<Output = Result<Vec<StockMovement>>> + Send;

    fn cart(&mut self, user_id: Uuid) -> impl Future<Output = Result<Option<Cart>>> + Send;
    fn save_cart(&mut self, cart: &Cart) -> impl Future<Output = Result<()>> + Send;
    fn delete_cart(&mut self, user_id: Uuid) -> impl Future<Output = Result<()>> + Send;

    fn order(&mut self, id: Uuid) -> impl Future<Output = Result<Option<Order>>> + Send;
    /// All orders for `user_id`, or every order when `None`. Newest first.
    fn orders(&mut self, user_id: Option<Uuid>) -> impl Future<Output = Result<Vec<Order>>> + Send;
    /// Fails with `Conflict` if the order or tracking number is taken.
    fn insert_order(&mut self, order: &Order) -> impl Future<Output = Result<()>> + Send;
    fn update_order(&mut self, order: &Order) -> impl Future<Output = Result<()>> + Send;
    fn next_order_sequence(&mut self) -> impl Future<Output = Result<u64>> + Send;

    fn commit(self) -> impl Future<Output = Result<()>> + Send;
}
