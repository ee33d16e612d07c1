use chrono::{DateTime, Utc};
use sqlx::migrate::Migrator;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;
use sqlx::{Postgres, Transaction as SqlxTransaction};
use uuid::Uuid;

use super::{MovementFilter, ProductFilter, Store, Transaction};
use crate::domain::aggregates::{Cart, Order, Product, StockAction, StockMovement};
use crate::error::{Result, ShopError};

pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// First key of the advisory locks taken on carts.
const CART_LOCK_SPACE: i32 = 0x4341_5254;

/// Documents live in JSONB columns; the few fields that are queried or
/// constrained are mirrored into plain columns.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

pub struct PgTransaction {
    tx: SqlxTransaction<'static, Postgres>,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self { Self { pool } }

    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new().max_connections(max_connections).connect(database_url).await?;
        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<()> {
        MIGRATOR.run(&self.pool).await.map_err(|e| ShopError::Storage(e.to_string()))
    }
}

impl Store for PgStore {
    type Tx = PgTransaction;

    async fn begin(&self) -> Result<PgTransaction> {
        Ok(PgTransaction { tx: self.pool.begin().await? })
    }
}

#[derive(sqlx::FromRow)]
struct MovementRow {
    id: Uuid,
    product_id: Uuid,
    product_name: String,
    previous_stock: i64,
    new_stock: i64,
    quantity: i64,
    action: String,
    reason: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<MovementRow> for StockMovement {
    type Error = ShopError;

    fn try_from(row: MovementRow) -> Result<Self> {
        let stock = |v: i64| u32::try_from(v).map_err(|_| ShopError::Storage(format!("stock out of range: {v}")));
        Ok(StockMovement {
            id: row.id,
            product_id: row.product_id,
            product_name: row.product_name,
            previous_stock: stock(row.previous_stock)?,
            new_stock: stock(row.new_stock)?,
            quantity: row.quantity,
            action: row.action.parse::<StockAction>().map_err(ShopError::Storage)?,
            reason: row.reason,
            created_at: row.created_at,
        })
    }
}

impl Transaction for PgTransaction {
    async fn product(&mut self, id: Uuid) -> Result<Option<Product>> {
        let row = sqlx::query_as::<_, (Json<Product>,)>("SELECT doc FROM products WHERE id = $1 FOR UPDATE")
            .bind(id).fetch_optional(&mut *self.tx).await?;
        Ok(row.map(|(Json(p),)| p))
    }

    async fn products(&mut self, filter: &ProductFilter) -> Result<Vec<Product>> {
        let rows = sqlx::query_as::<_, (Json<Product>,)>(
            "SELECT doc FROM products \
             WHERE ($1::text IS NULL OR doc->>'category' = $1) \
               AND ($2::text IS NULL OR doc->>'name' ILIKE '%' || $2 || '%') \
             ORDER BY created_at DESC, id DESC LIMIT $3 OFFSET $4",
        )
        .bind(filter.category.as_deref()).bind(filter.search.as_deref()).bind(filter.limit).bind(filter.offset)
        .fetch_all(&mut *self.tx).await?;
        Ok(rows.into_iter().map(|(Json(p),)| p).collect())
    }

    async fn save_product(&mut self, product: &Product) -> Result<()> {
        sqlx::query(
            "INSERT INTO products (id, doc, created_at, updated_at) VALUES ($1, $2, $3, NOW()) \
             ON CONFLICT (id) DO UPDATE SET doc = EXCLUDED.doc, updated_at = NOW()",
        )
        .bind(product.id()).bind(Json(product)).bind(product.created_at())
        .execute(&mut *self.tx).await?;
        Ok(())
    }

    async fn record_movement(&mut self, m: &StockMovement) -> Result<()> {
        sqlx::query(
            "INSERT INTO stock_movements (id, product_id, product_name, previous_stock, new_stock, quantity, action, reason, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(m.id).bind(m.product_id).bind(&m.product_name)
        .bind(i64::from(m.previous_stock)).bind(i64::from(m.new_stock)).bind(m.quantity)
        .bind(m.action.as_str()).bind(&m.reason).bind(m.created_at)
        .execute(&mut *self.tx).await?;
        Ok(())
    }

    async fn movements(&mut self, filter: &MovementFilter) -> Result<Vec<StockMovement>> {
        let rows = sqlx::query_as::<_, MovementRow>(
            "SELECT * FROM stock_movements WHERE ($1::uuid IS NULL OR product_id = $1) \
             ORDER BY created_at DESC, id DESC LIMIT $2",
        )
        .bind(filter.product_id).bind(filter.limit)
        .fetch_all(&mut *self.tx).await?;
        rows.into_iter().map(StockMovement::try_from).collect()
    }

    async fn cart(&mut self, user_id: Uuid) -> Result<Option<Cart>> {
        // A missing cart has no row to lock, so writers for one user also
        // meet on an advisory lock held until the transaction ends.
        sqlx::query("SELECT pg_advisory_xact_lock($1, hashtext($2::uuid::text))")
            .bind(CART_LOCK_SPACE).bind(user_id).execute(&mut *self.tx).await?;
        let row = sqlx::query_as::<_, (Json<Cart>,)>("SELECT doc FROM carts WHERE user_id = $1 FOR UPDATE")
            .bind(user_id).fetch_optional(&mut *self.tx).await?;
        Ok(row.map(|(Json(c),)| c))
    }

    async fn save_cart(&mut self, cart: &Cart) -> Result<()> {
        sqlx::query(
            "INSERT INTO carts (user_id, doc, updated_at) VALUES ($1, $2, $3) \
             ON CONFLICT (user_id) DO UPDATE SET doc = EXCLUDED.doc, updated_at = EXCLUDED.updated_at",
        )
        .bind(cart.user_id()).bind(Json(cart)).bind(cart.updated_at())
        .execute(&mut *self.tx).await?;
        Ok(())
    }

    async fn delete_cart(&mut self, user_id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM carts WHERE user_id = $1").bind(user_id).execute(&mut *self.tx).await?;
        Ok(())
    }

    async fn order(&mut self, id: Uuid) -> Result<Option<Order>> {
        let row = sqlx::query_as::<_, (Json<Order>,)>("SELECT doc FROM orders WHERE id = $1 FOR UPDATE")
            .bind(id).fetch_optional(&mut *self.tx).await?;
        Ok(row.map(|(Json(o),)| o))
    }

    async fn orders(&mut self, user_id: Option<Uuid>) -> Result<Vec<Order>> {
        let rows = sqlx::query_as::<_, (Json<Order>,)>(
            "SELECT doc FROM orders WHERE ($1::uuid IS NULL OR user_id = $1) ORDER BY created_at DESC, id DESC",
        )
        .bind(user_id).fetch_all(&mut *self.tx).await?;
        Ok(rows.into_iter().map(|(Json(o),)| o).collect())
    }

    async fn insert_order(&mut self, order: &Order) -> Result<()> {
        sqlx::query(
            "INSERT INTO orders (id, user_id, order_number, tracking_number, status, doc, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, NOW())",
        )
        .bind(order.id()).bind(order.user_id()).bind(order.order_number().as_str()).bind(order.tracking_number().as_str())
        .bind(order.status().as_str()).bind(Json(order)).bind(order.created_at())
        .execute(&mut *self.tx).await?;
        Ok(())
    }

    async fn update_order(&mut self, order: &Order) -> Result<()> {
        let result = sqlx::query("UPDATE orders SET status = $2, doc = $3, updated_at = NOW() WHERE id = $1")
            .bind(order.id()).bind(order.status().as_str()).bind(Json(order))
            .execute(&mut *self.tx).await?;
        if result.rows_affected() == 0 {
            return Err(ShopError::not_found(format!("order {}", order.id())));
        }
        Ok(())
    }

    async fn next_order_sequence(&mut self) -> Result<u64> {
        let (next,): (i64,) = sqlx::query_as("SELECT nextval('order_number_seq')").fetch_one(&mut *self.tx).await?;
        u64::try_from(next).map_err(|_| ShopError::Storage(format!("order sequence out of range: {next}")))
    }

    async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
