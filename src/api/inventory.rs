use axum::extract::State;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::extract::{Json, Query};
use super::AppState;
use crate::auth::AdminUser;
use crate::domain::aggregates::StockMovement;
use crate::error::Result;
use crate::services::{StockAdjustment, StockLevel};
use crate::store::{MovementFilter, Store};

#[derive(Debug, Deserialize)]
pub struct BulkStockRequest { pub items: Vec<StockLevel> }

#[derive(Debug, Serialize)]
pub struct BulkStockResponse { pub updated: usize }

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovementParams { pub product_id: Option<Uuid>, pub limit: Option<u32> }

pub async fn adjust<S: Store>(State(s): State<AppState<S>>, AdminUser(admin): AdminUser, Json(r): Json<StockAdjustment>) -> Result<Json<StockMovement>> {
    tracing::debug!(admin = %admin.user_id, product_id = %r.product_id, "stock adjustment requested");
    Ok(Json(s.shop.adjust_stock(r).await?))
}

pub async fn bulk<S: Store>(State(s): State<AppState<S>>, AdminUser(_): AdminUser, Json(r): Json<BulkStockRequest>) -> Result<Json<BulkStockResponse>> {
    Ok(Json(BulkStockResponse { updated: s.shop.bulk_set_stock(r.items).await? }))
}

pub async fn movements<S: Store>(State(s): State<AppState<S>>, AdminUser(_): AdminUser, Query(p): Query<MovementParams>) -> Result<Json<Vec<StockMovement>>> {
    let filter = MovementFilter { product_id: p.product_id, limit: i64::from(p.limit.unwrap_or(50).clamp(1, 500)) };
    Ok(Json(s.shop.stock_movements(&filter).await?))
}
