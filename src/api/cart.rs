use axum::{extract::State, http::StatusCode};
use serde::Deserialize;
use uuid::Uuid;

use super::extract::{Json, Path};
use super::AppState;
use crate::auth::AuthUser;
use crate::domain::billing::Invoice;
use crate::error::Result;
use crate::services::CartView;
use crate::store::Store;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineRequest {
    pub product_id: Uuid,
    #[serde(default = "one")]
    pub quantity: u32,
}

fn one() -> u32 { 1 }

pub async fn get_cart<S: Store>(State(s): State<AppState<S>>, AuthUser(u): AuthUser) -> Result<Json<CartView>> {
    Ok(Json(s.shop.cart(u.user_id).await?))
}

pub async fn add<S: Store>(State(s): State<AppState<S>>, AuthUser(u): AuthUser, Json(r): Json<CartLineRequest>) -> Result<Json<CartView>> {
    Ok(Json(s.shop.add_to_cart(u.user_id, r.product_id, r.quantity).await?))
}

pub async fn set_quantity<S: Store>(State(s): State<AppState<S>>, AuthUser(u): AuthUser, Json(r): Json<CartLineRequest>) -> Result<Json<CartView>> {
    Ok(Json(s.shop.set_cart_quantity(u.user_id, r.product_id, r.quantity).await?))
}

pub async fn remove<S: Store>(State(s): State<AppState<S>>, AuthUser(u): AuthUser, Path(product_id): Path<Uuid>) -> Result<Json<CartView>> {
    Ok(Json(s.shop.remove_from_cart(u.user_id, product_id).await?))
}

pub async fn clear<S: Store>(State(s): State<AppState<S>>, AuthUser(u): AuthUser) -> Result<StatusCode> {
    s.shop.clear_cart(u.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn invoice<S: Store>(State(s): State<AppState<S>>, AuthUser(u): AuthUser) -> Result<Json<Invoice>> {
    Ok(Json(s.shop.cart_invoice(&u).await?))
}
