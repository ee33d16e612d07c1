//! JSON HTTP surface under `/api/v1`.

mod cart;
mod extract;
mod inventory;
mod orders;
mod products;

use axum::{extract::FromRef, routing::{get, put}, Json, Router};
use serde::Serialize;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::auth::TokenVerifier;
use crate::services::Shop;
use crate::store::Store;

#[derive(Clone)]
pub struct AppState<S> {
    pub shop: Shop<S>,
    pub verifier: Arc<TokenVerifier>,
}

impl<S> AppState<S> {
    pub fn new(shop: Shop<S>, verifier: TokenVerifier) -> Self { Self { shop, verifier: Arc::new(verifier) } }
}

impl<S> FromRef<AppState<S>> for Arc<TokenVerifier> {
    fn from_ref(state: &AppState<S>) -> Self { state.verifier.clone() }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Paginated<T> { pub data: Vec<T>, pub page: u32, pub per_page: u32 }

pub fn router<S: Store>(state: AppState<S>) -> Router {
    let api = Router::new()
        .route("/products", get(products::list::<S>).post(products::create::<S>))
        .route("/products/:id", get(products::get_one::<S>).put(products::update::<S>))
        .route("/cart", get(cart::get_cart::<S>).post(cart::add::<S>).put(cart::set_quantity::<S>).delete(cart::clear::<S>))
        .route("/cart/invoice", get(cart::invoice::<S>))
        .route("/cart/:product_id", axum::routing::delete(cart::remove::<S>))
        .route("/orders", get(orders::list::<S>).post(orders::place::<S>).put(orders::update::<S>))
        .route("/orders/:id", get(orders::get_one::<S>))
        .route("/orders/:id/invoice", get(orders::invoice::<S>))
        .route("/inventory", put(inventory::adjust::<S>))
        .route("/inventory/bulk", put(inventory::bulk::<S>))
        .route("/inventory/movements", get(inventory::movements::<S>));

    Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "shopfront"})) }))
        .nest("/api/v1", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
