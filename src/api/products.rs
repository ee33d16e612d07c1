use axum::{extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{AppState, Paginated};
use super::extract::{Json, Path, Query};
use crate::auth::AdminUser;
use crate::domain::aggregates::{Product, ProductDraft, ProductRevision, ProductStatus};
use crate::error::Result;
use crate::store::{ProductFilter, Store};

#[derive(Debug, Deserialize)]
pub struct ListParams { pub page: Option<u32>, pub per_page: Option<u32>, pub category: Option<String>, pub search: Option<String> }

/// A product with its derived availability.
#[derive(Debug, Serialize)]
pub struct ProductView {
    #[serde(flatten)]
    pub product: Product,
    pub status: ProductStatus,
}

impl From<Product> for ProductView {
    fn from(product: Product) -> Self { Self { status: product.status(), product } }
}

pub async fn list<S: Store>(State(s): State<AppState<S>>, Query(p): Query<ListParams>) -> Result<Json<Paginated<ProductView>>> {
    let page = p.page.unwrap_or(1).max(1); let per_page = p.per_page.unwrap_or(20).clamp(1, 100);
    let filter = ProductFilter { category: p.category, search: p.search, limit: i64::from(per_page), offset: i64::from(page - 1) * i64::from(per_page) };
    let data = s.shop.list_products(&filter).await?.into_iter().map(ProductView::from).collect();
    Ok(Json(Paginated { data, page, per_page }))
}

pub async fn get_one<S: Store>(State(s): State<AppState<S>>, Path(id): Path<Uuid>) -> Result<Json<ProductView>> {
    Ok(Json(s.shop.product(id).await?.into()))
}

pub async fn create<S: Store>(State(s): State<AppState<S>>, AdminUser(_): AdminUser, Json(r): Json<ProductDraft>) -> Result<(StatusCode, Json<ProductView>)> {
    Ok((StatusCode::CREATED, Json(s.shop.create_product(r).await?.into())))
}

pub async fn update<S: Store>(State(s): State<AppState<S>>, AdminUser(_): AdminUser, Path(id): Path<Uuid>, Json(r): Json<ProductRevision>) -> Result<Json<ProductView>> {
    Ok(Json(s.shop.update_product(id, r).await?.into()))
}
