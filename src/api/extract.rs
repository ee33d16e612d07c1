//! Extractors whose rejections render as `ShopError`, so malformed input
//! gets the same `{"error": ...}` 400 as any other validation failure.

use axum::extract::{FromRequest, FromRequestParts};
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::error::ShopError;

#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ShopError))]
pub struct Json<T>(pub T);

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response { axum::Json(self.0).into_response() }
}

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ShopError))]
pub struct Path<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ShopError))]
pub struct Query<T>(pub T);
