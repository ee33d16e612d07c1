use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::domain::aggregates::{CartError, OrderError, ProductError};

#[derive(Error, Debug)]
pub enum ShopError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    InsufficientStock(String),

    #[error("{0}")]
    InvalidTransition(String),

    #[error("authentication required")]
    Unauthenticated,

    #[error("admin access required")]
    Unauthorized,

    #[error("{0}")]
    Validation(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("storage error: {0}")]
    Storage(String),
}

pub type Result<T> = std::result::Result<T, ShopError>;

impl ShopError {
    pub fn not_found(what: impl std::fmt::Display) -> Self { Self::NotFound(what.to_string()) }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::InsufficientStock(_) | Self::InvalidTransition(_) | Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::Unauthorized => StatusCode::FORBIDDEN,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ProductError> for ShopError {
    fn from(e: ProductError) -> Self {
        match e {
            ProductError::InsufficientStock { .. } => Self::InsufficientStock(e.to_string()),
            ProductError::NegativePrice => Self::Validation(e.to_string()),
        }
    }
}

impl From<CartError> for ShopError {
    fn from(e: CartError) -> Self {
        match e {
            CartError::ItemNotFound(_) => Self::NotFound(format!("cart item ({e})")),
            CartError::InvalidQuantity => Self::Validation(e.to_string()),
        }
    }
}

impl From<OrderError> for ShopError {
    fn from(e: OrderError) -> Self {
        match e {
            OrderError::NoItems => Self::Validation(e.to_string()),
            OrderError::InvalidTransition { .. } | OrderError::NotPaid => Self::InvalidTransition(e.to_string()),
        }
    }
}

impl From<validator::ValidationErrors> for ShopError {
    fn from(e: validator::ValidationErrors) -> Self { Self::Validation(e.to_string()) }
}

impl From<JsonRejection> for ShopError {
    fn from(e: JsonRejection) -> Self { Self::Validation(e.body_text()) }
}

impl From<PathRejection> for ShopError {
    fn from(e: PathRejection) -> Self { Self::Validation(e.body_text()) }
}

impl From<QueryRejection> for ShopError {
    fn from(e: QueryRejection) -> Self { Self::Validation(e.body_text()) }
}

impl From<sqlx::Error> for ShopError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => Self::Conflict(db.message().to_string()),
            other => Self::Storage(other.to_string()),
        }
    }
}

impl IntoResponse for ShopError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::{OrderAction, OrderStatus};

    #[test]
    fn test_status_mapping() {
        assert_eq!(ShopError::not_found("product").status(), StatusCode::NOT_FOUND);
        assert_eq!(ShopError::Unauthenticated.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ShopError::Unauthorized.status(), StatusCode::FORBIDDEN);
        assert_eq!(ShopError::Storage("boom".into()).status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_order_error_conversion() {
        let err: ShopError = OrderError::InvalidTransition { from: OrderStatus::Shipped, action: OrderAction::Cancel }.into();
        assert!(matches!(err, ShopError::InvalidTransition(_)));
        assert_eq!(err.to_string(), "cannot cancel an order that is shipped");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }
}
