use axum::{extract::State, http::StatusCode};
use serde::Deserialize;
use uuid::Uuid;

use super::extract::{Json, Path};
use super::AppState;
use crate::auth::AuthUser;
use crate::domain::aggregates::{Order, OrderAction, OrderStatus};
use crate::domain::billing::Invoice;
use crate::error::{Result, ShopError};
use crate::services::PlaceOrder;
use crate::store::Store;

/// A transition addressed either by action or by the status it should produce.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOrderRequest {
    pub order_id: Uuid,
    pub action: Option<OrderAction>,
    pub status: Option<OrderStatus>,
    pub reason: Option<String>,
}

impl UpdateOrderRequest {
    fn action(&self) -> Result<OrderAction> {
        match (self.action, self.status) {
            (Some(action), _) => Ok(action),
            (None, Some(status)) => OrderAction::producing(status)
                .ok_or_else(|| ShopError::Validation(format!("no transition leads to {status}"))),
            (None, None) => Err(ShopError::Validation("either action or status is required".to_string())),
        }
    }
}

pub async fn place<S: Store>(State(s): State<AppState<S>>, AuthUser(u): AuthUser, Json(r): Json<PlaceOrder>) -> Result<(StatusCode, Json<Order>)> {
    Ok((StatusCode::CREATED, Json(s.shop.place_order(u.user_id, r).await?)))
}

pub async fn list<S: Store>(State(s): State<AppState<S>>, AuthUser(u): AuthUser) -> Result<Json<Vec<Order>>> {
    Ok(Json(s.shop.orders(&u).await?))
}

pub async fn get_one<S: Store>(State(s): State<AppState<S>>, AuthUser(u): AuthUser, Path(id): Path<Uuid>) -> Result<Json<Order>> {
    Ok(Json(s.shop.order(&u, id).await?))
}

pub async fn invoice<S: Store>(State(s): State<AppState<S>>, AuthUser(u): AuthUser, Path(id): Path<Uuid>) -> Result<Json<Invoice>> {
    Ok(Json(s.shop.order_invoice(&u, id).await?))
}

pub async fn update<S: Store>(State(s): State<AppState<S>>, AuthUser(u): AuthUser, Json(r): Json<UpdateOrderRequest>) -> Result<Json<Order>> {
    let action = r.action()?;
    Ok(Json(s.shop.transition_order(&u, r.order_id, action, r.reason).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(action: Option<OrderAction>, status: Option<OrderStatus>) -> UpdateOrderRequest {
        UpdateOrderRequest { order_id: Uuid::new_v4(), action, status, reason: None }
    }

    #[test]
    fn test_status_maps_to_action() {
        assert_eq!(request(None, Some(OrderStatus::Shipped)).action().unwrap(), OrderAction::Ship);
        assert_eq!(request(Some(OrderAction::Cancel), Some(OrderStatus::Shipped)).action().unwrap(), OrderAction::Cancel);
        assert!(matches!(request(None, Some(OrderStatus::Pending)).action(), Err(ShopError::Validation(_))));
        assert!(matches!(request(None, None).action(), Err(ShopError::Validation(_))));
    }

    #[test]
    fn test_request_parses_camel_case() {
        let id = Uuid::new_v4();
        let r: UpdateOrderRequest = serde_json::from_value(serde_json::json!({"orderId": id, "status": "cancelled", "reason": "late"})).unwrap();
        assert_eq!(r.order_id, id);
        assert_eq!(r.action().unwrap(), OrderAction::Cancel);
    }
}
