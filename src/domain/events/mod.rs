//! Domain events
use crate::domain::aggregates::order::OrderStatus;
use crate::domain::value_objects::{Money, OrderNumber};
use serde::Serialize;
use uuid::Uuid;

#[derive(Clone, Debug, Serialize)]
#[serde(untagged)]
pub enum DomainEvent {
    Product(ProductEvent),
    Order(OrderEvent),
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ProductEvent {
    StockChanged { product_id: Uuid, previous_stock: u32, new_stock: u32 },
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum OrderEvent {
    Placed { order_id: Uuid, order_number: OrderNumber, user_id: Uuid, total: Money },
    StatusChanged { order_id: Uuid, order_number: OrderNumber, from: OrderStatus, to: OrderStatus },
}

impl DomainEvent {
    /// Subject suffix the event is published under.
    pub fn subject(&self) -> &'static str {
        match self {
            Self::Product(ProductEvent::StockChanged { .. }) => "stock.changed",
            Self::Order(OrderEvent::Placed { .. }) => "order.placed",
            Self::Order(OrderEvent::StatusChanged { .. }) => "order.status_changed",
        }
    }
}
