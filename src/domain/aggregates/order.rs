//! Order Aggregate
//!
//! Orders are created once at checkout and afterwards only move through
//! [`Order::apply`]. Every accepted action appends one entry to the tracking
//! history; nothing is ever removed from it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;
use validator::Validate;

use crate::domain::events::{DomainEvent, OrderEvent};
use crate::domain::pricing::{Priced, Totals};
use crate::domain::value_objects::{Money, OrderNumber, TrackingNumber};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    id: Uuid,
    order_number: OrderNumber,
    tracking_number: TrackingNumber,
    user_id: Uuid,
    items: Vec<OrderItem>,
    #[serde(flatten)]
    totals: Totals,
    status: OrderStatus,
    payment_method: PaymentMethod,
    payment_status: PaymentStatus,
    shipping_address: ShippingAddress,
    tracking_history: Vec<TrackingEntry>,
    cancel_reason: Option<String>,
    return_reason: Option<String>,
    delivered_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(skip)]
    events: Vec<DomainEvent>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: Uuid,
    pub name: String,
    pub price: Money,
    pub quantity: u32,
    pub image: Option<String>,
}

impl Priced for OrderItem {
    fn unit_price(&self) -> Money { self.price }
    fn quantity(&self) -> u32 { self.quantity }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    #[validate(length(min = 1, message = "full name is required"))]
    pub full_name: String,
    #[validate(length(min = 5, message = "phone is required"))]
    pub phone: String,
    #[validate(length(min = 1, message = "address line is required"))]
    pub address_line1: String,
    pub address_line2: Option<String>,
    #[validate(length(min = 1, message = "city is required"))]
    pub city: String,
    #[validate(length(min = 1, message = "state is required"))]
    pub state: String,
    #[validate(length(min = 3, message = "postal code is required"))]
    pub postal_code: String,
    pub country: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingEntry {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub description: String,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
    ReturnRequested,
    ReturnApproved,
    ReturnRejected,
    Refunded,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderAction {
    Confirm,
    Process,
    Ship,
    Deliver,
    Cancel,
    #[serde(alias = "return")]
    RequestReturn,
    ApproveReturn,
    RejectReturn,
    Refund,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    #[default]
    Cod,
    Online,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Refunded,
}

/// The order state machine. `None` means the action is not allowed from
/// `from`.
pub fn next_status(from: OrderStatus, action: OrderAction) -> Option<OrderStatus> {
    use OrderAction as A;
    use OrderStatus as S;
    match (from, action) {
        (S::Pending, A::Confirm) => Some(S::Confirmed),
        (S::Pending | S::Confirmed, A::Cancel) => Some(S::Cancelled),
        (S::Confirmed, A::Process) => Some(S::Processing),
        (S::Confirmed | S::Processing, A::Ship) => Some(S::Shipped),
        (S::Shipped, A::Deliver) => Some(S::Delivered),
        (S::Delivered, A::RequestReturn) => Some(S::ReturnRequested),
        (S::ReturnRequested, A::ApproveReturn) => Some(S::ReturnApproved),
        (S::ReturnRequested, A::RejectReturn) => Some(S::ReturnRejected),
        (S::ReturnApproved | S::Cancelled, A::Refund) => Some(S::Refunded),
        _ => None,
    }
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
            Self::ReturnRequested => "return_requested",
            Self::ReturnApproved => "return_approved",
            Self::ReturnRejected => "return_rejected",
            Self::Refunded => "refunded",
        }
    }

    /// Label written into tracking history.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Pending => "Order Placed",
            Self::Confirmed => "Confirmed",
            Self::Processing => "Processing",
            Self::Shipped => "Shipped",
            Self::Delivered => "Delivered",
            Self::Cancelled => "Cancelled",
            Self::ReturnRequested => "Return Requested",
            Self::ReturnApproved => "Return Approved",
            Self::ReturnRejected => "Return Rejected",
            Self::Refunded => "Refunded",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl OrderAction {
    /// The single action whose transition ends in `status`, if any.
    pub fn producing(status: OrderStatus) -> Option<Self> {
        match status {
            OrderStatus::Pending => None,
            OrderStatus::Confirmed => Some(Self::Confirm),
            OrderStatus::Processing => Some(Self::Process),
            OrderStatus::Shipped => Some(Self::Ship),
            OrderStatus::Delivered => Some(Self::Deliver),
            OrderStatus::Cancelled => Some(Self::Cancel),
            OrderStatus::ReturnRequested => Some(Self::RequestReturn),
            OrderStatus::ReturnApproved => Some(Self::ApproveReturn),
            OrderStatus::ReturnRejected => Some(Self::RejectReturn),
            OrderStatus::Refunded => Some(Self::Refund),
        }
    }

    /// Actions a customer may take on their own order.
    pub fn customer_allowed(&self) -> bool { matches!(self, Self::Cancel | Self::RequestReturn) }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Confirm => "confirm",
            Self::Process => "process",
            Self::Ship => "ship",
            Self::Deliver => "deliver",
            Self::Cancel => "cancel",
            Self::RequestReturn => "request_return",
            Self::ApproveReturn => "approve_return",
            Self::RejectReturn => "reject_return",
            Self::Refund => "refund",
        }
    }
}

impl fmt::Display for OrderAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// Everything checkout has worked out before the order exists.
#[derive(Clone, Debug)]
pub struct NewOrder {
    pub user_id: Uuid,
    pub sequence: u64,
    pub items: Vec<OrderItem>,
    pub totals: Totals,
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
}

impl Order {
    pub fn place(new: NewOrder) -> Result<Self, OrderError> {
        if new.items.is_empty() { return Err(OrderError::NoItems); }
        let now = Utc::now();
        let payment_status = match new.payment_method {
            PaymentMethod::Cod => PaymentStatus::Pending,
            PaymentMethod::Online => PaymentStatus::Paid,
        };
        let mut order = Self {
            id: Uuid::now_v7(),
            order_number: OrderNumber::new(now, new.sequence),
            tracking_number: TrackingNumber::new(now, new.sequence),
            user_id: new.user_id,
            items: new.items,
            totals: new.totals,
            status: OrderStatus::Pending,
            payment_method: new.payment_method,
            payment_status,
            shipping_address: new.shipping_address,
            tracking_history: vec![TrackingEntry {
                status: OrderStatus::Pending.label().to_string(),
                timestamp: now,
                description: "Your order has been placed successfully".to_string(),
            }],
            cancel_reason: None,
            return_reason: None,
            delivered_at: None,
            created_at: now,
            updated_at: now,
            events: vec![],
        };
        order.raise_event(DomainEvent::Order(OrderEvent::Placed {
            order_id: order.id, order_number: order.order_number.clone(), user_id: order.user_id, total: order.totals.total,
        }));
        Ok(order)
    }

    pub fn id(&self) -> Uuid { self.id }
    pub fn order_number(&self) -> &OrderNumber { &self.order_number }
    pub fn tracking_number(&self) -> &TrackingNumber { &self.tracking_number }
    pub fn user_id(&self) -> Uuid { self.user_id }
    pub fn items(&self) -> &[OrderItem] { &self.items }
    pub fn totals(&self) -> &Totals { &self.totals }
    pub fn total(&self) -> Money { self.totals.total }
    pub fn status(&self) -> OrderStatus { self.status }
    pub fn payment_method(&self) -> PaymentMethod { self.payment_method }
    pub fn payment_status(&self) -> PaymentStatus { self.payment_status }
    pub fn shipping_address(&self) -> &ShippingAddress { &self.shipping_address }
    pub fn tracking_history(&self) -> &[TrackingEntry] { &self.tracking_history }
    pub fn cancel_reason(&self) -> Option<&str> { self.cancel_reason.as_deref() }
    pub fn return_reason(&self) -> Option<&str> { self.return_reason.as_deref() }
    pub fn delivered_at(&self) -> Option<DateTime<Utc>> { self.delivered_at }
    pub fn created_at(&self) -> DateTime<Utc> { self.created_at }

    /// Runs `action` through the state machine. Returns the status the order
    /// was in before.
    pub fn apply(&mut self, action: OrderAction, reason: Option<String>) -> Result<OrderStatus, OrderError> {
        let from = self.status;
        let to = next_status(from, action).ok_or(OrderError::InvalidTransition { from, action })?;
        if action == OrderAction::Refund && self.payment_status != PaymentStatus::Paid {
            return Err(OrderError::NotPaid);
        }

        let now = Utc::now();
        let description = match action {
            OrderAction::Confirm => "Order confirmed by the seller".to_string(),
            OrderAction::Process => "Order is being packed".to_string(),
            OrderAction::Ship => format!("Shipped with tracking number {}", self.tracking_number),
            OrderAction::Deliver => "Order delivered".to_string(),
            OrderAction::Cancel => with_reason("Order cancelled", reason.as_deref()),
            OrderAction::RequestReturn => with_reason("Return requested", reason.as_deref()),
            OrderAction::ApproveReturn => "Return request approved".to_string(),
            OrderAction::RejectReturn => with_reason("Return request rejected", reason.as_deref()),
            OrderAction::Refund => format!("Refund of {} issued", self.totals.total),
        };

        match action {
            OrderAction::Cancel => self.cancel_reason = reason,
            OrderAction::RequestReturn => self.return_reason = reason,
            OrderAction::Deliver => {
                self.delivered_at = Some(now);
                if self.payment_method == PaymentMethod::Cod { self.payment_status = PaymentStatus::Paid; }
            }
            OrderAction::Refund => self.payment_status = PaymentStatus::Refunded,
            _ => {}
        }

        self.status = to;
        self.tracking_history.push(TrackingEntry { status: to.label().to_string(), timestamp: now, description });
        self.updated_at = now;
        self.raise_event(DomainEvent::Order(OrderEvent::StatusChanged {
            order_id: self.id, order_number: self.order_number.clone(), from, to,
        }));
        Ok(from)
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }
    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }
}

fn with_reason(base: &str, reason: Option<&str>) -> String {
    match reason.map(str::trim).filter(|r| !r.is_empty()) {
        Some(r) => format!("{base}: {r}"),
        None => base.to_string(),
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OrderError {
    #[error("order has no items")]
    NoItems,
    #[error("cannot {action} an order that is {from}")]
    InvalidTransition { from: OrderStatus, action: OrderAction },
    #[error("order has not been paid")]
    NotPaid,
}

#[cfg(test)]
pub(crate) fn sample_address() -> ShippingAddress {
    ShippingAddress {
        full_name: "Asha Rao".into(), phone: "9876543210".into(), address_line1: "12 MG Road".into(),
        address_line2: None, city: "Bengaluru".into(), state: "KA".into(), postal_code: "560001".into(), country: None,
    }
}
