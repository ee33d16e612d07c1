//! Stock movement audit records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::domain::aggregates::product::{Product, StockChange};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StockAction { Add, Subtract }

impl StockAction {
    pub fn as_str(&self) -> &'static str {
        match self { Self::Add => "add", Self::Subtract => "subtract" }
    }
}

impl fmt::Display for StockAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for StockAction {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "add" => Ok(Self::Add),
            "subtract" => Ok(Self::Subtract),
            other => Err(format!("unknown stock action: {other}")),
        }
    }
}

/// One inventory change. Append-only; never updated after insert.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockMovement {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub previous_stock: u32,
    pub new_stock: u32,
    /// Requested quantity, negative for subtractions.
    pub quantity: i64,
    pub action: StockAction,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

impl StockMovement {
    pub fn record(product: &Product, action: StockAction, quantity: u32, change: StockChange, reason: impl Into<String>) -> Self {
        let signed = match action {
            StockAction::Add => i64::from(quantity),
            StockAction::Subtract => -i64::from(quantity),
        };
        Self {
            id: Uuid::now_v7(),
            product_id: product.id(),
            product_name: product.name().to_string(),
            previous_stock: change.previous,
            new_stock: change.new,
            quantity: signed,
            action,
            reason: reason.into(),
            created_at: Utc::now(),
        }
    }
}
