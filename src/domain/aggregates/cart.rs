//! Cart Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::aggregates::product::Product;
use crate::domain::pricing::Priced;
use crate::domain::value_objects::Money;

/// A user's cart. Holds at most one line per product.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    user_id: Uuid,
    items: Vec<CartItem>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Line item with a snapshot of the product taken when it was added.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub product_id: Uuid,
    pub name: String,
    pub price: Money,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub stock: Option<u32>,
    pub quantity: u32,
}

impl Priced for CartItem {
    fn unit_price(&self) -> Money { self.price }
    fn quantity(&self) -> u32 { self.quantity }
}

impl Cart {
    pub fn for_user(user_id: Uuid) -> Self {
        let now = Utc::now();
        Self { user_id, items: vec![], created_at: now, updated_at: now }
    }

    pub fn user_id(&self) -> Uuid { self.user_id }
    pub fn items(&self) -> &[CartItem] { &self.items }
    pub fn item_count(&self) -> usize { self.items.len() }
    pub fn is_empty(&self) -> bool { self.items.is_empty() }
    pub fn updated_at(&self) -> DateTime<Utc> { self.updated_at }

    /// Adds `quantity` of `product`, merging into an existing line. The
    /// snapshot of a merged line is refreshed from `product`.
    pub fn add_item(&mut self, product: &Product, quantity: u32) -> Result<(), CartError> {
        if quantity == 0 { return Err(CartError::InvalidQuantity); }
        let snapshot = CartItem {
            product_id: product.id(),
            name: product.name().to_string(),
            price: product.price(),
            image: product.primary_image().map(str::to_string),
            stock: Some(product.stock()),
            quantity,
        };
        if let Some(existing) = self.items.iter_mut().find(|i| i.product_id == snapshot.product_id) {
            let merged = existing.quantity.saturating_add(quantity);
            *existing = CartItem { quantity: merged, ..snapshot };
        } else {
            self.items.push(snapshot);
        }
        self.touch();
        Ok(())
    }

    /// Zero removes the line.
    pub fn set_quantity(&mut self, product_id: Uuid, quantity: u32) -> Result<(), CartError> {
        let item = self.items.iter_mut().find(|i| i.product_id == product_id).ok_or(CartError::ItemNotFound(product_id))?;
        if quantity == 0 { self.items.retain(|i| i.product_id != product_id); }
        else { item.quantity = quantity; }
        self.touch();
        Ok(())
    }

    pub fn remove_item(&mut self, product_id: Uuid) -> bool {
        let before = self.items.len();
        self.items.retain(|i| i.product_id != product_id);
        let removed = self.items.len() != before;
        if removed { self.touch(); }
        removed
    }

    /// Fills image/stock snapshots that are missing on lines for `product`.
    /// Price is left alone. Returns whether anything changed.
    pub fn backfill(&mut self, product: &Product) -> bool {
        let mut changed = false;
        for item in self.items.iter_mut().filter(|i| i.product_id == product.id()) {
            if item.image.is_none() {
                if let Some(image) = product.primary_image() {
                    item.image = Some(image.to_string());
                    changed = true;
                }
            }
            if item.stock.is_none() {
                item.stock = Some(product.stock());
                changed = true;
            }
        }
        if changed { self.touch(); }
        changed
    }

    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CartError {
    #[error("product {0} is not in the cart")]
    ItemNotFound(Uuid),
    #[error("quantity must be at least 1")]
    InvalidQuantity,
}
