//! Product Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;
use validator::Validate;

use crate::domain::aggregates::stock::StockAction;
use crate::domain::events::{DomainEvent, ProductEvent};
use crate::domain::value_objects::{Money, Quantity};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    id: Uuid,
    name: String,
    description: Option<String>,
    price: Money,
    stock: Quantity,
    min_stock: u32,
    category: Option<String>,
    subcategory: Option<String>,
    discount_percent: u8,
    images: Vec<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(skip)]
    events: Vec<DomainEvent>,
}

/// Availability bucket, derived from stock against `min_stock`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductStatus { InStock, LowStock, OutOfStock }

/// Stock level before and after one change.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StockChange { pub previous: u32, pub new: u32 }

#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProductDraft {
    #[validate(length(min = 1, max = 200, message = "name is required"))]
    pub name: String,
    pub description: Option<String>,
    pub price: Money,
    #[serde(default)]
    pub stock: u32,
    #[serde(default)]
    pub min_stock: u32,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    #[serde(default)]
    #[validate(range(max = 100, message = "discount must be at most 100 percent"))]
    pub discount_percent: u8,
    #[serde(default)]
    pub images: Vec<String>,
}

/// Catalog edits. Stock only moves through inventory adjustments and orders.
#[derive(Clone, Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProductRevision {
    #[validate(length(min = 1, max = 200, message = "name must not be empty"))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Money>,
    pub min_stock: Option<u32>,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    #[validate(range(max = 100, message = "discount must be at most 100 percent"))]
    pub discount_percent: Option<u8>,
    pub images: Option<Vec<String>>,
}

impl Product {
    pub fn create(draft: ProductDraft) -> Result<Self, ProductError> {
        if draft.price.is_negative() { return Err(ProductError::NegativePrice); }
        let now = Utc::now();
        Ok(Self {
            id: Uuid::now_v7(), name: draft.name, description: draft.description, price: draft.price,
            stock: Quantity::new(draft.stock), min_stock: draft.min_stock, category: draft.category,
            subcategory: draft.subcategory, discount_percent: draft.discount_percent, images: draft.images,
            created_at: now, updated_at: now, events: vec![],
        })
    }

    pub fn id(&self) -> Uuid { self.id }
    pub fn name(&self) -> &str { &self.name }
    pub fn price(&self) -> Money { self.price }
    pub fn stock(&self) -> u32 { self.stock.value() }
    pub fn min_stock(&self) -> u32 { self.min_stock }
    pub fn category(&self) -> Option<&str> { self.category.as_deref() }
    pub fn images(&self) -> &[String] { &self.images }
    pub fn primary_image(&self) -> Option<&str> { self.images.first().map(String::as_str) }
    pub fn created_at(&self) -> DateTime<Utc> { self.created_at }

    pub fn status(&self) -> ProductStatus {
        if self.stock.is_zero() { ProductStatus::OutOfStock }
        else if self.stock.value() <= self.min_stock { ProductStatus::LowStock }
        else { ProductStatus::InStock }
    }

    pub fn revise(&mut self, rev: ProductRevision) -> Result<(), ProductError> {
        if rev.price.is_some_and(|p| p.is_negative()) { return Err(ProductError::NegativePrice); }
        if let Some(name) = rev.name { self.name = name; }
        if let Some(description) = rev.description { self.description = Some(description); }
        if let Some(price) = rev.price { self.price = price; }
        if let Some(min_stock) = rev.min_stock { self.min_stock = min_stock; }
        if let Some(category) = rev.category { self.category = Some(category); }
        if let Some(subcategory) = rev.subcategory { self.subcategory = Some(subcategory); }
        if let Some(discount) = rev.discount_percent { self.discount_percent = discount; }
        if let Some(images) = rev.images { self.images = images; }
        self.touch();
        Ok(())
    }

    /// Manual adjustment. Subtraction clamps at zero instead of failing.
    pub fn adjust_stock(&mut self, action: StockAction, qty: u32) -> StockChange {
        let next = match action {
            StockAction::Add => self.stock.add(qty),
            StockAction::Subtract => self.stock.subtract_clamped(qty),
        };
        self.replace_stock(next)
    }

    /// Takes `qty` units for an order; never clamps.
    pub fn reserve(&mut self, qty: u32) -> Result<StockChange, ProductError> {
        let next = self.stock.subtract(qty).ok_or_else(|| self.insufficient(qty))?;
        Ok(self.replace_stock(next))
    }

    pub fn ensure_available(&self, qty: u32) -> Result<(), ProductError> {
        if self.stock.value() < qty { return Err(self.insufficient(qty)); }
        Ok(())
    }

    pub fn set_stock(&mut self, stock: u32) -> StockChange { self.replace_stock(Quantity::new(stock)) }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }

    fn replace_stock(&mut self, next: Quantity) -> StockChange {
        let change = StockChange { previous: self.stock.value(), new: next.value() };
        self.stock = next;
        self.touch();
        self.raise_event(DomainEvent::Product(ProductEvent::StockChanged {
            product_id: self.id, previous_stock: change.previous, new_stock: change.new,
        }));
        change
    }

    fn insufficient(&self, requested: u32) -> ProductError {
        ProductError::InsufficientStock { product_id: self.id, name: self.name.clone(), requested, available: self.stock.value() }
    }

    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }
    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProductError {
    #[error("price must not be negative")]
    NegativePrice,
    #[error("insufficient stock for {name}: requested {requested}, available {available}")]
    InsufficientStock { product_id: Uuid, name: String, requested: u32, available: u32 },
}

#[cfg(test)]
pub(crate) fn draft(name: &str, price: i64, stock: u32) -> ProductDraft {
    ProductDraft {
        name: name.into(), description: None, price: Money::from_major(price), stock, min_stock: 5,
        category: Some("Shoes".into()), subcategory: None, discount_percent: 0, images: vec![format!("/img/{name}.png")],
    }
}
