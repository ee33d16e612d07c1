//! Shopfront order and inventory service
//!
//! Catalog, per-user carts, checkout and the order lifecycle behind a JSON
//! API.
//!
//! ## Features
//! - Audited stock adjustments
//! - Carts priced by one shared pricing policy
//! - Atomic checkout with stock reservation
//! - Order state machine with cancellation and returns
//! - Invoices for orders and live carts

pub mod api;
pub mod auth;
pub mod config;
pub mod domain;
pub mod error;
pub mod notify;
pub mod services;
pub mod store;

pub use config::AppConfig;
pub use error::{Result, ShopError};
pub use services::Shop;
