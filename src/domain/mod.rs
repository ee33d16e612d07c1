//! Storefront domain: aggregates, pricing and billing
pub mod aggregates;
pub mod billing;
pub mod events;
pub mod pricing;
pub mod value_objects;
