//! Storefront operations. Each public method runs in one store transaction
//! and publishes the domain events it produced only after commit.

mod cart;
mod catalog;
mod inventory;
mod orders;

pub use cart::CartView;
pub use inventory::{StockAdjustment, StockLevel};
pub use orders::{OrderLine, PlaceOrder};

use crate::domain::billing::CompanyInfo;
use crate::domain::pricing::PricingPolicy;
use crate::notify::Notifier;
use crate::store::Store;

#[derive(Clone)]
pub struct Shop<S> {
    store: S,
    notifier: Notifier,
    pricing: PricingPolicy,
    company: CompanyInfo,
}

impl<S: Store> Shop<S> {
    pub fn new(store: S) -> Self {
        Self { store, notifier: Notifier::disabled(), pricing: PricingPolicy::default(), company: CompanyInfo::default() }
    }

    pub fn with_notifier(mut self, notifier: Notifier) -> Self { self.notifier = notifier; self }
    pub fn with_pricing(mut self, pricing: PricingPolicy) -> Self { self.pricing = pricing; self }
    pub fn with_company(mut self, company: CompanyInfo) -> Self { self.company = company; self }

    pub fn pricing(&self) -> &PricingPolicy { &self.pricing }
    pub fn company(&self) -> &CompanyInfo { &self.company }
}
