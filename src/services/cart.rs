use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use super::Shop;
use crate::auth::Principal;
use crate::domain::aggregates::{Cart, CartItem};
use crate::domain::billing::{Customer, Invoice};
use crate::domain::pricing::{PricingPolicy, Totals};
use crate::error::{Result, ShopError};
use crate::store::{Store, Transaction};

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub user_id: Uuid,
    pub items: Vec<CartItem>,
    pub item_count: usize,
    #[serde(flatten)]
    pub totals: Totals,
}

impl CartView {
    fn of(cart: &Cart, pricing: &PricingPolicy) -> Self {
        Self { user_id: cart.user_id(), items: cart.items().to_vec(), item_count: cart.item_count(), totals: pricing.totals(cart.items()) }
    }
}

impl<S: Store> Shop<S> {
    /// Current cart with fresh totals. Lines missing their image or stock
    /// snapshot are repaired from the product and saved.
    pub async fn cart(&self, user_id: Uuid) -> Result<CartView> {
        let mut tx = self.store.begin().await?;
        let Some(mut cart) = tx.cart(user_id).await? else {
            return Ok(CartView::of(&Cart::for_user(user_id), &self.pricing));
        };

        let stale: Vec<Uuid> = cart.items().iter()
            .filter(|i| i.image.is_none() || i.stock.is_none())
            .map(|i| i.product_id)
            .collect();
        let mut repaired = false;
        for product_id in stale {
            if let Some(product) = tx.product(product_id).await? {
                repaired |= cart.backfill(&product);
            }
        }
        if repaired {
            tx.save_cart(&cart).await?;
            tx.commit().await?;
            tracing::debug!(%user_id, "cart snapshots repaired");
        }
        Ok(CartView::of(&cart, &self.pricing))
    }

    pub async fn add_to_cart(&self, user_id: Uuid, product_id: Uuid, quantity: u32) -> Result<CartView> {
        let mut tx = self.store.begin().await?;
        let mut cart = tx.cart(user_id).await?.unwrap_or_else(|| Cart::for_user(user_id));
        let product = tx.product(product_id).await?.ok_or_else(|| ShopError::not_found(format!("product {product_id}")))?;
        cart.add_item(&product, quantity)?;
        tx.save_cart(&cart).await?;
        tx.commit().await?;
        tracing::debug!(%user_id, %product_id, quantity, "added to cart");
        Ok(CartView::of(&cart, &self.pricing))
    }

    pub async fn set_cart_quantity(&self, user_id: Uuid, product_id: Uuid, quantity: u32) -> Result<CartView> {
        let mut tx = self.store.begin().await?;
        let mut cart = tx.cart(user_id).await?.ok_or_else(|| ShopError::not_found("cart"))?;
        cart.set_quantity(product_id, quantity)?;
        tx.save_cart(&cart).await?;
        tx.commit().await?;
        Ok(CartView::of(&cart, &self.pricing))
    }

    pub async fn remove_from_cart(&self, user_id: Uuid, product_id: Uuid) -> Result<CartView> {
        let mut tx = self.store.begin().await?;
        let Some(mut cart) = tx.cart(user_id).await? else {
            return Ok(CartView::of(&Cart::for_user(user_id), &self.pricing));
        };
        if cart.remove_item(product_id) {
            tx.save_cart(&cart).await?;
            tx.commit().await?;
        }
        Ok(CartView::of(&cart, &self.pricing))
    }

    pub async fn clear_cart(&self, user_id: Uuid) -> Result<()> {
        let mut tx = self.store.begin().await?;
        tx.delete_cart(user_id).await?;
        tx.commit().await
    }

    pub async fn cart_invoice(&self, principal: &Principal) -> Result<Invoice> {
        let mut tx = self.store.begin().await?;
        let cart = tx.cart(principal.user_id).await?.unwrap_or_else(|| Cart::for_user(principal.user_id));
        let customer = Customer {
            user_id: principal.user_id,
            name: principal.name.clone(),
            email: principal.email.clone(),
            ..Default::default()
        };
        Ok(Invoice::for_cart(&cart, customer, &self.company, &self.pricing, Utc::now()))
    }
}
