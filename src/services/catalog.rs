use uuid::Uuid;
use validator::Validate;

use super::Shop;
use crate::domain::aggregates::{Product, ProductDraft, ProductRevision};
use crate::error::{Result, ShopError};
use crate::store::{ProductFilter, Store, Transaction};

impl<S: Store> Shop<S> {
    pub async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<Product>> {
        let mut tx = self.store.begin().await?;
        tx.products(filter).await
    }

    pub async fn product(&self, id: Uuid) -> Result<Product> {
        let mut tx = self.store.begin().await?;
        tx.product(id).await?.ok_or_else(|| ShopError::not_found(format!("product {id}")))
    }

    pub async fn create_product(&self, draft: ProductDraft) -> Result<Product> {
        draft.validate()?;
        let product = Product::create(draft)?;
        let mut tx = self.store.begin().await?;
        tx.save_product(&product).await?;
        tx.commit().await?;
        tracing::info!(product_id = %product.id(), name = product.name(), stock = product.stock(), "product created");
        Ok(product)
    }

    pub async fn update_product(&self, id: Uuid, revision: ProductRevision) -> Result<Product> {
        revision.validate()?;
        let mut tx = self.store.begin().await?;
        let mut product = tx.product(id).await?.ok_or_else(|| ShopError::not_found(format!("product {id}")))?;
        product.revise(revision)?;
        tx.save_product(&product).await?;
        tx.commit().await?;
        tracing::info!(product_id = %id, "product updated");
        Ok(product)
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{seed, shop};
    use super::*;
    use crate::domain::aggregates::product::draft;
    use crate::domain::value_objects::Money;

    #[tokio::test]
    async fn test_create_and_fetch() {
        let shop = shop();
        let created = seed(&shop, "Desk", 120, 3).await;
        let fetched = shop.product(created.id()).await.unwrap();
        assert_eq!(fetched.name(), "Desk");
        assert_eq!(shop.list_products(&ProductFilter { limit: 10, ..Default::default() }).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_create_validates() {
        let shop = shop();
        let err = shop.create_product(draft("", 10, 1)).await.unwrap_err();
        assert!(matches!(err, ShopError::Validation(_)));
    }

    #[tokio::test]
    async fn test_update_missing_product() {
        let err = shop().update_product(Uuid::new_v4(), ProductRevision::default()).await.unwrap_err();
        assert!(matches!(err, ShopError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_update_price() {
        let shop = shop();
        let p = seed(&shop, "Chair", 80, 2).await;
        let updated = shop.update_product(p.id(), ProductRevision { price: Some(Money::from_major(95)), ..Default::default() }).await.unwrap();
        assert_eq!(updated.price(), Money::from_major(95));
        assert_eq!(shop.product(p.id()).await.unwrap().price(), Money::from_major(95));
    }
}
