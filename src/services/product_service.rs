use crate::backend::CacheBackend;
use crate::cache::CacheLayer;
use crate::entity::CacheEntity;
use crate::error::{Error, Result};
use crate::key::LIST_KEY;
use crate::models::{CreateProductRequest, Product};
use crate::store::ProductStore;
use crate::views::ProductView;
use std::sync::Arc;
use uuid::Uuid;

/// Read-through cached façade over a [`ProductStore`].
pub struct ProductService<R, B: CacheBackend> {
    store: Arc<R>,
    cache: CacheLayer<B>,
}

impl<R, B: CacheBackend> Clone for ProductService<R, B> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            cache: self.cache.clone(),
        }
    }
}

impl<R: ProductStore, B: CacheBackend> ProductService<R, B> {
    pub fn new(store: Arc<R>, cache: CacheLayer<B>) -> Self {
        Self { store, cache }
    }

    /// Add a product to the catalog and drop every cached product entry.
    pub async fn create(&self, request: CreateProductRequest) -> Result<ProductView> {
        info!("[ProductService] Creating product: {}", request.name);

        let product = Product::new(request.name, request.price);
        self.store.insert_product(&product).await?;

        self.cache
            .evict_namespace(&ProductView::write_namespaces())
            .await?;

        Ok(product.into())
    }

    pub async fn list(&self) -> Result<Vec<ProductView>> {
        info!("[ProductService] Listing products");
        self.cache
            .get_or_compute(ProductView::list_namespace(), LIST_KEY, None, || {
                self.load_all()
            })
            .await
    }

    /// # Errors
    /// Returns `Error::NotFound` if no product has this id.
    pub async fn get(&self, id: Uuid) -> Result<ProductView> {
        info!("[ProductService] Getting product: {}", id);
        self.cache
            .get_or_compute(ProductView::namespace(), &id, None, || self.load_view(id))
            .await
    }

    /// The stored product, uncached. The order processor reads prices
    /// through here so a frozen unit price always comes from the store.
    pub async fn find_entity(&self, id: Uuid) -> Result<Product> {
        self.store
            .product_by_id(id)
            .await?
            .ok_or_else(|| Error::not_found("Product"))
    }

    async fn load_view(&self, id: Uuid) -> Result<ProductView> {
        self.find_entity(id).await.map(ProductView::from)
    }

    async fn load_all(&self) -> Result<Vec<ProductView>> {
        let products = self.store.all_products().await?;
        Ok(products.into_iter().map(ProductView::from).collect())
    }
}
