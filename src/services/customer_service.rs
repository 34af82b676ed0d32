use crate::backend::CacheBackend;
use crate::cache::CacheLayer;
use crate::entity::CacheEntity;
use crate::error::{Error, Result};
use crate::key::LIST_KEY;
use crate::models::{CreateCustomerRequest, Customer};
use crate::store::{CustomerStore, DUPLICATE_EMAIL};
use crate::views::CustomerView;
use std::sync::Arc;
use uuid::Uuid;

/// Read-through cached façade over a [`CustomerStore`].
pub struct CustomerService<R, B: CacheBackend> {
    store: Arc<R>,
    cache: CacheLayer<B>,
}

impl<R, B: CacheBackend> Clone for CustomerService<R, B> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            cache: self.cache.clone(),
        }
    }
}

impl<R: CustomerStore, B: CacheBackend> CustomerService<R, B> {
    pub fn new(store: Arc<R>, cache: CacheLayer<B>) -> Self {
        Self { store, cache }
    }

    /// Register a new customer and drop every cached customer entry.
    ///
    /// # Errors
    /// - `Error::Conflict` if the email is already registered; nothing is
    ///   written in that case
    /// - `Error::StoreError` / `Error::BackendError` on infrastructure failure
    pub async fn create(&self, request: CreateCustomerRequest) -> Result<CustomerView> {
        info!("[CustomerService] Creating customer: {}", request.email);

        // Cheap early exit; the store re-checks atomically on insert.
        if self.store.email_exists(&request.email).await? {
            return Err(Error::Conflict(DUPLICATE_EMAIL.to_string()));
        }

        let customer = Customer::new(request.name, request.email, request.phone);
        self.store.insert_customer(&customer).await?;

        self.cache
            .evict_namespace(&CustomerView::write_namespaces())
            .await?;

        Ok(customer.into())
    }

    /// All customers, served from cache when present.
    pub async fn list(&self) -> Result<Vec<CustomerView>> {
        info!("[CustomerService] Listing customers");
        self.cache
            .get_or_compute(CustomerView::list_namespace(), LIST_KEY, None, || {
                self.load_all()
            })
            .await
    }

    /// One customer projection, served from cache when present.
    ///
    /// # Errors
    /// Returns `Error::NotFound` if no customer has this id. Misses are not
    /// cached.
    pub async fn get(&self, id: Uuid) -> Result<CustomerView> {
        info!("[CustomerService] Getting customer: {}", id);
        self.cache
            .get_or_compute(CustomerView::namespace(), &id, None, || self.load_view(id))
            .await
    }

    /// The stored customer entity, straight from the store.
    ///
    /// # Errors
    /// Returns `Error::NotFound` if no customer has this id.
    pub async fn find_entity(&self, id: Uuid) -> Result<Customer> {
        self.store
            .customer_by_id(id)
            .await?
            .ok_or_else(|| Error::not_found("Customer"))
    }

    async fn load_view(&self, id: Uuid) -> Result<CustomerView> {
        self.find_entity(id).await.map(CustomerView::from)
    }

    async fn load_all(&self) -> Result<Vec<CustomerView>> {
        let customers = self.store.all_customers().await?;
        Ok(customers.into_iter().map(CustomerView::from).collect())
    }
}
