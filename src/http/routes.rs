use actix_web::{web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};
use std::{
    any::{Any, TypeId},
    collections::HashMap,
    sync::Arc,
};
use uuid::Uuid;

use super::error::{ApiError, Result, ResultExt};
use crate::backend::CacheBackend;
use crate::cache::CacheLayer;
use crate::models::{
    CreateCustomerRequest, CreateOrderRequest, CreateProductRequest, OrderStatus,
    UpdateOrderStatusRequest,
};
use crate::services::{CustomerService, OrderProcessor, ProductService};
use crate::store::{CustomerStore, OrderStore, ProductStore};

/// Application state - generic service container keyed by type.
pub struct AppState {
    services: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            services: HashMap::new(),
        }
    }

    /// Register a service by type.
    pub fn register<T: 'static + Send + Sync>(&mut self, service: Arc<T>) {
        self.services.insert(TypeId::of::<T>(), service);
    }

    /// Get a service by type; a missing one fails with `req`'s path.
    pub fn get<T: 'static + Send + Sync>(&self, req: &HttpRequest) -> Result<Arc<T>> {
        self.services
            .get(&TypeId::of::<T>())
            .and_then(|s| Arc::clone(s).downcast::<T>().ok())
            .ok_or_else(|| {
                ApiError::internal(format!(
                    "Service {} not registered",
                    std::any::type_name::<T>()
                ))
                .path(req.path())
            })
    }

    /// State holding every service the routes in [`configure`] need.
    pub fn with_services<R, B>(
        cache: CacheLayer<B>,
        customers: CustomerService<R, B>,
        products: ProductService<R, B>,
        orders: OrderProcessor<R, B>,
    ) -> Self
    where
        R: CustomerStore + ProductStore + OrderStore + 'static,
        B: CacheBackend + 'static,
    {
        let mut state = Self::new();
        state.register(Arc::new(cache));
        state.register(Arc::new(customers));
        state.register(Arc::new(products));
        state.register(Arc::new(orders));
        state
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

/// Register every route, under `/api/v1` plus `/health`.
///
/// Body, path and query extraction failures are answered with the same
/// JSON error shape as service failures.
pub fn configure<R, B>(cfg: &mut web::ServiceConfig)
where
    R: CustomerStore + ProductStore + OrderStore + 'static,
    B: CacheBackend + 'static,
{
    cfg.app_data(web::JsonConfig::default().error_handler(|err, req| {
        ApiError::bad_request(err.to_string()).path(req.path()).into()
    }))
    .app_data(web::PathConfig::default().error_handler(|err, req| {
        ApiError::bad_request(err.to_string()).path(req.path()).into()
    }))
    .app_data(web::QueryConfig::default().error_handler(|err, req| {
        ApiError::bad_request(err.to_string()).path(req.path()).into()
    }))
    .route("/health", web::get().to(health_check::<B>))
    .service(
        web::scope("/api/v1")
            .route("/customers", web::post().to(create_customer::<R, B>))
            .route("/customers", web::get().to(list_customers::<R, B>))
            .route("/customers/{id}", web::get().to(get_customer::<R, B>))
            .route("/products", web::post().to(create_product::<R, B>))
            .route("/products", web::get().to(list_products::<R, B>))
            .route("/products/{id}", web::get().to(get_product::<R, B>))
            .route("/orders", web::post().to(create_order::<R, B>))
            .route("/orders", web::get().to(list_orders::<R, B>))
            .route("/orders/{id}", web::get().to(get_order::<R, B>))
            .route(
                "/orders/{id}/status",
                web::patch().to(update_order_status::<R, B>),
            ),
    );
}

// ============================================================================
// Health Check
// ============================================================================

/// GET /health - reports cache backend reachability
pub async fn health_check<B: CacheBackend + 'static>(
    req: HttpRequest,
    data: web::Data<AppState>,
) -> Result<HttpResponse> {
    let cache = data.get::<CacheLayer<B>>(&req)?;
    let healthy = cache.backend().health_check().await.unwrap_or(false);
    let status = if healthy { "UP" } else { "DOWN" };
    let body = serde_json::json!({ "status": status, "cache": status });

    if healthy {
        Ok(HttpResponse::Ok().json(body))
    } else {
        Ok(HttpResponse::ServiceUnavailable().json(body))
    }
}

// ============================================================================
// Customer Endpoints
// ============================================================================

/// POST /api/v1/customers
pub async fn create_customer<R, B>(
    req: HttpRequest,
    body: web::Json<CreateCustomerRequest>,
    data: web::Data<AppState>,
) -> Result<HttpResponse>
where
    R: CustomerStore + 'static,
    B: CacheBackend + 'static,
{
    body.validate().for_request(&req)?;
    let service = data.get::<CustomerService<R, B>>(&req)?;
    let created = service.create(body.into_inner()).await.for_request(&req)?;
    Ok(HttpResponse::Created().json(created))
}

/// GET /api/v1/customers
pub async fn list_customers<R, B>(
    req: HttpRequest,
    data: web::Data<AppState>,
) -> Result<HttpResponse>
where
    R: CustomerStore + 'static,
    B: CacheBackend + 'static,
{
    let service = data.get::<CustomerService<R, B>>(&req)?;
    let customers = service.list().await.for_request(&req)?;
    Ok(HttpResponse::Ok().json(customers))
}

/// GET /api/v1/customers/{id}
pub async fn get_customer<R, B>(
    req: HttpRequest,
    path: web::Path<Uuid>,
    data: web::Data<AppState>,
) -> Result<HttpResponse>
where
    R: CustomerStore + 'static,
    B: CacheBackend + 'static,
{
    let service = data.get::<CustomerService<R, B>>(&req)?;
    let customer = service.get(path.into_inner()).await.for_request(&req)?;
    Ok(HttpResponse::Ok().json(customer))
}

// ============================================================================
// Product Endpoints
// ============================================================================

/// POST /api/v1/products
pub async fn create_product<R, B>(
    req: HttpRequest,
    body: web::Json<CreateProductRequest>,
    data: web::Data<AppState>,
) -> Result<HttpResponse>
where
    R: ProductStore + 'static,
    B: CacheBackend + 'static,
{
    body.validate().for_request(&req)?;
    let service = data.get::<ProductService<R, B>>(&req)?;
    let created = service.create(body.into_inner()).await.for_request(&req)?;
    Ok(HttpResponse::Created().json(created))
}

/// GET /api/v1/products
pub async fn list_products<R, B>(
    req: HttpRequest,
    data: web::Data<AppState>,
) -> Result<HttpResponse>
where
    R: ProductStore + 'static,
    B: CacheBackend + 'static,
{
    let service = data.get::<ProductService<R, B>>(&req)?;
    let products = service.list().await.for_request(&req)?;
    Ok(HttpResponse::Ok().json(products))
}

/// GET /api/v1/products/{id}
pub async fn get_product<R, B>(
    req: HttpRequest,
    path: web::Path<Uuid>,
    data: web::Data<AppState>,
) -> Result<HttpResponse>
where
    R: ProductStore + 'static,
    B: CacheBackend + 'static,
{
    let service = data.get::<ProductService<R, B>>(&req)?;
    let product = service.get(path.into_inner()).await.for_request(&req)?;
    Ok(HttpResponse::Ok().json(product))
}

// ============================================================================
// Order Endpoints
// ============================================================================

/// Query string of `GET /api/v1/orders`.
#[derive(Deserialize, Serialize, Default)]
pub struct OrderQuery {
    pub status: Option<OrderStatus>,
}

/// POST /api/v1/orders
pub async fn create_order<R, B>(
    req: HttpRequest,
    body: web::Json<CreateOrderRequest>,
    data: web::Data<AppState>,
) -> Result<HttpResponse>
where
    R: CustomerStore + ProductStore + OrderStore + 'static,
    B: CacheBackend + 'static,
{
    body.validate().for_request(&req)?;
    let processor = data.get::<OrderProcessor<R, B>>(&req)?;
    let order = processor.create(body.into_inner()).await.for_request(&req)?;
    Ok(HttpResponse::Created().json(order))
}

/// GET /api/v1/orders?status=SHIPPED
pub async fn list_orders<R, B>(
    req: HttpRequest,
    query: web::Query<OrderQuery>,
    data: web::Data<AppState>,
) -> Result<HttpResponse>
where
    R: CustomerStore + ProductStore + OrderStore + 'static,
    B: CacheBackend + 'static,
{
    let processor = data.get::<OrderProcessor<R, B>>(&req)?;
    let orders = processor
        .list(query.into_inner().status)
        .await
        .for_request(&req)?;
    Ok(HttpResponse::Ok().json(orders))
}

/// GET /api/v1/orders/{id}
pub async fn get_order<R, B>(
    req: HttpRequest,
    path: web::Path<Uuid>,
    data: web::Data<AppState>,
) -> Result<HttpResponse>
where
    R: CustomerStore + ProductStore + OrderStore + 'static,
    B: CacheBackend + 'static,
{
    let processor = data.get::<OrderProcessor<R, B>>(&req)?;
    let order = processor.get(path.into_inner()).await.for_request(&req)?;
    Ok(HttpResponse::Ok().json(order))
}

/// PATCH /api/v1/orders/{id}/status
pub async fn update_order_status<R, B>(
    req: HttpRequest,
    path: web::Path<Uuid>,
    body: web::Json<UpdateOrderStatusRequest>,
    data: web::Data<AppState>,
) -> Result<HttpResponse>
where
    R: CustomerStore + ProductStore + OrderStore + 'static,
    B: CacheBackend + 'static,
{
    let processor = data.get::<OrderProcessor<R, B>>(&req)?;
    let order = processor
        .update_status(path.into_inner(), body.status)
        .await
        .for_request(&req)?;
    Ok(HttpResponse::Ok().json(order))
}
