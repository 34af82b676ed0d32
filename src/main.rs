use actix_web::{middleware::Logger, web, App, HttpServer};
use delivery_kit::{
    backend::InMemoryBackend,
    http::{configure, AppState},
    store::{CustomerStore, InMemoryStore, OrderStore, ProductStore},
    AppConfig, CacheLayer, CustomerService, OrderProcessor, ProductService,
};
use std::io;
use std::sync::Arc;

#[actix_web::main]
async fn main() -> io::Result<()> {
    // Load environment variables before the logger reads RUST_LOG
    dotenv::dotenv().ok();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = AppConfig::from_env()
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e.to_string()))?;

    run(config).await
}

#[cfg(feature = "postgres")]
async fn run(config: AppConfig) -> io::Result<()> {
    match config.database_url.clone() {
        Some(url) => {
            log::info!("📦 Connecting to PostgreSQL...");
            let store = delivery_kit::store::PgStore::connect(&url)
                .await
                .map_err(io::Error::other)?;
            serve(config, Arc::new(store)).await
        }
        None => {
            log::info!("📦 DATABASE_URL not set, using in-memory store");
            serve(config, Arc::new(InMemoryStore::new())).await
        }
    }
}

#[cfg(not(feature = "postgres"))]
async fn run(config: AppConfig) -> io::Result<()> {
    if config.database_url.is_some() {
        log::warn!("DATABASE_URL is set but the `postgres` feature is off; using the in-memory store");
    }

    log::info!("📦 Using in-memory store");
    serve(config, Arc::new(InMemoryStore::new())).await
}

async fn serve<R>(config: AppConfig, store: Arc<R>) -> io::Result<()>
where
    R: CustomerStore + ProductStore + OrderStore + 'static,
{
    // Layer 1: cache
    let cache = CacheLayer::new(InMemoryBackend::new()).with_ttl_policy(config.ttl_policy());

    // Layer 2: services sharing the store and the cache
    let customers = CustomerService::new(Arc::clone(&store), cache.clone());
    let products = ProductService::new(Arc::clone(&store), cache.clone());
    let orders = OrderProcessor::new(store, customers.clone(), products.clone());

    // Layer 3: HTTP state
    let state = web::Data::new(AppState::with_services(cache, customers, products, orders));

    let bind_address = config.bind_address();
    log::info!(
        "🚀 Starting server at http://{} (cache TTL {:?})",
        bind_address,
        config.cache_ttl
    );

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(state.clone())
            .configure(configure::<R, InMemoryBackend>)
    })
    .bind(&bind_address)?
    .run()
    .await
}
