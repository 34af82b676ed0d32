//! Actix-web surface over the services (feature `http`).
//!
//! Shape validation of request bodies happens here and nowhere else.
//!
//! ```ignore
//! let state = web::Data::new(AppState::with_services(cache, customers, products, orders));
//!
//! HttpServer::new(move || {
//!     App::new()
//!         .app_data(state.clone())
//!         .configure(configure::<InMemoryStore, InMemoryBackend>)
//! })
//! ```

pub mod error;
pub mod routes;

pub use error::{ApiError, ErrorBody, ResultExt};
pub use routes::{configure, AppState, OrderQuery};
