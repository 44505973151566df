mod handlers;

pub use handlers::*;

use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::service::InvoiceService;

pub fn router(service: Arc<InvoiceService>) -> Router {
    Router::new()
        .route("/", get(extract_invoice))
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}
