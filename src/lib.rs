//! Churn analytics service: turns uploaded customer CSVs into validated
//! records, summary metrics and cohort segments.

use axum::{extract::DefaultBodyLimit, http::Method, Router};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod routes;
pub mod services;

pub use error::{AppError, ValidationError};
pub use models::{ChurnMetrics, Dataset, NormalizedRecord, Segment};
pub use services::assembler::{assemble, ingest};

// Application state
#[derive(Debug)]
pub struct AppState {
    pub config: config::Config,
    pub store: services::store::DatasetStore,
}

impl AppState {
    pub fn new(config: config::Config) -> Self {
        Self {
            config,
            store: services::store::DatasetStore::new(),
        }
    }
}

/// Build the HTTP application around shared state.
pub fn app(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
        .max_age(Duration::from_secs(3600));

    Router::new()
        .merge(routes::routes())
        .merge(routes::uploads::routes())
        .merge(routes::analysis::routes())
        // Upload bodies are capped while streaming, so the validator sees every size.
        .layer(DefaultBodyLimit::disable())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
