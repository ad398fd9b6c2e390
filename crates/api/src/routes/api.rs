use crate::routes::{health::health_check, usage_info::list_usage_info};
use axum::{routing::get, Router};
use services::usage_info::UsageInfoServiceTrait;
use std::sync::Arc;

/// Application state shared across all route handlers
#[derive(Clone)]
pub struct AppState {
    pub usage_info_service: Arc<dyn UsageInfoServiceTrait>,
    /// Rows per page of the usage info listing
    pub page_size: i64,
}

/// Build the router serving the usage info listing and the health check
pub fn build_usage_info_router(app_state: AppState) -> Router {
    Router::new()
        .route("/", get(list_usage_info))
        .route("/health", get(health_check))
        .with_state(app_state)
}
