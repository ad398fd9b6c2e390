pub mod models;
pub mod openapi;
pub mod routes;

use crate::{
    openapi::ApiDoc,
    routes::api::{build_usage_info_router, AppState},
};
use anyhow::Context;
use axum::{http::Method, response::Html, routing::get, Router};
use config::PaginationConfig;
use database::{Database, PgUsageInfoRepository};
use services::usage_info::{UsageInfoServiceImpl, UsageInfoServiceTrait};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use utoipa::OpenApi;

/// Service initialization components
#[derive(Clone)]
pub struct DomainServices {
    pub usage_info_service: Arc<dyn UsageInfoServiceTrait>,
}

/// Initialize database connection and run migrations
pub async fn init_database(db_config: &config::DatabaseConfig) -> anyhow::Result<Arc<Database>> {
    let database = Arc::new(
        Database::from_config(db_config)
            .await
            .context("Failed to connect to database")?,
    );

    tracing::info!("Starting database migrations...");
    database
        .run_migrations()
        .await
        .context("Failed to run database migrations")?;
    tracing::info!("Database migrations completed.");

    Ok(database)
}

/// Initialize domain services
pub fn init_domain_services(database: Arc<Database>) -> DomainServices {
    let usage_info_repo = Arc::new(PgUsageInfoRepository::new(database.pool().clone()));

    DomainServices {
        usage_info_service: Arc::new(UsageInfoServiceImpl::new(usage_info_repo)),
    }
}

/// Build the application router
pub fn build_app(domain_services: DomainServices, pagination: &PaginationConfig) -> Router {
    let app_state = AppState {
        usage_info_service: domain_services.usage_info_service,
        page_size: pagination.page_size,
    };

    let cors = CorsLayer::new()
        .allow_methods([Method::GET])
        .allow_origin(Any)
        .allow_headers(Any);

    Router::new()
        .merge(build_usage_info_router(app_state))
        .merge(build_openapi_routes())
        .layer(cors)
}

/// Build OpenAPI documentation routes
pub fn build_openapi_routes() -> Router {
    Router::new().route("/docs", get(swagger_ui_handler)).route(
        "/api-docs/openapi.json",
        get(|| async { axum::Json(ApiDoc::openapi()) }),
    )
}

/// Serve Swagger UI HTML page
async fn swagger_ui_handler() -> Html<&'static str> {
    Html(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>Usage Info API Documentation</title>
    <link rel="stylesheet" type="text/css" href="https://unpkg.com/swagger-ui-dist@5.10.5/swagger-ui.css" />
</head>
<body>
    <div id="swagger-ui"></div>
    <script src="https://unpkg.com/swagger-ui-dist@5.10.5/swagger-ui-bundle.js"></script>
    <script>
    window.onload = function() {
        SwaggerUIBundle({
            url: '/api-docs/openapi.json',
            dom_id: '#swagger-ui',
            deepLinking: true,
            docExpansion: 'list'
        });
    };
    </script>
</body>
</html>"#,
    )
}
