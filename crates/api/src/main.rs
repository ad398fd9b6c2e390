use api::{build_app, init_database, init_domain_services};
use config::{ApiConfig, LoggingConfig};

#[tokio::main]
async fn main() {
    // Load .env file if present (ignore errors if not found)
    let _ = dotenvy::dotenv();

    // Load configuration first to get logging settings
    let config = ApiConfig::load().unwrap_or_else(|e| {
        eprintln!("Failed to load configuration: {e}");
        eprintln!("Application cannot start without a valid configuration.");
        std::process::exit(1);
    });

    init_tracing(&config.logging);

    let database = init_database(&config.database)
        .await
        .unwrap_or_else(|e| {
            tracing::error!(error = ?e, "Failed to initialize database");
            std::process::exit(1);
        });

    let domain_services = init_domain_services(database);
    let app = build_app(domain_services, &config.pagination);

    let bind_address = config.server.bind_address();
    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .unwrap_or_else(|e| {
            tracing::error!(address = %bind_address, error = %e, "Failed to bind");
            std::process::exit(1);
        });

    tracing::info!(address = %bind_address, "Server started successfully");
    tracing::info!("API Endpoints:");
    tracing::info!("  GET  /                      - List usage info");
    tracing::info!("  GET  /health                - Health check");
    tracing::info!("  GET  /docs                  - API documentation");
    tracing::info!("  GET  /api-docs/openapi.json - OpenAPI document");
    tracing::info!(page_size = config.pagination.page_size, "Pagination configured");

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!(error = %e, "Server error");
        std::process::exit(1);
    }
}

fn init_tracing(logging_config: &LoggingConfig) {
    let filter = logging_config.filter_directive();

    match logging_config.format.as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .json()
                .with_env_filter(filter)
                .init();
        }
        "compact" => {
            tracing_subscriber::fmt()
                .compact()
                .with_env_filter(filter)
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .pretty()
                .with_env_filter(filter)
                .init();
        }
    }
}
