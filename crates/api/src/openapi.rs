use crate::models::{ErrorResponse, UsageInfoListResponse};
use crate::routes::health::HealthResponse;
use utoipa::OpenApi;

/// OpenAPI documentation configuration
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Usage Info API",
        description = "Read-only reporting over advertising usage data.\n\nFilter by date range, channel, country and operating system, group by any of those dimensions, sort by any field and optionally include the derived cost per install (`cpi`).",
        version = "1.0.0",
        license(
            name = "MIT",
        )
    ),
    paths(
        crate::routes::usage_info::list_usage_info,
        crate::routes::health::health_check,
    ),
    components(
        schemas(UsageInfoListResponse, ErrorResponse, HealthResponse),
    ),
    tags(
        (name = "Usage Info", description = "Usage info reporting"),
        (name = "Health", description = "Service health"),
    )
)]
pub struct ApiDoc;
