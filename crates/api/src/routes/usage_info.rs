use crate::{
    models::{ErrorResponse, UsageInfoListResponse, UsageRowSerializer},
    routes::api::AppState,
};
use axum::{
    extract::{OriginalUri, Query, State},
    http::{StatusCode, Uri},
    response::Json as ResponseJson,
};
use services::usage_info::{PageRequest, UsageInfoError, UsageQuery};
use std::collections::HashMap;
use tracing::{debug, error};

/// Query parameter selecting the page of the listing
pub const PAGE_PARAM: &str = "page";

/// List usage info
///
/// Returns usage rows, optionally filtered by date range, channel, country
/// and operating system. With `group_by` the filtered rows are collapsed
/// into one row per distinct combination of the grouped fields, metrics
/// summed. `cpi=1` adds the derived cost per install (spend / installs).
#[utoipa::path(
    get,
    path = "/",
    tag = "Usage Info",
    params(
        ("date_from" = Option<String>, Query, description = "Inclusive lower date bound (YYYY-MM-DD)"),
        ("date_to" = Option<String>, Query, description = "Inclusive upper date bound (YYYY-MM-DD)"),
        ("channels" = Option<String>, Query, description = "Comma separated channels to include"),
        ("countries" = Option<String>, Query, description = "Comma separated country codes to include"),
        ("os" = Option<String>, Query, description = "Comma separated operating systems to include"),
        ("group_by" = Option<String>, Query, description = "Comma separated subset of date, channel, country, os"),
        ("sort_by" = Option<String>, Query, description = "Comma separated fields, prefix with '-' for descending"),
        ("cpi" = Option<String>, Query, description = "Set to 1 to include the cpi field"),
        ("page" = Option<i64>, Query, description = "1-based page number"),
    ),
    responses(
        (status = 200, description = "Page of usage rows", body = UsageInfoListResponse),
        (status = 400, description = "Invalid query parameter", body = ErrorResponse),
        (status = 404, description = "Invalid page", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn list_usage_info(
    State(app_state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Query(params): Query<HashMap<String, String>>,
) -> Result<ResponseJson<UsageInfoListResponse>, (StatusCode, ResponseJson<ErrorResponse>)> {
    debug!(?params, "List usage info request");

    let query = UsageQuery::from_params(&params).map_err(map_usage_info_error)?;
    let page = PageRequest::parse(
        params.get(PAGE_PARAM).map(String::as_str),
        app_state.page_size,
    )
    .map_err(map_usage_info_error)?;

    let usage_page = app_state
        .usage_info_service
        .list_usage(&query, page)
        .await
        .map_err(map_usage_info_error)?;

    let next = usage_page
        .has_next()
        .then(|| page_link(&uri, page.number + 1));
    let previous = usage_page
        .has_previous()
        .then(|| page_link(&uri, page.number - 1));

    Ok(ResponseJson(UsageInfoListResponse {
        count: usage_page.count,
        next,
        previous,
        results: UsageRowSerializer::for_query(&query).serialize_rows(usage_page.rows),
    }))
}

/// Convert service errors to HTTP responses
pub fn map_usage_info_error(e: UsageInfoError) -> (StatusCode, ResponseJson<ErrorResponse>) {
    match e {
        UsageInfoError::InvalidQueryParameter { param, message } => {
            debug!(%param, %message, "Rejected usage info query");
            (
                StatusCode::BAD_REQUEST,
                ResponseJson(ErrorResponse::new(message)),
            )
        }
        UsageInfoError::InvalidPage => (
            StatusCode::NOT_FOUND,
            ResponseJson(ErrorResponse::new(e.to_string())),
        ),
        UsageInfoError::Repository(e) => {
            error!(error = %e, "Failed to list usage info");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                ResponseJson(ErrorResponse::new(
                    "Failed to list usage info".to_string(),
                )),
            )
        }
    }
}

/// Link to another page of the same listing.
///
/// Keeps the request path and every query parameter except `page`, which is
/// set to `page_number`. The first page carries no `page` parameter.
fn page_link(uri: &Uri, page_number: i64) -> String {
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    if let Some(query) = uri.query() {
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            if key != PAGE_PARAM {
                serializer.append_pair(&key, &value);
            }
        }
    }
    if page_number > 1 {
        serializer.append_pair(PAGE_PARAM, &page_number.to_string());
    }

    let query = serializer.finish();
    if query.is_empty() {
        uri.path().to_string()
    } else {
        format!("{}?{}", uri.path(), query)
    }
}
