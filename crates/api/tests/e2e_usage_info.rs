mod common;
use common::*;

use api::models::ErrorResponse;
use serde_json::{json, Value};

async fn get_ok(server: &axum_test::TestServer, path: &str) -> Value {
    let response = server.get(path).await;
    assert_eq!(response.status_code(), 200, "GET {path}");
    response.json::<Value>()
}

async fn get_error(server: &axum_test::TestServer, path: &str, status: u16) -> ErrorResponse {
    let response = server.get(path).await;
    assert_eq!(response.status_code(), status, "GET {path}");
    response.json::<ErrorResponse>()
}

// ============================================
// Listing
// ============================================

#[tokio::test]
async fn test_list_all_usage_info() {
    let server = setup_test_server();

    let body = get_ok(&server, "/").await;

    assert_eq!(body["count"], 4);
    assert!(body["next"].is_null());
    assert!(body["previous"].is_null());
    assert_eq!(
        body["results"][0],
        json!({
            "date": "2019-12-06",
            "channel": "adcolony",
            "country": "US",
            "os": "Windows Mobile?",
            "impressions": 19887,
            "clicks": 494,
            "installs": 76,
            "spend": 148.2,
            "revenue": 149.04,
        })
    );
    assert_eq!(
        column(&body, "channel"),
        vec!["adcolony", "chartboost", "facebook", "adcolony"]
    );
}

#[tokio::test]
async fn test_empty_dataset() {
    let server = setup_test_server_with(Vec::new(), 100);

    let body = get_ok(&server, "/").await;

    assert_eq!(body["count"], 0);
    assert_eq!(body["results"], json!([]));
    assert!(body["next"].is_null());
}

#[tokio::test]
async fn test_unknown_parameters_are_ignored() {
    let server = setup_test_server();

    let body = get_ok(&server, "/?foo=bar").await;

    assert_eq!(body["count"], 4);
}

// ============================================
// Filters
// ============================================

#[tokio::test]
async fn test_filter_by_date_range() {
    let server = setup_test_server();

    let body = get_ok(&server, "/?date_from=2019-10-12").await;
    assert_eq!(body["count"], 3);
    assert_eq!(column(&body, "impressions"), vec![19887, 3350, 113]);

    let body = get_ok(&server, "/?date_to=2019-10-12").await;
    assert_eq!(column(&body, "date"), vec!["2018-11-12", "2019-10-12"]);

    let body = get_ok(&server, "/?date_from=2019-01-01&date_to=2019-11-30").await;
    assert_eq!(column(&body, "channel"), vec!["facebook"]);

    let body = get_ok(&server, "/?date_from=2019-12-07&date_to=2019-01-01").await;
    assert_eq!(body["count"], 0);
}

#[tokio::test]
async fn test_filter_by_invalid_date() {
    let server = setup_test_server();

    for path in [
        "/?date_from=2019-13-01",
        "/?date_from=06-12-2019",
        "/?date_from=yesterday",
        "/?date_from=",
    ] {
        let error = get_error(&server, path, 400).await;
        assert!(error.detail.contains("date_from"), "{}", error.detail);
    }

    let error = get_error(&server, "/?date_to=2019-02-30", 400).await;
    assert!(error.detail.contains("date_to"));
}

#[tokio::test]
async fn test_filter_by_channels() {
    let server = setup_test_server();

    let body = get_ok(&server, "/?channels=adcolony,facebook").await;
    assert_eq!(body["count"], 3);
    assert_eq!(
        column(&body, "channel"),
        vec!["adcolony", "facebook", "adcolony"]
    );

    let body = get_ok(&server, "/?channels=unity").await;
    assert_eq!(body["count"], 0);
}

#[tokio::test]
async fn test_filter_elements_are_trimmed() {
    let server = setup_test_server();

    let response = server
        .get("/")
        .add_query_param("channels", " chartboost , facebook ")
        .await;

    assert_eq!(response.status_code(), 200);
    let body = response.json::<Value>();
    assert_eq!(column(&body, "channel"), vec!["chartboost", "facebook"]);
}

#[tokio::test]
async fn test_filter_by_countries_and_os() {
    let server = setup_test_server();

    let body = get_ok(&server, "/?countries=US,CA").await;
    assert_eq!(column(&body, "country"), vec!["US", "CA", "US"]);

    let body = get_ok(&server, "/?os=ios").await;
    assert_eq!(column(&body, "channel"), vec!["chartboost"]);

    let response = server
        .get("/")
        .add_query_param("os", "Windows Mobile?")
        .await;
    assert_eq!(response.status_code(), 200);
    assert_eq!(column(&response.json::<Value>(), "impressions"), vec![19887]);

    let body = get_ok(&server, "/?countries=US&os=android").await;
    assert_eq!(column(&body, "impressions"), vec![113]);
}

#[tokio::test]
async fn test_filter_rejects_malformed_lists() {
    let server = setup_test_server();

    for (path, param) in [
        ("/?channels=", "channels"),
        ("/?channels=adcolony,", "channels"),
        ("/?channels=adcolony,,facebook", "channels"),
        ("/?channels=123", "channels"),
        ("/?countries=US,42", "countries"),
        ("/?os=,ios", "os"),
    ] {
        let error = get_error(&server, path, 400).await;
        assert!(error.detail.contains(param), "{path}: {}", error.detail);
    }
}

#[tokio::test]
async fn test_date_from_excludes_earlier_records() {
    let server = setup_test_server();

    let body = get_ok(&server, "/?date_from=2018-11-13").await;

    assert_eq!(
        column(&body, "date"),
        vec!["2019-12-06", "2019-10-12", "2019-12-06"]
    );
}

#[tokio::test]
async fn test_free_text_dates_are_rejected() {
    let server = setup_test_server();

    for value in ["not valid date", "2019-not valid", "+2019-01-05", " 2019-01-05"] {
        let response = server.get("/").add_query_param("date_from", value).await;
        assert_eq!(response.status_code(), 400, "{value}");
    }
}

#[tokio::test]
async fn test_numeric_list_elements_are_rejected() {
    let server = setup_test_server();

    for path in ["/?channels=adcolony,12", "/?countries=US,12", "/?os=ios,12"] {
        get_error(&server, path, 400).await;
    }
}

// ============================================
// Grouping
// ============================================

#[tokio::test]
async fn test_group_by_channel() {
    let server = setup_test_server();

    let body = get_ok(&server, "/?group_by=channel").await;

    assert_eq!(body["count"], 3);
    assert_eq!(
        body["results"][0],
        json!({
            "date": null,
            "channel": "adcolony",
            "country": null,
            "os": null,
            "impressions": 20000,
            "clicks": 500,
            "installs": 76,
            "spend": 148.2,
            "revenue": 149.04,
        })
    );
    assert_eq!(
        column(&body, "channel"),
        vec!["adcolony", "chartboost", "facebook"]
    );
}

#[tokio::test]
async fn test_group_by_many_fields() {
    let server = setup_test_server();

    let body = get_ok(&server, "/?group_by=channel,date").await;

    assert_eq!(body["count"], 3);
    assert_eq!(
        column(&body, "date"),
        vec!["2019-12-06", "2018-11-12", "2019-10-12"]
    );
    assert_eq!(column(&body, "impressions"), vec![20000, 1244, 3350]);
    assert_eq!(column(&body, "country"), vec![Value::Null; 3]);
    assert_eq!(column(&body, "os"), vec![Value::Null; 3]);
}

#[tokio::test]
async fn test_group_by_date_channel_os() {
    let server = setup_test_server();

    let body = get_ok(&server, "/?group_by=date,channel,os").await;

    assert_eq!(body["count"], 4);
    assert_eq!(
        body["results"][0],
        json!({
            "date": "2018-11-12",
            "channel": "chartboost",
            "country": null,
            "os": "ios",
            "impressions": 1244,
            "clicks": 12,
            "installs": 4,
            "spend": 21.8,
            "revenue": 26.01,
        })
    );
    assert_eq!(column(&body, "channel")[1], "facebook");
}

#[tokio::test]
async fn test_group_by_duplicates_are_ignored() {
    let server = setup_test_server();

    let body = get_ok(&server, "/?group_by=country,country").await;

    assert_eq!(column(&body, "country"), vec!["CA", "FR", "US"]);
    assert_eq!(column(&body, "impressions"), vec![1244, 3350, 20000]);
}

#[tokio::test]
async fn test_filters_apply_before_grouping() {
    let server = setup_test_server();

    let body = get_ok(&server, "/?os=android&group_by=channel").await;

    assert_eq!(body["count"], 2);
    assert_eq!(column(&body, "channel"), vec!["adcolony", "facebook"]);
    assert_eq!(column(&body, "impressions"), vec![113, 3350]);
}

#[tokio::test]
async fn test_group_by_not_allowed_field() {
    let server = setup_test_server();

    let response = server
        .get("/")
        .add_query_param("group_by", "not existing field")
        .await;
    assert_eq!(response.status_code(), 400);

    for path in [
        "/?group_by=impressions",
        "/?group_by=cpi",
        "/?group_by=channel,spend",
        "/?group_by=foo",
        "/?group_by=",
    ] {
        let error = get_error(&server, path, 400).await;
        assert!(error.detail.contains("group_by"), "{path}: {}", error.detail);
    }
}

// ============================================
// Sorting
// ============================================

#[tokio::test]
async fn test_sort_by_one_field() {
    let server = setup_test_server();

    let body = get_ok(&server, "/?sort_by=-impressions").await;
    assert_eq!(column(&body, "impressions"), vec![19887, 3350, 1244, 113]);

    let body = get_ok(&server, "/?sort_by=country").await;
    assert_eq!(column(&body, "impressions"), vec![1244, 3350, 19887, 113]);
}

#[tokio::test]
async fn test_sort_by_many_fields() {
    let server = setup_test_server();

    let body = get_ok(&server, "/?sort_by=channel,-installs").await;
    assert_eq!(column(&body, "impressions"), vec![19887, 113, 1244, 3350]);

    let body = get_ok(&server, "/?sort_by=date,-clicks").await;
    assert_eq!(column(&body, "clicks"), vec![12, 69, 494, 6]);

    let body = get_ok(&server, "/?sort_by=-date,clicks").await;
    assert_eq!(column(&body, "impressions"), vec![113, 19887, 3350, 1244]);
}

#[tokio::test]
async fn test_sort_by_not_existing_field() {
    let server = setup_test_server();

    let response = server
        .get("/")
        .add_query_param("sort_by", "not existing field")
        .await;
    assert_eq!(response.status_code(), 400);

    for path in ["/?sort_by=foo", "/?sort_by=-foo", "/?sort_by=channel,id", "/?sort_by=-"] {
        let error = get_error(&server, path, 400).await;
        assert!(error.detail.contains("sort_by"), "{path}: {}", error.detail);
    }
}

#[tokio::test]
async fn test_grouped_sort_by_metric() {
    let server = setup_test_server();

    let body = get_ok(&server, "/?group_by=channel&sort_by=-clicks").await;

    assert_eq!(
        column(&body, "channel"),
        vec!["adcolony", "facebook", "chartboost"]
    );
    assert_eq!(column(&body, "clicks"), vec![500, 69, 12]);
}

#[tokio::test]
async fn test_grouped_sort_by_ungrouped_dimension() {
    let server = setup_test_server();

    for path in [
        "/?group_by=channel&sort_by=date",
        "/?group_by=channel&sort_by=-country",
    ] {
        let body = get_ok(&server, path).await;
        assert_eq!(
            column(&body, "channel"),
            vec!["adcolony", "chartboost", "facebook"],
            "{path}"
        );
        assert_eq!(column(&body, "date"), vec![Value::Null; 3], "{path}");
    }

    let body = get_ok(&server, "/?group_by=channel&sort_by=-date,-clicks").await;
    assert_eq!(column(&body, "clicks"), vec![500, 69, 12]);
}

// ============================================
// CPI
// ============================================

#[tokio::test]
async fn test_cpi_included_on_request() {
    let server = setup_test_server();

    let body = get_ok(&server, "/?cpi=1").await;

    let cpi = column(&body, "cpi");
    assert_close(&cpi[0], 148.2 / 76.0);
    assert_close(&cpi[1], 5.45);
    assert_close(&cpi[2], 4.3125);
    assert!(cpi[3].is_null());
}

#[tokio::test]
async fn test_cpi_absent_unless_exactly_one() {
    let server = setup_test_server();

    for path in ["/", "/?cpi=0", "/?cpi=true", "/?cpi="] {
        let body = get_ok(&server, path).await;
        let first = body["results"][0].as_object().unwrap();
        assert!(!first.contains_key("cpi"), "{path}");
        assert_eq!(first.len(), 9);
    }
}

#[tokio::test]
async fn test_sort_by_cpi() {
    let server = setup_test_server();

    let body = get_ok(&server, "/?cpi=1&sort_by=cpi").await;
    assert_eq!(column(&body, "impressions"), vec![19887, 3350, 1244, 113]);

    let body = get_ok(&server, "/?cpi=1&sort_by=-cpi").await;
    assert_eq!(column(&body, "impressions"), vec![113, 1244, 3350, 19887]);
}

#[tokio::test]
async fn test_sort_by_cpi_requires_cpi() {
    let server = setup_test_server();

    let error = get_error(&server, "/?sort_by=-cpi", 400).await;
    assert!(error.detail.contains("cpi"));
}

#[tokio::test]
async fn test_grouped_cpi() {
    let server = setup_test_server();

    let body = get_ok(&server, "/?group_by=channel&cpi=1&sort_by=-cpi").await;

    assert_eq!(
        column(&body, "channel"),
        vec!["chartboost", "facebook", "adcolony"]
    );
    assert_close(&body["results"][2]["cpi"], 148.2 / 76.0);
}

#[tokio::test]
async fn test_grouped_cpi_null_without_spend() {
    let server = setup_test_server_with(
        vec![
            usage_record(1, "2019-06-01", "vungle", "DE", "ios", metrics(10, 1, 3, 0.0, 1.0)),
            usage_record(2, "2019-06-02", "vungle", "DE", "ios", metrics(10, 1, 2, 0.0, 1.0)),
        ],
        100,
    );

    let body = get_ok(&server, "/?group_by=channel&cpi=1").await;

    assert_eq!(body["results"][0]["installs"], 5);
    assert!(body["results"][0]["cpi"].is_null());
}

// ============================================
// Pagination
// ============================================

#[tokio::test]
async fn test_pagination_links() {
    let server = setup_test_server_with(fixture_records(), 2);

    let body = get_ok(&server, "/").await;
    assert_eq!(body["count"], 4);
    assert_eq!(column(&body, "impressions"), vec![19887, 1244]);
    assert_eq!(body["next"], "/?page=2");
    assert!(body["previous"].is_null());

    let body = get_ok(&server, "/?page=2").await;
    assert_eq!(column(&body, "impressions"), vec![3350, 113]);
    assert!(body["next"].is_null());
    assert_eq!(body["previous"], "/");
}

#[tokio::test]
async fn test_pagination_links_keep_query() {
    let server = setup_test_server_with(fixture_records(), 1);

    let body = get_ok(&server, "/?sort_by=-impressions").await;
    assert_eq!(body["next"], "/?sort_by=-impressions&page=2");

    let body = get_ok(&server, "/?page=3&sort_by=-impressions").await;
    assert_eq!(column(&body, "impressions"), vec![1244]);
    assert_eq!(body["next"], "/?sort_by=-impressions&page=4");
    assert_eq!(body["previous"], "/?sort_by=-impressions&page=2");
}

#[tokio::test]
async fn test_pagination_of_groups() {
    let server = setup_test_server_with(fixture_records(), 2);

    let body = get_ok(&server, "/?group_by=channel&page=2").await;

    assert_eq!(body["count"], 3);
    assert_eq!(column(&body, "channel"), vec!["facebook"]);
    assert_eq!(body["previous"], "/?group_by=channel");
}

#[tokio::test]
async fn test_invalid_page() {
    let server = setup_test_server_with(fixture_records(), 2);

    for path in ["/?page=3", "/?page=0", "/?page=-1", "/?page=abc"] {
        let error = get_error(&server, path, 404).await;
        assert_eq!(error.detail, "Invalid page.", "{path}");
    }

    let error = get_error(&server, "/?channels=unity&page=2", 404).await;
    assert_eq!(error.detail, "Invalid page.");

    let body = get_ok(&server, "/?channels=unity&page=1").await;
    assert_eq!(body["count"], 0);
}

// ============================================
// Service endpoints
// ============================================

#[tokio::test]
async fn test_health() {
    let server = setup_test_server();

    let body = get_ok(&server, "/health").await;

    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_openapi_document() {
    let server = setup_test_server();

    let body = get_ok(&server, "/api-docs/openapi.json").await;

    assert_eq!(body["info"]["title"], "Usage Info API");
    assert!(body["paths"]["/"]["get"].is_object());
}

#[tokio::test]
async fn test_cors_allows_any_origin() {
    let server = setup_test_server();

    let response = server
        .get("/")
        .add_header("Origin", "http://dashboard.example.com")
        .await;

    assert_eq!(response.status_code(), 200);
    assert_eq!(response.header("access-control-allow-origin"), "*");
}
