#![allow(dead_code)]

use api::{build_app, DomainServices};
use chrono::NaiveDate;
use config::{PaginationConfig, DEFAULT_PAGE_SIZE};
use serde_json::Value;
use services::usage_info::{
    memory::InMemoryUsageInfoRepository, UsageInfoServiceImpl, UsageMetrics, UsageRecord,
};
use std::sync::Arc;

pub fn metrics(
    impressions: i64,
    clicks: i64,
    installs: i64,
    spend: f64,
    revenue: f64,
) -> UsageMetrics {
    UsageMetrics {
        impressions,
        clicks,
        installs,
        spend,
        revenue,
    }
}

pub fn usage_record(
    id: i64,
    date: &str,
    channel: &str,
    country: &str,
    os: &str,
    metrics: UsageMetrics,
) -> UsageRecord {
    UsageRecord {
        id,
        date: NaiveDate::parse_from_str(date, "%Y-%m-%d").expect("valid fixture date"),
        channel: channel.to_string(),
        country: country.to_string(),
        os: os.to_string(),
        metrics,
    }
}

/// Rows loaded by [`setup_test_server`], in insertion order
pub fn fixture_records() -> Vec<UsageRecord> {
    vec![
        usage_record(
            1,
            "2019-12-06",
            "adcolony",
            "US",
            "Windows Mobile?",
            metrics(19887, 494, 76, 148.2, 149.04),
        ),
        usage_record(
            2,
            "2018-11-12",
            "chartboost",
            "CA",
            "ios",
            metrics(1244, 12, 4, 21.8, 26.01),
        ),
        usage_record(
            3,
            "2019-10-12",
            "facebook",
            "FR",
            "android",
            metrics(3350, 69, 8, 34.5, 0.0),
        ),
        usage_record(
            4,
            "2019-12-06",
            "adcolony",
            "US",
            "android",
            metrics(113, 6, 0, 0.0, 0.0),
        ),
    ]
}

/// Test server over the fixture rows with the default page size
pub fn setup_test_server() -> axum_test::TestServer {
    setup_test_server_with(fixture_records(), DEFAULT_PAGE_SIZE)
}

pub fn setup_test_server_with(
    records: Vec<UsageRecord>,
    page_size: i64,
) -> axum_test::TestServer {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::level_filters::LevelFilter::DEBUG)
        .try_init();

    let repository = Arc::new(InMemoryUsageInfoRepository::new(records));
    let domain_services = DomainServices {
        usage_info_service: Arc::new(UsageInfoServiceImpl::new(repository)),
    };

    let app = build_app(domain_services, &PaginationConfig { page_size });
    axum_test::TestServer::new(app).unwrap()
}

/// Values of `field` across the `results` array, in order
pub fn column(body: &Value, field: &str) -> Vec<Value> {
    body["results"]
        .as_array()
        .expect("results array")
        .iter()
        .map(|row| row[field].clone())
        .collect()
}

pub fn assert_close(value: &Value, expected: f64) {
    let actual = value.as_f64().expect("numeric value");
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {expected}, got {actual}"
    );
}
