//! Integration tests for `SourceClient` using wiremock HTTP mocks.

use outletdb_source::{SourceClient, SourceError};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_client(server: &MockServer) -> SourceClient {
    SourceClient::new(&format!("{}/outlets.json", server.uri()), 30)
        .expect("client construction should not fail")
}

#[tokio::test]
async fn fetch_returns_valid_records_and_skips_bad_ones() {
    let server = MockServer::start().await;

    let body = serde_json::json!([
        {
            "id": "kl-001",
            "name": "Subway Menara UOA Bangsar",
            "address": "Jalan Bangsar Utama 1",
            "operating_hours": ["Monday - Sunday, 8:00 AM - 10:00 PM"],
            "waze_link": "https://waze.com/ul?ll=3.12,101.67https://waze.com/ul?ll=3.12,101.67",
            "latitude": "3.1281",
            "longitude": "101.6784"
        },
        {
            "id": "kl-002",
            "name": "Subway Mid Valley",
            "waze_link": "https://waze.com/ul?ll=3.11,101.67",
            "latitude": 3.1179,
            "longitude": 101.6773
        },
        {
            "id": "kl-003",
            "name": "Subway Nowhere",
            "waze_link": "https://waze.com/ul",
            "latitude": 3.0
        }
    ]);

    Mock::given(method("GET"))
        .and(path("/outlets.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let batch = test_client(&server).fetch().await.expect("should parse feed");

    assert_eq!(batch.records.len(), 2);
    assert_eq!(batch.records[0].name, "Subway Menara UOA Bangsar");
    assert_eq!(batch.records[0].waze_link, "https://waze.com/ul?ll=3.12,101.67");
    assert_eq!(batch.records[0].latitude, Some(3.1281));
    assert_eq!(
        batch.records[0].operating_hours.as_deref(),
        Some("Monday - Sunday, 8:00 AM - 10:00 PM")
    );
    assert!(batch.records[1].address.is_none());

    assert_eq!(batch.skipped.len(), 1);
    assert_eq!(batch.skipped[0].index, 2);
    assert_eq!(batch.skipped[0].label.as_deref(), Some("kl-003"));
}

#[tokio::test]
async fn fetch_accepts_wrapped_feed() {
    let server = MockServer::start().await;

    let body = serde_json::json!({
        "outlets": [
            { "name": "Subway KLCC", "waze_link": "https://waze.com/ul/klcc", "longitude": 101.712 }
        ]
    });

    Mock::given(method("GET"))
        .and(path("/outlets.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let batch = test_client(&server).fetch().await.expect("should parse feed");
    assert_eq!(batch.records.len(), 1);
    assert!(batch.records[0].latitude.is_none());
}

#[tokio::test]
async fn fetch_empty_feed_is_ok() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/outlets.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .mount(&server)
        .await;

    let batch = test_client(&server).fetch().await.expect("empty feed is valid");
    assert!(batch.records.is_empty());
    assert!(batch.skipped.is_empty());
}

#[tokio::test]
async fn fetch_non_success_status_is_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/outlets.json"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let err = test_client(&server)
        .fetch()
        .await
        .expect_err("502 should fail the fetch");
    assert!(matches!(err, SourceError::UnexpectedStatus { status: 502, .. }));
}

#[tokio::test]
async fn fetch_non_json_body_is_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/outlets.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let err = test_client(&server)
        .fetch()
        .await
        .expect_err("HTML should fail the fetch");
    assert!(matches!(err, SourceError::Deserialize { .. }));
}
