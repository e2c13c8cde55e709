//! Integration tests for `ExtractionClient` using wiremock HTTP mocks.

use std::time::Duration;

use outletdb_core::ScheduleDay;
use outletdb_extract::{ExtractError, ExtractionClient, HoursInput, RetryPolicy};
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const EXTRACT_PATH: &str = "/v1/extract/operating-hours";

fn test_client(base_url: &str, api_key: Option<&str>, max_retries: u32) -> ExtractionClient {
    ExtractionClient::new(
        base_url,
        api_key,
        30,
        RetryPolicy {
            max_retries,
            backoff_base_ms: 0,
        },
    )
    .expect("client construction should not fail")
}

fn input(hours: &str) -> HoursInput {
    HoursInput {
        outlet_id: Uuid::new_v4(),
        operating_hours: Some(hours.to_string()),
    }
}

#[tokio::test]
async fn extract_hours_returns_parsed_records() {
    let server = MockServer::start().await;
    let batch = vec![input("Monday 08:00 - 22:00"), input("Daily 10am-10pm")];

    let body = serde_json::json!({
        "outlets": [
            {
                "outlet_id": batch[1].outlet_id,
                "mon_open": "10:00", "mon_close": "22:00",
                "sun_open": "10:00", "sun_close": "22:00"
            },
            {
                "outlet_id": batch[0].outlet_id,
                "mon_open": "08:00", "mon_close": "22:00"
            }
        ]
    });

    Mock::given(method("POST"))
        .and(path(EXTRACT_PATH))
        .and(body_partial_json(serde_json::json!({
            "outlets": [{ "operating_hours": "Monday 08:00 - 22:00" }, { "operating_hours": "Daily 10am-10pm" }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server.uri(), None, 0);
    let records = client
        .extract_hours(&batch)
        .await
        .expect("should parse records");

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].outlet_id, batch[1].outlet_id);
    assert_eq!(
        records[1].raw(ScheduleDay::Mon),
        (Some("08:00"), Some("22:00"))
    );
    assert_eq!(records[1].raw(ScheduleDay::Sun), (None, None));
}

#[tokio::test]
async fn extract_hours_sends_bearer_key() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(EXTRACT_PATH))
        .and(header("authorization", "Bearer secret-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "outlets": [] })))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server.uri(), Some("secret-key"), 0);
    let records = client
        .extract_hours(&[input("Closed on Sundays")])
        .await
        .expect("authorized call should succeed");
    assert!(records.is_empty());
}

#[tokio::test]
async fn empty_batch_does_not_call_service() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let client = test_client(&server.uri(), None, 3);
    let records = client.extract_hours(&[]).await.expect("empty batch is a no-op");
    assert!(records.is_empty());
}

#[tokio::test]
async fn timed_out_attempt_is_retried_within_the_batch_budget() {
    let server = MockServer::start().await;
    let batch = vec![input("Daily 10:00-22:00")];

    Mock::given(method("POST"))
        .and(path(EXTRACT_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "outlets": [] }))
                .set_delay(Duration::from_secs(3)),
        )
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(EXTRACT_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "outlets": [{ "outlet_id": batch[0].outlet_id, "sat_open": "10:00" }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    // A 3 s batch budget over three attempts gives each attempt 1 s.
    let retry = RetryPolicy {
        max_retries: 2,
        backoff_base_ms: 0,
    };
    let client = ExtractionClient::new(
        &server.uri(),
        None,
        retry.attempt_timeout_secs(3),
        retry,
    )
    .expect("client construction should not fail");

    let records = tokio::time::timeout(Duration::from_secs(3), client.extract_hours(&batch))
        .await
        .expect("finished inside the batch budget")
        .expect("retry after the timeout should succeed");
    assert_eq!(records[0].raw(ScheduleDay::Sat), (Some("10:00"), None));
}

#[tokio::test]
async fn transient_failure_is_retried() {
    let server = MockServer::start().await;
    let batch = vec![input("Mon-Fri 9:00-18:00")];

    Mock::given(method("POST"))
        .and(path(EXTRACT_PATH))
        .respond_with(ResponseTemplate::new(503).set_body_string("warming up"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(EXTRACT_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "outlets": [{ "outlet_id": batch[0].outlet_id, "fri_close": "18:00" }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server.uri(), None, 2);
    let records = client
        .extract_hours(&batch)
        .await
        .expect("second attempt should succeed");
    assert_eq!(records[0].raw(ScheduleDay::Fri), (None, Some("18:00")));
}

#[tokio::test]
async fn client_error_fails_without_retry() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(EXTRACT_PATH))
        .respond_with(ResponseTemplate::new(422).set_body_string("bad payload"))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server.uri(), None, 3);
    let err = client
        .extract_hours(&[input("whenever")])
        .await
        .expect_err("422 should fail the batch");

    match err {
        ExtractError::Status { status, body } => {
            assert_eq!(status, 422);
            assert_eq!(body, "bad payload");
        }
        other => panic!("expected Status error, got {other:?}"),
    }
}

#[tokio::test]
async fn malformed_body_returns_deserialize_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(EXTRACT_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let client = test_client(&server.uri(), None, 0);
    let err = client
        .extract_hours(&[input("24 hours")])
        .await
        .expect_err("non-JSON body should fail");
    assert!(matches!(err, ExtractError::Deserialize { .. }));
}

#[tokio::test]
async fn badly_typed_record_does_not_fail_the_batch() {
    let server = MockServer::start().await;
    let batch = vec![
        input("Monday 08:00 - 22:00"),
        input("Monday 8am"),
        input("Closed"),
    ];

    let body = serde_json::json!({
        "outlets": [
            {
                "outlet_id": batch[0].outlet_id,
                "mon_open": "08:00", "mon_close": "22:00"
            },
            {
                "outlet_id": batch[1].outlet_id,
                "mon_open": 800, "mon_close": "22:00"
            },
            {
                "outlet_id": 12345,
                "mon_open": "08:00"
            }
        ]
    });

    Mock::given(method("POST"))
        .and(path(EXTRACT_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server.uri(), None, 0);
    let records = client
        .extract_hours(&batch)
        .await
        .expect("batch should survive one bad record");

    assert_eq!(records.len(), 2, "only the record without a usable id is dropped");
    assert_eq!(records[0].outlet_id, batch[0].outlet_id);
    assert_eq!(
        records[0].raw(ScheduleDay::Mon),
        (Some("08:00"), Some("22:00"))
    );
    assert_eq!(records[1].outlet_id, batch[1].outlet_id);
    assert_eq!(records[1].raw(ScheduleDay::Mon), (Some("800"), Some("22:00")));
}
