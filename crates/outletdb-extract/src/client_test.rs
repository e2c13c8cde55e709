use super::*;

#[test]
fn build_url_appends_extract_path() {
    let url = build_url("https://extract.example.com").expect("valid endpoint");
    assert_eq!(
        url.as_str(),
        "https://extract.example.com/v1/extract/operating-hours"
    );
}

#[test]
fn build_url_strips_trailing_slash() {
    let url = build_url("https://extract.example.com///").expect("valid endpoint");
    assert_eq!(
        url.as_str(),
        "https://extract.example.com/v1/extract/operating-hours"
    );
}

#[test]
fn build_url_keeps_path_prefix() {
    let url = build_url("http://gateway.local/hours-svc").expect("valid endpoint");
    assert_eq!(
        url.as_str(),
        "http://gateway.local/hours-svc/v1/extract/operating-hours"
    );
}

#[test]
fn build_url_rejects_garbage() {
    assert!(matches!(
        build_url("not a url"),
        Err(ExtractError::InvalidEndpoint { .. })
    ));
    assert!(matches!(
        build_url("ftp://extract.example.com"),
        Err(ExtractError::InvalidEndpoint { .. })
    ));
}

#[test]
fn default_retry_policy_matches_config_defaults() {
    let policy = RetryPolicy::default();
    assert_eq!(policy.max_retries, 2);
    assert_eq!(policy.backoff_base_ms, 1_000);
}

#[test]
fn attempt_timeout_splits_the_batch_budget() {
    let policy = RetryPolicy {
        max_retries: 2,
        backoff_base_ms: 1_000,
    };
    assert_eq!(policy.attempt_timeout_secs(120), 40);
    assert_eq!(policy.attempt_timeout_secs(2), 1, "never below one second");

    let no_retries = RetryPolicy {
        max_retries: 0,
        ..policy
    };
    assert_eq!(no_retries.attempt_timeout_secs(120), 120);
}
