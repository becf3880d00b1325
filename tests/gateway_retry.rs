//! Gateway behavior against a scripted transport: envelopes, error classes,
//! retry budget, backoff delays and per-attempt authentication headers.

mod common;

use common::{ScriptedTransport, Step};
use jdy_gateway::auth::{HEADER_API_KEY, HEADER_AUTHORIZATION, HEADER_SIGN, HEADER_TIMESTAMP};
use jdy_gateway::{ApiRequest, AuthScheme, Error, ErrorKind, Method, TransactionId};
use serde_json::json;
use std::time::Duration;

fn secs(v: &[u64]) -> Vec<Duration> {
    v.iter().map(|s| Duration::from_secs(*s)).collect()
}

#[tokio::test]
async fn envelope_data_is_returned_for_form_list() {
    let transport = ScriptedTransport::always(Step::ok(
        r#"{"code":0,"msg":"ok","data":[{"name":"F1","entryId":"e1"}]}"#,
    ));
    let clock = common::RecordingClock::new();
    let gateway = common::gateway(transport.clone(), clock.clone());

    let data = gateway
        .execute(Method::Get, "/app/app-1/form", None)
        .await
        .unwrap();

    assert_eq!(data, json!([{"name": "F1", "entryId": "e1"}]));
    let requests = transport.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].url, "https://jdy.test/api/v5/app/app-1/form");
    assert_eq!(requests[0].method, Method::Get);
    assert!(requests[0].body.is_none());
    assert_eq!(requests[0].timeout, Duration::from_secs(30));
    assert!(clock.sleeps().is_empty());
}

#[tokio::test]
async fn bare_body_is_returned_unchanged() {
    let body = r#"{"data":{"_id":"r1","姓名":{"value":"张三"}}}"#;
    let transport = ScriptedTransport::always(Step::ok(body));
    let gateway = common::gateway(transport, common::RecordingClock::new());

    let data = gateway
        .execute(Method::Post, "/app/entry/data/get", Some(json!({"data_id": "r1"})))
        .await
        .unwrap();
    assert_eq!(data, json!({"data": {"_id": "r1", "姓名": {"value": "张三"}}}));
}

#[tokio::test]
async fn permission_denied_is_retried_with_backoff_then_raised() {
    let transport = ScriptedTransport::always(Step::status(403, r#"{"code":8303,"msg":"no permission"}"#));
    let clock = common::RecordingClock::new();
    let gateway = common::gateway(transport.clone(), clock.clone());

    let err = gateway
        .execute(
            Method::Post,
            "/app/entry/data/create",
            Some(json!({"data": {"姓名": {"value": "张三"}}})),
        )
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Permission);
    assert!(err.to_string().contains("no permission"));
    assert_eq!(err.context().and_then(|c| c.attempt), Some(3));
    assert_eq!(transport.request_count(), 3);
    assert_eq!(clock.sleeps(), secs(&[1, 2]));
}

#[tokio::test]
async fn permission_denied_fails_fast_when_switched_off() {
    let transport = ScriptedTransport::always(Step::status(403, "forbidden"));
    let clock = common::RecordingClock::new();
    let gateway = common::builder(transport.clone(), clock.clone())
        .retry_on_permission_denied(false)
        .build()
        .unwrap();

    let err = gateway
        .execute(Method::Get, "/app/app-1/form", None)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Permission);
    assert_eq!(transport.request_count(), 1);
    assert!(clock.sleeps().is_empty());
}

#[tokio::test]
async fn non_json_success_body_is_response_format_error() {
    let transport = ScriptedTransport::always(Step::ok("not json"));
    let clock = common::RecordingClock::new();
    let gateway = common::gateway(transport.clone(), clock.clone());

    let err = gateway
        .execute(Method::Get, "/app/app-1/form", None)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ResponseFormat);
    assert!(err.to_string().contains("not json"));
    assert_eq!(transport.request_count(), 3);
}

#[tokio::test]
async fn application_error_after_full_budget() {
    let transport = ScriptedTransport::always(Step::ok(r#"{"code":4815,"msg":"entry not exist"}"#));
    let clock = common::RecordingClock::new();
    let gateway = common::gateway(transport.clone(), clock.clone());

    let err = gateway
        .execute(Method::Get, "/app/app-1/form", None)
        .await
        .unwrap_err();

    match &err {
        Error::Application { code, message, .. } => {
            assert_eq!(*code, 4815);
            assert_eq!(message, "entry not exist");
        }
        other => panic!("expected application error, got {other:?}"),
    }
    assert_eq!(transport.request_count(), 3);
    assert_eq!(clock.sleeps(), secs(&[1, 2]));
}

#[tokio::test]
async fn transport_failures_exhaust_budget_with_exponential_backoff() {
    let transport = ScriptedTransport::always(Step::Timeout);
    let clock = common::RecordingClock::new();
    let gateway = common::builder(transport.clone(), clock.clone())
        .retries(4)
        .build()
        .unwrap();

    let err = gateway
        .execute(Method::Get, "/app/app-1/form", None)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Transport);
    assert!(err.to_string().contains("timed out"));
    assert_eq!(transport.request_count(), 4);
    assert_eq!(clock.sleeps(), secs(&[1, 2, 4]));
}

#[tokio::test]
async fn single_attempt_budget_never_sleeps() {
    let transport = ScriptedTransport::always(Step::ConnectionRefused);
    let clock = common::RecordingClock::new();
    let gateway = common::gateway(transport.clone(), clock.clone());

    let err = gateway
        .execute_request(ApiRequest::get("/app/app-1/form").retries(1))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Transport);
    assert_eq!(transport.request_count(), 1);
    assert!(clock.sleeps().is_empty());
}

#[tokio::test]
async fn transient_failure_recovers_on_next_attempt() {
    let transport = ScriptedTransport::new(vec![
        Step::status(502, "<html>Bad Gateway</html>"),
        Step::ok(r#"{"code":0,"data":{"entryId":"e9"}}"#),
    ]);
    let clock = common::RecordingClock::new();
    let gateway = common::gateway(transport.clone(), clock.clone());

    let data = gateway
        .execute(Method::Post, "/app/app-1/entry", Some(json!({"name": "F"})))
        .await
        .unwrap();

    assert_eq!(data, json!({"entryId": "e9"}));
    assert_eq!(transport.request_count(), 2);
    assert_eq!(clock.sleeps(), secs(&[1]));
}

#[tokio::test]
async fn other_status_keeps_truncated_body() {
    let transport = ScriptedTransport::always(Step::status(500, &"e".repeat(1000)));
    let gateway = common::builder(transport, common::RecordingClock::new())
        .retries(1)
        .build()
        .unwrap();

    match gateway.execute(Method::Get, "/x", None).await.unwrap_err() {
        Error::Http { status, body, .. } => {
            assert_eq!(status, 500);
            assert!(body.len() < 300);
        }
        other => panic!("expected http error, got {other:?}"),
    }
}

#[tokio::test]
async fn not_found_is_classified() {
    let transport = ScriptedTransport::always(Step::status(404, r#"{"code":1003,"msg":"app not found"}"#));
    let gateway = common::gateway(transport.clone(), common::RecordingClock::new());

    let err = gateway
        .execute(Method::Get, "/app/nope/form", None)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(err.status(), Some(404));
    assert!(err.to_string().contains("app not found"));
    assert_eq!(transport.request_count(), 3);
}

#[tokio::test]
async fn signed_headers_are_regenerated_per_attempt() {
    let transport = ScriptedTransport::new(vec![
        Step::status(500, "boom"),
        Step::ok(r#"{"code":0,"data":{}}"#),
    ]);
    let gateway = common::gateway(transport.clone(), common::RecordingClock::new());

    gateway
        .execute(Method::Get, "/app/app-1/form", None)
        .await
        .unwrap();

    let requests = transport.requests();
    assert_eq!(requests.len(), 2);
    let (first, second) = (&requests[0], &requests[1]);

    assert_eq!(first.header(HEADER_API_KEY), Some(common::API_KEY));
    assert_eq!(second.header(HEADER_API_KEY), Some(common::API_KEY));
    assert_ne!(first.header(HEADER_TIMESTAMP), second.header(HEADER_TIMESTAMP));
    assert_ne!(first.header(HEADER_SIGN), second.header(HEADER_SIGN));

    let ts = first.header(HEADER_TIMESTAMP).unwrap();
    assert_eq!(
        first.header(HEADER_SIGN).unwrap(),
        jdy_gateway::auth::sign(common::API_KEY, ts)
    );
    assert!(first.header(HEADER_AUTHORIZATION).is_none());
}

#[tokio::test]
async fn signed_headers_differ_without_backoff_on_frozen_clock() {
    let transport = ScriptedTransport::new(vec![
        Step::status(500, "boom"),
        Step::status(500, "boom"),
        Step::ok(r#"{"code":0,"data":{}}"#),
    ]);
    let clock = common::RecordingClock::new();
    let gateway = common::builder(transport.clone(), clock.clone())
        .backoff_base(Duration::ZERO)
        .build()
        .unwrap();

    gateway
        .execute(Method::Get, "/app/app-1/form", None)
        .await
        .unwrap();

    assert!(clock.sleeps().is_empty());
    let requests = transport.requests();
    assert_eq!(requests.len(), 3);
    let stamps: Vec<u64> = requests
        .iter()
        .map(|r| r.header(HEADER_TIMESTAMP).unwrap().parse().unwrap())
        .collect();
    assert!(stamps.windows(2).all(|w| w[0] < w[1]), "{stamps:?}");
    assert_ne!(requests[0].header(HEADER_SIGN), requests[1].header(HEADER_SIGN));
    assert_ne!(requests[1].header(HEADER_SIGN), requests[2].header(HEADER_SIGN));
    for req in &requests {
        assert_eq!(
            req.header(HEADER_SIGN).unwrap(),
            jdy_gateway::auth::sign(common::API_KEY, req.header(HEADER_TIMESTAMP).unwrap())
        );
    }
}

#[tokio::test]
async fn bearer_scheme_sends_only_authorization() {
    let transport = ScriptedTransport::always(Step::ok("{}"));
    let gateway = common::builder(transport.clone(), common::RecordingClock::new())
        .auth_scheme(AuthScheme::Bearer)
        .build()
        .unwrap();

    gateway.execute(Method::Get, "/app/app-1/form", None).await.unwrap();

    let req = &transport.requests()[0];
    assert_eq!(
        req.header(HEADER_AUTHORIZATION),
        Some(format!("Bearer {}", common::API_KEY).as_str())
    );
    assert_eq!(req.header("Content-Type"), Some("application/json"));
    assert!(req.header(HEADER_SIGN).is_none());
    assert!(req.header(HEADER_TIMESTAMP).is_none());
}

#[tokio::test]
async fn transaction_token_is_shared_by_all_attempts() {
    let transport = ScriptedTransport::new(vec![
        Step::Timeout,
        Step::Timeout,
        Step::ok(r#"{"data":{"_id":"r1"}}"#),
    ]);
    let gateway = common::gateway(transport.clone(), common::RecordingClock::new());

    let request = ApiRequest::post("/app/entry/data/create", json!({"data": {}})).idempotent();
    let token = request.transaction_id.clone().unwrap();
    gateway.execute_request(request).await.unwrap();

    let requests = transport.requests();
    assert_eq!(requests.len(), 3);
    for req in &requests {
        let body = req.body.as_ref().unwrap();
        assert_eq!(body["transaction_id"], json!(token.as_str()));
        assert_eq!(body["data"], json!({}));
    }
}

#[tokio::test]
async fn independent_writes_get_distinct_tokens() {
    let transport = ScriptedTransport::always(Step::ok("{}"));
    let gateway = common::gateway(transport.clone(), common::RecordingClock::new());

    for _ in 0..2 {
        gateway
            .execute_request(ApiRequest::post("/app/entry/data/create", json!({})).idempotent())
            .await
            .unwrap();
    }

    let requests = transport.requests();
    let a = &requests[0].body.as_ref().unwrap()["transaction_id"];
    let b = &requests[1].body.as_ref().unwrap()["transaction_id"];
    assert!(a.is_string());
    assert_ne!(a, b);
}

#[tokio::test]
async fn caller_supplied_token_is_used_verbatim() {
    let transport = ScriptedTransport::always(Step::ok("{}"));
    let gateway = common::gateway(transport.clone(), common::RecordingClock::new());

    gateway
        .execute_request(
            ApiRequest::post("/app/entry/data/update", json!({"data_id": "r1"}))
                .transaction_id(TransactionId::from("tx-42"))
                .idempotent(),
        )
        .await
        .unwrap();

    let body = transport.requests()[0].body.clone().unwrap();
    assert_eq!(body["transaction_id"], json!("tx-42"));
    assert_eq!(body["data_id"], json!("r1"));
}

#[tokio::test]
async fn invalid_requests_never_reach_the_transport() {
    let transport = ScriptedTransport::always(Step::ok("{}"));
    let clock = common::RecordingClock::new();
    let gateway = common::gateway(transport.clone(), clock.clone());

    let err = gateway.execute(Method::Get, "", None).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidRequest);

    let err = gateway
        .execute(Method::Get, "/app/app-1/form", Some(json!({"a": 1})))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidRequest);

    let err = gateway
        .execute_request(ApiRequest::get("/app/app-1/form").retries(0))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidRequest);

    assert_eq!(transport.request_count(), 0);
    assert!(clock.sleeps().is_empty());
}

#[tokio::test]
async fn path_without_leading_slash_and_trailing_base_slash_compose() {
    let transport = ScriptedTransport::always(Step::ok("{}"));
    let gateway = common::builder(transport.clone(), common::RecordingClock::new())
        .base_url("https://jdy.test/api/v5/")
        .build()
        .unwrap();

    gateway.execute(Method::Delete, "app/app-1/entry/e1", None).await.unwrap();
    assert_eq!(
        transport.requests()[0].url,
        "https://jdy.test/api/v5/app/app-1/entry/e1"
    );
}

#[test]
fn missing_credential_is_a_configuration_error() {
    let err = jdy_gateway::Credential::new("", "app-1").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert!(!err.is_retryable());
}
