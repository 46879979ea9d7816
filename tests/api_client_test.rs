mod common;

use bakery_client::api::{ApiError, Endpoint, TransportKind};
use bakery_client::config::SessionExpiryPolicy;
use common::{FakeBackend, Reply};
use serde_json::{json, Value};
use std::time::Duration;

#[tokio::test]
async fn bearer_token_is_attached_when_present() {
    let backend = FakeBackend::start(|_| Reply::json(json!({"status": true, "obj": []}))).await;
    let (client, session) = backend.client();
    session.set_token("tok-7f3a.b9==").unwrap();

    client.call_value(Endpoint::StockParams, &json!({})).await.unwrap();

    let seen = backend.last_request();
    assert_eq!(seen.authorization.as_deref(), Some("Bearer tok-7f3a.b9=="));
}

#[tokio::test]
async fn missing_token_sends_unauthenticated_request() {
    let backend = FakeBackend::start(|_| Reply::json(json!({"status": true, "obj": {"products": []}}))).await;
    let (client, _session) = backend.client();

    let obj = client.call_value(Endpoint::StockParams, &json!({})).await.unwrap();

    assert_eq!(obj, json!({"products": []}));
    let seen = backend.requests();
    assert_eq!(seen.len(), 1, "request must reach the backend without a token");
    assert_eq!(seen[0].authorization, None);
}

#[tokio::test]
async fn token_is_read_fresh_for_every_request() {
    let backend = FakeBackend::start(|_| Reply::json(json!({"status": true}))).await;
    let (client, session) = backend.client();

    client.call_unit(Endpoint::StockData, &json!({})).await.unwrap();
    session.set_token("first").unwrap();
    client.call_unit(Endpoint::StockData, &json!({})).await.unwrap();
    session.set_token("second").unwrap();
    client.call_unit(Endpoint::StockData, &json!({})).await.unwrap();
    session.clear().unwrap();
    client.call_unit(Endpoint::StockData, &json!({})).await.unwrap();

    let auth: Vec<Option<String>> = backend.requests().into_iter().map(|r| r.authorization).collect();
    assert_eq!(
        auth,
        vec![
            None,
            Some("Bearer first".to_string()),
            Some("Bearer second".to_string()),
            None
        ]
    );
}

#[tokio::test]
async fn every_operation_is_a_json_post_to_its_path() {
    let backend = FakeBackend::start(|_| Reply::json(json!({"status": true}))).await;
    let (client, _) = backend.client();

    client
        .call_unit(Endpoint::EndOfDayListData, &json!({"start_date": "2024-01-01"}))
        .await
        .unwrap();

    let seen = backend.last_request();
    assert_eq!(seen.method, "POST");
    assert_eq!(seen.path, "/api/endofday/list");
    assert_eq!(seen.content_type.as_deref(), Some("application/json"));
    assert_eq!(seen.body, json!({"start_date": "2024-01-01"}));
}

#[tokio::test]
async fn status_false_or_missing_is_business_failure_whatever_the_http_code() {
    let backend = FakeBackend::start(|req| match req.path.as_str() {
        "/api/stock/add" => Reply::json(json!({"status": false, "sub_info": "duplicate_entry"})),
        "/api/stock/data" => Reply::json(json!({"obj": [1, 2, 3]})),
        "/api/holiday/add" => Reply::with_status(422, json!({"status": false, "message": "date taken"})),
        _ => Reply::with_status(500, json!({"error": "boom"})),
    })
    .await;
    let (client, _) = backend.client();

    let err = client.call_unit(Endpoint::AddStock, &json!({})).await.unwrap_err();
    assert!(err.is_business());
    assert_eq!(err.sub_info(), Some("duplicate_entry"));

    let err = client.call_value(Endpoint::StockData, &json!({})).await.unwrap_err();
    assert!(err.is_business(), "missing status must fail: {err:?}");

    match client.call_unit(Endpoint::AddHoliday, &json!({})).await.unwrap_err() {
        ApiError::Business(failure) => {
            assert_eq!(failure.http_status, 422);
            assert_eq!(failure.message.as_deref(), Some("date taken"));
            assert_eq!(failure.endpoint, Some(Endpoint::AddHoliday));
        }
        other => panic!("expected business failure, got {other:?}"),
    }

    let err = client.call_unit(Endpoint::HolidayList, &json!({})).await.unwrap_err();
    assert!(err.is_business());
}

#[tokio::test]
async fn success_payload_is_passed_through_unmodified() {
    let obj = json!({
        "products": [{"id": 1, "name": "Simit", "weights": [0.1, 0.25]}],
        "meta": {"nested": {"empty": {}, "nothing": null}},
        "big": 12345678901234_i64
    });
    let reply = obj.clone();
    let backend = FakeBackend::start(move |_| Reply::json(json!({"status": true, "obj": reply.clone()}))).await;
    let (client, _) = backend.client();

    let got = client.call_value(Endpoint::StockParams, &json!({})).await.unwrap();
    assert_eq!(got, obj);
}

#[tokio::test]
async fn repeated_reads_return_the_same_payload() {
    let backend = FakeBackend::start(|_| {
        Reply::json(json!({"status": true, "obj": {"products": [{"id": 3, "name": "Pide"}]}}))
    })
    .await;
    let (client, session) = backend.client();
    session.set_token("t").unwrap();

    let first = client.call_value(Endpoint::StockParams, &json!({})).await.unwrap();
    let second = client.call_value(Endpoint::StockParams, &json!({})).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(backend.requests().len(), 2);
}

#[tokio::test]
async fn absent_obj_reads_as_null() {
    let backend = FakeBackend::start(|_| Reply::json(json!({"status": 1}))).await;
    let (client, _) = backend.client();
    assert_eq!(client.call_value(Endpoint::AddStock, &json!({})).await.unwrap(), Value::Null);
}

#[tokio::test]
async fn timeout_is_a_transport_error_not_a_business_failure() {
    let backend = FakeBackend::start(|_| {
        Reply::json(json!({"status": false})).delayed(Duration::from_secs(3))
    })
    .await;
    let (client, _) = backend.client_with(backend.config().with_timeout(Some(Duration::from_millis(200))));

    let err = client.call_value(Endpoint::StockData, &json!({})).await.unwrap_err();
    assert!(err.is_timeout(), "expected timeout, got {err:?}");
    assert!(err.is_transport());
    assert!(!err.is_business());
    assert_ne!(
        err.user_message(),
        ApiError::Business(Default::default()).user_message()
    );
}

#[tokio::test]
async fn unreachable_backend_is_a_transport_error() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let backend = FakeBackend::start(|_| Reply::json(json!({"status": true}))).await;
    let (client, _) = backend.client_with(
        bakery_client::ClientConfig::new(format!("http://127.0.0.1:{}", port))
            .with_timeout(Some(Duration::from_secs(5))),
    );

    let err = client.call_unit(Endpoint::Login, &json!({})).await.unwrap_err();
    assert!(err.is_transport(), "{err:?}");
    assert!(!err.is_business());
}

#[tokio::test]
async fn non_json_bodies_are_transport_errors() {
    let backend = FakeBackend::start(|req| match req.path.as_str() {
        "/api/stock/params" => Reply::raw(200, b"<html>maintenance</html>", "text/html"),
        _ => Reply::raw(503, b"Service Unavailable", "text/plain"),
    })
    .await;
    let (client, _) = backend.client();

    match client.call_value(Endpoint::StockParams, &json!({})).await.unwrap_err() {
        ApiError::Transport(t) => assert_eq!(t.kind, TransportKind::Body),
        other => panic!("unexpected {other:?}"),
    }
    match client.call_value(Endpoint::StockData, &json!({})).await.unwrap_err() {
        ApiError::Transport(t) => {
            assert_eq!(t.kind, TransportKind::Status(503));
            assert!(t.message.contains("Service Unavailable"));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn unauthorized_clears_the_session_by_default() {
    let backend = FakeBackend::start(|_| Reply::with_status(401, json!({"detail": "expired"}))).await;
    let (client, session) = backend.client();
    session.set_token("old").unwrap();
    session.set_admin(true).unwrap();

    let err = client.call_value(Endpoint::UserList, &json!({})).await.unwrap_err();
    assert!(matches!(err, ApiError::SessionExpired));
    assert_eq!(session.token().unwrap(), None);
    assert!(!session.is_admin().unwrap());
}

#[tokio::test]
async fn unauthorized_with_keep_policy_leaves_the_token() {
    let backend = FakeBackend::start(|_| Reply::with_status(401, json!({}))).await;
    let (client, session) = backend.client_with(backend.config_with_policy(SessionExpiryPolicy::Keep));
    session.set_token("old").unwrap();

    let err = client.call_value(Endpoint::UserList, &json!({})).await.unwrap_err();
    assert!(matches!(err, ApiError::SessionExpired));
    assert_eq!(session.token().unwrap().as_deref(), Some("old"));
}

#[tokio::test]
async fn typed_call_reports_decode_errors() {
    let backend = FakeBackend::start(|_| Reply::json(json!({"status": true, "obj": "not a list"}))).await;
    let (client, _) = backend.client();

    let err = client
        .call::<Vec<i64>, _>(Endpoint::HolidayList, &json!({}))
        .await
        .unwrap_err();
    match err {
        ApiError::Decode { endpoint, .. } => assert_eq!(endpoint, Endpoint::HolidayList),
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn fetch_bytes_resolves_relative_links_and_authenticates() {
    let backend = FakeBackend::start(|req| match req.path.as_str() {
        "/media/reports/r1.pdf" => Reply::raw(200, b"%PDF-1.4 fake", "application/pdf"),
        _ => Reply::raw(404, b"missing", "text/plain"),
    })
    .await;
    let (client, session) = backend.client();
    session.set_token("pdf-token").unwrap();

    let bytes = client.fetch_bytes("/media/reports/r1.pdf").await.unwrap();
    assert_eq!(bytes, b"%PDF-1.4 fake");

    let seen = backend.last_request();
    assert_eq!(seen.method, "GET");
    assert_eq!(seen.authorization.as_deref(), Some("Bearer pdf-token"));

    let err = client.fetch_bytes("media/none.pdf").await.unwrap_err();
    match err {
        ApiError::Transport(t) => assert_eq!(t.kind, TransportKind::Status(404)),
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn message_of_any_shape_keeps_the_envelope_rules() {
    let backend = FakeBackend::start(|req| match req.path.as_str() {
        "/api/user/register" => Reply::with_status(
            422,
            json!({"status": false, "message": {"email": ["taken"]}}),
        ),
        "/api/holiday/add" => Reply::json(json!({"status": false, "message": ["closed", "twice"]})),
        "/api/stock/add" => Reply::json(json!({"status": false, "message": 7})),
        "/api/stock/params" => Reply::json(json!({"status": true, "obj": [1, 2], "message": 0})),
        "/api/stock/data" => Reply::json(json!({"status": true, "obj": [3], "message": {"info": "cached"}})),
        _ => Reply::json(json!({"status": true, "obj": "ok", "message": ["a", "b"]})),
    })
    .await;
    let (client, _) = backend.client();

    match client.call_unit(Endpoint::Register, &json!({})).await.unwrap_err() {
        ApiError::Business(failure) => {
            assert_eq!(failure.http_status, 422);
            assert_eq!(failure.message.as_deref(), Some("email: taken"));
        }
        other => panic!("expected business failure, got {other:?}"),
    }
    let err = client.call_unit(Endpoint::AddHoliday, &json!({})).await.unwrap_err();
    assert_eq!(err.user_message(), "Operation rejected: closed; twice");
    let err = client.call_unit(Endpoint::AddStock, &json!({})).await.unwrap_err();
    assert!(err.is_business(), "{err:?}");

    assert_eq!(client.call_value(Endpoint::StockParams, &json!({})).await.unwrap(), json!([1, 2]));
    assert_eq!(client.call_value(Endpoint::StockData, &json!({})).await.unwrap(), json!([3]));
    assert_eq!(client.call_value(Endpoint::HolidayList, &json!({})).await.unwrap(), json!("ok"));
}
