//! Integration tests for the backend client and store accessors.
//!
//! These tests use wiremock to simulate the hosted backend and verify
//! request shape, response parsing and error mapping.

use chrono::NaiveDate;
use mission_tracker::{
    AppError, BackendClient, Query, Store,
    config::{BackendConfig, NetworkConfig},
    models::Mission,
};
use serde_json::json;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_json, header, method, path, query_param},
};

fn client(server: &MockServer) -> BackendClient {
    let backend = BackendConfig {
        url: format!("{}/", server.uri()),
        anon_key: "anon-key".to_string(),
        access_token: Some("session-token".to_string()),
        image_bucket: "badge-images".to_string(),
    };
    let network = NetworkConfig {
        request_timeout_secs: 5,
        connect_timeout_secs: 2,
    };
    BackendClient::new(&backend, &network).expect("Client creation should succeed")
}

fn store(server: &MockServer) -> Store {
    Store::new(client(server), "u1", "badge-images")
}

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

// ==================== Client Tests ====================

/// Test that select sends auth headers and filters and parses rows.
#[tokio::test]
async fn test_select_sends_filters_and_auth() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/missions"))
        .and(header("apikey", "anon-key"))
        .and(header("authorization", "Bearer session-token"))
        .and(query_param("user_id", "eq.u1"))
        .and(query_param("order", "order_index.asc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "m1", "user_id": "u1", "content": "Brush teeth", "order_index": 0},
            {"id": "m2", "user_id": "u1", "content": "Pack bag", "order_index": 1}
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let query = Query::new()
        .select("*")
        .eq("user_id", "u1")
        .order("order_index", true);
    let rows: Vec<Mission> = client(&mock_server)
        .select("missions", &query)
        .await
        .expect("Select should succeed");

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1].content, "Pack bag");
}

/// Test that a non-2xx status becomes a backend error carrying the status.
#[tokio::test]
async fn test_backend_error_status() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/missions"))
        .respond_with(ResponseTemplate::new(401).set_body_string("JWT expired"))
        .mount(&mock_server)
        .await;

    let result: Result<Vec<Mission>, _> = client(&mock_server)
        .select("missions", &Query::new())
        .await;

    match result {
        Err(AppError::Backend { status, message }) => {
            assert_eq!(status, 401);
            assert_eq!(message, "JWT expired");
        }
        other => panic!("Expected backend error, got {other:?}"),
    }
}

/// Test that a malformed body is reported as a decode error.
#[tokio::test]
async fn test_malformed_body_is_decode_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/missions"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&mock_server)
        .await;

    let result: Result<Vec<Mission>, _> = client(&mock_server)
        .select("missions", &Query::new())
        .await;

    assert!(matches!(result, Err(AppError::Decode(_))));
}

/// Test that an unreachable server maps to a network error.
#[tokio::test]
async fn test_connection_refused_is_network_error() {
    let backend = BackendConfig {
        url: "http://127.0.0.1:1".to_string(),
        anon_key: "anon-key".to_string(),
        access_token: None,
        image_bucket: "badge-images".to_string(),
    };
    let network = NetworkConfig {
        request_timeout_secs: 2,
        connect_timeout_secs: 1,
    };
    let client = BackendClient::new(&backend, &network).unwrap();

    let result: Result<Vec<Mission>, _> = client.select("missions", &Query::new()).await;
    let err = result.expect_err("Request should fail");
    assert!(matches!(err, AppError::Network(_)));
    assert_eq!(err.user_message(), "Something went wrong, please try again.");
}

/// Test that insert asks for the stored row back.
#[tokio::test]
async fn test_insert_returns_representation() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/mission_logs"))
        .and(header("prefer", "return=representation"))
        .and(body_json(json!({
            "user_id": "u1",
            "mission_id": "m1",
            "completed_date": "2024-06-12"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            {"id": "l1", "user_id": "u1", "mission_id": "m1", "completed_date": "2024-06-12"}
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let log = store(&mock_server)
        .insert_log("m1", date("2024-06-12"))
        .await
        .expect("Insert should succeed");
    assert_eq!(log.id, "l1");
}

/// Test that insert with an empty representation is an error.
#[tokio::test]
async fn test_insert_without_row_is_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/mission_logs"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let result = store(&mock_server).insert_log("m1", date("2024-06-12")).await;
    assert!(matches!(result, Err(AppError::Decode(_))));
}

// ==================== Store Accessor Tests ====================

/// Test that the counter RPC posts its arguments and returns the new count.
#[tokio::test]
async fn test_increment_completed_rpc() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/increment_completed_count"))
        .and(body_json(json!({"p_user_id": "u1", "p_date": "2024-06-12"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(3)))
        .expect(1)
        .mount(&mock_server)
        .await;

    let count = store(&mock_server)
        .increment_completed(date("2024-06-12"))
        .await
        .unwrap();
    assert_eq!(count, 3);
}

/// Test that a missing snapshot is `None`, not an error.
#[tokio::test]
async fn test_snapshot_for_date_absent() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/daily_snapshots"))
        .and(query_param("date", "eq.2024-06-12"))
        .and(query_param("limit", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let snapshot = store(&mock_server)
        .snapshot_for_date(date("2024-06-12"))
        .await
        .unwrap();
    assert!(snapshot.is_none());
}

/// Test that range queries send both inclusive bounds.
#[tokio::test]
async fn test_snapshots_in_range_bounds() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/daily_snapshots"))
        .and(query_param("date", "gte.2024-06-10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "id": "s1", "user_id": "u1", "date": "2024-06-10",
                "missions": [{"id": "m1", "content": "Brush teeth", "order_index": 0}],
                "completed_count": 1, "total_count": 1
            }
        ])))
        .mount(&mock_server)
        .await;

    let snapshots = store(&mock_server)
        .snapshots_in_range(date("2024-06-10"), date("2024-06-14"))
        .await
        .unwrap();

    let received = mock_server.received_requests().await.unwrap();
    let query = received[0].url.query().unwrap_or_default().to_string();
    assert!(query.contains("date=lte.2024-06-14"), "query was {query}");

    assert_eq!(snapshots.len(), 1);
    assert!(snapshots[0].is_complete());
}

/// Test that a new mission is appended after the current last one.
#[tokio::test]
async fn test_add_mission_appends_order_index() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/missions"))
        .and(query_param("order", "order_index.desc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "m4", "user_id": "u1", "content": "Feed cat", "order_index": 4}
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/missions"))
        .and(body_json(json!({"user_id": "u1", "content": "Read", "order_index": 5})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            {"id": "m5", "user_id": "u1", "content": "Read", "order_index": 5}
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mission = store(&mock_server).add_mission("Read").await.unwrap();
    assert_eq!(mission.order_index, 5);
}

/// Test public image URLs are built from the bucket and path.
#[tokio::test]
async fn test_badge_image_url() {
    let mock_server = MockServer::start().await;
    let client = client(&mock_server);

    assert_eq!(
        client.public_url("badge-images", "/stars/gold.png"),
        format!(
            "{}/storage/v1/object/public/badge-images/stars/gold.png",
            mock_server.uri()
        )
    );
}

/// Test that log history queries are bounded on both ends and ordered by day.
#[tokio::test]
async fn test_logs_in_range_bounds() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/mission_logs"))
        .and(query_param("user_id", "eq.u1"))
        .and(query_param("completed_date", "gte.2024-06-01"))
        .and(query_param("completed_date", "lte.2024-06-30"))
        .and(query_param("order", "completed_date.asc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "l1", "user_id": "u1", "mission_id": "m1", "completed_date": "2024-06-03"},
            {"id": "l2", "user_id": "u1", "mission_id": "m2", "completed_date": "2024-06-12"}
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let logs = store(&mock_server)
        .logs_in_range(date("2024-06-01"), date("2024-06-30"))
        .await
        .unwrap();

    assert_eq!(logs.len(), 2);
    assert_eq!(logs[1].completed_date, date("2024-06-12"));
}

/// Test that deleting a challenge is scoped to its creator.
#[tokio::test]
async fn test_delete_challenge_scoped_to_creator() {
    let mock_server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/rest/v1/challenges"))
        .and(query_param("id", "eq.c1"))
        .and(query_param("created_by", "eq.u1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;

    store(&mock_server)
        .delete_challenge("c1")
        .await
        .expect("Delete should succeed");
}

/// Test that a rejected delete surfaces the backend status.
#[tokio::test]
async fn test_delete_challenge_forbidden() {
    let mock_server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/rest/v1/challenges"))
        .respond_with(ResponseTemplate::new(403).set_body_string("permission denied"))
        .mount(&mock_server)
        .await;

    let result = store(&mock_server).delete_challenge("c1").await;
    assert!(matches!(result, Err(AppError::Backend { status: 403, .. })));
}
