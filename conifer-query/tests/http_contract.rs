//! HTTP transport contract tests.
//!
//! These tests verify the `/query` request format, response decoding and
//! error mapping against a wiremock server.

use std::time::Duration;

use conifer_query::http::{build_client, API_VERSION};
use conifer_query::{
    query_namespaces, HttpTransport, NamespaceTransport, QueryConfig, QueryCriteria, QueryError,
    QueryRequest, SparseValues,
};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, header_regex, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn transport(server: &MockServer) -> HttpTransport {
    let client = build_client(Duration::from_secs(5)).expect("client");
    HttpTransport::new(client, server.uri(), "test-key")
}

fn request(namespace: &str) -> QueryRequest {
    let criteria = QueryCriteria::vector(vec![0.5, 0.25]).with_metadata(true);
    QueryRequest::for_namespace(&criteria, namespace, 3)
}

// ────────────────────────────────────────────────────────────────────────────
// Request format
// ────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn request_carries_auth_and_version_headers() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/query"))
        .and(header("Api-Key", "test-key"))
        .and(header("X-Pinecone-API-Version", API_VERSION))
        .and(header("accept", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"matches": []})))
        .expect(1)
        .mount(&server)
        .await;

    transport(&server)
        .query_namespace(&request("docs"))
        .await
        .expect("query");
}

#[tokio::test]
async fn client_accepts_gzip_responses() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/query"))
        .and(header_regex("accept-encoding", "gzip"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"matches": []})))
        .expect(1)
        .mount(&server)
        .await;

    transport(&server)
        .query_namespace(&request("docs"))
        .await
        .expect("query");
}

#[tokio::test]
async fn request_body_is_camel_case() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/query"))
        .and(body_partial_json(json!({
            "namespace": "docs",
            "topK": 3,
            "vector": [0.5, 0.25],
            "includeMetadata": true
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"matches": []})))
        .expect(1)
        .mount(&server)
        .await;

    transport(&server)
        .query_namespace(&request("docs"))
        .await
        .expect("query");
}

#[tokio::test]
async fn sparse_and_id_queries_are_encoded() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/query"))
        .and(body_partial_json(json!({
            "id": "doc-7",
            "sparseVector": {"indices": [3, 9], "values": [0.5, 0.25]}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"matches": []})))
        .expect(1)
        .mount(&server)
        .await;

    let criteria = QueryCriteria::by_id("doc-7")
        .with_sparse_vector(SparseValues::new(vec![3, 9], vec![0.5, 0.25]));
    let request = QueryRequest::for_namespace(&criteria, "docs", 2);
    transport(&server)
        .query_namespace(&request)
        .await
        .expect("query");
}

#[tokio::test]
async fn additional_headers_are_sent() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/query"))
        .and(header("X-Source-Tag", "nightly_batch"))
        .and(header("X-Pinecone-API-Version", "2024-10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"matches": []})))
        .expect(1)
        .mount(&server)
        .await;

    transport(&server)
        .with_api_version("2024-10")
        .with_header("X-Source-Tag", "nightly_batch")
        .query_namespace(&request("docs"))
        .await
        .expect("query");
}

// ────────────────────────────────────────────────────────────────────────────
// Response decoding
// ────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn response_is_decoded() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "matches": [
                {"id": "v1", "score": 0.92, "metadata": {"genre": "drama"}},
                {"id": "v2", "score": 0.81, "values": [0.5, 0.5],
                 "sparseValues": {"indices": [1], "values": [0.25]}}
            ],
            "namespace": "docs",
            "usage": {"readUnits": 6}
        })))
        .mount(&server)
        .await;

    let response = transport(&server)
        .query_namespace(&request("docs"))
        .await
        .expect("query");

    assert_eq!(response.namespace, "docs");
    assert_eq!(response.usage.read_units, 6);
    assert_eq!(response.matches.len(), 2);
    assert_eq!(response.matches[0].id, "v1");
    assert_eq!(
        response.matches[0].metadata.as_ref().and_then(|m| m.get("genre")),
        Some(&json!("drama"))
    );
    assert!(response.matches[0].values.is_none());
    assert_eq!(response.matches[1].values.as_deref(), Some(&[0.5, 0.5][..]));
    assert_eq!(
        response.matches[1].sparse_values,
        Some(SparseValues::new(vec![1], vec![0.25]))
    );
}

#[tokio::test]
async fn missing_namespace_and_usage_are_filled_in() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "matches": [{"id": "v1", "score": 0.5}]
        })))
        .mount(&server)
        .await;

    let response = transport(&server)
        .query_namespace(&request("archive"))
        .await
        .expect("query");

    assert_eq!(response.namespace, "archive");
    assert_eq!(response.usage.read_units, 0);
}

// ────────────────────────────────────────────────────────────────────────────
// Error mapping
// ────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn error_status_maps_to_api_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "code": 3,
            "message": "Vector dimension 2 does not match the dimension of the index 3"
        })))
        .mount(&server)
        .await;

    let err = transport(&server)
        .query_namespace(&request("docs"))
        .await
        .unwrap_err();

    match err {
        QueryError::Api { status, ref message } => {
            assert_eq!(status, 400);
            assert!(message.contains("dimension"));
        }
        ref other => panic!("unexpected error: {other}"),
    }
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn server_error_is_retryable() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream unavailable"))
        .mount(&server)
        .await;

    let err = transport(&server)
        .query_namespace(&request("docs"))
        .await
        .unwrap_err();

    assert_eq!(err.code(), "API_ERROR");
    assert!(err.is_retryable());
    assert!(err.to_string().contains("upstream unavailable"));
}

#[tokio::test]
async fn malformed_body_maps_to_parse_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let err = transport(&server)
        .query_namespace(&request("docs"))
        .await
        .unwrap_err();

    assert!(matches!(err, QueryError::Parse(_)));
}

#[tokio::test]
async fn slow_response_maps_to_timeout() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"matches": []}))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let client = build_client(Duration::from_millis(200)).expect("client");
    let err = HttpTransport::new(client, server.uri(), "test-key")
        .query_namespace(&request("docs"))
        .await
        .unwrap_err();

    assert!(matches!(err, QueryError::Timeout(_)));
    assert!(err.is_retryable());
}

// ────────────────────────────────────────────────────────────────────────────
// End to end
// ────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn query_namespaces_over_http() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/query"))
        .and(body_partial_json(json!({"namespace": "docs"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "matches": [{"id": "d1", "score": 0.9}, {"id": "d2", "score": 0.4}],
            "namespace": "docs",
            "usage": {"readUnits": 5}
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/query"))
        .and(body_partial_json(json!({"namespace": "faq"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "matches": [{"id": "f1", "score": 0.7}, {"id": "f2", "score": 0.6}],
            "namespace": "faq",
            "usage": {"readUnits": 5}
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/query"))
        .and(body_partial_json(json!({"namespace": "gone"})))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": {"code": "NOT_FOUND", "message": "Namespace not found"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let criteria = QueryCriteria::vector(vec![0.5, 0.25]).with_top_k(3);
    let results = query_namespaces(
        &transport(&server),
        &["docs", "faq", "gone", "docs"],
        &criteria,
        &QueryConfig::default(),
    )
    .await
    .expect("query");

    let ids: Vec<&str> = results.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, vec!["d1", "f1", "f2"]);
    assert_eq!(results.usage.read_units, 10);
    assert_eq!(results.failures.len(), 1);
    assert_eq!(results.failures[0].namespace, "gone");
    assert!(results.failures[0].message.contains("Namespace not found"));
}
