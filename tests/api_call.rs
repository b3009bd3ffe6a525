use reqwest::{Method, StatusCode};
use serde_json::json;
use server_account::api_call::{
    AccountApiCall, ApiCallError, ApiCallResult, ApiRequest, ExpectedResponse,
};
use std::sync::Arc;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::{LocalTransport, closed_url, local_api_call};

mod common;

#[tokio::test]
async fn it_returns_json_objects_with_status_and_headers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/me"))
        .and(header("authorization", "Bearer token"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("x-request-id", "req-1")
                .set_body_json(json!({ "id": "42", "name": "Ada" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let response = local_api_call(&server)
        .api_call(
            ApiRequest::new(Method::GET, "/v1/me").with_header("Authorization", "Bearer token"),
        )
        .await;

    assert_eq!(response.status, Some(StatusCode::OK));
    assert_eq!(response.headers.unwrap()["x-request-id"], "req-1");
    let dictionary = response.result.unwrap();
    let dictionary = dictionary.as_dictionary().unwrap();
    assert_eq!(dictionary["id"], "42");
    assert_eq!(dictionary["name"], "Ada");
}

#[tokio::test]
async fn it_keeps_array_order() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/files"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(["c", "a", "b"])))
        .mount(&server)
        .await;

    let response = local_api_call(&server)
        .api_call(ApiRequest::new(Method::GET, "/files"))
        .await;

    assert_eq!(
        response.result,
        Some(ApiCallResult::Array(vec![json!("c"), json!("a"), json!("b")]))
    );
}

#[tokio::test]
async fn it_returns_raw_bytes_when_asked_for_data() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/download"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8, 159, 146, 150]))
        .mount(&server)
        .await;

    let response = local_api_call(&server)
        .api_call(
            ApiRequest::new(Method::GET, "/download").expected_success_body(ExpectedResponse::Data),
        )
        .await;

    match response.result {
        Some(ApiCallResult::Data(bytes)) => assert_eq!(bytes.as_ref(), &[0u8, 159, 146, 150]),
        other => panic!("unexpected result {:?}", other),
    }
}

#[tokio::test]
async fn it_drops_non_200_responses_unless_asked_for() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({ "error": "invalid_grant" })),
        )
        .mount(&server)
        .await;

    let api = local_api_call(&server);

    let dropped = api
        .api_call(ApiRequest::new(Method::POST, "/token").return_result_when_non_200(false))
        .await;
    assert!(dropped.is_none());

    let kept = api
        .api_call(
            ApiRequest::new(Method::POST, "/token")
                .expected_failure_body(ExpectedResponse::Json),
        )
        .await;
    assert_eq!(kept.status, Some(StatusCode::BAD_REQUEST));
    assert_eq!(
        kept.result.unwrap().as_dictionary().unwrap()["error"],
        "invalid_grant"
    );
}

#[tokio::test]
async fn it_sends_single_quotes_percent_encoded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/drive/v3/files"))
        .and(query_param("q", "name='Backups' and trashed=false"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "files": [] })))
        .expect(1)
        .mount(&server)
        .await;

    let response = local_api_call(&server)
        .api_call(
            ApiRequest::new(Method::GET, "/drive/v3/files")
                .with_url_parameters("q=name='Backups' and trashed=false"),
        )
        .await;

    assert_eq!(response.status, Some(StatusCode::OK));

    let requests = server.received_requests().await.unwrap();
    let query = requests[0].url.query().unwrap_or_default().to_owned();
    assert!(query.contains("%27Backups%27"), "query was {}", query);
    assert!(!query.contains('\''));
}

#[tokio::test]
async fn it_reports_unreachable_hosts_as_none() {
    let transport = LocalTransport::to(closed_url());
    let api = AccountApiCall::with_transport(Arc::new(transport)).base_url("provider.test");

    let response = api.api_call(ApiRequest::new(Method::GET, "/gone")).await;

    assert!(response.is_none());
    assert!(matches!(
        api.try_api_call(ApiRequest::new(Method::GET, "/gone")).await,
        Err(ApiCallError::Transport(_))
    ));
}
