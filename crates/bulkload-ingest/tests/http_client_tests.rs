//! HTTP statement-client tests against a mock execute endpoint

use bulkload_ingest::client::{HttpStatementClient, StatementClient};
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> HttpStatementClient {
    HttpStatementClient::new(
        format!("{}/execute", server.uri()),
        "arn:resource:cluster",
        "arn:secret:creds",
    )
    .unwrap()
}

#[tokio::test]
async fn posts_sql_and_identifiers_as_json() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/execute"))
        .and(body_partial_json(json!({
            "sql": "REPLACE INTO `db`.`t` VALUES (1);",
            "resourceArn": "arn:resource:cluster",
            "secretArn": "arn:secret:creds",
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    client
        .execute("REPLACE INTO `db`.`t` VALUES (1);", None)
        .await
        .unwrap();
}

#[tokio::test]
async fn transaction_id_is_forwarded() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "transactionId": "txn-1" })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    client.execute("SELECT 1;", Some("txn-1")).await.unwrap();
}

#[tokio::test]
async fn cold_start_bad_request_is_retryable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "message": "Communications link failure with the database proxy"
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.execute("SELECT 1;", None).await.unwrap_err();
    assert!(err.is_retryable());
}

#[tokio::test]
async fn deadlock_bad_request_is_retryable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "message": "Deadlock found when trying to get lock; try restarting transaction"
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.execute("REPLACE INTO `db`.`t` VALUES (1);", None).await.unwrap_err();
    assert!(err.is_retryable());
}

#[tokio::test]
async fn other_failures_are_fatal() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "message": "You have an error in your SQL syntax"
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.execute("REPLAACE INTO", None).await.unwrap_err();
    assert!(!err.is_retryable());
    assert!(err.message.contains("SQL syntax"));
}
