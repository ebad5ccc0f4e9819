//! HTTP entitlement client against a mocked entitlement service.

use serde_json::json;
use solrgate_search::{
    AccessFilterSupplier, CallerDescriptor, EntitlementError, HttpEntitlementClient,
};
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> HttpEntitlementClient {
    HttpEntitlementClient::with_client(reqwest::Client::new(), &format!("{}/filter", server.uri()))
        .unwrap()
}

#[tokio::test]
async fn posts_caller_and_reads_filter() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/filter"))
        .and(body_json(json!({"user": "alice", "groups": ["staff", "lib"]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"filter": "licence:(a OR b)"})))
        .expect(1)
        .mount(&server)
        .await;

    let caller = CallerDescriptor::anonymous()
        .with_user("alice")
        .with_groups(["staff", "lib"]);
    let filter = client(&server).fetch(&caller).await.unwrap();
    assert_eq!(filter.clauses(), ["licence:(a OR b)"]);
}

#[tokio::test]
async fn empty_fragment_means_no_clauses() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"filter": ""})))
        .mount(&server)
        .await;

    let filter = client(&server)
        .fetch(&CallerDescriptor::anonymous())
        .await
        .unwrap();
    assert!(filter.is_empty());
}

#[tokio::test]
async fn server_error_is_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let err = client(&server)
        .fetch(&CallerDescriptor::anonymous())
        .await
        .unwrap_err();
    assert!(matches!(err, EntitlementError::Unavailable(_)));
}

#[tokio::test]
async fn missing_filter_is_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ok"})))
        .mount(&server)
        .await;

    let err = client(&server)
        .fetch(&CallerDescriptor::anonymous())
        .await
        .unwrap_err();
    assert!(matches!(err, EntitlementError::Unavailable(_)));
}

#[tokio::test]
async fn unreachable_service_is_unavailable() {
    let server = MockServer::start().await;
    let uri = format!("{}/filter", server.uri());
    drop(server);

    let client = HttpEntitlementClient::with_client(reqwest::Client::new(), &uri).unwrap();
    let err = client.fetch(&CallerDescriptor::anonymous()).await.unwrap_err();
    assert!(matches!(err, EntitlementError::Unavailable(_)));
}
