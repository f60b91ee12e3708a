/// Typesense HTTP adapter against a mock search service
mod common;

use common::{closed_port, header, target, FakeSearchServer};
use legisync_storage::WatchedKind;
use legisync_sync::{
    collection_schema, ErrorCategory, IndexError, SearchConfig, SearchIndex, TypesenseClient,
};
use serde_json::{json, Value};
use std::time::Duration;
use wiremock::matchers::method;
use wiremock::{Mock, ResponseTemplate};

#[tokio::test]
async fn test_upsert_wire_format() {
    let doc = json!({"id": "abc", "firstName": "Jane", "lastName": "Doe"});
    let server = FakeSearchServer::start().await;
    server.on_upsert("Legislator", 200, doc.clone()).await;
    let client = TypesenseClient::new(&server.config()).unwrap();

    let result = client.upsert("Legislator", &doc).await.unwrap();

    assert_eq!(result.collection, "Legislator");
    assert_eq!(result.id, "abc");
    assert_eq!(result.document, doc);

    let requests = server.requests().await;
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request.method.as_str(), "POST");
    assert_eq!(
        target(request),
        "/collections/Legislator/documents?action=upsert"
    );
    assert_eq!(header(request, "x-typesense-api-key"), Some("test-key"));
    assert!(header(request, "content-type").is_some_and(|v| v.starts_with("application/json")));
    assert_eq!(request.body_json::<Value>().unwrap(), doc);
}

#[tokio::test]
async fn test_integer_id_is_accepted() {
    let server = FakeSearchServer::start().await;
    server.on_upsert("Note", 200, json!({"id": "7"})).await;
    let client = TypesenseClient::new(&server.config()).unwrap();

    let result = client.upsert("Note", &json!({"id": 7})).await.unwrap();
    assert_eq!(result.id, "7");
}

#[tokio::test]
async fn test_missing_id_makes_no_request() {
    let server = FakeSearchServer::start().await;
    server.on_upsert("Note", 200, json!({})).await;
    let client = TypesenseClient::new(&server.config()).unwrap();

    let err = client
        .upsert("Note", &json!({"count": 4}))
        .await
        .unwrap_err();

    assert!(matches!(err, IndexError::MissingIdentifier { ref collection } if collection == "Note"));
    assert!(server.requests().await.is_empty());
}

#[tokio::test]
async fn test_status_mapping() {
    let cases = [
        (401, ErrorCategory::Infrastructure),
        (404, ErrorCategory::Infrastructure),
        (422, ErrorCategory::Infrastructure),
        (500, ErrorCategory::Transient),
        (503, ErrorCategory::Transient),
    ];

    for (status, category) in cases {
        let server = FakeSearchServer::start().await;
        server
            .on_upsert("Legislator", status, json!({"message": "from server"}))
            .await;
        let client = TypesenseClient::new(&server.config()).unwrap();

        let err = client
            .upsert("Legislator", &json!({"id": "x"}))
            .await
            .unwrap_err();
        assert_eq!(err.category(), category, "status {status}");
        assert!(err.to_string().contains("from server"), "status {status}");
    }
}

#[tokio::test]
async fn test_rejected_document() {
    let server = FakeSearchServer::start().await;
    server
        .on_upsert(
            "Legislator",
            400,
            json!({"message": "Field `district` must be an int32."}),
        )
        .await;
    let client = TypesenseClient::new(&server.config()).unwrap();

    let err = client
        .upsert("Legislator", &json!({"id": "x", "district": "twelve"}))
        .await
        .unwrap_err();

    match err {
        IndexError::Rejected { status, message } => {
            assert_eq!(status, 400);
            assert_eq!(message, "Field `district` must be an int32.");
        }
        other => panic!("expected rejection, got {:?}", other),
    }
}

#[tokio::test]
async fn test_ensure_collection_creates_schema() {
    let server = FakeSearchServer::start().await;
    server
        .on_post("/collections", 201, json!({"name": "Note"}))
        .await;
    let client = TypesenseClient::new(&server.config()).unwrap();

    client
        .ensure_collection(&collection_schema(WatchedKind::Note))
        .await
        .unwrap();

    let requests = server.requests().await;
    assert_eq!(requests[0].method.as_str(), "POST");
    assert_eq!(target(&requests[0]), "/collections");

    let body: Value = requests[0].body_json().unwrap();
    assert_eq!(body["name"], "Note");
    assert_eq!(
        body["fields"][0],
        json!({"name": "organizationId", "type": "string", "facet": true})
    );
}

#[tokio::test]
async fn test_ensure_collection_tolerates_existing() {
    let server = FakeSearchServer::start().await;
    server
        .on_post(
            "/collections",
            409,
            json!({"message": "A collection with name `Note` already exists."}),
        )
        .await;
    let client = TypesenseClient::new(&server.config()).unwrap();

    assert!(client
        .ensure_collection(&collection_schema(WatchedKind::Note))
        .await
        .is_ok());
}

#[tokio::test]
async fn test_ensure_collection_bad_key() {
    let server = FakeSearchServer::start().await;
    server
        .on_post("/collections", 401, json!({"message": "Forbidden"}))
        .await;
    let client = TypesenseClient::new(&server.config()).unwrap();

    let err = client
        .ensure_collection(&collection_schema(WatchedKind::Legislator))
        .await
        .unwrap_err();
    assert!(matches!(err, IndexError::Unauthorized { status: 401, .. }));
}

#[tokio::test]
async fn test_connection_refused_is_transport() {
    let addr = closed_port().await;
    let config = SearchConfig {
        host: addr.ip().to_string(),
        port: addr.port(),
        ..SearchConfig::default()
    };
    let client = TypesenseClient::new(&config).unwrap();

    let err = client
        .upsert("Note", &json!({"id": 1}))
        .await
        .unwrap_err();
    assert!(matches!(err, IndexError::Transport(_)), "{err:?}");
    assert_eq!(err.category(), ErrorCategory::Transient);
}

#[tokio::test]
async fn test_slow_server_times_out() {
    let server = FakeSearchServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"id": "1"}))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server.server)
        .await;

    let config = SearchConfig {
        connection_timeout_secs: 1,
        ..server.config()
    };
    let client = TypesenseClient::new(&config).unwrap();

    let err = client
        .upsert("Note", &json!({"id": 1}))
        .await
        .unwrap_err();
    assert!(matches!(err, IndexError::Timeout(_)), "{err:?}");
}
