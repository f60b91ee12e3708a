//! Shared fixtures for the integration suites
#![allow(dead_code)]

use async_trait::async_trait;
use legisync_storage::infrastructure::{InMemoryQueueStore, InMemoryRecordStore};
use legisync_storage::{NewQueueEntry, QueueEntry, QueueStore, StorageError};
use legisync_sync::{
    Chamber, InMemorySearchIndex, InterceptedStore, MutationInterceptor, NewLegislator, Party,
    Projector, PropagationPolicy, SearchConfig, State,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

// ═══════════════════════════════════════════════════════════════════════════
// In-memory wiring
// ═══════════════════════════════════════════════════════════════════════════

pub struct Harness {
    pub records: InMemoryRecordStore,
    pub queue: InMemoryQueueStore,
    pub index: InMemorySearchIndex,
    pub store: InterceptedStore,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_policy(PropagationPolicy::LogAndContinue)
    }

    pub fn with_policy(policy: PropagationPolicy) -> Self {
        let records = InMemoryRecordStore::new();
        let queue = InMemoryQueueStore::new();
        let index = InMemorySearchIndex::new();

        let interceptor = MutationInterceptor::new(
            Arc::new(queue.clone()),
            Arc::new(index.clone()),
            Projector::default(),
        )
        .with_policy(policy);
        let store = InterceptedStore::new(Arc::new(records.clone()), interceptor);

        Self {
            records,
            queue,
            index,
            store,
        }
    }
}

/// Intercepted store whose queue rejects every call
pub fn store_with_broken_queue(
    policy: PropagationPolicy,
) -> (InMemoryRecordStore, InMemorySearchIndex, InterceptedStore) {
    let records = InMemoryRecordStore::new();
    let index = InMemorySearchIndex::new();
    let interceptor = MutationInterceptor::new(
        Arc::new(BrokenQueueStore),
        Arc::new(index.clone()),
        Projector::default(),
    )
    .with_policy(policy);
    let store = InterceptedStore::new(Arc::new(records.clone()), interceptor);
    (records, index, store)
}

pub fn jane_doe() -> NewLegislator {
    NewLegislator {
        first_name: "Jane".into(),
        last_name: "Doe".into(),
        state: State::Tx,
        party: Party::Democrat,
        chamber: Chamber::House,
        district: 12,
        chamber_website_url: "https://house.texas.gov/members/doe".into(),
        capitol_website_url: "https://capitol.texas.gov/doe".into(),
    }
}

/// Queue store that is permanently unavailable
pub struct BrokenQueueStore;

fn unavailable() -> StorageError {
    StorageError::database("queue database is locked")
}

#[async_trait]
impl QueueStore for BrokenQueueStore {
    async fn enqueue(&self, _entry: NewQueueEntry) -> legisync_storage::Result<QueueEntry> {
        Err(unavailable())
    }

    async fn pending(&self) -> legisync_storage::Result<Vec<QueueEntry>> {
        Err(unavailable())
    }

    async fn all(&self) -> legisync_storage::Result<Vec<QueueEntry>> {
        Err(unavailable())
    }

    async fn mark_consumed(&self, _ids: &[i64]) -> legisync_storage::Result<usize> {
        Err(unavailable())
    }

    async fn delete(&self, _ids: &[i64]) -> legisync_storage::Result<usize> {
        Err(unavailable())
    }

    async fn count_pending(&self) -> legisync_storage::Result<usize> {
        Err(unavailable())
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Fake search service
// ═══════════════════════════════════════════════════════════════════════════

/// Typesense stand-in; tests mount the responses they need
pub struct FakeSearchServer {
    pub server: MockServer,
}

impl FakeSearchServer {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// Answer every `POST route` with `status` and a JSON body
    pub async fn on_post(&self, route: &str, status: u16, body: serde_json::Value) {
        Mock::given(method("POST"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(status).set_body_json(body))
            .mount(&self.server)
            .await;
    }

    /// Answer document upserts into `collection`
    pub async fn on_upsert(&self, collection: &str, status: u16, body: serde_json::Value) {
        Mock::given(method("POST"))
            .and(path(format!("/collections/{}/documents", collection)))
            .and(query_param("action", "upsert"))
            .respond_with(ResponseTemplate::new(status).set_body_json(body))
            .mount(&self.server)
            .await;
    }

    pub fn config(&self) -> SearchConfig {
        let addr = self.server.address();
        SearchConfig {
            host: addr.ip().to_string(),
            port: addr.port(),
            api_key: "test-key".to_string(),
            ..SearchConfig::default()
        }
    }

    pub async fn requests(&self) -> Vec<Request> {
        self.server.received_requests().await.unwrap_or_default()
    }
}

/// Path plus query string, as the client sent it
pub fn target(request: &Request) -> String {
    match request.url.query() {
        Some(query) => format!("{}?{}", request.url.path(), query),
        None => request.url.path().to_string(),
    }
}

pub fn header<'a>(request: &'a Request, name: &str) -> Option<&'a str> {
    request.headers.get(name).and_then(|v| v.to_str().ok())
}

/// An address nobody listens on
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}
