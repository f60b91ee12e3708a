//! Typesense HTTP adapter

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::{debug, info};

use super::{require_document_id, CollectionSchema, SearchIndex, UpsertResult};
use crate::config::SearchConfig;
use crate::error::IndexError;

const API_KEY_HEADER: &str = "X-TYPESENSE-API-KEY";

/// Client for `{protocol}://{host}:{port}` built once at startup
#[derive(Clone)]
pub struct TypesenseClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl TypesenseClient {
    pub fn new(config: &SearchConfig) -> Result<Self, IndexError> {
        let timeout = config.connection_timeout();
        let http = reqwest::Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()
            .map_err(|e| IndexError::Transport(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.base_url(),
            api_key: config.api_key.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn documents_url(&self, collection: &str) -> String {
        format!(
            "{}/collections/{}/documents?action=upsert",
            self.base_url, collection
        )
    }

    fn collections_url(&self) -> String {
        format!("{}/collections", self.base_url)
    }
}

/// Pass successful responses through; turn the rest into `IndexError`
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, IndexError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(IndexError::from_status(status.as_u16(), error_message(&body)))
}

/// Typesense error bodies look like `{"message": "..."}`
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}

#[async_trait]
impl SearchIndex for TypesenseClient {
    async fn upsert(
        &self,
        collection: &str,
        document: &serde_json::Value,
    ) -> Result<UpsertResult, IndexError> {
        let id = require_document_id(collection, document)?;

        let response = self
            .http
            .post(self.documents_url(collection))
            .header(API_KEY_HEADER, &self.api_key)
            .json(document)
            .send()
            .await?;
        let stored: serde_json::Value = check_status(response).await?.json().await?;

        debug!("Upserted {}/{}", collection, id);
        Ok(UpsertResult {
            collection: collection.to_string(),
            id,
            document: stored,
        })
    }

    async fn ensure_collection(&self, schema: &CollectionSchema) -> Result<(), IndexError> {
        let response = self
            .http
            .post(self.collections_url())
            .header(API_KEY_HEADER, &self.api_key)
            .json(schema)
            .send()
            .await?;

        if response.status() == StatusCode::CONFLICT {
            debug!("Collection {} already exists", schema.name);
            return Ok(());
        }

        check_status(response).await?;
        info!("Created collection {}", schema.name);
        Ok(())
    }
}
