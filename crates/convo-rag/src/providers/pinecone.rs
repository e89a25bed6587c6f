//! Pinecone vector index provider
//!
//! The data-plane host is looked up once from the control plane by index name
//! and reused for the lifetime of the client.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::OnceCell;

use crate::config::VectorDbConfig;
use crate::error::{Error, Result};
use crate::providers::vector_store::{IndexMatch, VectorIndexProvider};

const API_VERSION: &str = "2024-07";

/// Pinecone index client
pub struct PineconeIndex {
    client: Client,
    api_key: String,
    control_plane_url: String,
    index_name: String,
    host: OnceCell<String>,
}

impl PineconeIndex {
    /// Create a new Pinecone index client
    pub fn new(config: &VectorDbConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| Error::config("Pinecone API key not found"))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        let host = match &config.index_host {
            Some(host) => OnceCell::new_with(Some(normalize_host(host))),
            None => OnceCell::new(),
        };

        Ok(Self {
            client,
            api_key,
            control_plane_url: config.control_plane_url.trim_end_matches('/').to_string(),
            index_name: config.index_name.clone(),
            host,
        })
    }

    /// Resolve (once) the data-plane host for the index
    async fn host(&self) -> Result<&str> {
        self.host
            .get_or_try_init(|| self.describe_index())
            .await
            .map(String::as_str)
    }

    async fn describe_index(&self) -> Result<String> {
        let url = format!("{}/indexes/{}", self.control_plane_url, self.index_name);

        let response = self
            .client
            .get(&url)
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", API_VERSION)
            .send()
            .await
            .map_err(|e| Error::vector_db(format!("Pinecone describe_index failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::vector_db(format!(
                "Pinecone index '{}' lookup failed ({}): {}",
                self.index_name, status, body
            )));
        }

        let description: IndexDescription = response
            .json()
            .await
            .map_err(|e| Error::vector_db(format!("Failed to parse index description: {}", e)))?;

        tracing::info!(
            "Resolved Pinecone index '{}' to {}",
            self.index_name,
            description.host
        );
        Ok(normalize_host(&description.host))
    }
}

fn normalize_host(host: &str) -> String {
    let host = host.trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    }
}

#[derive(Deserialize)]
struct IndexDescription {
    host: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    include_metadata: bool,
    include_values: bool,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<IndexMatch>,
}

#[async_trait]
impl VectorIndexProvider for PineconeIndex {
    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        include_metadata: bool,
    ) -> Result<Vec<IndexMatch>> {
        let host = self.host().await?;

        let request = QueryRequest {
            vector,
            top_k,
            include_metadata,
            include_values: false,
        };

        let response = self
            .client
            .post(format!("{}/query", host))
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", API_VERSION)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::vector_db(format!("Pinecone query failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::vector_db(format!(
                "Pinecone query failed ({}): {}",
                status, body
            )));
        }

        let query_response: QueryResponse = response
            .json()
            .await
            .map_err(|e| Error::vector_db(format!("Failed to parse Pinecone response: {}", e)))?;

        tracing::debug!(
            "Pinecone returned {} matches from '{}'",
            query_response.matches.len(),
            self.index_name
        );
        Ok(query_response.matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_host() {
        assert_eq!(
            normalize_host("pookie-abc123.svc.us-east1.pinecone.io"),
            "https://pookie-abc123.svc.us-east1.pinecone.io"
        );
        assert_eq!(normalize_host("http://localhost:5081/"), "http://localhost:5081");
    }

    #[test]
    fn test_query_request_shape() {
        let vector = [0.1f32, 0.2];
        let json = serde_json::to_value(QueryRequest {
            vector: &vector,
            top_k: 2,
            include_metadata: true,
            include_values: false,
        })
        .unwrap();

        assert_eq!(json["topK"], 2);
        assert_eq!(json["includeMetadata"], true);
        assert_eq!(json["vector"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_query_response_parses_matches() {
        let response: QueryResponse = serde_json::from_str(
            r#"{"matches":[{"id":"a","score":0.92,"metadata":{"text":"Refunds within 30 days."}},{"id":"b","score":0.5}],"namespace":""}"#,
        )
        .unwrap();

        assert_eq!(response.matches.len(), 2);
        assert_eq!(response.matches[0].text(), Some("Refunds within 30 days."));
        assert_eq!(response.matches[1].text(), None);
    }

    #[test]
    fn test_configured_host_skips_lookup() {
        let config = VectorDbConfig {
            api_key: Some("k".to_string()),
            index_host: Some("idx.pinecone.io".to_string()),
            ..VectorDbConfig::default()
        };
        let index = PineconeIndex::new(&config).unwrap();
        assert_eq!(
            index.host.get().map(String::as_str),
            Some("https://idx.pinecone.io")
        );
    }
}
