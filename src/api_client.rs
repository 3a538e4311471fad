use crate::options::{AttributeDescriptor, DataSource};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

const ATTRIBUTE_KEYS_PATH: &str = "/api/v3/autocomplete/attribute_keys";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeKeysRequest {
    pub data_source: DataSource,
    pub aggregate_operator: String,
    pub search_text: String,
    pub aggregate_attribute: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag_type: Option<String>,
}

impl AttributeKeysRequest {
    pub fn new(data_source: DataSource, aggregate_operator: &str, search_text: &str) -> Self {
        Self {
            data_source,
            aggregate_operator: aggregate_operator.to_string(),
            search_text: search_text.to_string(),
            aggregate_attribute: String::new(),
            tag_type: None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AttributeKeysResponse {
    pub status: String,
    #[serde(default)]
    pub data: Option<AttributeKeysPayload>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeKeysPayload {
    #[serde(default)]
    pub attribute_keys: Option<Vec<AttributeDescriptor>>,
}

impl AttributeKeysResponse {
    pub fn into_attribute_keys(self) -> Result<Vec<AttributeDescriptor>> {
        if self.status != "success" {
            return Err(anyhow!(
                "Attribute search failed: {}",
                self.error.unwrap_or(self.status)
            ));
        }
        Ok(self
            .data
            .and_then(|payload| payload.attribute_keys)
            .unwrap_or_default())
    }
}

/// Looks up attribute keys matching a search text
#[async_trait]
pub trait AttributeSearchClient: Send + Sync {
    async fn attribute_keys(
        &self,
        request: &AttributeKeysRequest,
    ) -> Result<Vec<AttributeDescriptor>>;
}

/// Client for the query service's autocomplete endpoint
#[derive(Clone)]
pub struct HttpAttributeClient {
    base_url: String,
    client: reqwest::Client,
}

impl HttpAttributeClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn endpoint(&self) -> String {
        format!("{}{}", self.base_url, ATTRIBUTE_KEYS_PATH)
    }
}

#[async_trait]
impl AttributeSearchClient for HttpAttributeClient {
    async fn attribute_keys(
        &self,
        request: &AttributeKeysRequest,
    ) -> Result<Vec<AttributeDescriptor>> {
        debug!(target: "api", "GET {} searchText={:?}", self.endpoint(), request.search_text);

        let response = self
            .client
            .get(self.endpoint())
            .query(request)
            .send()
            .await
            .context("Attribute search request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(anyhow!("API Error ({}): {}", status, error_text));
        }

        let body: AttributeKeysResponse = response
            .json()
            .await
            .context("Malformed attribute search response")?;
        body.into_attribute_keys()
    }
}

/// Serves attribute keys from a fixed catalog, fuzzy matched against the
/// search text. Used for offline sessions.
pub struct CatalogAttributeClient {
    attributes: Vec<AttributeDescriptor>,
    matcher: SkimMatcherV2,
}

impl CatalogAttributeClient {
    pub fn new(attributes: Vec<AttributeDescriptor>) -> Self {
        Self {
            attributes,
            matcher: SkimMatcherV2::default(),
        }
    }

    /// Load a JSON array of attribute descriptors
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read catalog {}", path.display()))?;
        let attributes: Vec<AttributeDescriptor> = serde_json::from_str(&content)
            .with_context(|| format!("Catalog {} is not a list of attributes", path.display()))?;
        if attributes.is_empty() {
            warn!(target: "api", "Catalog {} is empty", path.display());
        }
        Ok(Self::new(attributes))
    }

    pub fn search(&self, text: &str) -> Vec<AttributeDescriptor> {
        if text.is_empty() {
            return self.attributes.clone();
        }

        let mut scored: Vec<(i64, &AttributeDescriptor)> = self
            .attributes
            .iter()
            .filter_map(|attr| {
                self.matcher
                    .fuzzy_match(&attr.key, text)
                    .map(|score| (score, attr))
            })
            .collect();

        // Exact key match first, then by score; sort is stable so catalog
        // order breaks ties
        scored.sort_by(|(sa, a), (sb, b)| {
            (b.key == text)
                .cmp(&(a.key == text))
                .then_with(|| sb.cmp(sa))
        });
        scored.into_iter().map(|(_, attr)| attr.clone()).collect()
    }
}

#[async_trait]
impl AttributeSearchClient for CatalogAttributeClient {
    async fn attribute_keys(
        &self,
        request: &AttributeKeysRequest,
    ) -> Result<Vec<AttributeDescriptor>> {
        Ok(self.search(&request.search_text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> CatalogAttributeClient {
        CatalogAttributeClient::new(vec![
            AttributeDescriptor::new("body", "string", ""),
            AttributeDescriptor::new("service.name", "string", "resource"),
            AttributeDescriptor::new("duration", "float64", "tag"),
            AttributeDescriptor::new("service.namespace", "string", "resource"),
        ])
    }

    #[test]
    fn request_serializes_with_camel_case_names() {
        let request = AttributeKeysRequest::new(DataSource::Logs, "noop", "serv");
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["dataSource"], "logs");
        assert_eq!(json["aggregateOperator"], "noop");
        assert_eq!(json["searchText"], "serv");
        assert_eq!(json["aggregateAttribute"], "");
        assert!(json.get("tagType").is_none());
    }

    #[test]
    fn success_response_yields_keys() {
        let body = r#"{"status":"success","data":{"attributeKeys":[
            {"key":"service.name","dataType":"string","type":"resource","isColumn":true,"isJSON":false}
        ]}}"#;
        let response: AttributeKeysResponse = serde_json::from_str(body).unwrap();
        let keys = response.into_attribute_keys().unwrap();

        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].key, "service.name");
        assert!(keys[0].is_column);
    }

    #[test]
    fn null_keys_are_empty() {
        let body = r#"{"status":"success","data":{"attributeKeys":null}}"#;
        let response: AttributeKeysResponse = serde_json::from_str(body).unwrap();
        assert!(response.into_attribute_keys().unwrap().is_empty());
    }

    #[test]
    fn error_status_is_an_error() {
        let body = r#"{"status":"error","error":"bad data source"}"#;
        let response: AttributeKeysResponse = serde_json::from_str(body).unwrap();
        let err = response.into_attribute_keys().unwrap_err();
        assert!(err.to_string().contains("bad data source"));
    }

    #[test]
    fn catalog_search_puts_exact_match_first() {
        let results = catalog().search("service.name");
        assert_eq!(results[0].key, "service.name");
        assert!(results.iter().all(|a| a.key != "duration"));
    }

    #[test]
    fn catalog_search_with_empty_text_lists_everything() {
        assert_eq!(catalog().search("").len(), 4);
    }

    #[tokio::test]
    async fn catalog_implements_search_client() {
        let client = catalog();
        let request = AttributeKeysRequest::new(DataSource::Logs, "noop", "dur");
        let keys = client.attribute_keys(&request).await.unwrap();
        assert_eq!(keys[0].key, "duration");
    }

    #[test]
    fn http_endpoint_joins_base_url() {
        let client =
            HttpAttributeClient::new("http://localhost:3301/", Duration::from_secs(1)).unwrap();
        assert_eq!(
            client.endpoint(),
            "http://localhost:3301/api/v3/autocomplete/attribute_keys"
        );
    }
}
