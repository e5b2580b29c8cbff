use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument};

use omnia_quota_tracker::SEARCH_SERVICE;

use crate::error::GatewayError;

use super::error_message;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    organic_results: Vec<OrganicResult>,
}

#[derive(Debug, Deserialize)]
struct OrganicResult {
    #[serde(default)]
    link: Option<String>,
}

pub struct SearchClient {
    http_client: Client,
    base_url: String,
    language: String,
    country: String,
}

impl SearchClient {
    pub fn new(http_client: Client, base_url: &str, language: &str, country: &str) -> Self {
        Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            language: language.to_string(),
            country: country.to_string(),
        }
    }

    /// Result links in provider order, at most `max_results` of them.
    #[instrument(skip(self, api_key))]
    pub async fn search(
        &self,
        query: &str,
        max_results: usize,
        api_key: &str,
    ) -> Result<Vec<String>, GatewayError> {
        let url = format!("{}/search.json", self.base_url);
        let num = max_results.to_string();

        let response = self
            .http_client
            .get(&url)
            .query(&[
                ("q", query),
                ("api_key", api_key),
                ("hl", self.language.as_str()),
                ("gl", self.country.as_str()),
                ("num", num.as_str()),
            ])
            .send()
            .await
            .map_err(|e| GatewayError::provider(SEARCH_SERVICE, format!("request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(GatewayError::provider(
                SEARCH_SERVICE,
                error_message(response).await,
            ));
        }

        let body: SearchResponse = response.json().await.map_err(|e| {
            GatewayError::provider(SEARCH_SERVICE, format!("malformed search response: {e}"))
        })?;

        // The provider reports some failures with a 200 and an `error` field.
        if let Some(error) = body.error {
            return Err(GatewayError::provider(SEARCH_SERVICE, error));
        }

        let links: Vec<String> = body
            .organic_results
            .into_iter()
            .filter_map(|result| result.link)
            .filter(|link| !link.is_empty())
            .take(max_results)
            .collect();

        debug!(results = links.len(), "search response received");
        Ok(links)
    }
}
