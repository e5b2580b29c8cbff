use std::sync::Arc;

use anyhow::Context;
use reqwest::Client;
use tracing::{info, warn};

use omnia_quota_tracker::{QuotaTracker, ASSISTANT_SERVICE, SEARCH_SERVICE, WEATHER_SERVICE};

use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::providers::{AssistantClient, PageFetcher, SearchClient, WeatherClient, WeatherReport};
use crate::transcript::ConversationTranscript;

const SUMMARY_INSTRUCTION: &str =
    "Summarize the following web page content in a few short paragraphs:";

/// Front door to the external services. Each operation spends one unit of its
/// service's daily quota before any network traffic; the charge stands even
/// if the provider then fails.
pub struct ServiceGateway {
    tracker: Arc<QuotaTracker>,
    weather: WeatherClient,
    search: SearchClient,
    assistant: AssistantClient,
    pages: PageFetcher,
    weather_api_key: Option<String>,
    search_api_key: Option<String>,
    assistant_api_key: Option<String>,
    search_max_results: usize,
    summary_char_budget: usize,
}

impl ServiceGateway {
    pub fn new(config: &GatewayConfig, tracker: Arc<QuotaTracker>) -> anyhow::Result<Self> {
        let http_client = Client::builder()
            .timeout(config.request_timeout())
            .pool_max_idle_per_host(10)
            .build()
            .context("Failed to build provider HTTP client")?;

        Ok(Self {
            tracker,
            weather: WeatherClient::new(
                http_client.clone(),
                &config.weather_base_url,
                &config.weather_lang,
            ),
            search: SearchClient::new(
                http_client.clone(),
                &config.search_base_url,
                &config.search_language,
                &config.search_country,
            ),
            assistant: AssistantClient::new(
                http_client.clone(),
                &config.assistant_base_url,
                &config.assistant_model,
            ),
            pages: PageFetcher::new(http_client, config.page_max_bytes),
            weather_api_key: config.weather_api_key.clone(),
            search_api_key: config.search_api_key.clone(),
            assistant_api_key: config.assistant_api_key.clone(),
            search_max_results: config.search_max_results,
            summary_char_budget: config.summary_char_budget,
        })
    }

    pub fn tracker(&self) -> &Arc<QuotaTracker> {
        &self.tracker
    }

    pub async fn fetch_weather(&self, city: &str) -> Result<WeatherReport, GatewayError> {
        let city = require_text(city, "city")?;
        let key = credential(&self.weather_api_key, "WEATHER_API_KEY")?;
        self.consume(WEATHER_SERVICE)?;

        let report = self
            .weather
            .current(city, key)
            .await
            .inspect_err(|err| {
                warn!(service = WEATHER_SERVICE, error = %err, "provider call failed")
            })?;

        info!(city, "weather lookup completed");
        Ok(report)
    }

    /// Links for `query`; an empty list means the provider found nothing.
    pub async fn search_web(
        &self,
        query: &str,
        max_results: Option<usize>,
    ) -> Result<Vec<String>, GatewayError> {
        let query = require_text(query, "query")?;
        let max_results = match max_results {
            Some(0) => {
                return Err(GatewayError::InvalidInput(
                    "max_results must be greater than zero".into(),
                ))
            }
            Some(n) => n,
            None => self.search_max_results,
        };
        let key = credential(&self.search_api_key, "SEARCH_API_KEY")?;
        self.consume(SEARCH_SERVICE)?;

        let links = self
            .search
            .search(query, max_results, key)
            .await
            .inspect_err(|err| {
                warn!(service = SEARCH_SERVICE, error = %err, "provider call failed")
            })?;

        info!(results = links.len(), "web search completed");
        Ok(links)
    }

    pub async fn ask_assistant(
        &self,
        transcript: &ConversationTranscript,
        message: &str,
    ) -> Result<String, GatewayError> {
        let message = require_text(message, "message")?;
        let key = credential(&self.assistant_api_key, "ASSISTANT_API_KEY")?;
        self.consume(ASSISTANT_SERVICE)?;

        let reply = self
            .assistant
            .generate(transcript, message, key)
            .await
            .inspect_err(|err| {
                warn!(service = ASSISTANT_SERVICE, error = %err, "provider call failed")
            })?;

        info!(turns = transcript.len(), "assistant replied");
        Ok(reply)
    }

    /// Fetches `url`, keeps its readable text up to the configured budget and
    /// asks the assistant for a summary.
    pub async fn summarize_page(&self, url: &str) -> Result<String, GatewayError> {
        let url = require_text(url, "url")?;
        credential(&self.assistant_api_key, "ASSISTANT_API_KEY")?;

        // No point downloading a page the assistant can't be asked about.
        if self.tracker.remaining(ASSISTANT_SERVICE)? == 0 {
            return Err(GatewayError::QuotaExceeded {
                service: ASSISTANT_SERVICE.to_string(),
            });
        }

        let text = self.pages.fetch_text(url, self.summary_char_budget).await?;
        let prompt = format!("{SUMMARY_INSTRUCTION}\n\n{text}");

        self.ask_assistant(&ConversationTranscript::new(), &prompt).await
    }

    fn consume(&self, service: &str) -> Result<(), GatewayError> {
        if self.tracker.try_consume(service)? {
            Ok(())
        } else {
            info!(service, "daily quota exhausted, call skipped");
            Err(GatewayError::QuotaExceeded {
                service: service.to_string(),
            })
        }
    }
}

fn credential<'a>(key: &'a Option<String>, variable: &str) -> Result<&'a str, GatewayError> {
    key.as_deref()
        .ok_or_else(|| GatewayError::missing_credential(variable))
}

fn require_text<'a>(value: &'a str, field: &str) -> Result<&'a str, GatewayError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(GatewayError::InvalidInput(format!("{field} cannot be empty")));
    }
    Ok(trimmed)
}
