use std::env;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::transcript::SessionLimits;

/// Longest accepted outbound timeout, in seconds.
pub const MAX_REQUEST_TIMEOUT_SECS: u64 = 600;

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Listen host address
    pub server_host: String,

    /// Listen port
    pub server_port: u16,

    /// Weather provider credential
    pub weather_api_key: Option<String>,

    /// Search provider credential
    pub search_api_key: Option<String>,

    /// LLM provider credential
    pub assistant_api_key: Option<String>,

    pub weather_base_url: String,
    pub search_base_url: String,
    pub assistant_base_url: String,

    /// Model name used in the generate-content path
    pub assistant_model: String,

    /// Language code passed to the weather provider
    pub weather_lang: String,

    /// Interface language passed to the search provider
    pub search_language: String,

    /// Country passed to the search provider
    pub search_country: String,

    /// Default number of links returned by a search
    pub search_max_results: usize,

    /// Characters of page text handed to the assistant when summarizing
    pub summary_char_budget: usize,

    /// Largest page body downloaded for a summary, in bytes
    pub page_max_bytes: usize,

    /// Timeout for every outbound request, in seconds
    pub request_timeout_secs: u64,

    /// Chat sessions kept in memory at once
    pub session_max_count: usize,

    /// Seconds of inactivity after which a chat session is forgotten
    pub session_idle_ttl_secs: u64,

    /// Turns of history replayed to the assistant per session
    pub session_max_turns: usize,

    pub log_level: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            server_host: "127.0.0.1".to_string(),
            server_port: 8190,
            weather_api_key: None,
            search_api_key: None,
            assistant_api_key: None,
            weather_base_url: "https://api.openweathermap.org".to_string(),
            search_base_url: "https://serpapi.com".to_string(),
            assistant_base_url: "https://generativelanguage.googleapis.com".to_string(),
            assistant_model: "gemini-1.5-flash".to_string(),
            weather_lang: "pt_br".to_string(),
            search_language: "pt-br".to_string(),
            search_country: "br".to_string(),
            search_max_results: 5,
            summary_char_budget: 4000,
            page_max_bytes: 2 * 1024 * 1024,
            request_timeout_secs: 30,
            session_max_count: 1_000,
            session_idle_ttl_secs: 3_600,
            session_max_turns: 20,
            log_level: "info".to_string(),
        }
    }
}

impl GatewayConfig {
    pub fn from_env() -> Result<Self> {
        let mut cfg = Self::default();

        if let Ok(host) = env::var("GATEWAY_HOST") {
            cfg.server_host = host;
        }
        if let Ok(port) = env::var("GATEWAY_PORT") {
            cfg.server_port = port.parse().context("GATEWAY_PORT must be a valid u16")?;
        }

        cfg.weather_api_key = non_empty_var("WEATHER_API_KEY");
        cfg.search_api_key = non_empty_var("SEARCH_API_KEY");
        cfg.assistant_api_key = non_empty_var("ASSISTANT_API_KEY");

        if let Ok(url) = env::var("WEATHER_BASE_URL") {
            cfg.weather_base_url = url;
        }
        if let Ok(url) = env::var("SEARCH_BASE_URL") {
            cfg.search_base_url = url;
        }
        if let Ok(url) = env::var("ASSISTANT_BASE_URL") {
            cfg.assistant_base_url = url;
        }
        if let Ok(model) = env::var("ASSISTANT_MODEL") {
            cfg.assistant_model = model;
        }
        if let Ok(lang) = env::var("WEATHER_LANG") {
            cfg.weather_lang = lang;
        }
        if let Ok(lang) = env::var("SEARCH_LANGUAGE") {
            cfg.search_language = lang;
        }
        if let Ok(country) = env::var("SEARCH_COUNTRY") {
            cfg.search_country = country;
        }
        if let Ok(max) = env::var("SEARCH_MAX_RESULTS") {
            cfg.search_max_results = max
                .parse()
                .context("SEARCH_MAX_RESULTS must be a positive integer")?;
        }
        if let Ok(budget) = env::var("SUMMARY_CHAR_BUDGET") {
            cfg.summary_char_budget = budget
                .parse()
                .context("SUMMARY_CHAR_BUDGET must be a positive integer")?;
        }
        if let Ok(timeout) = env::var("REQUEST_TIMEOUT_SECS") {
            cfg.request_timeout_secs = timeout
                .parse()
                .context("REQUEST_TIMEOUT_SECS must be a positive integer")?;
        }
        if let Ok(bytes) = env::var("PAGE_MAX_BYTES") {
            cfg.page_max_bytes = bytes
                .parse()
                .context("PAGE_MAX_BYTES must be a positive integer")?;
        }
        if let Ok(count) = env::var("SESSION_MAX_COUNT") {
            cfg.session_max_count = count
                .parse()
                .context("SESSION_MAX_COUNT must be a positive integer")?;
        }
        if let Ok(ttl) = env::var("SESSION_IDLE_TTL_SECS") {
            cfg.session_idle_ttl_secs = ttl
                .parse()
                .context("SESSION_IDLE_TTL_SECS must be a positive integer")?;
        }
        if let Ok(turns) = env::var("SESSION_MAX_TURNS") {
            cfg.session_max_turns = turns
                .parse()
                .context("SESSION_MAX_TURNS must be a positive integer")?;
        }
        if let Ok(level) = env::var("LOG_LEVEL") {
            cfg.log_level = level;
        }

        cfg.validate()?;
        Ok(cfg)
    }

    /// Credentials are not checked here: a missing key only disables the
    /// matching service and is reported per request.
    pub fn validate(&self) -> Result<()> {
        for (name, url) in [
            ("WEATHER_BASE_URL", &self.weather_base_url),
            ("SEARCH_BASE_URL", &self.search_base_url),
            ("ASSISTANT_BASE_URL", &self.assistant_base_url),
        ] {
            url::Url::parse(url).with_context(|| format!("{name} is not a valid URL: {url}"))?;
        }
        if self.assistant_model.trim().is_empty() {
            anyhow::bail!("ASSISTANT_MODEL cannot be empty");
        }
        if self.search_max_results == 0 {
            anyhow::bail!("SEARCH_MAX_RESULTS must be greater than zero");
        }
        if self.summary_char_budget == 0 {
            anyhow::bail!("SUMMARY_CHAR_BUDGET must be greater than zero");
        }
        if self.page_max_bytes == 0 {
            anyhow::bail!("PAGE_MAX_BYTES must be greater than zero");
        }
        if self.request_timeout_secs == 0 || self.request_timeout_secs > MAX_REQUEST_TIMEOUT_SECS {
            anyhow::bail!("REQUEST_TIMEOUT_SECS must be between 1 and {MAX_REQUEST_TIMEOUT_SECS}");
        }
        if self.session_max_count == 0 {
            anyhow::bail!("SESSION_MAX_COUNT must be greater than zero");
        }
        if self.session_idle_ttl_secs == 0 {
            anyhow::bail!("SESSION_IDLE_TTL_SECS must be greater than zero");
        }
        if self.session_max_turns < 2 {
            anyhow::bail!("SESSION_MAX_TURNS must keep at least one exchange (2 turns)");
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn session_limits(&self) -> SessionLimits {
        SessionLimits {
            max_sessions: self.session_max_count,
            idle_ttl: Duration::from_secs(self.session_idle_ttl_secs),
            max_turns: self.session_max_turns,
        }
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}
