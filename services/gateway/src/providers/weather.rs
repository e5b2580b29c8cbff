use std::fmt;

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use omnia_quota_tracker::WEATHER_SERVICE;

use crate::error::GatewayError;

use super::error_message;

/// Current conditions for a city, in metric units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReport {
    pub city: String,
    pub description: String,
    pub temperature: f64,
    pub feels_like: f64,
    pub humidity: u8,
    pub wind_speed: f64,
}

impl fmt::Display for WeatherReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {:.1}°C (feels like {:.1}°C), {}, humidity {}%, wind {:.1} m/s",
            self.city,
            self.temperature,
            self.feels_like,
            self.description,
            self.humidity,
            self.wind_speed
        )
    }
}

#[derive(Debug, Deserialize)]
struct CurrentWeather {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    weather: Vec<Condition>,
    main: MainReadings,
    #[serde(default)]
    wind: Option<Wind>,
}

#[derive(Debug, Deserialize)]
struct Condition {
    description: String,
}

#[derive(Debug, Deserialize)]
struct MainReadings {
    temp: f64,
    feels_like: f64,
    humidity: u8,
}

#[derive(Debug, Deserialize)]
struct Wind {
    speed: f64,
}

pub struct WeatherClient {
    http_client: Client,
    base_url: String,
    lang: String,
}

impl WeatherClient {
    pub fn new(http_client: Client, base_url: &str, lang: &str) -> Self {
        Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            lang: lang.to_string(),
        }
    }

    #[instrument(skip(self, api_key))]
    pub async fn current(&self, city: &str, api_key: &str) -> Result<WeatherReport, GatewayError> {
        let url = format!("{}/data/2.5/weather", self.base_url);

        let response = self
            .http_client
            .get(&url)
            .query(&[
                ("q", city),
                ("appid", api_key),
                ("lang", self.lang.as_str()),
                ("units", "metric"),
            ])
            .send()
            .await
            .map_err(|e| GatewayError::provider(WEATHER_SERVICE, format!("request failed: {e}")))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(GatewayError::provider(
                WEATHER_SERVICE,
                "invalid API key for the weather provider",
            ));
        }
        if !status.is_success() {
            return Err(GatewayError::provider(
                WEATHER_SERVICE,
                error_message(response).await,
            ));
        }

        let body: CurrentWeather = response.json().await.map_err(|e| {
            GatewayError::provider(WEATHER_SERVICE, format!("malformed weather response: {e}"))
        })?;

        debug!(status = status.as_u16(), "weather response received");

        let description = body
            .weather
            .first()
            .map(|condition| capitalize(&condition.description))
            .unwrap_or_default();

        Ok(WeatherReport {
            city: body.name.filter(|n| !n.is_empty()).unwrap_or_else(|| city.to_string()),
            description,
            temperature: body.main.temp,
            feels_like: body.main.feels_like,
            humidity: body.main.humidity,
            wind_speed: body.wind.map(|w| w.speed).unwrap_or_default(),
        })
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capitalize_handles_multibyte_first_letters() {
        assert_eq!(capitalize("céu limpo"), "Céu limpo");
        assert_eq!(capitalize("ébano"), "Ébano");
        assert_eq!(capitalize(""), "");
    }

    #[test]
    fn report_renders_a_one_line_summary() {
        let report = WeatherReport {
            city: "Recife".into(),
            description: "Nublado".into(),
            temperature: 27.04,
            feels_like: 29.96,
            humidity: 78,
            wind_speed: 4.12,
        };
        assert_eq!(
            report.to_string(),
            "Recife: 27.0°C (feels like 30.0°C), Nublado, humidity 78%, wind 4.1 m/s"
        );
    }
}
