//! Thin clients for the external collaborators. One request per call, no
//! retries; every failure comes back as a [`GatewayError`](crate::GatewayError).

pub mod assistant;
pub mod page;
pub mod search;
pub mod weather;

pub use assistant::AssistantClient;
pub use page::PageFetcher;
pub use search::SearchClient;
pub use weather::{WeatherClient, WeatherReport};

use reqwest::Response;

/// Pulls a human-readable message out of a failed provider response.
/// Providers nest it differently, so a few common shapes are tried.
pub(crate) async fn error_message(response: Response) -> String {
    let status = response.status();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "unable to read error body".to_string());

    let message = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|value| {
            value
                .pointer("/error/message")
                .or_else(|| value.get("message"))
                .or_else(|| value.get("error"))
                .and_then(|m| m.as_str())
                .map(str::to_string)
        });

    match message {
        Some(message) => format!("{message} (status {status})"),
        None if body.trim().is_empty() => format!("provider responded with {status}"),
        None => format!("provider responded with {status}: {}", body.trim()),
    }
}
