use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use omnia_quota_tracker::ASSISTANT_SERVICE;

use crate::error::GatewayError;
use crate::transcript::{ConversationTranscript, Role};

use super::error_message;

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: [Part<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default, rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

pub struct AssistantClient {
    http_client: Client,
    base_url: String,
    model: String,
}

impl AssistantClient {
    pub fn new(http_client: Client, base_url: &str, model: &str) -> Self {
        Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        }
    }

    /// Sends the whole transcript followed by `message` and returns the
    /// model's reply text.
    #[instrument(skip_all, fields(model = %self.model, turns = transcript.len()))]
    pub async fn generate(
        &self,
        transcript: &ConversationTranscript,
        message: &str,
        api_key: &str,
    ) -> Result<String, GatewayError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );
        let request = build_request(transcript, message);

        let response = self
            .http_client
            .post(&url)
            .query(&[("key", api_key)])
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                GatewayError::provider(ASSISTANT_SERVICE, format!("request failed: {e}"))
            })?;

        if !response.status().is_success() {
            return Err(GatewayError::provider(
                ASSISTANT_SERVICE,
                error_message(response).await,
            ));
        }

        let body: GenerateResponse = response.json().await.map_err(|e| {
            GatewayError::provider(ASSISTANT_SERVICE, format!("malformed response: {e}"))
        })?;

        let candidate = body.candidates.into_iter().next().ok_or_else(|| {
            GatewayError::provider(ASSISTANT_SERVICE, "response contained no candidates")
        })?;

        let text: String = candidate
            .content
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect()
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            let reason = candidate.finish_reason.as_deref().unwrap_or("unknown");
            return Err(GatewayError::provider(
                ASSISTANT_SERVICE,
                format!("empty reply (finish reason: {reason})"),
            ));
        }

        debug!(chars = text.chars().count(), "assistant reply received");
        Ok(text)
    }
}

fn build_request<'a>(
    transcript: &'a ConversationTranscript,
    message: &'a str,
) -> GenerateRequest<'a> {
    let mut contents: Vec<Content<'a>> = transcript
        .turns()
        .iter()
        .map(|turn| Content {
            role: provider_role(turn.role),
            parts: [Part {
                text: &turn.content,
            }],
        })
        .collect();
    contents.push(Content {
        role: provider_role(Role::User),
        parts: [Part { text: message }],
    });
    GenerateRequest { contents }
}

fn provider_role(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Assistant => "model",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_replays_the_transcript_before_the_new_message() {
        let mut transcript = ConversationTranscript::new();
        transcript.push_user("Who wrote Dom Casmurro?");
        transcript.push_assistant("Machado de Assis.");

        let request = build_request(&transcript, "When?");
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "contents": [
                    { "role": "user", "parts": [{ "text": "Who wrote Dom Casmurro?" }] },
                    { "role": "model", "parts": [{ "text": "Machado de Assis." }] },
                    { "role": "user", "parts": [{ "text": "When?" }] }
                ]
            })
        );
    }
}
