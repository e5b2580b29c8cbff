use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::{error, info};
use uuid::Uuid;

use crate::error::GatewayError;

use super::types::{
    AssistantRequest, AssistantResponse, ErrorResponse, SearchRequest, SearchResponse,
    SummarizeRequest, SummarizeResponse, UsageResponse, WeatherRequest, WeatherResponse,
    NO_RESULTS_MESSAGE,
};
use super::ApiState;

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ErrorResponse>)>;

pub async fn fetch_weather(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<WeatherRequest>,
) -> ApiResult<WeatherResponse> {
    let report = state
        .gateway
        .fetch_weather(&request.city)
        .await
        .map_err(gateway_error)?;

    Ok(Json(WeatherResponse {
        summary: report.to_string(),
        report,
    }))
}

pub async fn search_web(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<SearchRequest>,
) -> ApiResult<SearchResponse> {
    let links = state
        .gateway
        .search_web(&request.query, request.max_results)
        .await
        .map_err(gateway_error)?;

    let message = links.is_empty().then(|| NO_RESULTS_MESSAGE.to_string());
    Ok(Json(SearchResponse {
        query: request.query,
        links,
        message,
    }))
}

pub async fn ask_assistant(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<AssistantRequest>,
) -> ApiResult<AssistantResponse> {
    let session_id = request.session_id.unwrap_or_else(Uuid::new_v4);
    let transcript = state.sessions.transcript(session_id);

    let reply = state
        .gateway
        .ask_assistant(&transcript, &request.message)
        .await
        .map_err(gateway_error)?;

    state
        .sessions
        .record_exchange(session_id, request.message.trim(), &reply);
    info!(%session_id, turns = transcript.len() + 2, "conversation updated");

    Ok(Json(AssistantResponse { session_id, reply }))
}

pub async fn summarize_page(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<SummarizeRequest>,
) -> ApiResult<SummarizeResponse> {
    let summary = state
        .gateway
        .summarize_page(&request.url)
        .await
        .map_err(gateway_error)?;

    Ok(Json(SummarizeResponse {
        url: request.url,
        summary,
    }))
}

pub async fn list_usage(State(state): State<Arc<ApiState>>) -> ApiResult<UsageResponse> {
    let services = state
        .gateway
        .tracker()
        .snapshot()
        .map_err(|err| gateway_error(err.into()))?;

    Ok(Json(UsageResponse { services }))
}

pub async fn get_usage(
    State(state): State<Arc<ApiState>>,
    Path(service_id): Path<String>,
) -> ApiResult<omnia_quota_tracker::ServiceUsage> {
    match state.gateway.tracker().usage(&service_id) {
        Ok(usage) => Ok(Json(usage)),
        Err(omnia_quota_tracker::QuotaError::UnknownService(_)) => Err(not_found(
            "UNKNOWN_SERVICE",
            &format!("service {service_id:?} is not tracked"),
        )),
        Err(err) => Err(gateway_error(err.into())),
    }
}

pub async fn health_check() -> ApiResult<serde_json::Value> {
    Ok(Json(serde_json::json!({
        "status": "healthy",
        "service": "omnia-gateway"
    })))
}

fn gateway_error(err: GatewayError) -> (StatusCode, Json<ErrorResponse>) {
    let status = err.to_status_code();
    if status.is_server_error() {
        error!(error = %err, code = err.code(), "gateway request failed");
    } else {
        info!(error = %err, code = err.code(), "gateway request rejected");
    }

    let details = match &err {
        GatewayError::QuotaExceeded { service } | GatewayError::Provider { service, .. } => {
            Some(serde_json::json!({ "service": service }))
        }
        _ => None,
    };

    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
            code: err.code().to_string(),
            details,
        }),
    )
}

fn not_found(code: &str, message: &str) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: message.to_string(),
            code: code.to_string(),
            details: None,
        }),
    )
}
