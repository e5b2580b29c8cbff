use axum::http::StatusCode;
use omnia_quota_tracker::QuotaError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("daily limit reached for {service}; try again tomorrow")]
    QuotaExceeded { service: String },

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("{service} provider error: {message}")]
    Provider { service: String, message: String },

    #[error("could not read page: {0}")]
    Parse(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("usage ledger unavailable: {0}")]
    Ledger(String),
}

impl From<QuotaError> for GatewayError {
    fn from(err: QuotaError) -> Self {
        match err {
            QuotaError::UnknownService(service) => GatewayError::Configuration(format!(
                "service {service:?} has no configured daily limit"
            )),
            QuotaError::Storage(err) => GatewayError::Ledger(err.to_string()),
        }
    }
}

impl GatewayError {
    pub fn provider(service: &str, message: impl Into<String>) -> Self {
        GatewayError::Provider {
            service: service.to_string(),
            message: message.into(),
        }
    }

    pub fn missing_credential(variable: &str) -> Self {
        GatewayError::Configuration(format!("{variable} is not set"))
    }

    pub fn code(&self) -> &'static str {
        match self {
            GatewayError::QuotaExceeded { .. } => "QUOTA_EXCEEDED",
            GatewayError::Configuration(_) => "CONFIGURATION_ERROR",
            GatewayError::Provider { .. } => "PROVIDER_ERROR",
            GatewayError::Parse(_) => "PARSE_ERROR",
            GatewayError::InvalidInput(_) => "INVALID_INPUT",
            GatewayError::Ledger(_) => "LEDGER_UNAVAILABLE",
        }
    }

    pub fn to_status_code(&self) -> StatusCode {
        match self {
            GatewayError::QuotaExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            GatewayError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            GatewayError::Parse(_) => StatusCode::UNPROCESSABLE_ENTITY,
            GatewayError::Provider { .. } => StatusCode::BAD_GATEWAY,
            GatewayError::Configuration(_) | GatewayError::Ledger(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use omnia_quota_tracker::StorageError;

    #[test]
    fn unknown_service_becomes_a_configuration_error() {
        let err: GatewayError = QuotaError::UnknownService("tarot".into()).into();
        assert!(matches!(err, GatewayError::Configuration(ref msg) if msg.contains("tarot")));
        assert_eq!(err.to_status_code(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn storage_failure_is_reported_as_ledger_unavailable() {
        let err: GatewayError = QuotaError::Storage(StorageError::Poisoned).into();
        assert_eq!(err.code(), "LEDGER_UNAVAILABLE");
    }

    #[test]
    fn quota_message_tells_the_user_to_come_back_tomorrow() {
        let err = GatewayError::QuotaExceeded {
            service: "weather".into(),
        };
        assert_eq!(
            err.to_string(),
            "daily limit reached for weather; try again tomorrow"
        );
        assert_eq!(err.to_status_code(), StatusCode::TOO_MANY_REQUESTS);
    }
}
