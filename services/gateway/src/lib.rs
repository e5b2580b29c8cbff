//! Quota-gated gateway to the weather, web-search and assistant providers.

pub mod api;
pub mod config;
pub mod error;
pub mod gateway;
pub mod providers;
pub mod transcript;

pub use config::GatewayConfig;
pub use error::GatewayError;
pub use gateway::ServiceGateway;
pub use transcript::{ConversationTranscript, Role, SessionLimits, SessionStore, Turn};
