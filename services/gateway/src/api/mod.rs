use std::sync::Arc;

pub mod handlers;
pub mod router;
pub mod types;

pub use router::create_router;
pub use types::*;

use crate::gateway::ServiceGateway;
use crate::transcript::{SessionLimits, SessionStore};

pub struct ApiState {
    pub gateway: Arc<ServiceGateway>,
    pub sessions: SessionStore,
}

impl ApiState {
    pub fn new(gateway: Arc<ServiceGateway>, session_limits: SessionLimits) -> Self {
        Self {
            gateway,
            sessions: SessionStore::new(session_limits),
        }
    }
}
