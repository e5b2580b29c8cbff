pub mod clock;
pub mod error;
pub mod ledger;
pub mod manager;
pub mod metrics;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::QuotaError;
pub use ledger::{ServiceLimits, UsageLedger};
pub use manager::QuotaTracker;
pub use metrics::ServiceUsage;

pub const ASSISTANT_SERVICE: &str = "assistant";
pub const WEATHER_SERVICE: &str = "weather";
pub const SEARCH_SERVICE: &str = "search";
