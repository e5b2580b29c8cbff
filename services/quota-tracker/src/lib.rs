//! Daily per-service call budgets backed by a durable usage ledger.

pub mod config;
pub mod storage;
pub mod tracker;

pub use config::{QuotaTrackerConfig, StoreKind};
pub use storage::{
    JsonFileLedgerStore, LedgerStore, MemoryLedgerStore, SqliteLedgerStore, StorageError,
};
pub use tracker::{
    Clock, ManualClock, QuotaError, QuotaTracker, ServiceLimits, ServiceUsage, SystemClock,
    UsageLedger, ASSISTANT_SERVICE, SEARCH_SERVICE, WEATHER_SERVICE,
};
