//! Durable homes for the [`UsageLedger`](crate::tracker::UsageLedger).
//!
//! A store only loads and saves whole ledgers. Serializing the
//! read-compare-increment sequence is the tracker's job.

pub mod database;
pub mod error;
pub mod file;
pub mod memory;
pub mod schema;

pub use database::SqliteLedgerStore;
pub use error::StorageError;
pub use file::JsonFileLedgerStore;
pub use memory::MemoryLedgerStore;

use crate::tracker::UsageLedger;

pub const LEDGER_DB_FILENAME: &str = "usage.db";
pub const LEDGER_JSON_FILENAME: &str = "usage.json";

pub trait LedgerStore: Send + Sync {
    /// Returns `None` when nothing has been persisted yet.
    fn load(&self) -> Result<Option<UsageLedger>, StorageError>;

    /// Replaces the stored ledger. Either the whole ledger lands or nothing does.
    fn save(&self, ledger: &UsageLedger) -> Result<(), StorageError>;
}
