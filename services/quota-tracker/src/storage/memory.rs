use std::sync::Mutex;

use crate::tracker::UsageLedger;

use super::error::StorageError;
use super::LedgerStore;

/// Keeps the ledger in process memory only. Usage is lost on restart.
#[derive(Default)]
pub struct MemoryLedgerStore {
    ledger: Mutex<Option<UsageLedger>>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ledger(ledger: UsageLedger) -> Self {
        Self {
            ledger: Mutex::new(Some(ledger)),
        }
    }
}

impl LedgerStore for MemoryLedgerStore {
    fn load(&self) -> Result<Option<UsageLedger>, StorageError> {
        let guard = self.ledger.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(guard.clone())
    }

    fn save(&self, ledger: &UsageLedger) -> Result<(), StorageError> {
        let mut guard = self.ledger.lock().map_err(|_| StorageError::Poisoned)?;
        *guard = Some(ledger.clone());
        Ok(())
    }
}
