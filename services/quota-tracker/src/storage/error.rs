use std::io;

use rusqlite;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("corrupt ledger: {0}")]
    Corrupt(String),
    #[error("ledger store lock poisoned")]
    Poisoned,
}
