use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Mutex;

use chrono::{NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use crate::tracker::UsageLedger;

use super::error::StorageError;
use super::schema::init_database;
use super::{LedgerStore, LEDGER_DB_FILENAME};

/// SQLite-backed ledger. One row per `(day, service_id)`; only the current
/// day's rows are kept.
pub struct SqliteLedgerStore {
    conn: Mutex<Connection>,
}

impl SqliteLedgerStore {
    pub fn new(data_dir: &Path) -> Result<Self, StorageError> {
        std::fs::create_dir_all(data_dir)?;
        let db_path = data_dir.join(LEDGER_DB_FILENAME);
        let conn = Connection::open(&db_path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        init_database(&conn)?;

        debug!(path = %db_path.display(), "opened sqlite usage ledger");

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        init_database(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl LedgerStore for SqliteLedgerStore {
    fn load(&self) -> Result<Option<UsageLedger>, StorageError> {
        let conn = self.conn.lock().map_err(|_| StorageError::Poisoned)?;

        let day: Option<String> = conn
            .query_row("SELECT MAX(day) FROM usage_counters", [], |row| row.get(0))
            .optional()?
            .flatten();

        let Some(day) = day else {
            return Ok(None);
        };
        let parsed = NaiveDate::parse_from_str(&day, "%Y-%m-%d")
            .map_err(|err| StorageError::Corrupt(format!("invalid day {day:?}: {err}")))?;

        let mut stmt = conn.prepare(
            r#"
            SELECT service_id, used
            FROM usage_counters
            WHERE day = ?1
            "#,
        )?;

        let rows = stmt.query_map(params![day], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;

        let mut counters = BTreeMap::new();
        for row in rows {
            let (service_id, used) = row?;
            if used < 0 {
                return Err(StorageError::Corrupt(format!(
                    "negative counter {used} for {service_id}"
                )));
            }
            counters.insert(service_id, used as u64);
        }

        Ok(Some(UsageLedger {
            day: parsed,
            counters,
        }))
    }

    fn save(&self, ledger: &UsageLedger) -> Result<(), StorageError> {
        let mut conn = self.conn.lock().map_err(|_| StorageError::Poisoned)?;
        let day = ledger.day.format("%Y-%m-%d").to_string();
        let now = Utc::now().to_rfc3339();

        let tx = conn.transaction()?;
        tx.execute("DELETE FROM usage_counters", [])?;
        for (service_id, used) in &ledger.counters {
            tx.execute(
                r#"
                INSERT INTO usage_counters (day, service_id, used, last_updated)
                VALUES (?1, ?2, ?3, ?4)
                "#,
                params![day, service_id, *used as i64, now],
            )?;
        }
        tx.commit()?;

        Ok(())
    }
}
