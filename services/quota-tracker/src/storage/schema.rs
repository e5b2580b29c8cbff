use rusqlite::Connection;

use super::StorageError;

pub const USAGE_COUNTERS_TABLE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS usage_counters (
    day TEXT NOT NULL,
    service_id TEXT NOT NULL,
    used INTEGER NOT NULL,
    last_updated TEXT NOT NULL,
    PRIMARY KEY(day, service_id)
);
"#;

pub const USAGE_COUNTERS_INDEXES: &str = r#"
CREATE INDEX IF NOT EXISTS idx_usage_counters_day ON usage_counters(day);
"#;

pub fn init_database(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch(USAGE_COUNTERS_TABLE_SCHEMA)?;
    conn.execute_batch(USAGE_COUNTERS_INDEXES)?;
    Ok(())
}
