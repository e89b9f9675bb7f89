/// Schema for the single relation backing the typed KV store, per spec §4.1.
pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS kv_records (
    type        TEXT NOT NULL,
    key         TEXT NOT NULL,
    value       BLOB NOT NULL,
    updated_at  REAL NOT NULL,
    PRIMARY KEY (type, key)
);
CREATE INDEX IF NOT EXISTS idx_kv_records_type ON kv_records(type);
";
