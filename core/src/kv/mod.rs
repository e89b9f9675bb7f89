//! The typed key-value store: `(type, key) -> value` persisted in a single
//! SQLite relation, with UPSERT semantics, point read/exists/delete, and
//! ordered prefix-limited listing, all serialized through one write lane
//! that also drives the transaction logger.

mod record;
mod schema;

pub use record::Record;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use rusqlite::{params, OptionalExtension};
use uuid::Uuid;

use crate::error::{CResult, Error};
use crate::txlog::{JsonLinesLogger, TxnLogger};

/// Smallest and largest `limit` values `KVStore::list` will honor; callers
/// outside this range are clamped, per spec §6.
pub const LIST_LIMIT_MIN: i64 = 0;
pub const LIST_LIMIT_MAX: i64 = 1000;

/// Coarse status for health/introspection endpoints. Not a spec-mandated
/// operation — a low-risk addition in the teacher lineage's `Status`-struct
/// idiom (see SPEC_FULL.md §11.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Status {
    pub keys: i64,
    pub active_log_bytes: Option<u64>,
}

/// The typed KV store. Cheap to clone: internally an `Arc`-shared SQLite
/// connection (serialized one call at a time by `tokio_rusqlite`, which is
/// exactly the "write lane" spec §5 asks for) plus a shared logger.
#[derive(Clone)]
pub struct KVStore {
    conn: Arc<tokio_rusqlite::Connection>,
    logger: Arc<dyn TxnLogger>,
}

impl KVStore {
    /// Opens (creating if absent) the database at `db_path` and derives its
    /// transaction log path as `<db-path-without-extension>.txn.log`, per
    /// spec §6's on-disk layout.
    pub async fn open(db_path: impl AsRef<Path>) -> CResult<Self> {
        let logger = Arc::new(JsonLinesLogger::open(derive_txn_log_path(db_path.as_ref()))?);
        Self::open_with_logger(db_path, logger).await
    }

    /// Opens the database with a caller-supplied logger — used by tests to
    /// inject a `SpyLogger`, and by any host that wants a non-default log
    /// path.
    pub async fn open_with_logger(
        db_path: impl AsRef<Path>,
        logger: Arc<dyn TxnLogger>,
    ) -> CResult<Self> {
        if let Some(dir) = db_path.as_ref().parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir)?;
            }
        }

        let conn = tokio_rusqlite::Connection::open(db_path.as_ref()).await?;
        conn.call(|conn| {
            conn.execute_batch(schema::SCHEMA)?;
            Ok(())
        })
        .await?;

        Ok(Self { conn: Arc::new(conn), logger })
    }

    /// `put(type, key, value)`: UPSERT with before/after logging, per
    /// spec §4.1.
    pub async fn put(
        &self,
        type_: impl Into<String>,
        key: impl Into<String>,
        value: Vec<u8>,
    ) -> CResult<()> {
        let type_ = type_.into();
        let key = key.into();
        if type_.is_empty() {
            return Err(Error::InvalidArgument("type must not be empty".to_string()));
        }
        if key.is_empty() {
            return Err(Error::InvalidArgument("key must not be empty".to_string()));
        }
        if value.is_empty() {
            return Err(Error::InvalidArgument("value must not be empty".to_string()));
        }

        let ts = now();
        let txid = new_txid();
        let logger = self.logger.clone();

        self.conn
            .call(move |conn| {
                let existing = fetch_record(conn, &type_, &key)?;

                if let Some(record) = &existing {
                    logger.log_update_before(&type_, &key, ts, ts, &txid, &record.value);
                }

                conn.execute(
                    "INSERT INTO kv_records (type, key, value, updated_at) VALUES (?1, ?2, ?3, ?4)
                     ON CONFLICT(type, key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                    params![type_, key, value, ts],
                )?;

                if existing.is_some() {
                    logger.log_update_after(&type_, &key, ts, ts, &txid, &value);
                } else {
                    logger.log_insert_after(&type_, &key, ts, ts, &txid, &value);
                }

                Ok(())
            })
            .await?;

        Ok(())
    }

    /// `get(type, key) -> value | none`. No side effects, no logging.
    pub async fn get(&self, type_: impl Into<String>, key: impl Into<String>) -> CResult<Option<Vec<u8>>> {
        let type_ = type_.into();
        let key = key.into();

        let value = self
            .conn
            .call(move |conn| {
                conn.query_row(
                    "SELECT value FROM kv_records WHERE type = ?1 AND key = ?2",
                    params![type_, key],
                    |row| row.get(0),
                )
                .optional()
            })
            .await?;

        Ok(value)
    }

    /// `exists(type, key) -> bool`. Cheaper than `get`, consistent with it
    /// at the boundaries of a completed write.
    pub async fn exists(&self, type_: impl Into<String>, key: impl Into<String>) -> CResult<bool> {
        let type_ = type_.into();
        let key = key.into();

        let exists = self
            .conn
            .call(move |conn| {
                conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM kv_records WHERE type = ?1 AND key = ?2)",
                    params![type_, key],
                    |row| row.get(0),
                )
            })
            .await?;

        Ok(exists)
    }

    /// `delete(type, key) -> ok`. Idempotent; logs `delete-before` for an
    /// existing key or `delete-before-missing` otherwise, per spec §4.1.
    pub async fn delete(&self, type_: impl Into<String>, key: impl Into<String>) -> CResult<()> {
        let type_ = type_.into();
        let key = key.into();
        if type_.is_empty() {
            return Err(Error::InvalidArgument("type must not be empty".to_string()));
        }
        if key.is_empty() {
            return Err(Error::InvalidArgument("key must not be empty".to_string()));
        }

        let ts = now();
        let txid = new_txid();
        let logger = self.logger.clone();

        self.conn
            .call(move |conn| {
                let existing = fetch_record(conn, &type_, &key)?;

                match &existing {
                    Some(record) => {
                        logger.log_delete_before(&type_, &key, ts, ts, &txid, &record.value);
                        conn.execute(
                            "DELETE FROM kv_records WHERE type = ?1 AND key = ?2",
                            params![type_, key],
                        )?;
                    }
                    None => {
                        logger.log_delete_before_missing(&type_, &key, ts, ts, &txid);
                    }
                }

                Ok(())
            })
            .await?;

        Ok(())
    }

    /// `list(type, prefix?, limit) -> [key]`, lexicographically ascending,
    /// capped at `limit` clamped into `[0, 1000]`. Reads bypass the logger.
    ///
    /// The prefix filter is a literal SQL `LIKE '<prefix>%'` with no
    /// escaping of `%`/`_` — callers intending a literal match must not
    /// pass those characters in `prefix` (documented limitation, spec §9).
    pub async fn list(
        &self,
        type_: impl Into<String>,
        prefix: Option<String>,
        limit: i64,
    ) -> CResult<Vec<String>> {
        let type_ = type_.into();
        let limit = limit.clamp(LIST_LIMIT_MIN, LIST_LIMIT_MAX);
        let prefix = prefix.filter(|p| !p.is_empty());

        let keys = self
            .conn
            .call(move |conn| {
                let mut keys = Vec::new();
                match prefix {
                    Some(prefix) => {
                        let pattern = format!("{prefix}%");
                        let mut stmt = conn.prepare(
                            "SELECT key FROM kv_records WHERE type = ?1 AND key LIKE ?2 ORDER BY key ASC LIMIT ?3",
                        )?;
                        let mut rows = stmt.query(params![type_, pattern, limit])?;
                        while let Some(row) = rows.next()? {
                            keys.push(row.get(0)?);
                        }
                    }
                    None => {
                        let mut stmt = conn.prepare(
                            "SELECT key FROM kv_records WHERE type = ?1 ORDER BY key ASC LIMIT ?2",
                        )?;
                        let mut rows = stmt.query(params![type_, limit])?;
                        while let Some(row) = rows.next()? {
                            keys.push(row.get(0)?);
                        }
                    }
                }
                Ok(keys)
            })
            .await?;

        Ok(keys)
    }

    /// Row count plus the active log's on-disk size, when the logger
    /// tracks one. Not part of the spec's mandated contract (SPEC_FULL.md
    /// §11.3).
    pub async fn status(&self) -> CResult<Status> {
        let keys = self.conn.call(|conn| conn.query_row("SELECT COUNT(*) FROM kv_records", [], |row| row.get(0))).await?;
        Ok(Status { keys, active_log_bytes: self.logger.active_log_bytes() })
    }
}

/// Fetches the current `(type, key)` record, if any — the pre-image `put`
/// and `delete` log before mutating the row.
fn fetch_record(conn: &rusqlite::Connection, type_: &str, key: &str) -> rusqlite::Result<Option<Record>> {
    conn.query_row(
        "SELECT value, updated_at FROM kv_records WHERE type = ?1 AND key = ?2",
        params![type_, key],
        |row| Ok(Record { value: row.get(0)?, updated_at: row.get(1)? }),
    )
    .optional()
}

fn now() -> f64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs_f64()
}

fn new_txid() -> String {
    Uuid::new_v4().to_string()
}

/// `foo/bar.sqlite` -> `foo/bar.txn.log`.
fn derive_txn_log_path(db_path: &Path) -> PathBuf {
    let stem = db_path.file_stem().unwrap_or_default();
    let mut name = stem.to_os_string();
    name.push(".txn.log");
    match db_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.join(name),
        _ => PathBuf::from(name),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::txlog::spy::SpyLogger;
    use crate::txlog::Op;

    async fn fresh_store() -> (tempfile::TempDir, KVStore, Arc<SpyLogger>) {
        let dir = tempfile::tempdir().unwrap();
        let spy = Arc::new(SpyLogger::new());
        let store = KVStore::open_with_logger(dir.path().join("test.sqlite"), spy.clone())
            .await
            .unwrap();
        (dir, store, spy)
    }

    #[tokio::test]
    async fn put_then_get_round_trips_exact_bytes() {
        let (_dir, store, _spy) = fresh_store().await;
        store.put("users", "alice", b"id,name\n1,Alice\n".to_vec()).await.unwrap();

        assert!(store.exists("users", "alice").await.unwrap());
        assert_eq!(store.get("users", "alice").await.unwrap(), Some(b"id,name\n1,Alice\n".to_vec()));
    }

    #[tokio::test]
    async fn put_twice_keeps_only_the_latest_value() {
        let (_dir, store, _spy) = fresh_store().await;
        store.put("users", "alice", b"v1".to_vec()).await.unwrap();
        store.put("users", "alice", b"v2".to_vec()).await.unwrap();

        assert_eq!(store.get("users", "alice").await.unwrap(), Some(b"v2".to_vec()));
    }

    #[tokio::test]
    async fn delete_existing_then_missing() {
        let (_dir, store, _spy) = fresh_store().await;
        store.put("users", "alice", b"v1".to_vec()).await.unwrap();

        store.delete("users", "alice").await.unwrap();
        assert!(!store.exists("users", "alice").await.unwrap());
        assert_eq!(store.get("users", "alice").await.unwrap(), None);

        // Idempotent: deleting again succeeds and leaves state unchanged.
        store.delete("users", "alice").await.unwrap();
        assert!(!store.exists("users", "alice").await.unwrap());
    }

    #[tokio::test]
    async fn put_rejects_empty_type_key_or_value() {
        let (_dir, store, _spy) = fresh_store().await;
        assert!(store.put("", "k", b"v".to_vec()).await.is_err());
        assert!(store.put("t", "", b"v".to_vec()).await.is_err());
        assert!(store.put("t", "k", vec![]).await.is_err());
    }

    #[tokio::test]
    async fn list_orders_lexicographically_and_filters_by_type_and_prefix() {
        let (_dir, store, _spy) = fresh_store().await;
        for key in ["a1", "a2", "b1"] {
            store.put("items", key, b"v".to_vec()).await.unwrap();
        }
        store.put("other", "a1", b"v".to_vec()).await.unwrap();

        assert_eq!(store.list("items", None, 10).await.unwrap(), vec!["a1", "a2", "b1"]);
        assert_eq!(store.list("items", Some("a".to_string()), 10).await.unwrap(), vec!["a1", "a2"]);
        assert_eq!(store.list("items", None, 2).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn list_clamps_limit_into_0_to_1000() {
        let (_dir, store, _spy) = fresh_store().await;
        store.put("items", "a", b"v".to_vec()).await.unwrap();

        assert_eq!(store.list("items", None, -5).await.unwrap().len(), 0);
        assert_eq!(store.list("items", None, 5_000).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn put_on_new_key_emits_single_insert_after() {
        let (_dir, store, spy) = fresh_store().await;
        store.put("users", "alice", b"v1".to_vec()).await.unwrap();

        let calls = spy.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].op, Op::InsertAfter);
    }

    #[tokio::test]
    async fn put_on_existing_key_emits_paired_update_before_and_after() {
        let (_dir, store, spy) = fresh_store().await;
        store.put("users", "alice", b"v1".to_vec()).await.unwrap();
        store.put("users", "alice", b"v2".to_vec()).await.unwrap();

        let calls = spy.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].op, Op::UpdateBefore);
        assert_eq!(calls[1].op, Op::UpdateAfter);
        assert_eq!(calls[0].txid, calls[1].txid);
        assert_eq!(calls[0].ts, calls[1].ts);
        assert_eq!(calls[0].value.as_deref(), Some(b"v1".as_slice()));
        assert_eq!(calls[1].value.as_deref(), Some(b"v2".as_slice()));
    }

    #[tokio::test]
    async fn delete_existing_emits_single_delete_before() {
        let (_dir, store, spy) = fresh_store().await;
        store.put("users", "alice", b"v1".to_vec()).await.unwrap();
        store.delete("users", "alice").await.unwrap();

        let calls = spy.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].op, Op::DeleteBefore);
        assert_eq!(calls[1].value.as_deref(), Some(b"v1".as_slice()));
    }

    #[tokio::test]
    async fn delete_missing_emits_single_delete_before_missing() {
        let (_dir, store, spy) = fresh_store().await;
        store.delete("ghosts", "phantom").await.unwrap();

        let calls = spy.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].op, Op::DeleteBeforeMissing);
        assert_eq!(calls[0].value, None);
    }

    #[tokio::test]
    async fn status_reports_key_count() {
        let (_dir, store, _spy) = fresh_store().await;
        store.put("items", "a", b"v".to_vec()).await.unwrap();
        store.put("items", "b", b"v".to_vec()).await.unwrap();
        store.delete("items", "a").await.unwrap();

        let status = store.status().await.unwrap();
        assert_eq!(status.keys, 1);
    }

    #[tokio::test]
    async fn concurrent_puts_to_distinct_keys_produce_one_well_formed_line_each() {
        use std::io::BufRead;

        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("test.sqlite");
        let store = KVStore::open(&db_path).await.unwrap();

        const N: usize = 20;
        let mut tasks = Vec::with_capacity(N);
        for i in 0..N {
            let store = store.clone();
            tasks.push(tokio::spawn(async move {
                store.put("items", format!("k{i}"), b"v".to_vec()).await.unwrap();
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        let log_path = dir.path().join("test.txn.log");
        let file = std::fs::File::open(&log_path).unwrap();
        let lines: Vec<String> = std::io::BufReader::new(file).lines().map(|l| l.unwrap()).collect();

        assert_eq!(lines.len(), N);
        for line in &lines {
            let parsed: serde_json::Value = serde_json::from_str(line).expect("each line is one well-formed JSON object");
            assert_eq!(parsed["op"], "insert-after");
        }

        assert_eq!(store.list("items", None, LIST_LIMIT_MAX).await.unwrap().len(), N);
    }

    #[test]
    fn derive_txn_log_path_strips_extension() {
        assert_eq!(
            derive_txn_log_path(Path::new("/data/mydb.sqlite")),
            PathBuf::from("/data/mydb.txn.log")
        );
        assert_eq!(derive_txn_log_path(Path::new("mydb.sqlite")), PathBuf::from("mydb.txn.log"));
    }
}
