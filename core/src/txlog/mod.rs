//! The durable, human-readable transaction log: one JSON-Lines record per
//! mutation, truncated for display, digested for integrity, rotated daily.

mod entry;
mod rotation;

pub use entry::{LogEntry, Op, MAX_CSV_BYTES};
pub use rotation::{local_day, ActiveLog};

use std::path::PathBuf;
use std::sync::Mutex;

/// The five record kinds a [`TxnLogger`] can append, per spec §4.2. All
/// implementations are synchronous from the caller's perspective: by the
/// time the call returns, the record has been appended and best-effort
/// flushed. Failures never propagate — see the error taxonomy in spec §7 —
/// they are reported to a side diagnostic channel (`log::error!`) instead.
pub trait TxnLogger: Send + Sync {
    fn log_insert_after(&self, type_: &str, key: &str, ts: f64, updated_at: f64, txid: &str, value: &[u8]);

    fn log_update_before(&self, type_: &str, key: &str, ts: f64, updated_at: f64, txid: &str, value: &[u8]);

    fn log_update_after(&self, type_: &str, key: &str, ts: f64, updated_at: f64, txid: &str, value: &[u8]);

    fn log_delete_before(&self, type_: &str, key: &str, ts: f64, updated_at: f64, txid: &str, value: &[u8]);

    fn log_delete_before_missing(&self, type_: &str, key: &str, ts: f64, updated_at: f64, txid: &str);

    /// Best-effort size of the active log file in bytes, for status/health
    /// reporting. `None` when the implementation has no notion of one (the
    /// test spy, for instance).
    fn active_log_bytes(&self) -> Option<u64> {
        None
    }
}

/// The production logger: appends to a single active JSON-Lines file,
/// rotating it to a dated sibling on local-day change.
///
/// The active file handle is owned exclusively by this instance (behind a
/// `std::sync::Mutex` serializing every append/rotate) and never shared —
/// pointing two `JsonLinesLogger`s at the same path is undefined behavior
/// per spec §5, caught at `open()` time by the OS-level exclusive lock
/// `ActiveLog` takes on the file.
pub struct JsonLinesLogger {
    active: Mutex<ActiveLog>,
}

impl JsonLinesLogger {
    /// Opens (creating lazily) the active log at `path`.
    pub fn open(path: PathBuf) -> crate::error::CResult<Self> {
        Ok(Self { active: Mutex::new(ActiveLog::open(path)?) })
    }

    /// The active file's current on-disk size, for `KVStore::status`.
    pub fn active_size(&self) -> u64 {
        self.active.lock().unwrap().size().unwrap_or(0)
    }

    fn append(&self, entry: LogEntry) {
        let line = match entry.to_line() {
            Ok(line) => line,
            Err(err) => {
                log::error!("txn log: failed to encode record: {err}");
                return;
            }
        };

        let mut active = self.active.lock().unwrap();
        if let Err(err) = active.maybe_rotate(entry.ts) {
            log::error!("txn log: rotation failed for {}: {err}", active.path().display());
        }
        if let Err(err) = active.append(&line) {
            log::error!("txn log: append failed for {}: {err}", active.path().display());
        }
    }
}

impl TxnLogger for JsonLinesLogger {
    fn log_insert_after(&self, type_: &str, key: &str, ts: f64, updated_at: f64, txid: &str, value: &[u8]) {
        self.append(LogEntry::with_value(
            ts,
            updated_at,
            txid.to_string(),
            Op::InsertAfter,
            type_.to_string(),
            key.to_string(),
            value,
        ));
    }

    fn log_update_before(&self, type_: &str, key: &str, ts: f64, updated_at: f64, txid: &str, value: &[u8]) {
        self.append(LogEntry::with_value(
            ts,
            updated_at,
            txid.to_string(),
            Op::UpdateBefore,
            type_.to_string(),
            key.to_string(),
            value,
        ));
    }

    fn log_update_after(&self, type_: &str, key: &str, ts: f64, updated_at: f64, txid: &str, value: &[u8]) {
        self.append(LogEntry::with_value(
            ts,
            updated_at,
            txid.to_string(),
            Op::UpdateAfter,
            type_.to_string(),
            key.to_string(),
            value,
        ));
    }

    fn log_delete_before(&self, type_: &str, key: &str, ts: f64, updated_at: f64, txid: &str, value: &[u8]) {
        self.append(LogEntry::with_value(
            ts,
            updated_at,
            txid.to_string(),
            Op::DeleteBefore,
            type_.to_string(),
            key.to_string(),
            value,
        ));
    }

    fn log_delete_before_missing(&self, type_: &str, key: &str, ts: f64, updated_at: f64, txid: &str) {
        self.append(LogEntry::without_value(
            ts,
            updated_at,
            txid.to_string(),
            Op::DeleteBeforeMissing,
            type_.to_string(),
            key.to_string(),
        ));
    }

    fn active_log_bytes(&self) -> Option<u64> {
        Some(self.active_size())
    }
}

#[cfg(test)]
pub mod spy;
