use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use chrono::{Local, TimeZone};
use fs4::FileExt;

use crate::error::{CResult, Error};

/// Formats the local-calendar day containing `ts` (seconds since epoch) as
/// `YYYY-MM-DD`.
pub fn local_day(ts: f64) -> String {
    let secs = ts.floor() as i64;
    let nanos = ((ts - ts.floor()) * 1_000_000_000.0) as u32;
    let dt = Local
        .timestamp_opt(secs, nanos)
        .single()
        .unwrap_or_else(|| Local.timestamp_opt(secs, 0).unwrap());
    dt.format("%Y-%m-%d").to_string()
}

/// The active transaction-log file: one open, exclusively-locked handle that
/// every append and rotation goes through. Owned by exactly one
/// [`crate::txlog::JsonLinesLogger`] per spec's "one logger instance per
/// active path" contract.
pub struct ActiveLog {
    path: PathBuf,
    file: File,
}

impl ActiveLog {
    /// Opens (creating if absent) the active log at `path`, creating its
    /// parent directory as needed and taking an exclusive OS lock so a
    /// second process pointed at the same path fails fast instead of
    /// interleaving half-written lines.
    pub fn open(path: PathBuf) -> CResult<Self> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }

        let file = OpenOptions::new().read(true).write(true).create(true).open(&path)?;
        file.try_lock_exclusive().map_err(|err| {
            Error::Internal(format!(
                "could not lock active log {}: {err} (another process may hold it)",
                path.display()
            ))
        })?;

        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The on-disk size of the active file, for `KVStore::status`.
    pub fn size(&self) -> CResult<u64> {
        Ok(self.file.metadata()?.len())
    }

    /// Rotates the active file if the local day of `ts` differs from the
    /// local day of the active file's last-modified time. A missing or
    /// empty active file never rotates (there's nothing to preserve).
    pub fn maybe_rotate(&mut self, ts: f64) -> CResult<()> {
        let meta = self.file.metadata()?;
        if meta.len() == 0 {
            return Ok(());
        }

        let modified = meta.modified()?;
        let active_day = local_day(
            modified.duration_since(std::time::UNIX_EPOCH).unwrap_or_default().as_secs_f64(),
        );
        let event_day = local_day(ts);

        if active_day == event_day {
            return Ok(());
        }

        self.rotate_to(&active_day)
    }

    /// Renames the active file to its dated name for `day`, picking a
    /// `.N` collision suffix if the dated name is already taken, then
    /// re-opens a fresh empty active file at the original path.
    fn rotate_to(&mut self, day: &str) -> CResult<()> {
        let dated = dated_path(&self.path, day);
        let target = first_free_path(dated);

        // Drop the OS lock before renaming; we reacquire it on the new file.
        std::fs::rename(&self.path, &target).map_err(|err| {
            Error::Internal(format!(
                "could not rotate {} to {}: {err}",
                self.path.display(),
                target.display()
            ))
        })?;

        let file = OpenOptions::new().read(true).write(true).create(true).open(&self.path)?;
        file.try_lock_exclusive().map_err(|err| {
            Error::Internal(format!("could not lock rotated active log: {err}"))
        })?;
        self.file = file;

        Ok(())
    }

    /// Appends one pre-framed record (including its trailing `\n`) to the
    /// active file and flushes it to disk. Best-effort durability: errors
    /// are returned to the caller (`crate::txlog`), which logs and
    /// swallows them rather than failing the mutation.
    pub fn append(&mut self, line: &[u8]) -> CResult<()> {
        self.file.seek(SeekFrom::End(0))?;
        self.file.write_all(line)?;
        self.file.sync_data()?;
        Ok(())
    }
}

/// Computes `BASE.YYYY-MM-DD.txn.log` from an active path `BASE.txn.log`.
fn dated_path(active: &Path, day: &str) -> PathBuf {
    let active_str = active.to_string_lossy();
    let base = active_str.strip_suffix(".txn.log").unwrap_or(&active_str);
    PathBuf::from(format!("{base}.{day}.txn.log"))
}

/// Returns `dated` if free, else the first `dated.N` (N starting at 1) that
/// does not already exist.
fn first_free_path(dated: PathBuf) -> PathBuf {
    if !dated.exists() {
        return dated;
    }
    let mut n = 1u32;
    loop {
        let candidate = PathBuf::from(format!("{}.{n}", dated.display()));
        if !candidate.exists() {
            return candidate;
        }
        n += 1;
    }
}
