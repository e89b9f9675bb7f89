//! `typed-kv-core` stores typed key-value pairs — `(type, key) -> bytes` —
//! in an embedded SQLite database, and mirrors every mutation to a durable,
//! human-readable JSON-Lines transaction log. All live keys are queryable
//! through SQLite itself; nothing needs to fit in memory. Deletes write a
//! `delete-before` (or `delete-before-missing`) record rather than a
//! tombstone value, since the database itself is the source of truth for
//! current state.
//!
//! ## Getting started
//!
//! ```rust
//! use typed_kv_core::kv::KVStore;
//!
//! #[tokio::main]
//! async fn main() {
//!     run().await.unwrap();
//! }
//!
//! async fn run() -> typed_kv_core::error::CResult<()> {
//!     let dir = tempfile::tempdir()?;
//!     let store = KVStore::open(dir.path().join("demo.sqlite")).await?;
//!
//!     store.put("users", "alice", b"id,name\n1,Alice\n".to_vec()).await?;
//!     store.put("users", "bob", b"id,name\n2,Bob\n".to_vec()).await?;
//!
//!     assert_eq!(store.list("users", None, 10).await?, vec!["alice", "bob"]);
//!     assert_eq!(store.get("users", "alice").await?, Some(b"id,name\n1,Alice\n".to_vec()));
//!
//!     store.delete("users", "alice").await?;
//!     assert!(!store.exists("users", "alice").await?);
//!
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod kv;
pub mod txlog;
