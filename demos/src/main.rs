use tempdir::TempDir;

use typed_kv_core::error::CResult;
use typed_kv_core::kv::KVStore;

#[tokio::main]
async fn main() {
    println!("Hello, typed-kv!");

    run().await.unwrap();

    println!("Bye~");
}

async fn run() -> CResult<()> {
    let dir = TempDir::new("typed-kv-demo").expect("create temp dir");
    let store = KVStore::open(dir.path().join("demo.sqlite")).await?;

    store.put("users", "alice", b"id,name\n1,Alice\n".to_vec()).await?;
    store.put("users", "bob", b"id,name\n2,Bob\n".to_vec()).await?;
    store.put("users", "alice", b"id,name\n1,Alice Liddell\n".to_vec()).await?;

    assert_eq!(store.list("users", None, 10).await?, vec!["alice", "bob"]);
    assert_eq!(store.list("users", Some("a".to_string()), 10).await?, vec!["alice"]);
    assert_eq!(store.get("users", "alice").await?, Some(b"id,name\n1,Alice Liddell\n".to_vec()));

    store.delete("users", "bob").await?;
    assert!(!store.exists("users", "bob").await?);

    // Deleting a key that was never there is a no-op, not an error.
    store.delete("users", "carol").await?;

    let status = store.status().await?;
    println!("{} key(s), {:?} active log byte(s)", status.keys, status.active_log_bytes);

    Ok(())
}
