/// A stored `(type, key) -> value` record. `put`/`delete` fetch the existing
/// record (if any) as this shape before mutating the row, so the before-image
/// logged to the transaction log always reflects the row as it stood prior to
/// the mutation. Not exposed directly by `KVStore::get`, which returns the
/// raw bytes rather than this struct.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub value: Vec<u8>,
    pub updated_at: f64,
}
