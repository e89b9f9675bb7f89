//! A `TxnLogger` test double that records the sequence of calls made to it,
//! per this crate's design note: prefer a small logger interface with two
//! realizations, the production JSON-Lines logger and a spy for tests.

use std::sync::Mutex;

use super::{Op, TxnLogger};

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub op: Op,
    pub type_: String,
    pub key: String,
    pub ts: f64,
    pub updated_at: f64,
    pub txid: String,
    pub value: Option<Vec<u8>>,
}

#[derive(Default)]
pub struct SpyLogger {
    calls: Mutex<Vec<RecordedCall>>,
}

impl SpyLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, op: Op, type_: &str, key: &str, ts: f64, updated_at: f64, txid: &str, value: Option<&[u8]>) {
        self.calls.lock().unwrap().push(RecordedCall {
            op,
            type_: type_.to_string(),
            key: key.to_string(),
            ts,
            updated_at,
            txid: txid.to_string(),
            value: value.map(|v| v.to_vec()),
        });
    }
}

impl TxnLogger for SpyLogger {
    fn log_insert_after(&self, type_: &str, key: &str, ts: f64, updated_at: f64, txid: &str, value: &[u8]) {
        self.record(Op::InsertAfter, type_, key, ts, updated_at, txid, Some(value));
    }

    fn log_update_before(&self, type_: &str, key: &str, ts: f64, updated_at: f64, txid: &str, value: &[u8]) {
        self.record(Op::UpdateBefore, type_, key, ts, updated_at, txid, Some(value));
    }

    fn log_update_after(&self, type_: &str, key: &str, ts: f64, updated_at: f64, txid: &str, value: &[u8]) {
        self.record(Op::UpdateAfter, type_, key, ts, updated_at, txid, Some(value));
    }

    fn log_delete_before(&self, type_: &str, key: &str, ts: f64, updated_at: f64, txid: &str, value: &[u8]) {
        self.record(Op::DeleteBefore, type_, key, ts, updated_at, txid, Some(value));
    }

    fn log_delete_before_missing(&self, type_: &str, key: &str, ts: f64, updated_at: f64, txid: &str) {
        self.record(Op::DeleteBeforeMissing, type_, key, ts, updated_at, txid, None);
    }
}
