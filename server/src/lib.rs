//! `typed-kv-server` exposes [`typed_kv_core::kv::KVStore`] over a thin HTTP
//! surface.
//!
//! ## Getting started
//!
//! ```doc
//! ❯ typed-kv-server
//!
//! listening on 127.0.0.1:8080
//!
//! ❯ curl -X PUT --data 'id,name\n1,Alice\n' http://localhost:8080/v1/users/alice
//! ❯ curl http://localhost:8080/v1/users/alice
//! id,name
//! 1,Alice
//! ❯ curl http://localhost:8080/v1/users?prefix=a
//! {"keys":["alice"]}
//! ```

pub mod config;
pub mod http;
pub mod trace;
