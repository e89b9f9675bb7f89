//! Environment-variable-driven configuration: reads env vars, applies
//! defaults, and stops there — not grown into a general config framework.

use std::path::PathBuf;

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";
const DEFAULT_DB_PATH: &str = "storage/kvdb.sqlite";
const DEFAULT_LOG_DIR: &str = ".typed-kv";
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_LIST_LIMIT: i64 = 100;
const MAX_LIST_LIMIT: i64 = 1000;
const DEFAULT_MAX_BODY_BYTES: usize = 8 * 1024 * 1024;

/// Server configuration, assembled once at startup from the process
/// environment.
#[derive(Debug, Clone)]
pub struct ConfigLoad {
    pub bind_addr: String,
    pub db_path: PathBuf,
    pub log_dir: String,
    pub log_level: String,

    /// `limit` applied to `GET /v1/:type` when the query string omits one.
    pub default_list_limit: i64,

    /// Upper bound `limit` is clamped to before reaching `KVStore::list`.
    pub max_list_limit: i64,

    /// Largest request body accepted for `PUT /v1/:type/:key`.
    pub max_body_bytes: usize,

    /// Shared secret compared against the `Authorization: Bearer <token>`
    /// header. `None` disables the check (local/dev use).
    pub bearer_token: Option<String>,
}

impl Default for ConfigLoad {
    fn default() -> Self {
        ConfigLoad {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            log_dir: DEFAULT_LOG_DIR.to_string(),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            default_list_limit: DEFAULT_LIST_LIMIT,
            max_list_limit: MAX_LIST_LIMIT,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            bearer_token: None,
        }
    }
}

impl ConfigLoad {
    /// Loads configuration from the process environment, falling back to
    /// defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        ConfigLoad {
            bind_addr: env_or("TYPED_KV_BIND_ADDR", defaults.bind_addr),
            db_path: PathBuf::from(env_or(
                "TYPED_KV_DB_PATH",
                defaults.db_path.to_string_lossy().into_owned(),
            )),
            log_dir: env_or("TYPED_KV_LOG_DIR", defaults.log_dir),
            log_level: env_or("TYPED_KV_LOG_LEVEL", defaults.log_level),
            default_list_limit: env_parsed_or("TYPED_KV_DEFAULT_LIST_LIMIT", defaults.default_list_limit),
            max_list_limit: env_parsed_or("TYPED_KV_MAX_LIST_LIMIT", defaults.max_list_limit),
            max_body_bytes: env_parsed_or("TYPED_KV_MAX_BODY_BYTES", defaults.max_body_bytes),
            bearer_token: std::env::var("TYPED_KV_BEARER_TOKEN").ok().filter(|t| !t.is_empty()),
        }
    }
}

fn env_or(key: &str, default: String) -> String {
    std::env::var(key).unwrap_or(default)
}

fn env_parsed_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}
