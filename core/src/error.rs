use std::fmt::{Display, Formatter};

/// Crate-wide result alias, in the style used throughout this codebase.
pub type CResult<T> = std::result::Result<T, Error>;

/// Errors produced by [`crate::kv::KVStore`].
///
/// Log I/O failures are deliberately *not* represented here: the transaction
/// logger swallows its own errors (see `crate::txlog`) and reports them to a
/// side diagnostic channel instead of failing the caller's mutation.
#[derive(Debug)]
pub enum Error {
    /// A precondition on caller-supplied input was violated (empty
    /// `type`/`key`/`value`, an out-of-range `limit`, ...).
    InvalidArgument(String),

    /// The embedded database returned an error while reading or writing.
    Storage(String),

    /// An internal invariant was violated. Reserved for conditions that
    /// "can't happen" but keep the type exhaustive over fallible internals
    /// (hex/JSON encoding of a value we just produced ourselves).
    Internal(String),
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::InvalidArgument(msg) => write!(f, "invalid argument: {msg}"),
            Error::Storage(msg) => write!(f, "storage error: {msg}"),
            Error::Internal(msg) => write!(f, "internal error: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Storage(err.to_string())
    }
}

impl From<tokio_rusqlite::Error> for Error {
    fn from(err: tokio_rusqlite::Error) -> Self {
        Error::Storage(err.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Internal(err.to_string())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn display_includes_kind_and_message() {
        let err = Error::InvalidArgument("key must not be empty".to_string());
        assert_eq!(err.to_string(), "invalid argument: key must not be empty");
    }
}
