use serde_derive::Serialize;
use sha2::{Digest, Sha256};

/// The longest `csv` preview a log entry will carry, in UTF-8 bytes.
pub const MAX_CSV_BYTES: usize = 8192;

/// One kind of mutation record, per spec §3's op taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    InsertAfter,
    UpdateBefore,
    UpdateAfter,
    DeleteBefore,
    DeleteBeforeMissing,
}

impl Op {
    fn as_str(self) -> &'static str {
        match self {
            Op::InsertAfter => "insert-after",
            Op::UpdateBefore => "update-before",
            Op::UpdateAfter => "update-after",
            Op::DeleteBefore => "delete-before",
            Op::DeleteBeforeMissing => "delete-before-missing",
        }
    }
}

impl serde::Serialize for Op {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

/// A single JSON-Lines transaction log record.
///
/// Field order here is the field order on the wire: `version`, `ts`,
/// `updated_at`, `txid`, `op`, `type`, `key`, then the value-bearing fields.
#[derive(Debug, Serialize)]
pub struct LogEntry {
    pub version: u32,
    pub ts: f64,
    pub updated_at: f64,
    pub txid: String,
    pub op: Op,
    #[serde(rename = "type")]
    pub type_: String,
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub csv: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub truncated: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
}

impl LogEntry {
    /// Builds a record with no value (`delete-before-missing`).
    pub fn without_value(
        ts: f64,
        updated_at: f64,
        txid: String,
        op: Op,
        type_: String,
        key: String,
    ) -> Self {
        LogEntry {
            version: 1,
            ts,
            updated_at,
            txid,
            op,
            type_,
            key,
            bytes: None,
            csv: None,
            truncated: None,
            sha256: None,
        }
    }

    /// Builds a record carrying the value's preview (`csv`), raw length
    /// (`bytes`), and integrity digest (`sha256`).
    pub fn with_value(
        ts: f64,
        updated_at: f64,
        txid: String,
        op: Op,
        type_: String,
        key: String,
        value: &[u8],
    ) -> Self {
        let preview = ValuePreview::of(value);
        LogEntry {
            version: 1,
            ts,
            updated_at,
            txid,
            op,
            type_,
            key,
            bytes: Some(value.len() as u64),
            csv: Some(preview.csv),
            truncated: preview.truncated.then_some(true),
            sha256: Some(preview.sha256),
        }
    }

    /// Serializes this record as one line: a JSON object followed by `\n`.
    pub fn to_line(&self) -> CResultLine {
        let mut line = serde_json::to_vec(self)?;
        line.push(b'\n');
        Ok(line)
    }
}

type CResultLine = Result<Vec<u8>, serde_json::Error>;

struct ValuePreview {
    csv: String,
    truncated: bool,
    sha256: String,
}

impl ValuePreview {
    fn of(value: &[u8]) -> Self {
        let sha256 = hex::encode(Sha256::digest(value));

        match std::str::from_utf8(value) {
            Err(_) => ValuePreview { csv: "<non-utf8>".to_string(), truncated: false, sha256 },
            Ok(text) if text.len() <= MAX_CSV_BYTES => {
                ValuePreview { csv: text.to_string(), truncated: false, sha256 }
            }
            Ok(text) => {
                let cut = largest_valid_utf8_prefix(text.as_bytes(), MAX_CSV_BYTES);
                ValuePreview { csv: text[..cut].to_string(), truncated: true, sha256 }
            }
        }
    }
}

/// Returns the length of the longest valid-UTF-8 prefix of `bytes` that is
/// at most `max` bytes long, backing off at most 3 bytes from `max` itself
/// (the widest a UTF-8 code point can be, minus one).
fn largest_valid_utf8_prefix(bytes: &[u8], max: usize) -> usize {
    let max = max.min(bytes.len());
    for back_off in 0..=3.min(max) {
        let cut = max - back_off;
        if std::str::from_utf8(&bytes[..cut]).is_ok() {
            return cut;
        }
    }
    0
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn ascii_under_limit_is_not_truncated() {
        let preview = ValuePreview::of(b"id,name\n1,Alice\n");
        assert_eq!(preview.csv, "id,name\n1,Alice\n");
        assert!(!preview.truncated);
    }

    #[test]
    fn exactly_8192_bytes_is_not_truncated() {
        let value = vec![b'x'; MAX_CSV_BYTES];
        let preview = ValuePreview::of(&value);
        assert_eq!(preview.csv.len(), MAX_CSV_BYTES);
        assert!(!preview.truncated);
    }

    #[test]
    fn oversize_ascii_is_truncated_to_the_limit() {
        let value = vec![b'y'; MAX_CSV_BYTES + 1];
        let preview = ValuePreview::of(&value);
        assert_eq!(preview.csv.len(), MAX_CSV_BYTES);
        assert!(preview.truncated);
        assert_eq!(preview.sha256, hex::encode(Sha256::digest(&value)));
    }

    #[test]
    fn oversize_multibyte_backs_off_to_a_char_boundary() {
        // A 3-byte UTF-8 character repeated so the raw 8192-byte cut lands
        // mid-character; the preview must back off to a char boundary.
        let ch = '中'; // 3 bytes in UTF-8
        let mut s = String::new();
        while s.len() < MAX_CSV_BYTES + 30 {
            s.push(ch);
        }
        let preview = ValuePreview::of(s.as_bytes());
        assert!(preview.truncated);
        assert!(preview.csv.len() <= MAX_CSV_BYTES);
        assert!(std::str::from_utf8(preview.csv.as_bytes()).is_ok());
    }

    #[test]
    fn non_utf8_value_is_rendered_as_placeholder() {
        let value = vec![0xFFu8; 32];
        let preview = ValuePreview::of(&value);
        assert_eq!(preview.csv, "<non-utf8>");
        assert!(!preview.truncated);
        assert_eq!(preview.sha256, hex::encode(Sha256::digest(&value)));
    }

    #[test]
    fn delete_before_missing_entry_omits_value_fields() {
        let entry = LogEntry::without_value(
            1.0,
            1.0,
            "txid-1".to_string(),
            Op::DeleteBeforeMissing,
            "ghosts".to_string(),
            "phantom".to_string(),
        );
        let line = entry.to_line().unwrap();
        let json: serde_json::Value = serde_json::from_slice(&line).unwrap();
        assert!(json.get("bytes").is_none());
        assert!(json.get("csv").is_none());
        assert!(json.get("truncated").is_none());
        assert!(json.get("sha256").is_none());
        assert_eq!(json["op"], "delete-before-missing");
    }
}
