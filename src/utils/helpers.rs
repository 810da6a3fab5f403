use chrono::{DateTime, SecondsFormat, Utc};
use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 of a UTF-8 string.
///
/// Event hashes, the agent's clipboard change detection and the dedup cache
/// all rely on this exact encoding (64 lowercase hex chars).
pub fn sha256_hex(input: &str) -> String {
    hex::encode(Sha256::digest(input.as_bytes()))
}

/// Format a timestamp the way the hub stores it: RFC-3339 UTC at second
/// precision. Lexicographic order of the stored strings matches
/// chronological order, which the event log's `ORDER BY timestamp` needs.
pub fn to_storage_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Truncate text to at most `max_chars` characters, appending an ellipsis
/// when anything was cut. Char-based so multi-byte content never splits.
pub fn truncate_preview(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let truncated: String = text.chars().take(max_chars).collect();
    format!("{}...", truncated)
}
