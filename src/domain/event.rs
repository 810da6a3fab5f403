use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::utils::helpers::sha256_hex;

/// One observed clipboard change.
///
/// The event is the unit of exchange in the whole pipeline: an agent creates
/// it from a local clipboard change, the hub persists it and fans it out,
/// and the other agents apply it. The same JSON shape is used on the push
/// endpoint, the history endpoint and the push channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClipboardEvent {
    /// Globally unique, generated by the producing agent before the event
    /// leaves its origin.
    pub event_id: String,
    pub source_device_id: String,
    /// UTC. Monotonic within a single agent, not globally ordered.
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    /// Free-form tag; only "text" is handled today. Unknown tags are stored
    /// untouched so new content types can be added without schema changes.
    #[serde(default = "default_content_type")]
    pub content_type: String,
    pub text: String,
    /// Hex-encoded SHA-256 of `text`. Recomputed by the hub when missing.
    #[serde(default)]
    pub text_hash: String,
}

fn default_content_type() -> String {
    "text".to_string()
}

impl ClipboardEvent {
    /// Build a new text event with a fresh id, current timestamp and a
    /// consistent hash.
    pub fn new_text(source_device_id: &str, text: String) -> Self {
        let mut event = Self {
            event_id: Uuid::new_v4().to_string(),
            source_device_id: source_device_id.to_string(),
            timestamp: Utc::now(),
            content_type: default_content_type(),
            text,
            text_hash: String::new(),
        };
        event.set_text_hash();
        event
    }

    pub fn compute_text_hash(&self) -> String {
        sha256_hex(&self.text)
    }

    pub fn set_text_hash(&mut self) {
        self.text_hash = self.compute_text_hash();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_text_sets_consistent_hash() {
        let event = ClipboardEvent::new_text("laptop", "hello".to_string());
        assert_eq!(
            event.text_hash,
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
        assert_eq!(event.text_hash, event.compute_text_hash());
        assert_eq!(event.content_type, "text");
        assert!(!event.event_id.is_empty());
    }

    #[test]
    fn test_unique_event_ids() {
        let a = ClipboardEvent::new_text("laptop", "x".to_string());
        let b = ClipboardEvent::new_text("laptop", "x".to_string());
        assert_ne!(a.event_id, b.event_id);
    }

    #[test]
    fn test_deserialize_fills_defaults() {
        // A minimal payload without timestamp, content_type or hash must
        // still parse; normalization happens later in the event log.
        let json = r#"{"event_id":"e1","source_device_id":"a","text":"hi"}"#;
        let event: ClipboardEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.content_type, "text");
        assert_eq!(event.text_hash, "");
        assert_eq!(event.text, "hi");
    }

    #[test]
    fn test_wire_round_trip() {
        let event = ClipboardEvent::new_text("desktop", "clip content".to_string());
        let json = serde_json::to_string(&event).unwrap();
        let parsed: ClipboardEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, event);
    }
}
