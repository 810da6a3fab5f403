use anyhow::Result;
use async_trait::async_trait;
use log::warn;

use crate::utils::helpers::sha256_hex;

/// Seam over the platform clipboard.
///
/// The poll driver and the push-channel consumer only ever touch the
/// clipboard through this trait, which keeps the sync core testable with an
/// in-memory fake and keeps OS specifics in one implementation.
#[async_trait]
pub trait LocalClipboardTrait: Send + Sync {
    async fn read_text(&self) -> Result<String>;

    async fn write_text(&self, text: &str) -> Result<()>;

    /// Hex SHA-256 of the current clipboard text; empty string when the
    /// clipboard is empty or unreadable. Read failures are treated as
    /// "no change" so a transient platform error never stalls polling.
    async fn content_hash(&self) -> String {
        match self.read_text().await {
            Ok(text) if !text.is_empty() => sha256_hex(&text),
            Ok(_) => String::new(),
            Err(e) => {
                warn!("failed to read clipboard: {}", e);
                String::new()
            }
        }
    }
}
