use anyhow::{anyhow, Result};
use async_trait::async_trait;
use clipboard_rs::{Clipboard, ClipboardContext};
use std::sync::{Arc, Mutex};

use crate::interface::LocalClipboardTrait;

/// System clipboard access via clipboard-rs.
///
/// The context is not re-entrant, so a mutex serializes every access. The
/// calls are short syscalls; nothing holds the lock across an await.
pub struct LocalClipboard {
    ctx: Arc<Mutex<ClipboardContext>>,
}

impl LocalClipboard {
    pub fn new() -> Result<Self> {
        let ctx = ClipboardContext::new()
            .map_err(|e| anyhow!("failed to open system clipboard: {}", e))?;
        Ok(Self {
            ctx: Arc::new(Mutex::new(ctx)),
        })
    }
}

#[async_trait]
impl LocalClipboardTrait for LocalClipboard {
    async fn read_text(&self) -> Result<String> {
        let ctx = self.ctx.lock().unwrap();
        // An empty clipboard surfaces as an error on some platforms;
        // callers treat empty text and read failure the same way.
        ctx.get_text()
            .map_err(|e| anyhow!("failed to read clipboard: {}", e))
    }

    async fn write_text(&self, text: &str) -> Result<()> {
        let ctx = self.ctx.lock().unwrap();
        ctx.set_text(text.to_string())
            .map_err(|e| anyhow!("failed to write clipboard: {}", e))
    }
}
