use anyhow::{bail, Result};

use crate::interface::ContentHandler;

/// Upper bound for a text payload. Generous for text while keeping SQLite
/// rows and broadcast frames bounded.
pub const MAX_TEXT_LENGTH: usize = 1024 * 1024;

/// Validates plain-text clipboard payloads.
pub struct TextHandler;

impl TextHandler {
    pub fn new() -> Self {
        TextHandler
    }
}

impl Default for TextHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentHandler for TextHandler {
    fn can_handle(&self, content_type: &str) -> bool {
        content_type.eq_ignore_ascii_case("text")
    }

    fn process(&self, payload: &str) -> Result<()> {
        if payload.trim().is_empty() {
            bail!("text content is empty");
        }
        if payload.len() > MAX_TEXT_LENGTH {
            bail!(
                "text content exceeds maximum length of {} bytes",
                MAX_TEXT_LENGTH
            );
        }
        Ok(())
    }

    fn type_tag(&self) -> &'static str {
        "text"
    }
}

/// Registry of content handlers keyed by content-type tag.
///
/// Content types without a registered handler pass through unvalidated;
/// the hub stores them as-is for forward compatibility.
pub struct ContentHandlerRegistry {
    handlers: Vec<Box<dyn ContentHandler>>,
}

impl ContentHandlerRegistry {
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    /// Registry with every built-in handler installed.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(TextHandler::new()));
        registry
    }

    pub fn register(&mut self, handler: Box<dyn ContentHandler>) {
        self.handlers.push(handler);
    }

    pub fn find(&self, content_type: &str) -> Option<&dyn ContentHandler> {
        self.handlers
            .iter()
            .find(|h| h.can_handle(content_type))
            .map(|h| h.as_ref())
    }
}

impl Default for ContentHandlerRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_handler_accepts_normal_text() {
        let handler = TextHandler::new();
        assert!(handler.can_handle("text"));
        assert!(handler.can_handle("TEXT"));
        assert!(!handler.can_handle("image"));
        assert!(handler.process("hello").is_ok());
    }

    #[test]
    fn test_text_handler_rejects_empty() {
        let handler = TextHandler::new();
        assert!(handler.process("").is_err());
        assert!(handler.process("   \n\t").is_err());
    }

    #[test]
    fn test_text_handler_rejects_oversized() {
        let handler = TextHandler::new();
        let oversized = "a".repeat(MAX_TEXT_LENGTH + 1);
        assert!(handler.process(&oversized).is_err());
        let at_limit = "a".repeat(MAX_TEXT_LENGTH);
        assert!(handler.process(&at_limit).is_ok());
    }

    #[test]
    fn test_registry_lookup() {
        let registry = ContentHandlerRegistry::with_defaults();
        assert_eq!(registry.find("text").unwrap().type_tag(), "text");
        assert!(registry.find("image").is_none());
    }
}
