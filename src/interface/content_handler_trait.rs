use anyhow::Result;

/// Per-content-type validation hook.
///
/// The event schema keeps `content_type` a free-form string; adding a new
/// content type means implementing this trait and registering it, with no
/// change to the existing paths.
pub trait ContentHandler: Send + Sync {
    fn can_handle(&self, content_type: &str) -> bool;

    /// Validate an inbound payload of this type. Errors surface as a 400 at
    /// the hub ingress.
    fn process(&self, payload: &str) -> Result<()>;

    fn type_tag(&self) -> &'static str;
}
