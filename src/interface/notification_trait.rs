/// Seam over the desktop notification backend.
///
/// A notification failure must never disturb sync, so the contract is
/// fire-and-forget: implementations log their own errors.
pub trait Notifier: Send + Sync {
    /// Announce clipboard content freshly applied from another device.
    /// `preview` is already truncated by the caller.
    fn notify(&self, source_device: &str, preview: &str);
}
