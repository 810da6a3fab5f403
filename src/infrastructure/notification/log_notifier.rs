use log::info;

use crate::interface::Notifier;

/// Notifier that writes to the log instead of the desktop.
///
/// The desktop toast backend is platform glue behind the `Notifier` seam;
/// this implementation keeps headless installs (and tests) working and is
/// what the agent wires by default.
pub struct LogNotifier;

impl LogNotifier {
    pub fn new() -> Self {
        LogNotifier
    }
}

impl Default for LogNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier for LogNotifier {
    fn notify(&self, source_device: &str, preview: &str) {
        info!("clipboard synced from {}: {}", source_device, preview);
    }
}
