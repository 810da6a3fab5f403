pub mod content_handler_trait;
pub mod local_clipboard_trait;
pub mod notification_trait;
pub mod remote_sync_trait;

pub use content_handler_trait::ContentHandler;
pub use local_clipboard_trait::LocalClipboardTrait;
pub use notification_trait::Notifier;
pub use remote_sync_trait::RemoteSyncTrait;
