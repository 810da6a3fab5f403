use anyhow::Result;
use log::{debug, error, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::interval;

use crate::config::AgentSetting;
use crate::domain::device::Device;
use crate::domain::event::ClipboardEvent;
use crate::infrastructure::network::SyncClient;
use crate::interface::{LocalClipboardTrait, Notifier, RemoteSyncTrait};

/// Cache sweep cadence. Lazy expiration handles hot identifiers; the sweep
/// bounds memory for the ones never queried again.
const PRUNE_INTERVAL: Duration = Duration::from_secs(60);

/// Back-off before re-dialing a dead push channel.
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// The agent's two independent loops under one supervisor: the poll driver
/// (local clipboard → hub) and the push-channel consumer (hub → local
/// clipboard). Neither blocks the other; the consumer is restarted with a
/// delay whenever its connection dies.
pub struct TailClipAgent {
    setting: AgentSetting,
    clipboard: Arc<dyn LocalClipboardTrait>,
    sync: Arc<SyncClient>,
    notifier: Arc<dyn Notifier>,
}

impl TailClipAgent {
    pub fn new(
        setting: AgentSetting,
        clipboard: Arc<dyn LocalClipboardTrait>,
        sync: Arc<SyncClient>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            setting,
            clipboard,
            sync,
            notifier,
        }
    }

    /// Run until a shutdown signal arrives.
    pub async fn run(&self) -> Result<()> {
        let device = Device::new(
            self.setting.device_id.clone(),
            self.setting.device_name.clone(),
            None,
        );
        if let Err(e) = self.sync.register_device(&device).await {
            warn!("device registration failed: {:#}", e);
        }

        let mut consumer = self.spawn_consumer();
        info!("push channel consumer started");

        // Seed with the current content so whatever is already on the
        // clipboard at startup is not treated as a fresh change.
        let mut last_hash = self.clipboard.content_hash().await;

        let mut poll = interval(self.setting.poll_interval());
        let mut prune = interval(PRUNE_INTERVAL);
        info!(
            "clipboard polling started (interval: {}ms)",
            self.setting.poll_interval_ms
        );

        loop {
            tokio::select! {
                _ = poll.tick() => {
                    Self::poll_once(
                        self.clipboard.as_ref(),
                        self.sync.as_ref(),
                        &self.setting.device_id,
                        &mut last_hash,
                    )
                    .await;
                }
                _ = prune.tick() => {
                    self.sync.prune_cache();
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("shutdown signal received, stopping agent");
                    break;
                }
                _ = &mut consumer => {
                    warn!(
                        "push channel terminated, reconnecting in {}s",
                        RECONNECT_DELAY.as_secs()
                    );
                    tokio::time::sleep(RECONNECT_DELAY).await;
                    consumer = self.spawn_consumer();
                }
            }
        }

        consumer.abort();
        Ok(())
    }

    fn spawn_consumer(&self) -> JoinHandle<()> {
        let sync = self.sync.clone();
        let clipboard = self.clipboard.clone();
        let notifier = self.notifier.clone();
        let notify_enabled = self.setting.notify_enabled;

        tokio::spawn(async move {
            match sync.connect_push_channel().await {
                Ok(channel) => {
                    sync.receive(
                        channel,
                        clipboard.as_ref(),
                        notifier.as_ref(),
                        notify_enabled,
                    )
                    .await;
                }
                Err(e) => error!("push channel connection failed: {:#}", e),
            }
        })
    }

    /// One poll tick: detect a clipboard change by hash, decide whether it
    /// is user-originated (push it) or sync-originated (drop it).
    async fn poll_once(
        clipboard: &dyn LocalClipboardTrait,
        sync: &dyn RemoteSyncTrait,
        device_id: &str,
        last_hash: &mut String,
    ) {
        let current_hash = clipboard.content_hash().await;
        if current_hash.is_empty() || current_hash == *last_hash {
            return;
        }

        // Move the marker before any network work; a slow or failing push
        // must not cause the same change to be re-detected every tick.
        *last_hash = current_hash.clone();

        // A hash in the cache means our own remote-apply wrote this
        // content; pushing it back would close the loop.
        if sync.is_cached(&current_hash) {
            debug!("skipping sync-originated clipboard change");
            return;
        }

        let text = match clipboard.read_text().await {
            Ok(text) if !text.is_empty() => text,
            Ok(_) => return,
            Err(e) => {
                warn!("failed to read clipboard: {}", e);
                return;
            }
        };

        let event = ClipboardEvent::new_text(device_id, text);

        // Both identifiers go in before the push: the id catches the hub's
        // echo, the hash catches the change our own write provokes.
        sync.cache(&event.event_id);
        sync.cache(&event.text_hash);

        if let Err(e) = sync.push(&event).await {
            error!("failed to push to hub: {:#}", e);
        }
    }
}
