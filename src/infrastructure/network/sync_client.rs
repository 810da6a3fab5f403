use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use futures::StreamExt;
use log::{debug, error, info, warn};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message as TungsteniteMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use url::Url;

use crate::config::AgentSetting;
use crate::domain::device::Device;
use crate::domain::event::ClipboardEvent;
use crate::infrastructure::security::token::{AUTH_HEADER, AUTH_QUERY_PARAM};
use crate::infrastructure::sync::RecentEventCache;
use crate::interface::{LocalClipboardTrait, Notifier, RemoteSyncTrait};
use crate::utils::helpers::truncate_preview;

/// Long-lived server-push connection.
pub type PushChannel = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Identifiers older than this age no longer suppress a push.
const CACHE_MAX_AGE: Duration = Duration::from_secs(5 * 60);

/// Bound on a hung hub; a LAN round trip is far below this.
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Notification previews are clipped to this many characters.
const PREVIEW_MAX_CHARS: usize = 80;

/// All communication between the agent and the hub: pushing local events,
/// consuming the push channel, and the dedup cache that ties the two
/// directions together.
pub struct SyncClient {
    hub_url: String,
    auth_token: String,
    device_id: String,
    cache: RecentEventCache,
    client: reqwest::Client,
}

impl SyncClient {
    pub fn new(setting: &AgentSetting) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            hub_url: setting.hub_url.trim_end_matches('/').to_string(),
            auth_token: setting.auth_token.clone(),
            device_id: setting.device_id.clone(),
            cache: RecentEventCache::new(CACHE_MAX_AGE),
            client,
        })
    }

    /// Announce this device to the hub. Registration doubles as a
    /// heartbeat, so this is also called on every reconnect.
    pub async fn register_device(&self, device: &Device) -> Result<()> {
        let url = format!("{}/api/v1/device/register", self.hub_url);
        let resp = self
            .client
            .post(&url)
            .header(AUTH_HEADER, &self.auth_token)
            .json(device)
            .send()
            .await
            .context("register request failed")?;
        if resp.status() != reqwest::StatusCode::CREATED {
            bail!("hub returned status {} on register", resp.status());
        }
        info!("registered device {} with hub", device.device_id);
        Ok(())
    }

    /// Open the push channel: same host as the hub URL with the scheme
    /// switched to its WebSocket equivalent, credentials in the query
    /// string because upgrade handshakes can't carry custom headers
    /// portably.
    pub async fn connect_push_channel(&self) -> Result<PushChannel> {
        let mut url = Url::parse(&self.hub_url)
            .with_context(|| format!("invalid hub URL {}", self.hub_url))?;
        let scheme = match url.scheme() {
            "https" => "wss",
            _ => "ws",
        };
        url.set_scheme(scheme)
            .map_err(|_| anyhow!("cannot derive push channel scheme from {}", self.hub_url))?;
        url.set_path("/api/v1/ws");
        url.query_pairs_mut()
            .clear()
            .append_pair(AUTH_QUERY_PARAM, &self.auth_token)
            .append_pair("device_id", &self.device_id);

        let (channel, _) = connect_async(url.as_str())
            .await
            .context("push channel dial failed")?;
        info!("push channel connected to hub");
        Ok(channel)
    }

    /// Consume the push channel until it dies. Each text frame is one JSON
    /// event; a bad frame is logged and skipped so one malformed message
    /// never kills the loop. Read errors end the loop and the caller is
    /// expected to reconnect.
    pub async fn receive(
        &self,
        mut channel: PushChannel,
        clipboard: &dyn LocalClipboardTrait,
        notifier: &dyn Notifier,
        notify_enabled: bool,
    ) {
        while let Some(frame) = channel.next().await {
            match frame {
                Ok(TungsteniteMessage::Text(text)) => {
                    self.apply_remote_frame(&text, clipboard, notifier, notify_enabled)
                        .await;
                }
                Ok(TungsteniteMessage::Close(_)) => {
                    info!("push channel closed by hub");
                    break;
                }
                Ok(_) => continue,
                Err(e) => {
                    error!("push channel read error: {}", e);
                    break;
                }
            }
        }
    }

    /// Apply one inbound frame: drop own events, drop already-seen events,
    /// cache both identifiers before the clipboard write so the next poll
    /// tick recognizes the resulting change as sync-originated.
    async fn apply_remote_frame(
        &self,
        frame: &str,
        clipboard: &dyn LocalClipboardTrait,
        notifier: &dyn Notifier,
        notify_enabled: bool,
    ) {
        let event: ClipboardEvent = match serde_json::from_str(frame) {
            Ok(event) => event,
            Err(e) => {
                warn!("failed to parse push channel frame: {}", e);
                return;
            }
        };

        debug!(
            "push channel received event: id={} source={}",
            event.event_id, event.source_device_id
        );

        // The hub already skips the origin in broadcast; this is the second
        // of the two loop defenses.
        if event.source_device_id == self.device_id {
            debug!("skipping own event {}", event.event_id);
            return;
        }
        if self.cache.contains(&event.event_id) {
            return;
        }

        self.cache.add(&event.event_id);
        if !event.text_hash.is_empty() {
            self.cache.add(&event.text_hash);
        }

        if let Err(e) = clipboard.write_text(&event.text).await {
            error!("failed to write synced clipboard: {}", e);
            return;
        }

        info!(
            "synced clipboard from device {} (event {})",
            event.source_device_id, event.event_id
        );

        if notify_enabled {
            notifier.notify(
                &event.source_device_id,
                &truncate_preview(&event.text, PREVIEW_MAX_CHARS),
            );
        }
    }
}

#[async_trait]
impl RemoteSyncTrait for SyncClient {
    /// The cache insert precedes the network call: on a fast network the
    /// hub's broadcast can race ahead of the push response, and the echoed
    /// event must already be recognizable as our own.
    async fn push(&self, event: &ClipboardEvent) -> Result<()> {
        self.cache.add(&event.event_id);

        let url = format!("{}/api/v1/clipboard/push", self.hub_url);
        let resp = self
            .client
            .post(&url)
            .header(AUTH_HEADER, &self.auth_token)
            .json(event)
            .send()
            .await
            .context("push request failed")?;
        if resp.status() != reqwest::StatusCode::CREATED {
            bail!("hub returned status {} on push", resp.status());
        }

        debug!("pushed event {} to hub", event.event_id);
        Ok(())
    }

    fn is_cached(&self, id: &str) -> bool {
        self.cache.contains(id)
    }

    fn cache(&self, id: &str) {
        self.cache.add(id);
    }

    fn prune_cache(&self) {
        self.cache.prune();
    }
}
