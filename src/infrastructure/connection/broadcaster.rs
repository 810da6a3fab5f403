use futures::stream::SplitSink;
use futures::SinkExt;
use log::{debug, error, info, warn};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;
use warp::ws::{Message, WebSocket};

use crate::domain::event::ClipboardEvent;

type WsSink = SplitSink<WebSocket, Message>;

/// One live push channel. The sink is the write half only; the read half
/// stays with the read loop that owns the connection's lifecycle.
struct ConnectionRecord {
    /// Distinguishes this channel from any replacement registered under the
    /// same device id, so a terminating read loop can never evict its own
    /// successor.
    token: u64,
    sink: Mutex<WsSink>,
}

/// Fan-out of clipboard events to every connected agent except the origin.
///
/// At most one channel per device id: `add` with an existing key closes the
/// previous channel before installing the new one, giving seamless
/// reconnection without duplicate delivery.
pub struct Broadcaster {
    connections: Mutex<HashMap<String, ConnectionRecord>>,
    next_token: AtomicU64,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self {
            connections: Mutex::new(HashMap::new()),
            next_token: AtomicU64::new(1),
        }
    }

    /// Register (or replace) the push channel for a device. Returns a token
    /// the read loop must hand back to `remove` on termination.
    pub async fn add(&self, device_id: &str, sink: WsSink) -> u64 {
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        let record = ConnectionRecord {
            token,
            sink: Mutex::new(sink),
        };

        let previous = {
            let mut connections = self.connections.lock().await;
            let previous = connections.insert(device_id.to_string(), record);
            info!(
                "push channel added: {} (total: {})",
                device_id,
                connections.len()
            );
            previous
        };

        if let Some(previous) = previous {
            warn!("replacing existing push channel for device {}", device_id);
            let mut sink = previous.sink.into_inner();
            if let Err(e) = sink.close().await {
                debug!("error closing replaced channel for {}: {}", device_id, e);
            }
        }

        token
    }

    /// Unregister a channel on read-side termination. The token guards
    /// against a replacement installed while the old read loop was still
    /// draining: a stale token leaves the map untouched.
    pub async fn remove(&self, device_id: &str, token: u64) {
        let removed = {
            let mut connections = self.connections.lock().await;
            match connections.get(device_id) {
                Some(record) if record.token == token => connections.remove(device_id),
                _ => None,
            }
        };

        if let Some(record) = removed {
            let mut sink = record.sink.into_inner();
            if let Err(e) = sink.close().await {
                debug!("error closing channel for {}: {}", device_id, e);
            }
            info!("push channel removed: {}", device_id);
        }
    }

    /// Send one event to every channel whose device id differs from the
    /// origin. The payload is serialized once; a write failure is logged
    /// and the channel is left in place, since its read loop has the
    /// authoritative view of liveness and will remove it.
    pub async fn broadcast(&self, event: &ClipboardEvent, source_device_id: &str) {
        let payload = match serde_json::to_string(event) {
            Ok(payload) => payload,
            Err(e) => {
                error!("failed to serialize event {}: {}", event.event_id, e);
                return;
            }
        };

        let connections = self.connections.lock().await;
        let mut sent = 0;
        for (device_id, record) in connections.iter() {
            if device_id == source_device_id {
                continue;
            }
            let mut sink = record.sink.lock().await;
            if let Err(e) = sink.send(Message::text(payload.clone())).await {
                error!("failed to broadcast to {}: {}", device_id, e);
                continue;
            }
            sent += 1;
        }

        if sent > 0 {
            info!(
                "broadcast event {} to {} client(s) (source: {})",
                event.event_id, sent, source_device_id
            );
        }
    }

    pub async fn count(&self) -> usize {
        self.connections.lock().await.len()
    }
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new()
    }
}
