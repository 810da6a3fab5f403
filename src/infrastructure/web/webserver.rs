use anyhow::{Context, Result};
use log::info;
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use warp::{Filter, Rejection, Reply};

use crate::application::{DeviceManager, EventLogManager};
use crate::config::HubSetting;
use crate::core::ContentHandlerRegistry;
use crate::infrastructure::connection::Broadcaster;
use crate::infrastructure::security::token::{authenticate, AUTH_HEADER};
use crate::infrastructure::web::rejection::{handle_rejection, Unauthorized};

/// Everything the request handlers share. Cheap to clone per request.
#[derive(Clone)]
pub struct HubDeps {
    pub auth_token: String,
    pub event_log: Arc<EventLogManager>,
    pub devices: Arc<DeviceManager>,
    pub broadcaster: Arc<Broadcaster>,
    pub handlers: Arc<ContentHandlerRegistry>,
}

pub(crate) fn with_deps(
    deps: HubDeps,
) -> impl Filter<Extract = (HubDeps,), Error = std::convert::Infallible> + Clone {
    warp::any().map(move || deps.clone())
}

#[derive(Debug, Deserialize)]
struct AuthQuery {
    token: Option<String>,
}

/// Requires the shared secret: the X-Auth-Token header first, the `token`
/// query parameter as fallback. Rejects with 401 before any body parsing.
pub(crate) fn with_auth(
    expected: String,
) -> impl Filter<Extract = (), Error = Rejection> + Clone {
    warp::header::optional::<String>(AUTH_HEADER)
        .and(warp::query::<AuthQuery>())
        .and_then(move |header: Option<String>, query: AuthQuery| {
            let expected = expected.clone();
            async move {
                if authenticate(&expected, header.as_deref(), query.token.as_deref()) {
                    Ok(())
                } else {
                    Err(warp::reject::custom(Unauthorized))
                }
            }
        })
        .untuple_one()
}

/// The full hub API surface.
pub fn routes(deps: HubDeps) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    super::routes::clipboard::push_route(&deps)
        .or(super::routes::clipboard::history_route(&deps))
        .or(super::routes::device::register_route(&deps))
        .or(super::routes::health::route())
        .or(super::handlers::websocket::ws_route(&deps))
}

/// Bind and serve until the shutdown future resolves. Bind failures are
/// fatal and surface to the caller; there is nothing to recover.
pub async fn run(
    setting: &HubSetting,
    deps: HubDeps,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", setting.listen_ip, setting.listen_port)
        .parse()
        .with_context(|| {
            format!(
                "invalid listen address {}:{}",
                setting.listen_ip, setting.listen_port
            )
        })?;

    let filter = routes(deps).recover(handle_rejection);
    let (bound, server) = warp::serve(filter)
        .try_bind_with_graceful_shutdown(addr, shutdown)
        .with_context(|| format!("failed to bind {}", addr))?;

    info!("hub listening on {}", bound);
    server.await;
    info!("hub server stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::event::ClipboardEvent;
    use crate::infrastructure::storage::db::pool::DB_POOL;
    use crate::utils::helpers::sha256_hex;
    use chrono::{TimeZone, Utc};
    use serde_json::{json, Value};
    use serial_test::serial;
    use std::time::Duration;
    use tempfile::TempDir;

    const TOKEN: &str = "test-secret";

    fn test_deps(dir: &TempDir) -> HubDeps {
        let db_path = dir.path().join("hub.db");
        DB_POOL.init(db_path.to_str().unwrap()).unwrap();
        HubDeps {
            auth_token: TOKEN.to_string(),
            event_log: Arc::new(EventLogManager::new(1000, 30)),
            devices: Arc::new(DeviceManager::new()),
            broadcaster: Arc::new(Broadcaster::new()),
            handlers: Arc::new(ContentHandlerRegistry::with_defaults()),
        }
    }

    fn sample_event(event_id: &str, source: &str, text: &str) -> Value {
        json!({
            "event_id": event_id,
            "source_device_id": source,
            "timestamp": "2025-06-01T10:00:00Z",
            "content_type": "text",
            "text": text,
            "text_hash": sha256_hex(text),
        })
    }

    #[tokio::test]
    #[serial]
    async fn test_health_needs_no_auth() {
        let dir = TempDir::new().unwrap();
        let api = routes(test_deps(&dir));

        let resp = warp::test::request()
            .method("GET")
            .path("/api/v1/health")
            .reply(&api)
            .await;
        assert_eq!(resp.status(), 200);
        let body: Value = serde_json::from_slice(resp.body()).unwrap();
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    #[serial]
    async fn test_push_without_token_is_rejected() {
        let dir = TempDir::new().unwrap();
        let deps = test_deps(&dir);
        let api = routes(deps.clone()).recover(handle_rejection);

        let resp = warp::test::request()
            .method("POST")
            .path("/api/v1/clipboard/push")
            .json(&sample_event("e1", "a", "hello"))
            .reply(&api)
            .await;
        assert_eq!(resp.status(), 401);

        // Storage must not have been touched.
        assert!(deps.event_log.recent(50).unwrap().is_empty());
    }

    #[tokio::test]
    #[serial]
    async fn test_push_stores_and_history_returns() {
        let dir = TempDir::new().unwrap();
        let api = routes(test_deps(&dir)).recover(handle_rejection);

        let resp = warp::test::request()
            .method("POST")
            .path("/api/v1/clipboard/push")
            .header("x-auth-token", TOKEN)
            .json(&sample_event("e1", "a", "hello"))
            .reply(&api)
            .await;
        assert_eq!(resp.status(), 201);
        let body: Value = serde_json::from_slice(resp.body()).unwrap();
        assert_eq!(body["status"], "ok");

        let resp = warp::test::request()
            .method("GET")
            .path("/api/v1/history")
            .header("x-auth-token", TOKEN)
            .reply(&api)
            .await;
        assert_eq!(resp.status(), 200);
        let events: Vec<ClipboardEvent> = serde_json::from_slice(resp.body()).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_id, "e1");
        assert_eq!(events[0].text, "hello");
        assert_eq!(
            events[0].text_hash,
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[tokio::test]
    #[serial]
    async fn test_push_normalizes_missing_hash() {
        let dir = TempDir::new().unwrap();
        let api = routes(test_deps(&dir)).recover(handle_rejection);

        let resp = warp::test::request()
            .method("POST")
            .path("/api/v1/clipboard/push")
            .header("x-auth-token", TOKEN)
            .json(&json!({
                "event_id": "e-nohash",
                "source_device_id": "a",
                "text": "hello",
            }))
            .reply(&api)
            .await;
        assert_eq!(resp.status(), 201);

        let resp = warp::test::request()
            .method("GET")
            .path("/api/v1/history")
            .header("x-auth-token", TOKEN)
            .reply(&api)
            .await;
        let events: Vec<ClipboardEvent> = serde_json::from_slice(resp.body()).unwrap();
        assert_eq!(events[0].text_hash, sha256_hex("hello"));
    }

    #[tokio::test]
    #[serial]
    async fn test_duplicate_push_is_absorbed() {
        let dir = TempDir::new().unwrap();
        let api = routes(test_deps(&dir)).recover(handle_rejection);
        let event = sample_event("e-dup", "a", "hello");

        for _ in 0..2 {
            let resp = warp::test::request()
                .method("POST")
                .path("/api/v1/clipboard/push")
                .header("x-auth-token", TOKEN)
                .json(&event)
                .reply(&api)
                .await;
            assert_eq!(resp.status(), 201);
        }

        let resp = warp::test::request()
            .method("GET")
            .path("/api/v1/history")
            .header("x-auth-token", TOKEN)
            .reply(&api)
            .await;
        let events: Vec<ClipboardEvent> = serde_json::from_slice(resp.body()).unwrap();
        assert_eq!(events.len(), 1);
    }

    #[tokio::test]
    #[serial]
    async fn test_history_caps_at_fifty_newest_first() {
        let dir = TempDir::new().unwrap();
        let deps = test_deps(&dir);
        let api = routes(deps.clone()).recover(handle_rejection);

        for i in 0..75 {
            let mut event = ClipboardEvent::new_text("a", format!("clip {}", i));
            event.timestamp = Utc.with_ymd_and_hms(2025, 6, 1, 10, 0, 0).unwrap()
                + chrono::Duration::seconds(i);
            deps.event_log.insert(event).unwrap();
        }

        let resp = warp::test::request()
            .method("GET")
            .path("/api/v1/history")
            .header("x-auth-token", TOKEN)
            .reply(&api)
            .await;
        let events: Vec<ClipboardEvent> = serde_json::from_slice(resp.body()).unwrap();
        assert_eq!(events.len(), 50);
        for pair in events.windows(2) {
            assert!(pair[0].timestamp > pair[1].timestamp);
        }
        assert_eq!(events[0].text, "clip 74");
    }

    #[tokio::test]
    #[serial]
    async fn test_method_mismatch_is_405() {
        let dir = TempDir::new().unwrap();
        let api = routes(test_deps(&dir)).recover(handle_rejection);

        let resp = warp::test::request()
            .method("GET")
            .path("/api/v1/clipboard/push")
            .header("x-auth-token", TOKEN)
            .reply(&api)
            .await;
        assert_eq!(resp.status(), 405);
    }

    #[tokio::test]
    #[serial]
    async fn test_malformed_json_is_400() {
        let dir = TempDir::new().unwrap();
        let api = routes(test_deps(&dir)).recover(handle_rejection);

        let resp = warp::test::request()
            .method("POST")
            .path("/api/v1/clipboard/push")
            .header("x-auth-token", TOKEN)
            .body("this is not json")
            .reply(&api)
            .await;
        assert_eq!(resp.status(), 400);
    }

    #[tokio::test]
    #[serial]
    async fn test_empty_text_is_400() {
        let dir = TempDir::new().unwrap();
        let api = routes(test_deps(&dir)).recover(handle_rejection);

        let resp = warp::test::request()
            .method("POST")
            .path("/api/v1/clipboard/push")
            .header("x-auth-token", TOKEN)
            .json(&sample_event("e-empty", "a", ""))
            .reply(&api)
            .await;
        assert_eq!(resp.status(), 400);
    }

    #[tokio::test]
    #[serial]
    async fn test_register_device() {
        let dir = TempDir::new().unwrap();
        let deps = test_deps(&dir);
        let api = routes(deps.clone()).recover(handle_rejection);

        let resp = warp::test::request()
            .method("POST")
            .path("/api/v1/device/register")
            .header("x-auth-token", TOKEN)
            .json(&json!({
                "device_id": "laptop",
                "device_name": "Laptop",
                "tailscale_ip": "100.64.0.2",
            }))
            .reply(&api)
            .await;
        assert_eq!(resp.status(), 201);
        let body: Value = serde_json::from_slice(resp.body()).unwrap();
        assert_eq!(body["status"], "registered");

        let device = deps.devices.get("laptop").unwrap().unwrap();
        assert_eq!(device.device_name, "Laptop");
        assert!(device.is_online());
    }

    // --- push channel -----------------------------------------------------

    async fn assert_channel_closed(client: &mut warp::test::WsClient) {
        match client.recv().await {
            Err(_) => {}
            Ok(msg) => assert!(msg.is_close(), "expected close, got {:?}", msg),
        }
    }

    #[tokio::test]
    #[serial]
    async fn test_ws_requires_token_and_device_id() {
        let dir = TempDir::new().unwrap();
        let api = routes(test_deps(&dir));

        assert!(warp::test::ws()
            .path("/api/v1/ws?token=wrong&device_id=b")
            .handshake(api.clone())
            .await
            .is_err());

        assert!(warp::test::ws()
            .path(&format!("/api/v1/ws?token={}", TOKEN))
            .handshake(api.clone())
            .await
            .is_err());
    }

    #[tokio::test]
    #[serial]
    async fn test_broadcast_skips_origin_and_reaches_peers() {
        let dir = TempDir::new().unwrap();
        let deps = test_deps(&dir);
        let api = routes(deps.clone());
        let api_with_recover = routes(deps.clone()).recover(handle_rejection);

        let mut client_a = warp::test::ws()
            .path(&format!("/api/v1/ws?token={}&device_id=a", TOKEN))
            .handshake(api.clone())
            .await
            .expect("handshake a");
        let mut client_b = warp::test::ws()
            .path(&format!("/api/v1/ws?token={}&device_id=b", TOKEN))
            .handshake(api.clone())
            .await
            .expect("handshake b");

        // Wait until both channels are registered.
        for _ in 0..50 {
            if deps.broadcaster.count().await == 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(deps.broadcaster.count().await, 2);

        let resp = warp::test::request()
            .method("POST")
            .path("/api/v1/clipboard/push")
            .header("x-auth-token", TOKEN)
            .json(&sample_event("e-ws", "a", "hello"))
            .reply(&api_with_recover)
            .await;
        assert_eq!(resp.status(), 201);

        // Peer b receives exactly the stored event.
        let msg = client_b.recv().await.expect("b should receive");
        let received: ClipboardEvent = serde_json::from_str(msg.to_str().unwrap()).unwrap();
        assert_eq!(received.event_id, "e-ws");
        assert_eq!(received.text, "hello");

        // Origin a receives nothing.
        let nothing = tokio::time::timeout(Duration::from_millis(300), client_a.recv()).await;
        assert!(nothing.is_err(), "origin must not receive its own event");
    }

    #[tokio::test]
    #[serial]
    async fn test_reconnect_replaces_previous_channel() {
        let dir = TempDir::new().unwrap();
        let deps = test_deps(&dir);
        let api = routes(deps.clone());
        let api_with_recover = routes(deps.clone()).recover(handle_rejection);

        let mut first = warp::test::ws()
            .path(&format!("/api/v1/ws?token={}&device_id=a", TOKEN))
            .handshake(api.clone())
            .await
            .expect("handshake 1");
        for _ in 0..50 {
            if deps.broadcaster.count().await == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        let mut second = warp::test::ws()
            .path(&format!("/api/v1/ws?token={}&device_id=a", TOKEN))
            .handshake(api.clone())
            .await
            .expect("handshake 2");

        // The old channel is closed; the map still holds exactly one entry.
        assert_channel_closed(&mut first).await;
        for _ in 0..50 {
            if deps.broadcaster.count().await == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(deps.broadcaster.count().await, 1);

        let resp = warp::test::request()
            .method("POST")
            .path("/api/v1/clipboard/push")
            .header("x-auth-token", TOKEN)
            .json(&sample_event("e-reconnect", "b", "from b"))
            .reply(&api_with_recover)
            .await;
        assert_eq!(resp.status(), 201);

        let msg = second.recv().await.expect("second channel should receive");
        let received: ClipboardEvent = serde_json::from_str(msg.to_str().unwrap()).unwrap();
        assert_eq!(received.event_id, "e-reconnect");
    }
}
