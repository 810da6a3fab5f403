use futures::StreamExt;
use log::{debug, info};
use serde::Deserialize;
use std::sync::Arc;
use warp::ws::WebSocket;
use warp::{Filter, Rejection, Reply};

use crate::infrastructure::connection::Broadcaster;
use crate::infrastructure::security::token::validate_token;
use crate::infrastructure::web::rejection::{MissingDeviceId, Unauthorized};
use crate::infrastructure::web::webserver::HubDeps;

#[derive(Debug, Deserialize)]
struct WsQuery {
    token: Option<String>,
    device_id: Option<String>,
}

/// GET /api/v1/ws: the push-channel upgrade.
///
/// Auth comes from the query string because custom headers are not portable
/// on upgrade handshakes. Origin checks are intentionally absent: the
/// private overlay network is the trust boundary.
pub fn ws_route(deps: &HubDeps) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    let auth_token = deps.auth_token.clone();
    let broadcaster = deps.broadcaster.clone();

    warp::path!("api" / "v1" / "ws")
        .and(warp::get())
        .and(warp::query::<WsQuery>())
        .and(warp::ws())
        .and_then(move |query: WsQuery, ws: warp::ws::Ws| {
            let auth_token = auth_token.clone();
            let broadcaster = broadcaster.clone();
            async move {
                if !validate_token(&auth_token, query.token.as_deref().unwrap_or("")) {
                    return Err(warp::reject::custom(Unauthorized));
                }
                let device_id = match query.device_id.filter(|id| !id.is_empty()) {
                    Some(id) => id,
                    None => return Err(warp::reject::custom(MissingDeviceId)),
                };

                Ok::<_, Rejection>(ws.on_upgrade(move |socket| {
                    client_connected(socket, device_id, broadcaster)
                }))
            }
        })
}

/// Owns the channel from upgrade to teardown. The read loop exists only to
/// detect disconnection: agents push over HTTP, so inbound frames carry no
/// meaning and are discarded.
async fn client_connected(socket: WebSocket, device_id: String, broadcaster: Arc<Broadcaster>) {
    let (sink, mut stream) = socket.split();
    let token = broadcaster.add(&device_id, sink).await;
    info!("push channel connected: device={}", device_id);

    while let Some(frame) = stream.next().await {
        match frame {
            Ok(msg) if msg.is_close() => break,
            Ok(_) => continue,
            Err(e) => {
                debug!("push channel read error for {}: {}", device_id, e);
                break;
            }
        }
    }

    broadcaster.remove(&device_id, token).await;
    info!("push channel disconnected: device={}", device_id);
}
