use log::{error, info, warn};
use serde_json::json;
use warp::http::StatusCode;
use warp::{Filter, Rejection, Reply};

use crate::domain::event::ClipboardEvent;
use crate::infrastructure::web::rejection::{InvalidPayload, StorageFailure};
use crate::infrastructure::web::webserver::{with_auth, with_deps, HubDeps};

/// Default page size for history catch-up.
const HISTORY_LIMIT: i64 = 50;

/// Bodies above this are rejected before JSON parsing. Leaves headroom over
/// the 1 MiB text cap for JSON escaping and the envelope fields.
const MAX_BODY_BYTES: u64 = 2 * 1024 * 1024;

/// POST /api/v1/clipboard/push
pub fn push_route(
    deps: &HubDeps,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path!("api" / "v1" / "clipboard" / "push")
        .and(warp::post())
        .and(with_auth(deps.auth_token.clone()))
        .and(warp::body::content_length_limit(MAX_BODY_BYTES))
        .and(warp::body::json())
        .and(with_deps(deps.clone()))
        .and_then(handle_push)
}

/// GET /api/v1/history
pub fn history_route(
    deps: &HubDeps,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path!("api" / "v1" / "history")
        .and(warp::get())
        .and(with_auth(deps.auth_token.clone()))
        .and(with_deps(deps.clone()))
        .and_then(handle_history)
}

/// The ordering here is the contract: validate, persist, then fan out.
/// Broadcasting before a successful insert would let a peer observe an
/// event that never shows up in history.
async fn handle_push(event: ClipboardEvent, deps: HubDeps) -> Result<impl Reply, Rejection> {
    if let Some(handler) = deps.handlers.find(&event.content_type) {
        handler
            .process(&event.text)
            .map_err(|e| warp::reject::custom(InvalidPayload(e.to_string())))?;
    }

    let (event, inserted) = deps.event_log.insert(event).map_err(|e| {
        error!("failed to store event: {:#}", e);
        warp::reject::custom(StorageFailure)
    })?;

    // Liveness piggybacks on pushes; a failure here must not fail the push.
    if let Err(e) = deps.devices.touch(&event.source_device_id) {
        warn!(
            "failed to update last-seen for {}: {:#}",
            event.source_device_id, e
        );
    }

    if inserted {
        info!(
            "event stored: id={} source={} type={}",
            event.event_id, event.source_device_id, event.content_type
        );
        deps.broadcaster
            .broadcast(&event, &event.source_device_id)
            .await;
    }

    Ok(warp::reply::with_status(
        warp::reply::json(&json!({ "status": "ok" })),
        StatusCode::CREATED,
    ))
}

async fn handle_history(deps: HubDeps) -> Result<impl Reply, Rejection> {
    let events = deps.event_log.recent(HISTORY_LIMIT).map_err(|e| {
        error!("failed to fetch history: {:#}", e);
        warp::reject::custom(StorageFailure)
    })?;
    Ok(warp::reply::json(&events))
}
