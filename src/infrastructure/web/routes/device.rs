use log::{error, info};
use serde_json::json;
use warp::http::StatusCode;
use warp::{Filter, Rejection, Reply};

use crate::domain::device::Device;
use crate::infrastructure::web::rejection::StorageFailure;
use crate::infrastructure::web::webserver::{with_auth, with_deps, HubDeps};

/// POST /api/v1/device/register
pub fn register_route(
    deps: &HubDeps,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path!("api" / "v1" / "device" / "register")
        .and(warp::post())
        .and(with_auth(deps.auth_token.clone()))
        .and(warp::body::json())
        .and(with_deps(deps.clone()))
        .and_then(handle_register)
}

async fn handle_register(device: Device, deps: HubDeps) -> Result<impl Reply, Rejection> {
    let device = deps.devices.register(device).map_err(|e| {
        error!("failed to register device: {:#}", e);
        warp::reject::custom(StorageFailure)
    })?;

    info!("device registered: {}", device);
    Ok(warp::reply::with_status(
        warp::reply::json(&json!({
            "status": "registered",
            "message": format!("device {} registered", device.device_id),
        })),
        StatusCode::CREATED,
    ))
}
