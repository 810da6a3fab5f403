use log::error;
use serde::Serialize;
use std::convert::Infallible;
use warp::http::StatusCode;
use warp::reject::Reject;
use warp::{Rejection, Reply};

/// Shared secret missing or wrong.
#[derive(Debug)]
pub struct Unauthorized;
impl Reject for Unauthorized {}

/// Push-channel upgrade without the mandatory device_id query parameter.
#[derive(Debug)]
pub struct MissingDeviceId;
impl Reject for MissingDeviceId {}

/// Payload failed content validation.
#[derive(Debug)]
pub struct InvalidPayload(pub String);
impl Reject for InvalidPayload {}

/// The event log or device registry could not complete a storage operation.
#[derive(Debug)]
pub struct StorageFailure;
impl Reject for StorageFailure {}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

/// Collapse every rejection into the status codes the API contract names:
/// 401 auth, 400 protocol, 405 method mismatch, 500 storage.
pub async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let (code, message) = if err.is_not_found() {
        (StatusCode::NOT_FOUND, "not found".to_string())
    } else if err.find::<Unauthorized>().is_some() {
        (StatusCode::UNAUTHORIZED, "unauthorized".to_string())
    } else if err.find::<MissingDeviceId>().is_some() {
        (
            StatusCode::BAD_REQUEST,
            "device_id query parameter required".to_string(),
        )
    } else if let Some(invalid) = err.find::<InvalidPayload>() {
        (StatusCode::BAD_REQUEST, invalid.0.clone())
    } else if err
        .find::<warp::filters::body::BodyDeserializeError>()
        .is_some()
    {
        (StatusCode::BAD_REQUEST, "invalid JSON body".to_string())
    } else if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        (StatusCode::BAD_REQUEST, "payload too large".to_string())
    } else if err.find::<warp::reject::UnsupportedMediaType>().is_some() {
        (
            StatusCode::BAD_REQUEST,
            "unsupported content type".to_string(),
        )
    } else if err.find::<warp::reject::InvalidQuery>().is_some() {
        (StatusCode::BAD_REQUEST, "invalid query string".to_string())
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (
            StatusCode::METHOD_NOT_ALLOWED,
            "method not allowed".to_string(),
        )
    } else if err.find::<StorageFailure>().is_some() {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "storage failure".to_string(),
        )
    } else {
        error!("unhandled rejection: {:?}", err);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal error".to_string(),
        )
    };

    let body = warp::reply::json(&ErrorBody { error: message });
    Ok(warp::reply::with_status(body, code))
}
