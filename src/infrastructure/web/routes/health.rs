use serde_json::json;
use warp::Filter;

/// Liveness probe. The only unauthenticated endpoint.
pub fn route() -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path!("api" / "v1" / "health")
        .and(warp::get())
        .map(|| warp::reply::json(&json!({ "status": "ok" })))
}
