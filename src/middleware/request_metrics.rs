// Request counting and latency for every route

use crate::metrics;
use axum::{
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
};
use std::time::Instant;

pub async fn track_requests(req: Request, next: Next) -> Response {
    // Route templates keep label cardinality bounded
    let Some(path) = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
    else {
        return next.run(req).await;
    };
    let start = Instant::now();
    let method = req.method().to_string();

    let response = next.run(req).await;

    metrics::record_request(
        &method,
        &path,
        response.status().as_u16(),
        start.elapsed().as_secs_f64(),
    );
    response
}
