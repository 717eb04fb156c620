//! Static API key check for the ingestion endpoint

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tracing::debug;

use crate::api::ApiError;
use crate::sinks::cloud::API_KEY_HEADER;

/// Rejects requests whose `x-api-key` header does not match `expected_key`.
pub async fn require_api_key(
    State(expected_key): State<Arc<str>>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let provided = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("Missing API key".into()))?;

    if provided != &*expected_key {
        debug!("rejected request with invalid API key");
        return Err(ApiError::Unauthorized("Invalid API key".into()));
    }

    Ok(next.run(request).await)
}
