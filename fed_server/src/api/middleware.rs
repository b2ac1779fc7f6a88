//! Organizer authentication and request metrics middleware.
//!
//! Tournament reads are public. Every other method changes a tournament and,
//! when the server is configured with `ORGANIZER_TOKEN_SHA256`, must carry
//! the organizer token:
//!
//! ```text
//! Authorization: Bearer <organizer token>
//! ```
//!
//! Only the SHA-256 of the token is kept in configuration.

use axum::{
    extract::{MatchedPath, Request, State},
    http::{Method, StatusCode, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};
use sha2::{Digest, Sha256};
use std::time::Instant;

use super::AppState;
use crate::metrics;

/// Hex SHA-256 of a bearer token, the form stored in `ORGANIZER_TOKEN_SHA256`
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

fn is_read_only(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

/// Rejects mutating requests that lack the organizer token.
///
/// # Behavior
///
/// - **No token configured**: every request passes
/// - **Read-only method**: passes
/// - **Missing or malformed header**: `401 Unauthorized`
/// - **Wrong token**: `401 Unauthorized`
pub async fn organizer_guard(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(expected) = state.organizer_token_sha256.as_deref() else {
        return Ok(next.run(request).await);
    };

    if is_read_only(request.method()) {
        return Ok(next.run(request).await);
    }

    let authorized = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .is_some_and(|token| hash_token(token) == expected);

    if !authorized {
        tracing::warn!(
            method = %request.method(),
            uri = %request.uri(),
            "Rejected mutation without a valid organizer token"
        );
        return Err(StatusCode::UNAUTHORIZED);
    }

    Ok(next.run(request).await)
}

/// Records request count and latency under the matched route template.
pub async fn track_metrics(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let response = next.run(request).await;

    let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
    metrics::http_requests_total(&method, &path, response.status().as_u16());
    metrics::http_request_duration_ms(&method, &path, elapsed_ms);

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_token_is_sha256_hex() {
        let hash = hash_token("organizer");
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_eq!(hash, hash_token("organizer"));
        assert_ne!(hash, hash_token("organiser"));
    }

    #[test]
    fn test_read_only_methods() {
        assert!(is_read_only(&Method::GET));
        assert!(is_read_only(&Method::OPTIONS));
        assert!(!is_read_only(&Method::POST));
        assert!(!is_read_only(&Method::PUT));
        assert!(!is_read_only(&Method::DELETE));
    }
}
