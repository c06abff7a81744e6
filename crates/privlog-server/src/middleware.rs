use axum::{
    body::Body,
    extract::ConnectInfo,
    http::Request,
    middleware::Next,
    response::Response,
};
use std::net::SocketAddr;
use std::sync::Arc;

use crate::api::ApiError;
use crate::auth::Identity;
use crate::AppState;

/// Header carrying the API key.
pub const API_KEY_HEADER: &str = "X-API-Key";

/// Wrapper for the resolved [`Identity`] stored in request extensions.
#[derive(Clone, Debug)]
pub struct IdentityContext(pub Identity);

/// Middleware to authenticate requests via the `X-API-Key` header.
///
/// Missing and unknown keys get the same `403` response. On success the
/// identity is inserted into the request extensions as [`IdentityContext`].
pub async fn api_key_middleware(mut req: Request<Body>, next: Next) -> Result<Response, ApiError> {
    let state = req
        .extensions()
        .get::<Arc<AppState>>()
        .ok_or_else(|| ApiError::InternalServerError("application state missing".to_string()))?
        .clone();

    let presented = req
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok());

    let identity = state
        .credentials
        .resolve(presented)
        .map_err(|_| ApiError::Forbidden)?;

    req.extensions_mut().insert(IdentityContext(identity));

    Ok(next.run(req).await)
}

/// Returns the client address for logging.
///
/// Prefers the first `X-Forwarded-For` entry, then the socket peer, then
/// `"unknown"`.
pub fn client_address(req: &Request<Body>) -> String {
    if let Some(forwarded) = req
        .headers()
        .get("X-Forwarded-For")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty())
    {
        return forwarded.to_string();
    }

    match req.extensions().get::<ConnectInfo<SocketAddr>>() {
        Some(ConnectInfo(addr)) => addr.ip().to_string(),
        None => "unknown".to_string(),
    }
}

/// Logs every request with method, path and client address, and every
/// rejected or failed response again with its status.
pub async fn request_log_middleware(req: Request<Body>, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let client = client_address(&req);

    tracing::info!(%method, %path, %client, "request received");

    let response = next.run(req).await;
    let status = response.status();

    if status.is_server_error() {
        tracing::error!(%method, %path, %client, status = status.as_u16(), "request failed");
    } else if status.is_client_error() {
        tracing::warn!(%method, %path, %client, status = status.as_u16(), "request rejected");
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_address_prefers_first_forwarded_entry() {
        let req = Request::builder()
            .uri("/health")
            .header("X-Forwarded-For", " 203.0.113.7 , 10.0.0.1")
            .body(Body::empty())
            .unwrap();
        assert_eq!(client_address(&req), "203.0.113.7");
    }

    #[test]
    fn client_address_falls_back_to_peer() {
        let mut req = Request::builder().uri("/health").body(Body::empty()).unwrap();
        req.extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([192, 0, 2, 10], 51000))));
        assert_eq!(client_address(&req), "192.0.2.10");
    }

    #[test]
    fn client_address_unknown_without_information() {
        let req = Request::builder()
            .uri("/health")
            .header("X-Forwarded-For", "")
            .body(Body::empty())
            .unwrap();
        assert_eq!(client_address(&req), "unknown");
    }
}
