//! Browser access: CORS on every response, including errors, and the 405 for
//! methods other than `POST`.

use axum::http::{
  HeaderName, Method,
  header::{AUTHORIZATION, CONTENT_TYPE},
};
use tower_http::cors::{Any, CorsLayer};

use crate::error::ApiError;

/// Any origin; the dashboard calls from the browser with its own headers.
/// `OPTIONS` is answered here before routing.
pub fn layer() -> CorsLayer {
  CorsLayer::new()
    .allow_origin(Any)
    .allow_methods([Method::POST, Method::OPTIONS])
    .allow_headers([
      AUTHORIZATION,
      HeaderName::from_static("x-client-info"),
      HeaderName::from_static("apikey"),
      CONTENT_TYPE,
    ])
}

/// Any method other than `POST` on an operation.
pub async fn method_not_allowed() -> ApiError { ApiError::method_not_allowed() }
