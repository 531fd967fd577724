//! JSON HTTP API for account provisioning.
//!
//! Exposes an axum [`Router`] backed by a [`Provisioner`]. Authentication of
//! the calling dashboard, TLS and request tracing are the caller's
//! responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! let app = attendly_api::api_router(Arc::new(provisioner))
//!   .layer(TraceLayer::new_for_http());
//! ```

pub mod accounts;
pub mod cors;
pub mod error;
pub mod invites;

use std::sync::Arc;

use attendly_core::store::{AccountStore, IdentityAdmin, Mailer};
use attendly_provision::Provisioner;
use axum::{
  Json, Router,
  response::{IntoResponse, Response},
  routing::{MethodRouter, get, post},
};
use serde::Serialize;
use serde_json::json;

pub use error::ApiError;

/// A successful result, rendered with `"success": true` alongside its fields.
#[derive(Debug)]
pub struct Success<T>(pub T);

impl<T: Serialize> IntoResponse for Success<T> {
  fn into_response(self) -> Response {
    #[derive(Serialize)]
    struct Body<T> {
      success: bool,
      #[serde(flatten)]
      inner:   T,
    }
    Json(Body { success: true, inner: self.0 }).into_response()
  }
}

/// `POST` to `handler` and 405 for everything else.
fn operation<H, T, St>(handler: H) -> MethodRouter<St>
where
  H: axum::handler::Handler<T, St>,
  T: 'static,
  St: Clone + Send + Sync + 'static,
{
  post(handler).fallback(cors::method_not_allowed)
}

/// Build a fully-materialised API router for `provisioner`.
pub fn api_router<I, S, M>(provisioner: Arc<Provisioner<I, S, M>>) -> Router<()>
where
  I: IdentityAdmin + 'static,
  S: AccountStore + 'static,
  M: Mailer + 'static,
{
  Router::new()
    // Direct creation
    .route("/create-admin", operation(accounts::create_admin::<I, S, M>))
    .route("/create-professor", operation(accounts::create_professor::<I, S, M>))
    .route("/create-student", operation(accounts::create_student::<I, S, M>))
    // Invitations
    .route("/register-invited-user", operation(invites::register::<I, S, M>))
    // Deletion
    .route("/delete-account", operation(accounts::delete::<I, S, M>))
    .route("/delete-auth-user", operation(accounts::delete::<I, S, M>))
    .route("/health", get(health))
    .layer(cors::layer())
    .with_state(provisioner)
}

/// `GET /health`
async fn health() -> Json<serde_json::Value> { Json(json!({ "status": "ok" })) }
