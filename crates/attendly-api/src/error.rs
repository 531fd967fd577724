//! API error type and [`axum::response::IntoResponse`] implementation.

use attendly_provision::{ProvisionError, Step};
use axum::{
  Json,
  extract::rejection::JsonRejection,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// A failed call, rendered as `{success: false, step, message, details?}`.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct ApiError(#[from] pub ProvisionError);

impl ApiError {
  pub fn method_not_allowed() -> Self {
    Self(ProvisionError::new(Step::Method, "method not allowed"))
  }
}

/// HTTP status for a failure at `step`.
pub fn status_for(step: Step) -> StatusCode {
  match step {
    Step::Validate | Step::Invite | Step::CreateUser => StatusCode::BAD_REQUEST,
    Step::Method => StatusCode::METHOD_NOT_ALLOWED,
    Step::BrevoSend => StatusCode::BAD_GATEWAY,
    Step::Env
    | Step::InsertProfile
    | Step::InsertAdmin
    | Step::InsertProfessor
    | Step::UpsertStudent
    | Step::UpdateInvite
    | Step::DeleteProfile
    | Step::DeleteUser
    | Step::Catch => StatusCode::INTERNAL_SERVER_ERROR,
  }
}

/// A body that is not valid JSON for the operation is an uncaught failure.
impl From<JsonRejection> for ApiError {
  fn from(rejection: JsonRejection) -> Self {
    Self(ProvisionError::new(Step::Catch, rejection.body_text()))
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let ProvisionError { step, message, details } = self.0;
    let status = status_for(step);
    if status.is_server_error() {
      tracing::error!(%step, %message, "request failed");
    } else {
      tracing::debug!(%step, %message, "request rejected");
    }

    let mut body = json!({ "success": false, "step": step, "message": message });
    if let Some(details) = details {
      body["details"] = details;
    }
    (status, Json(body)).into_response()
  }
}
