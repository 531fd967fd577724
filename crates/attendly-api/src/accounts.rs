//! Handlers for the direct account endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/create-admin` | Sends a credentials email |
//! | `POST` | `/create-professor` | Sends a credentials email |
//! | `POST` | `/create-student` | Synthetic login; email goes to `student_email` |
//! | `POST` | `/delete-account` | Profiles first, then the identity |
//! | `POST` | `/delete-auth-user` | Same as `/delete-account` |

use std::sync::Arc;

use attendly_core::store::{AccountStore, IdentityAdmin, Mailer};
use attendly_provision::{
  Provisioner,
  provisioner::{AccountDeleted, AdminCreated, ProfessorCreated, StudentCreated},
  request::{
    CreateAdminRequest, CreateProfessorRequest, CreateStudentRequest,
    DeleteAccountRequest,
  },
};
use axum::{Json, extract::State, extract::rejection::JsonRejection};

use crate::{Success, error::ApiError};

// ─── Create ──────────────────────────────────────────────────────────────────

/// `POST /create-admin`
pub async fn create_admin<I, S, M>(
  State(provisioner): State<Arc<Provisioner<I, S, M>>>,
  body: Result<Json<CreateAdminRequest>, JsonRejection>,
) -> Result<Success<AdminCreated>, ApiError>
where
  I: IdentityAdmin + 'static,
  S: AccountStore + 'static,
  M: Mailer + 'static,
{
  let Json(req) = body?;
  Ok(Success(provisioner.create_admin(&req).await?))
}

/// `POST /create-professor`
pub async fn create_professor<I, S, M>(
  State(provisioner): State<Arc<Provisioner<I, S, M>>>,
  body: Result<Json<CreateProfessorRequest>, JsonRejection>,
) -> Result<Success<ProfessorCreated>, ApiError>
where
  I: IdentityAdmin + 'static,
  S: AccountStore + 'static,
  M: Mailer + 'static,
{
  let Json(req) = body?;
  Ok(Success(provisioner.create_professor(&req).await?))
}

/// `POST /create-student`
pub async fn create_student<I, S, M>(
  State(provisioner): State<Arc<Provisioner<I, S, M>>>,
  body: Result<Json<CreateStudentRequest>, JsonRejection>,
) -> Result<Success<StudentCreated>, ApiError>
where
  I: IdentityAdmin + 'static,
  S: AccountStore + 'static,
  M: Mailer + 'static,
{
  let Json(req) = body?;
  Ok(Success(provisioner.create_student(&req).await?))
}

// ─── Delete ──────────────────────────────────────────────────────────────────

/// `POST /delete-account` and `POST /delete-auth-user`, body: `{"user_id":"…"}`
pub async fn delete<I, S, M>(
  State(provisioner): State<Arc<Provisioner<I, S, M>>>,
  body: Result<Json<DeleteAccountRequest>, JsonRejection>,
) -> Result<Success<AccountDeleted>, ApiError>
where
  I: IdentityAdmin + 'static,
  S: AccountStore + 'static,
  M: Mailer + 'static,
{
  let Json(req) = body?;
  Ok(Success(provisioner.delete_account(&req).await?))
}
