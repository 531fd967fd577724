//! `POST /register-invited-user`

use std::sync::Arc;

use attendly_core::store::{AccountStore, IdentityAdmin, Mailer};
use attendly_provision::{
  Provisioner, provisioner::InvitedUserRegistered, request::RegisterInvitedRequest,
};
use axum::{Json, extract::State, extract::rejection::JsonRejection};

use crate::{Success, error::ApiError};

/// Redeem an invitation token. No email is sent on this path.
pub async fn register<I, S, M>(
  State(provisioner): State<Arc<Provisioner<I, S, M>>>,
  body: Result<Json<RegisterInvitedRequest>, JsonRejection>,
) -> Result<Success<InvitedUserRegistered>, ApiError>
where
  I: IdentityAdmin + 'static,
  S: AccountStore + 'static,
  M: Mailer + 'static,
{
  let Json(req) = body?;
  Ok(Success(provisioner.register_invited_user(&req).await?))
}
